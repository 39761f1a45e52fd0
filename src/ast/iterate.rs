use super::{
    BytecodeOffsets, ExprId, Exprent, LoopKind, SeqItem, StatId, StatKind, StatementGraph,
};

impl StatementGraph {
    /// Children and own expressions of `stat` in the order they execute.
    ///
    /// For loops this depends on the loop kind: a `for` evaluates init and condition before the
    /// body and the increment after it, a `do-while` checks its condition last, and a `foreach`
    /// lists its element variable and iterable up front.
    pub fn sequential_objects(&self, stat: StatId) -> Vec<SeqItem> {
        let statement = &self[stat];
        if let Some(exprents) = &statement.exprents {
            return exprents.iter().copied().map(SeqItem::Expr).collect();
        }

        let mut items: Vec<SeqItem> =
            statement.children.iter().copied().map(SeqItem::Stat).collect();
        // Heads are evaluated right after the head block.
        let after_head = 1.min(items.len());
        match &statement.kind {
            StatKind::If(if_stat) => items.insert(after_head, SeqItem::Expr(if_stat.head)),
            StatKind::Switch(switch) => items.insert(after_head, SeqItem::Expr(switch.head)),
            StatKind::Synchronized(sync) => {
                if let Some(head) = sync.head {
                    items.insert(after_head, SeqItem::Expr(head));
                }
            }
            StatKind::Do(do_stat) => {
                let mut before = Vec::new();
                let mut after = Vec::new();
                match do_stat.loop_kind {
                    LoopKind::For => {
                        before.extend(do_stat.init);
                        before.extend(do_stat.condition);
                        after.extend(do_stat.increment);
                    }
                    LoopKind::While => before.extend(do_stat.condition),
                    LoopKind::ForEach => {
                        before.extend(do_stat.init);
                        before.extend(do_stat.increment);
                    }
                    LoopKind::DoWhile => after.extend(do_stat.condition),
                    LoopKind::Do => {}
                }
                items = before
                    .into_iter()
                    .map(SeqItem::Expr)
                    .chain(items)
                    .chain(after.into_iter().map(SeqItem::Expr))
                    .collect();
            }
            _ => {}
        }
        items
    }

    /// Expressions a statement evaluates that don't belong to any child: loop slots, heads, catch
    /// variables, the monitor of a synchronized `finally`.
    pub fn own_exprents(&self, stat: StatId) -> Vec<ExprId> {
        let mut out: Vec<ExprId> = self
            .sequential_objects(stat)
            .into_iter()
            .filter_map(|item| match item {
                SeqItem::Expr(expr) => Some(expr),
                SeqItem::Stat(_) => None,
            })
            .collect();
        match &self[stat].kind {
            StatKind::TryCatch(catch) => out.extend(&catch.vars),
            StatKind::CatchAll(catch_all) => {
                out.extend(&catch_all.vars);
                out.extend(catch_all.monitor);
            }
            _ => {}
        }
        out
    }

    /// Every top-level expression in the subtree of `stat`, declarations included.
    pub fn exprents_in(&self, stat: StatId) -> Vec<ExprId> {
        let mut out = Vec::new();
        for stat in self.statements_post_order(stat) {
            out.extend(self.own_exprents(stat));
            out.extend(&self[stat].var_definitions);
        }
        out
    }

    /// `id` and all of its subexpressions, parents first.
    pub fn expr_tree(&self, id: ExprId) -> Vec<ExprId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self[id].subexprs().rev());
        }
        out
    }

    pub fn subexprs_recursive(&self, id: ExprId) -> Vec<ExprId> {
        let mut out = self.expr_tree(id);
        out.remove(0);
        out
    }

    // Union of the offsets of `id` and everything below it.
    pub fn tree_offsets(&self, id: ExprId) -> BytecodeOffsets {
        let mut offsets = BytecodeOffsets::new();
        for expr in self.expr_tree(id) {
            offsets.union_with(self.offsets(expr));
        }
        offsets
    }

    /// Bytecode range `[first, last]` covered by the subtree of `stat`.
    pub fn offset_range(&self, stat: StatId) -> Option<(u32, u32)> {
        let mut offsets = BytecodeOffsets::new();
        for expr in self.exprents_in(stat) {
            offsets.union_with(&self.tree_offsets(expr));
        }
        Some((offsets.first()?, offsets.last()?))
    }

    /// Variable occurrences in the subtree of `id`.
    pub fn vars_in(&self, id: ExprId) -> impl Iterator<Item = ExprId> + '_ {
        self.expr_tree(id)
            .into_iter()
            .filter(move |expr| matches!(self[*expr], Exprent::Var(_)))
    }
}
