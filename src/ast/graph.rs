use super::{
    Arena, BytecodeOffsets, CatchAllStat, CatchStat, DebugIr, Direction, DoStat, EdgeId, EdgeKind,
    EdgeKinds, ExprId, ExprNode, Exprent, IfStat, IfType, LoopKind, RootStat, StatEdge, StatId,
    StatKind, Statement, SwitchStat, SyncStat,
};
use core::fmt::{self, Display};
use core::ops::{Index, IndexMut};
use rustc_hash::FxHashSet;

/// Statement tree of one method, together with the control edges between its nodes and the
/// expressions the leaves evaluate.
///
/// Parent, child, closure and edge endpoints are all arena indices. Mutations go through the
/// methods below, which keep the successor, predecessor and labeled-edge lists of both endpoints
/// in sync.
#[derive(Clone, Debug)]
pub struct StatementGraph {
    stats: Arena<StatId, Statement>,
    edges: Arena<EdgeId, StatEdge>,
    exprs: Arena<ExprId, ExprNode>,
    root: StatId,
    dummy_exit: StatId,
}

impl StatementGraph {
    pub fn new() -> Self {
        let mut stats = Arena::new();
        // The synthetic exit is not a child of the root: it is the target of edges leaving the
        // method, nothing more.
        let dummy_exit = stats.alloc(Statement::new(StatKind::DummyExit));
        let root = stats.alloc(Statement::new(StatKind::Root(RootStat { dummy_exit })));
        Self {
            stats,
            edges: Arena::new(),
            exprs: Arena::new(),
            root,
            dummy_exit,
        }
    }

    pub fn root(&self) -> StatId {
        self.root
    }

    pub fn dummy_exit(&self) -> StatId {
        self.dummy_exit
    }

    pub fn expr(&self, id: ExprId) -> &ExprNode {
        &self.exprs[id]
    }

    pub fn debug<'a, T: DebugIr + ?Sized>(&'a self, value: &'a T) -> impl Display {
        struct IrDisplay<'a, T: ?Sized> {
            value: &'a T,
            graph: &'a StatementGraph,
        }

        impl<T: DebugIr + ?Sized> Display for IrDisplay<'_, T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                T::fmt(self.value, f, self.graph)
            }
        }

        IrDisplay { value, graph: self }
    }

    pub fn alloc_expr(&mut self, kind: Exprent) -> ExprId {
        self.exprs.alloc(ExprNode {
            kind,
            offsets: BytecodeOffsets::new(),
        })
    }

    pub fn alloc_expr_at(
        &mut self,
        kind: Exprent,
        offsets: impl IntoIterator<Item = u32>,
    ) -> ExprId {
        self.exprs.alloc(ExprNode {
            kind,
            offsets: offsets.into_iter().collect(),
        })
    }

    fn alloc_stat(&mut self, kind: StatKind, children: Vec<StatId>) -> StatId {
        let id = self.stats.alloc(Statement::new(kind));
        for child in &children {
            self.stats[*child].parent = Some(id);
        }
        self.stats[id].first = children.first().copied();
        self.stats[id].children = children;
        id
    }

    pub fn basic_block(&mut self, exprents: Vec<ExprId>) -> StatId {
        let id = self.alloc_stat(StatKind::BasicBlock, Vec::new());
        self.stats[id].exprents = Some(exprents);
        id
    }

    pub fn sequence(&mut self, children: Vec<StatId>) -> StatId {
        self.alloc_stat(StatKind::Sequence, children)
    }

    // `head` must be an `Exprent::If`.
    pub fn if_statement(
        &mut self,
        head_block: StatId,
        head: ExprId,
        if_stat: Option<StatId>,
        else_stat: Option<StatId>,
    ) -> StatId {
        let if_type = if else_stat.is_some() {
            IfType::IfElse
        } else {
            IfType::If
        };
        let children = [Some(head_block), if_stat, else_stat]
            .into_iter()
            .flatten()
            .collect();
        self.alloc_stat(
            StatKind::If(IfStat {
                head,
                if_stat,
                else_stat,
                if_type,
            }),
            children,
        )
    }

    pub fn do_loop(&mut self, body: StatId) -> StatId {
        self.alloc_stat(
            StatKind::Do(DoStat {
                loop_kind: LoopKind::Do,
                init: None,
                condition: None,
                increment: None,
            }),
            vec![body],
        )
    }

    pub fn switch(&mut self, head_block: StatId, head: ExprId, cases: Vec<StatId>) -> StatId {
        let mut children = vec![head_block];
        children.extend(&cases);
        self.alloc_stat(StatKind::Switch(SwitchStat { head, cases }), children)
    }

    pub fn try_catch(
        &mut self,
        try_body: StatId,
        handlers: Vec<StatId>,
        vars: Vec<ExprId>,
    ) -> StatId {
        let mut children = vec![try_body];
        children.extend(handlers);
        self.alloc_stat(StatKind::TryCatch(CatchStat { vars }), children)
    }

    pub fn catch_all(
        &mut self,
        try_body: StatId,
        handler: StatId,
        vars: Vec<ExprId>,
        is_finally: bool,
        monitor: Option<ExprId>,
    ) -> StatId {
        self.alloc_stat(
            StatKind::CatchAll(CatchAllStat {
                vars,
                is_finally,
                monitor,
            }),
            vec![try_body, handler],
        )
    }

    pub fn synchronized(
        &mut self,
        head_block: StatId,
        head: Option<ExprId>,
        body: StatId,
    ) -> StatId {
        self.alloc_stat(
            StatKind::Synchronized(SyncStat { head, body }),
            vec![head_block, body],
        )
    }

    pub fn set_root_body(&mut self, body: StatId) {
        let root = self.root;
        self.stats[body].parent = Some(root);
        self.stats[root].children = vec![body];
        self.stats[root].first = Some(body);
    }

    // Edges

    pub fn add_edge(
        &mut self,
        kind: EdgeKind,
        source: StatId,
        destination: StatId,
        closure: Option<StatId>,
    ) -> EdgeId {
        let edge = self.edges.alloc(StatEdge {
            kind,
            source,
            destination,
            closure,
            labeled: true,
            explicit: true,
        });
        self.attach_edge(edge);
        edge
    }

    /// Registers an edge with its source, destination and closure.
    pub fn attach_edge(&mut self, edge: EdgeId) {
        let StatEdge {
            source,
            destination,
            closure,
            ..
        } = self.edges[edge];
        self.stats[source].successors.push(edge);
        self.stats[destination].predecessors.push(edge);
        if let Some(closure) = closure {
            self.stats[closure].labeled_edges.push(edge);
        }
    }

    /// Unregisters an edge from every list that references it. The edge itself stays allocated and
    /// may be re-attached, possibly from a different source.
    pub fn detach_edge(&mut self, edge: EdgeId) {
        let StatEdge {
            source,
            destination,
            closure,
            ..
        } = self.edges[edge];
        self.stats[source].successors.retain(|e| *e != edge);
        self.stats[destination].predecessors.retain(|e| *e != edge);
        if let Some(closure) = closure {
            self.stats[closure].labeled_edges.retain(|e| *e != edge);
        }
    }

    pub fn change_edge_destination(&mut self, edge: EdgeId, destination: StatId) {
        let old = self.edges[edge].destination;
        self.stats[old].predecessors.retain(|e| *e != edge);
        self.edges[edge].destination = destination;
        self.stats[destination].predecessors.push(edge);
    }

    pub fn change_edge_kind(&mut self, edge: EdgeId, kind: EdgeKind) {
        self.edges[edge].kind = kind;
    }

    /// Makes `stat` the closure of an attached edge.
    pub fn add_labeled_edge(&mut self, stat: StatId, edge: EdgeId) {
        if let Some(old) = self.edges[edge].closure {
            self.stats[old].labeled_edges.retain(|e| *e != edge);
        }
        self.edges[edge].closure = Some(stat);
        self.stats[stat].labeled_edges.push(edge);
    }

    pub fn clear_closure(&mut self, edge: EdgeId) {
        if let Some(old) = self.edges[edge].closure.take() {
            self.stats[old].labeled_edges.retain(|e| *e != edge);
        }
    }

    pub fn successor_edges(&self, stat: StatId, kinds: EdgeKinds) -> Vec<EdgeId> {
        self.stats[stat]
            .successors
            .iter()
            .copied()
            .filter(|edge| kinds.contains(self.edges[*edge].kind))
            .collect()
    }

    pub fn predecessor_edges(&self, stat: StatId, kinds: EdgeKinds) -> Vec<EdgeId> {
        self.stats[stat]
            .predecessors
            .iter()
            .copied()
            .filter(|edge| kinds.contains(self.edges[*edge].kind))
            .collect()
    }

    pub fn neighbours(&self, stat: StatId, kinds: EdgeKinds, direction: Direction) -> Vec<StatId> {
        match direction {
            Direction::Forward => self
                .successor_edges(stat, kinds)
                .into_iter()
                .map(|edge| self.edges[edge].destination)
                .collect(),
            Direction::Backward => self
                .predecessor_edges(stat, kinds)
                .into_iter()
                .map(|edge| self.edges[edge].source)
                .collect(),
        }
    }

    pub fn neighbours_set(
        &self,
        stat: StatId,
        kinds: EdgeKinds,
        direction: Direction,
    ) -> FxHashSet<StatId> {
        self.neighbours(stat, kinds, direction).into_iter().collect()
    }

    pub fn is_labeled(&self, stat: StatId) -> bool {
        self.stats[stat].labeled_edges.iter().any(|edge| {
            let edge = &self.edges[*edge];
            edge.labeled && edge.explicit
        })
    }

    // `if` statements don't store their edges: they are always the non-exceptional exits of the
    // head block, the first one taken when the condition holds.
    pub fn if_edge(&self, if_stat: StatId) -> Option<EdgeId> {
        let head_block = self.stats[if_stat].first?;
        self.successor_edges(head_block, EdgeKinds::DIRECT_ALL)
            .first()
            .copied()
    }

    pub fn else_edge(&self, if_stat: StatId) -> Option<EdgeId> {
        let StatKind::If(IfStat {
            if_type: IfType::IfElse,
            ..
        }) = self.stats[if_stat].kind
        else {
            return None;
        };
        let head_block = self.stats[if_stat].first?;
        self.successor_edges(head_block, EdgeKinds::DIRECT_ALL)
            .get(1)
            .copied()
    }

    // Tree structure

    pub fn contains_strict(&self, ancestor: StatId, stat: StatId) -> bool {
        let mut current = self.stats[stat].parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.stats[parent].parent;
        }
        false
    }

    pub fn contains(&self, ancestor: StatId, stat: StatId) -> bool {
        ancestor == stat || self.contains_strict(ancestor, stat)
    }

    /// Puts `new` in place of the child `old` of `parent`, moving all of `old`'s edges over.
    ///
    /// Labels owned by `old` move to `new`, except for edges now originating at `new` itself: these
    /// either no longer need a closure (when they stay inside `parent`) or are lifted to `parent`.
    pub fn replace_statement(&mut self, parent: StatId, old: StatId, new: StatId) {
        for edge in self.stats[old].predecessors.clone() {
            self.change_edge_destination(edge, new);
        }
        for edge in core::mem::take(&mut self.stats[old].successors) {
            self.edges[edge].source = new;
            self.stats[new].successors.push(edge);
        }

        let parent_stat = &mut self.stats[parent];
        for child in &mut parent_stat.children {
            if *child == old {
                *child = new;
            }
        }
        if parent_stat.first == Some(old) {
            parent_stat.first = Some(new);
        }
        match &mut parent_stat.kind {
            StatKind::If(if_stat) => {
                if if_stat.if_stat == Some(old) {
                    if_stat.if_stat = Some(new);
                }
                if if_stat.else_stat == Some(old) {
                    if_stat.else_stat = Some(new);
                }
            }
            StatKind::Switch(switch) => {
                for case in &mut switch.cases {
                    if *case == old {
                        *case = new;
                    }
                }
            }
            StatKind::Synchronized(sync) if sync.body == old => sync.body = new,
            _ => {}
        }
        self.stats[new].parent = Some(parent);
        self.stats[old].parent = None;

        for edge in self.stats[old].labeled_edges.clone().into_iter().rev() {
            if self.edges[edge].source != new {
                self.add_labeled_edge(new, edge);
            } else {
                let destination = self.edges[edge].destination;
                if destination == parent || self.contains_strict(parent, destination) {
                    self.clear_closure(edge);
                } else {
                    self.add_labeled_edge(parent, edge);
                }
            }
        }
        self.stats[old].labeled_edges.clear();
    }

    /// Drops `child` from its parent's child list. Edges are left alone.
    pub fn remove_child(&mut self, parent: StatId, child: StatId) {
        let parent_stat = &mut self.stats[parent];
        parent_stat.children.retain(|c| *c != child);
        if parent_stat.first == Some(child) {
            parent_stat.first = parent_stat.children.first().copied();
        }
        match &mut parent_stat.kind {
            StatKind::If(if_stat) => {
                if if_stat.if_stat == Some(child) {
                    if_stat.if_stat = None;
                }
                if if_stat.else_stat == Some(child) {
                    if_stat.else_stat = None;
                }
            }
            StatKind::Switch(switch) => switch.cases.retain(|c| *c != child),
            _ => {}
        }
        self.stats[child].parent = None;
    }

    /// Detaches `stat` from the tree, together with every edge touching it.
    pub fn remove_statement(&mut self, stat: StatId) {
        for edge in self.stats[stat].successors.clone() {
            self.detach_edge(edge);
        }
        for edge in self.stats[stat].predecessors.clone() {
            self.detach_edge(edge);
        }
        if let Some(parent) = self.stats[stat].parent {
            self.remove_child(parent, stat);
        }
    }

    /// All statements reachable from the root, parents before children.
    pub fn statements(&self) -> Vec<StatId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(stat) = stack.pop() {
            out.push(stat);
            stack.extend(self.stats[stat].children.iter().rev());
        }
        out
    }

    pub fn statements_post_order(&self, stat: StatId) -> Vec<StatId> {
        let mut out = Vec::new();
        let mut stack = vec![(stat, false)];
        while let Some((stat, expanded)) = stack.pop() {
            if expanded {
                out.push(stat);
                continue;
            }
            stack.push((stat, true));
            for child in self.stats[stat].children.iter().rev() {
                stack.push((*child, false));
            }
        }
        out
    }
}

impl Default for StatementGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<StatId> for StatementGraph {
    type Output = Statement;

    fn index(&self, id: StatId) -> &Statement {
        &self.stats[id]
    }
}

impl IndexMut<StatId> for StatementGraph {
    fn index_mut(&mut self, id: StatId) -> &mut Statement {
        &mut self.stats[id]
    }
}

impl Index<EdgeId> for StatementGraph {
    type Output = StatEdge;

    fn index(&self, id: EdgeId) -> &StatEdge {
        &self.edges[id]
    }
}

impl IndexMut<EdgeId> for StatementGraph {
    fn index_mut(&mut self, id: EdgeId) -> &mut StatEdge {
        &mut self.edges[id]
    }
}

impl Index<ExprId> for StatementGraph {
    type Output = Exprent;

    fn index(&self, id: ExprId) -> &Exprent {
        &self.exprs[id].kind
    }
}

impl IndexMut<ExprId> for StatementGraph {
    fn index_mut(&mut self, id: ExprId) -> &mut Exprent {
        &mut self.exprs[id].kind
    }
}

impl StatementGraph {
    pub fn offsets(&self, id: ExprId) -> &BytecodeOffsets {
        &self.exprs[id].offsets
    }

    pub fn offsets_mut(&mut self, id: ExprId) -> &mut BytecodeOffsets {
        &mut self.exprs[id].offsets
    }
}
