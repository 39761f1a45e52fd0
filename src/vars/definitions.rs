//! Placement of variable declarations.
//!
//! Every variable index gets exactly one declaring expression: either an existing assignment marked
//! as a definition, or a synthesized bare variable inserted where the declaration has to live. The
//! declaring statement is the smallest statement two of whose children (or whose own expressions)
//! reference the index.

use super::{
    LvtVariable, VarProcessor, VarVersionPair, VariableNamer,
    merge::{MergeError, remap_var},
    refs::is_var_read_first,
};
use crate::ast::{
    BaseType, ExprId, Exprent, LoopKind, SeqItem, StatId, StatKind, StatementGraph, VarExprent,
    VarType,
};
use alloc::collections::{BTreeMap, VecDeque};
use rustc_hash::{FxHashMap, FxHashSet};

pub struct VarDefinitionResolver<'a> {
    graph: &'a mut StatementGraph,
    processor: &'a mut VarProcessor,
    // index -> statement that has to declare it
    def_statements: BTreeMap<u32, StatId>,
    // indices referenced anywhere in the subtree of a statement
    statement_vars: FxHashMap<StatId, FxHashSet<u32>>,
    // `this`, parameters and catch variables
    implicit: FxHashSet<u32>,
}

impl<'a> VarDefinitionResolver<'a> {
    pub fn new(graph: &'a mut StatementGraph, processor: &'a mut VarProcessor) -> Self {
        let mut resolver = Self {
            graph,
            processor,
            def_statements: BTreeMap::new(),
            statement_vars: FxHashMap::default(),
            implicit: FxHashSet::default(),
        };
        resolver.declare_implicit();
        let root = resolver.graph.root();
        resolver.init_statement(root);
        resolver
    }

    /// Statement each index will be declared in.
    pub fn def_statements(&self) -> &BTreeMap<u32, StatId> {
        &self.def_statements
    }

    fn declare_implicit(&mut self) {
        let has_this = !self.processor.is_static();
        for (i, slot) in self.processor.parameter_slots().to_vec().into_iter().enumerate() {
            self.implicit.insert(slot);
            let pair = VarVersionPair::new(slot, 0);
            if has_this && i == 0 {
                self.processor.names_collector().add_name("this");
                self.processor.set_name(pair, "this".into());
            } else {
                let name = self.processor.names_collector().free_index_name(slot);
                self.processor.set_name(pair, name);
            }
        }

        for stat in self.graph.statements() {
            let vars = match &self.graph[stat].kind {
                StatKind::TryCatch(catch) => catch.vars.clone(),
                StatKind::CatchAll(catch_all) => catch_all.vars.clone(),
                _ => continue,
            };
            for expr in vars {
                let Some(var) = self.graph[expr].as_var_mut() else {
                    continue;
                };
                var.is_definition = true;
                let pair = var.pair();
                self.implicit.insert(pair.index);
                let name = self.processor.names_collector().free_index_name(pair.index);
                self.processor.set_name(pair, name);
            }
        }
    }

    fn var_indices(&self, exprs: &[ExprId]) -> Vec<u32> {
        exprs
            .iter()
            .flat_map(|expr| self.graph.vars_in(*expr))
            .filter_map(|expr| self.graph[expr].as_var().map(|var| var.index))
            .collect()
    }

    // Counts references per index bottom-up. An index referenced by two children, or by the
    // statement's own expressions, needs a declaration at this level or above.
    fn init_statement(&mut self, stat: StatId) -> FxHashSet<u32> {
        let mut counts: FxHashMap<u32, u32> = FxHashMap::default();
        let mut current = Vec::new();

        if let Some(exprents) = &self.graph[stat].exprents {
            current.clone_from(exprents);
        } else {
            let mut child_vars = Vec::new();
            for item in self.graph.sequential_objects(stat) {
                match item {
                    SeqItem::Stat(child) => {
                        child_vars.extend(self.init_statement(child));
                        match &self.graph[child].kind {
                            StatKind::Do(do_stat)
                                if matches!(
                                    do_stat.loop_kind,
                                    LoopKind::While | LoopKind::DoWhile
                                ) =>
                            {
                                current.extend(do_stat.condition);
                            }
                            StatKind::CatchAll(catch_all) if catch_all.is_finally => {
                                current.extend(catch_all.monitor);
                            }
                            _ => {}
                        }
                    }
                    SeqItem::Expr(expr) => current.push(expr),
                }
            }
            for index in child_vars {
                *counts.entry(index).or_default() += 1;
            }
        }

        for index in self.var_indices(&current) {
            counts.insert(index, 2);
        }

        let set: FxHashSet<u32> = counts.keys().copied().collect();
        for (index, count) in counts {
            if count > 1 {
                self.def_statements.insert(index, stat);
            }
        }
        self.statement_vars.insert(stat, set.clone());
        set
    }

    // Version and type of the first occurrence of `index` inside `stat`.
    fn first_occurrence(&self, stat: StatId, index: u32) -> Option<&VarExprent> {
        self.graph
            .exprents_in(stat)
            .into_iter()
            .flat_map(|expr| self.graph.vars_in(expr))
            .filter_map(|expr| self.graph[expr].as_var())
            .find(|var| var.index == index)
    }

    // Marks `expr` as the definition of `index` if it assigns to it.
    fn set_definition(&mut self, expr: ExprId, index: u32, scope: StatId) -> bool {
        let Exprent::Assignment { left, .. } = self.graph[expr] else {
            return false;
        };
        let range = self.graph.offset_range(scope);
        let Some(var) = self.graph[left].as_var() else {
            return false;
        };
        if var.index != index {
            return false;
        }
        let lvt = match (&var.lvt, range) {
            (None, Some(range)) => self.processor.find_lvt(index, range),
            _ => None,
        };
        if let Some(var) = self.graph[left].as_var_mut() {
            var.is_definition = true;
            if lvt.is_some() {
                var.lvt = lvt;
            }
        }
        true
    }

    fn find_first_block(&self, stat: StatId, index: u32) -> Option<StatId> {
        let mut queue = VecDeque::from([stat]);
        while let Some(current) = queue.pop_front() {
            let references = self
                .statement_vars
                .get(&current)
                .is_some_and(|vars| vars.contains(&index));
            if !queue.is_empty() && !references {
                continue;
            }
            if self.graph.is_labeled(current) && !queue.is_empty() {
                return Some(current);
            }
            let statement = &self.graph[current];
            if statement.is_leaf() {
                return Some(current);
            }
            queue.clear();
            match &statement.kind {
                StatKind::Sequence => queue.extend(&statement.children),
                StatKind::If(_)
                | StatKind::Root(_)
                | StatKind::Switch(_)
                | StatKind::Synchronized(_) => queue.extend(statement.first),
                _ => return Some(current),
            }
        }
        None
    }

    // Debug table entry for a declaration of `index` placed in `stat`: whatever an occurrence
    // already carries, else the innermost table entry covering the statement.
    fn find_lvt(&self, index: u32, stat: StatId) -> Option<LvtVariable> {
        let carried = self
            .graph
            .exprents_in(stat)
            .into_iter()
            .flat_map(|expr| self.graph.vars_in(expr))
            .filter_map(|expr| self.graph[expr].as_var())
            .find_map(|var| (var.index == index).then(|| var.lvt.clone()).flatten());
        carried.or_else(|| self.processor.find_lvt(index, self.graph.offset_range(stat)?))
    }

    /// Declares every variable exactly once.
    pub fn set_var_definitions(&mut self) {
        for (index, stat) in self.def_statements.clone() {
            if self.implicit.contains(&index) {
                continue;
            }

            let occurrence = self.first_occurrence(stat, index);
            let version = occurrence.map_or(0, |var| var.version);
            let occurrence_ty = occurrence.map(|var| var.ty.clone());
            let pair = VarVersionPair::new(index, version);
            let name = self.processor.names_collector().free_index_name(index);
            self.processor.set_name(pair, name);

            let mut stat = stat;
            if let Some(do_stat) = self.graph[stat].as_loop().cloned() {
                match do_stat.loop_kind {
                    LoopKind::For => {
                        if let Some(init) = do_stat.init
                            && self.set_definition(init, index, stat)
                        {
                            continue;
                        }
                        let special: Vec<ExprId> =
                            [do_stat.condition, do_stat.increment].into_iter().flatten().collect();
                        if self.var_indices(&special).contains(&index)
                            && let Some(parent) = self.graph[stat].parent
                        {
                            stat = parent;
                        }
                    }
                    LoopKind::ForEach => {
                        if let Some(init) = do_stat.init
                            && let Some(var) = self.graph[init].as_var_mut()
                            && var.index == index
                        {
                            var.is_definition = true;
                            continue;
                        }
                    }
                    _ => {}
                }
            }

            let first = self.find_first_block(stat, index);
            let (target, in_exprents) = match first {
                None => (stat, false),
                Some(first) => (first, self.graph[first].is_leaf()),
            };
            let list = if in_exprents {
                self.graph[target].exprents.clone().unwrap_or_default()
            } else {
                self.graph[target].var_definitions.clone()
            };

            let mut add_index = 0;
            let mut defined = false;
            for expr in &list {
                if self.set_definition(*expr, index, stat) {
                    defined = true;
                    break;
                }
                if self.var_indices(&[*expr]).contains(&index) {
                    break;
                }
                add_index += 1;
            }
            if defined {
                continue;
            }

            let ty = self
                .processor
                .var_type(pair)
                .cloned()
                .or(occurrence_ty)
                .unwrap_or(VarType::primitive(BaseType::Unknown));
            let mut var = VarExprent::new(index, version, ty);
            var.is_definition = true;
            if self.processor.lvt().is_some() {
                var.lvt = self.find_lvt(index, stat);
            }
            let declaration = self.graph.alloc_expr(Exprent::Var(var));
            let mut list = list;
            list.insert(add_index, declaration);
            if in_exprents {
                self.graph[target].exprents = Some(list);
            } else {
                self.graph[target].var_definitions = list;
            }
            log::debug!("Declared {pair} in {target}");
        }
    }

    /// Merges a definition into a version of the same slot that is still in scope, as long as that
    /// version isn't read afterwards. Runs until no merge applies.
    pub fn merge_scoped_vars(&mut self) -> Result<(), MergeError> {
        let parent: FxHashMap<u32, VarVersionPair> = self
            .processor
            .parameter_slots()
            .iter()
            .map(|slot| (*slot, VarVersionPair::new(*slot, 0)))
            .collect();
        let mut blacklist: FxHashMap<VarVersionPair, VarVersionPair> = FxHashMap::default();
        let root = self.graph.root();
        loop {
            let mut leaked = FxHashMap::default();
            let Some((from, to)) = self.merge_vars(root, &parent, &mut leaked, &blacklist) else {
                return Ok(());
            };
            if !remap_var(self.graph, self.processor, from, to)? {
                blacklist.insert(from, to);
            }
        }
    }

    fn candidate(
        &self,
        var: &VarExprent,
        this_vars: &FxHashMap<u32, VarVersionPair>,
        blacklist: &FxHashMap<VarVersionPair, VarVersionPair>,
    ) -> Option<(VarVersionPair, VarVersionPair)> {
        let existing = *this_vars.get(&self.processor.remapped(var.index))?;
        (blacklist.get(&var.pair()) != Some(&existing)).then_some((var.pair(), existing))
    }

    fn merge_vars(
        &self,
        stat: StatId,
        parent: &FxHashMap<u32, VarVersionPair>,
        leaked: &mut FxHashMap<u32, VarVersionPair>,
        blacklist: &FxHashMap<VarVersionPair, VarVersionPair>,
    ) -> Option<(VarVersionPair, VarVersionPair)> {
        let mut this_vars = parent.clone();

        for expr in &self.graph[stat].var_definitions {
            let Some(var) = self.graph[*expr].as_var() else {
                continue;
            };
            if let Some(candidate) = self.candidate(var, &this_vars, blacklist) {
                return Some(candidate);
            }
            let index = self.processor.remapped(var.index);
            this_vars.insert(index, var.pair());
            leaked.insert(index, var.pair());
        }

        // Only these statements let declarations in their own expressions escape to the parent.
        let leaks = matches!(
            self.graph[stat].kind,
            StatKind::BasicBlock | StatKind::Sequence | StatKind::Root(_)
        );
        let first = self.graph[stat].first;

        for (i, item) in self.graph.sequential_objects(stat).into_iter().enumerate() {
            match item {
                SeqItem::Stat(child) => {
                    let mut child_leaked = FxHashMap::default();
                    let remap = self.merge_vars(child, &this_vars, &mut child_leaked, blacklist);
                    if remap.is_some() {
                        return remap;
                    }
                    if child_leaked.is_empty() {
                        continue;
                    }
                    match &self.graph[stat].kind {
                        StatKind::If(if_stat) => {
                            if Some(child) == if_stat.if_stat || Some(child) == if_stat.else_stat {
                                child_leaked.clear();
                            } else if Some(child) == first {
                                leaked.extend(&child_leaked);
                            }
                        }
                        StatKind::Switch(_) | StatKind::Synchronized(_) => {
                            if Some(child) == first {
                                leaked.extend(&child_leaked);
                            } else {
                                child_leaked.clear();
                            }
                        }
                        StatKind::TryCatch(_) | StatKind::CatchAll(_) => child_leaked.clear(),
                        _ => {}
                    }
                    this_vars.extend(child_leaked);
                }
                SeqItem::Expr(expr) => {
                    let var = match &self.graph[expr] {
                        Exprent::Assignment { left, .. } => self.graph[*left].as_var(),
                        Exprent::Var(var) => Some(var),
                        _ => None,
                    };
                    let Some(var) = var.filter(|var| var.is_definition) else {
                        continue;
                    };
                    if let Some((from, to)) = self.candidate(var, &this_vars, blacklist) {
                        if !is_var_read_first(&*self.graph, to, stat, i + 1, &[]) {
                            return Some((from, to));
                        }
                        continue;
                    }
                    let index = self.processor.remapped(var.index);
                    this_vars.insert(index, var.pair());
                    if leaks {
                        leaked.insert(index, var.pair());
                    }
                }
            }
        }
        None
    }

    /// Attaches debug table entries to every occurrence of their variable and settles names.
    pub fn propagate_lvts(&mut self, namer: &mut dyn VariableNamer, use_debug_var_names: bool) {
        let mut order: Vec<VarVersionPair> = Vec::new();
        let mut infos: FxHashMap<VarVersionPair, (Option<LvtVariable>, Option<VarType>)> =
            FxHashMap::default();

        let has_this = !self.processor.is_static();
        for (i, slot) in self.processor.parameter_slots().iter().enumerate() {
            let pair = VarVersionPair::new(*slot, 0);
            if has_this && i == 0 {
                order.push(pair);
                infos.insert(pair, (None, None));
            } else if let Some(table) = self.processor.lvt()
                && !table.candidates(*slot).is_empty()
            {
                order.push(pair);
                infos.insert(pair, (table.find_at(*slot, 0).cloned(), None));
            }
        }

        for stat in self.graph.statements() {
            let mut tops = self.graph[stat].var_definitions.clone();
            tops.extend(self.graph.own_exprents(stat));
            for var in tops.into_iter().flat_map(|top| self.graph.vars_in(top)) {
                let Some(var) = self.graph[var].as_var() else {
                    continue;
                };
                let pair = var.pair();
                let info = (var.lvt.clone(), Some(var.ty.clone()));
                match infos.get_mut(&pair) {
                    Some(existing) if var.is_definition => {
                        if info.0.is_some() || existing.0.is_none() {
                            *existing = info;
                        }
                    }
                    Some(_) => {}
                    None => {
                        order.push(pair);
                        infos.insert(pair, info);
                    }
                }
            }
        }

        let type_names: Vec<(VarVersionPair, String)> = order
            .iter()
            .map(|pair| {
                let name = match &infos[pair] {
                    (Some(lvt), _) => lvt
                        .signature
                        .clone()
                        .or_else(|| lvt.var_type().map(|ty| ty.to_string()))
                        .unwrap_or_else(|| lvt.descriptor.clone()),
                    (None, Some(ty)) => ty.to_string(),
                    (None, None) => "this".to_owned(),
                };
                (*pair, name)
            })
            .collect();
        let renames = namer.rename(&type_names);

        let mut lvts: FxHashMap<VarVersionPair, LvtVariable> = FxHashMap::default();
        for pair in order {
            if has_this && pair == VarVersionPair::new(0, 0) {
                continue;
            }
            let rename = renames.as_ref().and_then(|renames| renames.get(&pair)).cloned();
            if let Some(name) = &rename {
                self.processor.set_name(pair, name.clone());
            }
            let Some(mut lvt) = infos.remove(&pair).and_then(|(lvt, _)| lvt) else {
                continue;
            };
            match rename {
                Some(name) => lvt = lvt.renamed(name),
                None if use_debug_var_names => self.processor.set_name(pair, lvt.name.clone()),
                None => {}
            }
            self.processor.set_var_lvt(pair, lvt.clone());
            lvts.insert(pair, lvt);
        }
        if lvts.is_empty() {
            return;
        }

        for expr in self.graph.exprents_in(self.graph.root()) {
            for var in self.graph.vars_in(expr).collect::<Vec<_>>() {
                if let Some(var) = self.graph[var].as_var_mut()
                    && let Some(lvt) = lvts.get(&var.pair())
                {
                    var.lvt = Some(lvt.clone());
                }
            }
        }
    }

    /// Runs every step in order.
    pub fn resolve(
        mut self,
        namer: &mut dyn VariableNamer,
        use_debug_var_names: bool,
    ) -> Result<(), MergeError> {
        self.set_var_definitions();
        self.merge_scoped_vars()?;
        if use_debug_var_names {
            self.processor.set_debug_var_names();
        }
        self.propagate_lvts(namer, use_debug_var_names);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{EdgeKind, FunctionKind, IfType};
    use crate::testing::*;
    use crate::vars::{IdentityNamer, LocalVariableTable};

    // Every (index, version) pair with more than one definition marker in the tree.
    fn definition_counts(graph: &StatementGraph) -> FxHashMap<VarVersionPair, usize> {
        let mut counts = FxHashMap::default();
        for expr in graph.exprents_in(graph.root()) {
            for var in graph.vars_in(expr) {
                if let Some(var) = graph[var].as_var()
                    && var.is_definition
                {
                    *counts.entry(var.pair()).or_default() += 1;
                }
            }
        }
        counts
    }

    fn print(graph: &mut StatementGraph, index: u32) -> ExprId {
        let value = int_var(graph, index);
        call(graph, None, "Out", "print", "(I)V", vec![value])
    }

    #[test]
    fn first_assignment_becomes_definition() {
        let mut graph = StatementGraph::new();
        let mut processor = VarProcessor::with_parameter_slots(None, vec![0]);
        let v1 = int_var(&mut graph, 1);
        let zero = int(&mut graph, 0);
        let init = assign(&mut graph, v1, zero);
        let use_param = print(&mut graph, 0);
        let use_v1 = print(&mut graph, 1);
        let block = graph.basic_block(vec![use_param, init, use_v1]);
        graph.set_root_body(block);

        let resolver = VarDefinitionResolver::new(&mut graph, &mut processor);
        resolver.resolve(&mut IdentityNamer, true).expect("no invariant broken");

        assert!(graph[v1].as_var().is_some_and(|var| var.is_definition));
        let counts = definition_counts(&graph);
        assert_eq!(counts.get(&VarVersionPair::new(1, 0)), Some(&1));
        // Parameters are never declared.
        assert_eq!(counts.get(&VarVersionPair::new(0, 0)), None);
        assert_eq!(processor.name(VarVersionPair::new(1, 0)), Some("var1"));
    }

    // if (...) { v2 = 1; print(v2) } else { v2 = 2; print(v2) }; print(v2)
    #[test]
    fn declaration_hoisted_to_common_scope() {
        let mut graph = StatementGraph::new();
        let mut processor = VarProcessor::with_parameter_slots(None, vec![0]);

        let branch = |graph: &mut StatementGraph, value| {
            let v2 = int_var(graph, 2);
            let constant = int(graph, value);
            let set = assign(graph, v2, constant);
            let use_ = print(graph, 2);
            (graph.basic_block(vec![set, use_]), v2)
        };
        let (then_block, then_var) = branch(&mut graph, 1);
        let (else_block, else_var) = branch(&mut graph, 2);
        let flag = int_var(&mut graph, 0);
        let head = if_head(&mut graph, flag);
        let head_block = graph.basic_block(Vec::new());
        let if_stat = graph.if_statement(head_block, head, Some(then_block), Some(else_block));
        let after_use = print(&mut graph, 2);
        let after = graph.basic_block(vec![after_use]);
        let seq = graph.sequence(vec![if_stat, after]);
        graph.set_root_body(seq);
        graph.add_edge(EdgeKind::Regular, head_block, then_block, None);
        graph.add_edge(EdgeKind::Regular, head_block, else_block, None);
        assert_eq!(graph[if_stat].as_if().map(|s| s.if_type), Some(IfType::IfElse));

        let mut resolver = VarDefinitionResolver::new(&mut graph, &mut processor);
        assert_eq!(resolver.def_statements().get(&2), Some(&seq));
        resolver.set_var_definitions();

        // Neither branch can own the declaration, so a bare one goes in front of the `if`.
        assert!(!graph[then_var].as_var().is_some_and(|var| var.is_definition));
        assert!(!graph[else_var].as_var().is_some_and(|var| var.is_definition));
        let declarations = &graph[head_block].exprents;
        let declaration = declarations.as_ref().and_then(|list| list.first()).copied();
        let declared = declaration.and_then(|expr| graph[expr].as_var());
        assert!(declared.is_some_and(|var| var.index == 2 && var.is_definition));
        assert_eq!(definition_counts(&graph).get(&VarVersionPair::new(2, 0)), Some(&1));
    }

    #[test]
    fn for_loop_init_holds_definition() {
        let mut graph = StatementGraph::new();
        let mut processor = VarProcessor::with_parameter_slots(None, Vec::new());
        let body_use = print(&mut graph, 1);
        let body = graph.basic_block(vec![body_use]);
        let stat = graph.do_loop(body);
        let v1 = int_var(&mut graph, 1);
        let zero = int(&mut graph, 0);
        let init = assign(&mut graph, v1, zero);
        let counter = int_var(&mut graph, 1);
        let ten = int(&mut graph, 10);
        let condition = function(&mut graph, FunctionKind::Lt, vec![counter, ten]);
        let counter = int_var(&mut graph, 1);
        let increment = function(&mut graph, FunctionKind::Ipp, vec![counter]);
        let do_stat = graph[stat].as_loop_mut().expect("loop");
        do_stat.loop_kind = LoopKind::For;
        do_stat.init = Some(init);
        do_stat.condition = Some(condition);
        do_stat.increment = Some(increment);
        let seq = graph.sequence(vec![stat]);
        graph.set_root_body(seq);

        VarDefinitionResolver::new(&mut graph, &mut processor)
            .resolve(&mut IdentityNamer, false)
            .expect("no invariant broken");
        assert!(graph[v1].as_var().is_some_and(|var| var.is_definition));
        assert_eq!(definition_counts(&graph).get(&VarVersionPair::new(1, 0)), Some(&1));
    }

    #[test]
    fn catch_variables_are_implicit() {
        let mut graph = StatementGraph::new();
        let mut processor = VarProcessor::with_parameter_slots(None, Vec::new());
        let body = graph.basic_block(Vec::new());
        let use_exception = print(&mut graph, 4);
        let handler = graph.basic_block(vec![use_exception]);
        let exception = var(&mut graph, 4, 0, VarType::object("java/lang/Exception"));
        let try_stat = graph.try_catch(body, vec![handler], vec![exception]);
        graph.set_root_body(try_stat);

        VarDefinitionResolver::new(&mut graph, &mut processor)
            .resolve(&mut IdentityNamer, false)
            .expect("no invariant broken");
        assert!(graph[exception].as_var().is_some_and(|var| var.is_definition));
        assert_eq!(graph[handler].exprents.as_ref().map(Vec::len), Some(1));
    }

    // The declaration for slot 3 is synthesized in front of a block spanning offsets 12..=30.
    #[test]
    fn declaration_named_from_debug_table() {
        let mut graph = StatementGraph::new();
        let mut processor = VarProcessor::with_parameter_slots(None, Vec::new());
        let mut table = LocalVariableTable::new();
        table.add_variable(LvtVariable {
            name: "count".into(),
            descriptor: "I".into(),
            signature: None,
            start: 10,
            end: 40,
            slot: 3,
            is_lvtt: false,
        });
        table.add_variable(LvtVariable {
            name: "unrelated".into(),
            descriptor: "I".into(),
            signature: None,
            start: 0,
            end: 100,
            slot: 3,
            is_lvtt: false,
        });
        processor.set_lvt(table);

        let read = |graph: &mut StatementGraph, offset| {
            let value =
                graph.alloc_expr_at(Exprent::Var(VarExprent::new(3, 0, VarType::int())), [offset]);
            let invocation = call(graph, None, "Out", "print", "(I)V", vec![value]);
            graph.basic_block(vec![invocation])
        };
        let first = read(&mut graph, 12);
        let second = read(&mut graph, 30);
        let seq = graph.sequence(vec![first, second]);
        graph.set_root_body(seq);

        VarDefinitionResolver::new(&mut graph, &mut processor)
            .resolve(&mut IdentityNamer, true)
            .expect("no invariant broken");

        let pair = VarVersionPair::new(3, 0);
        assert_eq!(processor.name(pair), Some("count"));
        assert_eq!(processor.var_lvt(pair).map(|lvt| lvt.name.as_str()), Some("count"));
        let declaration = graph[first].exprents.as_ref().and_then(|list| list.first()).copied();
        let declared = declaration.and_then(|expr| graph[expr].as_var());
        assert!(declared.is_some_and(|var| var.is_definition
            && var.lvt.as_ref().is_some_and(|lvt| lvt.name == "count")));
    }

    // { v5 = 1; print(v5) } { v6 = 2; print(v6) } with both indices split off slot 5: the second
    // declaration is redundant once the first is in scope.
    #[test]
    fn sibling_redeclarations_merge() {
        let mut graph = StatementGraph::new();
        let mut processor = VarProcessor::with_parameter_slots(None, Vec::new());
        processor.set_original_index(5, VarVersionPair::new(5, 0));
        processor.set_original_index(6, VarVersionPair::new(5, 1));

        let block = |graph: &mut StatementGraph, index, value| {
            let target = int_var(graph, index);
            let constant = int(graph, value);
            let set = assign(graph, target, constant);
            let use_ = print(graph, index);
            (graph.basic_block(vec![set, use_]), target)
        };
        let (first, _) = block(&mut graph, 5, 1);
        let (second, second_var) = block(&mut graph, 6, 2);
        let seq = graph.sequence(vec![first, second]);
        graph.set_root_body(seq);

        VarDefinitionResolver::new(&mut graph, &mut processor)
            .resolve(&mut IdentityNamer, false)
            .expect("no invariant broken");

        let merged = graph[second_var].as_var().expect("var");
        assert_eq!(merged.pair(), VarVersionPair::new(5, 0));
        assert!(!merged.is_definition);
        assert_eq!(definition_counts(&graph).get(&VarVersionPair::new(5, 0)), Some(&1));
        assert_eq!(definition_counts(&graph).get(&VarVersionPair::new(6, 0)), None);
    }
}
