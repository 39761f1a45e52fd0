//! Recognition of source-level loop forms.
//!
//! Structuring produces every loop as an endless `do { ... }` whose exits are breaks. The matchers
//! here look for the shapes `javac` emits for `while`, `do-while`, `for` and `foreach`, and move
//! the expressions involved into the loop's condition, init and increment slots. Each matcher
//! either rewrites the loop completely or leaves the tree untouched.

mod conditional;
mod counted;
mod foreach;
mod reachability;

pub use self::reachability::{is_direct_path, low_closures};

use self::{
    conditional::{match_do_while, match_while},
    counted::match_for,
    foreach::match_foreach,
};
use crate::ast::{
    Direction, EdgeId, EdgeKind, EdgeKinds, ExprId, LoopKind, StatId, StatKind, StatementGraph,
};
use crate::options::DecompilerOptions;

/// Rewrites loops until no loop changes kind anymore. Returns the number of rewrites.
pub fn enhance_loops(graph: &mut StatementGraph, options: &DecompilerOptions) -> usize {
    let mut total = 0;
    loop {
        let changed = enhance_loops_once(graph, options);
        if changed == 0 {
            return total;
        }
        total += changed;
    }
}

// Children are visited before their parents, so that an inner loop is in its final form by the
// time the outer one looks for an increment or an init inside it.
fn enhance_loops_once(graph: &mut StatementGraph, options: &DecompilerOptions) -> usize {
    let root = graph.root();
    let mut changed = 0;
    for stat in graph.statements_post_order(root) {
        // Earlier rewrites may have dropped the statement from the tree.
        if graph[stat].as_loop().is_some()
            && graph.contains(root, stat)
            && enhance_loop(graph, stat, options)
        {
            changed += 1;
        }
    }
    changed
}

fn enhance_loop(graph: &mut StatementGraph, stat: StatId, options: &DecompilerOptions) -> bool {
    let old = loop_kind(graph, stat);
    match old {
        LoopKind::Do => {
            if match_while(graph, stat) {
                if !match_foreach(graph, stat) {
                    match_for(graph, stat, options);
                }
            } else if options.match_do_while {
                match_do_while(graph, stat);
            }
        }
        LoopKind::While => {
            if !match_foreach(graph, stat) {
                match_for(graph, stat, options);
            }
        }
        LoopKind::DoWhile | LoopKind::For | LoopKind::ForEach => {}
    }

    let new = loop_kind(graph, stat);
    if new != old {
        log::debug!("Loop {stat} turned from {old} into {new}");
    }
    new != old
}

fn loop_kind(graph: &StatementGraph, stat: StatId) -> LoopKind {
    graph[stat]
        .as_loop()
        .expect("loop matchers only run on loops")
        .loop_kind
}

fn set_loop_kind(graph: &mut StatementGraph, stat: StatId, kind: LoopKind) {
    graph[stat]
        .as_loop_mut()
        .expect("loop matchers only run on loops")
        .loop_kind = kind;
}

// Installs a new condition, keeping the offsets of the previous one and of the `if` head it was
// taken from.
fn replace_condition(graph: &mut StatementGraph, stat: StatId, condition: ExprId, head: ExprId) {
    if let Some(old) = graph[stat].as_loop().and_then(|do_stat| do_stat.condition) {
        graph.absorb_offsets(condition, old);
    }
    let head_offsets = graph.offsets(head).clone();
    graph.add_offsets(condition, &head_offsets);
    if let Some(do_stat) = graph[stat].as_loop_mut() {
        do_stat.condition = Some(condition);
    }
}

// A loop whose only exit was removed from its body takes over that exit. `edge` must be detached.
fn lift_exit_edge(graph: &mut StatementGraph, stat: StatId, edge: EdgeId) {
    if !graph[stat].successors.is_empty() {
        return;
    }
    graph[edge].source = stat;
    if graph[edge].closure == Some(stat) {
        graph[edge].closure = graph[stat].parent;
    }
    graph.attach_edge(edge);
}

/// Last leaf of `stat` in execution order, skipping trailing empty leaves. `None` if the walk hits
/// a compound statement with nothing usable in it.
fn last_direct_data(graph: &StatementGraph, stat: StatId) -> Option<StatId> {
    if graph[stat].is_leaf() {
        return Some(stat);
    }
    for child in graph[stat].children.iter().rev() {
        let found = last_direct_data(graph, *child);
        if found.is_none_or(|leaf| !graph[leaf].has_empty_exprents()) {
            return found;
        }
    }
    None
}

/// First non-empty leaf of `stat`.
fn first_direct_data(graph: &StatementGraph, stat: StatId) -> Option<StatId> {
    if graph[stat].exprents.as_ref().is_some_and(|exprents| !exprents.is_empty()) {
        return Some(stat);
    }
    graph[stat]
        .children
        .iter()
        .find_map(|child| first_direct_data(graph, *child))
}

/// Leaf whose last expressions run right before `stat` is entered, found by climbing through the
/// sequences `stat` starts.
fn preceding_data(graph: &StatementGraph, stat: StatId, blocks_only: bool) -> Option<StatId> {
    let mut current = stat;
    loop {
        let parent = graph[current].parent?;
        if !matches!(graph[parent].kind, StatKind::Sequence) {
            return None;
        }
        if graph[parent].first == Some(current) {
            current = parent;
            continue;
        }
        let previous = *graph
            .neighbours(current, EdgeKinds::REGULAR, Direction::Backward)
            .first()?;
        if blocks_only && !matches!(graph[previous].kind, StatKind::BasicBlock) {
            return None;
        }
        return last_direct_data(graph, previous);
    }
}

// Drops a leaf emptied by a rewrite, along with the edge leaving it.
fn clean_empty_statements(graph: &mut StatementGraph, stat: StatId, leaf: StatId) {
    if !graph[leaf].has_empty_exprents() {
        return;
    }
    if let Some(edge) = graph[leaf].successors.first().copied() {
        graph.detach_edge(edge);
    }
    remove_last_empty_statement(graph, stat, leaf);
}

/// Removes an empty statement ending the body of the loop `stat`. Whatever jumped to it now
/// continues the loop.
fn remove_last_empty_statement(graph: &mut StatementGraph, stat: StatId, empty: StatId) {
    if graph[stat].first == Some(empty) {
        let block = graph.basic_block(Vec::new());
        graph.replace_statement(stat, empty, block);
        return;
    }
    for edge in graph[empty].predecessors.clone() {
        graph.change_edge_kind(edge, EdgeKind::Continue);
        graph.change_edge_destination(edge, stat);
        graph.add_labeled_edge(stat, edge);
    }
    graph.remove_statement(empty);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BaseType, ConstValue, DoStat, Exprent, FunctionKind, VarType};
    use crate::testing::{all_offsets, assign, call, function, if_head, int, int_var, var};
    use proptest::prelude::*;

    struct LoopShape {
        graph: StatementGraph,
        stat: StatId,
        body: StatId,
        work: StatId,
        before: StatId,
        after: StatId,
    }

    // `before; do { if (exit) break; work } ; after`, with `exit` built by the caller.
    fn guarded_loop(
        build: impl FnOnce(&mut StatementGraph) -> (Vec<ExprId>, ExprId, Vec<ExprId>),
    ) -> LoopShape {
        let mut graph = StatementGraph::new();
        let (before_exprents, exit, work_exprents) = build(&mut graph);
        let before = graph.basic_block(before_exprents);
        let head_block = graph.basic_block(Vec::new());
        let head = if_head(&mut graph, exit);
        let guard = graph.if_statement(head_block, head, None, None);
        let work = graph.basic_block(work_exprents);
        let body = graph.sequence(vec![guard, work]);
        let stat = graph.do_loop(body);
        let after = graph.basic_block(Vec::new());
        let seq = graph.sequence(vec![before, stat, after]);
        graph.set_root_body(seq);

        graph.add_edge(EdgeKind::Regular, before, stat, None);
        graph.add_edge(EdgeKind::Break, head_block, after, Some(stat));
        graph.add_edge(EdgeKind::Regular, guard, work, None);
        graph.add_edge(EdgeKind::Continue, work, stat, Some(stat));
        graph.add_edge(EdgeKind::Regular, stat, after, None);
        LoopShape {
            graph,
            stat,
            body,
            work,
            before,
            after,
        }
    }

    // `int x; while (x < 10) x = x + 1;`
    fn counting_loop() -> LoopShape {
        guarded_loop(|graph| {
            let x = int_var(graph, 1);
            let ten = int(graph, 10);
            let exit = function(graph, FunctionKind::Ge, vec![x, ten]);
            let x_left = int_var(graph, 1);
            let x_right = int_var(graph, 1);
            let one = int(graph, 1);
            let sum = function(graph, FunctionKind::Add, vec![x_right, one]);
            let step = assign(graph, x_left, sum);
            (Vec::new(), exit, vec![step])
        })
    }

    fn iterator_type() -> VarType {
        VarType::object("java/util/Iterator")
    }

    // `for (Object s : list) sink(s);` as javac lowers it.
    fn iterator_loop() -> LoopShape {
        guarded_loop(|graph| {
            let list = var(graph, 1, 0, VarType::object("java/util/List"));
            let iterator = call(
                graph,
                Some(list),
                "java/util/List",
                "iterator",
                "()Ljava/util/Iterator;",
                Vec::new(),
            );
            let holder = var(graph, 2, 0, iterator_type());
            let init = assign(graph, holder, iterator);

            let holder = var(graph, 2, 0, iterator_type());
            let has_next =
                call(graph, Some(holder), "java/util/Iterator", "hasNext", "()Z", Vec::new());
            let exit = function(graph, FunctionKind::BoolNot, vec![has_next]);

            let holder = var(graph, 2, 0, iterator_type());
            let next = call(
                graph,
                Some(holder),
                "java/util/Iterator",
                "next",
                "()Ljava/lang/Object;",
                Vec::new(),
            );
            let element = var(graph, 3, 0, VarType::java_object());
            let fetch = assign(graph, element, next);
            let element = var(graph, 3, 0, VarType::java_object());
            let sink = call(graph, None, "Sink", "sink", "(Ljava/lang/Object;)V", vec![element]);
            (vec![init], exit, vec![fetch, sink])
        })
    }

    // `int[] copy = array; int len = copy.length; for (int i = 0; i < len; i++) { int e = copy[i];
    // sink(e); }`, optionally reading `i` again in the body.
    fn array_loop(reads_counter: bool) -> LoopShape {
        guarded_loop(|graph| {
            let int_array = VarType::int().array_of(1);
            let array = var(graph, 4, 0, int_array.clone());
            let copy = var(graph, 5, 0, int_array.clone());
            let copy_init = assign(graph, copy, array);
            let copy = var(graph, 5, 0, int_array.clone());
            let length = function(graph, FunctionKind::ArrayLength, vec![copy]);
            let len = int_var(graph, 6);
            let len_init = assign(graph, len, length);
            let counter = int_var(graph, 7);
            let zero = int(graph, 0);
            let counter_init = assign(graph, counter, zero);

            let counter = int_var(graph, 7);
            let len = int_var(graph, 6);
            let exit = function(graph, FunctionKind::Ge, vec![counter, len]);

            let copy = var(graph, 5, 0, int_array);
            let counter = int_var(graph, 7);
            let element = graph.alloc_expr(Exprent::Array {
                array: copy,
                index: counter,
            });
            let e = int_var(graph, 8);
            let fetch = assign(graph, e, element);
            let e = int_var(graph, 8);
            let mut work = vec![fetch, call(graph, None, "Sink", "sink", "(I)V", vec![e])];
            if reads_counter {
                let counter = int_var(graph, 7);
                work.push(call(graph, None, "Sink", "sink", "(I)V", vec![counter]));
            }
            let counter = int_var(graph, 7);
            work.push(function(graph, FunctionKind::Ipp, vec![counter]));
            (vec![copy_init, len_init, counter_init], exit, work)
        })
    }

    fn do_stat(graph: &StatementGraph, stat: StatId) -> &DoStat {
        graph[stat].as_loop().expect("loop")
    }

    #[test]
    fn leading_break_becomes_while() {
        let LoopShape {
            mut graph,
            stat,
            body,
            work,
            after,
            ..
        } = counting_loop();
        let offsets = all_offsets(&graph);

        enhance_loops(&mut graph, &DecompilerOptions::default());

        assert_eq!(do_stat(&graph, stat).loop_kind, LoopKind::While);
        let condition = do_stat(&graph, stat).condition.expect("condition");
        assert!(matches!(
            graph[condition],
            Exprent::Function {
                kind: FunctionKind::BoolNot,
                ..
            }
        ));
        assert_eq!(graph[body].children, [work]);
        // The break out of the guard is gone, the loop's own exit remains.
        assert_eq!(
            graph.neighbours(after, EdgeKinds::ALL, Direction::Backward),
            [stat]
        );
        assert!(all_offsets(&graph).is_superset(&offsets));
    }

    #[test]
    fn matched_loops_stay_matched() {
        for shape in [counting_loop(), iterator_loop(), array_loop(false), array_loop(true)] {
            let LoopShape { mut graph, stat, .. } = shape;
            let options = DecompilerOptions::default();
            assert!(enhance_loops(&mut graph, &options) > 0);
            let kind = do_stat(&graph, stat).loop_kind;
            let exprents = graph.exprents_in(graph.root());
            assert_eq!(enhance_loops(&mut graph, &options), 0);
            assert_eq!(do_stat(&graph, stat).loop_kind, kind);
            assert_eq!(graph.exprents_in(graph.root()), exprents);
        }
    }

    #[test]
    fn iterator_loop_becomes_foreach() {
        let LoopShape {
            mut graph,
            stat,
            work,
            before,
            ..
        } = iterator_loop();
        let offsets = all_offsets(&graph);

        enhance_loops(&mut graph, &DecompilerOptions::default());

        let do_stat = do_stat(&graph, stat);
        assert_eq!(do_stat.loop_kind, LoopKind::ForEach);
        assert_eq!(do_stat.condition, None);
        let element = do_stat.init.expect("element");
        let iterable = do_stat.increment.expect("iterable");
        assert_eq!(graph[element].as_var().map(|var| var.index), Some(3));
        assert_eq!(graph[iterable].as_var().map(|var| var.index), Some(1));
        assert!(graph[before].has_empty_exprents());
        assert_eq!(graph[work].exprents.as_ref().map(Vec::len), Some(1));

        let leftover_calls = graph
            .exprents_in(graph.root())
            .into_iter()
            .flat_map(|expr| graph.expr_tree(expr))
            .filter(|expr| {
                matches!(&graph[*expr], Exprent::Invocation(invocation)
                    if matches!(invocation.name.as_str(), "iterator" | "hasNext" | "next"))
            })
            .count();
        assert_eq!(leftover_calls, 0);
        assert!(all_offsets(&graph).is_superset(&offsets));
    }

    #[test]
    fn array_loop_becomes_foreach() {
        let LoopShape {
            mut graph,
            stat,
            work,
            before,
            ..
        } = array_loop(false);
        let offsets = all_offsets(&graph);

        enhance_loops(&mut graph, &DecompilerOptions::default());

        let do_stat = do_stat(&graph, stat);
        assert_eq!(do_stat.loop_kind, LoopKind::ForEach);
        let element = do_stat.init.expect("element");
        let iterable = do_stat.increment.expect("iterable");
        assert_eq!(graph[element].as_var().map(|var| var.index), Some(8));
        // The temporary copy is folded, leaving the original array.
        assert_eq!(graph[iterable].as_var().map(|var| var.index), Some(4));
        assert!(graph[before].has_empty_exprents());
        assert_eq!(graph[work].exprents.as_ref().map(Vec::len), Some(1));
        assert!(all_offsets(&graph).is_superset(&offsets));
    }

    #[test]
    fn counter_read_in_body_keeps_for() {
        let LoopShape {
            mut graph,
            stat,
            work,
            before,
            ..
        } = array_loop(true);

        enhance_loops(&mut graph, &DecompilerOptions::default());

        let do_stat = do_stat(&graph, stat);
        assert_eq!(do_stat.loop_kind, LoopKind::For);
        let init = do_stat.init.expect("init");
        let increment = do_stat.increment.expect("increment");
        assert!(matches!(graph[init], Exprent::Assignment { .. }));
        assert!(matches!(
            graph[increment],
            Exprent::Function {
                kind: FunctionKind::Ipp,
                ..
            }
        ));
        // Only the counter init moves into the loop.
        assert_eq!(graph[before].exprents.as_ref().map(Vec::len), Some(2));
        assert_eq!(graph[work].exprents.as_ref().map(Vec::len), Some(3));
    }

    // do { if (x < 10) sink(); x = x + 1; } while (...), where the increment block is entered both
    // from the guard and from its body.
    fn single_increment_loop() -> (StatementGraph, StatId, StatId) {
        let mut graph = StatementGraph::new();
        let x = int_var(&mut graph, 1);
        let ten = int(&mut graph, 10);
        let condition = function(&mut graph, FunctionKind::Lt, vec![x, ten]);
        let head_block = graph.basic_block(Vec::new());
        let head = if_head(&mut graph, condition);
        let sink = call(&mut graph, None, "Sink", "sink", "()V", Vec::new());
        let inner = graph.basic_block(vec![sink]);
        let guard = graph.if_statement(head_block, head, Some(inner), None);

        let x_left = int_var(&mut graph, 1);
        let x_right = int_var(&mut graph, 1);
        let one = int(&mut graph, 1);
        let sum = function(&mut graph, FunctionKind::Add, vec![x_right, one]);
        let step = assign(&mut graph, x_left, sum);
        let tail = graph.basic_block(vec![step]);
        let body = graph.sequence(vec![guard, tail]);
        let stat = graph.do_loop(body);
        graph.set_root_body(stat);

        graph.add_edge(EdgeKind::Regular, head_block, inner, None);
        graph.add_edge(EdgeKind::Regular, guard, tail, None);
        graph.add_edge(EdgeKind::Regular, inner, tail, None);
        graph.add_edge(EdgeKind::Continue, tail, stat, Some(stat));

        let cond = graph.alloc_expr(Exprent::Const {
            ty: VarType::primitive(BaseType::Boolean),
            value: ConstValue::Int(1),
        });
        let do_stat = graph[stat].as_loop_mut().expect("loop");
        do_stat.loop_kind = LoopKind::While;
        do_stat.condition = Some(cond);
        (graph, stat, tail)
    }

    #[test]
    fn single_increment_without_init() {
        let (mut graph, stat, tail) = single_increment_loop();
        let options = DecompilerOptions {
            accept_single_increment: false,
            ..DecompilerOptions::default()
        };
        assert_eq!(enhance_loops(&mut graph, &options), 0);
        assert_eq!(do_stat(&graph, stat).loop_kind, LoopKind::While);

        let (mut graph, stat, tail) = single_increment_loop();
        enhance_loops(&mut graph, &DecompilerOptions::default());
        let do_stat = do_stat(&graph, stat);
        assert_eq!(do_stat.loop_kind, LoopKind::For);
        assert_eq!(do_stat.init, None);
        assert!(do_stat.increment.is_some());
        // The emptied block is gone and both paths into it now continue the loop.
        assert_eq!(graph[tail].parent, None);
        assert_eq!(
            graph
                .predecessor_edges(stat, EdgeKinds::CONTINUE)
                .len(),
            2
        );
    }

    #[test]
    fn trailing_test_becomes_do_while() {
        let build = || {
            let mut graph = StatementGraph::new();
            let x_left = int_var(&mut graph, 1);
            let x_right = int_var(&mut graph, 1);
            let one = int(&mut graph, 1);
            let sum = function(&mut graph, FunctionKind::Add, vec![x_right, one]);
            let step = assign(&mut graph, x_left, sum);
            let work = graph.basic_block(vec![step]);
            let x = int_var(&mut graph, 1);
            let ten = int(&mut graph, 10);
            let condition = function(&mut graph, FunctionKind::Lt, vec![x, ten]);
            let head_block = graph.basic_block(Vec::new());
            let head = if_head(&mut graph, condition);
            let test = graph.if_statement(head_block, head, None, None);
            let body = graph.sequence(vec![work, test]);
            let stat = graph.do_loop(body);
            let after = graph.basic_block(Vec::new());
            let seq = graph.sequence(vec![stat, after]);
            graph.set_root_body(seq);

            graph.add_edge(EdgeKind::Regular, work, test, None);
            graph.add_edge(EdgeKind::Continue, head_block, stat, Some(stat));
            graph.add_edge(EdgeKind::Break, test, after, Some(stat));
            graph.add_edge(EdgeKind::Regular, stat, after, None);
            (graph, stat, body, work, condition)
        };

        let (mut graph, ..) = build();
        let options = DecompilerOptions {
            match_do_while: false,
            ..DecompilerOptions::default()
        };
        assert_eq!(enhance_loops(&mut graph, &options), 0);

        let (mut graph, stat, body, work, condition) = build();
        let offsets = all_offsets(&graph);
        enhance_loops(&mut graph, &DecompilerOptions::default());
        assert_eq!(do_stat(&graph, stat).loop_kind, LoopKind::DoWhile);
        assert_eq!(do_stat(&graph, stat).condition, Some(condition));
        assert_eq!(graph[body].children, [work]);
        assert_eq!(
            graph.neighbours(work, EdgeKinds::CONTINUE, Direction::Forward),
            [stat]
        );
        assert!(all_offsets(&graph).is_superset(&offsets));
    }

    #[test]
    fn guard_with_body_is_spliced() {
        let mut graph = StatementGraph::new();
        let x = int_var(&mut graph, 1);
        let ten = int(&mut graph, 10);
        let condition = function(&mut graph, FunctionKind::Lt, vec![x, ten]);
        let head_block = graph.basic_block(Vec::new());
        let head = if_head(&mut graph, condition);
        let sink = call(&mut graph, None, "Sink", "sink", "()V", Vec::new());
        let inner = graph.basic_block(vec![sink]);
        let guard = graph.if_statement(head_block, head, Some(inner), None);
        let stat = graph.do_loop(guard);
        let after = graph.basic_block(Vec::new());
        let seq = graph.sequence(vec![stat, after]);
        graph.set_root_body(seq);

        graph.add_edge(EdgeKind::Regular, head_block, inner, None);
        graph.add_edge(EdgeKind::Break, guard, after, Some(stat));
        graph.add_edge(EdgeKind::Continue, inner, stat, Some(stat));
        graph.add_edge(EdgeKind::Regular, stat, after, None);

        enhance_loops(&mut graph, &DecompilerOptions::default());

        assert_eq!(do_stat(&graph, stat).loop_kind, LoopKind::While);
        assert_eq!(do_stat(&graph, stat).condition, Some(condition));
        assert_eq!(graph[stat].first, Some(inner));
        assert_eq!(graph[inner].parent, Some(stat));
        assert!(matches!(graph[stat].kind, StatKind::Do(_)));
    }

    proptest! {
        #[test]
        fn rewrites_keep_offsets(
            offsets in prop::collection::vec(0u32..200, 1..40),
            shape in 0usize..4,
        ) {
            let LoopShape { mut graph, .. } = match shape {
                0 => counting_loop(),
                1 => iterator_loop(),
                2 => array_loop(false),
                _ => array_loop(true),
            };
            let exprs: Vec<ExprId> = graph
                .exprents_in(graph.root())
                .into_iter()
                .flat_map(|expr| graph.expr_tree(expr))
                .collect();
            for (expr, offset) in exprs.into_iter().zip(offsets.iter().cycle()) {
                graph.offsets_mut(expr).insert(*offset);
            }
            let before = all_offsets(&graph);
            enhance_loops(&mut graph, &DecompilerOptions::default());
            prop_assert!(all_offsets(&graph).is_superset(&before));
        }
    }
}
