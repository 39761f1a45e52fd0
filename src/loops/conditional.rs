use super::{
    is_direct_path, lift_exit_edge, low_closures, remove_last_empty_statement, replace_condition,
    set_loop_kind,
};
use crate::ast::{
    Direction, EdgeKind, EdgeKinds, ExprId, Exprent, IfType, LoopKind, StatId, StatKind,
    StatementGraph,
};

// Head of an `if` statement and the condition it tests.
fn if_condition(graph: &StatementGraph, if_stat: StatId) -> Option<(ExprId, ExprId)> {
    let head = graph[if_stat].as_if()?.head;
    match graph[head] {
        Exprent::If { condition } => Some((head, condition)),
        _ => None,
    }
}

/// `do { if (c) break; ... }` becomes `while (!c) { ... }`, and `do { if (c) { ... } else break; }`
/// (an `if` without `else` whose fallthrough leaves the loop) becomes `while (c) { ... }`.
pub(super) fn match_while(graph: &mut StatementGraph, stat: StatId) -> bool {
    let Some(mut first) = graph[stat].first else {
        return false;
    };
    while matches!(graph[first].kind, StatKind::Sequence) {
        let Some(inner) = graph[first].first else {
            return false;
        };
        first = inner;
    }

    let Some(if_stat) = graph[first].as_if().cloned() else {
        return false;
    };
    let Some(head_block) = graph[first].first else {
        return false;
    };
    if !graph[head_block].has_empty_exprents() || if_stat.if_type != IfType::If {
        return false;
    }
    let Some((head, condition)) = if_condition(graph, first) else {
        return false;
    };
    let Some(if_edge) = graph.if_edge(first) else {
        return false;
    };
    let Some(else_edge) = graph
        .successor_edges(first, EdgeKinds::DIRECT_ALL)
        .first()
        .copied()
    else {
        return false;
    };

    match if_stat.if_stat {
        None => {
            let exit = graph[if_edge].destination;
            if !is_direct_path(graph, stat, exit) {
                log::trace!("Loop {stat}: leading break doesn't leave the loop directly");
                return false;
            }
            set_loop_kind(graph, stat, LoopKind::While);
            let condition = graph.negate(condition);
            replace_condition(graph, stat, condition, head);

            graph.detach_edge(if_edge);
            graph.detach_edge(else_edge);
            lift_exit_edge(graph, stat, if_edge);

            if graph[stat].first == Some(first) {
                let block = graph.basic_block(Vec::new());
                graph.replace_statement(stat, first, block);
            } else {
                // The guard starts a sequence with more statements after it.
                graph.remove_statement(first);
            }
        }
        Some(body) => {
            let exit = graph[else_edge].destination;
            if !is_direct_path(graph, stat, exit) {
                log::trace!("Loop {stat}: guard fallthrough doesn't leave the loop directly");
                return false;
            }
            set_loop_kind(graph, stat, LoopKind::While);
            replace_condition(graph, stat, condition, head);

            graph.detach_edge(if_edge);
            graph.detach_edge(else_edge);
            lift_exit_edge(graph, stat, else_edge);

            let Some(parent) = graph[first].parent else {
                return true;
            };
            graph.remove_child(first, body);
            graph.replace_statement(parent, first, body);

            for edge in graph.predecessor_edges(exit, EdgeKinds::BREAK) {
                if let Some(closure) = graph[edge].closure
                    && graph.contains_strict(stat, closure)
                {
                    graph.add_labeled_edge(stat, edge);
                }
            }
            low_closures(graph, stat);
        }
    }
    true
}

/// `do { ...; if (c) continue; break; }` becomes `do { ... } while (c)`, and the mirrored
/// `if (c) break;` with a continuing fallthrough becomes `do { ... } while (!c)`.
pub(super) fn match_do_while(graph: &mut StatementGraph, stat: StatId) -> bool {
    let Some(mut last) = graph[stat].first else {
        return false;
    };
    while matches!(graph[last].kind, StatKind::Sequence) {
        let Some(inner) = graph[last].children.last().copied() else {
            return false;
        };
        last = inner;
    }

    let Some(if_stat) = graph[last].as_if() else {
        return false;
    };
    if if_stat.if_type != IfType::If || if_stat.if_stat.is_some() {
        return false;
    }
    let Some(head_block) = graph[last].first else {
        return false;
    };
    let Some((head, condition)) = if_condition(graph, last) else {
        return false;
    };
    let (Some(if_edge), Some(else_edge)) = (
        graph.if_edge(last),
        graph
            .successor_edges(last, EdgeKinds::DIRECT_ALL)
            .first()
            .copied(),
    ) else {
        return false;
    };

    let (if_kind, else_kind) = (graph[if_edge].kind, graph[else_edge].kind);
    let breaks_on_true = if_kind == EdgeKind::Break
        && else_kind == EdgeKind::Continue
        && graph[else_edge].closure == Some(stat)
        && is_direct_path(graph, stat, graph[if_edge].destination);
    let continues_on_true = if_kind == EdgeKind::Continue
        && else_kind == EdgeKind::Break
        && graph[if_edge].closure == Some(stat)
        && is_direct_path(graph, stat, graph[else_edge].destination);
    if !breaks_on_true && !continues_on_true {
        return false;
    }

    // Any other `continue` would skip the condition once it moves to the end of the loop.
    let mut continues = graph.neighbours_set(stat, EdgeKinds::CONTINUE, Direction::Backward);
    continues.remove(&last);
    continues.remove(&head_block);
    if !continues.is_empty() {
        log::trace!("Loop {stat}: other continue edges prevent a trailing condition");
        return false;
    }

    set_loop_kind(graph, stat, LoopKind::DoWhile);
    let condition = if breaks_on_true {
        graph.negate(condition)
    } else {
        condition
    };
    replace_condition(graph, stat, condition, head);
    graph.detach_edge(if_edge);
    graph.detach_edge(else_edge);

    if graph[head_block].has_empty_exprents() {
        remove_last_empty_statement(graph, stat, last);
    } else if let Some(parent) = graph[last].parent {
        // Whatever the head block evaluates before the test stays at the end of the body.
        graph.remove_child(last, head_block);
        graph.replace_statement(parent, last, head_block);
        graph.add_edge(EdgeKind::Continue, head_block, stat, Some(stat));
    }

    let exit = if else_kind == EdgeKind::Continue {
        if_edge
    } else {
        else_edge
    };
    lift_exit_edge(graph, stat, exit);
    true
}
