use crate::ast::{Exprent, StatId, StatKind, StatementGraph};
use crate::vars::refs::is_var_referenced;

/// Drops the dead copy of the monitor object that `monitorenter` sequences leave in the head block
/// of `synchronized` statements. Returns the number of assignments removed.
pub fn clean_synchronized_vars(graph: &mut StatementGraph) -> usize {
    let root = graph.root();
    graph
        .statements_post_order(root)
        .into_iter()
        .filter(|stat| clean_synchronized_var(graph, *stat))
        .count()
}

fn clean_synchronized_var(graph: &mut StatementGraph, stat: StatId) -> bool {
    let StatKind::Synchronized(sync) = &graph[stat].kind else {
        return false;
    };
    let Some(head) = sync.head else {
        return false;
    };
    let Exprent::Monitor { value, .. } = graph[head] else {
        return false;
    };
    let (Some(head_block), Some(parent)) = (graph[stat].first, graph[stat].parent) else {
        return false;
    };

    let Some(exprents) = graph[head_block].exprents.clone() else {
        return false;
    };
    for expr in exprents {
        let Exprent::Assignment { left, right } = graph[expr] else {
            continue;
        };
        if graph[left].as_var().is_none()
            || !graph.expr_equals(right, value)
            || is_var_referenced(graph, left, parent, &[])
        {
            continue;
        }
        graph.remove_exprent(head_block, expr);
        graph.absorb_offsets(head, expr);
        log::trace!("Dropped monitor copy {} from {stat}", graph.debug(&expr));
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{MonitorKind, VarType};
    use crate::testing::{all_offsets, assign, call, var};

    fn lock_field(graph: &mut StatementGraph) -> crate::ast::ExprId {
        graph.alloc_expr_at(
            Exprent::Field {
                instance: None,
                class: "Foo".into(),
                name: "LOCK".into(),
                descriptor: "Ljava/lang/Object;".into(),
            },
            [3],
        )
    }

    // synchronized (Foo.LOCK) { sink(); }, with `v = Foo.LOCK` left in the head block.
    fn build(use_copy_later: bool) -> (StatementGraph, StatId) {
        let mut graph = StatementGraph::new();
        let copy = var(&mut graph, 4, 0, VarType::java_object());
        let field = lock_field(&mut graph);
        let store = graph.alloc_expr_at(Exprent::Assignment { left: copy, right: field }, [4]);
        let head_block = graph.basic_block(vec![store]);
        let field = lock_field(&mut graph);
        let monitor = graph.alloc_expr_at(
            Exprent::Monitor {
                kind: MonitorKind::Enter,
                value: field,
            },
            [6],
        );
        let sink = call(&mut graph, None, "Sink", "sink", "()V", Vec::new());
        let body = graph.basic_block(vec![sink]);
        let sync = graph.synchronized(head_block, Some(monitor), body);
        let mut children = vec![sync];
        if use_copy_later {
            let copy = var(&mut graph, 4, 0, VarType::java_object());
            let other = var(&mut graph, 5, 0, VarType::java_object());
            let reuse = assign(&mut graph, other, copy);
            children.push(graph.basic_block(vec![reuse]));
        }
        let seq = graph.sequence(children);
        graph.set_root_body(seq);
        (graph, head_block)
    }

    #[test]
    fn dead_monitor_copy_is_dropped() {
        let (mut graph, head_block) = build(false);
        let offsets = all_offsets(&graph);
        assert_eq!(clean_synchronized_vars(&mut graph), 1);
        assert!(graph[head_block].has_empty_exprents());
        assert!(all_offsets(&graph).is_superset(&offsets));
        assert_eq!(clean_synchronized_vars(&mut graph), 0);
    }

    #[test]
    fn live_monitor_copy_is_kept() {
        let (mut graph, head_block) = build(true);
        assert_eq!(clean_synchronized_vars(&mut graph), 0);
        assert_eq!(graph[head_block].exprents.as_ref().map(Vec::len), Some(1));
    }
}
