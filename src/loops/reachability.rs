use crate::ast::{Direction, EdgeKind, EdgeKinds, StatId, StatKind, StatementGraph};

/// Whether control falls from `from` into `to` without taking a labeled jump.
///
/// A statement without regular successors of its own exits through its parent, so the question
/// is passed upwards: leaving a loop body repeats the loop, leaving a switch case falls into the
/// next case, leaving the method body reaches the synthetic exit.
pub fn is_direct_path(graph: &StatementGraph, from: StatId, to: StatId) -> bool {
    let mut stat = from;
    loop {
        // Labeled jumps are not fallthrough: break and continue edges are left out along with
        // exception edges.
        let successors = graph.neighbours_set(stat, EdgeKinds::REGULAR, Direction::Forward);
        if !successors.is_empty() {
            return successors.contains(&to);
        }

        let Some(parent) = graph[stat].parent else {
            return false;
        };
        match &graph[parent].kind {
            StatKind::Root(_) => return to == graph.dummy_exit(),
            StatKind::Do(_) => return to == parent,
            StatKind::Switch(switch) => {
                // The last case, like any statement outside the case list, leaves the switch
                // itself.
                let cases = &switch.cases;
                if let Some(i) = cases[..cases.len().saturating_sub(1)]
                    .iter()
                    .position(|case| *case == stat)
                {
                    let mut next = cases[i + 1];
                    if graph[next].has_empty_exprents()
                        && let Some(edge) = graph[next].successors.first()
                    {
                        next = graph[*edge].destination;
                    }
                    return to == next;
                }
            }
            _ => {}
        }
        stat = parent;
    }
}

/// Pushes the closures of breaks labeled by `stat` down to the innermost child that still reaches
/// the break target by falling through, then recurses into the children.
pub fn low_closures(graph: &mut StatementGraph, stat: StatId) {
    let mut stack = vec![stat];
    while let Some(stat) = stack.pop() {
        for edge in graph[stat].labeled_edges.clone() {
            if graph[edge].kind != EdgeKind::Break {
                continue;
            }
            for child in graph[stat].children.clone() {
                let (source, destination) = (graph[edge].source, graph[edge].destination);
                if graph.contains_strict(child, source) && is_direct_path(graph, child, destination)
                {
                    graph.add_labeled_edge(child, edge);
                }
            }
        }
        stack.extend(graph[stat].children.iter().rev());
    }
}
