use super::{clean_empty_statements, last_direct_data, preceding_data, set_loop_kind};
use crate::ast::{Direction, EdgeKinds, Exprent, LoopKind, StatId, StatementGraph};
use crate::options::DecompilerOptions;

/// `init; while (c) { ...; step; }` becomes `for (init; c; step) { ... }`.
///
/// `init` has to be an assignment ending the statement right before the loop, `step` an
/// assignment or increment ending the body. When `options.accept_single_increment` is set, a body
/// consisting of a lone expression that several paths run into is taken as the increment even
/// without an init.
pub(super) fn match_for(
    graph: &mut StatementGraph,
    stat: StatId,
    options: &DecompilerOptions,
) -> bool {
    let Some(body) = graph[stat].first else {
        return false;
    };
    let Some(last_data) = last_direct_data(graph, body) else {
        return false;
    };
    let Some(exprents) = graph[last_data].exprents.as_ref() else {
        return false;
    };
    let Some(&step) = exprents.last() else {
        return false;
    };

    let is_single = options.accept_single_increment
        && exprents.len() == 1
        && graph[last_data].predecessors.len() > 1;
    let has_step = is_single
        || match &graph[step] {
            Exprent::Assignment { .. } => true,
            Exprent::Function { kind, .. } => kind.is_increment(),
            _ => false,
        };
    if !has_step {
        return false;
    }

    let init = preceding_data(graph, stat, true).and_then(|pre_data| {
        let init = graph.last_exprent(pre_data)?;
        matches!(graph[init], Exprent::Assignment { .. }).then_some((pre_data, init))
    });
    if init.is_none() && !is_single {
        return false;
    }

    let mut continues = graph.neighbours_set(stat, EdgeKinds::CONTINUE, Direction::Backward);
    continues.remove(&last_data);
    if !continues.is_empty() {
        log::trace!("Loop {stat}: a continue skips the increment");
        return false;
    }

    set_loop_kind(graph, stat, LoopKind::For);
    let do_stat = graph[stat].as_loop().cloned();
    if let Some((pre_data, init)) = init {
        graph.remove_exprent(pre_data, init);
        if let Some(old) = do_stat.as_ref().and_then(|do_stat| do_stat.init) {
            graph.absorb_offsets(init, old);
        }
        if let Some(do_stat) = graph[stat].as_loop_mut() {
            do_stat.init = Some(init);
        }
    }
    graph.remove_exprent(last_data, step);
    if let Some(old) = do_stat.and_then(|do_stat| do_stat.increment) {
        graph.absorb_offsets(step, old);
    }
    if let Some(do_stat) = graph[stat].as_loop_mut() {
        do_stat.increment = Some(step);
    }

    clean_empty_statements(graph, stat, last_data);
    true
}
