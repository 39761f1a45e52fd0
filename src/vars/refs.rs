//! Occurrence queries over statement subtrees.

use super::VarVersionPair;
use crate::ast::{ExprId, Exprent, SeqItem, StatId, StatementGraph};

fn pair_of(graph: &StatementGraph, expr: ExprId) -> Option<VarVersionPair> {
    graph[expr].as_var().map(|var| var.pair())
}

/// Whether the variable `target` (a `Var` node) occurs anywhere in `stat` other than at `target`
/// itself and at the whitelisted nodes.
pub fn is_var_referenced(
    graph: &StatementGraph,
    target: ExprId,
    stat: StatId,
    whitelist: &[ExprId],
) -> bool {
    graph
        .sequential_objects(stat)
        .into_iter()
        .any(|item| match item {
            SeqItem::Stat(child) => is_var_referenced(graph, target, child, whitelist),
            SeqItem::Expr(expr) => is_var_referenced_in(graph, target, expr, whitelist),
        })
}

pub fn is_var_referenced_in(
    graph: &StatementGraph,
    target: ExprId,
    expr: ExprId,
    whitelist: &[ExprId],
) -> bool {
    let Some(pair) = pair_of(graph, target) else {
        return false;
    };
    graph.vars_in(expr).any(|var| {
        var != target && !whitelist.contains(&var) && pair_of(graph, var) == Some(pair)
    })
}

/// Whether `pair` is read by some item of `stat` at position `index` or later. Being the target of
/// an assignment doesn't count as a read.
pub fn is_var_read_first(
    graph: &StatementGraph,
    pair: VarVersionPair,
    stat: StatId,
    index: usize,
    whitelist: &[ExprId],
) -> bool {
    graph
        .sequential_objects(stat)
        .into_iter()
        .skip(index)
        .any(|item| match item {
            SeqItem::Stat(child) => is_var_read_first(graph, pair, child, 0, whitelist),
            SeqItem::Expr(expr) => is_var_read_in(graph, pair, expr, whitelist),
        })
}

fn is_var_read_in(
    graph: &StatementGraph,
    pair: VarVersionPair,
    expr: ExprId,
    whitelist: &[ExprId],
) -> bool {
    let assigned = match graph[expr] {
        Exprent::Assignment { left, .. } => Some(left),
        _ => None,
    };
    graph.vars_in(expr).any(|var| {
        Some(var) != assigned && !whitelist.contains(&var) && pair_of(graph, var) == Some(pair)
    })
}
