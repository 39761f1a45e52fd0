//! Unification of variable versions that denote one source variable.

use super::{Finality, VarProcessor, VarVersionPair};
use crate::ast::{ConstValue, ExprId, Exprent, StatId, StatementGraph, VarType};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Attempted to remap variable {0} onto itself")]
    SelfRemap(VarVersionPair),
}

// Type bounds of a pair. Inference results take precedence over declared types, which in turn take
// precedence over whatever the occurrences themselves were typed as.
fn min_type(
    graph: &StatementGraph,
    processor: &VarProcessor,
    pair: VarVersionPair,
) -> Option<VarType> {
    if let Some(ty) = processor.min_type(pair).or_else(|| processor.var_type(pair)) {
        return Some(ty.clone());
    }
    graph.exprents_in(graph.root()).into_iter().find_map(|top| {
        graph
            .vars_in(top)
            .filter_map(|expr| graph[expr].as_var())
            .find(|var| var.pair() == pair)
            .map(|var| var.ty.clone())
    })
}

/// Type the two pairs would share after a merge, if any.
pub fn merged_type(
    graph: &StatementGraph,
    processor: &VarProcessor,
    from: VarVersionPair,
    to: VarVersionPair,
) -> Option<VarType> {
    VarType::merged(
        min_type(graph, processor, from).as_ref(),
        min_type(graph, processor, to).as_ref(),
        processor.max_type(from),
        processor.max_type(to),
    )
}

// Removes `expr` from `list`, handing its offsets to a neighbour so that they survive.
fn drop_from_list(graph: &mut StatementGraph, list: &mut Vec<ExprId>, position: usize) {
    let expr = list.remove(position);
    let neighbour = list.get(position).or(position.checked_sub(1).and_then(|p| list.get(p)));
    if let Some(neighbour) = neighbour.copied() {
        graph.absorb_offsets(neighbour, expr);
    }
}

/// Rewrites every occurrence of `from` into `to`, reconciling their types.
///
/// Returns `Ok(false)` without touching anything if the types are incompatible or `from` doesn't
/// occur at all.
pub fn remap_var(
    graph: &mut StatementGraph,
    processor: &mut VarProcessor,
    from: VarVersionPair,
    to: VarVersionPair,
) -> Result<bool, MergeError> {
    if from == to {
        return Err(MergeError::SelfRemap(from));
    }
    let Some(merged) = merged_type(graph, processor, from, to) else {
        log::trace!("Not merging {from} into {to}: no common type");
        return Ok(false);
    };

    let mut constants = Vec::new();
    let mut occurrences = Vec::new();
    // Whether each side has a store of its own, not counting copies between the two.
    let (mut from_stored, mut to_stored) = (false, false);
    let mut declarations: Vec<(StatId, Vec<ExprId>)> = Vec::new();
    for stat in graph.statements() {
        let mut touched = Vec::new();
        for top in graph.own_exprents(stat) {
            for expr in graph.expr_tree(top) {
                match &graph[expr] {
                    Exprent::Assignment { left, right } => {
                        let left_pair = graph[*left].as_var().map(|var| var.pair());
                        let right_pair = graph[*right].as_var().map(|var| var.pair());
                        if right_pair != Some(from) && right_pair != Some(to) {
                            from_stored |= left_pair == Some(from);
                            to_stored |= left_pair == Some(to);
                        }
                        if let Some(left_pair) = left_pair
                            && (left_pair == from || left_pair == to)
                            && let Exprent::Const { value, .. } = &graph[*right]
                            && *value != ConstValue::Null
                        {
                            constants.push(*right);
                        }
                    }
                    Exprent::Var(var) if var.pair() == from => {
                        occurrences.push(expr);
                        if expr == top {
                            touched.push(expr);
                        }
                    }
                    _ => {}
                }
            }
        }
        declarations.push((stat, touched));
    }
    if occurrences.is_empty() {
        log::trace!("Not merging {from} into {to}: no occurrences");
        return Ok(false);
    }

    for expr in occurrences {
        if let Some(var) = graph[expr].as_var_mut() {
            var.index = to.index;
            var.version = to.version;
            var.ty = merged.clone();
            var.is_definition = false;
        }
    }
    for expr in constants {
        if let Exprent::Const { ty, .. } = &mut graph[expr] {
            *ty = merged.clone();
        }
    }

    // A bare reference left at the top level of a leaf was a declaration of `from`. It would now
    // redeclare `to`.
    for (stat, touched) in declarations {
        if touched.is_empty() || !graph[stat].is_leaf() {
            continue;
        }
        let mut exprents = graph[stat].exprents.take().unwrap_or_default();
        while let Some(position) = exprents.iter().position(|expr| touched.contains(expr)) {
            drop_from_list(graph, &mut exprents, position);
        }
        graph[stat].exprents = Some(exprents);
    }

    for stat in graph.statements() {
        let mut definitions = core::mem::take(&mut graph[stat].var_definitions);
        while let Some(position) = definitions
            .iter()
            .position(|expr| graph[*expr].as_var().is_some_and(|var| var.pair() == from))
        {
            drop_from_list(graph, &mut definitions, position);
        }
        for expr in &definitions {
            if let Some(var) = graph[*expr].as_var_mut()
                && var.pair() == to
            {
                var.ty = merged.clone();
            }
        }
        graph[stat].var_definitions = definitions;
    }

    let finality = if from_stored && to_stored {
        Finality::NonFinal
    } else {
        processor.finality(from).merged(processor.finality(to))
    };
    processor.set_finality(to, finality);
    processor.set_min_type(to, merged.clone());
    processor.set_var_type(to, merged);
    if processor.var_lvt(to).is_none()
        && let Some(lvt) = processor.var_lvt(from).cloned()
    {
        processor.set_var_lvt(to, lvt);
    }
    processor.record_remap(from, to);
    log::debug!("Merged variable {from} into {to}");
    Ok(true)
}

// Statement and top-level position of every occurrence of a pair. Positions are `None` outside of
// leaf expression lists.
type Occurrences = FxHashMap<VarVersionPair, Vec<(StatId, Option<usize>)>>;

fn occurrence_map(graph: &StatementGraph) -> Occurrences {
    let mut map = Occurrences::default();
    for stat in graph.statements() {
        let leaf = graph[stat].exprents.as_deref();
        let tops: Vec<(ExprId, Option<usize>)> = match leaf {
            Some(exprents) => exprents
                .iter()
                .enumerate()
                .map(|(i, expr)| (*expr, Some(i)))
                .collect(),
            None => graph.own_exprents(stat).into_iter().map(|expr| (expr, None)).collect(),
        };
        let definitions = graph[stat].var_definitions.iter().map(|expr| (*expr, None));
        for (top, position) in tops.into_iter().chain(definitions) {
            for var in graph.vars_in(top) {
                if let Some(var) = graph[var].as_var() {
                    map.entry(var.pair()).or_default().push((stat, position));
                }
            }
        }
    }
    map
}

fn assigned_var(graph: &StatementGraph, expr: ExprId) -> Option<(VarVersionPair, ExprId)> {
    match graph[expr] {
        Exprent::Assignment { left, right } => Some((graph[left].as_var()?.pair(), right)),
        _ => None,
    }
}

// Orders a candidate so that the later-numbered pair goes away.
fn ordered(a: VarVersionPair, b: VarVersionPair) -> (VarVersionPair, VarVersionPair) {
    if a > b { (a, b) } else { (b, a) }
}

fn find_candidate(
    graph: &StatementGraph,
    processor: &VarProcessor,
    blacklist: &FxHashSet<(VarVersionPair, VarVersionPair)>,
) -> Option<(VarVersionPair, VarVersionPair)> {
    let occurrences = occurrence_map(graph);
    let allowed = |candidate: (VarVersionPair, VarVersionPair)| {
        (!blacklist.contains(&candidate)).then_some(candidate)
    };

    for stat in graph.statements() {
        let Some(exprents) = graph[stat].exprents.as_deref() else {
            continue;
        };
        for (k, expr) in exprents.iter().enumerate() {
            let Some((left, right)) = assigned_var(graph, *expr) else {
                continue;
            };
            let slot = processor.remapped(left.index);

            // `a = b` between two versions of one slot.
            if let Some(source) = graph[right].as_var().map(|var| var.pair())
                && source != left
                && processor.remapped(source.index) == slot
                && let Some(candidate) = allowed(ordered(left, source))
            {
                return Some(candidate);
            }

            if !matches!(graph[right], Exprent::Var(_) | Exprent::Const { .. }) {
                continue;
            }
            // `a = <simple value>` right after another version of the slot died in the same block.
            for (other, places) in &occurrences {
                if *other == left || processor.remapped(other.index) != slot {
                    continue;
                }
                let Some(first) = places
                    .iter()
                    .map(|(place, position)| (*place == stat).then_some(*position).flatten())
                    .collect::<Option<Vec<usize>>>()
                    .and_then(|positions| positions.into_iter().min())
                else {
                    continue;
                };
                let dies_before = places
                    .iter()
                    .all(|(_, position)| position.is_some_and(|p| p < k));
                let defined_first =
                    assigned_var(graph, exprents[first]).is_some_and(|(pair, _)| pair == *other);
                let left_untouched = occurrences[&left]
                    .iter()
                    .all(|(place, position)| *place != stat || position.is_none_or(|p| p >= k))
                    && !graph.vars_in(right).any(|var| {
                        graph[var].as_var().is_some_and(|var| var.pair() == left)
                    });
                if dies_before
                    && defined_first
                    && left_untouched
                    && let Some(candidate) = allowed(ordered(left, *other))
                {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

// Drops `v = v` assignments that merges leave behind.
fn remove_self_assignments(graph: &mut StatementGraph) {
    for stat in graph.statements() {
        let Some(mut exprents) = graph[stat].exprents.take() else {
            continue;
        };
        let mut position = 0;
        while position < exprents.len() {
            let is_self = match graph[exprents[position]] {
                Exprent::Assignment { left, right } => matches!(
                    (graph[left].as_var(), graph[right].as_var()),
                    (Some(l), Some(r)) if l.pair() == r.pair()
                ),
                _ => false,
            };
            if is_self && exprents.len() > 1 {
                drop_from_list(graph, &mut exprents, position);
            } else {
                position += 1;
            }
        }
        graph[stat].exprents = Some(exprents);
    }
}

/// Merges versions connected by copies and simple reassignments until nothing changes. Returns
/// the number of merges applied.
pub fn merge_copies(
    graph: &mut StatementGraph,
    processor: &mut VarProcessor,
) -> Result<usize, MergeError> {
    let mut blacklist = FxHashSet::default();
    let mut merged = 0;
    while let Some((from, to)) = find_candidate(graph, processor, &blacklist) {
        if remap_var(graph, processor, from, to)? {
            merged += 1;
            remove_self_assignments(graph);
        } else {
            blacklist.insert((from, to));
        }
    }
    Ok(merged)
}
