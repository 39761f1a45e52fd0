use super::{first_direct_data, last_direct_data, preceding_data, set_loop_kind};
use crate::ast::{
    ConstValue, ExprId, Exprent, FunctionKind, Invocation, LoopKind, StatId, StatementGraph,
};
use crate::vars::refs::is_var_referenced;

const ITERATOR: &str = "java/util/Iterator";
const LIST_ITERATOR: &str = "java/util/ListIterator";

fn invocation(graph: &StatementGraph, expr: ExprId) -> Option<&Invocation> {
    match &graph[graph.uncast(expr)] {
        Exprent::Invocation(invocation) => Some(invocation),
        _ => None,
    }
}

fn is_invocation(
    graph: &StatementGraph,
    expr: ExprId,
    classes: &[&str],
    name: &str,
    descriptor: &str,
) -> bool {
    invocation(graph, expr).is_some_and(|invocation| {
        (classes.is_empty() || classes.contains(&invocation.class.as_str()))
            && invocation.name == name
            && invocation.descriptor == descriptor
    })
}

fn is_iterator_call(graph: &StatementGraph, expr: ExprId) -> bool {
    is_invocation(graph, expr, &[], "iterator", "()Ljava/util/Iterator;")
        || is_invocation(graph, expr, &[], "listIterator", "()Ljava/util/ListIterator;")
}

fn is_has_next_call(graph: &StatementGraph, expr: ExprId) -> bool {
    is_invocation(graph, expr, &[ITERATOR, LIST_ITERATOR], "hasNext", "()Z")
}

fn is_next_call(graph: &StatementGraph, expr: ExprId) -> bool {
    is_invocation(graph, expr, &[ITERATOR, LIST_ITERATOR], "next", "()Ljava/lang/Object;")
}

fn assignment(graph: &StatementGraph, expr: ExprId) -> Option<(ExprId, ExprId)> {
    match graph[expr] {
        Exprent::Assignment { left, right } => Some((left, right)),
        _ => None,
    }
}

fn same_var(graph: &StatementGraph, a: ExprId, b: ExprId) -> bool {
    match (graph[a].as_var(), graph[b].as_var()) {
        (Some(a), Some(b)) => a.pair() == b.pair(),
        _ => false,
    }
}

fn function(graph: &StatementGraph, expr: ExprId) -> Option<(FunctionKind, &[ExprId])> {
    match &graph[expr] {
        Exprent::Function { kind, operands } => Some((*kind, operands)),
        _ => None,
    }
}

// Statements and expressions a foreach match consumes.
struct Candidate {
    stat: StatId,
    pre_data: StatId,
    // Trailing assignments of `pre_data`, last one first.
    inits: [Option<ExprId>; 3],
    first_data: StatId,
    fetch: ExprId,
    last: Option<(StatId, ExprId)>,
}

/// Recognizes the two lowerings of the enhanced `for` statement in a `while` loop:
///
/// ```text
/// Iterator it = c.iterator();            T[] copy = a; int len = copy.length; int i = 0;
/// while (it.hasNext()) {                 while (i < len) {
///     T x = (T) it.next();                   T x = copy[i];
///     ...                                    ...; i++;
/// }                                      }
/// ```
///
/// The loop's init becomes the element variable and its increment the iterated expression.
pub(super) fn match_foreach(graph: &mut StatementGraph, stat: StatId) -> bool {
    let Some(candidate) = find_candidate(graph, stat) else {
        return false;
    };
    let Some(init) = candidate.inits[0] else {
        return false;
    };
    let Some((_, init_value)) = assignment(graph, init) else {
        return false;
    };
    if is_iterator_call(graph, init_value) {
        match_iterator(graph, &candidate)
    } else {
        match_array(graph, &candidate)
    }
}

fn find_candidate(graph: &StatementGraph, stat: StatId) -> Option<Candidate> {
    let do_stat = graph[stat].as_loop()?;
    if do_stat.loop_kind != LoopKind::While {
        return None;
    }

    let pre_data = preceding_data(graph, stat, false)?;
    let pre_exprents = graph[pre_data].exprents.as_ref()?;
    let mut inits = [None; 3];
    for (slot, expr) in inits.iter_mut().zip(pre_exprents.iter().rev()) {
        if assignment(graph, *expr).is_some() {
            *slot = Some(*expr);
        }
    }

    let body = graph[stat].first?;
    let first_data = first_direct_data(graph, body)?;
    let fetch = *graph[first_data].exprents.as_ref()?.first()?;
    assignment(graph, fetch)?;
    let last = last_direct_data(graph, body)
        .and_then(|leaf| Some((leaf, graph.last_exprent(leaf)?)));

    Some(Candidate {
        stat,
        pre_data,
        inits,
        first_data,
        fetch,
        last,
    })
}

fn set_slots(graph: &mut StatementGraph, stat: StatId, element: ExprId, iterable: ExprId) {
    let do_stat = graph[stat].as_loop().cloned();
    if let Some(do_stat) = do_stat {
        if let Some(old) = do_stat.init {
            graph.absorb_offsets(element, old);
        }
        if let Some(old) = do_stat.increment {
            graph.absorb_offsets(iterable, old);
        }
        // The exit test is implied by the loop form.
        if let Some(old) = do_stat.condition {
            graph.absorb_offsets(element, old);
        }
    }
    set_loop_kind(graph, stat, LoopKind::ForEach);
    if let Some(do_stat) = graph[stat].as_loop_mut() {
        do_stat.init = Some(element);
        do_stat.increment = Some(iterable);
        do_stat.condition = None;
    }
}

fn match_iterator(graph: &mut StatementGraph, candidate: &Candidate) -> bool {
    let stat = candidate.stat;
    let Some(init) = candidate.inits[0] else {
        return false;
    };
    let Some(condition) = graph[stat].as_loop().and_then(|do_stat| do_stat.condition) else {
        return false;
    };
    let has_next = graph.drill_nots(condition);
    if !is_has_next_call(graph, has_next) {
        return false;
    }
    let Some((element, next)) = assignment(graph, candidate.fetch) else {
        return false;
    };
    if !is_next_call(graph, next) || graph[element].as_var().is_none() {
        return false;
    }
    let Some((holder, iterator)) = assignment(graph, init) else {
        return false;
    };

    let (Some(next_on), Some(has_next_on), Some(iterable)) = (
        invocation(graph, next).and_then(|invocation| invocation.instance),
        invocation(graph, has_next).and_then(|invocation| invocation.instance),
        invocation(graph, iterator).and_then(|invocation| invocation.instance),
    ) else {
        return false;
    };
    if !same_var(graph, holder, next_on) || !same_var(graph, holder, has_next_on) {
        return false;
    }
    if is_var_referenced(graph, holder, stat, &[next_on, has_next_on]) {
        log::trace!("Loop {stat}: iterator is used outside of hasNext/next");
        return false;
    }

    graph.absorb_offsets(iterable, init);
    graph.absorb_offsets(element, candidate.fetch);
    set_slots(graph, stat, element, iterable);
    graph.remove_exprent(candidate.pre_data, init);
    graph.remove_exprent(candidate.first_data, candidate.fetch);
    true
}

fn match_array(graph: &mut StatementGraph, candidate: &Candidate) -> bool {
    let stat = candidate.stat;
    let [Some(counter_init), Some(length_init), copy_init] = candidate.inits else {
        return false;
    };
    let Some((element, fetched)) = assignment(graph, candidate.fetch) else {
        return false;
    };
    let Exprent::Array { array, index } = graph[fetched] else {
        return false;
    };
    if graph[element].as_var().is_none() {
        return false;
    }
    let Some((last_data, step)) = candidate.last else {
        return false;
    };
    let Some((FunctionKind::Ipp | FunctionKind::Ppi, &[counter])) = function(graph, step) else {
        return false;
    };

    let (Some((counter_var, start)), Some((_, length))) = (
        assignment(graph, counter_init),
        assignment(graph, length_init),
    ) else {
        return false;
    };
    if !matches!(
        graph[start],
        Exprent::Const {
            value: ConstValue::Int(0),
            ..
        }
    ) {
        return false;
    }
    let Some((FunctionKind::ArrayLength, &[length_of])) = function(graph, length) else {
        return false;
    };
    let Some(condition) = graph[stat].as_loop().and_then(|do_stat| do_stat.condition) else {
        return false;
    };
    if function(graph, condition).is_none() {
        return false;
    }
    if graph[array].as_var().is_none()
        || !same_var(graph, counter, index)
        || !same_var(graph, counter, counter_var)
    {
        return false;
    }
    let Some(body) = graph[stat].first else {
        return false;
    };
    if is_var_referenced(graph, counter, body, &[index]) {
        log::trace!("Loop {stat}: array index is used outside of the element fetch");
        return false;
    }

    graph.absorb_offsets(length_of, counter_init);
    graph.absorb_offsets(length_of, length_init);
    graph.absorb_offsets(length_of, step);
    graph.absorb_offsets(element, candidate.fetch);
    set_slots(graph, stat, element, length_of);
    graph.remove_exprent(candidate.pre_data, counter_init);
    graph.remove_exprent(candidate.pre_data, length_init);
    graph.remove_exprent(candidate.first_data, candidate.fetch);
    graph.remove_exprent(last_data, step);

    // `T[] copy = a;` made only for the loop folds back into `a`.
    if let Some(copy_init) = copy_init
        && let Some((copy, original)) = assignment(graph, copy_init)
        && same_var(graph, copy, array)
    {
        graph.remove_exprent(candidate.pre_data, copy_init);
        graph.absorb_offsets(original, copy_init);
        graph.absorb_offsets(original, length_of);
        if let Some(do_stat) = graph[stat].as_loop_mut() {
            do_stat.increment = Some(original);
        }
    }
    true
}
