//! Shorthands for assembling statement graphs in tests.

use crate::ast::{
    ConstValue, ExprId, Exprent, FunctionKind, Invocation, StatementGraph, VarExprent, VarType,
};

pub fn var(graph: &mut StatementGraph, index: u32, version: u32, ty: VarType) -> ExprId {
    graph.alloc_expr(Exprent::Var(VarExprent::new(index, version, ty)))
}

pub fn int_var(graph: &mut StatementGraph, index: u32) -> ExprId {
    var(graph, index, 0, VarType::int())
}

pub fn int(graph: &mut StatementGraph, value: i64) -> ExprId {
    graph.alloc_expr(Exprent::Const {
        ty: VarType::int(),
        value: ConstValue::Int(value),
    })
}

pub fn assign(graph: &mut StatementGraph, left: ExprId, right: ExprId) -> ExprId {
    graph.alloc_expr(Exprent::Assignment { left, right })
}

pub fn function(graph: &mut StatementGraph, kind: FunctionKind, operands: Vec<ExprId>) -> ExprId {
    graph.alloc_expr(Exprent::Function { kind, operands })
}

pub fn call(
    graph: &mut StatementGraph,
    instance: Option<ExprId>,
    class: &str,
    name: &str,
    descriptor: &str,
    arguments: Vec<ExprId>,
) -> ExprId {
    graph.alloc_expr(Exprent::Invocation(Invocation {
        class: class.into(),
        name: name.into(),
        descriptor: descriptor.into(),
        instance,
        arguments,
    }))
}

pub fn if_head(graph: &mut StatementGraph, condition: ExprId) -> ExprId {
    graph.alloc_expr(Exprent::If { condition })
}

/// Every offset carried by any expression reachable from the root.
pub fn all_offsets(graph: &StatementGraph) -> crate::ast::BytecodeOffsets {
    let mut offsets = crate::ast::BytecodeOffsets::new();
    for expr in graph.exprents_in(graph.root()) {
        offsets.union_with(&graph.tree_offsets(expr));
    }
    offsets
}
