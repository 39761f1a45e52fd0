use super::{BytecodeOffsets, DebugIr, ExprId, StatementGraph, VarType};
use crate::vars::{LvtVariable, VarVersionPair};
use core::fmt;
use displaydoc::Display;

#[derive(Clone, Debug)]
pub struct ExprNode {
    pub kind: Exprent,
    pub offsets: BytecodeOffsets,
}

#[derive(Clone, Debug)]
pub enum Exprent {
    Assignment {
        left: ExprId,
        right: ExprId,
    },
    Var(VarExprent),
    Const {
        ty: VarType,
        value: ConstValue,
    },
    Function {
        kind: FunctionKind,
        operands: Vec<ExprId>,
    },
    Invocation(Invocation),
    Array {
        array: ExprId,
        index: ExprId,
    },
    Field {
        // `None` for static fields
        instance: Option<ExprId>,
        class: String,
        name: String,
        descriptor: String,
    },
    // Head of an `if` statement. Kept as a separate node so that the offsets of the branch
    // instruction itself survive when the condition is moved elsewhere.
    If {
        condition: ExprId,
    },
    Monitor {
        kind: MonitorKind,
        value: ExprId,
    },
    Exit {
        kind: ExitKind,
        value: Option<ExprId>,
    },
    New {
        class: String,
        arguments: Vec<ExprId>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarExprent {
    pub index: u32,
    pub version: u32,
    pub ty: VarType,
    pub is_definition: bool,
    // Stack temporaries introduced by expression building rather than real locals.
    pub is_stack: bool,
    pub lvt: Option<LvtVariable>,
}

impl VarExprent {
    pub fn new(index: u32, version: u32, ty: VarType) -> Self {
        Self {
            index,
            version,
            ty,
            is_definition: false,
            is_stack: false,
            lvt: None,
        }
    }

    pub fn pair(&self) -> VarVersionPair {
        VarVersionPair::new(self.index, self.version)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Class(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub class: String,
    pub name: String,
    pub descriptor: String,
    // `None` for static calls
    pub instance: Option<ExprId>,
    pub arguments: Vec<ExprId>,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// +
    Add,
    /// -
    Sub,
    /// *
    #[displaydoc("*")]
    Mul,
    /// /
    Div,
    /// %
    Rem,
    /// &
    And,
    /// |
    Or,
    /// ^
    Xor,
    /// <<
    Shl,
    /// >>
    Shr,
    /// >>>
    Ushr,
    /// ~
    BitNot,
    /// !
    BoolNot,
    /// -
    Neg,
    /// cast
    Cast,
    /// instanceof
    InstanceOf,
    /// .length
    ArrayLength,
    /// --
    Imm,
    /// --
    Mmi,
    /// ++
    Ipp,
    /// ++
    Ppi,
    /// ?:
    Ternary,
    /// ==
    Eq,
    /// !=
    Ne,
    /// <
    Lt,
    /// >=
    Ge,
    /// >
    Gt,
    /// <=
    Le,
    /// &&
    CondAnd,
    /// ||
    CondOr,
}

impl FunctionKind {
    pub fn is_increment(self) -> bool {
        matches!(self, Self::Ipp | Self::Ppi | Self::Imm | Self::Mmi)
    }

    fn is_postfix(self) -> bool {
        matches!(self, Self::Ipp | Self::Imm)
    }

    fn is_prefix(self) -> bool {
        matches!(
            self,
            Self::BitNot | Self::BoolNot | Self::Neg | Self::Ppi | Self::Mmi
        )
    }
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum MonitorKind {
    /// monitorenter
    Enter,
    /// monitorexit
    Exit,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum ExitKind {
    /// return
    Return,
    /// throw
    Throw,
}

impl Exprent {
    // Direct subexpressions in evaluation order, not recursive. Same shape trick as statements: an
    // optional leading expression followed by a slice, so that every kind yields one iterator type.
    pub fn subexprs(&self) -> impl DoubleEndedIterator<Item = ExprId> + '_ {
        let (a, b): (Option<ExprId>, &[ExprId]) = match self {
            Self::Assignment { left, right } => (Some(*left), core::slice::from_ref(right)),
            Self::Array { array, index } => (Some(*array), core::slice::from_ref(index)),
            Self::Function { operands, .. } => (None, operands),
            Self::Invocation(invocation) => (invocation.instance, &invocation.arguments),
            Self::New { arguments, .. } => (None, arguments),
            Self::Field { instance, .. } => (*instance, &[]),
            Self::If { condition: expr } | Self::Monitor { value: expr, .. } => (Some(*expr), &[]),
            Self::Exit { value, .. } => (*value, &[]),
            Self::Var(_) | Self::Const { .. } => (None, &[]),
        };

        a.into_iter().chain(b.iter().copied())
    }

    pub fn replace_subexpr(&mut self, old: ExprId, new: ExprId) -> bool {
        let mut replaced = false;
        let mut swap = |slot: &mut ExprId| {
            if *slot == old {
                *slot = new;
                replaced = true;
            }
        };
        match self {
            Self::Assignment { left, right } => {
                swap(left);
                swap(right);
            }
            Self::Array { array, index } => {
                swap(array);
                swap(index);
            }
            Self::Function { operands, .. } => operands.iter_mut().for_each(swap),
            Self::Invocation(invocation) => {
                invocation.instance.iter_mut().for_each(&mut swap);
                invocation.arguments.iter_mut().for_each(swap);
            }
            Self::New { arguments, .. } => arguments.iter_mut().for_each(swap),
            Self::Field { instance, .. } | Self::Exit { value: instance, .. } => {
                instance.iter_mut().for_each(swap)
            }
            Self::If { condition: expr } | Self::Monitor { value: expr, .. } => swap(expr),
            Self::Var(_) | Self::Const { .. } => {}
        }
        replaced
    }

    pub fn as_var(&self) -> Option<&VarExprent> {
        match self {
            Self::Var(var) => Some(var),
            _ => None,
        }
    }

    pub fn as_var_mut(&mut self) -> Option<&mut VarExprent> {
        match self {
            Self::Var(var) => Some(var),
            _ => None,
        }
    }
}

impl DebugIr for Exprent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>, graph: &StatementGraph) -> fmt::Result {
        match self {
            Self::Assignment { left, right } => {
                write!(f, "{} = {}", graph.debug(left), graph.debug(right))
            }
            Self::Var(var) => {
                if var.is_definition {
                    write!(f, "{} ", var.ty)?;
                }
                write!(f, "v{}_{}", var.index, var.version)
            }
            Self::Const { value, .. } => match value {
                ConstValue::Null => write!(f, "null"),
                ConstValue::Int(n) => write!(f, "{n}"),
                ConstValue::Float(n) => write!(f, "{n:?}"),
                ConstValue::String(s) => write!(f, "{s:?}"),
                ConstValue::Class(class) => write!(f, "{class}.class"),
            },
            Self::Function { kind, operands } => match (kind, operands.as_slice()) {
                (FunctionKind::ArrayLength, [array]) => {
                    write!(f, "({}).length", graph.debug(array))
                }
                (FunctionKind::Ternary, [condition, if_true, if_false]) => write!(
                    f,
                    "({}) ? ({}) : ({})",
                    graph.debug(condition),
                    graph.debug(if_true),
                    graph.debug(if_false)
                ),
                (kind, [operand]) if kind.is_postfix() => {
                    write!(f, "({}){kind}", graph.debug(operand))
                }
                (kind, [operand]) if kind.is_prefix() => {
                    write!(f, "{kind}({})", graph.debug(operand))
                }
                (kind, [lhs, rhs]) => {
                    write!(f, "({}) {kind} ({})", graph.debug(lhs), graph.debug(rhs))
                }
                (kind, operands) => {
                    write!(f, "{kind}(")?;
                    for (i, operand) in operands.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", graph.debug(operand))?;
                    }
                    write!(f, ")")
                }
            },
            Self::Invocation(invocation) => {
                match invocation.instance {
                    Some(instance) => write!(f, "({}).", graph.debug(&instance))?,
                    None => write!(f, "{}::", invocation.class)?,
                }
                write!(f, "{}(", invocation.name)?;
                for (i, argument) in invocation.arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", graph.debug(argument))?;
                }
                write!(f, ")")
            }
            Self::Array { array, index } => {
                write!(f, "({})[{}]", graph.debug(array), graph.debug(index))
            }
            Self::Field {
                instance,
                class,
                name,
                ..
            } => match instance {
                Some(instance) => write!(f, "({}).{name}", graph.debug(instance)),
                None => write!(f, "{class}.{name}"),
            },
            Self::If { condition } => write!(f, "if ({})", graph.debug(condition)),
            Self::Monitor { kind, value } => write!(f, "{kind} {}", graph.debug(value)),
            Self::Exit { kind, value } => match value {
                Some(value) => write!(f, "{kind} {}", graph.debug(value)),
                None => write!(f, "{kind}"),
            },
            Self::New { class, arguments } => {
                write!(f, "new {class}(")?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", graph.debug(argument))?;
                }
                write!(f, ")")
            }
        }
    }
}

impl DebugIr for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>, graph: &StatementGraph) -> fmt::Result {
        DebugIr::fmt(&self.kind, f, graph)
    }
}
