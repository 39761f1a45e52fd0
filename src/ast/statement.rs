use super::{EdgeId, ExprId, StatId};
use displaydoc::Display;

#[derive(Clone, Debug)]
pub struct Statement {
    pub kind: StatKind,
    pub parent: Option<StatId>,
    pub children: Vec<StatId>,
    // Entry child. Sequences enter through their first element, `if`/`switch`/`synchronized`
    // through the head block, loops through the body.
    pub first: Option<StatId>,
    // `Some` exactly for leaves.
    pub exprents: Option<Vec<ExprId>>,
    // Declarations that have no natural home in a leaf, e.g. a variable whose first use is inside
    // a loop condition.
    pub var_definitions: Vec<ExprId>,
    pub successors: Vec<EdgeId>,
    pub predecessors: Vec<EdgeId>,
    // Edges whose closure is this statement.
    pub labeled_edges: Vec<EdgeId>,
}

impl Statement {
    pub(super) fn new(kind: StatKind) -> Self {
        let exprents = match kind {
            StatKind::BasicBlock => Some(Vec::new()),
            _ => None,
        };
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            first: None,
            exprents,
            var_definitions: Vec::new(),
            successors: Vec::new(),
            predecessors: Vec::new(),
            labeled_edges: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.exprents.is_some()
    }

    pub fn has_empty_exprents(&self) -> bool {
        self.exprents.as_ref().is_some_and(|exprents| exprents.is_empty())
    }

    pub fn as_loop(&self) -> Option<&DoStat> {
        match &self.kind {
            StatKind::Do(do_stat) => Some(do_stat),
            _ => None,
        }
    }

    pub fn as_loop_mut(&mut self) -> Option<&mut DoStat> {
        match &mut self.kind {
            StatKind::Do(do_stat) => Some(do_stat),
            _ => None,
        }
    }

    pub fn as_if(&self) -> Option<&IfStat> {
        match &self.kind {
            StatKind::If(if_stat) => Some(if_stat),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum StatKind {
    BasicBlock,
    Sequence,
    If(IfStat),
    Do(DoStat),
    Switch(SwitchStat),
    TryCatch(CatchStat),
    CatchAll(CatchAllStat),
    Synchronized(SyncStat),
    Root(RootStat),
    DummyExit,
}

impl StatKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BasicBlock => "block",
            Self::Sequence => "sequence",
            Self::If(_) => "if",
            Self::Do(_) => "loop",
            Self::Switch(_) => "switch",
            Self::TryCatch(_) => "try",
            Self::CatchAll(_) => "catchall",
            Self::Synchronized(_) => "synchronized",
            Self::Root(_) => "root",
            Self::DummyExit => "exit",
        }
    }
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum IfType {
    /// if
    If,
    /// if-else
    IfElse,
}

#[derive(Clone, Debug)]
pub struct IfStat {
    // An `Exprent::If`.
    pub head: ExprId,
    pub if_stat: Option<StatId>,
    pub else_stat: Option<StatId>,
    pub if_type: IfType,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum LoopKind {
    /// do
    Do,
    /// while
    While,
    /// do-while
    DoWhile,
    /// for
    For,
    /// foreach
    ForEach,
}

#[derive(Clone, Debug)]
pub struct DoStat {
    pub loop_kind: LoopKind,
    // For `foreach`, `init` is the element variable and `increment` is the iterable.
    pub init: Option<ExprId>,
    pub condition: Option<ExprId>,
    pub increment: Option<ExprId>,
}

#[derive(Clone, Debug)]
pub struct SwitchStat {
    pub head: ExprId,
    pub cases: Vec<StatId>,
}

#[derive(Clone, Debug)]
pub struct CatchStat {
    // One exception variable per handler.
    pub vars: Vec<ExprId>,
}

#[derive(Clone, Debug)]
pub struct CatchAllStat {
    pub vars: Vec<ExprId>,
    pub is_finally: bool,
    pub monitor: Option<ExprId>,
}

#[derive(Clone, Debug)]
pub struct SyncStat {
    // The `monitorenter` expression, once it has been lifted out of the head block.
    pub head: Option<ExprId>,
    pub body: StatId,
}

#[derive(Clone, Debug)]
pub struct RootStat {
    pub dummy_exit: StatId,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// regular
    Regular,
    /// exception
    Exception,
    /// break
    Break,
    /// continue
    Continue,
}

/// Bit set of edge kinds used to filter neighbour queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeKinds(u8);

impl EdgeKinds {
    pub const REGULAR: Self = Self(1);
    pub const EXCEPTION: Self = Self(2);
    pub const BREAK: Self = Self(4);
    pub const CONTINUE: Self = Self(8);
    pub const DIRECT_ALL: Self = Self(1 | 4 | 8);
    pub const ALL: Self = Self(1 | 2 | 4 | 8);

    pub fn contains(self, kind: EdgeKind) -> bool {
        let bit = match kind {
            EdgeKind::Regular => Self::REGULAR,
            EdgeKind::Exception => Self::EXCEPTION,
            EdgeKind::Break => Self::BREAK,
            EdgeKind::Continue => Self::CONTINUE,
        };
        self.0 & bit.0 != 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatEdge {
    pub kind: EdgeKind,
    pub source: StatId,
    pub destination: StatId,
    // Statement whose label the edge jumps relative to. Must be an ancestor of both endpoints.
    pub closure: Option<StatId>,
    pub labeled: bool,
    pub explicit: bool,
}

// Items of a statement in execution order: child statements interleaved with the expressions the
// statement evaluates itself (heads, loop slots).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeqItem {
    Stat(StatId),
    Expr(ExprId),
}
