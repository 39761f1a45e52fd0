mod arena;
mod debug;
mod expression;
mod graph;
mod iterate;
mod offsets;
mod rewrite;
mod statement;
mod types;

pub use self::arena::{Arena, ArenaId, EdgeId, ExprId, StatId};
pub use self::debug::DebugIr;
pub use self::expression::*;
pub use self::graph::StatementGraph;
pub use self::offsets::BytecodeOffsets;
pub use self::statement::*;
pub use self::types::{BaseType, TypeFamily, VarType};
