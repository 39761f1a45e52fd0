pub mod definitions;
pub mod lvt;
pub mod merge;
mod names;
mod processor;
pub mod refs;
mod remap;

pub use self::lvt::{
    ConstantStrings, LocalVariableTable, LvtError, LvtMergeKey, LvtVariable,
    parse_local_variable_table,
};
pub use self::names::{IdentityNamer, VarNamesCollector, VariableNamer};
pub use self::processor::{Finality, VarProcessor};
pub use self::remap::RemapTable;
use displaydoc::Display;

// Occurrence of a local: the slot it lives in and the version distinguishing independent live
// ranges of that slot.
/// {index}_{version}
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarVersionPair {
    pub index: u32,
    pub version: u32,
}

impl VarVersionPair {
    pub const fn new(index: u32, version: u32) -> Self {
        Self { index, version }
    }
}
