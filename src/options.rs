use crate::vars::LvtMergeKey;
use core::time::Duration;

/// Switches for the per-method passes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecompilerOptions {
    /// Recognize `while`, `do-while`, `for` and `foreach` loops.
    pub enhance_loops: bool,
    /// Turn loops ending in a conditional continue into `do-while` when no `while` form fits.
    pub match_do_while: bool,
    /// Accept a lone trailing expression entered from several places as a `for` increment, even
    /// without an init before the loop.
    pub accept_single_increment: bool,
    /// Name variables after the local variable table when there is one.
    pub use_debug_var_names: bool,
    /// How entries of the local variable table and its type-table companion are paired up.
    pub lvt_merge_key: LvtMergeKey,
    /// Time after which a method still being processed is given up on.
    pub method_timeout: Option<Duration>,
}

impl Default for DecompilerOptions {
    fn default() -> Self {
        Self {
            enhance_loops: true,
            match_do_while: true,
            accept_single_increment: true,
            use_debug_var_names: true,
            lvt_merge_key: LvtMergeKey::default(),
            method_timeout: None,
        }
    }
}
