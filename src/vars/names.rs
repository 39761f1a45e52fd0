use super::VarVersionPair;
use rustc_hash::{FxHashMap, FxHashSet};

/// Hands out variable names unique within one method.
#[derive(Clone, Debug, Default)]
pub struct VarNamesCollector {
    used: FxHashSet<String>,
}

impl VarNamesCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_name(&mut self, name: impl Into<String>) {
        self.used.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    pub fn free_name(&mut self, proposal: impl Into<String>) -> String {
        let mut name = proposal.into();
        while self.used.contains(&name) {
            name.push('x');
        }
        self.used.insert(name.clone());
        name
    }

    pub fn free_index_name(&mut self, index: u32) -> String {
        self.free_name(format!("var{index}"))
    }
}

/// Hook for renaming variables once their declared types are known.
///
/// `rename` receives every declared variable together with the rendered name of its type and may
/// return replacement names. Variables missing from the returned map keep their current name.
pub trait VariableNamer {
    fn rename(
        &mut self,
        types: &[(VarVersionPair, String)],
    ) -> Option<FxHashMap<VarVersionPair, String>>;
}

/// Keeps every name as is.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityNamer;

impl VariableNamer for IdentityNamer {
    fn rename(
        &mut self,
        _: &[(VarVersionPair, String)],
    ) -> Option<FxHashMap<VarVersionPair, String>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_names_stay_unique() {
        let mut names = VarNamesCollector::new();
        names.add_name("this");
        assert_eq!(names.free_index_name(3), "var3");
        assert_eq!(names.free_index_name(3), "var3x");
        assert_eq!(names.free_name("this"), "thisx");
        assert!(names.contains("var3x"));
    }
}
