use super::VarVersionPair;
use rustc_hash::FxHashMap;

/// Record of applied variable remaps. Merges only ever point a pair at a pair that was still live
/// at the time, so following the links from any pair ends at the pair it now lives under.
#[derive(Clone, Debug, Default)]
pub struct RemapTable {
    parents: FxHashMap<VarVersionPair, VarVersionPair>,
}

impl RemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, from: VarVersionPair, to: VarVersionPair) {
        let to = self.resolve(to);
        let from = self.resolve(from);
        if from != to {
            self.parents.insert(from, to);
        }
    }

    pub fn resolve(&mut self, mut pair: VarVersionPair) -> VarVersionPair {
        let mut leader = pair;
        while let Some(parent) = self.parents.get(&leader) {
            leader = *parent;
        }
        while pair != leader {
            pair = self
                .parents
                .insert(pair, leader)
                .expect("non-leader pairs have a parent");
        }
        leader
    }

    pub fn is_unique(&self, pair: VarVersionPair) -> bool {
        !self.parents.contains_key(&pair)
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}
