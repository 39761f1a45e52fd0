use super::{LocalVariableTable, LvtVariable, RemapTable, VarNamesCollector, VarVersionPair};
use crate::ast::VarType;
use alloc::collections::BTreeSet;
use noak::{
    MStr,
    descriptor::{BaseType, MethodDescriptor, TypeDescriptor},
    error::DecodeError,
};
use rustc_hash::FxHashMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Finality {
    NonFinal,
    ExplicitFinal,
    #[default]
    Final,
}

impl Finality {
    /// Finality of one variable made of two versions, each assigned at most once.
    pub fn merged(self, other: Self) -> Self {
        match (self, other) {
            (Self::NonFinal, _) | (_, Self::NonFinal) => Self::NonFinal,
            (Self::ExplicitFinal, Self::ExplicitFinal) => Self::ExplicitFinal,
            _ => Self::Final,
        }
    }
}

/// Per-method registry of everything known about variables: names, types, debug table entries, and
/// which original slot each renumbered index came from.
#[derive(Clone, Debug, Default)]
pub struct VarProcessor {
    names: FxHashMap<VarVersionPair, String>,
    var_types: FxHashMap<VarVersionPair, VarType>,
    // Bounds from type inference: the narrowest type any definition produces, and the widest type
    // every use accepts.
    min_types: FxHashMap<VarVersionPair, VarType>,
    max_types: FxHashMap<VarVersionPair, VarType>,
    finality: FxHashMap<VarVersionPair, Finality>,
    lvts: FxHashMap<VarVersionPair, LvtVariable>,
    original_indices: FxHashMap<u32, VarVersionPair>,
    remaps: RemapTable,
    lvt: Option<LocalVariableTable>,
    this_class: Option<String>,
    // Slot of `this` (if any) followed by the slot of each parameter.
    parameter_slots: Vec<u32>,
    names_collector: VarNamesCollector,
}

fn type_descriptor_width(descriptor: TypeDescriptor<'_>) -> u32 {
    if descriptor.dimensions == 0 && matches!(descriptor.base, BaseType::Double | BaseType::Long) {
        2
    } else {
        1
    }
}

impl VarProcessor {
    /// Sets up a processor for a method with the given raw descriptor. Instance methods pass the
    /// name of their class.
    pub fn new(descriptor: &[u8], this_class: Option<&str>) -> Result<Self, DecodeError> {
        let descriptor = MethodDescriptor::parse(MStr::from_mutf8(descriptor)?)?;
        let mut slots = Vec::new();
        let mut slot = 0;
        if this_class.is_some() {
            slots.push(0);
            slot = 1;
        }
        for parameter in descriptor.parameters() {
            slots.push(slot);
            slot += type_descriptor_width(parameter);
        }
        Ok(Self::with_parameter_slots(this_class.map(str::to_owned), slots))
    }

    pub fn with_parameter_slots(this_class: Option<String>, parameter_slots: Vec<u32>) -> Self {
        Self {
            this_class,
            parameter_slots,
            ..Self::default()
        }
    }

    pub fn this_class(&self) -> Option<&str> {
        self.this_class.as_deref()
    }

    pub fn is_static(&self) -> bool {
        self.this_class.is_none()
    }

    pub fn parameter_slots(&self) -> &[u32] {
        &self.parameter_slots
    }

    /// Original slot of a renumbered variable index.
    pub fn remapped(&self, index: u32) -> u32 {
        self.original_pair(index).index
    }

    pub fn original_pair(&self, index: u32) -> VarVersionPair {
        self.original_indices
            .get(&index)
            .copied()
            .unwrap_or(VarVersionPair::new(index, 0))
    }

    pub fn set_original_index(&mut self, index: u32, original: VarVersionPair) {
        self.original_indices.insert(index, original);
    }

    pub fn name(&self, pair: VarVersionPair) -> Option<&str> {
        self.names.get(&pair).map(String::as_str)
    }

    pub fn set_name(&mut self, pair: VarVersionPair, name: String) {
        self.names.insert(pair, name);
    }

    pub fn var_type(&self, pair: VarVersionPair) -> Option<&VarType> {
        self.var_types.get(&pair)
    }

    pub fn set_var_type(&mut self, pair: VarVersionPair, ty: VarType) {
        self.var_types.insert(pair, ty);
    }

    pub fn min_type(&self, pair: VarVersionPair) -> Option<&VarType> {
        self.min_types.get(&pair)
    }

    pub fn set_min_type(&mut self, pair: VarVersionPair, ty: VarType) {
        self.min_types.insert(pair, ty);
    }

    pub fn max_type(&self, pair: VarVersionPair) -> Option<&VarType> {
        self.max_types.get(&pair)
    }

    pub fn set_max_type(&mut self, pair: VarVersionPair, ty: VarType) {
        self.max_types.insert(pair, ty);
    }

    pub fn finality(&self, pair: VarVersionPair) -> Finality {
        self.finality.get(&pair).copied().unwrap_or_default()
    }

    pub fn set_finality(&mut self, pair: VarVersionPair, finality: Finality) {
        self.finality.insert(pair, finality);
    }

    pub fn var_lvt(&self, pair: VarVersionPair) -> Option<&LvtVariable> {
        self.lvts.get(&pair)
    }

    pub fn set_var_lvt(&mut self, pair: VarVersionPair, lvt: LvtVariable) {
        self.lvts.insert(pair, lvt);
    }

    pub fn lvt(&self) -> Option<&LocalVariableTable> {
        self.lvt.as_ref()
    }

    pub fn set_lvt(&mut self, lvt: LocalVariableTable) {
        self.lvt = Some(lvt);
    }

    /// Debug table entry for a renumbered index live at `offset`.
    pub fn find_lvt_at(&self, index: u32, offset: u32) -> Option<LvtVariable> {
        self.lvt.as_ref()?.find_at(self.remapped(index), offset).cloned()
    }

    /// Debug table entry for a renumbered index covering the whole range `[first, last]`.
    pub fn find_lvt(&self, index: u32, range: (u32, u32)) -> Option<LvtVariable> {
        self.lvt.as_ref()?.find(self.remapped(index), range).cloned()
    }

    pub fn names_collector(&mut self) -> &mut VarNamesCollector {
        &mut self.names_collector
    }

    pub fn record_remap(&mut self, from: VarVersionPair, to: VarVersionPair) {
        self.remaps.merge(from, to);
    }

    pub fn remaps(&self) -> &RemapTable {
        &self.remaps
    }

    /// Replaces synthesized names with debug table names.
    ///
    /// Entries of one slot are matched to the versions that slot was split into in order: the
    /// second-lowest version of slot 3 gets the second table entry for slot 3. Collisions between
    /// synthesized names are resolved by a numeric suffix, debug names are kept verbatim.
    pub fn set_debug_var_names(&mut self) {
        let Some(table) = &self.lvt else {
            return;
        };

        let mut pairs: Vec<VarVersionPair> = self.names.keys().copied().collect();
        pairs.sort();

        let mut versions: FxHashMap<u32, BTreeSet<u32>> = FxHashMap::default();
        for pair in &pairs {
            let original = self.original_pair(pair.index);
            versions.entry(original.index).or_default().insert(original.version);
        }

        let mut counters: FxHashMap<String, u32> = FxHashMap::default();
        for pair in pairs {
            let mut name = self.names[&pair].clone();
            let original = self.original_pair(pair.index);
            let ordinal = versions
                .get(&original.index)
                .map_or(0, |set| set.range(..original.version).count());
            let debug_name = table
                .candidates(original.index)
                .get(ordinal)
                .map(|variable| variable.name.clone());
            let from_lvt = debug_name.is_some();
            if let Some(debug_name) = debug_name {
                name = debug_name;
            }

            let counter = counters
                .entry(name.clone())
                .and_modify(|counter| *counter += 1)
                .or_insert(0);
            if *counter > 0 && !from_lvt {
                name = format!("{name}{counter}");
            }
            self.names.insert(pair, name);
        }
    }

    /// Re-registers every name with the collector, renaming clashes.
    pub fn refresh_var_names(&mut self) {
        let mut pairs: Vec<VarVersionPair> = self.names.keys().copied().collect();
        pairs.sort();
        for pair in pairs {
            let name = self.names[&pair].clone();
            let name = self.names_collector.free_name(name);
            self.names.insert(pair, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(name: &str, start: u32, end: u32, slot: u32) -> LvtVariable {
        LvtVariable {
            name: name.to_owned(),
            descriptor: "I".to_owned(),
            signature: None,
            start,
            end,
            slot,
            is_lvtt: false,
        }
    }

    #[test]
    fn parameter_slots_from_descriptor() {
        let processor =
            VarProcessor::new(b"(IJ[DLjava/lang/String;D)V", Some("Foo")).expect("valid");
        assert_eq!(processor.parameter_slots(), [0, 1, 2, 4, 5, 6]);
        assert!(!processor.is_static());

        let processor = VarProcessor::new(b"(JI)V", None).expect("valid");
        assert_eq!(processor.parameter_slots(), [0, 2]);
        assert!(VarProcessor::new(b"(I", None).is_err());
    }

    #[test]
    fn debug_names_follow_version_order() {
        let mut table = LocalVariableTable::new();
        table.add_variable(variable("first", 0, 10, 2));
        table.add_variable(variable("second", 10, 20, 2));

        let mut processor = VarProcessor::with_parameter_slots(None, Vec::new());
        processor.set_lvt(table);
        // Indices 7 and 8 were split off slot 2.
        processor.set_original_index(7, VarVersionPair::new(2, 1));
        processor.set_original_index(8, VarVersionPair::new(2, 3));
        processor.set_name(VarVersionPair::new(7, 0), "var7".into());
        processor.set_name(VarVersionPair::new(8, 0), "var8".into());
        processor.set_name(VarVersionPair::new(9, 0), "var7".into());
        processor.set_debug_var_names();

        assert_eq!(processor.name(VarVersionPair::new(7, 0)), Some("first"));
        assert_eq!(processor.name(VarVersionPair::new(8, 0)), Some("second"));
        assert_eq!(processor.name(VarVersionPair::new(9, 0)), Some("var7"));
        assert_eq!(processor.remapped(8), 2);
        assert_eq!(processor.find_lvt_at(8, 12).map(|v| v.name), Some("second".into()));
    }

    #[test]
    fn finality_of_merged_versions() {
        assert_eq!(Finality::Final.merged(Finality::NonFinal), Finality::NonFinal);
        assert_eq!(Finality::ExplicitFinal.merged(Finality::Final), Finality::Final);
        assert_eq!(
            Finality::ExplicitFinal.merged(Finality::ExplicitFinal),
            Finality::ExplicitFinal
        );
    }
}
