use crate::ast::VarType;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// One entry of a `LocalVariableTable` or `LocalVariableTypeTable` attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LvtVariable {
    pub name: String,
    pub descriptor: String,
    // Generic signature, taken from the matching `LocalVariableTypeTable` entry.
    pub signature: Option<String>,
    pub start: u32,
    // Exclusive.
    pub end: u32,
    pub slot: u32,
    pub is_lvtt: bool,
}

/// How entries of the two debug tables are matched up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LvtMergeKey {
    #[default]
    SlotEnd,
    SlotStart,
}

impl LvtVariable {
    pub fn key(&self, key: LvtMergeKey) -> (u32, u32) {
        match key {
            LvtMergeKey::SlotEnd => (self.slot, self.end),
            LvtMergeKey::SlotStart => (self.slot, self.start),
        }
    }

    pub fn merge(&mut self, other: &Self) {
        if other.is_lvtt && self.signature.is_none() {
            self.signature = Some(other.descriptor.clone());
        }
    }

    pub fn var_type(&self) -> Option<VarType> {
        VarType::from_descriptor(&self.descriptor)
    }

    pub fn renamed(&self, name: String) -> Self {
        Self {
            name,
            ..self.clone()
        }
    }

    fn covers(&self, first: u32, last: u32) -> bool {
        self.start <= first && last < self.end
    }

    fn span(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }
}

/// Resolves constant pool indices to UTF-8 strings. Constant pool decoding itself happens
/// elsewhere.
pub trait ConstantStrings {
    fn utf8(&self, index: u16) -> Option<&str>;
}

impl ConstantStrings for FxHashMap<u16, String> {
    fn utf8(&self, index: u16) -> Option<&str> {
        self.get(&index).map(String::as_str)
    }
}

#[derive(Debug, Error)]
pub enum LvtError {
    #[error("Attribute truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Constant pool entry #{0} is not a UTF-8 string")]
    BadString(u16),
}

/// Decodes the body of a `LocalVariableTable` (or, with `is_lvtt`, `LocalVariableTypeTable`)
/// attribute: a `u16` count followed by `(start_pc, length, name, descriptor, slot)` records.
pub fn parse_local_variable_table(
    bytes: &[u8],
    is_lvtt: bool,
    strings: &impl ConstantStrings,
) -> Result<LocalVariableTable, LvtError> {
    let read_u16 = |at: usize| -> Result<u16, LvtError> {
        match bytes.get(at..at + 2) {
            Some(&[hi, lo]) => Ok(u16::from_be_bytes([hi, lo])),
            _ => Err(LvtError::Truncated {
                expected: at + 2,
                actual: bytes.len(),
            }),
        }
    };
    let string = |index: u16| -> Result<String, LvtError> {
        strings
            .utf8(index)
            .map(str::to_owned)
            .ok_or(LvtError::BadString(index))
    };

    let count = read_u16(0)? as usize;
    let expected = 2 + count * 10;
    if bytes.len() < expected {
        return Err(LvtError::Truncated {
            expected,
            actual: bytes.len(),
        });
    }

    let mut table = LocalVariableTable::new();
    for i in 0..count {
        let at = 2 + i * 10;
        let start = read_u16(at)? as u32;
        let length = read_u16(at + 2)? as u32;
        table.add_variable(LvtVariable {
            name: string(read_u16(at + 4)?)?,
            descriptor: string(read_u16(at + 6)?)?,
            signature: None,
            start,
            end: start + length,
            slot: read_u16(at + 8)? as u32,
            is_lvtt,
        });
    }
    Ok(table)
}

/// Debug variable table of one method.
#[derive(Clone, Debug, Default)]
pub struct LocalVariableTable {
    entries: Vec<LvtVariable>,
    // (start, end) -> entry indices
    endpoints: FxHashMap<(u32, u32), Vec<usize>>,
    // slot -> entry indices, in table order
    by_slot: FxHashMap<u32, Vec<usize>>,
}

impl LocalVariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LvtVariable] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add_variable(&mut self, variable: LvtVariable) {
        let index = self.entries.len();
        self.endpoints
            .entry((variable.start, variable.end))
            .or_default()
            .push(index);
        self.by_slot.entry(variable.slot).or_default().push(index);
        self.entries.push(variable);
    }

    /// Folds a companion table in: matching entries gain the companion's signature, unmatched ones
    /// are added as-is.
    pub fn merge_lvts(&mut self, other: &LocalVariableTable, key: LvtMergeKey) {
        for variable in &other.entries {
            let position = self
                .entries
                .iter()
                .position(|mine| mine.key(key) == variable.key(key));
            match position {
                Some(position) => self.entries[position].merge(variable),
                None => self.add_variable(variable.clone()),
            }
        }
    }

    pub fn candidates(&self, slot: u32) -> Vec<&LvtVariable> {
        self.by_slot
            .get(&slot)
            .into_iter()
            .flatten()
            .map(|i| &self.entries[*i])
            .collect()
    }

    // Several entries of one slot can cover the same range when scopes nest. The innermost one
    // wins, ties broken by table order.
    fn innermost<'a>(candidates: impl Iterator<Item = &'a LvtVariable>) -> Option<&'a LvtVariable> {
        candidates.min_by_key(|variable| variable.span())
    }

    /// Entry for `slot` whose validity range covers the whole bytecode range `[first, last]`.
    pub fn find(&self, slot: u32, (first, last): (u32, u32)) -> Option<&LvtVariable> {
        Self::innermost(
            self.candidates(slot)
                .into_iter()
                .filter(|variable| variable.covers(first, last)),
        )
    }

    /// Entry for `slot` live at a single instruction.
    pub fn find_at(&self, slot: u32, offset: u32) -> Option<&LvtVariable> {
        self.find(slot, (offset, offset))
    }

    /// Entries whose scope ends at `end`, one per slot.
    pub fn vars_ending_at(&self, end: u32) -> FxHashMap<u32, &LvtVariable> {
        let mut out: FxHashMap<u32, &LvtVariable> = FxHashMap::default();
        let mut ends: Vec<(&(u32, u32), &Vec<usize>)> = self
            .endpoints
            .iter()
            .filter(|((_, e), _)| *e == end)
            .collect();
        // Latest start first, so that the first entry seen for a slot is the innermost.
        ends.sort_by_key(|((start, _), _)| core::cmp::Reverse(*start));
        for (_, indices) in ends {
            for i in indices {
                let variable = &self.entries[*i];
                out.entry(variable.slot).or_insert(variable);
            }
        }
        out
    }
}
