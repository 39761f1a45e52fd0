use core::fmt;

/// Set of bytecode offsets an expression was synthesized from.
///
/// Rewrites only ever grow these sets. The source-to-bytecode mapping emitted downstream is built
/// from them, so dropping an offset silently detaches a source line from its instructions.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BytecodeOffsets {
    words: Vec<u64>,
}

impl BytecodeOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(offset: u32) -> Self {
        let mut offsets = Self::new();
        offsets.insert(offset);
        offsets
    }

    pub fn insert(&mut self, offset: u32) {
        let word = (offset / 64) as usize;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (offset % 64);
    }

    pub fn contains(&self, offset: u32) -> bool {
        self.words
            .get((offset / 64) as usize)
            .is_some_and(|word| word & (1 << (offset % 64)) != 0)
    }

    pub fn union_with(&mut self, other: &Self) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (word, other_word) in self.words.iter_mut().zip(&other.words) {
            *word |= other_word;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    pub fn is_superset(&self, other: &Self) -> bool {
        other.words.iter().enumerate().all(|(i, other_word)| {
            let word = self.words.get(i).copied().unwrap_or(0);
            word & other_word == *other_word
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().enumerate().flat_map(|(i, word)| {
            let mut word = *word;
            core::iter::from_fn(move || {
                if word == 0 {
                    return None;
                }
                let bit = word.trailing_zeros();
                word &= word - 1;
                Some(i as u32 * 64 + bit)
            })
        })
    }

    pub fn first(&self) -> Option<u32> {
        self.iter().next()
    }

    pub fn last(&self) -> Option<u32> {
        let (i, word) = self
            .words
            .iter()
            .enumerate()
            .rev()
            .find(|(_, word)| **word != 0)?;
        Some(i as u32 * 64 + 63 - word.leading_zeros())
    }
}

impl FromIterator<u32> for BytecodeOffsets {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut offsets = Self::new();
        for offset in iter {
            offsets.insert(offset);
        }
        offsets
    }
}

impl fmt::Debug for BytecodeOffsets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
