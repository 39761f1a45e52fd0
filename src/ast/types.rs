use core::fmt;
use displaydoc::Display;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum BaseType {
    /// boolean
    Boolean,
    /// byte
    Byte,
    /// char
    Char,
    /// short
    Short,
    /// int
    Int,
    /// long
    Long,
    /// float
    Float,
    /// double
    Double,
    /// object
    Object,
    /// void
    Void,
    /// <null>
    Null,
    // Integer literals are typed by the smallest families that can hold them: `bytechar` fits both
    // `byte` and `char` (0..=127), `shortchar` fits both `short` and `char` (0..=32767).
    /// <bytechar>
    ByteChar,
    /// <shortchar>
    ShortChar,
    /// <unknown>
    Unknown,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    /// boolean
    Boolean,
    /// integer
    Integer,
    /// long
    Long,
    /// float
    Float,
    /// double
    Double,
    /// object
    Object,
    /// unknown
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VarType {
    pub base: BaseType,
    pub dims: u8,
    // Internal class name for `Object` bases, e.g. `java/lang/String`.
    pub class: Option<String>,
}

impl VarType {
    pub const fn primitive(base: BaseType) -> Self {
        Self {
            base,
            dims: 0,
            class: None,
        }
    }

    pub fn object(class: &str) -> Self {
        Self {
            base: BaseType::Object,
            dims: 0,
            class: Some(class.to_owned()),
        }
    }

    pub fn java_object() -> Self {
        Self::object("java/lang/Object")
    }

    pub const fn null() -> Self {
        Self::primitive(BaseType::Null)
    }

    pub const fn int() -> Self {
        Self::primitive(BaseType::Int)
    }

    pub fn array_of(mut self, dims: u8) -> Self {
        self.dims += dims;
        self
    }

    /// Parses a field descriptor such as `I`, `[[J` or `Ljava/util/List;`.
    pub fn from_descriptor(descriptor: &str) -> Option<Self> {
        let dims = descriptor.bytes().take_while(|b| *b == b'[').count();
        let rest = &descriptor[dims..];
        let base = match rest.as_bytes().first()? {
            b'Z' => BaseType::Boolean,
            b'B' => BaseType::Byte,
            b'C' => BaseType::Char,
            b'S' => BaseType::Short,
            b'I' => BaseType::Int,
            b'J' => BaseType::Long,
            b'F' => BaseType::Float,
            b'D' => BaseType::Double,
            b'V' if dims == 0 => BaseType::Void,
            b'L' => {
                let class = rest.strip_prefix('L')?.strip_suffix(';')?;
                if class.is_empty() {
                    return None;
                }
                return Some(Self {
                    base: BaseType::Object,
                    dims: dims.try_into().ok()?,
                    class: Some(class.to_owned()),
                });
            }
            _ => return None,
        };
        if rest.len() != 1 {
            return None;
        }
        Some(Self {
            base,
            dims: dims.try_into().ok()?,
            class: None,
        })
    }

    pub fn family(&self) -> TypeFamily {
        if self.dims > 0 {
            return TypeFamily::Object;
        }
        match self.base {
            BaseType::Boolean => TypeFamily::Boolean,
            BaseType::Byte
            | BaseType::Char
            | BaseType::Short
            | BaseType::Int
            | BaseType::ByteChar
            | BaseType::ShortChar => TypeFamily::Integer,
            BaseType::Long => TypeFamily::Long,
            BaseType::Float => TypeFamily::Float,
            BaseType::Double => TypeFamily::Double,
            BaseType::Object | BaseType::Null => TypeFamily::Object,
            BaseType::Void | BaseType::Unknown => TypeFamily::Unknown,
        }
    }

    // Inclusive value range of an integer-family primitive.
    fn int_range(base: BaseType) -> Option<(i32, i32)> {
        Some(match base {
            BaseType::ByteChar => (0, i8::MAX as i32),
            BaseType::ShortChar => (0, i16::MAX as i32),
            BaseType::Byte => (i8::MIN as i32, i8::MAX as i32),
            BaseType::Char => (0, u16::MAX as i32),
            BaseType::Short => (i16::MIN as i32, i16::MAX as i32),
            BaseType::Int => (i32::MIN, i32::MAX),
            _ => return None,
        })
    }

    pub fn is_superset(&self, other: &Self) -> bool {
        self == other || self.is_strict_superset(other)
    }

    pub fn is_strict_superset(&self, other: &Self) -> bool {
        if other.base == BaseType::Unknown && self.base != BaseType::Unknown {
            return true;
        }
        if other.dims > 0 {
            return *self == Self::java_object();
        }
        if self.dims > 0 {
            return other.base == BaseType::Null;
        }
        if self.base == BaseType::Object {
            return other.base == BaseType::Null;
        }
        match (Self::int_range(self.base), Self::int_range(other.base)) {
            (Some((lo, hi)), Some((other_lo, other_hi))) => {
                self.base != other.base && lo <= other_lo && other_hi <= hi
            }
            _ => false,
        }
    }

    // Integer primitives ordered from widest to narrowest.
    const INTEGER_LATTICE: [BaseType; 6] = [
        BaseType::Int,
        BaseType::Short,
        BaseType::Char,
        BaseType::ShortChar,
        BaseType::Byte,
        BaseType::ByteChar,
    ];

    /// Narrowest type both `a` and `b` can be widened to.
    pub fn common_supertype(a: &Self, b: &Self) -> Option<Self> {
        if a.is_superset(b) {
            return Some(a.clone());
        }
        if b.is_superset(a) {
            return Some(b.clone());
        }
        if a.family() != b.family() {
            return None;
        }
        match a.family() {
            TypeFamily::Integer => Self::INTEGER_LATTICE
                .iter()
                .rev()
                .map(|base| Self::primitive(*base))
                .find(|candidate| candidate.is_superset(a) && candidate.is_superset(b)),
            TypeFamily::Object => Some(Self::java_object()),
            _ => None,
        }
    }

    /// Widest type that is assignable to both `a` and `b`.
    pub fn common_min_type(a: &Self, b: &Self) -> Option<Self> {
        if a.is_superset(b) {
            return Some(b.clone());
        }
        if b.is_superset(a) {
            return Some(a.clone());
        }
        if a.family() != b.family() {
            return None;
        }
        match a.family() {
            TypeFamily::Integer => Self::INTEGER_LATTICE
                .iter()
                .map(|base| Self::primitive(*base))
                .find(|candidate| a.is_superset(candidate) && b.is_superset(candidate)),
            TypeFamily::Object => Some(Self::null()),
            _ => None,
        }
    }

    /// Computes the type two merged variable versions share, given their minimal (inferred from
    /// definitions) and maximal (inferred from uses) bounds. `None` means the versions can't be one
    /// variable.
    pub fn merged(
        first_min: Option<&Self>,
        second_min: Option<&Self>,
        first_max: Option<&Self>,
        second_max: Option<&Self>,
    ) -> Option<Self> {
        let (first_min, second_min) = (first_min?, second_min?);
        if first_min == second_min {
            return Some(first_min.clone());
        }
        let supertype = Self::common_supertype(first_min, second_min)?;
        if supertype.family() != TypeFamily::Object {
            return Some(supertype);
        }

        // `null` fits any array shape, every other reference pins its dimension count.
        let shaped: Vec<&Self> = [first_min, second_min]
            .into_iter()
            .filter(|min| min.base != BaseType::Null)
            .collect();
        if shaped.windows(2).any(|pair| pair[0].dims != pair[1].dims) {
            return None;
        }

        let merged = match (first_max, second_max) {
            (Some(first_max), Some(second_max)) => Self::common_min_type(first_max, second_max)?,
            _ => Self::common_min_type(first_min, second_min)?,
        };
        if merged.base == BaseType::Null || shaped.iter().any(|min| min.dims != merged.dims) {
            return None;
        }
        Some(merged)
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.base, &self.class) {
            (BaseType::Object, Some(class)) => write!(f, "{}", class.replace('/', "."))?,
            (base, _) => write!(f, "{base}")?,
        }
        for _ in 0..self.dims {
            write!(f, "[]")?;
        }
        Ok(())
    }
}
