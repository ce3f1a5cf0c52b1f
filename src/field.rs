//! Field descriptors and field values.

use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

/// How many bytes a raw byte field occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LengthMode {
    /// Exactly `n` bytes.
    Fixed(usize),
    /// Every byte left in the box payload. Only valid as the last field.
    Remainder,
    /// As many bytes as the named earlier bitfield says.
    Prefixed(Cow<'static, str>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Bitfield { width: u32 },
    RawBytes { length: LengthMode },
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Bitfield { .. } => "bits",
            FieldKind::RawBytes { .. } => "bytes",
        }
    }
}

/// One named field of a box layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: Cow<'static, str>,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn bits(name: &'static str, width: u32) -> Self {
        FieldSpec {
            name: Cow::Borrowed(name),
            kind: FieldKind::Bitfield { width },
        }
    }

    pub const fn fixed_bytes(name: &'static str, len: usize) -> Self {
        FieldSpec {
            name: Cow::Borrowed(name),
            kind: FieldKind::RawBytes {
                length: LengthMode::Fixed(len),
            },
        }
    }

    pub const fn remainder(name: &'static str) -> Self {
        FieldSpec {
            name: Cow::Borrowed(name),
            kind: FieldKind::RawBytes {
                length: LengthMode::Remainder,
            },
        }
    }

    pub const fn prefixed(name: &'static str, length_field: &'static str) -> Self {
        FieldSpec {
            name: Cow::Borrowed(name),
            kind: FieldKind::RawBytes {
                length: LengthMode::Prefixed(Cow::Borrowed(length_field)),
            },
        }
    }

    /// Build a spec with a runtime name, e.g. from a config file.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldSpec {
            name: Cow::Owned(name.into()),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bit width for bitfields, `None` for byte runs.
    pub fn width(&self) -> Option<u32> {
        match self.kind {
            FieldKind::Bitfield { width } => Some(width),
            FieldKind::RawBytes { .. } => None,
        }
    }

    /// The value a field holds before anything else is assigned.
    pub fn zero_value(&self) -> FieldValue {
        match &self.kind {
            FieldKind::Bitfield { .. } => FieldValue::Uint(0),
            FieldKind::RawBytes {
                length: LengthMode::Fixed(n),
            } => FieldValue::Bytes(vec![0; *n]),
            FieldKind::RawBytes { .. } => FieldValue::Bytes(Vec::new()),
        }
    }
}

/// A decoded or assigned field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Uint(u64),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn label(&self) -> &'static str {
        match self {
            FieldValue::Uint(_) => "bits",
            FieldValue::Bytes(_) => "bytes",
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            FieldValue::Uint(v) => Some(*v),
            FieldValue::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Uint(_) => None,
            FieldValue::Bytes(b) => Some(b),
        }
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Uint(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Uint(v as u64)
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        FieldValue::Uint(v as u64)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        FieldValue::Bytes(v)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(v: &[u8]) -> Self {
        FieldValue::Bytes(v.to_vec())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Uint(v) => write!(f, "{}", v),
            FieldValue::Bytes(b) if b.is_empty() => write!(f, "(empty)"),
            FieldValue::Bytes(b) => write!(f, "{}", hex::encode(b)),
        }
    }
}

// Integers stay numbers, byte runs become lowercase hex strings.
impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Uint(v) => s.serialize_u64(*v),
            FieldValue::Bytes(b) => s.serialize_str(&hex::encode(b)),
        }
    }
}
