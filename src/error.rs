//! Error types for the bit layer, layout construction and the box driver.

/// Errors from [`crate::bits::BitReader`] and [`crate::bits::BitWriter`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BitError {
    #[error("value {value} does not fit in {width} bits")]
    OutOfRange { value: u64, width: u32 },
    #[error("unexpected end of input: needed {needed} bits, {available} available")]
    UnexpectedEndOfInput { needed: usize, available: usize },
    #[error("byte access at bit offset {bit_pos} is not byte aligned")]
    MisalignedAccess { bit_pos: usize },
    #[error("bit width {0} outside 1..=32")]
    InvalidWidth(u32),
}

/// Errors raised while building a [`crate::layout::LayoutDescriptor`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("field `{field}`: bit width {width} outside 1..=32")]
    InvalidWidth { field: String, width: u32 },
    #[error("raw field `{field}` starts at bit offset {bit_offset}, not a byte boundary")]
    MisalignedRawField { field: String, bit_offset: usize },
    #[error("layout ends at bit offset {bit_offset}, not a byte boundary")]
    UnalignedEnd { bit_offset: usize },
    #[error("remainder field `{field}` must be the last field")]
    RemainderNotLast { field: String },
    #[error("field `{field}` takes its length from `{length_field}`, which is not an earlier bitfield")]
    UnknownLengthField { field: String, length_field: String },
    #[error("fixed field `{field}` is {len} bytes, limit is {max}")]
    FieldTooLong { field: String, len: usize, max: usize },
    #[error("default for `{field}`: {reason}")]
    BadDefault { field: String, reason: String },
}

/// Errors from [`crate::instance::BoxInstance`] operations.
#[derive(thiserror::Error, Debug)]
pub enum FieldError {
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("field `{field}` expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("field `{field}`: value {value} does not fit in {width} bits")]
    OutOfRange { field: String, value: u64, width: u32 },
    #[error("field `{field}`: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },
    #[error("truncated input at field `{field}`: {source}")]
    TruncatedInput {
        field: String,
        #[source]
        source: BitError,
    },
    #[error("field `{field}` entered off a byte boundary (bit offset {bit_pos})")]
    MisalignedAccess { field: String, bit_pos: usize },
    #[error("field `{field}`: cannot parse `{text}`")]
    InvalidText { field: String, text: String },
    #[error("field `{field}`: {source}")]
    Bits {
        field: String,
        #[source]
        source: BitError,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl FieldError {
    /// Attach a field name to a bit-layer error.
    pub(crate) fn at(field: &str, err: BitError) -> Self {
        match err {
            BitError::OutOfRange { value, width } => FieldError::OutOfRange {
                field: field.to_string(),
                value,
                width,
            },
            BitError::MisalignedAccess { bit_pos } => FieldError::MisalignedAccess {
                field: field.to_string(),
                bit_pos,
            },
            e @ BitError::UnexpectedEndOfInput { .. } => FieldError::TruncatedInput {
                field: field.to_string(),
                source: e,
            },
            e @ BitError::InvalidWidth(_) => FieldError::Bits {
                field: field.to_string(),
                source: e,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, FieldError>;
