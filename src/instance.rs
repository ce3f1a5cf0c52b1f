//! A box bound to its layout: one value per field, plus the decode/encode
//! driver that walks the layout in order.

use crate::bits::{BitReader, BitWriter, max_value};
use crate::boxes::FourCC;
use crate::error::{FieldError, Result};
use crate::field::{FieldKind, FieldSpec, FieldValue, LengthMode};
use crate::layout::LayoutDescriptor;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

/// Field values of one box, in layout order.
///
/// An instance is always fully populated: construction fills the layout
/// defaults, and a failed [`decode`](Self::decode) leaves the previous
/// values untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxInstance {
    typ: FourCC,
    layout: Arc<LayoutDescriptor>,
    values: Vec<FieldValue>,
}

impl BoxInstance {
    /// A well-formed instance holding the layout defaults.
    pub fn new(typ: FourCC, layout: Arc<LayoutDescriptor>) -> Self {
        let values = layout.defaults().to_vec();
        Self {
            typ,
            layout,
            values,
        }
    }

    /// Decode a fresh instance; also returns the number of bytes consumed.
    pub fn from_bytes(
        typ: FourCC,
        layout: Arc<LayoutDescriptor>,
        input: &[u8],
    ) -> Result<(Self, usize)> {
        let mut inst = Self::new(typ, layout);
        let consumed = inst.decode(input)?;
        Ok((inst, consumed))
    }

    pub fn typ(&self) -> FourCC {
        self.typ
    }

    pub fn layout(&self) -> &Arc<LayoutDescriptor> {
        &self.layout
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// `(spec, value)` pairs in layout order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldSpec, &FieldValue)> {
        self.layout.fields().iter().zip(self.values.iter())
    }

    /// Reset every field to the layout default.
    pub fn generate_defaults(&mut self) {
        self.values.clear();
        self.values.extend_from_slice(self.layout.defaults());
    }

    /// Populate every field from `input` and return the bytes consumed.
    ///
    /// A `Remainder` field takes everything left in `input`. Otherwise
    /// trailing bytes are left for the caller (the next sibling box).
    pub fn decode(&mut self, input: &[u8]) -> Result<usize> {
        let mut r = BitReader::new(input);
        let mut decoded: Vec<FieldValue> = Vec::with_capacity(self.layout.len());

        for (i, spec) in self.layout.fields().iter().enumerate() {
            let name = spec.name();
            let value = match &spec.kind {
                FieldKind::Bitfield { width } => {
                    FieldValue::Uint(r.read_bits(*width).map_err(|e| FieldError::at(name, e))?)
                }
                FieldKind::RawBytes { length } => {
                    r.align_to_byte().map_err(|e| FieldError::at(name, e))?;
                    let bytes = match length {
                        LengthMode::Fixed(n) => r.read_bytes(*n),
                        LengthMode::Remainder => r.read_remainder(),
                        LengthMode::Prefixed(length_field) => {
                            let n = match self.layout.length_source(i).map(|j| &decoded[j]) {
                                Some(FieldValue::Uint(n)) => *n as usize,
                                _ => return Err(FieldError::UnknownField(length_field.to_string())),
                            };
                            r.read_bytes(n)
                        }
                    }
                    .map_err(|e| FieldError::at(name, e))?;
                    FieldValue::Bytes(bytes.to_vec())
                }
            };
            decoded.push(value);
        }

        let consumed = r.bytes_consumed();
        debug!(typ = %self.typ, consumed, available = input.len(), "decoded box fields");
        self.values = decoded;
        Ok(consumed)
    }

    /// Encode into `out`. Nothing is written unless every field encodes.
    pub fn encode<W: Write + ?Sized>(&self, out: &mut W) -> Result<usize> {
        let bytes = self.to_bytes()?;
        out.write_all(&bytes)?;
        Ok(bytes.len())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut w = BitWriter::with_capacity(self.encoded_len());

        for (i, (spec, value)) in self.fields().enumerate() {
            let name = spec.name();
            match (&spec.kind, value) {
                (FieldKind::Bitfield { width }, FieldValue::Uint(v)) => {
                    w.write_bits(*v, *width).map_err(|e| FieldError::at(name, e))?;
                }
                (FieldKind::RawBytes { length }, FieldValue::Bytes(b)) => {
                    self.check_run_length(i, length, b)?;
                    w.align_to_byte().map_err(|e| FieldError::at(name, e))?;
                    w.write_bytes(b).map_err(|e| FieldError::at(name, e))?;
                    w.align_to_byte().map_err(|e| FieldError::at(name, e))?;
                }
                (kind, v) => {
                    return Err(FieldError::TypeMismatch {
                        field: name.to_string(),
                        expected: kind.label(),
                        found: v.label(),
                    });
                }
            }
        }

        let last = self.layout.fields().last().map_or("", |f| f.name());
        let bytes = w.finish().map_err(|e| FieldError::at(last, e))?;
        debug!(typ = %self.typ, len = bytes.len(), "encoded box fields");
        Ok(bytes)
    }

    fn check_run_length(&self, index: usize, length: &LengthMode, bytes: &[u8]) -> Result<()> {
        let expected = match length {
            LengthMode::Fixed(n) => *n,
            LengthMode::Remainder => return Ok(()),
            LengthMode::Prefixed(_) => match self.layout.length_source(index).map(|j| &self.values[j]) {
                Some(FieldValue::Uint(n)) => *n as usize,
                _ => bytes.len(),
            },
        };
        if bytes.len() != expected {
            return Err(FieldError::LengthMismatch {
                field: self.layout.fields()[index].name().to_string(),
                expected,
                actual: bytes.len(),
            });
        }
        Ok(())
    }

    /// Encoded size of the current values, in bytes.
    pub fn encoded_len(&self) -> usize {
        let bits: usize = self
            .fields()
            .map(|(spec, value)| match (&spec.kind, value) {
                (FieldKind::Bitfield { width }, _) => *width as usize,
                (FieldKind::RawBytes { .. }, FieldValue::Bytes(b)) => b.len() * 8,
                (FieldKind::RawBytes { .. }, FieldValue::Uint(_)) => 0,
            })
            .sum();
        bits.div_ceil(8)
    }

    fn index(&self, name: &str) -> Result<usize> {
        self.layout
            .index_of(name)
            .ok_or_else(|| FieldError::UnknownField(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Result<&FieldValue> {
        let idx = self.index(name)?;
        Ok(&self.values[idx])
    }

    pub fn get_uint(&self, name: &str) -> Result<u64> {
        match self.get(name)? {
            FieldValue::Uint(v) => Ok(*v),
            v => Err(FieldError::TypeMismatch {
                field: name.to_string(),
                expected: "bits",
                found: v.label(),
            }),
        }
    }

    pub fn get_bytes(&self, name: &str) -> Result<&[u8]> {
        match self.get(name)? {
            FieldValue::Bytes(b) => Ok(b),
            v => Err(FieldError::TypeMismatch {
                field: name.to_string(),
                expected: "bytes",
                found: v.label(),
            }),
        }
    }

    /// Unchecked access to a stored value. [`encode`](Self::encode) still
    /// validates whatever ends up here.
    pub fn field_mut(&mut self, name: &str) -> Result<&mut FieldValue> {
        let idx = self.index(name)?;
        Ok(&mut self.values[idx])
    }

    /// Assign a value after checking it against the field kind and width.
    ///
    /// Assigning a `Prefixed` byte run also updates its length field.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let idx = self.index(name)?;
        let value = value.into();
        let layout = Arc::clone(&self.layout);
        let spec = &layout.fields()[idx];

        match (&spec.kind, &value) {
            (FieldKind::Bitfield { width }, FieldValue::Uint(v)) => {
                if *v > max_value(*width) {
                    return Err(FieldError::OutOfRange {
                        field: name.to_string(),
                        value: *v,
                        width: *width,
                    });
                }
            }
            (FieldKind::RawBytes { length }, FieldValue::Bytes(b)) => match length {
                LengthMode::Fixed(n) if b.len() != *n => {
                    return Err(FieldError::LengthMismatch {
                        field: name.to_string(),
                        expected: *n,
                        actual: b.len(),
                    });
                }
                LengthMode::Prefixed(_) => {
                    if let Some(j) = layout.length_source(idx) {
                        let len_spec = &layout.fields()[j];
                        let width = len_spec.width().unwrap_or(0);
                        let len = b.len() as u64;
                        if width == 0 || len > max_value(width) {
                            return Err(FieldError::OutOfRange {
                                field: len_spec.name().to_string(),
                                value: len,
                                width,
                            });
                        }
                        self.values[j] = FieldValue::Uint(len);
                    }
                }
                _ => {}
            },
            (kind, v) => {
                return Err(FieldError::TypeMismatch {
                    field: name.to_string(),
                    expected: kind.label(),
                    found: v.label(),
                });
            }
        }

        self.values[idx] = value;
        Ok(())
    }

    /// Parse `text` for the named field and [`set`](Self::set) it.
    ///
    /// Bitfields take decimal or `0x`-prefixed hex; byte runs take hex.
    pub fn set_from_str(&mut self, name: &str, text: &str) -> Result<()> {
        let idx = self.index(name)?;
        let invalid = || FieldError::InvalidText {
            field: name.to_string(),
            text: text.to_string(),
        };
        let t = text.trim();

        let value = match self.layout.fields()[idx].kind {
            FieldKind::Bitfield { .. } => {
                let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
                    Some(h) => u64::from_str_radix(h, 16),
                    None => t.parse::<u64>(),
                };
                FieldValue::Uint(parsed.map_err(|_| invalid())?)
            }
            FieldKind::RawBytes { .. } => {
                let h = t
                    .strip_prefix("0x")
                    .or_else(|| t.strip_prefix("0X"))
                    .unwrap_or(t);
                FieldValue::Bytes(hex::decode(h).map_err(|_| invalid())?)
            }
        };
        self.set(name, value)
    }
}
