//! Layout descriptors: the ordered field schema of one box type plus its
//! default values.
//!
//! A layout is validated once, when it is built. Decode and encode rely on
//! the checks made here (byte alignment of raw runs, `Remainder` placement,
//! resolvable length fields) and never re-derive them.

use crate::bits::{MAX_WIDTH, max_value};
use crate::error::LayoutError;
use crate::field::{FieldKind, FieldSpec, FieldValue, LengthMode};
use std::borrow::Cow;
use tracing::warn;

/// Largest `Fixed` byte run a layout may declare. Defaults are zero-filled
/// eagerly, so this also bounds the default allocation.
pub const MAX_FIXED_LEN: usize = 1 << 16;

/// Ordered field schema for one box type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutDescriptor {
    fields: Vec<FieldSpec>,
    defaults: Vec<FieldValue>,
    // index of the bitfield holding each `Prefixed` run's length
    length_sources: Vec<Option<usize>>,
}

impl LayoutDescriptor {
    /// Build a layout from a field table and a table of integer defaults.
    pub fn new(fields: &[FieldSpec], defaults: &[(&'static str, u64)]) -> Result<Self, LayoutError> {
        LayoutBuilder::new(fields).defaults(defaults).build()
    }

    pub fn builder(fields: &[FieldSpec]) -> LayoutBuilder {
        LayoutBuilder::new(fields)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the first field called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    /// Default values in layout order.
    pub fn defaults(&self) -> &[FieldValue] {
        &self.defaults
    }

    /// For a `Prefixed` byte run, the index of its length bitfield.
    pub fn length_source(&self, index: usize) -> Option<usize> {
        self.length_sources.get(index).copied().flatten()
    }

    /// Smallest payload, in bytes, that can decode against this layout.
    pub fn min_len(&self) -> usize {
        let bits: usize = self
            .fields
            .iter()
            .map(|f| match &f.kind {
                FieldKind::Bitfield { width } => *width as usize,
                FieldKind::RawBytes {
                    length: LengthMode::Fixed(n),
                } => n.saturating_mul(8),
                FieldKind::RawBytes { .. } => 0,
            })
            .fold(0usize, usize::saturating_add);
        bits / 8
    }
}

fn advance(bit_offset: usize, bits: usize, spec: &FieldSpec) -> Result<usize, LayoutError> {
    bit_offset
        .checked_add(bits)
        .ok_or_else(|| LayoutError::FieldTooLong {
            field: spec.name.to_string(),
            len: bits / 8,
            max: MAX_FIXED_LEN,
        })
}

/// Incremental construction of a [`LayoutDescriptor`].
#[derive(Debug, Clone, Default)]
pub struct LayoutBuilder {
    fields: Vec<FieldSpec>,
    defaults: Vec<(Cow<'static, str>, FieldValue)>,
}

impl LayoutBuilder {
    pub fn new(fields: &[FieldSpec]) -> Self {
        Self {
            fields: fields.to_vec(),
            defaults: Vec::new(),
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Add `(field name, value)` integer defaults.
    pub fn defaults(mut self, table: &[(&'static str, u64)]) -> Self {
        self.defaults
            .extend(table.iter().map(|(n, v)| (Cow::Borrowed(*n), FieldValue::Uint(*v))));
        self
    }

    pub fn default_value(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.defaults.push((Cow::Owned(name.into()), value.into()));
        self
    }

    pub fn build(self) -> Result<LayoutDescriptor, LayoutError> {
        let LayoutBuilder { fields, defaults } = self;

        let mut bit_offset = 0usize;
        let mut length_sources = Vec::with_capacity(fields.len());

        for (i, spec) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == spec.name) {
                warn!(field = %spec.name, "duplicate field name in layout; lookups resolve to the first");
            }

            let mut source = None;
            match &spec.kind {
                FieldKind::Bitfield { width } => {
                    if *width == 0 || *width > MAX_WIDTH {
                        return Err(LayoutError::InvalidWidth {
                            field: spec.name.to_string(),
                            width: *width,
                        });
                    }
                    bit_offset = advance(bit_offset, *width as usize, spec)?;
                }
                FieldKind::RawBytes { length } => {
                    if bit_offset % 8 != 0 {
                        return Err(LayoutError::MisalignedRawField {
                            field: spec.name.to_string(),
                            bit_offset,
                        });
                    }
                    match length {
                        LengthMode::Fixed(n) => {
                            if *n > MAX_FIXED_LEN {
                                return Err(LayoutError::FieldTooLong {
                                    field: spec.name.to_string(),
                                    len: *n,
                                    max: MAX_FIXED_LEN,
                                });
                            }
                            bit_offset = advance(bit_offset, n * 8, spec)?;
                        }
                        LengthMode::Remainder => {
                            if i + 1 != fields.len() {
                                return Err(LayoutError::RemainderNotLast {
                                    field: spec.name.to_string(),
                                });
                            }
                        }
                        LengthMode::Prefixed(length_field) => {
                            let pos = fields.iter().position(|f| f.name == *length_field);
                            match pos {
                                Some(j)
                                    if j < i
                                        && matches!(fields[j].kind, FieldKind::Bitfield { .. }) =>
                                {
                                    source = Some(j);
                                }
                                _ => {
                                    return Err(LayoutError::UnknownLengthField {
                                        field: spec.name.to_string(),
                                        length_field: length_field.to_string(),
                                    });
                                }
                            }
                        }
                    }
                }
            }
            length_sources.push(source);
        }

        if bit_offset % 8 != 0 {
            return Err(LayoutError::UnalignedEnd { bit_offset });
        }

        let mut values: Vec<FieldValue> = fields.iter().map(FieldSpec::zero_value).collect();
        let mut explicit = vec![false; fields.len()];

        for (name, value) in defaults {
            let bad = |reason: String| LayoutError::BadDefault {
                field: name.to_string(),
                reason,
            };
            let idx = fields
                .iter()
                .position(|f| f.name == name)
                .ok_or_else(|| bad("no such field".into()))?;

            match (&fields[idx].kind, &value) {
                (FieldKind::Bitfield { width }, FieldValue::Uint(v)) => {
                    if *v > max_value(*width) {
                        return Err(bad(format!("{} does not fit in {} bits", v, width)));
                    }
                }
                (FieldKind::RawBytes { length }, FieldValue::Bytes(b)) => {
                    if let LengthMode::Fixed(n) = length {
                        if b.len() != *n {
                            return Err(bad(format!("expected {} bytes, got {}", n, b.len())));
                        }
                    }
                }
                (kind, v) => {
                    return Err(bad(format!("expected {}, got {}", kind.label(), v.label())));
                }
            }
            values[idx] = value;
            explicit[idx] = true;
        }

        // A length field's default follows the default byte run it measures.
        for (i, src) in length_sources.iter().enumerate() {
            let Some(j) = *src else { continue };
            let len = match &values[i] {
                FieldValue::Bytes(b) => b.len() as u64,
                FieldValue::Uint(_) => continue,
            };
            let width = fields[j].width().unwrap_or(MAX_WIDTH);
            let conflict = explicit[j] && values[j] != FieldValue::Uint(len);
            if conflict || len > max_value(width) {
                return Err(LayoutError::BadDefault {
                    field: fields[j].name.to_string(),
                    reason: format!("must equal the length of `{}` ({})", fields[i].name, len),
                });
            }
            values[j] = FieldValue::Uint(len);
        }

        Ok(LayoutDescriptor {
            fields,
            defaults: values,
            length_sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_misaligned_raw_field() {
        let err = LayoutDescriptor::new(
            &[FieldSpec::bits("a", 3), FieldSpec::remainder("payload")],
            &[],
        )
        .unwrap_err();
        assert_eq!(
            err,
            LayoutError::MisalignedRawField {
                field: "payload".into(),
                bit_offset: 3
            }
        );
    }

    #[test]
    fn test_rejects_unaligned_end() {
        let err = LayoutDescriptor::new(&[FieldSpec::bits("a", 3), FieldSpec::bits("b", 4)], &[])
            .unwrap_err();
        assert_eq!(err, LayoutError::UnalignedEnd { bit_offset: 7 });
    }

    #[test]
    fn test_rejects_bad_widths() {
        for width in [0, 33] {
            let err = LayoutDescriptor::new(&[FieldSpec::bits("a", width)], &[]).unwrap_err();
            assert_eq!(
                err,
                LayoutError::InvalidWidth {
                    field: "a".into(),
                    width
                }
            );
        }
    }

    #[test]
    fn test_remainder_must_be_last() {
        let err = LayoutDescriptor::new(
            &[FieldSpec::remainder("rest"), FieldSpec::bits("a", 8)],
            &[],
        )
        .unwrap_err();
        assert_eq!(err, LayoutError::RemainderNotLast { field: "rest".into() });
    }

    #[test]
    fn test_prefixed_needs_earlier_bitfield() {
        let later = LayoutDescriptor::new(
            &[FieldSpec::prefixed("data", "size"), FieldSpec::bits("size", 8)],
            &[],
        )
        .unwrap_err();
        assert!(matches!(later, LayoutError::UnknownLengthField { .. }));

        let missing =
            LayoutDescriptor::new(&[FieldSpec::prefixed("data", "size")], &[]).unwrap_err();
        assert!(matches!(missing, LayoutError::UnknownLengthField { .. }));

        let ok = LayoutDescriptor::new(
            &[FieldSpec::bits("size", 8), FieldSpec::prefixed("data", "size")],
            &[],
        )
        .unwrap();
        assert_eq!(ok.length_source(1), Some(0));
        assert_eq!(ok.length_source(0), None);
    }

    #[test]
    fn test_defaults_are_validated() {
        let fields = [
            FieldSpec::fixed_bytes("tag", 4),
            FieldSpec::bits("flag", 1),
            FieldSpec::bits("pad", 7),
        ];

        let too_big = LayoutDescriptor::new(&fields, &[("flag", 2)]).unwrap_err();
        assert!(matches!(too_big, LayoutError::BadDefault { .. }));

        let unknown = LayoutDescriptor::new(&fields, &[("nope", 0)]).unwrap_err();
        assert!(matches!(unknown, LayoutError::BadDefault { .. }));

        let wrong_len = LayoutDescriptor::builder(&fields)
            .default_value("tag", vec![1u8, 2])
            .build()
            .unwrap_err();
        assert!(matches!(wrong_len, LayoutError::BadDefault { .. }));

        let wrong_kind = LayoutDescriptor::new(&fields, &[("tag", 1)]).unwrap_err();
        assert!(matches!(wrong_kind, LayoutError::BadDefault { .. }));
    }

    #[test]
    fn test_default_values_fill_unlisted_fields() {
        let layout = LayoutDescriptor::new(
            &[
                FieldSpec::bits("marker", 1),
                FieldSpec::bits("version", 7),
                FieldSpec::fixed_bytes("brand", 2),
                FieldSpec::remainder("rest"),
            ],
            &[("marker", 1), ("version", 1)],
        )
        .unwrap();
        assert_eq!(
            layout.defaults(),
            &[
                FieldValue::Uint(1),
                FieldValue::Uint(1),
                FieldValue::Bytes(vec![0, 0]),
                FieldValue::Bytes(vec![]),
            ]
        );
        assert_eq!(layout.min_len(), 3);
    }

    #[test]
    fn test_prefixed_default_sets_length_field() {
        let fields = [FieldSpec::bits("size", 8), FieldSpec::prefixed("data", "size")];
        let layout = LayoutDescriptor::builder(&fields)
            .default_value("data", vec![9u8, 9, 9])
            .build()
            .unwrap();
        assert_eq!(layout.defaults()[0], FieldValue::Uint(3));

        let conflict = LayoutDescriptor::builder(&fields)
            .defaults(&[("size", 1)])
            .default_value("data", vec![9u8, 9, 9])
            .build()
            .unwrap_err();
        assert!(matches!(conflict, LayoutError::BadDefault { .. }));
    }

    #[test]
    fn test_duplicate_names_resolve_to_first() {
        let layout = LayoutDescriptor::new(
            &[FieldSpec::bits("reserved", 4), FieldSpec::bits("reserved", 4)],
            &[("reserved", 3)],
        )
        .unwrap();
        assert_eq!(layout.index_of("reserved"), Some(0));
        assert_eq!(layout.defaults()[0], FieldValue::Uint(3));
        assert_eq!(layout.defaults()[1], FieldValue::Uint(0));
    }

    #[test]
    fn test_rejects_oversized_fixed_run() {
        let err = LayoutDescriptor::new(&[FieldSpec::fixed_bytes("blob", usize::MAX / 4)], &[])
            .unwrap_err();
        assert_eq!(
            err,
            LayoutError::FieldTooLong {
                field: "blob".into(),
                len: usize::MAX / 4,
                max: MAX_FIXED_LEN,
            }
        );

        let err = LayoutDescriptor::new(&[FieldSpec::fixed_bytes("blob", MAX_FIXED_LEN + 1)], &[])
            .unwrap_err();
        assert!(matches!(err, LayoutError::FieldTooLong { len, .. } if len == MAX_FIXED_LEN + 1));

        let layout =
            LayoutDescriptor::new(&[FieldSpec::fixed_bytes("blob", MAX_FIXED_LEN)], &[]).unwrap();
        assert_eq!(layout.min_len(), MAX_FIXED_LEN);
        assert_eq!(layout.defaults()[0].as_bytes().map(<[u8]>::len), Some(MAX_FIXED_LEN));
    }

    mod warnings {
        use super::*;
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tracing::{Event, Level, Subscriber};
        use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

        struct CountWarnings(Arc<AtomicUsize>);

        impl<S: Subscriber> Layer<S> for CountWarnings {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                if *event.metadata().level() == Level::WARN {
                    self.0.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        fn warnings_while(f: impl FnOnce()) -> usize {
            let count = Arc::new(AtomicUsize::new(0));
            let subscriber = tracing_subscriber::registry().with(CountWarnings(count.clone()));
            tracing::subscriber::with_default(subscriber, f);
            count.load(Ordering::SeqCst)
        }

        #[test]
        fn test_duplicate_name_warns_once() {
            let n = warnings_while(|| {
                LayoutDescriptor::new(
                    &[FieldSpec::bits("reserved", 4), FieldSpec::bits("reserved", 4)],
                    &[],
                )
                .unwrap();
            });
            assert_eq!(n, 1);
        }

        #[test]
        fn test_unique_names_do_not_warn() {
            let n = warnings_while(|| {
                LayoutDescriptor::new(&[FieldSpec::bits("a", 4), FieldSpec::bits("b", 4)], &[])
                    .unwrap();
            });
            assert_eq!(n, 0);
        }
    }
}
