use crate::{
    boxes::FourCC,
    field::{FieldKind, FieldValue, LengthMode},
    instance::BoxInstance,
    known_layouts::KnownLayout,
    registry::Registry,
};
use serde::Serialize;

/// A JSON-serializable view of one decoded box.
///
/// Meant for tools and UIs; field values keep their layout order.
#[derive(Serialize)]
pub struct JsonBox {
    /// Four-character box type code (e.g. "av1C")
    pub typ: FourCC,
    /// Human-readable box type name, empty for types without a built-in layout
    pub full_name: String,
    /// Encoded payload size in bytes
    pub size: usize,
    pub fields: Vec<JsonField>,
}

#[derive(Serialize)]
pub struct JsonField {
    pub name: String,
    /// "bits" or "bytes"
    pub kind: &'static str,
    /// Bit width, bitfields only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Length rule, byte runs only: a byte count, "remainder", or the name of the length field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
    /// Number for bitfields, hex string for byte runs
    pub value: FieldValue,
}

impl JsonBox {
    pub fn from_instance(inst: &BoxInstance) -> Self {
        let fields = inst
            .fields()
            .map(|(spec, value)| {
                let length = match &spec.kind {
                    FieldKind::Bitfield { .. } => None,
                    FieldKind::RawBytes { length } => Some(match length {
                        LengthMode::Fixed(n) => n.to_string(),
                        LengthMode::Remainder => "remainder".to_string(),
                        LengthMode::Prefixed(f) => f.to_string(),
                    }),
                };
                JsonField {
                    name: spec.name().to_string(),
                    kind: spec.kind.label(),
                    width: spec.width(),
                    length,
                    value: value.clone(),
                }
            })
            .collect();

        JsonBox {
            typ: inst.typ(),
            full_name: KnownLayout::try_from(inst.typ())
                .map(|k| k.full_name().to_string())
                .unwrap_or_default(),
            size: inst.encoded_len(),
            fields,
        }
    }
}

/// Decode `payload` as `typ` and return its JSON view.
///
/// Fails if the type has no registered layout or the payload does not decode.
pub fn decode_to_json(reg: &Registry, typ: FourCC, payload: &[u8]) -> anyhow::Result<JsonBox> {
    let (inst, _) = reg
        .decode(typ, payload)
        .ok_or_else(|| anyhow::anyhow!("no layout registered for `{}`", typ))??;
    Ok(JsonBox::from_instance(&inst))
}
