use mp4fields::{FieldKind, FieldSpec, FourCC, LayoutDescriptor, Registry, default_registry};

// Register a custom layout next to the built-in ones and print the JSON view
// of its defaults.
const CLLI_FIELDS: &[FieldSpec] = &[
    FieldSpec::bits("max_content_light_level", 16),
    FieldSpec::bits("max_pic_average_light_level", 16),
];

fn main() -> anyhow::Result<()> {
    let clli = LayoutDescriptor::new(CLLI_FIELDS, &[("max_content_light_level", 1000)])?;
    let reg: Registry = default_registry()?.with_layout(FourCC(*b"clli"), clli);

    for typ in reg.types() {
        let layout = reg.layout(&typ).expect("listed type is registered");
        let bits: u32 = layout
            .fields()
            .iter()
            .filter_map(|f| match f.kind {
                FieldKind::Bitfield { width } => Some(width),
                FieldKind::RawBytes { .. } => None,
            })
            .sum();
        println!("{}: {} fields, {} bitfield bits", typ, layout.len(), bits);
    }

    let inst = reg.instantiate(FourCC(*b"clli")).expect("clli registered");
    let json = serde_json::to_string_pretty(&mp4fields::JsonBox::from_instance(&inst))?;
    println!("{}", json);

    Ok(())
}
