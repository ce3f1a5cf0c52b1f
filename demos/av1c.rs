use mp4fields::{BoxInstance, FourCC, KnownLayout};
use std::sync::Arc;

// Build an av1C box from defaults, fill in a few fields, encode it and
// decode the bytes back.
fn main() -> anyhow::Result<()> {
    let layout = Arc::new(KnownLayout::Av1C.layout()?);
    let mut av1c = BoxInstance::new(FourCC(*b"av1C"), layout.clone());

    av1c.set("seq_level_idx_0", 8u64)?;
    av1c.set("chroma_subsampling_x", 1u64)?;
    av1c.set("chroma_subsampling_y", 1u64)?;
    av1c.set("configOBUs", vec![0x0a, 0x0b, 0x00, 0x00, 0x00, 0x24])?;

    let mut payload = Vec::new();
    av1c.encode(&mut payload)?;
    println!("av1C payload: {}", hex::encode(&payload));

    let (back, consumed) = BoxInstance::from_bytes(FourCC(*b"av1C"), layout, &payload)?;
    println!("decoded {} bytes:", consumed);
    for (spec, value) in back.fields() {
        println!("  {} = {}", spec.name(), value);
    }

    Ok(())
}
