use mp4fields::boxes::FourCC;
use mp4fields::error::FieldError;
use mp4fields::known_layouts::KnownLayout;
use mp4fields::registry::default_registry;

#[test]
fn known_layout_from_fourcc() {
    let kl = KnownLayout::try_from(FourCC(*b"av1C")).unwrap();
    assert_eq!(kl, KnownLayout::Av1C);
    assert_eq!(kl.full_name(), "AV1 Codec Configuration Box");
    assert_eq!(kl.fourcc(), FourCC(*b"av1C"));

    assert_eq!(KnownLayout::try_from(FourCC(*b"moov")), Err(FourCC(*b"moov")));
}

#[test]
fn every_known_layout_builds_and_encodes_defaults() {
    for kl in KnownLayout::ALL {
        let layout = kl.layout().unwrap_or_else(|e| panic!("{:?}: {}", kl, e));
        assert_eq!(KnownLayout::try_from(kl.fourcc()), Ok(kl));

        let reg = default_registry().unwrap();
        let inst = reg.instantiate(kl.fourcc()).unwrap();
        assert_eq!(inst.values(), layout.defaults());

        let bytes = inst.to_bytes().unwrap();
        assert!(bytes.len() >= layout.min_len());
    }
}

#[test]
fn vpcc_prefixed_codec_init_data() {
    let reg = default_registry().unwrap();
    let mut inst = reg.instantiate(FourCC(*b"vpcC")).unwrap();

    // profile 0, level 31, 8-bit, 4:2:0 colocated, limited range, BT.709
    assert_eq!(
        inst.to_bytes().unwrap(),
        vec![0x00, 0x00, 0x82, 0x01, 0x01, 0x01, 0x00, 0x00]
    );

    inst.set("level", 31u64).unwrap();
    inst.set("codec_initialization_data", vec![0xde, 0xad, 0xbe]).unwrap();
    assert_eq!(inst.get_uint("codec_initialization_data_size").unwrap(), 3);

    let bytes = inst.to_bytes().unwrap();
    assert_eq!(bytes.len(), 11);
    assert_eq!(&bytes[6..8], &[0x00, 0x03]);

    // trailing bytes belong to the next box
    let mut padded = bytes.clone();
    padded.extend_from_slice(&[0xff, 0xff]);
    let (back, consumed) = reg.decode(FourCC(*b"vpcC"), &padded).unwrap().unwrap();
    assert_eq!(consumed, 11);
    assert_eq!(back, inst);
}

#[test]
fn vpcc_length_mismatch_is_caught() {
    let reg = default_registry().unwrap();
    let mut inst = reg.instantiate(FourCC(*b"vpcC")).unwrap();
    inst.set("codec_initialization_data", vec![1u8, 2]).unwrap();
    inst.set("codec_initialization_data_size", 5u64).unwrap();

    match inst.to_bytes().unwrap_err() {
        FieldError::LengthMismatch {
            field,
            expected,
            actual,
        } => {
            assert_eq!(field, "codec_initialization_data");
            assert_eq!(expected, 5);
            assert_eq!(actual, 2);
        }
        other => panic!("expected LengthMismatch, got {:?}", other),
    }
}

#[test]
fn vpcc_truncated_init_data() {
    let reg = default_registry().unwrap();
    // size says 4 bytes of init data, only 1 present
    let input = [0, 0, 0x82, 1, 1, 1, 0, 4, 0xaa];
    let err = reg.decode(FourCC(*b"vpcC"), &input).unwrap().unwrap_err();
    assert!(matches!(err, FieldError::TruncatedInput { ref field, .. } if field == "codec_initialization_data"));
}

#[test]
fn ftyp_fixed_brand_and_remainder() {
    let reg = default_registry().unwrap();

    let mut payload = Vec::new();
    payload.extend_from_slice(b"isom");
    payload.extend_from_slice(&512u32.to_be_bytes());
    payload.extend_from_slice(b"isomav01");

    let (inst, consumed) = reg.decode(FourCC(*b"ftyp"), &payload).unwrap().unwrap();
    assert_eq!(consumed, 16);
    assert_eq!(inst.get_bytes("major_brand").unwrap(), b"isom");
    assert_eq!(inst.get_uint("minor_version").unwrap(), 512);
    assert_eq!(inst.get_bytes("compatible_brands").unwrap(), b"isomav01");

    // defaults match the same minimal file type
    let defaults = reg.instantiate(FourCC(*b"ftyp")).unwrap();
    assert_eq!(defaults.to_bytes().unwrap(), payload[..12].to_vec());
}

#[test]
fn ftyp_fixed_length_is_enforced() {
    let reg = default_registry().unwrap();
    let mut inst = reg.instantiate(FourCC(*b"ftyp")).unwrap();

    assert!(matches!(
        inst.set("major_brand", b"mp4".to_vec()),
        Err(FieldError::LengthMismatch { expected: 4, actual: 3, .. })
    ));
    assert!(matches!(
        reg.decode(FourCC(*b"ftyp"), b"iso").unwrap(),
        Err(FieldError::TruncatedInput { .. })
    ));
}

#[test]
fn pasp_full_width_fields() {
    let reg = default_registry().unwrap();
    let mut inst = reg.instantiate(FourCC(*b"pasp")).unwrap();
    inst.set("h_spacing", u32::MAX as u64).unwrap();
    assert!(matches!(
        inst.set("v_spacing", 1u64 << 32),
        Err(FieldError::OutOfRange { width: 32, .. })
    ));

    let bytes = inst.to_bytes().unwrap();
    assert_eq!(bytes, vec![0xff, 0xff, 0xff, 0xff, 0, 0, 0, 1]);
}
