use mp4fields::boxes::FourCC;
use mp4fields::json_api::{JsonBox, decode_to_json};
use mp4fields::registry::default_registry;
use serde_json::{self, Value};

#[test]
fn av1c_defaults_serialize_to_json() {
    let reg = default_registry().expect("default registry");
    let inst = reg.instantiate(FourCC(*b"av1C")).expect("av1C registered");

    let json_str = serde_json::to_string(&JsonBox::from_instance(&inst)).expect("serialize to JSON failed");
    let v: Value = serde_json::from_str(&json_str).expect("parse JSON failed");

    assert_eq!(v["typ"], "av1C");
    assert_eq!(v["full_name"], "AV1 Codec Configuration Box");
    assert_eq!(v["size"], 4);

    let fields = v["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 15);

    let first = &fields[0];
    assert_eq!(first["name"], "marker");
    assert_eq!(first["kind"], "bits");
    assert_eq!(first["width"], 1);
    assert_eq!(first["value"], 1);
    assert!(first.get("length").is_none());

    let obus = &fields[14];
    assert_eq!(obus["name"], "configOBUs");
    assert_eq!(obus["kind"], "bytes");
    assert_eq!(obus["length"], "remainder");
    assert_eq!(obus["value"], "");
    assert!(obus.get("width").is_none());
}

#[test]
fn decode_to_json_renders_bytes_as_hex() {
    let reg = default_registry().unwrap();
    let payload = [0x00, 0x1f, 0x82, 0x01, 0x01, 0x01, 0x00, 0x02, 0xca, 0xfe];

    let jb = decode_to_json(&reg, FourCC(*b"vpcC"), &payload).unwrap();
    let v = serde_json::to_value(&jb).unwrap();

    assert_eq!(v["size"], 10);
    let data = v["fields"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["name"] == "codec_initialization_data")
        .unwrap();
    assert_eq!(data["value"], "cafe");
    assert_eq!(data["length"], "codec_initialization_data_size");
}

#[test]
fn decode_to_json_unknown_type() {
    let reg = default_registry().unwrap();
    let err = decode_to_json(&reg, FourCC(*b"zzzz"), &[]).err().unwrap();
    assert!(err.to_string().contains("zzzz"));
}
