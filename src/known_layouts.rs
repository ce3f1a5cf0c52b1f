//! Field layouts for box types this crate knows out of the box.
//!
//! Each layout is plain data: a field table and a defaults table. Payloads
//! start after the box header, and for FullBoxes after version and flags.

use crate::boxes::FourCC;
use crate::error::LayoutError;
use crate::field::FieldSpec;
use crate::layout::LayoutDescriptor;

/// AV1 codec configuration (`av1C`), AV1-ISOBMFF section 2.3.
///
/// The 3-bit reserved field is named `reserved`. mp4v2 spells it
/// `"reserved "` with a trailing space; that spelling is not a field here and
/// looks up as `UnknownField`.
pub const AV1C_FIELDS: &[FieldSpec] = &[
    FieldSpec::bits("marker", 1),
    FieldSpec::bits("version", 7),
    FieldSpec::bits("seq_profile", 3),
    FieldSpec::bits("seq_level_idx_0", 5),
    FieldSpec::bits("seq_tier_0", 1),
    FieldSpec::bits("high_bitdepth", 1),
    FieldSpec::bits("twelve_bit", 1),
    FieldSpec::bits("monochrome", 1),
    FieldSpec::bits("chroma_subsampling_x", 1),
    FieldSpec::bits("chroma_subsampling_y", 1),
    FieldSpec::bits("chroma_sample_position", 2),
    FieldSpec::bits("reserved", 3),
    FieldSpec::bits("initial_presentation_delay_present", 1),
    FieldSpec::bits("initial_presentation_delay_minus_one_or_reserved", 4),
    FieldSpec::remainder("configOBUs"),
];

pub const AV1C_DEFAULTS: &[(&str, u64)] = &[("marker", 1), ("version", 1)];

/// VP codec configuration (`vpcC`), payload after the FullBox header.
pub const VPCC_FIELDS: &[FieldSpec] = &[
    FieldSpec::bits("profile", 8),
    FieldSpec::bits("level", 8),
    FieldSpec::bits("bit_depth", 4),
    FieldSpec::bits("chroma_subsampling", 3),
    FieldSpec::bits("video_full_range_flag", 1),
    FieldSpec::bits("colour_primaries", 8),
    FieldSpec::bits("transfer_characteristics", 8),
    FieldSpec::bits("matrix_coefficients", 8),
    FieldSpec::bits("codec_initialization_data_size", 16),
    FieldSpec::prefixed("codec_initialization_data", "codec_initialization_data_size"),
];

// 8-bit 4:2:0, BT.709
pub const VPCC_DEFAULTS: &[(&str, u64)] = &[
    ("bit_depth", 8),
    ("chroma_subsampling", 1),
    ("colour_primaries", 1),
    ("transfer_characteristics", 1),
    ("matrix_coefficients", 1),
];

/// Pixel aspect ratio (`pasp`).
pub const PASP_FIELDS: &[FieldSpec] = &[
    FieldSpec::bits("h_spacing", 32),
    FieldSpec::bits("v_spacing", 32),
];

pub const PASP_DEFAULTS: &[(&str, u64)] = &[("h_spacing", 1), ("v_spacing", 1)];

/// Bit rate (`btrt`).
pub const BTRT_FIELDS: &[FieldSpec] = &[
    FieldSpec::bits("buffer_size_db", 32),
    FieldSpec::bits("max_bitrate", 32),
    FieldSpec::bits("avg_bitrate", 32),
];

/// File type (`ftyp`).
pub const FTYP_FIELDS: &[FieldSpec] = &[
    FieldSpec::fixed_bytes("major_brand", 4),
    FieldSpec::bits("minor_version", 32),
    FieldSpec::remainder("compatible_brands"),
];

pub const FTYP_DEFAULTS: &[(&str, u64)] = &[("minor_version", 512)];

/// Box types with a built-in layout.
///
/// Converts from a [`FourCC`]; codes without a built-in layout come back as
/// the error value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownLayout {
    Av1C,
    VpcC,
    Pasp,
    Btrt,
    Ftyp,
}

impl TryFrom<FourCC> for KnownLayout {
    type Error = FourCC;

    fn try_from(cc: FourCC) -> Result<Self, FourCC> {
        match &cc.0 {
            b"av1C" => Ok(KnownLayout::Av1C),
            b"vpcC" => Ok(KnownLayout::VpcC),
            b"pasp" => Ok(KnownLayout::Pasp),
            b"btrt" => Ok(KnownLayout::Btrt),
            b"ftyp" => Ok(KnownLayout::Ftyp),
            _ => Err(cc),
        }
    }
}

impl KnownLayout {
    pub const ALL: [KnownLayout; 5] = [
        KnownLayout::Av1C,
        KnownLayout::VpcC,
        KnownLayout::Pasp,
        KnownLayout::Btrt,
        KnownLayout::Ftyp,
    ];

    pub fn fourcc(&self) -> FourCC {
        match self {
            KnownLayout::Av1C => FourCC(*b"av1C"),
            KnownLayout::VpcC => FourCC(*b"vpcC"),
            KnownLayout::Pasp => FourCC(*b"pasp"),
            KnownLayout::Btrt => FourCC(*b"btrt"),
            KnownLayout::Ftyp => FourCC(*b"ftyp"),
        }
    }

    /// Human-readable name.
    pub fn full_name(&self) -> &'static str {
        match self {
            KnownLayout::Av1C => "AV1 Codec Configuration Box",
            KnownLayout::VpcC => "VP Codec Configuration Box",
            KnownLayout::Pasp => "Pixel Aspect Ratio Box",
            KnownLayout::Btrt => "Bit Rate Box",
            KnownLayout::Ftyp => "File Type Box",
        }
    }

    pub fn layout(&self) -> Result<LayoutDescriptor, LayoutError> {
        match self {
            KnownLayout::Av1C => LayoutDescriptor::new(AV1C_FIELDS, AV1C_DEFAULTS),
            KnownLayout::VpcC => LayoutDescriptor::new(VPCC_FIELDS, VPCC_DEFAULTS),
            KnownLayout::Pasp => LayoutDescriptor::new(PASP_FIELDS, PASP_DEFAULTS),
            KnownLayout::Btrt => LayoutDescriptor::new(BTRT_FIELDS, &[]),
            KnownLayout::Ftyp => LayoutDescriptor::builder(FTYP_FIELDS)
                .defaults(FTYP_DEFAULTS)
                .default_value("major_brand", b"isom".to_vec())
                .default_value("compatible_brands", b"isom".to_vec())
                .build(),
        }
    }
}
