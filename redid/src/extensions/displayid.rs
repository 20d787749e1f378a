//! DisplayID section carried inside an extension record.
use crate::emitter::DecodeCtx;
use crate::errors::Result;
use crate::extensions::{ExtensionFormat, field_tag};
use crate::mapper::{MapEntry, Mapper};
use crate::modes::{TimingMode, TimingSource};
use crate::structs::Split;

/// Section data may not run into the section checksum at byte 126.
const MAX_SECTION_BYTES: usize = 121;
const TYPE_I_TIMING_BYTES: u64 = 20;

const BLOCK_TAGS: &[MapEntry] = &[
    MapEntry::desc(0x00, "Product Identification Data Block"),
    MapEntry::desc(0x01, "Display Parameters Data Block"),
    MapEntry::desc(0x02, "Color Characteristics"),
    MapEntry::desc(0x03, "Type I Timing - Detailed"),
    MapEntry::desc(0x04, "Type II Timing - Detailed"),
    MapEntry::desc(0x05, "Type III Timing - Short"),
    MapEntry::desc(0x06, "Type IV Timing - DMT ID Code"),
    MapEntry::desc(0x07, "VESA Timing Standard"),
    MapEntry::desc(0x08, "CEA Timing Standard"),
    MapEntry::desc(0x09, "Video Timing Range Limits"),
    MapEntry::desc(0x0a, "Product Serial Number"),
    MapEntry::desc(0x0b, "General Purpose ASCII String"),
    MapEntry::desc(0x0c, "Display Device Data"),
    MapEntry::desc(0x0d, "Interface Power Sequencing Data Block"),
    MapEntry::desc(0x0e, "Transfer Characteristics Data Block"),
    MapEntry::desc(0x0f, "Display Interface Data Block"),
    MapEntry::desc(0x10, "Stereo Display Interface Data Block"),
    MapEntry::desc(0x11, "Type V Timing - Short"),
    MapEntry::desc(0x12, "Tiled Display Topology Data Block"),
    MapEntry::desc(0x13, "Type VI Timing - Detailed"),
    MapEntry::desc(0x7f, "Vendor Specific Data Block"),
];

const PRODUCT_TYPES: &[MapEntry] = &[
    MapEntry::sym(0, "extension_section"),
    MapEntry::sym(1, "test_structure"),
    MapEntry::sym(2, "display_panel"),
    MapEntry::sym(3, "standalone_display"),
    MapEntry::sym(4, "television_receiver"),
    MapEntry::sym(5, "repeater"),
    MapEntry::sym(6, "direct_drive_monitor"),
];

const ASPECT: &[MapEntry] = &[
    MapEntry::sym(0, "1:1"),
    MapEntry::sym(1, "5:4"),
    MapEntry::sym(2, "4:3"),
    MapEntry::sym(3, "15:9"),
    MapEntry::sym(4, "16:9"),
    MapEntry::sym(5, "16:10"),
    MapEntry::sym(6, "64:27"),
    MapEntry::sym(7, "256:135"),
    MapEntry::sym(8, "undefined"),
];

const STEREO: &[MapEntry] = &[
    MapEntry::sym(0, "no_stereo"),
    MapEntry::sym(1, "always_stereo"),
    MapEntry::sym(2, "switchable_stereo"),
];

const SCAN_TYPE: &[MapEntry] = &[
    MapEntry::sym(0, "progressive"),
    MapEntry::sym(1, "interlaced"),
];

const POLARITY: &[MapEntry] = &[
    MapEntry::sym(0, "negative"),
    MapEntry::sym(1, "positive"),
];

#[derive(Debug, Default)]
pub struct DisplayId;

impl ExtensionFormat for DisplayId {
    fn tag(&self) -> u8 {
        0x70
    }

    fn name(&self) -> &'static str {
        "DisplayID"
    }

    fn decode(&self, d: &mut DecodeCtx) -> Result<()> {
        let start = d.pos() / 8;
        field_tag(d)?;
        d.field_uint("version", 4, &[])?;
        d.field_uint("revision", 4, &[])?;
        let declared = d.field_uint("bytes_of_data", 8, &[Mapper::Unit("bytes")])? as usize;
        let product = d.field_uint("product_type", 8, &[Mapper::Lookup(PRODUCT_TYPES)])?;
        let extensions = d.field_uint("extension_count", 8, &[])?;
        d.field_value_bool("is_an_extension", product == 0 && extensions == 0);

        let section = declared.min(MAX_SECTION_BYTES);
        if section < declared {
            tracing::warn!(declared, "DisplayID section clamped to the record");
        }
        d.field_array("data_blocks", |d| d.framed(section * 8, decode_data_blocks))?;

        // covers the section from the version byte up to the checksum itself
        d.field_checksum("section_checksum", start + 1)?;

        if d.bits_left() > 0 {
            d.field_raw("padding", d.bits_left() / 8)?;
        }
        Ok(())
    }
}

/// Blocks filling the current frame; tag `0x00` is only a block when it comes first.
fn decode_data_blocks(d: &mut DecodeCtx) -> Result<()> {
    let first = d.pos();
    while d.bits_left() >= 8 {
        if d.peek_uint(8)? == 0 && d.pos() != first {
            break;
        }
        d.field_struct("data_block", |d| {
            let tag = d.field_uint("tag", 8, &[Mapper::Hex, Mapper::Lookup(BLOCK_TAGS)])?;
            if tag == 0x03 {
                d.field_uint("revision", 8, &[])?;
            } else {
                d.field_uint("flags", 5, &[])?;
                d.field_uint("revision", 3, &[])?;
            }
            let payload = d.field_uint("payload_bytes", 8, &[Mapper::Unit("bytes")])?;
            d.framed(payload as usize * 8, |d| {
                if tag == 0x03 {
                    for _ in 0..payload / TYPE_I_TIMING_BYTES {
                        d.field_struct("timing", decode_type_i_timing)?;
                    }
                }
                if d.bits_left() > 0 {
                    d.field_raw("payload", d.bits_left() / 8)?;
                }
                Ok(())
            })
        })?;
    }
    if d.bits_left() > 0 {
        d.field_raw("padding", d.bits_left() / 8)?;
    }
    Ok(())
}

/// A 15-bit front porch with the sync polarity in the top bit of its high byte.
fn field_porch(d: &mut DecodeCtx, porch: &str, polarity: &str, unit: &'static str) -> Result<u64> {
    let low = d.read_part(8)?;
    d.field_uint(polarity, 1, &[Mapper::Lookup(POLARITY)])?;
    let high = d.read_part(7)?;
    let split = Split::join(low, high, 8);
    d.field_split(porch, &split, &[Mapper::Add(1), Mapper::Unit(unit)]);
    Ok(split.value + 1)
}

/// Values in a Type I timing are stored minus one.
fn decode_type_i_timing(d: &mut DecodeCtx) -> Result<()> {
    let clock = d.field_uint(
        "pixel_clock",
        24,
        &[Mapper::Add(1), Mapper::Div(100.0), Mapper::Unit("MHz")],
    )? + 1;
    d.field_bool("preferred_timing")?;
    d.field_uint("stereo_3d_support", 2, &[Mapper::Lookup(STEREO)])?;
    let interlaced = d.field_uint("scan_type", 1, &[Mapper::Lookup(SCAN_TYPE)])? == 1;
    d.field_uint("aspect_ratio", 4, &[Mapper::Lookup(ASPECT)])?;

    let plus_one = |unit| [Mapper::Add(1), Mapper::Unit(unit)];
    let h_active = d.field_uint("horizontal_active_pixels", 16, &plus_one("pixels"))? + 1;
    let h_blank = d.field_uint("horizontal_blank_pixels", 16, &plus_one("pixels"))? + 1;
    field_porch(d, "horizontal_front_porch", "horizontal_sync_polarity", "pixels")?;
    d.field_uint("horizontal_sync_width", 16, &plus_one("pixels"))?;

    let v_active = d.field_uint("vertical_active_lines", 16, &plus_one("lines"))? + 1;
    let v_blank = d.field_uint("vertical_blank_lines", 16, &plus_one("lines"))? + 1;
    field_porch(d, "vertical_front_porch", "vertical_sync_polarity", "lines")?;
    d.field_uint("vertical_sync_width", 16, &plus_one("lines"))?;

    d.record_mode(TimingMode::from_totals(
        h_active,
        v_active,
        h_active + h_blank,
        v_active + v_blank,
        clock * 10_000,
        interlaced,
        TimingSource::DisplayId,
    ));
    Ok(())
}
