//! The 18-byte descriptor slot: a display descriptor keyed by a tag byte, or a
//! detailed timing block.
use crate::emitter::DecodeCtx;
use crate::errors::{Error, Result};
use crate::mapper::{MapEntry, MapResult, Mapper, Scalar, Symbol, Unmapped, apply_all};
use crate::modes::{TimingMode, TimingSource};
use crate::structs::{BitRange, DESCRIPTOR_BITS, Split};
use crate::timings::{decode_established_timings_iii, decode_standard_timings};
use crate::tree::Validation;

const DISPLAY_TAGS: &[MapEntry] = &[
    MapEntry::desc(0xff, "Display Product Serial Number"),
    MapEntry::desc(0xfe, "Alphanumeric Data String (ASCII)"),
    MapEntry::desc(0xfd, "Display Range Limits"),
    MapEntry::desc(0xfc, "Display Product Name"),
    MapEntry::desc(0xfb, "Color Point Data"),
    MapEntry::desc(0xfa, "Standard Timing Identifications"),
    MapEntry::desc(0xf9, "Display Color Management (DCM) Data"),
    MapEntry::desc(0xf8, "CVT 3 Byte Timing Codes"),
    MapEntry::desc(0xf7, "Established Timings III"),
    MapEntry::desc(0x10, "Dummy Descriptor"),
];

const VIDEO_TIMING_SUPPORT: &[MapEntry] = &[
    MapEntry::sym(0x00, "default_gtf"),
    MapEntry::sym(0x01, "range_limits_only"),
    MapEntry::sym(0x02, "secondary_gtf"),
    MapEntry::sym(0x04, "cvt"),
];

const SCAN_TYPE: &[MapEntry] = &[
    MapEntry::sym(0, "non-interlaced"),
    MapEntry::sym(1, "interlaced"),
];

const SYNC_TYPE: &[MapEntry] = &[
    MapEntry::sym(0b00, "analog_composite"),
    MapEntry::sym(0b01, "bipolar_analog_composite"),
    MapEntry::sym(0b10, "digital_composite"),
    MapEntry::sym(0b11, "digital_separate"),
];

const POLARITY: &[MapEntry] = &[
    MapEntry::sym(0, "negative"),
    MapEntry::sym(1, "positive"),
];

const SYNC_ON: &[MapEntry] = &[
    MapEntry::sym(0, "green_only"),
    MapEntry::sym(1, "rgb"),
];

const FLAG: &[MapEntry] = &[MapEntry::flag(0, false), MapEntry::flag(1, true)];

const RANGE_LIMITS_PADDING: [u8; 7] = [0x0a, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20];
const COLOR_POINT_PADDING: [u8; 3] = [0x0a, 0x20, 0x20];

/// What an 18-byte slot holds, decided by its first two bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Display,
    DetailedTiming,
}

impl SlotKind {
    pub fn peek(d: &DecodeCtx) -> Result<Self> {
        Ok(match d.peek_uint(16)? {
            0 => SlotKind::Display,
            _ => SlotKind::DetailedTiming,
        })
    }
}

/// Payload layout of a display descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayKind {
    Text,
    RangeLimits,
    ColorPoint,
    StandardTimings,
    EstablishedTimingsIII,
    ManufacturerSpecific,
    Opaque,
}

impl DisplayKind {
    pub fn from_tag(tag: u64) -> Self {
        match tag {
            0xff | 0xfe | 0xfc => DisplayKind::Text,
            0xfd => DisplayKind::RangeLimits,
            0xfb => DisplayKind::ColorPoint,
            0xfa => DisplayKind::StandardTimings,
            0xf7 => DisplayKind::EstablishedTimingsIII,
            0x00..=0x0f => DisplayKind::ManufacturerSpecific,
            _ => DisplayKind::Opaque,
        }
    }
}

/// The 4-bit sync description at the end of a detailed timing block.
///
/// The two high bits pick the variant; the meaning of the two low bits
/// depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSignal {
    AnalogComposite {
        bipolar: bool,
        serrations: bool,
        sync_on_rgb: bool,
    },
    DigitalComposite {
        serrations: bool,
        hsync_positive: bool,
    },
    DigitalSeparate {
        vsync_positive: bool,
        hsync_positive: bool,
    },
}

impl SyncSignal {
    pub fn from_nibble(nibble: u64) -> Self {
        let third = nibble >> 1 & 0x1 == 1;
        let fourth = nibble & 0x1 == 1;
        match nibble >> 2 & 0x3 {
            0b11 => SyncSignal::DigitalSeparate {
                vsync_positive: third,
                hsync_positive: fourth,
            },
            0b10 => SyncSignal::DigitalComposite {
                serrations: third,
                hsync_positive: fourth,
            },
            kind => SyncSignal::AnalogComposite {
                bipolar: kind == 0b01,
                serrations: third,
                sync_on_rgb: fourth,
            },
        }
    }
}

/// Decode one 18-byte slot as a struct named `timing_name` or `display_name`
/// depending on what the slot holds.
pub(crate) fn decode_descriptor(
    d: &mut DecodeCtx,
    timing_name: &str,
    display_name: &str,
) -> Result<SlotKind> {
    let kind = SlotKind::peek(d)?;
    let name = match kind {
        SlotKind::Display => display_name,
        SlotKind::DetailedTiming => timing_name,
    };
    d.field_struct(name, |d| {
        d.framed(DESCRIPTOR_BITS, |d| match kind {
            SlotKind::Display => decode_display_descriptor(d),
            SlotKind::DetailedTiming => decode_detailed_timing(d),
        })
    })?;
    Ok(kind)
}

fn decode_display_descriptor(d: &mut DecodeCtx) -> Result<()> {
    d.field_raw_validate("identifier", &[0x00, 0x00, 0x00])?;
    let tag = d.field_uint("tag", 8, &[Mapper::Hex, Mapper::Lookup(DISPLAY_TAGS)])?;
    let kind = DisplayKind::from_tag(tag);
    let flags = match kind {
        DisplayKind::RangeLimits => d.field_uint("offset_flags", 8, &[Mapper::Hex])?,
        _ => d.field_uint("reserved", 8, &[])?,
    };

    match kind {
        DisplayKind::Text => {
            let trim = d.trim_strings();
            d.field_text("value", 13, trim)?;
        }
        DisplayKind::RangeLimits => d.field_struct("data", |d| decode_range_limits(d, flags))?,
        DisplayKind::ColorPoint => d.field_struct("data", decode_color_point)?,
        DisplayKind::StandardTimings => {
            d.field_array("standard_timings", |d| decode_standard_timings(d, 6))?;
            d.field_uint_validate("padding", 8, 0x0a, &[Mapper::Hex])?;
        }
        DisplayKind::EstablishedTimingsIII => {
            d.field_uint("revision", 8, &[])?;
            d.field_array("established_timings", decode_established_timings_iii)?;
            d.field_raw("reserved", 6)?;
        }
        DisplayKind::ManufacturerSpecific => {
            d.field_raw("manufacturer_data", d.bits_left() / 8)?;
        }
        DisplayKind::Opaque => {
            d.field_raw("data", d.bits_left() / 8)?;
        }
    }
    Ok(())
}

/// Range limits; bits 1:0 and 3:2 of `flags` add 255 to the vertical and
/// horizontal rates.
fn decode_range_limits(d: &mut DecodeCtx, flags: u64) -> Result<()> {
    let offset = |on: bool| if on { 255 } else { 0 };
    let vertical = flags & 0x3;
    let horizontal = flags >> 2 & 0x3;

    d.field_uint(
        "min_vertical_rate",
        8,
        &[Mapper::Add(offset(vertical == 0x3)), Mapper::Unit("Hz")],
    )?;
    d.field_uint(
        "max_vertical_rate",
        8,
        &[Mapper::Add(offset(vertical & 0x2 != 0)), Mapper::Unit("Hz")],
    )?;
    d.field_uint(
        "min_horizontal_rate",
        8,
        &[Mapper::Add(offset(horizontal == 0x3)), Mapper::Unit("kHz")],
    )?;
    d.field_uint(
        "max_horizontal_rate",
        8,
        &[Mapper::Add(offset(horizontal & 0x2 != 0)), Mapper::Unit("kHz")],
    )?;
    d.field_uint("max_pixel_clock", 8, &[Mapper::Mul(10), Mapper::Unit("MHz")])?;

    let support = d.field_uint(
        "video_timing_support",
        8,
        &[Mapper::Hex, Mapper::Lookup(VIDEO_TIMING_SUPPORT)],
    )?;
    match support {
        0x00 | 0x01 => {
            d.field_raw_validate("padding", &RANGE_LIMITS_PADDING)?;
        }
        0x02 => d.field_struct("secondary_gtf", |d| {
            d.field_uint("reserved", 8, &[])?;
            d.field_uint("start_frequency", 8, &[Mapper::Mul(2), Mapper::Unit("kHz")])?;
            d.field_uint("c", 8, &[Mapper::Div(2.0)])?;
            d.field_uint("m", 16, &[])?;
            d.field_uint("k", 8, &[])?;
            d.field_uint("j", 8, &[Mapper::Div(2.0)])?;
            Ok(())
        })?,
        _ => {
            d.field_raw("video_timing_data", 7)?;
        }
    }
    Ok(())
}

fn decode_color_point(d: &mut DecodeCtx) -> Result<()> {
    for _ in 0..2 {
        d.field_struct("white_point", |d| {
            d.field_uint("index", 8, &[])?;
            d.field_uint("reserved", 4, &[])?;
            let x_low = d.read_part(2)?;
            let y_low = d.read_part(2)?;
            let x_high = d.read_part(8)?;
            let y_high = d.read_part(8)?;
            for (name, low, high) in [("x", x_low, x_high), ("y", y_low, y_high)] {
                d.field_split(name, &Split::join(low, high, 2), &[Mapper::Div(1024.0)]);
            }
            d.field_uint("gamma", 8, &[Mapper::Div(100.0), Mapper::Add(1)])?;
            Ok(())
        })?;
    }
    d.field_raw_validate("padding", &COLOR_POINT_PADDING)?;
    Ok(())
}

fn stereo_mode(mut s: Scalar) -> MapResult {
    let Some(v) = s.key() else {
        return Err(Unmapped(s));
    };
    let mode = match v & 0x61 {
        0x00 | 0x01 => "normal",
        0x20 => "field_seq_right",
        0x21 => "2way_right",
        0x40 => "field_seq_left",
        0x41 => "2way_left",
        0x60 => "4way",
        _ => "side_by_side",
    };
    s.sym = Some(Symbol::text(mode));
    Ok(s)
}

/// Read `N` values whose low parts come first, followed by their
/// `high_bits`-wide high parts.
fn read_splits<const N: usize>(d: &mut DecodeCtx, low_bits: [usize; N], high_bits: usize) -> Result<[Split; N]> {
    let mut lows = Vec::with_capacity(N);
    for nbits in low_bits {
        lows.push(d.read_part(nbits)?);
    }
    let mut splits = Vec::with_capacity(N);
    for (low, nbits) in lows.into_iter().zip(low_bits) {
        let high = d.read_part(high_bits)?;
        splits.push(Split::join(low, high, nbits as u32));
    }
    splits
        .try_into()
        .map_err(|_| Error::InvalidWidth(high_bits))
}

/// `blanking - front_porch - sync_width`; an underflow is recorded on the field.
fn field_back_porch(d: &mut DecodeCtx, name: &str, blank: &Split, front: &Split, sync: &Split, unit: &'static str) -> u64 {
    let mut ranges: Vec<BitRange> = blank
        .ranges
        .iter()
        .chain(&front.ranges)
        .chain(&sync.ranges)
        .copied()
        .collect();
    ranges.sort();
    ranges.dedup();

    match blank.value.checked_sub(front.value + sync.value) {
        Some(porch) => {
            d.field_value_uint(name, porch, ranges, &[Mapper::Unit(unit)]);
            porch
        }
        None => {
            let validation = Validation::Unexpected {
                expected: format!("front porch + sync width <= {}", blank.value),
                found: format!("{} + {}", front.value, sync.value),
            };
            d.emit(name, ranges, apply_all(Scalar::uint(0), &[Mapper::Unit(unit)]), Some(validation));
            0
        }
    }
}

/// Detailed timing block, also used by the CEA-861 extension.
pub(crate) fn decode_detailed_timing(d: &mut DecodeCtx) -> Result<()> {
    let clock = d.field_uint("pixel_clock", 16, &[Mapper::Div(100.0), Mapper::Unit("MHz")])?;

    let [h_active, h_blank] = read_splits(d, [8, 8], 4)?;
    d.field_split("horizontal_addressable_video", &h_active, &[Mapper::Unit("pixels")]);
    d.field_split("horizontal_blanking", &h_blank, &[Mapper::Unit("pixels")]);

    let [v_active, v_blank] = read_splits(d, [8, 8], 4)?;
    d.field_split("vertical_addressable_video", &v_active, &[Mapper::Unit("lines")]);
    d.field_split("vertical_blanking", &v_blank, &[Mapper::Unit("lines")]);

    // 8+8 low bits for horizontal, 4+4 for vertical, then 2-bit highs for all four
    let [h_front, h_sync, v_front, v_sync] = read_splits(d, [8, 8, 4, 4], 2)?;
    d.field_split("horizontal_front_porch", &h_front, &[Mapper::Unit("pixels")]);
    d.field_split("horizontal_sync_pulse_width", &h_sync, &[Mapper::Unit("pixels")]);
    field_back_porch(d, "horizontal_back_porch", &h_blank, &h_front, &h_sync, "pixels");
    d.field_split("vertical_front_porch", &v_front, &[Mapper::Unit("lines")]);
    d.field_split("vertical_sync_pulse_width", &v_sync, &[Mapper::Unit("lines")]);
    field_back_porch(d, "vertical_back_porch", &v_blank, &v_front, &v_sync, "lines");

    let [h_size, v_size] = read_splits(d, [8, 8], 4)?;
    d.field_split("horizontal_addressable_video_image_size", &h_size, &[Mapper::Unit("mm")]);
    d.field_split("vertical_addressable_video_image_size", &v_size, &[Mapper::Unit("mm")]);

    d.field_uint("horizontal_border", 8, &[Mapper::Unit("pixels")])?;
    d.field_uint("vertical_border", 8, &[Mapper::Unit("lines")])?;

    let interlaced = d.field_uint("signal_interface_type", 1, &[Mapper::Lookup(SCAN_TYPE)])? == 1;
    d.field_uint("stereo_viewing_support", 7, &[Mapper::Formula(stereo_mode)])?;

    // sync nibble is bits 4..1 of the byte just read
    d.seek_relative(-5)?;
    let start = d.pos();
    let nibble = d.read_uint(4)?;
    d.seek_relative(1)?;
    field_sync_signal(d, nibble, start);

    d.record_mode(TimingMode::from_totals(
        h_active.value,
        v_active.value,
        h_active.value + h_blank.value,
        v_active.value + v_blank.value,
        clock * 10_000,
        interlaced,
        TimingSource::Detailed,
    ));
    Ok(())
}

fn field_sync_signal(d: &mut DecodeCtx, nibble: u64, start: usize) {
    let kind = BitRange::new(start, 2);
    let third = BitRange::new(start + 2, 1);
    let fourth = BitRange::new(start + 3, 1);
    d.field_value_uint("sync_signal", nibble >> 2, vec![kind], &[Mapper::Lookup(SYNC_TYPE)]);

    let bit = |b: bool| b as u64;
    match SyncSignal::from_nibble(nibble) {
        SyncSignal::AnalogComposite {
            serrations,
            sync_on_rgb,
            ..
        } => {
            d.field_value_uint("with_serrations", bit(serrations), vec![third], &[Mapper::Lookup(FLAG)]);
            d.field_value_uint("sync_on", bit(sync_on_rgb), vec![fourth], &[Mapper::Lookup(SYNC_ON)]);
        }
        SyncSignal::DigitalComposite {
            serrations,
            hsync_positive,
        } => {
            d.field_value_uint("with_serrations", bit(serrations), vec![third], &[Mapper::Lookup(FLAG)]);
            d.field_value_uint("hsync_polarity", bit(hsync_positive), vec![fourth], &[Mapper::Lookup(POLARITY)]);
        }
        SyncSignal::DigitalSeparate {
            vsync_positive,
            hsync_positive,
        } => {
            d.field_value_uint("vsync_polarity", bit(vsync_positive), vec![third], &[Mapper::Lookup(POLARITY)]);
            d.field_value_uint("hsync_polarity", bit(hsync_positive), vec![fourth], &[Mapper::Lookup(POLARITY)]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::Endian;
    use crate::tree::Group;

    // 1920x1080@60, 148.5 MHz, digital separate sync with both polarities positive
    const DTD_1080P: [u8; 18] = [
        0x02, 0x3a, 0x80, 0x18, 0x71, 0x38, 0x2d, 0x40, 0x58, 0x2c, 0x45, 0x00, 0x0f, 0x48, 0x42,
        0x00, 0x00, 0x1e,
    ];

    fn decode_slot(data: &[u8]) -> (Group, Vec<TimingMode>) {
        let mut d = DecodeCtx::new(data);
        d.set_endian(Endian::Little);
        decode_descriptor(&mut d, "preferred_timing_mode", "display_descriptor_1").unwrap();
        assert_eq!(d.pos(), DESCRIPTOR_BITS);
        let modes = d.take_modes();
        (d.finish(), modes)
    }

    #[test]
    fn test_detailed_timing_values() {
        let (root, modes) = decode_slot(&DTD_1080P);
        let t = root.group("preferred_timing_mode").unwrap();
        let uint = |name: &str| t.field(name).unwrap().uint().unwrap();

        assert_eq!(uint("pixel_clock"), 14850);
        assert_eq!(t.field("pixel_clock").unwrap().sym(), Some(&Symbol::Float(148.5)));
        assert_eq!(uint("horizontal_addressable_video"), 1920);
        assert_eq!(uint("horizontal_blanking"), 280);
        assert_eq!(uint("vertical_addressable_video"), 1080);
        assert_eq!(uint("vertical_blanking"), 45);
        assert_eq!(uint("horizontal_front_porch"), 88);
        assert_eq!(uint("horizontal_sync_pulse_width"), 44);
        assert_eq!(uint("horizontal_back_porch"), 148);
        assert_eq!(uint("vertical_front_porch"), 4);
        assert_eq!(uint("vertical_sync_pulse_width"), 5);
        assert_eq!(uint("vertical_back_porch"), 36);
        assert_eq!(uint("horizontal_addressable_video_image_size"), 1039);
        assert_eq!(uint("vertical_addressable_video_image_size"), 584);
        assert_eq!(t.field("signal_interface_type").unwrap().sym_str(), Some("non-interlaced"));
        assert_eq!(t.field("stereo_viewing_support").unwrap().sym_str(), Some("normal"));
        assert_eq!(t.field("sync_signal").unwrap().sym_str(), Some("digital_separate"));
        assert_eq!(t.field("vsync_polarity").unwrap().sym_str(), Some("positive"));
        assert_eq!(t.field("hsync_polarity").unwrap().sym_str(), Some("positive"));

        assert_eq!(modes.len(), 1);
        assert_eq!((modes[0].width, modes[0].height), (1920, 1080));
        assert!((modes[0].refresh_hz - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_detailed_timing_split_positions() {
        let (root, _) = decode_slot(&DTD_1080P);
        let t = root.group("preferred_timing_mode").unwrap();
        let ranges = |name: &str| t.field(name).unwrap().ranges.clone();

        assert_eq!(ranges("horizontal_addressable_video"), vec![BitRange::new(16, 8), BitRange::new(32, 4)]);
        assert_eq!(ranges("horizontal_blanking"), vec![BitRange::new(24, 8), BitRange::new(36, 4)]);
        assert_eq!(ranges("vertical_addressable_video"), vec![BitRange::new(40, 8), BitRange::new(56, 4)]);
        assert_eq!(ranges("vertical_blanking"), vec![BitRange::new(48, 8), BitRange::new(60, 4)]);
        assert_eq!(ranges("horizontal_front_porch"), vec![BitRange::new(64, 8), BitRange::new(88, 2)]);
        assert_eq!(ranges("horizontal_sync_pulse_width"), vec![BitRange::new(72, 8), BitRange::new(90, 2)]);
        assert_eq!(ranges("vertical_front_porch"), vec![BitRange::new(80, 4), BitRange::new(92, 2)]);
        assert_eq!(ranges("vertical_sync_pulse_width"), vec![BitRange::new(84, 4), BitRange::new(94, 2)]);
        assert_eq!(
            ranges("horizontal_addressable_video_image_size"),
            vec![BitRange::new(96, 8), BitRange::new(112, 4)]
        );
        assert_eq!(
            ranges("vertical_addressable_video_image_size"),
            vec![BitRange::new(104, 8), BitRange::new(116, 4)]
        );
        assert_eq!(ranges("sync_signal"), vec![BitRange::new(139, 2)]);
        assert_eq!(ranges("hsync_polarity"), vec![BitRange::new(142, 1)]);
    }

    #[test]
    fn test_vertical_porch_high_bits() {
        // a vertical front porch high part of 0b11 lands at bit 4 of the value
        let mut data = DTD_1080P;
        data[10] = 0x3f;
        data[11] = 0x0c;
        let (root, _) = decode_slot(&data);
        let t = root.group("preferred_timing_mode").unwrap();
        assert_eq!(t.field("vertical_front_porch").unwrap().uint(), Some(0b11_0011));
        assert_eq!(t.field("vertical_sync_pulse_width").unwrap().uint(), Some(0xf));
    }

    #[test]
    fn test_back_porch_underflow_is_flagged() {
        let mut data = DTD_1080P;
        // front porch 255 + sync 44 exceeds the 280 blanking pixels
        data[8] = 0xff;
        let (root, _) = decode_slot(&data);
        let t = root.group("preferred_timing_mode").unwrap();
        let porch = t.field("horizontal_back_porch").unwrap();
        assert_eq!(porch.uint(), Some(0));
        assert!(!porch.is_valid());
    }

    #[test]
    fn test_sync_variants() {
        assert_eq!(
            SyncSignal::from_nibble(0b0110),
            SyncSignal::AnalogComposite {
                bipolar: true,
                serrations: true,
                sync_on_rgb: false
            }
        );
        assert_eq!(
            SyncSignal::from_nibble(0b1001),
            SyncSignal::DigitalComposite {
                serrations: false,
                hsync_positive: true
            }
        );
    }

    #[test]
    fn test_stereo_modes() {
        let mode = |v| stereo_mode(Scalar::uint(v)).unwrap().sym;
        assert_eq!(mode(0x01), Some(Symbol::text("normal")));
        assert_eq!(mode(0x21), Some(Symbol::text("2way_right")));
        assert_eq!(mode(0x61), Some(Symbol::text("side_by_side")));
    }

    fn display(tag: u8, flags: u8, payload: &[u8]) -> [u8; 18] {
        let mut slot = [0u8; 18];
        slot[3] = tag;
        slot[4] = flags;
        slot[5..5 + payload.len()].copy_from_slice(payload);
        slot
    }

    #[test]
    fn test_product_name() {
        let (root, modes) = decode_slot(&display(0xfc, 0, b"DELL U2415\n  "));
        let t = root.group("display_descriptor_1").unwrap();
        assert!(t.field("identifier").unwrap().is_valid());
        assert_eq!(t.field("tag").unwrap().scalar.description.as_deref(), Some("Display Product Name"));
        assert_eq!(t.field("value").unwrap().str(), Some("DELL U2415"));
        assert!(modes.is_empty());
    }

    #[test]
    fn test_range_limits() {
        let payload = [0x38, 0x4c, 0x1e, 0x53, 0x11, 0x00, 0x0a, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20];
        let (root, _) = decode_slot(&display(0xfd, 0, &payload));
        let data = root.lookup_group("display_descriptor_1/data").unwrap();
        assert_eq!(data.field("min_vertical_rate").unwrap().sym(), Some(&Symbol::Uint(56)));
        assert_eq!(data.field("max_horizontal_rate").unwrap().sym(), Some(&Symbol::Uint(83)));
        assert_eq!(data.field("max_pixel_clock").unwrap().sym(), Some(&Symbol::Uint(170)));
        assert!(data.field("padding").unwrap().is_valid());

        // both vertical offset bits set: min and max vertical gain 255
        let (root, _) = decode_slot(&display(0xfd, 0x03, &payload));
        let data = root.lookup_group("display_descriptor_1/data").unwrap();
        assert_eq!(data.field("min_vertical_rate").unwrap().sym(), Some(&Symbol::Uint(311)));
        assert_eq!(data.field("max_vertical_rate").unwrap().sym(), Some(&Symbol::Uint(331)));
        assert_eq!(data.field("min_horizontal_rate").unwrap().sym(), Some(&Symbol::Uint(30)));
    }

    #[test]
    fn test_bad_padding_is_not_fatal() {
        let payload = [0x38, 0x4c, 0x1e, 0x53, 0x11, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let (root, _) = decode_slot(&display(0xfd, 0, &payload));
        assert!(!root.lookup_field("display_descriptor_1/data/padding").unwrap().is_valid());
    }

    #[test]
    fn test_standard_timing_identifiers() {
        let mut payload = [0x01u8; 13];
        payload[0] = 0xd1;
        payload[1] = 0xc0;
        payload[12] = 0x0a;
        let (root, modes) = decode_slot(&display(0xfa, 0, &payload));
        let t = root.group("display_descriptor_1").unwrap();
        assert_eq!(t.group("standard_timings").unwrap().children.len(), 1);
        assert!(t.field("padding").unwrap().is_valid());
        assert_eq!((modes[0].width, modes[0].height), (1920, 1080));
    }

    #[test]
    fn test_color_point() {
        // index 1, x = 0x142 / 1024 with its two low bits in byte 6
        let payload = [0x01, 0x08, 0x50, 0x50, 0x96, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0a, 0x20, 0x20];
        let (root, _) = decode_slot(&display(0xfb, 0, &payload));
        let point = root.lookup_group("display_descriptor_1/data/white_point").unwrap();
        assert_eq!(point.field("x").unwrap().uint(), Some(0x142));
        assert_eq!(point.field("x").unwrap().sym(), Some(&Symbol::Float(0x142 as f64 / 1024.0)));
        assert_eq!(point.field("x").unwrap().ranges, vec![BitRange::new(52, 2), BitRange::new(56, 8)]);
        assert_eq!(point.field("gamma").unwrap().sym(), Some(&Symbol::Float(2.5)));
    }

    #[test]
    fn test_unknown_tag_is_raw() {
        let (root, _) = decode_slot(&display(0x10, 0, &[0; 13]));
        let t = root.group("display_descriptor_1").unwrap();
        assert_eq!(t.field("data").unwrap().bytes().map(|b| b.len()), Some(13));
    }
}
