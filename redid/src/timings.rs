//! Established timing bitmaps and the compact standard timing slots.
use crate::emitter::DecodeCtx;
use crate::errors::Result;
use crate::mapper::{MapEntry, Mapper};
use crate::modes::{TimingMode, TimingSource};

// Tables are indexed by bit number, 0 being the least significant bit.

pub(crate) const ESTABLISHED_TIMINGS_I: &[MapEntry] = &[
    MapEntry::sym(0, "800x600@60Hz"),
    MapEntry::sym(1, "800x600@56Hz"),
    MapEntry::sym(2, "640x480@75Hz"),
    MapEntry::sym(3, "640x480@72Hz"),
    MapEntry::sym(4, "640x480@67Hz"),
    MapEntry::sym(5, "640x480@60Hz"),
    MapEntry::sym(6, "720x400@88Hz"),
    MapEntry::sym(7, "720x400@70Hz"),
];

pub(crate) const ESTABLISHED_TIMINGS_II: &[MapEntry] = &[
    MapEntry::sym(0, "1280x1024@75Hz"),
    MapEntry::sym(1, "1024x768@75Hz"),
    MapEntry::sym(2, "1024x768@70Hz"),
    MapEntry::sym(3, "1024x768@60Hz"),
    MapEntry::sym(4, "1024x768@87Hz(I)"),
    MapEntry::sym(5, "832x624@75Hz"),
    MapEntry::sym(6, "800x600@75Hz"),
    MapEntry::sym(7, "800x600@72Hz"),
];

pub(crate) const MANUFACTURER_TIMINGS: &[MapEntry] = &[
    MapEntry::sym(0, "reserved"),
    MapEntry::sym(1, "reserved"),
    MapEntry::sym(2, "reserved"),
    MapEntry::sym(3, "reserved"),
    MapEntry::sym(4, "reserved"),
    MapEntry::sym(5, "reserved"),
    MapEntry::sym(6, "reserved"),
    MapEntry::sym(7, "1152x870@75Hz"),
];

pub(crate) const ESTABLISHED_TIMINGS_III: [&[MapEntry]; 6] = [
    &[
        MapEntry::sym(0, "1152x864@75Hz"),
        MapEntry::sym(1, "1024x768@85Hz"),
        MapEntry::sym(2, "800x600@85Hz"),
        MapEntry::sym(3, "848x480@60Hz"),
        MapEntry::sym(4, "640x480@85Hz"),
        MapEntry::sym(5, "720x400@85Hz"),
        MapEntry::sym(6, "640x400@85Hz"),
        MapEntry::sym(7, "640x350@85Hz"),
    ],
    &[
        MapEntry::sym(0, "1280x1024@85Hz"),
        MapEntry::sym(1, "1280x1024@60Hz"),
        MapEntry::sym(2, "1280x960@85Hz"),
        MapEntry::sym(3, "1280x960@60Hz"),
        MapEntry::sym(4, "1280x768@85Hz"),
        MapEntry::sym(5, "1280x768@75Hz"),
        MapEntry::sym(6, "1280x768@60Hz"),
        MapEntry::sym(7, "1280x768@60Hz(RB)"),
    ],
    &[
        MapEntry::sym(0, "1400x1050@75Hz"),
        MapEntry::sym(1, "1400x1050@60Hz"),
        MapEntry::sym(2, "1400x1050@60Hz(RB)"),
        MapEntry::sym(3, "1440x900@85Hz"),
        MapEntry::sym(4, "1440x900@75Hz"),
        MapEntry::sym(5, "1440x900@60Hz"),
        MapEntry::sym(6, "1440x900@60Hz(RB)"),
        MapEntry::sym(7, "1360x768@60Hz"),
    ],
    &[
        MapEntry::sym(0, "1600x1200@70Hz"),
        MapEntry::sym(1, "1600x1200@65Hz"),
        MapEntry::sym(2, "1600x1200@60Hz"),
        MapEntry::sym(3, "1680x1050@85Hz"),
        MapEntry::sym(4, "1680x1050@75Hz"),
        MapEntry::sym(5, "1680x1050@60Hz"),
        MapEntry::sym(6, "1680x1050@60Hz(RB)"),
        MapEntry::sym(7, "1400x1050@85Hz"),
    ],
    &[
        MapEntry::sym(0, "1920x1200@60Hz"),
        MapEntry::sym(1, "1920x1200@60Hz(RB)"),
        MapEntry::sym(2, "1856x1392@75Hz"),
        MapEntry::sym(3, "1856x1392@60Hz"),
        MapEntry::sym(4, "1792x1344@75Hz"),
        MapEntry::sym(5, "1792x1344@60Hz"),
        MapEntry::sym(6, "1600x1200@85Hz"),
        MapEntry::sym(7, "1600x1200@75Hz"),
    ],
    &[
        MapEntry::sym(0, "reserved"),
        MapEntry::sym(1, "reserved"),
        MapEntry::sym(2, "reserved"),
        MapEntry::sym(3, "reserved"),
        MapEntry::sym(4, "1920x1440@75Hz"),
        MapEntry::sym(5, "1920x1440@60Hz"),
        MapEntry::sym(6, "1920x1200@85Hz"),
        MapEntry::sym(7, "1920x1200@75Hz"),
    ],
];

const STANDARD_ASPECT: &[MapEntry] = &[
    MapEntry::sym(0, "16:10"),
    MapEntry::sym(1, "4:3"),
    MapEntry::sym(2, "5:4"),
    MapEntry::sym(3, "16:9"),
];

/// Slot contents marking an unused standard timing.
const UNUSED_SLOT: u64 = 0x0101;

/// Bytes 35-37 of the base record: one `timing` field per supported mode.
pub(crate) fn decode_established_timings(d: &mut DecodeCtx) -> Result<()> {
    let tables = [
        ESTABLISHED_TIMINGS_I,
        ESTABLISHED_TIMINGS_II,
        MANUFACTURER_TIMINGS,
    ];
    let mut bitmaps = Vec::with_capacity(tables.len());
    for _ in &tables {
        bitmaps.push(d.read_part(8)?);
    }
    for (bitmap, table) in bitmaps.iter().zip(tables) {
        d.field_flags("timing", bitmap.value, bitmap.range.first_bit, table);
        record_flag_modes(d, bitmap.value, table);
    }
    Ok(())
}

fn record_flag_modes(d: &mut DecodeCtx, flags: u64, table: &[MapEntry]) {
    let labels = table
        .iter()
        .rev()
        .filter(|e| flags >> e.key & 0x1 == 1)
        .filter_map(|e| e.sym.as_ref().and_then(|s| s.as_str()));
    let modes: Vec<_> = labels
        .filter_map(|l| TimingMode::from_label(l, TimingSource::Established))
        .collect();
    for mode in modes {
        d.record_mode(mode);
    }
}

/// Six bitmap bytes of an established timings III descriptor.
pub(crate) fn decode_established_timings_iii(d: &mut DecodeCtx) -> Result<()> {
    for table in ESTABLISHED_TIMINGS_III {
        let bitmap = d.read_part(8)?;
        d.field_flags("timing", bitmap.value, bitmap.range.first_bit, table);
        record_flag_modes(d, bitmap.value, table);
    }
    Ok(())
}

/// `count` two-byte standard timing slots; unused slots emit nothing.
pub(crate) fn decode_standard_timings(d: &mut DecodeCtx, count: usize) -> Result<()> {
    for _ in 0..count {
        if d.peek_uint(16)? == UNUSED_SLOT {
            d.seek_relative(16)?;
            continue;
        }
        let mode = d.field_struct("timing", |d| {
            let pixels = d.field_uint(
                "horizontal_addressable_pixels",
                8,
                &[Mapper::Add(31), Mapper::Mul(8), Mapper::Unit("pixels")],
            )?;
            let aspect = d.field_uint("aspect_ratio", 2, &[Mapper::Lookup(STANDARD_ASPECT)])?;
            let refresh = d.field_uint("refresh_rate", 6, &[Mapper::Add(60), Mapper::Unit("Hz")])?;
            Ok(TimingMode::from_standard(
                ((pixels + 31) * 8) as u32,
                aspect,
                (refresh + 60) as u32,
            ))
        })?;
        d.record_mode(mode);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::Symbol;
    use crate::structs::{BitRange, Endian};

    #[test]
    fn test_standard_timing_slot() {
        let data = [0x01, 0x01, 0x61, 0x3f, 0xd1, 0xc0];
        let mut d = DecodeCtx::new(&data);
        d.set_endian(Endian::Little);
        d.field_array("standard_timings", |d| decode_standard_timings(d, 3))
            .unwrap();
        let root = d.finish();
        let timings = root.group("standard_timings").unwrap();
        assert_eq!(timings.children.len(), 2);

        let first = timings.children[0].as_group().unwrap();
        let pixels = first.field("horizontal_addressable_pixels").unwrap();
        assert_eq!(pixels.uint(), Some(0x61));
        assert_eq!(pixels.sym(), Some(&Symbol::Uint(1024)));
        assert_eq!(pixels.ranges, vec![BitRange::new(16, 8)]);
        let aspect = first.field("aspect_ratio").unwrap();
        assert_eq!(aspect.uint(), Some(0));
        assert_eq!(aspect.sym_str(), Some("16:10"));
        assert_eq!(aspect.ranges, vec![BitRange::new(24, 2)]);
        let refresh = first.field("refresh_rate").unwrap();
        assert_eq!(refresh.sym(), Some(&Symbol::Uint(123)));
        assert_eq!(refresh.ranges, vec![BitRange::new(26, 6)]);

        // 0xd1 -> 1920 pixels, 0xc0 -> 16:9 at 60 Hz
        let second = timings.children[1].as_group().unwrap();
        assert_eq!(
            second.field("horizontal_addressable_pixels").unwrap().sym(),
            Some(&Symbol::Uint(1920))
        );
        assert_eq!(second.field("aspect_ratio").unwrap().sym_str(), Some("16:9"));
        assert_eq!(
            second.field("refresh_rate").unwrap().sym(),
            Some(&Symbol::Uint(60))
        );
    }

    #[test]
    fn test_established_timings() {
        // 640x480@60 and 800x600@60 in byte one, 1024x768@60 in byte two
        let data = [0b0010_0001, 0b0000_1000, 0x00];
        let mut d = DecodeCtx::new(&data);
        d.field_array("established_timings", decode_established_timings)
            .unwrap();
        let root = d.finish();
        let names: Vec<_> = root
            .group("established_timings")
            .unwrap()
            .fields_named("timing")
            .map(|f| f.sym_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["640x480@60Hz", "800x600@60Hz", "1024x768@60Hz"]);
        let modes = d_modes(&data);
        assert_eq!(modes.len(), 3);
        assert!(modes.iter().all(|m| m.source == TimingSource::Established));
    }

    #[test]
    fn test_established_ranges_follow_bit_order() {
        let data = [0b1010_0001, 0b1000_0001, 0x80];
        let mut d = DecodeCtx::new(&data);
        d.field_array("established_timings", decode_established_timings)
            .unwrap();
        let root = d.finish();
        let starts: Vec<_> = root
            .group("established_timings")
            .unwrap()
            .fields_named("timing")
            .map(|f| f.ranges[0].first_bit)
            .collect();
        assert_eq!(starts, vec![0, 2, 7, 8, 15, 16]);
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    }

    fn d_modes(data: &[u8]) -> Vec<TimingMode> {
        let mut d = DecodeCtx::new(data);
        decode_established_timings(&mut d).unwrap();
        d.take_modes()
    }

    #[test]
    fn test_established_timings_iii() {
        let data = [0x80, 0x00, 0x80, 0x00, 0x02, 0x00];
        let mut d = DecodeCtx::new(&data);
        decode_established_timings_iii(&mut d).unwrap();
        let root = d.finish();
        let names: Vec<_> = root
            .fields_named("timing")
            .map(|f| f.sym_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["640x350@85Hz", "1360x768@60Hz", "1920x1200@60Hz(RB)"]);
    }
}
