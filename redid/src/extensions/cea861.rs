//! CEA-861 timing extension: capability flags, the data block collection and
//! the detailed timing descriptors that follow it.
use crate::descriptor::decode_descriptor;
use crate::emitter::DecodeCtx;
use crate::errors::Result;
use crate::extensions::{ExtensionFormat, field_tag};
use crate::mapper::{MapEntry, Mapper};
use crate::structs::{DESCRIPTOR_BITS, DESCRIPTOR_BYTES, RECORD_BYTES};

/// Offsets of the first detailed timing descriptor that leave room for two of them.
const DTD_OFFSETS: std::ops::RangeInclusive<u64> = 4..=91;

/// Bytes of the record before the checksum.
const BODY_BYTES: usize = RECORD_BYTES - 1;

const BLOCK_TAGS: &[MapEntry] = &[
    MapEntry::sym(1, "audio"),
    MapEntry::sym(2, "video"),
    MapEntry::sym(3, "vendor_specific"),
    MapEntry::sym(4, "speaker_allocation"),
    MapEntry::sym(5, "vesa_display_transfer_characteristic"),
    MapEntry::sym(7, "extended"),
];

const EXTENDED_TAGS: &[MapEntry] = &[
    MapEntry::desc(0x00, "Video Capability Data Block"),
    MapEntry::desc(0x01, "Vendor-Specific Video Data Block"),
    MapEntry::desc(0x02, "VESA Display Device Data Block"),
    MapEntry::desc(0x03, "VESA Video Timing Block Extension"),
    MapEntry::desc(0x05, "Colorimetry Data Block"),
    MapEntry::desc(0x06, "HDR Static Metadata Data Block"),
    MapEntry::desc(0x07, "HDR Dynamic Metadata Data Block"),
    MapEntry::desc(0x0d, "Video Format Preference Data Block"),
    MapEntry::desc(0x0e, "YCbCr 4:2:0 Video Data Block"),
    MapEntry::desc(0x0f, "YCbCr 4:2:0 Capability Map Data Block"),
    MapEntry::desc(0x11, "Vendor-Specific Audio Data Block"),
    MapEntry::desc(0x12, "Room Configuration Data Block"),
    MapEntry::desc(0x13, "Speaker Location Data Block"),
    MapEntry::desc(0x20, "InfoFrame Data Block"),
];

const AUDIO_FORMATS: &[MapEntry] = &[
    MapEntry::sym(1, "lpcm"),
    MapEntry::sym(2, "ac3"),
    MapEntry::sym(3, "mpeg1"),
    MapEntry::sym(4, "mp3"),
    MapEntry::sym(5, "mpeg2"),
    MapEntry::sym(6, "aac_lc"),
    MapEntry::sym(7, "dts"),
    MapEntry::sym(8, "atrac"),
    MapEntry::sym(9, "one_bit_audio"),
    MapEntry::sym(10, "enhanced_ac3"),
    MapEntry::sym(11, "dts_hd"),
    MapEntry::sym(12, "mat"),
    MapEntry::sym(13, "dst"),
    MapEntry::sym(14, "wma_pro"),
    MapEntry::sym(15, "extended"),
];

const SAMPLE_RATES: &[MapEntry] = &[
    MapEntry::sym(0, "32kHz"),
    MapEntry::sym(1, "44.1kHz"),
    MapEntry::sym(2, "48kHz"),
    MapEntry::sym(3, "88.2kHz"),
    MapEntry::sym(4, "96kHz"),
    MapEntry::sym(5, "176.4kHz"),
    MapEntry::sym(6, "192kHz"),
];

const VENDOR_OUIS: &[MapEntry] = &[
    MapEntry::desc(0x000c03, "HDMI Licensing, LLC"),
    MapEntry::desc(0xc45dd8, "HDMI Forum"),
    MapEntry::desc(0x00d046, "Dolby Laboratories"),
    MapEntry::desc(0x90848b, "HDR10+ Technologies"),
];

#[derive(Debug, Default)]
pub struct Cea861;

impl ExtensionFormat for Cea861 {
    fn tag(&self) -> u8 {
        0x02
    }

    fn name(&self) -> &'static str {
        "CEA-861"
    }

    fn decode(&self, d: &mut DecodeCtx) -> Result<()> {
        let start = d.pos() / 8;
        field_tag(d)?;
        let revision = d.field_uint("revision", 8, &[])?;
        let offset = d.field_uint("dtd_offset", 8, &[])?;
        if revision >= 2 {
            d.field_struct("capabilities", |d| {
                d.field_bool("underscan")?;
                d.field_bool("basic_audio")?;
                d.field_bool("ycbcr_444")?;
                d.field_bool("ycbcr_422")?;
                d.field_uint("native_dtds", 4, &[])?;
                Ok(())
            })?;
        } else {
            d.field_uint("reserved", 8, &[])?;
        }

        if !DTD_OFFSETS.contains(&offset) {
            tracing::debug!(offset, "no detailed timing area");
            d.field_raw("data", d.bits_left() / 8)?;
            return Ok(());
        }

        let collection = offset as usize - 4;
        d.field_array("data_blocks", |d| {
            d.framed(collection * 8, decode_data_blocks)
        })?;

        d.field_array("detailed_timings", |d| {
            while d.bits_left() >= DESCRIPTOR_BITS && !is_empty_slot(d)? {
                decode_descriptor(d, "detailed_timing_descriptor", "display_descriptor")?;
            }
            Ok(())
        })?;

        let used = d.pos() / 8 - start;
        if used < BODY_BYTES {
            d.field_raw("data", BODY_BYTES - used)?;
        }
        Ok(())
    }
}

/// An all-zero slot marks the padding after the last descriptor.
fn is_empty_slot(d: &DecodeCtx) -> Result<bool> {
    let slot = d.bytes_range(d.pos() / 8, DESCRIPTOR_BYTES)?;
    Ok(slot.iter().all(|b| *b == 0))
}

/// Tag/length blocks filling the current frame. A zero tag after the first
/// block ends the list; the rest of the frame is padding.
fn decode_data_blocks(d: &mut DecodeCtx) -> Result<()> {
    let first = d.pos();
    while d.bits_left() >= 8 {
        if d.peek_uint(3)? == 0 && d.pos() != first {
            break;
        }
        d.field_struct("data_block", |d| {
            let tag = d.field_uint("tag", 3, &[Mapper::Lookup(BLOCK_TAGS)])?;
            let length = d.field_uint("length", 5, &[Mapper::Unit("bytes")])? as usize;
            d.framed(length * 8, |d| {
                match tag {
                    1 => decode_audio(d)?,
                    2 => decode_video(d)?,
                    3 => decode_vendor(d)?,
                    7 if length > 0 => {
                        d.field_uint("extended_tag", 8, &[Mapper::Hex, Mapper::Lookup(EXTENDED_TAGS)])?;
                    }
                    _ => {}
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

fn decode_audio(d: &mut DecodeCtx) -> Result<()> {
    while d.bits_left() >= 24 {
        d.field_struct("short_audio_descriptor", |d| {
            d.field_uint("reserved", 1, &[])?;
            d.field_uint("format", 4, &[Mapper::Lookup(AUDIO_FORMATS)])?;
            d.field_uint("max_channels", 3, &[Mapper::Add(1)])?;
            d.field_uint("reserved", 1, &[])?;
            let rates = d.read_part(7)?;
            // the 7 rate flags sit below the reserved bit
            d.field_flags("sample_rate", rates.value, rates.range.first_bit - 1, SAMPLE_RATES);
            d.field_uint("detail", 8, &[Mapper::Hex])?;
            Ok(())
        })?;
    }
    Ok(())
}

fn decode_video(d: &mut DecodeCtx) -> Result<()> {
    while d.bits_left() >= 8 {
        d.field_struct("short_video_descriptor", |d| {
            d.field_bool("native")?;
            d.field_uint("vic", 7, &[])?;
            Ok(())
        })?;
    }
    Ok(())
}

fn decode_vendor(d: &mut DecodeCtx) -> Result<()> {
    if d.bits_left() >= 24 {
        d.field_uint("ieee_oui", 24, &[Mapper::Hex, Mapper::Lookup(VENDOR_OUIS)])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::Endian;
    use crate::tree::Group;

    fn record(offset: u8, blocks: &[u8], dtds: &[[u8; DESCRIPTOR_BYTES]]) -> Vec<u8> {
        let mut data = vec![0u8; RECORD_BYTES];
        data[0] = 0x02;
        data[1] = 3;
        data[2] = offset;
        data[3] = 0b1111_0001;
        data[4..4 + blocks.len()].copy_from_slice(blocks);
        for (i, dtd) in dtds.iter().enumerate() {
            let at = offset as usize + i * DESCRIPTOR_BYTES;
            data[at..at + DESCRIPTOR_BYTES].copy_from_slice(dtd);
        }
        data
    }

    fn decode(data: &[u8]) -> Group {
        let mut d = DecodeCtx::new(data);
        d.set_endian(Endian::Little);
        d.framed(BODY_BYTES * 8, |d| Cea861.decode(d)).unwrap();
        assert_eq!(d.pos(), BODY_BYTES * 8);
        d.finish()
    }

    const DTD: [u8; 18] = [
        0x01, 0x1d, 0x00, 0x72, 0x51, 0xd0, 0x1e, 0x20, 0x6e, 0x28, 0x55, 0x00, 0xc4, 0x8e, 0x21,
        0x00, 0x00, 0x1e,
    ];

    #[test]
    fn test_header_and_blocks() {
        // video block with VIC 16 (native) and VIC 4, audio block with one LPCM descriptor
        let blocks = [0x42, 0x90, 0x04, 0x23, 0x09, 0x07, 0x07];
        let root = decode(&record(4 + blocks.len() as u8, &blocks, &[DTD]));

        assert_eq!(root.field("dtd_offset").unwrap().uint(), Some(11));
        let caps = root.group("capabilities").unwrap();
        assert_eq!(caps.field("underscan").unwrap().bool(), Some(true));
        assert_eq!(caps.field("native_dtds").unwrap().uint(), Some(1));

        let blocks = root.group("data_blocks").unwrap();
        let video = blocks.children[0].as_group().unwrap();
        assert_eq!(video.field("tag").unwrap().sym_str(), Some("video"));
        let svds: Vec<_> = video.groups().collect();
        assert_eq!(svds.len(), 2);
        assert_eq!(svds[0].field("native").unwrap().bool(), Some(true));
        assert_eq!(svds[0].field("vic").unwrap().uint(), Some(16));

        let audio = blocks.children[1].as_group().unwrap();
        let sad = audio.group("short_audio_descriptor").unwrap();
        assert_eq!(sad.field("format").unwrap().sym_str(), Some("lpcm"));
        assert_eq!(sad.field("max_channels").unwrap().sym(), Some(&crate::mapper::Symbol::Uint(2)));
        assert_eq!(sad.fields_named("sample_rate").count(), 3);

        let dtds = root.group("detailed_timings").unwrap();
        assert_eq!(dtds.children.len(), 1);
        assert!(root.field("data").is_some());
    }

    #[test]
    fn test_zero_header_ends_block_list() {
        // one video block, then a zero header and padding before the DTD offset
        let blocks = [0x41, 0x10, 0x00, 0x00];
        let root = decode(&record(8, &blocks, &[DTD, DTD]));
        let list = root.group("data_blocks").unwrap();
        assert_eq!(list.groups().count(), 1);
        assert_eq!(list.field("padding").unwrap().bytes(), Some(&[0u8, 0][..]));
        assert_eq!(root.group("detailed_timings").unwrap().children.len(), 2);
    }

    #[test]
    fn test_zero_tag_with_length_ends_block_list() {
        // tag 0 with length 5 after a video block is padding, not a block
        let blocks = [0x41, 0x10, 0x05, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x00];
        let root = decode(&record(13, &blocks, &[DTD]));
        let list = root.group("data_blocks").unwrap();
        assert_eq!(list.groups().count(), 1);
        assert_eq!(
            list.field("padding").unwrap().bytes(),
            Some(&[0x05, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x00][..])
        );
        assert_eq!(root.group("detailed_timings").unwrap().children.len(), 1);
    }

    #[test]
    fn test_display_descriptor_after_timings() {
        let mut name = [0u8; DESCRIPTOR_BYTES];
        name[3] = 0xfc;
        name[5..18].copy_from_slice(b"TV-2000\n     ");
        let root = decode(&record(4, &[], &[DTD, name]));
        let slots = root.group("detailed_timings").unwrap();
        assert_eq!(slots.children.len(), 2);
        assert!(slots.group("detailed_timing_descriptor").is_some());
        let display = slots.group("display_descriptor").unwrap();
        assert_eq!(display.field("value").unwrap().str(), Some("TV-2000"));
        assert!(root.field("data").is_some());
    }

    #[test]
    fn test_zero_header_first_is_a_block() {
        let blocks = [0x00, 0x41, 0x10];
        let root = decode(&record(7, &blocks, &[]));
        let list = root.group("data_blocks").unwrap();
        assert_eq!(list.groups().count(), 2);
        assert_eq!(root.group("detailed_timings").unwrap().children.len(), 0);
    }

    #[test]
    fn test_offset_out_of_range_is_opaque() {
        let root = decode(&record(0, &[], &[]));
        assert!(root.group("data_blocks").is_none());
        assert_eq!(root.field("data").unwrap().bytes().map(|b| b.len()), Some(123));
    }

    #[test]
    fn test_block_overrun_is_fatal() {
        // declared length 31 runs past the DTD offset
        let data = record(6, &[0x5f, 0x00], &[]);
        let mut d = DecodeCtx::new(&data);
        assert!(d.framed(BODY_BYTES * 8, |d| Cea861.decode(d)).is_err());
    }
}
