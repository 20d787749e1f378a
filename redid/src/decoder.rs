use std::borrow::Cow;

use crate::config::DecodeConfig;
use crate::descriptor::decode_descriptor;
use crate::emitter::DecodeCtx;
use crate::errors::Result;
use crate::extensions::{ExtensionRegistry, decode_opaque};
use crate::mapper::{MapEntry, MapResult, Mapper, Scalar, Symbol, Unmapped};
use crate::structs::{Endian, MAGIC, RECORD_BITS, RECORD_BYTES, Split, tools};
use crate::timings::{decode_established_timings, decode_standard_timings};
use crate::tree::{Edid, Validation};

const HEADER_BITS: usize = 20 * 8;
const BASIC_PARAMETERS_BITS: usize = 5 * 8;
const CHROMATICITY_BITS: usize = 10 * 8;
const ESTABLISHED_TIMINGS_BITS: usize = 3 * 8;
const STANDARD_TIMINGS_BITS: usize = 16 * 8;
const STANDARD_TIMING_SLOTS: usize = 8;
const DESCRIPTOR_SLOTS: usize = 4;
const EXTENSION_BODY_BITS: usize = RECORD_BITS - 8;

/// Week byte value announcing that the year byte is a model year.
const MODEL_YEAR_WEEK: u64 = 0xff;

const INPUT_TYPES: &[MapEntry] = &[MapEntry::sym(0, "analog"), MapEntry::sym(1, "digital")];

const BIT_DEPTHS: &[MapEntry] = &[
    MapEntry::sym(0, "undefined"),
    MapEntry::uint_desc(1, 6, "6 bits per color"),
    MapEntry::uint_desc(2, 8, "8 bits per color"),
    MapEntry::uint_desc(3, 10, "10 bits per color"),
    MapEntry::uint_desc(4, 12, "12 bits per color"),
    MapEntry::uint_desc(5, 14, "14 bits per color"),
    MapEntry::uint_desc(6, 16, "16 bits per color"),
    MapEntry::sym(7, "reserved"),
];

const VIDEO_INTERFACES: &[MapEntry] = &[
    MapEntry::sym(0, "undefined"),
    MapEntry::sym(1, "dvi"),
    MapEntry::sym(2, "hdmia"),
    MapEntry::sym(3, "hdmib"),
    MapEntry::sym(4, "mddi"),
    MapEntry::sym(5, "displayport"),
];

const SIGNAL_LEVELS: &[MapEntry] = &[
    MapEntry::desc(0, "+0.7/-0.3 V"),
    MapEntry::desc(1, "+0.714/-0.286 V"),
    MapEntry::desc(2, "+1.0/-0.4 V"),
    MapEntry::desc(3, "+0.7/0 V (EVC)"),
];

const DIGITAL_DISPLAY_TYPES: &[MapEntry] = &[
    MapEntry::desc(0, "RGB 4:4:4"),
    MapEntry::desc(1, "RGB 4:4:4 + YCrCb 4:4:4"),
    MapEntry::desc(2, "RGB 4:4:4 + YCrCb 4:2:2"),
    MapEntry::desc(3, "RGB 4:4:4 + YCrCb 4:4:4 + YCrCb 4:2:2"),
];

const ANALOG_DISPLAY_TYPES: &[MapEntry] = &[
    MapEntry::desc(0, "Monochrome or Grayscale"),
    MapEntry::desc(1, "RGB color"),
    MapEntry::desc(2, "Non-RGB color"),
    MapEntry::desc(3, "undefined"),
];

const CHROMATICITY: [&str; 8] = [
    "red_x", "red_y", "green_x", "green_y", "blue_x", "blue_y", "white_x", "white_y",
];

/// Video input selected by the top bit of byte 20.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Analog,
    Digital,
}

impl InputKind {
    fn from_bit(bit: u64) -> Self {
        if bit == 1 {
            InputKind::Digital
        } else {
            InputKind::Analog
        }
    }
}

fn manufacturer(mut s: Scalar) -> MapResult {
    let Some(code) = s.key() else {
        return Err(Unmapped(s));
    };
    s.sym = Some(Symbol::Str(Cow::Owned(tools::manufacturer_letters(code))));
    Ok(s)
}

/// Decodes a base record and its extensions into an [`Edid`] tree.
///
/// A decoder holds no per-buffer state; one instance can decode any number of buffers.
#[derive(Debug)]
pub struct Decoder {
    registry: ExtensionRegistry,
    config: DecodeConfig,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::with_config(DecodeConfig::default())
    }
}

impl Decoder {
    pub fn new(registry: ExtensionRegistry, config: DecodeConfig) -> Self {
        Decoder { registry, config }
    }

    /// Built-in extension formats with the given configuration.
    pub fn with_config(config: DecodeConfig) -> Self {
        Decoder::new(ExtensionRegistry::with_defaults(), config)
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Decode `data`. Only a base record that cannot be read, or that lacks
    /// the magic header, is an error; everything else is reported on the tree.
    pub fn decode(&self, data: &[u8]) -> Result<Edid> {
        let mut d = DecodeCtx::new(data);
        d.set_endian(Endian::Little);
        d.set_trim_strings(self.config.trim_strings);

        let declared = self.decode_base(&mut d)?;
        tracing::debug!(declared, bytes = data.len(), "base record decoded");
        self.decode_extensions(&mut d, declared)?;
        if d.bits_left() > 0 {
            tracing::debug!(bytes = d.bits_left() / 8, "ignoring trailing bytes");
        }

        let modes = d.take_modes();
        Ok(Edid::new(d.finish(), modes))
    }

    /// The 128-byte base record; returns the declared extension count.
    fn decode_base(&self, d: &mut DecodeCtx) -> Result<u64> {
        let revision = d.framed(HEADER_BITS, |d| d.field_struct("header", decode_header))?;
        d.framed(BASIC_PARAMETERS_BITS, |d| {
            d.field_struct("basic_display_parameters", |d| {
                decode_basic_display_parameters(d, revision)
            })
        })?;
        d.framed(CHROMATICITY_BITS, |d| {
            d.field_struct("chromaticity_coordinates", decode_chromaticity)
        })?;
        d.framed(ESTABLISHED_TIMINGS_BITS, |d| {
            d.field_array("established_timings", decode_established_timings)
        })?;
        d.framed(STANDARD_TIMINGS_BITS, |d| {
            d.field_array("standard_timings", |d| {
                decode_standard_timings(d, STANDARD_TIMING_SLOTS)
            })
        })?;
        d.field_struct("detailed_timings", |d| {
            for slot in 1..=DESCRIPTOR_SLOTS {
                let timing_name = match slot {
                    1 => "preferred_timing_mode".to_string(),
                    n => format!("detailed_timing_descriptor_{}", n),
                };
                decode_descriptor(d, &timing_name, &format!("display_descriptor_{}", slot))?;
            }
            Ok(())
        })?;

        let declared = d.field_uint("extension_count", 8, &[])?;
        d.field_checksum("checksum", 0)?;
        Ok(declared)
    }

    fn decode_extensions(&self, d: &mut DecodeCtx, declared: u64) -> Result<()> {
        if declared == 0 {
            return Ok(());
        }
        let count = match self.config.max_extensions {
            Some(max) => declared.min(max as u64),
            None => declared,
        };

        d.field_array("extensions", |d| {
            for index in 0..count {
                let available = d.bits_left() / 8;
                if available < RECORD_BYTES {
                    tracing::warn!(index, available, "extension record truncated");
                    let reason = format!("{} of {} bytes present", available, RECORD_BYTES);
                    d.field_raw_failed("truncated_extension", available, Validation::Aborted { reason })?;
                    break;
                }
                self.decode_extension(d, index)?;
            }
            Ok(())
        })
    }

    /// One 128-byte extension record. A fatal error inside it turns the
    /// record into raw bytes; its checksum is verified either way.
    fn decode_extension(&self, d: &mut DecodeCtx, index: u64) -> Result<()> {
        let start = d.pos() / 8;
        let tag = d.peek_uint(8)? as u8;
        let format = self.registry.get(tag).filter(|_| !self.config.is_opaque(tag));
        tracing::debug!(
            index,
            tag,
            format = format.map_or("opaque", |f| f.name()),
            "decoding extension"
        );

        d.field_struct("extension", |d| {
            let decoded = d.recover(|d| {
                d.framed(EXTENSION_BODY_BITS, |d| match format {
                    Some(format) => format.decode(d),
                    None => decode_opaque(d),
                })
            });
            if let Err(err) = decoded {
                tracing::warn!(index, tag, %err, "extension record aborted");
                let reason = err.to_string();
                d.field_raw_failed("data", RECORD_BYTES - 1, Validation::Aborted { reason })?;
            }
            d.field_checksum("checksum", start)?;
            Ok(())
        })
    }
}

/// Bytes 0-19; returns the EDID revision.
fn decode_header(d: &mut DecodeCtx) -> Result<u64> {
    d.field_raw_assert("identifier", &MAGIC)?;
    d.field_uint_be(
        "manufacturer_id",
        16,
        &[Mapper::Hex, Mapper::Formula(manufacturer)],
    )?;
    d.field_uint("product_code", 16, &[Mapper::Hex])?;
    d.field_uint("serial_number", 32, &[])?;

    let week = d.field_uint("week_of_manufacture", 8, &[])?;
    let year = if week == MODEL_YEAR_WEEK {
        "year_of_model"
    } else {
        "year_of_manufacture"
    };
    d.field_uint(year, 8, &[Mapper::Add(1990)])?;

    d.field_uint("version", 8, &[])?;
    d.field_uint("revision", 8, &[])
}

/// Bytes 20-24.
fn decode_basic_display_parameters(d: &mut DecodeCtx, revision: u64) -> Result<()> {
    let input = InputKind::from_bit(d.field_uint("input_type", 1, &[Mapper::Lookup(INPUT_TYPES)])?);
    match input {
        InputKind::Digital => {
            d.field_uint("bit_depth", 3, &[Mapper::Lookup(BIT_DEPTHS)])?;
            d.field_uint("video_interface", 4, &[Mapper::Lookup(VIDEO_INTERFACES)])?;
        }
        InputKind::Analog => {
            d.field_uint("signal_level", 2, &[Mapper::Lookup(SIGNAL_LEVELS)])?;
            d.field_bool("blank_to_black_setup_expected")?;
            d.field_bool("separate_sync_supported")?;
            d.field_bool("composite_sync_on_hsync_supported")?;
            d.field_bool("sync_on_green_supported")?;
            d.field_bool("serration_on_vsync_supported")?;
        }
    }

    let h_size = d.field_uint("horizontal_screen_size", 8, &[Mapper::Unit("cm")])?;
    let v_size = d.field_uint("vertical_screen_size", 8, &[Mapper::Unit("cm")])?;
    d.field_value_str(
        "aspect_ratio",
        tools::screen_aspect_ratio(h_size as u8, v_size as u8),
    );
    d.field_uint("gamma", 8, &[Mapper::Div(100.0), Mapper::Add(1)])?;

    d.field_bool("dpms_standby_supported")?;
    d.field_bool("dpms_suspend_supported")?;
    d.field_bool("dpms_active_off_supported")?;
    let display_types = match input {
        InputKind::Digital => DIGITAL_DISPLAY_TYPES,
        InputKind::Analog => ANALOG_DISPLAY_TYPES,
    };
    d.field_uint("display_type", 2, &[Mapper::Lookup(display_types)])?;
    d.field_bool("standard_srgb_color_space")?;
    match revision {
        3 | 4 => d.field_bool("preferred_timing_block_includes_npf_rr")?,
        _ => d.field_bool("preferred_timing_mode_in_block_1")?,
    };
    d.field_bool("continuous_frequency_supported")?;
    Ok(())
}

/// Bytes 25-34: the low bit pairs of all eight coordinates, then the high bytes.
fn decode_chromaticity(d: &mut DecodeCtx) -> Result<()> {
    let mut lows = Vec::with_capacity(CHROMATICITY.len());
    for _ in CHROMATICITY {
        lows.push(d.read_part(2)?);
    }
    for (name, low) in CHROMATICITY.into_iter().zip(lows) {
        let high = d.read_part(8)?;
        d.field_split(name, &Split::join(low, high, 2), &[Mapper::Div(1024.0)]);
    }
    Ok(())
}
