//! Extension record formats and the tag-keyed registry the decoder dispatches through.
pub mod cea861;
pub mod displayid;

use rustc_hash::FxHashMap;

use crate::emitter::DecodeCtx;
use crate::errors::Result;
use crate::mapper::{MapEntry, Mapper};
use crate::structs::RECORD_BYTES;

pub(crate) const EXTENSION_TAGS: &[MapEntry] = &[
    MapEntry::desc(0x02, "CEA-861 Series Timing Extension"),
    MapEntry::desc(0x10, "Video Timing Block Extension (VTB-EXT)"),
    MapEntry::desc(0x20, "EDID 2.0 Extension"),
    MapEntry::desc(0x40, "Display Information Extension (DI-EXT)"),
    MapEntry::desc(0x50, "Localized String Extension (LS-EXT)"),
    MapEntry::desc(0x60, "Microdisplay Interface Extension (MI-EXT)"),
    MapEntry::desc(0x70, "DisplayID Extension"),
    MapEntry::desc(0xf0, "Block Map"),
    MapEntry::desc(0xff, "Manufacturer Defined Extension"),
];

/// Name of an extension tag, whether or not a decoder is registered for it.
pub fn extension_name(tag: u8) -> Option<&'static str> {
    EXTENSION_TAGS
        .iter()
        .find(|e| e.key == tag as u64)
        .and_then(|e| e.description)
}

/// A decoder for one kind of extension record.
///
/// `decode` is handed a cursor at the tag byte, framed to the first 127
/// bytes of the record. The trailing checksum belongs to the dispatcher.
pub trait ExtensionFormat {
    fn tag(&self) -> u8;

    fn name(&self) -> &'static str;

    fn decode(&self, d: &mut DecodeCtx) -> Result<()>;
}

macro_rules! builtin_extensions {
    ($($format:ty),+$(,)?) => {
        impl ExtensionRegistry {
            /// A registry holding every format this crate knows how to decode.
            pub fn with_defaults() -> Self {
                let mut registry = ExtensionRegistry::new();
                $(
                    registry.register(<$format>::default());
                )+
                registry
            }
        }
    };
}

builtin_extensions!(cea861::Cea861, displayid::DisplayId);

/// Extension decoders keyed by tag byte. Tags without an entry are kept opaque.
#[derive(Default)]
pub struct ExtensionRegistry {
    formats: FxHashMap<u8, Box<dyn ExtensionFormat + Send + Sync>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `format`, replacing any decoder already bound to its tag.
    pub fn register<F>(&mut self, format: F)
    where
        F: ExtensionFormat + Send + Sync + 'static,
    {
        self.formats.insert(format.tag(), Box::new(format));
    }

    pub fn get(&self, tag: u8) -> Option<&(dyn ExtensionFormat + Send + Sync)> {
        self.formats.get(&tag).map(|f| f.as_ref())
    }

    pub fn tags(&self) -> Vec<u8> {
        let mut tags: Vec<u8> = self.formats.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

pub(crate) fn field_tag(d: &mut DecodeCtx) -> Result<u64> {
    d.field_uint("tag", 8, &[Mapper::Hex, Mapper::Lookup(EXTENSION_TAGS)])
}

/// Tag byte plus the body as raw bytes.
pub(crate) fn decode_opaque(d: &mut DecodeCtx) -> Result<()> {
    field_tag(d)?;
    d.field_raw("data", RECORD_BYTES - 2)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    impl ExtensionFormat for Dummy {
        fn tag(&self) -> u8 {
            0x70
        }

        fn name(&self) -> &'static str {
            "dummy"
        }

        fn decode(&self, d: &mut DecodeCtx) -> Result<()> {
            decode_opaque(d)
        }
    }

    #[test]
    fn test_defaults_and_override() {
        let mut registry = ExtensionRegistry::with_defaults();
        assert_eq!(registry.tags(), vec![0x02, 0x70]);
        assert_eq!(registry.get(0x70).map(|f| f.name()), Some("DisplayID"));
        registry.register(Dummy);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0x70).map(|f| f.name()), Some("dummy"));
        assert!(registry.get(0x10).is_none());
    }

    #[test]
    fn test_extension_names() {
        assert_eq!(extension_name(0xf0), Some("Block Map"));
        assert_eq!(extension_name(0x03), None);
    }
}
