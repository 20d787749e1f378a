use crate::config::DecodeConfig;
use crate::decoder::Decoder;
use crate::errors::Result;
use crate::tree::Edid;

/// Decode with the built-in extension formats and default settings.
pub fn decode(data: &[u8]) -> Result<Edid> {
    Decoder::default().decode(data)
}

pub fn decode_with_config(data: &[u8], config: DecodeConfig) -> Result<Edid> {
    Decoder::with_config(config).decode(data)
}
