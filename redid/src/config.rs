use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Knobs for one decode pass, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Walk at most this many extension records, whatever the count byte says.
    pub max_extensions: Option<u8>,

    /// Extension tags captured as raw bytes even when a decoder is registered.
    pub opaque_extensions: Vec<u8>,

    /// Drop trailing newline and space padding from descriptor text.
    pub trim_strings: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        DecodeConfig {
            max_extensions: None,
            opaque_extensions: Vec::new(),
            trim_strings: true,
        }
    }
}

impl DecodeConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Example configuration with every option spelled out
    pub fn example_toml() -> String {
        [
            "# Stop after this many extension records",
            "max_extensions = 3",
            "",
            "# Keep these extension tags as raw bytes (0x70 = DisplayID)",
            "opaque_extensions = [112]",
            "",
            "# Trim \"\\n \" padding from descriptor text",
            "trim_strings = true",
            "",
        ]
        .join("\n")
    }

    pub(crate) fn is_opaque(&self, tag: u8) -> bool {
        self.opaque_extensions.contains(&tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_parses() {
        let config = DecodeConfig::from_toml_str(&DecodeConfig::example_toml()).unwrap();
        assert_eq!(config.max_extensions, Some(3));
        assert!(config.is_opaque(0x70));
        assert!(config.trim_strings);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = DecodeConfig::from_toml_str("trim_strings = false").unwrap();
        assert_eq!(config.max_extensions, None);
        assert!(config.opaque_extensions.is_empty());
        assert!(!config.trim_strings);
    }

    #[test]
    fn test_config_serialization() {
        let config = DecodeConfig {
            max_extensions: Some(1),
            opaque_extensions: vec![2],
            trim_strings: false,
        };
        let toml_str = config.to_toml_string().unwrap();
        assert_eq!(DecodeConfig::from_toml_str(&toml_str).unwrap(), config);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = DecodeConfig::from_toml_str("max_extensions = \"many\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
