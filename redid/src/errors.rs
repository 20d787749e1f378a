use thiserror::Error;

use crate::structs::bit::BitInput;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Read of {need} bits at bit {pos} runs past frame end {end}")]
    OutOfBounds { pos: usize, need: usize, end: usize },

    #[error("Unsupported read width: {0} bits")]
    InvalidWidth(usize),

    #[error("Assertion failed for {name}: expected {expected}, found {found}")]
    AssertionFailed {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Bit parser error: {0}")]
    Bits(String),

    #[error("Config Error: {0}")]
    Config(String),
}

impl<'a> From<nom::Err<nom::error::Error<BitInput<'a>>>> for Error {
    fn from(value: nom::Err<nom::error::Error<BitInput<'a>>>) -> Self {
        Self::Bits(value.map_input(|(_, bit)| bit).to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Self::Config(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
