pub mod checksum;
pub mod config;
pub mod decoder;
pub mod descriptor;
pub mod emitter;
pub mod errors;
pub mod extensions;
pub mod mapper;
pub mod modes;
pub mod parser;
pub mod structs;
pub mod timings;
pub mod tree;

pub use crate::config::DecodeConfig;
pub use crate::decoder::{Decoder, InputKind};
pub use crate::extensions::{ExtensionFormat, ExtensionRegistry, extension_name};
pub use crate::modes::{TimingMode, TimingSource};
pub use crate::parser::*;
pub use crate::tree::{Edid, Field, Group, Node, Validation};
