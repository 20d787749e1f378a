pub mod bit;
pub(crate) mod tools;

pub use bit::{BitCursor, BitRange, Endian, Part, Split};

/// Fixed header of every base record.
pub const MAGIC: [u8; 8] = [0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00];

/// Size of the base record and of every extension record.
pub const RECORD_BYTES: usize = 128;
pub const RECORD_BITS: usize = RECORD_BYTES * 8;

/// Size of a descriptor slot, in the base record and in timing extensions.
pub const DESCRIPTOR_BYTES: usize = 18;
pub const DESCRIPTOR_BITS: usize = DESCRIPTOR_BYTES * 8;

/// Offset of the extension count byte inside the base record.
pub const EXTENSION_COUNT_OFFSET: usize = 126;
