use nom::IResult;
use nom::bits::complete::take;
use serde::Serialize;
use std::ops::{AddAssign, Shl, Shr};

use crate::errors::{Error, Result};

pub(crate) type BitInput<'a> = (&'a [u8], usize);

pub(super) fn parse_arbitrary_bits<
    T: From<u8> + AddAssign + Shl<usize, Output = T> + Shr<usize, Output = T>,
>(
    input: BitInput,
    count: usize,
) -> IResult<BitInput, T> {
    take(count)(input)
}

/// Byte order applied to byte-multiple reads wider than 8 bits.
///
/// Sub-byte reads are always taken most significant bit first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

/// Half-open bit interval `[first_bit, first_bit + n_bits)` into the decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct BitRange {
    pub first_bit: usize,
    pub n_bits: usize,
}

impl BitRange {
    pub const fn new(first_bit: usize, n_bits: usize) -> Self {
        BitRange { first_bit, n_bits }
    }

    pub const fn end(&self) -> usize {
        self.first_bit + self.n_bits
    }

    /// Smallest range covering every range in `ranges`.
    pub fn hull(ranges: &[BitRange]) -> Option<BitRange> {
        let start = ranges.iter().map(|r| r.first_bit).min()?;
        let end = ranges.iter().map(|r| r.end()).max()?;
        Some(BitRange::new(start, end - start))
    }
}

impl std::fmt::Display for BitRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.first_bit, self.end())
    }
}

/// One physically contiguous chunk of a value, remembered with where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    pub value: u64,
    pub range: BitRange,
}

/// A logical value reassembled from two physically separate reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub value: u64,
    pub ranges: Vec<BitRange>,
}

impl Split {
    /// `low | high << shift`, keeping both source ranges in buffer order.
    pub fn join(low: Part, high: Part, shift: u32) -> Self {
        let mut ranges = vec![low.range, high.range];
        ranges.sort();
        Split {
            value: low.value | (high.value << shift),
            ranges,
        }
    }
}

/// Read head over an immutable buffer, addressed in bits and confined to a frame.
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    pos: usize,
    frame_start: usize,
    frame_end: usize,
    endian: Endian,
}

/// Saved frame boundaries, handed back by [`BitCursor::narrow`].
#[derive(Debug, Clone, Copy)]
pub struct FrameGuard {
    start: usize,
    end: usize,
}

impl<'a> BitCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitCursor {
            data,
            pos: 0,
            frame_start: 0,
            frame_end: data.len() * 8,
            endian: Endian::Big,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn frame_start(&self) -> usize {
        self.frame_start
    }

    pub fn frame_end(&self) -> usize {
        self.frame_end
    }

    pub fn bits_left(&self) -> usize {
        self.frame_end.saturating_sub(self.pos)
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Restrict reads to `[pos, end)`. The returned guard restores the outer frame.
    pub fn narrow(&mut self, end: usize) -> Result<FrameGuard> {
        if end > self.frame_end || end < self.pos {
            return Err(Error::OutOfBounds {
                pos: self.pos,
                need: end.saturating_sub(self.pos),
                end: self.frame_end,
            });
        }
        let guard = FrameGuard {
            start: self.frame_start,
            end: self.frame_end,
        };
        self.frame_start = self.pos;
        self.frame_end = end;
        Ok(guard)
    }

    pub fn restore(&mut self, guard: FrameGuard) {
        self.frame_start = guard.start;
        self.frame_end = guard.end;
    }

    /// Jump to an absolute position inside the current frame.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos < self.frame_start || pos > self.frame_end {
            return Err(Error::OutOfBounds {
                pos,
                need: 0,
                end: self.frame_end,
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn seek_relative(&mut self, delta_bits: i64) -> Result<()> {
        let target = self.pos as i64 + delta_bits;
        if target < 0 {
            return Err(Error::OutOfBounds {
                pos: self.pos,
                need: 0,
                end: self.frame_end,
            });
        }
        self.seek(target as usize)
    }

    pub fn read_uint(&mut self, nbits: usize) -> Result<u64> {
        let value = self.peek_uint(nbits)?;
        self.pos += nbits;
        Ok(value)
    }

    pub fn peek_uint(&self, nbits: usize) -> Result<u64> {
        let value = self.peek_uint_be(nbits)?;
        match self.endian {
            Endian::Little if nbits > 8 && nbits % 8 == 0 => Ok(swap_bytes(value, nbits / 8)),
            _ => Ok(value),
        }
    }

    /// Big-endian read regardless of the active byte order.
    pub fn read_uint_be(&mut self, nbits: usize) -> Result<u64> {
        let value = self.peek_uint_be(nbits)?;
        self.pos += nbits;
        Ok(value)
    }

    fn peek_uint_be(&self, nbits: usize) -> Result<u64> {
        if nbits == 0 || nbits > 64 {
            return Err(Error::InvalidWidth(nbits));
        }
        if self.pos + nbits > self.frame_end {
            return Err(Error::OutOfBounds {
                pos: self.pos,
                need: nbits,
                end: self.frame_end,
            });
        }

        let input: BitInput = (&self.data[self.pos / 8..], self.pos % 8);
        let (_, value) = parse_arbitrary_bits::<u64>(input, nbits)?;
        Ok(value)
    }

    /// Whole bytes starting at the current position. Unaligned reads are reassembled bit by bit.
    pub fn read_bytes(&mut self, nbytes: usize) -> Result<Vec<u8>> {
        if self.pos + nbytes * 8 > self.frame_end {
            return Err(Error::OutOfBounds {
                pos: self.pos,
                need: nbytes * 8,
                end: self.frame_end,
            });
        }

        if self.pos % 8 == 0 {
            let start = self.pos / 8;
            self.pos += nbytes * 8;
            return Ok(self.data[start..start + nbytes].to_vec());
        }

        (0..nbytes)
            .map(|_| self.read_uint_be(8).map(|b| b as u8))
            .collect()
    }

    /// Read a chunk and remember where it sat.
    pub fn read_part(&mut self, nbits: usize) -> Result<Part> {
        let range = BitRange::new(self.pos, nbits);
        let value = self.read_uint(nbits)?;
        Ok(Part { value, range })
    }
}

fn swap_bytes(value: u64, nbytes: usize) -> u64 {
    use byteorder::{ByteOrder, LittleEndian};
    let be = value.to_be_bytes();
    LittleEndian::read_uint(&be[8 - nbytes..], nbytes)
}
