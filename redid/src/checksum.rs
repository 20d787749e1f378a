//! Additive checksums trailing every 128-byte record.
use crate::structs::RECORD_BYTES;

/// Byte sum modulo 256.
pub fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// The byte that makes `bytes` plus itself sum to zero.
pub fn expected(bytes: &[u8]) -> u8 {
    0u8.wrapping_sub(sum(bytes))
}

/// Whether the last byte of a full record is the checksum of the other 127.
pub fn verify(record: &[u8]) -> bool {
    match record.split_last() {
        Some((stored, body)) if record.len() == RECORD_BYTES => *stored == expected(body),
        _ => false,
    }
}

/// Stored and expected checksum of each full record in `data`.
pub fn records(data: &[u8]) -> Vec<(u8, u8)> {
    data.chunks_exact(RECORD_BYTES)
        .map(|r| (r[RECORD_BYTES - 1], expected(&r[..RECORD_BYTES - 1])))
        .collect()
}
