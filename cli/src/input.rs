use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Read an EDID blob from disk, inflating it first if it is gzip-compressed.
pub fn read_edid<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let mut raw = Vec::new();
    BufReader::new(file)
        .read_to_end(&mut raw)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    inflate(raw).with_context(|| format!("Failed to inflate {}", path.display()))
}

fn inflate(raw: Vec<u8>) -> Result<Vec<u8>> {
    if !raw.starts_with(&GZIP_MAGIC) {
        return Ok(raw);
    }
    let mut bytes = vec![];
    GzDecoder::new(raw.as_slice()).read_to_end(&mut bytes)?;
    Ok(bytes)
}
