// Content fingerprints for duplicate detection and artifact names

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use crate::constants::{HASH_ALGORITHM, HASH_CHUNK_SIZE, HASH_FAST_SCHEME, STEM_HASH_CHARS};
use crate::error::{VidpeekError, Result};

/// Fingerprint of a video file, `blake3:first_last_size_v1:<hex>`.
///
/// Only the leading and trailing `HASH_CHUNK_SIZE` bytes are read, followed by
/// the little-endian length, so multi-gigabyte downloads hash in constant time.
/// Files no larger than one chunk are hashed whole, once.
pub fn compute_fast_hash(path: &Path) -> Result<String> {
    let hash_err = |what: &str, e: std::io::Error| {
        VidpeekError::Hash(format!("{} {}: {}", what, path.display(), e))
    };

    let mut file = File::open(path).map_err(|e| hash_err("cannot open", e))?;
    let len = file.metadata().map_err(|e| hash_err("cannot stat", e))?.len();
    let chunk = HASH_CHUNK_SIZE as u64;

    let mut hasher = blake3::Hasher::new();
    let head = read_span(&mut file, 0, len.min(chunk)).map_err(|e| hash_err("cannot read head of", e))?;
    hasher.update(&head);
    if len > chunk {
        let tail = read_span(&mut file, len - chunk, chunk).map_err(|e| hash_err("cannot read tail of", e))?;
        hasher.update(&tail);
    }
    hasher.update(&len.to_le_bytes());

    Ok(format!("{}:{}:{}", HASH_ALGORITHM, HASH_FAST_SCHEME, hasher.finalize().to_hex()))
}

fn read_span(file: &mut File, offset: u64, len: u64) -> std::io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len as usize];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

/// Short hex tag taken from a fingerprint, used to keep artifact names apart.
pub fn short_tag(fingerprint: &str) -> &str {
    let hex = fingerprint.rsplit(':').next().unwrap_or(fingerprint);
    &hex[..hex.len().min(STEM_HASH_CHARS)]
}
