//! General-purpose file utilities shared across the engine.

use crate::BUFFER_SIZE;
use anyhow::Result;
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, Read};
use std::iter::repeat_with;
use std::path::Path;
use std::sync::atomic::Ordering;

/// Generates a random temp file name with the given prefix/suffix.
pub fn get_tmp_name(prefix: &str, suffix: &str, rand_len: usize) -> OsString {
    let capacity = prefix.len().saturating_add(suffix.len()).saturating_add(rand_len);
    let mut buf = OsString::with_capacity(capacity);
    buf.push(prefix);
    let mut char_buf = [0u8; 4];
    for c in repeat_with(fastrand::alphanumeric).take(rand_len) {
        buf.push(c.encode_utf8(&mut char_buf));
    }
    buf.push(suffix);
    buf
}

/// Formats a byte count as a human-readable size (KB/MB/GB).
pub fn format_bytes(bytes: u64) -> String {
    let kb = 1024f64;
    let b = bytes as f64;
    if b >= kb.powi(3) {
        format!("{:.1} GB", b / kb.powi(3))
    } else if b >= kb.powi(2) {
        format!("{:.1} MB", b / kb.powi(2))
    } else if b >= kb {
        format!("{:.1} KB", b / kb)
    } else {
        format!("{bytes} B")
    }
}

/// Computes the SHA256 hash of a file, reading in `BUFFER_SIZE` chunks.
/// `callback`, if given, is invoked after each chunk with `(bytesRead, totalSize)`.
pub fn get_file_sha256(path: impl AsRef<Path>, mut callback: Option<&mut dyn FnMut(u64, u64)>) -> Result<String> {
    let file = File::open(path)?;
    let total_len = file.metadata()?.len();
    let mut reader = BufReader::new(&file);

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE.load(Ordering::Relaxed)];
    let mut read_total: u64 = 0;

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        read_total += bytes_read as u64;
        hasher.update(&buffer[..bytes_read]);
        if let Some(ref mut cb) = callback {
            cb(read_total, total_len);
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}
