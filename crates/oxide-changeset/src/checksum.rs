//! Changeset content checksums.
//!
//! Checksums are CRC32 (IEEE 802.3) over the raw file bytes, widened to
//! `i64` so every backend can store them in a plain 64-bit integer column.

use std::io::{self, Read};

use crc32fast::Hasher;

use crate::source::ChangesetSource;

/// Read buffer size.
const CHUNK_SIZE: usize = 1024;

/// Computes the checksum of everything `reader` yields.
///
/// # Errors
///
/// Returns any I/O error raised by `reader`.
pub fn checksum_reader<R: Read>(mut reader: R) -> io::Result<i64> {
    let mut hasher = Hasher::new();
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(i64::from(hasher.finalize())),
            Ok(n) => hasher.update(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

/// Computes the checksum of an in-memory buffer.
#[must_use]
pub fn checksum_bytes(bytes: &[u8]) -> i64 {
    i64::from(crc32fast::hash(bytes))
}

/// Computes the checksum of the file at `path` within `source`.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub fn checksum_file(source: &dyn ChangesetSource, path: &str) -> io::Result<i64> {
    checksum_reader(source.open(path)?)
}
