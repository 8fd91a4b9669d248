//! Whole-file content digests.
//!
//! MD5, lower-case hex. This is change detection, not tamper-proofing: the
//! digests in config.ini are recorded by the operator with the same function,
//! and MD5 keeps hashes recorded by earlier releases valid.

use camino::Utf8Path;
use std::fs::File;
use std::io::{self, Read};

const BUFFER_SIZE: usize = 64 * 1024;

/// Hash a file's contents.
///
/// Returns the raw [`io::Error`] so callers can tell `NotFound` apart from
/// other read failures.
pub fn hash_file(path: &Utf8Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        context.consume(&buffer[..bytes_read]);
    }

    let digest = format!("{:x}", context.compute());
    tracing::debug!("Hashed {} -> {}", path, digest);
    Ok(digest)
}

/// Hash an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Compare a computed digest with a configured one.
///
/// Case-insensitive, surrounding whitespace ignored. An empty configured hash
/// never matches.
pub fn digests_match(computed: &str, configured: &str) -> bool {
    let configured = configured.trim();
    !configured.is_empty() && computed.trim().eq_ignore_ascii_case(configured)
}
