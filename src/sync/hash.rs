//! Content fingerprints for sync comparisons.
//!
//! Fingerprints are lowercase hex MD5, the digest storage services
//! commonly report for stored objects, so local and remote values can be
//! compared as plain strings.

use base64::Engine;
use md5::{Digest, Md5};
use std::io::Read;
use std::path::Path;

use crate::error::{Result, SyncError};

const BUFFER_SIZE: usize = 16 * 1024;

/// Hash bytes to a fingerprint.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Hash a file's content, streaming it through a fixed buffer.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file =
        std::fs::File::open(path).map_err(|e| SyncError::from_io_error(e, "opening", path))?;
    let mut hasher = Md5::new();
    let mut buffer = [0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| SyncError::from_io_error(e, "hashing", path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Turn whatever digest a store reports into a fingerprint.
///
/// `Content-MD5` is base64 of the raw digest; some stores put hex there
/// instead. An ETag only counts when it is a bare hex MD5 (multipart
/// uploads produce `<hex>-<parts>` ETags that are not content hashes).
pub fn normalize_reported_hash(content_md5: Option<&str>, etag: Option<&str>) -> Option<String> {
    if let Some(md5) = content_md5.map(str::trim).filter(|s| !s.is_empty()) {
        if is_hex_md5(md5) {
            return Some(md5.to_ascii_lowercase());
        }
        if let Ok(raw) = base64::engine::general_purpose::STANDARD.decode(md5) {
            if raw.len() == 16 {
                return Some(hex::encode(raw));
            }
        }
    }

    etag.map(|tag| tag.trim().trim_start_matches("W/").trim_matches('"'))
        .filter(|tag| is_hex_md5(tag))
        .map(str::to_ascii_lowercase)
}

fn is_hex_md5(value: &str) -> bool {
    value.len() == 32 && value.chars().all(|c| c.is_ascii_hexdigit())
}
