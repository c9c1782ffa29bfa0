//! Utility functions and helpers.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Hex SHA-256 of a value's JSON encoding.
///
/// Records built from ordered collections serialize the same way every time,
/// so equal fingerprints mean byte-identical output files.
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Secondary sort key for records that tie on scrape time.
///
/// Orders by JSON encoding, so the fold order never depends on input order.
pub fn tie_break_key<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

/// Leading twelve characters of a fingerprint, for log lines.
pub fn short_fingerprint(fingerprint: &str) -> &str {
    fingerprint
        .char_indices()
        .nth(12)
        .map_or(fingerprint, |(idx, _)| &fingerprint[..idx])
}
