//! Content hashing for ETags.
//!
//! Uses blake3 so tags stay stable across restarts and builds.
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let tag = hash::etag("<div>...</div>"); // -> "\"a1b2c3d4e5f60718\""
//! ```

/// Number of hex chars kept from the digest.
const FINGERPRINT_LEN: usize = 16;

/// Compute a short hex fingerprint of the content.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(content: &T) -> String {
    let hash = blake3::hash(content.as_ref());
    hex::encode(&hash.as_bytes()[..FINGERPRINT_LEN / 2])
}

/// Compute a strong ETag (quoted fingerprint) for rendered content.
#[inline]
pub fn etag<T: AsRef<[u8]> + ?Sized>(content: &T) -> String {
    format!("\"{}\"", fingerprint(content))
}
