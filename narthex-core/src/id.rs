//! Prefixed identifier generation
//!
//! Account identifiers look like `acc_<base64url>`: a short type prefix
//! followed by at least 96 bits of randomness, URL-safe and unpadded.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::Rng;

const MIN_ENTROPY_BYTES: usize = 12;

/// Generate a prefixed ID with 96 bits of entropy.
///
/// # Example
/// ```
/// use narthex_core::id::generate_prefixed_id;
///
/// let id = generate_prefixed_id("acc");
/// assert!(id.starts_with("acc_"));
/// ```
pub fn generate_prefixed_id(prefix: &str) -> String {
    let mut bytes = [0u8; MIN_ENTROPY_BYTES];
    rand::rng().fill(&mut bytes);

    format!("{prefix}_{}", BASE64_URL_SAFE_NO_PAD.encode(bytes))
}

/// Check that `id` is `{expected_prefix}_{base64url}` with enough entropy.
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    let Some(random_part) = id
        .strip_prefix(expected_prefix)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };

    match BASE64_URL_SAFE_NO_PAD.decode(random_part) {
        Ok(decoded) => decoded.len() >= MIN_ENTROPY_BYTES,
        Err(_) => false,
    }
}
