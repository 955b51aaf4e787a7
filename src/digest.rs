//! SHA256 digest utilities
//!
//! Centralized helpers for computing, validating, and formatting the SHA256
//! digests used to correlate pushed images with repository artifacts.

use crate::error::{PublisherError, Result};
use sha2::{Digest, Sha256};

/// Utilities for working with SHA256 digests
pub struct DigestUtils;

impl DigestUtils {
    /// Compute SHA256 digest from byte data
    pub fn compute_sha256(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    /// Validate SHA256 hex string (64 characters, all hex)
    pub fn is_valid_sha256_hex(digest: &str) -> bool {
        digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Validate full digest format (sha256:xxxxx)
    pub fn is_valid_prefixed_digest(digest: &str) -> bool {
        match digest.strip_prefix("sha256:") {
            Some(hex_part) => Self::is_valid_sha256_hex(hex_part),
            None => false,
        }
    }

    /// Extract the hex part from a digest, accepting both prefixed and bare forms
    pub fn extract_hex_part(digest: &str) -> Result<&str> {
        let hex_part = digest.strip_prefix("sha256:").unwrap_or(digest);
        if Self::is_valid_sha256_hex(hex_part) {
            Ok(hex_part)
        } else {
            Err(PublisherError::Validation(format!(
                "Invalid SHA256 digest: expected 64 hex characters, got '{}'",
                digest
            )))
        }
    }

    /// Normalize digest to the prefixed form (add sha256: if missing)
    pub fn normalize_digest(digest: &str) -> Result<String> {
        let hex_part = Self::extract_hex_part(digest)?;
        Ok(format!("sha256:{}", hex_part))
    }

    /// Format digest for display (truncated for readability)
    pub fn format_digest_short(digest: &str) -> String {
        if digest.len() > 23 {
            format!("{}...", &digest[..23])
        } else {
            digest.to_string()
        }
    }
}
