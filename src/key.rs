//! Cache key derivation and composition.
//!
//! Two calls with the same operation name and structurally identical
//! parameters must land on the same cache slot — that is what makes
//! automatic request de-duplication work. Keys are derived as
//! `"{operation}:{digest}"` where the digest is a truncated SHA-256 over a
//! canonical (recursively key-sorted) JSON rendering of the parameters.
//!
//! The digest is a convenience default, not a correctness guarantee:
//! callers who need exact control supply an explicit key via
//! `CacheOptions::cache_key`, which always wins over derivation.

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest.
const DIGEST_LEN: usize = 16;

/// Builder for cache keys.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Derive a cache key from an operation name and its parameters.
    ///
    /// Parameters are serialized to canonical JSON (object keys emitted in
    /// sorted order, recursively) so that struct field order and map
    /// iteration order cannot produce distinct keys for equal values.
    ///
    /// # Example
    ///
    /// ```
    /// use fetch_kit::key::CacheKeyBuilder;
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Params { page: u32, limit: u32 }
    ///
    /// # fn main() -> fetch_kit::Result<()> {
    /// let a = CacheKeyBuilder::derive("list_journals", &Params { page: 0, limit: 10 })?;
    /// let b = CacheKeyBuilder::derive("list_journals", &Params { page: 0, limit: 10 })?;
    /// assert_eq!(a, b);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyDerivation` if the parameters cannot be serialized.
    pub fn derive<P: Serialize>(operation: &str, params: &P) -> Result<String> {
        let value =
            serde_json::to_value(params).map_err(|e| Error::KeyDerivation(e.to_string()))?;
        let canonical = canonical_json(&value);

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let digest = hasher.finalize();

        use std::fmt::Write;
        let mut hex = String::with_capacity(DIGEST_LEN);
        for byte in digest.iter().take(DIGEST_LEN / 2) {
            let _ = write!(hex, "{:02x}", byte);
        }

        Ok(format!("{}:{}", operation, hex))
    }

    /// Build a cache key with an explicit prefix and suffix.
    pub fn build_with_prefix(prefix: &str, suffix: &dyn std::fmt::Display) -> String {
        format!("{}:{}", prefix, suffix)
    }

    /// Build a composite key from multiple parts.
    pub fn build_composite(parts: &[&str]) -> String {
        parts.join(":")
    }
}

/// Render a JSON value with object keys in sorted order, recursively.
///
/// `serde_json` preserves insertion order for maps, so two structurally
/// equal values serialized through different map types could otherwise
/// print differently.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).unwrap_or_default(),
                        canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", rendered.join(","))
        }
        other => other.to_string(),
    }
}
