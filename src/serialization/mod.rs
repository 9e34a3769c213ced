//! Postcard-based payload serialization with versioned envelopes.
//!
//! The request cache stores opaque bytes so that one process-wide instance
//! can serve executors of different payload types. This module is the
//! canonical codec for those bytes: every entry is a Postcard-encoded
//! envelope carrying a magic header and a schema version.
//!
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────────────────┐
//! │  MAGIC (4 bytes)│VERSION (4 bytes)│POSTCARD PAYLOAD (N bytes)│
//! └─────────────────┴─────────────────┴──────────────────────────┘
//!   "FKIT"              u32 (LE)           postcard::to_allocvec(T)
//! ```
//!
//! The envelope buys two guarantees:
//!
//! - **Corruption detection:** bad magic or a truncated payload is rejected
//!   instead of being misread into a different type.
//! - **Schema evolution:** a version bump evicts old entries on read rather
//!   than silently migrating them.
//!
//! # Example
//!
//! ```rust
//! use fetch_kit::serialization::{serialize_for_cache, deserialize_from_cache};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Row { id: u64, label: String }
//!
//! # fn main() -> fetch_kit::Result<()> {
//! let row = Row { id: 1, label: "first".to_string() };
//! let bytes = serialize_for_cache(&row)?;
//! let back: Row = deserialize_from_cache(&bytes)?;
//! assert_eq!(row, back);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Magic header for fetch-kit cache entries: b"FKIT"
///
/// Any entry without this signature is rejected during deserialization.
pub const CACHE_MAGIC: [u8; 4] = *b"FKIT";

/// Current schema version.
///
/// Increment when making breaking changes to cached types (field
/// added/removed/reordered, type changed, enum variants changed). Entries
/// written under the old version are evicted and refetched on next access.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope wrapped around every cached payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEnvelope<T> {
    /// Magic header: must be b"FKIT"
    pub magic: [u8; 4],
    /// Schema version: must match CURRENT_SCHEMA_VERSION
    pub version: u32,
    /// The actual cached payload
    pub payload: T,
}

impl<T> CacheEnvelope<T> {
    /// Create a new envelope with current magic and version.
    pub fn new(payload: T) -> Self {
        Self {
            magic: CACHE_MAGIC,
            version: CURRENT_SCHEMA_VERSION,
            payload,
        }
    }
}

/// Serialize a payload with envelope for cache storage.
///
/// # Errors
///
/// Returns `Error::SerializationError` if Postcard serialization fails.
pub fn serialize_for_cache<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let envelope = CacheEnvelope::new(value);
    postcard::to_allocvec(&envelope).map_err(|e| {
        log::error!("Cache serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Deserialize a payload from cache storage with validation.
///
/// Validates the magic header and schema version before handing the payload
/// back; either failing means the entry should be evicted and refetched.
///
/// # Errors
///
/// - `Error::InvalidCacheEntry`: Invalid magic header
/// - `Error::VersionMismatch`: Schema version mismatch
/// - `Error::DeserializationError`: Corrupted Postcard payload
pub fn deserialize_from_cache<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> Result<T> {
    let envelope: CacheEnvelope<T> = postcard::from_bytes(bytes).map_err(|e| {
        log::error!("Cache deserialization failed: {}", e);
        Error::DeserializationError(e.to_string())
    })?;

    if envelope.magic != CACHE_MAGIC {
        log::warn!(
            "Invalid cache entry: expected magic {:?}, got {:?}",
            CACHE_MAGIC,
            envelope.magic
        );
        return Err(Error::InvalidCacheEntry(format!(
            "Invalid magic: expected {:?}, got {:?}",
            CACHE_MAGIC, envelope.magic
        )));
    }

    if envelope.version != CURRENT_SCHEMA_VERSION {
        log::warn!(
            "Cache version mismatch: expected {}, got {}",
            CURRENT_SCHEMA_VERSION,
            envelope.version
        );
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found: envelope.version,
        });
    }

    Ok(envelope.payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
    struct TestPayload {
        id: u64,
        label: String,
        flagged: bool,
    }

    fn sample() -> TestPayload {
        TestPayload {
            id: 123,
            label: "test".to_string(),
            flagged: true,
        }
    }

    #[test]
    fn test_roundtrip() {
        let data = sample();

        let bytes = serialize_for_cache(&data).unwrap();
        let deserialized: TestPayload = deserialize_from_cache(&bytes).unwrap();

        assert_eq!(data, deserialized);
    }

    #[test]
    fn test_envelope_structure() {
        let data = sample();
        let bytes = serialize_for_cache(&data).unwrap();

        // Postcard uses variable-length encoding, so decode the envelope
        // rather than poking at fixed byte positions.
        let envelope: CacheEnvelope<TestPayload> = postcard::from_bytes(&bytes).unwrap();

        assert_eq!(envelope.magic, CACHE_MAGIC);
        assert_eq!(envelope.version, CURRENT_SCHEMA_VERSION);
        assert_eq!(envelope.payload, data);
    }

    #[test]
    fn test_invalid_magic_rejected() {
        let mut bytes = vec![0u8; 100];
        bytes[0..4].copy_from_slice(b"XXXX"); // Wrong magic
        bytes[4..8].copy_from_slice(&1u32.to_le_bytes());

        let result: Result<TestPayload> = deserialize_from_cache(&bytes);
        assert!(result.is_err());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let data = sample();

        let mut envelope = CacheEnvelope::new(&data);
        envelope.version = 999;

        let bytes = postcard::to_allocvec(&envelope).unwrap();
        let result: Result<TestPayload> = deserialize_from_cache(&bytes);

        match result.unwrap_err() {
            Error::VersionMismatch { expected, found } => {
                assert_eq!(expected, CURRENT_SCHEMA_VERSION);
                assert_eq!(found, 999);
            }
            e => panic!("Expected VersionMismatch, got {:?}", e),
        }
    }

    #[test]
    fn test_deterministic_serialization() {
        let data1 = sample();
        let data2 = data1.clone();

        let bytes1 = serialize_for_cache(&data1).unwrap();
        let bytes2 = serialize_for_cache(&data2).unwrap();

        assert_eq!(bytes1, bytes2);
    }

    #[test]
    fn test_corrupted_payload_rejected() {
        let data = TestPayload {
            id: 123,
            label: "x".repeat(64),
            flagged: true,
        };
        let mut bytes = serialize_for_cache(&data).unwrap();

        // Truncate to half the size so the structure is incomplete
        let original_len = bytes.len();
        bytes.truncate(original_len / 2);

        let result: Result<TestPayload> = deserialize_from_cache(&bytes);
        match result.unwrap_err() {
            Error::DeserializationError(_) => {}
            e => panic!("Expected DeserializationError, got {:?}", e),
        }
    }

    #[test]
    fn test_vec_payload_roundtrip() {
        let data: Vec<u32> = vec![1, 2, 3];

        let bytes = serialize_for_cache(&data).unwrap();
        let deserialized: Vec<u32> = deserialize_from_cache(&bytes).unwrap();

        assert_eq!(data, deserialized);
    }
}
