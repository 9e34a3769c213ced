//! Error types for the request-cache framework.

use std::fmt;

/// Result type for fetch-kit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the request-cache framework.
///
/// All fallible leaf APIs (serialization, key derivation) return `Result<T>`.
/// The executor and pagination surfaces never propagate these across
/// `send()`/`fetch()`; they fold failures into the `error` state field.
#[derive(Debug, Clone)]
pub enum Error {
    /// Serialization failed when converting a payload to cache bytes.
    ///
    /// This occurs when the payload's `Serde` implementation fails.
    /// Common causes:
    /// - Payload contains non-serializable types
    /// - Postcard codec error
    SerializationError(String),

    /// Deserialization failed when converting cache bytes to a payload.
    ///
    /// This indicates corrupted or malformed data in cache.
    ///
    /// **Recovery:** Cache entry should be evicted and refetched.
    DeserializationError(String),

    /// Invalid cache entry: corrupted envelope or bad magic.
    ///
    /// Returned when:
    /// - Magic header is not `b"FKIT"`
    /// - Envelope deserialization fails
    /// - Foreign data under a fetch-kit cache key
    ///
    /// **Recovery:** Evict the cache entry and refetch.
    InvalidCacheEntry(String),

    /// Schema version mismatch between code and cached data.
    ///
    /// Raised when `CURRENT_SCHEMA_VERSION` changed between the writer and
    /// the reader of a cache entry. Old entries are evicted and refetched on
    /// next access; no action needed — this is expected during deployments.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from cached entry)
        found: u32,
    },

    /// Cache key derivation failed.
    ///
    /// Raised when the operation's parameters cannot be serialized into the
    /// canonical form the key digest is computed over. Supply an explicit
    /// `cache_key` to bypass derivation entirely.
    KeyDerivation(String),

    /// The underlying request operation failed.
    ///
    /// Carries the message the operation resolved or rejected with. The
    /// executor converts this into the `error` state field rather than
    /// surfacing it to `send()` callers.
    OperationFailed(String),

    /// The operation was aborted because a newer request superseded it.
    ///
    /// Not a user-visible failure: the executor swallows this variant
    /// without touching the `error` state field.
    Aborted,

    /// Configuration error during construction.
    ///
    /// Common causes:
    /// - Zero `per_page` on a pagination controller
    /// - `fresh_for` exceeding `max_age` where a caller opted into the check
    ConfigError(String),

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::InvalidCacheEntry(msg) => write!(f, "Invalid cache entry: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Cache version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::KeyDerivation(msg) => write!(f, "Key derivation error: {}", msg),
            Error::OperationFailed(msg) => write!(f, "Operation failed: {}", msg),
            Error::Aborted => write!(f, "Operation aborted"),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}
