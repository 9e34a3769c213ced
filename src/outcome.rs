//! Result shape of one request operation run.

use serde::{Deserialize, Serialize};

/// What a request operation resolved with.
///
/// This is the contract between the transport layer and the executor: the
/// operation reports success or failure in-band rather than through
/// `Err`, mirroring how HTTP service wrappers usually surface results.
/// The executor does not interpret `status` beyond passing it through.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchOutcome<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// The payload, present on success (and possibly absent even then —
    /// e.g. a 204-style response).
    pub data: Option<T>,
    /// Failure message, present on failure.
    pub error: Option<String>,
    /// Transport status code, passed through untouched.
    pub status: Option<u16>,
}

impl<T> FetchOutcome<T> {
    /// Successful outcome carrying a payload.
    pub fn ok(data: T) -> Self {
        FetchOutcome {
            success: true,
            data: Some(data),
            error: None,
            status: None,
        }
    }

    /// Failed outcome carrying a message.
    pub fn fail(error: impl Into<String>) -> Self {
        FetchOutcome {
            success: false,
            data: None,
            error: Some(error.into()),
            status: None,
        }
    }

    /// Attach a transport status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// The failure message, or a generic fallback.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "Request failed".to_string())
    }
}
