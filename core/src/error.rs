//! Error types for the Keptn API client.
//!
//! # Design
//! Every call returns the same `ApiError` whether the failure happened on
//! the remote side (a non-2xx response carrying a JSON error body) or
//! locally (transport failure, JSON encode/decode failure, a request model
//! that fails validation). The two cases differ only in the message text.
//! `ConfigError` is separate: it is raised while building a
//! `ClientConfig`, before any call is made.

use serde::{Deserialize, Serialize};

/// Error body returned by the Keptn API, or synthesized locally.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, thiserror::Error)]
#[error("{}", .message.as_deref().unwrap_or("unknown API error"))]
pub struct ApiError {
    /// Error code reported by the server. Absent for local failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    /// Synthesize an error for a failure that never reached the server, or
    /// whose response could not be interpreted.
    pub fn local(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: Some(message.into()),
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Errors raised while assembling a `ClientConfig`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("unsupported scheme {0:?}, expected \"http\" or \"https\"")]
    InvalidScheme(String),
}
