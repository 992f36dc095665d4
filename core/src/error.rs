//! Error types for the grocery API client.
//!
//! # Design
//! One variant per failure source. `Decode` keeps the offending payload
//! because the upstream service is known to emit malformed bodies beyond the
//! two defects `repair` fixes; the raw text is the only way to diagnose them.
//! `Server` renders exactly as `<code>: <info>`.

use crate::http::TransportError;

/// Errors returned by `Session` operations and `GroceryClient::parse_*`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The transport failed to complete the request.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A command that needs a session key was called before logging in.
    /// Raised without contacting the server.
    #[error("no session key, must log in first")]
    NotLoggedIn,

    /// The (repaired) payload did not match the expected response shape.
    #[error("{source}\n{raw}")]
    Decode {
        source: serde_json::Error,
        raw: String,
    },

    /// The response decoded but carried a non-zero status code.
    #[error("{code}: {info}")]
    Server { code: i32, info: String },
}

impl ApiError {
    /// The server's status code, for `Server` errors.
    pub fn status_code(&self) -> Option<i32> {
        match self {
            ApiError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The raw payload, for `Decode` errors.
    pub fn raw_payload(&self) -> Option<&str> {
        match self {
            ApiError::Decode { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
