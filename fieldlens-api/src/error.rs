//! Errors returned by the fieldlens crate
//!
use snafu::prelude::*;

/// Errors returned by fieldlens operations
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LensError {
    /// A required identifier or parameter was missing or invalid.
    /// Raised synchronously, before any network call is made.
    #[snafu(display("invalid argument: {message}"))]
    InvalidArgument { message: String },

    /// Transport-level failure (connection refused, DNS, TLS, ...).
    #[snafu(display("HTTP error for endpoint {endpoint}"))]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    /// The round trip exceeded the configured bound. The in-flight request
    /// was cancelled; callers decide whether to retry.
    #[snafu(display("request timed out ({endpoint})"))]
    Timeout { endpoint: String },

    /// The response body was empty or not parseable as JSON.
    /// `preview` holds at most the first 200 characters of the body.
    #[snafu(display("malformed response ({endpoint}): {preview:?}"))]
    MalformedResponse { endpoint: String, preview: String },

    /// The backend returned a well-formed envelope with a non-zero code.
    #[snafu(display("backend error ({endpoint}) code {code}: {message}"))]
    Api {
        endpoint: String,
        code: i64,
        message: String,
    },

    /// A name-to-id resolution failed. User-facing operations convert this
    /// into a notification rather than a hard failure.
    #[snafu(display("{obj_type} {key:?} not found"))]
    NotFound { obj_type: String, key: String },

    /// Deserialization error. This means a server response did not match the
    /// expected shape. If you see this error, please report it as a bug.
    #[snafu(display("deserialization: {source}"))]
    Deserialization { source: serde_json::Error },

    /// Serialization error. Unlikely to occur.
    #[snafu(display("serialization: {source}"))]
    Serialization { source: serde_json::Error },

    /// A cell-set call failed after the user attempted a save.
    /// The edit UI stays open so the user can retry or cancel.
    #[snafu(display("edit commit failed: {message}"))]
    EditCommit { message: String },
}

impl LensError {
    /// True for resolution failures that user-facing operations report as a
    /// transient notification instead of aborting the surrounding loop.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LensError::NotFound { .. })
    }
}
