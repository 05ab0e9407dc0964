//! HTTP transport used by `AvManager`
//!
//! Responsible for
//!  - issuing all backend requests (JSON over HTTP POST)
//!  - bounding each round trip with a timeout (cancellation, not retry)
//!  - decoding the `{code, msg, data}` response envelope
//!  - logging failures with the endpoint name before propagating them
//!
//! No request is ever retried here; at-most-one-attempt semantics apply
//! uniformly and callers decide what a failure means for them.

use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use snafu::prelude::*;
use tracing::{debug, error, trace};

use crate::{
    Result,
    config::{AV_API_PREFIX, BODY_PREVIEW_MAX_CHARS, DEFAULT_TIMEOUT_SECS},
    error::{HttpSnafu, LensError},
};

/// Object-safe seam between `AvManager` and the wire.
///
/// Production code uses [`RemoteClient`]; tests substitute an in-memory
/// implementation that records endpoint traffic.
pub trait Transport: Send + Sync {
    /// POSTs to an endpoint in the attribute-view namespace
    /// (`{base}/api/av/{endpoint}`) and returns the envelope's `data`.
    fn call<'a>(&'a self, endpoint: &'a str, payload: Value) -> BoxFuture<'a, Result<Value>>;
}

/// Options for [`RemoteClient`].
#[derive(Debug, Clone)]
pub struct RemoteOptions {
    /// Bound on each complete round trip (send + body read). Default 30 s.
    pub timeout: Duration,
    /// Extra headers attached to every request (e.g. an api token).
    pub headers: Vec<(String, String)>,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        RemoteOptions {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            headers: Vec::new(),
        }
    }
}

/// Thin request layer over the backend's fixed namespace.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    options: RemoteOptions,
}

impl RemoteClient {
    /// Creates a client for the given base url (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_options(base_url, RemoteOptions::default())
    }

    pub fn with_options(base_url: impl Into<String>, options: RemoteOptions) -> Self {
        RemoteClient {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            options,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, path: &str, endpoint: &str, payload: Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        log_request(endpoint, &url, &payload);

        let mut request = self.http.post(&url).json(&payload);
        for (name, value) in &self.options.headers {
            request = request.header(name, value);
        }

        let round_trip = async {
            let response = request.send().await.context(HttpSnafu { endpoint })?;
            let status = response.status();
            let raw = response.text().await.context(HttpSnafu { endpoint })?;
            Ok::<(reqwest::StatusCode, String), LensError>((status, raw))
        };

        let (status, raw) = match tokio::time::timeout(self.options.timeout, round_trip).await {
            Err(_elapsed) => {
                let err = LensError::Timeout {
                    endpoint: endpoint.to_string(),
                };
                error!(endpoint, "request timed out after {:?}", self.options.timeout);
                return Err(err);
            }
            Ok(result) => result.inspect_err(|err| error!(endpoint, %err, "request failed"))?,
        };

        if !status.is_success() {
            let err = LensError::Api {
                endpoint: endpoint.to_string(),
                code: i64::from(status.as_u16()),
                message: preview(&raw),
            };
            error!(endpoint, %status, "http error status");
            return Err(err);
        }

        log_response(endpoint, &raw);
        decode_envelope(endpoint, &raw).inspect_err(|err| error!(endpoint, %err, "bad response"))
    }
}

impl Transport for RemoteClient {
    fn call<'a>(&'a self, endpoint: &'a str, payload: Value) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let path = format!("{AV_API_PREFIX}{endpoint}");
            self.post(&path, endpoint, payload).await
        })
    }
}

/// The backend's response envelope. `code == 0` means success.
#[derive(Debug, serde::Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Value,
}

/// Decodes a response body into the envelope's `data`.
///
/// An empty body and a non-JSON body both signal `MalformedResponse` with a
/// truncated preview for diagnostics; a non-zero envelope code signals `Api`
/// with the server-supplied message.
fn decode_envelope(endpoint: &str, raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Err(LensError::MalformedResponse {
            endpoint: endpoint.to_string(),
            preview: String::new(),
        });
    }
    let envelope: Envelope = match serde_json::from_str(raw) {
        Ok(envelope) => envelope,
        Err(_) => {
            return Err(LensError::MalformedResponse {
                endpoint: endpoint.to_string(),
                preview: preview(raw),
            });
        }
    };
    if envelope.code != 0 {
        return Err(LensError::Api {
            endpoint: endpoint.to_string(),
            code: envelope.code,
            message: if envelope.msg.is_empty() {
                "request failed".to_string()
            } else {
                envelope.msg
            },
        });
    }
    Ok(envelope.data)
}

/// First [`BODY_PREVIEW_MAX_CHARS`] characters of a body, marked if truncated.
fn preview(raw: &str) -> String {
    let mut out: String = raw.chars().take(BODY_PREVIEW_MAX_CHARS).collect();
    if raw.chars().nth(BODY_PREVIEW_MAX_CHARS).is_some() {
        out.push('…');
    }
    out
}

// dump request/response json, for debugging
// requires RUST_LOG=fieldlens::http_json=trace
fn log_request(endpoint: &str, url: &str, payload: &Value) {
    debug!(endpoint, "request");
    if tracing::enabled!(target: "fieldlens::http_json", tracing::Level::TRACE) {
        trace!(target: "fieldlens::http_json", "{endpoint} url={url} body={payload}");
    }
}

fn log_response(endpoint: &str, raw: &str) {
    if tracing::enabled!(target: "fieldlens::http_json", tracing::Level::TRACE) {
        trace!(target: "fieldlens::http_json", "response endpoint={endpoint} body={raw}");
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_envelope, preview};
    use crate::error::LensError;

    #[test]
    fn test_decode_success_envelope() {
        let data = decode_envelope("getAttributeView", r#"{"code":0,"msg":"","data":{"x":1}}"#)
            .expect("decode");
        assert_eq!(data, serde_json::json!({"x": 1}));
    }

    #[test]
    fn test_decode_empty_body() {
        let err = decode_envelope("renderAttributeView", "  ").unwrap_err();
        assert!(matches!(err, LensError::MalformedResponse { ref preview, .. } if preview.is_empty()));
    }

    #[test]
    fn test_decode_non_json_body() {
        let err = decode_envelope("renderAttributeView", "<html>oops</html>").unwrap_err();
        match err {
            LensError::MalformedResponse { preview, .. } => {
                assert_eq!(preview, "<html>oops</html>");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_application_error() {
        let err =
            decode_envelope("addAttributeViewKey", r#"{"code":-1,"msg":"no such av","data":null}"#)
                .unwrap_err();
        match err {
            LensError::Api { code, message, .. } => {
                assert_eq!(code, -1);
                assert_eq!(message, "no such av");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_preview_truncation() {
        let long = "x".repeat(300);
        let short = preview(&long);
        assert_eq!(short.chars().count(), 201);
        assert!(short.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }
}
