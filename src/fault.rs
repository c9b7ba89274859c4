//! Fault reporting
//! Converts unmatched routes and relay failures into a uniform JSON
//! error envelope. This is the only path that emits non-proxied JSON.

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::relay::full_body;

/// Fixed message for server-class failures; the real cause stays out of
/// client responses.
const MASKED_MESSAGE: &str = "Something unexpected happened";

/// Per-request relay failure.
///
/// Every variant is recoverable: it becomes an envelope response and the
/// process keeps serving. The only fatal error class is
/// [`crate::config::ConfigError`], which can only occur before startup
/// completes.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No route matched the inbound request
    #[error("Not Found")]
    NotFound,

    /// Inbound body could not be read from the connection
    #[error("failed to read request body: {0}")]
    BodyRead(#[source] hyper::Error),

    /// Inbound body was present but not valid JSON, so it cannot be
    /// re-serialized for the outbound call
    #[error("request body is not valid JSON: {0}")]
    BodyEncoding(#[from] serde_json::Error),

    /// Network-level failure reaching the backing service
    #[error("error reaching backing service: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl RelayError {
    /// Status code the envelope is sent with
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::NotFound => StatusCode::NOT_FOUND,
            RelayError::BodyRead(_) | RelayError::BodyEncoding(_) | RelayError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Uniform JSON shape for every locally generated error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: u16,
    pub message: String,
    pub details: String,
}

impl ErrorEnvelope {
    /// Map a relay failure to the envelope sent to the client.
    ///
    /// Client-class statuses pass the original message through; server-class
    /// statuses mask it. `details` carries the rendered error chain only
    /// outside production mode.
    pub fn from_error(err: &RelayError, production: bool) -> Self {
        let status = err.status();

        let message = if status.is_server_error() {
            MASKED_MESSAGE.to_string()
        } else {
            err.to_string()
        };

        let details = if production {
            String::new()
        } else {
            render_chain(err)
        };

        ErrorEnvelope {
            status: status.as_u16(),
            message,
            details,
        }
    }
}

/// Build the envelope response for a failed request.
///
/// Server-class failures are always logged server-side with full detail,
/// in every deployment mode.
pub fn error_response(err: &RelayError, production: bool) -> Response<BoxBody<Bytes, hyper::Error>> {
    let status = err.status();

    if status.is_server_error() {
        error!("request failed: {}", render_chain(err));
    }

    let envelope = ErrorEnvelope::from_error(err, production);
    let body = serde_json::to_vec(&envelope).unwrap_or_default();

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(full_body(Bytes::from(body)))
        .unwrap()
}

/// Render an error with its full source chain for logs and non-production
/// `details`.
fn render_chain(err: &RelayError) -> String {
    use std::error::Error as _;

    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str("\ncaused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
