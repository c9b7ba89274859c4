//! Relay pipeline
//! Rewrites inbound requests against the backing service, issues the
//! outbound call with the configured verb, and copies the response back,
//! filtering a small set of headers in each direction.

use crate::config::ProxyConfig;
use crate::fault::RelayError;
use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::HeaderMap;
use hyper::{Request, Response};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Inbound headers never forwarded to the backing service: the host must
/// name the backing service, and the transport recomputes the body length
/// after re-serialization.
const REQUEST_HEADER_DENYLIST: &[&str] = &["host", "content-length"];

/// Response headers never relayed back to the caller: the body is already
/// decoded text by the time it reaches the relay, so a stale encoding
/// header would trigger a second decode downstream.
const RESPONSE_HEADER_DENYLIST: &[&str] = &["content-encoding"];

/// A request or response body as observed by the relay.
///
/// `Absent` (no bytes on the wire) is distinct from an empty or `{}` body;
/// the distinction changes both logging and what is sent outbound.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Absent,
    Json(Value),
    Text(String),
}

impl Payload {
    /// Parse an inbound request body. Non-empty bytes must be valid JSON.
    pub fn from_inbound(bytes: &[u8]) -> Result<Self, RelayError> {
        if bytes.is_empty() {
            return Ok(Payload::Absent);
        }
        let value: Value = serde_json::from_slice(bytes)?;
        Ok(Payload::Json(value))
    }

    /// Classify already-read response text for diagnostics. The relayed
    /// body is always the raw text regardless of how it classifies here.
    pub fn inspect(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Text(text.to_string()),
        }
    }

    /// Serialized form sent to the backing service. Absent bodies send an
    /// empty string; JSON bodies re-serialize canonically (structure is
    /// preserved, byte-exact formatting is not).
    pub fn to_outbound(&self) -> Result<String, RelayError> {
        match self {
            Payload::Absent => Ok(String::new()),
            Payload::Json(value) => Ok(serde_json::to_string(value)?),
            Payload::Text(text) => Ok(text.clone()),
        }
    }
}

/// Build the outbound target URL.
///
/// Raw string concatenation, no re-encoding or normalization: a trailing
/// slash on the base plus the leading slash of the path yields `//`, which
/// is preserved deliberately.
pub fn backend_url(base: &str, path_and_query: &str) -> String {
    format!("{}{}", base, path_and_query)
}

/// Copy `headers` minus the case-insensitive names in `denylist`,
/// preserving order, duplicates, and exact values of everything else.
fn strip_headers(headers: &HeaderMap, denylist: &[&str]) -> HeaderMap {
    let mut filtered = HeaderMap::new();
    for (key, value) in headers.iter() {
        if denylist.iter().any(|h| key.as_str().eq_ignore_ascii_case(h)) {
            continue;
        }
        filtered.append(key, value.clone());
    }
    filtered
}

/// Inbound headers minus `host` and `content-length`
pub fn filter_request_headers(headers: &HeaderMap) -> HeaderMap {
    strip_headers(headers, REQUEST_HEADER_DENYLIST)
}

/// Backing service response headers minus `content-encoding`
pub fn filter_response_headers(headers: &HeaderMap) -> HeaderMap {
    strip_headers(headers, RESPONSE_HEADER_DENYLIST)
}

/// Forwards inbound requests to the backing service and relays responses
pub struct Relay {
    config: Arc<ProxyConfig>,
    client: reqwest::Client,
}

impl Relay {
    pub fn new(config: Arc<ProxyConfig>) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Forward one inbound request and produce the response for the
    /// original caller. A single outbound attempt; failures propagate to
    /// the fault reporter.
    pub async fn forward(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<BoxBody<Bytes, hyper::Error>>, RelayError> {
        let (parts, body) = req.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_string();

        let body_bytes = body.collect().await.map_err(RelayError::BodyRead)?.to_bytes();
        let payload = Payload::from_inbound(&body_bytes)?;

        log_inbound(&parts.headers, &payload);

        let target = backend_url(&self.config.backing_base_url, &path_and_query);
        let headers = filter_request_headers(&parts.headers);
        let outbound_body = payload.to_outbound()?;

        debug!("proxying to: {} {}", self.config.proxy_verb, target);

        let upstream = self
            .client
            .request(self.config.proxy_verb.clone(), target)
            .headers(headers)
            .body(outbound_body)
            .send()
            .await?;

        relay_response(upstream).await
    }
}

/// Copy the backing service response back to the caller: status verbatim,
/// headers minus `content-encoding`, body as the raw text exactly as read.
async fn relay_response(
    upstream: reqwest::Response,
) -> Result<Response<BoxBody<Bytes, hyper::Error>>, RelayError> {
    let status = upstream.status();
    let headers = filter_response_headers(upstream.headers());

    // Fully read, never streamed; the outbound call is complete before the
    // relay continues.
    let text = upstream.text().await?;

    match Payload::inspect(&text) {
        Payload::Json(value) => info!("backing service response:\n{:#}", value),
        Payload::Text(raw) => info!("backing service response: {}", raw),
        Payload::Absent => {}
    }

    // Headers and status are in place before the body write begins.
    let mut relayed = Response::new(full_body(Bytes::from(text)));
    *relayed.headers_mut() = headers;
    *relayed.status_mut() = status;

    Ok(relayed)
}

/// Log every inbound header and the body before the outbound call.
/// Observational only; never alters the relay outcome.
fn log_inbound(headers: &HeaderMap, payload: &Payload) {
    for (key, value) in headers.iter() {
        info!("{}: {}", key, value.to_str().unwrap_or("<non-ascii>"));
    }
    match payload {
        Payload::Json(value) => info!("request body:\n{:#}", value),
        Payload::Text(text) => info!("request body: {}", text),
        Payload::Absent => warn!("no JSON body sent"),
    }
}

/// Create full body
pub(crate) fn full_body(bytes: Bytes) -> BoxBody<Bytes, hyper::Error> {
    Full::new(bytes)
        .map_err(|never| match never {})
        .boxed()
}
