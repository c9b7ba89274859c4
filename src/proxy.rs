//! Proxy server
//! Accepts inbound connections and dispatches each request through the
//! relay; every failure becomes a JSON error envelope.

use crate::config::ProxyConfig;
use crate::fault::{self, RelayError};
use crate::relay::Relay;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

/// Forwarding proxy server
pub struct ProxyServer {
    config: Arc<ProxyConfig>,
    relay: Relay,
}

impl ProxyServer {
    /// Create a new proxy server
    pub fn new(config: ProxyConfig) -> Self {
        let config = Arc::new(config);
        let relay = Relay::new(config.clone());
        Self { config, relay }
    }

    /// Start the proxy server
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;

        info!("HTTP server listening on {}", addr);

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let server = self.clone();

            tokio::spawn(async move {
                if let Err(e) = server.handle_connection(stream).await {
                    debug!("HTTP connection error from {}: {}", remote_addr, e);
                }
            });
        }
    }

    /// Handle a single HTTP connection
    async fn handle_connection(self: Arc<Self>, stream: TcpStream) -> Result<()> {
        let io = TokioIo::new(stream);
        let server = self.clone();

        http1::Builder::new()
            .preserve_header_case(true)
            .title_case_headers(false)
            .serve_connection(
                io,
                service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req).await }
                }),
            )
            .await
            .map_err(|e| anyhow!("HTTP service error: {}", e))
    }

    /// Handle incoming request
    ///
    /// POST on any path goes through the relay; every other method falls
    /// through to the 404 envelope. Infallible: all per-request errors are
    /// converted to envelope responses here.
    async fn handle_request(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Infallible> {
        let method = req.method().clone();
        let uri = req.uri().clone();

        let result = if method == Method::POST {
            self.relay.forward(req).await
        } else {
            Err(RelayError::NotFound)
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => fault::error_response(&e, self.config.production),
        };

        // Access log: one line per request; the subscriber supplies the
        // timestamp.
        let size = response.body().size_hint().exact().unwrap_or(0);
        info!(
            "\"{} {}\" {} - {} bytes",
            method,
            uri,
            response.status().as_u16(),
            size
        );

        Ok(response)
    }
}
