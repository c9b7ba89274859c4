//! TapProxy - A transparent HTTP forwarding proxy
//!
//! Sits between a client and a single backing service for debugging and
//! inspection, providing:
//! - Forwarding of any-path POST requests using a fixed configured verb
//! - Header filtering in both directions (host/content-length outbound,
//!   content-encoding on the way back)
//! - Header and body inspection logging
//! - Uniform JSON error envelopes for unmatched routes and relay failures

pub mod config;
pub mod fault;
pub mod proxy;
pub mod relay;

pub use config::{ConfigError, ProxyConfig};
pub use fault::{ErrorEnvelope, RelayError};
pub use proxy::ProxyServer;
pub use relay::Payload;
