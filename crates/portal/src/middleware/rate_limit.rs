//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `webhook_rate_limiter`: payment and identity webhooks (~300/min)
//! - `write_rate_limiter`: signup and portal writes (~60/min)
//!
//! Limits are keyed by client IP. Only the header named by
//! `PORTAL_CLIENT_IP_HEADER` is trusted; clients can forge any other.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderName, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Key extractor that uses the client IP reported by the trusted proxy
/// header when configured, then the socket peer address.
#[derive(Debug, Clone, Default)]
pub struct ClientIpKeyExtractor {
    trusted_header: Option<HeaderName>,
}

impl ClientIpKeyExtractor {
    #[must_use]
    pub const fn new(trusted_header: Option<HeaderName>) -> Self {
        Self { trusted_header }
    }
}

fn header_ip<T>(req: &Request<T>, name: &HeaderName) -> Option<IpAddr> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        self.trusted_header
            .as_ref()
            .and_then(|name| header_ip(req, name))
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for webhooks: bursts of 100, refilling 5 per second.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers, which are always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn webhook_rate_limiter(key: ClientIpKeyExtractor) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(key)
        .per_millisecond(200)
        .burst_size(100)
        .finish()
        .expect("rate limiter config with per_millisecond(200) and burst_size(100) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Create rate limiter for signup and portal writes: ~60 requests per minute
/// per IP, burst of 20.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers, which are always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn write_rate_limiter(key: ClientIpKeyExtractor) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(key)
        .per_second(1)
        .burst_size(20)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(20) is valid");
    GovernorLayer::new(Arc::new(config))
}
