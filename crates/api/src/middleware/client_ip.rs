//! Client IP extractor feeding the login throttle.
//!
//! Resolution order: first `X-Forwarded-For` entry, then `X-Real-Ip`,
//! then the peer socket address when the server was started with connect
//! info. The throttle keys on whatever string this produces, so a proxy
//! must be trusted to set the forwarding headers honestly.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

/// The requesting client's IP as a string key.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

/// Fallback key when no address information is available at all
/// (e.g. requests driven directly through the router in tests).
const UNKNOWN_IP: &str = "unknown";

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(resolve_ip(parts)))
    }
}

fn resolve_ip(parts: &Parts) -> String {
    if let Some(forwarded) = header_value(parts, "x-forwarded-for") {
        // The first entry is the originating client; later entries are proxies.
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = header_value(parts, "x-real-ip") {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    UNKNOWN_IP.to_string()
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}
