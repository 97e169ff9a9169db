//! Client IP extraction utilities.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::ConnectInfo,
    http::{Extensions, HeaderMap},
};

/// Header consulted when running behind a trusted reverse proxy.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Extract the client IP address.
///
/// With `trust_forwarded_for`, the left-most `X-Forwarded-For` entry is used and a
/// missing or invalid header is an error (no fallback to the socket address).
/// Otherwise the peer address from `ConnectInfo` is used.
pub fn extract_client_ip(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_forwarded_for: bool,
) -> Result<IpAddr, &'static str> {
    if trust_forwarded_for {
        let value = headers
            .get(FORWARDED_FOR_HEADER)
            .ok_or("IP header not present")?
            .to_str()
            .map_err(|_| "IP header contains invalid characters")?;
        let first = value.split(',').next().unwrap_or_default().trim();
        return first.parse().map_err(|_| "IP header is not an IP address");
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
        .ok_or("No client IP available")
}
