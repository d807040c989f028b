use std::net::SocketAddr;

use axum::{extract::ConnectInfo, http::HeaderMap};

/// Resolves the caller address: `X-Real-IP`, then the first non-empty
/// `X-Forwarded-For` entry, then the socket peer.
pub fn client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("x-real-ip")
        .or_else(|| {
            header("x-forwarded-for")?
                .split(',')
                .map(str::trim)
                .find(|ip| !ip.is_empty())
        })
        .map(str::to_string)
        .or_else(|| connect_info.map(|ci| ci.0.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
