//! Client-identity header capture.
//!
//! Records the forwarding chain a request claims to have passed through.
//! Values are logged verbatim for forensics; nothing here is parsed or trusted.

use std::collections::BTreeMap;

use axum::http::HeaderMap;

/// Candidate headers, scanned in this order.
pub const CLIENT_IP_HEADERS: [&str; 9] = [
    "x-forwarded-for",
    "x-real-ip",
    "x-client-ip",
    "x-forwarded",
    "x-cluster-client-ip",
    "forwarded-for",
    "forwarded",
    "via",
    "true-client-ip",
];

/// Collect every candidate header that is present with a non-empty value.
///
/// Only the first value of a repeated header is kept. Non-UTF-8 bytes are
/// replaced rather than dropping the header.
pub fn extract_client_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    CLIENT_IP_HEADERS
        .iter()
        .filter_map(|name| {
            let value = headers.get(*name)?;
            if value.is_empty() {
                return None;
            }
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            Some((name.to_string(), value))
        })
        .collect()
}

/// First address of the forwarding chain, for `trust_forwarded_for` mode.
///
/// Mirrors the usual client-IP resolution: leftmost `X-Forwarded-For` entry,
/// then `X-Real-IP`.
pub fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    let from_header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    from_header("x-forwarded-for").or_else(|| from_header("x-real-ip"))
}
