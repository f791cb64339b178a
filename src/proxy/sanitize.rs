//! Response header sanitization
//!
//! Strips the headers that would stop the proxied page from being embedded
//! or fetched cross-origin, then adds permissive CORS headers and the proxy
//! identifier. Strip first, then add.

use http::header::{HeaderMap, HeaderName, HeaderValue};

/// Security headers removed from every proxied response.
const STRIPPED_HEADERS: &[&str] = &[
    "content-security-policy",
    "content-security-policy-report-only",
    "x-frame-options",
    "frame-options",
    "cross-origin-embedder-policy",
    "cross-origin-opener-policy",
    "cross-origin-resource-policy",
];

/// Sanitize a response header map in place
pub fn sanitize_response_headers(headers: &mut HeaderMap, identifier: &str) {
    for name in STRIPPED_HEADERS {
        headers.remove(*name);
    }

    // Hop-by-hop headers describe the upstream connection, not the one we
    // serve the client on.
    let hop_by_hop: Vec<HeaderName> = headers
        .keys()
        .filter(|name| is_hop_by_hop_header(name.as_str()))
        .cloned()
        .collect();
    for name in hop_by_hop {
        headers.remove(name);
    }

    headers.insert(
        HeaderName::from_static("access-control-allow-origin"),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-headers"),
        HeaderValue::from_static("*"),
    );
    if let Ok(value) = HeaderValue::from_str(identifier) {
        headers.insert(HeaderName::from_static("x-proxied-by"), value);
    }
}

/// Check if a header is a hop-by-hop header that should not be forwarded
fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}
