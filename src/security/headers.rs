//! Header manipulation between client and upstream.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Strip every client-supplied credential before injecting the platform's own
//! - Point `Host` at the platform
//!
//! # Design Decisions
//! - `Content-Length` is never copied; the outbound body determines its own framing
//! - Response `Transfer-Encoding` is dropped; the server re-frames the relayed body

use axum::http::header::{self, HeaderMap, HeaderName};

use crate::load_balancer::platform::Platform;

/// Headers meaningful only for a single connection.
pub const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Conventional credential headers, always removed from the inbound copy.
pub const CREDENTIAL_HEADERS: [HeaderName; 4] = [
    header::AUTHORIZATION,
    HeaderName::from_static("x-api-key"),
    HeaderName::from_static("api-key"),
    HeaderName::from_static("x-google-api-key"),
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name)
}

/// Headers to send to `platform` for an inbound request carrying `inbound`.
pub fn forward_request_headers(inbound: &HeaderMap, platform: &Platform) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.len() + 1);

    for (name, value) in inbound {
        if is_hop_by_hop(name)
            || name == header::HOST
            || name == header::CONTENT_LENGTH
            || CREDENTIAL_HEADERS.contains(name)
            || name == platform.key_header()
        {
            continue;
        }
        outbound.append(name.clone(), value.clone());
    }

    outbound.insert(header::HOST, platform.host().clone());
    if let Some(credential) = platform.credential() {
        outbound.insert(platform.key_header().clone(), credential.clone());
    }
    outbound
}

/// Upstream response headers relayed to the client.
pub fn relay_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut relayed = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if !is_hop_by_hop(name) {
            relayed.append(name.clone(), value.clone());
        }
    }
    relayed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatformConfig;
    use axum::http::HeaderValue;

    fn platform(mutate: impl FnOnce(&mut PlatformConfig)) -> Platform {
        let mut config = PlatformConfig::new("p", "https://api.example.com:8443/v1");
        config.api_key = "sk-upstream".into();
        config.key_header = Some("Authorization".into());
        config.key_prefix = Some("Bearer ".into());
        mutate(&mut config);
        Platform::new(0, config).unwrap()
    }

    fn inbound() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer client-secret"));
        headers.insert("x-api-key", HeaderValue::from_static("client-key"));
        headers.insert("api-key", HeaderValue::from_static("client-key"));
        headers.insert("x-google-api-key", HeaderValue::from_static("client-key"));
        headers.insert(header::HOST, HeaderValue::from_static("proxy.local"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.append("x-custom", HeaderValue::from_static("one"));
        headers.append("x-custom", HeaderValue::from_static("two"));
        headers
    }

    #[test]
    fn test_injects_platform_credential() {
        let outbound = forward_request_headers(&inbound(), &platform(|_| {}));

        assert_eq!(outbound.get(header::AUTHORIZATION).unwrap(), "Bearer sk-upstream");
        assert_eq!(outbound.get(header::HOST).unwrap(), "api.example.com:8443");
        assert!(outbound.get("x-api-key").is_none());
        assert!(outbound.get("api-key").is_none());
        assert!(outbound.get("x-google-api-key").is_none());
    }

    #[test]
    fn test_strips_hop_by_hop_and_length() {
        let outbound = forward_request_headers(&inbound(), &platform(|_| {}));

        for name in HOP_BY_HOP.iter() {
            assert!(outbound.get(name).is_none(), "{} leaked", name);
        }
        assert!(outbound.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(outbound.get(header::CONTENT_TYPE).unwrap(), "application/json");
        let custom: Vec<_> = outbound.get_all("x-custom").iter().collect();
        assert_eq!(custom, vec!["one", "two"]);
    }

    #[test]
    fn test_custom_key_header_replaces_client_value() {
        let platform = platform(|c| {
            c.key_header = Some("x-goog-api-key".into());
            c.key_prefix = Some(String::new());
        });
        let mut headers = inbound();
        headers.insert("x-goog-api-key", HeaderValue::from_static("client-value"));

        let outbound = forward_request_headers(&headers, &platform);
        assert_eq!(outbound.get("x-goog-api-key").unwrap(), "sk-upstream");
        assert!(outbound.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_no_credential_configured() {
        let platform = platform(|c| c.api_key = String::new());
        let outbound = forward_request_headers(&inbound(), &platform);
        assert!(outbound.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_relay_drops_transfer_encoding() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        upstream.insert(header::CONNECTION, HeaderValue::from_static("close"));
        upstream.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
        upstream.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        upstream.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let relayed = relay_response_headers(&upstream);
        assert!(relayed.get(header::TRANSFER_ENCODING).is_none());
        assert!(relayed.get(header::CONNECTION).is_none());
        assert_eq!(relayed.get(header::CONTENT_TYPE).unwrap(), "text/event-stream");
        assert_eq!(relayed.get_all(header::SET_COOKIE).iter().count(), 2);
    }
}
