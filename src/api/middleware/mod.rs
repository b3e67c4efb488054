//! HTTP middleware

pub mod rate_limit;
pub mod track;

pub use rate_limit::{rate_limit_middleware, RateLimitDecision, RateLimiter};
pub use track::{track_requests, is_excluded_from_tracking};

use axum::extract::connect_info::ConnectInfo;
use axum::extract::Request;
use std::net::SocketAddr;

/// Extract the client IP address from a request
///
/// Tries, in order:
/// 1. `X-Forwarded-For` header (first entry, for requests behind proxies)
/// 2. `X-Real-IP` header (alternative proxy header)
/// 3. The connection's remote address
///
/// Falls back to "unknown" so callers never fail on a missing address.
pub fn extract_client_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("X-Forwarded-For") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first) = forwarded_str.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }

    if let Some(real_ip) = request.headers().get("X-Real-IP") {
        if let Ok(ip_str) = real_ip.to_str() {
            if !ip_str.trim().is_empty() {
                return ip_str.trim().to_string();
            }
        }
    }

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_extract_client_ip_from_x_forwarded_for() {
        let request = Request::builder()
            .uri("/test")
            .header("X-Forwarded-For", "192.168.1.100, 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&request), "192.168.1.100");
    }

    #[test]
    fn test_extract_client_ip_from_x_real_ip() {
        let request = Request::builder()
            .uri("/test")
            .header("X-Real-IP", "192.168.1.200")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_client_ip(&request), "192.168.1.200");
    }

    #[test]
    fn test_extract_client_ip_from_connect_info() {
        let mut request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4321))));

        assert_eq!(extract_client_ip(&request), "127.0.0.1");
    }

    #[test]
    fn test_extract_client_ip_unknown() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert_eq!(extract_client_ip(&request), "unknown");
    }
}
