//! Shared-secret and CIDR-allowlist checks for the API surface: an
//! optional `x-volant-api-key` header or `api_key` query param compared
//! against a configured secret, plus an optional source-IP allowlist.

use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;

use crate::state::AppState;

/// Checks `X-Volant-API-Key` (or `?api_key=`) against the configured secret
/// when one is set, then the caller's address against the CIDR allowlist
/// when one is configured. Either check is skipped entirely if its
/// configuration is absent — this is a single-operator shared-secret guard,
/// not a full authentication system.
pub async fn guard(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(expected) = &state.config.api_key {
        if !key_matches(&request, expected) {
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    if !state.config.allowed_cidrs.is_empty() && !state.config.allowed_cidrs.iter().any(|net| net.contains(&addr.ip())) {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}

fn key_matches(request: &Request<axum::body::Body>, expected: &str) -> bool {
    if let Some(header) = request.headers().get("x-volant-api-key").and_then(|v| v.to_str().ok()) {
        if header == expected {
            return true;
        }
    }

    request
        .uri()
        .query()
        .map(|q| {
            q.split('&')
                .filter_map(|pair| pair.split_once('='))
                .any(|(k, v)| k == "api_key" && v == expected)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_query(query: &str) -> Request<Body> {
        Request::builder()
            .uri(format!("/api/v1/vms?{query}"))
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn header_match_succeeds() {
        let req = Request::builder()
            .uri("/api/v1/vms")
            .header("x-volant-api-key", "secret")
            .body(Body::empty())
            .unwrap();
        assert!(key_matches(&req, "secret"));
    }

    #[test]
    fn query_match_succeeds() {
        let req = request_with_query("api_key=secret");
        assert!(key_matches(&req, "secret"));
    }

    #[test]
    fn mismatch_fails() {
        let req = request_with_query("api_key=wrong");
        assert!(!key_matches(&req, "secret"));
    }
}
