use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::AppError;
use crate::metrics::{REQUEST_TOTAL, REQUESTS_REJECTED};
use crate::state::AppState;

/// Runs before every handler: rejected clients never reach routing.
pub async fn admission_layer(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    REQUEST_TOTAL.inc();

    let key = client_key(&request, state.trust_forwarded_for);
    if !state.admission.allow(&key) {
        REQUESTS_REJECTED.inc();
        tracing::warn!(client = %key, "rate limit exceeded");
        return Err(AppError::RateLimited {
            retry_after: state.admission.retry_after(),
        });
    }

    Ok(next.run(request).await)
}

/// Network identity of the caller: the first `X-Forwarded-For` hop when the
/// proxy is trusted, otherwise the peer address.
pub fn client_key(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_from(peer: &str, forwarded: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/health");
        if let Some(forwarded) = forwarded {
            builder = builder.header("x-forwarded-for", forwarded);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        request
    }

    #[test]
    fn keys_by_peer_ip() {
        let request = request_from("10.0.0.7:51234", None);
        assert_eq!(client_key(&request, false), "10.0.0.7");
    }

    #[test]
    fn forwarded_for_needs_trust() {
        let request = request_from("10.0.0.7:51234", Some("203.0.113.9, 10.0.0.1"));
        assert_eq!(client_key(&request, false), "10.0.0.7");
        assert_eq!(client_key(&request, true), "203.0.113.9");
    }

    #[test]
    fn unknown_without_connection_info() {
        let request = axum::http::Request::builder()
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request, true), "unknown");
    }
}
