//! Cross-cutting request handling: the blocklist filter, request metrics and
//! the tracing span every request runs in.

use std::net::{IpAddr, SocketAddr};

use axum::body::Body;
use axum::extract::{ConnectInfo, MatchedPath, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::{info_span, warn, Span};
use uuid::Uuid;

use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// uuid v4 request ids for requests that arrive without one.
#[derive(Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

pub fn make_span(request: &axum::http::Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

/// The socket peer, or the first `X-Forwarded-For` hop when the peer is a
/// trusted proxy. Requests without a peer address resolve to `None`.
pub fn client_address(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trusted_proxies: &[IpAddr],
) -> Option<String> {
    let peer = peer?.ip();
    if !trusted_proxies.contains(&peer) {
        return Some(peer.to_string());
    }
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(str::to_string);
    Some(forwarded.unwrap_or_else(|| peer.to_string()))
}

/// Answers 403 for blocked addresses before any handler runs.
///
/// A failed lookup lets the request through; the store error is logged.
pub async fn block_filter(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let Some(address) = client_address(request.headers(), peer, &state.trusted_proxies) else {
        return next.run(request).await;
    };

    match state.blocklist.is_blocked(&address).await {
        Ok(true) => {
            warn!(%address, "request from blocked address refused");
            (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "success": false,
                    "error": "blocked",
                    "message": "access from this address has been blocked",
                })),
            )
                .into_response()
        }
        Ok(false) => next.run(request).await,
        Err(err) => {
            warn!(%address, error = %err, "blocklist lookup failed; letting request through");
            next.run(request).await
        }
    }
}

/// Counts every response by method, matched route and status.
pub async fn track_metrics(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or("unmatched", MatchedPath::as_str)
        .to_string();
    let response = next.run(request).await;
    state
        .metrics
        .observe(&method, &route, response.status().as_u16());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarded(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn forwarded_header_is_read_only_behind_a_trusted_proxy() {
        let proxy: SocketAddr = "10.0.0.2:5000".parse().unwrap();
        let trusted: [IpAddr; 1] = ["10.0.0.2".parse().unwrap()];
        let headers = forwarded("203.0.113.9, 10.0.0.1");

        assert_eq!(client_address(&headers, Some(proxy), &trusted).as_deref(), Some("203.0.113.9"));
        assert_eq!(
            client_address(&HeaderMap::new(), Some(proxy), &trusted).as_deref(),
            Some("10.0.0.2")
        );
    }

    #[test]
    fn untrusted_peer_cannot_spoof_its_address() {
        let peer: SocketAddr = "203.0.113.50:4000".parse().unwrap();
        let headers = forwarded("198.51.100.1");

        assert_eq!(client_address(&headers, Some(peer), &[]).as_deref(), Some("203.0.113.50"));
        assert_eq!(client_address(&headers, None, &[]), None);
    }
}
