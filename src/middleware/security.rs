use axum::{
    body::Body,
    extract::Request,
    http::{
        header::{
            CONTENT_LENGTH, CONTENT_SECURITY_POLICY, ETAG, IF_NONE_MATCH, REFERRER_POLICY,
            STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS, X_DNS_PREFETCH_CONTROL,
            X_FRAME_OPTIONS,
        },
        HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use sha2::{Digest, Sha256};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::error::ApiError;

const DEFAULT_CSP: &str = "default-src 'self';base-uri 'self';font-src 'self' https: data:;\
form-action 'self';frame-ancestors 'self';img-src 'self' data:;object-src 'none';\
script-src 'self';script-src-attr 'none';style-src 'self' https: 'unsafe-inline';\
upgrade-insecure-requests";

/// Marks a response that came from the upstream frontend.
#[derive(Clone, Copy, Debug)]
pub struct Proxied;

/// Baseline hardening headers on every response, unless the handler set its own.
pub fn security_headers<S>(mut router: Router<S>, hsts_max_age_secs: u64) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let mut headers = vec![
        (CONTENT_SECURITY_POLICY, HeaderValue::from_static(DEFAULT_CSP)),
        (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        (REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
        (
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ),
    ];
    if hsts_max_age_secs > 0 {
        if let Ok(value) = HeaderValue::from_str(&format!("max-age={hsts_max_age_secs}; includeSubDomains")) {
            headers.push((STRICT_TRANSPORT_SECURITY, value));
        }
    }

    for (name, value) in headers {
        router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }
    router
}

/// The frontend ships its own policy; ours must not shadow it.
pub async fn strip_csp_from_proxied(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    if response.extensions().get::<Proxied>().is_some() {
        response.headers_mut().remove(CONTENT_SECURITY_POLICY);
    }
    response
}

/// Weak ETag on successful GET responses of our own routes; answers a
/// matching `If-None-Match` with 304.
///
/// HEAD bodies are already empty by the time we see them, and proxied
/// responses stream through untouched, so neither gets a tag.
pub async fn weak_etag(request: Request, next: Next) -> Response {
    let cacheable = request.method() == Method::GET;
    let if_none_match = request.headers().get(IF_NONE_MATCH).cloned();

    let response = next.run(request).await;
    if !cacheable
        || response.status() != StatusCode::OK
        || response.headers().contains_key(ETAG)
        || response.extensions().get::<Proxied>().is_some()
    {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("failed to buffer response for etag: {}", e);
            return ApiError::internal_server_error("Failed to read response body").into_response();
        }
    };

    let tag = weak_tag(&bytes);
    if let Ok(value) = HeaderValue::from_str(&tag) {
        parts.headers.insert(ETAG, value);
    }

    let fresh = if_none_match
        .as_ref()
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| etag_matches(value, &tag));
    if fresh {
        parts.status = StatusCode::NOT_MODIFIED;
        parts.headers.remove(CONTENT_LENGTH);
        return Response::from_parts(parts, Body::empty());
    }

    Response::from_parts(parts, Body::from(bytes))
}

fn weak_tag(body: &[u8]) -> String {
    format!("W/\"{:x}\"", Sha256::digest(body))
}

// Weak comparison: the W/ prefix is ignored on both sides.
fn etag_matches(if_none_match: &str, tag: &str) -> bool {
    let opaque = |t: &str| t.trim().trim_start_matches("W/").to_string();
    if_none_match.trim() == "*" || if_none_match.split(',').any(|candidate| opaque(candidate) == opaque(tag))
}
