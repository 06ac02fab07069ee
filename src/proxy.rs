// Production fallback: anything the API does not route goes to the frontend server.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    response::Response,
};
use url::Url;

use crate::error::ApiError;
use crate::middleware::Proxied;
use crate::state::AppState;

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn upstream_url(upstream: &Url, path_and_query: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("{}{}", upstream.as_str().trim_end_matches('/'), path_and_query))
}

pub async fn forward(State(state): State<AppState>, request: Request) -> Result<Response, ApiError> {
    let Some(upstream) = state.upstream.as_ref() else {
        return Err(ApiError::not_found(format!("No route for {}", request.uri().path())));
    };

    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = upstream_url(upstream, path_and_query)
        .map_err(|e| ApiError::bad_request(format!("Invalid request path: {e}")))?;

    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, state.config.server.max_request_size_bytes)
        .await
        .map_err(|e| ApiError::bad_request(format!("Unreadable request body: {e}")))?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);

    tracing::debug!(method = %parts.method, %url, "proxying to upstream");
    let upstream_response = state
        .proxy_client
        .request(parts.method, url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!("upstream request failed: {}", e);
            ApiError::bad_gateway("Upstream unavailable")
        })?;

    let status = upstream_response.status();
    let mut headers = upstream_response.headers().clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::CONTENT_LENGTH);

    let mut response = Response::new(Body::from_stream(upstream_response.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response.extensions_mut().insert(Proxied);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_url_keeps_path_and_query() {
        let upstream = Url::parse("http://localhost:8081").unwrap();
        assert_eq!(
            upstream_url(&upstream, "/sightseeingMap?day=2").unwrap().as_str(),
            "http://localhost:8081/sightseeingMap?day=2"
        );

        let prefixed = Url::parse("http://frontend:3000/app/").unwrap();
        assert_eq!(
            upstream_url(&prefixed, "/").unwrap().as_str(),
            "http://frontend:3000/app/"
        );
    }

    #[test]
    fn strips_hop_by_hop_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, "keep-alive".parse().unwrap());
        headers.insert(header::HOST, "example.com".parse().unwrap());
        headers.insert(header::ACCEPT, "text/html".parse().unwrap());
        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::ACCEPT));
    }
}
