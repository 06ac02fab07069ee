pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod proxy;
pub mod services;
pub mod spots;
pub mod state;
pub mod ws;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::SecurityConfig;
use crate::state::AppState;

/// Build the full router: public routes, cookie-protected API, websocket, and
/// in production the proxy fallback.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();
    let base = config.server.api_base_path.trim_end_matches('/');

    let mut router = Router::new()
        // Public
        .route(&format!("{base}/health"), get(handlers::public::health))
        .route(&config.server.ws_path, get(handlers::ws::ws_handler))
        // Protected
        .merge(protected_routes(base).route_layer(from_fn_with_state(
            state.clone(),
            middleware::jwt_auth_middleware,
        )));

    router = match state.upstream {
        // The frontend owns every other path, including "/"
        Some(_) => router.fallback(proxy::forward),
        None => router.route("/", get(handlers::public::root)),
    };

    let router = router.with_state(state);

    middleware::security_headers(router, config.security.hsts_max_age_secs)
        .layer(from_fn(middleware::weak_etag))
        .layer(from_fn(middleware::strip_csp_from_proxied))
        .layer(cors_layer(&config.security))
        .layer(TraceLayer::new_for_http())
}

fn protected_routes(base: &str) -> Router<AppState> {
    use handlers::protected as p;

    Router::new()
        .route(&format!("{base}/me"), get(p::me_get))
        .route(&format!("{base}/spots"), get(p::spots_get).put(p::spots_put))
        .route(&format!("{base}/spots/selected"), get(p::spots_selected))
        .route(&format!("{base}/spots/reorder"), post(p::spots_reorder))
        .route(&format!("{base}/spots/reset"), post(p::spots_reset))
        .route(&format!("{base}/spots/:name/toggle"), post(p::spots_toggle))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    // Cookies need credentials, which rules out wildcard origins
    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE])
}
