#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use travel_planner_api::{app, config::AppConfig, state::AppState};

pub const DEV_SECRET: &str = "integration-test-secret";
pub const AUDIENCE: &str = "test-client-id";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub ws_url: String,
    pub state: AppState,
}

/// Development config that verifies tokens with `DEV_SECRET`.
pub fn dev_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.auth.dev_secret = Some(DEV_SECRET.to_string());
    config.auth.cognito_user_pool_client_id = AUDIENCE.to_string();
    config
}

/// Serve `router` on a free local port in the background.
pub async fn serve(router: Router) -> Result<u16> {
    // Pick an unused port for isolation
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Ok(port)
}

/// Start the API with `config` in-process.
pub async fn spawn(config: AppConfig) -> Result<TestServer> {
    let ws_path = config.server.ws_path.clone();
    let state = AppState::new(config).context("invalid test config")?;
    let port = serve(app(state.clone())).await?;

    Ok(TestServer {
        port,
        base_url: format!("http://127.0.0.1:{port}"),
        ws_url: format!("ws://127.0.0.1:{port}{ws_path}"),
        state,
    })
}

pub async fn spawn_dev() -> Result<TestServer> {
    spawn(dev_config()).await
}

/// HS256 token for `sub`, accepted by servers started with `dev_config`.
pub fn dev_token(sub: &str) -> String {
    token_with(sub, AUDIENCE, &EncodingKey::from_secret(DEV_SECRET.as_bytes()), Header::default())
}

pub fn token_with(sub: &str, aud: &str, key: &EncodingKey, header: Header) -> String {
    let claims = json!({
        "sub": sub,
        "email": format!("{sub}@example.com"),
        "aud": aud,
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    encode(&header, &claims, key).expect("failed to sign test token")
}

/// Cookie header value carrying a session for `sub`.
pub fn session_cookie(sub: &str) -> String {
    format!("session={}", dev_token(sub))
}
