use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let base = state.config.server.api_base_path.trim_end_matches('/');

    Json(json!({
        "success": true,
        "data": {
            "name": "Travel Planner API",
            "version": version,
            "endpoints": {
                "health": format!("{base}/health (public)"),
                "me": format!("{base}/me (session cookie)"),
                "spots": format!("{base}/spots[/selected|/reorder|/reset|/:name/toggle] (session cookie)"),
                "websocket": format!("{} (session cookie)", state.config.server.ws_path),
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let now = chrono::Utc::now();

    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": now,
            "environment": state.config.environment,
        }
    }))
}
