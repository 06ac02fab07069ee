use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::auth::JwtUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user context extracted from the session cookie
#[derive(Clone, Debug, Serialize)]
pub struct AuthUser {
    pub sub: String,
    pub email: Option<String>,
    pub username: Option<String>,
}

impl From<JwtUser> for AuthUser {
    fn from(claims: JwtUser) -> Self {
        Self {
            sub: claims.sub,
            email: claims.email,
            username: claims.username,
        }
    }
}

/// Cookie JWT middleware: verifies the session token and injects `AuthUser`
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = state
        .verifier
        .verify_cookie(request.headers())
        .await
        .map_err(|e| {
            tracing::debug!("rejecting request to {}: {}", request.uri().path(), e);
            ApiError::from(e)
        })?;

    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}
