use axum::Extension;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET {base}/me - the user behind the session cookie
pub async fn me_get(Extension(user): Extension<AuthUser>) -> ApiResult<AuthUser> {
    Ok(ApiResponse::success(user))
}
