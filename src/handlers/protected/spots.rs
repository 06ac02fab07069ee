// handlers/protected/spots.rs - the user's spot collection
//
// Reads return the collection together with its ordered selection. Every
// mutation goes through ItineraryService, which also pushes the new state to
// the user's open websockets.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::spots::{self, projection, Spot, SpotsView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReplaceRequest {
    pub spots: Vec<Spot>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// Spot being dragged.
    pub moved: String,
    /// Spot it was dropped on; absent when dropped outside the list.
    #[serde(default)]
    pub target: Option<String>,
}

/// GET {base}/spots
pub async fn spots_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<SpotsView> {
    let spots = state.itineraries.get(&user.sub).await;
    Ok(ApiResponse::success(SpotsView::of(spots)))
}

/// PUT {base}/spots - replace the whole collection
pub async fn spots_put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ReplaceRequest>,
) -> ApiResult<SpotsView> {
    let view = state.itineraries.replace(&user.sub, body.spots).await?;
    Ok(ApiResponse::success(view))
}

/// GET {base}/spots/selected - ordered selection only
pub async fn spots_selected(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<Spot>> {
    let spots = state.itineraries.get(&user.sub).await;
    let selected = projection(&spots).into_iter().cloned().collect();
    Ok(ApiResponse::success(selected))
}

/// POST {base}/spots/:name/toggle
pub async fn spots_toggle(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
) -> ApiResult<SpotsView> {
    let view = state
        .itineraries
        .update(&user.sub, |current| spots::toggle(current, &name))
        .await;
    Ok(ApiResponse::success(view))
}

/// POST {base}/spots/reorder
pub async fn spots_reorder(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ReorderRequest>,
) -> ApiResult<SpotsView> {
    let view = match body.target {
        Some(target) => {
            state
                .itineraries
                .update(&user.sub, |current| spots::reorder(current, &body.moved, &target))
                .await
        }
        // dropped outside the list: nothing to apply or push
        None => SpotsView::of(state.itineraries.get(&user.sub).await),
    };
    Ok(ApiResponse::success(view))
}

/// POST {base}/spots/reset
pub async fn spots_reset(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<SpotsView> {
    let view = state.itineraries.update(&user.sub, spots::reset).await;
    Ok(ApiResponse::success(view))
}
