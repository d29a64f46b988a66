//! Gallery API endpoints: the aggregated community feed plus curated
//! uploads and likes.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use super::{success, ApiResult};
use crate::auth::RequestUser;
use crate::errors::AppError;
use crate::feed::{self, FeedPage};
use crate::models::{CreateGalleryItemRequest, GalleryItem, PageQuery};
use crate::AppState;

const DEFAULT_FEED_LIMIT: i64 = 30;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub likes: usize,
}

/// GET /api/gallery - The aggregated community feed.
pub async fn get_feed(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> ApiResult<FeedPage> {
    let (page, limit) = params.resolve(DEFAULT_FEED_LIMIT);

    let feed = feed::get_feed(&state.repo, &state.config.district, page, limit).await?;
    success(feed)
}

/// POST /api/gallery - Upload a curated gallery item.
pub async fn create_gallery_item(
    State(state): State<AppState>,
    caller: RequestUser,
    Json(request): Json<CreateGalleryItemRequest>,
) -> ApiResult<GalleryItem> {
    if request.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if request.images.is_empty() {
        return Err(AppError::Validation("At least one image is required".to_string()));
    }

    let item = state
        .repo
        .create_gallery_item(caller.id(), &request)
        .await?;
    success(item)
}

/// POST /api/gallery/{id}/like - Toggle the caller's like on an item.
pub async fn like_gallery_item(
    State(state): State<AppState>,
    caller: RequestUser,
    Path(id): Path<String>,
) -> ApiResult<LikeResponse> {
    let likes = state.repo.toggle_gallery_like(&id, caller.id()).await?;
    success(LikeResponse { likes })
}
