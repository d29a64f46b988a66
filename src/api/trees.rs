//! Tree API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::auth::{require_moderator, RequestUser};
use crate::errors::AppError;
use crate::models::{
    CreateTreeRequest, CreateTreeUpdateRequest, Pagination, Tree, TreeStatus, TreeUpdate,
    TreeWithPlanter, UpdateTreeRequest,
};
use crate::AppState;

const DEFAULT_TREES_LIMIT: i64 = 50;

/// Query parameters for tree listings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeListQuery {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub planted_by: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeListResponse {
    pub trees: Vec<TreeWithPlanter>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDetailResponse {
    pub tree: Tree,
    pub updates: Vec<TreeUpdate>,
}

/// GET /api/trees - List trees, optionally filtered by status and planter.
pub async fn list_trees(
    State(state): State<AppState>,
    Query(params): Query<TreeListQuery>,
) -> ApiResult<TreeListResponse> {
    let query = crate::models::PageQuery {
        page: params.page,
        limit: params.limit,
    };
    let (page, limit) = query.resolve(DEFAULT_TREES_LIMIT);
    let status = params.status.as_deref().and_then(TreeStatus::from_str);

    let (trees, total) = state
        .repo
        .list_trees(status, params.planted_by.as_deref(), page, limit)
        .await?;

    success(TreeListResponse {
        trees,
        pagination: Pagination::new(total, page, limit),
    })
}

/// GET /api/trees/{id} - Get a tree with its growth updates.
pub async fn get_tree(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<TreeDetailResponse> {
    let tree = state
        .repo
        .get_tree(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tree {} not found", id)))?;

    let updates = state.repo.list_tree_updates_desc(&id).await?;

    success(TreeDetailResponse { tree, updates })
}

/// POST /api/trees - Register a new tree.
///
/// Badge evaluation runs to completion before the response goes out; its
/// failures are logged and never fail the registration itself.
pub async fn create_tree(
    State(state): State<AppState>,
    caller: RequestUser,
    Json(request): Json<CreateTreeRequest>,
) -> ApiResult<Tree> {
    if request.species.trim().is_empty() {
        return Err(AppError::Validation("Species is required".to_string()));
    }
    if request.common_name.trim().is_empty() {
        return Err(AppError::Validation("Common name is required".to_string()));
    }
    if request.location.address.trim().is_empty() {
        return Err(AppError::Validation("Location address is required".to_string()));
    }

    let tree = state.repo.create_tree(caller.id(), &request).await?;

    if let Err(e) = state.engine.on_tree_created(&tree.id, caller.id()).await {
        tracing::error!(tree_id = %tree.id, "badge evaluation failed: {}", e);
    }

    success(tree)
}

/// PUT /api/trees/{id} - Update a tree (owner or moderator).
pub async fn update_tree(
    State(state): State<AppState>,
    caller: RequestUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateTreeRequest>,
) -> ApiResult<Tree> {
    let existing = state
        .repo
        .get_tree(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tree {} not found", id)))?;

    if existing.planter_id != caller.id() {
        require_moderator(&caller)?;
    }

    let tree = state.repo.update_tree(&id, &request).await?;
    success(tree)
}

/// POST /api/trees/{id}/updates - Append a growth update (owner or
/// moderator). The tree's current height/health follow the update.
pub async fn create_tree_update(
    State(state): State<AppState>,
    caller: RequestUser,
    Path(id): Path<String>,
    Json(request): Json<CreateTreeUpdateRequest>,
) -> ApiResult<TreeUpdate> {
    let tree = state
        .repo
        .get_tree(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tree {} not found", id)))?;

    if tree.planter_id != caller.id() {
        require_moderator(&caller)?;
    }

    let update = state
        .repo
        .create_tree_update(&id, caller.id(), &request)
        .await?;

    state
        .repo
        .update_tree(
            &id,
            &UpdateTreeRequest {
                species: None,
                common_name: None,
                location: None,
                current_height: request.height,
                current_health: Some(request.health),
                images: None,
                notes: None,
                status: None,
            },
        )
        .await?;

    success(update)
}

/// DELETE /api/trees/{id} - Hard-delete a tree (moderator only; planters
/// retire trees through a status update instead).
pub async fn delete_tree(
    State(state): State<AppState>,
    caller: RequestUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    require_moderator(&caller)?;
    state.repo.delete_tree(&id).await?;
    success(())
}
