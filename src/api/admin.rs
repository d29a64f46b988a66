//! Admin API endpoints: user administration, dashboard summary, and
//! direct messaging (delivered through the notification inbox).

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::auth::{require_moderator, require_superadmin, RequestUser};
use crate::errors::AppError;
use crate::models::{
    CreateUserRequest, EventStatus, PageQuery, Pagination, Role, SendMessageRequest,
    TreeWithPlanter, User,
};
use crate::AppState;

const DEFAULT_USERS_LIMIT: i64 = 50;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyUserRequest {
    pub is_verified: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_trees: i64,
    pub active_trees: i64,
    pub total_users: i64,
    pub total_events: i64,
    pub upcoming_events: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSummary {
    pub stats: SummaryStats,
    pub recent_users: Vec<User>,
    pub recent_trees: Vec<TreeWithPlanter>,
}

/// GET /api/admin/users - List users.
pub async fn list_users(
    State(state): State<AppState>,
    caller: RequestUser,
    Query(params): Query<PageQuery>,
) -> ApiResult<UserListResponse> {
    require_moderator(&caller)?;

    let (page, limit) = params.resolve(DEFAULT_USERS_LIMIT);
    let (users, total) = state.repo.list_users(page, limit).await?;

    success(UserListResponse {
        users,
        pagination: Pagination::new(total, page, limit),
    })
}

/// POST /api/admin/users - Provision a user profile.
pub async fn create_user(
    State(state): State<AppState>,
    caller: RequestUser,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<User> {
    require_moderator(&caller)?;

    if request.username.trim().is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    if request.full_name.trim().is_empty() {
        return Err(AppError::Validation("Full name is required".to_string()));
    }
    // Only a superadmin may provision privileged roles
    if request.role.is_some_and(|r| r.can_moderate()) {
        require_superadmin(&caller)?;
    }

    let user = state.repo.create_user(&request).await?;
    success(user)
}

/// PUT /api/admin/users/{id}/role - Change a user's role.
pub async fn update_user_role(
    State(state): State<AppState>,
    caller: RequestUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateRoleRequest>,
) -> ApiResult<User> {
    require_superadmin(&caller)?;

    let user = state.repo.set_user_role(&id, request.role).await?;
    success(user)
}

/// PUT /api/admin/users/{id}/verify - Mark a user as verified.
pub async fn verify_user(
    State(state): State<AppState>,
    caller: RequestUser,
    Path(id): Path<String>,
    Json(request): Json<VerifyUserRequest>,
) -> ApiResult<User> {
    require_moderator(&caller)?;

    let user = state.repo.set_user_verified(&id, request.is_verified).await?;
    success(user)
}

/// DELETE /api/admin/users/{id} - Delete a user.
pub async fn delete_user(
    State(state): State<AppState>,
    caller: RequestUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    require_superadmin(&caller)?;

    state.repo.delete_user(&id).await?;
    success(())
}

/// GET /api/admin/summary - Dashboard summary for the admin panel.
pub async fn get_admin_summary(
    State(state): State<AppState>,
    caller: RequestUser,
) -> ApiResult<AdminSummary> {
    require_moderator(&caller)?;

    let active_trees = state.repo.count_active_trees().await?;
    let total_trees = state.repo.count_trees().await?;
    let total_users = state.repo.count_users().await?;
    let total_events = state.repo.count_events().await?;
    let upcoming_events = state
        .repo
        .count_events_by_status(EventStatus::Upcoming)
        .await?;
    let (recent_users, _) = state.repo.list_users(1, 5).await?;
    let recent_trees = state.repo.recent_trees(5).await?;

    success(AdminSummary {
        stats: SummaryStats {
            total_trees,
            active_trees,
            total_users,
            total_events,
            upcoming_events,
        },
        recent_users,
        recent_trees,
    })
}

/// POST /api/admin/message/{userId} - Send a direct message to a user's
/// notification inbox.
pub async fn message_user(
    State(state): State<AppState>,
    caller: RequestUser,
    Path(user_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<()> {
    require_moderator(&caller)?;

    if request.message.trim().is_empty() {
        return Err(AppError::Validation("Message is required".to_string()));
    }

    state
        .repo
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    let subject = request.subject.as_deref().unwrap_or("Message from the district team");
    state
        .repo
        .create_notification(&user_id, None, subject, &request.message)
        .await?;

    success(())
}

/// POST /api/admin/trees/{id}/remind - Nudge a planter to update a tree.
pub async fn remind_tree_update(
    State(state): State<AppState>,
    caller: RequestUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    require_moderator(&caller)?;

    let tree = state
        .repo
        .get_tree(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tree {} not found", id)))?;

    let subject = format!("Update Reminder: {}", tree.common_name);
    let body = format!(
        "Hello! Please take a moment to update your {}. Uploading regular updates \
         helps us track the reforestation progress.",
        tree.common_name
    );

    state
        .repo
        .create_notification(&tree.planter_id, Some(&tree.id), &subject, &body)
        .await?;

    success(())
}
