//! Notification inbox API endpoints.

use axum::extract::{Path, Query, State};
use serde::Serialize;

use super::{success, ApiResult};
use crate::auth::RequestUser;
use crate::models::{Notification, PageQuery, Pagination};
use crate::AppState;

const DEFAULT_NOTIFICATIONS_LIMIT: i64 = 20;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub pagination: Pagination,
}

/// GET /api/notifications - The caller's inbox, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    caller: RequestUser,
    Query(params): Query<PageQuery>,
) -> ApiResult<NotificationListResponse> {
    let (page, limit) = params.resolve(DEFAULT_NOTIFICATIONS_LIMIT);

    let (notifications, total) = state
        .repo
        .list_notifications(caller.id(), page, limit)
        .await?;

    success(NotificationListResponse {
        notifications,
        pagination: Pagination::new(total, page, limit),
    })
}

/// PUT /api/notifications/{id}/seen - Acknowledge a notification.
pub async fn mark_notification_seen(
    State(state): State<AppState>,
    caller: RequestUser,
    Path(id): Path<String>,
) -> ApiResult<Notification> {
    let notification = state.repo.mark_notification_seen(&id, caller.id()).await?;
    success(notification)
}
