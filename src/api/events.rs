//! Event API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::auth::RequestUser;
use crate::errors::AppError;
use crate::models::{
    CreateEventRequest, Event, EventStatus, EventWithOrganizer, PageQuery, Pagination,
};
use crate::AppState;

const DEFAULT_EVENTS_LIMIT: i64 = 20;

/// Query parameters for event listings.
#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    pub events: Vec<EventWithOrganizer>,
    pub pagination: Pagination,
}

/// GET /api/events - List events, optionally filtered by status.
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<EventListQuery>,
) -> ApiResult<EventListResponse> {
    let query = PageQuery {
        page: params.page,
        limit: params.limit,
    };
    let (page, limit) = query.resolve(DEFAULT_EVENTS_LIMIT);
    let status = params.status.as_deref().and_then(EventStatus::from_str);

    let (events, total) = state.repo.list_events(status, page, limit).await?;

    success(EventListResponse {
        events,
        pagination: Pagination::new(total, page, limit),
    })
}

/// GET /api/events/{id} - Get a single event with its organizer resolved.
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<EventWithOrganizer> {
    let event = state
        .repo
        .get_event(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", id)))?;

    let organizer = state
        .repo
        .get_user(&event.organizer_id)
        .await?
        .as_ref()
        .map(Into::into);

    success(EventWithOrganizer { event, organizer })
}

/// POST /api/events - Create an event.
pub async fn create_event(
    State(state): State<AppState>,
    caller: RequestUser,
    Json(request): Json<CreateEventRequest>,
) -> ApiResult<Event> {
    if request.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if request.description.trim().is_empty() {
        return Err(AppError::Validation("Description is required".to_string()));
    }

    let event = state.repo.create_event(caller.id(), &request).await?;
    success(event)
}

/// POST /api/events/{id}/join - Join an event.
pub async fn join_event(
    State(state): State<AppState>,
    caller: RequestUser,
    Path(id): Path<String>,
) -> ApiResult<Event> {
    let event = state.repo.join_event(&id, caller.id()).await?;
    success(event)
}
