//! Badge template API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::auth::{require_moderator, require_superadmin, RequestUser};
use crate::errors::AppError;
use crate::models::{BadgeTemplate, CreateBadgeTemplateRequest, UpdateBadgeTemplateRequest};
use crate::AppState;

/// GET /api/badges - List all badge templates.
pub async fn list_badge_templates(
    State(state): State<AppState>,
    caller: RequestUser,
) -> ApiResult<Vec<BadgeTemplate>> {
    require_moderator(&caller)?;

    let templates = state.repo.list_badge_templates().await?;
    success(templates)
}

/// POST /api/badges - Create a badge template.
pub async fn create_badge_template(
    State(state): State<AppState>,
    caller: RequestUser,
    Json(request): Json<CreateBadgeTemplateRequest>,
) -> ApiResult<BadgeTemplate> {
    require_superadmin(&caller)?;

    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if let Some(count) = request.trigger_count {
        if count <= 0 {
            return Err(AppError::Validation(
                "Trigger count must be positive".to_string(),
            ));
        }
    }

    let template = state
        .repo
        .create_badge_template(caller.id(), &request)
        .await?;
    success(template)
}

/// PUT /api/badges/{id} - Update a badge template.
pub async fn update_badge_template(
    State(state): State<AppState>,
    caller: RequestUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateBadgeTemplateRequest>,
) -> ApiResult<BadgeTemplate> {
    require_superadmin(&caller)?;

    if let Some(count) = request.trigger_count {
        if count <= 0 {
            return Err(AppError::Validation(
                "Trigger count must be positive".to_string(),
            ));
        }
    }

    let template = state.repo.update_badge_template(&id, &request).await?;
    success(template)
}

/// DELETE /api/badges/{id} - Delete a badge template.
pub async fn delete_badge_template(
    State(state): State<AppState>,
    caller: RequestUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    require_superadmin(&caller)?;

    state.repo.delete_badge_template(&id).await?;
    success(())
}
