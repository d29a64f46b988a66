//! Gateway trust and caller identity.
//!
//! Sessions and credentials live with the upstream auth gateway. The
//! backend trusts two headers: an optional shared gateway secret (checked
//! in constant time) and `x-user-id`, the already-authenticated caller.

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

use crate::errors::{codes, AppError, ErrorDetails, ErrorResponse};
use crate::models::{Role, User};
use crate::AppState;

/// Header carrying the gateway shared secret.
pub const GATEWAY_KEY_HEADER: &str = "x-gateway-key";

/// Header carrying the authenticated caller id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Gateway shared-secret layer. When no secret is configured, all
/// requests pass (dev mode).
pub async fn gateway_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    // Get the gateway key from the request header
    let provided = request
        .headers()
        .get(GATEWAY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    match provided {
        Some(provided_key) => {
            // Constant-time comparison to prevent timing attacks
            if constant_time_compare(&provided_key, &expected) {
                next.run(request).await
            } else {
                unauthorized_response(codes::INVALID_GATEWAY_KEY, "Invalid gateway key")
            }
        }
        None => {
            // Also check Authorization header as bearer token
            let bearer = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
                .map(|s| s.to_string());

            match bearer {
                Some(bearer_key) if constant_time_compare(&bearer_key, &expected) => {
                    next.run(request).await
                }
                _ => unauthorized_response(codes::UNAUTHORIZED, "Missing or invalid gateway key"),
            }
        }
    }
}

/// The authenticated caller, resolved from the gateway-supplied user id.
#[derive(Debug, Clone)]
pub struct RequestUser {
    pub user: User,
}

impl RequestUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}

impl FromRequestParts<AppState> for RequestUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

        let user = state
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

        Ok(RequestUser { user })
    }
}

/// Require the moderation surface (admin or superadmin).
pub fn require_moderator(caller: &RequestUser) -> Result<(), AppError> {
    if caller.role().can_moderate() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin access required".to_string()))
    }
}

/// Require the administration surface (superadmin).
pub fn require_superadmin(caller: &RequestUser) -> Result<(), AppError> {
    if caller.role().can_administer() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Superadmin access required".to_string()))
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    // Constant-time comparison
    a_bytes.ct_eq(b_bytes).into()
}

/// Create an unauthorized response.
fn unauthorized_response(code: &str, message: &str) -> Response {
    let body = ErrorResponse {
        success: false,
        error: ErrorDetails {
            code: code.to_string(),
            message: message.to_string(),
        },
    };

    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    #[test]
    fn test_constant_time_compare_empty() {
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("", "not-empty"));
    }
}
