//! Current-user API endpoints.

use super::{success, ApiResult};
use crate::auth::RequestUser;
use crate::models::User;

/// GET /api/users/me - The caller's own profile.
pub async fn get_me(caller: RequestUser) -> ApiResult<User> {
    success(caller.user)
}
