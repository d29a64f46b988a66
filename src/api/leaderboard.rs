//! Leaderboard API endpoint.

use axum::extract::{Query, State};

use super::{success, ApiResult};
use crate::leaderboard::{self, LeaderboardPage};
use crate::models::PageQuery;
use crate::AppState;

const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;

/// GET /api/leaderboard - Top planters by active-tree count.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> ApiResult<LeaderboardPage> {
    let (page, limit) = params.resolve(DEFAULT_LEADERBOARD_LIMIT);

    let board = leaderboard::get_leaderboard(&state.repo, page, limit).await?;
    success(board)
}
