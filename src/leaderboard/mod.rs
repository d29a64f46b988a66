//! Planter leaderboard.
//!
//! Ranks non-admin planters by their count of active trees, descending,
//! with tied counts sharing a display rank.

use serde::Serialize;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Pagination, UserRef};

/// One leaderboard row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub rank: i64,
    pub count: i64,
    pub user: UserRef,
}

/// One page of the leaderboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    pub top_planters: Vec<RankedEntry>,
    pub pagination: Pagination,
}

/// Build one page of the leaderboard.
pub async fn get_leaderboard(
    repo: &Repository,
    page: i64,
    limit: i64,
) -> Result<LeaderboardPage, AppError> {
    let total_items = repo.count_distinct_active_planters().await?;
    let groups = repo.active_tree_counts((page - 1) * limit, limit).await?;

    // Pages are cut over the count groups first; the role filter below can
    // leave a page shorter than `limit` when admins held slots. Known
    // trade-off, kept as-is rather than re-querying.
    let mut entries: Vec<(UserRef, i64)> = Vec::new();
    for (planter_id, count) in groups {
        let Some(user) = repo.get_user(&planter_id).await? else {
            continue;
        };
        if user.role.can_moderate() {
            continue;
        }
        entries.push((UserRef::from(&user), count));
    }

    let top_planters = assign_ranks(entries, (page - 1) * limit);

    Ok(LeaderboardPage {
        top_planters,
        pagination: Pagination::new(total_items, page, limit),
    })
}

/// Assign display ranks to count-descending entries: tied counts share a
/// rank, the next distinct count continues at one past the entries
/// strictly ahead of it. `offset` is the number of slots on earlier pages.
fn assign_ranks(entries: Vec<(UserRef, i64)>, offset: i64) -> Vec<RankedEntry> {
    let mut ranked: Vec<RankedEntry> = Vec::with_capacity(entries.len());

    for (index, (user, count)) in entries.into_iter().enumerate() {
        let rank = match ranked.last() {
            Some(prev) if prev.count == count => prev.rank,
            _ => offset + index as i64 + 1,
        };
        ranked.push(RankedEntry { rank, count, user });
    }

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserRef {
        UserRef {
            id: id.to_string(),
            username: id.to_string(),
            full_name: id.to_string(),
            profile_image: None,
        }
    }

    #[test]
    fn test_assign_ranks_distinct_counts() {
        let ranked = assign_ranks(vec![(user("a"), 9), (user("b"), 7), (user("c"), 3)], 0);
        let ranks: Vec<i64> = ranked.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_assign_ranks_ties_share_rank_and_skip() {
        let ranked = assign_ranks(
            vec![(user("a"), 9), (user("b"), 9), (user("c"), 7), (user("d"), 7), (user("e"), 1)],
            0,
        );
        let ranks: Vec<i64> = ranked.iter().map(|e| e.rank).collect();
        // Two tied at the top, the next distinct count continues at 3.
        assert_eq!(ranks, vec![1, 1, 3, 3, 5]);
    }

    #[test]
    fn test_assign_ranks_offset_for_later_pages() {
        let ranked = assign_ranks(vec![(user("a"), 4), (user("b"), 2)], 10);
        let ranks: Vec<i64> = ranked.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![11, 12]);
    }

    #[test]
    fn test_assign_ranks_counts_monotonic() {
        let ranked = assign_ranks(
            vec![(user("a"), 5), (user("b"), 5), (user("c"), 2)],
            0,
        );
        for window in ranked.windows(2) {
            assert!(window[0].count >= window[1].count);
        }
    }
}
