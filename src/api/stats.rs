//! Statistics API endpoints.

use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{success, ApiResult};
use crate::models::{Achievement, EventStatus, Tree, TreeWithPlanter};
use crate::AppState;

/// Approximate sequestration rates, kg of CO2 per day. Young trees bind
/// roughly 5 kg/year, mature ones roughly 22 kg/year.
const YOUNG_RATE_KG_PER_DAY: f64 = 0.0137;
const MATURE_RATE_KG_PER_DAY: f64 = 0.0602;
const YOUNG_PERIOD_DAYS: f64 = 2.0 * 365.25;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_trees: i64,
    pub total_users: i64,
    pub total_events: i64,
    pub upcoming_events: i64,
    pub recent_trees: Vec<TreeWithPlanter>,
    pub co2_offset: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub trees_planted: i64,
    pub events_attended: i64,
    pub updates_submitted: i64,
    pub achievements: Vec<Achievement>,
    pub co2_offset: String,
}

/// GET /api/stats - Public dashboard statistics.
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let total_trees = state.repo.count_active_trees().await?;
    let total_users = state.repo.count_users().await?;
    let total_events = state.repo.count_events().await?;
    let upcoming_events = state
        .repo
        .count_events_by_status(EventStatus::Upcoming)
        .await?;
    let recent_trees = state.repo.recent_trees(5).await?;

    success(DashboardStats {
        total_trees,
        total_users,
        total_events,
        upcoming_events,
        recent_trees,
        // Flat mature-rate approximation for the headline number
        co2_offset: format!("{:.1} kg/year", total_trees as f64 * 22.0),
    })
}

/// GET /api/stats/user/{id} - Per-user contribution statistics.
pub async fn get_user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<UserStats> {
    let trees = state.repo.list_active_trees_by_planter(&user_id).await?;
    let events_attended = state.repo.count_events_attended(&user_id).await?;
    let updates_submitted = state.repo.count_updates_by_user(&user_id).await?;
    let achievements = state.repo.list_achievements(&user_id).await?;

    let co2 = estimate_co2_offset(&trees, Utc::now());

    success(UserStats {
        trees_planted: trees.len() as i64,
        events_attended,
        updates_submitted,
        achievements,
        co2_offset: format!("{:.2}", co2),
    })
}

/// Age-banded CO2 estimate over a set of trees: the young rate for the
/// first two years, the mature rate after. Trees with unparsable planting
/// dates contribute nothing.
fn estimate_co2_offset(trees: &[Tree], now: DateTime<Utc>) -> f64 {
    trees
        .iter()
        .filter_map(|tree| DateTime::parse_from_rfc3339(&tree.planted_date).ok())
        .map(|planted| {
            let age_days = (now - planted.with_timezone(&Utc)).num_days().max(0) as f64;
            if age_days <= YOUNG_PERIOD_DAYS {
                age_days * YOUNG_RATE_KG_PER_DAY
            } else {
                YOUNG_PERIOD_DAYS * YOUNG_RATE_KG_PER_DAY
                    + (age_days - YOUNG_PERIOD_DAYS) * MATURE_RATE_KG_PER_DAY
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TreeHealth, TreeLocation, TreeStatus};
    use chrono::Duration;

    fn tree(planted: DateTime<Utc>) -> Tree {
        Tree {
            id: "t".to_string(),
            tag: "TREE-1".to_string(),
            planter_id: "u".to_string(),
            species: "Mangifera indica".to_string(),
            common_name: "Mango".to_string(),
            location: TreeLocation {
                address: "Main St".to_string(),
                district: "North".to_string(),
                latitude: None,
                longitude: None,
            },
            planted_date: planted.to_rfc3339(),
            current_height: None,
            current_health: TreeHealth::Good,
            images: Vec::new(),
            notes: None,
            status: TreeStatus::Active,
            created_at: planted.to_rfc3339(),
            updated_at: planted.to_rfc3339(),
        }
    }

    #[test]
    fn test_young_tree_uses_young_rate() {
        let now = Utc::now();
        let trees = vec![tree(now - Duration::days(100))];
        let co2 = estimate_co2_offset(&trees, now);
        assert!((co2 - 100.0 * YOUNG_RATE_KG_PER_DAY).abs() < 0.01);
    }

    #[test]
    fn test_mature_tree_uses_banded_rates() {
        let now = Utc::now();
        let trees = vec![tree(now - Duration::days(1000))];
        let co2 = estimate_co2_offset(&trees, now);
        let expected =
            YOUNG_PERIOD_DAYS * YOUNG_RATE_KG_PER_DAY
                + (1000.0 - YOUNG_PERIOD_DAYS) * MATURE_RATE_KG_PER_DAY;
        assert!((co2 - expected).abs() < 0.01);
    }

    #[test]
    fn test_unparsable_date_contributes_nothing() {
        let now = Utc::now();
        let mut bad = tree(now);
        bad.planted_date = "yesterday".to_string();
        assert_eq!(estimate_co2_offset(&[bad], now), 0.0);
    }
}
