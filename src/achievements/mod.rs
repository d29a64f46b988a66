//! Achievement engine.
//!
//! Evaluates threshold badge rules whenever a planter registers a tree.
//! The read-count / match-threshold / insert-award sequence is serialized
//! per planter, and the award insert is idempotent per (user, badge), so
//! concurrent registrations can neither skip a threshold nor award twice.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::BadgeType;

/// Awards threshold badges and their notifications.
pub struct AchievementEngine {
    repo: Arc<Repository>,
    /// Per-planter locks. Entries live for the life of the process;
    /// planter count is district-bounded.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AchievementEngine {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self {
            repo,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn planter_lock(&self, planter_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(planter_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Evaluate and award after a tree has been persisted. Runs before the
    /// creating request's response is sent; its errors are the caller's to
    /// log, never to surface.
    pub async fn on_tree_created(&self, tree_id: &str, planter_id: &str) -> Result<(), AppError> {
        let lock = self.planter_lock(planter_id).await;
        let _guard = lock.lock().await;

        let count = self.repo.count_active_trees_by_planter(planter_id).await?;

        let templates = self
            .repo
            .list_active_badge_templates(BadgeType::TreesPlanted)
            .await?;

        for template in templates
            .iter()
            .filter(|t| t.trigger_count == Some(count))
        {
            // Idempotent per (user, badge name); a badge re-reached after a
            // deletion does not produce a second row or notification.
            if !self.repo.insert_achievement_once(planter_id, template).await? {
                continue;
            }

            tracing::info!(
                planter_id,
                badge = %template.name,
                count,
                "badge awarded"
            );

            let body = format!(
                "Congratulations! You've earned the \"{}\" badge for planting {} tree{}. \
                 Check your profile to see your new badge!",
                template.name,
                count,
                if count > 1 { "s" } else { "" }
            );

            // The achievement stands even if its notification fails; the
            // failure is logged, not retried.
            if let Err(e) = self
                .repo
                .create_notification(planter_id, Some(tree_id), "Achievement Unlocked!", &body)
                .await
            {
                tracing::warn!(
                    planter_id,
                    badge = %template.name,
                    "failed to create award notification: {}",
                    e
                );
            }
        }

        Ok(())
    }
}
