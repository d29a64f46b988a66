//! Badge template and achievement models.

use serde::{Deserialize, Serialize};

/// What kind of contribution a badge rewards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BadgeType {
    TreesPlanted,
    EventsAttended,
    UpdatesSubmitted,
    Special,
}

impl BadgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeType::TreesPlanted => "trees_planted",
            BadgeType::EventsAttended => "events_attended",
            BadgeType::UpdatesSubmitted => "updates_submitted",
            BadgeType::Special => "special",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "trees_planted" => Some(BadgeType::TreesPlanted),
            "events_attended" => Some(BadgeType::EventsAttended),
            "updates_submitted" => Some(BadgeType::UpdatesSubmitted),
            "special" => Some(BadgeType::Special),
            _ => None,
        }
    }
}

/// An auto-award rule. Templates with a `trigger_count` are evaluated by
/// the achievement engine; templates without one are awarded manually.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeTemplate {
    pub id: String,
    pub name: String,
    pub badge_type: BadgeType,
    pub description: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_count: Option<i64>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// The record of a badge awarded to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_template_id: Option<String>,
    pub badge_name: String,
    pub badge_type: BadgeType,
    pub description: String,
    pub icon: String,
    pub earned_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awarded_by: Option<String>,
}

/// Request body for creating a badge template.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBadgeTemplateRequest {
    pub name: String,
    pub badge_type: BadgeType,
    pub description: String,
    pub icon: String,
    #[serde(default)]
    pub trigger_count: Option<i64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Request body for updating a badge template.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBadgeTemplateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub trigger_count: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
}
