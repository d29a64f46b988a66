//! Tree and growth-update models.

use serde::{Deserialize, Serialize};

use super::UserRef;

/// Lifecycle status of a registered tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TreeStatus {
    Active,
    Removed,
    Dead,
}

impl TreeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreeStatus::Active => "active",
            TreeStatus::Removed => "removed",
            TreeStatus::Dead => "dead",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(TreeStatus::Active),
            "removed" => Some(TreeStatus::Removed),
            "dead" => Some(TreeStatus::Dead),
            _ => None,
        }
    }
}

/// Reported health of a tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TreeHealth {
    Excellent,
    Good,
    Fair,
    Poor,
    Dead,
}

impl TreeHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreeHealth::Excellent => "excellent",
            TreeHealth::Good => "good",
            TreeHealth::Fair => "fair",
            TreeHealth::Poor => "poor",
            TreeHealth::Dead => "dead",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "excellent" => Some(TreeHealth::Excellent),
            "good" => Some(TreeHealth::Good),
            "fair" => Some(TreeHealth::Fair),
            "poor" => Some(TreeHealth::Poor),
            "dead" => Some(TreeHealth::Dead),
            _ => None,
        }
    }
}

/// Where a tree was planted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeLocation {
    pub address: String,
    pub district: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// A registered tree, owned by its planter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub id: String,
    /// Human-readable registration code (`TREE-…`).
    pub tag: String,
    pub planter_id: String,
    pub species: String,
    pub common_name: String,
    pub location: TreeLocation,
    pub planted_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_height: Option<f64>,
    pub current_health: TreeHealth,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: TreeStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// A tree together with its resolved planter, for listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeWithPlanter {
    #[serde(flatten)]
    pub tree: Tree,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planter: Option<UserRef>,
}

/// An append-only growth update for a tree. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeUpdate {
    pub id: String,
    pub tree_id: String,
    pub updated_by: String,
    pub update_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub health: TreeHealth,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
}

/// Request body for registering a new tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTreeRequest {
    pub species: String,
    pub common_name: String,
    pub location: TreeLocation,
    #[serde(default)]
    pub planted_date: Option<String>,
    #[serde(default)]
    pub current_height: Option<f64>,
    #[serde(default)]
    pub current_health: Option<TreeHealth>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for updating a tree. Only the owner or a moderator may
/// apply it; a status change soft-retires the tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTreeRequest {
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default)]
    pub location: Option<TreeLocation>,
    #[serde(default)]
    pub current_height: Option<f64>,
    #[serde(default)]
    pub current_health: Option<TreeHealth>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<TreeStatus>,
}

/// Request body for appending a growth update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTreeUpdateRequest {
    #[serde(default)]
    pub update_date: Option<String>,
    #[serde(default)]
    pub height: Option<f64>,
    pub health: TreeHealth,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}
