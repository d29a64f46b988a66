//! User notification model.
//!
//! Notifications are written by the achievement engine and the admin
//! messaging surface; users read and acknowledge them through their inbox.

use serde::{Deserialize, Serialize};

/// Read state of a notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    New,
    Seen,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::New => "new",
            NotificationStatus::Seen => "seen",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "new" => Some(NotificationStatus::New),
            "seen" => Some(NotificationStatus::Seen),
            _ => None,
        }
    }
}

/// A message addressed to a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_tree_id: Option<String>,
    pub subject: String,
    pub body: String,
    pub status: NotificationStatus,
    pub created_at: String,
}

/// Request body for an admin direct message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}
