//! Curated gallery item model.

use serde::{Deserialize, Serialize};

/// A curated gallery entry, independently uploaded by a user or admin.
/// May or may not reference a tree or an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub images: Vec<String>,
    pub uploaded_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_tree_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_event_id: Option<String>,
    pub tags: Vec<String>,
    /// User ids that liked this item (set semantics).
    pub likes: Vec<String>,
    pub created_at: String,
}

/// Request body for uploading to the gallery.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGalleryItemRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub images: Vec<String>,
    #[serde(default)]
    pub related_tree_id: Option<String>,
    #[serde(default)]
    pub related_event_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}
