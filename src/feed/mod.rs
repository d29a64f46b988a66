//! Community feed aggregation.
//!
//! Merges curated gallery items with items synthesized from tree records
//! into one deduplicated, time-ordered, paginated feed. Both sources are
//! fully materialized and merged in memory; fine at district scale.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Pagination, UserRef};

/// Resolved reference to an event, embedded in feed items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRef {
    pub id: String,
    pub title: String,
}

/// One entry of the aggregated public feed: either a curated gallery item
/// or a post synthesized from a tree's own data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<UserRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_tree_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_event: Option<EventRef>,
    pub tags: Vec<String>,
    pub likes: Vec<String>,
    pub created_at: String,
    pub is_community_post: bool,
}

/// One page of the feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub pagination: Pagination,
}

/// Build one page of the community feed.
///
/// Any store failure aborts the whole call; dangling references skip only
/// the affected item.
pub async fn get_feed(
    repo: &Repository,
    district: &str,
    page: i64,
    limit: i64,
) -> Result<FeedPage, AppError> {
    let gallery_items = repo.list_gallery_items().await?;

    // Curated items, with growth-update images folded in.
    let mut items: Vec<FeedItem> = Vec::new();
    let mut curated_tree_ids: HashSet<String> = HashSet::new();

    for item in &gallery_items {
        let Some(uploader) = repo.get_user(&item.uploaded_by).await? else {
            continue;
        };

        let mut images = item.images.clone();
        if let Some(tree_id) = &item.related_tree_id {
            let Some(tree) = repo.get_tree(tree_id).await? else {
                continue;
            };
            curated_tree_ids.insert(tree.id.clone());

            let updates = repo.list_tree_updates_asc(tree_id).await?;
            let update_images: Vec<String> =
                updates.into_iter().flat_map(|u| u.images).collect();
            images = merge_images(&images, &update_images);
        } else {
            images = merge_images(&images, &[]);
        }

        let related_event = match &item.related_event_id {
            Some(event_id) => repo.get_event(event_id).await?.map(|e| EventRef {
                id: e.id,
                title: e.title,
            }),
            None => None,
        };

        items.push(FeedItem {
            id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            images,
            uploaded_by: Some(UserRef::from(&uploader)),
            related_tree_id: item.related_tree_id.clone(),
            related_event,
            tags: item.tags.clone(),
            likes: item.likes.clone(),
            created_at: item.created_at.clone(),
            is_community_post: false,
        });
    }

    // Synthesize posts for trees with images that no curated item covers.
    for (tree, planter) in repo.list_trees_with_images().await? {
        if curated_tree_ids.contains(&tree.id) {
            continue;
        }
        let Some(planter) = planter else {
            continue;
        };

        let updates = repo.list_tree_updates_asc(&tree.id).await?;
        let update_images: Vec<String> = updates.into_iter().flat_map(|u| u.images).collect();
        let images = merge_images(&tree.images, &update_images);

        let description = tree.notes.clone().unwrap_or_else(|| {
            format!("A young {} tree planted in {}.", tree.common_name, district)
        });

        items.push(FeedItem {
            id: tree.id.clone(),
            title: format!("{} Planting", tree.common_name),
            description: Some(description),
            images,
            uploaded_by: Some(planter),
            related_tree_id: Some(tree.id.clone()),
            related_event: None,
            tags: vec!["community".to_string(), tree.common_name.to_lowercase()],
            likes: Vec::new(),
            created_at: tree.created_at.clone(),
            is_community_post: true,
        });
    }

    sort_feed(&mut items);

    Ok(paginate(items, page, limit))
}

/// Union two image lists preserving first-seen order; entries of `primary`
/// keep their priority positions.
fn merge_images(primary: &[String], secondary: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for url in primary.iter().chain(secondary.iter()) {
        if seen.insert(url.clone()) {
            merged.push(url.clone());
        }
    }
    merged
}

/// Newest first; item id breaks timestamp ties so repeated calls return
/// identical orderings.
fn sort_feed(items: &mut [FeedItem]) {
    items.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Slice the sorted sequence into one page.
fn paginate(items: Vec<FeedItem>, page: i64, limit: i64) -> FeedPage {
    let total_items = items.len() as i64;
    let skip = ((page - 1) * limit) as usize;

    let items = items
        .into_iter()
        .skip(skip)
        .take(limit as usize)
        .collect();

    FeedPage {
        items,
        pagination: Pagination::new(total_items, page, limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn item(id: &str, created_at: &str) -> FeedItem {
        FeedItem {
            id: id.to_string(),
            title: "t".to_string(),
            description: None,
            images: Vec::new(),
            uploaded_by: None,
            related_tree_id: None,
            related_event: None,
            tags: Vec::new(),
            likes: Vec::new(),
            created_at: created_at.to_string(),
            is_community_post: false,
        }
    }

    #[test]
    fn test_merge_images_dedups_preserving_first_seen_order() {
        let merged = merge_images(
            &urls(&["a.jpg", "b.jpg"]),
            &urls(&["b.jpg", "c.jpg", "a.jpg", "d.jpg"]),
        );
        assert_eq!(merged, urls(&["a.jpg", "b.jpg", "c.jpg", "d.jpg"]));
    }

    #[test]
    fn test_merge_images_dedups_within_primary() {
        let merged = merge_images(&urls(&["a.jpg", "a.jpg", "b.jpg"]), &[]);
        assert_eq!(merged, urls(&["a.jpg", "b.jpg"]));
    }

    #[test]
    fn test_sort_feed_newest_first_with_id_tie_break() {
        let mut items = vec![
            item("b", "2025-03-01T00:00:00+00:00"),
            item("c", "2025-04-01T00:00:00+00:00"),
            item("a", "2025-03-01T00:00:00+00:00"),
        ];
        sort_feed(&mut items);
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_paginate_bounds_and_math() {
        let items: Vec<FeedItem> = (0..7)
            .map(|i| item(&format!("i{}", i), "2025-01-01T00:00:00+00:00"))
            .collect();

        let page1 = paginate(items.clone(), 1, 3);
        assert_eq!(page1.items.len(), 3);
        assert_eq!(page1.pagination.total_items, 7);
        assert_eq!(page1.pagination.total_pages, 3);

        let page3 = paginate(items.clone(), 3, 3);
        assert_eq!(page3.items.len(), 1);

        let past_end = paginate(items, 4, 3);
        assert!(past_end.items.is_empty());
    }
}
