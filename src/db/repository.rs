//! Database repository for CRUD operations.
//!
//! Uses prepared statements; string-array fields are stored as JSON TEXT.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Achievement, BadgeTemplate, BadgeType, CreateBadgeTemplateRequest, CreateEventRequest,
    CreateGalleryItemRequest, CreateTreeRequest, CreateTreeUpdateRequest, CreateUserRequest, Event,
    EventStatus, EventWithOrganizer, GalleryItem, Notification, NotificationStatus, Role, Tree,
    TreeHealth, TreeLocation, TreeStatus, TreeUpdate, TreeWithPlanter,
    UpdateBadgeTemplateRequest, UpdateTreeRequest, User, UserRef,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    /// Provision a new user profile.
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let role = request.role.unwrap_or(Role::Volunteer);

        sqlx::query(
            r#"INSERT INTO users
                (id, username, email, full_name, role, phone_number, address, profile_image, is_verified, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)"#,
        )
        .bind(&id)
        .bind(&request.username)
        .bind(&request.email)
        .bind(&request.full_name)
        .bind(role.as_str())
        .bind(&request.phone_number)
        .bind(&request.address)
        .bind(&request.profile_image)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            username: request.username.clone(),
            email: request.email.clone(),
            full_name: request.full_name.clone(),
            role,
            phone_number: request.phone_number.clone(),
            address: request.address.clone(),
            profile_image: request.profile_image.clone(),
            is_verified: false,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// List users, newest first, paginated.
    pub async fn list_users(&self, page: i64, limit: i64) -> Result<(Vec<User>, i64), AppError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.pool)
            .await?
            .get("n");

        let rows = sqlx::query("SELECT * FROM users ORDER BY created_at DESC, id LIMIT ? OFFSET ?")
            .bind(limit)
            .bind((page - 1) * limit)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.iter().map(user_from_row).collect(), total))
    }

    pub async fn count_users(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Change a user's role.
    pub async fn set_user_role(&self, id: &str, role: Role) -> Result<User, AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Mark a user as verified (or not).
    pub async fn set_user_verified(&self, id: &str, verified: bool) -> Result<User, AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE users SET is_verified = ?, updated_at = ? WHERE id = ?")
            .bind(verified as i32)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Delete a user.
    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    // ==================== TREE OPERATIONS ====================

    /// Register a new tree for a planter.
    pub async fn create_tree(
        &self,
        planter_id: &str,
        request: &CreateTreeRequest,
    ) -> Result<Tree, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let tag = format!(
            "TREE-{}-{}",
            Utc::now().timestamp_millis(),
            &id[..8].to_uppercase()
        );
        let planted_date = request.planted_date.clone().unwrap_or_else(|| now.clone());
        let health = request.current_health.unwrap_or(TreeHealth::Good);
        let images_json = serde_json::to_string(&request.images)?;

        sqlx::query(
            r#"INSERT INTO trees
                (id, tag, planter_id, species, common_name, address, district, latitude, longitude,
                 planted_date, current_height, current_health, images, notes, status, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'active', ?, ?)"#,
        )
        .bind(&id)
        .bind(&tag)
        .bind(planter_id)
        .bind(&request.species)
        .bind(&request.common_name)
        .bind(&request.location.address)
        .bind(&request.location.district)
        .bind(request.location.latitude)
        .bind(request.location.longitude)
        .bind(&planted_date)
        .bind(request.current_height)
        .bind(health.as_str())
        .bind(&images_json)
        .bind(&request.notes)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Tree {
            id,
            tag,
            planter_id: planter_id.to_string(),
            species: request.species.clone(),
            common_name: request.common_name.clone(),
            location: request.location.clone(),
            planted_date,
            current_height: request.current_height,
            current_health: health,
            images: request.images.clone(),
            notes: request.notes.clone(),
            status: TreeStatus::Active,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a tree by ID.
    pub async fn get_tree(&self, id: &str) -> Result<Option<Tree>, AppError> {
        let row = sqlx::query("SELECT * FROM trees WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(tree_from_row))
    }

    /// List trees with planters resolved, optionally filtered, newest first.
    pub async fn list_trees(
        &self,
        status: Option<TreeStatus>,
        planter_id: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<TreeWithPlanter>, i64), AppError> {
        let status_filter = status.map(|s| s.as_str().to_string());

        let total: i64 = sqlx::query(
            r#"SELECT COUNT(*) AS n FROM trees
               WHERE (? IS NULL OR status = ?) AND (? IS NULL OR planter_id = ?)"#,
        )
        .bind(&status_filter)
        .bind(&status_filter)
        .bind(planter_id)
        .bind(planter_id)
        .fetch_one(&self.pool)
        .await?
        .get("n");

        let rows = sqlx::query(
            r#"SELECT t.*,
                      u.username AS planter_username,
                      u.full_name AS planter_full_name,
                      u.profile_image AS planter_profile_image
               FROM trees t
               LEFT JOIN users u ON u.id = t.planter_id
               WHERE (? IS NULL OR t.status = ?) AND (? IS NULL OR t.planter_id = ?)
               ORDER BY t.created_at DESC, t.id
               LIMIT ? OFFSET ?"#,
        )
        .bind(&status_filter)
        .bind(&status_filter)
        .bind(planter_id)
        .bind(planter_id)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(&self.pool)
        .await?;

        let trees = rows
            .iter()
            .map(|row| TreeWithPlanter {
                tree: tree_from_row(row),
                planter: planter_ref_from_row(row),
            })
            .collect();

        Ok((trees, total))
    }

    /// The most recently registered trees, with planters resolved.
    pub async fn recent_trees(&self, limit: i64) -> Result<Vec<TreeWithPlanter>, AppError> {
        let rows = sqlx::query(
            r#"SELECT t.*,
                      u.username AS planter_username,
                      u.full_name AS planter_full_name,
                      u.profile_image AS planter_profile_image
               FROM trees t
               LEFT JOIN users u ON u.id = t.planter_id
               WHERE t.status = 'active'
               ORDER BY t.created_at DESC, t.id
               LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| TreeWithPlanter {
                tree: tree_from_row(row),
                planter: planter_ref_from_row(row),
            })
            .collect())
    }

    /// Update a tree (owner edit or moderator action; status changes
    /// soft-retire the tree).
    pub async fn update_tree(&self, id: &str, request: &UpdateTreeRequest) -> Result<Tree, AppError> {
        let existing = self
            .get_tree(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tree {} not found", id)))?;

        let now = Utc::now().to_rfc3339();
        let species = request.species.clone().unwrap_or(existing.species);
        let common_name = request.common_name.clone().unwrap_or(existing.common_name);
        let location = request.location.clone().unwrap_or(existing.location);
        let current_height = request.current_height.or(existing.current_height);
        let current_health = request.current_health.unwrap_or(existing.current_health);
        let images = request.images.clone().unwrap_or(existing.images);
        let notes = request.notes.clone().or(existing.notes);
        let status = request.status.unwrap_or(existing.status);
        let images_json = serde_json::to_string(&images)?;

        sqlx::query(
            r#"UPDATE trees SET
                species = ?, common_name = ?, address = ?, district = ?, latitude = ?, longitude = ?,
                current_height = ?, current_health = ?, images = ?, notes = ?, status = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&species)
        .bind(&common_name)
        .bind(&location.address)
        .bind(&location.district)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(current_height)
        .bind(current_health.as_str())
        .bind(&images_json)
        .bind(&notes)
        .bind(status.as_str())
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Tree {
            id: id.to_string(),
            tag: existing.tag,
            planter_id: existing.planter_id,
            species,
            common_name,
            location,
            planted_date: existing.planted_date,
            current_height,
            current_health,
            images,
            notes,
            status,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    /// Hard-delete a tree. Admin action only; planters retire via status.
    pub async fn delete_tree(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM trees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Tree {} not found", id)));
        }
        Ok(())
    }

    /// Count a planter's active trees.
    pub async fn count_active_trees_by_planter(&self, planter_id: &str) -> Result<i64, AppError> {
        let row =
            sqlx::query("SELECT COUNT(*) AS n FROM trees WHERE planter_id = ? AND status = 'active'")
                .bind(planter_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.get("n"))
    }

    pub async fn count_active_trees(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM trees WHERE status = 'active'")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn count_trees(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM trees")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// A planter's active trees (full rows, for per-user statistics).
    pub async fn list_active_trees_by_planter(
        &self,
        planter_id: &str,
    ) -> Result<Vec<Tree>, AppError> {
        let rows = sqlx::query("SELECT * FROM trees WHERE planter_id = ? AND status = 'active'")
            .bind(planter_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(tree_from_row).collect())
    }

    /// All trees carrying at least one image, newest first, with planters
    /// resolved. Source rows for synthesized feed items.
    pub async fn list_trees_with_images(&self) -> Result<Vec<(Tree, Option<UserRef>)>, AppError> {
        let rows = sqlx::query(
            r#"SELECT t.*,
                      u.username AS planter_username,
                      u.full_name AS planter_full_name,
                      u.profile_image AS planter_profile_image
               FROM trees t
               LEFT JOIN users u ON u.id = t.planter_id
               WHERE t.images IS NOT NULL AND t.images != '[]'
               ORDER BY t.created_at DESC, t.id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (tree_from_row(row), planter_ref_from_row(row)))
            .collect())
    }

    /// Active-tree counts grouped by planter, highest first. Pagination is
    /// applied here, before any role filtering by the caller.
    pub async fn active_tree_counts(
        &self,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<(String, i64)>, AppError> {
        let rows = sqlx::query(
            r#"SELECT planter_id, COUNT(*) AS count
               FROM trees WHERE status = 'active'
               GROUP BY planter_id
               ORDER BY count DESC, planter_id
               LIMIT ? OFFSET ?"#,
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("planter_id"), row.get("count")))
            .collect())
    }

    /// Number of distinct planters with at least one active tree.
    pub async fn count_distinct_active_planters(&self) -> Result<i64, AppError> {
        let row =
            sqlx::query("SELECT COUNT(DISTINCT planter_id) AS n FROM trees WHERE status = 'active'")
                .fetch_one(&self.pool)
                .await?;
        Ok(row.get("n"))
    }

    // ==================== TREE UPDATE OPERATIONS ====================

    /// Append a growth update to a tree.
    pub async fn create_tree_update(
        &self,
        tree_id: &str,
        updated_by: &str,
        request: &CreateTreeUpdateRequest,
    ) -> Result<TreeUpdate, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let update_date = request.update_date.clone().unwrap_or_else(|| now.clone());
        let images_json = serde_json::to_string(&request.images)?;

        sqlx::query(
            r#"INSERT INTO tree_updates
                (id, tree_id, updated_by, update_date, height, health, images, notes, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(tree_id)
        .bind(updated_by)
        .bind(&update_date)
        .bind(request.height)
        .bind(request.health.as_str())
        .bind(&images_json)
        .bind(&request.notes)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(TreeUpdate {
            id,
            tree_id: tree_id.to_string(),
            updated_by: updated_by.to_string(),
            update_date,
            height: request.height,
            health: request.health,
            images: request.images.clone(),
            notes: request.notes.clone(),
            created_at: now,
        })
    }

    /// A tree's growth updates, oldest first (feed merge order).
    pub async fn list_tree_updates_asc(&self, tree_id: &str) -> Result<Vec<TreeUpdate>, AppError> {
        let rows =
            sqlx::query("SELECT * FROM tree_updates WHERE tree_id = ? ORDER BY update_date, id")
                .bind(tree_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(tree_update_from_row).collect())
    }

    /// A tree's growth updates, newest first (detail view order).
    pub async fn list_tree_updates_desc(&self, tree_id: &str) -> Result<Vec<TreeUpdate>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM tree_updates WHERE tree_id = ? ORDER BY update_date DESC, id",
        )
        .bind(tree_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(tree_update_from_row).collect())
    }

    pub async fn count_updates_by_user(&self, user_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM tree_updates WHERE updated_by = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    // ==================== GALLERY OPERATIONS ====================

    /// Create a curated gallery item.
    pub async fn create_gallery_item(
        &self,
        uploaded_by: &str,
        request: &CreateGalleryItemRequest,
    ) -> Result<GalleryItem, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let images_json = serde_json::to_string(&request.images)?;
        let tags_json = serde_json::to_string(&request.tags)?;

        sqlx::query(
            r#"INSERT INTO gallery_items
                (id, title, description, images, uploaded_by, related_tree_id, related_event_id, tags, likes, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, '[]', ?)"#,
        )
        .bind(&id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&images_json)
        .bind(uploaded_by)
        .bind(&request.related_tree_id)
        .bind(&request.related_event_id)
        .bind(&tags_json)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(GalleryItem {
            id,
            title: request.title.clone(),
            description: request.description.clone(),
            images: request.images.clone(),
            uploaded_by: uploaded_by.to_string(),
            related_tree_id: request.related_tree_id.clone(),
            related_event_id: request.related_event_id.clone(),
            tags: request.tags.clone(),
            likes: Vec::new(),
            created_at: now,
        })
    }

    /// Get a gallery item by ID.
    pub async fn get_gallery_item(&self, id: &str) -> Result<Option<GalleryItem>, AppError> {
        let row = sqlx::query("SELECT * FROM gallery_items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(gallery_item_from_row))
    }

    /// All curated gallery items, newest first.
    pub async fn list_gallery_items(&self) -> Result<Vec<GalleryItem>, AppError> {
        let rows = sqlx::query("SELECT * FROM gallery_items ORDER BY created_at DESC, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(gallery_item_from_row).collect())
    }

    /// Toggle a user's like on a gallery item; returns the new like count.
    pub async fn toggle_gallery_like(&self, id: &str, user_id: &str) -> Result<usize, AppError> {
        let item = self
            .get_gallery_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Gallery item {} not found", id)))?;

        let mut likes = item.likes;
        if let Some(pos) = likes.iter().position(|l| l == user_id) {
            likes.remove(pos);
        } else {
            likes.push(user_id.to_string());
        }

        let likes_json = serde_json::to_string(&likes)?;
        sqlx::query("UPDATE gallery_items SET likes = ? WHERE id = ?")
            .bind(&likes_json)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(likes.len())
    }

    // ==================== EVENT OPERATIONS ====================

    /// Create an event.
    pub async fn create_event(
        &self,
        organizer_id: &str,
        request: &CreateEventRequest,
    ) -> Result<Event, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let images_json = serde_json::to_string(&request.images)?;

        sqlx::query(
            r#"INSERT INTO events
                (id, title, description, event_date, address, organizer_id, participants,
                 max_participants, target_trees, actual_trees, images, status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, '[]', ?, ?, 0, ?, 'upcoming', ?)"#,
        )
        .bind(&id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.event_date)
        .bind(&request.address)
        .bind(organizer_id)
        .bind(request.max_participants)
        .bind(request.target_trees)
        .bind(&images_json)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Event {
            id,
            title: request.title.clone(),
            description: request.description.clone(),
            event_date: request.event_date.clone(),
            address: request.address.clone(),
            organizer_id: organizer_id.to_string(),
            participants: Vec::new(),
            max_participants: request.max_participants,
            target_trees: request.target_trees,
            actual_trees: 0,
            images: request.images.clone(),
            status: EventStatus::Upcoming,
            created_at: now,
        })
    }

    /// Get an event by ID.
    pub async fn get_event(&self, id: &str) -> Result<Option<Event>, AppError> {
        let row = sqlx::query("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(event_from_row))
    }

    /// List events with organizers resolved, newest event date first.
    pub async fn list_events(
        &self,
        status: Option<EventStatus>,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<EventWithOrganizer>, i64), AppError> {
        let status_filter = status.map(|s| s.as_str().to_string());

        let total: i64 = sqlx::query("SELECT COUNT(*) AS n FROM events WHERE (? IS NULL OR status = ?)")
            .bind(&status_filter)
            .bind(&status_filter)
            .fetch_one(&self.pool)
            .await?
            .get("n");

        let rows = sqlx::query(
            r#"SELECT e.*,
                      u.username AS organizer_username,
                      u.full_name AS organizer_full_name,
                      u.profile_image AS organizer_profile_image
               FROM events e
               LEFT JOIN users u ON u.id = e.organizer_id
               WHERE (? IS NULL OR e.status = ?)
               ORDER BY e.event_date DESC, e.id
               LIMIT ? OFFSET ?"#,
        )
        .bind(&status_filter)
        .bind(&status_filter)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(&self.pool)
        .await?;

        let events = rows
            .iter()
            .map(|row| EventWithOrganizer {
                event: event_from_row(row),
                organizer: organizer_ref_from_row(row),
            })
            .collect();

        Ok((events, total))
    }

    /// Add a user to an event's participant list.
    pub async fn join_event(&self, id: &str, user_id: &str) -> Result<Event, AppError> {
        let mut event = self
            .get_event(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", id)))?;

        if event.participants.iter().any(|p| p == user_id) {
            return Err(AppError::Validation("Already joined this event".to_string()));
        }
        if let Some(max) = event.max_participants {
            if event.participants.len() as i64 >= max {
                return Err(AppError::Validation("Event is full".to_string()));
            }
        }

        event.participants.push(user_id.to_string());
        let participants_json = serde_json::to_string(&event.participants)?;

        sqlx::query("UPDATE events SET participants = ? WHERE id = ?")
            .bind(&participants_json)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(event)
    }

    pub async fn count_events(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM events")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn count_events_by_status(&self, status: EventStatus) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM events WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// How many events a user has joined. Participant lists are JSON
    /// arrays, so this is a scan; event volume is district-bounded.
    pub async fn count_events_attended(&self, user_id: &str) -> Result<i64, AppError> {
        let rows = sqlx::query("SELECT participants FROM events")
            .fetch_all(&self.pool)
            .await?;

        let attended = rows
            .iter()
            .filter(|row| {
                let participants: Option<String> = row.get("participants");
                participants
                    .map(|s| parse_json_array(&s).iter().any(|p| p == user_id))
                    .unwrap_or(false)
            })
            .count();

        Ok(attended as i64)
    }

    // ==================== BADGE TEMPLATE OPERATIONS ====================

    /// List all badge templates.
    pub async fn list_badge_templates(&self) -> Result<Vec<BadgeTemplate>, AppError> {
        let rows = sqlx::query("SELECT * FROM badge_templates ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(badge_template_from_row).collect())
    }

    /// Get a badge template by ID.
    pub async fn get_badge_template(&self, id: &str) -> Result<Option<BadgeTemplate>, AppError> {
        let row = sqlx::query("SELECT * FROM badge_templates WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(badge_template_from_row))
    }

    /// Active auto-award rules for one badge type.
    pub async fn list_active_badge_templates(
        &self,
        badge_type: BadgeType,
    ) -> Result<Vec<BadgeTemplate>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM badge_templates WHERE badge_type = ? AND is_active = 1 ORDER BY trigger_count",
        )
        .bind(badge_type.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(badge_template_from_row).collect())
    }

    /// Create a badge template.
    pub async fn create_badge_template(
        &self,
        created_by: &str,
        request: &CreateBadgeTemplateRequest,
    ) -> Result<BadgeTemplate, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO badge_templates
                (id, name, badge_type, description, icon, trigger_count, is_active, created_by, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(&request.name)
        .bind(request.badge_type.as_str())
        .bind(&request.description)
        .bind(&request.icon)
        .bind(request.trigger_count)
        .bind(request.is_active as i32)
        .bind(created_by)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(BadgeTemplate {
            id,
            name: request.name.clone(),
            badge_type: request.badge_type,
            description: request.description.clone(),
            icon: request.icon.clone(),
            trigger_count: request.trigger_count,
            is_active: request.is_active,
            created_by: Some(created_by.to_string()),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Update a badge template.
    pub async fn update_badge_template(
        &self,
        id: &str,
        request: &UpdateBadgeTemplateRequest,
    ) -> Result<BadgeTemplate, AppError> {
        let existing = self
            .get_badge_template(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Badge template {} not found", id)))?;

        let now = Utc::now().to_rfc3339();
        let name = request.name.clone().unwrap_or(existing.name);
        let description = request.description.clone().unwrap_or(existing.description);
        let icon = request.icon.clone().unwrap_or(existing.icon);
        let trigger_count = request.trigger_count.or(existing.trigger_count);
        let is_active = request.is_active.unwrap_or(existing.is_active);

        sqlx::query(
            r#"UPDATE badge_templates SET
                name = ?, description = ?, icon = ?, trigger_count = ?, is_active = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&name)
        .bind(&description)
        .bind(&icon)
        .bind(trigger_count)
        .bind(is_active as i32)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(BadgeTemplate {
            id: id.to_string(),
            name,
            badge_type: existing.badge_type,
            description,
            icon,
            trigger_count,
            is_active,
            created_by: existing.created_by,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    /// Delete a badge template.
    pub async fn delete_badge_template(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM badge_templates WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Badge template {} not found", id)));
        }
        Ok(())
    }

    // ==================== ACHIEVEMENT OPERATIONS ====================

    /// Record an award, at most once per (user, badge name). Returns
    /// whether a new row was actually inserted; an already-held badge is
    /// silently ignored.
    pub async fn insert_achievement_once(
        &self,
        user_id: &str,
        template: &BadgeTemplate,
    ) -> Result<bool, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"INSERT OR IGNORE INTO achievements
                (id, user_id, badge_template_id, badge_name, badge_type, description, icon, earned_at, awarded_by)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL)"#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&template.id)
        .bind(&template.name)
        .bind(template.badge_type.as_str())
        .bind(&template.description)
        .bind(&template.icon)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// A user's achievements, newest first.
    pub async fn list_achievements(&self, user_id: &str) -> Result<Vec<Achievement>, AppError> {
        let rows =
            sqlx::query("SELECT * FROM achievements WHERE user_id = ? ORDER BY earned_at DESC, id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(achievement_from_row).collect())
    }

    // ==================== NOTIFICATION OPERATIONS ====================

    /// Create a notification addressed to a user.
    pub async fn create_notification(
        &self,
        user_id: &str,
        related_tree_id: Option<&str>,
        subject: &str,
        body: &str,
    ) -> Result<Notification, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO notifications (id, user_id, related_tree_id, subject, body, status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(related_tree_id)
        .bind(subject)
        .bind(body)
        .bind(NotificationStatus::New.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Notification {
            id,
            user_id: user_id.to_string(),
            related_tree_id: related_tree_id.map(String::from),
            subject: subject.to_string(),
            body: body.to_string(),
            status: NotificationStatus::New,
            created_at: now,
        })
    }

    /// A user's notifications, newest first, paginated.
    pub async fn list_notifications(
        &self,
        user_id: &str,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Notification>, i64), AppError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS n FROM notifications WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?
            .get("n");

        let rows = sqlx::query(
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC, id LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.iter().map(notification_from_row).collect(), total))
    }

    /// Mark one of the caller's notifications as seen.
    pub async fn mark_notification_seen(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Notification, AppError> {
        let result = sqlx::query(
            "UPDATE notifications SET status = ? WHERE id = ? AND user_id = ?",
        )
        .bind(NotificationStatus::Seen.as_str())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Notification {} not found", id)));
        }

        let row = sqlx::query("SELECT * FROM notifications WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(notification_from_row(&row))
    }
}

// Helper functions for row conversion

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    let is_verified: i32 = row.get("is_verified");
    let role: String = row.get("role");
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        role: Role::from_str(&role).unwrap_or(Role::Volunteer),
        phone_number: row.get("phone_number"),
        address: row.get("address"),
        profile_image: row.get("profile_image"),
        is_verified: is_verified != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn planter_ref_from_row(row: &sqlx::sqlite::SqliteRow) -> Option<UserRef> {
    let username: Option<String> = row.get("planter_username");
    username.map(|username| UserRef {
        id: row.get("planter_id"),
        username,
        full_name: row.get("planter_full_name"),
        profile_image: row.get("planter_profile_image"),
    })
}

fn organizer_ref_from_row(row: &sqlx::sqlite::SqliteRow) -> Option<UserRef> {
    let username: Option<String> = row.get("organizer_username");
    username.map(|username| UserRef {
        id: row.get("organizer_id"),
        username,
        full_name: row.get("organizer_full_name"),
        profile_image: row.get("organizer_profile_image"),
    })
}

fn tree_from_row(row: &sqlx::sqlite::SqliteRow) -> Tree {
    let images: Option<String> = row.get("images");
    let health: String = row.get("current_health");
    let status: String = row.get("status");
    Tree {
        id: row.get("id"),
        tag: row.get("tag"),
        planter_id: row.get("planter_id"),
        species: row.get("species"),
        common_name: row.get("common_name"),
        location: TreeLocation {
            address: row.get("address"),
            district: row.get("district"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
        },
        planted_date: row.get("planted_date"),
        current_height: row.get("current_height"),
        current_health: TreeHealth::from_str(&health).unwrap_or(TreeHealth::Good),
        images: images.map(|s| parse_json_array(&s)).unwrap_or_default(),
        notes: row.get("notes"),
        status: TreeStatus::from_str(&status).unwrap_or(TreeStatus::Active),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn tree_update_from_row(row: &sqlx::sqlite::SqliteRow) -> TreeUpdate {
    let images: Option<String> = row.get("images");
    let health: String = row.get("health");
    TreeUpdate {
        id: row.get("id"),
        tree_id: row.get("tree_id"),
        updated_by: row.get("updated_by"),
        update_date: row.get("update_date"),
        height: row.get("height"),
        health: TreeHealth::from_str(&health).unwrap_or(TreeHealth::Good),
        images: images.map(|s| parse_json_array(&s)).unwrap_or_default(),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
    }
}

fn gallery_item_from_row(row: &sqlx::sqlite::SqliteRow) -> GalleryItem {
    let images: Option<String> = row.get("images");
    let tags: Option<String> = row.get("tags");
    let likes: Option<String> = row.get("likes");
    GalleryItem {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        images: images.map(|s| parse_json_array(&s)).unwrap_or_default(),
        uploaded_by: row.get("uploaded_by"),
        related_tree_id: row.get("related_tree_id"),
        related_event_id: row.get("related_event_id"),
        tags: tags.map(|s| parse_json_array(&s)).unwrap_or_default(),
        likes: likes.map(|s| parse_json_array(&s)).unwrap_or_default(),
        created_at: row.get("created_at"),
    }
}

fn event_from_row(row: &sqlx::sqlite::SqliteRow) -> Event {
    let participants: Option<String> = row.get("participants");
    let images: Option<String> = row.get("images");
    let status: String = row.get("status");
    Event {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        event_date: row.get("event_date"),
        address: row.get("address"),
        organizer_id: row.get("organizer_id"),
        participants: participants.map(|s| parse_json_array(&s)).unwrap_or_default(),
        max_participants: row.get("max_participants"),
        target_trees: row.get("target_trees"),
        actual_trees: row.get("actual_trees"),
        images: images.map(|s| parse_json_array(&s)).unwrap_or_default(),
        status: EventStatus::from_str(&status).unwrap_or(EventStatus::Upcoming),
        created_at: row.get("created_at"),
    }
}

fn badge_template_from_row(row: &sqlx::sqlite::SqliteRow) -> BadgeTemplate {
    let is_active: i32 = row.get("is_active");
    let badge_type: String = row.get("badge_type");
    BadgeTemplate {
        id: row.get("id"),
        name: row.get("name"),
        badge_type: BadgeType::from_str(&badge_type).unwrap_or(BadgeType::Special),
        description: row.get("description"),
        icon: row.get("icon"),
        trigger_count: row.get("trigger_count"),
        is_active: is_active != 0,
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn achievement_from_row(row: &sqlx::sqlite::SqliteRow) -> Achievement {
    let badge_type: String = row.get("badge_type");
    Achievement {
        id: row.get("id"),
        user_id: row.get("user_id"),
        badge_template_id: row.get("badge_template_id"),
        badge_name: row.get("badge_name"),
        badge_type: BadgeType::from_str(&badge_type).unwrap_or(BadgeType::Special),
        description: row.get("description"),
        icon: row.get("icon"),
        earned_at: row.get("earned_at"),
        awarded_by: row.get("awarded_by"),
    }
}

fn notification_from_row(row: &sqlx::sqlite::SqliteRow) -> Notification {
    let status: String = row.get("status");
    Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        related_tree_id: row.get("related_tree_id"),
        subject: row.get("subject"),
        body: row.get("body"),
        status: NotificationStatus::from_str(&status).unwrap_or(NotificationStatus::New),
        created_at: row.get("created_at"),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
