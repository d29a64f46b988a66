//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Create tables if they don't exist
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'volunteer',
            phone_number TEXT,
            address TEXT,
            profile_image TEXT,
            is_verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS trees (
            id TEXT PRIMARY KEY,
            tag TEXT NOT NULL UNIQUE,
            planter_id TEXT NOT NULL,
            species TEXT NOT NULL,
            common_name TEXT NOT NULL,
            address TEXT NOT NULL,
            district TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            planted_date TEXT NOT NULL,
            current_height REAL,
            current_health TEXT NOT NULL DEFAULT 'good',
            images TEXT,
            notes TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tree_updates (
            id TEXT PRIMARY KEY,
            tree_id TEXT NOT NULL,
            updated_by TEXT NOT NULL,
            update_date TEXT NOT NULL,
            height REAL,
            health TEXT NOT NULL,
            images TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS gallery_items (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            images TEXT,
            uploaded_by TEXT NOT NULL,
            related_tree_id TEXT,
            related_event_id TEXT,
            tags TEXT,
            likes TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            event_date TEXT NOT NULL,
            address TEXT NOT NULL,
            organizer_id TEXT NOT NULL,
            participants TEXT,
            max_participants INTEGER,
            target_trees INTEGER,
            actual_trees INTEGER NOT NULL DEFAULT 0,
            images TEXT,
            status TEXT NOT NULL DEFAULT 'upcoming',
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS badge_templates (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            badge_type TEXT NOT NULL,
            description TEXT NOT NULL,
            icon TEXT NOT NULL,
            trigger_count INTEGER,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS achievements (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            badge_template_id TEXT,
            badge_name TEXT NOT NULL,
            badge_type TEXT NOT NULL,
            description TEXT NOT NULL,
            icon TEXT NOT NULL,
            earned_at TEXT NOT NULL,
            awarded_by TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            related_tree_id TEXT,
            subject TEXT NOT NULL,
            body TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'new',
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries.
    // The unique index on achievements is load-bearing: it is what makes
    // badge awarding idempotent per (user, badge) under concurrent creates.
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_trees_planter ON trees(planter_id);
        CREATE INDEX IF NOT EXISTS idx_trees_status ON trees(status);
        CREATE INDEX IF NOT EXISTS idx_tree_updates_tree ON tree_updates(tree_id);
        CREATE INDEX IF NOT EXISTS idx_gallery_created_at ON gallery_items(created_at);
        CREATE INDEX IF NOT EXISTS idx_events_status ON events(status);
        CREATE INDEX IF NOT EXISTS idx_badge_templates_active ON badge_templates(is_active);
        CREATE INDEX IF NOT EXISTS idx_achievements_user ON achievements(user_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_achievements_user_badge
            ON achievements(user_id, badge_name);
        CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
        "#,
    )
    .execute(pool)
    .await?;

    seed_default_badges(pool).await?;

    Ok(())
}

/// Default auto-award rules for tree planting milestones.
const DEFAULT_BADGES: &[(i64, &str, &str, &str)] = &[
    (1, "First Seed", "Planted your very first tree!", "🌱"),
    (
        5,
        "Green Thumb",
        "Planted 5 trees. You're making a difference!",
        "🌿",
    ),
    (
        10,
        "Forest Guardian",
        "Planted 10 trees. A true environmental hero!",
        "🌳",
    ),
    (
        25,
        "Nature's Champion",
        "Planted 25 trees. The whole district thanks you!",
        "👑",
    ),
];

/// Seed the built-in threshold badges. Existing rows (by name) are left alone.
async fn seed_default_badges(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();

    for (trigger_count, name, description, icon) in DEFAULT_BADGES {
        sqlx::query(
            r#"INSERT OR IGNORE INTO badge_templates
                (id, name, badge_type, description, icon, trigger_count, is_active, created_by, created_at, updated_at)
               VALUES (?, ?, 'trees_planted', ?, ?, ?, 1, NULL, ?, ?)"#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(name)
        .bind(description)
        .bind(icon)
        .bind(trigger_count)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
    }

    Ok(())
}
