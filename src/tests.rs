//! Integration tests for the canopy backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::achievements::AchievementEngine;
use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::models::{CreateTreeRequest, CreateUserRequest, Role, Tree, TreeLocation};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    repo: Arc<Repository>,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(None).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Create config
        let config = Config {
            gateway_psk: psk.clone(),
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            district: "Greenfield".to_string(),
        };

        let state = AppState {
            engine: Arc::new(AchievementEngine::new(repo.clone())),
            repo: repo.clone(),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-gateway-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            repo,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Seed a user profile directly in the store, as the auth gateway's
    /// provisioning would have.
    async fn seed_user(&self, username: &str, role: Role) -> String {
        let user = self
            .repo
            .create_user(&CreateUserRequest {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                full_name: format!("Test {}", username),
                role: Some(role),
                phone_number: None,
                address: None,
                profile_image: None,
            })
            .await
            .expect("Failed to seed user");
        user.id
    }

    /// Seed an active tree directly in the store (no badge evaluation).
    async fn seed_tree(&self, planter_id: &str, images: &[&str]) -> Tree {
        self.repo
            .create_tree(
                planter_id,
                &CreateTreeRequest {
                    species: "Mangifera indica".to_string(),
                    common_name: "Mango".to_string(),
                    location: TreeLocation {
                        address: "12 Lake Road".to_string(),
                        district: "Greenfield".to_string(),
                        latitude: None,
                        longitude: None,
                    },
                    planted_date: None,
                    current_height: None,
                    current_health: None,
                    images: images.iter().map(|s| s.to_string()).collect(),
                    notes: None,
                },
            )
            .await
            .expect("Failed to seed tree")
    }

    /// Register a tree through the API as the given user.
    async fn create_tree_as(&self, user_id: &str, common_name: &str, images: &[&str]) -> Value {
        let resp = self
            .client
            .post(self.url("/api/trees"))
            .header("x-user-id", user_id)
            .json(&json!({
                "species": "Mangifera indica",
                "commonName": common_name,
                "location": { "address": "12 Lake Road", "district": "Greenfield" },
                "images": images
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }

    async fn user_achievements(&self, user_id: &str) -> Vec<String> {
        let resp = self
            .client
            .get(self.url(&format!("/api/stats/user/{}", user_id)))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        body["data"]["achievements"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["badgeName"].as_str().unwrap().to_string())
            .collect()
    }
}

// ==================== HEALTH & GATEWAY ====================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_gateway_missing_key() {
    let fixture = TestFixture::with_psk(Some("secret-key".to_string())).await;

    // Bare client without the default gateway header
    let client = Client::new();
    let resp = client
        .get(format!("{}/api/stats", fixture.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_gateway_invalid_key() {
    let fixture = TestFixture::with_psk(Some("correct-key".to_string())).await;

    let client = Client::new();
    let resp = client
        .get(format!("{}/api/stats", fixture.base_url))
        .header("x-gateway-key", "wrong-key")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_GATEWAY_KEY");
}

#[tokio::test]
async fn test_gateway_valid_key() {
    let fixture = TestFixture::with_psk(Some("correct-key".to_string())).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/stats"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
}

// ==================== TREES ====================

#[tokio::test]
async fn test_tree_create_requires_auth() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/trees"))
        .json(&json!({
            "species": "Mangifera indica",
            "commonName": "Mango",
            "location": { "address": "12 Lake Road", "district": "Greenfield" }
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_tree_crud() {
    let fixture = TestFixture::new().await;
    let planter = fixture.seed_user("planter1", Role::Volunteer).await;

    // Create
    let create_body = fixture
        .create_tree_as(&planter, "Jackfruit", &["https://img.example/a.jpg"])
        .await;
    assert_eq!(create_body["success"], true);
    let tree_id = create_body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(create_body["data"]["commonName"], "Jackfruit");
    assert_eq!(create_body["data"]["status"], "active");
    assert!(create_body["data"]["tag"].as_str().unwrap().starts_with("TREE-"));

    // Get with updates
    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/trees/{}", tree_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), 200);
    let get_body: Value = get_resp.json().await.unwrap();
    assert_eq!(get_body["data"]["tree"]["id"], tree_id.as_str());
    assert!(get_body["data"]["updates"].as_array().unwrap().is_empty());

    // Append a growth update
    let update_resp = fixture
        .client
        .post(fixture.url(&format!("/api/trees/{}/updates", tree_id)))
        .header("x-user-id", &planter)
        .json(&json!({
            "health": "excellent",
            "height": 1.4,
            "images": ["https://img.example/b.jpg"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(update_resp.status(), 200);

    // The tree follows its latest update
    let get_resp2 = fixture
        .client
        .get(fixture.url(&format!("/api/trees/{}", tree_id)))
        .send()
        .await
        .unwrap();
    let get_body2: Value = get_resp2.json().await.unwrap();
    assert_eq!(get_body2["data"]["tree"]["currentHealth"], "excellent");
    assert_eq!(get_body2["data"]["tree"]["currentHeight"], 1.4);
    assert_eq!(get_body2["data"]["updates"].as_array().unwrap().len(), 1);

    // Soft-retire via status update
    let retire_resp = fixture
        .client
        .put(fixture.url(&format!("/api/trees/{}", tree_id)))
        .header("x-user-id", &planter)
        .json(&json!({ "status": "removed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(retire_resp.status(), 200);
    let retire_body: Value = retire_resp.json().await.unwrap();
    assert_eq!(retire_body["data"]["status"], "removed");

    // List filtered by status
    let list_resp = fixture
        .client
        .get(fixture.url("/api/trees?status=removed"))
        .send()
        .await
        .unwrap();
    let list_body: Value = list_resp.json().await.unwrap();
    assert_eq!(list_body["data"]["trees"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_tree_update_foreign_tree_forbidden() {
    let fixture = TestFixture::new().await;
    let owner = fixture.seed_user("owner", Role::Volunteer).await;
    let other = fixture.seed_user("other", Role::Volunteer).await;
    let tree = fixture.seed_tree(&owner, &[]).await;

    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/trees/{}", tree.id)))
        .header("x-user-id", &other)
        .json(&json!({ "notes": "not yours" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_tree_hard_delete_is_moderator_only() {
    let fixture = TestFixture::new().await;
    let planter = fixture.seed_user("planter", Role::Volunteer).await;
    let admin = fixture.seed_user("admin", Role::Admin).await;
    let tree = fixture.seed_tree(&planter, &[]).await;

    let denied = fixture
        .client
        .delete(fixture.url(&format!("/api/trees/{}", tree.id)))
        .header("x-user-id", &planter)
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 403);

    let allowed = fixture
        .client
        .delete(fixture.url(&format!("/api/trees/{}", tree.id)))
        .header("x-user-id", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), 200);

    let gone = fixture
        .client
        .get(fixture.url(&format!("/api/trees/{}", tree.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), 404);
}

#[tokio::test]
async fn test_validation_errors() {
    let fixture = TestFixture::new().await;
    let planter = fixture.seed_user("planter", Role::Volunteer).await;

    let resp = fixture
        .client
        .post(fixture.url("/api/trees"))
        .header("x-user-id", &planter)
        .json(&json!({
            "species": "",
            "commonName": "Mango",
            "location": { "address": "12 Lake Road", "district": "Greenfield" }
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_not_found_errors() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/trees/non-existent-id"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// ==================== ACHIEVEMENTS ====================

#[tokio::test]
async fn test_first_tree_awards_first_seed() {
    let fixture = TestFixture::new().await;
    let planter = fixture.seed_user("sprout", Role::Volunteer).await;

    fixture.create_tree_as(&planter, "Mango", &[]).await;

    let badges = fixture.user_achievements(&planter).await;
    assert_eq!(badges, vec!["First Seed".to_string()]);

    // The award landed in the inbox too
    let inbox_resp = fixture
        .client
        .get(fixture.url("/api/notifications"))
        .header("x-user-id", &planter)
        .send()
        .await
        .unwrap();
    let inbox: Value = inbox_resp.json().await.unwrap();
    let notifications = inbox["data"]["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["subject"], "Achievement Unlocked!");
    assert!(notifications[0]["body"]
        .as_str()
        .unwrap()
        .contains("First Seed"));
}

#[tokio::test]
async fn test_badges_awarded_at_exact_thresholds_only() {
    let fixture = TestFixture::new().await;
    let planter = fixture.seed_user("grower", Role::Volunteer).await;

    for i in 0..6 {
        fixture
            .create_tree_as(&planter, &format!("Tree {}", i), &[])
            .await;
    }

    // Thresholds 1 and 5 crossed; 6 is not a threshold
    let mut badges = fixture.user_achievements(&planter).await;
    badges.sort();
    assert_eq!(
        badges,
        vec!["First Seed".to_string(), "Green Thumb".to_string()]
    );
}

#[tokio::test]
async fn test_recreate_does_not_reaward_badge() {
    let fixture = TestFixture::new().await;
    let planter = fixture.seed_user("replanter", Role::Volunteer).await;
    let admin = fixture.seed_user("admin", Role::Admin).await;

    let mut tree_ids = Vec::new();
    for i in 0..5 {
        let body = fixture
            .create_tree_as(&planter, &format!("Tree {}", i), &[])
            .await;
        tree_ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }
    assert_eq!(fixture.user_achievements(&planter).await.len(), 2);

    // Drop the fifth tree, then plant a replacement: the count returns to
    // five but Green Thumb must not be awarded a second time.
    let delete_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/trees/{}", tree_ids[4])))
        .header("x-user-id", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(delete_resp.status(), 200);

    fixture.create_tree_as(&planter, "Replacement", &[]).await;

    let badges = fixture.user_achievements(&planter).await;
    assert_eq!(badges.len(), 2);
    assert_eq!(
        badges.iter().filter(|b| *b == "Green Thumb").count(),
        1
    );
}

#[tokio::test]
async fn test_concurrent_threshold_evaluation_awards_once() {
    let fixture = TestFixture::new().await;
    let planter = fixture.seed_user("racer", Role::Volunteer).await;

    // Five active trees already persisted; two evaluations race over the
    // same observed count.
    let mut last_tree_id = String::new();
    for _ in 0..5 {
        last_tree_id = fixture.seed_tree(&planter, &[]).await.id;
    }

    let engine = AchievementEngine::new(fixture.repo.clone());
    let (a, b) = tokio::join!(
        engine.on_tree_created(&last_tree_id, &planter),
        engine.on_tree_created(&last_tree_id, &planter),
    );
    a.unwrap();
    b.unwrap();

    let badges = fixture.user_achievements(&planter).await;
    assert_eq!(
        badges.iter().filter(|b| *b == "Green Thumb").count(),
        1
    );
}

// ==================== FEED ====================

#[tokio::test]
async fn test_feed_merges_curated_and_synthesized() {
    let fixture = TestFixture::new().await;
    let planter = fixture.seed_user("curator", Role::Volunteer).await;

    // Tree A: curated entry plus two update images
    let tree_a = fixture
        .seed_tree(&planter, &["https://img.example/a1.jpg"])
        .await;
    fixture
        .repo
        .create_tree_update(
            &tree_a.id,
            &planter,
            &crate::models::CreateTreeUpdateRequest {
                update_date: None,
                height: None,
                health: crate::models::TreeHealth::Good,
                images: vec![
                    "https://img.example/u1.jpg".to_string(),
                    "https://img.example/u2.jpg".to_string(),
                ],
                notes: None,
            },
        )
        .await
        .unwrap();

    let gallery_resp = fixture
        .client
        .post(fixture.url("/api/gallery"))
        .header("x-user-id", &planter)
        .json(&json!({
            "title": "Community planting day",
            "images": ["https://img.example/g1.jpg", "https://img.example/u1.jpg"],
            "relatedTreeId": tree_a.id
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(gallery_resp.status(), 200);
    let gallery_body: Value = gallery_resp.json().await.unwrap();
    let curated_id = gallery_body["data"]["id"].as_str().unwrap().to_string();

    // Tree B: images but no curated entry
    let tree_b = fixture
        .seed_tree(&planter, &["https://img.example/b1.jpg"])
        .await;

    let feed_resp = fixture
        .client
        .get(fixture.url("/api/gallery?page=1&limit=10"))
        .send()
        .await
        .unwrap();
    assert_eq!(feed_resp.status(), 200);
    let feed: Value = feed_resp.json().await.unwrap();
    let items = feed["data"]["items"].as_array().unwrap();

    // Exactly two items: the curated post for tree A and a synthesized
    // post for tree B. Tree A must not appear twice.
    assert_eq!(items.len(), 2);
    assert_eq!(feed["data"]["pagination"]["totalItems"], 2);

    let curated = items
        .iter()
        .find(|i| i["id"] == curated_id.as_str())
        .expect("curated item missing");
    assert_eq!(curated["isCommunityPost"], false);
    // Curated images first, then update images, deduped
    let images: Vec<&str> = curated["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(
        images,
        vec![
            "https://img.example/g1.jpg",
            "https://img.example/u1.jpg",
            "https://img.example/u2.jpg"
        ]
    );

    let synthesized = items
        .iter()
        .find(|i| i["id"] == tree_b.id.as_str())
        .expect("synthesized item missing");
    assert_eq!(synthesized["isCommunityPost"], true);
    assert_eq!(synthesized["title"], "Mango Planting");
    assert!(synthesized["description"]
        .as_str()
        .unwrap()
        .contains("Greenfield"));
    assert_eq!(
        synthesized["tags"],
        json!(["community", "mango"])
    );
}

#[tokio::test]
async fn test_feed_images_have_no_duplicates() {
    let fixture = TestFixture::new().await;
    let planter = fixture.seed_user("dedup", Role::Volunteer).await;

    let tree = fixture
        .seed_tree(&planter, &["https://img.example/x.jpg"])
        .await;
    fixture
        .repo
        .create_tree_update(
            &tree.id,
            &planter,
            &crate::models::CreateTreeUpdateRequest {
                update_date: None,
                height: None,
                health: crate::models::TreeHealth::Good,
                images: vec![
                    "https://img.example/x.jpg".to_string(),
                    "https://img.example/y.jpg".to_string(),
                ],
                notes: None,
            },
        )
        .await
        .unwrap();

    let feed_resp = fixture
        .client
        .get(fixture.url("/api/gallery"))
        .send()
        .await
        .unwrap();
    let feed: Value = feed_resp.json().await.unwrap();
    let items = feed["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);

    let images: Vec<&str> = items[0]["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(images, vec!["https://img.example/x.jpg", "https://img.example/y.jpg"]);
}

#[tokio::test]
async fn test_feed_pagination_and_idempotence() {
    let fixture = TestFixture::new().await;
    let planter = fixture.seed_user("poster", Role::Volunteer).await;

    for i in 0..7 {
        fixture
            .seed_tree(&planter, &[&format!("https://img.example/{}.jpg", i)])
            .await;
    }

    let resp = fixture
        .client
        .get(fixture.url("/api/gallery?page=1&limit=3"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let items = body["data"]["items"].as_array().unwrap();
    assert!(items.len() <= 3);
    assert_eq!(body["data"]["pagination"]["totalItems"], 7);
    assert_eq!(body["data"]["pagination"]["totalPages"], 3);
    assert_eq!(body["data"]["pagination"]["currentPage"], 1);

    // Identical id sequence on a repeated call
    let resp2 = fixture
        .client
        .get(fixture.url("/api/gallery?page=1&limit=3"))
        .send()
        .await
        .unwrap();
    let body2: Value = resp2.json().await.unwrap();
    let ids: Vec<&str> = items.iter().map(|i| i["id"].as_str().unwrap()).collect();
    let ids2: Vec<&str> = body2["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ids2);
}

#[tokio::test]
async fn test_feed_lenient_pagination_params() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/gallery?page=abc&limit=-5"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["pagination"]["currentPage"], 1);
    assert_eq!(body["data"]["pagination"]["limit"], 30);
}

// ==================== LEADERBOARD ====================

#[tokio::test]
async fn test_leaderboard_two_pages_with_distinct_counts() {
    let fixture = TestFixture::new().await;

    // Twelve planters with 1..=12 active trees each
    for n in 1..=12 {
        let planter = fixture
            .seed_user(&format!("planter{:02}", n), Role::Volunteer)
            .await;
        for _ in 0..n {
            fixture.seed_tree(&planter, &[]).await;
        }
    }

    let page1_resp = fixture
        .client
        .get(fixture.url("/api/leaderboard?page=1&limit=10"))
        .send()
        .await
        .unwrap();
    let page1: Value = page1_resp.json().await.unwrap();
    let top = page1["data"]["topPlanters"].as_array().unwrap();
    assert_eq!(top.len(), 10);
    assert_eq!(page1["data"]["pagination"]["totalItems"], 12);
    assert_eq!(page1["data"]["pagination"]["totalPages"], 2);

    let counts1: Vec<i64> = top.iter().map(|e| e["count"].as_i64().unwrap()).collect();
    assert_eq!(counts1, vec![12, 11, 10, 9, 8, 7, 6, 5, 4, 3]);
    assert_eq!(top[0]["rank"], 1);
    assert_eq!(top[9]["rank"], 10);

    let page2_resp = fixture
        .client
        .get(fixture.url("/api/leaderboard?page=2&limit=10"))
        .send()
        .await
        .unwrap();
    let page2: Value = page2_resp.json().await.unwrap();
    let rest = page2["data"]["topPlanters"].as_array().unwrap();
    let counts2: Vec<i64> = rest.iter().map(|e| e["count"].as_i64().unwrap()).collect();
    assert_eq!(counts2, vec![2, 1]);
    assert_eq!(rest[0]["rank"], 11);

    // Counts non-increasing across the page boundary
    assert!(counts1.last().unwrap() >= counts2.first().unwrap());
}

#[tokio::test]
async fn test_leaderboard_ties_share_rank() {
    let fixture = TestFixture::new().await;

    for (name, trees) in [("tied-a", 4), ("tied-b", 4), ("trailing", 2)] {
        let planter = fixture.seed_user(name, Role::Volunteer).await;
        for _ in 0..trees {
            fixture.seed_tree(&planter, &[]).await;
        }
    }

    let resp = fixture
        .client
        .get(fixture.url("/api/leaderboard"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let top = body["data"]["topPlanters"].as_array().unwrap();

    assert_eq!(top[0]["rank"], 1);
    assert_eq!(top[1]["rank"], 1);
    assert_eq!(top[2]["rank"], 3);
}

#[tokio::test]
async fn test_leaderboard_excludes_moderators() {
    let fixture = TestFixture::new().await;

    let admin = fixture.seed_user("keen-admin", Role::Admin).await;
    for _ in 0..9 {
        fixture.seed_tree(&admin, &[]).await;
    }
    let volunteer = fixture.seed_user("volunteer", Role::Volunteer).await;
    fixture.seed_tree(&volunteer, &[]).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/leaderboard"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let top = body["data"]["topPlanters"].as_array().unwrap();

    assert_eq!(top.len(), 1);
    assert_eq!(top[0]["user"]["username"], "volunteer");
}

// ==================== GALLERY LIKES ====================

#[tokio::test]
async fn test_gallery_like_toggle() {
    let fixture = TestFixture::new().await;
    let user = fixture.seed_user("liker", Role::Volunteer).await;

    let create_resp = fixture
        .client
        .post(fixture.url("/api/gallery"))
        .header("x-user-id", &user)
        .json(&json!({
            "title": "Big day",
            "images": ["https://img.example/day.jpg"]
        }))
        .send()
        .await
        .unwrap();
    let create_body: Value = create_resp.json().await.unwrap();
    let item_id = create_body["data"]["id"].as_str().unwrap().to_string();

    let like_resp = fixture
        .client
        .post(fixture.url(&format!("/api/gallery/{}/like", item_id)))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap();
    let like_body: Value = like_resp.json().await.unwrap();
    assert_eq!(like_body["data"]["likes"], 1);

    let unlike_resp = fixture
        .client
        .post(fixture.url(&format!("/api/gallery/{}/like", item_id)))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap();
    let unlike_body: Value = unlike_resp.json().await.unwrap();
    assert_eq!(unlike_body["data"]["likes"], 0);
}

// ==================== EVENTS ====================

#[tokio::test]
async fn test_event_join_flow() {
    let fixture = TestFixture::new().await;
    let organizer = fixture.seed_user("organizer", Role::Volunteer).await;
    let joiner = fixture.seed_user("joiner", Role::Volunteer).await;

    let create_resp = fixture
        .client
        .post(fixture.url("/api/events"))
        .header("x-user-id", &organizer)
        .json(&json!({
            "title": "Riverside planting",
            "description": "Plant 50 saplings along the river",
            "eventDate": "2026-09-01T08:00:00+00:00",
            "address": "Riverside park",
            "maxParticipants": 1
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(create_resp.status(), 200);
    let create_body: Value = create_resp.json().await.unwrap();
    let event_id = create_body["data"]["id"].as_str().unwrap().to_string();

    let join_resp = fixture
        .client
        .post(fixture.url(&format!("/api/events/{}/join", event_id)))
        .header("x-user-id", &joiner)
        .send()
        .await
        .unwrap();
    assert_eq!(join_resp.status(), 200);

    // Joining twice is rejected
    let rejoin_resp = fixture
        .client
        .post(fixture.url(&format!("/api/events/{}/join", event_id)))
        .header("x-user-id", &joiner)
        .send()
        .await
        .unwrap();
    assert_eq!(rejoin_resp.status(), 400);

    // The event is full for anyone else
    let full_resp = fixture
        .client
        .post(fixture.url(&format!("/api/events/{}/join", event_id)))
        .header("x-user-id", &organizer)
        .send()
        .await
        .unwrap();
    assert_eq!(full_resp.status(), 400);

    // Attendance shows up in user stats
    let stats_resp = fixture
        .client
        .get(fixture.url(&format!("/api/stats/user/{}", joiner)))
        .send()
        .await
        .unwrap();
    let stats: Value = stats_resp.json().await.unwrap();
    assert_eq!(stats["data"]["eventsAttended"], 1);
}

// ==================== ROLES & ADMIN ====================

#[tokio::test]
async fn test_admin_routes_require_moderator() {
    let fixture = TestFixture::new().await;
    let volunteer = fixture.seed_user("plain", Role::Volunteer).await;
    let admin = fixture.seed_user("mod", Role::Admin).await;

    let denied = fixture
        .client
        .get(fixture.url("/api/admin/users"))
        .header("x-user-id", &volunteer)
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 403);
    let denied_body: Value = denied.json().await.unwrap();
    assert_eq!(denied_body["error"]["code"], "FORBIDDEN");

    let allowed = fixture
        .client
        .get(fixture.url("/api/admin/users"))
        .header("x-user-id", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), 200);
}

#[tokio::test]
async fn test_role_change_requires_superadmin() {
    let fixture = TestFixture::new().await;
    let admin = fixture.seed_user("mod", Role::Admin).await;
    let root = fixture.seed_user("root", Role::Superadmin).await;
    let target = fixture.seed_user("target", Role::Volunteer).await;

    let denied = fixture
        .client
        .put(fixture.url(&format!("/api/admin/users/{}/role", target)))
        .header("x-user-id", &admin)
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 403);

    let allowed = fixture
        .client
        .put(fixture.url(&format!("/api/admin/users/{}/role", target)))
        .header("x-user-id", &root)
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), 200);
    let body: Value = allowed.json().await.unwrap();
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn test_admin_message_lands_in_inbox() {
    let fixture = TestFixture::new().await;
    let admin = fixture.seed_user("mod", Role::Admin).await;
    let target = fixture.seed_user("target", Role::Volunteer).await;

    let send_resp = fixture
        .client
        .post(fixture.url(&format!("/api/admin/message/{}", target)))
        .header("x-user-id", &admin)
        .json(&json!({
            "subject": "Welcome",
            "message": "Thanks for joining the program!"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(send_resp.status(), 200);

    let inbox_resp = fixture
        .client
        .get(fixture.url("/api/notifications"))
        .header("x-user-id", &target)
        .send()
        .await
        .unwrap();
    let inbox: Value = inbox_resp.json().await.unwrap();
    let notifications = inbox["data"]["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["subject"], "Welcome");
    assert_eq!(notifications[0]["status"], "new");

    // Acknowledge it
    let notification_id = notifications[0]["id"].as_str().unwrap();
    let seen_resp = fixture
        .client
        .put(fixture.url(&format!("/api/notifications/{}/seen", notification_id)))
        .header("x-user-id", &target)
        .send()
        .await
        .unwrap();
    assert_eq!(seen_resp.status(), 200);
    let seen_body: Value = seen_resp.json().await.unwrap();
    assert_eq!(seen_body["data"]["status"], "seen");
}

#[tokio::test]
async fn test_tree_reminder_notifies_planter() {
    let fixture = TestFixture::new().await;
    let admin = fixture.seed_user("mod", Role::Admin).await;
    let planter = fixture.seed_user("planter", Role::Volunteer).await;
    let tree = fixture.seed_tree(&planter, &[]).await;

    let remind_resp = fixture
        .client
        .post(fixture.url(&format!("/api/admin/trees/{}/remind", tree.id)))
        .header("x-user-id", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(remind_resp.status(), 200);

    let inbox_resp = fixture
        .client
        .get(fixture.url("/api/notifications"))
        .header("x-user-id", &planter)
        .send()
        .await
        .unwrap();
    let inbox: Value = inbox_resp.json().await.unwrap();
    let notifications = inbox["data"]["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0]["subject"]
        .as_str()
        .unwrap()
        .starts_with("Update Reminder"));
    assert_eq!(notifications[0]["relatedTreeId"], tree.id.as_str());
}

#[tokio::test]
async fn test_admin_provisioning_and_summary() {
    let fixture = TestFixture::new().await;
    let admin = fixture.seed_user("mod", Role::Admin).await;

    // An admin may provision volunteers...
    let create_resp = fixture
        .client
        .post(fixture.url("/api/admin/users"))
        .header("x-user-id", &admin)
        .json(&json!({
            "username": "newcomer",
            "email": "newcomer@example.com",
            "fullName": "New Comer"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(create_resp.status(), 200);
    let create_body: Value = create_resp.json().await.unwrap();
    assert_eq!(create_body["data"]["role"], "volunteer");

    // ...but not other admins
    let escalate_resp = fixture
        .client
        .post(fixture.url("/api/admin/users"))
        .header("x-user-id", &admin)
        .json(&json!({
            "username": "wannabe",
            "email": "wannabe@example.com",
            "fullName": "Wannabe Admin",
            "role": "admin"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(escalate_resp.status(), 403);

    let summary_resp = fixture
        .client
        .get(fixture.url("/api/admin/summary"))
        .header("x-user-id", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(summary_resp.status(), 200);
    let summary: Value = summary_resp.json().await.unwrap();
    assert_eq!(summary["data"]["stats"]["totalUsers"], 2);
}

// ==================== BADGE TEMPLATES ====================

#[tokio::test]
async fn test_badge_template_management() {
    let fixture = TestFixture::new().await;
    let admin = fixture.seed_user("mod", Role::Admin).await;
    let root = fixture.seed_user("root", Role::Superadmin).await;

    // Seeded defaults are visible to moderators
    let list_resp = fixture
        .client
        .get(fixture.url("/api/badges"))
        .header("x-user-id", &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(list_resp.status(), 200);
    let list_body: Value = list_resp.json().await.unwrap();
    let names: Vec<&str> = list_body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"First Seed"));
    assert!(names.contains(&"Green Thumb"));

    // Creation is superadmin-only
    let denied = fixture
        .client
        .post(fixture.url("/api/badges"))
        .header("x-user-id", &admin)
        .json(&json!({
            "name": "Half Century",
            "badgeType": "treesPlanted",
            "description": "Planted 50 trees.",
            "icon": "🏆",
            "triggerCount": 50
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 403);

    let created = fixture
        .client
        .post(fixture.url("/api/badges"))
        .header("x-user-id", &root)
        .json(&json!({
            "name": "Half Century",
            "badgeType": "treesPlanted",
            "description": "Planted 50 trees.",
            "icon": "🏆",
            "triggerCount": 50
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 200);
    let created_body: Value = created.json().await.unwrap();
    let template_id = created_body["data"]["id"].as_str().unwrap().to_string();

    // Deactivate it again
    let updated = fixture
        .client
        .put(fixture.url(&format!("/api/badges/{}", template_id)))
        .header("x-user-id", &root)
        .json(&json!({ "isActive": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), 200);
    let updated_body: Value = updated.json().await.unwrap();
    assert_eq!(updated_body["data"]["isActive"], false);
}

#[tokio::test]
async fn test_inactive_template_is_not_awarded() {
    let fixture = TestFixture::new().await;
    let root = fixture.seed_user("root", Role::Superadmin).await;
    let planter = fixture.seed_user("planter", Role::Volunteer).await;

    // Deactivate the threshold-1 badge before any tree exists
    let list_resp = fixture
        .client
        .get(fixture.url("/api/badges"))
        .header("x-user-id", &root)
        .send()
        .await
        .unwrap();
    let list_body: Value = list_resp.json().await.unwrap();
    let first_seed_id = list_body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "First Seed")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    fixture
        .client
        .put(fixture.url(&format!("/api/badges/{}", first_seed_id)))
        .header("x-user-id", &root)
        .json(&json!({ "isActive": false }))
        .send()
        .await
        .unwrap();

    fixture.create_tree_as(&planter, "Mango", &[]).await;

    assert!(fixture.user_achievements(&planter).await.is_empty());
}

// ==================== STATS ====================

#[tokio::test]
async fn test_public_stats() {
    let fixture = TestFixture::new().await;
    let planter = fixture.seed_user("planter", Role::Volunteer).await;
    fixture.seed_tree(&planter, &[]).await;
    fixture.seed_tree(&planter, &[]).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/stats"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["totalTrees"], 2);
    assert_eq!(body["data"]["totalUsers"], 1);
    assert_eq!(body["data"]["recentTrees"].as_array().unwrap().len(), 2);
    assert!(body["data"]["co2Offset"].as_str().unwrap().ends_with("kg/year"));
}

#[tokio::test]
async fn test_users_me() {
    let fixture = TestFixture::new().await;
    let user = fixture.seed_user("selfie", Role::Volunteer).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/users/me"))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["username"], "selfie");
    assert_eq!(body["data"]["role"], "volunteer");

    // Unknown subject id is rejected
    let unknown = fixture
        .client
        .get(fixture.url("/api/users/me"))
        .header("x-user-id", "ghost")
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 401);
}
