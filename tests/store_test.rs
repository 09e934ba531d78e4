//! Integration tests for the SQLite layer: migrations, vendor profile
//! aggregation, and the session store contract.

use serde_json::json;
use sqlx::Row;

use vendor_chat::db::{self, session, vendor, DbPool, StoreError};

async fn test_pool() -> DbPool {
    let pool = db::connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .expect("connect");
    db::run_migrations(&pool).await.expect("run migrations");
    pool
}

async fn seed_vendor(pool: &DbPool, id: &str, name: &str, avg_rating: Option<f64>) {
    sqlx::query(
        "INSERT INTO vendors (id, name, category, city, price_range, avg_rating)
         VALUES (?, ?, 'Caterer', 'Mumbai', '₹800-1200/plate', ?)",
    )
    .bind(id)
    .bind(name)
    .bind(avg_rating)
    .execute(pool)
    .await
    .expect("seed vendor");
}

async fn seed_image(pool: &DbPool, id: &str, vendor_id: &str, is_main: bool, uploaded_at: &str) {
    sqlx::query(
        "INSERT INTO vendor_images (id, vendor_id, url, is_main, uploaded_at)
         VALUES (?, ?, 'https://img.example/x.jpg', ?, ?)",
    )
    .bind(id)
    .bind(vendor_id)
    .bind(is_main)
    .bind(uploaded_at)
    .execute(pool)
    .await
    .expect("seed image");
}

async fn seed_offer(pool: &DbPool, id: &str, vendor_id: &str, price: i64) {
    sqlx::query(
        "INSERT INTO vendor_offers (id, vendor_id, title, price, updated_at)
         VALUES (?, ?, 'Package', ?, '2025-01-01T00:00:00Z')",
    )
    .bind(id)
    .bind(vendor_id)
    .bind(price)
    .execute(pool)
    .await
    .expect("seed offer");
}

async fn seed_review(pool: &DbPool, id: &str, vendor_id: &str, rating: f64, review_ts: &str) {
    sqlx::query(
        "INSERT INTO vendor_reviews (id, vendor_id, reviewer_name, rating, review_ts)
         VALUES (?, ?, 'Guest', ?, ?)",
    )
    .bind(id)
    .bind(vendor_id)
    .bind(rating)
    .bind(review_ts)
    .execute(pool)
    .await
    .expect("seed review");
}

// ─── Migrations ──────────────────────────────────────────

#[tokio::test]
async fn migrations_create_baseline_tables() {
    let pool = test_pool().await;

    for table in [
        "vendors",
        "vendor_images",
        "vendor_offers",
        "vendor_reviews",
        "convo_sessions",
    ] {
        let count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .expect("check table")
        .get::<i64, _>("count");
        assert_eq!(count, 1, "missing table {table}");
    }
}

// ─── Vendor profile aggregation ──────────────────────────

#[tokio::test]
async fn profile_for_unknown_vendor_is_none() {
    let pool = test_pool().await;
    let profile = vendor::get_vendor_profile(&pool, "ghost").await.unwrap();
    assert!(profile.is_none());
}

#[tokio::test]
async fn profile_orders_main_image_first_then_newest() {
    let pool = test_pool().await;
    seed_vendor(&pool, "v1", "Foo Caterers", None).await;
    seed_image(&pool, "i-old-main", "v1", true, "2024-01-01T00:00:00Z").await;
    seed_image(&pool, "i-new", "v1", false, "2025-06-01T00:00:00Z").await;
    seed_image(&pool, "i-mid", "v1", false, "2025-03-01T00:00:00Z").await;

    let profile = vendor::get_vendor_profile(&pool, "v1").await.unwrap().unwrap();

    let ids: Vec<&str> = profile.images.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["i-old-main", "i-new", "i-mid"]);
}

#[tokio::test]
async fn profile_bounds_image_count() {
    let pool = test_pool().await;
    seed_vendor(&pool, "v1", "Foo Caterers", None).await;
    for i in 0..14 {
        let ts = format!("2025-01-{:02}T00:00:00Z", i + 1);
        seed_image(&pool, &format!("i{i}"), "v1", false, &ts).await;
    }

    let profile = vendor::get_vendor_profile(&pool, "v1").await.unwrap().unwrap();
    assert_eq!(profile.images.len(), 12);
}

#[tokio::test]
async fn profile_orders_offers_by_price_ascending() {
    let pool = test_pool().await;
    seed_vendor(&pool, "v1", "Foo Caterers", None).await;
    seed_offer(&pool, "o-mid", "v1", 50_000).await;
    seed_offer(&pool, "o-low", "v1", 20_000).await;
    seed_offer(&pool, "o-high", "v1", 90_000).await;

    let profile = vendor::get_vendor_profile(&pool, "v1").await.unwrap().unwrap();

    let ids: Vec<&str> = profile.offers.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["o-low", "o-mid", "o-high"]);
}

#[tokio::test]
async fn profile_stats_use_only_fetched_reviews() {
    let pool = test_pool().await;
    seed_vendor(&pool, "v1", "Foo Caterers", Some(2.0)).await;
    // Eight recent five-star reviews push the single old one-star review
    // past the fetch bound, so it must not drag the average down
    for i in 0..8 {
        let ts = format!("2025-02-{:02}T00:00:00Z", i + 1);
        seed_review(&pool, &format!("r{i}"), "v1", 5.0, &ts).await;
    }
    seed_review(&pool, "r-old", "v1", 1.0, "2020-01-01T00:00:00Z").await;

    let profile = vendor::get_vendor_profile(&pool, "v1").await.unwrap().unwrap();

    assert_eq!(profile.reviews.len(), 8);
    assert_eq!(profile.stats.review_count, 8);
    assert_eq!(profile.stats.avg_rating, 5.0);
    // Newest first
    assert_eq!(profile.reviews[0].id, "r7");
}

#[tokio::test]
async fn profile_stats_round_to_two_decimals() {
    let pool = test_pool().await;
    seed_vendor(&pool, "v1", "Foo Caterers", None).await;
    seed_review(&pool, "r1", "v1", 4.0, "2025-01-01T00:00:00Z").await;
    seed_review(&pool, "r2", "v1", 5.0, "2025-01-02T00:00:00Z").await;
    seed_review(&pool, "r3", "v1", 3.5, "2025-01-03T00:00:00Z").await;

    let profile = vendor::get_vendor_profile(&pool, "v1").await.unwrap().unwrap();
    assert_eq!(profile.stats.avg_rating, 4.17);
}

#[tokio::test]
async fn profile_stats_fall_back_to_stored_average() {
    let pool = test_pool().await;
    seed_vendor(&pool, "v1", "Foo Caterers", Some(4.6)).await;

    let profile = vendor::get_vendor_profile(&pool, "v1").await.unwrap().unwrap();
    assert_eq!(profile.stats.review_count, 0);
    assert_eq!(profile.stats.avg_rating, 4.6);
}

// ─── Session store ───────────────────────────────────────

#[tokio::test]
async fn session_get_missing_key_is_none() {
    let pool = test_pool().await;
    assert!(session::get_session(&pool, "ghost").await.is_none());
    assert!(session::get_session(&pool, "").await.is_none());
}

#[tokio::test]
async fn session_create_then_get_round_trip() {
    let pool = test_pool().await;
    let state = json!({ "stage": "ask_category", "slots": {} });

    let created = session::create_session(&pool, "s-1", &state).await.unwrap();
    assert_eq!(created.session_key, "s-1");

    let read = session::get_session(&pool, "s-1").await.unwrap();
    assert_eq!(read.state, state);
    assert_eq!(read.last_updated, created.last_updated);
}

#[tokio::test]
async fn session_create_duplicate_key_fails_loudly() {
    let pool = test_pool().await;
    let state = json!({});
    session::create_session(&pool, "s-1", &state).await.unwrap();

    let result = session::create_session(&pool, "s-1", &state).await;
    assert!(matches!(result, Err(StoreError::Database(_))));
}

#[tokio::test]
async fn session_update_replaces_state() {
    let pool = test_pool().await;
    session::create_session(&pool, "s-1", &json!({ "stage": "ask_category" }))
        .await
        .unwrap();

    session::update_session(&pool, "s-1", &json!({ "stage": "ask_budget" }))
        .await
        .unwrap();

    let read = session::get_session(&pool, "s-1").await.unwrap();
    assert_eq!(read.state["stage"], "ask_budget");
}

#[tokio::test]
async fn session_update_upserts_missing_row() {
    let pool = test_pool().await;

    session::update_session(&pool, "fresh", &json!({ "stage": "ask_city" }))
        .await
        .unwrap();

    let read = session::get_session(&pool, "fresh").await.unwrap();
    assert_eq!(read.state["stage"], "ask_city");
}

#[tokio::test]
async fn session_writes_reject_empty_key() {
    let pool = test_pool().await;
    let state = json!({});

    assert!(matches!(
        session::create_session(&pool, "", &state).await,
        Err(StoreError::EmptyKey)
    ));
    assert!(matches!(
        session::update_session(&pool, "", &state).await,
        Err(StoreError::EmptyKey)
    ));
}
