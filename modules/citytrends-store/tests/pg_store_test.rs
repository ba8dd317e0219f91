//! Integration tests for the Postgres store: upsert keys and range reads.
//!
//! Requirements: Docker (for Postgres via testcontainers)
//!
//! Run with: cargo test -p citytrends-store --features test-utils --test pg_store_test

#![cfg(feature = "test-utils")]

use chrono::{Duration, Utc};
use citytrends_common::{HashtagTrend, Platform, ProcessedTrend, RawPost, TrendType};
use citytrends_store::{testutil::postgres_container, TrendStore};

fn raw_post(post_id: &str, likes: i64) -> RawPost {
    RawPost {
        platform: Platform::Instagram,
        city: "Paris".to_string(),
        neighborhood: Some("Le Marais".to_string()),
        post_id: post_id.to_string(),
        caption: "barrel jeans and a burgundy bag".to_string(),
        hashtags: vec!["parisstyle".to_string()],
        likes,
        comments: 3,
        plays: 0,
        shares: 0,
        author: "marais_looks".to_string(),
        collected_at: Utc::now(),
    }
}

fn processed(name: &str, mentions: i64, rank: i32) -> ProcessedTrend {
    ProcessedTrend {
        city: "London".to_string(),
        neighborhood: Some("Shoreditch".to_string()),
        period: "2025-W49".to_string(),
        trend_type: TrendType::Item,
        trend_name: name.to_string(),
        mentions,
        avg_engagement: 41.5,
        change_percent: None,
        is_new: true,
        rank,
        source_platform: Platform::Instagram,
        metadata: None,
    }
}

#[tokio::test]
async fn raw_post_upsert_is_idempotent_per_platform_and_id() {
    let (_container, store) = postgres_container().await;

    store.upsert_raw_post(&raw_post("p1", 10)).await.unwrap();
    store.upsert_raw_post(&raw_post("p1", 99)).await.unwrap();

    let posts = store
        .raw_posts_since(Utc::now() - Duration::days(7), Some(Platform::Instagram))
        .await
        .unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].likes, 99);
    assert_eq!(posts[0].hashtags, vec!["parisstyle".to_string()]);
}

#[tokio::test]
async fn raw_posts_since_respects_window_and_platform() {
    let (_container, store) = postgres_container().await;

    let mut old = raw_post("old", 1);
    old.collected_at = Utc::now() - Duration::days(9);
    let mut tiktok = raw_post("tt", 1);
    tiktok.platform = Platform::Tiktok;

    store.upsert_raw_post(&old).await.unwrap();
    store.upsert_raw_post(&tiktok).await.unwrap();
    store.upsert_raw_post(&raw_post("fresh", 1)).await.unwrap();

    let since = Utc::now() - Duration::days(7);
    let instagram = store
        .raw_posts_since(since, Some(Platform::Instagram))
        .await
        .unwrap();
    assert_eq!(instagram.len(), 1);
    assert_eq!(instagram[0].post_id, "fresh");

    let all = store.raw_posts_since(since, None).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn hashtag_trend_overwrites_per_week_and_neighborhood() {
    let (_container, store) = postgres_container().await;

    let mut trend = HashtagTrend {
        hashtag: "streetstyle".to_string(),
        period: "2025-W49".to_string(),
        city: None,
        neighborhood: None,
        total_plays: 1000,
        total_likes: 100,
        total_shares: 10,
        post_count: 5,
        avg_engagement: 22.0,
        top_related_hashtags: vec!["ootd".to_string()],
    };
    store.upsert_hashtag_trend(&trend).await.unwrap();
    trend.total_plays = 5000;
    store.upsert_hashtag_trend(&trend).await.unwrap();

    let mut scoped = trend.clone();
    scoped.neighborhood = Some("Soho".to_string());
    scoped.total_plays = 10;
    store.upsert_hashtag_trend(&scoped).await.unwrap();

    let rows = store.hashtag_trends("2025-W49").await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].total_plays, 5000);
    assert_eq!(rows[0].neighborhood, None);
    assert_eq!(rows[1].neighborhood.as_deref(), Some("Soho"));
}

#[tokio::test]
async fn processed_trends_round_trip_and_order_by_rank() {
    let (_container, store) = postgres_container().await;

    let mut second = processed("Ballet Flats", 4, 2);
    second.change_percent = Some(-20.0);
    second.is_new = false;
    let mut brand = processed("Khaite", 3, 1);
    brand.trend_type = TrendType::Brand;
    brand.metadata = Some(serde_json::json!({"type": "luxury"}));

    store.upsert_processed_trend(&second).await.unwrap();
    store
        .upsert_processed_trend(&processed("Barrel Jeans", 5, 1))
        .await
        .unwrap();
    store.upsert_processed_trend(&brand).await.unwrap();

    let rows = store.processed_trends("2025-W49").await.unwrap();
    let names: Vec<&str> = rows.iter().map(|t| t.trend_name.as_str()).collect();
    assert_eq!(names, vec!["Khaite", "Barrel Jeans", "Ballet Flats"]);
    assert_eq!(rows[0].metadata, Some(serde_json::json!({"type": "luxury"})));
    assert_eq!(rows[2].change_percent, Some(-20.0));
    assert!(!rows[2].is_new);

    assert!(store.processed_trends("2025-W48").await.unwrap().is_empty());
}
