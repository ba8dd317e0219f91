//! Router-level tests: auth, configuration errors and response shapes.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use citytrends_api::{auth::CronAuth, router, AppState};
use citytrends_common::{HashtagTarget, LocationTarget, TargetsConfig};
use citytrends_pipeline::testing::{instagram_item, tiktok_item, KeywordExtractor, MockScraper};
use citytrends_pipeline::{PostScraper, TrendExtractor};
use citytrends_store::MemoryStore;

fn targets() -> TargetsConfig {
    TargetsConfig {
        locations: vec![LocationTarget {
            city: "Paris".to_string(),
            neighborhood: Some("Le Marais".to_string()),
            query: "Le Marais, Paris".to_string(),
        }],
        hashtags: vec![HashtagTarget {
            tag: "streetstyle".to_string(),
            city: None,
            neighborhood: None,
        }],
        ..Default::default()
    }
}

fn scraper() -> MockScraper {
    let captions = (0..12).map(|i| {
        let caption = if i < 5 { "barrel jeans again" } else { "coffee" };
        instagram_item(&format!("ig-{i}"), caption, 10, 2)
    });
    MockScraper::new()
        .on_location("Le Marais, Paris", captions.collect())
        .on_hashtag("streetstyle", vec![tiktok_item("tt-1", 500, 20, 3, &["ootd"])])
}

fn app(store: Arc<MemoryStore>, secret: Option<&str>, configured: bool) -> Router {
    let state = AppState {
        store,
        scraper: configured.then(|| Arc::new(scraper()) as Arc<dyn PostScraper>),
        extractor: configured.then(|| {
            Arc::new(KeywordExtractor::new().items(&["barrel jeans"])) as Arc<dyn TrendExtractor>
        }),
        targets: targets(),
        cron_auth: CronAuth::new(secret.map(str::to_string), false),
    };
    router(Arc::new(state))
}

async fn get(app: Router, uri: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn health_check() {
    let response = app(Arc::new(MemoryStore::new()), None, false)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn triggers_reject_missing_or_wrong_token() {
    for uri in [
        "/api/cron/collect-instagram",
        "/api/cron/collect-tiktok",
        "/api/cron/process-city-trends",
    ] {
        let store = Arc::new(MemoryStore::new());
        let (status, body) = get(app(store.clone(), Some("s3cret"), true), uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"], "Unauthorized");

        let (status, _) = get(app(store.clone(), Some("s3cret"), true), uri, Some("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert!(store.raw_posts().is_empty());
    }
}

#[tokio::test]
async fn unconfigured_providers_are_server_errors() {
    let store = Arc::new(MemoryStore::new());
    let (status, body) = get(app(store.clone(), None, false), "/api/cron/collect-instagram", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["details"].as_str().unwrap().contains("APIFY_API_TOKEN"));

    let (status, body) = get(app(store, None, false), "/api/cron/process-city-trends", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["details"].as_str().unwrap().contains("ANTHROPIC_API_KEY"));
}

#[tokio::test]
async fn collect_then_process_then_read() {
    let store = Arc::new(MemoryStore::new());

    let (status, body) = get(
        app(store.clone(), Some("s3cret"), true),
        "/api/cron/collect-instagram",
        Some("s3cret"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["instagram"]["total"], 12);
    assert_eq!(body["instagram"]["locations"][0]["target"], "Le Marais, Paris");
    assert_eq!(body["instagram"]["locations"][0]["postsSaved"], 12);

    // Raw tier before processing.
    let (status, view) = get(app(store.clone(), None, true), "/api/city-trends", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["hasProcessedData"], false);
    assert_eq!(view["cities"][0]["city"], "Paris");

    let (status, body) = get(
        app(store.clone(), Some("s3cret"), true),
        "/api/cron/process-city-trends",
        Some("s3cret"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"]["Paris"], 1);

    let (_, view) = get(app(store.clone(), None, true), "/api/city-trends", None).await;
    assert_eq!(view["hasProcessedData"], true);
    let hood = &view["neighborhoods"][0];
    assert_eq!(hood["name"], "Le Marais");
    assert_eq!(hood["garments"][0]["name"], "barrel jeans");
    assert_eq!(hood["garments"][0]["mentions"], 5);
    assert_eq!(hood["garments"][0]["isNew"], true);
}

#[tokio::test]
async fn tiktok_collection_reports_hashtags() {
    let store = Arc::new(MemoryStore::new());
    let (status, body) = get(app(store.clone(), None, true), "/api/cron/collect-tiktok", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tiktok"]["total"], 1);
    assert_eq!(body["tiktok"]["hashtags"][0]["target"], "streetstyle");
    assert_eq!(store.all_hashtag_trends().len(), 1);
}

#[tokio::test]
async fn read_failure_is_a_server_error() {
    let store = Arc::new(MemoryStore::new().failing_reads());
    let (status, body) = get(app(store, None, false), "/api/city-trends", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().is_some());
}
