use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use citytrends_common::TargetsConfig;
use citytrends_pipeline::{PostScraper, TrendExtractor};
use citytrends_store::TrendStore;

pub mod auth;
pub mod rest;

use auth::CronAuth;

pub struct AppState {
    pub store: Arc<dyn TrendStore>,
    /// `None` when APIFY_API_TOKEN is unset.
    pub scraper: Option<Arc<dyn PostScraper>>,
    /// `None` when ANTHROPIC_API_KEY is unset.
    pub extractor: Option<Arc<dyn TrendExtractor>>,
    pub targets: TargetsConfig,
    pub cron_auth: CronAuth,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/api/city-trends", get(rest::api_city_trends))
        .route("/api/cron/collect-instagram", get(rest::cron::collect_instagram))
        .route("/api/cron/collect-tiktok", get(rest::cron::collect_tiktok))
        .route(
            "/api/cron/process-city-trends",
            get(rest::cron::process_city_trends),
        )
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path + status + latency
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
