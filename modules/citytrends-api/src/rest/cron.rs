//! Scheduled trigger endpoints. Each runs one job to completion and reports
//! per-target results; per-target failures never turn into an HTTP error.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use tracing::{info, warn};

use citytrends_pipeline::{InstagramCollector, TikTokCollector, TrendProcessor};

use super::error_response;
use crate::AppState;

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "Unauthorized" })),
    )
        .into_response()
}

fn not_configured(what: &str, env_var: &str) -> Response {
    warn!(env_var, "{what} not configured");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &format!("{what} not configured"),
        format!("{env_var} is not set"),
    )
}

pub async fn collect_instagram(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if !state.cron_auth.authorize(&headers) {
        return unauthorized();
    }
    let Some(scraper) = state.scraper.clone() else {
        return not_configured("Scraper", "APIFY_API_TOKEN");
    };

    let collector = InstagramCollector::new(
        scraper,
        state.store.clone(),
        state.targets.collect.clone(),
    );
    let report = collector.run(&state.targets.locations, Utc::now()).await;
    info!(total = report.total, failed = report.failed_targets(), "Instagram collection finished");

    Json(serde_json::json!({
        "success": true,
        "message": format!(
            "Collected {} Instagram posts from {} locations",
            report.total,
            report.targets.len()
        ),
        "instagram": {
            "total": report.total,
            "locations": report.targets,
        },
        "timestamp": Utc::now().to_rfc3339(),
    }))
    .into_response()
}

pub async fn collect_tiktok(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if !state.cron_auth.authorize(&headers) {
        return unauthorized();
    }
    let Some(scraper) = state.scraper.clone() else {
        return not_configured("Scraper", "APIFY_API_TOKEN");
    };

    let collector = TikTokCollector::new(
        scraper,
        state.store.clone(),
        state.targets.collect.clone(),
    );
    let report = collector.run(&state.targets.hashtags, Utc::now()).await;
    info!(total = report.total, failed = report.failed_targets(), "TikTok collection finished");

    Json(serde_json::json!({
        "success": true,
        "message": format!(
            "Collected {} TikTok posts from {} hashtags",
            report.total,
            report.targets.len()
        ),
        "tiktok": {
            "total": report.total,
            "hashtags": report.targets,
        },
        "timestamp": Utc::now().to_rfc3339(),
    }))
    .into_response()
}

pub async fn process_city_trends(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if !state.cron_auth.authorize(&headers) {
        return unauthorized();
    }
    let Some(extractor) = state.extractor.clone() else {
        return not_configured("Trend extractor", "ANTHROPIC_API_KEY");
    };

    let processor = TrendProcessor::new(
        state.store.clone(),
        extractor,
        state.targets.process.clone(),
    );
    match processor.run(Utc::now()).await {
        Ok(report) => Json(serde_json::json!({
            "success": true,
            "message": format!(
                "Processed {} cities, {} trends written",
                report.results.len(),
                report.total_rows()
            ),
            "period": report.period,
            "results": report.results,
            "skipped": report.skipped,
            "timestamp": Utc::now().to_rfc3339(),
        }))
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Trend processing failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Trend processing failed",
                format!("{e:#}"),
            )
        }
    }
}
