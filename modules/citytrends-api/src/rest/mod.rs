pub mod cron;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use tracing::warn;

use citytrends_pipeline::city_trends;

use crate::AppState;

// --- Helpers ---

pub(crate) fn error_response(status: StatusCode, error: &str, details: impl ToString) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "details": details.to_string(),
        })),
    )
        .into_response()
}

// --- Handlers ---

pub async fn api_city_trends(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match city_trends(state.store.as_ref(), Utc::now()).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load city trends");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch city trends",
                format!("{e:#}"),
            )
        }
    }
}
