use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::warn;

use crate::auth::AdminSession;
use crate::AppState;

#[derive(Deserialize)]
pub struct SummaryQuery {
    days: Option<i32>,
}

/// Rollups behind the dashboard overview. Each panel's query failing
/// degrades only that panel to an empty series.
pub async fn api_analytics_summary(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryQuery>,
) -> impl IntoResponse {
    let days = params.days.unwrap_or(30).clamp(1, 365);

    let leads_per_day = match state.store.leads_per_day(days).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, "leads_per_day rollup failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let leads_by_source = state.store.leads_by_source().await.unwrap_or_else(|e| {
        warn!(error = %e, "leads_by_source rollup failed");
        Vec::new()
    });
    let sessions_per_day = state
        .store
        .page_sessions_per_day(days)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "page_sessions_per_day rollup failed");
            Vec::new()
        });
    let events_by_category = state.store.events_by_category().await.unwrap_or_else(|e| {
        warn!(error = %e, "events_by_category rollup failed");
        Vec::new()
    });

    Json(serde_json::json!({
        "days": days,
        "leadsPerDay": leads_per_day,
        "leadsBySource": leads_by_source,
        "pageSessionsPerDay": sessions_per_day,
        "eventsByCategory": events_by_category,
    }))
    .into_response()
}
