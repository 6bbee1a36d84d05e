//! Service-to-service endpoints. All of these require the internal
//! shared secret; upstream failures come back as soft
//! `{success:false}` bodies because callers fire and forget.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::warn;

use leadline_common::normalize_url;

use crate::auth::InternalAuth;
use crate::enrich::{enrich_lead, EnrichRequest};
use crate::AppState;

#[derive(Deserialize)]
pub struct ScrapeRequest {
    url: String,
}

pub async fn api_enrich(
    _auth: InternalAuth,
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    let req: EnrichRequest = match serde_json::from_value(body) {
        Ok(req) => req,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "leadId and url are required"})),
            )
                .into_response();
        }
    };
    if req.url.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "url must not be empty"})),
        )
            .into_response();
    }

    match state.store.get_lead(req.lead_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(error = %e, lead_id = %req.lead_id, "Failed to look up lead for enrichment");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    Json(enrich_lead(&state, req.lead_id, &req.url).await).into_response()
}

pub async fn api_scrape(
    _auth: InternalAuth,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScrapeRequest>,
) -> impl IntoResponse {
    if body.url.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "url must not be empty"})),
        )
            .into_response();
    }
    let url = normalize_url(body.url.trim());

    match state.scraper.content(&url).await {
        Ok(content) => Json(serde_json::json!({
            "success": true,
            "content": content,
        }))
        .into_response(),
        Err(e) => {
            warn!(url, error = %e, "Scrape request failed");
            Json(serde_json::json!({
                "success": false,
                "error": e.to_string(),
            }))
            .into_response()
        }
    }
}

/// Relay an arbitrary JSON payload to the configured outbound webhook.
pub async fn api_webhook_forward(
    _auth: InternalAuth,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> impl IntoResponse {
    let Some(ref webhook_url) = state.config.webhook_url else {
        return Json(serde_json::json!({
            "success": false,
            "error": "No webhook configured",
        }))
        .into_response();
    };

    let result = state
        .http
        .post(webhook_url)
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await;

    match result {
        Ok(resp) if resp.status().is_success() => {
            Json(serde_json::json!({"success": true})).into_response()
        }
        Ok(resp) => {
            let status = resp.status();
            warn!(%status, "Webhook forward rejected");
            Json(serde_json::json!({
                "success": false,
                "error": format!("Webhook responded with {status}"),
            }))
            .into_response()
        }
        Err(e) => {
            warn!(error = %e, "Webhook forward failed");
            Json(serde_json::json!({
                "success": false,
                "error": e.to_string(),
            }))
            .into_response()
        }
    }
}
