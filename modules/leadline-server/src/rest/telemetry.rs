use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::warn;

use crate::store::{NewEvent, NewPageSession};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSessionRequest {
    session_id: String,
    device: Option<String>,
    referrer: Option<String>,
    utm_source: Option<String>,
    utm_medium: Option<String>,
    utm_campaign: Option<String>,
    landing_path: Option<String>,
    scroll_depth: Option<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    session_id: String,
    event_name: String,
    category: Option<String>,
    payload: Option<serde_json::Value>,
}

pub async fn api_page_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PageSessionRequest>,
) -> impl IntoResponse {
    if body.session_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "sessionId is required"})),
        )
            .into_response();
    }

    let row = NewPageSession {
        session_id: body.session_id,
        device: body.device,
        referrer: body.referrer,
        utm_source: body.utm_source,
        utm_medium: body.utm_medium,
        utm_campaign: body.utm_campaign,
        landing_path: body.landing_path,
        scroll_depth: body.scroll_depth,
    };

    match state.store.insert_page_session(&row).await {
        Ok(id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": id })),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to record page session");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_event(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EventRequest>,
) -> impl IntoResponse {
    if body.session_id.trim().is_empty() || body.event_name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "sessionId and eventName are required"})),
        )
            .into_response();
    }

    let row = NewEvent {
        session_id: body.session_id,
        event_name: body.event_name,
        category: body.category,
        payload: body.payload,
    };

    match state.store.insert_event(&row).await {
        Ok(id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": id })),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to record event");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
