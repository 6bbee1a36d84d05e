use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use leadline_common::group_sessions;

use crate::auth::AdminSession;
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRequest {
    lead_id: Uuid,
}

/// Grouped conversations for the dashboard. Aggregation happens
/// server-side over the flat interaction table, so the result is
/// recomputable on every request.
pub async fn api_sessions(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    match state.store.all_interactions().await {
        Ok(interactions) => {
            let sessions = group_sessions(interactions);
            Json(serde_json::json!({ "sessions": sessions })).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to load sessions");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Attach a lead to every interaction of a session.
pub async fn api_link_session(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(body): Json<LinkRequest>,
) -> impl IntoResponse {
    match state.store.get_lead(body.lead_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to look up lead for linking");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match state
        .store
        .link_session_to_lead(&session_id, body.lead_id)
        .await
    {
        Ok(updated) => {
            info!(session_id, lead_id = %body.lead_id, updated, "Linked session to lead");
            Json(serde_json::json!({ "updated": updated })).into_response()
        }
        Err(e) => {
            warn!(error = %e, session_id, "Failed to link session");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
