use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use leadline_common::{
    export::{export_filename, leads_csv},
    normalize_url, score, IntentSignals, LeadFeatures, LeadSource, LeadlineError, Qualification,
};

use crate::auth::AdminSession;
use crate::store::{LeadFilter, NewLead};
use crate::AppState;

// --- Request/query structs ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    name: String,
    email: String,
    phone: Option<String>,
    website: Option<String>,
    source: Option<String>,
    notes: Option<String>,
    #[serde(default)]
    intent_signals: IntentSignals,
    questionnaire: Option<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct LeadsQuery {
    source: Option<String>,
    qualification: Option<String>,
    archived: Option<bool>,
    search: Option<String>,
}

impl LeadsQuery {
    fn filter(&self) -> LeadFilter {
        LeadFilter {
            source: self.source.as_deref().map(LeadSource::from_str_loose),
            qualification: self.qualification.as_deref().and_then(parse_qualification),
            archived: self.archived,
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        }
    }
}

fn parse_qualification(s: &str) -> Option<Qualification> {
    match s {
        "hot" => Some(Qualification::Hot),
        "warm" => Some(Qualification::Warm),
        "cool" => Some(Qualification::Cool),
        "cold" => Some(Qualification::Cold),
        _ => None,
    }
}

/// Serialize a lead with its derived qualification attached.
fn lead_json(lead: &leadline_common::Lead) -> serde_json::Value {
    let mut value = serde_json::to_value(lead).unwrap_or_default();
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "qualification".to_string(),
            serde_json::json!(lead.qualification()),
        );
    }
    value
}

// --- Handlers ---

/// Public insert for form-submission paths (hero modal, project plan).
pub async fn api_create_lead(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateLeadRequest>,
) -> impl IntoResponse {
    let name = body.name.trim().to_string();
    let email = body.email.trim().to_lowercase();

    if name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Name is required"})),
        )
            .into_response();
    }
    if email.is_empty() || !email.contains('@') {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "A valid email is required"})),
        )
            .into_response();
    }

    let website = match body.website.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => {
            let normalized = normalize_url(raw);
            if url::Url::parse(&normalized).is_err() {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": "Invalid website URL"})),
                )
                    .into_response();
            }
            Some(normalized)
        }
        None => None,
    };

    let source = body
        .source
        .as_deref()
        .map(LeadSource::from_str_loose)
        .unwrap_or_default();

    let lead_score = score(&LeadFeatures {
        source,
        message_count: None,
        intent: body.intent_signals,
        has_website: Some(website.is_some()),
        has_ai_feedback: None,
    });

    let new_lead = NewLead {
        name,
        email,
        phone: body.phone.filter(|p| !p.trim().is_empty()),
        website,
        source,
        lead_score,
        notes: body.notes,
        intent_signals: body.intent_signals,
        questionnaire: body.questionnaire,
    };

    match state.store.insert_lead(&new_lead).await {
        Ok(lead) => {
            info!(lead_id = %lead.id, source = %lead.source, score = lead.lead_score, "Lead submitted");
            (StatusCode::CREATED, Json(lead_json(&lead))).into_response()
        }
        Err(LeadlineError::Validation(message)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": message})),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to insert lead");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_list_leads(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeadsQuery>,
) -> impl IntoResponse {
    match state.store.list_leads(&params.filter()).await {
        Ok(leads) => {
            let items: Vec<serde_json::Value> = leads.iter().map(lead_json).collect();
            Json(serde_json::json!({ "leads": items })).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to list leads");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_export_leads(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeadsQuery>,
) -> impl IntoResponse {
    match state.store.list_leads(&params.filter()).await {
        Ok(leads) => {
            let csv = leads_csv(&leads);
            let filename = export_filename(chrono::Utc::now().date_naive());
            let disposition = format!("attachment; filename=\"{filename}\"");
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                csv,
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to export leads");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_archive_lead(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    set_archived(&state, &id, true).await
}

pub async fn api_unarchive_lead(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    set_archived(&state, &id, false).await
}

async fn set_archived(state: &AppState, id: &str, archived: bool) -> axum::response::Response {
    let uuid = match Uuid::parse_str(id) {
        Ok(u) => u,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    match state.store.set_archived(uuid, archived).await {
        Ok(true) => Json(serde_json::json!({"success": true})).into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(error = %e, lead_id = %uuid, "Failed to update archived flag");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_delete_lead(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let uuid = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    match state.store.delete_lead(uuid).await {
        Ok(true) => {
            info!(lead_id = %uuid, "Lead deleted");
            Json(serde_json::json!({"success": true})).into_response()
        }
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(error = %e, lead_id = %uuid, "Failed to delete lead");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
