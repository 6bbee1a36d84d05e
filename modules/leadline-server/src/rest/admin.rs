use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::{
    clear_session_cookie, constant_time_eq, session_cookie, session_secret, AdminSession,
};
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

pub async fn api_login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> impl IntoResponse {
    let username_ok = constant_time_eq(
        body.username.as_bytes(),
        state.config.admin_username.as_bytes(),
    );
    let password_ok = constant_time_eq(
        body.password.as_bytes(),
        state.config.admin_password.as_bytes(),
    );

    if !(username_ok && password_ok) {
        warn!("Failed admin login attempt");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "Invalid credentials"})),
        )
            .into_response();
    }

    info!(username = %body.username, "Admin logged in");
    let cookie = session_cookie(&body.username, session_secret(&state.config));
    (
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({"success": true})),
    )
        .into_response()
}

pub async fn api_logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(serde_json::json!({"success": true})),
    )
}

/// Who am I, for the dashboard shell.
pub async fn api_me(admin: AdminSession) -> impl IntoResponse {
    Json(serde_json::json!({ "username": admin.username }))
}
