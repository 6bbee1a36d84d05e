use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::{delete, get, post},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use ai_client::Anthropic;
use leadline_common::Config;
use scrape_client::ScrapeClient;

pub mod auth;
pub mod capture;
pub mod enrich;
pub mod notify;
pub mod rest;
pub mod store;
#[cfg(feature = "test-utils")]
pub mod testutil;

use notify::CaptureNotifier;
use store::Store;

pub struct AppState {
    pub store: Store,
    pub ai: Anthropic,
    pub scraper: ScrapeClient,
    pub notifier: Arc<dyn CaptureNotifier>,
    pub http: reqwest::Client,
    pub config: Config,
}

/// Assemble the full route table and middleware stack.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Chat
        .route("/api/chat", post(rest::chat::api_chat))
        // Leads
        .route(
            "/api/leads",
            post(rest::leads::api_create_lead).get(rest::leads::api_list_leads),
        )
        .route("/api/leads/export", get(rest::leads::api_export_leads))
        .route("/api/leads/{id}/archive", post(rest::leads::api_archive_lead))
        .route(
            "/api/leads/{id}/unarchive",
            post(rest::leads::api_unarchive_lead),
        )
        .route("/api/leads/{id}", delete(rest::leads::api_delete_lead))
        // Sessions
        .route("/api/sessions", get(rest::sessions::api_sessions))
        .route(
            "/api/sessions/{session_id}/link",
            post(rest::sessions::api_link_session),
        )
        // Analytics
        .route(
            "/api/analytics/summary",
            get(rest::analytics::api_analytics_summary),
        )
        // Telemetry
        .route("/api/page-sessions", post(rest::telemetry::api_page_session))
        .route("/api/events", post(rest::telemetry::api_event))
        // Internal (shared-secret) endpoints
        .route("/api/enrich", post(rest::internal::api_enrich))
        .route("/api/scrape", post(rest::internal::api_scrape))
        .route(
            "/api/webhook-forward",
            post(rest::internal::api_webhook_forward),
        )
        // Admin auth
        .route("/admin/login", post(rest::admin::api_login))
        .route("/admin/logout", post(rest::admin::api_logout))
        .route("/admin/me", get(rest::admin::api_me))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Lead data must never land in shared caches
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path + status + latency only
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
