use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // AI provider
    pub anthropic_api_key: String,
    pub anthropic_model: String,

    // Scraping
    pub scrape_api_url: String,
    pub scrape_api_token: Option<String>,

    // Web server
    pub host: String,
    pub port: u16,

    /// Base URL this service is reachable at, used for internal
    /// service-to-service calls (enrichment trigger).
    pub public_base_url: String,

    // Admin dashboard
    pub admin_username: String,
    pub admin_password: String,
    pub session_secret: String,

    /// Shared secret for trusted service-to-service calls.
    pub internal_secret: String,

    /// Outbound webhook for new-lead notifications. Optional.
    pub webhook_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .expect("PORT must be a number");

        Self {
            database_url: required_env("DATABASE_URL"),
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            scrape_api_url: required_env("SCRAPE_API_URL"),
            scrape_api_token: env::var("SCRAPE_API_TOKEN").ok(),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://127.0.0.1:{port}")),
            host,
            port,
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_password: required_env("ADMIN_PASSWORD"),
            session_secret: env::var("SESSION_SECRET").unwrap_or_default(),
            internal_secret: required_env("INTERNAL_SECRET"),
            webhook_url: env::var("WEBHOOK_URL").ok(),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
