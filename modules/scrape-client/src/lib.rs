//! Client for the rendered-content scraping API. One call: give it a
//! URL, get back page text.

pub mod error;

pub use error::{Result, ScrapeError};

use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct ScrapeClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ScrapeClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Fetch rendered page content for a URL via the /content endpoint.
    /// Returns the page text, or `EmptyContent` when the scrape came
    /// back blank.
    pub async fn content(&self, url: &str) -> Result<String> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = serde_json::json!({ "url": url });

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ScrapeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let content = resp.text().await?;
        if content.trim().is_empty() {
            return Err(ScrapeError::EmptyContent(url.to_string()));
        }
        Ok(content)
    }
}
