// Downstream notification: trait boundary + HTTP implementation.
//
// The capture rule fires these without awaiting them on the response
// path. Production wires in HttpNotifier; tests use MockNotifier.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use leadline_common::LeadSource;

/// Payload forwarded to the outbound webhook when a new lead lands.
#[derive(Debug, Clone, Serialize)]
pub struct NewLeadNotification {
    pub lead_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub source: LeadSource,
    pub lead_score: i32,
    pub session_id: String,
}

/// Trait boundary for the capture rule's downstream side effects.
#[async_trait]
pub trait CaptureNotifier: Send + Sync {
    /// Forward a new-lead notification to the configured webhook.
    async fn lead_created(&self, notification: &NewLeadNotification) -> Result<()>;

    /// Kick off enrichment for a lead with a detected website.
    async fn enrichment_requested(&self, lead_id: Uuid, url: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// HttpNotifier (production)
// ---------------------------------------------------------------------------

pub struct HttpNotifier {
    http: reqwest::Client,
    webhook_url: Option<String>,
    enrich_endpoint: String,
    internal_secret: String,
}

impl HttpNotifier {
    pub fn new(
        webhook_url: Option<String>,
        public_base_url: &str,
        internal_secret: &str,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url,
            enrich_endpoint: format!("{}/api/enrich", public_base_url.trim_end_matches('/')),
            internal_secret: internal_secret.to_string(),
        }
    }
}

#[async_trait]
impl CaptureNotifier for HttpNotifier {
    async fn lead_created(&self, notification: &NewLeadNotification) -> Result<()> {
        let Some(ref url) = self.webhook_url else {
            return Ok(());
        };

        let resp = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .json(notification)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Webhook forward failed ({status}): {body}");
        }

        Ok(())
    }

    async fn enrichment_requested(&self, lead_id: Uuid, url: &str) -> Result<()> {
        let body = serde_json::json!({ "leadId": lead_id, "url": url });

        let resp = self
            .http
            .post(&self.enrich_endpoint)
            .header("Content-Type", "application/json")
            .header("x-internal-secret", &self.internal_secret)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Enrichment dispatch failed ({status}): {body}");
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockNotifier (for tests)
// ---------------------------------------------------------------------------

/// Records calls for test assertions.
#[derive(Default)]
pub struct MockNotifier {
    leads: Mutex<Vec<NewLeadNotification>>,
    enrichments: Mutex<Vec<(Uuid, String)>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leads(&self) -> Vec<NewLeadNotification> {
        self.leads.lock().unwrap().clone()
    }

    pub fn enrichments(&self) -> Vec<(Uuid, String)> {
        self.enrichments.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptureNotifier for MockNotifier {
    async fn lead_created(&self, notification: &NewLeadNotification) -> Result<()> {
        self.leads.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn enrichment_requested(&self, lead_id: Uuid, url: &str) -> Result<()> {
        self.enrichments
            .lock()
            .unwrap()
            .push((lead_id, url.to_string()));
        Ok(())
    }
}
