//! Website enrichment: scrape the lead's site, run structured
//! extraction over the text, and write back whatever came out.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use leadline_common::normalize_url;

use crate::AppState;

/// How much scraped text goes to the extraction model.
const EXCERPT_CHARS: usize = 6_000;

const EXTRACTION_SYSTEM: &str = "You are a business analyst. Extract structured facts about \
    the business described in the provided website text. Use only information present in the \
    text. Leave a field empty when the text does not support it.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichRequest {
    pub lead_id: Uuid,
    pub url: String,
}

/// Fields the extraction model fills in from the page text.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedBusiness {
    /// Industry or business category, e.g. "landscaping" or "law firm".
    #[serde(default)]
    pub industry: Option<String>,
    /// Contact phone number found on the site.
    #[serde(default)]
    pub phone: Option<String>,
    /// One or two sentences describing what the business does.
    #[serde(default)]
    pub summary: Option<String>,
}

/// Soft response shape: enrichment failure is reported in-band, never
/// as an HTTP error, because callers fire it and move on.
#[derive(Debug, Serialize)]
pub struct EnrichResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted: Option<ExtractedBusiness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnrichResponse {
    fn ok(extracted: ExtractedBusiness) -> Self {
        Self {
            success: true,
            extracted: Some(extracted),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            extracted: None,
            error: Some(error.into()),
        }
    }
}

/// Run the full enrichment pipeline for one lead.
pub async fn enrich_lead(state: &AppState, lead_id: Uuid, url: &str) -> EnrichResponse {
    let url = normalize_url(url);

    let content = match state.scraper.content(&url).await {
        Ok(content) => content,
        Err(e) => {
            warn!(%lead_id, url, error = %e, "Enrichment scrape failed");
            return EnrichResponse::failed(format!("Scrape failed: {e}"));
        }
    };

    let excerpt = excerpt(&content, EXCERPT_CHARS);
    let prompt = format!("Website text for {url}:\n\n{excerpt}");

    let extracted: ExtractedBusiness = match state.ai.extract(EXTRACTION_SYSTEM, prompt).await {
        Ok(extracted) => extracted,
        Err(e) => {
            warn!(%lead_id, url, error = %e, "Enrichment extraction failed");
            return EnrichResponse::failed(format!("Extraction failed: {e}"));
        }
    };

    let industry = non_empty(extracted.industry.as_deref());
    let phone = non_empty(extracted.phone.as_deref());
    let summary = non_empty(extracted.summary.as_deref());

    if let Err(e) = state
        .store
        .apply_enrichment(lead_id, industry, phone, summary)
        .await
    {
        warn!(%lead_id, error = %e, "Enrichment writeback failed");
        return EnrichResponse::failed(format!("Writeback failed: {e}"));
    }

    info!(
        %lead_id,
        url,
        industry = industry.unwrap_or("-"),
        "Lead enriched"
    );
    EnrichResponse::ok(extracted)
}

/// First `max` characters of `s`, cut on a char boundary.
fn excerpt(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_respects_char_boundaries() {
        let s = "héllo wörld".repeat(1_000);
        let cut = excerpt(&s, 6_000);
        assert_eq!(cut.chars().count(), 6_000);
        assert!(s.starts_with(cut));
    }

    #[test]
    fn excerpt_returns_short_input_whole() {
        assert_eq!(excerpt("short", 6_000), "short");
    }

    #[test]
    fn non_empty_filters_blank_values() {
        assert_eq!(non_empty(Some("landscaping")), Some("landscaping"));
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(Some("")), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn request_accepts_camel_case() {
        let req: EnrichRequest = serde_json::from_str(
            r#"{"leadId":"5a3aa638-7e63-4a07-9c07-0a2d4325a35a","url":"dana-designs.io"}"#,
        )
        .unwrap();
        assert_eq!(req.url, "dana-designs.io");
    }

    #[test]
    fn extracted_fields_default_to_none() {
        let extracted: ExtractedBusiness = serde_json::from_str("{}").unwrap();
        assert!(extracted.industry.is_none());
        assert!(extracted.phone.is_none());
        assert!(extracted.summary.is_none());
    }
}
