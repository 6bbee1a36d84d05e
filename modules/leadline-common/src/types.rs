use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Acquisition sources ---

/// Where a lead entered the funnel. Unrecognized tags map to `Other`,
/// which contributes nothing to the lead score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    HeroModal,
    ProjectPlanModal,
    Chatbot,
    ChatbotWithUrl,
    UseCasePage,
    RestaurantPage,
    SalonPage,
    ContractorPage,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for LeadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeadSource::HeroModal => write!(f, "hero_modal"),
            LeadSource::ProjectPlanModal => write!(f, "project_plan_modal"),
            LeadSource::Chatbot => write!(f, "chatbot"),
            LeadSource::ChatbotWithUrl => write!(f, "chatbot_with_url"),
            LeadSource::UseCasePage => write!(f, "use_case_page"),
            LeadSource::RestaurantPage => write!(f, "restaurant_page"),
            LeadSource::SalonPage => write!(f, "salon_page"),
            LeadSource::ContractorPage => write!(f, "contractor_page"),
            LeadSource::Other => write!(f, "other"),
        }
    }
}

impl Default for LeadSource {
    fn default() -> Self {
        LeadSource::Other
    }
}

impl LeadSource {
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "hero_modal" => Self::HeroModal,
            "project_plan_modal" => Self::ProjectPlanModal,
            "chatbot" => Self::Chatbot,
            "chatbot_with_url" => Self::ChatbotWithUrl,
            "use_case_page" => Self::UseCasePage,
            "restaurant_page" => Self::RestaurantPage,
            "salon_page" => Self::SalonPage,
            "contractor_page" => Self::ContractorPage,
            _ => Self::Other,
        }
    }
}

// --- Qualification tiers ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Qualification {
    Hot,
    Warm,
    Cool,
    Cold,
}

impl std::fmt::Display for Qualification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Qualification::Hot => write!(f, "hot"),
            Qualification::Warm => write!(f, "warm"),
            Qualification::Cool => write!(f, "cool"),
            Qualification::Cold => write!(f, "cold"),
        }
    }
}

// --- Intent signals ---

/// Sparse flag set over conversational intent. Absent flags score the
/// same as explicit false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentSignals {
    #[serde(default)]
    pub pricing: bool,
    #[serde(default)]
    pub timeline: bool,
    #[serde(default)]
    pub specific_service: bool,
    #[serde(default)]
    pub urgency: bool,
}

// --- Lead ---

/// A prospective customer record. Email is unique at the store level;
/// at most one lead per email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub source: LeadSource,
    pub lead_score: i32,
    /// Free text; the capture rule stashes a session key here until a
    /// real email is observed. Enrichment never writes this field.
    pub notes: Option<String>,
    /// One-paragraph business description produced by enrichment.
    pub summary: Option<String>,
    pub intent_signals: IntentSignals,
    pub message_count: i32,
    pub archived: bool,
    /// Structured questionnaire answers for the project-plan path.
    pub questionnaire: Option<serde_json::Value>,
}

// --- Chat conversation types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Contact fields collected over the course of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Structured interaction payload. Every field tolerates absence so a
/// malformed or legacy payload collapses to the empty default instead
/// of failing the whole row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionMetadata {
    #[serde(default)]
    pub conversation: Vec<ChatTurn>,
    #[serde(default)]
    pub collected: CollectedData,
    #[serde(default)]
    pub step: Option<String>,
    /// Point-in-time lead score snapshot.
    #[serde(default)]
    pub lead_score: Option<i32>,
}

impl InteractionMetadata {
    /// Parse from a raw JSON value, falling back to the empty default.
    pub fn from_value(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.conversation.is_empty()
            && self.collected == CollectedData::default()
            && self.step.is_none()
            && self.lead_score.is_none()
    }
}

/// One atomic turn or event in a conversation. Append-only; only
/// `lead_id` is ever attached after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInteraction {
    pub id: Uuid,
    /// Opaque string correlating turns into one conversation.
    pub session_id: String,
    pub interaction_type: String,
    pub user_message: Option<String>,
    pub assistant_message: Option<String>,
    pub scraped_url: Option<String>,
    pub lead_id: Option<Uuid>,
    pub metadata: Option<InteractionMetadata>,
    pub created_at: DateTime<Utc>,
}

// --- Grouped session (derived, not persisted) ---

/// The dashboard's reconstruction of one logical conversation from the
/// flat interaction table.
#[derive(Debug, Clone, Serialize)]
pub struct GroupedSession {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub interaction_count: usize,
    pub lead_id: Option<Uuid>,
    pub display_name: Option<String>,
    pub first_message: Option<String>,
    pub conversation: Vec<ChatTurn>,
    pub has_url_scraped: bool,
    pub collected: CollectedData,
}

// --- Telemetry rows ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSession {
    pub id: Uuid,
    pub session_id: String,
    pub device: Option<String>,
    pub referrer: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub landing_path: Option<String>,
    pub scroll_depth: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub session_id: String,
    pub event_name: String,
    pub category: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
