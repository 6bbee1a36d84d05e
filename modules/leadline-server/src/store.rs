// Postgres persistence. Row structs stay private to this module; the
// rest of the crate works with the domain types from leadline-common.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use leadline_common::{
    ChatInteraction, InteractionMetadata, IntentSignals, Lead, LeadSource, LeadlineError,
    Qualification, COOL_MIN, HOT_MIN, WARM_MIN,
};

pub type Result<T> = std::result::Result<T, LeadlineError>;

fn db_err(e: sqlx::Error) -> LeadlineError {
    LeadlineError::Database(e.to_string())
}

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

// --- Rows ---

#[derive(Debug, sqlx::FromRow)]
struct LeadRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    name: String,
    email: String,
    phone: Option<String>,
    website: Option<String>,
    industry: Option<String>,
    source: String,
    lead_score: i32,
    notes: Option<String>,
    summary: Option<String>,
    intent_signals: serde_json::Value,
    message_count: i32,
    archived: bool,
    questionnaire: Option<serde_json::Value>,
}

impl From<LeadRow> for Lead {
    fn from(row: LeadRow) -> Self {
        Lead {
            id: row.id,
            created_at: row.created_at,
            name: row.name,
            email: row.email,
            phone: row.phone,
            website: row.website,
            industry: row.industry,
            source: LeadSource::from_str_loose(&row.source),
            lead_score: row.lead_score,
            notes: row.notes,
            summary: row.summary,
            intent_signals: serde_json::from_value::<IntentSignals>(row.intent_signals)
                .unwrap_or_default(),
            message_count: row.message_count,
            archived: row.archived,
            questionnaire: row.questionnaire,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InteractionRow {
    id: Uuid,
    session_id: String,
    interaction_type: String,
    user_message: Option<String>,
    assistant_message: Option<String>,
    scraped_url: Option<String>,
    lead_id: Option<Uuid>,
    metadata: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl From<InteractionRow> for ChatInteraction {
    fn from(row: InteractionRow) -> Self {
        ChatInteraction {
            id: row.id,
            session_id: row.session_id,
            interaction_type: row.interaction_type,
            user_message: row.user_message,
            assistant_message: row.assistant_message,
            scraped_url: row.scraped_url,
            lead_id: row.lead_id,
            metadata: row.metadata.map(InteractionMetadata::from_value),
            created_at: row.created_at,
        }
    }
}

// --- Insert parameter structs ---

/// Parameters for the capture rule's atomic upsert, keyed on email.
#[derive(Debug, Clone)]
pub struct CaptureUpsert {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub source: LeadSource,
    pub lead_score: i32,
    pub notes: Option<String>,
    pub message_count: i32,
}

/// Parameters for a direct (form-submission) lead insert.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub source: LeadSource,
    pub lead_score: i32,
    pub notes: Option<String>,
    pub intent_signals: IntentSignals,
    pub questionnaire: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct NewInteraction {
    pub session_id: String,
    pub interaction_type: String,
    pub user_message: Option<String>,
    pub assistant_message: Option<String>,
    pub scraped_url: Option<String>,
    pub lead_id: Option<Uuid>,
    pub metadata: Option<InteractionMetadata>,
}

#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub source: Option<LeadSource>,
    pub qualification: Option<Qualification>,
    pub archived: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPageSession {
    pub session_id: String,
    pub device: Option<String>,
    pub referrer: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub landing_path: Option<String>,
    pub scroll_depth: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub session_id: String,
    pub event_name: String,
    pub category: Option<String>,
    pub payload: Option<serde_json::Value>,
}

/// One bucket of a per-day rollup.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct KeyCount {
    pub key: String,
    pub count: i64,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(db_err)?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LeadlineError::Database(e.to_string()))?;
        Ok(())
    }

    // --- Leads: capture path ---

    /// Atomic create-or-update keyed on email. Replaces the racy
    /// lookup-then-insert: two concurrent captures for one email land
    /// on the same row, and the score can only ratchet upward.
    ///
    /// Returns `(lead_id, created)`; `xmax = 0` distinguishes a fresh
    /// insert from a conflict-update.
    pub async fn upsert_lead_by_email(&self, u: &CaptureUpsert) -> Result<(Uuid, bool)> {
        let row = sqlx::query_as::<_, (Uuid, bool)>(
            r#"
            INSERT INTO leads (name, email, phone, website, source, lead_score, notes, message_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO UPDATE SET
                website = COALESCE(leads.website, EXCLUDED.website),
                phone = COALESCE(EXCLUDED.phone, leads.phone),
                lead_score = GREATEST(leads.lead_score, EXCLUDED.lead_score),
                message_count = GREATEST(leads.message_count, EXCLUDED.message_count)
            RETURNING id, (xmax = 0) AS created
            "#,
        )
        .bind(&u.name)
        .bind(&u.email)
        .bind(&u.phone)
        .bind(&u.website)
        .bind(u.source.to_string())
        .bind(u.lead_score)
        .bind(&u.notes)
        .bind(u.message_count)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row)
    }

    /// Move a session-keyed placeholder lead onto the real email once
    /// one is observed. No-op when a lead with that email already
    /// exists (the upsert path handles it) or no placeholder is found.
    pub async fn reconcile_placeholder(
        &self,
        session_key: &str,
        email: &str,
    ) -> Result<Option<Uuid>> {
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE leads SET email = $2
            WHERE notes = $1
              AND email LIKE 'chat-%@placeholder.%'
              AND NOT EXISTS (SELECT 1 FROM leads other WHERE other.email = $2)
            RETURNING id
            "#,
        )
        .bind(session_key)
        .bind(email)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(id) => Ok(id),
            // A concurrent insert of the same email can still beat the
            // NOT EXISTS check; the unique constraint rejects us and
            // the upsert path takes over.
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    // --- Leads: dashboard ---

    pub async fn insert_lead(&self, lead: &NewLead) -> Result<Lead> {
        let row = sqlx::query_as::<_, LeadRow>(
            r#"
            INSERT INTO leads (name, email, phone, website, source, lead_score, notes, intent_signals, questionnaire)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.website)
        .bind(lead.source.to_string())
        .bind(lead.lead_score)
        .bind(&lead.notes)
        .bind(serde_json::to_value(lead.intent_signals).unwrap_or_default())
        .bind(&lead.questionnaire)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LeadlineError::Validation(format!("A lead with email {} already exists", lead.email))
            } else {
                db_err(e)
            }
        })?;

        Ok(row.into())
    }

    pub async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>> {
        let row = sqlx::query_as::<_, LeadRow>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    /// Filtered lead listing, newest first. The qualification filter
    /// translates to a score range so the tier mapping stays in one
    /// place (leadline-common::scoring).
    pub async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>> {
        let (min_score, max_score) = match filter.qualification {
            Some(Qualification::Hot) => (Some(HOT_MIN), None),
            Some(Qualification::Warm) => (Some(WARM_MIN), Some(HOT_MIN)),
            Some(Qualification::Cool) => (Some(COOL_MIN), Some(WARM_MIN)),
            Some(Qualification::Cold) => (None, Some(COOL_MIN)),
            None => (None, None),
        };

        let rows = sqlx::query_as::<_, LeadRow>(
            r#"
            SELECT * FROM leads
            WHERE ($1::text IS NULL OR source = $1)
              AND ($2::int IS NULL OR lead_score >= $2)
              AND ($3::int IS NULL OR lead_score < $3)
              AND ($4::bool IS NULL OR archived = $4)
              AND ($5::text IS NULL OR name ILIKE '%' || $5 || '%' OR email ILIKE '%' || $5 || '%')
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.source.map(|s| s.to_string()))
        .bind(min_score)
        .bind(max_score)
        .bind(filter.archived)
        .bind(&filter.search)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Returns false when the lead does not exist.
    pub async fn set_archived(&self, id: Uuid, archived: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE leads SET archived = $2 WHERE id = $1")
            .bind(id)
            .bind(archived)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_lead(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    /// Enrichment writeback: overwrite only the fields that came back
    /// non-empty. Writes summary, never notes; notes may still hold the
    /// session key that reconciliation matches on.
    pub async fn apply_enrichment(
        &self,
        id: Uuid,
        industry: Option<&str>,
        phone: Option<&str>,
        summary: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE leads SET
                industry = COALESCE($2, industry),
                phone = COALESCE($3, phone),
                summary = COALESCE($4, summary)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(industry)
        .bind(phone)
        .bind(summary)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    // --- Interactions ---

    /// Record a chat interaction. Logs a warning on failure rather than
    /// propagating; a failed write must not break the chat stream.
    pub async fn insert_interaction_best_effort(&self, i: &NewInteraction) -> Option<Uuid> {
        match self.insert_interaction(i).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(session_id = %i.session_id, error = %e, "Failed to record chat interaction");
                None
            }
        }
    }

    pub async fn insert_interaction(&self, i: &NewInteraction) -> Result<Uuid> {
        let metadata = i
            .metadata
            .as_ref()
            .map(|m| serde_json::to_value(m).unwrap_or_default());

        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO chat_interactions
                (session_id, interaction_type, user_message, assistant_message,
                 scraped_url, lead_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&i.session_id)
        .bind(&i.interaction_type)
        .bind(&i.user_message)
        .bind(&i.assistant_message)
        .bind(&i.scraped_url)
        .bind(i.lead_id)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn all_interactions(&self) -> Result<Vec<ChatInteraction>> {
        let rows = sqlx::query_as::<_, InteractionRow>(
            "SELECT * FROM chat_interactions ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Attach a lead to every interaction of a session. The only
    /// mutation the append-only interaction table allows.
    pub async fn link_session_to_lead(&self, session_id: &str, lead_id: Uuid) -> Result<u64> {
        let result =
            sqlx::query("UPDATE chat_interactions SET lead_id = $2 WHERE session_id = $1")
                .bind(session_id)
                .bind(lead_id)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    // --- Telemetry ---

    pub async fn insert_page_session(&self, s: &NewPageSession) -> Result<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO page_sessions
                (session_id, device, referrer, utm_source, utm_medium, utm_campaign,
                 landing_path, scroll_depth)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&s.session_id)
        .bind(&s.device)
        .bind(&s.referrer)
        .bind(&s.utm_source)
        .bind(&s.utm_medium)
        .bind(&s.utm_campaign)
        .bind(&s.landing_path)
        .bind(s.scroll_depth)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn insert_event(&self, e: &NewEvent) -> Result<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO analytics_events (session_id, event_name, category, payload)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&e.session_id)
        .bind(&e.event_name)
        .bind(&e.category)
        .bind(&e.payload)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    // --- Analytics rollups ---

    pub async fn leads_per_day(&self, days: i32) -> Result<Vec<DayCount>> {
        let rows = sqlx::query_as::<_, (NaiveDate, i64)>(
            r#"
            SELECT created_at::date AS day, COUNT(*) AS count
            FROM leads
            WHERE created_at >= now() - ($1 || ' days')::interval
            GROUP BY day ORDER BY day
            "#,
        )
        .bind(days.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|(day, count)| DayCount { day, count })
            .collect())
    }

    pub async fn leads_by_source(&self) -> Result<Vec<KeyCount>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT source, COUNT(*) FROM leads GROUP BY source ORDER BY COUNT(*) DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|(key, count)| KeyCount { key, count })
            .collect())
    }

    pub async fn page_sessions_per_day(&self, days: i32) -> Result<Vec<DayCount>> {
        let rows = sqlx::query_as::<_, (NaiveDate, i64)>(
            r#"
            SELECT created_at::date AS day, COUNT(*) AS count
            FROM page_sessions
            WHERE created_at >= now() - ($1 || ' days')::interval
            GROUP BY day ORDER BY day
            "#,
        )
        .bind(days.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|(day, count)| DayCount { day, count })
            .collect())
    }

    pub async fn events_by_category(&self) -> Result<Vec<KeyCount>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT COALESCE(category, 'uncategorized'), COUNT(*)
            FROM analytics_events
            GROUP BY 1 ORDER BY COUNT(*) DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|(key, count)| KeyCount { key, count })
            .collect())
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}
