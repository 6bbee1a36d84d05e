//! Automatic lead capture. Runs on every inbound chat turn, re-scans
//! the accumulated user messages for contact signals, and materializes
//! or updates a lead. Best-effort end to end: no failure here may
//! break the chat response.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use leadline_common::{capture_score, extract_signals, ContactSignals, LeadSource};

use crate::notify::{CaptureNotifier, NewLeadNotification};
use crate::store::{CaptureUpsert, Store};

/// Synthesized address used until a real email is observed.
pub fn placeholder_email(session_id: &str) -> String {
    format!("chat-{session_id}@placeholder.leadline.app")
}

/// Session-correlation key stashed in the lead's notes field for later
/// reconciliation.
pub fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// What the capture rule decided to do for this turn. Pure, no store
/// access, so the decision logic is unit-testable in isolation.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturePlan {
    pub signals: ContactSignals,
    pub name: String,
    /// Detected email, or the session placeholder.
    pub email: String,
    pub placeholder: bool,
    pub score: i32,
    pub message_count: i32,
}

/// Scan the conversation and decide whether to create/update a lead.
/// Returns None until a name candidate has been seen; the turn is
/// still forwarded to the responder either way.
pub fn plan_capture(session_id: &str, user_messages: &[&str]) -> Option<CapturePlan> {
    let signals = extract_signals(user_messages);
    let name = signals.name.clone()?;
    let score = capture_score(&signals);

    let (email, placeholder) = match signals.email.clone() {
        Some(email) => (email, false),
        None => (placeholder_email(session_id), true),
    };

    Some(CapturePlan {
        name,
        email,
        placeholder,
        score,
        message_count: user_messages.len() as i32,
        signals,
    })
}

#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub lead_id: Uuid,
    pub created: bool,
}

/// Apply the capture rule for one turn. Database errors are logged and
/// swallowed; the caller streams the chat response regardless.
pub async fn run_capture(
    store: &Store,
    notifier: &Arc<dyn CaptureNotifier>,
    session_id: &str,
    user_messages: &[&str],
) -> Option<CaptureOutcome> {
    let plan = plan_capture(session_id, user_messages)?;
    let key = session_key(session_id);

    // A real email may belong to a conversation that started under a
    // placeholder; move that lead onto the real address first.
    if !plan.placeholder {
        match store.reconcile_placeholder(&key, &plan.email).await {
            Ok(Some(lead_id)) => {
                info!(%lead_id, session_id, "Reconciled placeholder lead to real email");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(session_id, error = %e, "Placeholder reconciliation failed");
            }
        }
    }

    let upsert = CaptureUpsert {
        name: plan.name.clone(),
        email: plan.email.clone(),
        phone: plan.signals.phone.clone(),
        website: plan.signals.website.clone(),
        source: LeadSource::Chatbot,
        lead_score: plan.score,
        notes: Some(key),
        message_count: plan.message_count,
    };

    let (lead_id, created) = match store.upsert_lead_by_email(&upsert).await {
        Ok(result) => result,
        Err(e) => {
            warn!(session_id, error = %e, "Lead capture upsert failed");
            return None;
        }
    };

    if created {
        info!(%lead_id, session_id, score = plan.score, "Captured new lead from chat");

        let notification = NewLeadNotification {
            lead_id,
            name: plan.name,
            email: plan.email,
            phone: plan.signals.phone,
            website: plan.signals.website.clone(),
            source: LeadSource::Chatbot,
            lead_score: plan.score,
            session_id: session_id.to_string(),
        };

        // Fire and forget: the response path never waits on these.
        let webhook_notifier = Arc::clone(notifier);
        tokio::spawn(async move {
            if let Err(e) = webhook_notifier.lead_created(&notification).await {
                warn!(error = %e, "New-lead webhook notification failed");
            }
        });

        if let Some(website) = plan.signals.website {
            let enrich_notifier = Arc::clone(notifier);
            tokio::spawn(async move {
                if let Err(e) = enrich_notifier.enrichment_requested(lead_id, &website).await {
                    warn!(error = %e, "Enrichment dispatch failed");
                }
            });
        }
    }

    Some(CaptureOutcome { lead_id, created })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MockNotifier;

    #[test]
    fn no_name_means_no_action() {
        assert_eq!(plan_capture("s-1", &["hello there", "what do you do?"]), None);
        assert_eq!(plan_capture("s-1", &[]), None);
    }

    #[test]
    fn name_alone_creates_placeholder_plan() {
        let plan = plan_capture("s-1", &["Dana Lee"]).unwrap();
        assert_eq!(plan.name, "Dana Lee");
        assert_eq!(plan.email, "chat-s-1@placeholder.leadline.app");
        assert!(plan.placeholder);
        assert_eq!(plan.score, 20);
    }

    #[test]
    fn detected_email_replaces_placeholder() {
        let plan = plan_capture("s-1", &["Dana Lee", "dana@dana-designs.io"]).unwrap();
        assert_eq!(plan.email, "dana@dana-designs.io");
        assert!(!plan.placeholder);
        assert_eq!(plan.score, 20 + 30);
    }

    #[test]
    fn full_signals_score_all_components() {
        let plan = plan_capture(
            "s-1",
            &[
                "Dana Lee",
                "my site is dana-designs.io",
                "email dana@dana-designs.io, call 612-555-1234",
            ],
        )
        .unwrap();
        assert_eq!(plan.score, 20 + 30 + 25 + 15);
        assert_eq!(plan.message_count, 3);
    }

    /// Repeated invocations over the growing message list keep keying
    /// on the same email, so the store upsert updates rather than
    /// inserting a second lead.
    #[test]
    fn repeated_invocations_share_the_upsert_key() {
        let first = plan_capture("s-1", &["Dana Lee", "dana@dana-designs.io"]).unwrap();
        let second = plan_capture(
            "s-1",
            &["Dana Lee", "dana@dana-designs.io", "tell me about pricing"],
        )
        .unwrap();
        assert_eq!(first.email, second.email);
        assert!(second.score >= first.score);
    }

    #[test]
    fn placeholder_embeds_session_id() {
        assert_eq!(
            placeholder_email("abc-123"),
            "chat-abc-123@placeholder.leadline.app"
        );
        assert_eq!(session_key("abc-123"), "session:abc-123");
    }

    #[tokio::test]
    async fn mock_notifier_records_calls() {
        let notifier = MockNotifier::new();
        let lead_id = Uuid::new_v4();

        notifier
            .lead_created(&NewLeadNotification {
                lead_id,
                name: "Dana Lee".to_string(),
                email: "dana@dana-designs.io".to_string(),
                phone: None,
                website: Some("https://dana-designs.io".to_string()),
                source: LeadSource::Chatbot,
                lead_score: 75,
                session_id: "s-1".to_string(),
            })
            .await
            .unwrap();
        notifier
            .enrichment_requested(lead_id, "https://dana-designs.io")
            .await
            .unwrap();

        assert_eq!(notifier.leads().len(), 1);
        assert_eq!(
            notifier.enrichments(),
            vec![(lead_id, "https://dana-designs.io".to_string())]
        );
    }
}
