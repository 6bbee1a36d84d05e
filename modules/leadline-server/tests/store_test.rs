//! Postgres-backed tests for the store's upsert, reconciliation, and
//! enrichment writeback semantics.
//!
//! Requirements: Docker (for Postgres via testcontainers).
//! Run with: cargo test -p leadline-server --features test-utils --test store_test

#![cfg(feature = "test-utils")]

use std::time::Duration;

use leadline_common::{ChatTurn, CollectedData, LeadSource, Qualification};
use leadline_server::capture::{placeholder_email, session_key};
use leadline_server::rest::chat::InteractionRecorder;
use leadline_server::store::{CaptureUpsert, LeadFilter, NewLead};
use leadline_server::testutil::postgres_store;

fn capture(email: &str, score: i32, website: Option<&str>) -> CaptureUpsert {
    CaptureUpsert {
        name: "Dana Lee".to_string(),
        email: email.to_string(),
        phone: None,
        website: website.map(str::to_string),
        source: LeadSource::Chatbot,
        lead_score: score,
        notes: None,
        message_count: 1,
    }
}

fn new_lead(email: &str, score: i32) -> NewLead {
    NewLead {
        name: "Dana Lee".to_string(),
        email: email.to_string(),
        phone: None,
        website: None,
        source: LeadSource::Chatbot,
        lead_score: score,
        notes: None,
        intent_signals: Default::default(),
        questionnaire: None,
    }
}

#[tokio::test]
async fn upsert_inserts_then_updates_same_row() {
    let (_container, store) = postgres_store().await;

    let (first_id, created) = store
        .upsert_lead_by_email(&capture("dana@dana-designs.io", 20, None))
        .await
        .unwrap();
    assert!(created);

    let (second_id, created) = store
        .upsert_lead_by_email(&capture("dana@dana-designs.io", 45, None))
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(first_id, second_id);

    let leads = store.list_leads(&LeadFilter::default()).await.unwrap();
    assert_eq!(leads.len(), 1);
}

#[tokio::test]
async fn upsert_score_only_ratchets_upward() {
    let (_container, store) = postgres_store().await;

    let (id, _) = store
        .upsert_lead_by_email(&capture("dana@dana-designs.io", 75, None))
        .await
        .unwrap();

    store
        .upsert_lead_by_email(&capture("dana@dana-designs.io", 20, None))
        .await
        .unwrap();
    let lead = store.get_lead(id).await.unwrap().unwrap();
    assert_eq!(lead.lead_score, 75);

    store
        .upsert_lead_by_email(&capture("dana@dana-designs.io", 90, None))
        .await
        .unwrap();
    let lead = store.get_lead(id).await.unwrap().unwrap();
    assert_eq!(lead.lead_score, 90);
}

#[tokio::test]
async fn upsert_fills_website_only_when_null() {
    let (_container, store) = postgres_store().await;

    let (id, _) = store
        .upsert_lead_by_email(&capture("dana@dana-designs.io", 20, None))
        .await
        .unwrap();

    store
        .upsert_lead_by_email(&capture(
            "dana@dana-designs.io",
            20,
            Some("https://dana-designs.io"),
        ))
        .await
        .unwrap();
    let lead = store.get_lead(id).await.unwrap().unwrap();
    assert_eq!(lead.website.as_deref(), Some("https://dana-designs.io"));

    store
        .upsert_lead_by_email(&capture(
            "dana@dana-designs.io",
            20,
            Some("https://other-site.example"),
        ))
        .await
        .unwrap();
    let lead = store.get_lead(id).await.unwrap().unwrap();
    assert_eq!(lead.website.as_deref(), Some("https://dana-designs.io"));
}

#[tokio::test]
async fn reconcile_moves_placeholder_onto_real_email() {
    let (_container, store) = postgres_store().await;
    let key = session_key("s-1");

    let mut upsert = capture(&placeholder_email("s-1"), 20, None);
    upsert.notes = Some(key.clone());
    let (id, created) = store.upsert_lead_by_email(&upsert).await.unwrap();
    assert!(created);

    let reconciled = store
        .reconcile_placeholder(&key, "dana@dana-designs.io")
        .await
        .unwrap();
    assert_eq!(reconciled, Some(id));

    let lead = store.get_lead(id).await.unwrap().unwrap();
    assert_eq!(lead.email, "dana@dana-designs.io");
    assert_eq!(
        store.list_leads(&LeadFilter::default()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn reconcile_is_noop_when_email_already_taken() {
    let (_container, store) = postgres_store().await;
    let key = session_key("s-1");

    store
        .insert_lead(&new_lead("dana@dana-designs.io", 50))
        .await
        .unwrap();

    let mut upsert = capture(&placeholder_email("s-1"), 20, None);
    upsert.notes = Some(key.clone());
    let (placeholder_id, _) = store.upsert_lead_by_email(&upsert).await.unwrap();

    let reconciled = store
        .reconcile_placeholder(&key, "dana@dana-designs.io")
        .await
        .unwrap();
    assert_eq!(reconciled, None);

    let lead = store.get_lead(placeholder_id).await.unwrap().unwrap();
    assert_eq!(lead.email, placeholder_email("s-1"));
}

/// A placeholder lead with a website gets enriched before the visitor
/// shares a real email. The writeback must not disturb the session key
/// in notes, or the later reconciliation misses and a duplicate lead
/// appears.
#[tokio::test]
async fn enrichment_does_not_break_later_reconciliation() {
    let (_container, store) = postgres_store().await;
    let key = session_key("s-1");

    let mut upsert = capture(&placeholder_email("s-1"), 45, Some("https://dana-designs.io"));
    upsert.notes = Some(key.clone());
    let (id, created) = store.upsert_lead_by_email(&upsert).await.unwrap();
    assert!(created);

    store
        .apply_enrichment(
            id,
            Some("web design"),
            Some("612-555-1234"),
            Some("Boutique design studio in Minneapolis."),
        )
        .await
        .unwrap();

    let reconciled = store
        .reconcile_placeholder(&key, "dana@dana-designs.io")
        .await
        .unwrap();
    assert_eq!(reconciled, Some(id));

    let lead = store.get_lead(id).await.unwrap().unwrap();
    assert_eq!(lead.email, "dana@dana-designs.io");
    assert_eq!(lead.notes.as_deref(), Some(key.as_str()));
    assert_eq!(
        lead.summary.as_deref(),
        Some("Boutique design studio in Minneapolis.")
    );
    assert_eq!(lead.industry.as_deref(), Some("web design"));
    assert_eq!(
        store.list_leads(&LeadFilter::default()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn enrichment_writes_only_non_null_fields() {
    let (_container, store) = postgres_store().await;

    let mut lead = new_lead("dana@dana-designs.io", 50);
    lead.phone = Some("612-555-0000".to_string());
    let inserted = store.insert_lead(&lead).await.unwrap();

    store
        .apply_enrichment(inserted.id, Some("web design"), None, None)
        .await
        .unwrap();

    let lead = store.get_lead(inserted.id).await.unwrap().unwrap();
    assert_eq!(lead.industry.as_deref(), Some("web design"));
    assert_eq!(lead.phone.as_deref(), Some("612-555-0000"));
    assert!(lead.summary.is_none());
}

#[tokio::test]
async fn qualification_filter_matches_derived_tier() {
    let (_container, store) = postgres_store().await;

    store.insert_lead(&new_lead("hot@example.com", 85)).await.unwrap();
    store.insert_lead(&new_lead("warm@example.com", 55)).await.unwrap();
    store.insert_lead(&new_lead("cold@example.com", 5)).await.unwrap();

    let hot = store
        .list_leads(&LeadFilter {
            qualification: Some(Qualification::Hot),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hot.len(), 1);
    assert_eq!(hot[0].email, "hot@example.com");
    assert_eq!(hot[0].qualification(), Qualification::Hot);

    let warm = store
        .list_leads(&LeadFilter {
            qualification: Some(Qualification::Warm),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(warm.len(), 1);
    assert_eq!(warm[0].qualification(), Qualification::Warm);

    let cold = store
        .list_leads(&LeadFilter {
            qualification: Some(Qualification::Cold),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(cold.len(), 1);
    assert_eq!(cold[0].email, "cold@example.com");
}

/// Dropping the recorder mid-reply, as a client disconnect does to the
/// SSE body, must still leave the interaction row behind.
#[tokio::test]
async fn dropped_recorder_still_records_the_turn() {
    let (_container, store) = postgres_store().await;

    let mut recorder = InteractionRecorder::new(
        store.clone(),
        "s-1".to_string(),
        "hi".to_string(),
        None,
        20,
        CollectedData::default(),
        vec![ChatTurn::user("hi")],
    );
    recorder.push_delta("Hello ");
    recorder.push_delta("there");
    drop(recorder);

    // The write is spawned; give it a moment to land.
    let mut interactions = Vec::new();
    for _ in 0..40 {
        interactions = store.all_interactions().await.unwrap();
        if !interactions.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(interactions.len(), 1);
    assert_eq!(interactions[0].session_id, "s-1");
    assert_eq!(interactions[0].user_message.as_deref(), Some("hi"));
    assert_eq!(
        interactions[0].assistant_message.as_deref(),
        Some("Hello there")
    );
}
