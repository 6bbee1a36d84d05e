//! Conversation reconstruction. Turns the flat, append-only
//! interaction table into ordered session aggregates for the
//! dashboard. Pure and idempotent: same input list, same output list.

use std::collections::HashMap;

use crate::types::{ChatInteraction, ChatTurn, GroupedSession, TurnRole};

/// Group raw interactions into logical conversation sessions.
///
/// Within a group, chronological order (created_at, then id as a
/// deterministic tie-break) defines "first" and "last" everywhere. The
/// result is sorted by last activity, newest first.
pub fn group_sessions(interactions: Vec<ChatInteraction>) -> Vec<GroupedSession> {
    let mut by_session: HashMap<String, Vec<ChatInteraction>> = HashMap::new();
    for interaction in interactions {
        by_session
            .entry(interaction.session_id.clone())
            .or_default()
            .push(interaction);
    }

    let mut sessions: Vec<GroupedSession> = by_session
        .into_iter()
        .map(|(session_id, mut group)| {
            group.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            aggregate(session_id, &group)
        })
        .collect();

    sessions.sort_by(|a, b| {
        b.last_activity
            .cmp(&a.last_activity)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });
    sessions
}

fn aggregate(session_id: String, group: &[ChatInteraction]) -> GroupedSession {
    // group is non-empty by construction
    let started_at = group.first().map(|i| i.created_at).unwrap_or_default();
    let last_activity = group.last().map(|i| i.created_at).unwrap_or_default();

    // Authoritative metadata: the newest interaction that carries one.
    let authoritative = group
        .iter()
        .filter(|i| i.metadata.is_some())
        .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
        .and_then(|i| i.metadata.clone());

    let collected = authoritative
        .as_ref()
        .map(|m| m.collected.clone())
        .unwrap_or_default();

    // Prefer the embedded history; otherwise flatten each interaction's
    // user/assistant fields in chronological order. No alternation is
    // enforced; gaps in the data may leave consecutive same-role turns.
    let embedded = authoritative
        .as_ref()
        .map(|m| m.conversation.clone())
        .unwrap_or_default();
    let conversation = if embedded.is_empty() {
        flatten_turns(group)
    } else {
        embedded
    };

    let first_message = group
        .iter()
        .find_map(|i| i.user_message.clone())
        .or_else(|| {
            conversation
                .iter()
                .find(|t| t.role == TurnRole::User)
                .map(|t| t.content.clone())
        });

    GroupedSession {
        started_at,
        last_activity,
        interaction_count: group.len(),
        lead_id: group.iter().find_map(|i| i.lead_id),
        display_name: collected.name.clone(),
        first_message,
        conversation,
        has_url_scraped: group.iter().any(|i| i.scraped_url.is_some()),
        collected,
        session_id,
    }
}

fn flatten_turns(group: &[ChatInteraction]) -> Vec<ChatTurn> {
    let mut turns = Vec::new();
    for interaction in group {
        if let Some(ref msg) = interaction.user_message {
            turns.push(ChatTurn::user(msg.clone()));
        }
        if let Some(ref msg) = interaction.assistant_message {
            turns.push(ChatTurn::assistant(msg.clone()));
        }
    }
    turns
}
