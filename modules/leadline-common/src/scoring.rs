//! Lead scoring. This is the single shared implementation; the capture
//! rule and every dashboard query import it from here. A second copy of
//! the formula anywhere else is a correctness bug.

use crate::signals::ContactSignals;
use crate::types::{IntentSignals, Lead, LeadSource, Qualification};

/// Feature set observed for a lead at full-conversation-analysis time.
#[derive(Debug, Clone, Default)]
pub struct LeadFeatures {
    pub source: LeadSource,
    pub message_count: Option<u32>,
    pub intent: IntentSignals,
    pub has_website: Option<bool>,
    pub has_ai_feedback: Option<bool>,
}

/// Base contribution of the acquisition source.
fn source_base(source: LeadSource) -> i32 {
    match source {
        LeadSource::ProjectPlanModal => 30,
        LeadSource::ChatbotWithUrl => 25,
        LeadSource::UseCasePage
        | LeadSource::RestaurantPage
        | LeadSource::SalonPage
        | LeadSource::ContractorPage => 20,
        LeadSource::Chatbot => 15,
        LeadSource::HeroModal => 10,
        LeadSource::Other => 0,
    }
}

/// Engagement bonus by message count. Step function; only the matching
/// bracket applies.
fn engagement_bonus(message_count: u32) -> i32 {
    match message_count {
        11.. => 35,
        7..=10 => 25,
        4..=6 => 15,
        2..=3 => 5,
        _ => 0,
    }
}

/// Compute the lead score. Additive; every term is independent and
/// non-negative, so the result is never below zero and has no upper
/// clamp.
pub fn score(features: &LeadFeatures) -> i32 {
    let mut total = source_base(features.source);
    total += engagement_bonus(features.message_count.unwrap_or(0));

    if features.intent.pricing {
        total += 15;
    }
    if features.intent.timeline {
        total += 15;
    }
    if features.intent.specific_service {
        total += 10;
    }
    if features.intent.urgency {
        total += 10;
    }
    if features.has_website.unwrap_or(false) {
        total += 10;
    }
    if features.has_ai_feedback.unwrap_or(false) {
        total += 10;
    }

    total
}

/// Tier boundaries. Queries that filter by tier must use these rather
/// than repeating the numbers.
pub const HOT_MIN: i32 = 70;
pub const WARM_MIN: i32 = 40;
pub const COOL_MIN: i32 = 20;

/// Map a score onto a qualification tier. Exhaustive and
/// non-overlapping, evaluated high to low.
pub fn qualify(score: i32) -> Qualification {
    if score >= HOT_MIN {
        Qualification::Hot
    } else if score >= WARM_MIN {
        Qualification::Warm
    } else if score >= COOL_MIN {
        Qualification::Cool
    } else {
        Qualification::Cold
    }
}

impl Lead {
    pub fn qualification(&self) -> Qualification {
        qualify(self.lead_score)
    }
}

/// Capture-time companion score, used before full conversational
/// signals exist. Only ever overwrites a stored score when strictly
/// greater.
pub fn capture_score(signals: &ContactSignals) -> i32 {
    let mut total = 0;
    if signals.name.is_some() {
        total += 20;
    }
    if signals.email.is_some() {
        total += 30;
    }
    if signals.website.is_some() {
        total += 25;
    }
    if signals.phone.is_some() {
        total += 15;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualification_boundaries() {
        assert_eq!(qualify(HOT_MIN), Qualification::Hot);
        assert_eq!(qualify(HOT_MIN - 1), Qualification::Warm);
        assert_eq!(qualify(WARM_MIN), Qualification::Warm);
        assert_eq!(qualify(WARM_MIN - 1), Qualification::Cool);
        assert_eq!(qualify(COOL_MIN), Qualification::Cool);
        assert_eq!(qualify(COOL_MIN - 1), Qualification::Cold);
        assert_eq!(qualify(0), Qualification::Cold);
    }

    #[test]
    fn tier_boundaries_match_published_thresholds() {
        assert_eq!(HOT_MIN, 70);
        assert_eq!(WARM_MIN, 40);
        assert_eq!(COOL_MIN, 20);
    }

    #[test]
    fn project_plan_with_engaged_conversation_is_hot() {
        // 30 (source) + 25 (7-10 bracket) + 15 (pricing) + 10 (urgency)
        // + 10 (website) = 90
        let features = LeadFeatures {
            source: LeadSource::ProjectPlanModal,
            message_count: Some(8),
            intent: IntentSignals {
                pricing: true,
                urgency: true,
                ..Default::default()
            },
            has_website: Some(true),
            has_ai_feedback: None,
        };
        assert_eq!(score(&features), 90);
        assert_eq!(qualify(score(&features)), Qualification::Hot);
    }

    #[test]
    fn hero_modal_single_message_is_cold() {
        let features = LeadFeatures {
            source: LeadSource::HeroModal,
            message_count: Some(1),
            ..Default::default()
        };
        assert_eq!(score(&features), 10);
        assert_eq!(qualify(score(&features)), Qualification::Cold);
    }

    #[test]
    fn unrecognized_source_contributes_zero() {
        let features = LeadFeatures {
            source: LeadSource::Other,
            ..Default::default()
        };
        assert_eq!(score(&features), 0);
    }

    #[test]
    fn engagement_brackets_are_non_cumulative() {
        assert_eq!(engagement_bonus(0), 0);
        assert_eq!(engagement_bonus(1), 0);
        assert_eq!(engagement_bonus(2), 5);
        assert_eq!(engagement_bonus(3), 5);
        assert_eq!(engagement_bonus(4), 15);
        assert_eq!(engagement_bonus(6), 15);
        assert_eq!(engagement_bonus(7), 25);
        assert_eq!(engagement_bonus(10), 25);
        assert_eq!(engagement_bonus(11), 35);
        assert_eq!(engagement_bonus(100), 35);
    }

    #[test]
    fn absent_message_count_scores_like_zero() {
        let absent = LeadFeatures {
            source: LeadSource::Chatbot,
            message_count: None,
            ..Default::default()
        };
        let zero = LeadFeatures {
            source: LeadSource::Chatbot,
            message_count: Some(0),
            ..Default::default()
        };
        assert_eq!(score(&absent), score(&zero));
    }

    #[test]
    fn absent_booleans_score_like_false() {
        let absent = LeadFeatures {
            source: LeadSource::Chatbot,
            has_website: None,
            has_ai_feedback: None,
            ..Default::default()
        };
        let explicit = LeadFeatures {
            source: LeadSource::Chatbot,
            has_website: Some(false),
            has_ai_feedback: Some(false),
            ..Default::default()
        };
        assert_eq!(score(&absent), score(&explicit));
    }

    #[test]
    fn intent_bonuses_are_independently_additive() {
        let base = LeadFeatures {
            source: LeadSource::Chatbot,
            ..Default::default()
        };
        let all = LeadFeatures {
            intent: IntentSignals {
                pricing: true,
                timeline: true,
                specific_service: true,
                urgency: true,
            },
            ..base.clone()
        };
        assert_eq!(score(&all), score(&base) + 15 + 15 + 10 + 10);
    }

    #[test]
    fn score_is_deterministic() {
        let features = LeadFeatures {
            source: LeadSource::ChatbotWithUrl,
            message_count: Some(5),
            intent: IntentSignals {
                timeline: true,
                ..Default::default()
            },
            has_website: Some(true),
            has_ai_feedback: Some(true),
        };
        assert_eq!(score(&features), score(&features.clone()));
    }

    #[test]
    fn capture_score_adds_per_signal() {
        let full = ContactSignals {
            name: Some("Dana Lee".to_string()),
            email: Some("dana@dana-designs.io".to_string()),
            website: Some("https://dana-designs.io".to_string()),
            phone: Some("6125551234".to_string()),
        };
        assert_eq!(capture_score(&full), 20 + 30 + 25 + 15);

        let name_only = ContactSignals {
            name: Some("Dana Lee".to_string()),
            ..Default::default()
        };
        assert_eq!(capture_score(&name_only), 20);
        assert_eq!(capture_score(&ContactSignals::default()), 0);
    }
}
