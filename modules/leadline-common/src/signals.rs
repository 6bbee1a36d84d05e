//! Contact-signal extraction over accumulated user messages. The
//! capture rule re-scans the whole conversation on every turn, so all
//! functions here take the full chronological message list and return
//! the first match.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());

static WEBSITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:https?://)?(?:www\.)?[a-z0-9][a-z0-9-]*(?:\.[a-z0-9-]+)*\.(?:com|net|org|io|co|app|dev|ai|agency|design|studio|shop|biz|info)\b(?:/[^\s]*)?",
    )
    .unwrap()
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\d{0,3}[-.\s(]*\d{3}[-.\s)]*\d{3}[-.\s]*\d{4}\b").unwrap()
});

/// Common personal-email providers. Their domains are never business
/// websites.
const PERSONAL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "icloud.com",
    "aol.com",
    "protonmail.com",
    "proton.me",
    "live.com",
    "msn.com",
];

/// Identity and contact signals detected in a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSignals {
    pub name: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
}

/// Scan the accumulated user messages (chronological order) and return
/// the first detection of each signal.
pub fn extract_signals(user_messages: &[&str]) -> ContactSignals {
    let mut signals = ContactSignals::default();

    for msg in user_messages {
        if signals.email.is_none() {
            signals.email = find_email(msg);
        }
        if signals.website.is_none() {
            signals.website = find_website(msg);
        }
        if signals.phone.is_none() {
            signals.phone = find_phone(msg);
        }
        if signals.name.is_none() && looks_like_name(msg) {
            signals.name = Some(msg.trim().to_string());
        }
    }

    signals
}

fn find_email(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_lowercase())
}

/// Find a business website, excluding personal-email domains. Email
/// addresses are blanked out first so their domains are never
/// misidentified as sites.
fn find_website(text: &str) -> Option<String> {
    let without_emails = EMAIL_RE.replace_all(text, " ");

    for m in WEBSITE_RE.find_iter(&without_emails) {
        let raw = m.as_str().trim_end_matches(['.', ',', '!', '?']);
        let domain = host_of(raw).to_lowercase();
        if PERSONAL_DOMAINS.iter().any(|p| domain == *p) {
            continue;
        }
        return Some(normalize_url(raw));
    }
    None
}

/// The host portion of a possibly scheme-less URL.
fn host_of(url: &str) -> &str {
    let rest = url.split("://").nth(1).unwrap_or(url);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    rest.split('/').next().unwrap_or(rest)
}

/// Prepend a scheme if absent.
pub fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Find a phone number and normalize it to bare digits. Anything under
/// ten digits is noise.
fn find_phone(text: &str) -> Option<String> {
    for m in PHONE_RE.find_iter(text) {
        let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() >= 10 {
            return Some(digits);
        }
    }
    None
}

/// Heuristic: a short message that reads like a bare name. At most
/// four words, under 50 chars, leading capitalized word, no email or
/// domain fragments, not numeric, not a phone number.
fn looks_like_name(msg: &str) -> bool {
    let trimmed = msg.trim();
    if trimmed.is_empty() || trimmed.len() >= 50 {
        return false;
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.is_empty() || words.len() > 4 {
        return false;
    }

    let first_char = words[0].chars().next().unwrap_or(' ');
    if !first_char.is_uppercase() {
        return false;
    }

    let lower = trimmed.to_lowercase();
    if trimmed.contains('@') || lower.contains(".com") || lower.contains(".co") {
        return false;
    }

    if !trimmed.chars().any(|c| c.is_alphabetic()) {
        return false;
    }

    if PHONE_RE.is_match(trimmed) {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_email_lowercased() {
        let signals = extract_signals(&["My email is Dana.Lee@Example.COM"]);
        assert_eq!(signals.email.as_deref(), Some("dana.lee@example.com"));
    }

    #[test]
    fn extracts_website_with_scheme_prepended() {
        let signals = extract_signals(&["check out dana-designs.io please"]);
        assert_eq!(signals.website.as_deref(), Some("https://dana-designs.io"));
    }

    #[test]
    fn keeps_existing_scheme() {
        let signals = extract_signals(&["it's at https://www.acme.com/about"]);
        assert_eq!(
            signals.website.as_deref(),
            Some("https://www.acme.com/about")
        );
    }

    #[test]
    fn personal_email_domain_is_not_a_website() {
        let signals = extract_signals(&["reach me at dana@gmail.com"]);
        assert_eq!(signals.email.as_deref(), Some("dana@gmail.com"));
        assert_eq!(signals.website, None);
    }

    #[test]
    fn bare_personal_domain_is_not_a_website() {
        let signals = extract_signals(&["I only use gmail.com for mail"]);
        assert_eq!(signals.website, None);
    }

    #[test]
    fn phone_normalized_to_digits() {
        for raw in [
            "call +1 (612) 555-1234",
            "call 612-555-1234",
            "call 612.555.1234",
            "call 6125551234",
        ] {
            let signals = extract_signals(&[raw]);
            let digits = signals.phone.expect(raw);
            assert!(digits.ends_with("6125551234"), "{raw} -> {digits}");
        }
    }

    #[test]
    fn short_number_is_not_a_phone() {
        let signals = extract_signals(&["my pin is 555-1234"]);
        assert_eq!(signals.phone, None);
    }

    #[test]
    fn clean_name_turn_is_accepted() {
        let signals = extract_signals(&["Dana Lee"]);
        assert_eq!(signals.name.as_deref(), Some("Dana Lee"));
    }

    #[test]
    fn chatty_turn_is_not_a_name() {
        // Too many words; also carries a domain fragment.
        let signals = extract_signals(&["Hi, I'm Dana Lee, visit dana-designs.io"]);
        assert_eq!(signals.name, None);
        assert_eq!(signals.website.as_deref(), Some("https://dana-designs.io"));
    }

    #[test]
    fn first_name_candidate_wins() {
        let signals = extract_signals(&["Dana Lee", "Sam Ortiz"]);
        assert_eq!(signals.name.as_deref(), Some("Dana Lee"));
    }

    #[test]
    fn lowercase_start_is_not_a_name() {
        let signals = extract_signals(&["dana lee"]);
        assert_eq!(signals.name, None);
    }

    #[test]
    fn numeric_turn_is_not_a_name() {
        let signals = extract_signals(&["12345"]);
        assert_eq!(signals.name, None);
    }

    #[test]
    fn phone_turn_is_not_a_name() {
        let signals = extract_signals(&["612-555-1234"]);
        assert_eq!(signals.name, None);
    }

    #[test]
    fn email_turn_is_not_a_name() {
        let signals = extract_signals(&["Dana@example.org"]);
        assert_eq!(signals.name, None);
    }

    #[test]
    fn detection_is_independent_of_message_order() {
        let a = extract_signals(&["Dana Lee", "site: dana-designs.io"]);
        let b = extract_signals(&["site: dana-designs.io", "Dana Lee"]);
        assert_eq!(a.name, b.name);
        assert_eq!(a.website, b.website);
    }

    #[test]
    fn rescanning_accumulated_messages_is_stable() {
        let msgs = ["Dana Lee", "dana@dana-designs.io", "call 612-555-1234"];
        let first = extract_signals(&msgs[..1]);
        let all = extract_signals(&msgs);
        assert_eq!(first.name, all.name);
        assert_eq!(all.email.as_deref(), Some("dana@dana-designs.io"));
        assert_eq!(all.phone.as_deref(), Some("6125551234"));
    }
}
