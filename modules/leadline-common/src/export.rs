//! CSV rendering for lead exports.

use chrono::NaiveDate;

use crate::scoring::qualify;
use crate::types::Lead;

pub const CSV_HEADER: &str = "Name,Email,Phone,Website,Industry,Source,Score,Status,Date,Archived";

/// Escape a single CSV field: wrap in double quotes and double any
/// internal quotes when the value contains a comma, quote, or newline.
pub fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render one lead as a CSV row matching `CSV_HEADER`.
pub fn lead_row(lead: &Lead) -> String {
    let fields = [
        lead.name.clone(),
        lead.email.clone(),
        lead.phone.clone().unwrap_or_default(),
        lead.website.clone().unwrap_or_default(),
        lead.industry.clone().unwrap_or_default(),
        lead.source.to_string(),
        lead.lead_score.to_string(),
        qualify(lead.lead_score).to_string(),
        lead.created_at.format("%Y-%m-%d").to_string(),
        if lead.archived { "yes" } else { "no" }.to_string(),
    ];
    fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render a full export document.
pub fn leads_csv(leads: &[Lead]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for lead in leads {
        out.push_str(&lead_row(lead));
        out.push('\n');
    }
    out
}

/// Export filename embedding the given date.
pub fn export_filename(date: NaiveDate) -> String {
    format!("leads-export-{}.csv", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntentSignals, LeadSource};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn test_lead() -> Lead {
        Lead {
            id: Uuid::new_v4(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
            name: "Dana Lee".to_string(),
            email: "dana@dana-designs.io".to_string(),
            phone: Some("6125551234".to_string()),
            website: Some("https://dana-designs.io".to_string()),
            industry: None,
            source: LeadSource::Chatbot,
            lead_score: 75,
            notes: None,
            summary: None,
            intent_signals: IntentSignals::default(),
            message_count: 5,
            archived: false,
            questionnaire: None,
        }
    }

    #[test]
    fn plain_field_is_unchanged() {
        assert_eq!(escape_field("Dana Lee"), "Dana Lee");
    }

    #[test]
    fn comma_field_is_quoted() {
        assert_eq!(escape_field("Lee, Dana"), "\"Lee, Dana\"");
    }

    #[test]
    fn quote_field_doubles_quotes() {
        assert_eq!(escape_field("the \"best\" lead"), "\"the \"\"best\"\" lead\"");
    }

    #[test]
    fn newline_field_is_quoted() {
        assert_eq!(escape_field("line1\nline2"), "\"line1\nline2\"");
    }

    /// Escaping round-trips: a standard CSV parse of the escaped field
    /// yields the original string exactly.
    #[test]
    fn escaping_round_trips() {
        fn parse_csv_field(escaped: &str) -> String {
            if let Some(inner) = escaped
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
            {
                inner.replace("\"\"", "\"")
            } else {
                escaped.to_string()
            }
        }

        for original in [
            "plain",
            "with, comma",
            "with \"quotes\"",
            "multi\nline",
            "all, of \"it\"\ntogether",
        ] {
            assert_eq!(parse_csv_field(&escape_field(original)), original);
        }
    }

    #[test]
    fn row_matches_header_shape() {
        let row = lead_row(&test_lead());
        assert_eq!(
            row,
            "Dana Lee,dana@dana-designs.io,6125551234,https://dana-designs.io,,chatbot,75,hot,2026-03-01,no"
        );
        assert_eq!(
            row.split(',').count(),
            CSV_HEADER.split(',').count(),
            "row and header column counts must match"
        );
    }

    #[test]
    fn document_has_header_and_one_row_per_lead() {
        let csv = leads_csv(&[test_lead(), test_lead()]);
        let lines: Vec<&str> = csv.trim_end().lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
    }

    #[test]
    fn filename_embeds_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(export_filename(date), "leads-export-2026-03-01.csv");
    }
}
