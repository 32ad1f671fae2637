//! Terminal rendering of the capture log and structured export.
//!
//! Stored replies are re-parsed every time they are shown; nothing derived is
//! kept in the database.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::{
    db::CapturedResponse,
    parser::{parse_reply, ContactRecord},
};

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn render_entry(record: &CapturedResponse) -> String {
    let parsed = parse_reply(&record.raw_reply);
    format!(
        "#{} | {} | image {} bytes\n{}",
        record.id,
        format_timestamp(&record.captured_at),
        record.source_image.len(),
        parsed.display_text()
    )
}

/// Blank-line separated entries, in the order given.
pub fn render_log(records: &[CapturedResponse]) -> String {
    if records.is_empty() {
        return "No captures yet.".to_string();
    }

    records
        .iter()
        .map(render_entry)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedContact {
    pub id: i64,
    pub captured_at: DateTime<Utc>,
    #[serde(flatten)]
    pub contact: ContactRecord,
}

/// Records whose reply parses to a contact; the rest are skipped.
pub fn export_contacts(records: &[CapturedResponse]) -> Vec<ExportedContact> {
    records
        .iter()
        .filter_map(|record| {
            let parsed = parse_reply(&record.raw_reply);
            parsed.contact().map(|contact| ExportedContact {
                id: record.id,
                captured_at: record.captured_at,
                contact: contact.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: i64, raw_reply: &str) -> CapturedResponse {
        CapturedResponse {
            id,
            raw_reply: raw_reply.to_string(),
            source_image: vec![0; 10],
            captured_at: Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
        }
    }

    #[test]
    fn entry_shows_header_and_parsed_text() {
        let rendered = render_entry(&record(7, r#"{"first_name":"Ana","phone":"123"}"#));
        let mut lines = rendered.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("#7 | "));
        assert!(header.ends_with("| image 10 bytes"));
        assert_eq!(lines.collect::<Vec<_>>(), vec!["First Name: Ana", "Phone: 123"]);
    }

    #[test]
    fn empty_log_has_placeholder() {
        assert_eq!(render_log(&[]), "No captures yet.");
    }

    #[test]
    fn raw_failure_replies_render_with_marker() {
        let rendered = render_entry(&record(1, "The image contains base64 text"));
        assert!(rendered.contains("Image processing failed: "));
    }

    #[test]
    fn export_skips_non_contact_replies() {
        let records = vec![
            record(3, r#"{"company_name":"Acme"}"#),
            record(2, "no idea"),
            record(1, ""),
        ];

        let exported = export_contacts(&records);
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].id, 3);
        assert_eq!(exported[0].contact.company_name, "Acme");

        let json = serde_json::to_value(&exported[0]).unwrap();
        assert_eq!(json["company_name"], "Acme");
        assert_eq!(json["first_name"], "");
        assert_eq!(json["id"], 3);
    }
}
