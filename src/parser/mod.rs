//! Turns a free-form model reply into a [`ContactRecord`] or display text.
//!
//! Tiers are tried in order and the first one that applies wins:
//!
//! 1. empty reply
//! 2. unwrap a chat envelope (`{"message": {"content": ...}}`) if present
//! 3. empty working text
//! 4. failure phrases that mean the model could not read the image
//! 5. the substring between the first `{` and the last `}` as a JSON object
//! 6. otherwise the working text verbatim
//!
//! Nothing in here returns an error; a failed parse drops to the next tier.

pub mod contact;

use serde_json::{Map, Value};

pub use contact::{ContactField, ContactRecord};

pub const NO_RESPONSE_TEXT: &str = "No response from API";
pub const EMPTY_RESPONSE_TEXT: &str = "Empty response from API";
pub const FAILURE_PREFIX: &str = "Image processing failed: ";
pub const TRUNCATION_SUFFIX: &str = "...";
pub const FAILURE_EXCERPT_CHARS: usize = 300;

/// Case-sensitive phrases a vision model uses when it only saw bytes.
const FAILURE_INDICATORS: [&str; 5] = [
    "base64",
    "Base64",
    "encoded data",
    "binary data",
    "difficult to interpret",
];

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    NoResponse,
    EmptyContent,
    ProcessingFailure {
        excerpt: String,
        truncated: bool,
    },
    Contact {
        record: ContactRecord,
        /// The JSON object as it was parsed, re-serialized.
        source: String,
    },
    PlainText(String),
}

impl ParsedReply {
    pub fn display_text(&self) -> String {
        match self {
            ParsedReply::NoResponse => NO_RESPONSE_TEXT.to_string(),
            ParsedReply::EmptyContent => EMPTY_RESPONSE_TEXT.to_string(),
            ParsedReply::ProcessingFailure { excerpt, truncated } => {
                let suffix = if *truncated { TRUNCATION_SUFFIX } else { "" };
                format!("{FAILURE_PREFIX}{excerpt}{suffix}")
            }
            ParsedReply::Contact { record, .. } => record.render(),
            ParsedReply::PlainText(text) => text.clone(),
        }
    }

    pub fn contact(&self) -> Option<&ContactRecord> {
        match self {
            ParsedReply::Contact { record, .. } => Some(record),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ParsedReply::ProcessingFailure { .. })
    }

    /// What goes into the capture log for this reply.
    pub fn text_to_persist(&self, raw_reply: &str) -> String {
        match self {
            ParsedReply::Contact { source, .. } => source.clone(),
            ParsedReply::PlainText(text) => text.clone(),
            ParsedReply::NoResponse
            | ParsedReply::EmptyContent
            | ParsedReply::ProcessingFailure { .. } => raw_reply.to_string(),
        }
    }

    /// Short tag for log lines.
    pub fn tier(&self) -> &'static str {
        match self {
            ParsedReply::NoResponse => "no_response",
            ParsedReply::EmptyContent => "empty_content",
            ParsedReply::ProcessingFailure { .. } => "processing_failure",
            ParsedReply::Contact { .. } => "contact",
            ParsedReply::PlainText(_) => "plain_text",
        }
    }
}

pub fn parse_reply(raw_reply: &str) -> ParsedReply {
    if raw_reply.is_empty() {
        return ParsedReply::NoResponse;
    }

    let working = working_text(raw_reply);
    if working.is_empty() {
        return ParsedReply::EmptyContent;
    }

    if looks_like_processing_failure(&working) {
        let total = working.chars().count();
        let excerpt: String = working.chars().take(FAILURE_EXCERPT_CHARS).collect();
        return ParsedReply::ProcessingFailure {
            excerpt,
            truncated: total > FAILURE_EXCERPT_CHARS,
        };
    }

    match embedded_json_object(&working) {
        Some(object) => {
            let record = ContactRecord::from_object(&object);
            let source = Value::Object(object).to_string();
            ParsedReply::Contact { record, source }
        }
        None => ParsedReply::PlainText(working),
    }
}

/// Unwraps `message.content` from a chat envelope. Anything else, including
/// valid JSON without that envelope, is returned unchanged.
fn working_text(raw_reply: &str) -> String {
    let Ok(Value::Object(outer)) = serde_json::from_str::<Value>(raw_reply) else {
        return raw_reply.to_string();
    };

    match outer.get("message") {
        Some(Value::Object(message)) => match message.get("content") {
            Some(Value::String(content)) => content.clone(),
            _ => String::new(),
        },
        _ => raw_reply.to_string(),
    }
}

fn looks_like_processing_failure(text: &str) -> bool {
    FAILURE_INDICATORS
        .iter()
        .any(|indicator| text.contains(indicator))
}

/// Brace-index heuristic: first `{` through last `}` inclusive.
fn embedded_json_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chat_envelope(content: &str) -> String {
        json!({ "model": "llama3.2-vision", "message": { "role": "assistant", "content": content }, "done": true })
            .to_string()
    }

    #[test]
    fn empty_reply_is_no_response() {
        let parsed = parse_reply("");
        assert_eq!(parsed, ParsedReply::NoResponse);
        assert_eq!(parsed.display_text(), "No response from API");
        assert_eq!(parsed.text_to_persist(""), "");
    }

    #[test]
    fn envelope_with_embedded_object_yields_contact() {
        let raw = r#"{"message":{"content":"noise {\"first_name\":\"Ana\",\"email_address\":\"a@b.com\"} trailing"}}"#;
        let parsed = parse_reply(raw);

        let record = parsed.contact().expect("contact record");
        assert_eq!(record.first_name, "Ana");
        assert_eq!(record.email_address, "a@b.com");
        for field in ContactField::ALL {
            if !matches!(field, ContactField::FirstName | ContactField::EmailAddress) {
                assert_eq!(record.get(field), "");
            }
        }
        assert_eq!(parsed.display_text(), "First Name: Ana\nEmail: a@b.com");
    }

    #[test]
    fn contact_persists_the_parsed_object_not_the_record() {
        let raw = chat_envelope(r#"Here you go: {"first_name": "Ana", "extra": 1}"#);
        let parsed = parse_reply(&raw);

        let persisted = parsed.text_to_persist(&raw);
        let value: Value = serde_json::from_str(&persisted).unwrap();
        assert_eq!(value, json!({ "first_name": "Ana", "extra": 1 }));
    }

    #[test]
    fn persisted_contact_reparses_to_the_same_record() {
        let raw = chat_envelope(r#"{"company_name": "Acme", "phone": "123"}"#);
        let first = parse_reply(&raw);
        let second = parse_reply(&first.text_to_persist(&raw));
        assert_eq!(first.contact(), second.contact());
    }

    #[test]
    fn envelope_with_empty_content_is_empty_response() {
        let parsed = parse_reply(&chat_envelope(""));
        assert_eq!(parsed, ParsedReply::EmptyContent);
        assert_eq!(parsed.display_text(), "Empty response from API");
    }

    #[test]
    fn envelope_without_content_is_empty_response() {
        let parsed = parse_reply(r#"{"message": {"role": "assistant"}}"#);
        assert_eq!(parsed, ParsedReply::EmptyContent);
    }

    #[test]
    fn failure_phrases_short_circuit_extraction() {
        for indicator in FAILURE_INDICATORS {
            let content = format!("The image appears to be {indicator}. {{\"first_name\": \"X\"}}");
            let parsed = parse_reply(&chat_envelope(&content));
            assert!(parsed.is_failure(), "{indicator} should be a failure");
            assert!(parsed.contact().is_none());
            assert!(parsed.display_text().starts_with(FAILURE_PREFIX));
        }
    }

    #[test]
    fn failure_check_is_case_sensitive() {
        let parsed = parse_reply("BASE64 Industries");
        assert!(!parsed.is_failure());
    }

    #[test]
    fn failure_excerpt_is_truncated_to_limit() {
        let content = format!("Base64 {}", "ü".repeat(1000));
        let parsed = parse_reply(&chat_envelope(&content));

        let ParsedReply::ProcessingFailure { excerpt, truncated } = &parsed else {
            panic!("expected failure, got {parsed:?}");
        };
        assert!(truncated);
        assert_eq!(excerpt.chars().count(), FAILURE_EXCERPT_CHARS);

        let shown = parsed.display_text();
        let body = shown
            .strip_prefix(FAILURE_PREFIX)
            .and_then(|rest| rest.strip_suffix(TRUNCATION_SUFFIX))
            .unwrap();
        assert!(body.chars().count() <= FAILURE_EXCERPT_CHARS);
    }

    #[test]
    fn short_failure_is_not_marked_truncated() {
        let parsed = parse_reply("I only see binary data.");
        assert_eq!(
            parsed.display_text(),
            "Image processing failed: I only see binary data."
        );
        assert_eq!(parsed.text_to_persist("I only see binary data."), "I only see binary data.");
    }

    #[test]
    fn bare_json_without_envelope_is_working_text() {
        let raw = r#"{"first_name": "Li", "last_name": "Wei"}"#;
        let parsed = parse_reply(raw);
        assert_eq!(parsed.display_text(), "First Name: Li\nLast Name: Wei");
    }

    #[test]
    fn whitespace_only_field_still_renders_a_line() {
        let parsed = parse_reply(r#"{"first_name":"Ana","last_name":" "}"#);
        assert_eq!(parsed.display_text(), "First Name: Ana\nLast Name:  ");
    }

    #[test]
    fn prose_without_braces_falls_back_to_plain_text() {
        let parsed = parse_reply("Sorry, I cannot read this card.");
        assert_eq!(
            parsed,
            ParsedReply::PlainText("Sorry, I cannot read this card.".into())
        );
        assert_eq!(
            parsed.text_to_persist("ignored"),
            "Sorry, I cannot read this card."
        );
    }

    #[test]
    fn closing_brace_before_opening_brace_is_plain_text() {
        let parsed = parse_reply("} nothing here {");
        assert_eq!(parsed.tier(), "plain_text");
    }

    #[test]
    fn malformed_embedded_json_falls_back_to_working_text() {
        let content = r#"Result: {"first_name": "Ana", } oops"#;
        let parsed = parse_reply(&chat_envelope(content));
        assert_eq!(parsed, ParsedReply::PlainText(content.to_string()));
    }

    #[test]
    fn embedded_array_is_not_a_contact() {
        let parsed = parse_reply(r#"[{"first_name": "A"}, {"first_name": "B"}]"#);
        assert_eq!(parsed.tier(), "plain_text");
    }

    #[test]
    fn numeric_fields_are_coerced_inside_pipeline() {
        let parsed = parse_reply(&chat_envelope(r#"{"postal_code": 1010, "first_name": "Ana"}"#));
        let record = parsed.contact().unwrap();
        assert_eq!(record.postal_code, "1010");
    }
}
