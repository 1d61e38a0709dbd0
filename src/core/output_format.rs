//! Line formats for synchronous backends
//!
//! - Text: human-readable (default)
//! - Json: one JSON object per line
//! - Logfmt: key=value pairs for log aggregation tools

use super::field::FieldValue;
use super::logger::sanitize_message;
use super::record::Record;
use super::timestamp::TimestampFormat;
use serde::{Deserialize, Serialize};

/// Output format for rendered records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// `[2025-01-08T10:30:45.123Z] [INFO   ] api.auth - Request processed user=42`
    #[default]
    Text,

    /// `{"timestamp":"2025-01-08T10:30:45.123Z","level":"INFO","message":"Request processed"}`
    Json,

    /// `timestamp=2025-01-08T10:30:45.123Z level=INFO message="Request processed"`
    Logfmt,
}

impl OutputFormat {
    pub fn format(&self, record: &Record, timestamp_format: &TimestampFormat) -> String {
        match self {
            OutputFormat::Text => format_text(record, timestamp_format),
            OutputFormat::Json => format_json(record, timestamp_format),
            OutputFormat::Logfmt => format_logfmt(record, timestamp_format),
        }
    }
}

fn format_text(record: &Record, timestamp_format: &TimestampFormat) -> String {
    let mut line = format!(
        "[{}] [{:7}]",
        timestamp_format.format(&record.timestamp),
        record.level.to_str()
    );
    if !record.name.is_empty() {
        line.push(' ');
        line.push_str(&record.name);
    }
    line.push_str(" - ");
    line.push_str(&sanitize_message(&record.message));

    if !record.fields.is_empty() {
        line.push(' ');
        line.push_str(&record.fields.format_fields());
    }
    line
}

fn format_json(record: &Record, timestamp_format: &TimestampFormat) -> String {
    let mut json_obj = serde_json::Map::new();
    json_obj.insert(
        "timestamp".to_string(),
        timestamp_format.to_json_value(&record.timestamp),
    );
    json_obj.insert(
        "level".to_string(),
        serde_json::Value::String(record.level.to_str().to_string()),
    );
    if !record.name.is_empty() {
        json_obj.insert(
            "name".to_string(),
            serde_json::Value::String(record.name.clone()),
        );
    }
    json_obj.insert(
        "message".to_string(),
        serde_json::Value::String(record.message.clone()),
    );
    if !record.fields.is_empty() {
        json_obj.insert(
            "fields".to_string(),
            serde_json::Value::Object(record.fields.to_json_map()),
        );
    }

    serde_json::to_string(&serde_json::Value::Object(json_obj)).unwrap_or_default()
}

fn format_logfmt(record: &Record, timestamp_format: &TimestampFormat) -> String {
    let mut parts = vec![
        format!(
            "timestamp={}",
            escape_logfmt_value(&timestamp_format.format(&record.timestamp))
        ),
        format!("level={}", record.level.to_str()),
    ];
    if !record.name.is_empty() {
        parts.push(format!("name={}", escape_logfmt_value(&record.name)));
    }
    // Message is always quoted
    parts.push(format!("message={}", quote_logfmt_value(&record.message)));

    for field in &record.fields.fields {
        let value = match &field.value {
            FieldValue::String(s) | FieldValue::Error(s) => quote_logfmt_value(s),
            FieldValue::Map(_) | FieldValue::List(_) => {
                quote_logfmt_value(&field.value.to_string())
            }
            other => other.to_string(),
        };
        parts.push(format!("{}={}", escape_logfmt_key(&field.key), value));
    }

    parts.join(" ")
}

/// Keep only characters that are safe in a bare logfmt key
fn escape_logfmt_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || *c == '.')
        .collect()
}

fn escape_logfmt_value(value: &str) -> String {
    if value.contains(' ') || value.contains('"') || value.contains('=') {
        quote_logfmt_value(value)
    } else {
        value.to_string()
    }
}

fn quote_logfmt_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", sanitize_message(&escaped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Field, Handle, Level};
    use chrono::TimeZone;
    use chrono::Utc;

    fn record(message: &str, fields: &[Field]) -> Record {
        let timestamp = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).single().unwrap();
        let handle = Handle::with_name("api").with(&[Field::new("user_id", 123)]);
        Record::at(timestamp, &handle, Level::Info, message, fields)
    }

    #[test]
    fn test_text_format() {
        let line = OutputFormat::Text.format(
            &record("User logged in", &[Field::new("action", "login")]),
            &TimestampFormat::Iso8601,
        );
        assert_eq!(
            line,
            "[2025-01-08T10:30:45.000Z] [INFO   ] api - User logged in user_id=123 action=login"
        );
    }

    #[test]
    fn test_text_format_root_handle() {
        let timestamp = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).single().unwrap();
        let record = Record::at(timestamp, &Handle::new(), Level::Error, "boom", &[]);
        let line = OutputFormat::Text.format(&record, &TimestampFormat::Unix);
        assert_eq!(line, "[1736332245] [ERROR  ] - boom");
    }

    #[test]
    fn test_json_format() {
        let line = OutputFormat::Json.format(
            &record("Request processed", &[Field::new("status", 200)]),
            &TimestampFormat::UnixMillis,
        );
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(parsed["timestamp"], 1736332245000_i64);
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["name"], "api");
        assert_eq!(parsed["message"], "Request processed");
        assert_eq!(parsed["fields"]["user_id"], 123);
        assert_eq!(parsed["fields"]["status"], 200);
    }

    #[test]
    fn test_logfmt_format() {
        let line = OutputFormat::Logfmt.format(
            &record("Said \"hi\"", &[Field::new("bad key!", "a b")]),
            &TimestampFormat::Iso8601,
        );

        assert!(line.starts_with("timestamp=2025-01-08T10:30:45.000Z level=INFO name=api"));
        assert!(line.contains(r#"message="Said \"hi\"""#));
        assert!(line.contains("user_id=123"));
        assert!(line.contains(r#"badkey="a b""#));
    }

    #[test]
    fn test_control_characters_escaped_once() {
        let record = record("a\nERROR forged\t", &[Field::new("note", "x\ny")]);

        let json = OutputFormat::Json.format(&record, &TimestampFormat::Unix);
        assert!(!json.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["message"], "a\nERROR forged\t");
        assert_eq!(parsed["fields"]["note"], "x\ny");

        let text = OutputFormat::Text.format(&record, &TimestampFormat::Unix);
        assert!(text.contains(r"- a\nERROR forged\t user_id=123"));

        let logfmt = OutputFormat::Logfmt.format(&record, &TimestampFormat::Unix);
        assert!(!logfmt.contains('\n'));
        assert!(logfmt.contains(r#"message="a\nERROR forged\t""#));
        assert!(logfmt.contains(r#"note="x\ny""#));
    }

    #[test]
    fn test_format_serde() {
        let format: OutputFormat = serde_json::from_str("\"logfmt\"").unwrap();
        assert_eq!(format, OutputFormat::Logfmt);
    }
}
