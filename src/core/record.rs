//! A single rendered log event

use super::{
    field::{Field, ResolvedFields},
    handle::Handle,
    level::Level,
};
use chrono::{DateTime, Utc};

/// Everything a synchronous backend needs to render one event
#[derive(Debug, Clone)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    /// Dot-joined handle name, empty for the root
    pub name: String,
    /// Message as logged; line formats escape it as needed
    pub message: String,
    /// Handle fields followed by call fields, last occurrence wins
    pub fields: ResolvedFields,
}

impl Record {
    pub fn new(handle: &Handle, level: Level, message: &str, call_fields: &[Field]) -> Self {
        Self::at(Utc::now(), handle, level, message, call_fields)
    }

    /// Record with an explicit timestamp
    pub fn at(
        timestamp: DateTime<Utc>,
        handle: &Handle,
        level: Level,
        message: &str,
        call_fields: &[Field],
    ) -> Self {
        Self {
            timestamp,
            level,
            name: handle.name(),
            message: message.to_string(),
            fields: handle.fields().resolve(call_fields),
        }
    }

    /// Keys that were given more than once across handle and call fields
    pub fn shadowed(&self) -> &[String] {
        &self.fields.shadowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_resolves_fields() {
        let handle = Handle::with_name("api.auth").with(&[Field::new("user", "a")]);
        let record = Record::new(
            &handle,
            Level::Info,
            "login\nINFO forged",
            &[Field::new("user", "b"), Field::new("ok", true)],
        );

        assert_eq!(record.name, "api.auth");
        assert_eq!(record.message, "login\nINFO forged");
        assert_eq!(record.fields.format_fields(), "user=b ok=true");
        assert_eq!(record.shadowed(), ["user".to_string()]);
    }
}
