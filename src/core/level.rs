//! Log level definitions and the per-backend level gate

use super::error::LoggerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Event severity, also used as a backend threshold
///
/// Ordered `Debug < Info < Warning < Error < Disabled`. `Disabled` is only
/// meaningful as a threshold: a backend configured with it emits nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    #[default]
    Debug = 1,
    Info = 2,
    Warning = 3,
    Error = 4,
    Disabled = 5,
}

impl Level {
    /// Every severity an event can carry (excludes `Disabled`)
    pub const EVENTS: [Level; 4] = [Level::Debug, Level::Info, Level::Warning, Level::Error];

    pub fn to_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Disabled => "DISABLED",
        }
    }

    /// Whether a backend with this threshold emits an event of `event` severity
    #[inline]
    pub fn allows(self, event: Level) -> bool {
        can_log(self, event)
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            Level::Debug => Blue,
            Level::Info => Green,
            Level::Warning => Yellow,
            Level::Error => Red,
            Level::Disabled => BrightBlack,
        }
    }
}

/// Level gate: `threshold <= event`, and a `Disabled` threshold rejects all
#[inline]
pub fn can_log(threshold: Level, event: Level) -> bool {
    threshold != Level::Disabled && threshold <= event
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        match normalized.as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARNING" | "WARN" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "DISABLED" | "DISABLE" | "OFF" => Ok(Level::Disabled),
            _ => Err(LoggerError::InvalidLevel(s.to_string())),
        }
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.to_str())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Disabled);
    }

    #[test]
    fn test_gate() {
        assert!(can_log(Level::Debug, Level::Debug));
        assert!(can_log(Level::Info, Level::Error));
        assert!(!can_log(Level::Warning, Level::Info));
        for event in Level::EVENTS {
            assert!(!can_log(Level::Disabled, event));
        }
        assert!(!Level::Disabled.allows(Level::Disabled));
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!(" War ning ".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("off".parse::<Level>().unwrap(), Level::Disabled);
        assert_eq!("Disable".parse::<Level>().unwrap(), Level::Disabled);
        assert_eq!("debug".parse::<Level>().unwrap(), Level::Debug);
        assert!(matches!(
            "verbose".parse::<Level>(),
            Err(LoggerError::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_serde_uses_text_form() {
        let json = serde_json::to_string(&Level::Warning).unwrap();
        assert_eq!(json, "\"WARNING\"");
        let parsed: Level = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(parsed, Level::Warning);
        assert!(serde_json::from_str::<Level>("\"loud\"").is_err());
    }
}
