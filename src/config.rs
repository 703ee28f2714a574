//! Engine configuration.
//!
//! Loaded from TOML at startup; every field has a default so an empty
//! document is a valid configuration.
//!
//! ```toml
//! enforce_composition = true
//! allow_teacher_override = true
//!
//! [calendar]
//! max_periods = 8
//! days = [
//!     { day = "Monday", active = true, period_count = 8 },
//!     { day = "Friday", active = true, period_count = 5 },
//! ]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::WeekCalendar;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Placement engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Block commits that break slot composition (mixed standard/grouped,
    /// mixed group sets, duplicate group). When false those rules are
    /// reported by the availability matrix only.
    pub enforce_composition: bool,

    /// Honour caller overrides of teacher double-booking.
    pub allow_teacher_override: bool,

    /// Default week for new timetables.
    pub calendar: WeekCalendar,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enforce_composition: true,
            allow_teacher_override: true,
            calendar: WeekCalendar::default(),
        }
    }
}

impl EngineConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Day;

    #[test]
    fn test_empty_document_uses_defaults() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert!(cfg.enforce_composition);
        assert!(cfg.allow_teacher_override);
        assert_eq!(cfg.calendar.weekly_capacity(), 40);
    }

    #[test]
    fn test_parse_full_document() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            enforce_composition = false
            allow_teacher_override = false

            [calendar]
            max_periods = 7
            days = [
                { day = "Sunday", active = true, period_count = 7 },
                { day = "Thursday", active = true, period_count = 5 },
                { day = "Friday", active = false, period_count = 0 },
            ]
            "#,
        )
        .unwrap();

        assert!(!cfg.enforce_composition);
        assert!(!cfg.allow_teacher_override);
        assert_eq!(cfg.calendar.max_periods, 7);
        assert_eq!(cfg.calendar.active_period_count(Day::Thursday), 5);
        assert_eq!(cfg.calendar.active_period_count(Day::Friday), 0);
    }

    #[test]
    fn test_invalid_document() {
        let err = EngineConfig::from_toml_str("enforce_composition = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load("/nonexistent/u-timetable.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
