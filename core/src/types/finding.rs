use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::location::{Location, SecondaryLocation};

/// Severity of a finding, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Fatal,
    Error,
    Warning,
    Informational,
    Ignore,
}

impl Severity {
    /// Fatal and Error findings count towards the error total.
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Fatal | Severity::Error)
    }

    pub fn description(self) -> &'static str {
        match self {
            Severity::Fatal => "Fatal",
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Informational => "Information",
            Severity::Ignore => "Ignore",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Broad grouping of issues, used for listings and configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Correctness,
    Performance,
    Security,
    Usability,
    Accessibility,
    Messages,
    Lint,
}

/// A positioned diagnostic produced by a detector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    pub issue_id: String,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary: Vec<SecondaryLocation>,
}

impl Finding {
    pub fn new(
        issue_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            issue_id: issue_id.into(),
            severity,
            message: message.into(),
            location,
            secondary: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.location.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::location::Position;

    // ==================== Severity Tests ====================

    #[test]
    fn fatal_and_error_are_errors() {
        assert!(Severity::Fatal.is_error());
        assert!(Severity::Error.is_error());
        assert!(!Severity::Warning.is_error());
        assert!(!Severity::Informational.is_error());
        assert!(!Severity::Ignore.is_error());
    }

    #[test]
    fn severity_descriptions() {
        assert_eq!(Severity::Informational.to_string(), "Information");
        assert_eq!(Severity::Fatal.to_string(), "Fatal");
    }

    #[test]
    fn severity_orders_most_severe_first() {
        assert!(Severity::Fatal < Severity::Error);
        assert!(Severity::Warning < Severity::Ignore);
    }

    #[test]
    fn severity_serde_uses_variant_names() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"Warning\"");
        let parsed: Severity = serde_json::from_str("\"Fatal\"").unwrap();
        assert_eq!(parsed, Severity::Fatal);
    }

    // ==================== Finding Tests ====================

    #[test]
    fn finding_serializes_without_empty_secondaries() {
        let finding = Finding::new(
            "ShortAlarm",
            Severity::Warning,
            "too short",
            Location::point("src/A.java", Position::new(2, 4, 30)),
        );
        let json = serde_json::to_string(&finding).unwrap();
        assert!(json.contains("\"issue_id\":\"ShortAlarm\""));
        assert!(!json.contains("secondary"));

        let back: Finding = serde_json::from_str(&json).unwrap();
        assert_eq!(back, finding);
    }

    #[test]
    fn finding_path_comes_from_location() {
        let finding = Finding::new(
            "X",
            Severity::Error,
            "m",
            Location::file_start("res/values/a.xml"),
        );
        assert_eq!(finding.path(), "res/values/a.xml");
    }
}
