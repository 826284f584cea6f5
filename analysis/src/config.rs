use std::collections::{BTreeMap, BTreeSet};

use glob::Pattern;
use lintel_core::Severity;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Execution knobs of the engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker threads used for per-file passes.
    pub max_parallel_files: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel_files: 16,
        }
    }
}

/// Project-level analysis configuration: which issues run, at what
/// severity, and how the report is rendered.
///
/// Every id list accepts comma-separated entries (`"A,B"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Ids disabled globally; `all` disables every issue.
    pub suppressed_ids: BTreeSet<String>,
    /// Ids enabled on top of the defaults, including issues disabled by default.
    pub enabled_ids: BTreeSet<String>,
    /// When set, only these ids run.
    pub exact_checked_ids: Option<BTreeSet<String>>,
    pub severity_overrides: BTreeMap<String, Severity>,
    /// Glob patterns per id (or `all`) whose matching paths are not reported.
    pub ignore_paths: BTreeMap<String, Vec<String>>,
    /// Enable issues that are disabled by default.
    pub check_all_warnings: bool,
    /// Drop warnings and informational findings.
    pub ignore_warnings: bool,
    /// Report warnings as errors.
    pub warnings_as_errors: bool,
    /// Only run fatal issues.
    pub fatal_only: bool,
    pub show_source_lines: bool,
    /// Also list secondary locations that carry no description.
    pub show_everything: bool,
    /// Exit with a non-zero code when errors are reported.
    pub set_exit_code: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            suppressed_ids: BTreeSet::new(),
            enabled_ids: BTreeSet::new(),
            exact_checked_ids: None,
            severity_overrides: BTreeMap::new(),
            ignore_paths: BTreeMap::new(),
            check_all_warnings: false,
            ignore_warnings: false,
            warnings_as_errors: false,
            fatal_only: false,
            show_source_lines: true,
            show_everything: false,
            set_exit_code: false,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: AnalysisConfig =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        for patterns in config.ignore_paths.values() {
            for pattern in patterns {
                Pattern::new(pattern).map_err(|e| {
                    EngineError::Config(format!("invalid ignore pattern `{}`: {}", pattern, e))
                })?;
            }
        }
        Ok(config)
    }

    /// Effective severity of an issue under this configuration.
    ///
    /// `Severity::Ignore` means the issue does not run.
    pub fn severity_for(&self, id: &str, default: Severity, enabled_by_default: bool) -> Severity {
        if let Some(exact) = &self.exact_checked_ids {
            if !list_contains(exact, id) {
                return Severity::Ignore;
            }
        }
        let explicitly_enabled = list_contains(&self.enabled_ids, id)
            || self
                .exact_checked_ids
                .as_ref()
                .map(|exact| list_contains(exact, id))
                .unwrap_or(false);
        let override_severity = self.severity_override(id);
        let mut severity = override_severity.unwrap_or(default);

        if !enabled_by_default
            && !self.check_all_warnings
            && !explicitly_enabled
            && override_severity.is_none()
        {
            return Severity::Ignore;
        }
        if self.is_disabled(id) {
            return Severity::Ignore;
        }
        if self.fatal_only && severity != Severity::Fatal {
            return Severity::Ignore;
        }
        if self.ignore_warnings && matches!(severity, Severity::Warning | Severity::Informational) {
            return Severity::Ignore;
        }
        if self.warnings_as_errors && severity == Severity::Warning {
            severity = Severity::Error;
        }
        severity
    }

    /// True when the id is globally disabled.
    pub fn is_disabled(&self, id: &str) -> bool {
        list_contains(&self.suppressed_ids, id)
    }

    /// True when an `ignore_paths` pattern for the id (or `all`) matches `path`.
    pub fn is_path_ignored(&self, id: &str, path: &str) -> bool {
        self.ignore_paths
            .iter()
            .filter(|(key, _)| split_ids(key).any(|k| k == id || k == ALL_IDS))
            .flat_map(|(_, patterns)| patterns.iter())
            .filter_map(|p| Pattern::new(p).ok())
            .any(|p| p.matches(path))
    }

    fn severity_override(&self, id: &str) -> Option<Severity> {
        self.severity_overrides
            .iter()
            .find(|(key, _)| split_ids(key).any(|k| k == id))
            .map(|(_, severity)| *severity)
    }
}

/// Wildcard id matching every issue.
pub const ALL_IDS: &str = "all";

/// Split a comma-separated id list, trimming blanks.
pub fn split_ids(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn list_contains(list: &BTreeSet<String>, id: &str) -> bool {
    list.iter()
        .flat_map(|entry| split_ids(entry))
        .any(|entry| entry == id || entry == ALL_IDS)
}
