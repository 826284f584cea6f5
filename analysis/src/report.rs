//! Ordering and plain-text rendering of the final findings.

use std::cmp::Ordering;
use std::fmt::Write;

use lintel_core::{Finding, ProjectSnapshot, Severity};
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::session::RunStats;

/// Text used when nothing is reported. Written without a trailing newline.
pub const NO_WARNINGS: &str = "No warnings.";

/// The rendered outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Findings in report order.
    pub diagnostics: Vec<Finding>,
    pub errors: usize,
    pub warnings: usize,
    pub text: String,
    pub stats: RunStats,
}

impl AnalysisReport {
    /// Process exit status for a command-line front end.
    pub fn exit_code(&self, config: &AnalysisConfig) -> i32 {
        if self.errors > 0 && config.set_exit_code {
            1
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Sorts findings into a total order and renders them as text.
pub struct DiagnosticAggregator<'a> {
    snapshot: &'a ProjectSnapshot,
    config: &'a AnalysisConfig,
}

impl<'a> DiagnosticAggregator<'a> {
    pub fn new(snapshot: &'a ProjectSnapshot, config: &'a AnalysisConfig) -> Self {
        Self { snapshot, config }
    }

    pub fn aggregate(&self, mut findings: Vec<Finding>, stats: RunStats) -> AnalysisReport {
        findings.retain(|f| f.severity != Severity::Ignore);
        findings.sort_by(compare_findings);

        let errors = findings.iter().filter(|f| f.severity.is_error()).count();
        let warnings = findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .count();
        let text = self.render(&findings, errors, warnings);

        AnalysisReport {
            diagnostics: findings,
            errors,
            warnings,
            text,
            stats,
        }
    }

    fn render(&self, findings: &[Finding], errors: usize, warnings: usize) -> String {
        if findings.is_empty() {
            return NO_WARNINGS.to_string();
        }
        let mut out = String::new();
        for finding in findings {
            self.render_finding(&mut out, finding);
        }
        let _ = writeln!(out, "{} errors, {} warnings", errors, warnings);
        out
    }

    fn render_finding(&self, out: &mut String, finding: &Finding) {
        let start = finding.location.start;
        let _ = writeln!(
            out,
            "{}:{}: {}: {} [{}]",
            finding.path(),
            start.line + 1,
            severity_label(finding.severity),
            to_text(&finding.message),
            finding.issue_id
        );

        if self.config.show_source_lines {
            if let Some(excerpt) = self.excerpt(finding) {
                out.push_str(&excerpt);
            }
        }

        let mut also_affects = Vec::new();
        for secondary in &finding.secondary {
            let location = &secondary.location;
            match &secondary.message {
                Some(message) => {
                    let _ = writeln!(
                        out,
                        "    {}:{}: {}",
                        location.path,
                        location.start.line + 1,
                        to_text(message)
                    );
                }
                None => also_affects.push(format!("{}:{}", location.path, location.start.line + 1)),
            }
        }
        if self.config.show_everything && !also_affects.is_empty() {
            let _ = writeln!(out, "    Also affects: {}", also_affects.join(", "));
        }
    }

    /// The source line of the primary location with a marker line below it.
    fn excerpt(&self, finding: &Finding) -> Option<String> {
        let contents = self.snapshot.contents(finding.path())?;
        let start = finding.location.start;
        let end = finding.location.end;
        let line = contents.split('\n').nth(start.line as usize)?;
        let line = line.trim_end_matches('\r').replace('\t', " ");
        if line.trim().is_empty() {
            return None;
        }

        let mut excerpt = String::with_capacity(line.len() * 2 + 2);
        excerpt.push_str(&line);
        excerpt.push('\n');
        excerpt.extend(std::iter::repeat(' ').take(start.column as usize));
        if end.line == start.line && end.column > start.column {
            excerpt.extend(std::iter::repeat('~').take((end.column - start.column) as usize));
        } else {
            excerpt.push('^');
        }
        excerpt.push('\n');
        Some(excerpt)
    }
}

/// Report order: path, line, column, then id and message.
pub fn compare_findings(a: &Finding, b: &Finding) -> Ordering {
    let key = |f: &Finding| {
        (
            f.location.path.clone(),
            f.location.start.line,
            f.location.start.column,
        )
    };
    key(a)
        .cmp(&key(b))
        .then_with(|| a.issue_id.cmp(&b.issue_id))
        .then_with(|| a.message.cmp(&b.message))
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Fatal => Severity::Error.description(),
        other => other.description(),
    }
}

/// Convert the raw message format to plain text.
fn to_text(message: &str) -> String {
    message.replace('`', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RunKind;
    use crate::testing::{range_of, source_artifact};
    use lintel_core::{Location, Position, SecondaryLocation};

    fn stats() -> RunStats {
        RunStats {
            kind: RunKind::Full,
            files_collected: 0,
            units_visited: 0,
        }
    }

    fn finding(id: &str, severity: Severity, path: &str, line: u32, column: u32) -> Finding {
        Finding::new(
            id,
            severity,
            format!("{} message", id),
            Location::point(path, Position::new(line, column, 0)),
        )
    }

    // ==================== Ordering Tests ====================

    #[test]
    fn findings_sort_by_path_line_column_then_id() {
        let snapshot = ProjectSnapshot::new("p", Vec::new());
        let config = AnalysisConfig::default();
        let report = DiagnosticAggregator::new(&snapshot, &config).aggregate(
            vec![
                finding("B", Severity::Warning, "b.xml", 0, 0),
                finding("Z", Severity::Warning, "a.xml", 3, 1),
                finding("A", Severity::Warning, "a.xml", 3, 1),
                finding("A", Severity::Warning, "a.xml", 3, 0),
                finding("A", Severity::Warning, "a.xml", 1, 9),
            ],
            stats(),
        );
        let order: Vec<(String, u32, u32, String)> = report
            .diagnostics
            .iter()
            .map(|f| {
                (
                    f.path().to_string(),
                    f.location.start.line,
                    f.location.start.column,
                    f.issue_id.clone(),
                )
            })
            .collect();
        assert_eq!(
            order,
            vec![
                ("a.xml".into(), 1, 9, "A".into()),
                ("a.xml".into(), 3, 0, "A".into()),
                ("a.xml".into(), 3, 1, "A".into()),
                ("a.xml".into(), 3, 1, "Z".into()),
                ("b.xml".into(), 0, 0, "B".into()),
            ]
        );
    }

    // ==================== Text Tests ====================

    #[test]
    fn empty_report_is_no_warnings_without_newline() {
        let snapshot = ProjectSnapshot::new("p", Vec::new());
        let config = AnalysisConfig {
            set_exit_code: true,
            ..AnalysisConfig::default()
        };
        let report = DiagnosticAggregator::new(&snapshot, &config).aggregate(Vec::new(), stats());
        assert_eq!(report.text, "No warnings.");
        assert_eq!(report.exit_code(&config), 0);
        assert!(report.is_empty());
    }

    #[test]
    fn header_uses_one_based_line_and_error_for_fatal() {
        let snapshot = ProjectSnapshot::new("p", Vec::new());
        let config = AnalysisConfig::default();
        let mut fatal = finding("ExtraTranslation", Severity::Fatal, "res/values-de/strings.xml", 4, 0);
        fatal.message = "\"hello\" is translated here but not found in default locale".into();
        let report = DiagnosticAggregator::new(&snapshot, &config).aggregate(vec![fatal], stats());
        assert_eq!(
            report.text,
            "res/values-de/strings.xml:5: Error: \"hello\" is translated here but not found in \
             default locale [ExtraTranslation]\n1 errors, 0 warnings\n"
        );
    }

    #[test]
    fn informational_findings_are_listed_but_not_counted() {
        let snapshot = ProjectSnapshot::new("p", Vec::new());
        let config = AnalysisConfig::default();
        let report = DiagnosticAggregator::new(&snapshot, &config).aggregate(
            vec![finding("LintError", Severity::Informational, "a.xml", 0, 0)],
            stats(),
        );
        assert!(report.text.starts_with("a.xml:1: Information: LintError message [LintError]\n"));
        assert!(report.text.ends_with("0 errors, 0 warnings\n"));
    }

    #[test]
    fn backticks_are_stripped() {
        let snapshot = ProjectSnapshot::new("p", Vec::new());
        let config = AnalysisConfig::default();
        let mut f = finding("X", Severity::Warning, "a.xml", 0, 0);
        f.message = "Array `colors` is odd".into();
        let report = DiagnosticAggregator::new(&snapshot, &config).aggregate(vec![f], stats());
        assert!(report.text.contains("Array colors is odd [X]"));
    }

    #[test]
    fn excerpt_underlines_same_line_ranges() {
        let artifact = source_artifact("src/A.java", "class A {\n\tset(50);\n}\n");
        let range = range_of(&artifact.contents, "50");
        let snapshot = ProjectSnapshot::new("p", vec![artifact]);
        let config = AnalysisConfig::default();
        let f = Finding::new("ShortAlarm", Severity::Warning, "m", Location::new("src/A.java", range));
        let report = DiagnosticAggregator::new(&snapshot, &config).aggregate(vec![f], stats());
        assert_eq!(
            report.text,
            "src/A.java:2: Warning: m [ShortAlarm]\n set(50);\n     ~~\n0 errors, 1 warnings\n"
        );
    }

    #[test]
    fn excerpt_marks_points_with_caret() {
        let artifact = source_artifact("src/A.java", "class A {\n    run();\n}\n");
        let at = Position::at(&artifact.contents, artifact.contents.find("run").unwrap());
        let snapshot = ProjectSnapshot::new("p", vec![artifact]);
        let config = AnalysisConfig::default();
        let f = Finding::new("X", Severity::Error, "m", Location::point("src/A.java", at));
        let report = DiagnosticAggregator::new(&snapshot, &config).aggregate(vec![f], stats());
        assert!(report.text.contains("    run();\n    ^\n"));
    }

    #[test]
    fn excerpt_can_be_disabled() {
        let artifact = source_artifact("src/A.java", "class A {}\n");
        let snapshot = ProjectSnapshot::new("p", vec![artifact]);
        let config = AnalysisConfig {
            show_source_lines: false,
            ..AnalysisConfig::default()
        };
        let f = finding("X", Severity::Warning, "src/A.java", 0, 0);
        let report = DiagnosticAggregator::new(&snapshot, &config).aggregate(vec![f], stats());
        assert!(!report.text.contains("class A"));
    }

    #[test]
    fn secondaries_follow_in_attachment_order() {
        let snapshot = ProjectSnapshot::new("p", Vec::new());
        let config = AnalysisConfig::default();
        let mut f = finding("InconsistentArrays", Severity::Warning, "res/values-de/a.xml", 2, 0);
        f.secondary = vec![
            SecondaryLocation::new(Location::point("res/values/a.xml", Position::new(5, 0, 0)), "second"),
            SecondaryLocation::new(Location::point("res/values-cs/a.xml", Position::new(1, 0, 0)), "first"),
            SecondaryLocation::bare(Location::point("res/values-fr/a.xml", Position::new(0, 0, 0))),
        ];
        let report = DiagnosticAggregator::new(&snapshot, &config).aggregate(vec![f.clone()], stats());
        assert!(report
            .text
            .contains("    res/values/a.xml:6: second\n    res/values-cs/a.xml:2: first\n"));
        assert!(!report.text.contains("Also affects"));

        let config = AnalysisConfig {
            show_everything: true,
            ..AnalysisConfig::default()
        };
        let report = DiagnosticAggregator::new(&snapshot, &config).aggregate(vec![f], stats());
        assert!(report.text.contains("    Also affects: res/values-fr/a.xml:1\n"));
    }

    // ==================== Exit Code Tests ====================

    #[test]
    fn exit_code_requires_errors_and_flag() {
        let snapshot = ProjectSnapshot::new("p", Vec::new());
        let with_flag = AnalysisConfig {
            set_exit_code: true,
            ..AnalysisConfig::default()
        };
        let without_flag = AnalysisConfig::default();

        let errors = DiagnosticAggregator::new(&snapshot, &with_flag)
            .aggregate(vec![finding("X", Severity::Error, "a", 0, 0)], stats());
        assert_eq!(errors.errors, 1);
        assert_eq!(errors.exit_code(&with_flag), 1);
        assert_eq!(errors.exit_code(&without_flag), 0);

        let warnings = DiagnosticAggregator::new(&snapshot, &with_flag)
            .aggregate(vec![finding("X", Severity::Warning, "a", 0, 0)], stats());
        assert_eq!(warnings.exit_code(&with_flag), 0);
    }

    #[test]
    fn report_serializes_counts_and_diagnostics() {
        let snapshot = ProjectSnapshot::new("p", Vec::new());
        let config = AnalysisConfig::default();
        let report = DiagnosticAggregator::new(&snapshot, &config)
            .aggregate(vec![finding("X", Severity::Warning, "a", 0, 0)], stats());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["warnings"], 1);
        assert_eq!(json["diagnostics"][0]["issue_id"], "X");
        assert_eq!(json["stats"]["kind"], "Full");
    }
}
