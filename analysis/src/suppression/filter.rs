//! Filtering of suppressed findings.

use std::collections::BTreeMap;

use lintel_core::artifact::{Annotation, ArtifactTree, Element, SourceNode, TOOLS_IGNORE};
use lintel_core::{Artifact, Finding, ProjectSnapshot};

use crate::catalog::LINT_ERROR;
use crate::config::{split_ids, AnalysisConfig};
use crate::suppression::model::{CommentSuppression, MarkerSource, SuppressionMarker};
use crate::suppression::parser::parse_comment_suppressions;

/// Decides whether a finding is silenced by a marker in its file or by
/// configuration.
///
/// A marker on a node covers every finding located inside that node,
/// including its descendants. Markers never travel upward: a marker on a
/// child does not silence a finding on its parent.
pub struct SuppressionFilter<'a> {
    snapshot: &'a ProjectSnapshot,
    config: &'a AnalysisConfig,
}

impl<'a> SuppressionFilter<'a> {
    pub fn new(snapshot: &'a ProjectSnapshot, config: &'a AnalysisConfig) -> Self {
        Self { snapshot, config }
    }

    /// Remove suppressed findings, preserving the order of the rest.
    pub fn filter(&self, findings: Vec<Finding>) -> Vec<Finding> {
        let mut comments: BTreeMap<String, Vec<CommentSuppression>> = BTreeMap::new();
        findings
            .into_iter()
            .filter(|finding| !self.is_suppressed_with(finding, &mut comments))
            .collect()
    }

    /// Check a single finding.
    pub fn is_suppressed(&self, finding: &Finding) -> bool {
        self.is_suppressed_with(finding, &mut BTreeMap::new())
    }

    fn is_suppressed_with(
        &self,
        finding: &Finding,
        comments: &mut BTreeMap<String, Vec<CommentSuppression>>,
    ) -> bool {
        let id = finding.issue_id.as_str();
        if id == LINT_ERROR {
            return false;
        }
        if self.config.is_disabled(id) || self.config.is_path_ignored(id, finding.path()) {
            return true;
        }

        let Some(artifact) = self.snapshot.get(finding.path()) else {
            return false;
        };
        let comments = comments
            .entry(artifact.path.clone())
            .or_insert_with(|| parse_comment_suppressions(&artifact.contents));

        suppressed_in_artifact(artifact, finding, comments)
    }
}

fn suppressed_in_artifact(
    artifact: &Artifact,
    finding: &Finding,
    comments: &[CommentSuppression],
) -> bool {
    let id = finding.issue_id.as_str();
    let offset = finding.location.start.offset;
    let contents = &artifact.contents;

    let preceded = |node_start: usize| {
        comments
            .iter()
            .any(|c| c.marker.matches(id) && c.immediately_precedes(contents, node_start))
    };

    match &artifact.tree {
        ArtifactTree::Manifest(root) | ArtifactTree::Resource(root) => root
            .path_to(offset)
            .into_iter()
            .any(|element| {
                element_marker(element).is_some_and(|m| m.matches(id))
                    || preceded(element.range.start.offset)
            }),
        ArtifactTree::Source(root) => root
            .path_to(offset)
            .into_iter()
            .any(|node| node_suppresses(node, id) || preceded(node.range.start.offset)),
        ArtifactTree::Member(class) => {
            let line = finding.location.start.line;
            annotations_suppress(&class.annotations, id)
                || class
                    .methods_at_line(line)
                    .any(|method| annotations_suppress(&method.annotations, id))
        }
    }
}

fn element_marker(element: &Element) -> Option<SuppressionMarker> {
    element
        .attribute_value(TOOLS_IGNORE)
        .map(|value| SuppressionMarker::new(split_ids(value), MarkerSource::Attribute))
}

fn node_suppresses(node: &SourceNode, id: &str) -> bool {
    annotations_suppress(&node.annotations, id)
}

fn annotations_suppress(annotations: &[Annotation], id: &str) -> bool {
    annotations
        .iter()
        .filter(|a| a.is_suppression())
        .any(|a| SuppressionMarker::new(&a.values, MarkerSource::Annotation).matches(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lintel_core::artifact::{
        ClassFile, DocumentWriter, Instruction, MethodMember, NodeKind, Opcode,
    };
    use lintel_core::{Location, Severity, TextRange};

    fn finding_at(id: &str, path: &str, contents: &str, offset: usize) -> Finding {
        let range = TextRange::from_offsets(contents, offset, offset + 1);
        Finding::new(id, Severity::Warning, "message", Location::new(path, range))
    }

    fn layout(with_ignore: Option<&str>, comment: Option<&str>) -> Artifact {
        let mut w = DocumentWriter::new();
        match with_ignore {
            Some(ids) => w.start("LinearLayout", &[("tools:ignore", ids)]),
            None => w.start("LinearLayout", &[]),
        };
        if let Some(text) = comment {
            w.comment(text);
        }
        w.leaf("Button", &[("android:id", "@+id/ok")], None);
        w.end();
        Artifact::resource("res/layout/main.xml", w.finish().unwrap())
    }

    fn snapshot_of(artifacts: Vec<Artifact>) -> ProjectSnapshot {
        ProjectSnapshot::new("app", artifacts)
    }

    // ==================== Markup Tests ====================

    #[test]
    fn tools_ignore_on_ancestor_covers_child() {
        let artifact = layout(Some("DuplicateIds"), None);
        let offset = artifact.contents.find("<Button").unwrap();
        let finding = finding_at("DuplicateIds", &artifact.path, &artifact.contents, offset);
        let snapshot = snapshot_of(vec![artifact]);
        let config = AnalysisConfig::default();

        assert!(SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));
    }

    #[test]
    fn tools_ignore_for_other_id_does_not_apply() {
        let artifact = layout(Some("TooManyViews"), None);
        let offset = artifact.contents.find("<Button").unwrap();
        let finding = finding_at("DuplicateIds", &artifact.path, &artifact.contents, offset);
        let snapshot = snapshot_of(vec![artifact]);
        let config = AnalysisConfig::default();

        assert!(!SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));
    }

    #[test]
    fn tools_ignore_all_covers_any_id() {
        let artifact = layout(Some("all"), None);
        let finding = finding_at("TooDeepLayout", &artifact.path, &artifact.contents, 0);
        let snapshot = snapshot_of(vec![artifact]);
        let config = AnalysisConfig::default();

        assert!(SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));
    }

    #[test]
    fn marker_on_child_does_not_cover_parent() {
        let mut w = DocumentWriter::new();
        w.start("LinearLayout", &[]);
        w.leaf("Button", &[("tools:ignore", "TooManyViews")], None);
        w.end();
        let artifact = Artifact::resource("res/layout/main.xml", w.finish().unwrap());
        let finding = finding_at("TooManyViews", &artifact.path, &artifact.contents, 0);
        let snapshot = snapshot_of(vec![artifact]);
        let config = AnalysisConfig::default();

        assert!(!SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));
    }

    #[test]
    fn preceding_markup_comment_covers_next_element() {
        let artifact = layout(None, Some("suppress DuplicateIds"));
        let offset = artifact.contents.find("<Button").unwrap();
        let finding = finding_at("DuplicateIds", &artifact.path, &artifact.contents, offset);
        let snapshot = snapshot_of(vec![artifact]);
        let config = AnalysisConfig::default();

        assert!(SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));
    }

    // ==================== Source Tests ====================

    fn source_with_call(prefix: &str, annotation: Option<Annotation>) -> (Artifact, usize) {
        let contents = format!("class A {{\n  void m() {{\n    {}alarm.setRepeating(0, 10, 50, p);\n  }}\n}}\n", prefix);
        let call_start = contents.find("alarm").unwrap();
        let call_end = contents.rfind(';').unwrap();
        let method_start = contents.find("void").unwrap();
        let method_end = contents.rfind("  }").unwrap() + 3;
        let literal = contents.find("50").unwrap();

        let call = SourceNode::new(NodeKind::Call, TextRange::from_offsets(&contents, call_start, call_end))
            .named("setRepeating")
            .with_child(SourceNode::new(
                NodeKind::Literal,
                TextRange::from_offsets(&contents, literal, literal + 2),
            ));
        let mut method = SourceNode::new(
            NodeKind::Method,
            TextRange::from_offsets(&contents, method_start, method_end),
        )
        .named("m")
        .with_child(call);
        if let Some(annotation) = annotation {
            method = method.with_annotation(annotation);
        }
        let unit = SourceNode::new(NodeKind::Unit, TextRange::from_offsets(&contents, 0, contents.len()))
            .with_child(method);
        let artifact = Artifact::new("src/A.java", contents.as_str(), ArtifactTree::Source(unit));
        (artifact, literal)
    }

    #[test]
    fn suppress_annotation_on_method_covers_nested_call() {
        let annotation = Annotation::new("android.annotation.SuppressLint", vec!["ShortAlarm".into()]);
        let (artifact, literal) = source_with_call("", Some(annotation));
        let finding = finding_at("ShortAlarm", &artifact.path, &artifact.contents, literal);
        let snapshot = snapshot_of(vec![artifact]);
        let config = AnalysisConfig::default();

        assert!(SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));
    }

    #[test]
    fn unrelated_annotation_does_not_suppress() {
        let annotation = Annotation::new("Override", vec!["ShortAlarm".into()]);
        let (artifact, literal) = source_with_call("", Some(annotation));
        let finding = finding_at("ShortAlarm", &artifact.path, &artifact.contents, literal);
        let snapshot = snapshot_of(vec![artifact]);
        let config = AnalysisConfig::default();

        assert!(!SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));
    }

    #[test]
    fn noinspection_comment_before_statement() {
        let (artifact, literal) = source_with_call("//noinspection ShortAlarm\n    ", None);
        let finding = finding_at("ShortAlarm", &artifact.path, &artifact.contents, literal);
        let snapshot = snapshot_of(vec![artifact]);
        let config = AnalysisConfig::default();

        assert!(SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));
    }

    #[test]
    fn comment_separated_by_code_does_not_suppress() {
        let (artifact, literal) = source_with_call("//noinspection ShortAlarm\n    x(); ", None);
        let finding = finding_at("ShortAlarm", &artifact.path, &artifact.contents, literal);
        let snapshot = snapshot_of(vec![artifact]);
        let config = AnalysisConfig::default();

        assert!(!SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));
    }

    // ==================== Member Tests ====================

    #[test]
    fn method_annotation_covers_member_finding() {
        let mut class = ClassFile::new("com/example/View");
        class.methods.push(MethodMember {
            name: "onDraw".into(),
            descriptor: "(Landroid/graphics/Canvas;)V".into(),
            annotations: vec![Annotation::new("SuppressLint", vec!["DrawAllocation".into()])],
            instructions: vec![Instruction {
                opcode: Opcode::New,
                operand: "android/graphics/Paint".into(),
                line: 12,
            }],
        });
        let artifact = Artifact::new("classes/View.class", "", ArtifactTree::Member(class));
        let mut finding = finding_at("DrawAllocation", &artifact.path, "", 0);
        finding.location.start.line = 12;
        let snapshot = snapshot_of(vec![artifact]);
        let config = AnalysisConfig::default();

        assert!(SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));

        finding.location.start.line = 30;
        assert!(!SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));
    }

    // ==================== Configuration Tests ====================

    #[test]
    fn disabled_id_is_suppressed_everywhere() {
        let artifact = layout(None, None);
        let finding = finding_at("TooManyViews", &artifact.path, &artifact.contents, 0);
        let snapshot = snapshot_of(vec![artifact]);
        let config = AnalysisConfig {
            suppressed_ids: ["TooManyViews".to_string()].into_iter().collect(),
            ..Default::default()
        };

        assert!(SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));
    }

    #[test]
    fn ignored_path_is_suppressed() {
        let artifact = layout(None, None);
        let finding = finding_at("TooManyViews", &artifact.path, &artifact.contents, 0);
        let snapshot = snapshot_of(vec![artifact]);
        let mut config = AnalysisConfig::default();
        config
            .ignore_paths
            .insert("TooManyViews".into(), vec!["res/layout/*".into()]);

        assert!(SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));
    }

    #[test]
    fn lint_error_is_never_suppressed() {
        let artifact = layout(Some("all"), None);
        let finding = Finding::new(
            LINT_ERROR,
            Severity::Informational,
            "boom",
            Location::file_start(artifact.path.clone()),
        );
        let snapshot = snapshot_of(vec![artifact]);
        let config = AnalysisConfig {
            suppressed_ids: ["all".to_string()].into_iter().collect(),
            ..Default::default()
        };

        assert!(!SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));
    }

    #[test]
    fn filter_keeps_order_of_survivors() {
        let artifact = layout(None, None);
        let a = finding_at("A", &artifact.path, &artifact.contents, 0);
        let b = finding_at("B", &artifact.path, &artifact.contents, 1);
        let c = finding_at("C", &artifact.path, &artifact.contents, 2);
        let snapshot = snapshot_of(vec![artifact]);
        let config = AnalysisConfig {
            suppressed_ids: ["B".to_string()].into_iter().collect(),
            ..Default::default()
        };

        let kept = SuppressionFilter::new(&snapshot, &config).filter(vec![a, b, c]);
        let ids: Vec<&str> = kept.iter().map(|f| f.issue_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
    }

    #[test]
    fn finding_in_unknown_file_is_kept() {
        let finding = finding_at("A", "missing.xml", "abc", 0);
        let snapshot = snapshot_of(vec![]);
        let config = AnalysisConfig::default();

        assert!(!SuppressionFilter::new(&snapshot, &config).is_suppressed(&finding));
    }
}
