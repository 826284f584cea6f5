//! Arrays whose item count differs between configuration variants.

use std::sync::Arc;

use lintel_core::artifact::ResourceDir;
use lintel_core::{Artifact, ArtifactTree, Category, ScopeSet, Severity};

use crate::catalog::{Implementation, Issue};
use crate::detectors::{Detector, Incident, IndexSink, ProjectContext};
use crate::index::{SymbolEntry, SymbolKind, SymbolName, SymbolValue};

pub const INCONSISTENT_ARRAYS: &str = "InconsistentArrays";

const ARRAY_TAGS: [&str; 3] = ["array", "string-array", "integer-array"];

/// `values-de/arrays.xml` for a resource path, the path itself otherwise.
fn short_path(path: &str) -> String {
    ResourceDir::parse(path)
        .map(|dir| dir.display())
        .unwrap_or_else(|| path.to_string())
}

fn count_of(entry: &SymbolEntry) -> usize {
    entry.value.count().unwrap_or(0)
}

#[derive(Debug, Default)]
pub struct ArraySizeDetector;

impl ArraySizeDetector {
    fn check(name: &str, ctx: &mut ProjectContext<'_>) {
        let symbol = SymbolName::new(SymbolKind::Array, name);
        if !ctx.needs_check(&symbol) {
            return;
        }
        let index = ctx.index();
        let baseline = index
            .variants(SymbolKind::Array, name)
            .find(|(qualifier, _)| qualifier.is_empty())
            .and_then(|(_, entries)| entries.first());

        let mut declarations: Vec<&SymbolEntry> = index
            .variants(SymbolKind::Array, name)
            .flat_map(|(_, entries)| entries.iter())
            .collect();
        declarations.sort_by(|a, b| {
            a.path()
                .cmp(b.path())
                .then(a.location.start.offset.cmp(&b.location.start.offset))
        });

        let Some(baseline) = baseline.or_else(|| declarations.first().copied()) else {
            return;
        };
        let expected = count_of(baseline);
        let Some(primary) = declarations.iter().copied().find(|d| count_of(d) != expected) else {
            return;
        };

        let others: Vec<&SymbolEntry> = declarations
            .iter()
            .copied()
            .filter(|d| !std::ptr::eq(*d, primary))
            .collect();
        let mut counts = vec![format!("{} in `{}`", count_of(primary), short_path(primary.path()))];
        counts.extend(
            others
                .iter()
                .map(|d| format!("{} in `{}`", count_of(d), short_path(d.path()))),
        );
        let message = format!(
            "Array `{}` has an inconsistent number of items ({})",
            name,
            counts.join(", ")
        );

        let mut incident = Incident::new(INCONSISTENT_ARRAYS, primary.location.clone(), message);
        for other in others {
            incident = incident.with_secondary(
                other.location.clone(),
                format!("Declaration with array size ({})", count_of(other)),
            );
        }
        ctx.report_for(symbol, incident);
    }
}

impl Detector for ArraySizeDetector {
    fn name(&self) -> &'static str {
        "ArraySizeDetector"
    }

    fn capabilities(&self) -> ScopeSet {
        ScopeSet::RESOURCE_AND_PROJECT_SCOPE
    }

    fn requires_whole_project(&self) -> bool {
        true
    }

    fn collect(&self, artifact: &Artifact, sink: &mut IndexSink<'_>) -> anyhow::Result<()> {
        let ArtifactTree::Resource(root) = &artifact.tree else {
            return Ok(());
        };
        if artifact.resource_dir().map(|d| d.resource_type) != Some("values") {
            return Ok(());
        }
        for element in &root.children {
            if !ARRAY_TAGS.contains(&element.tag.as_str()) {
                continue;
            }
            let Some(name) = element.attribute_value("name") else {
                continue;
            };
            let items = element.children_named("item").count();
            sink.declare(SymbolKind::Array, name, element.range, SymbolValue::Count(items));
        }
        Ok(())
    }

    fn after_project(&self, ctx: &mut ProjectContext<'_>) -> anyhow::Result<()> {
        let index = ctx.index();
        for name in index.names(SymbolKind::Array) {
            Self::check(name, ctx);
        }
        Ok(())
    }
}

pub fn issues() -> Vec<Issue> {
    let detector: Arc<dyn Detector> = Arc::new(ArraySizeDetector);
    vec![Issue::create(
        INCONSISTENT_ARRAYS,
        "Inconsistencies in array element counts",
        "When an array is translated in a different locale, it should normally have \
         the same number of items as the original array. When adding or removing \
         elements to an array, it is easy to forget to update all the locales, and \
         this lint warning finds inconsistencies like these.",
        Category::Correctness,
        7,
        Severity::Warning,
        Implementation::new(detector, ScopeSet::RESOURCE_AND_PROJECT_SCOPE),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{array_artifact, resources_artifact, run_issues};

    // ==================== Consistency Tests ====================

    #[test]
    fn deviating_files_give_one_finding_on_the_first_of_them() {
        let findings = run_issues(
            issues(),
            vec![
                array_artifact("res/values/arrays.xml", "colors", 5),
                array_artifact("res/values-de/arrays.xml", "colors", 3),
                array_artifact("res/values-fr/arrays.xml", "colors", 4),
            ],
        );

        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.path(), "res/values-de/arrays.xml");
        assert_eq!(
            finding.message,
            "Array `colors` has an inconsistent number of items \
             (3 in `values-de/arrays.xml`, 4 in `values-fr/arrays.xml`, 5 in `values/arrays.xml`)"
        );
        let secondary: Vec<(&str, Option<&str>)> = finding
            .secondary
            .iter()
            .map(|s| (s.location.path.as_str(), s.message.as_deref()))
            .collect();
        assert_eq!(
            secondary,
            vec![
                ("res/values-fr/arrays.xml", Some("Declaration with array size (4)")),
                ("res/values/arrays.xml", Some("Declaration with array size (5)")),
            ]
        );
    }

    #[test]
    fn matching_counts_are_clean() {
        let findings = run_issues(
            issues(),
            vec![
                array_artifact("res/values/arrays.xml", "colors", 3),
                array_artifact("res/values-de/arrays.xml", "colors", 3),
            ],
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn without_a_default_the_first_declaration_is_the_baseline() {
        let findings = run_issues(
            issues(),
            vec![
                array_artifact("res/values-de/arrays.xml", "sizes", 2),
                array_artifact("res/values-fr/arrays.xml", "sizes", 2),
                array_artifact("res/values-it/arrays.xml", "sizes", 6),
            ],
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path(), "res/values-it/arrays.xml");
    }

    #[test]
    fn finding_starts_at_the_array_element() {
        let de = array_artifact("res/values-de/arrays.xml", "colors", 1);
        let start = de.contents.find("<string-array").unwrap();
        let findings = run_issues(
            issues(),
            vec![array_artifact("res/values/arrays.xml", "colors", 2), de],
        );
        assert_eq!(findings[0].location.start.offset, start);
    }

    #[test]
    fn non_values_folders_are_not_collected() {
        let odd = resources_artifact("res/xml/arrays.xml", |w| {
            w.start("string-array", &[("name", "colors")]);
            w.leaf("item", &[], Some("red"));
            w.end();
        });
        let findings = run_issues(
            issues(),
            vec![array_artifact("res/values/arrays.xml", "colors", 3), odd],
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn integer_arrays_count_too() {
        let ints = resources_artifact("res/values-land/dims.xml", |w| {
            w.start("integer-array", &[("name", "steps")]);
            w.leaf("item", &[], Some("1"));
            w.end();
        });
        let defaults = resources_artifact("res/values/dims.xml", |w| {
            w.start("integer-array", &[("name", "steps")]);
            w.leaf("item", &[], Some("1"));
            w.leaf("item", &[], Some("2"));
            w.end();
        });
        let findings = run_issues(issues(), vec![ints, defaults]);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("1 in `values-land/dims.xml`"));
    }
}
