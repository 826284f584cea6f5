//! Ids defined more than once in a layout, directly or through `<include>`.
//!
//! Each layout's ids are collected under the layout name, so an include can
//! be resolved through the symbol index for the including file's
//! configuration, falling back to the default one.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use lintel_core::artifact::Element;
use lintel_core::{Artifact, ArtifactTree, Category, Location, ScopeSet, Severity};

use crate::catalog::{Implementation, Issue};
use crate::detectors::{Detector, Incident, IndexSink, VisitContext};
use crate::index::{SymbolKind, SymbolValue};

pub const DUPLICATE_IDS: &str = "DuplicateIds";
pub const DUPLICATE_INCLUDED_IDS: &str = "DuplicateIncludedIds";

const ID_ATTR: &str = "android:id";
const INCLUDE: &str = "include";
const LAYOUT_ATTR: &str = "layout";
const LAYOUT_PREFIX: &str = "@layout/";

/// The bare id of an `android:id` value, e.g. `ok` for `@+id/ok`.
fn strip_id(value: &str) -> Option<&str> {
    value
        .strip_prefix("@+id/")
        .or_else(|| value.strip_prefix("@id/"))
        .filter(|id| !id.is_empty())
}

fn is_layout(artifact: &Artifact) -> bool {
    artifact.resource_dir().map(|d| d.resource_type) == Some("layout")
}

/// Where an id was first seen while walking a layout.
struct FirstDefinition {
    location: Location,
    /// Layout the id came from, when it was included.
    included_from: Option<String>,
}

impl FirstDefinition {
    fn describe(&self, id: &str) -> String {
        match &self.included_from {
            None => format!("`{}` originally defined here", id),
            Some(layout) => format!("Defined here, included via layout/{}.xml", layout),
        }
    }
}

#[derive(Debug, Default)]
pub struct DuplicateIdDetector;

impl DuplicateIdDetector {
    fn check_include(
        include: &Element,
        qualifier: &str,
        layout: &str,
        seen: &mut HashMap<String, FirstDefinition>,
        reported: &mut HashSet<String>,
        ctx: &mut VisitContext<'_>,
    ) {
        let Some(target) = include
            .attribute_value(LAYOUT_ATTR)
            .and_then(|v| v.strip_prefix(LAYOUT_PREFIX))
        else {
            return;
        };
        let Some(variants) = ctx.lookup(SymbolKind::Id, target) else {
            return;
        };
        let Some(entries) = variants.best_match(qualifier) else {
            return;
        };

        // An id the included layout itself repeats is reported in that layout.
        let mut included: Vec<(&str, &Location)> = Vec::new();
        let mut distinct = BTreeSet::new();
        for entry in entries {
            if let Some(id) = entry.value.text() {
                if distinct.insert(id) {
                    included.push((id, &entry.location));
                }
            }
        }

        for (id, location) in included {
            match seen.get(id) {
                Some(first) => {
                    if reported.insert(id.to_string()) {
                        let incident = Incident::new(
                            DUPLICATE_INCLUDED_IDS,
                            ctx.location(include.range),
                            format!(
                                "Duplicate id @+id/{}, defined or included multiple times in {}",
                                id, layout
                            ),
                        )
                        .with_secondary(first.location.clone(), first.describe(id))
                        .with_secondary(
                            location.clone(),
                            format!("Defined here, included via layout/{}.xml", target),
                        );
                        ctx.report(incident);
                    }
                }
                None => {
                    seen.insert(
                        id.to_string(),
                        FirstDefinition {
                            location: location.clone(),
                            included_from: Some(target.to_string()),
                        },
                    );
                }
            }
        }
    }
}

impl Detector for DuplicateIdDetector {
    fn name(&self) -> &'static str {
        "DuplicateIdDetector"
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
        let Some(dir) = artifact.resource_dir().filter(|_| is_layout(artifact)) else {
            return Ok(());
        };
        let layout = dir.resource_name();
        for element in root.walk() {
            let Some(attribute) = element.attribute(ID_ATTR) else {
                continue;
            };
            if let Some(id) = strip_id(&attribute.value) {
                sink.declare(
                    SymbolKind::Id,
                    layout,
                    attribute.range,
                    SymbolValue::Text(id.to_string()),
                );
            }
        }
        Ok(())
    }

    fn visit_resource(&self, root: &Element, ctx: &mut VisitContext<'_>) -> anyhow::Result<()> {
        let Some(dir) = ctx.resource_dir().filter(|d| d.resource_type == "layout") else {
            return Ok(());
        };
        let layout = dir.display();
        let follow_includes = ctx.is_enabled(DUPLICATE_INCLUDED_IDS);

        let mut seen: HashMap<String, FirstDefinition> = HashMap::new();
        let mut reported: HashSet<String> = HashSet::new();
        for element in root.walk() {
            if element.tag == INCLUDE && follow_includes {
                Self::check_include(element, dir.qualifier, &layout, &mut seen, &mut reported, ctx);
            }
            let Some(attribute) = element.attribute(ID_ATTR) else {
                continue;
            };
            let Some(id) = strip_id(&attribute.value) else {
                continue;
            };
            match seen.get(id) {
                None => {
                    seen.insert(
                        id.to_string(),
                        FirstDefinition {
                            location: ctx.location(attribute.range),
                            included_from: None,
                        },
                    );
                }
                Some(first) if first.included_from.is_none() => {
                    let incident = Incident::new(
                        DUPLICATE_IDS,
                        ctx.location(attribute.range),
                        format!("Duplicate id `@+id/{}`, already defined earlier in this layout", id),
                    )
                    .with_secondary(first.location.clone(), first.describe(id));
                    ctx.report(incident);
                }
                Some(first) => {
                    if reported.insert(id.to_string()) {
                        let incident = Incident::new(
                            DUPLICATE_INCLUDED_IDS,
                            ctx.location(attribute.range),
                            format!(
                                "Duplicate id @+id/{}, defined or included multiple times in {}",
                                id, layout
                            ),
                        )
                        .with_secondary(first.location.clone(), first.describe(id));
                        ctx.report(incident);
                    }
                }
            }
        }
        Ok(())
    }
}

pub fn issues() -> Vec<Issue> {
    let detector: Arc<dyn Detector> = Arc::new(DuplicateIdDetector);
    vec![
        Issue::create(
            DUPLICATE_IDS,
            "Duplicate ids within a single layout",
            "Within a layout, id's should be unique since otherwise `findViewById()` \
             can return an unexpected view.",
            Category::Correctness,
            7,
            Severity::Error,
            Implementation::new(Arc::clone(&detector), ScopeSet::RESOURCE_FILE_SCOPE),
        ),
        Issue::create(
            DUPLICATE_INCLUDED_IDS,
            "Duplicate ids across layouts combined with include tags",
            "It's okay for two independent layouts to use the same ids. However, if \
             layouts are combined with include tags, then the id's need to be unique \
             within any chain of included layouts, or `Activity#findViewById()` can \
             return an unexpected view.",
            Category::Correctness,
            6,
            Severity::Warning,
            Implementation::new(detector, ScopeSet::RESOURCE_AND_PROJECT_SCOPE),
        ),
    ]
}
