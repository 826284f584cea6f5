//! Translations that do not line up with the default locale.
//!
//! Strings are collected per configuration. A locale folder is one whose
//! qualifier starts with a two-letter lowercase language code.

use std::sync::Arc;

use lintel_core::artifact::Element;
use lintel_core::{Artifact, ArtifactTree, Category, ScopeSet, Severity};

use crate::catalog::{Implementation, Issue};
use crate::detectors::{Detector, Incident, IndexSink, ProjectContext, VisitContext};
use crate::index::{SymbolEntry, SymbolKind, SymbolName, SymbolValue};

pub const EXTRA_TRANSLATION: &str = "ExtraTranslation";

const STRING_TAGS: [&str; 3] = ["string", "string-array", "plurals"];
const TRANSLATABLE_ATTR: &str = "translatable";
/// Index value of strings marked `translatable="false"`.
const UNTRANSLATABLE: &str = "untranslatable";

/// Whether a folder qualifier names a locale. Mobile country and network
/// codes (`mcc310`, `mnc004`) precede the language and are skipped.
pub fn is_locale_qualifier(qualifier: &str) -> bool {
    let language = qualifier
        .split('-')
        .find(|segment| !is_network_code(segment))
        .unwrap_or("");
    language.len() == 2 && language.bytes().all(|b| b.is_ascii_lowercase())
}

fn is_network_code(segment: &str) -> bool {
    ["mcc", "mnc"].iter().any(|prefix| {
        segment.strip_prefix(prefix).is_some_and(|digits| {
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
        })
    })
}

fn is_untranslatable(element: &Element) -> bool {
    element.attribute_value(TRANSLATABLE_ATTR) == Some("false")
}

fn is_untranslatable_entry(entry: &SymbolEntry) -> bool {
    entry.value.text() == Some(UNTRANSLATABLE)
}

/// String declarations of a values file, in document order.
fn strings(root: &Element) -> impl Iterator<Item = &Element> {
    root.children
        .iter()
        .filter(|e| STRING_TAGS.contains(&e.tag.as_str()))
}

#[derive(Debug, Default)]
pub struct TranslationDetector;

impl TranslationDetector {
    fn check(name: &str, ctx: &mut ProjectContext<'_>) {
        let symbol = SymbolName::new(SymbolKind::String, name);
        if !ctx.needs_check(&symbol) {
            return;
        }
        let index = ctx.index();
        let mut defaults: Vec<&SymbolEntry> = Vec::new();
        let mut translations: Vec<&SymbolEntry> = Vec::new();
        for (qualifier, entries) in index.variants(SymbolKind::String, name) {
            if qualifier.is_empty() {
                defaults.extend(entries);
            } else if is_locale_qualifier(qualifier) {
                translations.extend(entries);
            }
        }
        translations.sort_by(|a, b| a.path().cmp(b.path()));

        if defaults.is_empty() {
            let Some((first, rest)) = translations.split_first() else {
                return;
            };
            let mut incident = Incident::new(
                EXTRA_TRANSLATION,
                first.location.clone(),
                format!(
                    "\"{}\" is translated here but not found in default locale",
                    name
                ),
            );
            for other in rest {
                incident = incident.with_secondary(other.location.clone(), "Also translated here");
            }
            ctx.report_for(symbol, incident);
            return;
        }

        let Some(marked) = defaults.iter().find(|d| is_untranslatable_entry(d)) else {
            return;
        };
        for translation in translations.iter().filter(|t| !is_untranslatable_entry(t)) {
            let incident = Incident::new(
                EXTRA_TRANSLATION,
                translation.location.clone(),
                format!(
                    "The resource string \"{}\" has been marked as `translatable=\"false\"`",
                    name
                ),
            )
            .with_secondary(marked.location.clone(), "Marked non-translatable here");
            ctx.report_for(symbol.clone(), incident);
        }
    }
}

impl Detector for TranslationDetector {
    fn name(&self) -> &'static str {
        "TranslationDetector"
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
        for element in strings(root) {
            let Some(name) = element.attribute("name") else {
                continue;
            };
            let value = if is_untranslatable(element) {
                SymbolValue::Text(UNTRANSLATABLE.to_string())
            } else {
                SymbolValue::None
            };
            sink.declare(SymbolKind::String, name.value.as_str(), name.range, value);
        }
        Ok(())
    }

    fn visit_resource(&self, root: &Element, ctx: &mut VisitContext<'_>) -> anyhow::Result<()> {
        let Some(dir) = ctx.resource_dir() else {
            return Ok(());
        };
        if dir.resource_type != "values" || !is_locale_qualifier(dir.qualifier) {
            return Ok(());
        }
        for element in strings(root) {
            let Some(attribute) = element.attribute(TRANSLATABLE_ATTR) else {
                continue;
            };
            if attribute.value == "false" {
                ctx.report(Incident::new(
                    EXTRA_TRANSLATION,
                    ctx.location(attribute.range),
                    "Non-translatable resources should only be defined in the base `values/` folder",
                ));
            }
        }
        Ok(())
    }

    fn after_project(&self, ctx: &mut ProjectContext<'_>) -> anyhow::Result<()> {
        let index = ctx.index();
        for name in index.names(SymbolKind::String) {
            Self::check(name, ctx);
        }
        Ok(())
    }
}

pub fn issues() -> Vec<Issue> {
    let detector: Arc<dyn Detector> = Arc::new(TranslationDetector);
    vec![Issue::create(
        EXTRA_TRANSLATION,
        "Extra translation",
        "If a string appears in a specific language translation file, but there is no \
         corresponding string in the default locale, then this string is probably \
         unused. It's also possible that the string was renamed in the default locale \
         but not in the translations.",
        Category::Messages,
        6,
        Severity::Fatal,
        Implementation::new(detector, ScopeSet::RESOURCE_AND_PROJECT_SCOPE),
    )]
}
