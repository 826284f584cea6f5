//! Resource folder names: known resource type, then qualifiers in the
//! platform's fixed order.

use std::sync::{Arc, LazyLock};

use lintel_core::{Category, Location, ScopeSet, Severity};
use regex::Regex;

use crate::catalog::{Implementation, Issue};
use crate::detectors::{Detector, Incident, ResourceFolder, VisitContext};

pub const INVALID_RESOURCE_FOLDER: &str = "InvalidResourceFolder";

const RESOURCE_TYPES: [&str; 14] = [
    "anim",
    "animator",
    "color",
    "drawable",
    "font",
    "interpolator",
    "layout",
    "menu",
    "mipmap",
    "navigation",
    "raw",
    "transition",
    "values",
    "xml",
];

/// One pattern per qualifier kind, in the order qualifiers must appear.
static QUALIFIERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^mcc\d{3}$",
        r"^mnc\d{1,3}$",
        r"^([a-z]{2,3}|b\+[a-z]{2,3}(\+[A-Za-z0-9]+)*)$",
        r"^r([A-Z]{2}|\d{3})$",
        r"^ld(rtl|ltr)$",
        r"^sw\d+dp$",
        r"^w\d+dp$",
        r"^h\d+dp$",
        r"^(small|normal|large|xlarge)$",
        r"^(long|notlong)$",
        r"^(round|notround)$",
        r"^(widecg|nowidecg)$",
        r"^(highdr|lowdr)$",
        r"^(port|land|square)$",
        r"^(car|desk|television|appliance|watch|vrheadset)$",
        r"^(night|notnight)$",
        r"^(ldpi|mdpi|tvdpi|hdpi|xhdpi|xxhdpi|xxxhdpi|nodpi|anydpi|\d+dpi)$",
        r"^(notouch|finger|stylus)$",
        r"^(keysexposed|keyshidden|keyssoft)$",
        r"^(nokeys|qwerty|12key)$",
        r"^(navexposed|navhidden)$",
        r"^(nonav|dpad|trackball|wheel)$",
        r"^\d+x\d+$",
        r"^v\d+$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Whether `name` is `<type>[-<qualifier>...]` with every qualifier known and
/// in order.
pub fn is_valid_folder_name(name: &str) -> bool {
    let mut segments = name.split('-');
    let Some(resource_type) = segments.next() else {
        return false;
    };
    if !RESOURCE_TYPES.contains(&resource_type) {
        return false;
    }
    let mut next_kind = 0;
    for segment in segments {
        let matched = QUALIFIERS
            .iter()
            .enumerate()
            .skip(next_kind)
            .find(|(_, pattern)| pattern.is_match(segment));
        match matched {
            Some((kind, _)) => next_kind = kind + 1,
            None => return false,
        }
    }
    true
}

#[derive(Debug, Default)]
pub struct ResourceFolderDetector;

impl Detector for ResourceFolderDetector {
    fn name(&self) -> &'static str {
        "ResourceFolderDetector"
    }

    fn capabilities(&self) -> ScopeSet {
        ScopeSet::RESOURCE_FOLDER_SCOPE
    }

    fn visit_resource_folder(
        &self,
        folder: &ResourceFolder<'_>,
        ctx: &mut VisitContext<'_>,
    ) -> anyhow::Result<()> {
        if is_valid_folder_name(folder.name) {
            return Ok(());
        }
        let Some(first) = folder.artifacts.first() else {
            return Ok(());
        };
        ctx.report(Incident::new(
            INVALID_RESOURCE_FOLDER,
            Location::file_start(first.path.as_str()),
            "Invalid resource folder: make sure qualifiers appear in the correct order, \
             are spelled correctly, etc.",
        ));
        Ok(())
    }
}

pub fn issues() -> Vec<Issue> {
    let detector: Arc<dyn Detector> = Arc::new(ResourceFolderDetector);
    vec![Issue::create(
        INVALID_RESOURCE_FOLDER,
        "Invalid Resource Folder",
        "This lint check looks for a folder name that is not a valid resource folder \
         name; these will be ignored and not packaged by the Android Gradle build \
         plugin. Note that as of Android L, where previously you could use `-rXX` for \
         regions, resource folders now require `-r` before the region code.",
        Category::Correctness,
        6,
        Severity::Error,
        Implementation::new(detector, ScopeSet::RESOURCE_FOLDER_SCOPE),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{run_issues, strings_artifact};

    // ==================== Folder Name Tests ====================

    #[test]
    fn plain_and_qualified_folders_are_valid() {
        for name in [
            "values",
            "values-de",
            "values-en-rUS",
            "values-b+sr+Latn",
            "layout-land",
            "drawable-xxhdpi",
            "values-sw600dp-land-v21",
            "mipmap-anydpi-v26",
            "values-night",
        ] {
            assert!(is_valid_folder_name(name), "{} should be valid", name);
        }
    }

    #[test]
    fn unknown_types_and_qualifiers_are_invalid() {
        for name in ["stuff", "values-blah12", "layout-landscape", "drawable-hdpii"] {
            assert!(!is_valid_folder_name(name), "{} should be invalid", name);
        }
    }

    #[test]
    fn qualifiers_out_of_order_are_invalid() {
        assert!(!is_valid_folder_name("values-v21-land"));
        assert!(!is_valid_folder_name("drawable-hdpi-night"));
        assert!(!is_valid_folder_name("values-rUS-en"));
    }

    // ==================== Detection Tests ====================

    #[test]
    fn invalid_folder_is_reported_once_on_its_first_file() {
        let findings = run_issues(
            issues(),
            vec![
                strings_artifact("res/values-v21-land/b.xml", &[("b", "B")]),
                strings_artifact("res/values-v21-land/a.xml", &[("a", "A")]),
                strings_artifact("res/values-land-v21/a.xml", &[("a", "A")]),
            ],
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path(), "res/values-v21-land/a.xml");
        assert_eq!(findings[0].location.start.line, 0);
        assert_eq!(findings[0].severity, Severity::Error);
    }
}
