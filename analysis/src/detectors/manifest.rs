//! Manifest checks: `<uses-sdk>` presence, attributes and uniqueness.

use std::sync::Arc;

use lintel_core::artifact::Element;
use lintel_core::{Category, Location, ScopeSet, Severity};

use crate::catalog::{Implementation, Issue};
use crate::detectors::{Detector, Incident, VisitContext};

pub const USES_MIN_SDK: &str = "UsesMinSdkAttributes";
pub const MULTIPLE_USES_SDK: &str = "MultipleUsesSdk";

const USES_SDK: &str = "uses-sdk";
const MIN_SDK_ATTR: &str = "android:minSdkVersion";
const TARGET_SDK_ATTR: &str = "android:targetSdkVersion";

#[derive(Debug, Default)]
pub struct ManifestDetector;

impl Detector for ManifestDetector {
    fn name(&self) -> &'static str {
        "ManifestDetector"
    }

    fn capabilities(&self) -> ScopeSet {
        ScopeSet::MANIFEST_SCOPE
    }

    fn visit_manifest(&self, root: &Element, ctx: &mut VisitContext<'_>) -> anyhow::Result<()> {
        let uses_sdk: Vec<&Element> = root.children_named(USES_SDK).collect();

        let Some(first) = uses_sdk.first() else {
            ctx.report(Incident::new(
                USES_MIN_SDK,
                Location::file_start(ctx.path()),
                "Manifest should specify a minimum API level with \
                 `<uses-sdk android:minSdkVersion=\"?\" />`; if it really supports \
                 all versions of Android set it to 1.",
            ));
            return Ok(());
        };

        if first.attribute(MIN_SDK_ATTR).is_none() {
            ctx.report(Incident::new(
                USES_MIN_SDK,
                ctx.location(first.range),
                "`<uses-sdk>` tag should specify a minimum API level with \
                 `android:minSdkVersion=\"?\"`",
            ));
        }
        if first.attribute(TARGET_SDK_ATTR).is_none() {
            ctx.report(Incident::new(
                USES_MIN_SDK,
                ctx.location(first.range),
                "`<uses-sdk>` tag should specify a target API level (the highest verified \
                 version; when running on later versions, compatibility behaviors may be \
                 enabled) with `android:targetSdkVersion=\"?\"`",
            ));
        }

        if let Some(second) = uses_sdk.get(1) {
            let incident = Incident::new(
                MULTIPLE_USES_SDK,
                ctx.location(second.range),
                "There should only be a single `<uses-sdk>` element in the manifest: \
                 merge these together",
            )
            .with_secondary(ctx.location(first.range), "Also appears here");
            ctx.report(incident);
        }
        Ok(())
    }
}

pub fn issues() -> Vec<Issue> {
    let detector: Arc<dyn Detector> = Arc::new(ManifestDetector);
    let implementation = Implementation::new(detector, ScopeSet::MANIFEST_SCOPE);
    vec![
        Issue::create(
            USES_MIN_SDK,
            "Minimum SDK and target SDK attributes not defined",
            "The manifest should contain a `<uses-sdk>` element which defines the minimum \
             API level required for the application to run, as well as the target version \
             (the highest API level you have tested the version for).",
            Category::Correctness,
            9,
            Severity::Warning,
            implementation.clone(),
        ),
        Issue::create(
            MULTIPLE_USES_SDK,
            "Multiple `<uses-sdk>` elements in the manifest",
            "The `<uses-sdk>` element should appear just once; the tools will not merge \
             the contents of all the elements so if you split up the attributes across \
             multiple elements, only one of them will take effect.",
            Category::Correctness,
            6,
            Severity::Fatal,
            implementation,
        ),
    ]
}
