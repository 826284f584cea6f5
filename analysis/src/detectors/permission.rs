//! Calls to platform APIs that need a permission the manifest does not request.
//!
//! The manifest's `<uses-permission>` entries are collected into the symbol
//! index; source visits then check each known API call against it.

use std::sync::Arc;

use lintel_core::artifact::{NodeKind, SourceNode};
use lintel_core::{Artifact, ArtifactTree, Category, ScopeSet, Severity};

use crate::catalog::{Implementation, Issue};
use crate::detectors::{Detector, Incident, IndexSink, VisitContext};
use crate::index::{SymbolKind, SymbolValue};

pub const MISSING_PERMISSION: &str = "MissingPermission";

const PERMISSION_TAGS: [&str; 2] = ["uses-permission", "uses-permission-sdk-23"];
const NAME_ATTR: &str = "android:name";

/// A platform method and the permissions that satisfy it; holding any one is enough.
#[derive(Debug, Clone, Copy)]
struct Requirement {
    class: &'static str,
    method: &'static str,
    any_of: &'static [&'static str],
}

impl Requirement {
    fn simple_class(&self) -> &'static str {
        self.class.rsplit('.').next().unwrap_or(self.class)
    }
}

const REQUIREMENTS: [Requirement; 4] = [
    Requirement {
        class: "android.location.LocationManager",
        method: "requestLocationUpdates",
        any_of: &[
            "android.permission.ACCESS_FINE_LOCATION",
            "android.permission.ACCESS_COARSE_LOCATION",
        ],
    },
    Requirement {
        class: "android.net.wifi.WifiManager",
        method: "setWifiEnabled",
        any_of: &["android.permission.CHANGE_WIFI_STATE"],
    },
    Requirement {
        class: "android.hardware.Camera",
        method: "open",
        any_of: &["android.permission.CAMERA"],
    },
    Requirement {
        class: "android.os.Vibrator",
        method: "vibrate",
        any_of: &["android.permission.VIBRATE"],
    },
];

fn requirement_for(call: &SourceNode) -> Option<&'static Requirement> {
    let method = call.name()?;
    let owner = call.owner_type.as_deref()?;
    REQUIREMENTS
        .iter()
        .find(|r| r.method == method && r.class == owner)
}

#[derive(Debug, Default)]
pub struct PermissionDetector;

impl Detector for PermissionDetector {
    fn name(&self) -> &'static str {
        "PermissionDetector"
    }

    fn capabilities(&self) -> ScopeSet {
        ScopeSet::SOURCE_AND_MANIFEST_SCOPE
    }

    fn requires_whole_project(&self) -> bool {
        true
    }

    fn collect(&self, artifact: &Artifact, sink: &mut IndexSink<'_>) -> anyhow::Result<()> {
        let ArtifactTree::Manifest(root) = &artifact.tree else {
            return Ok(());
        };
        for element in root.walk() {
            if !PERMISSION_TAGS.contains(&element.tag.as_str()) {
                continue;
            }
            if let Some(name) = element.attribute(NAME_ATTR) {
                sink.declare(SymbolKind::Permission, name.value.as_str(), name.range, SymbolValue::None);
            }
        }
        Ok(())
    }

    fn visit_source(&self, root: &SourceNode, ctx: &mut VisitContext<'_>) -> anyhow::Result<()> {
        // Without a manifest there is nothing to compare against.
        if ctx.project().manifest().is_none() {
            return Ok(());
        }
        for node in root.walk() {
            if node.kind != NodeKind::Call {
                continue;
            }
            let Some(requirement) = requirement_for(node) else {
                continue;
            };
            // Every candidate is looked up so each one is recorded as a dependency.
            let mut held = false;
            for permission in requirement.any_of {
                held |= ctx.lookup(SymbolKind::Permission, permission).is_some();
            }
            if held {
                continue;
            }
            let message = format!(
                "Missing permissions required by {}.{}: {}",
                requirement.simple_class(),
                requirement.method,
                requirement.any_of.join(" or ")
            );
            ctx.report(Incident::new(MISSING_PERMISSION, ctx.location(node.range), message));
        }
        Ok(())
    }
}

pub fn issues() -> Vec<Issue> {
    let detector: Arc<dyn Detector> = Arc::new(PermissionDetector);
    vec![Issue::create(
        MISSING_PERMISSION,
        "Missing Permissions",
        "This check scans through your code and libraries and looks at the APIs being \
         used, and checks this against the set of permissions required to access those \
         APIs. If the code using those APIs is called at runtime, then the program will \
         crash.",
        Category::Correctness,
        9,
        Severity::Error,
        Implementation::new(detector, ScopeSet::SOURCE_AND_MANIFEST_SCOPE),
    )]
}
