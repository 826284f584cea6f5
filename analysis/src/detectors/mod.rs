//! Detector capability interface and the built-in detectors.
//!
//! A detector implements any subset of the hooks below. The dispatcher calls
//! them in two passes:
//!
//! 1. [`Detector::collect`] for every active artifact, writing into the
//!    symbol index.
//! 2. The per-kind `visit_*` hooks with a read-only index, then
//!    [`Detector::after_project`] for whole-project checks.

pub mod context;

pub mod alarm;
pub mod array_size;
pub mod draw_allocation;
pub mod duplicate_ids;
pub mod manifest;
pub mod permission;
pub mod resource_folder;
pub mod too_many_views;
pub mod translation;

use lintel_core::artifact::{ClassFile, Element, SourceNode};
use lintel_core::{Artifact, ScopeSet};

use crate::catalog::Issue;

pub use context::{Dependencies, Incident, IndexSink, ProjectContext, SymbolVariants, VisitContext};

/// The artifacts of one resource folder, in path order.
#[derive(Debug, Clone)]
pub struct ResourceFolder<'a> {
    /// Folder path, e.g. `res/values-de`.
    pub path: &'a str,
    /// Folder name, e.g. `values-de`.
    pub name: &'a str,
    pub artifacts: Vec<&'a Artifact>,
}

/// A rule implementation. Hooks default to doing nothing.
///
/// Detectors are shared across worker threads and must not keep per-run
/// state; everything a hook needs arrives through its context.
pub trait Detector: Send + Sync {
    /// Stable name, used in logs and internal diagnostics.
    fn name(&self) -> &'static str;

    /// Scopes this detector can handle. Must cover the scope of every issue
    /// bound to it.
    fn capabilities(&self) -> ScopeSet;

    /// Whether results depend on files other than the one being visited.
    fn requires_whole_project(&self) -> bool {
        false
    }

    fn collect(&self, _artifact: &Artifact, _sink: &mut IndexSink<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn visit_manifest(&self, _root: &Element, _ctx: &mut VisitContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn visit_resource(&self, _root: &Element, _ctx: &mut VisitContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn visit_source(&self, _root: &SourceNode, _ctx: &mut VisitContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn visit_member(&self, _class: &ClassFile, _ctx: &mut VisitContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn visit_resource_folder(
        &self,
        _folder: &ResourceFolder<'_>,
        _ctx: &mut VisitContext<'_>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn after_project(&self, _ctx: &mut ProjectContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Every built-in issue, in registration order.
pub fn builtin_issues() -> Vec<Issue> {
    let mut issues = Vec::new();
    issues.extend(manifest::issues());
    issues.extend(permission::issues());
    issues.extend(alarm::issues());
    issues.extend(draw_allocation::issues());
    issues.extend(resource_folder::issues());
    issues.extend(array_size::issues());
    issues.extend(translation::issues());
    issues.extend(duplicate_ids::issues());
    issues.extend(too_many_views::issues());
    issues
}
