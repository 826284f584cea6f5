//! Routes artifacts to detector hooks.
//!
//! Per-file work runs on the engine's thread pool; results are collected in
//! input order so merges are deterministic regardless of scheduling.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::{trace, warn};
use lintel_core::{Artifact, ArtifactTree, Finding, Location, ProjectSnapshot, Severity};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::catalog::{IssueCatalog, LINT_ERROR};
use crate::detectors::context::VisitTarget;
use crate::detectors::{
    Dependencies, Detector, IndexSink, ProjectContext, ResourceFolder, VisitContext,
};
use crate::error::{DetectorError, EngineError};
use crate::index::{IndexEntry, SymbolIndex, SymbolName};
use crate::scope::ActiveSet;
use crate::session::CancellationToken;

/// Where a stored finding came from. Incremental runs replace findings by origin.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FindingOrigin {
    /// First-pass failure while collecting `path`.
    Collect { path: String, binding: usize },
    /// Second-pass visit of a file or resource folder.
    Visit { path: String, binding: usize },
    /// Whole-project check correlated on one symbol.
    Symbol { binding: usize, name: SymbolName },
    /// Whole-project check failure.
    Project { binding: usize },
}

/// Index contributions of one artifact.
#[derive(Debug)]
pub struct Collected {
    pub path: String,
    pub entries: Vec<IndexEntry>,
    pub failures: Vec<(usize, Finding)>,
}

/// Result of one detector visiting one unit.
#[derive(Debug)]
pub struct VisitOutcome {
    pub path: String,
    pub binding: usize,
    pub findings: Vec<Finding>,
    pub dependencies: Dependencies,
}

/// Something the second pass visits.
#[derive(Debug, Clone)]
pub enum VisitUnit<'a> {
    Artifact(&'a Artifact),
    Folder(ResourceFolder<'a>),
}

impl VisitUnit<'_> {
    pub fn path(&self) -> &str {
        match self {
            VisitUnit::Artifact(a) => &a.path,
            VisitUnit::Folder(f) => f.path,
        }
    }
}

/// A unit and the detector bindings to run on it, in registration order.
#[derive(Debug, Clone)]
pub struct VisitRequest<'a> {
    pub unit: VisitUnit<'a>,
    pub bindings: Vec<usize>,
}

pub struct DetectorDispatcher<'a> {
    catalog: &'a IssueCatalog,
    active: &'a ActiveSet,
    snapshot: &'a ProjectSnapshot,
    pool: &'a ThreadPool,
    token: &'a CancellationToken,
}

impl<'a> DetectorDispatcher<'a> {
    pub fn new(
        catalog: &'a IssueCatalog,
        active: &'a ActiveSet,
        snapshot: &'a ProjectSnapshot,
        pool: &'a ThreadPool,
        token: &'a CancellationToken,
    ) -> Self {
        Self {
            catalog,
            active,
            snapshot,
            pool,
            token,
        }
    }

    fn detector(&self, binding: usize) -> &'a dyn Detector {
        self.catalog.bindings()[binding].detector.as_ref()
    }

    fn check_cancelled(&self) -> Result<(), EngineError> {
        if self.token.is_cancelled() {
            Err(EngineError::AbortedByCaller)
        } else {
            Ok(())
        }
    }

    /// Pass 1: every active detector collects from every given artifact.
    pub fn collect(&self, artifacts: &[&'a Artifact]) -> Result<Vec<Collected>, EngineError> {
        let collected: Vec<Collected> = self.pool.install(|| {
            artifacts
                .par_iter()
                .map(|artifact| self.collect_one(*artifact))
                .collect()
        });
        self.check_cancelled()?;
        Ok(collected)
    }

    fn collect_one(&self, artifact: &'a Artifact) -> Collected {
        let mut collected = Collected {
            path: artifact.path.clone(),
            entries: Vec::new(),
            failures: Vec::new(),
        };
        for active in &self.active.detectors {
            if self.token.is_cancelled() {
                break;
            }
            let detector = self.detector(active.binding);
            let mut sink = IndexSink::new(artifact);
            let result = catch_unwind(AssertUnwindSafe(|| detector.collect(artifact, &mut sink)));
            match hook_failure(result, detector.name(), &artifact.path) {
                None => collected.entries.extend(sink.into_entries()),
                Some(err) => collected
                    .failures
                    .push((active.binding, failure_finding(&err, &artifact.path))),
            }
        }
        collected
    }

    /// Build second-pass requests for the given artifacts. `folders` adds
    /// resource-folder visits for the folders those artifacts live in.
    pub fn plan(&self, artifacts: &[&'a Artifact], folders: &BTreeSet<String>) -> Vec<VisitRequest<'a>> {
        let mut requests = Vec::new();
        for &artifact in artifacts {
            let kind = artifact.kind();
            let bindings: Vec<usize> = self
                .active
                .detectors
                .iter()
                .filter(|d| d.handles(kind))
                .map(|d| d.binding)
                .collect();
            if !bindings.is_empty() {
                requests.push(VisitRequest {
                    unit: VisitUnit::Artifact(artifact),
                    bindings,
                });
            }
        }

        let folder_bindings: Vec<usize> = self
            .active
            .detectors
            .iter()
            .filter(|d| d.handles_folders())
            .map(|d| d.binding)
            .collect();
        if !folder_bindings.is_empty() {
            for folder in self.resource_folders(folders) {
                requests.push(VisitRequest {
                    unit: VisitUnit::Folder(folder),
                    bindings: folder_bindings.clone(),
                });
            }
        }
        requests
    }

    fn resource_folders(&self, wanted: &BTreeSet<String>) -> Vec<ResourceFolder<'a>> {
        let mut folders: BTreeMap<&'a str, ResourceFolder<'a>> = BTreeMap::new();
        for artifact in self.snapshot.artifacts() {
            let Some(dir) = artifact.resource_dir() else {
                continue;
            };
            if !wanted.contains(dir.folder_path) {
                continue;
            }
            folders
                .entry(dir.folder_path)
                .or_insert_with(|| ResourceFolder {
                    path: dir.folder_path,
                    name: dir.folder,
                    artifacts: Vec::new(),
                })
                .artifacts
                .push(artifact);
        }
        folders.into_values().collect()
    }

    /// Pass 2: run the planned visits against the frozen index.
    pub fn visit(
        &self,
        index: &SymbolIndex,
        requests: &[VisitRequest<'a>],
    ) -> Result<Vec<VisitOutcome>, EngineError> {
        let outcomes: Vec<Vec<VisitOutcome>> = self.pool.install(|| {
            requests
                .par_iter()
                .map(|request| self.visit_one(index, request))
                .collect()
        });
        self.check_cancelled()?;
        Ok(outcomes.into_iter().flatten().collect())
    }

    fn visit_one(&self, index: &SymbolIndex, request: &VisitRequest<'a>) -> Vec<VisitOutcome> {
        let path = request.unit.path();
        trace!("visiting {} with {} detectors", path, request.bindings.len());
        let mut outcomes = Vec::with_capacity(request.bindings.len());
        for &binding in &request.bindings {
            if self.token.is_cancelled() {
                break;
            }
            let Some(active) = self.active.detector(binding) else {
                continue;
            };
            let detector = self.detector(binding);
            let target = match &request.unit {
                VisitUnit::Artifact(a) => VisitTarget::Artifact(a),
                VisitUnit::Folder(f) => VisitTarget::Folder(f.path),
            };
            let mut ctx = VisitContext::new(target, self.snapshot, index, &active.issues);
            let result = catch_unwind(AssertUnwindSafe(|| match &request.unit {
                VisitUnit::Artifact(artifact) => match &artifact.tree {
                    ArtifactTree::Manifest(root) => detector.visit_manifest(root, &mut ctx),
                    ArtifactTree::Resource(root) => detector.visit_resource(root, &mut ctx),
                    ArtifactTree::Source(root) => detector.visit_source(root, &mut ctx),
                    ArtifactTree::Member(class) => detector.visit_member(class, &mut ctx),
                },
                VisitUnit::Folder(folder) => detector.visit_resource_folder(folder, &mut ctx),
            }));
            let (mut findings, dependencies) = ctx.finish();
            if let Some(err) = hook_failure(result, detector.name(), path) {
                findings.push(failure_finding(&err, failure_path(&request.unit)));
            }
            outcomes.push(VisitOutcome {
                path: path.to_string(),
                binding,
                findings,
                dependencies,
            });
        }
        outcomes
    }

    /// Whole-project checks, sequential in registration order. With
    /// `affected` set, detectors only re-check those names.
    pub fn after_project(
        &self,
        index: &SymbolIndex,
        affected: Option<&BTreeSet<SymbolName>>,
    ) -> Result<Vec<(FindingOrigin, Finding)>, EngineError> {
        let mut out = Vec::new();
        for active in self.active.detectors.iter().filter(|d| d.handles_project()) {
            self.check_cancelled()?;
            let detector = self.detector(active.binding);
            let mut ctx = ProjectContext::new(self.snapshot, index, &active.issues, affected);
            let result = catch_unwind(AssertUnwindSafe(|| detector.after_project(&mut ctx)));
            for (name, finding) in ctx.finish() {
                out.push((
                    FindingOrigin::Symbol {
                        binding: active.binding,
                        name,
                    },
                    finding,
                ));
            }
            let path = self
                .snapshot
                .manifest_path()
                .unwrap_or_else(|| self.snapshot.id());
            if let Some(err) = hook_failure(result, detector.name(), path) {
                out.push((
                    FindingOrigin::Project {
                        binding: active.binding,
                    },
                    failure_finding(&err, path),
                ));
            }
        }
        Ok(out)
    }
}

/// Folder failures are reported on the folder's first file.
fn failure_path<'b>(unit: &'b VisitUnit<'_>) -> &'b str {
    match unit {
        VisitUnit::Artifact(a) => &a.path,
        VisitUnit::Folder(f) => f.artifacts.first().map(|a| a.path.as_str()).unwrap_or(f.path),
    }
}

fn hook_failure(
    result: Result<anyhow::Result<()>, Box<dyn Any + Send>>,
    detector: &str,
    path: &str,
) -> Option<DetectorError> {
    match result {
        Ok(Ok(())) => None,
        Ok(Err(source)) => Some(DetectorError::Failed {
            detector: detector.to_string(),
            path: path.to_string(),
            source,
        }),
        Err(payload) => Some(DetectorError::Panicked {
            detector: detector.to_string(),
            path: path.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Internal diagnostic for a failed hook, scoped to the start of the file.
fn failure_finding(err: &DetectorError, path: &str) -> Finding {
    warn!("{}", err);
    Finding::new(
        LINT_ERROR,
        Severity::Informational,
        format!("Unexpected failure during lint analysis: {}", err),
        Location::file_start(path),
    )
}
