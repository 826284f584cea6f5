//! One analysis run over a project snapshot, and the state it leaves behind.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::debug;
use lintel_core::{Artifact, ArtifactKind, Finding, ProjectSnapshot, Severity, VersionGates};
use rayon::ThreadPool;
use serde::Serialize;

use crate::catalog::IssueCatalog;
use crate::config::AnalysisConfig;
use crate::detectors::Dependencies;
use crate::dispatch::{
    Collected, DetectorDispatcher, FindingOrigin, VisitOutcome, VisitRequest, VisitUnit,
};
use crate::error::{EngineError, SessionError};
use crate::index::{SymbolIndex, SymbolName};
use crate::scope::{ActiveSet, AnalysisMode, FileChange, ScopeSelector};

/// Cooperative cancellation flag shared between a run and whoever started it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Whether both tokens belong to the same run.
    pub fn same_run(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// How a run was actually carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunKind {
    Full,
    Incremental,
    /// Incremental request for a file whose contents did not change.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub kind: RunKind,
    pub files_collected: usize,
    pub units_visited: usize,
}

/// Everything persisted between runs of one project.
#[derive(Debug, Clone, Default)]
pub struct ProjectState {
    index: SymbolIndex,
    findings: BTreeMap<FindingOrigin, Vec<Finding>>,
    dependencies: BTreeMap<(String, usize), Dependencies>,
    hashes: BTreeMap<String, u64>,
    /// Active issues of a full run, as (catalog index, severity).
    selection: Vec<(usize, Severity)>,
    versions: Option<VersionGates>,
}

impl ProjectState {
    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    /// All raw findings, before suppression, in origin order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.values().flatten()
    }

    pub fn content_hash(&self, path: &str) -> Option<u64> {
        self.hashes.get(path).copied()
    }

    fn store(&mut self, origin: FindingOrigin, findings: Vec<Finding>) {
        if findings.is_empty() {
            self.findings.remove(&origin);
        } else {
            self.findings.insert(origin, findings);
        }
    }

    fn forget_path(&mut self, path: &str) {
        self.findings.retain(|origin, _| match origin {
            FindingOrigin::Collect { path: p, .. } | FindingOrigin::Visit { path: p, .. } => {
                p != path
            }
            _ => true,
        });
        self.dependencies.retain(|(p, _), _| p != path);
        self.hashes.remove(path);
    }

    fn record_collected(&mut self, collected: Vec<Collected>) -> BTreeSet<SymbolName> {
        let mut affected = BTreeSet::new();
        for Collected {
            path,
            entries,
            failures,
        } in collected
        {
            affected.extend(self.index.replace_file(&path, entries));
            self.findings.retain(|origin, _| {
                !matches!(origin, FindingOrigin::Collect { path: p, .. } if *p == path)
            });
            let mut by_binding: BTreeMap<usize, Vec<Finding>> = BTreeMap::new();
            for (binding, finding) in failures {
                by_binding.entry(binding).or_default().push(finding);
            }
            for (binding, findings) in by_binding {
                self.store(
                    FindingOrigin::Collect {
                        path: path.clone(),
                        binding,
                    },
                    findings,
                );
            }
        }
        affected
    }

    fn record_visits(&mut self, outcomes: Vec<VisitOutcome>) {
        for outcome in outcomes {
            let key = (outcome.path.clone(), outcome.binding);
            if outcome.dependencies.is_empty() {
                self.dependencies.remove(&key);
            } else {
                self.dependencies.insert(key, outcome.dependencies);
            }
            self.store(
                FindingOrigin::Visit {
                    path: outcome.path,
                    binding: outcome.binding,
                },
                outcome.findings,
            );
        }
    }
}

/// Result of a successful run. Nothing is committed until the caller
/// stores `state`.
#[derive(Debug)]
pub struct SessionOutcome {
    pub state: ProjectState,
    pub stats: RunStats,
}

/// Drives the two-pass pipeline for one snapshot:
///
/// 1. select the active issues and detectors
/// 2. collect symbol declarations into the index
/// 3. visit artifacts and resource folders against the frozen index
/// 4. run whole-project checks
///
/// Incremental runs repeat the steps for the changed file only, plus the
/// units whose recorded dependencies it touches.
pub struct AnalysisSession<'a> {
    catalog: &'a IssueCatalog,
    config: &'a AnalysisConfig,
    snapshot: &'a ProjectSnapshot,
    pool: &'a ThreadPool,
    token: &'a CancellationToken,
}

impl<'a> AnalysisSession<'a> {
    pub fn new(
        catalog: &'a IssueCatalog,
        config: &'a AnalysisConfig,
        snapshot: &'a ProjectSnapshot,
        pool: &'a ThreadPool,
        token: &'a CancellationToken,
    ) -> Self {
        Self {
            catalog,
            config,
            snapshot,
            pool,
            token,
        }
    }

    pub fn run(
        &self,
        mode: &AnalysisMode,
        previous: Option<&ProjectState>,
    ) -> Result<SessionOutcome, EngineError> {
        let selector = ScopeSelector::new(self.catalog, self.config);
        let full = selector.select(&AnalysisMode::Full, self.snapshot);

        let (change, previous) = match (mode, previous) {
            (AnalysisMode::Full, _) => return self.run_full(&full),
            (AnalysisMode::Incremental(_), None) => {
                debug!("no previous state for {}; running full analysis", self.snapshot.id());
                return self.run_full(&full);
            }
            (AnalysisMode::Incremental(change), Some(previous)) => (change, previous),
        };

        self.validate_change(change)?;
        if let Some(reason) = self.fallback_reason(change, &full, previous) {
            debug!("{}; running full analysis of {}", reason, self.snapshot.id());
            return self.run_full(&full);
        }

        if let FileChange::Modified(path) = change {
            let unchanged = self
                .snapshot
                .get(path)
                .is_some_and(|a| previous.content_hash(path) == Some(a.content_hash()));
            if unchanged {
                debug!("{} is unchanged; reusing previous results", path);
                return Ok(SessionOutcome {
                    state: previous.clone(),
                    stats: RunStats {
                        kind: RunKind::Unchanged,
                        files_collected: 0,
                        units_visited: 0,
                    },
                });
            }
        }

        let narrowed = selector.select(mode, self.snapshot);
        self.run_incremental(change, &full, &narrowed, previous)
    }

    fn validate_change(&self, change: &FileChange) -> Result<(), SessionError> {
        if let Some(path) = change.updated() {
            if self.snapshot.get(path).is_none() {
                return Err(SessionError::UnknownChangedFile(path.to_string()));
            }
        }
        if let Some(path) = change.removed() {
            if self.snapshot.get(path).is_some() {
                return Err(SessionError::InvalidState(format!(
                    "{} was removed but is still part of the snapshot",
                    path
                )));
            }
        }
        Ok(())
    }

    /// Why an incremental request cannot reuse `previous`, if it cannot.
    fn fallback_reason(
        &self,
        change: &FileChange,
        full: &ActiveSet,
        previous: &ProjectState,
    ) -> Option<&'static str> {
        if selection_of(full) != previous.selection {
            return Some("active issues changed");
        }
        if previous.versions != Some(self.snapshot.versions()) {
            return Some("version gates changed");
        }
        let touches_manifest = [change.removed(), change.updated()]
            .into_iter()
            .flatten()
            .any(|path| {
                ArtifactKind::infer(path) == Some(ArtifactKind::Manifest)
                    || self.snapshot.get(path).map(Artifact::kind) == Some(ArtifactKind::Manifest)
            });
        if touches_manifest {
            return Some("manifest changed");
        }
        if self.drifted_beyond(change, previous) {
            return Some("snapshot differs beyond the reported change");
        }
        None
    }

    /// Whether any file other than the reported ones was added, edited or
    /// removed since `previous` was committed.
    fn drifted_beyond(&self, change: &FileChange, previous: &ProjectState) -> bool {
        let reported = |path: &str| change.updated() == Some(path) || change.removed() == Some(path);
        let edited = self
            .snapshot
            .artifacts()
            .iter()
            .filter(|a| !reported(&a.path))
            .any(|a| previous.content_hash(&a.path) != Some(a.content_hash()));
        let vanished = previous
            .hashes
            .keys()
            .filter(|path| !reported(path.as_str()))
            .any(|path| self.snapshot.get(path).is_none());
        edited || vanished
    }

    fn run_full(&self, full: &ActiveSet) -> Result<SessionOutcome, EngineError> {
        debug!(
            "full analysis of {}: {} artifacts, {} active issues",
            self.snapshot.id(),
            self.snapshot.len(),
            full.issues.len()
        );
        let dispatcher = self.dispatcher(full);
        let artifacts: Vec<&Artifact> = self.snapshot.artifacts().iter().collect();

        let mut state = ProjectState {
            selection: selection_of(full),
            versions: Some(self.snapshot.versions()),
            ..ProjectState::default()
        };

        let collected = dispatcher.collect(&artifacts)?;
        state.record_collected(collected);
        debug!("pass 1 done: {} index entries", state.index.len());

        let folders: BTreeSet<String> = artifacts
            .iter()
            .filter_map(|a| a.resource_dir())
            .map(|dir| dir.folder_path.to_string())
            .collect();
        let requests = dispatcher.plan(&artifacts, &folders);
        let units_visited = requests.len();
        let outcomes = dispatcher.visit(&state.index, &requests)?;
        state.record_visits(outcomes);
        debug!("pass 2 done: {} units visited", units_visited);

        for (origin, finding) in dispatcher.after_project(&state.index, None)? {
            state.findings.entry(origin).or_default().push(finding);
        }

        state.hashes = artifacts
            .iter()
            .map(|a| (a.path.clone(), a.content_hash()))
            .collect();

        Ok(SessionOutcome {
            state,
            stats: RunStats {
                kind: RunKind::Full,
                files_collected: artifacts.len(),
                units_visited,
            },
        })
    }

    fn run_incremental(
        &self,
        change: &FileChange,
        full: &ActiveSet,
        narrowed: &ActiveSet,
        previous: &ProjectState,
    ) -> Result<SessionOutcome, EngineError> {
        let mut state = previous.clone();
        let mut affected = BTreeSet::new();
        let mut changed_paths = BTreeSet::new();
        let mut folders = BTreeSet::new();

        // 1. drop what the removed path contributed
        if let Some(path) = change.removed() {
            affected.extend(state.index.invalidate_file(path));
            state.forget_path(path);
            changed_paths.insert(path.to_string());
            folders.extend(folder_of(path));
        }

        // 2. rebuild the updated path's index entries. Collection uses the
        // full selection so the index matches what a full run would build.
        let updated = change.updated().and_then(|path| self.snapshot.get(path));
        if let Some(artifact) = updated {
            let collected = self.dispatcher(full).collect(&[artifact])?;
            affected.extend(state.record_collected(collected));
            state
                .hashes
                .insert(artifact.path.clone(), artifact.content_hash());
            changed_paths.insert(artifact.path.clone());
            folders.extend(folder_of(&artifact.path));
        }
        debug!(
            "incremental analysis of {}: {} affected names",
            self.snapshot.id(),
            affected.len()
        );

        // 3. revisit the updated file, its dependents and its folder. The
        // narrowed selection plans the changed units; visits resolve issues
        // against the full selection because dependents may belong to
        // detectors outside the changed scopes.
        let planner = self.dispatcher(narrowed);
        let mut requests = match updated {
            Some(artifact) => planner.plan(&[artifact], &folders),
            None => planner.plan(&[], &folders),
        };
        let mut dependents: BTreeMap<&str, BTreeSet<usize>> = BTreeMap::new();
        for ((path, binding), deps) in &previous.dependencies {
            if changed_paths.contains(path) {
                continue;
            }
            let Some(active) = full.detector(*binding) else {
                continue;
            };
            let reads_changed_file = deps.files.iter().any(|f| changed_paths.contains(f));
            let reads_affected_name =
                active.whole_project && deps.symbols.iter().any(|n| affected.contains(n));
            if reads_changed_file || reads_affected_name {
                dependents.entry(path.as_str()).or_default().insert(*binding);
            }
        }
        for (path, bindings) in dependents {
            match self.snapshot.get(path) {
                Some(artifact) => requests.push(VisitRequest {
                    unit: VisitUnit::Artifact(artifact),
                    bindings: bindings.into_iter().collect(),
                }),
                None if !folders.contains(path) => {
                    let extra: BTreeSet<String> = [path.to_string()].into_iter().collect();
                    requests.extend(self.dispatcher(full).plan(&[], &extra));
                }
                None => {}
            }
        }
        // Stale folder results go first; folders that still exist are re-stored below.
        state.findings.retain(|origin, _| match origin {
            FindingOrigin::Visit { path, .. } => !folders.contains(path),
            _ => true,
        });
        state.dependencies.retain(|(path, _), _| !folders.contains(path));

        let units_visited = requests.len();
        let outcomes = self.dispatcher(full).visit(&state.index, &requests)?;
        state.record_visits(outcomes);

        // 4. whole-project checks for the affected names
        let rechecked = planner.after_project(&state.index, Some(&affected))?;
        let project_bindings: BTreeSet<usize> = narrowed
            .detectors
            .iter()
            .filter(|d| d.handles_project())
            .map(|d| d.binding)
            .collect();
        state.findings.retain(|origin, _| match origin {
            FindingOrigin::Symbol { binding, name } => {
                !(project_bindings.contains(binding) && affected.contains(name))
            }
            FindingOrigin::Project { binding } => !project_bindings.contains(binding),
            _ => true,
        });
        for (origin, finding) in rechecked {
            state.findings.entry(origin).or_default().push(finding);
        }

        Ok(SessionOutcome {
            state,
            stats: RunStats {
                kind: RunKind::Incremental,
                files_collected: usize::from(updated.is_some()),
                units_visited,
            },
        })
    }

    fn dispatcher<'b>(&'b self, active: &'b ActiveSet) -> DetectorDispatcher<'b> {
        DetectorDispatcher::new(self.catalog, active, self.snapshot, self.pool, self.token)
    }
}

fn selection_of(active: &ActiveSet) -> Vec<(usize, Severity)> {
    active
        .issues
        .iter()
        .map(|i| (i.catalog_index, i.severity))
        .collect()
}

fn folder_of(path: &str) -> Option<String> {
    lintel_core::artifact::ResourceDir::parse(path).map(|dir| dir.folder_path.to_string())
}
