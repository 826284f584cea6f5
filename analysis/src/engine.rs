use std::sync::Arc;

use arc_swap::ArcSwap;
use log::debug;
use lintel_core::{Finding, ProjectSnapshot};
use rayon::{ThreadPool, ThreadPoolBuilder};
use scc::HashMap as ConcurrentHashMap;

use crate::catalog::IssueCatalog;
use crate::config::{AnalysisConfig, EngineConfig};
use crate::error::EngineError;
use crate::report::{AnalysisReport, DiagnosticAggregator};
use crate::scope::AnalysisMode;
use crate::session::{AnalysisSession, CancellationToken, ProjectState};
use crate::suppression::SuppressionFilter;

/// The lintel analysis engine.
///
/// Thread-safe and designed for concurrent use. The issue catalog is fixed at
/// construction; engine and analysis configuration can be hot-swapped via
/// `ArcSwap`.
///
/// # Project state
///
/// Every successful run commits its [`ProjectState`] under the snapshot's id.
/// The next incremental run for that project starts from it:
/// 1. The changed file's index entries are rebuilt
/// 2. The file, its resource folder and every unit that read an affected
///    symbol are visited again
/// 3. Whole-project checks re-run for the affected symbols
///
/// The merged result is the same as a full run over the new snapshot.
///
/// # Usage
///
/// ```rust,ignore
/// use lintel_analysis::{AnalysisMode, Engine, FileChange};
///
/// let engine = Engine::with_builtin_catalog()?;
///
/// let report = engine.analyze(&snapshot, &AnalysisMode::Full)?;
/// println!("{}", report.text);
///
/// // After an edit, only the changed file is collected again.
/// let change = FileChange::Modified("res/values-de/arrays.xml".into());
/// let report = engine.analyze(&edited, &AnalysisMode::Incremental(change))?;
/// ```
pub struct Engine {
    pub config: ArcSwap<EngineConfig>,
    pub analysis_config: ArcSwap<AnalysisConfig>,
    catalog: Arc<IssueCatalog>,
    pool: ArcSwap<ThreadPool>,
    states: ConcurrentHashMap<String, Arc<ProjectState>>,
    in_flight: ConcurrentHashMap<String, CancellationToken>,
}

fn build_pool(config: &EngineConfig) -> Result<ThreadPool, EngineError> {
    ThreadPoolBuilder::new()
        .num_threads(config.max_parallel_files.max(1))
        .thread_name(|i| format!("lintel-worker-{}", i))
        .build()
        .map_err(|e| EngineError::Config(format!("failed to build worker pool: {}", e)))
}

impl Engine {
    /// Create an engine over `catalog`.
    pub fn new(
        config: EngineConfig,
        analysis_config: AnalysisConfig,
        catalog: IssueCatalog,
    ) -> Result<Self, EngineError> {
        let pool = build_pool(&config)?;
        Ok(Self {
            config: ArcSwap::from_pointee(config),
            analysis_config: ArcSwap::from_pointee(analysis_config),
            catalog: Arc::new(catalog),
            pool: ArcSwap::from_pointee(pool),
            states: ConcurrentHashMap::new(),
            in_flight: ConcurrentHashMap::new(),
        })
    }

    /// Convenience constructor with default configuration and the built-in issues.
    pub fn with_builtin_catalog() -> Result<Self, EngineError> {
        Self::new(
            EngineConfig::default(),
            AnalysisConfig::default(),
            IssueCatalog::builtin()?,
        )
    }

    pub fn catalog(&self) -> &IssueCatalog {
        &self.catalog
    }

    /// Replace the analysis configuration. Runs that already started keep
    /// the configuration they loaded.
    pub fn set_analysis_config(&self, config: AnalysisConfig) {
        self.analysis_config.store(Arc::new(config));
    }

    /// Replace the engine configuration, rebuilding the worker pool.
    pub fn update_config(&self, config: EngineConfig) -> Result<(), EngineError> {
        let pool = build_pool(&config)?;
        self.pool.store(Arc::new(pool));
        self.config.store(Arc::new(config));
        Ok(())
    }

    /// Analyze a snapshot, superseding any run in flight for the same project.
    pub fn analyze(
        &self,
        snapshot: &ProjectSnapshot,
        mode: &AnalysisMode,
    ) -> Result<AnalysisReport, EngineError> {
        let token = self.begin_run(snapshot.id());
        self.analyze_with_token(snapshot, mode, &token)
    }

    /// Register a new run for `project` and cancel the previous one.
    pub fn begin_run(&self, project: &str) -> CancellationToken {
        let token = CancellationToken::new();
        if let Err((key, fresh)) = self.in_flight.insert_sync(project.to_string(), token.clone()) {
            self.in_flight.update_sync(&key, |_, previous| {
                previous.cancel();
                *previous = fresh;
            });
        }
        token
    }

    /// Analyze under an explicit token. A cancelled run returns
    /// [`EngineError::AbortedByCaller`] and commits nothing.
    ///
    /// However the run ends, its token stops being the project's in-flight
    /// run. A newer run registered meanwhile stays registered.
    pub fn analyze_with_token(
        &self,
        snapshot: &ProjectSnapshot,
        mode: &AnalysisMode,
        token: &CancellationToken,
    ) -> Result<AnalysisReport, EngineError> {
        let result = self.run_to_report(snapshot, mode, token);
        self.in_flight
            .remove_if_sync(snapshot.id(), |current| current.same_run(token));
        result
    }

    fn run_to_report(
        &self,
        snapshot: &ProjectSnapshot,
        mode: &AnalysisMode,
        token: &CancellationToken,
    ) -> Result<AnalysisReport, EngineError> {
        let config = self.analysis_config.load_full();
        let pool = self.pool.load_full();
        let previous = self.project_state(snapshot.id());

        let session = AnalysisSession::new(&self.catalog, &config, snapshot, &pool, token);
        let outcome = session.run(mode, previous.as_deref())?;

        let state = Arc::new(outcome.state);
        if !self.commit(snapshot.id(), Arc::clone(&state), token) {
            debug!("run for {} was superseded; discarding results", snapshot.id());
            return Err(EngineError::AbortedByCaller);
        }
        debug!(
            "{:?} run for {} committed: {} files collected, {} units visited",
            outcome.stats.kind,
            snapshot.id(),
            outcome.stats.files_collected,
            outcome.stats.units_visited
        );

        let findings: Vec<Finding> = state.findings().cloned().collect();
        let findings = SuppressionFilter::new(snapshot, &config).filter(findings);
        Ok(DiagnosticAggregator::new(snapshot, &config).aggregate(findings, outcome.stats))
    }

    /// Store `state` unless `token` was cancelled or another run took over
    /// the project. Returns whether the state was stored.
    ///
    /// The check and the store happen under the in-flight entry's lock, so a
    /// `begin_run` for the project either waits for the store or cancels
    /// the run before it.
    fn commit(&self, project: &str, state: Arc<ProjectState>, token: &CancellationToken) -> bool {
        let guarded = self.in_flight.update_sync(project, |_, current| {
            let live = current.same_run(token) && !token.is_cancelled();
            if live {
                self.store_state(project, Arc::clone(&state));
            }
            live
        });
        match guarded {
            Some(committed) => committed,
            // Not registered: only the token itself can stop the commit.
            None if token.is_cancelled() => false,
            None => {
                self.store_state(project, state);
                true
            }
        }
    }

    fn store_state(&self, project: &str, state: Arc<ProjectState>) {
        if let Err((key, state)) = self.states.insert_sync(project.to_string(), state) {
            self.states.update_sync(&key, |_, old| {
                *old = state;
            });
        }
    }

    /// The state committed by the last successful run of `project`.
    pub fn project_state(&self, project: &str) -> Option<Arc<ProjectState>> {
        self.states.read_sync(project, |_, state| Arc::clone(state))
    }

    /// Drop everything kept for `project`. The next run is a full one.
    pub fn forget(&self, project: &str) -> bool {
        self.in_flight.remove_sync(project);
        self.states.remove_sync(project).is_some()
    }
}
