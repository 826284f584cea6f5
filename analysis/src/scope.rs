//! Decides which scopes and issues are active for a run.

use lintel_core::{ArtifactKind, ProjectSnapshot, Scope, ScopeSet, Severity};

use crate::catalog::IssueCatalog;
use crate::config::AnalysisConfig;

/// Scopes consulted on every incremental run because version gating
/// depends on them.
pub const ALWAYS_CONSULT: ScopeSet = ScopeSet::MANIFEST_SCOPE;

/// What changed since the previous run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(String),
    Deleted(String),
    Renamed { from: String, to: String },
}

impl FileChange {
    /// Path whose previous contributions must be dropped without a rebuild.
    pub fn removed(&self) -> Option<&str> {
        match self {
            FileChange::Modified(_) => None,
            FileChange::Deleted(path) => Some(path),
            FileChange::Renamed { from, .. } => Some(from),
        }
    }

    /// Path whose contents must be collected and visited again.
    pub fn updated(&self) -> Option<&str> {
        match self {
            FileChange::Modified(path) => Some(path),
            FileChange::Deleted(_) => None,
            FileChange::Renamed { to, .. } => Some(to),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisMode {
    Full,
    Incremental(FileChange),
}

/// An enabled issue with its resolved severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveIssue {
    pub catalog_index: usize,
    pub id: &'static str,
    pub severity: Severity,
    pub scope: ScopeSet,
}

/// A detector with at least one active issue.
#[derive(Debug, Clone)]
pub struct ActiveDetector {
    /// Index into [`IssueCatalog::bindings`].
    pub binding: usize,
    pub issues: Vec<ActiveIssue>,
    /// Union of the active issues' scopes.
    pub scope: ScopeSet,
    pub whole_project: bool,
}

impl ActiveDetector {
    /// Whether this detector should visit an artifact of `kind`. Resource
    /// files are visited for the file scope only; folders have their own visit.
    pub fn handles(&self, kind: ArtifactKind) -> bool {
        let file_scope = match kind {
            ArtifactKind::Resource => ScopeSet::RESOURCE_FILE_SCOPE,
            other => other.scopes(),
        };
        self.scope.intersects(file_scope)
    }

    pub fn handles_folders(&self) -> bool {
        self.scope.contains(Scope::ResourceFolder)
    }

    pub fn handles_project(&self) -> bool {
        self.scope.contains(Scope::Project)
    }
}

/// The outcome of scope selection.
#[derive(Debug, Clone)]
pub struct ActiveSet {
    pub scopes: ScopeSet,
    pub issues: Vec<ActiveIssue>,
    pub detectors: Vec<ActiveDetector>,
}

impl ActiveSet {
    pub fn detector(&self, binding: usize) -> Option<&ActiveDetector> {
        self.detectors.iter().find(|d| d.binding == binding)
    }
}

pub struct ScopeSelector<'a> {
    catalog: &'a IssueCatalog,
    config: &'a AnalysisConfig,
}

impl<'a> ScopeSelector<'a> {
    pub fn new(catalog: &'a IssueCatalog, config: &'a AnalysisConfig) -> Self {
        Self { catalog, config }
    }

    /// Scopes that a run in `mode` activates.
    pub fn active_scopes(&self, mode: &AnalysisMode, snapshot: &ProjectSnapshot) -> ScopeSet {
        match mode {
            AnalysisMode::Full => ScopeSet::ALL,
            AnalysisMode::Incremental(change) => {
                let changed = [change.removed(), change.updated()]
                    .into_iter()
                    .flatten()
                    .filter_map(|path| {
                        snapshot
                            .get(path)
                            .map(|a| a.kind())
                            .or_else(|| ArtifactKind::infer(path))
                    })
                    .fold(ScopeSet::EMPTY, |acc, kind| acc.union(kind.scopes()));
                changed.union(ALWAYS_CONSULT).union(ScopeSet::PROJECT_SCOPE)
            }
        }
    }

    pub fn select(&self, mode: &AnalysisMode, snapshot: &ProjectSnapshot) -> ActiveSet {
        let scopes = self.active_scopes(mode, snapshot);
        let incremental = matches!(mode, AnalysisMode::Incremental(_));

        let mut issues = Vec::with_capacity(self.catalog.capacity_for(scopes));
        let mut detectors = Vec::new();
        for (binding_index, binding) in self.catalog.bindings().iter().enumerate() {
            let whole_project = binding.detector.requires_whole_project();
            // A relevant detector keeps all of its issues so that a revisit
            // reports exactly what a full run would.
            let relevant = (incremental && whole_project)
                || binding
                    .issues
                    .iter()
                    .any(|&index| self.catalog.issue_at(index).scope().intersects(scopes));
            if !relevant {
                continue;
            }
            let mut active = Vec::new();
            for &index in &binding.issues {
                let issue = self.catalog.issue_at(index);
                let severity =
                    self.config
                        .severity_for(issue.id, issue.severity, issue.enabled_by_default);
                if severity == Severity::Ignore {
                    continue;
                }
                active.push(ActiveIssue {
                    catalog_index: index,
                    id: issue.id,
                    severity,
                    scope: issue.scope(),
                });
            }
            if active.is_empty() {
                continue;
            }
            issues.extend(active.iter().copied());
            detectors.push(ActiveDetector {
                binding: binding_index,
                scope: active.iter().fold(ScopeSet::EMPTY, |acc, i| acc.union(i.scope)),
                issues: active,
                whole_project,
            });
        }
        issues.sort_by_key(|i| i.catalog_index);

        ActiveSet {
            scopes,
            issues,
            detectors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::IssueCatalog;

    fn ids(set: &ActiveSet) -> Vec<&'static str> {
        set.issues.iter().map(|i| i.id).collect()
    }

    fn empty_snapshot() -> ProjectSnapshot {
        ProjectSnapshot::new("p", Vec::new())
    }

    // ==================== Scope Tests ====================

    #[test]
    fn full_mode_activates_every_scope() {
        let catalog = IssueCatalog::builtin().unwrap();
        let config = AnalysisConfig::default();
        let selector = ScopeSelector::new(&catalog, &config);
        assert_eq!(
            selector.active_scopes(&AnalysisMode::Full, &empty_snapshot()),
            ScopeSet::ALL
        );
    }

    #[test]
    fn incremental_source_change_activates_source_manifest_and_project() {
        let catalog = IssueCatalog::builtin().unwrap();
        let config = AnalysisConfig::default();
        let selector = ScopeSelector::new(&catalog, &config);
        let mode = AnalysisMode::Incremental(FileChange::Modified("src/a/B.java".into()));
        let scopes = selector.active_scopes(&mode, &empty_snapshot());
        assert_eq!(
            scopes,
            ScopeSet::SOURCE_AND_MANIFEST_SCOPE.union(ScopeSet::PROJECT_SCOPE)
        );
    }

    #[test]
    fn rename_activates_both_kinds() {
        let catalog = IssueCatalog::builtin().unwrap();
        let config = AnalysisConfig::default();
        let selector = ScopeSelector::new(&catalog, &config);
        let mode = AnalysisMode::Incremental(FileChange::Renamed {
            from: "src/a/B.java".into(),
            to: "bin/a/B.class".into(),
        });
        let scopes = selector.active_scopes(&mode, &empty_snapshot());
        assert!(scopes.contains(lintel_core::Scope::SourceFile));
        assert!(scopes.contains(lintel_core::Scope::CompiledMember));
    }

    // ==================== Issue Selection Tests ====================

    #[test]
    fn full_mode_selects_enabled_issues_in_catalog_order() {
        let catalog = IssueCatalog::builtin().unwrap();
        let config = AnalysisConfig::default();
        let set = ScopeSelector::new(&catalog, &config).select(&AnalysisMode::Full, &empty_snapshot());

        let expected: Vec<&str> = catalog
            .issues()
            .iter()
            .filter(|i| i.enabled_by_default)
            .map(|i| i.id)
            .collect();
        assert_eq!(ids(&set), expected);
        assert!(set.issues.len() <= catalog.capacity_for(ScopeSet::ALL));
    }

    #[test]
    fn incremental_keeps_whole_project_issues_and_drops_unrelated_file_local_ones() {
        let catalog = IssueCatalog::builtin().unwrap();
        let config = AnalysisConfig::default();
        let mode = AnalysisMode::Incremental(FileChange::Modified("src/a/B.java".into()));
        let set = ScopeSelector::new(&catalog, &config).select(&mode, &empty_snapshot());
        let active = ids(&set);

        assert!(active.contains(&"ShortAlarm"));
        assert!(active.contains(&"MissingPermission"));
        assert!(active.contains(&"UsesMinSdkAttributes"));
        assert!(active.contains(&"InconsistentArrays"));
        assert!(active.contains(&"DuplicateIncludedIds"));
        assert!(!active.contains(&"TooManyViews"));
    }

    #[test]
    fn disabled_issues_are_not_selected() {
        let catalog = IssueCatalog::builtin().unwrap();
        let mut config = AnalysisConfig::default();
        config.suppressed_ids.insert("ShortAlarm".into());
        let set = ScopeSelector::new(&catalog, &config).select(&AnalysisMode::Full, &empty_snapshot());
        assert!(!ids(&set).contains(&"ShortAlarm"));
    }

    #[test]
    fn detector_scope_is_union_of_active_issues() {
        let catalog = IssueCatalog::builtin().unwrap();
        let config = AnalysisConfig {
            exact_checked_ids: Some(["DuplicateIds".to_string()].into_iter().collect()),
            ..AnalysisConfig::default()
        };
        let set = ScopeSelector::new(&catalog, &config).select(&AnalysisMode::Full, &empty_snapshot());
        assert_eq!(set.detectors.len(), 1);
        let detector = &set.detectors[0];
        assert_eq!(detector.scope, ScopeSet::RESOURCE_FILE_SCOPE);
        assert!(detector.handles(ArtifactKind::Resource));
        assert!(!detector.handles(ArtifactKind::Source));
    }

    // ==================== FileChange Tests ====================

    #[test]
    fn file_change_paths() {
        let renamed = FileChange::Renamed {
            from: "a".into(),
            to: "b".into(),
        };
        assert_eq!(renamed.removed(), Some("a"));
        assert_eq!(renamed.updated(), Some("b"));
        assert_eq!(FileChange::Deleted("a".into()).updated(), None);
        assert_eq!(FileChange::Modified("a".into()).removed(), None);
    }
}
