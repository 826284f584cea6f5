//! The issue catalog: every known issue, its detector binding and the
//! capacity table used to size per-run issue lists.

mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lintel_core::{Category, Scope, ScopeSet, Severity};

use crate::detectors::Detector;
use crate::error::ConfigurationError;

/// Id of the internal diagnostic raised when a detector fails.
pub const LINT_ERROR: &str = "LintError";

/// Binds an issue to the detector that finds it and the scopes it needs.
#[derive(Clone)]
pub struct Implementation {
    detector: Arc<dyn Detector>,
    scope: ScopeSet,
}

impl Implementation {
    pub fn new(detector: Arc<dyn Detector>, scope: ScopeSet) -> Self {
        Self { detector, scope }
    }

    pub fn detector(&self) -> &Arc<dyn Detector> {
        &self.detector
    }

    pub fn scope(&self) -> ScopeSet {
        self.scope
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("detector", &self.detector.name())
            .field("scope", &self.scope)
            .finish()
    }
}

/// Metadata of one checkable issue.
#[derive(Debug, Clone)]
pub struct Issue {
    pub id: &'static str,
    pub brief: &'static str,
    pub explanation: &'static str,
    pub category: Category,
    /// 1 (lowest) to 10 (highest).
    pub priority: u8,
    pub severity: Severity,
    pub enabled_by_default: bool,
    pub implementation: Implementation,
}

impl Issue {
    pub fn create(
        id: &'static str,
        brief: &'static str,
        explanation: &'static str,
        category: Category,
        priority: u8,
        severity: Severity,
        implementation: Implementation,
    ) -> Self {
        Self {
            id,
            brief,
            explanation,
            category,
            priority,
            severity,
            enabled_by_default: true,
            implementation,
        }
    }

    pub fn disabled_by_default(mut self) -> Self {
        self.enabled_by_default = false;
        self
    }

    pub fn scope(&self) -> ScopeSet {
        self.implementation.scope
    }

    pub fn detector(&self) -> &Arc<dyn Detector> {
        &self.implementation.detector
    }
}

/// A distinct detector and the catalog indices of the issues bound to it.
#[derive(Clone)]
pub struct DetectorBinding {
    pub detector: Arc<dyn Detector>,
    pub issues: Vec<usize>,
}

impl fmt::Debug for DetectorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorBinding")
            .field("detector", &self.detector.name())
            .field("issues", &self.issues)
            .finish()
    }
}

fn same_detector(a: &Arc<dyn Detector>, b: &Arc<dyn Detector>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Collects issues and capacity hints, then validates them into an
/// immutable [`IssueCatalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    issues: Vec<Issue>,
    scope_hints: [Option<usize>; 6],
    set_hints: Vec<(ScopeSet, usize)>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, issue: Issue) -> Result<&mut Self, ConfigurationError> {
        if issue.id == LINT_ERROR || self.issues.iter().any(|i| i.id == issue.id) {
            return Err(ConfigurationError::DuplicateId(issue.id.to_string()));
        }
        if issue.scope().is_empty() {
            return Err(ConfigurationError::EmptyScope(issue.id.to_string()));
        }
        let provided = issue.detector().capabilities();
        if !provided.is_superset_of(issue.scope()) {
            return Err(ConfigurationError::ScopeMismatch {
                id: issue.id.to_string(),
                detector: issue.detector().name().to_string(),
                required: issue.scope(),
                provided,
            });
        }
        self.issues.push(issue);
        Ok(self)
    }

    /// Declare the expected number of issues touching `scope`.
    pub fn capacity_hint(&mut self, scope: Scope, hint: usize) -> &mut Self {
        self.scope_hints[scope.index()] = Some(hint);
        self
    }

    /// Declare the expected number of issues intersecting a whole set.
    pub fn capacity_hint_for_set(&mut self, scopes: ScopeSet, hint: usize) -> &mut Self {
        self.set_hints.retain(|(s, _)| *s != scopes);
        self.set_hints.push((scopes, hint));
        self
    }

    pub fn build(self) -> Result<IssueCatalog, ConfigurationError> {
        let total = self.issues.len();
        let matching = |scopes: ScopeSet| {
            self.issues
                .iter()
                .filter(|i| i.scope().intersects(scopes))
                .count()
        };

        let mut per_scope = [0usize; 6];
        for scope in Scope::ALL {
            let actual = matching(ScopeSet::of(scope));
            let hint = self.scope_hints[scope.index()].unwrap_or(actual);
            if hint < actual {
                return Err(ConfigurationError::CapacityViolation {
                    scopes: scope.to_string(),
                    hint,
                    actual,
                });
            }
            per_scope[scope.index()] = hint;
        }

        let mut capacities = [0usize; 64];
        for (bits, slot) in capacities.iter_mut().enumerate() {
            let scopes = ScopeSet::from_bits(bits as u8);
            let sum: usize = scopes.iter().map(|s| per_scope[s.index()]).sum();
            *slot = sum.min(total);
        }
        for (scopes, hint) in &self.set_hints {
            capacities[scopes.bits() as usize] = *hint;
        }

        for (name, scopes) in ScopeSet::NAMED {
            let actual = matching(scopes);
            let hint = capacities[scopes.bits() as usize];
            if hint < actual {
                return Err(ConfigurationError::CapacityViolation {
                    scopes: name.to_string(),
                    hint,
                    actual,
                });
            }
        }
        for (scopes, hint) in &self.set_hints {
            let actual = matching(*scopes);
            if *hint < actual {
                return Err(ConfigurationError::CapacityViolation {
                    scopes: scopes.to_string(),
                    hint: *hint,
                    actual,
                });
            }
        }

        let mut bindings: Vec<DetectorBinding> = Vec::new();
        let mut by_id = HashMap::with_capacity(total);
        for (index, issue) in self.issues.iter().enumerate() {
            by_id.insert(issue.id, index);
            match bindings
                .iter_mut()
                .find(|b| same_detector(&b.detector, issue.detector()))
            {
                Some(binding) => binding.issues.push(index),
                None => bindings.push(DetectorBinding {
                    detector: Arc::clone(issue.detector()),
                    issues: vec![index],
                }),
            }
        }

        Ok(IssueCatalog {
            issues: self.issues,
            by_id,
            bindings,
            capacities,
        })
    }
}

/// Immutable set of issues, built once at startup and shared by reference.
#[derive(Clone)]
pub struct IssueCatalog {
    issues: Vec<Issue>,
    by_id: HashMap<&'static str, usize>,
    bindings: Vec<DetectorBinding>,
    capacities: [usize; 64],
}

impl IssueCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Catalog with every built-in issue.
    pub fn builtin() -> Result<Self, ConfigurationError> {
        builtin::builtin_catalog()
    }

    /// All issues in registration order.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.by_id.get(id).map(|&i| &self.issues[i])
    }

    pub fn issue_at(&self, index: usize) -> &Issue {
        &self.issues[index]
    }

    /// True for registered ids and the reserved internal id.
    pub fn contains(&self, id: &str) -> bool {
        id == LINT_ERROR || self.by_id.contains_key(id)
    }

    /// Issues whose scope intersects `scopes`, in registration order.
    pub fn issues_for_scope(&self, scopes: ScopeSet) -> Vec<&Issue> {
        let mut out = Vec::with_capacity(self.capacity_for(scopes));
        out.extend(self.issues.iter().filter(|i| i.scope().intersects(scopes)));
        out
    }

    /// Upper bound on `issues_for_scope(scopes).len()`.
    pub fn capacity_for(&self, scopes: ScopeSet) -> usize {
        self.capacities[scopes.bits() as usize]
    }

    /// Distinct detectors in the registration order of their first issue.
    pub fn bindings(&self) -> &[DetectorBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Debug for IssueCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.issues.iter().map(|i| i.id).collect();
        f.debug_struct("IssueCatalog")
            .field("issues", &ids)
            .field("bindings", &self.bindings)
            .finish()
    }
}
