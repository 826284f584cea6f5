//! Handles passed to detector hooks.

use std::collections::BTreeSet;

use lintel_core::artifact::ResourceDir;
use lintel_core::{
    Artifact, Finding, Location, Position, ProjectSnapshot, SecondaryLocation, TextRange,
};

use crate::index::{IndexEntry, SymbolEntry, SymbolIndex, SymbolKey, SymbolKind, SymbolName, SymbolValue};
use crate::scope::ActiveIssue;

/// A problem reported by a detector, before severity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    pub issue_id: &'static str,
    pub location: Location,
    pub message: String,
    pub secondary: Vec<SecondaryLocation>,
}

impl Incident {
    pub fn new(issue_id: &'static str, location: Location, message: impl Into<String>) -> Self {
        Self {
            issue_id,
            location,
            message: message.into(),
            secondary: Vec::new(),
        }
    }

    pub fn with_secondary(mut self, location: Location, message: impl Into<String>) -> Self {
        self.secondary.push(SecondaryLocation::new(location, message));
        self
    }

    pub fn with_bare_secondary(mut self, location: Location) -> Self {
        self.secondary.push(SecondaryLocation::bare(location));
        self
    }

    fn into_finding(self, issues: &[ActiveIssue]) -> Option<Finding> {
        let issue = issues.iter().find(|i| i.id == self.issue_id)?;
        Some(Finding {
            issue_id: self.issue_id.to_string(),
            severity: issue.severity,
            message: self.message,
            location: self.location,
            secondary: self.secondary,
        })
    }
}

/// Write handle for the first pass. Entries are attributed to the artifact
/// being collected.
pub struct IndexSink<'a> {
    artifact: &'a Artifact,
    qualifier: &'a str,
    entries: Vec<IndexEntry>,
}

impl<'a> IndexSink<'a> {
    pub(crate) fn new(artifact: &'a Artifact) -> Self {
        let qualifier = artifact.resource_dir().map(|d| d.qualifier).unwrap_or("");
        Self {
            artifact,
            qualifier,
            entries: Vec::new(),
        }
    }

    pub fn artifact(&self) -> &'a Artifact {
        self.artifact
    }

    /// Configuration qualifier of the artifact's resource folder.
    pub fn qualifier(&self) -> &'a str {
        self.qualifier
    }

    pub fn declare(&mut self, kind: SymbolKind, name: impl Into<String>, range: TextRange, value: SymbolValue) {
        self.entries.push(IndexEntry {
            key: SymbolKey::new(kind, name, self.qualifier),
            entry: SymbolEntry {
                location: Location::new(self.artifact.path.as_str(), range),
                value,
            },
        });
    }

    pub(crate) fn into_entries(self) -> Vec<IndexEntry> {
        self.entries
    }
}

/// Qualifier variants of one name returned by [`VisitContext::lookup`].
#[derive(Debug, Clone)]
pub struct SymbolVariants<'a> {
    variants: Vec<(&'a str, &'a [SymbolEntry])>,
}

impl<'a> SymbolVariants<'a> {
    pub fn qualifier(&self, qualifier: &str) -> Option<&'a [SymbolEntry]> {
        self.variants
            .iter()
            .find(|(q, _)| *q == qualifier)
            .map(|(_, entries)| *entries)
    }

    /// Entries for `qualifier`, falling back to the default configuration.
    pub fn best_match(&self, qualifier: &str) -> Option<&'a [SymbolEntry]> {
        self.qualifier(qualifier).or_else(|| self.qualifier(""))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a [SymbolEntry])> + '_ {
        self.variants.iter().copied()
    }
}

/// What a visit is looking at: one artifact or one resource folder.
#[derive(Debug, Clone, Copy)]
pub(crate) enum VisitTarget<'a> {
    Artifact(&'a Artifact),
    Folder(&'a str),
}

/// What a visit read beyond its own unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    /// Names looked up in the index, declared or not.
    pub symbols: BTreeSet<SymbolName>,
    /// Other files whose contents positioned a finding.
    pub files: BTreeSet<String>,
}

impl Dependencies {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.files.is_empty()
    }
}

/// Handle for second-pass visits. The index is read-only here.
pub struct VisitContext<'a> {
    target: VisitTarget<'a>,
    project: &'a ProjectSnapshot,
    index: &'a SymbolIndex,
    issues: &'a [ActiveIssue],
    findings: Vec<Finding>,
    dependencies: Dependencies,
}

impl<'a> VisitContext<'a> {
    pub(crate) fn new(
        target: VisitTarget<'a>,
        project: &'a ProjectSnapshot,
        index: &'a SymbolIndex,
        issues: &'a [ActiveIssue],
    ) -> Self {
        Self {
            target,
            project,
            index,
            issues,
            findings: Vec::new(),
            dependencies: Dependencies::default(),
        }
    }

    /// Path of the artifact, or of the folder for folder visits.
    pub fn path(&self) -> &'a str {
        match self.target {
            VisitTarget::Artifact(a) => &a.path,
            VisitTarget::Folder(path) => path,
        }
    }

    pub fn artifact(&self) -> Option<&'a Artifact> {
        match self.target {
            VisitTarget::Artifact(a) => Some(a),
            VisitTarget::Folder(_) => None,
        }
    }

    pub fn contents(&self) -> &'a str {
        self.artifact().map(|a| &*a.contents).unwrap_or("")
    }

    pub fn resource_dir(&self) -> Option<ResourceDir<'a>> {
        self.artifact().and_then(Artifact::resource_dir)
    }

    pub fn project(&self) -> &'a ProjectSnapshot {
        self.project
    }

    pub fn is_enabled(&self, issue_id: &str) -> bool {
        self.issues.iter().any(|i| i.id == issue_id)
    }

    pub fn location(&self, range: TextRange) -> Location {
        Location::new(self.path(), range)
    }

    /// Location of the first non-blank character of `line` in another project file.
    pub fn line_location(&mut self, path: &str, line: u32) -> Location {
        if path != self.path() {
            self.dependencies.files.insert(path.to_string());
        }
        let at = self
            .project
            .contents(path)
            .and_then(|contents| Position::line_start(contents, line))
            .unwrap_or(Position::new(line, 0, 0));
        Location::point(path, at)
    }

    /// Look up every qualifier variant of a name. The lookup is recorded as
    /// a dependency of this file whether or not the name is declared.
    pub fn lookup(&mut self, kind: SymbolKind, name: &str) -> Option<SymbolVariants<'a>> {
        self.dependencies.symbols.insert(SymbolName::new(kind, name));
        let variants: Vec<(&'a str, &'a [SymbolEntry])> = self.index.variants(kind, name).collect();
        if variants.is_empty() {
            None
        } else {
            Some(SymbolVariants { variants })
        }
    }

    /// Report an incident. Incidents for issues that are not active are dropped.
    pub fn report(&mut self, incident: Incident) {
        if let Some(finding) = incident.into_finding(self.issues) {
            self.findings.push(finding);
        }
    }

    pub(crate) fn finish(self) -> (Vec<Finding>, Dependencies) {
        (self.findings, self.dependencies)
    }
}

/// Handle for whole-project checks after the second pass.
pub struct ProjectContext<'a> {
    project: &'a ProjectSnapshot,
    index: &'a SymbolIndex,
    issues: &'a [ActiveIssue],
    affected: Option<&'a BTreeSet<SymbolName>>,
    findings: Vec<(SymbolName, Finding)>,
}

impl<'a> ProjectContext<'a> {
    pub(crate) fn new(
        project: &'a ProjectSnapshot,
        index: &'a SymbolIndex,
        issues: &'a [ActiveIssue],
        affected: Option<&'a BTreeSet<SymbolName>>,
    ) -> Self {
        Self {
            project,
            index,
            issues,
            affected,
            findings: Vec::new(),
        }
    }

    pub fn project(&self) -> &'a ProjectSnapshot {
        self.project
    }

    pub fn index(&self) -> &'a SymbolIndex {
        self.index
    }

    pub fn is_enabled(&self, issue_id: &str) -> bool {
        self.issues.iter().any(|i| i.id == issue_id)
    }

    /// False when an incremental run has not touched this name; its previous
    /// findings are kept as they are.
    pub fn needs_check(&self, name: &SymbolName) -> bool {
        self.affected.map(|a| a.contains(name)).unwrap_or(true)
    }

    /// Report an incident correlated on `name`.
    pub fn report_for(&mut self, name: SymbolName, incident: Incident) {
        if !self.needs_check(&name) {
            return;
        }
        if let Some(finding) = incident.into_finding(self.issues) {
            self.findings.push((name, finding));
        }
    }

    pub(crate) fn finish(self) -> Vec<(SymbolName, Finding)> {
        self.findings
    }
}
