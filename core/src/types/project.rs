use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::artifact::{Artifact, ArtifactKind};

/// Resolved API levels the manifest declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionGates {
    pub min_sdk: u32,
    pub target_sdk: u32,
}

impl Default for VersionGates {
    fn default() -> Self {
        Self {
            min_sdk: 1,
            target_sdk: 1,
        }
    }
}

/// An immutable view of a project: artifacts ordered by path.
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    id: String,
    artifacts: Vec<Artifact>,
    manifest_path: Option<String>,
    versions: VersionGates,
}

impl ProjectSnapshot {
    /// Artifacts are sorted by path; when a path occurs twice the later artifact wins.
    pub fn new(id: impl Into<String>, artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        let by_path: BTreeMap<String, Artifact> = artifacts
            .into_iter()
            .map(|a| (a.path.clone(), a))
            .collect();
        let artifacts: Vec<Artifact> = by_path.into_values().collect();
        let manifest_path = artifacts
            .iter()
            .find(|a| a.kind() == ArtifactKind::Manifest)
            .map(|a| a.path.clone());
        Self {
            id: id.into(),
            artifacts,
            manifest_path,
            versions: VersionGates::default(),
        }
    }

    pub fn with_versions(mut self, versions: VersionGates) -> Self {
        self.versions = versions;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn get(&self, path: &str) -> Option<&Artifact> {
        self.artifacts
            .binary_search_by(|a| a.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.artifacts[i])
    }

    pub fn contents(&self, path: &str) -> Option<&str> {
        self.get(path).map(|a| &*a.contents)
    }

    pub fn manifest_path(&self) -> Option<&str> {
        self.manifest_path.as_deref()
    }

    pub fn manifest(&self) -> Option<&Artifact> {
        self.manifest_path.as_deref().and_then(|p| self.get(p))
    }

    pub fn versions(&self) -> VersionGates {
        self.versions
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Insert or replace the artifact at its path.
    pub fn upsert(&mut self, artifact: Artifact) {
        match self
            .artifacts
            .binary_search_by(|a| a.path.as_str().cmp(&artifact.path))
        {
            Ok(i) => self.artifacts[i] = artifact,
            Err(i) => self.artifacts.insert(i, artifact),
        }
        self.refresh_manifest();
    }

    pub fn remove(&mut self, path: &str) -> Option<Artifact> {
        let index = self
            .artifacts
            .binary_search_by(|a| a.path.as_str().cmp(path))
            .ok()?;
        let removed = self.artifacts.remove(index);
        self.refresh_manifest();
        Some(removed)
    }

    fn refresh_manifest(&mut self) {
        self.manifest_path = self
            .artifacts
            .iter()
            .find(|a| a.kind() == ArtifactKind::Manifest)
            .map(|a| a.path.clone());
    }
}
