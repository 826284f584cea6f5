//! Artifact trees consumed by the analysis engine.
//!
//! Parsing is not done here: project-model adapters hand over already-built
//! trees together with the file contents they were built from.

pub mod element;
pub mod member;
pub mod source;
pub mod writer;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::types::scope::{Scope, ScopeSet};

pub use element::{Attribute, Element, TOOLS_IGNORE};
pub use member::{ClassFile, Instruction, MethodMember, Opcode};
pub use source::{Annotation, LiteralValue, NodeKind, SourceNode, SUPPRESS_ANNOTATIONS};
pub use writer::{Document, DocumentWriter};

/// File name of the project manifest.
pub const MANIFEST_FILE: &str = "AndroidManifest.xml";

/// The closed set of tree shapes an artifact can have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactTree {
    Manifest(Element),
    Resource(Element),
    Source(SourceNode),
    Member(ClassFile),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArtifactKind {
    Manifest,
    Source,
    Member,
    Resource,
}

impl ArtifactKind {
    /// Scopes an artifact of this kind participates in.
    pub fn scopes(self) -> ScopeSet {
        match self {
            ArtifactKind::Manifest => ScopeSet::MANIFEST_SCOPE,
            ArtifactKind::Source => ScopeSet::SOURCE_FILE_SCOPE,
            ArtifactKind::Member => ScopeSet::MEMBER_SCOPE,
            ArtifactKind::Resource => ScopeSet::of(Scope::ResourceFile).with(Scope::ResourceFolder),
        }
    }

    /// Best-effort kind for a path whose artifact is no longer available.
    pub fn infer(path: &str) -> Option<ArtifactKind> {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        if file_name == MANIFEST_FILE {
            Some(ArtifactKind::Manifest)
        } else if file_name.ends_with(".class") {
            Some(ArtifactKind::Member)
        } else if file_name.ends_with(".java") || file_name.ends_with(".kt") {
            Some(ArtifactKind::Source)
        } else if ResourceDir::parse(path).is_some() {
            Some(ArtifactKind::Resource)
        } else {
            None
        }
    }
}

/// Components of a resource path: `.../res/<type>[-<qualifier>]/<file>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDir<'a> {
    /// Full folder path, e.g. `res/values-de`.
    pub folder_path: &'a str,
    /// Folder name, e.g. `values-de`.
    pub folder: &'a str,
    pub resource_type: &'a str,
    /// Configuration qualifier; empty for the default configuration.
    pub qualifier: &'a str,
    pub file_name: &'a str,
}

impl<'a> ResourceDir<'a> {
    pub fn parse(path: &'a str) -> Option<ResourceDir<'a>> {
        let (folder_path, file_name) = path.rsplit_once('/')?;
        let (parent, folder) = match folder_path.rsplit_once('/') {
            Some((parent, folder)) => (parent, folder),
            None => return None,
        };
        if parent != "res" && !parent.ends_with("/res") {
            return None;
        }
        let (resource_type, qualifier) = folder.split_once('-').unwrap_or((folder, ""));
        Some(ResourceDir {
            folder_path,
            folder,
            resource_type,
            qualifier,
            file_name,
        })
    }

    /// File name without extension; the resource name for file-based resources.
    pub fn resource_name(&self) -> &'a str {
        self.file_name
            .split_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(self.file_name)
    }

    /// `folder/file`, the short form used in messages.
    pub fn display(&self) -> String {
        format!("{}/{}", self.folder, self.file_name)
    }
}

/// One analysable file of a project snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: String,
    pub contents: Arc<str>,
    pub tree: ArtifactTree,
}

impl Artifact {
    pub fn new(path: impl Into<String>, contents: impl Into<Arc<str>>, tree: ArtifactTree) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            tree,
        }
    }

    pub fn manifest(path: impl Into<String>, document: Document) -> Self {
        Self::new(path, document.contents, ArtifactTree::Manifest(document.root))
    }

    pub fn resource(path: impl Into<String>, document: Document) -> Self {
        Self::new(path, document.contents, ArtifactTree::Resource(document.root))
    }

    pub fn kind(&self) -> ArtifactKind {
        match self.tree {
            ArtifactTree::Manifest(_) => ArtifactKind::Manifest,
            ArtifactTree::Resource(_) => ArtifactKind::Resource,
            ArtifactTree::Source(_) => ArtifactKind::Source,
            ArtifactTree::Member(_) => ArtifactKind::Member,
        }
    }

    /// xxh3 hash of the contents; unchanged files are skipped on incremental runs.
    pub fn content_hash(&self) -> u64 {
        xxh3_64(self.contents.as_bytes())
    }

    pub fn resource_dir(&self) -> Option<ResourceDir<'_>> {
        match self.tree {
            ArtifactTree::Resource(_) => ResourceDir::parse(&self.path),
            _ => None,
        }
    }
}
