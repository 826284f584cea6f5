//! # lintel-core
//!
//! Shared data model for the lintel analysis engine.
//!
//! - **Types**: scopes, positions and locations, severities and findings,
//!   project snapshots
//! - **Artifacts**: the closed set of already-parsed trees the engine
//!   dispatches over (manifest, resource, source and compiled members)
//!
//! ## Example
//!
//! ```rust
//! use lintel_core::artifact::{Artifact, DocumentWriter};
//! use lintel_core::ProjectSnapshot;
//!
//! let mut w = DocumentWriter::new();
//! w.start("resources", &[]);
//! w.leaf("string", &[("name", "app_name")], Some("Demo"));
//! w.end();
//! let strings = Artifact::resource("res/values/strings.xml", w.finish().unwrap());
//!
//! let snapshot = ProjectSnapshot::new("demo", vec![strings]);
//! assert_eq!(snapshot.len(), 1);
//! ```

pub mod artifact;
pub mod types;

pub use artifact::{Artifact, ArtifactKind, ArtifactTree};
pub use types::{
    Category, Finding, Location, Position, ProjectSnapshot, Scope, ScopeSet, SecondaryLocation,
    Severity, TextRange, VersionGates,
};
