//! lintel-analysis: issue catalog and two-pass detection engine
//!
//! This crate provides the analysis engine for lintel, including:
//! - A validated catalog of issues, each bound to a detector and a scope
//! - A symbol index built in a first pass over every artifact
//! - Scope-driven dispatch of detectors over manifest, resource, source and
//!   compiled-member trees, resource folders and the whole project
//! - Suppression by markers, comments and configuration
//! - Batch and incremental runs that produce the same report
//!
//! # Example
//!
//! ```ignore
//! use lintel_analysis::{AnalysisMode, Engine};
//!
//! let engine = Engine::with_builtin_catalog()?;
//! let report = engine.analyze(&snapshot, &AnalysisMode::Full)?;
//! print!("{}", report.text);
//! ```

pub mod catalog;
pub mod config;
pub mod detectors;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod index;
pub mod report;
pub mod scope;
pub mod session;
pub mod suppression;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use catalog::{CatalogBuilder, Implementation, Issue, IssueCatalog, LINT_ERROR};
pub use detectors::{Detector, Incident, IndexSink, ProjectContext, VisitContext};
pub use dispatch::DetectorDispatcher;
pub use index::{SymbolIndex, SymbolKind, SymbolName, SymbolValue};
pub use report::{AnalysisReport, DiagnosticAggregator, NO_WARNINGS};
pub use scope::{AnalysisMode, FileChange, ScopeSelector};
pub use session::{AnalysisSession, CancellationToken, ProjectState, RunKind, RunStats};
pub use suppression::SuppressionFilter;

// Re-export main engine types
pub use config::{AnalysisConfig, EngineConfig};
pub use engine::Engine;
pub use error::{ConfigurationError, DetectorError, EngineError, SessionError};
