use lintel_core::ScopeSet;
use thiserror::Error;

/// Top-level error type exposed by the engine.
///
/// This is what bubbles out to API / CLI / IDE callers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("catalog configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("session aborted by caller")]
    AbortedByCaller,

    /// "Catch-all" for unexpected internal failures.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Invalid catalog declarations. Raised while building the catalog, never
/// during analysis.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("duplicate issue id `{0}`")]
    DuplicateId(String),

    #[error("issue `{0}` declares an empty scope")]
    EmptyScope(String),

    #[error("issue `{id}` requires scope {required} but detector `{detector}` only handles {provided}")]
    ScopeMismatch {
        id: String,
        detector: String,
        required: ScopeSet,
        provided: ScopeSet,
    },

    #[error("capacity hint for {scopes} is {hint} but {actual} issues match")]
    CapacityViolation {
        scopes: String,
        hint: usize,
        actual: usize,
    },
}

/// A detector hook failed. Converted into an internal diagnostic, never
/// propagated out of a run.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("detector {detector} failed on {path}: {source}")]
    Failed {
        detector: String,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("detector {detector} panicked on {path}: {message}")]
    Panicked {
        detector: String,
        path: String,
        message: String,
    },
}

/// Errors in the session orchestration layer.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("changed file is not part of the snapshot: {0}")]
    UnknownChangedFile(String),

    #[error("invalid session state: {0}")]
    InvalidState(String),
}
