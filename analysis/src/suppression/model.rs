//! Data structures for finding suppression.

use serde::{Deserialize, Serialize};

use crate::config::ALL_IDS;

/// Prefix some tools put in front of issue ids inside suppression markers.
const TOOL_PREFIX: &str = "AndroidLint";

/// Where a suppression marker was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerSource {
    /// A `tools:ignore` attribute on a markup element.
    Attribute,
    /// A `@SuppressLint` / `@SuppressWarnings` annotation.
    Annotation,
    /// A `noinspection` / `suppress` comment.
    Comment,
}

/// A set of issue ids suppressed at some node.
///
/// An id list containing `all` suppresses every issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionMarker {
    pub ids: Vec<String>,
    pub source: MarkerSource,
}

impl SuppressionMarker {
    pub fn new<I, S>(ids: I, source: MarkerSource) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ids: ids
                .into_iter()
                .map(|id| normalize_id(id.as_ref()).to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            source,
        }
    }

    pub fn matches(&self, issue_id: &str) -> bool {
        self.ids.iter().any(|id| id == issue_id || id == ALL_IDS)
    }
}

/// A suppression comment found in file text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSuppression {
    pub marker: SuppressionMarker,
    /// Byte offset of the comment opener.
    pub start: usize,
    /// Byte offset just past the comment terminator.
    pub end: usize,
    /// Optional reason provided after the ids (text after `-` or `--`).
    pub reason: Option<String>,
}

impl CommentSuppression {
    /// True when only whitespace separates this comment from `offset`.
    pub fn immediately_precedes(&self, contents: &str, offset: usize) -> bool {
        if self.end > offset || offset > contents.len() {
            return false;
        }
        contents
            .get(self.end..offset)
            .map(|between| between.chars().all(char::is_whitespace))
            .unwrap_or(false)
    }
}

fn normalize_id(id: &str) -> &str {
    let id = id.trim();
    match id.strip_prefix(TOOL_PREFIX) {
        Some(rest) if !rest.is_empty() => rest,
        _ => id,
    }
}
