//! Finding suppression.
//!
//! Findings can be silenced in three ways:
//!
//! ```text
//! <LinearLayout tools:ignore="TooManyViews,TooDeepLayout">
//! @SuppressLint("ShortAlarm")
//! //noinspection MissingPermission
//! <!--suppress InconsistentArrays -->
//! ```
//!
//! - **Markers on nodes**: an attribute or annotation on a node covers the
//!   node and everything nested in it
//! - **Comments**: a suppression comment directly before a node behaves like
//!   a marker on that node
//! - **Configuration**: disabled ids and per-id ignored path patterns
//!
//! The reserved `LintError` id is never suppressed.

mod filter;
mod model;
mod parser;

pub use filter::SuppressionFilter;
pub use model::{CommentSuppression, MarkerSource, SuppressionMarker};
pub use parser::parse_comment_suppressions;
