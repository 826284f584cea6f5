pub mod finding;
pub mod location;
pub mod project;
pub mod scope;

pub use finding::{Category, Finding, Severity};
pub use location::{Location, Position, SecondaryLocation, TextRange};
pub use project::{ProjectSnapshot, VersionGates};
pub use scope::{Scope, ScopeSet};
