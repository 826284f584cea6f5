use lintel_core::Scope;

use crate::catalog::{CatalogBuilder, IssueCatalog};
use crate::detectors::builtin_issues;
use crate::error::ConfigurationError;

/// Declared per-scope sizes of the built-in catalog.
const SCOPE_HINTS: [(Scope, usize); 6] = [
    (Scope::Manifest, 4),
    (Scope::SourceFile, 4),
    (Scope::CompiledMember, 2),
    (Scope::ResourceFile, 8),
    (Scope::ResourceFolder, 2),
    (Scope::Project, 4),
];

pub(super) fn builtin_catalog() -> Result<IssueCatalog, ConfigurationError> {
    let mut builder = CatalogBuilder::new();
    for issue in builtin_issues() {
        builder.register(issue)?;
    }
    for (scope, hint) in SCOPE_HINTS {
        builder.capacity_hint(scope, hint);
    }
    builder.build()
}
