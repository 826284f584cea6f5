use std::fmt;

use serde::{Deserialize, Serialize};

/// One analysable unit kind. Each issue declares the set of scopes it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    Manifest,
    SourceFile,
    CompiledMember,
    ResourceFile,
    ResourceFolder,
    Project,
}

impl Scope {
    pub const ALL: [Scope; 6] = [
        Scope::Manifest,
        Scope::SourceFile,
        Scope::CompiledMember,
        Scope::ResourceFile,
        Scope::ResourceFolder,
        Scope::Project,
    ];

    /// Stable position of this scope, used for bit sets and per-scope tables.
    pub const fn index(self) -> usize {
        match self {
            Scope::Manifest => 0,
            Scope::SourceFile => 1,
            Scope::CompiledMember => 2,
            Scope::ResourceFile => 3,
            Scope::ResourceFolder => 4,
            Scope::Project => 5,
        }
    }

    const fn bit(self) -> u8 {
        1 << self.index()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A set of [`Scope`]s backed by a bit mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ScopeSet(u8);

impl ScopeSet {
    pub const EMPTY: ScopeSet = ScopeSet(0);
    pub const ALL: ScopeSet = ScopeSet(0b11_1111);

    pub const MANIFEST_SCOPE: ScopeSet = ScopeSet::of(Scope::Manifest);
    pub const SOURCE_FILE_SCOPE: ScopeSet = ScopeSet::of(Scope::SourceFile);
    pub const MEMBER_SCOPE: ScopeSet = ScopeSet::of(Scope::CompiledMember);
    pub const RESOURCE_FILE_SCOPE: ScopeSet = ScopeSet::of(Scope::ResourceFile);
    pub const RESOURCE_FOLDER_SCOPE: ScopeSet = ScopeSet::of(Scope::ResourceFolder);
    pub const PROJECT_SCOPE: ScopeSet = ScopeSet::of(Scope::Project);

    pub const MANIFEST_AND_RESOURCE_SCOPE: ScopeSet =
        ScopeSet::of(Scope::Manifest).with(Scope::ResourceFile);
    pub const SOURCE_AND_RESOURCE_SCOPE: ScopeSet =
        ScopeSet::of(Scope::SourceFile).with(Scope::ResourceFile);
    pub const SOURCE_AND_MEMBER_SCOPE: ScopeSet =
        ScopeSet::of(Scope::SourceFile).with(Scope::CompiledMember);
    pub const RESOURCE_AND_PROJECT_SCOPE: ScopeSet =
        ScopeSet::of(Scope::ResourceFile).with(Scope::Project);
    pub const SOURCE_AND_MANIFEST_SCOPE: ScopeSet =
        ScopeSet::of(Scope::SourceFile).with(Scope::Manifest);

    /// Every named constant. Catalog capacity hints are validated against each of these.
    pub const NAMED: [(&'static str, ScopeSet); 12] = [
        ("ALL", ScopeSet::ALL),
        ("MANIFEST_SCOPE", ScopeSet::MANIFEST_SCOPE),
        ("SOURCE_FILE_SCOPE", ScopeSet::SOURCE_FILE_SCOPE),
        ("MEMBER_SCOPE", ScopeSet::MEMBER_SCOPE),
        ("RESOURCE_FILE_SCOPE", ScopeSet::RESOURCE_FILE_SCOPE),
        ("RESOURCE_FOLDER_SCOPE", ScopeSet::RESOURCE_FOLDER_SCOPE),
        ("PROJECT_SCOPE", ScopeSet::PROJECT_SCOPE),
        ("MANIFEST_AND_RESOURCE_SCOPE", ScopeSet::MANIFEST_AND_RESOURCE_SCOPE),
        ("SOURCE_AND_RESOURCE_SCOPE", ScopeSet::SOURCE_AND_RESOURCE_SCOPE),
        ("SOURCE_AND_MEMBER_SCOPE", ScopeSet::SOURCE_AND_MEMBER_SCOPE),
        ("RESOURCE_AND_PROJECT_SCOPE", ScopeSet::RESOURCE_AND_PROJECT_SCOPE),
        ("SOURCE_AND_MANIFEST_SCOPE", ScopeSet::SOURCE_AND_MANIFEST_SCOPE),
    ];

    pub const fn of(scope: Scope) -> ScopeSet {
        ScopeSet(scope.bit())
    }

    pub const fn with(self, scope: Scope) -> ScopeSet {
        ScopeSet(self.0 | scope.bit())
    }

    pub const fn union(self, other: ScopeSet) -> ScopeSet {
        ScopeSet(self.0 | other.0)
    }

    pub const fn intersection(self, other: ScopeSet) -> ScopeSet {
        ScopeSet(self.0 & other.0)
    }

    pub const fn contains(self, scope: Scope) -> bool {
        self.0 & scope.bit() != 0
    }

    pub const fn intersects(self, other: ScopeSet) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_superset_of(self, other: ScopeSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Raw mask, useful for enumerating every subset in tests.
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> ScopeSet {
        ScopeSet(bits & ScopeSet::ALL.0)
    }

    pub fn iter(self) -> impl Iterator<Item = Scope> {
        Scope::ALL.into_iter().filter(move |s| self.contains(*s))
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        iter.into_iter().fold(ScopeSet::EMPTY, ScopeSet::with)
    }
}

impl fmt::Debug for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|s| s.to_string()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
