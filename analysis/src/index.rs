//! Cross-file symbol index built in the first pass.
//!
//! Entries under a key are ordered by declaring path, then by declaration
//! order inside the file. Rebuilding one file's entries therefore yields the
//! same order as building the whole index from scratch.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use lintel_core::Location;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymbolKind {
    Id,
    Array,
    String,
    Styleable,
    Permission,
}

/// Kind and name, without configuration qualifier. This is the unit of
/// cross-file correlation and of incremental invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolName {
    pub kind: SymbolKind,
    pub name: String,
}

impl SymbolName {
    pub fn new(kind: SymbolKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for SymbolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolKey {
    pub kind: SymbolKind,
    pub name: String,
    /// Configuration qualifier, empty for the default configuration.
    pub qualifier: String,
}

impl SymbolKey {
    pub fn new(kind: SymbolKind, name: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            qualifier: qualifier.into(),
        }
    }

    pub fn symbol_name(&self) -> SymbolName {
        SymbolName::new(self.kind, self.name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolValue {
    None,
    Count(usize),
    Text(String),
}

impl SymbolValue {
    pub fn count(&self) -> Option<usize> {
        match self {
            SymbolValue::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            SymbolValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One declaration. `location.path` is the declaring file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub location: Location,
    pub value: SymbolValue,
}

impl SymbolEntry {
    pub fn path(&self) -> &str {
        &self.location.path
    }
}

/// A declaration produced by a collecting detector, not yet merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: SymbolKey,
    pub entry: SymbolEntry,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolIndex {
    entries: BTreeMap<SymbolKey, Vec<SymbolEntry>>,
    by_file: BTreeMap<String, BTreeSet<SymbolKey>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything `path` declares with `entries`.
    ///
    /// Returns the names touched before or after the replacement.
    pub fn replace_file(&mut self, path: &str, entries: Vec<IndexEntry>) -> BTreeSet<SymbolName> {
        let mut affected = self.invalidate_file(path);
        if entries.is_empty() {
            return affected;
        }
        let keys = self.by_file.entry(path.to_string()).or_default();
        for IndexEntry { key, entry } in entries {
            affected.insert(key.symbol_name());
            keys.insert(key.clone());
            let slot = self.entries.entry(key).or_default();
            let at = slot.partition_point(|e| e.path() <= path);
            slot.insert(at, entry);
        }
        affected
    }

    /// Remove everything `path` declares and return the touched names.
    pub fn invalidate_file(&mut self, path: &str) -> BTreeSet<SymbolName> {
        let mut affected = BTreeSet::new();
        let Some(keys) = self.by_file.remove(path) else {
            return affected;
        };
        for key in keys {
            if let Some(slot) = self.entries.get_mut(&key) {
                slot.retain(|e| e.path() != path);
                if slot.is_empty() {
                    self.entries.remove(&key);
                }
            }
            affected.insert(key.symbol_name());
        }
        affected
    }

    pub fn get(&self, key: &SymbolKey) -> &[SymbolEntry] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every qualifier variant of a name, in qualifier order (default first).
    ///
    /// The returned entries borrow from the index only, not from `name`.
    pub fn variants<'a>(
        &'a self,
        kind: SymbolKind,
        name: &str,
    ) -> impl Iterator<Item = (&'a str, &'a [SymbolEntry])> + 'a {
        let start = SymbolKey::new(kind, name, "");
        let name = name.to_string();
        self.entries
            .range(start..)
            .take_while(move |(k, _)| k.kind == kind && k.name == name)
            .map(|(k, v)| (k.qualifier.as_str(), v.as_slice()))
    }

    pub fn contains_name(&self, kind: SymbolKind, name: &str) -> bool {
        self.variants(kind, name).next().is_some()
    }

    /// Distinct names of a kind, sorted.
    pub fn names(&self, kind: SymbolKind) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .keys()
            .filter(|k| k.kind == kind)
            .map(|k| k.name.as_str())
            .collect();
        names.dedup();
        names
    }

    /// Names declared by one file.
    pub fn declared_by(&self, path: &str) -> BTreeSet<SymbolName> {
        self.by_file
            .get(path)
            .map(|keys| keys.iter().map(SymbolKey::symbol_name).collect())
            .unwrap_or_default()
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.by_file.keys().map(String::as_str)
    }

    /// Total number of declarations.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
