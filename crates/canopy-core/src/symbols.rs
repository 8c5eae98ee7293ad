//! Symbol table mapping `CodeEntity` FQNs (and simple names) to node ids,
//! used by the Enrichment Engine's Tier 1/2 to match a `PendingLink`'s
//! target expression against repo-local entities without a full graph scan.

use dashmap::DashMap;
use uuid::Uuid;

/// Thread-safe symbol table. Cheap to share across the concurrent Tier
/// 2/3 passes via an `Arc`.
pub struct SymbolTable {
    by_fqn: DashMap<String, Uuid>,
    /// simple name -> all FQNs sharing that name, for prefix/name-only matches.
    by_simple_name: DashMap<String, Vec<String>>,
    /// source file slug -> FQNs defined in that file.
    file_symbols: DashMap<String, Vec<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            by_fqn: DashMap::new(),
            by_simple_name: DashMap::new(),
            file_symbols: DashMap::new(),
        }
    }

    pub fn insert(&self, fqn: String, simple_name: &str, id: Uuid, source_file_slug: &str) {
        self.by_fqn.insert(fqn.clone(), id);
        self.by_simple_name
            .entry(simple_name.to_string())
            .or_default()
            .push(fqn.clone());
        self.file_symbols
            .entry(source_file_slug.to_string())
            .or_default()
            .push(fqn);
    }

    pub fn lookup_fqn(&self, fqn: &str) -> Option<Uuid> {
        self.by_fqn.get(fqn).map(|r| *r.value())
    }

    /// All FQNs registered under a given simple (unqualified) name.
    pub fn fqns_with_simple_name(&self, simple_name: &str) -> Vec<String> {
        self.by_simple_name
            .get(simple_name)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn fqns_in_file(&self, source_file_slug: &str) -> Vec<String> {
        self.file_symbols
            .get(source_file_slug)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// All FQNs currently registered, for Tier 2's full-repo candidate scan.
    pub fn all_fqns(&self) -> Vec<String> {
        self.by_fqn.iter().map(|r| r.key().clone()).collect()
    }

    pub fn remove_file(&self, source_file_slug: &str) {
        if let Some((_, fqns)) = self.file_symbols.remove(source_file_slug) {
            for fqn in fqns {
                self.by_fqn.remove(&fqn);
            }
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_fqn_and_simple_name() {
        let table = SymbolTable::new();
        let id = Uuid::new_v4();
        table.insert("a::b::foo()".into(), "foo", id, "repo:a/b.rs");

        assert_eq!(table.lookup_fqn("a::b::foo()"), Some(id));
        assert_eq!(table.fqns_with_simple_name("foo"), vec!["a::b::foo()".to_string()]);
        assert_eq!(table.fqns_in_file("repo:a/b.rs"), vec!["a::b::foo()".to_string()]);
    }

    #[test]
    fn remove_file_clears_its_symbols() {
        let table = SymbolTable::new();
        table.insert("a::foo()".into(), "foo", Uuid::new_v4(), "repo:a.rs");
        table.remove_file("repo:a.rs");
        assert!(table.lookup_fqn("a::foo()").is_none());
        assert!(table.fqns_in_file("repo:a.rs").is_empty());
    }
}
