//! Lock-free concurrent symbol index.
//!
//! DashMap gives O(1) concurrent access without locks; Rayon parallelizes
//! construction across documents. FQN collisions keep the first writer and
//! are counted for the statistics block.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rayon::prelude::*;

use crate::shared::models::{IRDocument, NodeKind};

use super::types::Symbol;

pub struct SymbolIndex {
    /// FQN → Symbol (lock-free concurrent access)
    symbols: DashMap<String, Arc<Symbol>>,
    /// File → FQNs defined in this file
    file_symbols: DashMap<String, Vec<String>>,
    /// Simple name → FQNs (for partial matching)
    name_to_fqns: DashMap<String, Vec<String>>,
    /// FQN collisions observed during insertion (first writer wins)
    collisions: AtomicUsize,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self {
            symbols: DashMap::new(),
            file_symbols: DashMap::new(),
            name_to_fqns: DashMap::new(),
            collisions: AtomicUsize::new(0),
        }
    }

    /// Build the index from IR documents in parallel.
    pub fn build_from_docs(docs: &[&IRDocument]) -> Self {
        let index = Self::new();
        docs.par_iter().for_each(|doc| index.add_from_doc(doc));
        index
    }

    /// Add one document's externally visible declarations.
    pub fn add_from_doc(&self, doc: &IRDocument) {
        let mut file_fqns = Vec::with_capacity(doc.nodes.len());
        let shared_file_path = Arc::new(doc.file_path.clone());

        for node in &doc.nodes {
            // Imports are references, not definitions
            if matches!(node.kind, NodeKind::Import) {
                continue;
            }
            if !node.kind.is_declaration() || node.fqn.is_empty() {
                continue;
            }
            // Private Java members stay out of the global table
            if node
                .attrs
                .get("java.visibility")
                .and_then(|v| v.as_str())
                .map(|v| v == "private")
                .unwrap_or(false)
            {
                continue;
            }

            let name = node.simple_name().to_string();
            let symbol = Arc::new(Symbol::new_with_shared_path(
                node.fqn.clone(),
                name.clone(),
                node.kind,
                Arc::clone(&shared_file_path),
                node.id.clone(),
                node.span,
            ));

            let fqn = node.fqn.clone();
            // First writer wins on FQN collisions
            match self.symbols.entry(fqn.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    self.collisions.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(symbol);
                }
            }

            file_fqns.push(fqn.clone());
            self.name_to_fqns.entry(name).or_default().push(fqn);
        }

        if !file_fqns.is_empty() {
            self.file_symbols.insert(doc.file_path.clone(), file_fqns);
        }
    }

    /// Remove one file's symbols (incremental update). Returns the removed
    /// FQNs.
    pub fn remove_file(&self, file_path: &str) -> Vec<String> {
        let Some((_, fqns)) = self.file_symbols.remove(file_path) else {
            return Vec::new();
        };

        for fqn in &fqns {
            if let Some((_, symbol)) = self.symbols.remove(fqn) {
                if let Some(mut entry) = self.name_to_fqns.get_mut(&symbol.name) {
                    entry.retain(|f| f != fqn);
                }
            }
        }

        fqns
    }

    pub fn get(&self, fqn: &str) -> Option<Arc<Symbol>> {
        self.symbols.get(fqn).map(|v| v.clone())
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.symbols.contains_key(fqn)
    }

    /// All FQNs that share a simple name.
    pub fn get_by_name(&self, name: &str) -> Vec<String> {
        self.name_to_fqns
            .get(name)
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn collision_count(&self) -> usize {
        self.collisions.load(Ordering::Relaxed)
    }

    /// Snapshot into a plain map for the GlobalContext.
    pub fn to_hashmap(&self) -> HashMap<String, Symbol> {
        self.symbols
            .iter()
            .map(|entry| {
                let symbol: &Symbol = entry.value().as_ref();
                (entry.key().clone(), symbol.clone())
            })
            .collect()
    }

    /// Exact FQN match.
    pub fn resolve_exact(&self, fqn: &str) -> Option<Arc<Symbol>> {
        self.get(fqn)
    }

    /// Progressively shorter prefixes (`a.b.C` → `a.b` → `a`).
    pub fn resolve_partial(&self, fqn: &str) -> Option<(Arc<Symbol>, String)> {
        let parts: Vec<&str> = fqn.split('.').collect();
        for i in (1..parts.len()).rev() {
            let partial = parts[..i].join(".");
            if let Some(symbol) = self.get(&partial) {
                return Some((symbol, partial));
            }
        }
        None
    }

    /// Match a module name against common file layout patterns.
    ///
    /// Patterns match as path suffixes so absolute and repo-relative file
    /// keys both work; ties break on the lexicographically smallest path.
    pub fn resolve_by_module_path(&self, module_name: &str) -> Option<Arc<Symbol>> {
        let base_module = module_name.split('.').next().unwrap_or(module_name);

        let patterns = [
            format!("{}.py", base_module),
            format!("{}/__init__.py", base_module),
            format!("{}.ts", base_module),
            format!("{}.java", base_module),
        ];

        let mut best_path: Option<String> = None;
        for entry in self.file_symbols.iter() {
            let key = entry.key();
            let matched = patterns
                .iter()
                .any(|p| key == p || key.ends_with(&format!("/{}", p)));
            if matched && best_path.as_deref().map_or(true, |b| key.as_str() < b) {
                best_path = Some(key.clone());
            }
        }

        let path = best_path?;
        let fqn = self
            .file_symbols
            .get(&path)
            .and_then(|fqns| fqns.first().cloned())?;
        self.get(&fqn)
    }
}

impl Default for SymbolIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Node, Span};

    fn make_doc(file_path: &str, nodes: Vec<Node>) -> IRDocument {
        let mut doc = IRDocument::new(
            "repo".to_string(),
            "snap".to_string(),
            file_path.to_string(),
            "python".to_string(),
        );
        doc.nodes = nodes;
        doc
    }

    fn make_node(id: &str, fqn: &str, file_path: &str, name: &str) -> Node {
        Node::new(
            id.to_string(),
            NodeKind::Function,
            fqn.to_string(),
            file_path.to_string(),
            Span::new(1, 0, 10, 0),
        )
        .with_name(name.to_string())
    }

    #[test]
    fn test_build_and_lookup() {
        let doc = make_doc(
            "src/main.py",
            vec![
                make_node("n1", "main.foo", "src/main.py", "foo"),
                make_node("n2", "main.bar", "src/main.py", "bar"),
            ],
        );

        let index = SymbolIndex::build_from_docs(&[&doc]);
        assert_eq!(index.len(), 2);
        assert!(index.contains("main.foo"));
        assert!(index.contains("main.bar"));
    }

    #[test]
    fn test_import_nodes_skipped() {
        let mut import_node = make_node("n1", "os.path", "src/main.py", "path");
        import_node.kind = NodeKind::Import;
        let doc = make_doc("src/main.py", vec![import_node]);

        let index = SymbolIndex::new();
        index.add_from_doc(&doc);
        assert!(index.is_empty());
    }

    #[test]
    fn test_first_writer_wins_on_collision() {
        let doc_a = make_doc("a.py", vec![make_node("node_a", "pkg.thing", "a.py", "thing")]);
        let doc_b = make_doc("b.py", vec![make_node("node_b", "pkg.thing", "b.py", "thing")]);

        let index = SymbolIndex::new();
        index.add_from_doc(&doc_a);
        index.add_from_doc(&doc_b);

        assert_eq!(index.len(), 1);
        assert_eq!(index.collision_count(), 1);
        assert_eq!(index.get("pkg.thing").unwrap().node_id, "node_a");
    }

    #[test]
    fn test_partial_resolution() {
        let doc = make_doc(
            "src/module.py",
            vec![make_node("n1", "module.submodule", "src/module.py", "submodule")],
        );
        let index = SymbolIndex::new();
        index.add_from_doc(&doc);

        let (symbol, matched) = index.resolve_partial("module.submodule.Class").unwrap();
        assert_eq!(matched, "module.submodule");
        assert_eq!(symbol.node_id, "n1");
    }

    #[test]
    fn test_remove_file_clears_all_indexes() {
        let doc = make_doc("main.py", vec![make_node("n1", "main.foo", "main.py", "foo")]);
        let index = SymbolIndex::new();
        index.add_from_doc(&doc);
        assert_eq!(index.len(), 1);

        let removed = index.remove_file("main.py");
        assert_eq!(removed, vec!["main.foo".to_string()]);
        assert!(index.is_empty());
        assert!(index.get_by_name("foo").is_empty());
    }

    #[test]
    fn test_resolve_by_module_path() {
        let doc = make_doc("src/utils.py", vec![make_node("n1", "utils.helper", "src/utils.py", "helper")]);
        let index = SymbolIndex::new();
        index.add_from_doc(&doc);

        assert!(index.resolve_by_module_path("utils").is_some());
        assert!(index.resolve_by_module_path("missing").is_none());
    }
}
