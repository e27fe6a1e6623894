//! Cross-file resolution.
//!
//! Builds the GlobalContext from per-file IR documents: a global symbol
//! table keyed by FQN, the file dependency graph in both directions, a
//! deterministic topological build order, and statistics. Unresolved edges
//! inside documents are rewritten to real node IDs where the symbol table
//! knows the target.
//!
//! Symbol indexing and import resolution run in parallel per document; the
//! topological sort runs serially on the final graph.

mod dep_graph;
mod import_resolver;
mod symbol_index;
mod types;

pub use dep_graph::DependencyGraph;
pub use import_resolver::ImportResolver;
pub use symbol_index::SymbolIndex;
pub use types::{GlobalStats, ResolutionMethod, ResolvedImport, Symbol};

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::shared::models::{EdgeKind, IRDocument, NodeKind};

/// Cross-file resolution artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalContext {
    /// FQN → symbol record.
    pub symbol_table: HashMap<String, Symbol>,
    /// file → files it imports from (sorted).
    pub file_dependencies: HashMap<String, Vec<String>>,
    /// file → files that import from it (sorted).
    pub file_dependents: HashMap<String, Vec<String>>,
    /// Build order honoring dependencies; cycles broken lexicographically.
    pub topological_order: Vec<String>,
    pub statistics: GlobalStats,
}

impl GlobalContext {
    /// Transitively affected files for a changed set, via dependents.
    pub fn affected_files(&self, changed: &HashSet<String>) -> HashSet<String> {
        let mut affected = HashSet::new();
        let mut queue: Vec<String> = changed.iter().cloned().collect();

        while let Some(path) = queue.pop() {
            if affected.insert(path.clone()) {
                if let Some(dependents) = self.file_dependents.get(&path) {
                    for dependent in dependents {
                        if !affected.contains(dependent) {
                            queue.push(dependent.clone());
                        }
                    }
                }
            }
        }

        affected
    }
}

/// Build a global context from all documents (full build). Unresolved edges
/// in the documents are rewritten in place when their targets are found.
pub fn build_global_context(docs: &mut [IRDocument]) -> GlobalContext {
    let start = Instant::now();

    // Phase 1: symbol index (parallel)
    let refs: Vec<&IRDocument> = docs.iter().collect();
    let index = SymbolIndex::build_from_docs(&refs);

    // Phase 2: import resolution (parallel)
    let resolver = ImportResolver::new(&index);
    let resolved_imports = resolver.resolve_all(&refs);
    drop(refs);

    // Phase 3: edge resolution per document
    let mut edges_resolved = 0usize;
    let mut edges_unresolved = 0usize;
    for doc in docs.iter_mut() {
        let (resolved, unresolved) = resolve_document_edges(doc, &index);
        edges_resolved += resolved;
        edges_unresolved += unresolved;
    }

    // Phase 4-5: dependency graph + topological order
    let dep_graph = DependencyGraph::build(&resolved_imports);

    let total_imports = resolved_imports.values().map(|v| v.len()).sum();
    let duration = start.elapsed();
    info!(
        symbols = index.len(),
        files = docs.len(),
        duration_ms = duration.as_millis() as u64,
        "global context built"
    );

    GlobalContext {
        symbol_table: index.to_hashmap(),
        file_dependencies: dep_graph.get_all_dependencies(),
        file_dependents: dep_graph.get_all_dependents(),
        topological_order: dep_graph.topological_order(),
        statistics: GlobalStats {
            total_symbols: index.len(),
            total_files: docs.len(),
            total_imports,
            total_dependencies: dep_graph.edge_count(),
            fqn_collisions: index.collision_count(),
            edges_resolved,
            edges_unresolved,
            cycles: dep_graph.cycles().to_vec(),
            build_duration_ms: duration.as_millis() as u64,
        },
    }
}

/// Incremental update: re-resolve only the changed files and their
/// transitive dependents, stitching the result into the prior context.
///
/// Returns the new context and the affected file set (sorted).
pub fn update_global_context(
    existing: &GlobalContext,
    docs: &mut [IRDocument],
    changed_files: &HashSet<String>,
) -> (GlobalContext, Vec<String>) {
    let start = Instant::now();

    // 1. Transitive dependent closure of the changed files
    let closure = existing.affected_files(changed_files);
    debug!(changed = changed_files.len(), affected = closure.len(), "incremental closure");

    // 2. Symbol table: keep entries owned by untouched files, reindex the
    // closure's documents
    let index = SymbolIndex::new();
    let mut kept_by_file: HashMap<&str, Vec<&Symbol>> = HashMap::new();
    for symbol in existing.symbol_table.values() {
        if !closure.contains(&symbol.file_path) {
            kept_by_file
                .entry(symbol.file_path.as_str())
                .or_default()
                .push(symbol);
        }
    }
    for (file_path, mut symbols) in kept_by_file {
        symbols.sort_by(|a, b| a.fqn.cmp(&b.fqn));
        index_insert_file(&index, file_path, &symbols);
    }
    for doc in docs.iter() {
        if closure.contains(&doc.file_path) {
            index.add_from_doc(doc);
        }
    }

    // 3-4. Imports: reuse dependency entries of untouched files, re-resolve
    // the closure's
    let resolver = ImportResolver::new(&index);
    let closure_refs: Vec<&IRDocument> = docs
        .iter()
        .filter(|d| closure.contains(&d.file_path))
        .collect();
    let closure_imports = resolver.resolve_all(&closure_refs);
    drop(closure_refs);

    let mut dependencies: HashMap<String, Vec<String>> = existing
        .file_dependencies
        .iter()
        .filter(|(file, _)| !closure.contains(*file))
        .map(|(file, deps)| (file.clone(), deps.clone()))
        .collect();
    for (file, imports) in &closure_imports {
        let mut deps: Vec<String> = imports
            .iter()
            .filter_map(|i| i.source_file.clone())
            .filter(|dep| dep != file)
            .collect();
        deps.sort();
        deps.dedup();
        dependencies.insert(file.clone(), deps);
    }

    // Edge resolution for the closure's documents
    let mut edges_resolved = 0usize;
    let mut edges_unresolved = 0usize;
    for doc in docs.iter_mut() {
        if closure.contains(&doc.file_path) {
            let (resolved, unresolved) = resolve_document_edges(doc, &index);
            edges_resolved += resolved;
            edges_unresolved += unresolved;
        }
    }

    // 5. Re-sort only when the dependency graph actually changed
    let graph_changed = dependencies != existing.file_dependencies;
    let dep_graph = DependencyGraph::from_dependency_map(&dependencies);
    let topological_order = if graph_changed {
        dep_graph.topological_order()
    } else {
        existing.topological_order.clone()
    };

    // Imports counted the same way a full build counts them
    let total_imports: usize = docs
        .iter()
        .map(|d| d.edges_of_kind(EdgeKind::Imports).count())
        .sum();

    let duration = start.elapsed();
    let affected: Vec<String> = {
        let mut list: Vec<String> = closure.iter().cloned().collect();
        list.sort();
        list
    };

    let context = GlobalContext {
        symbol_table: index.to_hashmap(),
        file_dependencies: dep_graph.get_all_dependencies(),
        file_dependents: dep_graph.get_all_dependents(),
        topological_order,
        statistics: GlobalStats {
            total_symbols: index.len(),
            total_files: docs.len(),
            total_imports,
            total_dependencies: dep_graph.edge_count(),
            fqn_collisions: index.collision_count(),
            edges_resolved,
            edges_unresolved,
            cycles: dep_graph.cycles().to_vec(),
            build_duration_ms: duration.as_millis() as u64,
        },
    };

    (context, affected)
}

fn index_insert_file(index: &SymbolIndex, file_path: &str, symbols: &[&Symbol]) {
    // Wrap the kept symbols in a synthetic document to reuse the insert path
    let mut doc = IRDocument::new(
        String::new(),
        String::new(),
        file_path.to_string(),
        String::new(),
    );
    for symbol in symbols {
        let mut node = crate::shared::models::Node::new(
            symbol.node_id.clone(),
            symbol.kind,
            symbol.fqn.clone(),
            symbol.file_path.clone(),
            symbol.span,
        );
        node.name = Some(symbol.name.clone());
        doc.nodes.push(node);
    }
    index.add_from_doc(&doc);
}

/// Kinds of edges that global resolution attempts to bind.
const RESOLVABLE_EDGE_KINDS: [EdgeKind; 5] = [
    EdgeKind::Calls,
    EdgeKind::Inherits,
    EdgeKind::Implements,
    EdgeKind::References,
    EdgeKind::Throws,
];

/// Rewrite a document's unresolved edges against the symbol index.
///
/// Lookup order per target name: exact FQN, import-alias expansion,
/// same-module FQN, unique simple-name candidate. Misses keep the edge
/// unresolved with `target_name` preserved.
fn resolve_document_edges(doc: &mut IRDocument, index: &SymbolIndex) -> (usize, usize) {
    // Import map: visible name → imported FQN
    let import_map: HashMap<String, String> = doc
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Import)
        .map(|n| (n.simple_name().to_string(), n.fqn.clone()))
        .collect();
    let module_fqn = doc.file_node().map(|f| f.fqn.clone());

    let mut resolved_count = 0usize;
    let mut unresolved_count = 0usize;

    for edge in doc.edges.iter_mut() {
        if !RESOLVABLE_EDGE_KINDS.contains(&edge.kind) || !edge.is_unresolved() {
            continue;
        }
        let Some(target_name) = edge.target_name().map(str::to_string) else {
            continue;
        };

        match lookup_target(&target_name, index, &import_map, module_fqn.as_deref()) {
            Some(node_id) => {
                edge.resolve_to(&node_id);
                resolved_count += 1;
            }
            None => {
                unresolved_count += 1;
            }
        }
    }

    (resolved_count, unresolved_count)
}

fn lookup_target(
    target_name: &str,
    index: &SymbolIndex,
    import_map: &HashMap<String, String>,
    module_fqn: Option<&str>,
) -> Option<String> {
    // 1. Exact FQN
    if let Some(symbol) = index.resolve_exact(target_name) {
        return Some(symbol.node_id.clone());
    }

    // 2. Import alias expansion: `foo` → `a.foo`, `ns.thing` → `pkg.ns.thing`
    match target_name.split_once('.') {
        None => {
            if let Some(full) = import_map.get(target_name) {
                if let Some(symbol) = index.resolve_exact(full) {
                    return Some(symbol.node_id.clone());
                }
            }
        }
        Some((head, rest)) => {
            if let Some(full) = import_map.get(head) {
                let expanded = format!("{}.{}", full, rest);
                if let Some(symbol) = index.resolve_exact(&expanded) {
                    return Some(symbol.node_id.clone());
                }
            }
        }
    }

    // 3. Same-module FQN
    if let Some(module) = module_fqn {
        let candidate = format!("{}.{}", module, target_name);
        if let Some(symbol) = index.resolve_exact(&candidate) {
            return Some(symbol.node_id.clone());
        }
    }

    // 4. Unique simple-name candidate
    let simple = target_name.rsplit('.').next().unwrap_or(target_name);
    let candidates = index.get_by_name(simple);
    if candidates.len() == 1 {
        if let Some(symbol) = index.resolve_exact(&candidates[0]) {
            return Some(symbol.node_id.clone());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ir_generation::PythonWalker;
    use crate::features::parsing::{Language, SourceFile};

    fn doc_for(path: &str, module: &str, code: &str) -> IRDocument {
        let source = SourceFile::new(path, code, module, Language::Python);
        PythonWalker::new("repo").generate(&source, "snap").unwrap()
    }

    #[test]
    fn test_build_global_context_empty() {
        let context = build_global_context(&mut []);
        assert_eq!(context.statistics.total_symbols, 0);
        assert_eq!(context.statistics.total_files, 0);
    }

    #[test]
    fn test_symbol_table_populated() {
        let mut docs = vec![doc_for("src/main.py", "main", "def foo(): pass\ndef bar(): pass\n")];
        let context = build_global_context(&mut docs);

        assert!(context.symbol_table.contains_key("main.foo"));
        assert!(context.symbol_table.contains_key("main.bar"));
        assert_eq!(context.statistics.total_files, 1);
    }

    #[test]
    fn test_cross_file_call_resolved() {
        let mut docs = vec![
            doc_for("a.py", "a", "def foo(): pass\n"),
            doc_for("b.py", "b", "from a import foo\ndef bar():\n    foo()\n"),
        ];
        let context = build_global_context(&mut docs);

        // b.py → a.py dependency recorded
        assert_eq!(
            context.file_dependencies.get("b.py"),
            Some(&vec!["a.py".to_string()])
        );
        assert_eq!(
            context.file_dependents.get("a.py"),
            Some(&vec!["b.py".to_string()])
        );

        // The CALLS edge now points at a.foo's node
        let b_doc = docs.iter().find(|d| d.file_path == "b.py").unwrap();
        let call = b_doc
            .edges_of_kind(EdgeKind::Calls)
            .next()
            .expect("call edge");
        assert!(!call.is_unresolved());
        let foo_symbol = context.symbol_table.get("a.foo").unwrap();
        assert_eq!(call.target_id, foo_symbol.node_id);
        // The lookup name is preserved
        assert_eq!(call.target_name(), Some("foo"));
    }

    #[test]
    fn test_same_module_call_resolved() {
        let mut docs = vec![doc_for(
            "a.py",
            "a",
            "def helper(): pass\ndef main():\n    helper()\n",
        )];
        let context = build_global_context(&mut docs);
        assert!(context.statistics.edges_resolved >= 1);

        let call = docs[0].edges_of_kind(EdgeKind::Calls).next().unwrap();
        assert!(!call.is_unresolved());
    }

    #[test]
    fn test_unknown_call_stays_unresolved() {
        let mut docs = vec![doc_for("a.py", "a", "def f():\n    undefined_thing()\n")];
        let context = build_global_context(&mut docs);
        assert_eq!(context.statistics.edges_unresolved, 1);

        let call = docs[0].edges_of_kind(EdgeKind::Calls).next().unwrap();
        assert!(call.is_unresolved());
        assert_eq!(call.target_name(), Some("undefined_thing"));
    }

    #[test]
    fn test_cycle_reported_in_statistics() {
        let mut docs = vec![
            doc_for("a.py", "a", "import b\ndef fa(): pass\n"),
            doc_for("b.py", "b", "import a\ndef fb(): pass\n"),
        ];
        let context = build_global_context(&mut docs);

        assert_eq!(context.statistics.cycles.len(), 1);
        assert_eq!(
            context.statistics.cycles[0],
            vec!["a.py".to_string(), "b.py".to_string()]
        );
        // Lexicographic order for cycle members, no hang
        assert_eq!(context.topological_order, vec!["a.py", "b.py"]);
    }

    #[test]
    fn test_affected_files_closure() {
        let mut docs = vec![
            doc_for("base.py", "base", "def b(): pass\n"),
            doc_for("mid.py", "mid", "from base import b\ndef m(): pass\n"),
            doc_for("top.py", "top", "from mid import m\ndef t(): pass\n"),
        ];
        let context = build_global_context(&mut docs);

        let changed: HashSet<String> = ["base.py".to_string()].into();
        let affected = context.affected_files(&changed);
        assert!(affected.contains("base.py"));
        assert!(affected.contains("mid.py"));
        assert!(affected.contains("top.py"));
    }

    #[test]
    fn test_incremental_update_matches_full_rebuild() {
        let code_a_v1 = "def foo(): pass\n";
        let code_a_v2 = "def foo(): pass\ndef extra(): pass\n";
        let code_b = "from a import foo\ndef bar():\n    foo()\n";

        // Initial full build
        let mut docs_v1 = vec![doc_for("a.py", "a", code_a_v1), doc_for("b.py", "b", code_b)];
        let context_v1 = build_global_context(&mut docs_v1);

        // Full rebuild on the modified file set
        let mut docs_full = vec![doc_for("a.py", "a", code_a_v2), doc_for("b.py", "b", code_b)];
        let context_full = build_global_context(&mut docs_full);

        // Incremental update from v1
        let mut docs_incr = vec![doc_for("a.py", "a", code_a_v2), doc_for("b.py", "b", code_b)];
        let changed: HashSet<String> = ["a.py".to_string()].into();
        let (context_incr, affected) =
            update_global_context(&context_v1, &mut docs_incr, &changed);

        assert!(affected.contains(&"b.py".to_string()));

        // Semantically identical modulo build duration
        assert_eq!(context_incr.symbol_table, context_full.symbol_table);
        assert_eq!(context_incr.file_dependencies, context_full.file_dependencies);
        assert_eq!(context_incr.file_dependents, context_full.file_dependents);
        assert_eq!(context_incr.topological_order, context_full.topological_order);
        assert_eq!(
            context_incr.statistics.total_symbols,
            context_full.statistics.total_symbols
        );

        // Documents end up with the same resolution state
        for (incr, full) in docs_incr.iter().zip(docs_full.iter()) {
            assert_eq!(incr, full);
        }
    }

    #[test]
    fn test_incremental_removes_stale_symbols() {
        let mut docs_v1 = vec![doc_for("a.py", "a", "def old_name(): pass\n")];
        let context_v1 = build_global_context(&mut docs_v1);
        assert!(context_v1.symbol_table.contains_key("a.old_name"));

        let mut docs_v2 = vec![doc_for("a.py", "a", "def new_name(): pass\n")];
        let changed: HashSet<String> = ["a.py".to_string()].into();
        let (context_v2, _) = update_global_context(&context_v1, &mut docs_v2, &changed);

        assert!(!context_v2.symbol_table.contains_key("a.old_name"));
        assert!(context_v2.symbol_table.contains_key("a.new_name"));
    }
}
