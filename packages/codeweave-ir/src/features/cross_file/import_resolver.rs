//! Import resolution against the global symbol index.
//!
//! Resolution order per import: exact FQN → progressively shorter prefix →
//! module file-layout pattern → external. Documents resolve in parallel.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::shared::models::{EdgeKind, IRDocument, NodeKind};

use super::symbol_index::SymbolIndex;
use super::types::{ResolutionMethod, ResolvedImport};

pub struct ImportResolver<'a> {
    index: &'a SymbolIndex,
}

impl<'a> ImportResolver<'a> {
    pub fn new(index: &'a SymbolIndex) -> Self {
        Self { index }
    }

    /// Resolve all imports across documents. Returns file → resolved
    /// imports, with per-file import lists in source order.
    pub fn resolve_all(&self, docs: &[&IRDocument]) -> HashMap<String, Vec<ResolvedImport>> {
        docs.par_iter()
            .map(|doc| (doc.file_path.clone(), self.resolve_document(doc)))
            .collect()
    }

    fn resolve_document(&self, doc: &IRDocument) -> Vec<ResolvedImport> {
        let mut resolved = Vec::new();

        for edge in doc.edges_of_kind(EdgeKind::Imports) {
            let Some(import_node) = doc.node_by_id(&edge.target_id) else {
                continue;
            };
            if import_node.kind != NodeKind::Import {
                continue;
            }

            let mut result = self.resolve_one(&import_node.fqn, &doc.file_path);
            if let Some(alias) = edge.alias() {
                result = result.with_alias(alias.to_string());
            }
            resolved.push(result);
        }

        resolved
    }

    /// Resolve one import path against the index.
    pub fn resolve_one(&self, import_fqn: &str, importing_file: &str) -> ResolvedImport {
        // Wildcards resolve against the module itself
        let lookup_fqn = import_fqn.trim_end_matches(".*");

        if let Some(symbol) = self.index.resolve_exact(lookup_fqn) {
            // A file importing its own symbol is not a dependency
            if symbol.file_path != importing_file {
                return ResolvedImport::resolved(
                    import_fqn.to_string(),
                    symbol.fqn.clone(),
                    symbol.file_path.clone(),
                    symbol.node_id.clone(),
                    ResolutionMethod::ExactMatch,
                );
            }
            return ResolvedImport::unresolved(import_fqn.to_string());
        }

        if let Some((symbol, _matched)) = self.index.resolve_partial(lookup_fqn) {
            if symbol.file_path != importing_file {
                return ResolvedImport::resolved(
                    import_fqn.to_string(),
                    symbol.fqn.clone(),
                    symbol.file_path.clone(),
                    symbol.node_id.clone(),
                    ResolutionMethod::PartialMatch,
                );
            }
        }

        if let Some(symbol) = self.index.resolve_by_module_path(lookup_fqn) {
            if symbol.file_path != importing_file {
                return ResolvedImport::resolved(
                    import_fqn.to_string(),
                    symbol.fqn.clone(),
                    symbol.file_path.clone(),
                    symbol.node_id.clone(),
                    ResolutionMethod::ModulePath,
                );
            }
        }

        ResolvedImport::unresolved(import_fqn.to_string())
    }
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
    fn test_exact_match_resolution() {
        let lib = doc_for("a.py", "a", "def foo(): pass\n");
        let main = doc_for("b.py", "b", "from a import foo\n");

        let index = SymbolIndex::build_from_docs(&[&lib, &main]);
        let resolver = ImportResolver::new(&index);
        let resolved = resolver.resolve_all(&[&lib, &main]);

        let b_imports = resolved.get("b.py").unwrap();
        assert_eq!(b_imports.len(), 1);
        assert_eq!(b_imports[0].resolution_method, ResolutionMethod::ExactMatch);
        assert_eq!(b_imports[0].source_file.as_deref(), Some("a.py"));
        assert_eq!(b_imports[0].resolved_fqn.as_deref(), Some("a.foo"));
    }

    #[test]
    fn test_external_import_unresolved() {
        let main = doc_for("b.py", "b", "import numpy\n");
        let index = SymbolIndex::build_from_docs(&[&main]);
        let resolver = ImportResolver::new(&index);
        let resolved = resolver.resolve_all(&[&main]);

        let imports = resolved.get("b.py").unwrap();
        assert_eq!(imports.len(), 1);
        assert!(imports[0].is_external);
        assert_eq!(imports[0].resolution_method, ResolutionMethod::NotFound);
    }

    #[test]
    fn test_partial_match_resolution() {
        // `from a import foo` resolves exactly; `import a.foo.deeper` only
        // partially (a.foo exists, a.foo.deeper does not)
        let lib = doc_for("a.py", "a", "def foo(): pass\n");
        let main = doc_for("b.py", "b", "import a.foo.deeper\n");

        let index = SymbolIndex::build_from_docs(&[&lib, &main]);
        let resolver = ImportResolver::new(&index);
        let resolved = resolver.resolve_all(&[&lib, &main]);

        let imports = resolved.get("b.py").unwrap();
        assert_eq!(imports[0].resolution_method, ResolutionMethod::PartialMatch);
        assert_eq!(imports[0].source_file.as_deref(), Some("a.py"));
    }

    #[test]
    fn test_alias_carried_through() {
        let lib = doc_for("a.py", "a", "def foo(): pass\n");
        let main = doc_for("b.py", "b", "from a import foo as f\n");

        let index = SymbolIndex::build_from_docs(&[&lib, &main]);
        let resolver = ImportResolver::new(&index);
        let resolved = resolver.resolve_all(&[&lib, &main]);

        let imports = resolved.get("b.py").unwrap();
        assert_eq!(imports[0].alias.as_deref(), Some("f"));
    }
}
