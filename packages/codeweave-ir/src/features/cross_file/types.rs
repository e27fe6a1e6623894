//! Cross-file resolution data structures.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::shared::models::{NodeKind, Span};

/// Global symbol definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub fqn: String,
    pub name: String,
    pub kind: NodeKind,
    pub file_path: String,
    pub node_id: String,
    pub span: Span,
}

impl Symbol {
    pub fn new(
        fqn: String,
        name: String,
        kind: NodeKind,
        file_path: String,
        node_id: String,
        span: Span,
    ) -> Self {
        Self {
            fqn,
            name,
            kind,
            file_path,
            node_id,
            span,
        }
    }

    /// Create a symbol sharing the file path allocation with its siblings.
    #[inline]
    pub fn new_with_shared_path(
        fqn: String,
        name: String,
        kind: NodeKind,
        shared_file_path: Arc<String>,
        node_id: String,
        span: Span,
    ) -> Self {
        Self {
            fqn,
            name,
            kind,
            file_path: (*shared_file_path).clone(),
            node_id,
            span,
        }
    }
}

/// Resolved import information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedImport {
    /// What was imported (FQN or module name as written).
    pub import_fqn: String,
    /// Actual symbol FQN when found.
    pub resolved_fqn: Option<String>,
    /// File containing the definition.
    pub source_file: Option<String>,
    /// Node ID of the resolved symbol.
    pub resolved_node_id: Option<String>,
    /// Third-party / not found in this repo.
    pub is_external: bool,
    pub alias: Option<String>,
    pub resolution_method: ResolutionMethod,
}

impl ResolvedImport {
    pub fn resolved(
        import_fqn: String,
        resolved_fqn: String,
        source_file: String,
        resolved_node_id: String,
        method: ResolutionMethod,
    ) -> Self {
        Self {
            import_fqn,
            resolved_fqn: Some(resolved_fqn),
            source_file: Some(source_file),
            resolved_node_id: Some(resolved_node_id),
            is_external: false,
            alias: None,
            resolution_method: method,
        }
    }

    pub fn unresolved(import_fqn: String) -> Self {
        Self {
            import_fqn,
            resolved_fqn: None,
            source_file: None,
            resolved_node_id: None,
            is_external: true,
            alias: None,
            resolution_method: ResolutionMethod::NotFound,
        }
    }

    pub fn with_alias(mut self, alias: String) -> Self {
        self.alias = Some(alias);
        self
    }
}

/// Method used to resolve an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionMethod {
    /// Exact FQN match
    ExactMatch,
    /// Partial module match (module.submodule.X → module.submodule)
    PartialMatch,
    /// Module path pattern match (module → src/module.py)
    ModulePath,
    /// Not found / external
    NotFound,
}

/// Counters reported in GlobalContext statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_symbols: usize,
    pub total_files: usize,
    pub total_imports: usize,
    pub total_dependencies: usize,
    pub fqn_collisions: usize,
    pub edges_resolved: usize,
    pub edges_unresolved: usize,
    /// Strongly connected components in the file dependency graph.
    pub cycles: Vec<Vec<String>>,
    pub build_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_construction() {
        let symbol = Symbol::new(
            "module.foo".to_string(),
            "foo".to_string(),
            NodeKind::Function,
            "src/module.py".to_string(),
            "node123".to_string(),
            Span::new(1, 0, 10, 0),
        );
        assert_eq!(symbol.fqn, "module.foo");
        assert_eq!(symbol.name, "foo");
    }

    #[test]
    fn test_resolved_import() {
        let resolved = ResolvedImport::resolved(
            "utils.helper".to_string(),
            "utils.helper".to_string(),
            "src/utils.py".to_string(),
            "node456".to_string(),
            ResolutionMethod::ExactMatch,
        );
        assert!(!resolved.is_external);
        assert_eq!(resolved.resolution_method, ResolutionMethod::ExactMatch);
    }

    #[test]
    fn test_unresolved_import() {
        let unresolved = ResolvedImport::unresolved("numpy.array".to_string());
        assert!(unresolved.is_external);
        assert_eq!(unresolved.resolution_method, ResolutionMethod::NotFound);
    }
}
