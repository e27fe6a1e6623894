//! Structural IR node model.
//!
//! A Node is one unit of program structure (file, class, function, variable,
//! import, ...). Nodes reference each other by string IDs, never by pointer;
//! a document-level hash map is enough to join them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::span::Span;

/// Node kinds, one closed set shared by all language walkers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Module,
    Class,
    Interface,
    Enum,
    Method,
    Function,
    Lambda,
    Field,
    Variable,
    Parameter,
    Import,
    TypeParameter,
    MethodReference,
    TryCatch,
}

impl NodeKind {
    /// Lowercase tag used in logical IDs.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Module => "module",
            NodeKind::Class => "class",
            NodeKind::Interface => "interface",
            NodeKind::Enum => "enum",
            NodeKind::Method => "method",
            NodeKind::Function => "function",
            NodeKind::Lambda => "lambda",
            NodeKind::Field => "field",
            NodeKind::Variable => "variable",
            NodeKind::Parameter => "parameter",
            NodeKind::Import => "import",
            NodeKind::TypeParameter => "type_parameter",
            NodeKind::MethodReference => "method_reference",
            NodeKind::TryCatch => "try_catch",
        }
    }

    /// Kinds that declare a symbol visible to other files.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            NodeKind::Class
                | NodeKind::Interface
                | NodeKind::Enum
                | NodeKind::Function
                | NodeKind::Method
                | NodeKind::Field
        )
    }

    /// Kinds that own a callable signature.
    pub fn is_callable(&self) -> bool {
        matches!(self, NodeKind::Function | NodeKind::Method | NodeKind::Lambda)
    }
}

/// Per-body control flow summary computed by walkers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlowSummary {
    pub cyclomatic_complexity: u32,
    pub has_loop: bool,
    pub has_try: bool,
    pub branch_count: u32,
}

impl Default for ControlFlowSummary {
    fn default() -> Self {
        Self {
            cyclomatic_complexity: 1,
            has_loop: false,
            has_try: false,
            branch_count: 0,
        }
    }
}

/// Structural IR node.
///
/// Immutable once the walker that produced it finishes; documents replace
/// nodes wholesale rather than mutating them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable_id: Option<String>,
    pub kind: NodeKind,
    pub fqn: String,
    pub file_path: String,
    pub span: Span,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_span: Option<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_flow_summary: Option<ControlFlowSummary>,
    /// Open bag for language-specific metadata (modifiers, annotations,
    /// generics, throws, captures). BTreeMap keeps serialization order
    /// stable across runs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(id: String, kind: NodeKind, fqn: String, file_path: String, span: Span) -> Self {
        Self {
            id,
            stable_id: None,
            kind,
            fqn,
            file_path,
            span,
            language: None,
            name: None,
            module_path: None,
            parent_id: None,
            body_span: None,
            docstring: None,
            signature_id: None,
            declared_type_id: None,
            content_hash: None,
            control_flow_summary: None,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_language(mut self, language: String) -> Self {
        self.language = Some(language);
        self
    }

    pub fn with_module_path(mut self, module_path: String) -> Self {
        self.module_path = Some(module_path);
        self
    }

    pub fn with_parent(mut self, parent_id: String) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_attr(mut self, key: &str, value: Value) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }

    /// Simple name, falling back to the last FQN segment.
    pub fn simple_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.fqn.rsplit('.').next().unwrap_or(&self.fqn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_tags() {
        assert_eq!(NodeKind::Method.as_str(), "method");
        assert_eq!(NodeKind::TryCatch.as_str(), "try_catch");
    }

    #[test]
    fn test_node_builder_chain() {
        let node = Node::new(
            "n1".to_string(),
            NodeKind::Function,
            "app.main.run".to_string(),
            "src/main.py".to_string(),
            Span::new(1, 0, 5, 0),
        )
        .with_name("run".to_string())
        .with_language("python".to_string())
        .with_parent("file1".to_string());

        assert_eq!(node.name.as_deref(), Some("run"));
        assert_eq!(node.parent_id.as_deref(), Some("file1"));
        assert_eq!(node.simple_name(), "run");
    }

    #[test]
    fn test_simple_name_falls_back_to_fqn() {
        let node = Node::new(
            "n1".to_string(),
            NodeKind::Class,
            "pkg.mod.Widget".to_string(),
            "pkg/mod.py".to_string(),
            Span::zero(),
        );
        assert_eq!(node.simple_name(), "Widget");
    }

    #[test]
    fn test_declaration_kinds() {
        assert!(NodeKind::Class.is_declaration());
        assert!(NodeKind::Method.is_declaration());
        assert!(!NodeKind::Import.is_declaration());
        assert!(!NodeKind::Parameter.is_declaration());
    }
}
