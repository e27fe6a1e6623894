//! Structural IR edge model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::span::Span;

/// Edge kinds. `Shadows` points from the inner (hiding) definition to the
/// outer (hidden) one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    Contains,
    Calls,
    Imports,
    Inherits,
    Implements,
    References,
    Throws,
    Captures,
    Accesses,
    Shadows,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Calls => "calls",
            EdgeKind::Imports => "imports",
            EdgeKind::Inherits => "inherits",
            EdgeKind::Implements => "implements",
            EdgeKind::References => "references",
            EdgeKind::Throws => "throws",
            EdgeKind::Captures => "captures",
            EdgeKind::Accesses => "accesses",
            EdgeKind::Shadows => "shadows",
        }
    }
}

/// Typed relationship between two nodes.
///
/// `source_id` always names a node in the same document. `target_id` either
/// names a node in the document or, for edges carrying `unresolved=true`, a
/// best-effort FQN that global resolution later rewrites to a real node ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub kind: EdgeKind,
    pub source_id: String,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, Value>,
}

impl Edge {
    pub fn new(id: String, kind: EdgeKind, source_id: String, target_id: String) -> Self {
        Self {
            id,
            kind,
            source_id,
            target_id,
            span: None,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_attr(mut self, key: &str, value: Value) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }

    /// Mark the edge target as not yet bound to a real node, preserving the
    /// name global resolution should look up.
    pub fn unresolved(mut self, target_name: &str) -> Self {
        self.attrs.insert("unresolved".to_string(), Value::Bool(true));
        self.attrs
            .insert("target_name".to_string(), Value::String(target_name.to_string()));
        self
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self.attrs.get("unresolved"), Some(Value::Bool(true)))
    }

    pub fn target_name(&self) -> Option<&str> {
        self.attrs.get("target_name").and_then(Value::as_str)
    }

    pub fn alias(&self) -> Option<&str> {
        self.attrs.get("alias").and_then(Value::as_str)
    }

    /// Bind the edge to a resolved node ID, clearing the unresolved marker.
    /// The original lookup name stays in `target_name` for provenance.
    pub fn resolve_to(&mut self, node_id: &str) {
        self.target_id = node_id.to_string();
        self.attrs.insert("unresolved".to_string(), Value::Bool(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_roundtrip() {
        let mut edge = Edge::new(
            "edge:calls:bar→foo@0".to_string(),
            EdgeKind::Calls,
            "bar_id".to_string(),
            "foo".to_string(),
        )
        .unresolved("foo");

        assert!(edge.is_unresolved());
        assert_eq!(edge.target_name(), Some("foo"));

        edge.resolve_to("function:repo:a.py:foo");
        assert!(!edge.is_unresolved());
        assert_eq!(edge.target_id, "function:repo:a.py:foo");
        assert_eq!(edge.target_name(), Some("foo"));
    }

    #[test]
    fn test_edge_kind_tags() {
        assert_eq!(EdgeKind::Contains.as_str(), "contains");
        assert_eq!(EdgeKind::Shadows.as_str(), "shadows");
    }
}
