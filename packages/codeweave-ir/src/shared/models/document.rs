//! IR document — the per-file container for structural + semantic IR.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::edge::Edge;
use super::node::Node;
use super::semantic::{SignatureEntity, TypeEntity};

/// IR schema version carried by every document.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Cache validation metadata stamped onto a document after a build.
///
/// Never serialized into the wire format; it only lives in the in-process
/// cache handed back to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStamp {
    /// File modification time in nanoseconds since the epoch.
    pub mtime_ns: u128,
    /// File size in bytes.
    pub size: u64,
}

/// Complete IR for one source file.
///
/// Documents are independent until global resolution; the resolver may
/// rewrite unresolved edge targets but never mutates nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRDocument {
    pub repo_id: String,
    pub snapshot_id: String,
    pub schema_version: String,
    pub file_path: String,
    pub language: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeEntity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<SignatureEntity>,
    /// Per-file metadata: fqn_collisions, import_collisions, walker timings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
    /// Content hash of the file this document was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Fast-path cache stamp; process-local only.
    #[serde(skip)]
    pub cache: Option<CacheStamp>,
}

impl IRDocument {
    pub fn new(repo_id: String, snapshot_id: String, file_path: String, language: String) -> Self {
        Self {
            repo_id,
            snapshot_id,
            schema_version: SCHEMA_VERSION.to_string(),
            file_path,
            language,
            nodes: Vec::new(),
            edges: Vec::new(),
            types: Vec::new(),
            signatures: Vec::new(),
            meta: BTreeMap::new(),
            content_hash: None,
            cache: None,
        }
    }

    /// File node (root of the containment forest), if present.
    pub fn file_node(&self) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| matches!(n.kind, super::node::NodeKind::File))
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_by_fqn(&self, fqn: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.fqn == fqn)
    }

    pub fn edges_of_kind(&self, kind: super::edge::EdgeKind) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{NodeKind, Span};

    #[test]
    fn test_document_lookup() {
        let mut doc = IRDocument::new(
            "repo".to_string(),
            "snap".to_string(),
            "src/a.py".to_string(),
            "python".to_string(),
        );
        doc.nodes.push(Node::new(
            "f1".to_string(),
            NodeKind::File,
            "a".to_string(),
            "src/a.py".to_string(),
            Span::new(1, 0, 10, 0),
        ));
        doc.nodes.push(Node::new(
            "n1".to_string(),
            NodeKind::Function,
            "a.foo".to_string(),
            "src/a.py".to_string(),
            Span::new(2, 0, 4, 0),
        ));

        assert_eq!(doc.file_node().map(|n| n.id.as_str()), Some("f1"));
        assert!(doc.node_by_fqn("a.foo").is_some());
        assert!(doc.node_by_id("missing").is_none());
        assert_eq!(doc.schema_version, SCHEMA_VERSION);
    }
}
