//! IR emitter - shared stateful builder used by every language walker.
//!
//! Responsibilities:
//! - Node/edge ID generation (logical + stable, occurrence-numbered edges)
//! - FQN construction through the scope stack
//! - Shadowing collection (turned into SHADOWS edges at finish)
//! - Type/signature entity bookkeeping
//! - Post-pass validation: import collisions, FQN uniqueness

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Value};
use tracing::warn;

use crate::features::type_resolution::TypeResolver;
use crate::shared::id_strategy::{content_hash, edge_id, logical_id, stable_id};
use crate::shared::models::{
    Edge, EdgeKind, IRDocument, Node, NodeKind, SignatureEntity, Span,
};
use crate::shared::scope_stack::{ScopeStack, Shadowing};

pub struct IrEmitter {
    repo_id: String,
    file_path: String,
    language: String,
    pub scope: ScopeStack,
    pub resolver: TypeResolver,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    types: BTreeMap<String, crate::shared::models::TypeEntity>,
    signatures: Vec<SignatureEntity>,
    /// (kind, source, target) → next occurrence number.
    edge_occurrences: HashMap<String, usize>,
    shadowings: Vec<Shadowing>,
    /// (simple name, full import path) pairs seen in this file.
    imports_seen: Vec<(String, String)>,
}

impl IrEmitter {
    pub fn new(
        repo_id: impl Into<String>,
        file_path: impl Into<String>,
        language: impl Into<String>,
        module_path: impl Into<String>,
    ) -> Self {
        let repo_id = repo_id.into();
        let file_path = file_path.into();
        let mut resolver = TypeResolver::new(repo_id.clone());
        resolver.set_context(&file_path);

        Self {
            repo_id,
            file_path,
            language: language.into(),
            scope: ScopeStack::new(module_path),
            resolver,
            nodes: Vec::new(),
            edges: Vec::new(),
            types: BTreeMap::new(),
            signatures: Vec::new(),
            edge_occurrences: HashMap::new(),
            shadowings: Vec::new(),
            imports_seen: Vec::new(),
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    pub fn module_fqn(&self) -> String {
        self.scope.module().fqn.clone()
    }

    /// Logical node ID for a kind/FQN pair in this file.
    pub fn node_id(&self, kind: NodeKind, fqn: &str) -> String {
        logical_id(&self.repo_id, kind, &self.file_path, fqn)
    }

    /// Create a node with all identity fields filled in.
    pub fn make_node(
        &self,
        kind: NodeKind,
        name: &str,
        fqn: &str,
        span: Span,
        source_text: &str,
    ) -> Node {
        let id = self.node_id(kind, fqn);
        let hash = content_hash(source_text);

        let mut node = Node::new(id, kind, fqn.to_string(), self.file_path.clone(), span)
            .with_language(self.language.clone())
            .with_module_path(self.scope.module().fqn.clone());
        if !name.is_empty() {
            node.name = Some(name.to_string());
        }
        node.stable_id = Some(stable_id(&self.repo_id, kind, fqn, span, &hash));
        node.content_hash = Some(hash);
        node.parent_id = self.scope.current_node_id().map(str::to_string);
        node
    }

    pub fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Create an edge with an occurrence-numbered ID.
    pub fn edge(&mut self, kind: EdgeKind, source_id: &str, target_id: &str) -> Edge {
        let key = format!("{}:{}:{}", kind.as_str(), source_id, target_id);
        let occurrence = {
            let counter = self.edge_occurrences.entry(key).or_insert(0);
            let current = *counter;
            *counter += 1;
            current
        };

        Edge::new(
            edge_id(kind.as_str(), source_id, target_id, occurrence),
            kind,
            source_id.to_string(),
            target_id.to_string(),
        )
    }

    pub fn push_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// CONTAINS edge from parent to child.
    pub fn add_contains(&mut self, parent_id: &str, child_id: &str, span: Span) {
        let edge = self.edge(EdgeKind::Contains, parent_id, child_id).with_span(span);
        self.push_edge(edge);
    }

    /// Unresolved CALLS edge; the target stays a name until global
    /// resolution binds it.
    pub fn add_call(&mut self, caller_id: &str, callee_name: &str, span: Span) {
        let edge = self
            .edge(EdgeKind::Calls, caller_id, callee_name)
            .with_span(span)
            .unresolved(callee_name);
        self.push_edge(edge);
    }

    pub fn add_inherits(&mut self, child_id: &str, base_fqn: &str, span: Span) {
        let edge = self
            .edge(EdgeKind::Inherits, child_id, base_fqn)
            .with_span(span)
            .unresolved(base_fqn);
        self.push_edge(edge);
    }

    pub fn add_implements(&mut self, child_id: &str, interface_fqn: &str, span: Span) {
        let edge = self
            .edge(EdgeKind::Implements, child_id, interface_fqn)
            .with_span(span)
            .unresolved(interface_fqn);
        self.push_edge(edge);
    }

    /// IMPORTS edge from the importing context to the import node.
    pub fn add_imports(
        &mut self,
        importer_id: &str,
        import_node_id: &str,
        span: Span,
        alias: Option<&str>,
    ) {
        let mut edge = self
            .edge(EdgeKind::Imports, importer_id, import_node_id)
            .with_span(span);
        if let Some(alias) = alias {
            edge = edge.with_attr("alias", Value::String(alias.to_string()));
        }
        self.push_edge(edge);
    }

    /// Register a declared symbol; shadowing is recorded for the post-pass.
    pub fn register_symbol(&mut self, name: &str, node_id: &str) {
        if let Some(shadowing) = self.scope.register_symbol(name, node_id) {
            self.shadowings.push(shadowing);
        }
    }

    /// Record an import's simple name for collision detection.
    pub fn record_import(&mut self, simple_name: &str, full_path: &str) {
        self.imports_seen
            .push((simple_name.to_string(), full_path.to_string()));
    }

    /// Resolve a type annotation, intern the entity, return its ID.
    pub fn resolve_type_entity(&mut self, raw: &str) -> Option<String> {
        if raw.trim().is_empty() {
            return None;
        }
        let entity = self.resolver.resolve_type(raw);
        let id = entity.id.clone();
        self.types.entry(id.clone()).or_insert(entity);
        Some(id)
    }

    pub fn add_signature(&mut self, signature: SignatureEntity) {
        self.signatures.push(signature);
    }

    /// Link a callable node to its signature after the fact.
    pub fn set_signature_id(&mut self, node_id: &str, signature_id: &str) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) {
            node.signature_id = Some(signature_id.to_string());
        }
    }

    /// Link a typed node to its declared type after the fact.
    pub fn set_declared_type_id(&mut self, node_id: &str, type_id: &str) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) {
            node.declared_type_id = Some(type_id.to_string());
        }
    }

    /// Append a reassignment location to an existing variable node.
    pub fn add_reassignment(&mut self, node_id: &str, line: u32, column: u32) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) {
            let entry = node
                .attrs
                .entry("reassignments".to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(list) = entry {
                list.push(json!({ "line": line, "column": column }));
            }
        }
    }

    /// Attach an attribute to an already-pushed node.
    pub fn set_node_attr(&mut self, node_id: &str, key: &str, value: Value) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) {
            node.attrs.insert(key.to_string(), value);
        }
    }

    /// Finalize into an IRDocument: emit SHADOWS edges, validate imports and
    /// FQN uniqueness, attach metadata.
    pub fn finish(mut self, snapshot_id: &str, file_content: &str) -> IRDocument {
        self.emit_shadow_edges();

        let import_collisions = self.detect_import_collisions();
        let fqn_collisions = self.validate_fqn_uniqueness();

        let mut doc = IRDocument::new(
            self.repo_id,
            snapshot_id.to_string(),
            self.file_path,
            self.language,
        );
        doc.content_hash = Some(content_hash(file_content));
        doc.nodes = self.nodes;
        doc.edges = self.edges;
        doc.types = self.types.into_values().collect();
        doc.signatures = self.signatures;

        if !import_collisions.is_empty() {
            doc.meta
                .insert("import_collisions".to_string(), json!(import_collisions));
        }
        if !fqn_collisions.is_empty() {
            doc.meta
                .insert("fqn_collisions".to_string(), json!(fqn_collisions));
        }

        doc
    }

    /// SHADOWS edges point from the inner (hiding) definition to the outer
    /// (hidden) one, in registration order.
    fn emit_shadow_edges(&mut self) {
        let shadowings = std::mem::take(&mut self.shadowings);
        for shadow in shadowings {
            let edge = self
                .edge(EdgeKind::Shadows, &shadow.inner_node_id, &shadow.outer_node_id)
                .with_attr("name", Value::String(shadow.name))
                .with_attr("inner_scope", Value::String(shadow.inner_scope_fqn))
                .with_attr("outer_scope", Value::String(shadow.outer_scope_fqn));
            self.push_edge(edge);
        }
    }

    /// Distinct imports sharing a simple name.
    fn detect_import_collisions(&self) -> Vec<Value> {
        let mut by_simple_name: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (simple, full) in &self.imports_seen {
            let entry = by_simple_name.entry(simple).or_default();
            if !entry.contains(&full.as_str()) {
                entry.push(full);
            }
        }

        by_simple_name
            .into_iter()
            .filter(|(_, fulls)| fulls.len() > 1)
            .map(|(simple, fulls)| json!({ "simple_name": simple, "imports": fulls }))
            .collect()
    }

    /// FQN collisions within the file; first node wins, all are recorded.
    fn validate_fqn_uniqueness(&self) -> Vec<Value> {
        let mut seen: HashMap<&str, &Node> = HashMap::new();
        let mut collisions = Vec::new();

        for node in &self.nodes {
            if let Some(existing) = seen.get(node.fqn.as_str()) {
                warn!(fqn = %node.fqn, "FQN collision within file");
                collisions.push(json!({
                    "fqn": node.fqn,
                    "first": existing.id,
                    "duplicate": node.id,
                }));
            } else {
                seen.insert(&node.fqn, node);
            }
        }

        collisions
    }
}
