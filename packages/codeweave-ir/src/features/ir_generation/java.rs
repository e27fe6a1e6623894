//! Java walker: tree-sitter-java AST → IRDocument.
//!
//! Java-specific behavior:
//! - Method FQNs embed parameter type signatures (`C.f(int,String)`), so
//!   overloads stay distinct; varargs are marked with `…`.
//! - Constructors are methods whose name matches the enclosing class.
//! - Lambdas and anonymous classes get position-derived FQNs plus capture
//!   and access analysis.
//! - Method references classify into STATIC / INSTANCE_BOUND /
//!   INSTANCE_UNBOUND / CONSTRUCTOR by heuristic.
//! - try/catch blocks become TryCatch nodes; declared and uncaught thrown
//!   exceptions are recorded.

use serde_json::{json, Value};
use tree_sitter::Node as TsNode;

use crate::features::parsing::{self, SourceFile};
use crate::shared::id_strategy::{signature_hash, signature_id};
use crate::shared::models::{EdgeKind, IRDocument, NodeKind, Result, SignatureEntity};
use crate::shared::scope_stack::ScopeKind;
use crate::shared::ts::{
    find_child_by_kind, find_children_by_kind, node_text, node_text_owned, node_to_span,
};

use super::builder::IrEmitter;
use super::control_flow::{summarize, JAVA_CONTROL_FLOW};

/// Identifiers never treated as lambda captures.
const CAPTURE_KEYWORDS: [&str; 5] = ["this", "super", "new", "return", "throw"];

/// Method reference classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodRefType {
    Static,
    InstanceBound,
    InstanceUnbound,
    Constructor,
}

impl MethodRefType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodRefType::Static => "STATIC",
            MethodRefType::InstanceBound => "INSTANCE_BOUND",
            MethodRefType::InstanceUnbound => "INSTANCE_UNBOUND",
            MethodRefType::Constructor => "CONSTRUCTOR",
        }
    }
}

pub struct JavaWalker {
    repo_id: String,
}

impl JavaWalker {
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
        }
    }

    pub fn generate(&self, source: &SourceFile, snapshot_id: &str) -> Result<IRDocument> {
        let tree = parsing::parse(source)?;
        let root = tree.root_node();
        let src = source.content.as_str();

        // Package declaration decides the module FQN; fall back to the
        // path-derived module path.
        let package = find_child_by_kind(&root, "package_declaration")
            .and_then(|p| {
                find_child_by_kind(&p, "scoped_identifier")
                    .or_else(|| find_child_by_kind(&p, "identifier"))
            })
            .map(|n| node_text_owned(&n, src))
            .unwrap_or_else(|| source.module_path.clone());

        let mut emit = IrEmitter::new(&self.repo_id, &source.path, "java", &package);

        let file_name = source
            .path
            .rsplit('/')
            .next()
            .unwrap_or(&source.path)
            .to_string();
        let mut file_node =
            emit.make_node(NodeKind::File, &file_name, &package, node_to_span(&root), src);
        file_node.parent_id = None;
        let file_id = file_node.id.clone();
        emit.push_node(file_node);
        emit.scope.set_current_node_id(&file_id);

        for i in 0..root.child_count() {
            let Some(child) = root.child(i) else { continue };
            match child.kind() {
                "import_declaration" => self.process_import(&child, &mut emit, src),
                "class_declaration" => self.process_class(&child, &mut emit, src),
                "interface_declaration" => self.process_interface(&child, &mut emit, src),
                "enum_declaration" => self.process_enum(&child, &mut emit, src),
                _ => {}
            }
        }

        Ok(emit.finish(snapshot_id, src))
    }

    fn process_import(&self, node: &TsNode, emit: &mut IrEmitter, src: &str) {
        let Some(path_node) = find_child_by_kind(node, "scoped_identifier")
            .or_else(|| find_child_by_kind(node, "identifier"))
        else {
            return;
        };

        let mut import_path = node_text_owned(&path_node, src);
        let is_static = (0..node.child_count())
            .filter_map(|i| node.child(i))
            .any(|c| c.kind() == "static");
        let is_wildcard = (0..node.child_count())
            .filter_map(|i| node.child(i))
            .any(|c| c.kind() == "asterisk");
        if is_wildcard {
            import_path.push_str(".*");
        }

        let span = node_to_span(node);
        let simple_name = import_path
            .trim_end_matches(".*")
            .rsplit('.')
            .next()
            .unwrap_or(&import_path)
            .to_string();

        let mut import_node =
            emit.make_node(NodeKind::Import, &simple_name, &import_path, span, &import_path);
        if is_static {
            import_node
                .attrs
                .insert("java.is_static_import".to_string(), Value::Bool(true));
        }
        if is_wildcard {
            import_node
                .attrs
                .insert("java.is_wildcard".to_string(), Value::Bool(true));
        }

        let import_id = import_node.id.clone();
        let parent_id = emit.scope.current_node_id().map(str::to_string);
        emit.push_node(import_node);
        if let Some(parent) = parent_id {
            emit.add_imports(&parent, &import_id, span, None);
        }

        if !is_wildcard {
            emit.scope.register_import(&simple_name, &import_path);
            emit.resolver
                .register_import_alias(simple_name.clone(), import_path.clone());
            emit.record_import(&simple_name, &import_path);
        }
    }

    fn process_class(&self, node: &TsNode, emit: &mut IrEmitter, src: &str) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text_owned(&name_node, src);
        let fqn = emit.scope.build_fqn(&name);
        let span = node_to_span(node);
        let body = node.child_by_field_name("body");

        let mut class_node = emit.make_node(NodeKind::Class, &name, &fqn, span, node_text(node, src));
        class_node.body_span = body.as_ref().map(node_to_span);
        self.attach_modifiers(node, &mut class_node, src);

        let class_id = class_node.id.clone();
        let parent_id = emit.scope.current_node_id().map(str::to_string);
        emit.push_node(class_node);
        if let Some(parent) = parent_id {
            emit.add_contains(&parent, &class_id, span);
        }
        emit.register_symbol(&name, &class_id);
        emit.resolver.register_local_class(name.clone(), class_id.clone());

        // extends → INHERITS
        if let Some(superclass) = find_child_by_kind(node, "superclass") {
            for i in 0..superclass.child_count() {
                if let Some(ty) = superclass.child(i) {
                    if matches!(ty.kind(), "type_identifier" | "scoped_type_identifier" | "generic_type") {
                        let base = node_text_owned(&ty, src);
                        let base_fqn = self.type_to_fqn(&base, emit);
                        emit.add_inherits(&class_id, &base_fqn, span);
                    }
                }
            }
        }

        // implements → IMPLEMENTS
        if let Some(interfaces) = find_child_by_kind(node, "super_interfaces") {
            if let Some(list) = find_child_by_kind(&interfaces, "type_list") {
                for i in 0..list.child_count() {
                    if let Some(ty) = list.child(i) {
                        if matches!(ty.kind(), "type_identifier" | "scoped_type_identifier" | "generic_type") {
                            let iface = node_text_owned(&ty, src);
                            let iface_fqn = self.type_to_fqn(&iface, emit);
                            emit.add_implements(&class_id, &iface_fqn, span);
                        }
                    }
                }
            }
        }

        self.process_type_parameters(node, emit, src, &class_id, &fqn);

        emit.scope.push(ScopeKind::Class, name);
        emit.scope.set_current_node_id(&class_id);
        if let Some(body) = body {
            self.process_class_body(&body, emit, src);
        }
        emit.scope.pop();
    }

    fn process_class_body(&self, body: &TsNode, emit: &mut IrEmitter, src: &str) {
        for i in 0..body.child_count() {
            let Some(member) = body.child(i) else { continue };
            match member.kind() {
                "method_declaration" => self.process_method(&member, emit, src, false),
                "constructor_declaration" => self.process_method(&member, emit, src, true),
                "field_declaration" => self.process_field(&member, emit, src),
                "class_declaration" => self.process_class(&member, emit, src),
                "interface_declaration" => self.process_interface(&member, emit, src),
                "enum_declaration" => self.process_enum(&member, emit, src),
                _ => {}
            }
        }
    }

    fn process_interface(&self, node: &TsNode, emit: &mut IrEmitter, src: &str) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text_owned(&name_node, src);
        let fqn = emit.scope.build_fqn(&name);
        let span = node_to_span(node);
        let body = node.child_by_field_name("body");

        let mut iface_node =
            emit.make_node(NodeKind::Interface, &name, &fqn, span, node_text(node, src));
        iface_node.body_span = body.as_ref().map(node_to_span);
        self.attach_modifiers(node, &mut iface_node, src);

        let iface_id = iface_node.id.clone();
        let parent_id = emit.scope.current_node_id().map(str::to_string);
        emit.push_node(iface_node);
        if let Some(parent) = parent_id {
            emit.add_contains(&parent, &iface_id, span);
        }
        emit.register_symbol(&name, &iface_id);
        emit.resolver.register_local_class(name.clone(), iface_id.clone());

        // extends on interfaces → INHERITS
        if let Some(extends) = find_child_by_kind(node, "extends_interfaces") {
            if let Some(list) = find_child_by_kind(&extends, "type_list") {
                for i in 0..list.child_count() {
                    if let Some(ty) = list.child(i) {
                        if matches!(ty.kind(), "type_identifier" | "scoped_type_identifier" | "generic_type") {
                            let base = node_text_owned(&ty, src);
                            let base_fqn = self.type_to_fqn(&base, emit);
                            emit.add_inherits(&iface_id, &base_fqn, span);
                        }
                    }
                }
            }
        }

        self.process_type_parameters(node, emit, src, &iface_id, &fqn);

        emit.scope.push(ScopeKind::Class, name);
        emit.scope.set_current_node_id(&iface_id);
        if let Some(body) = body {
            for i in 0..body.child_count() {
                if let Some(member) = body.child(i) {
                    if member.kind() == "method_declaration" {
                        self.process_method(&member, emit, src, false);
                    }
                }
            }
        }
        emit.scope.pop();
    }

    fn process_enum(&self, node: &TsNode, emit: &mut IrEmitter, src: &str) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text_owned(&name_node, src);
        let fqn = emit.scope.build_fqn(&name);
        let span = node_to_span(node);
        let body = node.child_by_field_name("body");

        let mut enum_node = emit.make_node(NodeKind::Enum, &name, &fqn, span, node_text(node, src));
        enum_node.body_span = body.as_ref().map(node_to_span);
        self.attach_modifiers(node, &mut enum_node, src);

        let enum_id = enum_node.id.clone();
        let parent_id = emit.scope.current_node_id().map(str::to_string);
        emit.push_node(enum_node);
        if let Some(parent) = parent_id {
            emit.add_contains(&parent, &enum_id, span);
        }
        emit.register_symbol(&name, &enum_id);
        emit.resolver.register_local_class(name.clone(), enum_id.clone());

        emit.scope.push(ScopeKind::Class, name);
        emit.scope.set_current_node_id(&enum_id);
        if let Some(body) = body {
            for i in 0..body.child_count() {
                let Some(member) = body.child(i) else { continue };
                match member.kind() {
                    "enum_constant" => {
                        if let Some(const_name) = find_child_by_kind(&member, "identifier") {
                            let cname = node_text_owned(&const_name, src);
                            let cfqn = emit.scope.build_fqn(&cname);
                            let cspan = node_to_span(&member);
                            let mut constant = emit.make_node(
                                NodeKind::Field,
                                &cname,
                                &cfqn,
                                cspan,
                                node_text(&member, src),
                            );
                            constant
                                .attrs
                                .insert("java.is_enum_constant".to_string(), Value::Bool(true));
                            let cid = constant.id.clone();
                            emit.push_node(constant);
                            emit.add_contains(&enum_id, &cid, cspan);
                            emit.register_symbol(&cname, &cid);
                        }
                    }
                    "enum_body_declarations" => {
                        for j in 0..member.child_count() {
                            if let Some(decl) = member.child(j) {
                                match decl.kind() {
                                    "method_declaration" => {
                                        self.process_method(&decl, emit, src, false)
                                    }
                                    "field_declaration" => self.process_field(&decl, emit, src),
                                    _ => {}
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        emit.scope.pop();
    }

    fn process_method(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, is_constructor: bool) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text_owned(&name_node, src);

        let params_node = node.child_by_field_name("parameters");
        let (param_sig, param_types) = params_node
            .as_ref()
            .map(|p| extract_parameter_signature(p, src))
            .unwrap_or_else(|| ("()".to_string(), Vec::new()));

        // Overload FQNs embed the parameter signature
        let scope_segment = format!("{}{}", name, param_sig);
        let fqn = emit.scope.build_fqn(&scope_segment);
        let span = node_to_span(node);
        let body = node.child_by_field_name("body");

        let mut method_node =
            emit.make_node(NodeKind::Method, &name, &fqn, span, node_text(node, src));
        method_node.body_span = body.as_ref().map(node_to_span);
        method_node.control_flow_summary =
            body.as_ref().map(|b| summarize(b, &JAVA_CONTROL_FLOW));
        self.attach_modifiers(node, &mut method_node, src);
        if is_constructor {
            method_node
                .attrs
                .insert("java.is_constructor".to_string(), Value::Bool(true));
        }

        let throws_list = extract_throws_clause(node, src);
        if !throws_list.is_empty() {
            method_node
                .attrs
                .insert("java.throws".to_string(), json!(throws_list));
        }

        let is_static = method_node
            .attrs
            .get("java.is_static")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let method_id = method_node.id.clone();
        let parent_id = emit.scope.current_node_id().map(str::to_string);
        emit.push_node(method_node);
        if let Some(parent) = parent_id {
            emit.add_contains(&parent, &method_id, span);
        }
        emit.register_symbol(&scope_segment, &method_id);

        self.process_type_parameters(node, emit, src, &method_id, &fqn);

        // Declared throws → THROWS edges
        for exception_type in &throws_list {
            let target_fqn = self.type_to_fqn(exception_type, emit);
            let edge = emit
                .edge(EdgeKind::Throws, &method_id, &target_fqn)
                .with_span(span)
                .with_attr("exception_type", Value::String(exception_type.clone()))
                .with_attr("declared", Value::Bool(true))
                .unresolved(&target_fqn);
            emit.push_edge(edge);
        }

        emit.scope.push(ScopeKind::Function, scope_segment);
        emit.scope.set_current_node_id(&method_id);

        // Parameter nodes
        let mut param_type_ids = Vec::new();
        if let Some(ref params) = params_node {
            param_type_ids = self.process_parameters(params, emit, src, &fqn, &method_id);
        }

        if let Some(ref body) = body {
            let exception_flow = analyze_exception_propagation(body, src);
            if !exception_flow.explicit_throws.is_empty() || !exception_flow.caught.is_empty() {
                let mut may_propagate = exception_flow.may_propagate.clone();
                may_propagate.extend(throws_list.iter().cloned());
                may_propagate.dedup();
                emit.set_node_attr(
                    &method_id,
                    "java.exception_flow",
                    json!({
                        "explicit_throws": exception_flow.explicit_throws,
                        "caught": exception_flow.caught,
                        "may_propagate": may_propagate,
                    }),
                );
            }

            self.process_try_catch_blocks(body, emit, src, &method_id);
            self.process_body(body, emit, src, &method_id);
        }

        emit.scope.pop();

        // Signature entity
        let return_raw = if is_constructor {
            None
        } else {
            node.child_by_field_name("type").map(|t| node_text_owned(&t, src))
        };
        let return_type_id = return_raw
            .as_deref()
            .and_then(|raw| emit.resolve_type_entity(raw));
        let throws_type_ids: Vec<String> = throws_list
            .iter()
            .filter_map(|t| emit.resolve_type_entity(t))
            .collect();

        let raw_signature = format!(
            "{}{}",
            param_sig,
            return_raw
                .as_deref()
                .map(|r| format!(" -> {}", r))
                .unwrap_or_default()
        );
        let sig_id = signature_id(&method_id, &name, &param_types, return_raw.as_deref());
        let sig_hash = signature_hash(&name, &param_types, return_raw.as_deref(), false, is_static);
        emit.add_signature(SignatureEntity {
            id: sig_id.clone(),
            owner_node_id: method_id.clone(),
            name,
            raw: raw_signature,
            parameter_type_ids: param_type_ids,
            return_type_id,
            is_async: false,
            is_static,
            visibility: None,
            throws_type_ids,
            signature_hash: Some(sig_hash),
        });
        emit.set_signature_id(&method_id, &sig_id);
    }

    fn process_parameters(
        &self,
        params: &TsNode,
        emit: &mut IrEmitter,
        src: &str,
        method_fqn: &str,
        method_id: &str,
    ) -> Vec<String> {
        let mut type_ids = Vec::new();

        for i in 0..params.child_count() {
            let Some(param) = params.child(i) else { continue };
            if !matches!(param.kind(), "formal_parameter" | "spread_parameter") {
                continue;
            }

            let name = param
                .child_by_field_name("name")
                .or_else(|| find_child_by_kind(&param, "identifier"))
                .map(|n| node_text_owned(&n, src));
            let Some(name) = name else { continue };

            let raw_type = param
                .child_by_field_name("type")
                .map(|t| node_text_owned(&t, src));

            let param_fqn = format!("{}.{}", method_fqn, name);
            let span = node_to_span(&param);
            let mut param_node =
                emit.make_node(NodeKind::Parameter, &name, &param_fqn, span, node_text(&param, src));
            param_node.parent_id = Some(method_id.to_string());

            if let Some(raw) = raw_type {
                if let Some(type_id) = emit.resolve_type_entity(&raw) {
                    param_node.declared_type_id = Some(type_id.clone());
                    type_ids.push(type_id);
                }
            }
            if param.kind() == "spread_parameter" {
                param_node
                    .attrs
                    .insert("java.is_varargs".to_string(), Value::Bool(true));
            }

            let param_id = param_node.id.clone();
            emit.push_node(param_node);
            emit.add_contains(method_id, &param_id, span);
            emit.register_symbol(&name, &param_id);
        }

        type_ids
    }

    fn process_field(&self, node: &TsNode, emit: &mut IrEmitter, src: &str) {
        let raw_type = node
            .child_by_field_name("type")
            .map(|t| node_text_owned(&t, src));

        for declarator in find_children_by_kind(node, "variable_declarator") {
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            let name = node_text_owned(&name_node, src);
            let fqn = emit.scope.build_fqn(&name);
            let span = node_to_span(node);

            let mut field_node =
                emit.make_node(NodeKind::Field, &name, &fqn, span, node_text(node, src));
            self.attach_modifiers(node, &mut field_node, src);
            if let Some(ref raw) = raw_type {
                if let Some(type_id) = emit.resolve_type_entity(raw) {
                    field_node.declared_type_id = Some(type_id);
                }
            }

            let field_id = field_node.id.clone();
            let parent_id = emit.scope.current_node_id().map(str::to_string);
            emit.push_node(field_node);
            if let Some(parent) = parent_id {
                emit.add_contains(&parent, &field_id, span);
            }
            emit.register_symbol(&name, &field_id);
        }
    }

    fn process_type_parameters(
        &self,
        node: &TsNode,
        emit: &mut IrEmitter,
        src: &str,
        owner_id: &str,
        owner_fqn: &str,
    ) {
        let Some(type_params) = find_child_by_kind(node, "type_parameters") else {
            return;
        };

        for tp in find_children_by_kind(&type_params, "type_parameter") {
            let Some(name_node) = find_child_by_kind(&tp, "type_identifier") else {
                continue;
            };
            let name = node_text_owned(&name_node, src);
            let fqn = format!("{}.<{}>", owner_fqn, name);
            let span = node_to_span(&tp);

            let mut tp_node =
                emit.make_node(NodeKind::TypeParameter, &name, &fqn, span, node_text(&tp, src));
            tp_node.parent_id = Some(owner_id.to_string());

            if let Some(bound) = find_child_by_kind(&tp, "type_bound") {
                tp_node.attrs.insert(
                    "java.bounds".to_string(),
                    Value::String(node_text_owned(&bound, src)),
                );
            }

            let tp_id = tp_node.id.clone();
            emit.push_node(tp_node);
            emit.add_contains(owner_id, &tp_id, span);
        }
    }

    /// Walk a method body for calls, local variables, lambdas, anonymous
    /// classes, and method references. Descent stops at nested callable
    /// boundaries (their bodies belong to their own nodes).
    fn process_body(&self, body: &TsNode, emit: &mut IrEmitter, src: &str, owner_id: &str) {
        let mut stack: Vec<TsNode> = Vec::new();
        for i in (0..body.child_count()).rev() {
            if let Some(child) = body.child(i) {
                stack.push(child);
            }
        }

        while let Some(node) = stack.pop() {
            match node.kind() {
                "lambda_expression" => {
                    self.process_lambda(&node, emit, src, owner_id);
                    continue;
                }
                "method_reference" => {
                    self.process_method_reference(&node, emit, src, owner_id);
                    continue;
                }
                "object_creation_expression" => {
                    if find_child_by_kind(&node, "class_body").is_some() {
                        self.process_anonymous_class(&node, emit, src, owner_id);
                        continue;
                    }
                    // Constructor call
                    if let Some(ty) = node.child_by_field_name("type") {
                        let type_name = node_text_owned(&ty, src);
                        emit.add_call(owner_id, &type_name, node_to_span(&node));
                    }
                }
                "method_invocation" => {
                    if let Some(name) = node.child_by_field_name("name") {
                        let callee = match node.child_by_field_name("object") {
                            Some(object) => format!(
                                "{}.{}",
                                node_text(&object, src),
                                node_text(&name, src)
                            ),
                            None => node_text_owned(&name, src),
                        };
                        emit.add_call(owner_id, &callee, node_to_span(&node));
                    }
                }
                "local_variable_declaration" => {
                    self.process_local_variable(&node, emit, src, owner_id);
                }
                "assignment_expression" => {
                    if let Some(left) = node.child_by_field_name("left") {
                        if left.kind() == "identifier" {
                            let name = node_text_owned(&left, src);
                            if let Some(existing) =
                                emit.scope.lookup_symbol(&name).map(str::to_string)
                            {
                                let span = node_to_span(&left);
                                emit.add_reassignment(&existing, span.start_line, span.start_col);
                            }
                        }
                    }
                }
                _ => {}
            }

            for i in (0..node.child_count()).rev() {
                if let Some(child) = node.child(i) {
                    stack.push(child);
                }
            }
        }
    }

    fn process_local_variable(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, owner_id: &str) {
        let raw_type = node
            .child_by_field_name("type")
            .map(|t| node_text_owned(&t, src));

        for declarator in find_children_by_kind(node, "variable_declarator") {
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            let name = node_text_owned(&name_node, src);
            let fqn = emit.scope.build_fqn(&name);
            let span = node_to_span(&declarator);

            let mut var_node =
                emit.make_node(NodeKind::Variable, &name, &fqn, span, node_text(node, src));
            var_node.parent_id = Some(owner_id.to_string());
            if let Some(ref raw) = raw_type {
                if let Some(type_id) = emit.resolve_type_entity(raw) {
                    var_node.declared_type_id = Some(type_id);
                }
            }

            let var_id = var_node.id.clone();
            emit.push_node(var_node);
            emit.add_contains(owner_id, &var_id, span);
            emit.register_symbol(&name, &var_id);
        }
    }

    fn process_lambda(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, parent_id: &str) {
        let span = node_to_span(node);

        let params_node = find_child_by_kind(node, "inferred_parameters")
            .or_else(|| find_child_by_kind(node, "formal_parameters"))
            .or_else(|| find_child_by_kind(node, "identifier"));

        let param_sig = match &params_node {
            Some(p) if p.kind() == "identifier" => format!("({})", node_text(p, src)),
            Some(p) if p.kind() == "formal_parameters" => {
                extract_parameter_signature(p, src).0
            }
            Some(p) => {
                let names: Vec<String> = find_children_by_kind(p, "identifier")
                    .iter()
                    .map(|n| node_text_owned(n, src))
                    .collect();
                format!("({})", names.join(","))
            }
            None => "()".to_string(),
        };

        let lambda_name = format!("lambda${}", span.start_line);
        let lambda_fqn = format!(
            "{}.lambda${}:{}{}",
            emit.scope.current_fqn(),
            span.start_line,
            span.start_col,
            param_sig
        );

        let body = node.child_by_field_name("body");
        let mut lambda_node =
            emit.make_node(NodeKind::Lambda, &lambda_name, &lambda_fqn, span, node_text(node, src));
        lambda_node.parent_id = Some(parent_id.to_string());
        lambda_node.body_span = body.as_ref().map(node_to_span);
        lambda_node
            .attrs
            .insert("java.is_lambda".to_string(), Value::Bool(true));
        lambda_node.attrs.insert(
            "java.param_signature".to_string(),
            Value::String(param_sig.clone()),
        );
        if let Some(ref b) = body {
            if b.kind() == "block" {
                lambda_node.control_flow_summary = Some(summarize(b, &JAVA_CONTROL_FLOW));
            }
        }

        let lambda_id = lambda_node.id.clone();

        // Capture analysis over the body
        let mut captures: Vec<String> = Vec::new();
        if let Some(ref b) = body {
            let own_params: Vec<String> = params_node
                .as_ref()
                .map(|p| {
                    crate::shared::ts::find_descendants_by_kind(p, "identifier")
                        .iter()
                        .map(|n| node_text_owned(n, src))
                        .collect()
                })
                .unwrap_or_default();

            for name in collect_capture_candidates(b, src) {
                if own_params.contains(&name) || captures.contains(&name) {
                    continue;
                }
                let edge = match emit.scope.lookup_symbol(&name).map(str::to_string) {
                    Some(target_id) => emit
                        .edge(EdgeKind::Captures, &lambda_id, &target_id)
                        .with_attr("variable_name", Value::String(name.clone())),
                    None => continue,
                };
                emit.push_edge(edge);
                captures.push(name);
            }
        }
        if !captures.is_empty() {
            lambda_node
                .attrs
                .insert("java.captures".to_string(), json!(captures.clone()));
            lambda_node
                .attrs
                .insert("java.capture_count".to_string(), json!(captures.len()));
        }

        emit.push_node(lambda_node);
        emit.add_contains(parent_id, &lambda_id, span);

        // Calls inside the lambda body belong to the lambda
        if let Some(b) = body {
            if b.kind() == "block" {
                self.process_body(&b, emit, src, &lambda_id);
            }
        }
    }

    fn process_anonymous_class(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, parent_id: &str) {
        let Some(type_node) = node
            .child_by_field_name("type")
            .or_else(|| find_child_by_kind(node, "type_identifier"))
        else {
            return;
        };
        let type_name = node_text_owned(&type_node, src);
        let Some(class_body) = find_child_by_kind(node, "class_body") else {
            return;
        };

        let span = node_to_span(node);
        let anon_name = format!("anon${}${}", type_name, span.start_line);
        let anon_fqn = format!(
            "{}.anon${}${}:{}",
            emit.scope.current_fqn(),
            type_name,
            span.start_line,
            span.start_col
        );

        let mut anon_node =
            emit.make_node(NodeKind::Lambda, &anon_name, &anon_fqn, span, node_text(node, src));
        anon_node.parent_id = Some(parent_id.to_string());
        anon_node.body_span = Some(node_to_span(&class_body));
        anon_node.control_flow_summary = Some(summarize(&class_body, &JAVA_CONTROL_FLOW));
        anon_node
            .attrs
            .insert("java.is_anonymous_class".to_string(), Value::Bool(true));
        anon_node
            .attrs
            .insert("java.type_name".to_string(), Value::String(type_name.clone()));

        // Outer reads from the anonymous body
        let accesses: Vec<String> = collect_capture_candidates(&class_body, src)
            .into_iter()
            .filter(|name| emit.scope.lookup_symbol(name).is_some())
            .collect();
        if !accesses.is_empty() {
            for name in &accesses {
                if let Some(target_id) = emit.scope.lookup_symbol(name).map(str::to_string) {
                    let edge = emit
                        .edge(EdgeKind::Accesses, &anon_node.id, &target_id)
                        .with_attr("variable_name", Value::String(name.clone()));
                    emit.push_edge(edge);
                }
            }
            anon_node
                .attrs
                .insert("java.accesses".to_string(), json!(accesses));
        }

        let anon_id = anon_node.id.clone();
        emit.push_node(anon_node);
        emit.add_contains(parent_id, &anon_id, span);

        emit.scope.push(ScopeKind::Class, anon_name);
        emit.scope.set_current_node_id(&anon_id);
        for i in 0..class_body.child_count() {
            if let Some(member) = class_body.child(i) {
                match member.kind() {
                    "method_declaration" => self.process_method(&member, emit, src, false),
                    "field_declaration" => self.process_field(&member, emit, src),
                    _ => {}
                }
            }
        }
        emit.scope.pop();
    }

    /// `Qualifier::member` — classify and emit a MethodReference node plus a
    /// REFERENCES edge toward the named member.
    fn process_method_reference(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, parent_id: &str) {
        if node.child_count() < 3 {
            return;
        }
        let Some(qualifier_node) = node.child(0) else { return };
        let Some(member_node) = node.child(node.child_count() - 1) else {
            return;
        };

        let qualifier = node_text_owned(&qualifier_node, src);
        let member = node_text_owned(&member_node, src);
        let ref_type = classify_method_ref(&qualifier, &member);

        let span = node_to_span(node);
        let ref_fqn = format!(
            "{}.ref${}:{}#{}::{}",
            emit.scope.current_fqn(),
            span.start_line,
            span.start_col,
            qualifier,
            member
        );
        let target_name = if member == "new" {
            format!("{}.<init>", qualifier)
        } else {
            format!("{}.{}", qualifier, member)
        };

        let ref_name = format!("ref${}", span.start_line);
        let mut ref_node = emit.make_node(
            NodeKind::MethodReference,
            &ref_name,
            &ref_fqn,
            span,
            node_text(node, src),
        );
        ref_node.parent_id = Some(parent_id.to_string());
        ref_node
            .attrs
            .insert("java.ref_type".to_string(), Value::String(ref_type.as_str().to_string()));
        ref_node
            .attrs
            .insert("java.qualifier".to_string(), Value::String(qualifier));
        ref_node
            .attrs
            .insert("java.method_name".to_string(), Value::String(member));

        let ref_id = ref_node.id.clone();
        emit.push_node(ref_node);
        emit.add_contains(parent_id, &ref_id, span);

        let edge = emit
            .edge(EdgeKind::References, &ref_id, &target_name)
            .with_span(span)
            .with_attr("ref_type", Value::String(ref_type.as_str().to_string()))
            .unresolved(&target_name);
        emit.push_edge(edge);
    }

    /// try/catch/finally blocks become TryCatch nodes; nested statements are
    /// traversed with the try node as parent.
    fn process_try_catch_blocks(&self, body: &TsNode, emit: &mut IrEmitter, src: &str, parent_id: &str) {
        let mut stack: Vec<TsNode> = Vec::new();
        for i in (0..body.child_count()).rev() {
            if let Some(child) = body.child(i) {
                stack.push(child);
            }
        }

        while let Some(node) = stack.pop() {
            if matches!(node.kind(), "try_statement" | "try_with_resources_statement") {
                self.process_try_statement(&node, emit, src, parent_id);
                continue;
            }
            // Nested callables own their try blocks
            if matches!(node.kind(), "lambda_expression" | "class_body") {
                continue;
            }
            for i in (0..node.child_count()).rev() {
                if let Some(child) = node.child(i) {
                    stack.push(child);
                }
            }
        }
    }

    fn process_try_statement(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, parent_id: &str) {
        let span = node_to_span(node);
        let try_fqn = format!("{}.try${}", emit.scope.current_fqn(), span.start_line);
        let try_name = format!("try${}", span.start_line);

        let catch_clauses = find_children_by_kind(node, "catch_clause");
        let caught_exceptions: Vec<String> = catch_clauses
            .iter()
            .flat_map(|clause| extract_catch_types(clause, src))
            .collect();
        let has_finally = find_child_by_kind(node, "finally_clause").is_some();

        let mut try_node =
            emit.make_node(NodeKind::TryCatch, &try_name, &try_fqn, span, node_text(node, src));
        try_node.parent_id = Some(parent_id.to_string());
        try_node
            .attrs
            .insert("java.caught_exceptions".to_string(), json!(caught_exceptions));
        try_node
            .attrs
            .insert("java.has_finally".to_string(), Value::Bool(has_finally));
        try_node
            .attrs
            .insert("java.catch_count".to_string(), json!(catch_clauses.len()));

        let try_id = try_node.id.clone();
        emit.push_node(try_node);
        emit.add_contains(parent_id, &try_id, span);

        // Nested try statements under this one
        if let Some(try_block) = node.child_by_field_name("body") {
            self.process_try_catch_blocks(&try_block, emit, src, &try_id);
        }
        for clause in &catch_clauses {
            if let Some(block) = find_child_by_kind(clause, "block") {
                self.process_try_catch_blocks(&block, emit, src, &try_id);
            }
        }
        if let Some(finally_clause) = find_child_by_kind(node, "finally_clause") {
            if let Some(block) = find_child_by_kind(&finally_clause, "block") {
                self.process_try_catch_blocks(&block, emit, src, &try_id);
            }
        }
    }

    /// Modifiers and annotations into the node's attrs.
    fn attach_modifiers(&self, node: &TsNode, target: &mut crate::shared::models::Node, src: &str) {
        let Some(modifiers) = find_child_by_kind(node, "modifiers") else {
            return;
        };

        let mut annotations = Vec::new();
        for i in 0..modifiers.child_count() {
            let Some(m) = modifiers.child(i) else { continue };
            match m.kind() {
                "marker_annotation" | "annotation" => {
                    annotations.push(node_text(&m, src).trim_start_matches('@').to_string());
                }
                "public" => {
                    target
                        .attrs
                        .insert("java.visibility".to_string(), Value::String("public".into()));
                }
                "private" => {
                    target
                        .attrs
                        .insert("java.visibility".to_string(), Value::String("private".into()));
                }
                "protected" => {
                    target
                        .attrs
                        .insert("java.visibility".to_string(), Value::String("protected".into()));
                }
                "static" => {
                    target
                        .attrs
                        .insert("java.is_static".to_string(), Value::Bool(true));
                }
                "final" => {
                    target
                        .attrs
                        .insert("java.is_final".to_string(), Value::Bool(true));
                }
                "abstract" => {
                    target
                        .attrs
                        .insert("java.is_abstract".to_string(), Value::Bool(true));
                }
                _ => {}
            }
        }
        if !annotations.is_empty() {
            target
                .attrs
                .insert("java.annotations".to_string(), json!(annotations));
        }
    }

    /// Resolve a type name to an FQN through imports, else same package.
    fn type_to_fqn(&self, type_name: &str, emit: &IrEmitter) -> String {
        let base = type_name.split('<').next().unwrap_or(type_name).trim();
        if base.contains('.') {
            return base.to_string();
        }
        match emit.scope.resolve_import(base) {
            Some(full) => full.to_string(),
            None => format!("{}.{}", emit.module_fqn(), base),
        }
    }
}

/// `(int,String)` or `(String…)` for varargs; generic arguments keep their
/// source form. Returns the signature and the raw type list.
fn extract_parameter_signature(params: &TsNode, src: &str) -> (String, Vec<String>) {
    let mut types = Vec::new();

    for i in 0..params.child_count() {
        let Some(param) = params.child(i) else { continue };
        match param.kind() {
            "formal_parameter" => {
                if let Some(ty) = param.child_by_field_name("type") {
                    types.push(node_text_owned(&ty, src));
                }
            }
            "spread_parameter" => {
                // Varargs: first type child + ellipsis marker
                let ty = (0..param.child_count())
                    .filter_map(|j| param.child(j))
                    .find(|c| c.kind().ends_with("type") || c.kind() == "type_identifier");
                if let Some(ty) = ty {
                    types.push(format!("{}…", node_text(&ty, src)));
                }
            }
            _ => {}
        }
    }

    (format!("({})", types.join(",")), types)
}

/// Exception types from a throws clause.
fn extract_throws_clause(method_node: &TsNode, src: &str) -> Vec<String> {
    let mut throws_list = Vec::new();
    for i in 0..method_node.child_count() {
        let Some(child) = method_node.child(i) else { continue };
        if child.kind() != "throws" {
            continue;
        }
        for j in 0..child.child_count() {
            if let Some(ty) = child.child(j) {
                if matches!(ty.kind(), "type_identifier" | "scoped_type_identifier") {
                    throws_list.push(node_text_owned(&ty, src));
                }
            }
        }
    }
    throws_list
}

/// Exception types from a catch clause (`catch (A | B e)` lists both).
fn extract_catch_types(clause: &TsNode, src: &str) -> Vec<String> {
    let mut types = Vec::new();
    if let Some(param) = find_child_by_kind(clause, "catch_formal_parameter") {
        if let Some(catch_type) = find_child_by_kind(&param, "catch_type") {
            for ty in crate::shared::ts::find_descendants_by_kind(&catch_type, "type_identifier") {
                types.push(node_text_owned(&ty, src));
            }
        }
    }
    types
}

#[derive(Debug, Default)]
struct ExceptionFlow {
    explicit_throws: Vec<String>,
    caught: Vec<String>,
    may_propagate: Vec<String>,
}

/// Collect throw expressions and caught exception types.
///
/// Each traversal entry carries the catch types of the trys enclosing it,
/// so a throw may propagate unless one of its own enclosing trys catches
/// the thrown type (or a supertype); catches in sibling trys never
/// suppress it.
fn analyze_exception_propagation(body: &TsNode, src: &str) -> ExceptionFlow {
    let mut flow = ExceptionFlow::default();

    let mut stack: Vec<(TsNode, Vec<String>)> = vec![(*body, Vec::new())];
    while let Some((node, enclosing_catches)) = stack.pop() {
        match node.kind() {
            "throw_statement" => {
                if let Some(creation) =
                    crate::shared::ts::find_descendant_by_kind(&node, "object_creation_expression")
                {
                    if let Some(ty) = creation.child_by_field_name("type") {
                        let exception_type = node_text_owned(&ty, src);
                        flow.explicit_throws.push(exception_type.clone());

                        let suppressed = enclosing_catches
                            .iter()
                            .any(|caught| catch_covers(caught, &exception_type));
                        if !suppressed && !flow.may_propagate.contains(&exception_type) {
                            flow.may_propagate.push(exception_type);
                        }
                    }
                }
            }
            "try_statement" | "try_with_resources_statement" => {
                let mut caught_here = Vec::new();
                for clause in find_children_by_kind(&node, "catch_clause") {
                    caught_here.extend(extract_catch_types(&clause, src));
                }
                flow.caught.extend(caught_here.iter().cloned());

                // The try block is guarded by its own catches plus the
                // outer ones
                if let Some(try_block) = node.child_by_field_name("body") {
                    let mut guarded = enclosing_catches.clone();
                    guarded.extend(caught_here);
                    stack.push((try_block, guarded));
                }
                // Catch and finally bodies are guarded only by outer trys
                for clause in find_children_by_kind(&node, "catch_clause") {
                    if let Some(block) = find_child_by_kind(&clause, "block") {
                        stack.push((block, enclosing_catches.clone()));
                    }
                }
                if let Some(finally_clause) = find_child_by_kind(&node, "finally_clause") {
                    if let Some(block) = find_child_by_kind(&finally_clause, "block") {
                        stack.push((block, enclosing_catches.clone()));
                    }
                }
                continue;
            }
            _ => {}
        }

        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push((child, enclosing_catches.clone()));
            }
        }
    }

    flow
}

/// Name-level supertype check: a catch clause covers a thrown type when the
/// names match or the caught type is a universal root of the hierarchy.
/// Qualified names compare by simple name.
fn catch_covers(caught: &str, thrown: &str) -> bool {
    let caught_simple = caught.rsplit('.').next().unwrap_or(caught);
    let thrown_simple = thrown.rsplit('.').next().unwrap_or(thrown);

    caught_simple == thrown_simple
        || caught_simple == "Exception"
        || caught_simple == "Throwable"
}

/// Identifier candidates for capture analysis: lowercase-first names that
/// are not keywords, method invocation names, or field-access members.
fn collect_capture_candidates(body: &TsNode, src: &str) -> Vec<String> {
    let mut names = Vec::new();

    let mut stack: Vec<(TsNode, &'static str)> = vec![(*body, "")];
    while let Some((node, parent_kind)) = stack.pop() {
        if node.kind() == "identifier" {
            let skip = match parent_kind {
                "method_invocation" | "field_access" => true,
                _ => false,
            };
            if !skip {
                let name = node_text_owned(&node, src);
                let first = name.chars().next().unwrap_or('_');
                if first.is_lowercase()
                    && !CAPTURE_KEYWORDS.contains(&name.as_str())
                    && !names.contains(&name)
                {
                    names.push(name);
                }
            }
        }

        let kind: &'static str = match node.kind() {
            "method_invocation" => "method_invocation",
            "field_access" => "field_access",
            _ => "",
        };
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push((child, kind));
            }
        }
    }

    names
}

/// Heuristic classification of `Qualifier::member`:
/// `new` → constructor; lowercase or this/super qualifier → bound instance;
/// uppercase qualifier → static (an LSP oracle may later upgrade this to
/// INSTANCE_UNBOUND when the member turns out to be non-static).
fn classify_method_ref(qualifier: &str, member: &str) -> MethodRefType {
    if member == "new" {
        return MethodRefType::Constructor;
    }
    if qualifier == "this" || qualifier == "super" {
        return MethodRefType::InstanceBound;
    }
    let first = qualifier.chars().next().unwrap_or('_');
    if first.is_lowercase() {
        return MethodRefType::InstanceBound;
    }
    if first.is_uppercase() {
        return MethodRefType::Static;
    }
    MethodRefType::Static
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::parsing::Language;

    fn walk(code: &str) -> IRDocument {
        let source = SourceFile::new("src/Main.java", code, "Main", Language::Java);
        JavaWalker::new("repo").generate(&source, "snap").unwrap()
    }

    #[test]
    fn test_overloaded_methods_distinct_fqns() {
        let code = "class C { void f(int x){} void f(String s){} }";
        let doc = walk(code);

        let methods: Vec<_> = doc
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Method)
            .collect();
        assert_eq!(methods.len(), 2);
        assert!(doc.node_by_fqn("Main.C.f(int)").is_some());
        assert!(doc.node_by_fqn("Main.C.f(String)").is_some());
        assert!(!doc.meta.contains_key("fqn_collisions"));
    }

    #[test]
    fn test_varargs_signature() {
        let code = "class C { void log(String... parts){} }";
        let doc = walk(code);
        assert!(doc.node_by_fqn("Main.C.log(String…)").is_some());
    }

    #[test]
    fn test_constructor_named_after_class() {
        let code = "class C { C(int x){} }";
        let doc = walk(code);
        let ctor = doc.node_by_fqn("Main.C.C(int)").expect("constructor node");
        assert_eq!(ctor.kind, NodeKind::Method);
        assert_eq!(
            ctor.attrs.get("java.is_constructor"),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn test_inherits_and_implements() {
        let code = "class C extends Base implements Runnable, Closeable { }";
        let doc = walk(code);

        let inherits: Vec<_> = doc.edges_of_kind(EdgeKind::Inherits).collect();
        assert_eq!(inherits.len(), 1);
        assert_eq!(inherits[0].target_name(), Some("Main.Base"));

        let implements: Vec<_> = doc.edges_of_kind(EdgeKind::Implements).collect();
        assert_eq!(implements.len(), 2);
    }

    #[test]
    fn test_throws_clause_edges_and_attrs() {
        let code = "class C { void f() throws java.io.IOException { } }";
        let doc = walk(code);

        let throws: Vec<_> = doc.edges_of_kind(EdgeKind::Throws).collect();
        assert_eq!(throws.len(), 1);
        assert_eq!(
            throws[0].attrs.get("declared"),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn test_uncaught_throw_may_propagate() {
        let code = r#"
class C {
    void f() {
        if (true) {
            throw new IllegalStateException("bad");
        }
    }
    void g() {
        try {
            throw new IllegalStateException("caught");
        } catch (IllegalStateException e) {
        }
    }
}
"#;
        let doc = walk(code);

        let f = doc.node_by_fqn("Main.C.f()").unwrap();
        let flow = f.attrs.get("java.exception_flow").expect("exception flow");
        let may = flow["may_propagate"].as_array().unwrap();
        assert_eq!(may.len(), 1);
        assert_eq!(may[0], "IllegalStateException");

        let g = doc.node_by_fqn("Main.C.g()").unwrap();
        let flow = g.attrs.get("java.exception_flow").expect("exception flow");
        assert!(flow["may_propagate"].as_array().unwrap().is_empty());
        assert_eq!(flow["caught"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_sibling_catch_does_not_suppress_throw() {
        let code = r#"
class C {
    void f() {
        try {
        } catch (IOException e) {
        }
        throw new IOException("late");
    }
}
"#;
        let doc = walk(code);
        let f = doc.node_by_fqn("Main.C.f()").unwrap();
        let flow = f.attrs.get("java.exception_flow").expect("exception flow");

        // The throw sits outside the try; the sibling catch is irrelevant
        let may = flow["may_propagate"].as_array().unwrap();
        assert_eq!(may.len(), 1);
        assert_eq!(may[0], "IOException");
        assert_eq!(flow["caught"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_enclosing_catch_of_supertype_suppresses_throw() {
        let code = r#"
class C {
    void f() {
        try {
            throw new IOException("io");
        } catch (Exception e) {
        }
    }
    void g() {
        try {
            try {
                throw new IllegalStateException("deep");
            } finally {
            }
        } catch (IllegalStateException e) {
        }
    }
}
"#;
        let doc = walk(code);

        // Exception is a supertype of the thrown IOException
        let f = doc.node_by_fqn("Main.C.f()").unwrap();
        let flow = f.attrs.get("java.exception_flow").expect("exception flow");
        assert!(flow["may_propagate"].as_array().unwrap().is_empty());
        assert_eq!(flow["explicit_throws"].as_array().unwrap().len(), 1);

        // A catch on an outer enclosing try still covers a nested throw
        let g = doc.node_by_fqn("Main.C.g()").unwrap();
        let flow = g.attrs.get("java.exception_flow").expect("exception flow");
        assert!(flow["may_propagate"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_try_catch_node() {
        let code = r#"
class C {
    void f() {
        try {
            g();
        } catch (RuntimeException e) {
        } finally {
        }
    }
    void g() {}
}
"#;
        let doc = walk(code);
        let try_node = doc
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::TryCatch)
            .expect("try node");
        assert_eq!(
            try_node.attrs.get("java.has_finally"),
            Some(&Value::Bool(true))
        );
        let caught = try_node.attrs.get("java.caught_exceptions").unwrap();
        assert_eq!(caught.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_lambda_with_captures() {
        let code = r#"
class C {
    void f() {
        int factor = 2;
        java.util.function.Function<Integer, Integer> g = v -> v * factor;
    }
}
"#;
        let doc = walk(code);

        let lambda = doc
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Lambda)
            .expect("lambda node");
        assert!(lambda.fqn.contains("lambda$"));

        let captures: Vec<_> = doc.edges_of_kind(EdgeKind::Captures).collect();
        let factor = doc
            .nodes
            .iter()
            .find(|n| n.name.as_deref() == Some("factor") && n.kind == NodeKind::Variable)
            .unwrap();
        assert!(captures.iter().any(|e| e.target_id == factor.id));
    }

    #[test]
    fn test_method_reference_classification() {
        assert_eq!(classify_method_ref("ArrayList", "new"), MethodRefType::Constructor);
        assert_eq!(classify_method_ref("Integer", "parseInt"), MethodRefType::Static);
        assert_eq!(classify_method_ref("str", "toUpperCase"), MethodRefType::InstanceBound);
        assert_eq!(classify_method_ref("this", "handle"), MethodRefType::InstanceBound);
    }

    #[test]
    fn test_method_reference_node_and_edge() {
        let code = r#"
class C {
    void f() {
        java.util.function.Function<String, Integer> p = Integer::parseInt;
    }
}
"#;
        let doc = walk(code);
        let ref_node = doc
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::MethodReference)
            .expect("method reference node");
        assert_eq!(
            ref_node.attrs.get("java.ref_type"),
            Some(&Value::String("STATIC".to_string()))
        );

        let references: Vec<_> = doc.edges_of_kind(EdgeKind::References).collect();
        assert_eq!(references.len(), 1);
        assert!(references[0].is_unresolved());
        assert_eq!(references[0].target_name(), Some("Integer.parseInt"));
    }

    #[test]
    fn test_package_prefixes_fqn() {
        let code = "package com.acme.app;\n\nclass Service { void run() {} }\n";
        let doc = walk(code);
        assert!(doc.node_by_fqn("com.acme.app.Service").is_some());
        assert!(doc.node_by_fqn("com.acme.app.Service.run()").is_some());
    }

    #[test]
    fn test_interface_and_enum_nodes() {
        let code = r#"
interface Shape { double area(); }
enum Color { RED, GREEN }
"#;
        let doc = walk(code);
        assert!(doc
            .nodes
            .iter()
            .any(|n| n.kind == NodeKind::Interface && n.name.as_deref() == Some("Shape")));
        assert!(doc
            .nodes
            .iter()
            .any(|n| n.kind == NodeKind::Enum && n.name.as_deref() == Some("Color")));
        // Enum constants become fields
        let constants: Vec<_> = doc
            .nodes
            .iter()
            .filter(|n| n.attrs.get("java.is_enum_constant") == Some(&Value::Bool(true)))
            .collect();
        assert_eq!(constants.len(), 2);
    }

    #[test]
    fn test_import_collision_detected() {
        let code = "import java.util.List;\nimport java.awt.List;\nclass C {}\n";
        let doc = walk(code);
        assert!(doc.meta.contains_key("import_collisions"));
    }

    #[test]
    fn test_generic_type_parameters() {
        let code = "class Box<T extends Comparable<T>> { T value; }";
        let doc = walk(code);
        let tp = doc
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::TypeParameter)
            .expect("type parameter node");
        assert_eq!(tp.name.as_deref(), Some("T"));
        assert!(tp.attrs.contains_key("java.bounds"));
    }
}
