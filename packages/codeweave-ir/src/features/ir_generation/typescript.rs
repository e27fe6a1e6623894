//! TypeScript walker: tree-sitter-typescript AST → IRDocument.
//!
//! Produces Class/Interface/Enum/Function/Method/Field/Variable/Import
//! nodes; arrow functions become Lambda nodes. Method FQNs carry parameter
//! type signatures so overload declarations stay distinct.

use serde_json::{json, Value};
use tree_sitter::Node as TsNode;

use crate::features::parsing::{self, SourceFile};
use crate::shared::id_strategy::{signature_hash, signature_id};
use crate::shared::models::{EdgeKind, IRDocument, NodeKind, Result, SignatureEntity, Span};
use crate::shared::scope_stack::ScopeKind;
use crate::shared::ts::{
    find_child_by_kind, find_children_by_kind, node_text, node_text_owned, node_to_span,
};

use super::builder::IrEmitter;
use super::control_flow::{summarize, TYPESCRIPT_CONTROL_FLOW};

pub struct TypeScriptWalker {
    repo_id: String,
}

impl TypeScriptWalker {
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
        }
    }

    pub fn generate(&self, source: &SourceFile, snapshot_id: &str) -> Result<IRDocument> {
        let tree = parsing::parse(source)?;
        let root = tree.root_node();
        let src = source.content.as_str();

        let mut emit = IrEmitter::new(
            &self.repo_id,
            &source.path,
            "typescript",
            &source.module_path,
        );

        let module_name = source
            .module_path
            .rsplit('.')
            .next()
            .unwrap_or(&source.module_path)
            .to_string();
        let mut file_node = emit.make_node(
            NodeKind::File,
            &module_name,
            &source.module_path,
            node_to_span(&root),
            src,
        );
        file_node.parent_id = None;
        let file_id = file_node.id.clone();
        emit.push_node(file_node);
        emit.scope.set_current_node_id(&file_id);

        self.walk_container(&root, &mut emit, src);

        Ok(emit.finish(snapshot_id, src))
    }

    fn walk_container(&self, container: &TsNode, emit: &mut IrEmitter, src: &str) {
        for i in 0..container.child_count() {
            let Some(child) = container.child(i) else { continue };
            self.process_statement(&child, emit, src);
        }
    }

    fn process_statement(&self, node: &TsNode, emit: &mut IrEmitter, src: &str) {
        match node.kind() {
            "import_statement" => self.process_import(node, emit, src),
            "export_statement" => {
                // Unwrap the exported declaration
                for i in 0..node.child_count() {
                    if let Some(inner) = node.child(i) {
                        if inner.kind() != "export" {
                            self.process_statement(&inner, emit, src);
                        }
                    }
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                self.process_class(node, emit, src)
            }
            "interface_declaration" => self.process_interface(node, emit, src),
            "enum_declaration" => self.process_enum(node, emit, src),
            "function_declaration" => self.process_function(node, emit, src, false),
            "lexical_declaration" | "variable_declaration" => {
                self.process_variable_declaration(node, emit, src)
            }
            _ => {}
        }
    }

    fn process_import(&self, node: &TsNode, emit: &mut IrEmitter, src: &str) {
        let Some(source_node) = node.child_by_field_name("source") else {
            return;
        };
        let module = node_text(&source_node, src)
            .trim_matches(['"', '\''])
            .to_string();
        let span = node_to_span(node);

        let Some(clause) = find_child_by_kind(node, "import_clause") else {
            // Side-effect import: `import "./polyfill"`
            self.create_import(emit, &module, &module, None, span);
            return;
        };

        for i in 0..clause.child_count() {
            let Some(part) = clause.child(i) else { continue };
            match part.kind() {
                // Default import: `import foo from "./m"`
                "identifier" => {
                    let name = node_text_owned(&part, src);
                    let full = format!("{}.default", module);
                    self.create_import(emit, &full, &name, Some(&name), span);
                }
                // Namespace import: `import * as ns from "./m"`
                "namespace_import" => {
                    if let Some(alias_node) = find_child_by_kind(&part, "identifier") {
                        let alias = node_text_owned(&alias_node, src);
                        self.create_import(emit, &module, &alias, Some(&alias), span);
                    }
                }
                // Named imports: `import { a, b as c } from "./m"`
                "named_imports" => {
                    for spec in find_children_by_kind(&part, "import_specifier") {
                        let name = spec
                            .child_by_field_name("name")
                            .map(|n| node_text_owned(&n, src))
                            .unwrap_or_default();
                        if name.is_empty() {
                            continue;
                        }
                        let alias = spec
                            .child_by_field_name("alias")
                            .map(|n| node_text_owned(&n, src));
                        let full = format!("{}.{}", module, name);
                        let visible = alias.clone().unwrap_or_else(|| name.clone());
                        self.create_import(emit, &full, &visible, alias.as_deref(), span);
                    }
                }
                _ => {}
            }
        }
    }

    fn create_import(
        &self,
        emit: &mut IrEmitter,
        full_path: &str,
        visible_name: &str,
        alias: Option<&str>,
        span: Span,
    ) {
        let mut import_node =
            emit.make_node(NodeKind::Import, visible_name, full_path, span, full_path);
        if let Some(alias) = alias {
            import_node
                .attrs
                .insert("alias".to_string(), Value::String(alias.to_string()));
        }

        let import_id = import_node.id.clone();
        let parent_id = emit.scope.current_node_id().map(str::to_string);
        emit.push_node(import_node);
        if let Some(parent) = parent_id {
            emit.add_imports(&parent, &import_id, span, alias);
        }

        emit.scope.register_import(visible_name, full_path);
        emit.resolver
            .register_import_alias(visible_name.to_string(), full_path.to_string());
        emit.record_import(visible_name, full_path);
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
        if node.kind() == "abstract_class_declaration" {
            class_node
                .attrs
                .insert("typescript.is_abstract".to_string(), Value::Bool(true));
        }

        let class_id = class_node.id.clone();
        let parent_id = emit.scope.current_node_id().map(str::to_string);
        emit.push_node(class_node);
        if let Some(parent) = parent_id {
            emit.add_contains(&parent, &class_id, span);
        }
        emit.register_symbol(&name, &class_id);
        emit.resolver.register_local_class(name.clone(), class_id.clone());

        // extends / implements from the heritage clause
        if let Some(heritage) = find_child_by_kind(node, "class_heritage") {
            if let Some(extends) = find_child_by_kind(&heritage, "extends_clause") {
                for i in 0..extends.child_count() {
                    if let Some(base) = extends.child(i) {
                        if matches!(base.kind(), "identifier" | "member_expression" | "generic_type") {
                            let base_name = node_text_owned(&base, src);
                            let base_fqn = self.type_to_fqn(&base_name, emit);
                            emit.add_inherits(&class_id, &base_fqn, span);
                        }
                    }
                }
            }
            if let Some(implements) = find_child_by_kind(&heritage, "implements_clause") {
                for i in 0..implements.child_count() {
                    if let Some(iface) = implements.child(i) {
                        if matches!(iface.kind(), "type_identifier" | "generic_type") {
                            let iface_name = node_text_owned(&iface, src);
                            let iface_fqn = self.type_to_fqn(&iface_name, emit);
                            emit.add_implements(&class_id, &iface_fqn, span);
                        }
                    }
                }
            }
        }

        emit.scope.push(ScopeKind::Class, name);
        emit.scope.set_current_node_id(&class_id);
        if let Some(body) = body {
            for i in 0..body.child_count() {
                let Some(member) = body.child(i) else { continue };
                match member.kind() {
                    "method_definition" => self.process_method(&member, emit, src),
                    "public_field_definition" | "field_definition" => {
                        self.process_field(&member, emit, src)
                    }
                    _ => {}
                }
            }
        }
        emit.scope.pop();
    }

    fn process_interface(&self, node: &TsNode, emit: &mut IrEmitter, src: &str) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text_owned(&name_node, src);
        let fqn = emit.scope.build_fqn(&name);
        let span = node_to_span(node);

        let body = node
            .child_by_field_name("body")
            .or_else(|| find_child_by_kind(node, "interface_body"))
            .or_else(|| find_child_by_kind(node, "object_type"));

        let mut iface_node =
            emit.make_node(NodeKind::Interface, &name, &fqn, span, node_text(node, src));
        iface_node.body_span = body.as_ref().map(node_to_span);

        let iface_id = iface_node.id.clone();
        let parent_id = emit.scope.current_node_id().map(str::to_string);
        emit.push_node(iface_node);
        if let Some(parent) = parent_id {
            emit.add_contains(&parent, &iface_id, span);
        }
        emit.register_symbol(&name, &iface_id);
        emit.resolver.register_local_class(name.clone(), iface_id.clone());

        // interface extends → INHERITS
        for clause_kind in ["extends_clause", "extends_type_clause"] {
            if let Some(extends) = find_child_by_kind(node, clause_kind) {
                for i in 0..extends.child_count() {
                    if let Some(base) = extends.child(i) {
                        if matches!(base.kind(), "type_identifier" | "identifier" | "generic_type") {
                            let base_name = node_text_owned(&base, src);
                            let base_fqn = self.type_to_fqn(&base_name, emit);
                            emit.add_inherits(&iface_id, &base_fqn, span);
                        }
                    }
                }
            }
        }

        // Method signatures become Method nodes without bodies
        emit.scope.push(ScopeKind::Class, name);
        emit.scope.set_current_node_id(&iface_id);
        if let Some(body) = body {
            for sig in find_children_by_kind(&body, "method_signature") {
                self.process_callable(&sig, emit, src, NodeKind::Method);
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

        let enum_node = emit.make_node(NodeKind::Enum, &name, &fqn, span, node_text(node, src));
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
                let member_name = match member.kind() {
                    "enum_assignment" => member
                        .child_by_field_name("name")
                        .map(|n| node_text_owned(&n, src)),
                    "property_identifier" => Some(node_text_owned(&member, src)),
                    _ => None,
                };
                if let Some(member_name) = member_name {
                    let member_fqn = emit.scope.build_fqn(&member_name);
                    let member_span = node_to_span(&member);
                    let mut constant = emit.make_node(
                        NodeKind::Field,
                        &member_name,
                        &member_fqn,
                        member_span,
                        node_text(&member, src),
                    );
                    constant
                        .attrs
                        .insert("typescript.is_enum_member".to_string(), Value::Bool(true));
                    let cid = constant.id.clone();
                    emit.push_node(constant);
                    emit.add_contains(&enum_id, &cid, member_span);
                    emit.register_symbol(&member_name, &cid);
                }
            }
        }
        emit.scope.pop();
    }

    fn process_function(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, _nested: bool) {
        self.process_callable(node, emit, src, NodeKind::Function);
    }

    fn process_method(&self, node: &TsNode, emit: &mut IrEmitter, src: &str) {
        self.process_callable(node, emit, src, NodeKind::Method);
    }

    /// Shared path for functions, methods, and interface method signatures.
    fn process_callable(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, kind: NodeKind) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text_owned(&name_node, src);

        let params_node = node.child_by_field_name("parameters");
        let (param_sig, param_raw_types) = params_node
            .as_ref()
            .map(|p| extract_parameter_signature(p, src))
            .unwrap_or_else(|| ("()".to_string(), Vec::new()));

        let scope_segment = format!("{}{}", name, param_sig);
        let fqn = emit.scope.build_fqn(&scope_segment);
        let span = node_to_span(node);
        let body = node.child_by_field_name("body");

        let is_async = has_child_token(node, "async");
        let is_static = has_child_token(node, "static");

        let mut callable = emit.make_node(kind, &name, &fqn, span, node_text(node, src));
        callable.body_span = body.as_ref().map(node_to_span);
        callable.control_flow_summary =
            body.as_ref().map(|b| summarize(b, &TYPESCRIPT_CONTROL_FLOW));
        if is_async {
            callable
                .attrs
                .insert("typescript.is_async".to_string(), Value::Bool(true));
        }
        if is_static {
            callable
                .attrs
                .insert("typescript.is_static".to_string(), Value::Bool(true));
        }

        let callable_id = callable.id.clone();
        let parent_id = emit.scope.current_node_id().map(str::to_string);
        emit.push_node(callable);
        if let Some(parent) = parent_id {
            emit.add_contains(&parent, &callable_id, span);
        }
        emit.register_symbol(&scope_segment, &callable_id);

        emit.scope.push(ScopeKind::Function, scope_segment);
        emit.scope.set_current_node_id(&callable_id);

        let mut param_type_ids = Vec::new();
        if let Some(ref params) = params_node {
            param_type_ids = self.process_parameters(params, emit, src, &fqn, &callable_id);
        }

        if let Some(ref body) = body {
            self.process_body(body, emit, src, &callable_id);
        }

        emit.scope.pop();

        let return_raw = node
            .child_by_field_name("return_type")
            .map(|t| annotation_text(&t, src));
        let return_type_id = return_raw
            .as_deref()
            .and_then(|raw| emit.resolve_type_entity(raw));

        let raw_signature = format!(
            "{}{}",
            param_sig,
            return_raw
                .as_deref()
                .map(|r| format!(" -> {}", r))
                .unwrap_or_default()
        );
        let sig_id = signature_id(&callable_id, &name, &param_raw_types, return_raw.as_deref());
        let sig_hash = signature_hash(
            &name,
            &param_raw_types,
            return_raw.as_deref(),
            is_async,
            is_static,
        );
        emit.add_signature(SignatureEntity {
            id: sig_id.clone(),
            owner_node_id: callable_id.clone(),
            name,
            raw: raw_signature,
            parameter_type_ids: param_type_ids,
            return_type_id,
            is_async,
            is_static,
            visibility: None,
            throws_type_ids: Vec::new(),
            signature_hash: Some(sig_hash),
        });
        emit.set_signature_id(&callable_id, &sig_id);
    }

    fn process_parameters(
        &self,
        params: &TsNode,
        emit: &mut IrEmitter,
        src: &str,
        callable_fqn: &str,
        callable_id: &str,
    ) -> Vec<String> {
        let mut type_ids = Vec::new();

        for i in 0..params.child_count() {
            let Some(param) = params.child(i) else { continue };
            if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
                continue;
            }

            let name = param
                .child_by_field_name("pattern")
                .filter(|p| p.kind() == "identifier")
                .map(|p| node_text_owned(&p, src));
            let Some(name) = name else { continue };
            if name == "this" {
                continue;
            }

            let raw_type = param
                .child_by_field_name("type")
                .map(|t| annotation_text(&t, src));

            let param_fqn = format!("{}.{}", callable_fqn, name);
            let span = node_to_span(&param);
            let mut param_node =
                emit.make_node(NodeKind::Parameter, &name, &param_fqn, span, node_text(&param, src));
            param_node.parent_id = Some(callable_id.to_string());
            if param.kind() == "optional_parameter" {
                param_node
                    .attrs
                    .insert("typescript.is_optional".to_string(), Value::Bool(true));
            }

            if let Some(raw) = raw_type {
                if let Some(type_id) = emit.resolve_type_entity(&raw) {
                    param_node.declared_type_id = Some(type_id.clone());
                    type_ids.push(type_id);
                }
            }

            let param_id = param_node.id.clone();
            emit.push_node(param_node);
            emit.add_contains(callable_id, &param_id, span);
            emit.register_symbol(&name, &param_id);
        }

        type_ids
    }

    fn process_field(&self, node: &TsNode, emit: &mut IrEmitter, src: &str) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text_owned(&name_node, src);
        let fqn = emit.scope.build_fqn(&name);
        let span = node_to_span(node);

        let mut field_node = emit.make_node(NodeKind::Field, &name, &fqn, span, node_text(node, src));
        if let Some(ty) = node.child_by_field_name("type") {
            let raw = annotation_text(&ty, src);
            if let Some(type_id) = emit.resolve_type_entity(&raw) {
                field_node.declared_type_id = Some(type_id);
            }
        }
        if has_child_token(node, "static") {
            field_node
                .attrs
                .insert("typescript.is_static".to_string(), Value::Bool(true));
        }

        let field_id = field_node.id.clone();
        let parent_id = emit.scope.current_node_id().map(str::to_string);
        emit.push_node(field_node);
        if let Some(parent) = parent_id {
            emit.add_contains(&parent, &field_id, span);
        }
        emit.register_symbol(&name, &field_id);
    }

    /// Module-level or body-level `const`/`let`/`var`.
    ///
    /// A declaration always introduces a binding in the current scope, so
    /// only a name already declared in this scope is a redeclaration; a
    /// declaration over an outer name creates a fresh node (and a SHADOWS
    /// edge via registration).
    fn process_variable_declaration(&self, node: &TsNode, emit: &mut IrEmitter, src: &str) {
        for declarator in find_children_by_kind(node, "variable_declarator") {
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            if name_node.kind() != "identifier" {
                continue;
            }
            let name = node_text_owned(&name_node, src);
            let span = node_to_span(&declarator);

            if let Some(existing) = emit.scope.lookup_local(&name).map(str::to_string) {
                emit.add_reassignment(&existing, span.start_line, span.start_col);
                continue;
            }

            let fqn = emit.scope.build_fqn(&name);
            let mut var_node =
                emit.make_node(NodeKind::Variable, &name, &fqn, span, node_text(&declarator, src));
            if let Some(ty) = declarator.child_by_field_name("type") {
                let raw = annotation_text(&ty, src);
                if let Some(type_id) = emit.resolve_type_entity(&raw) {
                    var_node.declared_type_id = Some(type_id);
                }
            }

            let var_id = var_node.id.clone();
            let parent_id = emit.scope.current_node_id().map(str::to_string);
            emit.push_node(var_node);
            if let Some(parent) = parent_id {
                emit.add_contains(&parent, &var_id, span);
            }
            emit.register_symbol(&name, &var_id);

            // Arrow functions bound to a name keep their own node
            if let Some(value) = declarator.child_by_field_name("value") {
                if value.kind() == "arrow_function" {
                    self.process_arrow_function(&value, emit, src, &var_id);
                }
            }
        }
    }

    /// Walk a callable body for variables, calls, arrow functions, and
    /// reassignments. Descent stops at nested callable boundaries.
    fn process_body(&self, body: &TsNode, emit: &mut IrEmitter, src: &str, owner_id: &str) {
        let mut stack: Vec<TsNode> = Vec::new();
        for i in (0..body.child_count()).rev() {
            if let Some(child) = body.child(i) {
                stack.push(child);
            }
        }

        while let Some(node) = stack.pop() {
            match node.kind() {
                "function_declaration" => {
                    self.process_function(&node, emit, src, true);
                    continue;
                }
                "class_declaration" => {
                    self.process_class(&node, emit, src);
                    continue;
                }
                "arrow_function" => {
                    self.process_arrow_function(&node, emit, src, owner_id);
                    continue;
                }
                "lexical_declaration" | "variable_declaration" => {
                    self.process_variable_declaration(&node, emit, src);
                    // Arrow values were handled above; push the remaining
                    // initializers so their calls are still extracted.
                    for declarator in find_children_by_kind(&node, "variable_declarator") {
                        if let Some(value) = declarator.child_by_field_name("value") {
                            if value.kind() != "arrow_function" {
                                stack.push(value);
                            }
                        }
                    }
                    continue;
                }
                "call_expression" => {
                    if let Some(function) = node.child_by_field_name("function") {
                        let callee = match function.kind() {
                            "identifier" | "member_expression" => node_text_owned(&function, src),
                            _ => {
                                for i in (0..node.child_count()).rev() {
                                    if let Some(child) = node.child(i) {
                                        stack.push(child);
                                    }
                                }
                                continue;
                            }
                        };
                        emit.add_call(owner_id, &callee, node_to_span(&node));
                    }
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
                "throw_statement" => {
                    // `throw new E(...)` → THROWS edge toward the type
                    if let Some(new_expr) = find_child_by_kind(&node, "new_expression") {
                        if let Some(ctor) = new_expr.child_by_field_name("constructor") {
                            let exception_type = node_text_owned(&ctor, src);
                            let edge = emit
                                .edge(EdgeKind::Throws, owner_id, &exception_type)
                                .with_span(node_to_span(&node))
                                .with_attr(
                                    "exception_type",
                                    Value::String(exception_type.clone()),
                                )
                                .with_attr("declared", Value::Bool(false))
                                .unresolved(&exception_type);
                            emit.push_edge(edge);
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

    /// Arrow functions become Lambda nodes with position-derived FQNs and
    /// scope-resolved CAPTURES edges.
    fn process_arrow_function(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, parent_id: &str) {
        let span = node_to_span(node);
        let lambda_name = format!("lambda${}", span.start_line);
        let lambda_fqn = format!(
            "{}.lambda${}:{}",
            emit.scope.current_fqn(),
            span.start_line,
            span.start_col
        );

        let body = node.child_by_field_name("body");
        let mut lambda_node =
            emit.make_node(NodeKind::Lambda, &lambda_name, &lambda_fqn, span, node_text(node, src));
        lambda_node.parent_id = Some(parent_id.to_string());
        lambda_node.body_span = body.as_ref().map(node_to_span);
        lambda_node
            .attrs
            .insert("typescript.is_arrow".to_string(), Value::Bool(true));
        if has_child_token(node, "async") {
            lambda_node
                .attrs
                .insert("typescript.is_async".to_string(), Value::Bool(true));
        }
        if let Some(ref b) = body {
            if b.kind() == "statement_block" {
                lambda_node.control_flow_summary = Some(summarize(b, &TYPESCRIPT_CONTROL_FLOW));
            }
        }

        let lambda_id = lambda_node.id.clone();

        // Own parameters
        let mut own_params: Vec<String> = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            own_params = crate::shared::ts::find_descendants_by_kind(&params, "identifier")
                .iter()
                .map(|n| node_text_owned(n, src))
                .collect();
        } else if let Some(param) = node.child_by_field_name("parameter") {
            own_params.push(node_text_owned(&param, src));
        }

        let mut captures = Vec::new();
        if let Some(ref b) = body {
            for ident in crate::shared::ts::find_descendants_by_kind(b, "identifier") {
                let name = node_text_owned(&ident, src);
                if own_params.contains(&name) || captures.contains(&name) {
                    continue;
                }
                if let Some(target_id) = emit.scope.lookup_symbol(&name).map(str::to_string) {
                    let edge = emit
                        .edge(EdgeKind::Captures, &lambda_id, &target_id)
                        .with_attr("variable_name", Value::String(name.clone()));
                    emit.push_edge(edge);
                    captures.push(name);
                }
            }
        }
        if !captures.is_empty() {
            lambda_node
                .attrs
                .insert("typescript.captures".to_string(), json!(captures));
        }

        emit.push_node(lambda_node);
        emit.add_contains(parent_id, &lambda_id, span);

        if let Some(b) = body {
            if b.kind() == "statement_block" {
                self.process_body(&b, emit, src, &lambda_id);
            }
        }
    }

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

/// `(number,string)` parameter signature plus raw type list.
fn extract_parameter_signature(params: &TsNode, src: &str) -> (String, Vec<String>) {
    let mut types = Vec::new();

    for i in 0..params.child_count() {
        let Some(param) = params.child(i) else { continue };
        if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
            continue;
        }
        if let Some(ty) = param.child_by_field_name("type") {
            types.push(annotation_text(&ty, src));
        }
    }

    (format!("({})", types.join(",")), types)
}

/// Type annotation text without the leading `:`.
fn annotation_text(node: &TsNode, src: &str) -> String {
    node_text(node, src).trim_start_matches(':').trim().to_string()
}

fn has_child_token(node: &TsNode, token: &str) -> bool {
    (0..node.child_count())
        .filter_map(|i| node.child(i))
        .any(|c| c.kind() == token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::parsing::Language;

    fn walk(code: &str) -> IRDocument {
        let source = SourceFile::new("src/m.ts", code, "m", Language::TypeScript);
        TypeScriptWalker::new("repo").generate(&source, "snap").unwrap()
    }

    #[test]
    fn test_class_with_typed_method() {
        let code = r#"
class Service {
    run(count: number): string {
        return String(count);
    }
}
"#;
        let doc = walk(code);
        let class = doc.node_by_fqn("m.Service").expect("class node");
        assert_eq!(class.kind, NodeKind::Class);

        let method = doc.node_by_fqn("m.Service.run(number)").expect("method node");
        assert_eq!(method.kind, NodeKind::Method);

        let param = doc.node_by_fqn("m.Service.run(number).count").expect("param");
        assert!(param.declared_type_id.is_some());

        let sig = doc
            .signatures
            .iter()
            .find(|s| s.owner_node_id == method.id)
            .expect("signature");
        assert_eq!(sig.raw, "(number) -> string");
    }

    #[test]
    fn test_named_imports_with_alias() {
        let code = "import { join, resolve as fullPath } from \"./paths\";\n";
        let doc = walk(code);

        let imports: Vec<_> = doc
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Import)
            .collect();
        assert_eq!(imports.len(), 2);
        assert!(imports.iter().any(|n| n.fqn == "./paths.join"));
        assert!(imports
            .iter()
            .any(|n| n.fqn == "./paths.resolve" && n.name.as_deref() == Some("fullPath")));
    }

    #[test]
    fn test_interface_and_extends() {
        let code = "interface Widget extends Base {\n    render(): void;\n}\n";
        let doc = walk(code);
        let iface = doc.node_by_fqn("m.Widget").expect("interface node");
        assert_eq!(iface.kind, NodeKind::Interface);

        let inherits: Vec<_> = doc.edges_of_kind(EdgeKind::Inherits).collect();
        assert_eq!(inherits.len(), 1);
    }

    #[test]
    fn test_implements_clause() {
        let code = "class Button implements Clickable {\n}\n";
        let doc = walk(code);
        let implements: Vec<_> = doc.edges_of_kind(EdgeKind::Implements).collect();
        assert_eq!(implements.len(), 1);
        assert_eq!(implements[0].target_name(), Some("m.Clickable"));
    }

    #[test]
    fn test_enum_members() {
        let code = "enum Color { Red, Green = 3 }\n";
        let doc = walk(code);
        assert!(doc.node_by_fqn("m.Color").is_some());
        let members: Vec<_> = doc
            .nodes
            .iter()
            .filter(|n| n.attrs.contains_key("typescript.is_enum_member"))
            .collect();
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn test_call_edges_unresolved() {
        let code = r#"
import { helper } from "./util";
function main(): void {
    helper();
    console.log("done");
}
"#;
        let doc = walk(code);
        let calls: Vec<_> = doc.edges_of_kind(EdgeKind::Calls).collect();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|e| e.is_unresolved()));
        assert!(calls.iter().any(|e| e.target_name() == Some("helper")));
        assert!(calls.iter().any(|e| e.target_name() == Some("console.log")));
    }

    #[test]
    fn test_arrow_function_lambda_with_capture() {
        let code = r#"
function f(): void {
    const factor = 2;
    const double = (v: number) => v * factor;
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
        assert_eq!(captures.len(), 1);
    }

    #[test]
    fn test_module_level_variable() {
        let code = "const VERSION: string = \"1.0\";\n";
        let doc = walk(code);
        let var = doc.node_by_fqn("m.VERSION").expect("variable node");
        assert_eq!(var.kind, NodeKind::Variable);
        assert!(var.declared_type_id.is_some());
    }

    #[test]
    fn test_shadowed_const_creates_new_binding() {
        let code = r#"
const level = 1;
function f(): number {
    const level = 2;
    return level;
}
"#;
        let doc = walk(code);

        let outer = doc.node_by_fqn("m.level").expect("module binding");
        let inner = doc.node_by_fqn("m.f().level").expect("function-scoped binding");
        assert!(!outer.attrs.contains_key("reassignments"));

        let shadows: Vec<_> = doc.edges_of_kind(EdgeKind::Shadows).collect();
        assert_eq!(shadows.len(), 1);
        assert_eq!(shadows[0].source_id, inner.id);
        assert_eq!(shadows[0].target_id, outer.id);
    }

    #[test]
    fn test_export_statement_unwrapped() {
        let code = "export class Api {\n    fetch(): void {}\n}\n";
        let doc = walk(code);
        assert!(doc.node_by_fqn("m.Api").is_some());
        assert!(doc.node_by_fqn("m.Api.fetch()").is_some());
    }

    #[test]
    fn test_throw_produces_throws_edge() {
        let code = r#"
function f(x: number): number {
    if (x < 0) {
        throw new RangeError("negative");
    }
    return x;
}
"#;
        let doc = walk(code);
        let throws: Vec<_> = doc.edges_of_kind(EdgeKind::Throws).collect();
        assert_eq!(throws.len(), 1);
        assert_eq!(throws[0].target_name(), Some("RangeError"));
    }

    #[test]
    fn test_async_static_method() {
        let code = r#"
class Loader {
    static async load(url: string): Promise<string> {
        return fetch(url);
    }
}
"#;
        let doc = walk(code);
        let sig = doc
            .signatures
            .iter()
            .find(|s| s.name == "load")
            .expect("signature");
        assert!(sig.is_async);
        assert!(sig.is_static);
    }
}
