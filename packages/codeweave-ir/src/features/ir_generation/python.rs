//! Python walker: tree-sitter-python AST → IRDocument.
//!
//! Produces File/Class/Method/Function/Parameter/Variable/Import/Lambda
//! nodes with CONTAINS/CALLS/IMPORTS/INHERITS/CAPTURES/SHADOWS edges,
//! control-flow summaries, and type/signature entities.

use serde_json::{json, Value};
use tree_sitter::Node as TsNode;

use crate::features::parsing::{self, SourceFile};
use crate::shared::id_strategy::{signature_hash, signature_id};
use crate::shared::models::{IRDocument, NodeKind, Result, SignatureEntity, Span};
use crate::shared::scope_stack::ScopeKind;
use crate::shared::ts::{
    find_child_by_kind, find_children_by_kind, node_text, node_text_owned, node_to_span,
};

use super::builder::IrEmitter;
use super::control_flow::{summarize, PYTHON_CONTROL_FLOW};

/// Parameters that never become Parameter nodes.
const SKIP_PARAMS: [&str; 2] = ["self", "cls"];

pub struct PythonWalker {
    repo_id: String,
}

impl PythonWalker {
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
            "python",
            &source.module_path,
        );

        // File node roots the containment forest.
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

        self.walk_container(&root, &mut emit, src, false);

        Ok(emit.finish(snapshot_id, src))
    }

    /// Walk statements of a module or class body.
    fn walk_container(&self, container: &TsNode, emit: &mut IrEmitter, src: &str, in_class: bool) {
        for i in 0..container.child_count() {
            let Some(child) = container.child(i) else {
                continue;
            };
            match child.kind() {
                "import_statement" => self.process_import_statement(&child, emit, src),
                "import_from_statement" => self.process_import_from(&child, emit, src),
                "class_definition" => self.process_class(&child, emit, src, &[]),
                "function_definition" => {
                    self.process_function(&child, emit, src, in_class, &[])
                }
                "decorated_definition" => self.process_decorated(&child, emit, src, in_class),
                "expression_statement" => {
                    if let Some(assignment) = find_child_by_kind(&child, "assignment") {
                        let kind = if in_class {
                            NodeKind::Field
                        } else {
                            NodeKind::Variable
                        };
                        self.process_assignment(&assignment, emit, src, kind);
                    }
                }
                _ => {}
            }
        }
    }

    fn process_decorated(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, in_class: bool) {
        let decorators: Vec<String> = find_children_by_kind(node, "decorator")
            .iter()
            .map(|d| node_text(d, src).trim_start_matches('@').to_string())
            .collect();

        if let Some(def) = find_child_by_kind(node, "function_definition") {
            self.process_function(&def, emit, src, in_class, &decorators);
        } else if let Some(def) = find_child_by_kind(node, "class_definition") {
            self.process_class(&def, emit, src, &decorators);
        }
    }

    fn process_class(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, decorators: &[String]) {
        let Some(name_node) = find_child_by_kind(node, "identifier") else {
            return;
        };
        let name = node_text_owned(&name_node, src);
        let fqn = emit.scope.build_fqn(&name);
        let span = node_to_span(node);

        let body = find_child_by_kind(node, "block");
        let docstring = body.as_ref().and_then(|b| extract_docstring(b, src));

        let mut class_node = emit.make_node(NodeKind::Class, &name, &fqn, span, node_text(node, src));
        class_node.body_span = body.as_ref().map(node_to_span);
        class_node.docstring = docstring;
        if !decorators.is_empty() {
            class_node.attrs.insert(
                "python.decorators".to_string(),
                json!(decorators),
            );
        }

        let base_classes = extract_base_classes(node, src);
        if !base_classes.is_empty() {
            class_node
                .attrs
                .insert("python.bases".to_string(), json!(base_classes));
        }

        let class_id = class_node.id.clone();
        let parent_id = emit.scope.current_node_id().map(str::to_string);
        emit.push_node(class_node);

        if let Some(parent) = parent_id {
            emit.add_contains(&parent, &class_id, span);
        }
        emit.register_symbol(&name, &class_id);
        emit.resolver.register_local_class(name.clone(), class_id.clone());

        for base in &base_classes {
            let base_fqn = if base.contains('.') {
                resolve_qualified_base(base, emit)
            } else if let Some(full) = emit.scope.resolve_import(base) {
                full.to_string()
            } else {
                format!("{}.{}", emit.module_fqn(), base)
            };
            emit.add_inherits(&class_id, &base_fqn, span);
        }

        emit.scope.push(ScopeKind::Class, name);
        emit.scope.set_current_node_id(&class_id);
        if let Some(body) = body {
            self.walk_container(&body, emit, src, true);
        }
        emit.scope.pop();
    }

    fn process_function(
        &self,
        node: &TsNode,
        emit: &mut IrEmitter,
        src: &str,
        is_method: bool,
        decorators: &[String],
    ) {
        let Some(name_node) = find_child_by_kind(node, "identifier") else {
            return;
        };
        let name = node_text_owned(&name_node, src);
        let fqn = emit.scope.build_fqn(&name);
        let span = node_to_span(node);
        let kind = if is_method {
            NodeKind::Method
        } else {
            NodeKind::Function
        };

        let is_async = (0..node.child_count())
            .filter_map(|i| node.child(i))
            .any(|c| c.kind() == "async");
        let is_static = decorators.iter().any(|d| d == "staticmethod");

        let body = node.child_by_field_name("body");
        let docstring = body.as_ref().and_then(|b| extract_docstring(b, src));

        let mut func_node = emit.make_node(kind, &name, &fqn, span, node_text(node, src));
        func_node.body_span = body.as_ref().map(node_to_span);
        func_node.docstring = docstring;
        func_node.control_flow_summary = body.as_ref().map(|b| summarize(b, &PYTHON_CONTROL_FLOW));
        if is_async {
            func_node.attrs.insert("python.is_async".to_string(), Value::Bool(true));
        }
        if !decorators.is_empty() {
            func_node
                .attrs
                .insert("python.decorators".to_string(), json!(decorators));
        }

        let func_id = func_node.id.clone();
        let parent_id = emit.scope.current_node_id().map(str::to_string);
        emit.push_node(func_node);

        if let Some(parent) = parent_id {
            emit.add_contains(&parent, &func_id, span);
        }
        emit.register_symbol(&name, &func_id);

        emit.scope.push(ScopeKind::Function, name.clone());
        emit.scope.set_current_node_id(&func_id);

        // Parameters
        let mut param_type_ids = Vec::new();
        let mut param_raw_types = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            let (ids, raws) = self.process_parameters(&params, emit, src, &fqn, &func_id);
            param_type_ids = ids;
            param_raw_types = raws;
        }

        // Body: variables, calls, nested definitions, lambdas
        if let Some(ref body) = body {
            self.process_body(body, emit, src, &func_id);
        }

        emit.scope.pop();

        // Return type annotation
        let return_raw = node
            .child_by_field_name("return_type")
            .map(|t| node_text_owned(&t, src));
        let return_type_id = return_raw
            .as_deref()
            .and_then(|raw| emit.resolve_type_entity(raw));

        // Signature entity
        let raw_signature = format!(
            "({}){}",
            param_raw_types.join(", "),
            return_raw
                .as_deref()
                .map(|r| format!(" -> {}", r))
                .unwrap_or_default()
        );
        let sig_id = signature_id(&func_id, &name, &param_raw_types, return_raw.as_deref());
        let sig_hash = signature_hash(
            &name,
            &param_raw_types,
            return_raw.as_deref(),
            is_async,
            is_static,
        );
        emit.add_signature(SignatureEntity {
            id: sig_id.clone(),
            owner_node_id: func_id.clone(),
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
        emit.set_signature_id(&func_id, &sig_id);
    }

    /// Create Parameter nodes; returns (type entity IDs, raw type strings).
    fn process_parameters(
        &self,
        params: &TsNode,
        emit: &mut IrEmitter,
        src: &str,
        func_fqn: &str,
        func_id: &str,
    ) -> (Vec<String>, Vec<String>) {
        let mut type_ids = Vec::new();
        let mut raw_types = Vec::new();

        for i in 0..params.child_count() {
            let Some(param) = params.child(i) else {
                continue;
            };

            let (name_node, type_node) = match param.kind() {
                "identifier" => (Some(param), None),
                "typed_parameter" | "typed_default_parameter" => (
                    find_child_by_kind(&param, "identifier"),
                    param.child_by_field_name("type"),
                ),
                "default_parameter" => (
                    param
                        .child_by_field_name("name")
                        .or_else(|| find_child_by_kind(&param, "identifier")),
                    None,
                ),
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    (find_child_by_kind(&param, "identifier"), None)
                }
                _ => (None, None),
            };

            let Some(name_node) = name_node else {
                continue;
            };
            let param_name = node_text_owned(&name_node, src);
            if SKIP_PARAMS.contains(&param_name.as_str()) {
                continue;
            }

            let param_fqn = format!("{}.{}", func_fqn, param_name);
            let span = node_to_span(&param);
            let mut param_node =
                emit.make_node(NodeKind::Parameter, &param_name, &param_fqn, span, node_text(&param, src));
            param_node.parent_id = Some(func_id.to_string());

            if let Some(type_node) = type_node {
                let raw = node_text_owned(&type_node, src);
                if let Some(type_id) = emit.resolve_type_entity(&raw) {
                    param_node.declared_type_id = Some(type_id.clone());
                    type_ids.push(type_id);
                }
                raw_types.push(raw);
            }

            let param_id = param_node.id.clone();
            emit.push_node(param_node);
            emit.add_contains(func_id, &param_id, span);
            emit.register_symbol(&param_name, &param_id);
        }

        (type_ids, raw_types)
    }

    /// Walk a function body for assignments, calls, nested definitions, and
    /// lambdas. Descent stops at nested definition boundaries; those are
    /// processed through their own walkers.
    fn process_body(&self, body: &TsNode, emit: &mut IrEmitter, src: &str, func_id: &str) {
        let mut stack: Vec<TsNode> = Vec::new();
        for i in (0..body.child_count()).rev() {
            if let Some(child) = body.child(i) {
                stack.push(child);
            }
        }

        while let Some(node) = stack.pop() {
            match node.kind() {
                "function_definition" => {
                    self.process_function(&node, emit, src, false, &[]);
                    continue;
                }
                "decorated_definition" => {
                    self.process_decorated(&node, emit, src, false);
                    continue;
                }
                "class_definition" => {
                    self.process_class(&node, emit, src, &[]);
                    continue;
                }
                "lambda" => {
                    self.process_lambda(&node, emit, src, func_id);
                    continue;
                }
                "assignment" => {
                    self.process_assignment(&node, emit, src, NodeKind::Variable);
                }
                "call" => {
                    self.process_call(&node, emit, src, func_id);
                }
                "raise_statement" => {
                    self.process_raise(&node, emit, src, func_id);
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

    /// First assignment creates a Variable/Field node; later ones append to
    /// the existing node's reassignment list. Only a binding in the current
    /// scope counts as a reassignment — a first assignment over an outer
    /// name creates a fresh node (and a SHADOWS edge via registration).
    fn process_assignment(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, kind: NodeKind) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "identifier" {
            return;
        }
        let var_name = node_text_owned(&left, src);
        let span = node_to_span(&left);

        if let Some(existing_id) = emit.scope.lookup_local(&var_name).map(str::to_string) {
            emit.add_reassignment(&existing_id, span.start_line, span.start_col);
            return;
        }

        let var_fqn = emit.scope.build_fqn(&var_name);
        let mut var_node = emit.make_node(kind, &var_name, &var_fqn, span, node_text(node, src));

        let type_annotation = node
            .child_by_field_name("type")
            .map(|t| node_text_owned(&t, src));
        if let Some(raw) = type_annotation {
            if let Some(type_id) = emit.resolve_type_entity(&raw) {
                var_node.declared_type_id = Some(type_id);
            }
        }
        var_node
            .attrs
            .insert("python.var_kind".to_string(), Value::String("local".to_string()));

        let var_id = var_node.id.clone();
        let parent_id = emit.scope.current_node_id().map(str::to_string);
        emit.push_node(var_node);
        if let Some(parent) = parent_id {
            emit.add_contains(&parent, &var_id, span);
        }
        emit.register_symbol(&var_name, &var_id);
    }

    /// CALLS edge with the callee name preserved until global resolution.
    fn process_call(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, caller_id: &str) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };

        let callee_name = match function.kind() {
            "identifier" => node_text_owned(&function, src),
            "attribute" => node_text_owned(&function, src),
            _ => return,
        };

        emit.add_call(caller_id, &callee_name, node_to_span(node));
    }

    /// `raise E(...)` and `raise E` produce THROWS edges toward the
    /// exception type.
    fn process_raise(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, func_id: &str) {
        // Bare `raise` re-raises; nothing to record
        let exception = (0..node.child_count())
            .filter_map(|i| node.child(i))
            .find_map(|child| match child.kind() {
                "call" => child
                    .child_by_field_name("function")
                    .map(|f| node_text_owned(&f, src)),
                "identifier" | "attribute" => Some(node_text_owned(&child, src)),
                _ => None,
            });

        let Some(exception_type) = exception else {
            return;
        };

        let edge = emit
            .edge(crate::shared::models::EdgeKind::Throws, func_id, &exception_type)
            .with_span(node_to_span(node))
            .with_attr("exception_type", Value::String(exception_type.clone()))
            .with_attr("declared", Value::Bool(false))
            .unresolved(&exception_type);
        emit.push_edge(edge);
    }

    /// Lambdas get a position-derived FQN and CAPTURES edges for free
    /// variables.
    fn process_lambda(&self, node: &TsNode, emit: &mut IrEmitter, src: &str, parent_id: &str) {
        let span = node_to_span(node);
        let lambda_name = format!("lambda${}", span.start_line);
        let lambda_fqn = format!(
            "{}.lambda${}:{}",
            emit.scope.current_fqn(),
            span.start_line,
            span.start_col
        );

        let mut lambda_node =
            emit.make_node(NodeKind::Lambda, &lambda_name, &lambda_fqn, span, node_text(node, src));
        lambda_node.parent_id = Some(parent_id.to_string());
        lambda_node
            .attrs
            .insert("python.is_lambda".to_string(), Value::Bool(true));

        let lambda_id = lambda_node.id.clone();

        // Captures: identifiers in the body that resolve to outer bindings
        // and are not the lambda's own parameters.
        let mut own_params: Vec<String> = Vec::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            own_params = crate::shared::ts::find_descendants_by_kind(&params, "identifier")
                .iter()
                .map(|n| node_text_owned(n, src))
                .collect();
        }

        let mut captures = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            for ident in crate::shared::ts::find_descendants_by_kind(&body, "identifier") {
                let name = node_text_owned(&ident, src);
                if own_params.contains(&name) || captures.contains(&name) {
                    continue;
                }
                if let Some(target_id) = emit.scope.lookup_symbol(&name).map(str::to_string) {
                    let edge = emit
                        .edge(crate::shared::models::EdgeKind::Captures, &lambda_id, &target_id)
                        .with_span(node_to_span(&ident))
                        .with_attr("variable_name", Value::String(name.clone()));
                    emit.push_edge(edge);
                    captures.push(name);
                }
            }
        }
        if !captures.is_empty() {
            lambda_node
                .attrs
                .insert("python.captures".to_string(), json!(captures));
        }

        emit.push_node(lambda_node);
        emit.add_contains(parent_id, &lambda_id, span);
    }

    fn process_import_statement(&self, node: &TsNode, emit: &mut IrEmitter, src: &str) {
        for i in 0..node.child_count() {
            let Some(child) = node.child(i) else {
                continue;
            };
            match child.kind() {
                "dotted_name" => {
                    let module = node_text_owned(&child, src);
                    self.create_import(emit, &module, None, node_to_span(node));
                }
                "aliased_import" => {
                    let module = child
                        .child_by_field_name("name")
                        .map(|n| node_text_owned(&n, src))
                        .unwrap_or_default();
                    let alias = child
                        .child_by_field_name("alias")
                        .map(|n| node_text_owned(&n, src));
                    if !module.is_empty() {
                        self.create_import(emit, &module, alias.as_deref(), node_to_span(node));
                    }
                }
                _ => {}
            }
        }
    }

    fn process_import_from(&self, node: &TsNode, emit: &mut IrEmitter, src: &str) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };
        let module = node_text_owned(&module_node, src);

        // Names after the `import` keyword
        let mut past_import_kw = false;
        for i in 0..node.child_count() {
            let Some(child) = node.child(i) else {
                continue;
            };
            if child.kind() == "import" {
                past_import_kw = true;
                continue;
            }
            if !past_import_kw {
                continue;
            }
            match child.kind() {
                "dotted_name" => {
                    let name = node_text_owned(&child, src);
                    let full = format!("{}.{}", module, name);
                    self.create_import(emit, &full, None, node_to_span(node));
                }
                "aliased_import" => {
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| node_text_owned(&n, src))
                        .unwrap_or_default();
                    let alias = child
                        .child_by_field_name("alias")
                        .map(|n| node_text_owned(&n, src));
                    if !name.is_empty() {
                        let full = format!("{}.{}", module, name);
                        self.create_import(emit, &full, alias.as_deref(), node_to_span(node));
                    }
                }
                "wildcard_import" => {
                    self.create_import(emit, &format!("{}.*", module), None, node_to_span(node));
                }
                _ => {}
            }
        }
    }

    fn create_import(&self, emit: &mut IrEmitter, full_path: &str, alias: Option<&str>, span: Span) {
        let simple_name = full_path.rsplit('.').next().unwrap_or(full_path);
        let visible_name = alias.unwrap_or(simple_name);

        let mut import_node =
            emit.make_node(NodeKind::Import, visible_name, full_path, span, full_path);
        import_node
            .attrs
            .insert("import_path".to_string(), Value::String(full_path.to_string()));
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
}

/// Docstring: first string expression in a block.
fn extract_docstring(block: &TsNode, src: &str) -> Option<String> {
    let first = block.child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string_node = first.child(0)?;
    if string_node.kind() != "string" {
        return None;
    }

    let raw = node_text(&string_node, src);
    let trimmed = raw
        .trim_start_matches("\"\"\"")
        .trim_end_matches("\"\"\"")
        .trim_start_matches("'''")
        .trim_end_matches("'''")
        .trim_start_matches('"')
        .trim_end_matches('"')
        .trim_start_matches('\'')
        .trim_end_matches('\'')
        .trim();
    Some(trimmed.to_string())
}

/// Base classes from the class definition's argument list.
fn extract_base_classes(class_node: &TsNode, src: &str) -> Vec<String> {
    let mut bases = Vec::new();
    if let Some(args) = find_child_by_kind(class_node, "argument_list") {
        for i in 0..args.child_count() {
            if let Some(arg) = args.child(i) {
                match arg.kind() {
                    "identifier" | "attribute" => bases.push(node_text_owned(&arg, src)),
                    _ => {}
                }
            }
        }
    }
    bases
}

/// Qualified base (`mod.Class`): resolve the first segment through import
/// aliases when possible.
fn resolve_qualified_base(base: &str, emit: &IrEmitter) -> String {
    let (head, rest) = match base.split_once('.') {
        Some(pair) => pair,
        None => return base.to_string(),
    };
    match emit.scope.resolve_import(head) {
        Some(full) => format!("{}.{}", full, rest),
        None => base.to_string(),
    }
}
