//! Type resolution.
//!
//! Maps raw type annotation strings to [`TypeEntity`] values at the most
//! specific resolution level the current context supports:
//!
//! raw → builtin → local (same file) → module (same package) →
//! project (cross package) → external (known stdlib)

use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::shared::id_strategy::type_id;
use crate::shared::models::{
    EdgeKind, IRDocument, NodeKind, TypeEntity, TypeFlavor, TypeResolutionLevel,
};

/// Primitive scalar types, reported with `TypeFlavor::Primitive`.
static PRIMITIVE_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "int", "str", "float", "bool", "bytes", "None", "void", "long", "short", "double",
        "char", "byte", "boolean", "number", "string",
    ]
    .into_iter()
    .collect()
});

/// Built-in types across the supported annotation vocabularies.
static BUILTIN_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Python primitives
        "int", "str", "float", "bool", "bytes", "None",
        // Collections
        "list", "List", "dict", "Dict", "set", "Set", "tuple", "Tuple", "frozenset",
        // typing module
        "Any", "Optional", "Union", "Callable", "Iterable", "Iterator", "Sequence",
        "Generator", "Coroutine", "Awaitable", "AsyncIterator", "AsyncIterable", "Type",
        "Generic", "Protocol", "Final", "Literal", "ClassVar", "Annotated",
        // Others
        "object", "type",
        // Java / TypeScript spellings
        "void", "long", "short", "double", "char", "byte", "boolean", "String", "Integer",
        "Long", "Double", "Boolean", "Object", "number", "string", "unknown", "never",
        "undefined", "null",
    ]
    .into_iter()
    .collect()
});

/// Type variables (generic placeholders).
static TYPEVAR_TYPES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["TypeVar", "ParamSpec"].into_iter().collect());

/// Commonly used standard library types, resolved as EXTERNAL.
static STDLIB_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // pathlib
        "Path", "PurePath", "PosixPath", "WindowsPath",
        // datetime
        "datetime", "date", "time", "timedelta", "timezone",
        // collections
        "defaultdict", "OrderedDict", "Counter", "deque", "namedtuple",
        // abc / io / re / enum
        "ABC", "ABCMeta", "StringIO", "BytesIO", "TextIO", "BinaryIO", "Pattern", "Match",
        "Enum", "IntEnum", "StrEnum", "Flag", "IntFlag",
        // dataclasses / contextlib / functools
        "dataclass", "contextmanager", "asynccontextmanager", "partial", "wraps",
        // typing_extensions
        "Self", "Never", "Required", "NotRequired", "TypedDict", "Concatenate",
        // misc
        "UUID", "Decimal", "Fraction", "Logger", "Task", "Future", "Event", "Lock",
        "Semaphore",
        // Java stdlib
        "ArrayList", "HashMap", "HashSet", "LinkedList", "Optional", "Stream", "Map",
        "Exception", "RuntimeException", "IOException",
        // TypeScript lib
        "Promise", "Array", "Record", "Partial", "Readonly", "Date", "RegExp", "Error",
    ]
    .into_iter()
    .collect()
});

/// Resolves type annotation strings against file, package, and project
/// registries built from structural IR.
pub struct TypeResolver {
    repo_id: String,
    local_classes: HashMap<String, String>,
    module_types: HashMap<String, String>,
    /// BTreeMap so qualified-suffix scans visit candidates in a stable order.
    project_types: BTreeMap<String, String>,
    import_aliases: HashMap<String, String>,
    current_package: String,
}

impl TypeResolver {
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            local_classes: HashMap::new(),
            module_types: HashMap::new(),
            project_types: BTreeMap::new(),
            import_aliases: HashMap::new(),
            current_package: String::new(),
        }
    }

    /// Set the current file context; the package is the path's directory.
    pub fn set_context(&mut self, file_path: &str) {
        self.current_package = package_of(file_path).to_string();
    }

    /// Register a class defined in the current file (LOCAL level).
    pub fn register_local_class(&mut self, class_name: impl Into<String>, node_id: impl Into<String>) {
        self.local_classes.insert(class_name.into(), node_id.into());
    }

    /// Register a type imported from the same package (MODULE level).
    pub fn register_module_type(&mut self, type_name: impl Into<String>, node_id: impl Into<String>) {
        self.module_types.insert(type_name.into(), node_id.into());
    }

    /// Register a project-wide type (PROJECT level), by FQN and simple name.
    pub fn register_project_type(&mut self, fqn: &str, node_id: impl Into<String>) {
        let node_id = node_id.into();
        self.project_types.insert(fqn.to_string(), node_id.clone());

        let simple = fqn.rsplit('.').next().unwrap_or(fqn);
        self.project_types
            .entry(simple.to_string())
            .or_insert(node_id);
    }

    /// Register an import alias (`import pandas as pd` → pd → pandas).
    pub fn register_import_alias(&mut self, alias: impl Into<String>, original: impl Into<String>) {
        self.import_aliases.insert(alias.into(), original.into());
    }

    /// Build MODULE/PROJECT registries from a document's classes and imports.
    pub fn build_index_from_ir(&mut self, doc: &IRDocument) {
        for node in &doc.nodes {
            if matches!(node.kind, NodeKind::Class | NodeKind::Interface | NodeKind::Enum)
                && !node.fqn.is_empty()
            {
                self.register_project_type(&node.fqn, node.id.clone());
            }
        }

        for edge in doc.edges_of_kind(EdgeKind::Imports) {
            let Some(target) = doc.node_by_id(&edge.target_id) else {
                continue;
            };
            if !matches!(target.kind, NodeKind::Class | NodeKind::Interface | NodeKind::Enum) {
                continue;
            }

            if let Some(source) = doc.node_by_id(&edge.source_id) {
                if package_of(&source.file_path) == package_of(&target.file_path) {
                    self.register_module_type(target.simple_name().to_string(), target.id.clone());
                }
            }

            if let Some(alias) = edge.alias() {
                self.register_import_alias(alias.to_string(), target.simple_name().to_string());
            }
        }
    }

    /// Resolve a type annotation to a TypeEntity.
    pub fn resolve_type(&self, raw_type: &str) -> TypeEntity {
        let normalized = raw_type.trim().to_string();

        let (flavor, resolution_level, resolved_target) = self.classify(&normalized);

        let id = type_id(
            &normalized,
            &self.repo_id,
            resolution_level == TypeResolutionLevel::Builtin,
        );

        let generic_param_ids = self.resolve_generic_params(&normalized);

        TypeEntity {
            id,
            raw: normalized.clone(),
            flavor,
            is_nullable: is_nullable(&normalized),
            resolution_level,
            resolved_target,
            generic_param_ids,
        }
    }

    /// Dispatch in strict order, stopping at the first match.
    fn classify(&self, type_str: &str) -> (TypeFlavor, TypeResolutionLevel, Option<String>) {
        let mut base = base_name(type_str);

        if let Some(original) = self.import_aliases.get(base) {
            base = original.as_str();
        }

        if TYPEVAR_TYPES.contains(base) {
            return (TypeFlavor::TypeVar, TypeResolutionLevel::Builtin, None);
        }

        if BUILTIN_TYPES.contains(base) {
            let flavor = if PRIMITIVE_TYPES.contains(base) {
                TypeFlavor::Primitive
            } else {
                TypeFlavor::Builtin
            };
            return (flavor, TypeResolutionLevel::Builtin, None);
        }

        if let Some(node_id) = self.local_classes.get(base) {
            return (TypeFlavor::User, TypeResolutionLevel::Local, Some(node_id.clone()));
        }

        if let Some(node_id) = self.module_types.get(base) {
            return (TypeFlavor::User, TypeResolutionLevel::Module, Some(node_id.clone()));
        }

        if let Some(node_id) = self.project_types.get(base) {
            return (
                TypeFlavor::User,
                TypeResolutionLevel::Project,
                Some(node_id.clone()),
            );
        }

        // Qualified name: match project types by suffix
        if base.contains('.') {
            if let Some((_, node_id)) = self
                .project_types
                .iter()
                .find(|(fqn, _)| fqn.ends_with(base) || base.ends_with(fqn.rsplit('.').next().unwrap_or("")))
            {
                return (
                    TypeFlavor::User,
                    TypeResolutionLevel::Project,
                    Some(node_id.clone()),
                );
            }
        }

        if STDLIB_TYPES.contains(base) {
            return (TypeFlavor::External, TypeResolutionLevel::External, None);
        }

        (TypeFlavor::External, TypeResolutionLevel::Raw, None)
    }

    /// Recursively resolve bracketed generic parameters.
    fn resolve_generic_params(&self, type_str: &str) -> Vec<String> {
        split_generic_params(type_str)
            .into_iter()
            .map(|param| self.resolve_type(&param).id)
            .collect()
    }
}

/// Base name: the prefix before any generic bracket.
fn base_name(type_str: &str) -> &str {
    type_str
        .split(['[', '<'])
        .next()
        .unwrap_or(type_str)
        .trim()
}

/// Nullable when Optional[...] or a union with None.
fn is_nullable(type_str: &str) -> bool {
    type_str.contains("Optional[")
        || type_str.contains("| None")
        || type_str.contains("None |")
}

/// Split bracket content at top-level commas, tracking bracket depth so
/// nested generics stay whole (`Dict[str, List[int]]` → `str`, `List[int]`).
pub fn split_generic_params(type_str: &str) -> Vec<String> {
    let open = type_str.find(['[', '<']);
    let close = type_str.rfind([']', '>']);
    let (Some(start), Some(end)) = (open, close) else {
        return Vec::new();
    };
    if end <= start + 1 {
        return Vec::new();
    }

    let inner = &type_str[start + 1..end];
    let mut params = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();

    for ch in inner.chars() {
        match ch {
            '[' | '<' | '(' => {
                depth += 1;
                current.push(ch);
            }
            ']' | '>' | ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    params.push(trimmed.to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        params.push(trimmed.to_string());
    }

    params
}

fn package_of(file_path: &str) -> &str {
    match file_path.rfind('/') {
        Some(idx) => &file_path[..idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_resolution() {
        let resolver = TypeResolver::new("repo");
        let entity = resolver.resolve_type("int");
        assert_eq!(entity.flavor, TypeFlavor::Primitive);
        assert_eq!(entity.resolution_level, TypeResolutionLevel::Builtin);
        assert_eq!(entity.id, "type:builtin:int");
        assert!(!entity.is_nullable);
    }

    #[test]
    fn test_local_class_resolution() {
        let mut resolver = TypeResolver::new("repo");
        resolver.register_local_class("Widget", "class_node_1");

        let entity = resolver.resolve_type("Widget");
        assert_eq!(entity.flavor, TypeFlavor::User);
        assert_eq!(entity.resolution_level, TypeResolutionLevel::Local);
        assert_eq!(entity.resolved_target.as_deref(), Some("class_node_1"));
    }

    #[test]
    fn test_resolution_ladder_order() {
        let mut resolver = TypeResolver::new("repo");
        resolver.register_local_class("Thing", "local_node");
        resolver.register_module_type("Thing", "module_node");
        resolver.register_project_type("pkg.other.Thing", "project_node");

        // Local wins over module and project
        let entity = resolver.resolve_type("Thing");
        assert_eq!(entity.resolution_level, TypeResolutionLevel::Local);
        assert_eq!(entity.resolved_target.as_deref(), Some("local_node"));
    }

    #[test]
    fn test_module_resolution() {
        let mut resolver = TypeResolver::new("repo");
        resolver.register_module_type("Helper", "helper_node");
        let entity = resolver.resolve_type("Helper");
        assert_eq!(entity.resolution_level, TypeResolutionLevel::Module);
    }

    #[test]
    fn test_project_resolution_by_qualified_suffix() {
        let mut resolver = TypeResolver::new("repo");
        resolver.register_project_type("src.retriever.models.SearchHit", "hit_node");

        let entity = resolver.resolve_type("models.SearchHit");
        assert_eq!(entity.resolution_level, TypeResolutionLevel::Project);
        assert_eq!(entity.resolved_target.as_deref(), Some("hit_node"));
    }

    #[test]
    fn test_stdlib_resolution() {
        let resolver = TypeResolver::new("repo");
        let entity = resolver.resolve_type("Path");
        assert_eq!(entity.flavor, TypeFlavor::External);
        assert_eq!(entity.resolution_level, TypeResolutionLevel::External);
    }

    #[test]
    fn test_unknown_stays_raw() {
        let resolver = TypeResolver::new("repo");
        let entity = resolver.resolve_type("SomeVendorThing");
        assert_eq!(entity.resolution_level, TypeResolutionLevel::Raw);
        assert!(entity.resolved_target.is_none());
    }

    #[test]
    fn test_nullable_detection() {
        let resolver = TypeResolver::new("repo");
        assert!(resolver.resolve_type("Optional[str]").is_nullable);
        assert!(resolver.resolve_type("str | None").is_nullable);
        assert!(resolver.resolve_type("None | str").is_nullable);
        assert!(!resolver.resolve_type("str").is_nullable);
    }

    #[test]
    fn test_alias_substitution() {
        let mut resolver = TypeResolver::new("repo");
        resolver.register_local_class("DataFrame", "df_node");
        resolver.register_import_alias("DF", "DataFrame");

        let entity = resolver.resolve_type("DF");
        assert_eq!(entity.resolution_level, TypeResolutionLevel::Local);
    }

    #[test]
    fn test_split_generic_params_nested() {
        assert_eq!(
            split_generic_params("Dict[str, List[int]]"),
            vec!["str".to_string(), "List[int]".to_string()]
        );
        assert_eq!(split_generic_params("List[str]"), vec!["str".to_string()]);
        assert_eq!(split_generic_params("int"), Vec::<String>::new());
        assert_eq!(
            split_generic_params("Map<String, List<Integer>>"),
            vec!["String".to_string(), "List<Integer>".to_string()]
        );
    }

    #[test]
    fn test_build_index_from_ir() {
        use crate::shared::models::{Edge, EdgeKind, IRDocument, Node, NodeKind, Span};

        let mut doc = IRDocument::new(
            "repo".to_string(),
            "snap".to_string(),
            "pkg/widgets.py".to_string(),
            "python".to_string(),
        );
        // Class defined in the same package
        doc.nodes.push(
            Node::new(
                "widget_node".to_string(),
                NodeKind::Class,
                "pkg.widgets.Widget".to_string(),
                "pkg/widgets.py".to_string(),
                Span::new(1, 0, 5, 0),
            )
            .with_name("Widget".to_string()),
        );
        // Importing file node in the same package
        doc.nodes.push(Node::new(
            "importer_node".to_string(),
            NodeKind::File,
            "pkg.app".to_string(),
            "pkg/app.py".to_string(),
            Span::new(1, 0, 1, 0),
        ));
        doc.edges.push(
            Edge::new(
                "edge:imports:app→Widget@0".to_string(),
                EdgeKind::Imports,
                "importer_node".to_string(),
                "widget_node".to_string(),
            )
            .with_attr("alias", serde_json::Value::String("W".to_string())),
        );

        let mut resolver = TypeResolver::new("repo");
        resolver.set_context("pkg/app.py");
        resolver.build_index_from_ir(&doc);

        // Same-package import → MODULE level
        let entity = resolver.resolve_type("Widget");
        assert_eq!(entity.resolution_level, TypeResolutionLevel::Module);
        assert_eq!(entity.resolved_target.as_deref(), Some("widget_node"));

        // Alias from the import edge resolves to the same target
        let aliased = resolver.resolve_type("W");
        assert_eq!(aliased.resolved_target.as_deref(), Some("widget_node"));

        // Project-level registration by FQN
        let qualified = resolver.resolve_type("pkg.widgets.Widget");
        assert_eq!(qualified.resolution_level, TypeResolutionLevel::Project);
    }

    #[test]
    fn test_generic_params_recursively_resolved() {
        let resolver = TypeResolver::new("repo");
        let entity = resolver.resolve_type("Dict[str, int]");
        assert_eq!(entity.generic_param_ids.len(), 2);
        assert!(entity.generic_param_ids[0].contains("str"));
        assert!(entity.generic_param_ids[1].contains("int"));
    }
}
