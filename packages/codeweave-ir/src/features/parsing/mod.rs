//! Source file abstraction and the parse oracle.
//!
//! The rest of the crate consumes parsed trees through this narrow surface;
//! nothing outside this module touches grammar selection.

use std::path::Path;

use tree_sitter::{Parser, Tree};

use crate::shared::models::{CodeweaveError, Result};

/// Supported source languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    Java,
    TypeScript,
}

impl Language {
    /// Detect language from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "py" => Some(Language::Python),
            "java" => Some(Language::Java),
            "ts" | "tsx" => Some(Language::TypeScript),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Java => "java",
            Language::TypeScript => "typescript",
        }
    }

    fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::Python => tree_sitter_python::language(),
            Language::Java => tree_sitter_java::language(),
            Language::TypeScript => tree_sitter_typescript::language_typescript(),
        }
    }
}

/// A file to process, with its content and module path already computed.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
    /// Dotted module FQN derived from the path relative to the repo root
    /// (e.g. `myapp.services.user`).
    pub module_path: String,
    pub language: Language,
}

impl SourceFile {
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        module_path: impl Into<String>,
        language: Language,
    ) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            module_path: module_path.into(),
            language,
        }
    }

    /// Compute the module path for a file relative to `repo_root`.
    ///
    /// `src/app/util.py` under root `src` becomes `app.util`; files outside
    /// the root fall back to their stem.
    pub fn module_path_for(path: &Path, repo_root: Option<&Path>) -> String {
        let relative = repo_root
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);

        let no_ext = relative.with_extension("");
        let joined = no_ext
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect::<Vec<_>>()
            .join(".");

        if joined.is_empty() {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("module")
                .to_string()
        } else {
            joined
        }
    }
}

/// Parse a source file into a tree-sitter tree.
pub fn parse(source: &SourceFile) -> Result<Tree> {
    parse_with(source, None)
}

/// Reparse after an edit, reusing the previous tree.
///
/// Used by the cache slow path when mtime changed but the content may be
/// only locally edited.
pub fn parse_incremental(source: &SourceFile, old_tree: &Tree) -> Result<Tree> {
    parse_with(source, Some(old_tree))
}

fn parse_with(source: &SourceFile, old_tree: Option<&Tree>) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&source.language.grammar())
        .map_err(|e| {
            CodeweaveError::parse(format!("failed to set language: {}", e))
                .with_file(&source.path)
        })?;

    parser.parse(&source.content, old_tree).ok_or_else(|| {
        CodeweaveError::parse("parser returned no tree").with_file(&source.path)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_language_detection() {
        assert_eq!(
            Language::from_path(Path::new("a/b.py")),
            Some(Language::Python)
        );
        assert_eq!(
            Language::from_path(Path::new("C.java")),
            Some(Language::Java)
        );
        assert_eq!(
            Language::from_path(Path::new("x.tsx")),
            Some(Language::TypeScript)
        );
        assert_eq!(Language::from_path(Path::new("x.rb")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_module_path_relative_to_root() {
        let path = PathBuf::from("src/app/services/user.py");
        let root = PathBuf::from("src");
        assert_eq!(
            SourceFile::module_path_for(&path, Some(&root)),
            "app.services.user"
        );
    }

    #[test]
    fn test_module_path_without_root() {
        let path = PathBuf::from("util.py");
        assert_eq!(SourceFile::module_path_for(&path, None), "util");
    }

    #[test]
    fn test_parse_python() {
        let source = SourceFile::new("a.py", "def f(): pass", "a", Language::Python);
        let tree = parse(&source).unwrap();
        assert_eq!(tree.root_node().kind(), "module");
    }

    #[test]
    fn test_parse_incremental_reuses_tree() {
        let source = SourceFile::new("a.py", "def f(): pass", "a", Language::Python);
        let tree = parse(&source).unwrap();

        let edited = SourceFile::new("a.py", "def f(): return 1", "a", Language::Python);
        let tree2 = parse_incremental(&edited, &tree).unwrap();
        assert_eq!(tree2.root_node().kind(), "module");
    }
}
