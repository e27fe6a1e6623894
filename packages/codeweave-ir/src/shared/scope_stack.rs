//! Scope stack for FQN management and shadowing detection.
//!
//! Walkers push a frame per lexical scope (module → class → function) and
//! register every declaration they emit. Registration reports the node that
//! a new declaration shadows, if any, so the walker can emit a SHADOWS edge.

use std::collections::HashMap;

/// Lexical scope kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Class,
    Function,
    Lambda,
}

/// One lexical scope frame.
#[derive(Debug, Clone)]
pub struct ScopeFrame {
    pub kind: ScopeKind,
    pub name: String,
    pub fqn: String,
    /// Node ID of the declaration that opened this scope.
    pub node_id: Option<String>,
    /// name → node_id of symbols declared directly in this scope.
    symbols: HashMap<String, String>,
}

impl ScopeFrame {
    fn new(kind: ScopeKind, name: String, fqn: String) -> Self {
        Self {
            kind,
            name,
            fqn,
            node_id: None,
            symbols: HashMap::new(),
        }
    }
}

/// A symbol declaration hiding one with the same name in an outer scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shadowing {
    pub name: String,
    pub inner_node_id: String,
    pub outer_node_id: String,
    pub inner_scope_fqn: String,
    pub outer_scope_fqn: String,
}

/// Scope stack. Always starts with the module frame.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
    /// alias → fully qualified import target, file-wide.
    import_aliases: HashMap<String, String>,
}

impl ScopeStack {
    /// Create a stack rooted at the module scope.
    pub fn new(module_fqn: impl Into<String>) -> Self {
        let fqn = module_fqn.into();
        let name = fqn.rsplit('.').next().unwrap_or(&fqn).to_string();
        Self {
            frames: vec![ScopeFrame::new(ScopeKind::Module, name, fqn)],
            import_aliases: HashMap::new(),
        }
    }

    pub fn push(&mut self, kind: ScopeKind, name: impl Into<String>) {
        let name = name.into();
        let fqn = self.build_fqn(&name);
        self.frames.push(ScopeFrame::new(kind, name, fqn));
    }

    pub fn pop(&mut self) -> Option<ScopeFrame> {
        // The module frame never pops.
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Module frame (always present).
    pub fn module(&self) -> &ScopeFrame {
        &self.frames[0]
    }

    /// Innermost frame.
    pub fn current(&self) -> &ScopeFrame {
        self.frames.last().expect("scope stack never empty")
    }

    pub fn current_mut(&mut self) -> &mut ScopeFrame {
        self.frames.last_mut().expect("scope stack never empty")
    }

    /// FQN of the innermost scope.
    pub fn current_fqn(&self) -> &str {
        &self.current().fqn
    }

    /// Node ID that opened the innermost scope.
    pub fn current_node_id(&self) -> Option<&str> {
        self.current().node_id.as_deref()
    }

    pub fn set_current_node_id(&mut self, node_id: impl Into<String>) {
        self.current_mut().node_id = Some(node_id.into());
    }

    /// FQN a declaration named `name` would get in the current scope.
    pub fn build_fqn(&self, name: &str) -> String {
        format!("{}.{}", self.current_fqn(), name)
    }

    /// Register a symbol in the current scope.
    ///
    /// Returns the shadowed definition when a symbol with the same name is
    /// already bound in this or an enclosing scope (inner hides outer).
    pub fn register_symbol(
        &mut self,
        name: impl Into<String>,
        node_id: impl Into<String>,
    ) -> Option<Shadowing> {
        let name = name.into();
        let node_id = node_id.into();

        let shadowed = self
            .frames
            .iter()
            .rev()
            .find_map(|frame| {
                frame
                    .symbols
                    .get(&name)
                    .map(|outer_id| (outer_id.clone(), frame.fqn.clone()))
            });

        let inner_scope_fqn = self.current().fqn.clone();
        self.current_mut().symbols.insert(name.clone(), node_id.clone());

        shadowed.map(|(outer_node_id, outer_scope_fqn)| Shadowing {
            name,
            inner_node_id: node_id,
            outer_node_id,
            inner_scope_fqn,
            outer_scope_fqn,
        })
    }

    /// Resolve a symbol name from the innermost scope outward.
    pub fn lookup_symbol(&self, name: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.symbols.get(name).map(String::as_str))
    }

    /// Resolve a symbol name in the innermost scope only.
    ///
    /// Walkers use this to tell a reassignment apart from a first
    /// assignment that shadows an outer binding: only a binding already
    /// made in the current scope counts as "the same variable".
    pub fn lookup_local(&self, name: &str) -> Option<&str> {
        self.current().symbols.get(name).map(String::as_str)
    }

    /// Record an import alias (`import numpy as np` → `np` → `numpy`).
    pub fn register_import(&mut self, alias: impl Into<String>, full: impl Into<String>) {
        self.import_aliases.insert(alias.into(), full.into());
    }

    /// Resolve an import alias to its full target.
    pub fn resolve_import(&self, alias: &str) -> Option<&str> {
        self.import_aliases.get(alias).map(String::as_str)
    }

    pub fn import_aliases(&self) -> &HashMap<String, String> {
        &self.import_aliases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_stack_fqn() {
        let mut stack = ScopeStack::new("app.main");
        stack.push(ScopeKind::Class, "Widget");
        stack.push(ScopeKind::Function, "render");
        assert_eq!(stack.current_fqn(), "app.main.Widget.render");
        assert_eq!(stack.build_fqn("buffer"), "app.main.Widget.render.buffer");
    }

    #[test]
    fn test_scope_stack_pop() {
        let mut stack = ScopeStack::new("m");
        stack.push(ScopeKind::Function, "f");
        assert_eq!(stack.depth(), 2);
        stack.pop();
        assert_eq!(stack.current_fqn(), "m");
        // Module frame never pops
        assert!(stack.pop().is_none());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_register_symbol_no_shadow() {
        let mut stack = ScopeStack::new("m");
        assert!(stack.register_symbol("x", "n1").is_none());
        assert_eq!(stack.lookup_symbol("x"), Some("n1"));
    }

    #[test]
    fn test_register_symbol_detects_shadowing() {
        let mut stack = ScopeStack::new("m");
        stack.register_symbol("value", "outer_node");
        stack.push(ScopeKind::Function, "f");

        let shadow = stack.register_symbol("value", "inner_node");
        let shadow = shadow.expect("shadowing should be detected");
        assert_eq!(shadow.inner_node_id, "inner_node");
        assert_eq!(shadow.outer_node_id, "outer_node");
        assert_eq!(shadow.inner_scope_fqn, "m.f");
        assert_eq!(shadow.outer_scope_fqn, "m");

        // Inner binding wins on lookup
        assert_eq!(stack.lookup_symbol("value"), Some("inner_node"));
    }

    #[test]
    fn test_lookup_local_ignores_outer_scopes() {
        let mut stack = ScopeStack::new("m");
        stack.register_symbol("x", "outer");
        stack.push(ScopeKind::Function, "f");

        // Outward lookup sees the outer binding, local lookup does not
        assert_eq!(stack.lookup_symbol("x"), Some("outer"));
        assert_eq!(stack.lookup_local("x"), None);

        stack.register_symbol("x", "inner");
        assert_eq!(stack.lookup_local("x"), Some("inner"));
    }

    #[test]
    fn test_lookup_walks_outward_after_pop() {
        let mut stack = ScopeStack::new("m");
        stack.register_symbol("x", "outer");
        stack.push(ScopeKind::Function, "f");
        stack.register_symbol("x", "inner");
        stack.pop();
        assert_eq!(stack.lookup_symbol("x"), Some("outer"));
    }

    #[test]
    fn test_import_aliases() {
        let mut stack = ScopeStack::new("m");
        stack.register_import("np", "numpy");
        assert_eq!(stack.resolve_import("np"), Some("numpy"));
        assert_eq!(stack.resolve_import("pd"), None);
    }

    #[test]
    fn test_current_node_id() {
        let mut stack = ScopeStack::new("m");
        stack.push(ScopeKind::Class, "C");
        stack.set_current_node_id("class_node");
        assert_eq!(stack.current_node_id(), Some("class_node"));
    }
}
