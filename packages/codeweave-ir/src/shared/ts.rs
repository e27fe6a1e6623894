//! Tree-sitter helpers shared by all language walkers.

use tree_sitter::Node;

use super::models::Span;

/// Find a direct child node by kind.
#[inline]
pub fn find_child_by_kind<'a>(node: &Node<'a>, kind: &str) -> Option<Node<'a>> {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == kind {
                return Some(child);
            }
        }
    }
    None
}

/// Find all direct children by kind.
#[inline]
pub fn find_children_by_kind<'a>(node: &Node<'a>, kind: &str) -> Vec<Node<'a>> {
    let mut result = Vec::new();
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == kind {
                result.push(child);
            }
        }
    }
    result
}

/// Find a descendant by kind, depth-first, iteratively.
pub fn find_descendant_by_kind<'a>(node: &Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut stack = vec![*node];
    while let Some(current) = stack.pop() {
        if current.kind() == kind {
            return Some(current);
        }
        for i in (0..current.child_count()).rev() {
            if let Some(child) = current.child(i) {
                stack.push(child);
            }
        }
    }
    None
}

/// Find all descendants by kind, iteratively, in source order.
pub fn find_descendants_by_kind<'a>(node: &Node<'a>, kind: &str) -> Vec<Node<'a>> {
    let mut result = Vec::new();
    let mut stack = vec![*node];
    while let Some(current) = stack.pop() {
        if current.kind() == kind {
            result.push(current);
        }
        for i in (0..current.child_count()).rev() {
            if let Some(child) = current.child(i) {
                stack.push(child);
            }
        }
    }
    result
}

/// Extract text content of a node.
#[inline]
pub fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Extract text content as an owned String.
#[inline]
pub fn node_text_owned(node: &Node, source: &str) -> String {
    node_text(node, source).to_string()
}

/// Extract the identifier-child name of a node, if any.
#[inline]
pub fn identifier_name(node: &Node, source: &str) -> Option<String> {
    find_child_by_kind(node, "identifier").map(|id| node_text_owned(&id, source))
}

/// Convert a tree-sitter node to a Span (1-based lines, 0-based columns).
#[inline]
pub fn node_to_span(node: &Node) -> Span {
    let start = node.start_position();
    let end = node.end_position();

    Span::new(
        start.row as u32 + 1,
        start.column as u32,
        end.row as u32 + 1,
        end.column as u32,
    )
}

/// Extract the source text covered by a span, line-wise.
///
/// Used by provenance to recover node bodies from file content without
/// retaining byte offsets in the IR.
pub fn span_text(span: &Span, source: &str) -> String {
    if span.start_line == 0 {
        return String::new();
    }

    let start = span.start_line as usize - 1;
    let end = span.end_line as usize; // inclusive end line
    source
        .lines()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse_python(code: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::language())
            .unwrap();
        parser.parse(code, None).unwrap()
    }

    #[test]
    fn test_find_child_by_kind() {
        let code = "def foo(): pass";
        let tree = parse_python(code);
        let func = tree.root_node().child(0).unwrap();

        let id = find_child_by_kind(&func, "identifier");
        assert!(id.is_some());
        assert_eq!(node_text(&id.unwrap(), code), "foo");
    }

    #[test]
    fn test_node_to_span() {
        let code = "def foo():\n    pass";
        let tree = parse_python(code);
        let func = tree.root_node().child(0).unwrap();

        let span = node_to_span(&func);
        assert_eq!(span.start_line, 1);
        assert_eq!(span.start_col, 0);
        assert_eq!(span.end_line, 2);
    }

    #[test]
    fn test_find_descendants_by_kind() {
        let code = "x = 1\ny = 2\nz = 3\n";
        let tree = parse_python(code);
        let ids = find_descendants_by_kind(&tree.root_node(), "identifier");
        assert_eq!(ids.len(), 3);
        // Source order
        assert_eq!(node_text(&ids[0], code), "x");
        assert_eq!(node_text(&ids[2], code), "z");
    }

    #[test]
    fn test_span_text() {
        let source = "line1\nline2\nline3\nline4";
        let span = Span::new(2, 0, 3, 5);
        assert_eq!(span_text(&span, source), "line2\nline3");
    }
}
