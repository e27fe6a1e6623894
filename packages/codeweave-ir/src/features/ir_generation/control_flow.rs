//! Control-flow summaries.
//!
//! Each walker classifies its grammar's node types into branch/loop/try
//! sets; the summary itself is language-independent. Traversal is iterative
//! over an explicit stack so deep bodies stay cheap.

use tree_sitter::Node;

use crate::shared::models::ControlFlowSummary;

/// Per-language control-flow node type sets.
#[derive(Debug, Clone, Copy)]
pub struct ControlFlowTypes {
    pub branches: &'static [&'static str],
    pub loops: &'static [&'static str],
    pub tries: &'static [&'static str],
}

pub const PYTHON_CONTROL_FLOW: ControlFlowTypes = ControlFlowTypes {
    branches: &[
        "if_statement",
        "elif_clause",
        "match_statement",
        "case_clause",
        "conditional_expression",
    ],
    loops: &["for_statement", "while_statement"],
    tries: &["try_statement"],
};

pub const JAVA_CONTROL_FLOW: ControlFlowTypes = ControlFlowTypes {
    branches: &[
        "if_statement",
        "switch_expression",
        "switch_statement",
        "ternary_expression",
    ],
    loops: &[
        "for_statement",
        "enhanced_for_statement",
        "while_statement",
        "do_statement",
    ],
    tries: &["try_statement", "try_with_resources_statement"],
};

pub const TYPESCRIPT_CONTROL_FLOW: ControlFlowTypes = ControlFlowTypes {
    branches: &[
        "if_statement",
        "switch_statement",
        "switch_case",
        "ternary_expression",
    ],
    loops: &[
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
    ],
    tries: &["try_statement"],
};

/// Summarize a body block. Cyclomatic complexity starts at 1 and increments
/// for each branch or loop; nested callables are not excluded (their
/// complexity is counted both here and in their own summary, matching the
/// per-body definition).
pub fn summarize(body: &Node, types: &ControlFlowTypes) -> ControlFlowSummary {
    let mut summary = ControlFlowSummary::default();

    let mut stack = vec![*body];
    while let Some(current) = stack.pop() {
        let kind = current.kind();

        if types.branches.contains(&kind) {
            summary.cyclomatic_complexity += 1;
            summary.branch_count += 1;
        } else if types.loops.contains(&kind) {
            summary.cyclomatic_complexity += 1;
            summary.has_loop = true;
        } else if types.tries.contains(&kind) {
            summary.has_try = true;
        }

        for i in (0..current.child_count()).rev() {
            if let Some(child) = current.child(i) {
                stack.push(child);
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn python_body(code: &str) -> (tree_sitter::Tree, String) {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::language())
            .unwrap();
        (parser.parse(code, None).unwrap(), code.to_string())
    }

    #[test]
    fn test_straight_line_code() {
        let (tree, _) = python_body("def f():\n    x = 1\n    return x\n");
        let summary = summarize(&tree.root_node(), &PYTHON_CONTROL_FLOW);
        assert_eq!(summary.cyclomatic_complexity, 1);
        assert!(!summary.has_loop);
        assert!(!summary.has_try);
        assert_eq!(summary.branch_count, 0);
    }

    #[test]
    fn test_branches_and_loops() {
        let code = r#"
def f(x):
    if x > 0:
        for i in range(x):
            pass
    elif x < 0:
        while x:
            x += 1
"#;
        let (tree, _) = python_body(code);
        let summary = summarize(&tree.root_node(), &PYTHON_CONTROL_FLOW);
        // if + elif branches, for + while loops
        assert_eq!(summary.branch_count, 2);
        assert!(summary.has_loop);
        assert_eq!(summary.cyclomatic_complexity, 1 + 2 + 2);
    }

    #[test]
    fn test_try_detection() {
        let code = "def f():\n    try:\n        pass\n    except ValueError:\n        pass\n";
        let (tree, _) = python_body(code);
        let summary = summarize(&tree.root_node(), &PYTHON_CONTROL_FLOW);
        assert!(summary.has_try);
        assert_eq!(summary.cyclomatic_complexity, 1);
    }

    #[test]
    fn test_deeply_nested_body_does_not_overflow() {
        // 2000 nested if statements would blow a recursive walker's stack
        let mut code = String::from("def f():\n");
        for depth in 0..2000 {
            let indent = "    ".repeat(depth + 1);
            code.push_str(&format!("{}if True:\n", indent));
        }
        code.push_str(&format!("{}pass\n", "    ".repeat(2001)));

        let (tree, _) = python_body(&code);
        let summary = summarize(&tree.root_node(), &PYTHON_CONTROL_FLOW);
        assert!(summary.branch_count >= 1000);
    }
}
