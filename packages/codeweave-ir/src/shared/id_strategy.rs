//! ID generation strategy.
//!
//! Dual ID system:
//! - logical ID: human-readable, the primary key
//! - stable ID: hash-based, survives file moves
//! - content hash: "same code" detection across snapshots
//!
//! All hashes are SHA-256; everything here is deterministic given the same
//! inputs, which is what makes documents byte-reproducible.

use sha2::{Digest, Sha256};

use super::models::{NodeKind, Span};

/// Generate human-readable logical ID.
///
/// Format: `{kind}:{repo_id}:{file_path}:{fqn_suffix}`
///
/// File nodes use the file path itself as the suffix; other nodes use the
/// last two `.`-separated FQN segments (e.g. `Widget.render`).
pub fn logical_id(repo_id: &str, kind: NodeKind, file_path: &str, fqn: &str) -> String {
    if kind == NodeKind::File {
        return format!("{}:{}:{}", kind.as_str(), repo_id, file_path);
    }

    let suffix = fqn_suffix(fqn);
    format!("{}:{}:{}:{}", kind.as_str(), repo_id, file_path, suffix)
}

/// Last two FQN segments, or the whole FQN when it has no dots.
fn fqn_suffix(fqn: &str) -> String {
    let parts: Vec<&str> = fqn.split('.').collect();
    if parts.len() >= 2 {
        parts[parts.len() - 2..].join(".")
    } else {
        fqn.to_string()
    }
}

/// Generate hash-based stable ID for file movement tracking.
///
/// The file path is intentionally excluded so a rename keeps the ID as long
/// as FQN, span, and content are unchanged.
///
/// Format: `stable:{16 hex chars}`
pub fn stable_id(
    repo_id: &str,
    kind: NodeKind,
    fqn: &str,
    span: Span,
    content_hash: &str,
) -> String {
    let stable_key = format!(
        "{}:{}:{}:{}-{}:{}",
        repo_id,
        kind.as_str(),
        fqn,
        span.start_line,
        span.end_line,
        content_hash
    );

    let digest = hex_sha256(stable_key.as_bytes());
    format!("stable:{}", &digest[..16])
}

/// Generate SHA-256 hash of a node's code text.
///
/// Whitespace at both ends is stripped before hashing so indentation-only
/// context shifts do not change the hash.
pub fn content_hash(code_text: &str) -> String {
    let normalized = code_text.trim();
    format!("sha256:{}", hex_sha256(normalized.as_bytes()))
}

/// Generate edge ID.
///
/// Format: `edge:{kind}:{source_suffix}→{target_suffix}@{occurrence}`
///
/// `occurrence` disambiguates repeated edges between the same endpoints
/// (e.g. a function calling another twice).
pub fn edge_id(kind: &str, source_id: &str, target_id: &str, occurrence: usize) -> String {
    let source_suffix = id_suffix(source_id);
    let target_suffix = id_suffix(target_id);

    format!(
        "edge:{}:{}→{}@{}",
        kind.to_lowercase(),
        source_suffix,
        target_suffix,
        occurrence
    )
}

fn id_suffix(id: &str) -> &str {
    id.rsplit(':').next().unwrap_or(id)
}

/// Generate type entity ID.
///
/// Format: `type:{repo_id}:{normalized_type}`, with `builtin` as the repo
/// for built-in types.
pub fn type_id(raw_type: &str, repo_id: &str, is_builtin: bool) -> String {
    let normalized: String = raw_type.chars().filter(|c| !c.is_whitespace()).collect();

    if is_builtin {
        format!("type:builtin:{}", normalized)
    } else {
        format!("type:{}:{}", repo_id, normalized)
    }
}

/// Generate signature entity ID.
///
/// Format: `sig:{owner_suffix}:{name}({params})->{return}`
pub fn signature_id(
    owner_node_id: &str,
    name: &str,
    param_types: &[String],
    return_type: Option<&str>,
) -> String {
    let owner_suffix = id_suffix(owner_node_id);

    let param_str = param_types
        .iter()
        .map(|t| simplify_type(t))
        .collect::<Vec<_>>()
        .join(",");

    let return_str = return_type.map(simplify_type).unwrap_or_else(|| "None".to_string());

    format!("sig:{}:{}({})->{}", owner_suffix, name, param_str, return_str)
}

/// Base type name without generic arguments or whitespace.
fn simplify_type(raw: &str) -> String {
    let trimmed = raw.trim();
    let base = trimmed
        .split(['[', '<'])
        .next()
        .unwrap_or(trimmed)
        .trim();
    base.to_string()
}

/// Generate signature hash for interface change detection.
///
/// Depends only on {name, param types, return type, async, static}; body
/// changes never affect it.
pub fn signature_hash(
    name: &str,
    param_types: &[String],
    return_type: Option<&str>,
    is_async: bool,
    is_static: bool,
) -> String {
    let sig_key = format!(
        "{}:params={}:return={}:async={}:static={}",
        name,
        param_types.join(","),
        return_type.unwrap_or("None"),
        is_async,
        is_static
    );

    let digest = hex_sha256(sig_key.as_bytes());
    format!("sighash:{}", &digest[..16])
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_id_file_node() {
        let id = logical_id("repo", NodeKind::File, "src/plan.py", "");
        assert_eq!(id, "file:repo:src/plan.py");
    }

    #[test]
    fn test_logical_id_method_uses_last_two_segments() {
        let id = logical_id(
            "repo",
            NodeKind::Method,
            "src/plan.py",
            "app.retriever.plan.HybridRetriever.plan",
        );
        assert_eq!(id, "method:repo:src/plan.py:HybridRetriever.plan");
    }

    #[test]
    fn test_logical_id_simple_fqn() {
        let id = logical_id("repo", NodeKind::Function, "a.py", "foo");
        assert_eq!(id, "function:repo:a.py:foo");
    }

    #[test]
    fn test_stable_id_ignores_file_path() {
        let span = Span::new(10, 0, 20, 0);
        let hash = content_hash("def f(): pass");
        let a = stable_id("repo", NodeKind::Function, "m.f", span, &hash);
        let b = stable_id("repo", NodeKind::Function, "m.f", span, &hash);
        assert_eq!(a, b);
        assert!(a.starts_with("stable:"));
        assert_eq!(a.len(), "stable:".len() + 16);
    }

    #[test]
    fn test_content_hash_strips_outer_whitespace() {
        assert_eq!(content_hash("x = 1"), content_hash("  x = 1\n"));
        assert_ne!(content_hash("x = 1"), content_hash("x = 2"));
        assert!(content_hash("x").starts_with("sha256:"));
    }

    #[test]
    fn test_edge_id_format() {
        let id = edge_id(
            "calls",
            "method:repo:a.py:Retriever.plan",
            "method:repo:a.py:Retriever._search",
            0,
        );
        assert_eq!(id, "edge:calls:Retriever.plan→Retriever._search@0");
    }

    #[test]
    fn test_edge_id_occurrence_disambiguates() {
        let a = edge_id("calls", "src", "tgt", 0);
        let b = edge_id("calls", "src", "tgt", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_type_id_builtin() {
        assert_eq!(type_id("int", "repo", true), "type:builtin:int");
        assert_eq!(
            type_id("List[ str ]", "repo", false),
            "type:repo:List[str]"
        );
    }

    #[test]
    fn test_signature_id_format() {
        let id = signature_id(
            "method:repo:a.py:Retriever.plan",
            "plan",
            &["Query".to_string(), "int".to_string()],
            Some("RetrievalPlan"),
        );
        assert_eq!(id, "sig:Retriever.plan:plan(Query,int)->RetrievalPlan");
    }

    #[test]
    fn test_signature_hash_ignores_body_but_not_params() {
        let a = signature_hash("f", &["int".to_string()], Some("str"), false, false);
        let b = signature_hash("f", &["int".to_string()], Some("str"), false, false);
        let c = signature_hash("f", &["float".to_string()], Some("str"), false, false);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("sighash:"));
    }
}
