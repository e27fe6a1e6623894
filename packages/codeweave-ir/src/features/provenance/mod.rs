//! Provenance fingerprints.
//!
//! Deterministic file- and function-level hashes for change detection:
//! same normalized text → same hash, cross-run and cross-platform. The
//! normalization set is configurable so operators can trade stability for
//! fidelity.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use blake2::Blake2b512;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::shared::models::{CodeweaveError, IRDocument, NodeKind, Result};
use crate::shared::ts::span_text;

/// Streaming chunk size for file hashing.
const HASH_CHUNK_SIZE: usize = 8 * 1024;

static LINE_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(#|//).*$").expect("valid comment regex"));
static BLOCK_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid block comment regex"));
static TRIPLE_DQUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)""".*?""""#).expect("valid docstring regex"));
static TRIPLE_SQUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)'''.*?'''").expect("valid docstring regex"));
static WHITESPACE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+").expect("valid whitespace regex"));

/// Hash algorithm for provenance fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    Blake2b,
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Sha256
    }
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Blake2b => "blake2b",
        }
    }
}

/// Normalization knobs for function hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintConfig {
    pub hash_algorithm: HashAlgorithm,
    /// Keep comments in the hashed text (makes fingerprints unstable under
    /// comment edits).
    pub include_comments: bool,
    pub include_docstrings: bool,
    /// Collapse whitespace runs and strip trailing whitespace per line.
    pub normalize_whitespace: bool,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::Sha256,
            include_comments: false,
            include_docstrings: true,
            normalize_whitespace: true,
        }
    }
}

/// Fingerprints for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceData {
    pub file_path: String,
    /// Hash of the raw file bytes.
    pub file_hash: String,
    /// FQN → fingerprint for Class/Method/Function nodes.
    pub function_hashes: BTreeMap<String, String>,
    pub hash_algorithm: String,
}

pub struct FingerprintBuilder {
    config: FingerprintConfig,
}

impl FingerprintBuilder {
    pub fn new(config: FingerprintConfig) -> Self {
        Self { config }
    }

    /// Compute provenance for one document, reading the file for its raw
    /// bytes and node body extraction.
    pub fn compute(&self, doc: &IRDocument) -> Result<ProvenanceData> {
        let path = Path::new(&doc.file_path);
        let file_hash = self.hash_file(path)?;

        let content = std::fs::read_to_string(path)
            .map_err(|e| CodeweaveError::from(e).with_file(&doc.file_path))?;

        Ok(self.compute_with_content(doc, &file_hash, &content))
    }

    /// Compute provenance with already-loaded content (no I/O).
    pub fn compute_with_content(
        &self,
        doc: &IRDocument,
        file_hash: &str,
        content: &str,
    ) -> ProvenanceData {
        let mut function_hashes = BTreeMap::new();

        for node in &doc.nodes {
            if !matches!(node.kind, NodeKind::Class | NodeKind::Method | NodeKind::Function) {
                continue;
            }
            let text = span_text(&node.span, content);
            if text.is_empty() {
                continue;
            }
            function_hashes.insert(node.fqn.clone(), self.hash_function_text(&text));
        }

        ProvenanceData {
            file_path: doc.file_path.clone(),
            file_hash: file_hash.to_string(),
            function_hashes,
            hash_algorithm: self.config.hash_algorithm.as_str().to_string(),
        }
    }

    /// Hash raw file bytes in fixed-size chunks.
    pub fn hash_file(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path)
            .map_err(|e| CodeweaveError::from(e).with_file(path.display().to_string()))?;

        let mut buffer = [0u8; HASH_CHUNK_SIZE];
        match self.config.hash_algorithm {
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                loop {
                    let read = file.read(&mut buffer)?;
                    if read == 0 {
                        break;
                    }
                    hasher.update(&buffer[..read]);
                }
                Ok(format!("{:x}", hasher.finalize()))
            }
            HashAlgorithm::Blake2b => {
                let mut hasher = Blake2b512::new();
                loop {
                    let read = file.read(&mut buffer)?;
                    if read == 0 {
                        break;
                    }
                    hasher.update(&buffer[..read]);
                }
                Ok(format!("{:x}", hasher.finalize()))
            }
        }
    }

    /// Normalize then hash a function body.
    pub fn hash_function_text(&self, text: &str) -> String {
        let normalized = self.normalize(text);
        match self.config.hash_algorithm {
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(normalized.as_bytes());
                format!("{:x}", hasher.finalize())
            }
            HashAlgorithm::Blake2b => {
                let mut hasher = Blake2b512::new();
                hasher.update(normalized.as_bytes());
                format!("{:x}", hasher.finalize())
            }
        }
    }

    fn normalize(&self, text: &str) -> String {
        let mut content = text.to_string();

        if !self.config.include_docstrings {
            content = TRIPLE_DQUOTE_RE.replace_all(&content, "").to_string();
            content = TRIPLE_SQUOTE_RE.replace_all(&content, "").to_string();
        }

        if !self.config.include_comments {
            content = BLOCK_COMMENT_RE.replace_all(&content, "").to_string();
            content = LINE_COMMENT_RE.replace_all(&content, "").to_string();
        }

        if self.config.normalize_whitespace {
            content = WHITESPACE_RUN_RE.replace_all(&content, " ").to_string();
            content = content
                .lines()
                .map(str::trim_end)
                .collect::<Vec<_>>()
                .join("\n");
        }

        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ir_generation::PythonWalker;
    use crate::features::parsing::{Language, SourceFile};
    use std::io::Write;

    fn builder() -> FingerprintBuilder {
        FingerprintBuilder::new(FingerprintConfig::default())
    }

    #[test]
    fn test_whitespace_reformatting_stable() {
        let b = builder();
        let a = b.hash_function_text("def f(x):\n    return x + 1");
        let c = b.hash_function_text("def f(x):\n    return x  +  1   ");
        assert_eq!(a, c);
    }

    #[test]
    fn test_comment_changes_stable_by_default() {
        let b = builder();
        let a = b.hash_function_text("def f(x):\n    return x  # add one");
        let c = b.hash_function_text("def f(x):\n    return x  # increment");
        assert_eq!(a, c);
    }

    #[test]
    fn test_comments_included_when_configured() {
        let b = FingerprintBuilder::new(FingerprintConfig {
            include_comments: true,
            ..Default::default()
        });
        let a = b.hash_function_text("def f(x):\n    return x  # add one");
        let c = b.hash_function_text("def f(x):\n    return x  # increment");
        assert_ne!(a, c);
    }

    #[test]
    fn test_body_change_changes_hash() {
        let b = builder();
        let a = b.hash_function_text("def f(x):\n    return x + 1");
        let c = b.hash_function_text("def f(x):\n    return x + 2");
        assert_ne!(a, c);
    }

    #[test]
    fn test_algorithms_produce_distinct_hashes() {
        let sha = builder();
        let blake = FingerprintBuilder::new(FingerprintConfig {
            hash_algorithm: HashAlgorithm::Blake2b,
            ..Default::default()
        });
        assert_ne!(
            sha.hash_function_text("def f(): pass"),
            blake.hash_function_text("def f(): pass")
        );
    }

    #[test]
    fn test_file_hash_streaming() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        // Bigger than one chunk so the streaming path is exercised
        let payload = "x".repeat(HASH_CHUNK_SIZE * 3 + 17);
        tmp.write_all(payload.as_bytes()).unwrap();

        let b = builder();
        let h1 = b.hash_file(tmp.path()).unwrap();
        let h2 = b.hash_file(tmp.path()).unwrap();
        assert_eq!(h1, h2);

        // Matches a one-shot hash of the same bytes
        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());
        assert_eq!(h1, format!("{:x}", hasher.finalize()));
    }

    #[test]
    fn test_function_hashes_keyed_by_fqn() {
        let code = "class A:\n    def f(self):\n        return 1\n\ndef g():\n    return 2\n";
        let source = SourceFile::new("m.py", code, "m", Language::Python);
        let doc = PythonWalker::new("repo").generate(&source, "snap").unwrap();

        let b = builder();
        let data = b.compute_with_content(&doc, "filehash", code);

        assert!(data.function_hashes.contains_key("m.A"));
        assert!(data.function_hashes.contains_key("m.A.f"));
        assert!(data.function_hashes.contains_key("m.g"));
        assert_eq!(data.hash_algorithm, "sha256");
    }
}
