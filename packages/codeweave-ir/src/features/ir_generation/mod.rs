//! Structural IR generation.
//!
//! One walker per supported language turns a parsed file into an
//! IRDocument. All walkers share the emitter (IDs, scopes, shadowing,
//! validation) and the control-flow summarizer; language semantics live in
//! the walker files.

pub mod builder;
pub mod control_flow;
pub mod java;
pub mod python;
pub mod typescript;

pub use builder::IrEmitter;
pub use control_flow::{
    summarize, ControlFlowTypes, JAVA_CONTROL_FLOW, PYTHON_CONTROL_FLOW, TYPESCRIPT_CONTROL_FLOW,
};
pub use java::JavaWalker;
pub use python::PythonWalker;
pub use typescript::TypeScriptWalker;

use crate::features::parsing::{Language, SourceFile};
use crate::shared::models::{IRDocument, Result};

/// Generate structural IR for a source file, dispatching on language.
pub fn generate(repo_id: &str, source: &SourceFile, snapshot_id: &str) -> Result<IRDocument> {
    match source.language {
        Language::Python => PythonWalker::new(repo_id).generate(source, snapshot_id),
        Language::Java => JavaWalker::new(repo_id).generate(source, snapshot_id),
        Language::TypeScript => TypeScriptWalker::new(repo_id).generate(source, snapshot_id),
    }
}
