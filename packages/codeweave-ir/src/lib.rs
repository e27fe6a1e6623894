//! codeweave-ir — IR construction core.
//!
//! Multi-language structural IR (nodes + edges) with semantic enrichment
//! (types, signatures, control-flow summaries), cross-file symbol
//! resolution, and provenance fingerprints. The async stage pipeline that
//! drives this crate lives in `codeweave-pipeline`.

pub mod features;
pub mod shared;
pub mod wire;

// Re-exports for convenience
pub use features::cross_file::{
    build_global_context, update_global_context, GlobalContext, GlobalStats, Symbol,
};
pub use features::ir_generation::{generate, JavaWalker, PythonWalker, TypeScriptWalker};
pub use features::parsing::{Language, SourceFile};
pub use features::provenance::{
    FingerprintBuilder, FingerprintConfig, HashAlgorithm, ProvenanceData,
};
pub use features::semantic_ir::{SemanticIr, SemanticIrBuilder};
pub use features::type_resolution::TypeResolver;
pub use shared::models::{
    CacheStamp, CodeweaveError, ControlFlowSummary, Edge, EdgeKind, ErrorKind, IRDocument, Node,
    NodeId, NodeKind, Result, SignatureEntity, SignatureIndex, Span, TypeEntity, TypeIndex,
    TypeResolutionLevel, Visibility, SCHEMA_VERSION,
};
