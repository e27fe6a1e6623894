//! Shared models

mod document;
mod edge;
mod error;
mod node;
mod semantic;
mod span;

pub use document::{CacheStamp, IRDocument, SCHEMA_VERSION};
pub use edge::{Edge, EdgeKind};
pub use error::{CodeweaveError, ErrorKind, Result};
pub use node::{ControlFlowSummary, Node, NodeKind};
pub use semantic::{
    SignatureEntity, SignatureIndex, TypeEntity, TypeFlavor, TypeIndex, TypeResolutionLevel,
    Visibility,
};
pub use span::{Location, Span};

// Re-export serde_json::Value for convenience (used by attrs bags)
pub use serde_json::Value;

/// Node identifier type alias
pub type NodeId = String;
