//! Shared module - common types and utilities used by every feature.

pub mod id_strategy;
pub mod models;
pub mod scope_stack;
pub mod ts;

pub use models::*;
pub use scope_stack::{ScopeKind, ScopeStack, Shadowing};
