//! Semantic IR entities: resolved types and callable signatures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// What a type string turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFlavor {
    Primitive,
    Builtin,
    User,
    External,
    TypeVar,
    Generic,
}

/// Monotonic resolution ladder, least to most confident binding.
///
/// Once a symbol has been bound at some level, incremental runs never
/// downgrade it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeResolutionLevel {
    Raw,
    Builtin,
    Local,
    Module,
    Project,
    External,
}

/// Resolved type annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEntity {
    pub id: String,
    pub raw: String,
    pub flavor: TypeFlavor,
    pub is_nullable: bool,
    pub resolution_level: TypeResolutionLevel,
    /// Node ID of the defining declaration, when one was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_param_ids: Vec<String>,
}

/// Access control, mapped per language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
    Internal,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Public
    }
}

/// Callable interface, kept as a separate entity so interface changes are
/// detectable independently of implementation changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureEntity {
    pub id: String,
    pub owner_node_id: String,
    pub name: String,
    pub raw: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameter_type_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type_id: Option<String>,
    pub is_async: bool,
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub throws_type_ids: Vec<String>,
    /// Changes only when {name, param types, return type, async, static}
    /// change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_hash: Option<String>,
}

/// Fast lookups from structural nodes into type entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeIndex {
    pub function_to_param_type_ids: HashMap<String, Vec<String>>,
    pub function_to_return_type_id: HashMap<String, String>,
    pub variable_to_type_id: HashMap<String, String>,
}

/// Fast lookup from callable node ID to signature ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignatureIndex {
    pub function_to_signature: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_level_ordering() {
        assert!(TypeResolutionLevel::Raw < TypeResolutionLevel::Builtin);
        assert!(TypeResolutionLevel::Builtin < TypeResolutionLevel::Local);
        assert!(TypeResolutionLevel::Local < TypeResolutionLevel::Module);
        assert!(TypeResolutionLevel::Module < TypeResolutionLevel::Project);
        assert!(TypeResolutionLevel::Project < TypeResolutionLevel::External);
    }

    #[test]
    fn test_default_visibility() {
        assert_eq!(Visibility::default(), Visibility::Public);
    }
}
