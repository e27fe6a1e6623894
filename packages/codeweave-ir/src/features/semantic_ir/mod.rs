//! Semantic IR builder.
//!
//! Pure derivation over a structural document: deduplicated type entities,
//! signature entities, and the lookup indices downstream consumers use.
//! Rebuildable from the document at any time.

use std::collections::BTreeMap;

use crate::shared::models::{
    IRDocument, NodeKind, SignatureEntity, SignatureIndex, TypeEntity, TypeIndex,
};

/// Output of a semantic build for one document.
#[derive(Debug, Clone, Default)]
pub struct SemanticIr {
    pub types: Vec<TypeEntity>,
    pub signatures: Vec<SignatureEntity>,
    pub type_index: TypeIndex,
    pub signature_index: SignatureIndex,
}

pub struct SemanticIrBuilder;

impl SemanticIrBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build semantic IR from a structural document.
    pub fn build(&self, doc: &IRDocument) -> SemanticIr {
        // Types deduplicated by ID, in ID order
        let mut types: BTreeMap<String, TypeEntity> = BTreeMap::new();
        for entity in &doc.types {
            types.entry(entity.id.clone()).or_insert_with(|| entity.clone());
        }

        let signatures = doc.signatures.clone();

        let mut type_index = TypeIndex::default();
        let mut signature_index = SignatureIndex::default();

        for node in &doc.nodes {
            match node.kind {
                NodeKind::Function | NodeKind::Method | NodeKind::Lambda => {
                    let Some(sig_id) = node.signature_id.as_ref() else {
                        continue;
                    };
                    signature_index
                        .function_to_signature
                        .insert(node.id.clone(), sig_id.clone());

                    let Some(signature) = signatures.iter().find(|s| &s.id == sig_id) else {
                        continue;
                    };
                    if !signature.parameter_type_ids.is_empty() {
                        type_index
                            .function_to_param_type_ids
                            .insert(node.id.clone(), signature.parameter_type_ids.clone());
                    }
                    if let Some(return_type_id) = &signature.return_type_id {
                        type_index
                            .function_to_return_type_id
                            .insert(node.id.clone(), return_type_id.clone());
                    }
                }
                NodeKind::Variable | NodeKind::Parameter | NodeKind::Field => {
                    if let Some(type_id) = &node.declared_type_id {
                        type_index
                            .variable_to_type_id
                            .insert(node.id.clone(), type_id.clone());
                    }
                }
                _ => {}
            }
        }

        SemanticIr {
            types: types.into_values().collect(),
            signatures,
            type_index,
            signature_index,
        }
    }
}

impl Default for SemanticIrBuilder {
    fn default() -> Self {
        Self::new()
    }
}
