//! Semantic stage: derive type/signature indices for every document.

use async_trait::async_trait;
use codeweave_ir::SemanticIrBuilder;
use tracing::info;

use crate::context::StageContext;
use crate::protocol::{PipelineStage, StageResult};

pub struct SemanticStage {
    enabled: bool,
}

impl SemanticStage {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl PipelineStage for SemanticStage {
    fn name(&self) -> &'static str {
        "SemanticStage"
    }

    fn should_skip(&self, ctx: &StageContext) -> (bool, Option<String>) {
        if !self.enabled {
            return (true, Some("Semantic IR disabled".to_string()));
        }
        if ctx.ir_documents.is_empty() {
            return (true, Some("No IR documents to enrich".to_string()));
        }
        (false, None)
    }

    async fn run(&self, mut ctx: StageContext) -> StageResult {
        let builder = SemanticIrBuilder::new();
        let mut built = 0usize;

        for (path, doc) in &ctx.ir_documents {
            // Cached documents keep their prior derivation
            if ctx.semantic.contains_key(path) {
                continue;
            }
            ctx.semantic.insert(path.clone(), builder.build(doc));
            built += 1;
        }

        info!(built, total = ctx.semantic.len(), "semantic IR derived");
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use codeweave_ir::{generate, Language, SourceFile};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_semantic_derivation_per_document() {
        let source = SourceFile::new(
            "m.py",
            "def f(x: int) -> str:\n    return str(x)\n",
            "m",
            Language::Python,
        );
        let doc = generate("repo", &source, "snap").unwrap();

        let mut ctx = StageContext::new(Vec::new(), Arc::new(BuildConfig::default()));
        ctx.ir_documents.insert("m.py".to_string(), doc);

        let stage = SemanticStage::new(true);
        let result = stage.run(ctx).await.map_err(|f| f.error.to_string()).unwrap();

        let semantic = result.semantic.get("m.py").expect("semantic entry");
        assert!(!semantic.types.is_empty());
        assert_eq!(semantic.signatures.len(), 1);
        assert_eq!(semantic.signature_index.function_to_signature.len(), 1);
    }

    #[test]
    fn test_skip_without_documents() {
        let stage = SemanticStage::new(true);
        let (skip, _) = stage.should_skip(&StageContext::default());
        assert!(skip);
    }
}
