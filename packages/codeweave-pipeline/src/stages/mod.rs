//! Pipeline stages.

mod cache;
mod cross_file;
mod provenance;
mod semantic;
mod structural;

pub use cache::CacheStage;
pub use cross_file::CrossFileStage;
pub use provenance::ProvenanceStage;
pub use semantic::SemanticStage;
pub use structural::StructuralStage;
