//! Topic clustering over normalized embeddings.

mod document;
mod engine;
mod metrics;

pub use document::DocumentAssembler;
pub use engine::{ClusterEngine, KMeansFit};
pub use metrics::silhouette_score;
