//! Vector store loading and row normalization.

mod loader;
mod normalize;

pub use loader::{decode_vectors, VectorStore};
pub use normalize::{normalize_rows, NormalizeOutcome};
