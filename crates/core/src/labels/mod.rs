//! Human-readable cluster labels: synthesis from member tags, then global
//! de-duplication.

mod disambiguator;
mod synthesizer;

pub use disambiguator::LabelDisambiguator;
pub use synthesizer::{leaf_category, title_case, ClusterProfile, LabelSynthesizer};
