use std::collections::HashSet;
use std::path::Path;

use ndarray::{Array2, ArrayView1};

use crate::artifacts;
use crate::domain::embedding::{EmbeddingMetadata, EmbeddingRecord, ItemMetadata};
use crate::errors::{ConfigurationError, PipelineError};

const F32_WIDTH: usize = std::mem::size_of::<f32>();

/// An `(item_count x dimension)` matrix aligned row-for-row with its metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorStore {
    items: Vec<ItemMetadata>,
    vectors: Array2<f32>,
}

impl VectorStore {
    pub fn new(items: Vec<ItemMetadata>, vectors: Array2<f32>) -> Result<Self, ConfigurationError> {
        if items.len() != vectors.nrows() {
            return Err(ConfigurationError::RowCountMismatch {
                metadata_rows: items.len(),
                vector_rows: vectors.nrows(),
            });
        }
        if let Some(id) = first_duplicate_id(&items) {
            return Err(ConfigurationError::DuplicateItemId { id });
        }
        Ok(Self { items, vectors })
    }

    /// Builds a store from in-memory records; every embedding must share one dimension.
    pub fn from_records(records: Vec<EmbeddingRecord>) -> Result<Self, ConfigurationError> {
        let dimensions = records.first().map(|record| record.embedding.len()).unwrap_or(0);
        let mut flat = Vec::with_capacity(records.len() * dimensions);
        let mut items = Vec::with_capacity(records.len());

        for record in records {
            if record.embedding.len() != dimensions {
                return Err(ConfigurationError::InvalidParameter {
                    name: "embedding",
                    reason: format!(
                        "item `{}` has dimension {}, expected {dimensions}",
                        record.metadata.id,
                        record.embedding.len()
                    ),
                });
            }
            flat.extend_from_slice(&record.embedding);
            items.push(record.metadata);
        }

        let vectors = Array2::from_shape_vec((items.len(), dimensions), flat).map_err(|error| {
            ConfigurationError::InvalidParameter { name: "embedding", reason: error.to_string() }
        })?;
        Self::new(items, vectors)
    }

    /// Reads the metadata document and the binary vector file it describes.
    pub fn load(metadata_path: &Path, vectors_path: &Path) -> Result<Self, PipelineError> {
        let metadata: EmbeddingMetadata = artifacts::read_json(metadata_path)?;
        let bytes = artifacts::read_bytes(vectors_path)?;

        if metadata.items.len() != metadata.count {
            return Err(ConfigurationError::RowCountMismatch {
                metadata_rows: metadata.items.len(),
                vector_rows: metadata.count,
            }
            .into());
        }

        let vectors = decode_vectors(&bytes, metadata.count, metadata.dimensions)?;
        tracing::info!(
            event_name = "vectors.loaded",
            items = metadata.count,
            dimensions = metadata.dimensions,
            model = metadata.model.as_deref().unwrap_or("unknown"),
            "embedding matrix loaded"
        );
        Ok(Self::new(metadata.items, vectors)?)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn items(&self) -> &[ItemMetadata] {
        &self.items
    }

    pub fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f32> {
        self.vectors.row(index)
    }
}

fn first_duplicate_id(items: &[ItemMetadata]) -> Option<String> {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().find(|item| !seen.insert(item.id.0.as_str())).map(|item| item.id.0.clone())
}

/// Decodes little-endian `f32` values, row-major, into a `(rows x dimensions)` matrix.
pub fn decode_vectors(
    bytes: &[u8],
    rows: usize,
    dimensions: usize,
) -> Result<Array2<f32>, ConfigurationError> {
    let Some(expected) = rows.checked_mul(dimensions).and_then(|count| count.checked_mul(F32_WIDTH))
    else {
        return Err(ConfigurationError::VectorByteLength {
            bytes: bytes.len(),
            expected: usize::MAX,
            rows,
            dimensions,
        });
    };
    if bytes.len() != expected {
        if dimensions > 0 && bytes.len() % (dimensions * F32_WIDTH) == 0 {
            return Err(ConfigurationError::RowCountMismatch {
                metadata_rows: rows,
                vector_rows: bytes.len() / (dimensions * F32_WIDTH),
            });
        }
        return Err(ConfigurationError::VectorByteLength {
            bytes: bytes.len(),
            expected,
            rows,
            dimensions,
        });
    }

    let values: Vec<f32> = bytes
        .chunks_exact(F32_WIDTH)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Array2::from_shape_vec((rows, dimensions), values).map_err(|error| {
        ConfigurationError::InvalidParameter { name: "dimensions", reason: error.to_string() }
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use ndarray::Array2;
    use serde_json::json;
    use tempfile::TempDir;

    use super::{decode_vectors, VectorStore};
    use crate::domain::embedding::{ItemId, ItemMetadata};
    use crate::errors::{ConfigurationError, PipelineError};

    fn encode(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|value| value.to_le_bytes()).collect()
    }

    #[test]
    fn decodes_row_major_matrix() {
        let bytes = encode(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let matrix = decode_vectors(&bytes, 2, 3).expect("decode");

        assert_eq!(matrix.shape(), &[2, 3]);
        assert_eq!(matrix[[0, 2]], 3.0);
        assert_eq!(matrix[[1, 0]], 4.0);
    }

    #[test]
    fn whole_row_shortfall_is_a_row_count_mismatch() {
        let bytes = encode(&[1.0, 2.0, 3.0]);
        let error = decode_vectors(&bytes, 2, 3).expect_err("too few rows");

        assert_eq!(
            error,
            ConfigurationError::RowCountMismatch { metadata_rows: 2, vector_rows: 1 }
        );
    }

    #[test]
    fn ragged_byte_length_is_reported() {
        let error = decode_vectors(&[0u8; 7], 1, 2).expect_err("ragged");
        assert!(matches!(error, ConfigurationError::VectorByteLength { bytes: 7, .. }));
    }

    #[test]
    fn oversized_shape_is_a_byte_length_error() {
        let error = decode_vectors(&[0u8; 8], usize::MAX / 2, 3).expect_err("overflow");
        assert!(matches!(error, ConfigurationError::VectorByteLength { bytes: 8, .. }));
    }

    #[test]
    fn duplicate_item_ids_are_rejected() {
        let items = ["dup", "a", "dup", "b"]
            .iter()
            .map(|id| ItemMetadata {
                id: ItemId((*id).to_owned()),
                item_type: None,
                name: None,
                category: String::new(),
                topic_tags: String::new(),
            })
            .collect();

        let error = VectorStore::new(items, Array2::zeros((4, 2))).expect_err("duplicate ids");
        assert_eq!(error, ConfigurationError::DuplicateItemId { id: "dup".to_owned() });
    }

    #[test]
    fn load_pairs_metadata_with_vectors() {
        let dir = TempDir::new().expect("tempdir");
        let metadata_path = dir.path().join("search-metadata.json");
        let vectors_path = dir.path().join("search-embeddings.bin");
        fs::write(
            &metadata_path,
            json!({
                "dimensions": 2,
                "count": 2,
                "items": [
                    {"id": "package-a", "category": "Causal", "topic_tags": "dag"},
                    {"id": "package-b", "category": "Pricing", "topic_tags": "auctions"}
                ]
            })
            .to_string(),
        )
        .expect("metadata");
        fs::write(&vectors_path, encode(&[0.6, 0.8, 1.0, 0.0])).expect("vectors");

        let store = VectorStore::load(&metadata_path, &vectors_path).expect("load");
        assert_eq!(store.len(), 2);
        assert_eq!(store.dimensions(), 2);
        assert_eq!(store.items()[1].id.0, "package-b");
        assert_eq!(store.row(0)[1], 0.8);
    }

    #[test]
    fn load_rejects_metadata_count_disagreement() {
        let dir = TempDir::new().expect("tempdir");
        let metadata_path = dir.path().join("search-metadata.json");
        let vectors_path = dir.path().join("search-embeddings.bin");
        fs::write(
            &metadata_path,
            json!({"dimensions": 2, "count": 3, "items": [{"id": "only-one"}]}).to_string(),
        )
        .expect("metadata");
        fs::write(&vectors_path, encode(&[0.0; 6])).expect("vectors");

        let error = VectorStore::load(&metadata_path, &vectors_path).expect_err("mismatch");
        assert!(matches!(
            error,
            PipelineError::Configuration(ConfigurationError::RowCountMismatch { .. })
        ));
    }
}
