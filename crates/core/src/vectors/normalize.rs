use ndarray::Array2;

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizeOutcome {
    pub vectors: Array2<f32>,
    /// Rows left as all-zero because their norm was zero or not finite.
    pub zero_norm_rows: Vec<usize>,
}

/// Scales every row to unit L2 norm so squared Euclidean distance tracks cosine distance.
pub fn normalize_rows(vectors: &Array2<f32>) -> NormalizeOutcome {
    let mut normalized = vectors.clone();
    let mut zero_norm_rows = Vec::new();

    for (index, mut row) in normalized.rows_mut().into_iter().enumerate() {
        let norm = row.iter().map(|value| f64::from(*value).powi(2)).sum::<f64>().sqrt();
        if norm > 0.0 && norm.is_finite() {
            row.mapv_inplace(|value| (f64::from(value) / norm) as f32);
        } else {
            row.fill(0.0);
            zero_norm_rows.push(index);
        }
    }

    NormalizeOutcome { vectors: normalized, zero_norm_rows }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::normalize_rows;

    #[test]
    fn rows_become_unit_length() {
        let outcome = normalize_rows(&array![[3.0_f32, 4.0], [0.0, 2.0]]);

        assert!((outcome.vectors[[0, 0]] - 0.6).abs() < 1e-6);
        assert!((outcome.vectors[[0, 1]] - 0.8).abs() < 1e-6);
        assert!((outcome.vectors[[1, 1]] - 1.0).abs() < 1e-6);
        assert!(outcome.zero_norm_rows.is_empty());
    }

    #[test]
    fn zero_rows_are_reported_not_divided() {
        let outcome = normalize_rows(&array![[0.0_f32, 0.0], [1.0, 0.0]]);

        assert_eq!(outcome.zero_norm_rows, vec![0]);
        assert!(outcome.vectors.iter().all(|value| value.is_finite()));
    }
}
