use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::FactorizationConfig;
use crate::engagement::matrix::InteractionMatrix;
use crate::errors::ConfigurationError;

const INIT_SCALE: f64 = 0.01;

/// Latent factors learned from the item x session transpose.
#[derive(Clone, Debug, PartialEq)]
pub struct FactorModel {
    pub item_factors: Array2<f64>,
    pub session_factors: Array2<f64>,
}

impl FactorModel {
    pub fn factors(&self) -> usize {
        self.item_factors.ncols()
    }

}

/// Implicit-feedback alternating least squares. Each observed cell with value
/// `r` has preference 1 and confidence `1 + alpha * r`; unobserved cells have
/// preference 0 and confidence 1.
#[derive(Clone, Debug)]
pub struct AlternatingLeastSquares {
    max_factors: usize,
    min_factors: usize,
    regularization: f64,
    iterations: usize,
    alpha: f64,
    seed: u64,
}

impl AlternatingLeastSquares {
    pub fn new(config: &FactorizationConfig) -> Self {
        Self {
            max_factors: config.max_factors,
            min_factors: config.min_factors,
            regularization: config.regularization,
            iterations: config.iterations,
            alpha: config.alpha,
            seed: config.seed,
        }
    }

    /// `min(max_factors, min(sessions, items) - 1)`, floored at `min_factors`.
    pub fn factor_count(&self, sessions: usize, items: usize) -> usize {
        let bounded = self.max_factors.min(sessions.min(items).saturating_sub(1));
        bounded.max(self.min_factors)
    }

    pub fn fit(&self, matrix: &InteractionMatrix) -> Result<FactorModel, ConfigurationError> {
        let (sessions, items) = matrix.shape();
        let factors = self.factor_count(sessions, items);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut item_factors = random_factors(items, factors, &mut rng);
        let mut session_factors = random_factors(sessions, factors, &mut rng);

        let item_rows = matrix.item_rows();
        let session_rows = matrix.session_rows();

        for iteration in 0..self.iterations {
            self.solve_all(&mut item_factors, &session_factors, &item_rows)?;
            self.solve_all(&mut session_factors, &item_factors, &session_rows)?;
            tracing::trace!(event_name = "engagement.als.iteration", iteration);
        }

        tracing::info!(
            event_name = "engagement.als.fitted",
            factors,
            iterations = self.iterations,
            items,
            sessions,
            "factor model trained"
        );
        Ok(FactorModel { item_factors, session_factors })
    }

    /// Recomputes every row of `target` against the fixed `fixed` factors.
    fn solve_all(
        &self,
        target: &mut Array2<f64>,
        fixed: &Array2<f64>,
        observations: &[Vec<(usize, f64)>],
    ) -> Result<(), ConfigurationError> {
        let factors = fixed.ncols();
        let gram = fixed.t().dot(fixed);

        for (row, observed) in observations.iter().enumerate() {
            let mut system = gram.clone();
            for diagonal in 0..factors {
                system[[diagonal, diagonal]] += self.regularization;
            }
            let mut rhs = Array1::<f64>::zeros(factors);

            for &(column, value) in observed {
                let confidence = 1.0 + self.alpha * value;
                let y = fixed.row(column);
                for i in 0..factors {
                    rhs[i] += confidence * y[i];
                    for j in 0..factors {
                        system[[i, j]] += (confidence - 1.0) * y[i] * y[j];
                    }
                }
            }

            let solution = cholesky_solve(system, rhs).ok_or_else(|| {
                ConfigurationError::InvalidParameter {
                    name: "regularization",
                    reason: "normal equations are not positive definite".to_string(),
                }
            })?;
            target.row_mut(row).assign(&solution);
        }
        Ok(())
    }
}

fn random_factors(rows: usize, factors: usize, rng: &mut StdRng) -> Array2<f64> {
    Array2::from_shape_fn((rows, factors), |_| rng.gen::<f64>() * INIT_SCALE)
}

/// Solves `a x = b` for symmetric positive definite `a`. Returns `None` when a
/// pivot is not strictly positive.
fn cholesky_solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();

    for j in 0..n {
        let mut pivot = a[[j, j]];
        for k in 0..j {
            pivot -= a[[j, k]] * a[[j, k]];
        }
        if pivot <= 0.0 || !pivot.is_finite() {
            return None;
        }
        let pivot = pivot.sqrt();
        a[[j, j]] = pivot;
        for i in (j + 1)..n {
            let mut value = a[[i, j]];
            for k in 0..j {
                value -= a[[i, k]] * a[[j, k]];
            }
            a[[i, j]] = value / pivot;
        }
    }

    // Forward substitution with L, then back substitution with L^T.
    for i in 0..n {
        let mut value = b[i];
        for k in 0..i {
            value -= a[[i, k]] * b[k];
        }
        b[i] = value / a[[i, i]];
    }
    for i in (0..n).rev() {
        let mut value = b[i];
        for k in (i + 1)..n {
            value -= a[[k, i]] * b[k];
        }
        b[i] = value / a[[i, i]];
    }

    Some(b)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::{cholesky_solve, AlternatingLeastSquares};
    use crate::config::FactorizationConfig;
    use crate::domain::interaction::DwellEvent;
    use crate::engagement::matrix::MatrixBuilder;
    use crate::quality::QualityReport;

    fn als() -> AlternatingLeastSquares {
        AlternatingLeastSquares::new(&FactorizationConfig::default())
    }

    #[test]
    fn factor_count_is_bounded_on_both_sides() {
        let als = als();
        assert_eq!(als.factor_count(2, 2), 5);
        assert_eq!(als.factor_count(20, 12), 11);
        assert_eq!(als.factor_count(500, 900), 32);
        assert_eq!(als.factor_count(0, 0), 5);
    }

    #[test]
    fn cholesky_recovers_known_solution() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let x = cholesky_solve(a, b).expect("positive definite");

        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
    }

    #[test]
    fn cholesky_rejects_indefinite_systems() {
        let a = array![[0.0, 1.0], [1.0, 0.0]];
        assert_eq!(cholesky_solve(a, array![1.0, 1.0]), None);
    }

    #[test]
    fn fit_is_deterministic_and_finite() {
        let events: Vec<DwellEvent> = [
            ("s1", "a", 4_000),
            ("s1", "b", 3_000),
            ("s2", "a", 5_000),
            ("s2", "b", 2_000),
            ("s3", "c", 6_000),
            ("s4", "c", 1_000),
        ]
        .into_iter()
        .map(|(session, name, dwell_ms)| DwellEvent {
            session_id: Some(session.to_owned()),
            name: Some(name.to_owned()),
            dwell_ms,
        })
        .collect();
        let matrix = MatrixBuilder::new(&FactorizationConfig::default())
            .build(&events, &[], &mut QualityReport::new())
            .expect("matrix");

        let left = als().fit(&matrix).expect("fit");
        let right = als().fit(&matrix).expect("fit");

        assert_eq!(left, right);
        assert_eq!(left.item_factors.dim(), (3, 5));
        assert_eq!(left.session_factors.dim(), (4, 5));
        assert!(left.item_factors.iter().all(|value| value.is_finite()));
    }
}
