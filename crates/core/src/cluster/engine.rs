use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ClusteringConfig;
use crate::errors::ConfigurationError;

/// Result of the best of `n_init` Lloyd runs.
#[derive(Clone, Debug, PartialEq)]
pub struct KMeansFit {
    pub assignments: Vec<usize>,
    pub centroids: Array2<f64>,
    pub inertia: f64,
    pub iterations: usize,
    /// Index of the initialization that produced this fit.
    pub run: usize,
}

impl KMeansFit {
    pub fn cluster_count(&self) -> usize {
        self.centroids.nrows()
    }

    /// Member row indices per cluster, in ascending row order.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.cluster_count()];
        for (row, &cluster) in self.assignments.iter().enumerate() {
            members[cluster].push(row);
        }
        members
    }
}

#[derive(Clone, Debug)]
pub struct ClusterEngine {
    config: ClusteringConfig,
}

impl ClusterEngine {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    /// `max(min_clusters, items / target_cluster_size)`; never re-optimized per run.
    pub fn cluster_count(&self, items: usize) -> usize {
        let by_size = items / self.config.target_cluster_size.max(1);
        self.config.min_clusters.max(by_size)
    }

    pub fn fit(
        &self,
        vectors: &Array2<f32>,
        clusters: usize,
    ) -> Result<KMeansFit, ConfigurationError> {
        let items = vectors.nrows();
        if items == 0 {
            return Err(ConfigurationError::EmptyCatalog);
        }
        if clusters == 0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "clusters",
                reason: "must be greater than zero".to_string(),
            });
        }
        if items < clusters {
            return Err(ConfigurationError::ClusterCountExceedsItems { clusters, items });
        }

        let mut best: Option<KMeansFit> = None;
        for run in 0..self.config.n_init.max(1) {
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(run as u64));
            let fit = lloyd(vectors, clusters, self.config.max_iter, &mut rng, run);
            tracing::trace!(
                event_name = "cluster.kmeans.run",
                run,
                inertia = fit.inertia,
                iterations = fit.iterations,
            );
            // Strict comparison keeps the earliest run on ties.
            if best.as_ref().map_or(true, |current| fit.inertia < current.inertia) {
                best = Some(fit);
            }
        }

        best.ok_or(ConfigurationError::EmptyCatalog)
    }
}

fn lloyd(
    vectors: &Array2<f32>,
    clusters: usize,
    max_iter: usize,
    rng: &mut StdRng,
    run: usize,
) -> KMeansFit {
    let mut centroids = seed_centroids(vectors, clusters, rng);
    let mut assignments = vec![usize::MAX; vectors.nrows()];
    let mut iterations = 0;

    while iterations < max_iter {
        iterations += 1;
        if !assign(vectors, &centroids, &mut assignments) {
            break;
        }
        update_centroids(vectors, &mut assignments, &mut centroids);
    }
    // Settle assignments against the final centroids when the iteration cap hit first.
    assign(vectors, &centroids, &mut assignments);

    let inertia = assignments
        .iter()
        .enumerate()
        .map(|(row, &cluster)| squared_distance(vectors.row(row), &centroids, cluster))
        .sum();

    KMeansFit { assignments, centroids, inertia, iterations, run }
}

/// k-means++ seeding: each next centroid is drawn with probability proportional
/// to its squared distance from the nearest centroid chosen so far.
fn seed_centroids(vectors: &Array2<f32>, clusters: usize, rng: &mut StdRng) -> Array2<f64> {
    let (items, dimensions) = vectors.dim();
    let mut centroids = Array2::<f64>::zeros((clusters, dimensions));
    let mut chosen = Vec::with_capacity(clusters);

    let first = rng.gen_range(0..items);
    copy_row(vectors, first, &mut centroids, 0);
    chosen.push(first);

    let mut nearest: Vec<f64> =
        (0..items).map(|row| squared_distance(vectors.row(row), &centroids, 0)).collect();

    for slot in 1..clusters {
        let total: f64 = nearest.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut picked = items - 1;
            for (row, weight) in nearest.iter().enumerate() {
                if *weight <= 0.0 {
                    continue;
                }
                if target < *weight {
                    picked = row;
                    break;
                }
                target -= weight;
            }
            picked
        } else {
            // Every remaining point coincides with a centroid; fall back to an unused row.
            (0..items).find(|row| !chosen.contains(row)).unwrap_or(0)
        };

        copy_row(vectors, next, &mut centroids, slot);
        chosen.push(next);
        for (row, distance) in nearest.iter_mut().enumerate() {
            let candidate = squared_distance(vectors.row(row), &centroids, slot);
            if candidate < *distance {
                *distance = candidate;
            }
        }
    }

    centroids
}

/// Assigns each row to its nearest centroid, ties to the lowest index.
/// Returns whether any assignment changed.
fn assign(vectors: &Array2<f32>, centroids: &Array2<f64>, assignments: &mut [usize]) -> bool {
    let mut changed = false;
    for (row, slot) in assignments.iter_mut().enumerate() {
        let point = vectors.row(row);
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for cluster in 0..centroids.nrows() {
            let distance = squared_distance(point, centroids, cluster);
            if distance < best_distance {
                best = cluster;
                best_distance = distance;
            }
        }
        if *slot != best {
            *slot = best;
            changed = true;
        }
    }
    changed
}

fn update_centroids(
    vectors: &Array2<f32>,
    assignments: &mut [usize],
    centroids: &mut Array2<f64>,
) {
    let clusters = centroids.nrows();
    let mut sums = Array2::<f64>::zeros(centroids.dim());
    let mut counts = vec![0usize; clusters];

    for (row, &cluster) in assignments.iter().enumerate() {
        counts[cluster] += 1;
        let mut sum = sums.row_mut(cluster);
        for (target, value) in sum.iter_mut().zip(vectors.row(row).iter()) {
            *target += f64::from(*value);
        }
    }

    for cluster in 0..clusters {
        if counts[cluster] == 0 {
            continue;
        }
        let count = counts[cluster] as f64;
        for (target, sum) in centroids.row_mut(cluster).iter_mut().zip(sums.row(cluster).iter()) {
            *target = sum / count;
        }
    }

    // Empty clusters take the point farthest from its centroid, drawn from a
    // cluster that can spare one.
    for cluster in 0..clusters {
        if counts[cluster] > 0 {
            continue;
        }
        let farthest = assignments
            .iter()
            .enumerate()
            .filter(|(_, &owner)| counts[owner] > 1)
            .map(|(row, &owner)| (row, squared_distance(vectors.row(row), centroids, owner)))
            .fold(None, |best: Option<(usize, f64)>, candidate| match best {
                Some((_, distance)) if distance >= candidate.1 => best,
                _ => Some(candidate),
            });

        if let Some((row, _)) = farthest {
            counts[assignments[row]] -= 1;
            counts[cluster] = 1;
            assignments[row] = cluster;
            copy_row(vectors, row, centroids, cluster);
        }
    }
}

fn copy_row(vectors: &Array2<f32>, row: usize, centroids: &mut Array2<f64>, slot: usize) {
    for (target, value) in centroids.row_mut(slot).iter_mut().zip(vectors.row(row).iter()) {
        *target = f64::from(*value);
    }
}

fn squared_distance(point: ArrayView1<'_, f32>, centroids: &Array2<f64>, cluster: usize) -> f64 {
    point
        .iter()
        .zip(centroids.row(cluster).iter())
        .map(|(value, centre)| (f64::from(*value) - centre).powi(2))
        .sum()
}
