use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

/// Mean silhouette coefficient over a seeded sample of at most `sample_size` rows.
///
/// Returns `None` when fewer than two clusters are populated in the sample, where
/// the coefficient is undefined.
pub fn silhouette_score(
    vectors: &Array2<f32>,
    assignments: &[usize],
    sample_size: usize,
    seed: u64,
) -> Option<f64> {
    let items = vectors.nrows().min(assignments.len());
    if items < 2 || sample_size < 2 {
        return None;
    }

    let mut sample: Vec<usize> = if items > sample_size {
        let mut rng = StdRng::seed_from_u64(seed);
        index::sample(&mut rng, items, sample_size).into_vec()
    } else {
        (0..items).collect()
    };
    sample.sort_unstable();

    let clusters = sample.iter().map(|&row| assignments[row]).max()? + 1;
    let mut populated = vec![0usize; clusters];
    for &row in &sample {
        populated[assignments[row]] += 1;
    }
    if populated.iter().filter(|&&count| count > 0).count() < 2 {
        return None;
    }

    let mut total = 0.0;
    for &row in &sample {
        let own = assignments[row];
        let mut sums = vec![0.0_f64; clusters];
        for &other in &sample {
            if other != row {
                sums[assignments[other]] += distance(vectors, row, other);
            }
        }

        if populated[own] <= 1 {
            continue;
        }
        let a = sums[own] / (populated[own] - 1) as f64;
        let b = (0..clusters)
            .filter(|&cluster| cluster != own && populated[cluster] > 0)
            .map(|cluster| sums[cluster] / populated[cluster] as f64)
            .fold(f64::INFINITY, f64::min);

        let scale = a.max(b);
        if scale > 0.0 {
            total += (b - a) / scale;
        }
    }

    Some(total / sample.len() as f64)
}

fn distance(vectors: &Array2<f32>, left: usize, right: usize) -> f64 {
    vectors
        .row(left)
        .iter()
        .zip(vectors.row(right).iter())
        .map(|(a, b)| (f64::from(*a) - f64::from(*b)).powi(2))
        .sum::<f64>()
        .sqrt()
}
