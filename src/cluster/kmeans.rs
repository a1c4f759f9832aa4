// Lloyd's k-means with k-means++ seeding.
//
// Deterministic for a given seed. Card counts are small (tens to a few
// hundred), so a plain dense implementation is plenty.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fixed seed so the same cards always land in the same clusters.
pub const KMEANS_SEED: u64 = 42;

pub const MAX_ITERATIONS: usize = 300;

/// Stop once total centroid movement drops below this.
pub const TOLERANCE: f64 = 1e-4;

/// Partition `vectors` into `k` groups, returning one label in `[0, k)` per
/// vector.
///
/// All vectors must share one dimensionality. When there are fewer distinct
/// vectors than `k`, some labels may go unused.
pub fn kmeans(vectors: &[Vec<f64>], k: usize, seed: u64) -> Vec<usize> {
    let n = vectors.len();
    if n == 0 || k == 0 {
        return Vec::new();
    }
    let k = k.min(n);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = seed_centroids(vectors, k, &mut rng);
    let mut labels = vec![0; n];

    for _ in 0..MAX_ITERATIONS {
        for (label, v) in labels.iter_mut().zip(vectors) {
            *label = nearest(v, &centroids).0;
        }

        let mut next = recompute_centroids(vectors, &labels, k, &centroids);
        reseed_empty(vectors, &mut labels, &mut next);

        let shift: f64 = centroids
            .iter()
            .zip(&next)
            .map(|(a, b)| squared_distance(a, b).sqrt())
            .sum();
        centroids = next;

        if shift < TOLERANCE {
            break;
        }
    }

    labels
}

/// k-means++: each new centroid is drawn with probability proportional to
/// its squared distance from the closest existing one.
fn seed_centroids(vectors: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(vectors[rng.random_range(0..vectors.len())].clone());

    while centroids.len() < k {
        let weights: Vec<f64> = vectors.iter().map(|v| nearest(v, &centroids).1).collect();
        let total: f64 = weights.iter().sum();

        let pick = if total <= 0.0 {
            // Every point coincides with a centroid already.
            rng.random_range(0..vectors.len())
        } else {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = vectors.len() - 1;
            for (i, w) in weights.iter().enumerate() {
                if target < *w {
                    chosen = i;
                    break;
                }
                target -= w;
            }
            chosen
        };
        centroids.push(vectors[pick].clone());
    }

    centroids
}

/// Mean of each cluster. An empty cluster keeps its previous centroid until
/// `reseed_empty` moves it.
fn recompute_centroids(
    vectors: &[Vec<f64>],
    labels: &[usize],
    k: usize,
    previous: &[Vec<f64>],
) -> Vec<Vec<f64>> {
    let dim = vectors[0].len();
    let mut sums = vec![vec![0.0; dim]; k];
    let mut counts = vec![0usize; k];

    for (v, &label) in vectors.iter().zip(labels) {
        counts[label] += 1;
        for (s, x) in sums[label].iter_mut().zip(v) {
            *s += x;
        }
    }

    sums.into_iter()
        .zip(counts)
        .enumerate()
        .map(|(i, (mut sum, count))| {
            if count == 0 {
                return previous[i].clone();
            }
            for s in &mut sum {
                *s /= count as f64;
            }
            sum
        })
        .collect()
}

/// Give each empty cluster the point farthest from its own centroid, taken
/// from a cluster that can spare one.
fn reseed_empty(vectors: &[Vec<f64>], labels: &mut [usize], centroids: &mut [Vec<f64>]) {
    for empty in 0..centroids.len() {
        let mut counts = vec![0usize; centroids.len()];
        for &label in labels.iter() {
            counts[label] += 1;
        }
        if counts[empty] > 0 {
            continue;
        }

        let farthest = vectors
            .iter()
            .enumerate()
            .filter(|(i, _)| counts[labels[*i]] > 1)
            .map(|(i, v)| (i, squared_distance(v, &centroids[labels[i]])))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        if let Some((i, dist)) = farthest {
            if dist > 0.0 {
                labels[i] = empty;
                centroids[empty] = vectors[i].clone();
            }
        }
    }
}

/// Index of the closest centroid and the squared distance to it. Ties go to
/// the lower index.
fn nearest(v: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(v, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
