use ndarray::{Array1, ArrayView1, ArrayView2};
use rayon::prelude::*;

/// Squared Euclidean distance between two points
#[inline]
pub fn squared_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Euclidean (L2) distance between two points
#[inline]
pub fn euclidean_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    squared_distance(a, b).sqrt()
}

/// Find the centroid closest to `point`.
///
/// Returns `(index, distance)`. When several centroids are equally close the
/// lowest index wins.
pub fn nearest_centroid(point: &ArrayView1<f64>, centroids: &ArrayView2<f64>) -> (usize, f64) {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;

    for (j, centroid) in centroids.outer_iter().enumerate() {
        let dist = euclidean_distance(point, &centroid);
        if dist < best_dist {
            best_dist = dist;
            best = j;
        }
    }

    (best, best_dist)
}

/// Find the nearest centroid for every row of `data`.
///
/// Rows are processed in parallel against the same immutable set of centroids;
/// the output order matches the input order.
pub fn find_nearest_centroids(data: &ArrayView2<f64>, centroids: &ArrayView2<f64>) -> Array1<usize> {
    let labels: Vec<usize> = (0..data.nrows())
        .into_par_iter()
        .map(|i| nearest_centroid(&data.row(i), centroids).0)
        .collect();

    Array1::from(labels)
}

/// Compute centroid shift as the mean absolute per-coordinate displacement
pub fn mean_absolute_shift(old_centroids: &ArrayView2<f64>, new_centroids: &ArrayView2<f64>) -> f64 {
    let count = old_centroids.len();
    if count == 0 {
        return 0.0;
    }

    let total: f64 = old_centroids
        .iter()
        .zip(new_centroids.iter())
        .map(|(old, new)| (new - old).abs())
        .sum();

    total / count as f64
}
