//! Fit K-Means and a Gaussian mixture to three synthetic blobs
//!
//! Run with: cargo run --example blobs --release
//! Add `RUST_LOG=debug` to see every iteration.

use emcluster_rs::{GaussianMixture, GmmConfig, InitMethod, KMeansConfig, ModelSelector};
use ndarray::Array2;
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== emcluster-rs blobs ===\n");

    let per_blob = 100;
    let n_clusters = 3;
    let centers = [[-5.0, -5.0], [0.0, 5.0], [5.0, -5.0]];
    let n_samples = per_blob * centers.len();

    // Blob i gets a different spread along x and y
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut data = Array2::random_using((n_samples, 2), Normal::new(0.0, 1.0)?, &mut rng);
    for (i, mut row) in data.outer_iter_mut().enumerate() {
        let blob = i / per_blob;
        row[0] = centers[blob][0] + row[0] * (1.0 + 0.5 * blob as f64);
        row[1] = centers[blob][1] + row[1];
    }

    println!("True cluster centers:");
    for (i, center) in centers.iter().enumerate() {
        println!("  Cluster {}: ({:.2}, {:.2})", i, center[0], center[1]);
    }
    println!();

    // K-Means, best of 10 k-means++ runs
    let config = KMeansConfig::new(n_clusters)
        .with_tol(1e-6)
        .with_seed(7)
        .with_init(InitMethod::KMeansPlusPlus);
    let selection = ModelSelector::new(config, 10).run(&data.view())?;
    let kmeans = &selection.best;

    println!("K-Means (best of {} runs, run {}):", selection.runs.len(), selection.best_run);
    let sizes = kmeans.cluster_sizes();
    for i in 0..kmeans.k() {
        let c = kmeans.centroids().row(i);
        println!(
            "  Centroid {}: ({:.4}, {:.4})  {} samples, radius {:.3}",
            i,
            c[0],
            c[1],
            sizes[i],
            kmeans.radius(i)?
        );
    }
    println!("  Sum of distances: {:.4}\n", kmeans.quality());

    // GMM
    let mut gmm = GaussianMixture::with_config(
        GmmConfig::new(n_clusters)
            .with_seed(7)
            .with_max_iters(300)
            .with_tol(1e-6),
    );
    let model = gmm.fit(&data.view())?;

    println!(
        "GMM ({:?} after {} iterations, log-likelihood {:.4}):",
        model.termination(),
        model.n_iterations(),
        model.log_likelihood()
    );
    for c in 0..model.k() {
        let ellipse = model.ellipse(c, 2.0)?;
        println!(
            "  Component {}: weight {:.3}, mean ({:.4}, {:.4}), 2-sigma ellipse {:.2} x {:.2} at {:.1} deg",
            c,
            model.weights()[c],
            ellipse.center[0],
            ellipse.center[1],
            ellipse.width,
            ellipse.height,
            ellipse.angle_degrees
        );
    }
    println!();

    let labels = model.predict(&data.view())?;
    let proba = model.predict_proba(&data.view())?;
    println!("First 5 sample assignments:");
    for i in (0..n_samples).step_by(per_blob / 2).take(5) {
        println!(
            "  Sample {} at ({:.2}, {:.2}) -> Component {} (p = {:.3})",
            i,
            data[[i, 0]],
            data[[i, 1]],
            labels[i],
            proba[[i, labels[i]]]
        );
    }

    println!("\n=== Done! ===");
    Ok(())
}
