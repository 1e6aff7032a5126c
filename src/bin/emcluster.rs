//! Fit K-Means (best of several runs) and a Gaussian mixture to a point file.
//!
//! The input is either a `.npy` matrix of `f64` or a text file with one
//! comma-separated point per line. Results are printed and the centroids,
//! means and GMM labels are saved next to `<output_prefix>`.
//!
//! Usage: `emcluster <input.(npy|txt|csv)> <output_prefix> <k> [seed] [runs]`
//!
//! Set `RUST_LOG=debug` to follow individual iterations.

use emcluster_rs::{GaussianMixture, GmmConfig, KMeansConfig, ModelSelector};
use ndarray::{Array1, Array2};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use std::env;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn load_points(path: &Path) -> Result<Array2<f64>, Box<dyn std::error::Error>> {
    if path.extension().is_some_and(|ext| ext == "npy") {
        let reader = BufReader::new(File::open(path)?);
        return Ok(Array2::read_npy(reader)?);
    }

    let text = fs::read_to_string(path)?;
    let mut values = Vec::new();
    let mut n_rows = 0;
    let mut n_cols = None;

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row = line
            .split(',')
            .map(|field| field.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("line {}: {}", line_no + 1, e))?;

        match n_cols {
            None => n_cols = Some(row.len()),
            Some(cols) if cols != row.len() => {
                return Err(format!(
                    "line {}: expected {} values, found {}",
                    line_no + 1,
                    cols,
                    row.len()
                )
                .into());
            }
            Some(_) => {}
        }
        values.extend(row);
        n_rows += 1;
    }

    Ok(Array2::from_shape_vec((n_rows, n_cols.unwrap_or(0)), values)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if !(4..=6).contains(&args.len()) {
        eprintln!(
            "Usage: {} <input.(npy|txt|csv)> <output_prefix> <k> [seed] [runs]",
            args[0]
        );
        std::process::exit(1);
    }

    let input_path = Path::new(&args[1]);
    let output_prefix = &args[2];
    let k: usize = args[3].parse()?;
    let seed: u64 = args.get(4).map(|s| s.parse::<u64>()).transpose()?.unwrap_or(0);
    let runs: usize = args.get(5).map(|s| s.parse::<usize>()).transpose()?.unwrap_or(10);

    let data = load_points(input_path)?;
    info!(
        samples = data.nrows(),
        features = data.ncols(),
        path = %input_path.display(),
        "Loaded data"
    );

    // K-Means: best of `runs` fits
    let selector = ModelSelector::new(KMeansConfig::new(k).with_seed(seed), runs);
    let selection = selector.run(&data.view())?;
    let kmeans = &selection.best;

    println!("------------K-Means------------");
    for record in &selection.runs {
        match &record.outcome {
            Ok(quality) => println!(
                "run {:>3} (seed {}): quality {:.6}",
                record.run, record.seed, quality
            ),
            Err(err) => println!(
                "run {:>3} (seed {}): failed: {}",
                record.run, record.seed, err
            ),
        }
    }
    println!("Best run: {}", selection.best_run);
    println!("Centroids:\n{:.6}", kmeans.centroids());
    for cluster in 0..kmeans.k() {
        println!(
            "Cluster {}: {} points, radius {:.6}",
            cluster,
            kmeans.cluster_sizes()[cluster],
            kmeans.radius(cluster)?
        );
    }

    // GMM
    let mut gmm = GaussianMixture::with_config(GmmConfig::new(k).with_seed(seed));
    let model = gmm.fit(&data.view())?;

    println!("---------GMM----------");
    println!(
        "Converged: {:?} after {} iterations, log-likelihood {:.6}",
        model.termination(),
        model.n_iterations(),
        model.log_likelihood()
    );
    println!("Means:\n{:.6}", model.means());
    println!("Weights:\n{:.6}", model.weights());
    for (c, cov) in model.covariances().iter().enumerate() {
        println!("Covariance {}:\n{:.6}", c, cov);
    }
    let representatives = model.representative_points(&data.view())?;
    println!("Centers:");
    for (c, &index) in representatives.iter().enumerate() {
        println!("  component {}: point {} {:.6}", c, index, data.row(index));
    }

    let labels: Array1<u64> = model.predict(&data.view())?.mapv(|label| label as u64);

    let centroids_path = format!("{}_centroids.npy", output_prefix);
    kmeans.centroids().write_npy(File::create(&centroids_path)?)?;
    let means_path = format!("{}_means.npy", output_prefix);
    model.means().write_npy(File::create(&means_path)?)?;
    let labels_path = format!("{}_labels.npy", output_prefix);
    labels.write_npy(File::create(&labels_path)?)?;

    info!(
        centroids = %centroids_path,
        means = %means_path,
        labels = %labels_path,
        "Saved results"
    );

    Ok(())
}
