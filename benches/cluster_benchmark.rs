use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use emcluster_rs::{
    linalg, GaussianMixture, GmmConfig, InitMethod, KMeans, KMeansConfig, ModelSelector,
};
use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use std::time::Duration;

fn benchmark_kmeans_varying_samples(c: &mut Criterion) {
    let mut group = c.benchmark_group("kmeans_samples");
    group.sample_size(10);
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_secs(2));

    let n_features = 16;
    let k = 10;
    let sample_sizes = [1_000, 5_000, 10_000];

    for n_samples in sample_sizes.iter() {
        group.throughput(Throughput::Elements(*n_samples as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(n_samples),
            n_samples,
            |b, &n_samples| {
                let data = Array2::random((n_samples, n_features), Uniform::new(-1.0, 1.0));
                let config = KMeansConfig::new(k)
                    .with_max_iters(5)
                    .with_tol(-1.0)
                    .with_seed(42);

                b.iter(|| {
                    let mut kmeans = KMeans::with_config(config.clone());
                    kmeans.fit(black_box(&data.view())).unwrap();
                    kmeans
                });
            },
        );
    }
    group.finish();
}

fn benchmark_kmeans_init(c: &mut Criterion) {
    let mut group = c.benchmark_group("kmeans_init");
    group.sample_size(10);
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_secs(2));

    let data = Array2::random((5_000, 16), Uniform::new(-1.0, 1.0));

    for (name, init) in [
        ("random", InitMethod::Random),
        ("kmeans_plus_plus", InitMethod::KMeansPlusPlus),
    ] {
        let config = KMeansConfig::new(20)
            .with_max_iters(5)
            .with_seed(42)
            .with_init(init);
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut kmeans = KMeans::with_config(config.clone());
                kmeans.fit(black_box(&data.view())).unwrap();
                kmeans
            });
        });
    }
    group.finish();
}

fn benchmark_gmm_varying_dimensions(c: &mut Criterion) {
    let mut group = c.benchmark_group("gmm_dimensions");
    group.sample_size(10);
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_secs(2));

    let n_samples = 2_000;
    let k = 4;
    let dimensions = [2, 8, 16];

    for n_features in dimensions.iter() {
        group.throughput(Throughput::Elements(*n_features as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(n_features),
            n_features,
            |b, &n_features| {
                let data = Array2::random((n_samples, n_features), Uniform::new(-1.0, 1.0));
                let config = GmmConfig::new(k)
                    .with_max_iters(5)
                    .with_tol(-1.0)
                    .with_seed(42);

                b.iter(|| {
                    let mut gmm = GaussianMixture::with_config(config.clone());
                    gmm.fit(black_box(&data.view())).unwrap();
                    gmm
                });
            },
        );
    }
    group.finish();
}

fn benchmark_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict");
    group.sample_size(10);
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_secs(2));

    let train_data = Array2::random((2_000, 8), Uniform::new(-1.0, 1.0));
    let test_data = Array2::random((5_000, 8), Uniform::new(-1.0, 1.0));

    let mut kmeans = KMeans::with_config(KMeansConfig::new(10).with_seed(42));
    kmeans.fit(&train_data.view()).unwrap();
    let mut gmm = GaussianMixture::with_config(GmmConfig::new(4).with_seed(42));
    gmm.fit(&train_data.view()).unwrap();

    group.throughput(Throughput::Elements(test_data.nrows() as u64));
    group.bench_function("kmeans", |b| {
        b.iter(|| kmeans.predict(black_box(&test_data.view())).unwrap());
    });
    group.bench_function("gmm", |b| {
        b.iter(|| gmm.predict(black_box(&test_data.view())).unwrap());
    });
    group.finish();
}

fn benchmark_model_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_selection");
    group.sample_size(10);
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_secs(3));

    let data = Array2::random((2_000, 4), Uniform::new(-1.0, 1.0));
    let selector = ModelSelector::new(KMeansConfig::new(8).with_seed(0), 10);

    group.bench_function("10_runs", |b| {
        b.iter(|| selector.run(black_box(&data.view())).unwrap());
    });
    group.finish();
}

fn benchmark_linalg(c: &mut Criterion) {
    let mut group = c.benchmark_group("linalg");

    for d in [4usize, 16, 64] {
        let a = Array2::random((d, d), Uniform::new(-1.0, 1.0));
        // Diagonally dominant symmetric matrix, always invertible
        let spd = a.t().dot(&a) + Array2::<f64>::eye(d) * d as f64;

        group.bench_with_input(BenchmarkId::new("inverse", d), &spd, |b, m| {
            b.iter(|| linalg::inverse(black_box(&m.view())).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("eigh", d), &spd, |b, m| {
            b.iter(|| linalg::eigh(black_box(&m.view())).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_kmeans_varying_samples,
    benchmark_kmeans_init,
    benchmark_gmm_varying_dimensions,
    benchmark_predict,
    benchmark_model_selection,
    benchmark_linalg,
);
criterion_main!(benches);
