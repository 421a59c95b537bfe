//! Benchmarks for kernel evaluation and the incomplete factorizer

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kernelbp::{GaussianKernel, IncompleteCholesky, KernelFunction};
use nalgebra::DMatrix;

/// Deterministic quasi-random sample set (no RNG dependency needed).
fn samples(n: usize, dim: usize) -> DMatrix<f64> {
    DMatrix::from_fn(n, dim, |i, j| {
        let v = ((i * 31 + j * 17 + 7) % 97) as f64;
        v / 97.0 - 0.5
    })
}

fn bench_gram(c: &mut Criterion) {
    let kernel = GaussianKernel::new(1.0).unwrap();
    let x = samples(200, 2);

    c.bench_function("gram_200x2", |b| {
        b.iter(|| kernel.gram(black_box(&x)).unwrap())
    });
}

fn bench_incomplete_cholesky(c: &mut Criterion) {
    let kernel = GaussianKernel::new(1.0).unwrap();
    let x = samples(200, 2);

    let mut group = c.benchmark_group("incomplete_cholesky_200x2");
    for eta in [0.1, 0.01] {
        group.bench_function(format!("eta_{}", eta), |b| {
            b.iter(|| {
                IncompleteCholesky::new(&kernel, eta)
                    .unwrap()
                    .factorize(black_box(&x))
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_gram, bench_incomplete_cholesky);
criterion_main!(benches);
