//! Benchmarks for engine operations.

use core::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tsetlin_edge::{
    Config, DenseTsetlinMachine, SparseTsetlinMachine, StatelessTsetlinMachine
};

fn config(n_clauses: usize, n_literals: usize) -> Config {
    Config::builder()
        .classes(2)
        .threshold(50)
        .literals(n_literals)
        .clauses(n_clauses)
        .specificity(3.0)
        .build()
        .unwrap()
}

fn sample_rows(rows: usize, n_literals: usize) -> (Vec<u8>, Vec<u8>) {
    let x: Vec<u8> = (0..rows * n_literals).map(|i| (i % 2) as u8).collect();
    let mut y = Vec::with_capacity(rows * 4);
    for row in 0..rows {
        y.extend_from_slice(&((row % 2) as u32).to_le_bytes());
    }
    (x, y)
}

fn bench_dense_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("dense_predict");

    for n_clauses in [10, 50, 100, 200] {
        let tm = DenseTsetlinMachine::new(config(n_clauses, 64), 42);
        let (x, _) = sample_rows(1, 64);
        let mut y_pred = [0u8; 4];

        group.bench_with_input(
            BenchmarkId::from_parameter(n_clauses),
            &n_clauses,
            |b, _| {
                b.iter(|| tm.predict(black_box(&x), black_box(&mut y_pred), 1).unwrap());
            }
        );
    }

    group.finish();
}

fn bench_train_epoch(c: &mut Criterion) {
    let (x, y) = sample_rows(100, 64);

    c.bench_function("dense_train_epoch_100_rows", |b| {
        b.iter(|| {
            let mut tm = DenseTsetlinMachine::new(config(50, 64), 42);
            tm.train(black_box(&x), black_box(&y), 100, 1).unwrap();
        });
    });

    c.bench_function("sparse_train_epoch_100_rows", |b| {
        b.iter(|| {
            let mut stm = SparseTsetlinMachine::new(config(50, 64), 42);
            stm.train(black_box(&x), black_box(&y), 100, 1).unwrap();
        });
    });
}

fn bench_variant_inference(c: &mut Criterion) {
    let mut group = c.benchmark_group("variant_predict");

    let (x, y) = sample_rows(100, 64);
    let mut dense = DenseTsetlinMachine::new(config(100, 64), 42);
    dense.train(&x, &y, 100, 2).unwrap();

    let sparse: SparseTsetlinMachine = dense.to_sparse(42);
    let stateless: StatelessTsetlinMachine = dense.to_stateless();

    let (x_row, _) = sample_rows(1, 64);
    let mut y_pred = [0u8; 4];

    group.bench_function("dense", |b| {
        b.iter(|| dense.predict(black_box(&x_row), black_box(&mut y_pred), 1).unwrap());
    });
    group.bench_function("sparse", |b| {
        b.iter(|| sparse.predict(black_box(&x_row), black_box(&mut y_pred), 1).unwrap());
    });
    group.bench_function("stateless", |b| {
        b.iter(|| stateless.predict(black_box(&x_row), black_box(&mut y_pred), 1).unwrap());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_dense_predict,
    bench_train_epoch,
    bench_variant_inference
);
criterion_main!(benches);
