use circuit::Circuit;
use criterion::{criterion_group, criterion_main, Criterion};
use crypto_core::AesRng;
use std::time::Duration;
use twopc::HalfGateGenerator;

fn bench_garble_default(c: &mut Criterion) {
    let circs = Circuit::load_file("../circuit/circuit_files/default.json").unwrap();
    for circ in circs {
        c.bench_function(&format!("garbling {}", circ.id), |b| {
            let mut rng = AesRng::new();
            b.iter(|| {
                let mut gen = HalfGateGenerator::random(&mut rng);
                let gc = gen.garble_fresh(&mut rng, &circ).unwrap();
                criterion::black_box(gc);
            });
        });
    }
}

fn bench_plaintext_truth_table(c: &mut Criterion) {
    let circ = Circuit::load_file("../circuit/circuit_files/default.json")
        .unwrap()
        .remove(1);
    c.bench_function("plaintext truth table", |b| {
        b.iter(|| {
            let report = twopc::plaintext_report(&circ).unwrap();
            criterion::black_box(report);
        });
    });
}

criterion_group! {
    name = garbling;
    config = Criterion::default().warm_up_time(Duration::from_millis(100));
    targets = bench_garble_default, bench_plaintext_truth_table
}
criterion_main!(garbling);
