use circuit::Circuit;
use criterion::{criterion_group, criterion_main, Criterion};
use std::time::Duration;

fn bench_default_circuits_eval(c: &mut Criterion) {
    let circs = Circuit::load_file("circuit_files/default.json").unwrap();
    for circ in circs {
        let requester = vec![true; circ.requester_wires.len()];
        let gatekeeper = vec![false; circ.gatekeeper_wires.len()];
        c.bench_function(&format!("{}_circuit_eval", circ.id), |b| {
            b.iter(|| {
                let res = circ.eval_split(&requester, &gatekeeper).unwrap();
                criterion::black_box(res);
            });
        });
    }
}

fn bench_bristol_load(c: &mut Criterion) {
    c.bench_function("bristol_policy_load", |b| {
        b.iter(|| {
            let circ = Circuit::load_bristol("circuit_files/bristol/policy.txt", "policy").unwrap();
            criterion::black_box(circ);
        });
    });
}

criterion_group! {
    name = circuit_eval;
    config = Criterion::default().warm_up_time(Duration::from_millis(100));
    targets = bench_default_circuits_eval, bench_bristol_load
}
criterion_main!(circuit_eval);
