use criterion::{criterion_group, criterion_main, Criterion};
use crypto_core::{AesRng, Block, Commitment, AES_HASH};
use std::time::Duration;

fn bench_label_hash(c: &mut Criterion) {
    c.bench_function("AesHash::tccr_hash", |b| {
        let i = Block::from(7u128);
        let x = rand::random::<Block>();
        b.iter(|| criterion::black_box(AES_HASH.tccr_hash(i, x)));
    });
}

fn bench_rand_labels(c: &mut Criterion) {
    c.bench_function("AesRng::gen_blocks", |b| {
        let mut rng = AesRng::new();
        b.iter(|| criterion::black_box(rng.gen_blocks(1024)));
    });
}

fn bench_label_commitment(c: &mut Criterion) {
    c.bench_function("Commitment::commit_parts", |b| {
        let labels: Vec<Block> = (0..8).map(|_| rand::random::<Block>()).collect();
        let parts: Vec<&[u8]> = labels.iter().map(|l| l.as_ref()).collect();
        let receiver = [3u8; 32];
        b.iter(|| criterion::black_box(Commitment::commit_parts(&parts, &receiver)));
    });
}

criterion_group! {
    name = primitives;
    config = Criterion::default().warm_up_time(Duration::from_millis(100));
    targets = bench_label_hash, bench_rand_labels, bench_label_commitment
}
criterion_main!(primitives);
