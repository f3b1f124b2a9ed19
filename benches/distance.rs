use criterion::{Criterion, black_box, criterion_group, criterion_main};
use cdr3search::{DistanceMethod, EditDistance, Scorer};
use rand::random_range;

const AMINO_ACIDS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

fn random_cdr3(len: usize) -> Vec<u8> {
    (0..len)
        .map(|_| AMINO_ACIDS[random_range(0..AMINO_ACIDS.len())])
        .collect()
}

fn bench_distances(c: &mut Criterion) {
    let query = b"CARDTGGFDIW";
    let num_records = 100_000;
    let records: Vec<Vec<u8>> = (0..num_records)
        .map(|_| random_cdr3(random_range(8..24)))
        .collect();

    let mut group = c.benchmark_group("cdr3_distance");
    group.sample_size(10);
    group.throughput(criterion::Throughput::Elements(num_records as u64));

    {
        let mut edit = EditDistance::new();
        group.bench_function("edit", |b| {
            b.iter(|| {
                for record in &records {
                    black_box(edit.distance(query, record));
                }
            });
        });
    }

    for k in [0, 1, 3] {
        let mut scorer = Scorer::new(DistanceMethod::Edit);
        group.bench_function(format!("edit_within/k={k}"), |b| {
            b.iter(|| {
                for record in &records {
                    let _ = black_box(scorer.score_within(query, record, k));
                }
            });
        });
    }

    {
        let mut scorer = Scorer::new(DistanceMethod::Hamming);
        group.bench_function("hamming/k=2", |b| {
            b.iter(|| {
                for record in &records {
                    let _ = black_box(scorer.score_within(query, record, 2));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_distances);
criterion_main!(benches);
