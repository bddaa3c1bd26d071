// Search-time comparison between the linear chain and the splay index.
//
// Each run builds an index of N blocks, plants five known identifiers at fixed positions near the
// back of the chain, then replays a search sequence that keeps returning to the same few blocks.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use splay_ledger::{prelude::*, testing};

const SIZES: [usize; 3] = [100, 1_000, 10_000];

// Positions, as a fraction of N, where the known identifiers are inserted.
const PLANTED_AT: [f64; 5] = [0.342, 0.989, 0.863, 0.821, 0.719];

// Indices into the planted identifiers.
const SEARCH_SEQUENCE: [usize; 6] = [1, 2, 1, 1, 2, 1];

fn build_blocks(size: usize) -> (Vec<Arc<Block>>, Vec<u64>) {
    let provider = testing::provider();
    let planted: Vec<usize> = PLANTED_AT
        .iter()
        .map(|fraction| (fraction * size as f64) as usize)
        .collect();

    let blocks: Vec<Arc<Block>> = (0..size)
        .map(|_| Arc::new(Block::new(&provider, None, Vec::new()).expect("digest available")))
        .collect();

    let ids = planted.iter().map(|position| blocks[*position].id()).collect();

    (blocks, ids)
}

fn filled<I: BlockIndex>(blocks: &[Arc<Block>]) -> I {
    let mut index = I::default();
    for block in blocks {
        index.insert(Arc::clone(block));
    }
    index
}

fn replay<I: BlockIndex>(index: &mut I, ids: &[u64]) {
    for position in SEARCH_SEQUENCE {
        black_box(index.search(ids[position]));
    }
}

fn bench_clustered_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("clustered_search");

    for size in SIZES {
        let (blocks, ids) = build_blocks(size);

        group.bench_with_input(BenchmarkId::new("chain", size), &size, |b, _| {
            let mut index: ChainIndex = filled(&blocks);
            b.iter(|| replay(&mut index, &ids));
        });

        group.bench_with_input(BenchmarkId::new("splay", size), &size, |b, _| {
            let mut index: SplayIndex = filled(&blocks);
            b.iter(|| replay(&mut index, &ids));
        });
    }

    group.finish();
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in SIZES {
        let (blocks, _) = build_blocks(size);

        group.bench_with_input(BenchmarkId::new("chain", size), &size, |b, _| {
            b.iter(|| filled::<ChainIndex>(&blocks));
        });

        group.bench_with_input(BenchmarkId::new("splay", size), &size, |b, _| {
            b.iter(|| filled::<SplayIndex>(&blocks));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_clustered_search, bench_insert);
criterion_main!(benches);
