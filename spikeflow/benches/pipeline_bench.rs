//! Benchmarks for graph construction and execution-order computation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use spikeflow::prelude::*;
use std::sync::Arc;

fn chain_nodes(n: usize) -> Node {
    let mut node = Node::operator(Arc::new(FnOperator::new("op-0", |_| Ok(Payload::Empty))));
    for i in 1..n {
        let next = Node::operator(Arc::new(FnOperator::new(
            format!("op-{i}"),
            |_| Ok(Payload::Empty),
        )));
        node = node.chain(&next).unwrap();
    }
    node
}

fn pipeline_benchmark(c: &mut Criterion) {
    c.bench_function("topological_sort_64", |b| {
        let terminal = chain_nodes(64);
        b.iter(|| black_box(terminal.topological_sort().len()))
    });

    c.bench_function("summarize_64", |b| {
        let pipeline = Pipeline::new(&chain_nodes(64));
        b.iter(|| black_box(pipeline.summarize().len()))
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
