//! Benchmarks the execution and witness generation of a transaction running
//! a Fibonacci loop.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use evm_arithmetization::testing_utils::{block_with_code, init_logger};
use evm_arithmetization::{Block, Evm, WitnessGenerator};

/// Iterates `a, b = b, a + b` `iterations` times.
fn fibonacci_code(iterations: u16) -> Vec<u8> {
    let [hi, lo] = iterations.to_be_bytes();
    vec![
        0x60, 0x00, 0x60, 0x01, 0x61, hi, lo, // a = 0, b = 1, counter
        0x5b, // loop:
        0x80, 0x15, 0x60, 0x19, 0x57, // jump to end once the counter is zero
        0x60, 0x01, 0x90, 0x03, // counter - 1
        0x91, 0x81, 0x01, 0x90, 0x91, // (a, b) = (b, a + b)
        0x60, 0x07, 0x56, // jump to loop
        0x5b, 0x00, // end: STOP
    ]
}

fn criterion_benchmark(c: &mut Criterion) {
    init_logger();
    let blocks: Vec<Block> = vec![block_with_code(fibonacci_code(5_000))];

    let mut group = c.benchmark_group("fibonacci");
    group.sample_size(10);
    group.bench_function(BenchmarkId::new("execute", 5_000), |b| {
        b.iter_batched(
            || blocks.clone(),
            |blocks| Evm::run_blocks(&blocks, &mut ()).unwrap(),
            BatchSize::LargeInput,
        )
    });
    group.bench_function(BenchmarkId::new("witness", 5_000), |b| {
        b.iter_batched(
            || blocks.clone(),
            |blocks| WitnessGenerator::generate(&blocks).unwrap(),
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
