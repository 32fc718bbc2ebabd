//! Benchmarks the FFT over `D_0` and the commitment of a batch of
//! polynomials, the two kernels that dominate LPC proving time.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use zk_evm_commitments::testing_utils::{init_logger, random_polynomials};
use zk_evm_commitments::{EvaluationDomain, FriParams, LpcScheme, Polynomial};
use zk_evm_multiprecision::Goldilocks;

type F = Goldilocks;

fn criterion_benchmark(c: &mut Criterion) {
    init_logger();
    let mut rng = ChaCha8Rng::seed_from_u64(0);

    let mut fft = c.benchmark_group("fft");
    for log_size in [12, 16] {
        let size = 1 << log_size;
        let domain = EvaluationDomain::<F>::get(size).unwrap();
        let coeffs = Polynomial::<F>::random(size - 1, &mut rng).into_coefficients();
        fft.bench_function(BenchmarkId::from_parameter(log_size), |b| {
            b.iter_batched(
                || coeffs.clone(),
                |mut values| domain.fft(&mut values),
                BatchSize::LargeInput,
            )
        });
    }
    fft.finish();

    let mut commit = c.benchmark_group("lpc_commit");
    commit.sample_size(10);
    let degree_log = 12;
    let params = FriParams::<F>::new(degree_log, 2, vec![3, 3, 3, 3, 1], 30, 0).unwrap();
    let polys = random_polynomials::<F, _>(16, (1 << degree_log) - 1, &mut rng);
    commit.bench_function(BenchmarkId::from_parameter(polys.len()), |b| {
        b.iter_batched(
            || {
                let mut lpc = LpcScheme::new(params.clone());
                for poly in &polys {
                    lpc.append_to_batch(0, poly.clone()).unwrap();
                }
                lpc
            },
            |mut lpc| lpc.commit(0).unwrap(),
            BatchSize::LargeInput,
        )
    });
    commit.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
