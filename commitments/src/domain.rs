//! Radix-2 evaluation domains and the process-wide domain cache.

use std::any::{Any, TypeId};
use std::sync::Arc;

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rayon::prelude::*;
use zk_evm_multiprecision::FftField;

use crate::error::{CommitmentError, Result};
use crate::pool::{PoolLevel, PARALLEL_THRESHOLD};

/// The multiplicative subgroup `{ω^0, .., ω^(n-1)}` of size `n = 2^k`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluationDomain<F: FftField> {
    log_size: u32,
    generator: F,
    generator_inv: F,
    size_inv: F,
    /// `ω^i` for `i < n/2`.
    twiddles: Vec<F>,
    /// `ω^-i` for `i < n/2`.
    inv_twiddles: Vec<F>,
}

fn powers<F: FftField>(base: F, count: usize) -> Vec<F> {
    let mut out = Vec::with_capacity(count);
    let mut acc = F::one();
    for _ in 0..count {
        out.push(acc);
        acc *= base;
    }
    out
}

pub(crate) fn log2_strict(n: usize) -> Result<u32> {
    if n.is_power_of_two() {
        Ok(n.trailing_zeros())
    } else {
        Err(CommitmentError::SizeNotPowerOfTwo(n))
    }
}

impl<F: FftField> EvaluationDomain<F> {
    pub fn new(size: usize) -> Result<Self> {
        let log_size = log2_strict(size)?;
        let generator = F::root_of_unity(log_size).ok_or(CommitmentError::DomainTooLarge {
            field: F::NAME,
            log_size,
        })?;
        let generator_inv = generator.try_inverse().unwrap_or_else(F::one);
        let size_inv = F::from_u64(size as u64)
            .try_inverse()
            .unwrap_or_else(F::one);
        Ok(Self {
            log_size,
            generator,
            generator_inv,
            size_inv,
            twiddles: powers(generator, size / 2),
            inv_twiddles: powers(generator_inv, size / 2),
        })
    }

    /// Returns the shared domain of the given size, creating it on first use.
    pub fn get(size: usize) -> Result<Arc<Self>> {
        let key = (TypeId::of::<F>(), size);
        if let Some(domain) = DOMAINS.read().get(&key) {
            if let Ok(domain) = Arc::clone(domain).downcast::<Self>() {
                return Ok(domain);
            }
        }
        let domain = Arc::new(Self::new(size)?);
        let mut cache = DOMAINS.write();
        let entry = cache
            .entry(key)
            .or_insert_with(|| domain.clone() as Arc<dyn Any + Send + Sync>);
        Ok(Arc::clone(entry).downcast::<Self>().unwrap_or(domain))
    }

    pub fn size(&self) -> usize {
        1 << self.log_size
    }

    pub fn log_size(&self) -> u32 {
        self.log_size
    }

    pub fn generator(&self) -> F {
        self.generator
    }

    pub fn generator_inv(&self) -> F {
        self.generator_inv
    }

    /// `ω^index`, with `index` taken modulo the domain size.
    pub fn element(&self, index: usize) -> F {
        let half = self.twiddles.len();
        if half == 0 {
            return F::one();
        }
        let index = index % self.size();
        if index < half {
            self.twiddles[index]
        } else {
            -self.twiddles[index - half]
        }
    }

    /// `ω^-index`, with `index` taken modulo the domain size.
    pub fn element_inv(&self, index: usize) -> F {
        let half = self.inv_twiddles.len();
        if half == 0 {
            return F::one();
        }
        let index = index % self.size();
        if index < half {
            self.inv_twiddles[index]
        } else {
            -self.inv_twiddles[index - half]
        }
    }

    pub fn elements(&self) -> Vec<F> {
        (0..self.size()).map(|i| self.element(i)).collect()
    }

    /// `x^n - 1`.
    pub fn evaluate_vanishing_polynomial(&self, x: F) -> F {
        x.pow_u64(self.size() as u64) - F::one()
    }

    /// Evaluates the coefficient vector on the domain in place.
    ///
    /// Shorter inputs are zero-padded. Longer inputs are wrapped around, which
    /// leaves the evaluations unchanged since `ω^n = 1`.
    pub fn fft(&self, values: &mut Vec<F>) {
        let n = self.size();
        if values.len() > n {
            let tail = values.split_off(n);
            for (i, c) in tail.into_iter().enumerate() {
                values[i % n] += c;
            }
        }
        values.resize(n, F::zero());
        radix2_fft(values, &self.twiddles);
    }

    /// Interpolates the evaluations on the domain into coefficients in
    /// place. `values` is zero-padded to the domain size.
    pub fn inverse_fft(&self, values: &mut Vec<F>) {
        values.resize(self.size(), F::zero());
        radix2_fft(values, &self.inv_twiddles);
        let size_inv = self.size_inv;
        if values.len() >= PARALLEL_THRESHOLD {
            PoolLevel::Low.install(|| values.par_iter_mut().for_each(|v| *v *= size_inv));
        } else {
            values.iter_mut().for_each(|v| *v *= size_inv);
        }
    }

    pub fn batch_fft(&self, batch: &mut [Vec<F>]) {
        PoolLevel::High.install(|| batch.par_iter_mut().for_each(|values| self.fft(values)));
    }

    pub fn batch_inverse_fft(&self, batch: &mut [Vec<F>]) {
        PoolLevel::High.install(|| {
            batch
                .par_iter_mut()
                .for_each(|values| self.inverse_fft(values))
        });
    }
}

type DomainCache = RwLock<HashMap<(TypeId, usize), Arc<dyn Any + Send + Sync>>>;

static DOMAINS: Lazy<DomainCache> = Lazy::new(Default::default);

/// Creates every missing domain among `sizes` in parallel.
pub fn prefill_domains<F: FftField>(sizes: &[usize]) -> Result<()> {
    let mut sizes = sizes.to_vec();
    sizes.sort_unstable();
    sizes.dedup();
    PoolLevel::High.install(|| {
        sizes
            .par_iter()
            .try_for_each(|&size| EvaluationDomain::<F>::get(size).map(drop))
    })
}

/// `D_0 ⊃ D_1 ⊃ .. ⊃ D_count` with `|D_0| = 2^log_size` and each domain half
/// the size of the previous one.
pub fn domain_chain<F: FftField>(
    log_size: u32,
    count: u32,
) -> Result<Vec<Arc<EvaluationDomain<F>>>> {
    if count > log_size {
        return Err(CommitmentError::DomainChainTooLong { log_size, count });
    }
    (0..=count)
        .map(|i| EvaluationDomain::get(1 << (log_size - i)))
        .collect()
}

fn bit_reverse_permute<T>(values: &mut [T]) {
    let n = values.len();
    if n <= 2 {
        return;
    }
    let shift = usize::BITS - n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> shift;
        if i < j {
            values.swap(i, j);
        }
    }
}

/// Iterative decimation-in-time FFT. `twiddles` holds `n/2` powers of the
/// root used for the transform.
fn radix2_fft<F: FftField>(values: &mut [F], twiddles: &[F]) {
    let n = values.len();
    bit_reverse_permute(values);
    let mut half = 1;
    while half < n {
        let stride = n / (2 * half);
        let butterfly = |block: &mut [F]| {
            let (lo, hi) = block.split_at_mut(half);
            for j in 0..half {
                let t = hi[j] * twiddles[j * stride];
                hi[j] = lo[j] - t;
                lo[j] += t;
            }
        };
        if n >= PARALLEL_THRESHOLD {
            PoolLevel::Low.install(|| values.par_chunks_mut(2 * half).for_each(butterfly));
        } else {
            values.chunks_mut(2 * half).for_each(butterfly);
        }
        half *= 2;
    }
}
