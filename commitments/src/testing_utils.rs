//! Helpers shared by the unit and integration tests of the commitment scheme.

use env_logger::{try_init_from_env, Env, DEFAULT_FILTER_ENV};
use rand::Rng;
use zk_evm_multiprecision::FftField;

use crate::polynomial::Polynomial;

pub fn init_logger() {
    let _ = try_init_from_env(Env::default().filter_or(DEFAULT_FILTER_ENV, "info"));
}

/// `count` random polynomials of degree exactly `degree`.
pub fn random_polynomials<F: FftField, R: Rng + ?Sized>(
    count: usize,
    degree: usize,
    rng: &mut R,
) -> Vec<Polynomial<F>> {
    (0..count)
        .map(|_| {
            let mut coeffs: Vec<F> = Polynomial::random(degree, rng).into_coefficients();
            coeffs.resize(degree + 1, F::one());
            if coeffs[degree].is_zero() {
                coeffs[degree] = F::one();
            }
            Polynomial::from_coefficients(coeffs)
        })
        .collect()
}
