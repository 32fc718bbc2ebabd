use std::ops::{Add, Mul, Neg, Sub};

use rand::Rng;
use zk_evm_multiprecision::FftField;

use crate::domain::EvaluationDomain;
use crate::error::{CommitmentError, Result};

/// Products where both operands are longer than this go through an FFT.
const FFT_MUL_THRESHOLD: usize = 64;

/// A dense univariate polynomial `a_0 + a_1 X + .. + a_n X^n` with `a_n ≠ 0`.
///
/// The zero polynomial has no coefficients.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Polynomial<F: FftField> {
    coeffs: Vec<F>,
}

impl<F: FftField> Polynomial<F> {
    pub fn zero() -> Self {
        Self { coeffs: Vec::new() }
    }

    pub fn constant(c: F) -> Self {
        Self::from_coefficients(vec![c])
    }

    /// Strips trailing zero coefficients.
    pub fn from_coefficients(coeffs: Vec<F>) -> Self {
        let mut poly = Self { coeffs };
        poly.trim();
        poly
    }

    pub fn random<R: Rng + ?Sized>(degree: usize, rng: &mut R) -> Self {
        Self::from_coefficients((0..=degree).map(|_| F::random(rng)).collect())
    }

    fn trim(&mut self) {
        while self.coeffs.last().is_some_and(|c| c.is_zero()) {
            self.coeffs.pop();
        }
    }

    pub fn coefficients(&self) -> &[F] {
        &self.coeffs
    }

    pub fn into_coefficients(self) -> Vec<F> {
        self.coeffs
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Degree, taking the zero polynomial to have degree 0.
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Horner evaluation.
    pub fn evaluate(&self, x: F) -> F {
        self.coeffs
            .iter()
            .rev()
            .fold(F::zero(), |acc, c| acc * x + *c)
    }

    /// Evaluates with a precomputed table `powers[i] = x^i`.
    pub fn evaluate_with_powers(&self, powers: &[F]) -> F {
        debug_assert!(powers.len() >= self.coeffs.len());
        self.coeffs
            .iter()
            .zip(powers)
            .fold(F::zero(), |acc, (c, p)| acc + *c * *p)
    }

    pub fn scale(&self, factor: F) -> Self {
        Self::from_coefficients(self.coeffs.iter().map(|c| *c * factor).collect())
    }

    /// Divides by `X - z`, returning the quotient and `self(z)`.
    pub fn divide_by_linear(&self, z: F) -> (Self, F) {
        let n = self.coeffs.len();
        if n == 0 {
            return (Self::zero(), F::zero());
        }
        let mut quotient = vec![F::zero(); n - 1];
        let mut carry = F::zero();
        for i in (1..n).rev() {
            carry = self.coeffs[i] + carry * z;
            quotient[i - 1] = carry;
        }
        let value = self.coeffs[0] + carry * z;
        (Self::from_coefficients(quotient), value)
    }

    /// Long division, `self = q·divisor + r` with `deg r < deg divisor`.
    pub fn div_rem(&self, divisor: &Self) -> Result<(Self, Self)> {
        let Some(lead) = divisor.coeffs.last() else {
            return Err(CommitmentError::DivisionByZero);
        };
        if self.coeffs.len() < divisor.coeffs.len() {
            return Ok((Self::zero(), self.clone()));
        }
        let lead_inv = lead.try_inverse().ok_or(CommitmentError::DivisionByZero)?;
        let mut remainder = self.coeffs.clone();
        let shift = self.coeffs.len() - divisor.coeffs.len();
        let mut quotient = vec![F::zero(); shift + 1];
        for i in (0..=shift).rev() {
            let factor = remainder[i + divisor.coeffs.len() - 1] * lead_inv;
            quotient[i] = factor;
            for (j, d) in divisor.coeffs.iter().enumerate() {
                remainder[i + j] -= factor * *d;
            }
        }
        remainder.truncate(divisor.coeffs.len() - 1);
        Ok((
            Self::from_coefficients(quotient),
            Self::from_coefficients(remainder),
        ))
    }

    /// The unique polynomial of degree below `points.len()` through the given
    /// `(x, y)` pairs.
    pub fn interpolate(points: &[(F, F)]) -> Result<Self> {
        let mut result = Self::zero();
        for (i, (xi, yi)) in points.iter().enumerate() {
            let mut basis = Self::constant(F::one());
            let mut denominator = F::one();
            for (j, (xj, _)) in points.iter().enumerate() {
                if i == j {
                    continue;
                }
                basis = &basis * &Self::from_coefficients(vec![-*xj, F::one()]);
                denominator *= *xi - *xj;
            }
            let scale = denominator
                .try_inverse()
                .ok_or(CommitmentError::DuplicatePoint)?;
            result = &result + &basis.scale(*yi * scale);
        }
        Ok(result)
    }

    fn mul_schoolbook(&self, rhs: &Self) -> Self {
        let mut out = vec![F::zero(); self.coeffs.len() + rhs.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in rhs.coeffs.iter().enumerate() {
                out[i + j] += *a * *b;
            }
        }
        Self::from_coefficients(out)
    }

    fn mul_fft(&self, rhs: &Self) -> Result<Self> {
        let size = (self.coeffs.len() + rhs.coeffs.len() - 1).next_power_of_two();
        let domain = EvaluationDomain::<F>::get(size)?;
        let mut a = self.coeffs.clone();
        let mut b = rhs.coeffs.clone();
        domain.fft(&mut a);
        domain.fft(&mut b);
        for (x, y) in a.iter_mut().zip(b) {
            *x *= y;
        }
        domain.inverse_fft(&mut a);
        Ok(Self::from_coefficients(a))
    }
}

impl<F: FftField> Add for &Polynomial<F> {
    type Output = Polynomial<F>;

    fn add(self, rhs: Self) -> Polynomial<F> {
        let (long, short) = if self.len() >= rhs.len() {
            (self, rhs)
        } else {
            (rhs, self)
        };
        let mut coeffs = long.coeffs.clone();
        for (c, s) in coeffs.iter_mut().zip(&short.coeffs) {
            *c += *s;
        }
        Polynomial::from_coefficients(coeffs)
    }
}

impl<F: FftField> Sub for &Polynomial<F> {
    type Output = Polynomial<F>;

    fn sub(self, rhs: Self) -> Polynomial<F> {
        self + &(-rhs)
    }
}

impl<F: FftField> Neg for &Polynomial<F> {
    type Output = Polynomial<F>;

    fn neg(self) -> Polynomial<F> {
        Polynomial {
            coeffs: self.coeffs.iter().map(|c| -*c).collect(),
        }
    }
}

impl<F: FftField> Mul for &Polynomial<F> {
    type Output = Polynomial<F>;

    fn mul(self, rhs: Self) -> Polynomial<F> {
        if self.is_zero() || rhs.is_zero() {
            return Polynomial::zero();
        }
        if self.len().min(rhs.len()) > FFT_MUL_THRESHOLD {
            // Only fails when the product outgrows the two-adic subgroup.
            if let Ok(product) = self.mul_fft(rhs) {
                return product;
            }
        }
        self.mul_schoolbook(rhs)
    }
}
