use std::borrow::Cow;
use std::sync::Arc;

use rayon::prelude::*;
use zk_evm_multiprecision::FftField;

use super::Polynomial;
use crate::domain::{log2_strict, EvaluationDomain};
use crate::error::{CommitmentError, Result};
use crate::pool::{PoolLevel, PARALLEL_THRESHOLD};

/// A polynomial given by its evaluations `f(ω^0), .., f(ω^(N-1))` on the
/// subgroup of size `N`.
///
/// `degree` is carried alongside the values: resizing keeps the polynomial
/// but changes `N`, and products need it to pick a large enough domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolynomialDfs<F: FftField> {
    degree: usize,
    values: Vec<F>,
}

fn zip_with<F: FftField>(lhs: &mut [F], rhs: &[F], op: impl Fn(&mut F, F) + Send + Sync) {
    if lhs.len() >= PARALLEL_THRESHOLD {
        PoolLevel::Low.install(|| {
            lhs.par_iter_mut()
                .zip(rhs.par_iter())
                .for_each(|(a, b)| op(a, *b))
        });
    } else {
        lhs.iter_mut().zip(rhs).for_each(|(a, b)| op(a, *b));
    }
}

fn map_in_place<F: FftField>(values: &mut [F], op: impl Fn(&mut F) + Send + Sync) {
    if values.len() >= PARALLEL_THRESHOLD {
        PoolLevel::Low.install(|| values.par_iter_mut().for_each(op));
    } else {
        values.iter_mut().for_each(op);
    }
}

impl<F: FftField> PolynomialDfs<F> {
    pub fn new(degree: usize, values: Vec<F>) -> Result<Self> {
        log2_strict(values.len())?;
        Ok(Self { degree, values })
    }

    pub fn constant(c: F, size: usize) -> Result<Self> {
        Self::new(0, vec![c; size])
    }

    pub fn zero(size: usize) -> Result<Self> {
        Self::constant(F::zero(), size)
    }

    /// Evaluates `poly` on the subgroup of the given size.
    pub fn from_coefficients(poly: &Polynomial<F>, size: usize) -> Result<Self> {
        if poly.len() > size {
            return Err(CommitmentError::DegreeTooLarge {
                degree: poly.degree(),
                bound: size - 1,
            });
        }
        let domain = EvaluationDomain::<F>::get(size)?;
        let mut values = poly.coefficients().to_vec();
        domain.fft(&mut values);
        Ok(Self {
            degree: poly.degree(),
            values,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[F] {
        &self.values
    }

    pub fn into_values(self) -> Vec<F> {
        self.values
    }

    pub fn domain(&self) -> Result<Arc<EvaluationDomain<F>>> {
        EvaluationDomain::get(self.size())
    }

    pub fn coefficients(&self) -> Result<Polynomial<F>> {
        let mut coeffs = self.values.clone();
        self.domain()?.inverse_fft(&mut coeffs);
        Ok(Polynomial::from_coefficients(coeffs))
    }

    pub fn evaluate(&self, x: F) -> Result<F> {
        Ok(self.coefficients()?.evaluate(x))
    }

    /// Re-evaluates the same polynomial on a subgroup of another size.
    pub fn resize(&mut self, size: usize) -> Result<()> {
        if size == self.size() {
            return Ok(());
        }
        log2_strict(size)?;
        if self.degree >= size {
            return Err(CommitmentError::DegreeTooLarge {
                degree: self.degree,
                bound: size - 1,
            });
        }
        let mut coeffs = self.values.clone();
        self.domain()?.inverse_fft(&mut coeffs);
        coeffs.truncate(self.degree + 1);
        EvaluationDomain::<F>::get(size)?.fft(&mut coeffs);
        self.values = coeffs;
        Ok(())
    }

    fn resized(&self, size: usize) -> Result<Cow<'_, Self>> {
        if size == self.size() {
            Ok(Cow::Borrowed(self))
        } else {
            let mut copy = self.clone();
            copy.resize(size)?;
            Ok(Cow::Owned(copy))
        }
    }

    pub fn add_poly(&self, rhs: &Self) -> Result<Self> {
        self.combine(rhs, |a, b| *a += b)
    }

    pub fn sub_poly(&self, rhs: &Self) -> Result<Self> {
        self.combine(rhs, |a, b| *a -= b)
    }

    fn combine(&self, rhs: &Self, op: impl Fn(&mut F, F) + Send + Sync) -> Result<Self> {
        let size = self.size().max(rhs.size());
        let mut out = self.resized(size)?.into_owned();
        let rhs = rhs.resized(size)?;
        zip_with(&mut out.values, &rhs.values, op);
        out.degree = self.degree.max(rhs.degree);
        Ok(out)
    }

    /// Pointwise product on a domain large enough for `deg self + deg rhs`.
    pub fn mul_poly(&self, rhs: &Self) -> Result<Self> {
        let degree = self.degree + rhs.degree;
        let size = self
            .size()
            .max(rhs.size())
            .max((degree + 1).next_power_of_two());
        let mut out = self.resized(size)?.into_owned();
        let rhs = rhs.resized(size)?;
        zip_with(&mut out.values, &rhs.values, |a, b| *a *= b);
        out.degree = degree;
        Ok(out)
    }

    /// Exact division is not required; the remainder is discarded.
    pub fn div_poly(&self, rhs: &Self) -> Result<Self> {
        let (quotient, _) = self.coefficients()?.div_rem(&rhs.coefficients()?)?;
        Self::from_coefficients(&quotient, self.size())
    }

    pub fn pow(&self, exp: usize) -> Result<Self> {
        let mut result = Self::constant(F::one(), self.size())?;
        let mut base = self.clone();
        let mut exp = exp;
        while exp > 0 {
            if exp & 1 == 1 {
                result = result.mul_poly(&base)?;
            }
            exp >>= 1;
            if exp > 0 {
                base = base.mul_poly(&base)?;
            }
        }
        Ok(result)
    }

    pub fn add_scalar(&mut self, c: F) {
        map_in_place(&mut self.values, |v| *v += c);
    }

    pub fn sub_scalar(&mut self, c: F) {
        map_in_place(&mut self.values, |v| *v -= c);
    }

    pub fn mul_scalar(&mut self, c: F) {
        map_in_place(&mut self.values, |v| *v *= c);
        if c.is_zero() {
            self.degree = 0;
        }
    }

    pub fn negate(&mut self) {
        map_in_place(&mut self.values, |v| *v = -*v);
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use zk_evm_multiprecision::Goldilocks;

    use super::*;

    type D = PolynomialDfs<Goldilocks>;
    type P = Polynomial<Goldilocks>;

    #[test]
    fn test_coefficient_round_trip() -> anyhow::Result<()> {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let p = P::random(9, &mut rng);
        let dfs = D::from_coefficients(&p, 16)?;
        assert_eq!(dfs.degree(), 9);
        assert_eq!(dfs.coefficients()?, p);
        let x = Goldilocks::random(&mut rng);
        assert_eq!(dfs.evaluate(x)?, p.evaluate(x));
        assert!(D::from_coefficients(&p, 8).is_err());
        assert!(D::new(0, vec![Goldilocks::one(); 3]).is_err());
        Ok(())
    }

    #[test]
    fn test_mixed_size_arithmetic() -> anyhow::Result<()> {
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let a = P::random(3, &mut rng);
        let b = P::random(12, &mut rng);
        let da = D::from_coefficients(&a, 4)?;
        let db = D::from_coefficients(&b, 16)?;
        let x = Goldilocks::random(&mut rng);

        let sum = da.add_poly(&db)?;
        assert_eq!(sum.size(), 16);
        assert_eq!(sum.evaluate(x)?, a.evaluate(x) + b.evaluate(x));

        let diff = db.sub_poly(&da)?;
        assert_eq!(diff.evaluate(x)?, b.evaluate(x) - a.evaluate(x));

        let product = da.mul_poly(&db)?;
        assert_eq!(product.size(), 16);
        assert_eq!(product.degree(), 15);
        assert_eq!(product.evaluate(x)?, a.evaluate(x) * b.evaluate(x));

        let squared = db.mul_poly(&db)?;
        assert_eq!(squared.size(), 32);
        assert_eq!(squared.evaluate(x)?, b.evaluate(x) * b.evaluate(x));
        Ok(())
    }

    #[test]
    fn test_resize_and_pow() -> anyhow::Result<()> {
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let p = P::random(2, &mut rng);
        let mut dfs = D::from_coefficients(&p, 4)?;
        dfs.resize(64)?;
        assert_eq!(dfs.coefficients()?, p);
        dfs.resize(4)?;
        assert_eq!(dfs.coefficients()?, p);
        assert!(dfs.resize(2).is_err());

        let cube = dfs.pow(3)?;
        let x = Goldilocks::random(&mut rng);
        assert_eq!(cube.degree(), 6);
        assert_eq!(cube.evaluate(x)?, p.evaluate(x).pow_u64(3));
        Ok(())
    }

    #[test]
    fn test_division_and_scalars() -> anyhow::Result<()> {
        let mut rng = ChaCha8Rng::seed_from_u64(24);
        let q = P::random(5, &mut rng);
        let d = P::random(2, &mut rng);
        let n = D::from_coefficients(&(&q * &d), 16)?;
        let quotient = n.div_poly(&D::from_coefficients(&d, 4)?)?;
        assert_eq!(quotient.coefficients()?, q);
        assert_eq!(quotient.size(), 16);

        let mut shifted = D::from_coefficients(&q, 8)?;
        shifted.add_scalar(Goldilocks::from_u64(3));
        shifted.mul_scalar(Goldilocks::from_u64(2));
        let x = Goldilocks::random(&mut rng);
        assert_eq!(
            shifted.evaluate(x)?,
            (q.evaluate(x) + Goldilocks::from_u64(3)) * Goldilocks::from_u64(2)
        );
        Ok(())
    }
}
