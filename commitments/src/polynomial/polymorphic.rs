use std::borrow::Cow;

use zk_evm_multiprecision::FftField;

use super::PolynomialDfs;
use crate::domain::log2_strict;
use crate::error::Result;

/// Evaluations that may still fit in machine words.
///
/// Trace columns are mostly bytes, flags and counters. They stay in the
/// `Small` representation until an operation needs full field elements, at
/// which point they are widened once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolymorphicDfs<F: FftField> {
    Small { degree: usize, values: Vec<u64> },
    Full(PolynomialDfs<F>),
}

impl<F: FftField> PolymorphicDfs<F> {
    pub fn small(degree: usize, values: Vec<u64>) -> Result<Self> {
        log2_strict(values.len())?;
        Ok(Self::Small { degree, values })
    }

    pub fn is_small(&self) -> bool {
        matches!(self, Self::Small { .. })
    }

    pub fn size(&self) -> usize {
        match self {
            Self::Small { values, .. } => values.len(),
            Self::Full(poly) => poly.size(),
        }
    }

    pub fn degree(&self) -> usize {
        match self {
            Self::Small { degree, .. } => *degree,
            Self::Full(poly) => poly.degree(),
        }
    }

    /// Evaluation at `ω^index`.
    pub fn get(&self, index: usize) -> F {
        match self {
            Self::Small { values, .. } => F::from_u64(values[index]),
            Self::Full(poly) => poly.values()[index],
        }
    }

    /// Full-field view, borrowing when already widened.
    pub fn as_full(&self) -> Result<Cow<'_, PolynomialDfs<F>>> {
        match self {
            Self::Small { degree, values } => Ok(Cow::Owned(PolynomialDfs::new(
                *degree,
                values.iter().map(|v| F::from_u64(*v)).collect(),
            )?)),
            Self::Full(poly) => Ok(Cow::Borrowed(poly)),
        }
    }

    /// Replaces a small representation with the full one.
    pub fn widen(&mut self) -> Result<()> {
        if self.is_small() {
            let full = self.as_full()?.into_owned();
            *self = Self::Full(full);
        }
        Ok(())
    }

    pub fn into_full(self) -> Result<PolynomialDfs<F>> {
        match self {
            Self::Full(poly) => Ok(poly),
            small => Ok(small.as_full()?.into_owned()),
        }
    }

    pub fn evaluate(&self, x: F) -> Result<F> {
        self.as_full()?.evaluate(x)
    }

    pub fn add_assign(&mut self, rhs: &Self) -> Result<()> {
        let sum = self.as_full()?.add_poly(&*rhs.as_full()?)?;
        *self = Self::Full(sum);
        Ok(())
    }

    pub fn mul_assign(&mut self, rhs: &Self) -> Result<()> {
        let product = self.as_full()?.mul_poly(&*rhs.as_full()?)?;
        *self = Self::Full(product);
        Ok(())
    }
}

impl<F: FftField> From<PolynomialDfs<F>> for PolymorphicDfs<F> {
    fn from(poly: PolynomialDfs<F>) -> Self {
        Self::Full(poly)
    }
}

#[cfg(test)]
mod tests {
    use zk_evm_multiprecision::Goldilocks;

    use super::*;

    #[test]
    fn test_small_values_widen_on_mixing() -> anyhow::Result<()> {
        let mut column = PolymorphicDfs::<Goldilocks>::small(3, vec![1, 2, 3, 4])?;
        assert!(column.is_small());
        assert_eq!(column.get(2), Goldilocks::from_u64(3));
        let x = Goldilocks::from_u64(9);
        let value = column.evaluate(x)?;
        assert!(column.is_small());
        let mut widened = column.clone();
        widened.widen()?;
        assert_eq!(widened.evaluate(x)?, value);

        let full: PolymorphicDfs<Goldilocks> =
            PolynomialDfs::constant(Goldilocks::from_u64(5), 4)?.into();
        column.add_assign(&full)?;
        assert!(!column.is_small());
        assert_eq!(column.evaluate(x)?, value + Goldilocks::from_u64(5));

        column.mul_assign(&PolymorphicDfs::small(0, vec![2; 4])?)?;
        assert_eq!(
            column.evaluate(x)?,
            (value + Goldilocks::from_u64(5)) * Goldilocks::from_u64(2)
        );
        assert!(PolymorphicDfs::<Goldilocks>::small(0, vec![0; 6]).is_err());
        Ok(())
    }
}
