//! Tournament reductions over many polynomials.

use rayon::prelude::*;
use zk_evm_multiprecision::FftField;

use super::PolynomialDfs;
use crate::domain::prefill_domains;
use crate::error::Result;
use crate::pool::PoolLevel;

/// Pairs `(0, 1), (2, 3), ..` are combined level by level until a single
/// polynomial is left. The reduction tree depends only on the input order.
fn tournament<F, Op>(mut level: Vec<PolynomialDfs<F>>, op: Op) -> Result<Option<PolynomialDfs<F>>>
where
    F: FftField,
    Op: Fn(&PolynomialDfs<F>, &PolynomialDfs<F>) -> Result<PolynomialDfs<F>> + Send + Sync,
{
    while level.len() > 1 {
        level = PoolLevel::High.install(|| {
            level
                .par_chunks(2)
                .map(|pair| match pair.get(1) {
                    Some(b) => op(&pair[0], b),
                    None => Ok(pair[0].clone()),
                })
                .collect::<Result<Vec<_>>>()
        })?;
    }
    Ok(level.pop())
}

/// Sum of all polynomials. Inputs are grouped by size first so that most
/// pairs need no resize.
pub fn polynomial_sum<F: FftField>(mut polys: Vec<PolynomialDfs<F>>) -> Result<PolynomialDfs<F>> {
    polys.sort_by_key(|p| p.size());
    match tournament(polys, |a, b| a.add_poly(b))? {
        Some(sum) => Ok(sum),
        None => PolynomialDfs::zero(1),
    }
}

/// Product of all polynomials. Every domain the reduction will need is
/// created up front.
pub fn polynomial_product<F: FftField>(
    polys: Vec<PolynomialDfs<F>>,
) -> Result<PolynomialDfs<F>> {
    let mut sizes: Vec<usize> = polys.iter().map(|p| p.size()).collect();
    let mut degrees: Vec<usize> = polys.iter().map(|p| p.degree()).collect();
    while degrees.len() > 1 {
        degrees = degrees.chunks(2).map(|pair| pair.iter().sum()).collect();
        sizes.extend(degrees.iter().map(|d| (d + 1).next_power_of_two()));
    }
    prefill_domains::<F>(&sizes)?;
    match tournament(polys, |a, b| a.mul_poly(b))? {
        Some(product) => Ok(product),
        None => PolynomialDfs::constant(F::one(), 1),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use zk_evm_multiprecision::Goldilocks;

    use super::*;
    use crate::polynomial::Polynomial;

    #[test]
    fn test_sum_and_product_match_pointwise() -> anyhow::Result<()> {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let coeffs: Vec<Polynomial<Goldilocks>> = (0..7)
            .map(|i| Polynomial::random(i + 1, &mut rng))
            .collect();
        let dfs = coeffs
            .iter()
            .map(|p| PolynomialDfs::from_coefficients(p, p.len().next_power_of_two()))
            .collect::<Result<Vec<_>>>()?;
        let x = Goldilocks::random(&mut rng);

        let sum = polynomial_sum(dfs.clone())?;
        let expected_sum = coeffs
            .iter()
            .fold(Goldilocks::zero(), |acc, p| acc + p.evaluate(x));
        assert_eq!(sum.evaluate(x)?, expected_sum);

        let product = polynomial_product(dfs)?;
        let expected_product = coeffs
            .iter()
            .fold(Goldilocks::one(), |acc, p| acc * p.evaluate(x));
        assert_eq!(product.degree(), (1..=7).sum::<usize>());
        assert_eq!(product.evaluate(x)?, expected_product);
        Ok(())
    }

    #[test]
    fn test_empty_inputs() -> anyhow::Result<()> {
        let x = Goldilocks::from_u64(4);
        assert_eq!(
            polynomial_sum::<Goldilocks>(vec![])?.evaluate(x)?,
            Goldilocks::zero()
        );
        assert_eq!(
            polynomial_product::<Goldilocks>(vec![])?.evaluate(x)?,
            Goldilocks::one()
        );
        Ok(())
    }
}
