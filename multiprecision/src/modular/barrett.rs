use crate::error::{Error, Result};
use crate::limbs;
use crate::BigUint;

/// Precomputation for Barrett reduction modulo an arbitrary `M > 1`.
///
/// `mu = ⌊2^(2k) / M⌋` with `k = ⌈log₂ M⌉` (the bit length of `M`), and
/// `complement = 2^BITS − M`, which lets additions subtract `M` with a single
/// wrapping add.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarrettParams<const BITS: usize, const LIMBS: usize> {
    modulus: BigUint<BITS, LIMBS>,
    complement: BigUint<BITS, LIMBS>,
    mu: Vec<u64>,
    shift: usize,
}

impl<const BITS: usize, const LIMBS: usize> BarrettParams<BITS, LIMBS> {
    pub fn new(modulus: BigUint<BITS, LIMBS>) -> Result<Self> {
        if modulus <= BigUint::ONE {
            return Err(Error::InvalidArgument(format!(
                "modulus must be greater than one, got {modulus}"
            )));
        }
        let shift = 2 * modulus.bit_len();
        let mut numerator = vec![0u64; shift / 64 + 1];
        numerator[shift / 64] = 1 << (shift % 64);
        let (mut mu, _) = limbs::div_rem(&numerator, modulus.as_limbs());
        mu.truncate(limbs::significant_len(&mu).max(1));
        Ok(Self {
            modulus,
            complement: modulus.wrapping_neg(),
            mu,
            shift,
        })
    }

    pub fn modulus(&self) -> &BigUint<BITS, LIMBS> {
        &self.modulus
    }

    pub fn complement(&self) -> &BigUint<BITS, LIMBS> {
        &self.complement
    }

    /// Reduces a little-endian value of arbitrary width modulo `M`.
    ///
    /// Inputs of at most `2k` bits take the Barrett path:
    /// `t = (z·mu) >> 2k`, `z' = z − t·M`, then conditional subtractions.
    /// Wider inputs fall back to long division.
    pub fn reduce_limbs(&self, z: &[u64]) -> BigUint<BITS, LIMBS> {
        if limbs::bit_len(z) > self.shift {
            let (_, r) = limbs::div_rem(z, self.modulus.as_limbs());
            return BigUint::from_limb_slice_truncated(&r);
        }
        let mut t = limbs::mul(z, &self.mu);
        limbs::shr_assign(&mut t, self.shift);
        let tm = limbs::mul(&t[..limbs::significant_len(&t).max(1)], self.modulus.as_limbs());

        let mut r = vec![0u64; z.len().max(LIMBS) + 1];
        r[..z.len()].copy_from_slice(z);
        let tm_len = limbs::significant_len(&tm).min(r.len());
        limbs::sub_assign(&mut r, &tm[..tm_len]);
        while limbs::cmp(&r, self.modulus.as_limbs()).is_ge() {
            limbs::sub_assign(&mut r, self.modulus.as_limbs());
        }
        BigUint::from_limb_slice_truncated(&r)
    }

    pub fn reduce(&self, x: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        if x < &self.modulus {
            return *x;
        }
        self.reduce_limbs(x.as_limbs())
    }

    /// `(a + b) mod M` for reduced operands.
    pub fn add(&self, a: &BigUint<BITS, LIMBS>, b: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        let (sum, carry) = a.overflowing_add(b);
        if carry || sum >= self.modulus {
            sum.wrapping_add(&self.complement)
        } else {
            sum
        }
    }

    /// `(a − b) mod M` for reduced operands.
    pub fn sub(&self, a: &BigUint<BITS, LIMBS>, b: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        let (diff, borrow) = a.overflowing_sub(b);
        if borrow {
            diff.wrapping_add(&self.modulus)
        } else {
            diff
        }
    }

    pub fn neg(&self, a: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        if a.is_zero() {
            *a
        } else {
            self.modulus.wrapping_sub(a)
        }
    }

    pub fn mul(&self, a: &BigUint<BITS, LIMBS>, b: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        self.reduce_limbs(&a.widening_mul(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::U256;

    #[test]
    fn test_barrett_matches_division() -> anyhow::Result<()> {
        let m: U256 = "0x30644e72e131a029b85045b68181585d97816a916871ca8d3c208c16d87cfd47".parse()?;
        let params = BarrettParams::new(m)?;
        let a: U256 = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef".parse()?;
        let b: U256 = "0x0fedcba9876543210fedcba9876543210fedcba9876543210fedcba98765432".parse()?;
        let (a, b) = (params.reduce(&a), params.reduce(&b));
        let wide = a.widening_mul(&b);
        let (_, expected) = limbs::div_rem(&wide, m.as_limbs());
        assert_eq!(params.mul(&a, &b), U256::from_limb_slice(&expected[..4])?);
        Ok(())
    }

    #[test]
    fn test_add_uses_complement() -> anyhow::Result<()> {
        // A modulus with the top bit set makes the carry path reachable.
        let m = U256::MAX.wrapping_sub(&U256::from_u64(188));
        let params = BarrettParams::new(m)?;
        let a = m.wrapping_sub(&U256::ONE);
        assert_eq!(params.add(&a, &a), m.wrapping_sub(&U256::from_u64(2)));
        assert_eq!(params.sub(&U256::ONE, &U256::from_u64(2)), a);
        assert_eq!(params.neg(&U256::ZERO), U256::ZERO);
        Ok(())
    }

    #[test]
    fn test_rejects_trivial_modulus() {
        assert!(BarrettParams::new(U256::ONE).is_err());
    }
}
