//! Modular arithmetic over a fixed modulus.
//!
//! [`ModularParams`] owns the precomputation for one modulus and exposes a
//! single contract regardless of the reduction in use. Values handed to and
//! returned from its arithmetic methods are in the *internal* representation:
//! plain residues for Barrett, `x·R mod M` for Montgomery. Use
//! [`ModularParams::adjust_modular`] and [`ModularParams::adjust_regular`] to
//! cross the boundary.

mod barrett;
mod montgomery;

pub use barrett::BarrettParams;
pub use montgomery::MontgomeryParams;

use crate::error::Result;
use crate::BigUint;

/// Reduction strategy chosen for a modulus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModularOps<const BITS: usize, const LIMBS: usize> {
    Barrett(BarrettParams<BITS, LIMBS>),
    Montgomery(MontgomeryParams<BITS, LIMBS>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModularParams<const BITS: usize, const LIMBS: usize> {
    ops: ModularOps<BITS, LIMBS>,
}

impl<const BITS: usize, const LIMBS: usize> ModularParams<BITS, LIMBS> {
    /// Montgomery for odd moduli, Barrett otherwise.
    pub fn new(modulus: BigUint<BITS, LIMBS>) -> Result<Self> {
        let params = if modulus.is_odd() {
            Self::montgomery(modulus)
        } else {
            Self::barrett(modulus)
        }?;
        log::trace!(
            "modulus {modulus:#x}: {} reduction",
            if params.is_montgomery() { "Montgomery" } else { "Barrett" }
        );
        Ok(params)
    }

    pub fn barrett(modulus: BigUint<BITS, LIMBS>) -> Result<Self> {
        Ok(Self {
            ops: ModularOps::Barrett(BarrettParams::new(modulus)?),
        })
    }

    /// Fails with [`Error::EvenModulusForMontgomery`](crate::Error) for even
    /// moduli.
    pub fn montgomery(modulus: BigUint<BITS, LIMBS>) -> Result<Self> {
        Ok(Self {
            ops: ModularOps::Montgomery(MontgomeryParams::new(modulus)?),
        })
    }

    pub fn ops(&self) -> &ModularOps<BITS, LIMBS> {
        &self.ops
    }

    pub fn is_montgomery(&self) -> bool {
        matches!(self.ops, ModularOps::Montgomery(_))
    }

    fn barrett_params(&self) -> &BarrettParams<BITS, LIMBS> {
        match &self.ops {
            ModularOps::Barrett(b) => b,
            ModularOps::Montgomery(m) => m.barrett(),
        }
    }

    pub fn modulus(&self) -> &BigUint<BITS, LIMBS> {
        self.barrett_params().modulus()
    }

    /// Reduces an arbitrary value to its canonical residue.
    pub fn reduce(&self, x: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        self.barrett_params().reduce(x)
    }

    /// Converts a regular value into the internal representation.
    pub fn adjust_modular(&self, x: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        match &self.ops {
            ModularOps::Barrett(b) => b.reduce(x),
            ModularOps::Montgomery(m) => m.to_montgomery(x),
        }
    }

    /// Converts from the internal representation back to a regular value.
    pub fn adjust_regular(&self, x: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        match &self.ops {
            ModularOps::Barrett(_) => *x,
            ModularOps::Montgomery(m) => m.from_montgomery(x),
        }
    }

    /// Internal representation of one.
    pub fn one(&self) -> BigUint<BITS, LIMBS> {
        match &self.ops {
            ModularOps::Barrett(_) => BigUint::ONE,
            ModularOps::Montgomery(m) => *m.one(),
        }
    }

    pub fn add(&self, a: &BigUint<BITS, LIMBS>, b: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        self.barrett_params().add(a, b)
    }

    pub fn sub(&self, a: &BigUint<BITS, LIMBS>, b: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        self.barrett_params().sub(a, b)
    }

    pub fn neg(&self, a: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        self.barrett_params().neg(a)
    }

    pub fn mul(&self, a: &BigUint<BITS, LIMBS>, b: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        match &self.ops {
            ModularOps::Barrett(p) => p.mul(a, b),
            ModularOps::Montgomery(p) => p.mul(a, b),
        }
    }

    /// `base^exp` in the internal representation, `exp` given as
    /// little-endian limbs.
    pub fn pow(&self, base: &BigUint<BITS, LIMBS>, exp: &[u64]) -> BigUint<BITS, LIMBS> {
        match &self.ops {
            ModularOps::Montgomery(p) => p.pow(base, exp),
            ModularOps::Barrett(p) => {
                let mut acc = BigUint::ONE;
                let mut square = *base;
                let bits = crate::limbs::bit_len(exp);
                for i in 0..bits {
                    if (exp[i / 64] >> (i % 64)) & 1 == 1 {
                        acc = p.mul(&acc, &square);
                    }
                    if i + 1 < bits {
                        square = p.mul(&square, &square);
                    }
                }
                acc
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::U256;

    #[test]
    fn test_strategy_follows_parity() -> anyhow::Result<()> {
        assert!(ModularParams::new(U256::from_u64(101))?.is_montgomery());
        assert!(!ModularParams::new(U256::from_u64(100))?.is_montgomery());
        assert!(ModularParams::<256, 4>::montgomery(U256::from_u64(100)).is_err());
        Ok(())
    }

    #[test]
    fn test_both_strategies_agree() -> anyhow::Result<()> {
        let m = U256::from_u64(1_000_000_007);
        let mont = ModularParams::montgomery(m)?;
        let barrett = ModularParams::barrett(m)?;
        let x = U256::from_u64(123_456_789_012);
        for params in [&mont, &barrett] {
            let xi = params.adjust_modular(&x);
            let y = params.adjust_regular(&params.pow(&xi, &[1_000_000_005]));
            // Fermat: x^(p-2) is the inverse of x.
            let check = params.adjust_regular(&params.mul(&params.adjust_modular(&y), &xi));
            assert_eq!(check, U256::ONE);
            assert_eq!(params.adjust_regular(&params.one()), U256::ONE);
        }
        Ok(())
    }

    #[test]
    fn test_add_then_subtract_is_zero() -> anyhow::Result<()> {
        let m = U256::from_u64(97);
        let params = ModularParams::new(m)?;
        let a = params.adjust_modular(&U256::from_u64(1000));
        let b = params.adjust_modular(&U256::from_u64(97 - 1000 % 97));
        assert_eq!(params.adjust_regular(&params.add(&a, &b)), U256::ZERO);
        assert_eq!(params.sub(&a, &a), U256::ZERO);
        Ok(())
    }
}
