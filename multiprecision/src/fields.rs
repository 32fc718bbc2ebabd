//! Prime fields with large two-adic subgroups, the scalar fields of the
//! commitment scheme.

use std::fmt;
use std::hash::Hash;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use rand::Rng;

use crate::big_mod::{BigMod, ModularElement, StaticModulus};
use crate::BigUint;

/// Field interface consumed by polynomial arithmetic, FFTs and FRI.
pub trait FftField:
    Copy
    + Default
    + Send
    + Sync
    + 'static
    + Eq
    + Hash
    + fmt::Debug
    + fmt::Display
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    const NAME: &'static str;
    /// Largest `k` such that `2^k` divides `p − 1`.
    const TWO_ADICITY: u32;
    /// Length of the canonical big-endian encoding.
    const ENCODED_LEN: usize;

    fn zero() -> Self;
    fn one() -> Self;
    fn from_u64(value: u64) -> Self;
    fn is_zero(&self) -> bool;
    fn square(&self) -> Self;
    fn pow_u64(&self, exp: u64) -> Self;
    /// `None` for zero.
    fn try_inverse(&self) -> Option<Self>;
    fn multiplicative_generator() -> Self;
    /// Primitive `2^log_n`-th root of unity, `g^((p−1)/2^log_n)`.
    fn root_of_unity(log_n: u32) -> Option<Self>;
    fn to_be_bytes(&self) -> Vec<u8>;
    /// Decodes a canonical encoding; `None` if the value is not below `p`.
    fn from_be_bytes(bytes: &[u8]) -> Option<Self>;
    /// Interprets arbitrary bytes as a big-endian integer reduced mod `p`.
    fn from_be_bytes_reduced(bytes: &[u8]) -> Self;
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self;

    fn double(&self) -> Self {
        *self + *self
    }

    /// Montgomery's batch inversion; zeros are left untouched.
    fn batch_inverse(values: &mut [Self]) {
        let mut prefix = Vec::with_capacity(values.len());
        let mut acc = Self::one();
        for v in values.iter() {
            prefix.push(acc);
            if !v.is_zero() {
                acc *= *v;
            }
        }
        let Some(mut inv) = acc.try_inverse() else {
            return;
        };
        for (v, before) in values.iter_mut().zip(prefix).rev() {
            if v.is_zero() {
                continue;
            }
            let next = inv * *v;
            *v = inv * before;
            inv = next;
        }
    }
}

/// A [`StaticModulus`] with the data needed for radix-2 FFTs.
pub trait FftModulus<const BITS: usize, const LIMBS: usize>: StaticModulus<BITS, LIMBS> {
    const NAME: &'static str;
    const TWO_ADICITY: u32;
    const GENERATOR: u64;
}

impl<const BITS: usize, const LIMBS: usize, M: FftModulus<BITS, LIMBS>> FftField
    for BigMod<BITS, LIMBS, M>
{
    const NAME: &'static str = M::NAME;
    const TWO_ADICITY: u32 = M::TWO_ADICITY;
    const ENCODED_LEN: usize = BigUint::<BITS, LIMBS>::BYTES;

    fn zero() -> Self {
        BigMod::zero()
    }

    fn one() -> Self {
        BigMod::one()
    }

    fn from_u64(value: u64) -> Self {
        BigMod::from_u64(value)
    }

    fn is_zero(&self) -> bool {
        ModularElement::is_zero(self)
    }

    fn square(&self) -> Self {
        ModularElement::square(self)
    }

    fn pow_u64(&self, exp: u64) -> Self {
        ModularElement::pow_u64(self, exp)
    }

    fn try_inverse(&self) -> Option<Self> {
        ModularElement::inverse(self).ok()
    }

    fn multiplicative_generator() -> Self {
        BigMod::from_u64(M::GENERATOR)
    }

    fn root_of_unity(log_n: u32) -> Option<Self> {
        if log_n > M::TWO_ADICITY {
            return None;
        }
        let exp = M::params().modulus().wrapping_sub(&BigUint::ONE) >> log_n as usize;
        Some(ModularElement::pow(&Self::multiplicative_generator(), &exp))
    }

    fn to_be_bytes(&self) -> Vec<u8> {
        self.to_uint().to_be_bytes()
    }

    fn from_be_bytes(bytes: &[u8]) -> Option<Self> {
        let value = BigUint::<BITS, LIMBS>::from_be_slice(bytes).ok()?;
        (&value < M::params().modulus()).then(|| BigMod::new(&value))
    }

    fn from_be_bytes_reduced(bytes: &[u8]) -> Self {
        let mut le = bytes.to_vec();
        le.reverse();
        let words: Vec<u64> = le
            .chunks(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf[..chunk.len()].copy_from_slice(chunk);
                u64::from_le_bytes(buf)
            })
            .collect();
        let params = M::params();
        let value = match params.ops() {
            crate::ModularOps::Barrett(b) => b.reduce_limbs(&words),
            crate::ModularOps::Montgomery(m) => m.barrett().reduce_limbs(&words),
        };
        BigMod::new(&value)
    }

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = vec![0u8; 2 * Self::ENCODED_LEN];
        rng.fill_bytes(&mut bytes);
        Self::from_be_bytes_reduced(&bytes)
    }
}

crate::define_modulus!(
    /// `p = 2^64 − 2^32 + 1`.
    pub GoldilocksModulus, 64, 1, "0xffffffff00000001"
);

impl FftModulus<64, 1> for GoldilocksModulus {
    const NAME: &'static str = "goldilocks";
    const TWO_ADICITY: u32 = 32;
    const GENERATOR: u64 = 7;
}

crate::define_modulus!(
    /// Order of the BLS12-381 prime subgroup.
    pub Bls12381ScalarModulus, 255, 4,
    "0x73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001"
);

impl FftModulus<255, 4> for Bls12381ScalarModulus {
    const NAME: &'static str = "bls12-381-scalar";
    const TWO_ADICITY: u32 = 32;
    const GENERATOR: u64 = 7;
}

pub type Goldilocks = BigMod<64, 1, GoldilocksModulus>;
pub type Bls12381Scalar = BigMod<255, 4, Bls12381ScalarModulus>;

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn check_roots<F: FftField>() {
        let max = F::root_of_unity(F::TWO_ADICITY).unwrap();
        let mut x = max;
        for _ in 0..F::TWO_ADICITY - 1 {
            x = x.square();
            assert_ne!(x, F::one());
        }
        assert_eq!(x, -F::one());
        assert_eq!(x.square(), F::one());
        assert!(F::root_of_unity(F::TWO_ADICITY + 1).is_none());
        assert_eq!(F::root_of_unity(0), Some(F::one()));
    }

    #[test]
    fn test_roots_of_unity() {
        check_roots::<Goldilocks>();
        check_roots::<Bls12381Scalar>();
    }

    fn check_field_laws<F: FftField>() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let a = F::random(&mut rng);
            let b = F::random(&mut rng);
            assert_eq!(a + b - b, a);
            assert_eq!((a * b).to_be_bytes().len(), F::ENCODED_LEN);
            if !a.is_zero() {
                assert_eq!(a * a.try_inverse().unwrap(), F::one());
            }
            assert_eq!(F::from_be_bytes(&a.to_be_bytes()), Some(a));
        }
    }

    #[test]
    fn test_field_laws() {
        check_field_laws::<Goldilocks>();
        check_field_laws::<Bls12381Scalar>();
    }

    #[test]
    fn test_goldilocks_wraps() {
        let p_minus_one = Goldilocks::from_u64(0xffff_ffff_0000_0000);
        assert_eq!(p_minus_one + Goldilocks::one(), Goldilocks::zero());
        assert_eq!(
            Goldilocks::from_be_bytes(&0xffff_ffff_0000_0001u64.to_be_bytes()),
            None
        );
        assert_eq!(
            Goldilocks::from_be_bytes_reduced(&0xffff_ffff_0000_0002u64.to_be_bytes()),
            Goldilocks::one()
        );
    }

    #[test]
    fn test_batch_inverse() {
        let mut values = vec![
            Goldilocks::from_u64(2),
            Goldilocks::zero(),
            Goldilocks::from_u64(5),
        ];
        Goldilocks::batch_inverse(&mut values);
        assert_eq!(values[0] * Goldilocks::from_u64(2), Goldilocks::one());
        assert!(FftField::is_zero(&values[1]));
        assert_eq!(values[2] * Goldilocks::from_u64(5), Goldilocks::one());
    }
}
