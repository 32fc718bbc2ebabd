//! Fixed-width unsigned integers.
//!
//! A [`BigUint<BITS, LIMBS>`] stores `LIMBS = ⌈BITS / 64⌉` little-endian `u64`
//! limbs. Bits at positions `>= BITS` are always zero: every mutating
//! operation masks the top limb.

mod arith;
mod convert;

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::limbs;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BigUint<const BITS: usize, const LIMBS: usize> {
    limbs: [u64; LIMBS],
}

/// Word type of the EVM.
pub type U256 = BigUint<256, 4>;
/// Double-width EVM word, used for `ADDMOD` and `MULMOD`.
pub type U512 = BigUint<512, 8>;
pub type U64 = BigUint<64, 1>;

impl<const BITS: usize, const LIMBS: usize> BigUint<BITS, LIMBS> {
    const LIMBS_MATCH_BITS: () = assert!(
        BITS > 0 && LIMBS == BITS.div_ceil(64),
        "LIMBS must equal ceil(BITS / 64)"
    );

    /// Mask applied to the most significant limb.
    pub const MASK: u64 = if BITS % 64 == 0 {
        u64::MAX
    } else {
        (1 << (BITS % 64)) - 1
    };

    pub const ZERO: Self = {
        let () = Self::LIMBS_MATCH_BITS;
        Self { limbs: [0; LIMBS] }
    };

    pub const ONE: Self = {
        let mut limbs = [0; LIMBS];
        limbs[0] = 1;
        Self { limbs }
    };

    pub const MAX: Self = {
        let mut limbs = [u64::MAX; LIMBS];
        limbs[LIMBS - 1] = Self::MASK;
        Self { limbs }
    };

    pub const BITS: usize = BITS;

    /// Builds a value from little-endian limbs, truncating to `BITS` bits.
    pub const fn from_limbs(mut limbs: [u64; LIMBS]) -> Self {
        let () = Self::LIMBS_MATCH_BITS;
        limbs[LIMBS - 1] &= Self::MASK;
        Self { limbs }
    }

    /// Builds a value from a little-endian limb slice of any length.
    ///
    /// Fails with [`Error::Overflow`] if the slice holds a value that does
    /// not fit into `BITS` bits.
    pub fn from_limb_slice(slice: &[u64]) -> Result<Self> {
        if limbs::bit_len(slice) > BITS {
            return Err(Error::Overflow);
        }
        Ok(Self::from_limb_slice_truncated(slice))
    }

    /// Builds a value from a little-endian limb slice, keeping the low `BITS`
    /// bits.
    pub fn from_limb_slice_truncated(slice: &[u64]) -> Self {
        let mut limbs = [0; LIMBS];
        let n = slice.len().min(LIMBS);
        limbs[..n].copy_from_slice(&slice[..n]);
        Self::from_limbs(limbs)
    }

    pub const fn as_limbs(&self) -> &[u64; LIMBS] {
        &self.limbs
    }

    pub(crate) fn as_limbs_mut(&mut self) -> &mut [u64; LIMBS] {
        &mut self.limbs
    }

    #[inline]
    pub(crate) fn normalize(&mut self) {
        self.limbs[LIMBS - 1] &= Self::MASK;
    }

    pub const fn from_u64(value: u64) -> Self {
        let mut limbs = [0; LIMBS];
        limbs[0] = value;
        Self::from_limbs(limbs)
    }

    pub fn from_u128(value: u128) -> Self {
        let mut limbs = [0; LIMBS];
        limbs[0] = value as u64;
        if LIMBS > 1 {
            limbs[1] = (value >> 64) as u64;
        }
        Self::from_limbs(limbs)
    }

    /// Low 64 bits of the value.
    pub const fn low_u64(&self) -> u64 {
        self.limbs[0]
    }

    pub fn is_zero(&self) -> bool {
        self.limbs.iter().all(|&l| l == 0)
    }

    pub fn is_odd(&self) -> bool {
        self.limbs[0] & 1 == 1
    }

    pub fn is_even(&self) -> bool {
        !self.is_odd()
    }

    /// Number of significant bits; zero for zero.
    pub fn bit_len(&self) -> usize {
        limbs::bit_len(&self.limbs)
    }

    /// Position of the most significant set bit.
    pub fn msb(&self) -> Option<usize> {
        self.bit_len().checked_sub(1)
    }

    /// Position of the least significant set bit.
    pub fn lsb(&self) -> Option<usize> {
        self.limbs
            .iter()
            .position(|&l| l != 0)
            .map(|i| i * 64 + self.limbs[i].trailing_zeros() as usize)
    }

    pub fn leading_zeros(&self) -> usize {
        BITS - self.bit_len()
    }

    pub fn trailing_zeros(&self) -> usize {
        self.lsb().unwrap_or(BITS)
    }

    pub fn count_ones(&self) -> usize {
        self.limbs.iter().map(|l| l.count_ones() as usize).sum()
    }

    pub fn bit_test(&self, index: usize) -> bool {
        index < BITS && (self.limbs[index / 64] >> (index % 64)) & 1 == 1
    }

    /// Sets bit `index`; indices past the width are ignored.
    pub fn bit_set(&mut self, index: usize) {
        if index < BITS {
            self.limbs[index / 64] |= 1 << (index % 64);
        }
    }

    pub fn bit_unset(&mut self, index: usize) {
        if index < BITS {
            self.limbs[index / 64] &= !(1 << (index % 64));
        }
    }

    /// Returns a value of another width, dropping bits above the target width.
    pub fn resize<const B2: usize, const L2: usize>(&self) -> BigUint<B2, L2> {
        BigUint::<B2, L2>::from_limb_slice_truncated(&self.limbs)
    }

    /// Returns a value of another width, failing if it would be truncated.
    pub fn checked_resize<const B2: usize, const L2: usize>(&self) -> Result<BigUint<B2, L2>> {
        BigUint::<B2, L2>::from_limb_slice(&self.limbs)
    }
}

impl<const BITS: usize, const LIMBS: usize> Default for BigUint<BITS, LIMBS> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const BITS: usize, const LIMBS: usize> Ord for BigUint<BITS, LIMBS> {
    fn cmp(&self, other: &Self) -> Ordering {
        limbs::cmp(&self.limbs, &other.limbs)
    }
}

impl<const BITS: usize, const LIMBS: usize> PartialOrd for BigUint<BITS, LIMBS> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<const BITS: usize, const LIMBS: usize> num_traits::Zero for BigUint<BITS, LIMBS> {
    fn zero() -> Self {
        Self::ZERO
    }

    fn is_zero(&self) -> bool {
        BigUint::is_zero(self)
    }
}

impl<const BITS: usize, const LIMBS: usize> num_traits::One for BigUint<BITS, LIMBS> {
    fn one() -> Self {
        Self::ONE
    }
}

impl<const BITS: usize, const LIMBS: usize> num_traits::Bounded for BigUint<BITS, LIMBS> {
    fn min_value() -> Self {
        Self::ZERO
    }

    fn max_value() -> Self {
        Self::MAX
    }
}

static_assertions::assert_eq_size!(U256, [u64; 4]);
static_assertions::assert_eq_size!(U512, [u64; 8]);

#[cfg(test)]
mod tests {
    use super::*;

    type U130 = BigUint<130, 3>;

    #[test]
    fn test_top_limb_is_masked() {
        let x = U130::from_limbs([u64::MAX; 3]);
        assert_eq!(x.as_limbs()[2], 0b11);
        assert_eq!(x, U130::MAX);
        assert_eq!(x.bit_len(), 130);
    }

    #[test]
    fn test_bit_ops() {
        let mut x = U256::ZERO;
        assert_eq!(x.msb(), None);
        assert_eq!(x.lsb(), None);
        x.bit_set(200);
        x.bit_set(3);
        assert!(x.bit_test(200));
        assert!(!x.bit_test(199));
        assert_eq!(x.msb(), Some(200));
        assert_eq!(x.lsb(), Some(3));
        x.bit_unset(200);
        assert_eq!(x, U256::from_u64(8));
        // Out of range is a no-op.
        x.bit_set(256);
        assert_eq!(x.count_ones(), 1);
    }

    #[test]
    fn test_ordering_is_from_msb() {
        let small = U256::from_limbs([u64::MAX, u64::MAX, u64::MAX, 0]);
        let big = U256::from_limbs([0, 0, 0, 1]);
        assert!(small < big);
        assert_eq!(big.cmp(&big), Ordering::Equal);
    }

    #[test]
    fn test_resize() {
        let x = U256::from_limbs([1, 2, 3, 4]);
        let narrow: U130 = x.resize();
        assert_eq!(narrow.as_limbs(), &[1, 2, 3]);
        assert_eq!(x.checked_resize::<130, 3>(), Err(Error::Overflow));
        let wide: U512 = x.resize();
        assert_eq!(wide.resize::<256, 4>(), x);
    }
}
