use std::ops::{
    Add, AddAssign, BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Div, Mul,
    MulAssign, Not, Rem, Shl, ShlAssign, Shr, ShrAssign, Sub, SubAssign,
};

use super::BigUint;
use crate::error::{Error, Result};
use crate::limbs;

impl<const BITS: usize, const LIMBS: usize> BigUint<BITS, LIMBS> {
    /// Returns `(a + b) mod 2^BITS` and whether the true sum reached `2^BITS`.
    pub fn overflowing_add(&self, rhs: &Self) -> (Self, bool) {
        let mut result = *self;
        let carry = limbs::add_assign(&mut result.limbs, &rhs.limbs);
        let spill = result.limbs[LIMBS - 1] & !Self::MASK != 0;
        result.normalize();
        (result, carry || spill)
    }

    pub fn wrapping_add(&self, rhs: &Self) -> Self {
        self.overflowing_add(rhs).0
    }

    pub fn checked_add(&self, rhs: &Self) -> Result<Self> {
        match self.overflowing_add(rhs) {
            (_, true) => Err(Error::Overflow),
            (sum, false) => Ok(sum),
        }
    }

    /// Returns `(a - b) mod 2^BITS` and whether `a < b`.
    pub fn overflowing_sub(&self, rhs: &Self) -> (Self, bool) {
        let mut result = *self;
        let borrow = limbs::sub_assign(&mut result.limbs, &rhs.limbs);
        result.normalize();
        (result, borrow)
    }

    pub fn wrapping_sub(&self, rhs: &Self) -> Self {
        self.overflowing_sub(rhs).0
    }

    pub fn checked_sub(&self, rhs: &Self) -> Result<Self> {
        match self.overflowing_sub(rhs) {
            (_, true) => Err(Error::Overflow),
            (diff, false) => Ok(diff),
        }
    }

    /// Two's complement negation, `(!x) + 1`.
    pub fn wrapping_neg(&self) -> Self {
        (!*self).wrapping_add(&Self::ONE)
    }

    /// Multiplies into a double-width accumulator and truncates, reporting
    /// whether any bit above `BITS` was set.
    pub fn overflowing_mul(&self, rhs: &Self) -> (Self, bool) {
        let wide = limbs::mul(&self.limbs, &rhs.limbs);
        let overflow = limbs::bit_len(&wide) > BITS;
        (Self::from_limb_slice_truncated(&wide), overflow)
    }

    pub fn wrapping_mul(&self, rhs: &Self) -> Self {
        self.overflowing_mul(rhs).0
    }

    pub fn checked_mul(&self, rhs: &Self) -> Result<Self> {
        match self.overflowing_mul(rhs) {
            (_, true) => Err(Error::Overflow),
            (product, false) => Ok(product),
        }
    }

    /// Full product as little-endian limbs (`2 * LIMBS` of them).
    pub fn widening_mul(&self, rhs: &Self) -> Vec<u64> {
        limbs::mul(&self.limbs, &rhs.limbs)
    }

    /// Euclidean division: `self = q * rhs + r` with `r < rhs`.
    pub fn div_rem(&self, rhs: &Self) -> Result<(Self, Self)> {
        if rhs.is_zero() {
            return Err(Error::DivisionByZero);
        }
        if self < rhs {
            return Ok((Self::ZERO, *self));
        }
        if LIMBS == 1 || limbs::significant_len(&self.limbs) <= 1 {
            let (a, b) = (self.limbs[0], rhs.limbs[0]);
            return Ok((Self::from_u64(a / b), Self::from_u64(a % b)));
        }
        let (q, r) = limbs::div_rem(&self.limbs, &rhs.limbs);
        Ok((
            Self::from_limb_slice_truncated(&q),
            Self::from_limb_slice_truncated(&r),
        ))
    }

    pub fn checked_div(&self, rhs: &Self) -> Result<Self> {
        self.div_rem(rhs).map(|(q, _)| q)
    }

    pub fn checked_rem(&self, rhs: &Self) -> Result<Self> {
        self.div_rem(rhs).map(|(_, r)| r)
    }

    /// Wrapping exponentiation by squaring.
    pub fn wrapping_pow(&self, mut exp: u64) -> Self {
        let mut base = *self;
        let mut acc = Self::ONE;
        while exp > 0 {
            if exp & 1 == 1 {
                acc = acc.wrapping_mul(&base);
            }
            base = base.wrapping_mul(&base);
            exp >>= 1;
        }
        acc
    }

    /// Greatest common divisor by the Euclidean algorithm.
    pub fn gcd(&self, rhs: &Self) -> Self {
        let (mut a, mut b) = (*self, *rhs);
        while !b.is_zero() {
            // `b` is non-zero, so the remainder is always defined.
            let r = a % b;
            a = b;
            b = r;
        }
        a
    }

    fn shl_bits(mut self, shift: usize) -> Self {
        if shift >= BITS {
            return Self::ZERO;
        }
        limbs::shl_assign(&mut self.limbs, shift);
        self.normalize();
        self
    }

    fn shr_bits(mut self, shift: usize) -> Self {
        if shift >= BITS {
            return Self::ZERO;
        }
        limbs::shr_assign(&mut self.limbs, shift);
        self
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:ident) => {
        impl<const BITS: usize, const LIMBS: usize> $trait for BigUint<BITS, LIMBS> {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self {
                self.$op(&rhs)
            }
        }

        impl<'a, const BITS: usize, const LIMBS: usize> $trait<&'a BigUint<BITS, LIMBS>>
            for &'a BigUint<BITS, LIMBS>
        {
            type Output = BigUint<BITS, LIMBS>;

            fn $method(self, rhs: Self) -> BigUint<BITS, LIMBS> {
                self.$op(rhs)
            }
        }

        impl<const BITS: usize, const LIMBS: usize> $assign_trait for BigUint<BITS, LIMBS> {
            fn $assign_method(&mut self, rhs: Self) {
                *self = self.$op(&rhs);
            }
        }
    };
}

impl_binary_op!(Add, add, AddAssign, add_assign, wrapping_add);
impl_binary_op!(Sub, sub, SubAssign, sub_assign, wrapping_sub);
impl_binary_op!(Mul, mul, MulAssign, mul_assign, wrapping_mul);

impl<const BITS: usize, const LIMBS: usize> Div for BigUint<BITS, LIMBS> {
    type Output = Self;

    /// # Panics
    ///
    /// Panics on division by zero, like the primitive integer types.
    fn div(self, rhs: Self) -> Self {
        match self.div_rem(&rhs) {
            Ok((q, _)) => q,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<const BITS: usize, const LIMBS: usize> Rem for BigUint<BITS, LIMBS> {
    type Output = Self;

    /// # Panics
    ///
    /// Panics on division by zero, like the primitive integer types.
    fn rem(self, rhs: Self) -> Self {
        match self.div_rem(&rhs) {
            Ok((_, r)) => r,
            Err(e) => panic!("{e}"),
        }
    }
}

macro_rules! impl_bit_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:tt) => {
        impl<const BITS: usize, const LIMBS: usize> $trait for BigUint<BITS, LIMBS> {
            type Output = Self;

            fn $method(mut self, rhs: Self) -> Self {
                for (a, b) in self.limbs.iter_mut().zip(rhs.limbs) {
                    *a = *a $op b;
                }
                self
            }
        }

        impl<const BITS: usize, const LIMBS: usize> $assign_trait for BigUint<BITS, LIMBS> {
            fn $assign_method(&mut self, rhs: Self) {
                *self = *self $op rhs;
            }
        }
    };
}

impl_bit_op!(BitAnd, bitand, BitAndAssign, bitand_assign, &);
impl_bit_op!(BitOr, bitor, BitOrAssign, bitor_assign, |);
impl_bit_op!(BitXor, bitxor, BitXorAssign, bitxor_assign, ^);

impl<const BITS: usize, const LIMBS: usize> Not for BigUint<BITS, LIMBS> {
    type Output = Self;

    fn not(mut self) -> Self {
        for limb in self.limbs.iter_mut() {
            *limb = !*limb;
        }
        self.normalize();
        self
    }
}

impl<const BITS: usize, const LIMBS: usize> Shl<usize> for BigUint<BITS, LIMBS> {
    type Output = Self;

    fn shl(self, shift: usize) -> Self {
        self.shl_bits(shift)
    }
}

impl<const BITS: usize, const LIMBS: usize> Shr<usize> for BigUint<BITS, LIMBS> {
    type Output = Self;

    fn shr(self, shift: usize) -> Self {
        self.shr_bits(shift)
    }
}

impl<const BITS: usize, const LIMBS: usize> ShlAssign<usize> for BigUint<BITS, LIMBS> {
    fn shl_assign(&mut self, shift: usize) {
        *self = self.shl_bits(shift);
    }
}

impl<const BITS: usize, const LIMBS: usize> ShrAssign<usize> for BigUint<BITS, LIMBS> {
    fn shr_assign(&mut self, shift: usize) {
        *self = self.shr_bits(shift);
    }
}
