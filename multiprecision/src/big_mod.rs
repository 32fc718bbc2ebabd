//! Modular elements: [`BigMod`] with a compile-time modulus and [`BigModRt`]
//! with a modulus chosen at runtime. Both implement [`ModularElement`], over
//! which `pow`, `inverse` and `sqrt` are generic.

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::sync::Arc;

use crate::algorithms;
use crate::error::Result;
use crate::{BigUint, ModularParams};

/// Shared contract of modular elements.
///
/// Implementors store a residue in the internal representation of their
/// [`ModularParams`]; everything else is provided in terms of that.
pub trait ModularElement<const BITS: usize, const LIMBS: usize>:
    Clone + PartialEq + Eq + fmt::Debug
{
    fn params(&self) -> &ModularParams<BITS, LIMBS>;

    /// Internal representation (Montgomery form when applicable).
    fn raw(&self) -> &BigUint<BITS, LIMBS>;

    /// An element with the same modulus as `self` and the given internal
    /// representation.
    fn from_raw_like(&self, raw: BigUint<BITS, LIMBS>) -> Self;

    fn modulus(&self) -> BigUint<BITS, LIMBS> {
        *self.params().modulus()
    }

    /// Canonical value in `[0, M)`.
    fn to_uint(&self) -> BigUint<BITS, LIMBS> {
        self.params().adjust_regular(self.raw())
    }

    fn from_uint_like(&self, value: &BigUint<BITS, LIMBS>) -> Self {
        self.from_raw_like(self.params().adjust_modular(value))
    }

    fn zero_like(&self) -> Self {
        self.from_raw_like(BigUint::ZERO)
    }

    fn one_like(&self) -> Self {
        self.from_raw_like(self.params().one())
    }

    fn is_zero(&self) -> bool {
        self.raw().is_zero()
    }

    fn add_mod(&self, rhs: &Self) -> Self {
        self.from_raw_like(self.params().add(self.raw(), rhs.raw()))
    }

    fn sub_mod(&self, rhs: &Self) -> Self {
        self.from_raw_like(self.params().sub(self.raw(), rhs.raw()))
    }

    fn neg_mod(&self) -> Self {
        self.from_raw_like(self.params().neg(self.raw()))
    }

    fn mul_mod(&self, rhs: &Self) -> Self {
        self.from_raw_like(self.params().mul(self.raw(), rhs.raw()))
    }

    fn square(&self) -> Self {
        self.mul_mod(self)
    }

    fn pow<const B2: usize, const L2: usize>(&self, exp: &BigUint<B2, L2>) -> Self {
        algorithms::pow(self, exp)
    }

    fn pow_u64(&self, exp: u64) -> Self {
        self.from_raw_like(self.params().pow(self.raw(), &[exp]))
    }

    /// Fails when the element shares a factor with the modulus.
    fn inverse(&self) -> Result<Self> {
        algorithms::inverse(self)
    }

    /// Square root over a prime modulus.
    fn sqrt(&self) -> Result<Self> {
        algorithms::sqrt(self)
    }
}

/// Marker type carrying a modulus fixed at compile time.
///
/// Usually declared through [`define_modulus!`](crate::define_modulus).
pub trait StaticModulus<const BITS: usize, const LIMBS: usize>:
    'static + Copy + Send + Sync + fmt::Debug + Eq + Hash + Default
{
    fn params() -> &'static ModularParams<BITS, LIMBS>;
}

/// Declares a zero-sized [`StaticModulus`] whose parameters are computed once
/// on first use.
///
/// ```ignore
/// define_modulus!(pub Mersenne61, 64, 1, "0x1fffffffffffffff");
/// type F = BigMod<64, 1, Mersenne61>;
/// ```
#[macro_export]
macro_rules! define_modulus {
    ($(#[$meta:meta])* $vis:vis $name:ident, $bits:literal, $limbs:literal, $modulus:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        $vis struct $name;

        impl $crate::StaticModulus<$bits, $limbs> for $name {
            fn params() -> &'static $crate::ModularParams<$bits, $limbs> {
                static PARAMS: $crate::__private::Lazy<$crate::ModularParams<$bits, $limbs>> =
                    $crate::__private::Lazy::new(|| {
                        let modulus: $crate::BigUint<$bits, $limbs> =
                            $modulus.parse().expect("malformed modulus literal");
                        $crate::ModularParams::new(modulus).expect("unusable modulus")
                    });
                &PARAMS
            }
        }
    };
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BigMod<const BITS: usize, const LIMBS: usize, M: StaticModulus<BITS, LIMBS>> {
    raw: BigUint<BITS, LIMBS>,
    _modulus: PhantomData<M>,
}

impl<const BITS: usize, const LIMBS: usize, M: StaticModulus<BITS, LIMBS>> BigMod<BITS, LIMBS, M> {
    const fn from_raw(raw: BigUint<BITS, LIMBS>) -> Self {
        Self {
            raw,
            _modulus: PhantomData,
        }
    }

    pub fn new(value: &BigUint<BITS, LIMBS>) -> Self {
        Self::from_raw(M::params().adjust_modular(value))
    }

    pub fn from_u64(value: u64) -> Self {
        Self::new(&BigUint::from_u64(value))
    }

    pub const fn zero() -> Self {
        Self::from_raw(BigUint::ZERO)
    }

    pub fn one() -> Self {
        Self::from_raw(M::params().one())
    }

    pub fn modulus_params() -> &'static ModularParams<BITS, LIMBS> {
        M::params()
    }
}

impl<const BITS: usize, const LIMBS: usize, M: StaticModulus<BITS, LIMBS>>
    ModularElement<BITS, LIMBS> for BigMod<BITS, LIMBS, M>
{
    fn params(&self) -> &ModularParams<BITS, LIMBS> {
        M::params()
    }

    fn raw(&self) -> &BigUint<BITS, LIMBS> {
        &self.raw
    }

    fn from_raw_like(&self, raw: BigUint<BITS, LIMBS>) -> Self {
        Self::from_raw(raw)
    }
}

impl<const BITS: usize, const LIMBS: usize, M: StaticModulus<BITS, LIMBS>> Default
    for BigMod<BITS, LIMBS, M>
{
    fn default() -> Self {
        Self::zero()
    }
}

impl<const BITS: usize, const LIMBS: usize, M: StaticModulus<BITS, LIMBS>> fmt::Debug
    for BigMod<BITS, LIMBS, M>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_uint())
    }
}

impl<const BITS: usize, const LIMBS: usize, M: StaticModulus<BITS, LIMBS>> fmt::Display
    for BigMod<BITS, LIMBS, M>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_uint(), f)
    }
}

/// Modular element whose modulus is only known at runtime.
#[derive(Clone)]
pub struct BigModRt<const BITS: usize, const LIMBS: usize> {
    raw: BigUint<BITS, LIMBS>,
    params: Arc<ModularParams<BITS, LIMBS>>,
}

impl<const BITS: usize, const LIMBS: usize> BigModRt<BITS, LIMBS> {
    pub fn new(value: &BigUint<BITS, LIMBS>, params: Arc<ModularParams<BITS, LIMBS>>) -> Self {
        Self {
            raw: params.adjust_modular(value),
            params,
        }
    }

    /// Builds the parameters for `modulus` and wraps `value`.
    pub fn with_modulus(
        value: &BigUint<BITS, LIMBS>,
        modulus: &BigUint<BITS, LIMBS>,
    ) -> Result<Self> {
        Ok(Self::new(value, Arc::new(ModularParams::new(*modulus)?)))
    }

    pub fn shared_params(&self) -> &Arc<ModularParams<BITS, LIMBS>> {
        &self.params
    }
}

impl<const BITS: usize, const LIMBS: usize> ModularElement<BITS, LIMBS> for BigModRt<BITS, LIMBS> {
    fn params(&self) -> &ModularParams<BITS, LIMBS> {
        &self.params
    }

    fn raw(&self) -> &BigUint<BITS, LIMBS> {
        &self.raw
    }

    fn from_raw_like(&self, raw: BigUint<BITS, LIMBS>) -> Self {
        Self {
            raw,
            params: Arc::clone(&self.params),
        }
    }
}

impl<const BITS: usize, const LIMBS: usize> PartialEq for BigModRt<BITS, LIMBS> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
            && (Arc::ptr_eq(&self.params, &other.params)
                || self.params.modulus() == other.params.modulus())
    }
}

impl<const BITS: usize, const LIMBS: usize> Eq for BigModRt<BITS, LIMBS> {}

impl<const BITS: usize, const LIMBS: usize> fmt::Debug for BigModRt<BITS, LIMBS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} mod {:?}", self.to_uint(), self.params.modulus())
    }
}

impl<const BITS: usize, const LIMBS: usize> fmt::Display for BigModRt<BITS, LIMBS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_uint(), f)
    }
}

macro_rules! impl_arith_ops {
    ([$($generics:tt)*], $ty:ty) => {
        impl<$($generics)*> Add for $ty {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                self.add_mod(&rhs)
            }
        }

        impl<$($generics)*> Sub for $ty {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                self.sub_mod(&rhs)
            }
        }

        impl<$($generics)*> Mul for $ty {
            type Output = Self;
            fn mul(self, rhs: Self) -> Self {
                self.mul_mod(&rhs)
            }
        }

        impl<$($generics)*> Neg for $ty {
            type Output = Self;
            fn neg(self) -> Self {
                self.neg_mod()
            }
        }

        impl<$($generics)*> AddAssign for $ty {
            fn add_assign(&mut self, rhs: Self) {
                *self = self.add_mod(&rhs);
            }
        }

        impl<$($generics)*> SubAssign for $ty {
            fn sub_assign(&mut self, rhs: Self) {
                *self = self.sub_mod(&rhs);
            }
        }

        impl<$($generics)*> MulAssign for $ty {
            fn mul_assign(&mut self, rhs: Self) {
                *self = self.mul_mod(&rhs);
            }
        }
    };
}

impl_arith_ops!(
    [const BITS: usize, const LIMBS: usize, M: StaticModulus<BITS, LIMBS>],
    BigMod<BITS, LIMBS, M>
);
impl_arith_ops!([const BITS: usize, const LIMBS: usize], BigModRt<BITS, LIMBS>);
