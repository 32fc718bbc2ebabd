//! Fixed-width multiprecision arithmetic.
//!
//! - [`BigUint`]: `BITS`-bit unsigned integers on `u64` limbs.
//! - [`ModularParams`]: Barrett or Montgomery reduction for one modulus.
//! - [`BigMod`] / [`BigModRt`]: modular elements with a compile-time or a
//!   runtime modulus, unified by [`ModularElement`].
//! - [`FftField`]: the field interface used by the commitment scheme, with
//!   the [`Goldilocks`] and [`Bls12381Scalar`] instances.

#![allow(clippy::needless_range_loop)]

pub mod algorithms;
mod big_mod;
mod big_uint;
mod error;
mod fields;
mod limbs;
mod modular;

pub use algorithms::{inverse_mod, jacobi, ressol};
pub use big_mod::{BigMod, BigModRt, ModularElement, StaticModulus};
pub use big_uint::{BigUint, U256, U512, U64};
pub use error::{Error, Result};
pub use fields::{
    Bls12381Scalar, Bls12381ScalarModulus, FftField, FftModulus, Goldilocks, GoldilocksModulus,
};
pub use modular::{BarrettParams, ModularOps, ModularParams, MontgomeryParams};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}
