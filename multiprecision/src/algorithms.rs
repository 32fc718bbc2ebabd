//! Number-theoretic routines on plain integers and, through
//! [`ModularElement`], on modular elements of either flavour.

use crate::error::{Error, Result};
use crate::{limbs, BigUint, ModularElement, ModularParams};

fn mul_mod_wide<const BITS: usize, const LIMBS: usize>(
    a: &BigUint<BITS, LIMBS>,
    b: &BigUint<BITS, LIMBS>,
    m: &BigUint<BITS, LIMBS>,
) -> BigUint<BITS, LIMBS> {
    let (_, r) = limbs::div_rem(&a.widening_mul(b), m.as_limbs());
    BigUint::from_limb_slice_truncated(&r)
}

/// Multiplicative inverse of `a` modulo `m` by the extended Euclidean
/// algorithm.
///
/// Fails with [`Error::InvalidArgument`] when `gcd(a, m) ≠ 1` or `m = 0`.
pub fn inverse_mod<const BITS: usize, const LIMBS: usize>(
    a: &BigUint<BITS, LIMBS>,
    m: &BigUint<BITS, LIMBS>,
) -> Result<BigUint<BITS, LIMBS>> {
    if m.is_zero() {
        return Err(Error::InvalidArgument("modulus is zero".to_string()));
    }
    if *m == BigUint::ONE {
        return Ok(BigUint::ZERO);
    }
    let (mut r0, mut r1) = (*m, a.checked_rem(m)?);
    let (mut s0, mut s1) = (BigUint::ZERO, BigUint::ONE);
    while !r1.is_zero() {
        let (q, r) = r0.div_rem(&r1)?;
        (r0, r1) = (r1, r);
        let t = mul_mod_wide(&q, &s1, m);
        let next = if s0 >= t {
            s0.wrapping_sub(&t)
        } else {
            m.wrapping_sub(&t).wrapping_add(&s0)
        };
        (s0, s1) = (s1, next);
    }
    if r0 != BigUint::ONE {
        return Err(Error::InvalidArgument(format!(
            "{a} is not invertible modulo {m}"
        )));
    }
    Ok(s0)
}

/// Jacobi symbol `(a / n)` for odd `n`.
pub fn jacobi<const BITS: usize, const LIMBS: usize>(
    a: &BigUint<BITS, LIMBS>,
    n: &BigUint<BITS, LIMBS>,
) -> Result<i8> {
    if n.is_even() {
        return Err(Error::InvalidArgument(format!(
            "Jacobi symbol needs an odd modulus, got {n}"
        )));
    }
    let mut a = a.checked_rem(n)?;
    let mut n = *n;
    let mut result = 1i8;
    while !a.is_zero() {
        while a.is_even() {
            a >>= 1;
            if matches!(n.low_u64() & 7, 3 | 5) {
                result = -result;
            }
        }
        std::mem::swap(&mut a, &mut n);
        if a.low_u64() & 3 == 3 && n.low_u64() & 3 == 3 {
            result = -result;
        }
        a = a.checked_rem(&n)?;
    }
    Ok(if n == BigUint::ONE { result } else { 0 })
}

/// Modular square root modulo an odd prime `p` (Tonelli-Shanks).
///
/// Returns zero for `a ≡ 0`. Fails with [`Error::InvalidArgument`] when `a`
/// is not a quadratic residue.
pub fn ressol<const BITS: usize, const LIMBS: usize>(
    a: &BigUint<BITS, LIMBS>,
    p: &BigUint<BITS, LIMBS>,
) -> Result<BigUint<BITS, LIMBS>> {
    let a = a.checked_rem(p)?;
    if a.is_zero() {
        return Ok(a);
    }
    if *p == BigUint::from_u64(2) {
        return Ok(a);
    }
    if jacobi(&a, p)? != 1 {
        return Err(Error::InvalidArgument(format!(
            "{a} is not a quadratic residue modulo {p}"
        )));
    }

    let params = ModularParams::new(*p)?;
    let am = params.adjust_modular(&a);
    let one = params.one();

    if p.low_u64() & 3 == 3 {
        // (p + 1) / 4 without overflowing the width.
        let exp = (*p >> 2).wrapping_add(&BigUint::ONE);
        return Ok(params.adjust_regular(&params.pow(&am, exp.as_limbs())));
    }

    let p_minus_one = p.wrapping_sub(&BigUint::ONE);
    let s = p_minus_one.trailing_zeros();
    let q = p_minus_one >> s;

    let mut z = BigUint::from_u64(2);
    while jacobi(&z, p)? != -1 {
        z = z.wrapping_add(&BigUint::ONE);
    }

    let mut m = s;
    let mut c = params.pow(&params.adjust_modular(&z), q.as_limbs());
    let mut t = params.pow(&am, q.as_limbs());
    let half = (q >> 1).wrapping_add(&BigUint::ONE);
    let mut r = params.pow(&am, half.as_limbs());

    while t != one {
        let mut i = 0;
        let mut t2 = t;
        while t2 != one {
            t2 = params.mul(&t2, &t2);
            i += 1;
            if i == m {
                return Err(Error::InvalidArgument(format!(
                    "{a} is not a quadratic residue modulo {p}"
                )));
            }
        }
        let mut b = c;
        for _ in 0..m - i - 1 {
            b = params.mul(&b, &b);
        }
        m = i;
        c = params.mul(&b, &b);
        t = params.mul(&t, &c);
        r = params.mul(&r, &b);
    }
    Ok(params.adjust_regular(&r))
}

/// `base^exp` for any modular element.
pub fn pow<const BITS: usize, const LIMBS: usize, const B2: usize, const L2: usize, E>(
    base: &E,
    exp: &BigUint<B2, L2>,
) -> E
where
    E: ModularElement<BITS, LIMBS>,
{
    base.from_raw_like(base.params().pow(base.raw(), exp.as_limbs()))
}

/// Multiplicative inverse of any modular element.
pub fn inverse<const BITS: usize, const LIMBS: usize, E>(x: &E) -> Result<E>
where
    E: ModularElement<BITS, LIMBS>,
{
    let inv = inverse_mod(&x.to_uint(), x.params().modulus())?;
    Ok(x.from_uint_like(&inv))
}

/// Square root of any modular element over a prime modulus.
pub fn sqrt<const BITS: usize, const LIMBS: usize, E>(x: &E) -> Result<E>
where
    E: ModularElement<BITS, LIMBS>,
{
    let root = ressol(&x.to_uint(), x.params().modulus())?;
    Ok(x.from_uint_like(&root))
}

#[cfg(test)]
mod tests {
    use super::*;

    type U4 = BigUint<4, 1>;
    type U18 = BigUint<18, 1>;
    type U224 = BigUint<224, 4>;
    type U521 = BigUint<521, 9>;
    type U315 = BigUint<315, 5>;

    #[test]
    fn test_ressol_small() -> anyhow::Result<()> {
        assert_eq!(ressol(&U4::from(0u8), &U4::from(11u8))?, U4::ZERO);
        assert_eq!(ressol(&U4::from(5u8), &U4::from(11u8))?, U4::from(4u8));
        assert!(ressol(&U4::from(10u8), &U4::from(11u8)).is_err());
        assert!(ressol(&U4::from(2u8), &U4::from(11u8)).is_err());
        assert_eq!(
            ressol(&U18::from(1024u32), &U18::from(174_763u32))?,
            U18::from(174_731u32)
        );
        Ok(())
    }

    fn assert_is_root<const B: usize, const L: usize>(
        a: &BigUint<B, L>,
        p: &BigUint<B, L>,
    ) -> anyhow::Result<()> {
        let r = ressol(a, p)?;
        assert_eq!(mul_mod_wide(&r, &r, p), a.checked_rem(p)?);
        Ok(())
    }

    #[test]
    fn test_ressol_tonelli_shanks_branch() -> anyhow::Result<()> {
        // p ≡ 1 (mod 4) forces the full Tonelli-Shanks loop.
        let p: U224 = "26959946667150639794667015087019630673557916260026308143510066298881".parse()?;
        let a: U224 = "20749193632488214633180774027217139706413443729200940480695355894185".parse()?;
        assert_is_root(&a, &p)?;

        let p: U315 =
            "0x40000000000000000000000000000000000000000000000000000000000c100000000000000ffff"
                .parse()?;
        for a in [1024u64, 16, 120_846_049, 1025] {
            assert_is_root(&U315::from(a), &p)?;
        }
        Ok(())
    }

    #[test]
    fn test_ressol_large_prime() -> anyhow::Result<()> {
        // 2^521 - 1
        let p = U521::MAX;
        assert_is_root(&U521::from(5u8), &p)?;
        // p ≡ 3 (mod 4), so -1 is a non-residue.
        let minus_one = p.wrapping_sub(&U521::ONE);
        assert!(matches!(
            ressol(&minus_one, &p),
            Err(Error::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn test_inverse_mod() -> anyhow::Result<()> {
        let m = U224::from(1_000_000_007u64);
        let a = U224::from(123_456_789u64);
        let inv = inverse_mod(&a, &m)?;
        assert_eq!(mul_mod_wide(&a, &inv, &m), U224::ONE);
        assert!(matches!(
            inverse_mod(&U224::from(6u8), &U224::from(9u8)),
            Err(Error::InvalidArgument(_))
        ));
        Ok(())
    }

    #[test]
    fn test_jacobi() -> anyhow::Result<()> {
        let n = U224::from(11u8);
        assert_eq!(jacobi(&U224::from(5u8), &n)?, 1);
        assert_eq!(jacobi(&U224::from(2u8), &n)?, -1);
        assert_eq!(jacobi(&U224::from(22u8), &n)?, 0);
        assert!(jacobi(&U224::from(3u8), &U224::from(10u8)).is_err());
        Ok(())
    }
}
