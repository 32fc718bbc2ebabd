use super::barrett::BarrettParams;
use crate::error::{Error, Result};
use crate::limbs::{adc, mac};
use crate::BigUint;

/// Precomputation for Montgomery multiplication modulo an odd `M`, with
/// `R = 2^(64·LIMBS)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MontgomeryParams<const BITS: usize, const LIMBS: usize> {
    barrett: BarrettParams<BITS, LIMBS>,
    /// `−M⁻¹ mod 2^64`.
    m_prime: u64,
    /// `R mod M`, the Montgomery form of one.
    r_mod_m: BigUint<BITS, LIMBS>,
    /// `R² mod M`.
    r2: BigUint<BITS, LIMBS>,
    no_carry: bool,
}

impl<const BITS: usize, const LIMBS: usize> MontgomeryParams<BITS, LIMBS> {
    pub fn new(modulus: BigUint<BITS, LIMBS>) -> Result<Self> {
        if modulus.is_even() {
            return Err(Error::EvenModulusForMontgomery);
        }
        let barrett = BarrettParams::new(modulus)?;

        let m0 = modulus.as_limbs()[0];
        let mut inv: u64 = 1;
        for i in 1..64 {
            if (m0.wrapping_mul(inv) >> i) & 1 == 1 {
                inv |= 1 << i;
            }
        }
        let m_prime = inv.wrapping_neg();

        let mut r = vec![0u64; LIMBS + 1];
        r[LIMBS] = 1;
        let r_mod_m = barrett.reduce_limbs(&r);
        let r2 = barrett.mul(&r_mod_m, &r_mod_m);

        let top = modulus.as_limbs()[LIMBS - 1];
        let no_carry =
            LIMBS < 12 && top >> 63 == 0 && barrett.complement() != &BigUint::<BITS, LIMBS>::ONE;

        Ok(Self {
            barrett,
            m_prime,
            r_mod_m,
            r2,
            no_carry,
        })
    }

    pub fn barrett(&self) -> &BarrettParams<BITS, LIMBS> {
        &self.barrett
    }

    pub fn modulus(&self) -> &BigUint<BITS, LIMBS> {
        self.barrett.modulus()
    }

    pub fn m_prime(&self) -> u64 {
        self.m_prime
    }

    pub fn one(&self) -> &BigUint<BITS, LIMBS> {
        &self.r_mod_m
    }

    pub fn r2(&self) -> &BigUint<BITS, LIMBS> {
        &self.r2
    }

    pub fn uses_no_carry(&self) -> bool {
        self.no_carry
    }

    /// Montgomery product `a·b·R⁻¹ mod M` for operands below `M`.
    pub fn mul(&self, a: &BigUint<BITS, LIMBS>, b: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        if self.no_carry {
            self.mul_no_carry(a, b)
        } else {
            self.mul_cios(a, b)
        }
    }

    /// Coarsely integrated operand scanning, with two extra carry words.
    fn mul_cios(&self, a: &BigUint<BITS, LIMBS>, b: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        let m = self.modulus().as_limbs();
        let (a, b) = (a.as_limbs(), b.as_limbs());
        let mut t = [0u64; LIMBS];
        let mut t_hi = 0u64;
        let mut t_hi2;

        for i in 0..LIMBS {
            let mut carry = 0;
            for j in 0..LIMBS {
                (t[j], carry) = mac(t[j], a[j], b[i], carry);
            }
            (t_hi, t_hi2) = adc(t_hi, carry, 0);

            let q = t[0].wrapping_mul(self.m_prime);
            let (_, mut carry) = mac(t[0], q, m[0], 0);
            for j in 1..LIMBS {
                (t[j - 1], carry) = mac(t[j], q, m[j], carry);
            }
            (t[LIMBS - 1], carry) = adc(t_hi, carry, 0);
            t_hi = t_hi2 + carry;
        }

        self.final_subtraction(t, t_hi != 0)
    }

    /// Variant without the extra carry words, valid when the top bit of `M`
    /// is clear.
    fn mul_no_carry(
        &self,
        a: &BigUint<BITS, LIMBS>,
        b: &BigUint<BITS, LIMBS>,
    ) -> BigUint<BITS, LIMBS> {
        let m = self.modulus().as_limbs();
        let (a, b) = (a.as_limbs(), b.as_limbs());
        let mut t = [0u64; LIMBS];

        for i in 0..LIMBS {
            let (t0, mut carry_a) = mac(t[0], a[0], b[i], 0);
            t[0] = t0;
            let q = t0.wrapping_mul(self.m_prime);
            let (_, mut carry_m) = mac(t0, q, m[0], 0);
            for j in 1..LIMBS {
                (t[j], carry_a) = mac(t[j], a[j], b[i], carry_a);
                (t[j - 1], carry_m) = mac(t[j], q, m[j], carry_m);
            }
            t[LIMBS - 1] = carry_a.wrapping_add(carry_m);
        }

        self.final_subtraction(t, false)
    }

    fn final_subtraction(&self, t: [u64; LIMBS], overflow: bool) -> BigUint<BITS, LIMBS> {
        let modulus = self.modulus();
        let mut limbs = t;
        if overflow || crate::limbs::cmp(&limbs, modulus.as_limbs()).is_ge() {
            crate::limbs::sub_assign(&mut limbs, modulus.as_limbs());
        }
        BigUint::from_limbs(limbs)
    }

    /// `x·R mod M`.
    pub fn to_montgomery(&self, x: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        self.mul(&self.barrett.reduce(x), &self.r2)
    }

    /// `x·R⁻¹ mod M`.
    pub fn from_montgomery(&self, x: &BigUint<BITS, LIMBS>) -> BigUint<BITS, LIMBS> {
        self.mul(x, &BigUint::ONE)
    }

    /// Square-and-multiply from the least significant bit of `exp`, in
    /// Montgomery form.
    pub fn pow(&self, base: &BigUint<BITS, LIMBS>, exp: &[u64]) -> BigUint<BITS, LIMBS> {
        let mut acc = self.r_mod_m;
        let mut square = *base;
        let bits = crate::limbs::bit_len(exp);
        for i in 0..bits {
            if (exp[i / 64] >> (i % 64)) & 1 == 1 {
                acc = self.mul(&acc, &square);
            }
            if i + 1 < bits {
                square = self.mul(&square, &square);
            }
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::U256;

    fn bn254() -> U256 {
        "0x30644e72e131a029b85045b68181585d97816a916871ca8d3c208c16d87cfd47"
            .parse()
            .unwrap()
    }

    #[test]
    fn test_m_prime() -> anyhow::Result<()> {
        let params = MontgomeryParams::new(bn254())?;
        let m0 = bn254().as_limbs()[0];
        assert_eq!(m0.wrapping_mul(params.m_prime()), u64::MAX);
        Ok(())
    }

    #[test]
    fn test_roundtrip_and_product() -> anyhow::Result<()> {
        let m = bn254();
        let params = MontgomeryParams::new(m)?;
        assert!(params.uses_no_carry());
        let x = U256::from_u64(123_456_789);
        let y = U256::from_u64(987_654_321);
        let (xm, ym) = (params.to_montgomery(&x), params.to_montgomery(&y));
        assert_eq!(params.from_montgomery(&xm), x);
        let product = params.from_montgomery(&params.mul(&xm, &ym));
        assert_eq!(product, U256::from_u128(123_456_789u128 * 987_654_321u128));
        Ok(())
    }

    #[test]
    fn test_cios_and_no_carry_agree() -> anyhow::Result<()> {
        let params = MontgomeryParams::new(bn254())?;
        let a = params.to_montgomery(&"0x1234567890abcdef1234567890abcdef".parse()?);
        let b = params.to_montgomery(&bn254().wrapping_sub(&U256::from_u64(3)));
        assert_eq!(params.mul_cios(&a, &b), params.mul_no_carry(&a, &b));
        Ok(())
    }

    #[test]
    fn test_full_width_modulus_takes_cios() -> anyhow::Result<()> {
        // 2^256 - 189 is prime and has its top bit set.
        let m = U256::MAX.wrapping_sub(&U256::from_u64(188));
        let params = MontgomeryParams::new(m)?;
        assert!(!params.uses_no_carry());
        let x = m.wrapping_sub(&U256::ONE);
        let xm = params.to_montgomery(&x);
        // (-1)^2 = 1
        assert_eq!(params.from_montgomery(&params.mul(&xm, &xm)), U256::ONE);
        Ok(())
    }

    #[test]
    fn test_even_modulus_rejected() {
        assert_eq!(
            MontgomeryParams::new(U256::from_u64(10)).unwrap_err(),
            Error::EvenModulusForMontgomery
        );
    }
}
