//! Limb-level kernels shared by [`BigUint`](crate::BigUint) and the modular
//! reductions. Limbs are little-endian `u64` words; slices may have any
//! length so that double-width intermediate values can reuse the same code.

use std::cmp::Ordering;

/// Add with carry: returns `(a + b + carry) mod 2^64` and the outgoing carry.
#[inline(always)]
pub(crate) const fn adc(a: u64, b: u64, carry: u64) -> (u64, u64) {
    let t = a as u128 + b as u128 + carry as u128;
    (t as u64, (t >> 64) as u64)
}

/// Subtract with borrow: returns `(a - b - borrow) mod 2^64` and the outgoing
/// borrow (0 or 1).
#[inline(always)]
pub(crate) const fn sbb(a: u64, b: u64, borrow: u64) -> (u64, u64) {
    let t = (a as u128).wrapping_sub(b as u128 + borrow as u128);
    (t as u64, (t >> 127) as u64)
}

/// Multiply-accumulate: returns the low and high words of `acc + a * b + carry`.
#[inline(always)]
pub(crate) const fn mac(acc: u64, a: u64, b: u64, carry: u64) -> (u64, u64) {
    let t = acc as u128 + (a as u128) * (b as u128) + carry as u128;
    (t as u64, (t >> 64) as u64)
}

/// `a += b`, where `b` may be shorter than `a`. Returns the final carry.
pub(crate) fn add_assign(a: &mut [u64], b: &[u64]) -> bool {
    debug_assert!(b.len() <= a.len());
    let mut carry = 0;
    for (i, limb) in a.iter_mut().enumerate() {
        let rhs = b.get(i).copied().unwrap_or(0);
        if i >= b.len() && carry == 0 {
            break;
        }
        (*limb, carry) = adc(*limb, rhs, carry);
    }
    carry != 0
}

/// `a -= b`, where `b` may be shorter than `a`. Returns the final borrow.
pub(crate) fn sub_assign(a: &mut [u64], b: &[u64]) -> bool {
    debug_assert!(b.len() <= a.len());
    let mut borrow = 0;
    for (i, limb) in a.iter_mut().enumerate() {
        let rhs = b.get(i).copied().unwrap_or(0);
        if i >= b.len() && borrow == 0 {
            break;
        }
        (*limb, borrow) = sbb(*limb, rhs, borrow);
    }
    borrow != 0
}

/// Schoolbook multiplication into a zeroed accumulator of at least
/// `a.len() + b.len()` limbs. Limbs of `out` beyond that are left untouched.
pub(crate) fn mul_into(out: &mut [u64], a: &[u64], b: &[u64]) {
    debug_assert!(out.len() >= a.len() + b.len());
    out[..a.len() + b.len()].fill(0);
    for (i, &bi) in b.iter().enumerate() {
        if bi == 0 {
            continue;
        }
        let mut carry = 0;
        for (j, &aj) in a.iter().enumerate() {
            (out[i + j], carry) = mac(out[i + j], aj, bi, carry);
        }
        out[i + a.len()] = carry;
    }
}

/// Full product of two limb slices.
pub(crate) fn mul(a: &[u64], b: &[u64]) -> Vec<u64> {
    let mut out = vec![0; a.len() + b.len()];
    mul_into(&mut out, a, b);
    out
}

/// Number of limbs up to and including the most significant non-zero one.
pub(crate) fn significant_len(a: &[u64]) -> usize {
    a.iter().rposition(|&l| l != 0).map_or(0, |i| i + 1)
}

/// Number of significant bits.
pub(crate) fn bit_len(a: &[u64]) -> usize {
    match significant_len(a) {
        0 => 0,
        n => 64 * n - a[n - 1].leading_zeros() as usize,
    }
}

/// Compares two limb slices of possibly different lengths.
pub(crate) fn cmp(a: &[u64], b: &[u64]) -> Ordering {
    let n = a.len().max(b.len());
    for i in (0..n).rev() {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// In-place left shift; bits shifted past the end of the slice are lost.
pub(crate) fn shl_assign(a: &mut [u64], shift: usize) {
    let n = a.len();
    let limb_shift = shift / 64;
    let bit_shift = (shift % 64) as u32;
    if limb_shift >= n {
        a.fill(0);
        return;
    }
    if limb_shift > 0 {
        for i in (limb_shift..n).rev() {
            a[i] = a[i - limb_shift];
        }
        a[..limb_shift].fill(0);
    }
    if bit_shift > 0 {
        for i in (limb_shift..n).rev() {
            let lower = if i > limb_shift { a[i - 1] >> (64 - bit_shift) } else { 0 };
            a[i] = (a[i] << bit_shift) | lower;
        }
    }
}

/// In-place logical right shift.
pub(crate) fn shr_assign(a: &mut [u64], shift: usize) {
    let n = a.len();
    let limb_shift = shift / 64;
    let bit_shift = (shift % 64) as u32;
    if limb_shift >= n {
        a.fill(0);
        return;
    }
    if limb_shift > 0 {
        for i in 0..n - limb_shift {
            a[i] = a[i + limb_shift];
        }
        a[n - limb_shift..].fill(0);
    }
    if bit_shift > 0 {
        let top = n - limb_shift;
        for i in 0..top {
            let upper = if i + 1 < top { a[i + 1] << (64 - bit_shift) } else { 0 };
            a[i] = (a[i] >> bit_shift) | upper;
        }
    }
}

/// Divides a limb slice by a single non-zero limb, returning the remainder.
fn div_rem_small(u: &[u64], v: u64) -> (Vec<u64>, u64) {
    let mut q = vec![0; u.len()];
    let mut rem: u128 = 0;
    for i in (0..u.len()).rev() {
        let cur = (rem << 64) | u[i] as u128;
        q[i] = (cur / v as u128) as u64;
        rem = cur % v as u128;
    }
    (q, rem as u64)
}

/// Schoolbook long division (Knuth, algorithm D).
///
/// Returns `(quotient, remainder)` with `u = quotient * v + remainder` and
/// `remainder < v`. The quotient has `u.len()` limbs and the remainder
/// `v.len()` limbs. `v` must be non-zero.
pub(crate) fn div_rem(u: &[u64], v: &[u64]) -> (Vec<u64>, Vec<u64>) {
    let n = significant_len(v);
    assert!(n > 0, "division by zero");
    let m_len = significant_len(u);

    let mut quotient = vec![0; u.len().max(1)];
    let mut remainder = vec![0; v.len()];

    if m_len < n || cmp(&u[..m_len], &v[..n]) == Ordering::Less {
        remainder[..m_len].copy_from_slice(&u[..m_len]);
        return (quotient, remainder);
    }

    if n == 1 {
        let (q, r) = div_rem_small(&u[..m_len], v[0]);
        quotient[..m_len].copy_from_slice(&q);
        remainder[0] = r;
        return (quotient, remainder);
    }

    // Normalise so that the top limb of the divisor has its high bit set.
    let s = v[n - 1].leading_zeros() as usize;
    let mut vn = v[..n].to_vec();
    shl_assign(&mut vn, s);
    let mut un = vec![0; m_len + 1];
    un[..m_len].copy_from_slice(&u[..m_len]);
    shl_assign(&mut un, s);

    const BASE: u128 = 1 << 64;
    let v_top = vn[n - 1] as u128;
    let v_next = vn[n - 2] as u128;

    for j in (0..=m_len - n).rev() {
        let num = ((un[j + n] as u128) << 64) | un[j + n - 1] as u128;
        let mut qhat = num / v_top;
        let mut rhat = num % v_top;
        while qhat >= BASE || qhat * v_next > ((rhat << 64) | un[j + n - 2] as u128) {
            qhat -= 1;
            rhat += v_top;
            if rhat >= BASE {
                break;
            }
        }

        // Multiply and subtract.
        let mut carry = 0u64;
        let mut borrow = 0u64;
        for i in 0..n {
            let p = qhat * vn[i] as u128 + carry as u128;
            carry = (p >> 64) as u64;
            (un[i + j], borrow) = sbb(un[i + j], p as u64, borrow);
        }
        let (top, b) = sbb(un[j + n], carry, borrow);
        un[j + n] = top;

        if b != 0 {
            // The estimate was one too large: add the divisor back.
            qhat -= 1;
            let mut c = 0;
            for i in 0..n {
                (un[i + j], c) = adc(un[i + j], vn[i], c);
            }
            un[j + n] = un[j + n].wrapping_add(c);
        }
        quotient[j] = qhat as u64;
    }

    shr_assign(&mut un, s);
    remainder[..n].copy_from_slice(&un[..n]);
    (quotient, remainder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adc_sbb_carries() {
        assert_eq!(adc(u64::MAX, 1, 0), (0, 1));
        assert_eq!(adc(u64::MAX, u64::MAX, 1), (u64::MAX, 1));
        assert_eq!(sbb(0, 1, 0), (u64::MAX, 1));
        assert_eq!(sbb(5, 3, 1), (1, 0));
    }

    #[test]
    fn test_shift_roundtrip() {
        let mut a = [0x0123_4567_89ab_cdef, 0xfedc_ba98_7654_3210, 0];
        shl_assign(&mut a, 68);
        assert_eq!(a, [0, 0x1234_5678_9abc_def0, 0xedcb_a987_6543_2100]);
        shr_assign(&mut a, 68);
        assert_eq!(a, [0x0123_4567_89ab_cdef, 0x0edc_ba98_7654_3210, 0]);
    }

    #[test]
    fn test_div_rem_multi_limb() {
        // (2^128 + 5) / (2^64 + 1)
        let u = [5, 0, 1];
        let v = [1, 1];
        let (q, r) = div_rem(&u, &v);
        // q = 2^64 - 1, r = 6
        assert_eq!(&q[..2], &[u64::MAX, 0]);
        assert_eq!(r, vec![6, 0]);
    }
}
