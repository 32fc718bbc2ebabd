//! The 256-bit EVM word and the two's-complement views the signed opcodes
//! take of it.

use ethereum_types::{Address, H256};
use zk_evm_multiprecision::{U256, U512};

/// Word of the EVM stack, storage and memory loads.
pub type Word = U256;

const SIGN_BIT: usize = 255;

pub fn is_negative(x: &Word) -> bool {
    x.bit_test(SIGN_BIT)
}

pub fn negate(x: &Word) -> Word {
    x.wrapping_neg()
}

/// Absolute value of a two's-complement word. `abs(MIN) = MIN`.
pub fn abs(x: &Word) -> Word {
    if is_negative(x) {
        negate(x)
    } else {
        *x
    }
}

pub fn slt(a: &Word, b: &Word) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

pub fn sgt(a: &Word, b: &Word) -> bool {
    slt(b, a)
}

/// `DIV`: quotient rounded towards zero, `x / 0 = 0`.
pub fn div(a: &Word, b: &Word) -> Word {
    a.checked_div(b).unwrap_or(Word::ZERO)
}

/// `MOD`: `x % 0 = 0`.
pub fn rem(a: &Word, b: &Word) -> Word {
    a.checked_rem(b).unwrap_or(Word::ZERO)
}

/// `SDIV`. `MIN / -1` wraps back to `MIN`.
pub fn sdiv(a: &Word, b: &Word) -> Word {
    if b.is_zero() {
        return Word::ZERO;
    }
    let q = div(&abs(a), &abs(b));
    if is_negative(a) != is_negative(b) {
        negate(&q)
    } else {
        q
    }
}

/// `SMOD`: the result takes the sign of the dividend.
pub fn smod(a: &Word, b: &Word) -> Word {
    if b.is_zero() {
        return Word::ZERO;
    }
    let r = rem(&abs(a), &abs(b));
    if is_negative(a) {
        negate(&r)
    } else {
        r
    }
}

pub fn addmod(a: &Word, b: &Word, n: &Word) -> Word {
    if n.is_zero() {
        return Word::ZERO;
    }
    let sum = a.resize::<512, 8>() + b.resize::<512, 8>();
    (sum % n.resize::<512, 8>()).resize()
}

pub fn mulmod(a: &Word, b: &Word, n: &Word) -> Word {
    if n.is_zero() {
        return Word::ZERO;
    }
    let product = U512::from_limb_slice_truncated(&a.widening_mul(b));
    (product % n.resize::<512, 8>()).resize()
}

/// `EXP` by square-and-multiply over the bits of the exponent.
pub fn exp(base: &Word, exponent: &Word) -> Word {
    let mut acc = Word::ONE;
    for i in (0..exponent.bit_len()).rev() {
        acc = acc.wrapping_mul(&acc);
        if exponent.bit_test(i) {
            acc = acc.wrapping_mul(base);
        }
    }
    acc
}

/// Number of bytes needed to represent `x`, which prices `EXP`.
pub fn count_significant_bytes(x: &Word) -> u64 {
    x.bit_len().div_ceil(8) as u64
}

/// `SIGNEXTEND`: extends the sign bit of byte `b` (counted from the least
/// significant end) over the higher bytes.
pub fn signextend(b: &Word, x: &Word) -> Word {
    let Ok(b) = usize::try_from(b) else {
        return *x;
    };
    if b >= 31 {
        return *x;
    }
    let bit = 8 * b + 7;
    let low_mask = (Word::ONE << (bit + 1)).wrapping_sub(&Word::ONE);
    if x.bit_test(bit) {
        *x | !low_mask
    } else {
        *x & low_mask
    }
}

/// `BYTE`: the `i`-th byte of `x`, counted from the most significant end.
pub fn byte(i: &Word, x: &Word) -> Word {
    match usize::try_from(i) {
        Ok(i) if i < 32 => (*x >> (8 * (31 - i))) & Word::from(0xffu64),
        _ => Word::ZERO,
    }
}

pub fn shl(shift: &Word, x: &Word) -> Word {
    match usize::try_from(shift) {
        Ok(s) if s < 256 => *x << s,
        _ => Word::ZERO,
    }
}

pub fn shr(shift: &Word, x: &Word) -> Word {
    match usize::try_from(shift) {
        Ok(s) if s < 256 => *x >> s,
        _ => Word::ZERO,
    }
}

/// `SAR`: arithmetic right shift, filling with the sign bit.
pub fn sar(shift: &Word, x: &Word) -> Word {
    let negative = is_negative(x);
    match usize::try_from(shift) {
        Ok(s) if s < 256 => {
            if negative {
                !(!*x >> s)
            } else {
                *x >> s
            }
        }
        _ if negative => Word::MAX,
        _ => Word::ZERO,
    }
}

pub fn address_to_word(address: &Address) -> Word {
    Word::from_be_slice_truncated(address.as_bytes())
}

/// Keeps the low 160 bits of `word`.
pub fn word_to_address(word: &Word) -> Address {
    Address::from_slice(&word.to_be_bytes()[12..])
}

pub fn h256_to_word(h: &H256) -> Word {
    Word::from_be_slice_truncated(h.as_bytes())
}

pub fn word_to_h256(word: &Word) -> H256 {
    H256::from_slice(&word.to_be_bytes())
}

pub fn word_to_usize_saturating(word: &Word) -> usize {
    usize::try_from(word).unwrap_or(usize::MAX)
}

pub fn word_to_u64_saturating(word: &Word) -> u64 {
    u64::try_from(word).unwrap_or(u64::MAX)
}

/// Number of 32-byte words covering `bytes` bytes.
pub const fn word_size(bytes: usize) -> usize {
    bytes.div_ceil(32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(x: u64) -> Word {
        Word::from(x)
    }

    fn minus(x: u64) -> Word {
        negate(&w(x))
    }

    #[test]
    fn test_signed_division() {
        assert_eq!(sdiv(&minus(10), &w(3)), minus(3));
        assert_eq!(sdiv(&w(10), &minus(3)), minus(3));
        assert_eq!(sdiv(&minus(10), &minus(3)), w(3));
        assert_eq!(sdiv(&w(10), &Word::ZERO), Word::ZERO);

        let min = Word::ONE << 255;
        assert_eq!(sdiv(&min, &minus(1)), min);

        assert_eq!(smod(&minus(10), &w(3)), minus(1));
        assert_eq!(smod(&w(10), &minus(3)), w(1));
        assert_eq!(smod(&w(10), &Word::ZERO), Word::ZERO);
    }

    #[test]
    fn test_modular_arithmetic() {
        assert_eq!(addmod(&Word::MAX, &w(2), &w(10)), w(7));
        assert_eq!(mulmod(&Word::MAX, &Word::MAX, &w(12)), w(9));
        assert_eq!(mulmod(&w(5), &w(5), &Word::ZERO), Word::ZERO);
        assert_eq!(div(&w(16), &Word::ZERO), Word::ZERO);
    }

    #[test]
    fn test_exp() {
        assert_eq!(exp(&w(3), &w(5)), w(243));
        assert_eq!(exp(&w(2), &w(256)), Word::ZERO);
        assert_eq!(exp(&Word::ZERO, &Word::ZERO), Word::ONE);
        assert_eq!(count_significant_bytes(&w(0x1234)), 2);
        assert_eq!(count_significant_bytes(&Word::ZERO), 0);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(shr(&w(4), &w(0xff)), w(0xf));
        assert_eq!(shl(&w(4), &w(0xff)), w(0xff0));
        assert_eq!(shr(&w(256), &Word::MAX), Word::ZERO);
        assert_eq!(sar(&w(4), &minus(16)), minus(1));
        assert_eq!(sar(&w(300), &minus(16)), Word::MAX);
        assert_eq!(sar(&w(1), &w(16)), w(8));
    }

    #[test]
    fn test_byte_and_signextend() {
        let x = w(0x1234);
        assert_eq!(byte(&w(31), &x), w(0x34));
        assert_eq!(byte(&w(30), &x), w(0x12));
        assert_eq!(byte(&w(32), &x), Word::ZERO);

        assert_eq!(signextend(&w(0), &w(0xff)), Word::MAX);
        assert_eq!(signextend(&w(0), &w(0x17f)), w(0x7f));
        assert_eq!(signextend(&w(40), &w(0xff)), w(0xff));
    }

    #[test]
    fn test_signed_comparison() {
        assert!(slt(&minus(1), &w(0)));
        assert!(!slt(&w(0), &minus(1)));
        assert!(sgt(&w(1), &minus(5)));
        assert!(slt(&minus(5), &minus(1)));
    }

    #[test]
    fn test_address_round_trip() {
        let address = Address::repeat_byte(0xaa);
        let word = address_to_word(&address);
        assert_eq!(word.bit_len(), 160);
        assert_eq!(word_to_address(&(word | (Word::ONE << 200))), address);
    }
}
