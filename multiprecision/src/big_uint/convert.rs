use std::fmt;
use std::str::FromStr;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use super::BigUint;
use crate::error::{Error, Result};
use crate::limbs;

impl<const BITS: usize, const LIMBS: usize> BigUint<BITS, LIMBS> {
    /// Number of bytes in the fixed-width encodings.
    pub const BYTES: usize = BITS.div_ceil(8);

    /// Fixed-width big-endian encoding over `⌈BITS / 8⌉` bytes.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        let mut out = self.to_le_bytes();
        out.reverse();
        out
    }

    /// Fixed-width little-endian encoding over `⌈BITS / 8⌉` bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.limbs
            .iter()
            .flat_map(|l| l.to_le_bytes())
            .take(Self::BYTES)
            .collect()
    }

    /// Parses a big-endian byte string of any length, rejecting values wider
    /// than `BITS`.
    pub fn from_be_slice(bytes: &[u8]) -> Result<Self> {
        let mut le = bytes.to_vec();
        le.reverse();
        Self::from_le_slice(&le)
    }

    /// Parses a little-endian byte string of any length, rejecting values
    /// wider than `BITS`.
    pub fn from_le_slice(bytes: &[u8]) -> Result<Self> {
        let words: Vec<u64> = bytes
            .chunks(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf[..chunk.len()].copy_from_slice(chunk);
                u64::from_le_bytes(buf)
            })
            .collect();
        Self::from_limb_slice(&words)
    }

    /// Parses a big-endian byte string, keeping only the low `BITS` bits.
    pub fn from_be_slice_truncated(bytes: &[u8]) -> Self {
        let start = bytes.len().saturating_sub(LIMBS * 8);
        let mut le = bytes[start..].to_vec();
        le.reverse();
        let mut limbs = [0u64; LIMBS];
        for (i, chunk) in le.chunks(8).enumerate() {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            limbs[i] = u64::from_le_bytes(buf);
        }
        Self::from_limbs(limbs)
    }

    /// Parses a string in the given radix (2..=36), rejecting values that do
    /// not fit into `BITS` bits.
    pub fn from_str_radix(s: &str, radix: u32) -> Result<Self> {
        if !(2..=36).contains(&radix) {
            return Err(Error::Parse(format!("unsupported radix {radix}")));
        }
        let digits = s.trim().replace('_', "");
        if digits.is_empty() {
            return Err(Error::Parse("empty string".to_string()));
        }
        let mut acc = vec![0u64; LIMBS + 1];
        for c in digits.chars() {
            let d = c
                .to_digit(radix)
                .ok_or_else(|| Error::Parse(format!("invalid digit {c:?} in {s:?}")))?;
            // acc = acc * radix + d
            let mut carry = d as u64;
            for limb in acc.iter_mut() {
                (*limb, carry) = limbs::mac(carry, *limb, radix as u64, 0);
            }
            if carry != 0 || limbs::bit_len(&acc) > BITS {
                return Err(Error::Parse(format!("{s:?} does not fit into {BITS} bits")));
            }
        }
        Self::from_limb_slice(&acc).map_err(|_| Error::Parse(format!("{s:?} out of range")))
    }

    fn to_decimal_string(&self) -> String {
        const CHUNK: u64 = 10_000_000_000_000_000_000;
        if self.is_zero() {
            return "0".to_string();
        }
        let mut parts = Vec::new();
        let mut rest = self.limbs.to_vec();
        while limbs::significant_len(&rest) > 0 {
            let mut rem: u128 = 0;
            for limb in rest.iter_mut().rev() {
                let cur = (rem << 64) | *limb as u128;
                *limb = (cur / CHUNK as u128) as u64;
                rem = cur % CHUNK as u128;
            }
            parts.push(rem as u64);
        }
        let mut out = String::new();
        for (i, part) in parts.iter().rev().enumerate() {
            if i == 0 {
                out.push_str(&part.to_string());
            } else {
                out.push_str(&format!("{part:019}"));
            }
        }
        out
    }

    fn to_hex_digits(&self) -> String {
        let digits = hex::encode(self.to_be_bytes());
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

impl<const BITS: usize, const LIMBS: usize> FromStr for BigUint<BITS, LIMBS> {
    type Err = Error;

    /// Accepts decimal, or hexadecimal with a `0x` prefix.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => Self::from_str_radix(hex, 16),
            None => Self::from_str_radix(s, 10),
        }
    }
}

impl<const BITS: usize, const LIMBS: usize> fmt::Display for BigUint<BITS, LIMBS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad_integral(true, "", &self.to_decimal_string())
    }
}

impl<const BITS: usize, const LIMBS: usize> fmt::Debug for BigUint<BITS, LIMBS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex_digits())
    }
}

impl<const BITS: usize, const LIMBS: usize> fmt::LowerHex for BigUint<BITS, LIMBS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad_integral(true, "0x", &self.to_hex_digits())
    }
}

impl<const BITS: usize, const LIMBS: usize> fmt::UpperHex for BigUint<BITS, LIMBS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad_integral(true, "0x", &self.to_hex_digits().to_uppercase())
    }
}

macro_rules! impl_from_primitive {
    ($($t:ty),*) => {
        $(
            impl<const BITS: usize, const LIMBS: usize> From<$t> for BigUint<BITS, LIMBS> {
                fn from(value: $t) -> Self {
                    Self::from_u64(value as u64)
                }
            }
        )*
    };
}

impl_from_primitive!(u8, u16, u32, u64, usize);

impl<const BITS: usize, const LIMBS: usize> From<bool> for BigUint<BITS, LIMBS> {
    fn from(value: bool) -> Self {
        Self::from_u64(value as u64)
    }
}

impl<const BITS: usize, const LIMBS: usize> From<u128> for BigUint<BITS, LIMBS> {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}

impl<const BITS: usize, const LIMBS: usize> TryFrom<&BigUint<BITS, LIMBS>> for u64 {
    type Error = Error;

    fn try_from(value: &BigUint<BITS, LIMBS>) -> Result<u64> {
        if limbs::significant_len(value.as_limbs()) > 1 {
            return Err(Error::Overflow);
        }
        Ok(value.low_u64())
    }
}

impl<const BITS: usize, const LIMBS: usize> TryFrom<&BigUint<BITS, LIMBS>> for usize {
    type Error = Error;

    fn try_from(value: &BigUint<BITS, LIMBS>) -> Result<usize> {
        let v = u64::try_from(value)?;
        usize::try_from(v).map_err(|_| Error::Overflow)
    }
}

impl<const BITS: usize, const LIMBS: usize> Serialize for BigUint<BITS, LIMBS> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{self:#x}"))
    }
}

impl<'de, const BITS: usize, const LIMBS: usize> Deserialize<'de> for BigUint<BITS, LIMBS> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::U256;

    #[test]
    fn test_parse_and_print() -> anyhow::Result<()> {
        let x: U256 = "0x73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001".parse()?;
        assert_eq!(
            x.to_string(),
            "52435875175126190479447740508185965837690552500527637822603658699938581184513"
        );
        assert_eq!(
            format!("{x:x}"),
            "73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001"
        );
        let y: U256 = x.to_string().parse()?;
        assert_eq!(x, y);
        assert_eq!(U256::ZERO.to_string(), "0");
        assert_eq!(format!("{:#x}", U256::from_u64(255)), "0xff");
        Ok(())
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        let too_big = format!("0x1{}", "0".repeat(64));
        assert!(matches!(too_big.parse::<U256>(), Err(Error::Parse(_))));
        assert!(matches!("12a".parse::<U256>(), Err(Error::Parse(_))));
        assert!(matches!("".parse::<U256>(), Err(Error::Parse(_))));
        assert!("255".parse::<BigUint<8, 1>>().is_ok());
        assert!("256".parse::<BigUint<8, 1>>().is_err());
    }

    #[test]
    fn test_byte_encodings() -> anyhow::Result<()> {
        let x = U256::from_u64(0x0102);
        let be = x.to_be_bytes();
        assert_eq!(be.len(), 32);
        assert_eq!(&be[30..], &[1, 2]);
        assert_eq!(U256::from_be_slice(&be)?, x);
        assert_eq!(U256::from_le_slice(&x.to_le_bytes())?, x);
        assert_eq!(BigUint::<255, 4>::BYTES, 32);
        assert_eq!(BigUint::<4, 1>::from_be_slice(&[0x0f])?.low_u64(), 15);
        assert!(BigUint::<4, 1>::from_be_slice(&[0x10]).is_err());
        let wide = [0xffu8; 40];
        assert_eq!(U256::from_be_slice_truncated(&wide), U256::MAX);
        Ok(())
    }

    #[test]
    fn test_serde_hex() -> anyhow::Result<()> {
        let x = U256::from_u64(0xdead);
        let json = serde_json::to_string(&x)?;
        assert_eq!(json, "\"0xdead\"");
        let back: U256 = serde_json::from_str(&json)?;
        assert_eq!(back, x);
        Ok(())
    }
}
