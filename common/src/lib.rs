use std::ops::RangeInclusive;

use ethereum_types::{Address, H256};

/// The hash value of an account empty EVM code.
/// 0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470
pub const EMPTY_CODE_HASH: H256 = H256([
    197, 210, 70, 1, 134, 247, 35, 60, 146, 126, 125, 178, 220, 199, 3, 192, 229, 0, 182, 83, 202,
    130, 39, 59, 123, 250, 216, 4, 93, 133, 164, 112,
]);

/// Addresses `0x01..=0x0a` are reserved for precompiled contracts.
pub const PRECOMPILE_ADDRESSES: RangeInclusive<u64> = 1..=10;

/// Keccak-256 of an arbitrary byte string.
///
/// This is the only hash oracle the trace generator and the commitment
/// scheme rely upon: EVM `KECCAK256`, code hashes, contract address
/// derivation, Merkle compression and the Fiat-Shamir transcript.
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    keccak_hash::keccak(data.as_ref()).0
}

/// Returns `true` if `address` is one of the precompiled contracts.
pub fn is_precompile(address: &Address) -> bool {
    let bytes = address.as_bytes();
    bytes[..19].iter().all(|b| *b == 0) && PRECOMPILE_ADDRESSES.contains(&(bytes[19] as u64))
}

/// Builds the address of precompile number `index`.
pub fn precompile_address(index: u8) -> Address {
    Address::from_low_u64_be(index as u64)
}

/// Like `#[serde(with = "::hex")]`, but tolerates and emits leading `0x`
/// prefixes
pub mod hex_bytes {
    use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer, T>(data: T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: hex::ToHex,
    {
        let s = data.encode_hex::<String>();
        serializer.serialize_str(&format!("0x{}", s))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, T>(deserializer: D) -> Result<T, D::Error>
    where
        T: hex::FromHex,
        T::Error: std::fmt::Display,
    {
        let s = String::deserialize(deserializer)?;
        match s.strip_prefix("0x") {
            Some(rest) => T::from_hex(rest),
            None => T::from_hex(&*s),
        }
        .map_err(D::Error::custom)
    }
}
