use std::collections::BTreeMap;

use ethereum_types::H256;
use serde::{Deserialize, Serialize};
use zk_evm_common::keccak256;

/// Every byte string hashed during execution, with its digest, so that the
/// Keccak circuit can prove each claimed hash.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeccakBuffers {
    buffers: Vec<KeccakBuffer>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeccakBuffer {
    #[serde(with = "zk_evm_common::hex_bytes")]
    pub input: Vec<u8>,
    pub digest: H256,
}

impl KeccakBuffers {
    /// Records `input` and returns its digest.
    pub fn new_buffer(&mut self, input: Vec<u8>) -> H256 {
        let digest = H256(keccak256(&input));
        self.buffers.push(KeccakBuffer { input, digest });
        digest
    }

    pub fn buffers(&self) -> &[KeccakBuffer] {
        &self.buffers
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Distinct bytecodes seen during execution, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BytecodeTable {
    codes: Vec<KeccakBuffer>,
    index: BTreeMap<H256, usize>,
}

impl BytecodeTable {
    /// Adds `code` unless a bytecode with the same hash is present. Returns
    /// whether it was new.
    pub fn add(&mut self, code: &[u8], hash: H256) -> bool {
        if self.index.contains_key(&hash) {
            return false;
        }
        self.index.insert(hash, self.codes.len());
        self.codes.push(KeccakBuffer {
            input: code.to_vec(),
            digest: hash,
        });
        true
    }

    pub fn get(&self, hash: &H256) -> Option<&[u8]> {
        self.index.get(hash).map(|&i| self.codes[i].input.as_slice())
    }

    pub fn codes(&self) -> &[KeccakBuffer] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn total_length(&self) -> usize {
        self.codes.iter().map(|c| c.input.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use zk_evm_common::EMPTY_CODE_HASH;

    use super::*;

    #[test]
    fn test_buffers() {
        let mut keccaks = KeccakBuffers::default();
        assert_eq!(keccaks.new_buffer(vec![]), EMPTY_CODE_HASH);
        assert_eq!(keccaks.len(), 1);

        let mut codes = BytecodeTable::default();
        let code = [0x60, 0x00];
        let hash = H256(keccak256(code));
        assert!(codes.add(&code, hash));
        assert!(!codes.add(&code, hash));
        assert_eq!(codes.get(&hash), Some(&code[..]));
        assert_eq!(codes.total_length(), 2);
    }
}
