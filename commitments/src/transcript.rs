//! Fiat-Shamir transcript over Keccak-256.

use zk_evm_common::keccak256;
use zk_evm_multiprecision::FftField;

use crate::merkle::Digest;

/// Sequential hash chain. Every absorbed message and every drawn challenge
/// updates the state, so prover and verifier stay in lockstep as long as
/// they perform the same sequence of calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transcript {
    state: Digest,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl Transcript {
    pub fn new(seed: &[u8]) -> Self {
        Self {
            state: keccak256(seed),
        }
    }

    pub fn state(&self) -> &Digest {
        &self.state
    }

    pub fn absorb(&mut self, bytes: &[u8]) {
        let mut buf = Vec::with_capacity(32 + bytes.len());
        buf.extend_from_slice(&self.state);
        buf.extend_from_slice(bytes);
        self.state = keccak256(buf);
    }

    pub fn absorb_field<F: FftField>(&mut self, value: &F) {
        self.absorb(&value.to_be_bytes());
    }

    fn advance(&mut self) -> Digest {
        self.state = keccak256(self.state);
        self.state
    }

    /// Next challenge, the big-endian state reduced into the field.
    pub fn challenge<F: FftField>(&mut self) -> F {
        F::from_be_bytes_reduced(&self.advance())
    }

    pub fn challenges<F: FftField>(&mut self, count: usize) -> Vec<F> {
        (0..count).map(|_| self.challenge()).collect()
    }

    /// Next challenge as an integer of at most `bits` bits.
    pub fn challenge_bits(&mut self, bits: u32) -> u64 {
        let state = self.advance();
        let mut low = [0u8; 8];
        low.copy_from_slice(&state[24..]);
        let value = u64::from_be_bytes(low);
        if bits >= 64 {
            value
        } else {
            value & ((1u64 << bits) - 1)
        }
    }
}
