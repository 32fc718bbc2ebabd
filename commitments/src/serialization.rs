//! Byte encoding of proofs.
//!
//! Lengths and counters are little-endian integers, field elements use their
//! fixed-width big-endian encoding.

use bytes::{Buf, BufMut};
use zk_evm_multiprecision::FftField;

use crate::aggregated::{AggregatedProof, LpcQueryProofs};
use crate::error::{CommitmentError, Result};
use crate::fri::{FriProof, InitialProof, QueryProof, RoundProof};
use crate::lpc::{EvalStorage, LpcProof, PolyEvals};
use crate::merkle::{Digest, MerklePathStep, MerkleProof};
use crate::polynomial::Polynomial;

pub struct ProofWriter<B: BufMut> {
    buf: B,
}

impl<B: BufMut> ProofWriter<B> {
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    pub fn into_inner(self) -> B {
        self.buf
    }

    pub fn write_u32(&mut self, value: usize) {
        self.buf.put_u32_le(value as u32);
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    pub fn write_digest(&mut self, digest: &Digest) {
        self.buf.put_slice(digest);
    }

    pub fn write_field<F: FftField>(&mut self, value: &F) {
        self.buf.put_slice(&value.to_be_bytes());
    }

    pub fn write_fields<F: FftField>(&mut self, values: &[F]) {
        values.iter().for_each(|v| self.write_field(v));
    }

    pub fn write_merkle_proof(&mut self, proof: &MerkleProof) {
        self.write_u32(proof.depth());
        for step in &proof.path {
            self.write_digest(&step.sibling);
            self.buf.put_u8(step.is_right.into());
        }
    }

    pub fn write_eval_storage<F: FftField>(&mut self, storage: &EvalStorage<F>) {
        self.write_u32(storage.batches.len());
        for batch in &storage.batches {
            self.write_u32(batch.len());
            for evals in batch {
                self.write_u32(evals.points.len());
                self.write_fields(&evals.points);
                self.write_fields(&evals.values);
            }
        }
    }

    pub fn write_initial_proof<F: FftField>(&mut self, proof: &InitialProof<F>) {
        self.write_merkle_proof(&proof.p);
        self.write_u32(proof.values.len());
        self.write_u32(proof.values.first().map_or(0, Vec::len));
        proof.values.iter().for_each(|v| self.write_fields(v));
    }

    pub fn write_round_proof<F: FftField>(&mut self, proof: &RoundProof<F>) {
        self.write_merkle_proof(&proof.p);
        self.write_u32(proof.y.len());
        self.write_fields(&proof.y);
    }

    fn write_initial_proofs<F: FftField>(&mut self, proofs: &[InitialProof<F>]) {
        self.write_u32(proofs.len());
        proofs.iter().for_each(|p| self.write_initial_proof(p));
    }

    pub fn write_query_proof<F: FftField>(&mut self, proof: &QueryProof<F>) {
        self.write_initial_proofs(&proof.initial_proofs);
        self.write_u32(proof.round_proofs.len());
        proof.round_proofs.iter().for_each(|p| self.write_round_proof(p));
    }

    pub fn write_fri_proof<F: FftField>(&mut self, proof: &FriProof<F>) {
        self.write_u32(proof.fri_roots.len());
        proof.fri_roots.iter().for_each(|r| self.write_digest(r));

        let degree = proof.final_polynomial.degree();
        self.write_u32(degree);
        let coeffs = proof.final_polynomial.coefficients();
        for i in 0..=degree {
            self.write_field(&coeffs.get(i).copied().unwrap_or_else(F::zero));
        }

        self.write_u32(proof.query_proofs.len());
        proof.query_proofs.iter().for_each(|q| self.write_query_proof(q));
        self.write_u64(proof.proof_of_work);
    }

    pub fn write_lpc_proof<F: FftField>(&mut self, proof: &LpcProof<F>) {
        self.write_eval_storage(&proof.eval_storage);
        self.write_fri_proof(&proof.fri_proof);
    }

    pub fn write_aggregated_proof<F: FftField>(&mut self, proof: &AggregatedProof<F>) {
        self.write_u32(proof.lpc_proofs.len());
        for lpc in &proof.lpc_proofs {
            self.write_eval_storage(&lpc.eval_storage);
            self.write_u32(lpc.initial_proofs.len());
            lpc.initial_proofs
                .iter()
                .for_each(|proofs| self.write_initial_proofs(proofs));
        }
        self.write_fri_proof(&proof.fri_proof);
    }
}

fn truncated() -> CommitmentError {
    CommitmentError::Deserialize("unexpected end of proof".into())
}

pub struct ProofReader<B: Buf> {
    buf: B,
}

impl<B: Buf> ProofReader<B> {
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Fails unless every byte has been consumed.
    pub fn finish(self) -> Result<()> {
        match self.buf.remaining() {
            0 => Ok(()),
            n => Err(CommitmentError::Deserialize(format!(
                "{n} trailing bytes after the proof"
            ))),
        }
    }

    fn ensure(&self, len: usize) -> Result<()> {
        if self.buf.remaining() < len {
            return Err(truncated());
        }
        Ok(())
    }

    pub fn read_u32(&mut self) -> Result<usize> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le() as usize)
    }

    /// Reads a count of items that take at least `min_item_len` bytes each.
    fn read_len(&mut self, min_item_len: usize) -> Result<usize> {
        let len = self.read_u32()?;
        if len.saturating_mul(min_item_len) > self.buf.remaining() {
            return Err(truncated());
        }
        Ok(len)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn read_digest(&mut self) -> Result<Digest> {
        self.ensure(32)?;
        let mut digest = Digest::default();
        self.buf.copy_to_slice(&mut digest);
        Ok(digest)
    }

    pub fn read_field<F: FftField>(&mut self) -> Result<F> {
        self.ensure(F::ENCODED_LEN)?;
        let mut bytes = vec![0u8; F::ENCODED_LEN];
        self.buf.copy_to_slice(&mut bytes);
        F::from_be_bytes(&bytes)
            .ok_or_else(|| CommitmentError::Deserialize("non-canonical field element".into()))
    }

    pub fn read_fields<F: FftField>(&mut self, count: usize) -> Result<Vec<F>> {
        self.ensure(count.saturating_mul(F::ENCODED_LEN))?;
        (0..count).map(|_| self.read_field()).collect()
    }

    pub fn read_merkle_proof(&mut self) -> Result<MerkleProof> {
        let depth = self.read_len(33)?;
        let path = (0..depth)
            .map(|_| {
                let sibling = self.read_digest()?;
                self.ensure(1)?;
                let is_right = match self.buf.get_u8() {
                    0 => false,
                    1 => true,
                    b => {
                        return Err(CommitmentError::Deserialize(format!(
                            "invalid Merkle orientation byte {b}"
                        )))
                    }
                };
                Ok(MerklePathStep { sibling, is_right })
            })
            .collect::<Result<_>>()?;
        Ok(MerkleProof { path })
    }

    pub fn read_eval_storage<F: FftField>(&mut self) -> Result<EvalStorage<F>> {
        let batches = self.read_len(4)?;
        let batches = (0..batches)
            .map(|_| {
                let polys = self.read_len(4)?;
                (0..polys)
                    .map(|_| {
                        let n = self.read_len(2 * F::ENCODED_LEN)?;
                        Ok(PolyEvals {
                            points: self.read_fields(n)?,
                            values: self.read_fields(n)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(EvalStorage { batches })
    }

    pub fn read_initial_proof<F: FftField>(&mut self) -> Result<InitialProof<F>> {
        let p = self.read_merkle_proof()?;
        let polys = self.read_u32()?;
        let coset = self.read_u32()?;
        self.ensure(polys.saturating_mul(coset).saturating_mul(F::ENCODED_LEN))?;
        let values = (0..polys)
            .map(|_| self.read_fields(coset))
            .collect::<Result<_>>()?;
        Ok(InitialProof { values, p })
    }

    pub fn read_round_proof<F: FftField>(&mut self) -> Result<RoundProof<F>> {
        let p = self.read_merkle_proof()?;
        let n = self.read_len(F::ENCODED_LEN)?;
        Ok(RoundProof {
            y: self.read_fields(n)?,
            p,
        })
    }

    fn read_initial_proofs<F: FftField>(&mut self) -> Result<Vec<InitialProof<F>>> {
        let n = self.read_len(12)?;
        (0..n).map(|_| self.read_initial_proof()).collect()
    }

    pub fn read_query_proof<F: FftField>(&mut self) -> Result<QueryProof<F>> {
        let initial_proofs = self.read_initial_proofs()?;
        let rounds = self.read_len(8)?;
        let round_proofs = (0..rounds)
            .map(|_| self.read_round_proof())
            .collect::<Result<_>>()?;
        Ok(QueryProof {
            initial_proofs,
            round_proofs,
        })
    }

    pub fn read_fri_proof<F: FftField>(&mut self) -> Result<FriProof<F>> {
        let roots = self.read_len(32)?;
        let fri_roots = (0..roots)
            .map(|_| self.read_digest())
            .collect::<Result<_>>()?;
        let degree = self.read_u32()?;
        let coeffs = self.read_fields(degree.saturating_add(1))?;
        let queries = self.read_len(8)?;
        let query_proofs = (0..queries)
            .map(|_| self.read_query_proof())
            .collect::<Result<_>>()?;
        let proof_of_work = self.read_u64()?;
        Ok(FriProof {
            fri_roots,
            final_polynomial: Polynomial::from_coefficients(coeffs),
            query_proofs,
            proof_of_work,
        })
    }

    pub fn read_lpc_proof<F: FftField>(&mut self) -> Result<LpcProof<F>> {
        Ok(LpcProof {
            eval_storage: self.read_eval_storage()?,
            fri_proof: self.read_fri_proof()?,
        })
    }

    pub fn read_aggregated_proof<F: FftField>(&mut self) -> Result<AggregatedProof<F>> {
        let provers = self.read_len(8)?;
        let lpc_proofs = (0..provers)
            .map(|_| {
                let eval_storage = self.read_eval_storage()?;
                let queries = self.read_len(4)?;
                let initial_proofs = (0..queries)
                    .map(|_| self.read_initial_proofs())
                    .collect::<Result<_>>()?;
                Ok(LpcQueryProofs {
                    eval_storage,
                    initial_proofs,
                })
            })
            .collect::<Result<_>>()?;
        Ok(AggregatedProof {
            lpc_proofs,
            fri_proof: self.read_fri_proof()?,
        })
    }
}

impl<F: FftField> LpcProof<F> {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ProofWriter::new(Vec::new());
        writer.write_lpc_proof(self);
        writer.into_inner()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ProofReader::new(bytes);
        let proof = reader.read_lpc_proof()?;
        reader.finish()?;
        Ok(proof)
    }
}

impl<F: FftField> FriProof<F> {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ProofWriter::new(Vec::new());
        writer.write_fri_proof(self);
        writer.into_inner()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ProofReader::new(bytes);
        let proof = reader.read_fri_proof()?;
        reader.finish()?;
        Ok(proof)
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use zk_evm_multiprecision::Goldilocks;

    use super::*;

    type F = Goldilocks;

    #[test]
    fn test_merkle_proof_layout() -> anyhow::Result<()> {
        let proof = MerkleProof {
            path: vec![MerklePathStep {
                sibling: [0xab; 32],
                is_right: true,
            }],
        };
        let mut writer = ProofWriter::new(Vec::new());
        writer.write_merkle_proof(&proof);
        writer.write_field(&F::from_u64(0x0102));
        let bytes = writer.into_inner();
        assert_eq!(&bytes[..4], &hex!("01000000"));
        assert_eq!(bytes[36], 1);
        assert_eq!(&bytes[37..], &hex!("0000000000000102"));

        let mut reader = ProofReader::new(bytes.as_slice());
        assert_eq!(reader.read_merkle_proof()?, proof);
        assert_eq!(reader.read_field::<F>()?, F::from_u64(0x0102));
        reader.finish()?;
        Ok(())
    }

    #[test]
    fn test_rejects_malformed_input() {
        let one = hex!("01000000");
        assert!(ProofReader::new(&one[..]).read_merkle_proof().is_err());

        let mut bytes = hex!("01000000").to_vec();
        bytes.extend([0u8; 32]);
        bytes.push(2);
        assert!(ProofReader::new(bytes.as_slice()).read_merkle_proof().is_err());

        // 2^64 - 1 is not a Goldilocks element.
        let p_minus = hex!("ffffffffffffffff");
        assert!(ProofReader::new(&p_minus[..]).read_field::<F>().is_err());

        // A huge count must not allocate.
        let huge = hex!("ffffffff");
        assert!(ProofReader::new(&huge[..]).read_eval_storage::<F>().is_err());
    }

    #[test]
    fn test_zero_final_polynomial() -> anyhow::Result<()> {
        let proof = FriProof::<F> {
            fri_roots: vec![[7; 32]],
            final_polynomial: Polynomial::zero(),
            query_proofs: vec![],
            proof_of_work: 9,
        };
        let bytes = proof.to_bytes();
        assert_eq!(bytes.len(), 4 + 32 + 4 + 8 + 4 + 8);
        assert_eq!(FriProof::from_bytes(&bytes)?, proof);
        assert!(FriProof::<F>::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        Ok(())
    }
}
