//! The proof file: the parameters it was produced with, the batch roots and
//! the LPC proof.
//!
//! ```text
//! ProofFile := degree_log:u32 ‖ expand_factor:u32 ‖ lambda:u32
//!            ‖ grinding_bits:u32 ‖ n_steps:u32 ‖ steps:u32[n_steps]
//!            ‖ n_commitments:u32 ‖ (batch:u32 ‖ root:digest)[n_commitments]
//!            ‖ LpcProof
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use zk_evm_commitments::{Digest, LpcProof, ProofReader, ProofWriter};

use crate::params::ProofParams;
use crate::F;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofFile {
    pub params: ProofParams,
    pub commitments: BTreeMap<usize, Digest>,
    pub proof: LpcProof<F>,
}

impl ProofFile {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ProofWriter::new(Vec::new());
        let params = &self.params;
        writer.write_u32(params.degree_log);
        writer.write_u32(params.expand_factor);
        writer.write_u32(params.lambda);
        writer.write_u32(params.grinding_bits as usize);
        writer.write_u32(params.step_list.len());
        for step in &params.step_list {
            writer.write_u32(*step);
        }
        writer.write_u32(self.commitments.len());
        for (batch, root) in &self.commitments {
            writer.write_u32(*batch);
            writer.write_digest(root);
        }
        writer.write_lpc_proof(&self.proof);
        writer.into_inner()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ProofReader::new(bytes);
        let degree_log = reader.read_u32()?;
        let expand_factor = reader.read_u32()?;
        let lambda = reader.read_u32()?;
        let grinding_bits = u32::try_from(reader.read_u32()?)?;
        let steps = reader.read_u32()?;
        let step_list = (0..steps)
            .map(|_| reader.read_u32())
            .collect::<Result<Vec<_>, _>>()?;

        let count = reader.read_u32()?;
        let mut commitments = BTreeMap::new();
        for _ in 0..count {
            let batch = reader.read_u32()?;
            commitments.insert(batch, reader.read_digest()?);
        }
        let proof = reader.read_lpc_proof()?;
        reader.finish()?;
        Ok(Self {
            params: ProofParams {
                degree_log,
                expand_factor,
                lambda,
                grinding_bits,
                step_list,
            },
            commitments,
            proof,
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes())
            .with_context(|| format!("cannot write proof to {}", path.display()))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
        Self::from_bytes(&bytes).with_context(|| format!("malformed proof in {}", path.display()))
    }
}
