use std::collections::BTreeMap;

use anyhow::{ensure, Context, Result};
use evm_arithmetization::{opcode_table, Block, ExecutionTrace, WitnessGenerator};
use tracing::{debug, info, info_span};
use zk_evm_commitments::{Digest, EvaluationDomain, LpcScheme, Polynomial, Transcript};
use zk_evm_multiprecision::FftField;

use crate::params::ProofParams;
use crate::proof::ProofFile;
use crate::F;

/// Batch holding the opcode table.
pub const FIXED_BATCH: usize = 0;
/// Batch holding the witness columns.
pub const WITNESS_BATCH: usize = 1;

pub const SETUP_SEED: &[u8] = b"zero/setup";
pub const PROOF_SEED: &[u8] = b"zero/proof";

/// Interpolates each column over the subgroup of order `size`.
pub fn interpolate_columns(columns: &[Vec<u64>], size: usize) -> Result<Vec<Polynomial<F>>> {
    let domain = EvaluationDomain::<F>::get(size)?;
    let mut values = columns
        .iter()
        .map(|column| {
            ensure!(
                column.len() <= size,
                "column of {} rows does not fit in {size} rows",
                column.len()
            );
            Ok(column.iter().map(|&v| F::from_u64(v)).collect::<Vec<_>>())
        })
        .collect::<Result<Vec<_>>>()?;
    domain.batch_inverse_fft(&mut values);
    Ok(values.into_iter().map(Polynomial::from_coefficients).collect())
}

/// Commits the opcode table as the fixed batch.
pub fn commit_fixed(lpc: &mut LpcScheme<F>, size: usize) -> Result<Digest> {
    for poly in interpolate_columns(&opcode_table(), size)? {
        lpc.append_to_batch(FIXED_BATCH, poly)?;
    }
    lpc.mark_batch_as_fixed(FIXED_BATCH);
    Ok(lpc.commit(FIXED_BATCH)?)
}

/// Commits the witness columns of `trace`.
pub fn commit_witness(lpc: &mut LpcScheme<F>, trace: &ExecutionTrace, size: usize) -> Result<Digest> {
    let columns = trace.to_columns(size)?;
    for poly in interpolate_columns(&columns, size)? {
        lpc.append_to_batch(WITNESS_BATCH, poly)?;
    }
    Ok(lpc.commit(WITNESS_BATCH)?)
}

/// Draws the opening point after absorbing every batch root.
pub fn evaluation_point(transcript: &mut Transcript, commitments: &BTreeMap<usize, Digest>) -> F {
    for root in commitments.values() {
        transcript.absorb(root);
    }
    transcript.challenge()
}

/// Runs `blocks` through the witness generator and proves the trace.
pub fn prove(params: &ProofParams, blocks: &[Block]) -> Result<ProofFile> {
    let trace = info_span!("witness", blocks = blocks.len())
        .in_scope(|| WitnessGenerator::generate(blocks))
        .context("witness generation failed")?;
    info!("Trace statistics:\n{}", trace.statistics());
    prove_trace(params, &trace)
}

pub fn prove_trace(params: &ProofParams, trace: &ExecutionTrace) -> Result<ProofFile> {
    let size = params.height();
    let mut lpc = LpcScheme::new(params.fri_params::<F>()?);

    info_span!("commit", rows = size).in_scope(|| -> Result<()> {
        commit_fixed(&mut lpc, size)?;
        commit_witness(&mut lpc, trace, size)?;
        Ok(())
    })?;
    let commitments = lpc.commitments()?;
    debug!("Committed batches {commitments:x?}");

    let fixed = lpc.preprocess(&mut Transcript::new(SETUP_SEED))?;
    lpc.setup(&mut Transcript::new(SETUP_SEED), fixed)?;

    let mut transcript = Transcript::new(PROOF_SEED);
    let zeta = evaluation_point(&mut transcript, &commitments);
    for batch in commitments.keys() {
        lpc.append_eval_point_all(*batch, zeta)?;
    }
    let proof = info_span!("open").in_scope(|| lpc.proof_eval(&mut transcript))?;
    info!(
        "Proved {} witness columns of {size} rows with {} queries",
        lpc.batch_len(WITNESS_BATCH),
        proof.fri_proof.query_proofs.len()
    );

    Ok(ProofFile {
        params: params.clone(),
        commitments,
        proof,
    })
}
