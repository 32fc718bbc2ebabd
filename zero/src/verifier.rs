use anyhow::{bail, ensure, Context, Result};
use evm_arithmetization::{Block, WitnessGenerator};
use tracing::{debug, info};
use zk_evm_commitments::{LpcScheme, Transcript};

use crate::params::ProofParams;
use crate::proof::ProofFile;
use crate::prover::{
    commit_fixed, commit_witness, evaluation_point, FIXED_BATCH, PROOF_SEED, SETUP_SEED,
    WITNESS_BATCH,
};
use crate::F;

/// Checks `proof` against the trace of `blocks`.
///
/// The batch roots are recomputed from the opcode table and from a fresh
/// witness of `blocks`, so a proof only verifies for the execution it was
/// produced from. The proof may use other FRI settings than `params` as long
/// as it has the same shape and is not weaker. Returns `Ok(false)` for a
/// proof that does not verify and an error when the inputs themselves are
/// unusable.
pub fn verify(params: &ProofParams, blocks: &[Block], proof: &ProofFile) -> Result<bool> {
    let claimed = &proof.params;
    if (claimed.degree_log, claimed.expand_factor) != (params.degree_log, params.expand_factor) {
        bail!("proof was produced with {claimed:?}, expected {params:?}");
    }
    if claimed.lambda < params.lambda || claimed.grinding_bits < params.grinding_bits {
        bail!("proof settings {claimed:?} are weaker than {params:?}");
    }
    ensure!(
        proof.commitments.len() == 2,
        "expected 2 commitments, found {}",
        proof.commitments.len()
    );
    let params = claimed;

    let size = params.height();
    let mut prover = LpcScheme::new(params.fri_params::<F>()?);
    let fixed_root = commit_fixed(&mut prover, size)?;
    if proof.commitments.get(&FIXED_BATCH) != Some(&fixed_root) {
        info!("Fixed batch root does not match the opcode table");
        return Ok(false);
    }

    let trace = WitnessGenerator::generate(blocks).context("witness generation failed")?;
    let witness_root = match commit_witness(&mut prover, &trace, size) {
        Ok(root) => root,
        Err(e) => {
            info!("Cannot commit the witness: {e:#}");
            return Ok(false);
        }
    };
    if proof.commitments.get(&WITNESS_BATCH) != Some(&witness_root) {
        info!("Witness batch root does not match the trace");
        return Ok(false);
    }

    let fixed = prover.preprocess(&mut Transcript::new(SETUP_SEED))?;
    let mut lpc = LpcScheme::new(params.fri_params::<F>()?);
    lpc.mark_batch_as_fixed(FIXED_BATCH);
    lpc.setup(&mut Transcript::new(SETUP_SEED), fixed)?;

    let mut transcript = Transcript::new(PROOF_SEED);
    let zeta = evaluation_point(&mut transcript, &proof.commitments);
    for batch in [FIXED_BATCH, WITNESS_BATCH] {
        lpc.expect_eval_point_all(batch, prover.batch_len(batch), zeta);
    }
    debug!("Checking the LPC proof at {zeta:?}");
    Ok(lpc.verify_eval(&proof.proof, &proof.commitments, &mut transcript))
}
