//! Several LPC provers sharing a single FRI proof.
//!
//! Every prover builds its own combined quotient `Q_i` with a disjoint range
//! of `θ` powers. The main prover runs FRI once on `F = Σ Q_i`; the others
//! only contribute their evaluation claims and the openings of their batches
//! at the query indices.

use std::collections::BTreeMap;

use rayon::prelude::*;
use zk_evm_multiprecision::FftField;

use crate::error::Result;
use crate::fri::{
    commit_phase, precommit, query_indices, replay_commit_phase, round_proofs, run_grinding,
    verify_query, FriParams, FriProof, InitialProof, QueryProof,
};
use crate::lpc::{combined_values, theta_powers, EvalStorage, LpcScheme};
use crate::merkle::Digest;
use crate::polynomial::{Polynomial, PolynomialDfs};
use crate::pool::PoolLevel;
use crate::transcript::Transcript;

/// The part of an aggregated proof contributed by one prover.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LpcQueryProofs<F: FftField> {
    pub eval_storage: EvalStorage<F>,
    /// `initial_proofs[k]` opens every batch at the `k`-th query index.
    pub initial_proofs: Vec<Vec<InitialProof<F>>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedProof<F: FftField> {
    pub lpc_proofs: Vec<LpcQueryProofs<F>>,
    /// FRI proof of the summed quotient. Its query proofs carry round proofs
    /// only.
    pub fri_proof: FriProof<F>,
}

impl<F: FftField> LpcScheme<F> {
    /// Evaluation claims and batch openings of this prover for the query
    /// indices chosen by the main prover.
    pub fn proof_eval_lpc_proof(&self, query_indices: &[usize]) -> Result<LpcQueryProofs<F>> {
        let initial_proofs = PoolLevel::High.install(|| {
            query_indices
                .par_iter()
                .map(|&x| self.initial_proofs(x))
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(LpcQueryProofs {
            eval_storage: self.eval_storage(),
            initial_proofs,
        })
    }
}

/// The main prover: owns the shared transcript and the FRI proof of the sum.
#[derive(Clone, Debug)]
pub struct AggregatedProver<F: FftField> {
    params: FriParams<F>,
    transcript: Transcript,
}

impl<F: FftField> AggregatedProver<F> {
    pub fn new(params: FriParams<F>, transcript: Transcript) -> Self {
        Self { params, transcript }
    }

    /// Absorbs one prover's batch roots, in batch id order.
    pub fn absorb_commitments(&mut self, commitments: &BTreeMap<usize, Digest>) {
        for root in commitments.values() {
            self.transcript.absorb(root);
        }
    }

    pub fn theta(&mut self) -> F {
        self.transcript.challenge()
    }

    /// Runs FRI on `sum_poly = Σ Q_i` and returns the proof together with
    /// the query indices every prover must open.
    pub fn proof_eval_fri_proof(
        &mut self,
        sum_poly: &Polynomial<F>,
    ) -> Result<(FriProof<F>, Vec<usize>)> {
        let params = &self.params;
        let f0 = PolynomialDfs::from_coefficients(sum_poly, params.initial_domain_size())?;
        let tree = precommit(&[f0.values()], params.step_list[0])?;
        let commit = commit_phase(&f0, tree, params, &mut self.transcript)?;
        let proof_of_work = run_grinding(&mut self.transcript, params.grinding_bits);
        let indices = query_indices(params, &mut self.transcript);
        let query_proofs = PoolLevel::High.install(|| {
            indices
                .par_iter()
                .map(|&x| {
                    Ok(QueryProof {
                        initial_proofs: Vec::new(),
                        round_proofs: round_proofs(&commit, params, x)?,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })?;
        let proof = FriProof {
            fri_roots: commit.fri_roots,
            final_polynomial: commit.final_polynomial,
            query_proofs,
            proof_of_work,
        };
        Ok((proof, indices))
    }

    /// Runs the whole aggregated flow over `provers`, in order.
    pub fn prove(mut self, provers: &[&LpcScheme<F>]) -> Result<AggregatedProof<F>> {
        for prover in provers {
            self.absorb_commitments(&prover.commitments()?);
        }
        let theta = self.theta();

        let mut offset = 0;
        let mut sum = Polynomial::zero();
        for prover in provers {
            let evals = prover.eval_storage();
            let q = prover.prepare_combined_q(&evals, theta, offset)?;
            offset += prover.compute_theta_power_for_combined_q();
            sum = &sum + &q;
        }
        log::debug!(
            "aggregated FRI over {} provers, {offset} theta powers",
            provers.len()
        );

        let (fri_proof, indices) = self.proof_eval_fri_proof(&sum)?;
        let lpc_proofs = provers
            .iter()
            .map(|prover| prover.proof_eval_lpc_proof(&indices))
            .collect::<Result<Vec<_>>>()?;
        Ok(AggregatedProof {
            lpc_proofs,
            fri_proof,
        })
    }
}

/// Verifies an aggregated proof. `verifiers[i]` carries the fixed batches,
/// expected opening points and setup of prover `i`, whose roots are
/// `commitments[i]`.
pub fn aggregated_verify<F: FftField>(
    verifiers: &[&LpcScheme<F>],
    commitments: &[BTreeMap<usize, Digest>],
    proof: &AggregatedProof<F>,
    params: &FriParams<F>,
    transcript: &mut Transcript,
) -> bool {
    if verifiers.len() != commitments.len() || proof.lpc_proofs.len() != commitments.len() {
        log::info!("aggregated: expected {} provers", commitments.len());
        return false;
    }
    for root in commitments.iter().flat_map(BTreeMap::values) {
        transcript.absorb(root);
    }
    let theta = transcript.challenge::<F>();

    let mut offset = 0;
    let mut provers = Vec::with_capacity(verifiers.len());
    for ((verifier, roots), lpc) in verifiers.iter().zip(commitments).zip(&proof.lpc_proofs) {
        let ids: Vec<usize> = roots.keys().copied().collect();
        let checked = verifier.check_eval_points(&lpc.eval_storage, &ids);
        let terms = match checked.and_then(|()| verifier.terms(&lpc.eval_storage, &ids)) {
            Ok(terms) => terms,
            Err(e) => {
                log::info!("aggregated: {e}");
                return false;
            }
        };
        let powers = theta_powers(theta, offset, terms.len());
        offset += terms.len();
        let roots: Vec<Digest> = roots.values().copied().collect();
        provers.push((terms, powers, roots, lpc));
    }

    let fri = &proof.fri_proof;
    let Some(challenges) = replay_commit_phase(
        &fri.fri_roots,
        &fri.final_polynomial,
        fri.proof_of_work,
        params,
        transcript,
    ) else {
        return false;
    };
    let queries = challenges.query_indices.len();
    if fri.query_proofs.len() != queries
        || proof.lpc_proofs.iter().any(|p| p.initial_proofs.len() != queries)
    {
        log::info!("aggregated: wrong number of query proofs");
        return false;
    }

    PoolLevel::High.install(|| {
        challenges
            .query_indices
            .par_iter()
            .enumerate()
            .all(|(k, &x)| {
                let mut sum: Option<Vec<F>> = None;
                for (terms, powers, roots, lpc) in &provers {
                    let Some(values) = combined_values(
                        params,
                        terms,
                        powers,
                        roots,
                        &lpc.eval_storage,
                        &lpc.initial_proofs[k],
                        x,
                    ) else {
                        return false;
                    };
                    sum = Some(match sum {
                        None => values,
                        Some(acc) => acc.into_iter().zip(values).map(|(a, b)| a + b).collect(),
                    });
                }
                let Some(sum) = sum else {
                    return false;
                };
                verify_query(
                    params,
                    &fri.fri_roots,
                    &fri.final_polynomial,
                    &challenges.alphas,
                    x,
                    Some(&sum),
                    &fri.query_proofs[k].round_proofs,
                )
            })
    })
}
