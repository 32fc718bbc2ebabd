use zk_evm_multiprecision::FftField;

use super::{fold_coset, leaf_index, query_indices, verify_grinding, FriParams, FriProof, RoundProof};
use crate::merkle::{field_elements_to_bytes, Digest};
use crate::polynomial::Polynomial;
use crate::transcript::Transcript;

/// Challenges of one FRI proof, as drawn by the verifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FriChallenges<F: FftField> {
    /// `alphas[i]` holds one challenge per fold of round `i`.
    pub alphas: Vec<Vec<F>>,
    pub query_indices: Vec<usize>,
}

/// Replays the prover's transcript: roots and folding challenges, the final
/// polynomial, the grinding nonce and the query indices.
///
/// Returns `None` when the proof shape or the grinding nonce is wrong.
pub fn replay_commit_phase<F: FftField>(
    fri_roots: &[Digest],
    final_polynomial: &Polynomial<F>,
    proof_of_work: u64,
    params: &FriParams<F>,
    transcript: &mut Transcript,
) -> Option<FriChallenges<F>> {
    if fri_roots.len() != params.step_list.len() {
        log::info!(
            "FRI: expected {} roots, got {}",
            params.step_list.len(),
            fri_roots.len()
        );
        return None;
    }
    let bound = params.final_polynomial_degree_bound();
    if final_polynomial.degree() > bound {
        log::info!(
            "FRI: final polynomial has degree {} above {bound}",
            final_polynomial.degree()
        );
        return None;
    }

    let alphas = fri_roots
        .iter()
        .zip(&params.step_list)
        .map(|(root, &step)| {
            transcript.absorb(root);
            transcript.challenges::<F>(step)
        })
        .collect();
    for c in final_polynomial.coefficients() {
        transcript.absorb_field(c);
    }
    if !verify_grinding(transcript, proof_of_work, params.grinding_bits) {
        log::info!("FRI: invalid proof of work {proof_of_work}");
        return None;
    }
    Some(FriChallenges {
        alphas,
        query_indices: query_indices(params, transcript),
    })
}

/// Checks the round openings of a single query.
///
/// `initial_values`, when given, are the values the first round must open
/// on its leaf, recomputed by the caller from the committed batches.
pub fn verify_query<F: FftField>(
    params: &FriParams<F>,
    fri_roots: &[Digest],
    final_polynomial: &Polynomial<F>,
    alphas: &[Vec<F>],
    x_index: usize,
    initial_values: Option<&[F]>,
    round_proofs: &[RoundProof<F>],
) -> bool {
    let rounds = params.step_list.len();
    if round_proofs.len() != rounds || fri_roots.len() != rounds || alphas.len() != rounds {
        log::info!("FRI: query {x_index} has {} round proofs", round_proofs.len());
        return false;
    }

    let mut x = x_index;
    let mut domain_index = 0;
    let mut folded: Option<F> = None;
    for (round, proof) in round_proofs.iter().enumerate() {
        let step = params.step_list[round];
        let size = params.domains[domain_index].size();
        let leaves = size >> step;
        let leaf = leaf_index(x, size, step);

        if !proof.p.opens(leaf, leaves) {
            log::info!(
                "FRI: query {x_index} round {round} path of depth {} does not open leaf {leaf} of {leaves}",
                proof.p.depth()
            );
            return false;
        }
        if proof.y.len() != 1 << step {
            log::info!("FRI: query {x_index} round {round} opens {} values", proof.y.len());
            return false;
        }
        if !proof
            .p
            .verify(&field_elements_to_bytes(&proof.y), &fri_roots[round])
        {
            log::info!("FRI: query {x_index} round {round} Merkle proof is invalid");
            return false;
        }
        let consistent = match folded {
            None => initial_values.map_or(true, |values| values == proof.y.as_slice()),
            Some(value) => proof.y[x / leaves] == value,
        };
        if !consistent {
            log::info!("FRI: query {x_index} round {round} is inconsistent with the previous round");
            return false;
        }

        let mut y = proof.y.clone();
        for alpha in &alphas[round] {
            y = fold_coset(&y, leaf, &params.domains[domain_index], *alpha);
            domain_index += 1;
        }
        folded = y.first().copied();
        x = leaf;
    }

    let point = params.domains[domain_index].element(x);
    if folded != Some(final_polynomial.evaluate(point)) {
        log::info!("FRI: query {x_index} does not match the final polynomial");
        return false;
    }
    true
}

/// Verifies a standalone proof produced by
/// [`prove_polynomial`](super::prove_polynomial).
pub fn verify_polynomial<F: FftField>(
    proof: &FriProof<F>,
    params: &FriParams<F>,
    transcript: &mut Transcript,
) -> bool {
    let Some(challenges) = replay_commit_phase(
        &proof.fri_roots,
        &proof.final_polynomial,
        proof.proof_of_work,
        params,
        transcript,
    ) else {
        return false;
    };
    if proof.query_proofs.len() != challenges.query_indices.len() {
        log::info!(
            "FRI: expected {} query proofs, got {}",
            challenges.query_indices.len(),
            proof.query_proofs.len()
        );
        return false;
    }
    challenges
        .query_indices
        .iter()
        .zip(&proof.query_proofs)
        .all(|(&x, query)| {
            query.initial_proofs.is_empty()
                && verify_query(
                    params,
                    &proof.fri_roots,
                    &proof.final_polynomial,
                    &challenges.alphas,
                    x,
                    None,
                    &query.round_proofs,
                )
        })
}
