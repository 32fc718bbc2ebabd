use rayon::prelude::*;
use zk_evm_multiprecision::FftField;

use super::{
    coset_values, leaf_index, run_grinding, FriParams, FriProof, InitialProof, QueryProof,
    RoundProof,
};
use crate::error::Result;
use crate::merkle::{field_elements_to_bytes, Digest, MerkleTree};
use crate::polynomial::{Polynomial, PolynomialDfs};
use crate::pool::{PoolLevel, PARALLEL_THRESHOLD};
use crate::transcript::Transcript;

/// Commits to polynomials evaluated on the same domain. Leaf `x0` holds,
/// polynomial after polynomial, the values on the leaf for the given step.
pub fn precommit<F: FftField>(polys: &[&[F]], step: usize) -> Result<MerkleTree> {
    let domain_size = polys.first().map_or(0, |p| p.len());
    let leaves = domain_size >> step;
    let leaf_bytes = |x0: usize| {
        let leaf: Vec<F> = polys
            .iter()
            .flat_map(|values| coset_values(values, x0, step))
            .collect();
        field_elements_to_bytes(&leaf)
    };
    let data: Vec<Vec<u8>> = if leaves >= PARALLEL_THRESHOLD {
        PoolLevel::Low.install(|| (0..leaves).into_par_iter().map(leaf_bytes).collect())
    } else {
        (0..leaves).map(leaf_bytes).collect()
    };
    MerkleTree::new(&data)
}

/// Output of the commit phase, kept by the prover to answer queries.
#[derive(Clone, Debug)]
pub struct CommitPhase<F: FftField> {
    /// Evaluations of each round polynomial on its round's domain.
    pub round_values: Vec<Vec<F>>,
    pub trees: Vec<MerkleTree>,
    pub fri_roots: Vec<Digest>,
    pub final_polynomial: Polynomial<F>,
}

/// Halves the domain: `f'(x^2) = (f(x) + f(-x))/2 + α(f(x) - f(-x))/(2x)`.
fn fold<F: FftField>(values: &[F], params: &FriParams<F>, domain_index: usize, alpha: F) -> Vec<F> {
    let domain = &params.domains[domain_index];
    let half = values.len() / 2;
    let two_inv = F::from_u64(2).try_inverse().unwrap_or_else(F::one);
    let fold_one = |i: usize| {
        let (a, b) = (values[i], values[i + half]);
        ((a + b) + alpha * (a - b) * domain.element_inv(i)) * two_inv
    };
    if half >= PARALLEL_THRESHOLD {
        PoolLevel::Low.install(|| (0..half).into_par_iter().map(fold_one).collect())
    } else {
        (0..half).map(fold_one).collect()
    }
}

/// Commits to every round polynomial, drawing one folding challenge per
/// fold, and sends the final polynomial in the clear.
///
/// `f0` must be evaluated on `D_0` and `f0_tree` must be its precommitment
/// for the first step.
pub fn commit_phase<F: FftField>(
    f0: &PolynomialDfs<F>,
    f0_tree: MerkleTree,
    params: &FriParams<F>,
    transcript: &mut Transcript,
) -> Result<CommitPhase<F>> {
    let rounds = params.step_list.len();
    let mut round_values = Vec::with_capacity(rounds);
    let mut trees = Vec::with_capacity(rounds);
    let mut fri_roots = Vec::with_capacity(rounds);

    let mut values = f0.values().to_vec();
    let mut f0_tree = Some(f0_tree);
    let mut domain_index = 0;
    for &step in &params.step_list {
        let tree = match f0_tree.take() {
            Some(tree) => tree,
            None => precommit(&[values.as_slice()], step)?,
        };
        let root = tree.root();
        transcript.absorb(&root);
        fri_roots.push(root);
        trees.push(tree);

        let mut folded = values.clone();
        for _ in 0..step {
            let alpha = transcript.challenge::<F>();
            folded = fold(&folded, params, domain_index, alpha);
            domain_index += 1;
        }
        round_values.push(std::mem::replace(&mut values, folded));
    }

    let mut coeffs = values;
    params.domains[domain_index].inverse_fft(&mut coeffs);
    let final_polynomial = Polynomial::from_coefficients(coeffs);
    for c in final_polynomial.coefficients() {
        transcript.absorb_field(c);
    }
    log::debug!(
        "FRI commit phase: {} rounds, final polynomial of degree {}",
        rounds,
        final_polynomial.degree()
    );

    Ok(CommitPhase {
        round_values,
        trees,
        fri_roots,
        final_polynomial,
    })
}

/// Draws `λ` challenges and maps each to an index of `D_0`.
pub fn query_indices<F: FftField>(params: &FriParams<F>, transcript: &mut Transcript) -> Vec<usize> {
    let size = params.initial_domain_size() as u64;
    transcript
        .challenges::<F>(params.lambda)
        .iter()
        .map(|c| {
            let bytes = c.to_be_bytes();
            let mut low = [0u8; 8];
            let n = bytes.len().min(8);
            low[8 - n..].copy_from_slice(&bytes[bytes.len() - n..]);
            (u64::from_be_bytes(low) % size) as usize
        })
        .collect()
}

/// Opens every round at the leaf reached by `x_index`.
pub fn round_proofs<F: FftField>(
    commit: &CommitPhase<F>,
    params: &FriParams<F>,
    x_index: usize,
) -> Result<Vec<RoundProof<F>>> {
    let mut x = x_index;
    commit
        .round_values
        .iter()
        .zip(&commit.trees)
        .zip(&params.step_list)
        .map(|((values, tree), &step)| {
            let leaf = leaf_index(x, values.len(), step);
            x = leaf;
            Ok(RoundProof {
                y: coset_values(values, leaf, step),
                p: tree.prove(leaf)?,
            })
        })
        .collect()
}

/// Proves that `poly` has degree at most `params.max_degree`.
///
/// The polynomial's own tree is the first FRI root, so the proof carries no
/// initial proofs.
pub fn prove_polynomial<F: FftField>(
    poly: &Polynomial<F>,
    params: &FriParams<F>,
    transcript: &mut Transcript,
) -> Result<FriProof<F>> {
    let f0 = PolynomialDfs::from_coefficients(poly, params.initial_domain_size())?;
    let tree = precommit(&[f0.values()], params.step_list[0])?;
    prove_with_initial(&f0, tree, params, transcript, |_| Ok(Vec::new()))
}

/// Full FRI proof for `f0`, asking `initial_proofs` for the openings of the
/// committed batches at every query index.
pub(crate) fn prove_with_initial<F, I>(
    f0: &PolynomialDfs<F>,
    f0_tree: MerkleTree,
    params: &FriParams<F>,
    transcript: &mut Transcript,
    initial_proofs: I,
) -> Result<FriProof<F>>
where
    F: FftField,
    I: Fn(usize) -> Result<Vec<InitialProof<F>>> + Sync,
{
    let commit = commit_phase(f0, f0_tree, params, transcript)?;
    let proof_of_work = run_grinding(transcript, params.grinding_bits);
    let indices = query_indices(params, transcript);
    let query_proofs = PoolLevel::High.install(|| {
        indices
            .par_iter()
            .map(|&x| {
                Ok(QueryProof {
                    initial_proofs: initial_proofs(x)?,
                    round_proofs: round_proofs(&commit, params, x)?,
                })
            })
            .collect::<Result<Vec<_>>>()
    })?;
    Ok(FriProof {
        fri_roots: commit.fri_roots,
        final_polynomial: commit.final_polynomial,
        query_proofs,
        proof_of_work,
    })
}
