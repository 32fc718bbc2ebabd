//! FRI low-degree test.
//!
//! A round with step `s` over a domain of size `N` commits to a Merkle tree
//! with `N / 2^s` leaves. Leaf `x0` holds the values at the indices
//! `x0 + j·N/2^s` for `j < 2^s`, which is exactly the set of points that
//! collapses onto a single point after `s` folds. A query at `x` therefore
//! opens one leaf per round.

mod proof_of_work;
mod prover;
mod verifier;

use std::sync::Arc;

use zk_evm_multiprecision::FftField;

pub use proof_of_work::{run_grinding, verify_grinding};
pub(crate) use prover::prove_with_initial;
pub use prover::{
    commit_phase, precommit, prove_polynomial, query_indices, round_proofs, CommitPhase,
};
pub use verifier::{replay_commit_phase, verify_polynomial, verify_query, FriChallenges};

use crate::domain::{domain_chain, EvaluationDomain};
use crate::error::{CommitmentError, Result};
use crate::merkle::{Digest, MerkleProof};
use crate::polynomial::Polynomial;

pub const MAX_STEP: usize = 10;

/// Validates a step list against the total number of folds `r`.
pub fn check_step_list(steps: &[usize], r: usize) -> Result<()> {
    let fail = |reason| {
        Err(CommitmentError::InvalidStepList {
            steps: steps.to_vec(),
            reason,
        })
    };
    if steps.is_empty() {
        return fail("empty");
    }
    if steps.iter().any(|s| !(1..=MAX_STEP).contains(s)) {
        return fail("every step must be between 1 and 10");
    }
    if steps.iter().sum::<usize>() != r {
        return fail("steps do not add up to the number of rounds");
    }
    if steps.last() != Some(&1) {
        return fail("the last step must be 1");
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct FriParams<F: FftField> {
    pub degree_log: usize,
    pub expand_factor: usize,
    pub step_list: Vec<usize>,
    pub lambda: usize,
    /// Leading zero bits required from the grinding nonce, 0 disables
    /// grinding.
    pub grinding_bits: u32,
    /// Total number of folds, the sum of `step_list`.
    pub r: usize,
    pub max_degree: usize,
    /// `D_0 ⊃ .. ⊃ D_r`.
    pub domains: Vec<Arc<EvaluationDomain<F>>>,
}

impl<F: FftField> FriParams<F> {
    pub fn new(
        degree_log: usize,
        expand_factor: usize,
        step_list: Vec<usize>,
        lambda: usize,
        grinding_bits: u32,
    ) -> Result<Self> {
        let r = step_list.iter().sum();
        check_step_list(&step_list, r)?;
        if r > degree_log + expand_factor {
            return Err(CommitmentError::InvalidStepList {
                steps: step_list,
                reason: "more folds than the domain allows",
            });
        }
        let domains = domain_chain((degree_log + expand_factor) as u32, r as u32)?;
        Ok(Self {
            degree_log,
            expand_factor,
            step_list,
            lambda,
            grinding_bits,
            r,
            max_degree: (1 << degree_log) - 1,
            domains,
        })
    }

    pub fn use_grinding(&self) -> bool {
        self.grinding_bits > 0
    }

    /// `D_0`, the domain the committed polynomials are evaluated on.
    pub fn initial_domain(&self) -> &Arc<EvaluationDomain<F>> {
        &self.domains[0]
    }

    pub fn initial_domain_size(&self) -> usize {
        self.domains[0].size()
    }

    /// Index into `domains` of the domain round `round` starts on.
    pub fn round_domain_index(&self, round: usize) -> usize {
        self.step_list[..round].iter().sum()
    }

    /// Largest degree accepted for the final polynomial.
    pub fn final_polynomial_degree_bound(&self) -> usize {
        if self.degree_log + 1 >= self.r {
            (1 << (self.degree_log + 1 - self.r)) - 1
        } else {
            0
        }
    }
}

impl<F: FftField> PartialEq for FriParams<F> {
    fn eq(&self, other: &Self) -> bool {
        self.degree_log == other.degree_log
            && self.expand_factor == other.expand_factor
            && self.step_list == other.step_list
            && self.lambda == other.lambda
            && self.grinding_bits == other.grinding_bits
    }
}

/// Merkle opening of one FRI round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundProof<F: FftField> {
    /// Values of the round polynomial on the opened leaf.
    pub y: Vec<F>,
    pub p: MerkleProof,
}

/// Opening of one committed batch on the leaf of the first round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitialProof<F: FftField> {
    /// `values[k]` are the leaf values of the `k`-th polynomial of the batch.
    pub values: Vec<Vec<F>>,
    pub p: MerkleProof,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryProof<F: FftField> {
    /// One entry per committed batch, in batch order.
    pub initial_proofs: Vec<InitialProof<F>>,
    pub round_proofs: Vec<RoundProof<F>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FriProof<F: FftField> {
    /// Root of every round polynomial, starting with the folded-into
    /// polynomial itself.
    pub fri_roots: Vec<Digest>,
    pub final_polynomial: Polynomial<F>,
    pub query_proofs: Vec<QueryProof<F>>,
    pub proof_of_work: u64,
}

/// Leaf holding index `x` for a round with step `step` over a domain of
/// size `domain_size`.
pub(crate) fn leaf_index(x: usize, domain_size: usize, step: usize) -> usize {
    x % (domain_size >> step)
}

/// Values of `values` on leaf `leaf`.
pub(crate) fn coset_values<F: FftField>(values: &[F], leaf: usize, step: usize) -> Vec<F> {
    let stride = values.len() >> step;
    (0..1usize << step)
        .map(|j| values[leaf + j * stride])
        .collect()
}

/// Folds the values on leaf `leaf` of `domain` once with challenge `alpha`.
///
/// The points `p` and `-p` sit `2^(s-1)` apart within the leaf, and the
/// folded value is `(f(p) + f(-p))/2 + α(f(p) - f(-p))/(2p)`. The result is
/// the leaf `leaf` of the halved domain with one step less.
pub(crate) fn fold_coset<F: FftField>(
    y: &[F],
    leaf: usize,
    domain: &EvaluationDomain<F>,
    alpha: F,
) -> Vec<F> {
    let half = y.len() / 2;
    let stride = domain.size() / y.len();
    let two_inv = F::from_u64(2).try_inverse().unwrap_or_else(F::one);
    (0..half)
        .map(|j| {
            let (a, b) = (y[j], y[j + half]);
            let p_inv = domain.element_inv(leaf + j * stride);
            ((a + b) + alpha * (a - b) * p_inv) * two_inv
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use zk_evm_multiprecision::Goldilocks;

    use super::*;

    #[test]
    fn test_step_list_validation() {
        assert!(check_step_list(&[1, 1, 1], 3).is_ok());
        assert!(check_step_list(&[3, 2, 1], 6).is_ok());
        assert!(check_step_list(&[], 0).is_err());
        assert!(check_step_list(&[2, 2], 4).is_err());
        assert!(check_step_list(&[11, 1], 12).is_err());
        assert!(check_step_list(&[2, 1], 4).is_err());
        assert!(check_step_list(&[0, 1], 1).is_err());
    }

    #[test]
    fn test_params_derive_domains() -> anyhow::Result<()> {
        let params = FriParams::<Goldilocks>::new(2, 2, vec![1, 1, 1], 10, 0)?;
        assert_eq!(params.r, 3);
        assert_eq!(params.max_degree, 3);
        assert_eq!(params.initial_domain_size(), 16);
        assert_eq!(params.domains.len(), 4);
        assert_eq!(params.domains[3].size(), 2);
        assert_eq!(params.round_domain_index(2), 2);
        assert_eq!(params.final_polynomial_degree_bound(), 0);
        assert!(!params.use_grinding());

        let wide = FriParams::<Goldilocks>::new(10, 2, vec![3, 3, 1], 4, 8)?;
        assert_eq!(wide.final_polynomial_degree_bound(), (1 << 4) - 1);
        assert!(FriParams::<Goldilocks>::new(2, 1, vec![3, 1], 4, 0).is_err());
        Ok(())
    }

    #[test]
    fn test_fold_matches_even_odd_split() -> anyhow::Result<()> {
        // f(X) = 1 + 2X + 3X^2 + 4X^3, f_e = 1 + 3X, f_o = 2 + 4X.
        let f = Polynomial::from_coefficients(
            [1, 2, 3, 4].map(Goldilocks::from_u64).to_vec(),
        );
        let domain = EvaluationDomain::<Goldilocks>::new(8)?;
        let alpha = Goldilocks::from_u64(5);
        let values: Vec<_> = domain.elements().into_iter().map(|x| f.evaluate(x)).collect();
        let folded_domain = EvaluationDomain::<Goldilocks>::new(4)?;
        let expected = Polynomial::from_coefficients(
            [1 + 5 * 2, 3 + 5 * 4].map(Goldilocks::from_u64).to_vec(),
        );
        for leaf in 0..4 {
            let y = coset_values(&values, leaf, 1);
            let folded = fold_coset(&y, leaf, &domain, alpha);
            assert_eq!(folded, vec![expected.evaluate(folded_domain.element(leaf))]);
        }
        // A step-2 leaf folds onto a step-1 leaf of the halved domain.
        let y = coset_values(&values, 1, 2);
        let folded = fold_coset(&y, 1, &domain, alpha);
        let folded_values: Vec<_> = folded_domain
            .elements()
            .into_iter()
            .map(|x| expected.evaluate(x))
            .collect();
        assert_eq!(folded, coset_values(&folded_values, 1, 1));
        Ok(())
    }
}
