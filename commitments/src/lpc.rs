//! List polynomial commitments.
//!
//! Polynomials are grouped into batches, each batch committed as one Merkle
//! tree over `D_0`. Evaluation claims at arbitrary points are folded into a
//! single quotient
//!
//! ```text
//! combined_Q(X) = Σ_p Σ_{(b, j) : p ∈ P_bj} θ^e · (f_bj(X) - f_bj(p)) / (X - p)
//! ```
//!
//! whose low degree is then shown with FRI. Batches marked as fixed get one
//! more term each, at the point `η` drawn during setup.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use rayon::prelude::*;
use zk_evm_multiprecision::FftField;

use crate::error::{CommitmentError, Result};
use crate::fri::{
    self, coset_values, leaf_index, replay_commit_phase, verify_query, FriParams, FriProof,
    InitialProof,
};
use crate::merkle::{field_elements_to_bytes, Digest, MerkleTree};
use crate::polynomial::{Polynomial, PolynomialDfs};
use crate::pool::PoolLevel;
use crate::transcript::Transcript;

/// Evaluation points of one polynomial and the claimed values there.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolyEvals<F: FftField> {
    pub points: Vec<F>,
    pub values: Vec<F>,
}

/// Claimed evaluations, indexed by batch position (ascending batch id) and
/// then by polynomial.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalStorage<F: FftField> {
    pub batches: Vec<Vec<PolyEvals<F>>>,
}

impl<F: FftField> EvalStorage<F> {
    pub fn get(&self, batch: usize, poly: usize) -> Option<&PolyEvals<F>> {
        self.batches.get(batch)?.get(poly)
    }

    /// Number of `θ` powers taken by the non-fixed terms.
    pub fn term_count(&self) -> usize {
        self.batches.iter().flatten().map(|e| e.points.len()).sum()
    }
}

/// Values of the fixed batches at `η`, computed once by
/// [`LpcScheme::preprocess`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedValues<F: FftField> {
    pub eta: F,
    pub values: BTreeMap<usize, Vec<F>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LpcProof<F: FftField> {
    pub eval_storage: EvalStorage<F>,
    pub fri_proof: FriProof<F>,
}

/// One `θ^e · (f(X) - value) / (X - point)` summand of the combined
/// quotient. `batch` is a batch position, not an id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Term<F: FftField> {
    pub point: F,
    pub batch: usize,
    pub poly: usize,
    pub value: F,
}

#[derive(Clone, Debug)]
struct Committed<F: FftField> {
    /// Evaluations of every polynomial of the batch on `D_0`.
    values: Vec<Vec<F>>,
    tree: MerkleTree,
}

#[derive(Clone, Debug, Default)]
struct Batch<F: FftField> {
    polys: Vec<Polynomial<F>>,
    points: Vec<Vec<F>>,
    committed: Option<Committed<F>>,
}

/// Prover and verifier state of the commitment scheme.
///
/// The verifier uses the same type without any polynomial: it only needs the
/// parameters, the fixed batch ids, the points registered with
/// [`LpcScheme::expect_eval_point`] and the output of [`LpcScheme::setup`].
#[derive(Clone, Debug)]
pub struct LpcScheme<F: FftField> {
    params: FriParams<F>,
    batches: BTreeMap<usize, Batch<F>>,
    fixed: BTreeSet<usize>,
    fixed_values: Option<FixedValues<F>>,
    /// Opening points the verifier accepts, by batch and polynomial.
    expected_points: BTreeMap<usize, Vec<Vec<F>>>,
}

impl<F: FftField> LpcScheme<F> {
    pub fn new(params: FriParams<F>) -> Self {
        Self {
            params,
            batches: BTreeMap::new(),
            fixed: BTreeSet::new(),
            fixed_values: None,
            expected_points: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> &FriParams<F> {
        &self.params
    }

    /// Adds `poly` to `batch` and returns its index within the batch.
    pub fn append_to_batch(&mut self, batch: usize, poly: Polynomial<F>) -> Result<usize> {
        let bound = self.params.max_degree;
        if poly.degree() > bound {
            return Err(CommitmentError::DegreeTooLarge {
                degree: poly.degree(),
                bound,
            });
        }
        let entry = self.batches.entry(batch).or_default();
        if entry.committed.is_some() {
            return Err(CommitmentError::BatchAlreadyCommitted(batch));
        }
        entry.polys.push(poly);
        entry.points.push(Vec::new());
        Ok(entry.polys.len() - 1)
    }

    pub fn batch_len(&self, batch: usize) -> usize {
        self.batches.get(&batch).map_or(0, |b| b.polys.len())
    }

    /// Evaluates the batch on `D_0` and commits to it. Leaf `x0` holds the
    /// first-step coset of every polynomial, polynomial after polynomial.
    pub fn commit(&mut self, batch: usize) -> Result<Digest> {
        let domain = self.params.initial_domain().clone();
        let step = self.params.step_list[0];
        let entry = self
            .batches
            .get_mut(&batch)
            .ok_or(CommitmentError::EmptyBatch(batch))?;
        if entry.committed.is_some() {
            return Err(CommitmentError::BatchAlreadyCommitted(batch));
        }
        if entry.polys.is_empty() {
            return Err(CommitmentError::EmptyBatch(batch));
        }

        let mut values: Vec<Vec<F>> = entry
            .polys
            .iter()
            .map(|p| p.coefficients().to_vec())
            .collect();
        domain.batch_fft(&mut values);
        let slices: Vec<&[F]> = values.iter().map(Vec::as_slice).collect();
        let tree = fri::precommit(&slices, step)?;
        let root = tree.root();
        log::debug!(
            "LPC: committed batch {batch} with {} polynomials on {} points",
            values.len(),
            domain.size()
        );
        entry.committed = Some(Committed { values, tree });
        Ok(root)
    }

    pub fn root(&self, batch: usize) -> Result<Digest> {
        self.batches
            .get(&batch)
            .and_then(|b| b.committed.as_ref())
            .map(|c| c.tree.root())
            .ok_or(CommitmentError::BatchNotCommitted(batch))
    }

    /// Roots of every batch, by batch id.
    pub fn commitments(&self) -> Result<BTreeMap<usize, Digest>> {
        self.batches
            .keys()
            .map(|&id| Ok((id, self.root(id)?)))
            .collect()
    }

    pub fn mark_batch_as_fixed(&mut self, batch: usize) {
        self.fixed.insert(batch);
    }

    pub fn is_fixed(&self, batch: usize) -> bool {
        self.fixed.contains(&batch)
    }

    /// Draws `η` and evaluates every fixed batch there.
    pub fn preprocess(&self, transcript: &mut Transcript) -> Result<FixedValues<F>> {
        let eta = transcript.challenge::<F>();
        let values = self
            .fixed
            .iter()
            .map(|&id| {
                let batch = self
                    .batches
                    .get(&id)
                    .filter(|b| b.committed.is_some())
                    .ok_or(CommitmentError::BatchNotCommitted(id))?;
                Ok((id, batch.polys.iter().map(|p| p.evaluate(eta)).collect()))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(FixedValues { eta, values })
    }

    /// Draws `η` again and installs the preprocessed values for it.
    pub fn setup(&mut self, transcript: &mut Transcript, fixed: FixedValues<F>) -> Result<()> {
        let eta = transcript.challenge::<F>();
        if eta != fixed.eta {
            return Err(CommitmentError::SetupMismatch);
        }
        if self.fixed.iter().any(|id| !fixed.values.contains_key(id)) {
            return Err(CommitmentError::MissingSetup);
        }
        self.fixed_values = Some(fixed);
        Ok(())
    }

    pub fn fixed_values(&self) -> Option<&FixedValues<F>> {
        self.fixed_values.as_ref()
    }

    pub fn append_eval_point(&mut self, batch: usize, poly: usize, point: F) -> Result<()> {
        let points = self
            .batches
            .get_mut(&batch)
            .and_then(|b| b.points.get_mut(poly))
            .ok_or(CommitmentError::UnknownPolynomial { batch, poly })?;
        if !points.contains(&point) {
            points.push(point);
        }
        Ok(())
    }

    pub fn append_eval_point_all(&mut self, batch: usize, point: F) -> Result<()> {
        let polys = self.batch_len(batch);
        if polys == 0 {
            return Err(CommitmentError::EmptyBatch(batch));
        }
        (0..polys).try_for_each(|poly| self.append_eval_point(batch, poly, point))
    }

    /// Registers on the verifier side that polynomial `poly` of `batch` must be
    /// opened at `point`.
    pub fn expect_eval_point(&mut self, batch: usize, poly: usize, point: F) {
        let polys = self.expected_points.entry(batch).or_default();
        if polys.len() <= poly {
            polys.resize(poly + 1, Vec::new());
        }
        if !polys[poly].contains(&point) {
            polys[poly].push(point);
        }
    }

    /// Registers `point` for the first `count` polynomials of `batch`.
    pub fn expect_eval_point_all(&mut self, batch: usize, count: usize, point: F) {
        (0..count).for_each(|poly| self.expect_eval_point(batch, poly, point));
    }

    /// Checks that every batch of `evals` is opened exactly at the registered
    /// points. A batch with no registered points is rejected.
    pub(crate) fn check_eval_points(&self, evals: &EvalStorage<F>, batch_ids: &[usize]) -> Result<()> {
        if evals.batches.len() != batch_ids.len() {
            return Err(CommitmentError::EvalStorageMismatch(batch_ids.len()));
        }
        for (id, polys) in batch_ids.iter().zip(&evals.batches) {
            let expected = self
                .expected_points
                .get(id)
                .ok_or(CommitmentError::UnexpectedEvalPoints(*id))?;
            let matches = expected.len() == polys.len()
                && expected.iter().zip(polys).all(|(points, e)| *points == e.points);
            if !matches {
                return Err(CommitmentError::UnexpectedEvalPoints(*id));
            }
        }
        Ok(())
    }

    /// Evaluates every polynomial at its evaluation points.
    pub fn eval_storage(&self) -> EvalStorage<F> {
        let batches = PoolLevel::High.install(|| {
            self.batches
                .values()
                .map(|batch| {
                    batch
                        .polys
                        .par_iter()
                        .zip(batch.points.par_iter())
                        .map(|(poly, points)| PolyEvals {
                            points: points.clone(),
                            values: points.iter().map(|x| poly.evaluate(*x)).collect(),
                        })
                        .collect()
                })
                .collect()
        });
        EvalStorage { batches }
    }

    /// Number of `θ` powers [`prepare_combined_q`](Self::prepare_combined_q)
    /// consumes, the offset of the next prover in an aggregated proof.
    pub fn compute_theta_power_for_combined_q(&self) -> usize {
        let points: usize = self.batches.values().flat_map(|b| &b.points).map(Vec::len).sum();
        let fixed: usize = self.fixed.iter().map(|id| self.batch_len(*id)).sum();
        points + fixed
    }

    fn committed_ids(&self) -> Result<Vec<usize>> {
        self.batches
            .iter()
            .map(|(&id, b)| match b.committed {
                Some(_) => Ok(id),
                None => Err(CommitmentError::BatchNotCommitted(id)),
            })
            .collect()
    }

    /// Terms of the combined quotient in `θ` order: unique points in order of
    /// first appearance, then batches, then polynomials, and the `η` terms of
    /// the fixed batches last.
    pub(crate) fn terms(&self, evals: &EvalStorage<F>, batch_ids: &[usize]) -> Result<Vec<Term<F>>> {
        if evals.batches.len() != batch_ids.len() {
            return Err(CommitmentError::EvalStorageMismatch(batch_ids.len()));
        }
        let mut terms = Vec::new();
        let unique_points = evals
            .batches
            .iter()
            .flatten()
            .flat_map(|e| e.points.iter().copied())
            .unique();
        for point in unique_points {
            for (batch, polys) in evals.batches.iter().enumerate() {
                for (poly, e) in polys.iter().enumerate() {
                    if let Some(k) = e.points.iter().position(|p| *p == point) {
                        let value = *e
                            .values
                            .get(k)
                            .ok_or(CommitmentError::EvalStorageMismatch(batch_ids[batch]))?;
                        terms.push(Term {
                            point,
                            batch,
                            poly,
                            value,
                        });
                    }
                }
            }
        }

        if self.fixed.is_empty() {
            return Ok(terms);
        }
        let fixed = self
            .fixed_values
            .as_ref()
            .ok_or(CommitmentError::MissingSetup)?;
        for &id in &self.fixed {
            let batch = batch_ids
                .iter()
                .position(|b| *b == id)
                .ok_or(CommitmentError::BatchNotCommitted(id))?;
            let values = fixed.values.get(&id).ok_or(CommitmentError::MissingSetup)?;
            if values.len() != evals.batches[batch].len() {
                return Err(CommitmentError::EvalStorageMismatch(id));
            }
            terms.extend(values.iter().enumerate().map(|(poly, &value)| Term {
                point: fixed.eta,
                batch,
                poly,
                value,
            }));
        }
        Ok(terms)
    }

    /// Builds `combined_Q` with the powers `θ^starting_power, θ^(starting_power+1), ..`.
    pub fn prepare_combined_q(
        &self,
        evals: &EvalStorage<F>,
        theta: F,
        starting_power: usize,
    ) -> Result<Polynomial<F>> {
        let ids = self.committed_ids()?;
        let terms = self.terms(evals, &ids)?;
        let powers = theta_powers(theta, starting_power, terms.len());
        let batches: Vec<&Batch<F>> = self.batches.values().collect();

        let mut groups = Vec::new();
        let mut start = 0;
        for (_, group) in &terms.iter().chunk_by(|t| t.point) {
            let end = start + group.count();
            groups.push(start..end);
            start = end;
        }

        let width = self.params.max_degree + 1;
        let quotients = PoolLevel::High.install(|| {
            groups
                .par_iter()
                .map(|range| {
                    let mut numerator = vec![F::zero(); width];
                    let mut constant = F::zero();
                    for i in range.clone() {
                        let t = &terms[i];
                        let f = batches
                            .get(t.batch)
                            .and_then(|b| b.polys.get(t.poly))
                            .ok_or(CommitmentError::UnknownPolynomial {
                                batch: ids[t.batch],
                                poly: t.poly,
                            })?;
                        for (n, c) in numerator.iter_mut().zip(f.coefficients()) {
                            *n += powers[i] * *c;
                        }
                        constant += powers[i] * t.value;
                    }
                    numerator[0] -= constant;
                    let (quotient, _) =
                        Polynomial::from_coefficients(numerator).divide_by_linear(terms[range.start].point);
                    Ok(quotient)
                })
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(quotients
            .iter()
            .fold(Polynomial::zero(), |acc, q| &acc + q))
    }

    /// Openings of every batch on the first-round leaf of `x_index`.
    pub fn initial_proofs(&self, x_index: usize) -> Result<Vec<InitialProof<F>>> {
        let step = self.params.step_list[0];
        let leaf = leaf_index(x_index, self.params.initial_domain_size(), step);
        self.batches
            .iter()
            .map(|(&id, batch)| {
                let committed = batch
                    .committed
                    .as_ref()
                    .ok_or(CommitmentError::BatchNotCommitted(id))?;
                Ok(InitialProof {
                    values: committed
                        .values
                        .iter()
                        .map(|v| coset_values(v, leaf, step))
                        .collect(),
                    p: committed.tree.prove(leaf)?,
                })
            })
            .collect()
    }

    /// Proves every evaluation claim. The transcript must have seen the same
    /// messages as the verifier's.
    pub fn proof_eval(&self, transcript: &mut Transcript) -> Result<LpcProof<F>> {
        let ids = self.committed_ids()?;
        let eval_storage = self.eval_storage();
        for id in &ids {
            transcript.absorb(&self.root(*id)?);
        }
        let theta = transcript.challenge::<F>();
        let combined = self.prepare_combined_q(&eval_storage, theta, 0)?;
        log::debug!(
            "LPC: combined quotient of degree {} over {} batches",
            combined.degree(),
            ids.len()
        );

        let f0 = PolynomialDfs::from_coefficients(&combined, self.params.initial_domain_size())?;
        let tree = fri::precommit(&[f0.values()], self.params.step_list[0])?;
        let fri_proof =
            fri::prove_with_initial(&f0, tree, &self.params, transcript, |x| self.initial_proofs(x))?;
        Ok(LpcProof {
            eval_storage,
            fri_proof,
        })
    }

    /// Verifies `proof` against the batch roots in `commitments`.
    pub fn verify_eval(
        &self,
        proof: &LpcProof<F>,
        commitments: &BTreeMap<usize, Digest>,
        transcript: &mut Transcript,
    ) -> bool {
        let ids: Vec<usize> = commitments.keys().copied().collect();
        let roots: Vec<Digest> = commitments.values().copied().collect();
        for root in &roots {
            transcript.absorb(root);
        }
        let theta = transcript.challenge::<F>();
        if let Err(e) = self.check_eval_points(&proof.eval_storage, &ids) {
            log::info!("LPC: {e}");
            return false;
        }
        let terms = match self.terms(&proof.eval_storage, &ids) {
            Ok(terms) => terms,
            Err(e) => {
                log::info!("LPC: {e}");
                return false;
            }
        };

        let fri = &proof.fri_proof;
        let Some(challenges) = replay_commit_phase(
            &fri.fri_roots,
            &fri.final_polynomial,
            fri.proof_of_work,
            &self.params,
            transcript,
        ) else {
            return false;
        };
        if fri.query_proofs.len() != challenges.query_indices.len() {
            log::info!("LPC: wrong number of query proofs");
            return false;
        }
        let powers = theta_powers(theta, 0, terms.len());
        PoolLevel::High.install(|| {
            challenges
                .query_indices
                .par_iter()
                .zip(&fri.query_proofs)
                .all(|(&x, query)| {
                    let Some(values) = combined_values(
                        &self.params,
                        &terms,
                        &powers,
                        &roots,
                        &proof.eval_storage,
                        &query.initial_proofs,
                        x,
                    ) else {
                        return false;
                    };
                    verify_query(
                        &self.params,
                        &fri.fri_roots,
                        &fri.final_polynomial,
                        &challenges.alphas,
                        x,
                        Some(&values),
                        &query.round_proofs,
                    )
                })
        })
    }
}

pub(crate) fn theta_powers<F: FftField>(theta: F, starting_power: usize, count: usize) -> Vec<F> {
    let mut acc = theta.pow_u64(starting_power as u64);
    (0..count)
        .map(|_| {
            let power = acc;
            acc *= theta;
            power
        })
        .collect()
}

/// Checks the initial proofs of one query against the batch roots and
/// recomputes `combined_Q` on the opened coset of `D_0`.
pub(crate) fn combined_values<F: FftField>(
    params: &FriParams<F>,
    terms: &[Term<F>],
    powers: &[F],
    roots: &[Digest],
    evals: &EvalStorage<F>,
    initial_proofs: &[InitialProof<F>],
    x_index: usize,
) -> Option<Vec<F>> {
    let step = params.step_list[0];
    let size = params.initial_domain_size();
    let leaves = size >> step;
    let leaf = leaf_index(x_index, size, step);

    if initial_proofs.len() != roots.len() || evals.batches.len() != roots.len() {
        log::info!("LPC: query {x_index} opens {} batches", initial_proofs.len());
        return None;
    }
    for (batch, (proof, root)) in initial_proofs.iter().zip(roots).enumerate() {
        if !proof.p.opens(leaf, leaves) {
            log::info!(
                "LPC: query {x_index} batch {batch} path of depth {} does not open leaf {leaf} of {leaves}",
                proof.p.depth()
            );
            return None;
        }
        let well_formed = proof.values.len() == evals.batches[batch].len()
            && proof.values.iter().all(|v| v.len() == 1 << step);
        if !well_formed {
            log::info!("LPC: query {x_index} batch {batch} initial proof is malformed");
            return None;
        }
        let bytes = field_elements_to_bytes(proof.values.iter().flatten());
        if !proof.p.verify(&bytes, root) {
            log::info!("LPC: query {x_index} batch {batch} Merkle proof is invalid");
            return None;
        }
    }

    let domain = params.initial_domain();
    (0..1usize << step)
        .map(|k| {
            let x = domain.element(leaf + k * leaves);
            let mut sum = F::zero();
            let mut cached: Option<(F, F)> = None;
            for (t, power) in terms.iter().zip(powers) {
                let inv = match cached {
                    Some((point, inv)) if point == t.point => inv,
                    _ => {
                        let inv = (x - t.point).try_inverse()?;
                        cached = Some((t.point, inv));
                        inv
                    }
                };
                let value = *initial_proofs[t.batch].values.get(t.poly)?.get(k)?;
                sum += *power * (value - t.value) * inv;
            }
            Some(sum)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use zk_evm_multiprecision::Goldilocks;

    use super::*;

    type F = Goldilocks;

    fn scheme(rng: &mut ChaCha8Rng) -> anyhow::Result<LpcScheme<F>> {
        let params = FriParams::new(4, 2, vec![2, 1], 6, 0)?;
        let mut lpc = LpcScheme::new(params);
        for batch in [3, 1] {
            for degree in [15, 7, 0] {
                lpc.append_to_batch(batch, Polynomial::random(degree, rng))?;
            }
        }
        Ok(lpc)
    }

    #[test]
    fn test_batch_lifecycle_errors() -> anyhow::Result<()> {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut lpc = scheme(&mut rng)?;
        assert!(matches!(
            lpc.append_to_batch(0, Polynomial::random(16, &mut rng)),
            Err(CommitmentError::DegreeTooLarge { degree: 16, bound: 15 })
        ));
        assert!(matches!(lpc.commit(9), Err(CommitmentError::EmptyBatch(9))));
        assert!(lpc.append_eval_point(1, 3, F::one()).is_err());

        lpc.commit(1)?;
        assert!(matches!(
            lpc.append_to_batch(1, Polynomial::zero()),
            Err(CommitmentError::BatchAlreadyCommitted(1))
        ));
        assert!(matches!(
            lpc.proof_eval(&mut Transcript::default()),
            Err(CommitmentError::BatchNotCommitted(3))
        ));
        Ok(())
    }

    #[test]
    fn test_combined_q_matches_pointwise_sum() -> anyhow::Result<()> {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut lpc = scheme(&mut rng)?;
        lpc.commit(1)?;
        lpc.commit(3)?;
        let (z1, z2) = (F::random(&mut rng), F::random(&mut rng));
        lpc.append_eval_point_all(1, z1)?;
        lpc.append_eval_point(3, 0, z2)?;
        lpc.append_eval_point(3, 2, z1)?;
        lpc.append_eval_point(3, 2, z1)?;
        assert_eq!(lpc.compute_theta_power_for_combined_q(), 5);

        let evals = lpc.eval_storage();
        assert_eq!(evals.term_count(), 5);
        let theta = F::from_u64(3);
        let q = lpc.prepare_combined_q(&evals, theta, 2)?;
        assert!(q.degree() < 15);

        let terms = lpc.terms(&evals, &[1, 3])?;
        // z1 on batch 1 first, then batch 3, then z2.
        let order: Vec<_> = terms.iter().map(|t| (t.batch, t.poly)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (0, 2), (1, 2), (1, 0)]);

        let x = F::random(&mut rng);
        let batches: Vec<_> = lpc.batches.values().collect();
        let expected = terms
            .iter()
            .zip(theta_powers(theta, 2, terms.len()))
            .fold(F::zero(), |acc, (t, power)| {
                let f = &batches[t.batch].polys[t.poly];
                let inv = (x - t.point).try_inverse().unwrap_or_default();
                acc + power * (f.evaluate(x) - t.value) * inv
            });
        assert_eq!(q.evaluate(x), expected);
        Ok(())
    }

    #[test]
    fn test_fixed_batches_need_setup() -> anyhow::Result<()> {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut lpc = scheme(&mut rng)?;
        lpc.commit(1)?;
        lpc.commit(3)?;
        lpc.mark_batch_as_fixed(3);
        assert!(matches!(
            lpc.proof_eval(&mut Transcript::default()),
            Err(CommitmentError::MissingSetup)
        ));

        let fixed = lpc.preprocess(&mut Transcript::new(b"setup"))?;
        assert_eq!(fixed.values[&3].len(), 3);
        assert!(matches!(
            lpc.setup(&mut Transcript::new(b"other"), fixed.clone()),
            Err(CommitmentError::SetupMismatch)
        ));
        lpc.setup(&mut Transcript::new(b"setup"), fixed)?;
        assert_eq!(lpc.compute_theta_power_for_combined_q(), 3);
        Ok(())
    }
}
