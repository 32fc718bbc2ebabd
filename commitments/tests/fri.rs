use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use zk_evm_commitments::fri::{prove_polynomial, verify_polynomial};
use zk_evm_commitments::testing_utils::{init_logger, random_polynomials};
use zk_evm_commitments::{FriParams, FriProof, Polynomial, Transcript};
use zk_evm_multiprecision::{Bls12381Scalar, FftField, Goldilocks};

type F = Goldilocks;

fn x_squared_plus_one() -> Polynomial<F> {
    Polynomial::from_coefficients(vec![F::one(), F::zero(), F::one()])
}

#[test]
fn test_fri_accepts_low_degree_polynomial() -> anyhow::Result<()> {
    init_logger();
    let params = FriParams::<F>::new(2, 2, vec![1, 1, 1], 10, 0)?;
    assert_eq!(params.initial_domain_size(), 16);

    let proof = prove_polynomial(&x_squared_plus_one(), &params, &mut Transcript::new(b"fri"))?;
    assert_eq!(proof.query_proofs.len(), 10);
    assert_eq!(proof.fri_roots.len(), 3);
    assert_eq!(proof.final_polynomial.degree(), 0);
    assert!(verify_polynomial(&proof, &params, &mut Transcript::new(b"fri")));

    // A different transcript seed draws different challenges.
    assert!(!verify_polynomial(&proof, &params, &mut Transcript::new(b"other")));
    Ok(())
}

#[test]
fn test_fri_rejects_tampered_proofs() -> anyhow::Result<()> {
    init_logger();
    let params = FriParams::<F>::new(2, 2, vec![1, 1, 1], 10, 0)?;
    let proof = prove_polynomial(&x_squared_plus_one(), &params, &mut Transcript::new(b"fri"))?;

    let mut bad_value = proof.clone();
    bad_value.query_proofs[3].round_proofs[1].y[0] += F::one();
    assert!(!verify_polynomial(&bad_value, &params, &mut Transcript::new(b"fri")));

    let mut bad_final = proof.clone();
    bad_final.final_polynomial = &proof.final_polynomial + &Polynomial::constant(F::one());
    assert!(!verify_polynomial(&bad_final, &params, &mut Transcript::new(b"fri")));

    let mut bad_root = proof.clone();
    bad_root.fri_roots[2][0] ^= 1;
    assert!(!verify_polynomial(&bad_root, &params, &mut Transcript::new(b"fri")));

    let mut missing_query = proof;
    missing_query.query_proofs.pop();
    assert!(!verify_polynomial(&missing_query, &params, &mut Transcript::new(b"fri")));
    Ok(())
}

#[test]
fn test_fri_rejects_over_deep_merkle_path() -> anyhow::Result<()> {
    init_logger();
    let params = FriParams::<F>::new(2, 2, vec![1, 1, 1], 10, 0)?;
    let proof = prove_polynomial(&x_squared_plus_one(), &params, &mut Transcript::new(b"fri"))?;

    for round in 0..proof.query_proofs[0].round_proofs.len() {
        let mut deep = proof.clone();
        let path = &mut deep.query_proofs[0].round_proofs[round].p.path;
        let step = path[0];
        path.resize(70, step);
        assert!(!verify_polynomial(&deep, &params, &mut Transcript::new(b"fri")));
    }

    let mut shallow = proof;
    shallow.query_proofs[0].round_proofs[0].p.path.pop();
    assert!(!verify_polynomial(&shallow, &params, &mut Transcript::new(b"fri")));
    Ok(())
}

#[test]
fn test_fri_rejects_high_degree_polynomial() -> anyhow::Result<()> {
    let params = FriParams::<F>::new(2, 2, vec![1, 1, 1], 10, 0)?;
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    let poly = random_polynomials::<F, _>(1, 12, &mut rng).remove(0);
    let proof = prove_polynomial(&poly, &params, &mut Transcript::new(b"fri"))?;
    assert!(proof.final_polynomial.degree() > params.final_polynomial_degree_bound());
    assert!(!verify_polynomial(&proof, &params, &mut Transcript::new(b"fri")));
    Ok(())
}

#[test]
fn test_fri_multi_step_with_grinding() -> anyhow::Result<()> {
    init_logger();
    let params = FriParams::<F>::new(4, 2, vec![2, 1], 8, 8)?;
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    let poly = random_polynomials::<F, _>(1, 15, &mut rng).remove(0);
    let proof = prove_polynomial(&poly, &params, &mut Transcript::new(b"grind"))?;
    assert!(proof.query_proofs[0].round_proofs[0].y.len() == 4);
    assert!(verify_polynomial(&proof, &params, &mut Transcript::new(b"grind")));

    let decoded = FriProof::<F>::from_bytes(&proof.to_bytes())?;
    assert_eq!(decoded, proof);

    let mut bad_nonce = proof;
    bad_nonce.proof_of_work = bad_nonce.proof_of_work.wrapping_add(1);
    assert!(!verify_polynomial(&bad_nonce, &params, &mut Transcript::new(b"grind")));
    Ok(())
}

#[test]
fn test_fri_over_bls12_381_scalar() -> anyhow::Result<()> {
    let params = FriParams::<Bls12381Scalar>::new(3, 1, vec![1, 1], 4, 0)?;
    let mut rng = ChaCha8Rng::seed_from_u64(14);
    let poly = random_polynomials::<Bls12381Scalar, _>(1, 7, &mut rng).remove(0);
    let proof = prove_polynomial(&poly, &params, &mut Transcript::new(b"bls"))?;
    assert!(verify_polynomial(&proof, &params, &mut Transcript::new(b"bls")));
    Ok(())
}
