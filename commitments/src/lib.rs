//! FRI-based list polynomial commitments.
//!
//! Polynomials over an FFT-friendly prime field (see
//! [`zk_evm_multiprecision::FftField`]) are committed in batches with
//! Keccak-256 Merkle trees over a radix-2 evaluation domain. An
//! [`LpcScheme`] proves evaluation claims on those batches by running the
//! [`fri`] low-degree test on a single random combination of quotients, and
//! the [`aggregated`] module lets several provers share one FRI proof.
//!
//! All challenges come from a Keccak [`Transcript`]; prover and verifier must
//! feed it the same messages in the same order.
//!
//! ```ignore
//! let params = FriParams::<Goldilocks>::new(10, 2, vec![2, 2, 1], 30, 16)?;
//! let mut lpc = LpcScheme::new(params);
//! lpc.append_to_batch(0, poly)?;
//! let root = lpc.commit(0)?;
//! lpc.append_eval_point_all(0, zeta)?;
//! let proof = lpc.proof_eval(&mut Transcript::new(b"seed"))?;
//! ```
//!
//! Heavy kernels run on two [`rayon`] pools, see [`pool`].

pub mod aggregated;
pub mod domain;
pub mod error;
pub mod fri;
pub mod lpc;
pub mod merkle;
pub mod polynomial;
pub mod pool;
pub mod serialization;
pub mod testing_utils;
pub mod transcript;

pub use aggregated::{aggregated_verify, AggregatedProof, AggregatedProver, LpcQueryProofs};
pub use domain::EvaluationDomain;
pub use error::{CommitmentError, Result};
pub use fri::{FriParams, FriProof};
pub use lpc::{EvalStorage, FixedValues, LpcProof, LpcScheme, PolyEvals};
pub use merkle::{Digest, MerkleProof, MerkleTree};
pub use polynomial::{Polynomial, PolynomialDfs, PolymorphicDfs};
pub use serialization::{ProofReader, ProofWriter};
pub use transcript::Transcript;
