//! Proving and verifying zkEVM execution traces with list polynomial
//! commitments.
//!
//! The fixed batch holds the opcode table and the witness batch the columns
//! of the [`ExecutionTrace`](evm_arithmetization::ExecutionTrace). Both are
//! interpolated over Goldilocks, committed, and opened at a transcript
//! challenge `ζ`.

pub mod params;
pub mod proof;
pub mod prover;
pub mod tracing;
pub mod verifier;

/// Field the trace columns are encoded in.
pub type F = zk_evm_multiprecision::Goldilocks;
