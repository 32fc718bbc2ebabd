//! An EVM interpreter instrumented to produce the witness of a zkEVM.
//!
//! Blocks are read from JSON with the [`loader`], executed by the
//! [`interpreter`] and observed through [`ExecutionHooks`]. The
//! [`WitnessGenerator`] is the hook implementation recording, for every
//! executed opcode, a row of the state table together with the
//! read/write operations, state accesses, copies and hashes the circuit
//! checks it against:
//!
//! ```ignore
//! let blocks = load_blocks("trace.json")?;
//! let trace = WitnessGenerator::generate(&blocks)?;
//! log::info!("{}", trace.statistics());
//! let columns = trace.to_columns(trace.padded_height())?;
//! ```
//!
//! The resulting columns, together with the fixed [`opcode_table`], are what
//! the `zero` prover commits to.

pub mod error;
pub mod hooks;
pub mod interpreter;
pub mod loader;
pub mod memory;
pub mod opcodes;
pub mod precompiles;
pub mod stack;
pub mod testing_utils;
pub mod witness;
pub mod word;
pub mod world;

pub use error::{ExecutionError, ProgramError, Result};
pub use hooks::ExecutionHooks;
pub use interpreter::{Evm, ExecutionResult};
pub use loader::{load_blocks, read_blocks, Block, BlockHeader, Transaction};
pub use opcodes::{opcode_table, Opcode, VirtualOpcode, OPCODE_TABLE_COLUMNS};
pub use witness::{ExecutionTrace, WitnessGenerator, WITNESS_COLUMNS};
pub use word::Word;
