use ethereum_types::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime faults of EVM execution. These end the current frame with a zero
/// status and are recorded in the trace; they never abort trace generation.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionError {
    #[error("out of gas")]
    OutOfGas,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("invalid jump destination")]
    InvalidJumpDestination,
    #[error("invalid opcode {0:#04x}")]
    InvalidOpcode(u8),
}

impl ExecutionError {
    /// Stack faults are reported with the `err0` virtual opcode, bad jumps
    /// with `err1`. Other faults have no error row.
    pub fn error_opcode(&self) -> Option<crate::opcodes::VirtualOpcode> {
        use crate::opcodes::VirtualOpcode;
        match self {
            Self::StackUnderflow | Self::StackOverflow => Some(VirtualOpcode::Err0),
            Self::InvalidJumpDestination => Some(VirtualOpcode::Err1),
            Self::OutOfGas | Self::InvalidOpcode(_) => None,
        }
    }
}

/// Faults of the interpreter's inputs, as opposed to faults of the executed
/// program.
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("account {address:?} cannot pay for the transaction")]
    InsufficientBalance { address: Address },
    #[error("transaction gas {gas} is below the intrinsic cost {intrinsic}")]
    IntrinsicGasTooLow { gas: u64, intrinsic: u64 },
    #[error("sender nonce overflow for {address:?}")]
    NonceOverflow { address: Address },
    #[error("trace of {rows} rows does not fit in {height} rows")]
    TraceTooLarge { rows: usize, height: usize },
    #[error(transparent)]
    Json(#[from] serde_path_to_error::Error<serde_json::Error>),
}

pub type Result<T> = std::result::Result<T, ProgramError>;
