use std::collections::{BTreeMap, BTreeSet};

use ethereum_types::{Address, H256};
use serde::{Deserialize, Serialize};
use zk_evm_common::{keccak256, EMPTY_CODE_HASH};

use crate::memory::Memory;
use crate::opcodes::Opcode;
use crate::stack::Stack;
use crate::word::Word;
use crate::world::{AccessKey, WorldState};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    #[default]
    Transaction,
    Call,
    DelegateCall,
    StaticCall,
    Create,
    Create2,
    Precompile,
}

impl FrameKind {
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create | Self::Create2)
    }
}

/// How a frame stopped executing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Revert,
    Error(crate::error::ExecutionError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Marks the offsets of `JUMPDEST` bytes that are not push immediates.
pub fn analyze_jumpdests(code: &[u8]) -> Vec<bool> {
    let mut valid = vec![false; code.len()];
    let mut pc = 0;
    while pc < code.len() {
        match Opcode::from_byte(code[pc]) {
            Some(Opcode::Jumpdest) => valid[pc] = true,
            Some(op) => pc += op.immediate_len(),
            None => {}
        }
        pc += 1;
    }
    valid
}

/// An executing call frame.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    pub kind: FrameKind,
    /// Account whose storage and balance the code acts on.
    pub address: Address,
    /// Account the code was loaded from.
    pub code_address: Address,
    pub caller: Address,
    pub value: Word,
    pub code: Vec<u8>,
    pub code_hash: H256,
    jumpdests: Vec<bool>,
    pub calldata: Vec<u8>,
    pub stack: Stack,
    pub memory: Memory,
    pub pc: usize,
    pub gas: u64,
    pub initial_gas: u64,
    /// Output of the last sub call made from this frame.
    pub returndata: Vec<u8>,
    /// Data this frame returns or reverts with.
    pub output: Vec<u8>,
    /// Word pushed to the caller once the frame ends.
    pub status: Word,
    /// World state at frame entry.
    pub snapshot: WorldState,
    pub warm: BTreeSet<AccessKey>,
    pub transient: BTreeMap<(Address, Word), Word>,
    /// Region of the caller's memory receiving the output.
    pub return_offset: usize,
    pub return_length: usize,
    /// Number of logs emitted before the frame started.
    pub log_checkpoint: usize,
    pub outcome: Option<Outcome>,
}

impl Frame {
    pub fn new(kind: FrameKind, code: Vec<u8>, gas: u64) -> Self {
        let code_hash = if code.is_empty() {
            EMPTY_CODE_HASH
        } else {
            H256(keccak256(&code))
        };
        Self {
            kind,
            jumpdests: analyze_jumpdests(&code),
            code,
            code_hash,
            gas,
            initial_gas: gas,
            ..Default::default()
        }
    }

    pub fn is_valid_jump(&self, dest: &Word) -> bool {
        usize::try_from(dest)
            .ok()
            .and_then(|d| self.jumpdests.get(d).copied())
            .unwrap_or(false)
    }

    /// Byte at `pc`, `STOP` past the end of the code.
    pub fn current_byte(&self) -> u8 {
        self.code.get(self.pc).copied().unwrap_or(0)
    }

    /// Big-endian immediate of a `PUSHn` at `pc`, zero-padded past the end of
    /// the code.
    pub fn push_immediate(&self, len: usize) -> Word {
        let bytes = crate::memory::padded_slice(&self.code, self.pc + 1, len);
        Word::from_be_slice_truncated(&bytes)
    }

    pub fn is_warm(&self, key: &AccessKey) -> bool {
        match key {
            AccessKey::Account(address) if zk_evm_common::is_precompile(address) => true,
            _ => self.warm.contains(key),
        }
    }

    pub fn gas_used(&self) -> u64 {
        self.initial_gas - self.gas
    }
}
