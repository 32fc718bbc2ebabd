//! The EVM interpreter: opcode dispatch, gas accounting and the call frame
//! lifecycle, reporting every step to an [`ExecutionHooks`] observer.

mod calls;
mod frame;
mod gas;
mod ops;

pub(crate) use ops::memory_range;

use std::mem;

pub use calls::{
    create2_address, create2_address_preimage, create_address, create_address_preimage,
};
use ethereum_types::{Address, H256};
pub use frame::{analyze_jumpdests, Frame, FrameKind, Outcome};
pub use gas::*;
use serde::{Deserialize, Serialize};
use zk_evm_common::{is_precompile, precompile_address, PRECOMPILE_ADDRESSES};

use crate::error::{ExecutionError, ProgramError, Result};
use crate::hooks::ExecutionHooks;
use crate::loader::{Block, BlockHeader, Transaction};
use crate::opcodes::Opcode;
use crate::word::{address_to_word, word_size, Word};
use crate::world::{AccessKey, WorldState};

/// Depth at which further calls fail.
pub const MAX_CALL_DEPTH: usize = 1024;

pub const TX_BASE_GAS: u64 = 21000;
pub const TX_CREATE_GAS: u64 = 32000;
pub const TX_ZERO_BYTE_GAS: u64 = 4;
pub const TX_NONZERO_BYTE_GAS: u64 = 16;
pub const TX_ACCESS_LIST_ADDRESS_GAS: u64 = 2400;
pub const TX_ACCESS_LIST_STORAGE_KEY_GAS: u64 = 1900;
pub const BLOB_GAS_PER_BLOB: u64 = 0x20000;

/// Gas a transaction pays before its first opcode.
pub fn intrinsic_gas(tx: &Transaction) -> u64 {
    let data: u64 = tx
        .calldata
        .iter()
        .map(|b| {
            if *b == 0 {
                TX_ZERO_BYTE_GAS
            } else {
                TX_NONZERO_BYTE_GAS
            }
        })
        .sum();
    let create = if tx.is_deployment() {
        TX_CREATE_GAS + INIT_CODE_WORD * word_size(tx.calldata.len()) as u64
    } else {
        0
    };
    TX_BASE_GAS
        + data
        + create
        + TX_ACCESS_LIST_ADDRESS_GAS * tx.account_access_list.len() as u64
        + TX_ACCESS_LIST_STORAGE_KEY_GAS * tx.storage_access_list.len() as u64
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<H256>,
    #[serde(with = "zk_evm_common::hex_bytes")]
    pub data: Vec<u8>,
}

/// Result of a whole transaction or of a standalone code run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    /// Word the top frame would push to a caller: 1, 0, or the deployed
    /// address.
    pub status: Word,
    pub gas_left: u64,
    /// Final stack of the top frame, bottom first.
    pub stack: Vec<Word>,
    pub output: Vec<u8>,
    pub error: Option<ExecutionError>,
}

/// What a successfully executed opcode asks the loop to do next.
pub(crate) enum Step {
    Continue,
    Halt(Outcome),
    Enter(Box<Frame>),
}

/// Interpreter state. Hooks observe it through shared references.
#[derive(Clone, Debug, Default)]
pub struct Evm {
    pub world: WorldState,
    /// World state at the start of the current block.
    pub block_initial: WorldState,
    /// World state at the start of the current transaction.
    pub tx_initial: WorldState,
    pub header: BlockHeader,
    pub tx: Transaction,
    /// Currently executing frame.
    pub frame: Frame,
    /// Suspended callers, outermost first.
    pub callers: Vec<Frame>,
    pub logs: Vec<LogEntry>,
    pub last_result: Option<ExecutionResult>,
}

impl Evm {
    pub fn new(world: WorldState) -> Self {
        Self {
            block_initial: world.clone(),
            tx_initial: world.clone(),
            world,
            ..Default::default()
        }
    }

    /// Depth of the current frame: 2 for a transaction's top frame, one
    /// more per nested call.
    pub fn depth(&self) -> usize {
        self.callers.len() + 2
    }

    /// Runs `code` as the top frame of an empty transaction, with no
    /// intrinsic gas and no hooks.
    pub fn execute_code(code: &[u8], gas: u64) -> ExecutionResult {
        let mut evm = Evm::default();
        evm.execute_code_with(code, gas, &mut ())
    }

    /// Like [`Evm::execute_code`] against this interpreter's world state.
    pub fn execute_code_with<H: ExecutionHooks>(
        &mut self,
        code: &[u8],
        gas: u64,
        hooks: &mut H,
    ) -> ExecutionResult {
        self.tx_initial = self.world.clone();
        self.logs.clear();
        let mut frame = Frame::new(FrameKind::Transaction, code.to_vec(), gas);
        frame.address = self.tx.to.unwrap_or_default();
        frame.code_address = frame.address;
        frame.caller = self.tx.from;
        frame.snapshot = self.world.clone();
        self.frame = frame;
        self.callers.clear();
        hooks.start_transaction(self);
        self.run_frames(hooks);
        let result = self.top_result();
        hooks.end_transaction(self);
        self.last_result = Some(result.clone());
        result
    }

    /// Executes every block in order on a shared world state.
    pub fn run_blocks<H: ExecutionHooks>(
        blocks: &[Block],
        hooks: &mut H,
    ) -> Result<Vec<ExecutionResult>> {
        let mut evm = Evm::default();
        let mut results = vec![];
        for block in blocks {
            results.extend(evm.run_block(block, hooks)?);
        }
        Ok(results)
    }

    pub fn run_block<H: ExecutionHooks>(
        &mut self,
        block: &Block,
        hooks: &mut H,
    ) -> Result<Vec<ExecutionResult>> {
        self.header = block.header.clone();
        self.world
            .merge(&block.initial_accounts, block.existing_accounts.iter().copied());
        self.block_initial = self.world.clone();
        log::debug!(
            "block {}: {} transactions",
            self.header.number,
            block.transactions.len()
        );
        hooks.start_block(self);

        let mut results = vec![];
        for loaded in block.loaded_transactions() {
            self.world.merge(
                loaded.initial_accounts,
                loaded.existing_accounts.iter().copied(),
            );
            results.push(self.run_transaction(loaded.transaction, hooks)?);
        }
        hooks.end_block(self);
        Ok(results)
    }

    pub fn run_transaction<H: ExecutionHooks>(
        &mut self,
        tx: &Transaction,
        hooks: &mut H,
    ) -> Result<ExecutionResult> {
        let intrinsic = intrinsic_gas(tx);
        if tx.gas < intrinsic {
            return Err(ProgramError::IntrinsicGasTooLow {
                gas: tx.gas,
                intrinsic,
            });
        }

        let gas_fee = tx.gas_price.checked_mul(&Word::from(tx.gas));
        let blob_fee = self.header.blob_base_fee.checked_mul(&Word::from(
            BLOB_GAS_PER_BLOB * tx.blob_versioned_hashes.len() as u64,
        ));
        let upfront = gas_fee
            .and_then(|g| blob_fee.and_then(|b| g.checked_add(&b)))
            .map_err(|_| ProgramError::InsufficientBalance { address: tx.from })?;
        let balance = self.world.balance(&tx.from);
        if upfront.checked_add(&tx.value).map_or(true, |total| total > balance) {
            return Err(ProgramError::InsufficientBalance { address: tx.from });
        }

        self.tx = tx.clone();
        self.logs.clear();
        self.tx_initial = self.world.clone();

        let nonce = self.world.nonce(&tx.from);
        let sender = self.world.account_mut(&tx.from);
        sender.balance = balance - upfront;
        sender.nonce = nonce
            .checked_add(1)
            .ok_or(ProgramError::NonceOverflow { address: tx.from })?;
        self.world.mark_existing(tx.from);

        let gas = tx.gas - intrinsic;
        let mut frame = match tx.to {
            Some(to) => {
                let kind = if is_precompile(&to) {
                    FrameKind::Precompile
                } else {
                    FrameKind::Transaction
                };
                let mut frame = Frame::new(kind, self.world.code(&to).to_vec(), gas);
                frame.address = to;
                frame.calldata = tx.calldata.clone();
                frame
            }
            None => {
                let mut frame = Frame::new(FrameKind::Create, tx.calldata.clone(), gas);
                frame.address = create_address(&tx.from, nonce);
                frame
            }
        };
        frame.code_address = frame.address;
        frame.caller = tx.from;
        frame.value = tx.value;
        frame.warm = self.initial_warm_set(tx, &frame.address);
        frame.snapshot = self.world.clone();

        self.world.transfer(&tx.from, &frame.address, &tx.value);
        self.world.mark_existing(frame.address);
        if frame.kind.is_create() {
            self.world.account_mut(&frame.address).nonce = 1;
        }
        self.frame = frame;
        self.callers.clear();

        hooks.start_transaction(self);
        self.run_frames(hooks);
        let result = self.top_result();

        let refund = tx.gas_price.wrapping_mul(&Word::from(result.gas_left));
        let sender = self.world.account_mut(&tx.from);
        sender.balance = sender.balance.wrapping_add(&refund);

        log::debug!(
            "transaction {:?}: success {}, gas used {}",
            tx.hash,
            result.success,
            tx.gas - result.gas_left
        );
        hooks.end_transaction(self);
        self.last_result = Some(result.clone());
        Ok(result)
    }

    fn initial_warm_set(
        &self,
        tx: &Transaction,
        target: &Address,
    ) -> std::collections::BTreeSet<AccessKey> {
        let mut warm = std::collections::BTreeSet::new();
        warm.insert(AccessKey::Account(tx.from));
        warm.insert(AccessKey::Account(*target));
        warm.insert(AccessKey::Account(self.header.coinbase));
        for index in PRECOMPILE_ADDRESSES {
            warm.insert(AccessKey::Account(precompile_address(index as u8)));
        }
        warm.extend(tx.account_access_list.iter().map(|a| AccessKey::Account(*a)));
        for access in &tx.storage_access_list {
            warm.insert(AccessKey::Account(access.address));
            warm.insert(AccessKey::Storage(access.address, access.key));
        }
        warm
    }

    fn top_result(&self) -> ExecutionResult {
        let outcome = self.frame.outcome.unwrap_or(Outcome::Success);
        ExecutionResult {
            success: outcome.is_success(),
            status: self.frame.status,
            gas_left: self.frame.gas,
            stack: self.frame.stack.as_slice().to_vec(),
            output: self.frame.output.clone(),
            error: match outcome {
                Outcome::Error(e) => Some(e),
                _ => None,
            },
        }
    }

    /// Runs until the transaction's top frame halts.
    fn run_frames<H: ExecutionHooks>(&mut self, hooks: &mut H) {
        loop {
            let outcome = if self.frame.kind == FrameKind::Precompile {
                self.run_precompile()
            } else {
                match self.step(hooks) {
                    Some(outcome) => outcome,
                    None => continue,
                }
            };
            let is_top = self.callers.is_empty();
            self.finish_frame(outcome, hooks);
            if is_top {
                return;
            }
        }
    }

    /// Executes one opcode of the current frame. Returns the frame's outcome
    /// once it halts.
    fn step<H: ExecutionHooks>(&mut self, hooks: &mut H) -> Option<Outcome> {
        let byte = self.frame.current_byte();
        let op = match Opcode::from_byte(byte) {
            Some(Opcode::Invalid) | None => {
                let error = ExecutionError::InvalidOpcode(byte);
                hooks.execution_error(self, Opcode::Invalid, error);
                return Some(Outcome::Error(error));
            }
            Some(op) => op,
        };

        if let Err(error) = self
            .frame
            .stack
            .check(op.stack_inputs(), op.stack_outputs())
        {
            hooks.execution_error(self, op, error);
            return Some(Outcome::Error(error));
        }

        let cost = match self.gas_cost(op) {
            Ok(cost) if cost <= self.frame.gas => cost,
            _ => {
                log::trace!("out of gas at pc {} executing {op}", self.frame.pc);
                hooks.gas_error(self, op);
                return Some(Outcome::Error(ExecutionError::OutOfGas));
            }
        };

        hooks.before_opcode(self, op);
        self.frame.gas -= cost;
        match self.execute(op) {
            Ok(Step::Continue) => {
                hooks.after_opcode(self, op);
                None
            }
            Ok(Step::Halt(outcome)) => {
                hooks.after_opcode(self, op);
                Some(outcome)
            }
            Ok(Step::Enter(child)) => {
                let parent = mem::replace(&mut self.frame, *child);
                self.callers.push(parent);
                hooks.start_call(self);
                None
            }
            Err(error) => {
                hooks.execution_error(self, op, error);
                Some(Outcome::Error(error))
            }
        }
    }

    /// Ends the current frame: reverts on failure, then hands the status,
    /// output and remaining gas back to the caller.
    fn finish_frame<H: ExecutionHooks>(&mut self, outcome: Outcome, hooks: &mut H) {
        let frame = &mut self.frame;
        frame.outcome = Some(outcome);
        match outcome {
            Outcome::Success => {
                frame.status = if frame.kind.is_create() {
                    address_to_word(&frame.address)
                } else {
                    Word::ONE
                };
            }
            Outcome::Revert | Outcome::Error(_) => {
                self.world = frame.snapshot.clone();
                self.logs.truncate(frame.log_checkpoint);
                frame.status = Word::ZERO;
                if let Outcome::Error(_) = outcome {
                    frame.gas = 0;
                    frame.output.clear();
                }
            }
        }
        hooks.leave_call(self);

        let Some(parent) = self.callers.pop() else {
            return;
        };
        let child = mem::replace(&mut self.frame, parent);
        let frame = &mut self.frame;
        if outcome.is_success() {
            frame.warm = child.warm;
            frame.transient = child.transient;
        }
        frame.gas += child.gas;
        let copied = child.return_length.min(child.output.len());
        if copied > 0 {
            frame
                .memory
                .store(child.return_offset, &child.output[..copied]);
        }
        frame.returndata = if child.kind.is_create() && outcome.is_success() {
            vec![]
        } else {
            child.output
        };
        // The call's own pops leave room for its status.
        let pushed = frame.stack.push(child.status);
        debug_assert!(pushed.is_ok(), "no stack slot for the call status");
        frame.pc += 1;
        hooks.end_call(self);
    }
}
