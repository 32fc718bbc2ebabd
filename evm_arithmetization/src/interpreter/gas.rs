//! Static plus dynamic gas of each opcode, computed without side effects so
//! that faults are detected before an opcode starts executing.

use zk_evm_common::is_precompile;

use super::Evm;
use crate::error::ExecutionError;
use crate::opcodes::Opcode;
use crate::word::{
    count_significant_bytes, word_size, word_to_address, word_to_usize_saturating, Word,
};
use crate::world::AccessKey;

pub const WARM_ACCESS: u64 = 100;
pub const COLD_ACCOUNT_ACCESS: u64 = 2600;
pub const COLD_SLOAD: u64 = 2100;
pub const SSTORE_SET: u64 = 20000;
pub const SSTORE_RESET: u64 = 2900;
pub const SSTORE_SENTRY: u64 = 2300;
pub const CALL_VALUE: u64 = 9000;
pub const TRANSFER_VALUE: u64 = 6700;
pub const NEW_ACCOUNT: u64 = 25000;
pub const CALL_STIPEND: u64 = 2300;
pub const CODE_DEPOSIT: u64 = 200;
pub const COPY_WORD: u64 = 3;
pub const KECCAK_WORD: u64 = 6;
pub const INIT_CODE_WORD: u64 = 2;
pub const LOG_DATA: u64 = 8;
pub const EXP_BYTE: u64 = 50;

fn words(len: &Word) -> u64 {
    word_size(word_to_usize_saturating(len)) as u64
}

impl Evm {
    /// Total gas `op` costs in the current frame, or the fault making it
    /// unaffordable.
    pub(crate) fn gas_cost(&self, op: Opcode) -> Result<u64, ExecutionError> {
        let frame = &self.frame;
        let stack = &frame.stack;
        let memory = &frame.memory;
        let peek = |i| stack.peek(i);
        let account_access = |address: &Word| {
            let key = AccessKey::Account(word_to_address(address));
            if frame.is_warm(&key) {
                0
            } else {
                COLD_ACCOUNT_ACCESS - WARM_ACCESS
            }
        };

        let dynamic = match op {
            Opcode::Exp => EXP_BYTE * count_significant_bytes(&peek(1)?),
            Opcode::Keccak256 => {
                let len = peek(1)?;
                memory.expansion_cost(&peek(0)?, &len)? + KECCAK_WORD * words(&len)
            }
            Opcode::Calldatacopy | Opcode::Codecopy | Opcode::Returndatacopy => {
                let len = peek(2)?;
                memory.expansion_cost(&peek(0)?, &len)? + COPY_WORD * words(&len)
            }
            Opcode::Extcodecopy => {
                let len = peek(3)?;
                account_access(&peek(0)?)
                    + memory.expansion_cost(&peek(1)?, &len)?
                    + COPY_WORD * words(&len)
            }
            Opcode::Mcopy => {
                let (dst, src, len) = (peek(0)?, peek(1)?, peek(2)?);
                let dst_cost = memory.expansion_cost(&dst, &len)?;
                let src_cost = memory.expansion_cost(&src, &len)?;
                dst_cost.max(src_cost) + COPY_WORD * words(&len)
            }
            Opcode::Balance | Opcode::Extcodesize | Opcode::Extcodehash => {
                account_access(&peek(0)?)
            }
            Opcode::Mload | Opcode::Mstore => memory.expansion_cost(&peek(0)?, &Word::from(32u64))?,
            Opcode::Mstore8 => memory.expansion_cost(&peek(0)?, &Word::ONE)?,
            Opcode::Sload => {
                let key = AccessKey::Storage(frame.address, peek(0)?);
                if frame.is_warm(&key) {
                    0
                } else {
                    COLD_SLOAD
                }
            }
            Opcode::Sstore => {
                if frame.gas <= SSTORE_SENTRY {
                    return Err(ExecutionError::OutOfGas);
                }
                self.sstore_cost(&peek(0)?, &peek(1)?)
            }
            Opcode::Log(_) => {
                let len = peek(1)?;
                memory.expansion_cost(&peek(0)?, &len)? + LOG_DATA * word_to_usize_saturating(&len) as u64
            }
            Opcode::Create => {
                let len = peek(2)?;
                memory.expansion_cost(&peek(1)?, &len)? + INIT_CODE_WORD * words(&len)
            }
            Opcode::Create2 => {
                let len = peek(2)?;
                memory.expansion_cost(&peek(1)?, &len)?
                    + (INIT_CODE_WORD + KECCAK_WORD) * words(&len)
            }
            Opcode::Call | Opcode::Delegatecall | Opcode::Staticcall => self.call_cost(op)?,
            Opcode::Return | Opcode::Revert => {
                let len = peek(1)?;
                let deposit = if op == Opcode::Return && frame.kind.is_create() {
                    CODE_DEPOSIT * word_to_usize_saturating(&len) as u64
                } else {
                    0
                };
                memory.expansion_cost(&peek(0)?, &len)? + deposit
            }
            Opcode::Selfdestruct => {
                let target = peek(0)?;
                let address = word_to_address(&target);
                let new_account = !self.world.exists(&address)
                    && !self.world.balance(&frame.address).is_zero();
                account_access(&target) + if new_account { NEW_ACCOUNT } else { 0 }
            }
            _ => 0,
        };
        Ok(op.static_gas().saturating_add(dynamic))
    }

    /// EIP-2200 pricing with EIP-2929 cold surcharge; refunds are not
    /// tracked.
    fn sstore_cost(&self, key: &Word, value: &Word) -> u64 {
        let address = &self.frame.address;
        let original = self.tx_initial.storage(address, key);
        let current = self.world.storage(address, key);
        let cold = !self.frame.is_warm(&AccessKey::Storage(*address, *key));

        let mut cost = WARM_ACCESS;
        if cold {
            cost += COLD_SLOAD;
        }
        if original == current && current != *value {
            cost += if original.is_zero() {
                SSTORE_SET - WARM_ACCESS
            } else {
                SSTORE_RESET - WARM_ACCESS
            };
        }
        cost
    }

    fn call_cost(&self, op: Opcode) -> Result<u64, ExecutionError> {
        let frame = &self.frame;
        let stack = &frame.stack;
        let target = word_to_address(&stack.peek(1)?);
        let (value, args) = match op {
            Opcode::Call => (stack.peek(2)?, 3),
            _ => (Word::ZERO, 2),
        };
        let cold = !frame.is_warm(&AccessKey::Account(target));
        let new_account = !value.is_zero() && !self.world.exists(&target);

        if self.is_plain_transfer(op, &target) {
            let mut cost = WARM_ACCESS;
            if cold {
                cost += COLD_ACCOUNT_ACCESS - WARM_ACCESS;
            }
            if !value.is_zero() {
                cost += TRANSFER_VALUE;
            }
            if new_account {
                cost += NEW_ACCOUNT;
            }
            return Ok(cost);
        }

        let args_cost = frame
            .memory
            .expansion_cost(&stack.peek(args)?, &stack.peek(args + 1)?)?;
        let ret_cost = frame
            .memory
            .expansion_cost(&stack.peek(args + 2)?, &stack.peek(args + 3)?)?;
        let mut cost = args_cost.max(ret_cost);
        cost += if cold { COLD_ACCOUNT_ACCESS } else { WARM_ACCESS };
        if !value.is_zero() {
            cost += CALL_VALUE;
        }
        if new_account {
            cost += NEW_ACCOUNT;
        }
        Ok(cost)
    }

    /// A `CALL` to an account without code that is not a precompile only
    /// moves value and never opens a frame.
    pub(crate) fn is_plain_transfer(&self, op: Opcode, target: &ethereum_types::Address) -> bool {
        op == Opcode::Call && !is_precompile(target) && self.world.code(target).is_empty()
    }
}
