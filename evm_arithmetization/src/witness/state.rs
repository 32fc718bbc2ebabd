use std::collections::BTreeMap;

use ethereum_types::H256;
use serde::{Deserialize, Serialize};

use crate::stack::Stack;
use crate::word::Word;

/// Opcode-specific values a row exposes to its gate, besides the common
/// columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    AdditionalInput,
    CallContextAddress,
    CallContextValue,
    StorageKey,
    StorageValue,
    InitialStorageValue,
    WasAccessed,
    KeccakResult,
    Depth,
    BytecodeSize,
    CalldataSize,
    ReturndataSize,
    LastsubcallId,
    LastcallReturndataOffset,
    LastcallReturndataLength,
    ModifiedItemsAmount,
}

/// One row of the zkEVM state table, captured before an opcode (or a
/// boundary pseudo-opcode) executes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkevmState {
    pub call_id: usize,
    pub bytecode_hash: H256,
    pub pc: usize,
    pub opcode: u16,
    pub stack_size: usize,
    pub memory_size: usize,
    pub gas: u64,
    pub rw_counter: usize,
    /// Topmost stack words the opcode consumes, top first.
    pub stack_top: Vec<Word>,
    pub fields: BTreeMap<StateField, Word>,
}

impl ZkevmState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        call_id: usize,
        bytecode_hash: H256,
        pc: usize,
        opcode: u16,
        stack_size: usize,
        memory_size: usize,
        gas: u64,
        rw_counter: usize,
    ) -> Self {
        Self {
            call_id,
            bytecode_hash,
            pc,
            opcode,
            stack_size,
            memory_size,
            gas,
            rw_counter,
            ..Default::default()
        }
    }

    pub fn load_stack(&mut self, stack: &Stack, depth: usize) {
        self.stack_top = stack.as_slice().iter().rev().take(depth).copied().collect();
    }

    pub fn set(&mut self, field: StateField, value: impl Into<Word>) {
        self.fields.insert(field, value.into());
    }

    pub fn get(&self, field: StateField) -> Word {
        self.fields.get(&field).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_stack_is_top_first() -> anyhow::Result<()> {
        let mut stack = Stack::new();
        for i in 1..=3u64 {
            stack.push(Word::from(i))?;
        }
        let mut row = ZkevmState::default();
        row.load_stack(&stack, 2);
        assert_eq!(row.stack_top, vec![Word::from(3u64), Word::from(2u64)]);

        row.set(StateField::Depth, 2u64);
        assert_eq!(row.get(StateField::Depth), Word::from(2u64));
        assert_eq!(row.get(StateField::KeccakResult), Word::ZERO);
        Ok(())
    }
}
