use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::copy::CopyEvent;
use super::keccak::{BytecodeTable, KeccakBuffers};
use super::operations::{RwOperation, RwOperationKind, StateOperation, TimelineEntry};
use super::state::ZkevmState;
use crate::error::{ProgramError, Result};
use crate::opcodes::{Opcode, VirtualOpcode};
use crate::word::Word;

/// What the state table records about a finished block, transaction or call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSummary {
    pub modified_items: usize,
    pub is_reverted: bool,
    /// Largest counter at which the call modified state, 0 if it did not.
    pub end_call_rw_id: usize,
}

/// The complete witness of an execution.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub states: Vec<ZkevmState>,
    /// Sorted by `(kind, id, address, rw_counter)` once finalized.
    pub rw_operations: Vec<RwOperation>,
    pub state_operations: Vec<StateOperation>,
    /// Every original operation, by counter.
    pub timeline: Vec<TimelineEntry>,
    pub copy_events: Vec<CopyEvent>,
    pub keccaks: KeccakBuffers,
    pub bytecodes: BytecodeTable,
    /// `(base, exponent)` of every `EXP`.
    pub exponentiations: Vec<(Word, Word)>,
    pub call_summaries: BTreeMap<usize, CallSummary>,
}

/// Names of the columns produced by [`ExecutionTrace::to_columns`].
pub const WITNESS_COLUMNS: [&str; 34] = [
    "state_call_id",
    "state_pc",
    "state_opcode",
    "state_stack_size",
    "state_memory_size",
    "state_gas",
    "state_rw_counter",
    "rw_kind",
    "rw_id",
    "rw_address",
    "rw_counter",
    "rw_is_write",
    "rw_internal_counter",
    "rw_value_0",
    "rw_value_1",
    "rw_value_2",
    "rw_value_3",
    "rw_value_4",
    "rw_value_5",
    "rw_value_6",
    "rw_value_7",
    "state_op_kind",
    "state_op_id",
    "state_op_field",
    "state_op_rw_counter",
    "state_op_is_write",
    "state_op_is_original",
    "state_op_internal_counter",
    "state_op_address",
    "state_op_storage_key",
    "state_op_value_lo",
    "state_op_value_hi",
    "state_op_previous_lo",
    "state_op_previous_hi",
];

/// 32-bit limbs of `word`, least significant first.
fn limbs(word: &Word) -> [u64; 8] {
    let bytes = word.to_be_bytes();
    let mut limbs = [0; 8];
    for (i, chunk) in bytes.rchunks(4).enumerate() {
        limbs[i] = chunk.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
    }
    limbs
}

impl ExecutionTrace {
    /// Sorts the RW and state tables, numbers the cells of each and builds
    /// the timeline.
    pub(crate) fn finalize(&mut self) {
        self.rw_operations.sort();
        let mut internal_counter = 0;
        for i in 0..self.rw_operations.len() {
            if i > 0 && !self.rw_operations[i].same_cell(&self.rw_operations[i - 1]) {
                internal_counter += 1;
            }
            let op = &mut self.rw_operations[i];
            op.internal_counter = internal_counter;
            self.timeline.push(TimelineEntry {
                rw_counter: op.rw_counter,
                kind: op.kind,
                internal_counter,
            });
        }

        self.state_operations.sort();
        let mut internal_counter = 0;
        for i in 0..self.state_operations.len() {
            if i > 0 && !self.state_operations[i].same_cell(&self.state_operations[i - 1]) {
                internal_counter += 1;
            }
            let op = &mut self.state_operations[i];
            op.internal_counter = internal_counter;
            if op.is_original {
                self.timeline.push(TimelineEntry {
                    rw_counter: op.rw_counter,
                    kind: op.kind,
                    internal_counter,
                });
            }
        }

        self.timeline.sort_by_key(|entry| entry.rw_counter);
    }

    /// Number of rows of the tallest table.
    pub fn rows(&self) -> usize {
        self.states
            .len()
            .max(self.rw_operations.len())
            .max(self.state_operations.len())
    }

    /// Smallest power-of-two height fitting every table.
    pub fn padded_height(&self) -> usize {
        self.rows().next_power_of_two()
    }

    /// Flattens the state, RW and state-operation tables into
    /// [`WITNESS_COLUMNS`], padded to `height` rows.
    pub fn to_columns(&self, height: usize) -> Result<Vec<Vec<u64>>> {
        let rows = self.rows();
        if rows > height {
            return Err(ProgramError::TraceTooLarge { rows, height });
        }
        let mut columns = vec![Vec::with_capacity(height); WITNESS_COLUMNS.len()];

        let padding_row = ZkevmState {
            opcode: VirtualOpcode::Padding.number(),
            ..Default::default()
        };
        for i in 0..height {
            let state = self.states.get(i).unwrap_or(&padding_row);
            let row = [
                state.call_id as u64,
                state.pc as u64,
                state.opcode as u64,
                state.stack_size as u64,
                state.memory_size as u64,
                state.gas & 0xffff_ffff,
                state.rw_counter as u64,
            ];
            for (column, value) in columns[..7].iter_mut().zip(row) {
                column.push(value);
            }
        }

        let padding_op = RwOperation::new(RwOperationKind::Padding, 0, 0, 0, false, Word::ZERO);
        for i in 0..height {
            let op = self.rw_operations.get(i).unwrap_or(&padding_op);
            let head = [
                op.kind.number(),
                op.id as u64,
                op.address as u64,
                op.rw_counter as u64,
                op.is_write as u64,
                op.internal_counter as u64,
            ];
            let row = head.into_iter().chain(limbs(&op.value));
            for (column, value) in columns[7..21].iter_mut().zip(row) {
                column.push(value);
            }
        }

        for i in 0..height {
            let row = match self.state_operations.get(i) {
                Some(op) => {
                    let value = limbs(&op.value);
                    let previous = limbs(&op.previous_value);
                    [
                        op.kind.number(),
                        op.id as u64,
                        op.field as u64,
                        op.rw_counter as u64,
                        op.is_write as u64,
                        op.is_original as u64,
                        op.internal_counter as u64,
                        limbs(&op.address)[0],
                        limbs(&op.storage_key)[0],
                        value[0],
                        value[1],
                        previous[0],
                        previous[1],
                    ]
                }
                None => {
                    let mut row = [0; 13];
                    row[0] = RwOperationKind::Padding.number();
                    row
                }
            };
            for (column, value) in columns[21..].iter_mut().zip(row) {
                column.push(value);
            }
        }
        Ok(columns)
    }

    pub fn statistics(&self) -> TraceStatistics {
        let mut stats = TraceStatistics {
            rows: self.states.len(),
            ..Default::default()
        };
        for state in &self.states {
            *stats.opcodes.entry(state.opcode).or_default() += 1;
        }
        for op in &self.rw_operations {
            *stats.operations.entry(op.kind).or_default() += 1;
        }
        for op in &self.state_operations {
            *stats.operations.entry(op.kind).or_default() += 1;
        }
        stats.copy_events = self.copy_events.len();
        stats.copied_bytes = self.copy_events.iter().map(|c| c.length).sum();
        stats.keccaks = self.keccaks.len();
        stats.bytecodes = self.bytecodes.len();
        stats.bytecode_bytes = self.bytecodes.total_length();
        stats
    }
}

/// Sizes of the witness tables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceStatistics {
    pub rows: usize,
    /// Row count per opcode number.
    pub opcodes: BTreeMap<u16, usize>,
    pub operations: BTreeMap<RwOperationKind, usize>,
    pub copy_events: usize,
    pub copied_bytes: usize,
    pub keccaks: usize,
    pub bytecodes: usize,
    pub bytecode_bytes: usize,
}

fn opcode_name(number: u16) -> String {
    if let Some(op) = u8::try_from(number).ok().and_then(Opcode::from_byte) {
        return op.to_string();
    }
    VirtualOpcode::ALL
        .into_iter()
        .find(|op| op.number() == number)
        .map_or_else(|| format!("{number:#x}"), |op| format!("{op:?}"))
}

impl fmt::Display for TraceStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} state rows", self.rows)?;
        for (opcode, count) in &self.opcodes {
            writeln!(f, "  {}: {count}", opcode_name(*opcode))?;
        }
        for (kind, count) in &self.operations {
            writeln!(f, "{kind:?} operations: {count}")?;
        }
        writeln!(
            f,
            "{} copy events, {} bytes",
            self.copy_events, self.copied_bytes
        )?;
        writeln!(f, "{} keccak buffers", self.keccaks)?;
        write!(
            f,
            "{} bytecodes, {} bytes",
            self.bytecodes, self.bytecode_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limbs() {
        let word = Word::from(0x1_0000_0002u64);
        assert_eq!(limbs(&word), [2, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(limbs(&Word::MAX), [0xffff_ffff; 8]);
    }

    #[test]
    fn test_finalize_numbers_cells() {
        let mut trace = ExecutionTrace {
            rw_operations: vec![
                RwOperation::start(),
                RwOperation::new(RwOperationKind::Stack, 1, 0, 3, false, Word::ONE),
                RwOperation::new(RwOperationKind::Stack, 1, 0, 2, true, Word::ONE),
                RwOperation::new(RwOperationKind::Memory, 1, 4, 1, true, Word::ZERO),
            ],
            ..Default::default()
        };
        trace.finalize();
        let counters: Vec<_> = trace
            .rw_operations
            .iter()
            .map(|op| (op.rw_counter, op.internal_counter))
            .collect();
        assert_eq!(counters, vec![(0, 0), (2, 1), (3, 1), (1, 2)]);
        let timeline: Vec<_> = trace.timeline.iter().map(|e| e.rw_counter).collect();
        assert_eq!(timeline, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_columns_are_padded() -> anyhow::Result<()> {
        let trace = ExecutionTrace {
            states: vec![ZkevmState::default(); 3],
            ..Default::default()
        };
        assert_eq!(trace.padded_height(), 4);
        let columns = trace.to_columns(4)?;
        assert_eq!(columns.len(), WITNESS_COLUMNS.len());
        assert!(columns.iter().all(|c| c.len() == 4));
        assert_eq!(columns[2][3], VirtualOpcode::Padding.number() as u64);
        assert_eq!(columns[7][0], RwOperationKind::Padding.number());
        assert!(trace.to_columns(2).is_err());
        Ok(())
    }
}
