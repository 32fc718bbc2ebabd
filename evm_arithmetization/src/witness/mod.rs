//! zkEVM witness generation.
//!
//! [`WitnessGenerator`] observes the interpreter through [`ExecutionHooks`]
//! and records, for every executed opcode, a [`ZkevmState`] row plus the
//! [`RwOperation`]s, [`StateOperation`]s and [`CopyEvent`]s the circuit
//! checks it against.
//!
//! Every RW operation takes the next value of a global `rw_counter`. Blocks,
//! transactions and calls are identified by the counter value at which they
//! start, and reserve [`CALL_CONTEXT_READONLY_FIELD_AMOUNT`] counters for
//! their header fields, so the ids of nested frames always exceed the
//! counters of everything their ancestors did before them.

mod copy;
mod keccak;
mod operations;
mod state;
mod trace;

use std::collections::BTreeMap;

pub use copy::{CopyEvent, CopyOperandType};
use ethereum_types::{Address, H256};
pub use keccak::{BytecodeTable, KeccakBuffer, KeccakBuffers};
pub use operations::{
    CallContextField, RwOperation, RwOperationKind, StateCallContextField, StateOperation,
    TimelineEntry, CALL_CONTEXT_READONLY_FIELD_AMOUNT, TX_CONTEXT_FIELDS_AMOUNT,
};
pub use state::{StateField, ZkevmState};
pub use trace::{CallSummary, ExecutionTrace, TraceStatistics, WITNESS_COLUMNS};
use zk_evm_common::keccak256;

use crate::error::{ExecutionError, Result};
use crate::hooks::ExecutionHooks;
use crate::interpreter::{
    create2_address_preimage, create_address_preimage, memory_range, Evm, Frame, FrameKind,
};
use crate::loader::Block;
use crate::memory::{Memory, MAX_MEMORY_SIZE};
use crate::opcodes::{Opcode, VirtualOpcode};
use crate::stack::Stack;
use crate::word::{address_to_word, h256_to_word, word_to_address, word_to_usize_saturating, Word};
use crate::world::AccessKey;

/// A state cell an operation touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct StateKey {
    kind: RwOperationKind,
    address: Address,
    field: usize,
    storage_key: Word,
}

impl StateKey {
    fn new(kind: RwOperationKind, address: Address, storage_key: Word) -> Self {
        Self {
            kind,
            address,
            field: 0,
            storage_key,
        }
    }
}

/// Witness-side bookkeeping of a block, transaction or call.
#[derive(Clone, Debug, Default)]
struct CallRecord {
    call_id: usize,
    lastcall_id: usize,
    lastcall_returndata_offset: usize,
    lastcall_returndata_length: usize,
    /// Latest counter at which each cell was modified by this call or a
    /// finished descendant.
    modified: BTreeMap<StateKey, usize>,
    is_reverted: bool,
}

impl CallRecord {
    fn new(call_id: usize) -> Self {
        Self {
            call_id,
            ..Default::default()
        }
    }
}

/// The four values a state operation reports for its cell.
struct CellValues {
    initial: Word,
    call_initial: Word,
    previous: Word,
    value: Word,
}

/// `up`-th frame above the current one, `0` being the current frame.
fn ancestor(evm: &Evm, up: usize) -> Option<&Frame> {
    match up {
        0 => Some(&evm.frame),
        _ => evm
            .callers
            .len()
            .checked_sub(up)
            .map(|i| &evm.callers[i]),
    }
}

fn was_accessed(frame: Option<&Frame>, address: Address, key: Word) -> Word {
    Word::from(frame.is_some_and(|f| f.warm.contains(&AccessKey::Storage(address, key))))
}

fn transient_value(frame: Option<&Frame>, address: Address, key: Word) -> Word {
    frame
        .and_then(|f| f.transient.get(&(address, key)).copied())
        .unwrap_or_default()
}

/// Records the witness of a block sequence while the interpreter runs it.
#[derive(Debug)]
pub struct WitnessGenerator {
    rw_counter: usize,
    block_id: usize,
    tx_id: usize,
    /// Open block, transaction and call records, outermost first.
    calls: Vec<CallRecord>,
    /// Stack inputs of the opcode in flight, top first.
    pending: Vec<Word>,
    log_index: usize,
    trace: ExecutionTrace,
}

impl Default for WitnessGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl WitnessGenerator {
    pub fn new() -> Self {
        Self {
            rw_counter: 1,
            block_id: 0,
            tx_id: 0,
            calls: vec![],
            pending: vec![],
            log_index: 0,
            trace: ExecutionTrace {
                rw_operations: vec![RwOperation::start()],
                ..Default::default()
            },
        }
    }

    /// Executes `blocks` and returns their post-processed witness.
    pub fn generate(blocks: &[Block]) -> Result<ExecutionTrace> {
        let mut generator = Self::new();
        let results = Evm::run_blocks(blocks, &mut generator)?;
        log::debug!(
            "witness for {} transactions uses {} rw counters",
            results.len(),
            generator.rw_counter
        );
        Ok(generator.finish())
    }

    /// Next value of the global counter.
    pub fn rw_counter(&self) -> usize {
        self.rw_counter
    }

    /// Closes a block left open and sorts the tables.
    pub fn finish(mut self) -> ExecutionTrace {
        if self.calls.len() == 1 {
            self.close_block();
        }
        self.trace.finalize();
        self.trace
    }

    fn call_id(&self) -> usize {
        self.id_above(0)
    }

    /// Id of the record `up` levels above the innermost one, 0 past the
    /// outermost.
    fn id_above(&self, up: usize) -> usize {
        self.calls
            .len()
            .checked_sub(up + 1)
            .map_or(0, |i| self.calls[i].call_id)
    }

    fn depth(&self) -> usize {
        self.calls.len()
    }

    fn next_rw(&mut self) -> usize {
        let counter = self.rw_counter;
        self.rw_counter += 1;
        counter
    }

    fn rw(&mut self, kind: RwOperationKind, id: usize, address: usize, is_write: bool, value: Word) {
        let rw_counter = self.next_rw();
        self.trace
            .rw_operations
            .push(RwOperation::new(kind, id, address, rw_counter, is_write, value));
    }

    fn header(&mut self, call_id: usize, field: CallContextField, value: impl Into<Word>) {
        self.trace
            .rw_operations
            .push(RwOperation::call_context_header(call_id, field, value.into()));
    }

    fn frame_row(&self, evm: &Evm, call_id: usize, opcode: u16) -> ZkevmState {
        let frame = &evm.frame;
        ZkevmState::new(
            call_id,
            frame.code_hash,
            frame.pc,
            opcode,
            frame.stack.len(),
            frame.memory.len(),
            frame.gas,
            self.rw_counter,
        )
    }

    fn block_row(&self, opcode: VirtualOpcode) -> ZkevmState {
        ZkevmState::new(
            self.block_id,
            H256::zero(),
            0,
            opcode.number(),
            0,
            0,
            0,
            self.rw_counter,
        )
    }

    fn set_field(&mut self, field: StateField, value: impl Into<Word>) {
        if let Some(row) = self.trace.states.last_mut() {
            row.set(field, value);
        }
    }

    fn stack_reads(&mut self, stack: &Stack, count: usize) {
        let items = stack.as_slice();
        let id = self.call_id();
        for i in 0..count.min(items.len()) {
            let address = items.len() - 1 - i;
            self.rw(RwOperationKind::Stack, id, address, false, items[address]);
        }
    }

    fn stack_writes(&mut self, stack: &Stack, count: usize) {
        let items = stack.as_slice();
        let id = self.call_id();
        for address in items.len().saturating_sub(count)..items.len() {
            self.rw(RwOperationKind::Stack, id, address, true, items[address]);
        }
    }

    fn memory_reads(&mut self, memory: &Memory, offset: usize, len: usize) -> Vec<u8> {
        let id = self.call_id();
        (0..len)
            .map(|i| {
                let byte = memory.byte(offset + i);
                self.rw(RwOperationKind::Memory, id, offset + i, false, Word::from(byte));
                byte
            })
            .collect()
    }

    fn memory_writes(&mut self, memory: &Memory, offset: usize, len: usize, copy: Option<&mut CopyEvent>) {
        let id = self.call_id();
        let mut bytes = Vec::with_capacity(len);
        for i in 0..len {
            let byte = memory.byte(offset + i);
            self.rw(RwOperationKind::Memory, id, offset + i, true, Word::from(byte));
            bytes.push(byte);
        }
        if let Some(copy) = copy {
            bytes.into_iter().for_each(|b| copy.push_byte(b));
        }
    }

    fn push_copy(&mut self, copy: CopyEvent) {
        if copy.length > 0 {
            self.trace.copy_events.push(copy);
        }
    }

    fn record_bytecode(&mut self, code: &[u8], hash: H256) {
        if !code.is_empty() && self.trace.bytecodes.add(code, hash) {
            self.trace.keccaks.new_buffer(code.to_vec());
        }
    }

    fn push_state_op(
        &mut self,
        kind: RwOperationKind,
        address: Word,
        storage_key: Word,
        rw_counter: usize,
        is_write: bool,
        values: CellValues,
    ) {
        self.trace.state_operations.push(StateOperation {
            is_original: true,
            kind,
            id: self.call_id(),
            address,
            field: 0,
            storage_key,
            rw_counter,
            is_write,
            initial_value: values.initial,
            call_initial_value: values.call_initial,
            previous_value: values.previous,
            value: values.value,
            parent_id: self.id_above(1),
            grandparent_id: self.id_above(2),
            call_id: self.call_id(),
            internal_counter: 0,
        });
    }

    /// Counter for a modification of `key` by the current call.
    fn touch(&mut self, key: StateKey) -> usize {
        let rw_counter = self.next_rw();
        if let Some(record) = self.calls.last_mut() {
            record.modified.insert(key, rw_counter);
        }
        rw_counter
    }

    /// Seven header fields written once per transaction or call.
    fn append_readonly_fields(&mut self, evm: &Evm) {
        let frame = &evm.frame;
        let call_id = self.call_id();
        self.header(call_id, CallContextField::ParentId, self.id_above(1));
        self.header(call_id, CallContextField::BlockId, self.block_id);
        self.header(call_id, CallContextField::TxId, self.tx_id);
        self.header(call_id, CallContextField::CallContextValue, frame.value);
        self.header(
            call_id,
            CallContextField::CallContextAddress,
            address_to_word(&frame.address),
        );
        self.header(call_id, CallContextField::CalldataSize, frame.calldata.len());
        self.header(call_id, CallContextField::Depth, self.depth());
    }

    fn append_parent_link(&mut self) {
        let call_id = self.call_id();
        let parent = Word::from(self.id_above(1));
        self.push_state_op(
            RwOperationKind::StateCallContext,
            Word::from(StateCallContextField::ParentId as usize),
            Word::ZERO,
            call_id + StateCallContextField::ParentId as usize,
            false,
            CellValues {
                initial: parent,
                call_initial: parent,
                previous: parent,
                value: parent,
            },
        );
    }

    fn append_calldata(&mut self, calldata: &[u8]) {
        let id = self.call_id();
        for (i, byte) in calldata.iter().enumerate() {
            self.rw(RwOperationKind::Calldata, id, i, true, Word::from(*byte));
        }
    }

    fn open_block(&mut self) {
        self.block_id = self.rw_counter;
        self.tx_id = self.rw_counter;
        self.calls = vec![CallRecord::new(self.block_id)];
        log::trace!("start block {}", self.block_id);

        let row = self.block_row(VirtualOpcode::StartBlock);
        self.trace.states.push(row);
        let block_id = self.block_id;
        self.header(block_id, CallContextField::ParentId, 0u64);
        self.header(block_id, CallContextField::BlockId, block_id);
        for field in [
            CallContextField::TxId,
            CallContextField::CallContextValue,
            CallContextField::CallContextAddress,
            CallContextField::CalldataSize,
            CallContextField::Depth,
            CallContextField::ReturndataSize,
            CallContextField::CallStatus,
        ] {
            self.header(block_id, field, 0u64);
        }
        self.append_parent_link();
        self.rw_counter += CALL_CONTEXT_READONLY_FIELD_AMOUNT;
    }

    fn close_block(&mut self) {
        let row = self.block_row(VirtualOpcode::EndBlock);
        self.trace.states.push(row);
        let Some(record) = self.calls.pop() else {
            return;
        };
        self.append_call_summary(&record, 0, 0);
        self.calls.clear();
    }

    /// Publishes the bookkeeping of a finished record to the state table.
    fn append_call_summary(&mut self, record: &CallRecord, parent_id: usize, grandparent_id: usize) {
        let end_call_rw_id = record.modified.values().copied().max().unwrap_or(0);
        let summary = CallSummary {
            modified_items: record.modified.len(),
            is_reverted: record.is_reverted,
            end_call_rw_id,
        };
        for (field, value) in [
            (StateCallContextField::ModifiedItems, summary.modified_items),
            (StateCallContextField::IsReverted, usize::from(summary.is_reverted)),
            (StateCallContextField::EndCallRwId, end_call_rw_id),
        ] {
            let value = Word::from(value);
            self.trace.state_operations.push(StateOperation {
                is_original: true,
                kind: RwOperationKind::StateCallContext,
                id: record.call_id,
                address: Word::from(field as usize),
                field: 0,
                storage_key: Word::ZERO,
                rw_counter: record.call_id + field as usize,
                is_write: false,
                initial_value: value,
                call_initial_value: value,
                previous_value: value,
                value,
                parent_id,
                grandparent_id,
                call_id: record.call_id,
                internal_counter: 0,
            });
        }
        self.trace.call_summaries.insert(record.call_id, summary);
    }

    /// Ends the innermost record: publishes its summary and hands the cells
    /// it modified to its parent, which sees them at the same counters.
    fn close_call(&mut self, evm: &Evm) {
        let depth = self.depth();
        let parent_id = self.id_above(1);
        let grandparent_id = self.id_above(2);
        let grandgrandparent_id = self.id_above(3);
        let Some(record) = self.calls.pop() else {
            return;
        };
        self.append_call_summary(&record, parent_id, grandparent_id);

        let current = ancestor(evm, 0);
        let parent = ancestor(evm, 1);
        let grandparent = ancestor(evm, 2);
        for (key, &rw_counter) in &record.modified {
            if depth <= 2 && key.kind != RwOperationKind::State {
                continue;
            }
            let (address, storage_key) = (key.address, key.storage_key);
            let values = match key.kind {
                RwOperationKind::AccessList => {
                    let previous = was_accessed(parent, address, storage_key);
                    CellValues {
                        initial: Word::ZERO,
                        call_initial: was_accessed(grandparent, address, storage_key),
                        previous,
                        value: if record.is_reverted {
                            previous
                        } else {
                            was_accessed(current, address, storage_key)
                        },
                    }
                }
                RwOperationKind::TransientStorage => {
                    let previous = transient_value(parent, address, storage_key);
                    CellValues {
                        initial: Word::ZERO,
                        call_initial: transient_value(grandparent, address, storage_key),
                        previous,
                        value: if record.is_reverted {
                            previous
                        } else {
                            transient_value(current, address, storage_key)
                        },
                    }
                }
                _ => {
                    let (call_initial, previous) = match parent {
                        Some(parent) => (
                            parent.snapshot.storage(&address, &storage_key),
                            evm.frame.snapshot.storage(&address, &storage_key),
                        ),
                        None => (
                            evm.block_initial.storage(&address, &storage_key),
                            evm.tx_initial.storage(&address, &storage_key),
                        ),
                    };
                    CellValues {
                        initial: evm.block_initial.storage(&address, &storage_key),
                        call_initial,
                        previous,
                        value: evm.world.storage(&address, &storage_key),
                    }
                }
            };
            self.trace.state_operations.push(StateOperation {
                is_original: false,
                kind: key.kind,
                id: parent_id,
                address: address_to_word(&address),
                field: key.field,
                storage_key,
                rw_counter,
                is_write: true,
                initial_value: values.initial,
                call_initial_value: values.call_initial,
                previous_value: values.previous,
                value: values.value,
                parent_id: grandparent_id,
                grandparent_id: grandgrandparent_id,
                call_id: record.call_id,
                internal_counter: 0,
            });
            if let Some(parent) = self.calls.last_mut() {
                parent.modified.insert(*key, rw_counter);
            }
        }
    }

    /// Rewrites every cell the current call modified back to its value at
    /// call entry. Must run before the interpreter restores the snapshot.
    fn append_state_reverts(&mut self, evm: &Evm) {
        let Some(record) = self.calls.last_mut() else {
            return;
        };
        record.is_reverted = true;
        let keys: Vec<StateKey> = record.modified.keys().copied().collect();

        let current = ancestor(evm, 0);
        let parent = ancestor(evm, 1);
        for key in keys {
            let (address, storage_key) = (key.address, key.storage_key);
            let values = match key.kind {
                RwOperationKind::AccessList => {
                    let call_initial = was_accessed(parent, address, storage_key);
                    CellValues {
                        initial: Word::ZERO,
                        call_initial,
                        previous: was_accessed(current, address, storage_key),
                        value: call_initial,
                    }
                }
                RwOperationKind::TransientStorage => {
                    let call_initial = transient_value(parent, address, storage_key);
                    CellValues {
                        initial: Word::ZERO,
                        call_initial,
                        previous: transient_value(current, address, storage_key),
                        value: call_initial,
                    }
                }
                _ => {
                    let call_initial = evm.frame.snapshot.storage(&address, &storage_key);
                    CellValues {
                        initial: evm.block_initial.storage(&address, &storage_key),
                        call_initial,
                        previous: evm.world.storage(&address, &storage_key),
                        value: call_initial,
                    }
                }
            };
            let rw_counter = self.touch(key);
            self.push_state_op(
                key.kind,
                address_to_word(&address),
                storage_key,
                rw_counter,
                true,
                values,
            );
        }
    }

    /// `SLOAD` and `SSTORE`: warm the slot, then read or write it.
    fn storage_access(&mut self, evm: &Evm, op: Opcode) {
        let frame = &evm.frame;
        let address = frame.address;
        let key = self.pending[0];
        let current_value = evm.world.storage(&address, &key);
        let warm = was_accessed(Some(frame), address, key);
        self.set_field(StateField::CallContextAddress, address_to_word(&address));
        self.set_field(StateField::StorageKey, key);
        self.set_field(StateField::StorageValue, current_value);
        self.set_field(
            StateField::InitialStorageValue,
            evm.tx_initial.storage(&address, &key),
        );
        self.set_field(StateField::WasAccessed, warm);

        let rw_counter = self.touch(StateKey::new(RwOperationKind::AccessList, address, key));
        self.push_state_op(
            RwOperationKind::AccessList,
            address_to_word(&address),
            key,
            rw_counter,
            true,
            CellValues {
                initial: Word::ZERO,
                call_initial: was_accessed(ancestor(evm, 1), address, key),
                previous: warm,
                value: Word::ONE,
            },
        );

        let is_write = op == Opcode::Sstore;
        let rw_counter = self.touch(StateKey::new(RwOperationKind::State, address, key));
        self.push_state_op(
            RwOperationKind::State,
            address_to_word(&address),
            key,
            rw_counter,
            is_write,
            CellValues {
                initial: evm.block_initial.storage(&address, &key),
                call_initial: frame.snapshot.storage(&address, &key),
                previous: current_value,
                value: if is_write { self.pending[1] } else { current_value },
            },
        );
    }

    /// `TLOAD` and `TSTORE`.
    fn transient_access(&mut self, evm: &Evm, op: Opcode) {
        let frame = &evm.frame;
        let address = frame.address;
        let key = self.pending[0];
        let current_value = transient_value(Some(frame), address, key);
        self.set_field(StateField::CallContextAddress, address_to_word(&address));
        self.set_field(StateField::StorageKey, key);
        self.set_field(StateField::StorageValue, current_value);

        let is_write = op == Opcode::Tstore;
        let rw_counter = self.touch(StateKey::new(
            RwOperationKind::TransientStorage,
            address,
            key,
        ));
        self.push_state_op(
            RwOperationKind::TransientStorage,
            address_to_word(&address),
            key,
            rw_counter,
            is_write,
            CellValues {
                initial: Word::ZERO,
                call_initial: transient_value(ancestor(evm, 1), address, key),
                previous: current_value,
                value: if is_write { self.pending[1] } else { current_value },
            },
        );
    }

    /// Init code read and address preimages hashed by `CREATE`/`CREATE2`.
    fn create_inputs(&mut self, evm: &Evm, op: Opcode) {
        let frame = &evm.frame;
        let (offset, len) = memory_range(&self.pending[1], &self.pending[2]);
        let rw_counter = self.rw_counter;
        let init_code = self.memory_reads(&frame.memory, offset, len);
        let code_hash = self.trace.keccaks.new_buffer(init_code.clone());
        let mut copy = CopyEvent::init_code(
            self.call_id(),
            offset,
            h256_to_word(&code_hash),
            rw_counter,
            len,
        );
        init_code.iter().for_each(|b| copy.push_byte(*b));
        self.push_copy(copy);

        let sender = frame.address;
        let preimage = match op {
            Opcode::Create2 => create2_address_preimage(&sender, &self.pending[3], &init_code),
            _ => create_address_preimage(&sender, evm.world.nonce(&sender)),
        };
        self.trace.keccaks.new_buffer(preimage);
    }

    fn lastcall(&self) -> (usize, usize, usize) {
        self.calls.last().map_or((0, 0, 0), |r| {
            (
                r.lastcall_id,
                r.lastcall_returndata_offset,
                r.lastcall_returndata_length,
            )
        })
    }

    /// Copy of `copy.length` bytes into memory at `dst`. Sources outside the
    /// RW tables (bytecode) are `None` and produce no reads.
    fn copy_to_memory(
        &mut self,
        memory: &Memory,
        source: Option<(RwOperationKind, usize, &[u8])>,
        offset: usize,
        dst: usize,
        mut copy: CopyEvent,
    ) {
        let len = copy.length;
        if let Some((kind, id, data)) = source {
            for i in 0..len {
                let index = offset.saturating_add(i);
                let byte = data.get(index).copied().unwrap_or(0);
                self.rw(kind, id, index, false, Word::from(byte));
            }
        }
        self.memory_writes(memory, dst, len, Some(&mut copy));
        self.push_copy(copy);
    }

    /// Memory read by `RETURN`/`REVERT` and its copy into the call's
    /// returndata.
    fn append_output(&mut self, evm: &Evm, success: bool) {
        let frame = &evm.frame;
        let (offset, len) = memory_range(&self.pending[0], &self.pending[1]);
        let call_id = self.call_id();
        let mut copy = CopyEvent::return_data(call_id, offset, self.rw_counter, len);
        self.memory_reads(&frame.memory, offset, len);
        for (i, byte) in frame.output.iter().enumerate() {
            self.rw(RwOperationKind::Returndata, call_id, i, true, Word::from(*byte));
            copy.push_byte(*byte);
        }
        self.header(call_id, CallContextField::CallStatus, success);
        self.push_copy(copy);
    }

    fn fault(&mut self, evm: &Evm, opcode: u16, depth: usize) {
        let mut row = self.frame_row(evm, self.call_id(), opcode);
        row.load_stack(&evm.frame.stack, depth);
        self.trace.states.push(row);
        self.pending.clear();
        self.append_state_reverts(evm);
        self.header(self.call_id(), CallContextField::CallStatus, false);
    }
}

impl ExecutionHooks for WitnessGenerator {
    fn start_block(&mut self, _evm: &Evm) {
        self.open_block();
    }

    fn start_transaction(&mut self, evm: &Evm) {
        if self.calls.is_empty() {
            self.open_block();
        }
        self.tx_id = self.rw_counter;
        self.calls.push(CallRecord::new(self.tx_id));
        self.log_index = 0;
        log::trace!("start transaction {}", self.tx_id);

        let row = self.frame_row(evm, self.tx_id, VirtualOpcode::StartTransaction.number());
        self.trace.states.push(row);
        let frame = &evm.frame;
        if frame.kind != FrameKind::Precompile {
            self.record_bytecode(&frame.code, frame.code_hash);
        }
        self.append_readonly_fields(evm);
        self.append_parent_link();
        self.rw_counter += CALL_CONTEXT_READONLY_FIELD_AMOUNT + TX_CONTEXT_FIELDS_AMOUNT;
        self.append_calldata(&frame.calldata);
    }

    fn start_call(&mut self, evm: &Evm) {
        let frame = &evm.frame;
        if let Some(parent) = self.calls.last_mut() {
            parent.lastcall_returndata_offset = frame.return_offset;
            parent.lastcall_returndata_length = frame.return_length;
        }
        self.pending.clear();
        let call_id = self.rw_counter;
        self.calls.push(CallRecord::new(call_id));
        log::trace!("start call {call_id} at depth {}", self.depth());

        let row = self.frame_row(evm, call_id, VirtualOpcode::StartCall.number());
        self.trace.states.push(row);
        self.append_readonly_fields(evm);
        self.rw_counter += CALL_CONTEXT_READONLY_FIELD_AMOUNT;
        if frame.kind != FrameKind::Precompile {
            self.record_bytecode(&frame.code, frame.code_hash);
        }
        self.append_parent_link();
        self.append_calldata(&frame.calldata);
    }

    fn before_opcode(&mut self, evm: &Evm, op: Opcode) {
        let frame = &evm.frame;
        let stack = &frame.stack;
        let depth = match op {
            Opcode::Dup(n) => n as usize,
            Opcode::Swap(n) => n as usize + 1,
            _ => op.stack_inputs(),
        };
        let mut row = self.frame_row(evm, self.call_id(), op.number());
        row.load_stack(stack, depth);
        self.trace.states.push(row);

        let items = stack.as_slice();
        let id = self.call_id();
        match op {
            Opcode::Dup(n) => {
                let address = items.len() - n as usize;
                self.rw(RwOperationKind::Stack, id, address, false, items[address]);
            }
            Opcode::Swap(n) => {
                let top = items.len() - 1;
                let other = top - n as usize;
                self.rw(RwOperationKind::Stack, id, top, false, items[top]);
                self.rw(RwOperationKind::Stack, id, other, false, items[other]);
            }
            _ => self.stack_reads(stack, op.stack_inputs()),
        }
        self.pending = items.iter().rev().take(op.stack_inputs()).copied().collect();

        match op {
            Opcode::Exp => {
                let pair = (self.pending[0], self.pending[1]);
                self.trace.exponentiations.push(pair);
            }
            Opcode::Sload | Opcode::Sstore => self.storage_access(evm, op),
            Opcode::Tload | Opcode::Tstore => self.transient_access(evm, op),
            Opcode::Returndatasize | Opcode::Returndatacopy => {
                let (lastcall_id, _, _) = self.lastcall();
                self.set_field(StateField::LastsubcallId, lastcall_id);
                self.set_field(StateField::ReturndataSize, frame.returndata.len());
                let counter = self.next_rw();
                self.trace.rw_operations.push(RwOperation::new(
                    RwOperationKind::CallContext,
                    id,
                    CallContextField::LastcallId as usize,
                    counter,
                    false,
                    Word::from(lastcall_id),
                ));
            }
            Opcode::Callvalue => self.set_field(StateField::CallContextValue, frame.value),
            Opcode::Calldatasize => self.set_field(StateField::CalldataSize, frame.calldata.len()),
            Opcode::Revert => {
                let modified = self.calls.last().map_or(0, |r| r.modified.len());
                self.set_field(StateField::ModifiedItemsAmount, modified);
                self.append_state_reverts(evm);
            }
            Opcode::Create | Opcode::Create2 => self.create_inputs(evm, op),
            _ => {}
        }
    }

    fn after_opcode(&mut self, evm: &Evm, op: Opcode) {
        let frame = &evm.frame;
        let stack = &frame.stack;
        let memory = &frame.memory;
        let call_id = self.call_id();
        match op {
            Opcode::Push(_) => {
                if let Ok(value) = stack.peek(0) {
                    self.set_field(StateField::AdditionalInput, value);
                }
                self.stack_writes(stack, 1);
            }
            Opcode::Dup(_) => self.stack_writes(stack, 1),
            Opcode::Swap(n) => {
                let items = stack.as_slice();
                let top = items.len() - 1;
                let other = top - n as usize;
                self.rw(RwOperationKind::Stack, call_id, other, true, items[other]);
                self.rw(RwOperationKind::Stack, call_id, top, true, items[top]);
            }
            Opcode::Mload => {
                if let Ok(offset) = usize::try_from(&self.pending[0]) {
                    if offset <= MAX_MEMORY_SIZE - 32 {
                        self.memory_reads(memory, offset, 32);
                    }
                }
                self.stack_writes(stack, 1);
            }
            Opcode::Mstore | Opcode::Mstore8 => {
                let len = if op == Opcode::Mstore { 32 } else { 1 };
                let offset = word_to_usize_saturating(&self.pending[0]);
                self.memory_writes(memory, offset, len, None);
            }
            Opcode::Calldataload => {
                if let Ok(offset) = usize::try_from(&self.pending[0]) {
                    if offset <= MAX_MEMORY_SIZE - 32 {
                        for i in 0..32 {
                            let byte = frame.calldata.get(offset + i).copied().unwrap_or(0);
                            self.rw(RwOperationKind::Calldata, call_id, offset + i, false, Word::from(byte));
                        }
                    }
                }
                self.stack_writes(stack, 1);
            }
            Opcode::Calldatacopy => {
                let (dst, len) = memory_range(&self.pending[0], &self.pending[2]);
                let src = word_to_usize_saturating(&self.pending[1]);
                let copy = CopyEvent::calldatacopy(call_id, src, dst, self.rw_counter, len);
                let source = Some((RwOperationKind::Calldata, call_id, frame.calldata.as_slice()));
                self.copy_to_memory(memory, source, src, dst, copy);
            }
            Opcode::Codecopy => {
                let (dst, len) = memory_range(&self.pending[0], &self.pending[2]);
                let src = word_to_usize_saturating(&self.pending[1]);
                let copy = CopyEvent::codecopy(
                    h256_to_word(&frame.code_hash),
                    src,
                    call_id,
                    dst,
                    self.rw_counter,
                    len,
                );
                self.copy_to_memory(memory, None, src, dst, copy);
            }
            Opcode::Extcodecopy => {
                let address = word_to_address(&self.pending[0]);
                let (dst, len) = memory_range(&self.pending[1], &self.pending[3]);
                let src = word_to_usize_saturating(&self.pending[2]);
                let code_hash = evm.world.code_hash(&address);
                self.record_bytecode(evm.world.code(&address), code_hash);
                let copy = CopyEvent::codecopy(
                    h256_to_word(&code_hash),
                    src,
                    call_id,
                    dst,
                    self.rw_counter,
                    len,
                );
                self.copy_to_memory(memory, None, src, dst, copy);
            }
            Opcode::Returndatacopy => {
                let (lastcall_id, _, _) = self.lastcall();
                let (dst, len) = memory_range(&self.pending[0], &self.pending[2]);
                let src = word_to_usize_saturating(&self.pending[1]);
                let copy = CopyEvent::returndatacopy(lastcall_id, src, call_id, dst, self.rw_counter, len);
                let source = Some((RwOperationKind::Returndata, lastcall_id, frame.returndata.as_slice()));
                self.copy_to_memory(memory, source, src, dst, copy);
            }
            Opcode::Mcopy => {
                let (dst, len) = memory_range(&self.pending[0], &self.pending[2]);
                let (src, _) = memory_range(&self.pending[1], &self.pending[2]);
                let mut copy = CopyEvent::mcopy(call_id, src, dst, self.rw_counter, len);
                // The source may overlap the destination: what was read is
                // what now sits at the destination.
                for i in 0..len {
                    let byte = memory.byte(dst + i);
                    self.rw(RwOperationKind::Memory, call_id, src + i, false, Word::from(byte));
                }
                self.memory_writes(memory, dst, len, Some(&mut copy));
                self.push_copy(copy);
            }
            Opcode::Keccak256 => {
                let (offset, len) = memory_range(&self.pending[0], &self.pending[1]);
                let digest = stack.peek(0).unwrap_or_default();
                self.set_field(StateField::KeccakResult, digest);
                let mut copy = CopyEvent::keccak(call_id, offset, self.rw_counter, digest, len);
                let input = self.memory_reads(memory, offset, len);
                input.iter().for_each(|b| copy.push_byte(*b));
                self.push_copy(copy);
                self.trace.keccaks.new_buffer(input);
                self.stack_writes(stack, 1);
            }
            Opcode::Log(n) => {
                let (offset, len) = memory_range(&self.pending[0], &self.pending[1]);
                let tx_id = self.tx_id;
                let mut copy = CopyEvent::log(call_id, offset, tx_id, self.rw_counter, len);
                let data = self.memory_reads(memory, offset, len);
                data.iter().for_each(|b| copy.push_byte(*b));
                self.push_copy(copy);

                // Log cells are addressed by log index, then field: the
                // emitter first, then the topics.
                let base = self.log_index << 3;
                self.rw(RwOperationKind::Log, tx_id, base, true, address_to_word(&frame.address));
                let topics: Vec<Word> = self.pending[2..2 + n as usize].to_vec();
                for (i, topic) in topics.into_iter().enumerate() {
                    self.rw(RwOperationKind::Log, tx_id, base + 1 + i, true, topic);
                }
                self.log_index += 1;
            }
            Opcode::Return => {
                self.set_field(StateField::Depth, self.depth());
                if frame.kind.is_create() {
                    let hash = H256(keccak256(&frame.output));
                    self.record_bytecode(&frame.output, hash);
                }
                self.append_output(evm, true);
            }
            Opcode::Revert => self.append_output(evm, false),
            Opcode::Stop => {
                self.set_field(StateField::Depth, self.depth());
                self.set_field(StateField::BytecodeSize, frame.code.len());
                self.header(call_id, CallContextField::CallStatus, true);
            }
            Opcode::Selfdestruct => self.header(call_id, CallContextField::CallStatus, true),
            _ => self.stack_writes(stack, op.stack_outputs()),
        }
        self.pending.clear();
    }

    fn gas_error(&mut self, evm: &Evm, op: Opcode) {
        log::trace!("gas error in call {} executing {op}", self.call_id());
        self.fault(evm, op.number(), op.stack_inputs());
    }

    fn execution_error(&mut self, evm: &Evm, op: Opcode, error: ExecutionError) {
        log::trace!("{error} in call {} executing {op}", self.call_id());
        let opcode = match (error.error_opcode(), error) {
            (Some(virtual_op), _) => virtual_op.number(),
            (None, ExecutionError::InvalidOpcode(byte)) => byte as u16,
            (None, _) => op.number(),
        };
        self.fault(evm, opcode, 0);
    }

    fn leave_call(&mut self, evm: &Evm) {
        let frame = &evm.frame;
        let call_id = self.call_id();
        let success = frame.outcome.is_some_and(|o| o.is_success());
        if frame.kind == FrameKind::Precompile {
            for (i, byte) in frame.output.iter().enumerate() {
                self.rw(RwOperationKind::Returndata, call_id, i, true, Word::from(*byte));
            }
            self.header(call_id, CallContextField::CallStatus, success);
            if !success {
                if let Some(record) = self.calls.last_mut() {
                    record.is_reverted = true;
                }
            }
        }

        let is_top = evm.callers.is_empty();
        if !is_top {
            let row = self.frame_row(evm, call_id, VirtualOpcode::EndCall.number());
            self.trace.states.push(row);
        }
        self.close_call(evm);
        if !is_top {
            let returndata_size = if frame.kind.is_create() && success {
                0
            } else {
                frame.output.len()
            };
            self.header(call_id, CallContextField::ReturndataSize, returndata_size);
            if let Some(parent) = self.calls.last_mut() {
                parent.lastcall_id = call_id;
            }
        }
    }

    fn end_call(&mut self, evm: &Evm) {
        let frame = &evm.frame;
        let call_id = self.call_id();
        let (lastcall_id, offset, length) = self.lastcall();
        self.set_field(StateField::LastsubcallId, lastcall_id);
        self.set_field(StateField::LastcallReturndataOffset, offset);
        self.set_field(StateField::LastcallReturndataLength, length);

        let counter = self.next_rw();
        self.trace.rw_operations.push(RwOperation::new(
            RwOperationKind::CallContext,
            call_id,
            CallContextField::LastcallId as usize,
            counter,
            true,
            Word::from(lastcall_id),
        ));
        let len = length.min(frame.returndata.len());
        let copy = CopyEvent::end_call(call_id, offset, lastcall_id, self.rw_counter, len);
        let source = Some((RwOperationKind::Returndata, lastcall_id, frame.returndata.as_slice()));
        self.copy_to_memory(&frame.memory, source, 0, offset, copy);
        self.stack_writes(&frame.stack, 1);
    }

    fn end_transaction(&mut self, evm: &Evm) {
        let frame = &evm.frame;
        self.header(self.tx_id, CallContextField::ReturndataSize, frame.output.len());
        let row = self.frame_row(evm, self.tx_id, VirtualOpcode::EndTransaction.number());
        self.trace.states.push(row);
        log::trace!("end transaction {}", self.tx_id);
    }

    fn end_block(&mut self, _evm: &Evm) {
        self.close_block();
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::testing_utils::{contract_call_block, init_logger};

    fn rows_of(trace: &ExecutionTrace, opcode: u16) -> usize {
        trace.states.iter().filter(|s| s.opcode == opcode).count()
    }

    #[test]
    fn test_add_records_stack_operations() -> anyhow::Result<()> {
        init_logger();
        let mut generator = WitnessGenerator::new();
        let mut evm = Evm::default();
        let result = evm.execute_code_with(&hex!("6002600301"), 100, &mut generator);
        assert!(result.success);
        let trace = generator.finish();

        let stack_ops: Vec<_> = trace
            .rw_operations
            .iter()
            .filter(|op| op.kind == RwOperationKind::Stack)
            .collect();
        // Two pushes, two reads by ADD, one write by ADD.
        assert_eq!(stack_ops.len(), 5);
        assert_eq!(stack_ops.iter().filter(|op| op.is_write).count(), 3);
        assert_eq!(rows_of(&trace, Opcode::Add.number()), 1);
        assert_eq!(rows_of(&trace, Opcode::Stop.number()), 1);
        Ok(())
    }

    #[test]
    fn test_counters_are_unique_and_rows_monotonic() -> anyhow::Result<()> {
        let trace = WitnessGenerator::generate(&[contract_call_block()])?;
        let mut counters: Vec<_> = trace
            .rw_operations
            .iter()
            .filter(|op| op.kind != RwOperationKind::CallContext || op.address >= 9)
            .map(|op| op.rw_counter)
            .collect();
        counters.sort_unstable();
        let len = counters.len();
        counters.dedup();
        assert_eq!(counters.len(), len);

        for pair in trace.states.windows(2) {
            assert!(pair[0].rw_counter <= pair[1].rw_counter);
        }
        Ok(())
    }

    #[test]
    fn test_block_boundaries() -> anyhow::Result<()> {
        let trace = WitnessGenerator::generate(&[contract_call_block()])?;
        let first = trace.states.first().map(|s| s.opcode);
        let last = trace.states.last().map(|s| s.opcode);
        assert_eq!(first, Some(VirtualOpcode::StartBlock.number()));
        assert_eq!(last, Some(VirtualOpcode::EndBlock.number()));
        assert_eq!(rows_of(&trace, VirtualOpcode::StartTransaction.number()), 1);
        assert_eq!(rows_of(&trace, VirtualOpcode::EndTransaction.number()), 1);
        Ok(())
    }
}
