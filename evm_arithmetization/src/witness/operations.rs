use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::word::Word;

/// Table an RW operation belongs to. The declaration order is the primary
/// sort key of the RW and state tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RwOperationKind {
    Start,
    Stack,
    Memory,
    Calldata,
    Returndata,
    CallContext,
    Log,
    AccessList,
    State,
    TransientStorage,
    StateCallContext,
    Padding,
}

impl RwOperationKind {
    /// Kinds carried by [`StateOperation`]s rather than [`RwOperation`]s.
    pub const fn is_state(&self) -> bool {
        matches!(
            self,
            Self::AccessList | Self::State | Self::TransientStorage | Self::StateCallContext
        )
    }

    pub const fn number(&self) -> u64 {
        *self as u64
    }
}

/// Fields of a call context. The first [`CALL_CONTEXT_READONLY_FIELD_AMOUNT`]
/// are written once per call at `rw_counter = call_id + field`; the rest are
/// read and written at ordinary counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CallContextField {
    ParentId = 0,
    BlockId,
    TxId,
    CallContextValue,
    CallContextAddress,
    CalldataSize,
    Depth,
    ReturndataSize,
    CallStatus,
    LastcallId,
    LastcallReturndataOffset,
    LastcallReturndataLength,
}

/// Counters reserved at the start of every block, transaction and call for
/// the header fields.
pub const CALL_CONTEXT_READONLY_FIELD_AMOUNT: usize = CallContextField::LastcallId as usize;

/// Extra counters reserved at transaction start.
pub const TX_CONTEXT_FIELDS_AMOUNT: usize = 0;

/// Per-call bookkeeping published through the state table, at
/// `rw_counter = call_id + field`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum StateCallContextField {
    ParentId = 0,
    ModifiedItems,
    IsReverted,
    EndCallRwId,
}

/// A read or write of the stack, memory, calldata, returndata, call context
/// or log tables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RwOperation {
    pub kind: RwOperationKind,
    /// Call the accessed region belongs to.
    pub id: usize,
    pub address: usize,
    pub rw_counter: usize,
    pub is_write: bool,
    pub value: Word,
    /// Index of the `(kind, id, address)` group once the table is sorted.
    pub internal_counter: usize,
}

impl RwOperation {
    pub fn new(
        kind: RwOperationKind,
        id: usize,
        address: usize,
        rw_counter: usize,
        is_write: bool,
        value: Word,
    ) -> Self {
        Self {
            kind,
            id,
            address,
            rw_counter,
            is_write,
            value,
            internal_counter: 0,
        }
    }

    pub fn start() -> Self {
        Self::new(RwOperationKind::Start, 0, 0, 0, false, Word::ZERO)
    }

    /// Header field of a call context, located at `call_id + field`.
    pub fn call_context_header(call_id: usize, field: CallContextField, value: Word) -> Self {
        Self::new(
            RwOperationKind::CallContext,
            call_id,
            field as usize,
            call_id + field as usize,
            false,
            value,
        )
    }

    pub(crate) fn same_cell(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id && self.address == other.address
    }

    fn sort_key(&self) -> (RwOperationKind, usize, usize, usize) {
        (self.kind, self.id, self.address, self.rw_counter)
    }
}

impl PartialOrd for RwOperation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RwOperation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.is_write.cmp(&other.is_write))
            .then_with(|| self.value.cmp(&other.value))
    }
}

/// An access to committed state: storage slots, transient storage, the warm
/// slot set, or call bookkeeping. Besides the value it carries what the
/// cell held at block entry, at frame entry and just before the access, so
/// reverts can be checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateOperation {
    /// Produced by an opcode rather than propagated to a parent frame at
    /// call exit. Only original operations appear in the timeline.
    pub is_original: bool,
    pub kind: RwOperationKind,
    pub id: usize,
    /// Account address, or the [`StateCallContextField`] for bookkeeping
    /// operations.
    pub address: Word,
    pub field: usize,
    pub storage_key: Word,
    pub rw_counter: usize,
    pub is_write: bool,
    pub initial_value: Word,
    pub call_initial_value: Word,
    pub previous_value: Word,
    pub value: Word,
    pub parent_id: usize,
    pub grandparent_id: usize,
    pub call_id: usize,
    pub internal_counter: usize,
}

impl StateOperation {
    pub(crate) fn same_cell(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.id == other.id
            && self.address == other.address
            && self.field == other.field
            && self.storage_key == other.storage_key
    }

    fn sort_key(&self) -> (RwOperationKind, usize, &Word, usize, &Word, usize) {
        (
            self.kind,
            self.id,
            &self.address,
            self.field,
            &self.storage_key,
            self.rw_counter,
        )
    }
}

impl PartialOrd for StateOperation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StateOperation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| other.is_original.cmp(&self.is_original))
    }
}

/// One step of the global access order: which table was touched at
/// `rw_counter`, and which group of that table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub rw_counter: usize,
    pub kind: RwOperationKind,
    pub internal_counter: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rw_ordering() {
        let mut ops = vec![
            RwOperation::new(RwOperationKind::Memory, 1, 0, 5, true, Word::ONE),
            RwOperation::new(RwOperationKind::Stack, 2, 0, 3, false, Word::ONE),
            RwOperation::new(RwOperationKind::Stack, 1, 1, 4, false, Word::ONE),
            RwOperation::new(RwOperationKind::Stack, 1, 1, 2, true, Word::ONE),
        ];
        ops.sort();
        let counters: Vec<_> = ops.iter().map(|op| op.rw_counter).collect();
        assert_eq!(counters, vec![2, 4, 3, 5]);
    }

    #[test]
    fn test_header_counter() {
        let op = RwOperation::call_context_header(10, CallContextField::Depth, Word::from(2u64));
        assert_eq!(op.rw_counter, 16);
        assert_eq!(op.address, 6);
        assert!(!op.is_write);
        assert_eq!(CALL_CONTEXT_READONLY_FIELD_AMOUNT, 9);
    }
}
