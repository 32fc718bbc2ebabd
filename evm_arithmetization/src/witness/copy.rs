use serde::{Deserialize, Serialize};

use crate::word::Word;

/// Region kind on either side of a copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyOperandType {
    Memory,
    Calldata,
    Returndata,
    Bytecode,
    Log,
    Keccak,
    Padding,
}

/// A byte copy between two regions, checked by the copy circuit against the
/// RW operations starting at `initial_rw_counter`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyEvent {
    pub source_type: CopyOperandType,
    /// Call id, or the code hash for bytecode sources.
    pub source_id: Word,
    pub source_offset: usize,
    pub destination_type: CopyOperandType,
    /// Call id, transaction id for logs, or the digest for Keccak.
    pub destination_id: Word,
    pub destination_offset: usize,
    pub initial_rw_counter: usize,
    pub length: usize,
    #[serde(with = "zk_evm_common::hex_bytes")]
    pub bytes: Vec<u8>,
}

impl CopyEvent {
    #[allow(clippy::too_many_arguments)]
    fn new(
        source_type: CopyOperandType,
        source_id: Word,
        source_offset: usize,
        destination_type: CopyOperandType,
        destination_id: Word,
        destination_offset: usize,
        initial_rw_counter: usize,
        length: usize,
    ) -> Self {
        Self {
            source_type,
            source_id,
            source_offset,
            destination_type,
            destination_id,
            destination_offset,
            initial_rw_counter,
            length,
            bytes: Vec::with_capacity(length),
        }
    }

    pub fn calldatacopy(call_id: usize, src: usize, dst: usize, rw_counter: usize, length: usize) -> Self {
        Self::new(
            CopyOperandType::Calldata,
            Word::from(call_id),
            src,
            CopyOperandType::Memory,
            Word::from(call_id),
            dst,
            rw_counter,
            length,
        )
    }

    pub fn returndatacopy(
        lastcall_id: usize,
        src: usize,
        call_id: usize,
        dst: usize,
        rw_counter: usize,
        length: usize,
    ) -> Self {
        Self::new(
            CopyOperandType::Returndata,
            Word::from(lastcall_id),
            src,
            CopyOperandType::Memory,
            Word::from(call_id),
            dst,
            rw_counter,
            length,
        )
    }

    pub fn codecopy(
        code_hash: Word,
        src: usize,
        call_id: usize,
        dst: usize,
        rw_counter: usize,
        length: usize,
    ) -> Self {
        Self::new(
            CopyOperandType::Bytecode,
            code_hash,
            src,
            CopyOperandType::Memory,
            Word::from(call_id),
            dst,
            rw_counter,
            length,
        )
    }

    pub fn mcopy(call_id: usize, src: usize, dst: usize, rw_counter: usize, length: usize) -> Self {
        Self::new(
            CopyOperandType::Memory,
            Word::from(call_id),
            src,
            CopyOperandType::Memory,
            Word::from(call_id),
            dst,
            rw_counter,
            length,
        )
    }

    pub fn keccak(call_id: usize, offset: usize, rw_counter: usize, digest: Word, length: usize) -> Self {
        Self::new(
            CopyOperandType::Memory,
            Word::from(call_id),
            offset,
            CopyOperandType::Keccak,
            digest,
            0,
            rw_counter,
            length,
        )
    }

    pub fn log(call_id: usize, offset: usize, tx_id: usize, rw_counter: usize, length: usize) -> Self {
        Self::new(
            CopyOperandType::Memory,
            Word::from(call_id),
            offset,
            CopyOperandType::Log,
            Word::from(tx_id),
            0,
            rw_counter,
            length,
        )
    }

    /// Init code of a `CREATE`/`CREATE2` read from memory into the bytecode
    /// table.
    pub fn init_code(call_id: usize, offset: usize, code_hash: Word, rw_counter: usize, length: usize) -> Self {
        Self::new(
            CopyOperandType::Memory,
            Word::from(call_id),
            offset,
            CopyOperandType::Bytecode,
            code_hash,
            0,
            rw_counter,
            length,
        )
    }

    /// Memory of the halting call into its own returndata.
    pub fn return_data(call_id: usize, offset: usize, rw_counter: usize, length: usize) -> Self {
        Self::new(
            CopyOperandType::Memory,
            Word::from(call_id),
            offset,
            CopyOperandType::Returndata,
            Word::from(call_id),
            0,
            rw_counter,
            length,
        )
    }

    /// Returndata of a finished call into the caller's return region.
    pub fn end_call(
        call_id: usize,
        dst: usize,
        lastcall_id: usize,
        rw_counter: usize,
        length: usize,
    ) -> Self {
        Self::new(
            CopyOperandType::Returndata,
            Word::from(lastcall_id),
            0,
            CopyOperandType::Memory,
            Word::from(call_id),
            dst,
            rw_counter,
            length,
        )
    }

    pub fn push_byte(&mut self, byte: u8) {
        self.bytes.push(byte);
    }
}
