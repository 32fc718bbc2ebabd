use std::collections::BTreeSet;

use evm_arithmetization::testing_utils::{
    block_with_code, contract, contract_call_block, init_logger, CALLEE, CONTRACT,
};
use evm_arithmetization::witness::{
    CopyOperandType, ExecutionTrace, RwOperationKind, StateField, WitnessGenerator,
    CALL_CONTEXT_READONLY_FIELD_AMOUNT,
};
use evm_arithmetization::word::address_to_word;
use evm_arithmetization::{read_blocks, Opcode, VirtualOpcode, Word, WITNESS_COLUMNS};
use hex_literal::hex;
use itertools::Itertools;

/// Counters of operations that do not sit in a reserved header slot.
fn ordinary_counters(trace: &ExecutionTrace) -> Vec<usize> {
    let rw = trace
        .rw_operations
        .iter()
        .filter(|op| match op.kind {
            RwOperationKind::Start => false,
            RwOperationKind::CallContext => op.address >= CALL_CONTEXT_READONLY_FIELD_AMOUNT,
            _ => true,
        })
        .map(|op| op.rw_counter);
    let state = trace
        .state_operations
        .iter()
        .filter(|op| op.is_original && op.kind != RwOperationKind::StateCallContext)
        .map(|op| op.rw_counter);
    rw.chain(state).collect()
}

#[test]
fn test_counters_are_unique() -> anyhow::Result<()> {
    init_logger();
    let trace = WitnessGenerator::generate(&[contract_call_block()])?;
    let counters = ordinary_counters(&trace);
    assert!(!counters.is_empty());
    assert!(counters.iter().all_unique());

    let timeline: Vec<_> = trace.timeline.iter().map(|e| e.rw_counter).collect();
    assert!(timeline.windows(2).all(|w| w[0] <= w[1]));
    Ok(())
}

#[test]
fn test_cells_read_what_was_written() -> anyhow::Result<()> {
    let trace = WitnessGenerator::generate(&[contract_call_block()])?;
    let groups = trace
        .rw_operations
        .iter()
        .filter(|op| op.kind != RwOperationKind::Start)
        .chunk_by(|op| (op.kind, op.id, op.address));
    for (cell, ops) in &groups {
        let ops: Vec<_> = ops.collect();
        assert!(ops.windows(2).all(|w| w[0].rw_counter < w[1].rw_counter));
        assert!(ops.windows(2).all(|w| w[0].internal_counter == w[1].internal_counter));
        for pair in ops.windows(2) {
            if !pair[1].is_write {
                assert_eq!(pair[0].value, pair[1].value, "cell {cell:?}");
            }
        }
    }
    Ok(())
}

#[test]
fn test_call_structure() -> anyhow::Result<()> {
    let trace = WitnessGenerator::generate(&[contract_call_block()])?;
    let opcodes: Vec<_> = trace.states.iter().map(|s| s.opcode).collect();
    let position = |op: u16| opcodes.iter().position(|o| *o == op);
    let start_tx = position(VirtualOpcode::StartTransaction.number());
    let start_call = position(VirtualOpcode::StartCall.number());
    let end_call = position(VirtualOpcode::EndCall.number());
    let end_tx = position(VirtualOpcode::EndTransaction.number());
    assert!(start_tx < start_call && start_call < end_call && end_call < end_tx);

    let tx_id = trace.states[start_tx.unwrap_or_default()].call_id;
    let call_id = trace.states[start_call.unwrap_or_default()].call_id;
    assert!(call_id > tx_id + CALL_CONTEXT_READONLY_FIELD_AMOUNT);

    // The callee's 32-byte output is copied to the caller's memory and logged.
    let end_copy = trace
        .copy_events
        .iter()
        .find(|c| c.source_type == CopyOperandType::Returndata)
        .ok_or_else(|| anyhow::anyhow!("missing returndata copy"))?;
    assert_eq!(end_copy.length, 32);
    assert_eq!(end_copy.bytes[31], 42);
    assert!(trace
        .copy_events
        .iter()
        .any(|c| c.destination_type == CopyOperandType::Log && c.bytes == end_copy.bytes));

    let log_emitter = trace
        .rw_operations
        .iter()
        .find(|op| op.kind == RwOperationKind::Log)
        .map(|op| op.value);
    assert_eq!(log_emitter, Some(address_to_word(&CONTRACT)));

    // Both contracts' bytecodes are recorded and hashed.
    assert_eq!(trace.bytecodes.len(), 2);
    assert!(trace.keccaks.len() >= 2);
    Ok(())
}

#[test]
fn test_storage_accesses() -> anyhow::Result<()> {
    let trace = WitnessGenerator::generate(&[contract_call_block()])?;
    let sstore = trace
        .states
        .iter()
        .find(|s| s.opcode == Opcode::Sstore.number())
        .ok_or_else(|| anyhow::anyhow!("missing SSTORE row"))?;
    assert_eq!(sstore.get(StateField::StorageKey), Word::ZERO);
    assert_eq!(sstore.get(StateField::WasAccessed), Word::ZERO);

    let writes: BTreeSet<_> = trace
        .state_operations
        .iter()
        .filter(|op| op.kind == RwOperationKind::State && op.is_original && op.is_write)
        .map(|op| (op.address, op.storage_key, op.value))
        .collect();
    assert!(writes.contains(&(address_to_word(&CONTRACT), Word::ZERO, Word::from(7u64))));
    assert!(writes.contains(&(address_to_word(&CALLEE), Word::ONE, Word::from(42u64))));

    // The callee's write is handed to the transaction at call exit.
    assert!(trace
        .state_operations
        .iter()
        .any(|op| !op.is_original && op.storage_key == Word::ONE));
    Ok(())
}

#[test]
fn test_revert_is_recorded() -> anyhow::Result<()> {
    let mut block = contract_call_block();
    block
        .initial_accounts
        .insert(CALLEE, contract(hex!("602a60015560006000fd").to_vec()));
    let trace = WitnessGenerator::generate(&[block])?;

    let call_id = trace
        .states
        .iter()
        .find(|s| s.opcode == VirtualOpcode::StartCall.number())
        .map(|s| s.call_id)
        .ok_or_else(|| anyhow::anyhow!("missing call"))?;
    assert!(trace.call_summaries[&call_id].is_reverted);

    // The slot is written back to its value at call entry.
    let reverted = trace.state_operations.iter().any(|op| {
        op.kind == RwOperationKind::State
            && op.id == call_id
            && op.storage_key == Word::ONE
            && op.previous_value == Word::from(42u64)
            && op.value == Word::ZERO
    });
    assert!(reverted);
    Ok(())
}

#[test]
fn test_error_rows() -> anyhow::Result<()> {
    let trace = WitnessGenerator::generate(&[block_with_code(hex!("600356").to_vec())])?;
    assert!(trace
        .states
        .iter()
        .any(|s| s.opcode == VirtualOpcode::Err1.number()));

    let trace = WitnessGenerator::generate(&[block_with_code(hex!("01").to_vec())])?;
    assert!(trace
        .states
        .iter()
        .any(|s| s.opcode == VirtualOpcode::Err0.number()));
    Ok(())
}

#[test]
fn test_keccak_buffers() -> anyhow::Result<()> {
    // MSTORE(0, 42), KECCAK256(0, 32), POP, STOP.
    let trace = WitnessGenerator::generate(&[block_with_code(
        hex!("602a60005260206000205000").to_vec(),
    )])?;
    let row = trace
        .states
        .iter()
        .find(|s| s.opcode == Opcode::Keccak256.number())
        .ok_or_else(|| anyhow::anyhow!("missing KECCAK256 row"))?;
    let digest = row.get(StateField::KeccakResult);
    let mut input = [0u8; 32];
    input[31] = 42;
    let buffer = trace
        .keccaks
        .buffers()
        .iter()
        .find(|b| b.input == input)
        .ok_or_else(|| anyhow::anyhow!("missing buffer"))?;
    assert_eq!(
        digest,
        Word::from_be_slice_truncated(buffer.digest.as_bytes())
    );
    Ok(())
}

#[test]
fn test_json_to_columns() -> anyhow::Result<()> {
    const BLOCKS: &str = r#"[{
        "header": { "number": 1 },
        "transactions": [
            { "from": "0x1010101010101010101010101010101010101010",
              "to": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
              "gas": 100000, "calldata": "0x01020304" }
        ],
        "initial_accounts": {
            "0x1010101010101010101010101010101010101010": { "balance": "0xde0b6b3a7640000" },
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa": { "code": "0x60003560005500" }
        }
    }]"#;
    let blocks = read_blocks(BLOCKS.as_bytes())?;
    let trace = WitnessGenerator::generate(&blocks)?;
    let calldata_reads = trace
        .rw_operations
        .iter()
        .filter(|op| op.kind == RwOperationKind::Calldata && !op.is_write)
        .count();
    assert_eq!(calldata_reads, 32);

    let height = trace.padded_height();
    let columns = trace.to_columns(height)?;
    assert_eq!(columns.len(), WITNESS_COLUMNS.len());
    assert!(columns.iter().all(|c| c.len() == height));
    assert!(trace.statistics().to_string().contains("SSTORE: 1"));
    Ok(())
}

#[test]
fn test_standalone_code_without_block() {
    let mut generator = WitnessGenerator::new();
    let mut evm = evm_arithmetization::Evm::default();
    let result = evm.execute_code_with(&hex!("6001600101"), 100, &mut generator);
    assert!(result.success);
    let trace = generator.finish();
    assert_eq!(
        trace.states.last().map(|s| s.opcode),
        Some(VirtualOpcode::EndBlock.number())
    );
}
