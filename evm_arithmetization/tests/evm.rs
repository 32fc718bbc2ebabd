use std::collections::BTreeMap;

use ethereum_types::Address;
use evm_arithmetization::interpreter::{create2_address, create_address};
use evm_arithmetization::testing_utils::{
    block_with_code, callee_code, contract, contract_call_block, init_logger, CALLEE,
    CONTRACT, SENDER,
};
use evm_arithmetization::{Evm, ExecutionError, ExecutionHooks, Opcode, Word};
use hex_literal::hex;
use zk_evm_common::keccak256;

#[test]
fn test_add_scenario() {
    let result = Evm::execute_code(&hex!("6002600301"), 100);
    assert!(result.success);
    assert_eq!(result.stack, vec![Word::from(5u64)]);
    assert_eq!(result.gas_left, 91);
}

#[test]
fn test_div_by_zero_scenario() {
    let result = Evm::execute_code(&hex!("6000601004"), 100);
    assert_eq!(result.stack, vec![Word::ZERO]);
    assert_eq!(result.gas_left, 89);
}

#[test]
fn test_cold_sstore_scenario() {
    let result = Evm::execute_code(&hex!("6007600055"), 30_000);
    assert!(result.success);
    assert_eq!(30_000 - result.gas_left, 3 + 3 + 22_100);
}

#[test]
fn test_create_address_scenario() {
    let sender = Address::repeat_byte(0xaa);
    let mut preimage = vec![0xd6, 0x94];
    preimage.extend_from_slice(sender.as_bytes());
    preimage.push(0x80);
    let expected = Address::from_slice(&keccak256(&preimage)[12..]);
    assert_eq!(create_address(&sender, 0), expected);
    assert_ne!(create_address(&sender, 1), expected);
}

#[test]
fn test_create2_address() {
    // EIP-1014 example 0.
    let address = create2_address(&Address::zero(), &Word::ZERO, &[0x00]);
    assert_eq!(
        address,
        Address::from(hex!("4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38"))
    );
}

/// Checks the stack delta and gas monotonicity of every completed opcode.
#[derive(Default)]
struct StepChecker {
    before: Option<(usize, u64)>,
    steps: usize,
}

impl ExecutionHooks for StepChecker {
    fn before_opcode(&mut self, evm: &Evm, _op: Opcode) {
        self.before = Some((evm.frame.stack.len(), evm.frame.gas));
    }

    fn after_opcode(&mut self, evm: &Evm, op: Opcode) {
        let Some((len, gas)) = self.before.take() else {
            return;
        };
        if !matches!(op, Opcode::Return | Opcode::Revert | Opcode::Stop) {
            assert_eq!(
                evm.frame.stack.len(),
                len - op.stack_inputs() + op.stack_outputs(),
                "stack delta of {op}"
            );
        }
        assert!(evm.frame.gas <= gas, "{op} increased gas");
        self.steps += 1;
    }

    fn start_call(&mut self, _evm: &Evm) {
        self.before = None;
    }
}

#[test]
fn test_stack_deltas() -> anyhow::Result<()> {
    init_logger();
    let mut checker = StepChecker::default();
    let results = Evm::run_blocks(&[contract_call_block()], &mut checker)?;
    assert!(results[0].success);
    assert!(checker.steps > 20);

    // DUP, SWAP, comparison and shifts.
    let mut checker = StepChecker::default();
    let mut evm = Evm::default();
    let result = evm.execute_code_with(&hex!("6001600281901160ff1b1c5000"), 1000, &mut checker);
    assert!(result.success, "{:?}", result.error);
    Ok(())
}

#[test]
fn test_revert_undoes_storage() -> anyhow::Result<()> {
    // SSTORE(0, 7) then REVERT(0, 0).
    let block = block_with_code(hex!("600760005560006000fd").to_vec());
    let mut evm = Evm::default();
    let results = evm.run_block(&block, &mut ())?;
    assert!(!results[0].success);
    assert_eq!(evm.world.storage(&CONTRACT, &Word::ZERO), Word::ZERO);
    assert_eq!(evm.world.nonce(&SENDER), 1);
    Ok(())
}

#[test]
fn test_nested_revert_keeps_caller_storage() -> anyhow::Result<()> {
    let mut block = contract_call_block();
    // The callee stores then reverts.
    block
        .initial_accounts
        .insert(CALLEE, contract(hex!("602a60015560006000fd").to_vec()));
    let mut evm = Evm::default();
    let results = evm.run_block(&block, &mut ())?;
    assert!(results[0].success);
    assert_eq!(evm.world.storage(&CONTRACT, &Word::ZERO), Word::from(7u64));
    assert_eq!(evm.world.storage(&CALLEE, &Word::ONE), Word::ZERO);
    // LOG0 sees the untouched return region.
    assert_eq!(evm.logs.len(), 1);
    assert_eq!(evm.logs[0].data, vec![0; 32]);
    Ok(())
}

#[test]
fn test_call_returns_data() -> anyhow::Result<()> {
    let mut evm = Evm::default();
    let results = evm.run_block(&contract_call_block(), &mut ())?;
    assert!(results[0].success);
    assert_eq!(evm.world.storage(&CALLEE, &Word::ONE), Word::from(42u64));
    let mut expected = vec![0; 32];
    expected[31] = 42;
    assert_eq!(evm.logs[0].address, CONTRACT);
    assert_eq!(evm.logs[0].data, expected);
    Ok(())
}

#[test]
fn test_create_deploys_code() -> anyhow::Result<()> {
    // Init code returning the single byte 0x00 as runtime code.
    let init_code = hex!("60016000f3");
    let mut code = vec![0x64];
    code.extend_from_slice(&init_code);
    // MSTORE the init code right-aligned, CREATE(0, 27, 5), STOP.
    code.extend_from_slice(&hex!("6000526005601b6000f000"));
    let block = block_with_code(code);
    let mut evm = Evm::default();
    let results = evm.run_block(&block, &mut ())?;
    assert!(results[0].success, "{:?}", results[0].error);

    let created = create_address(&CONTRACT, 0);
    assert!(evm.world.exists(&created));
    assert_eq!(evm.world.code(&created), &[0x00]);
    assert_eq!(evm.world.nonce(&created), 1);
    assert_eq!(evm.world.nonce(&CONTRACT), 1);
    Ok(())
}

#[test]
fn test_runtime_errors_are_absorbed() -> anyhow::Result<()> {
    let cases: [(&[u8], ExecutionError); 3] = [
        (&hex!("01"), ExecutionError::StackUnderflow),
        (&hex!("600356"), ExecutionError::InvalidJumpDestination),
        (&hex!("fe"), ExecutionError::InvalidOpcode(0xfe)),
    ];
    for (code, error) in cases {
        let block = block_with_code(code.to_vec());
        let results = Evm::run_blocks(&[block], &mut ())?;
        assert_eq!(results[0].error, Some(error));
        assert_eq!(results[0].gas_left, 0);
    }
    Ok(())
}

#[test]
fn test_sender_must_afford_gas() {
    let mut block = block_with_code(vec![]);
    block.initial_accounts = BTreeMap::from([(CONTRACT, contract(callee_code()))]);
    assert!(Evm::run_blocks(&[block], &mut ()).is_err());
}
