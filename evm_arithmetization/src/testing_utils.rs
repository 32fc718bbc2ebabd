//! A set of utility functions and constants to be used by
//! `evm_arithmetization` unit and integration tests.

use std::collections::BTreeMap;

use env_logger::{try_init_from_env, Env, DEFAULT_FILTER_ENV};
use ethereum_types::Address;

use crate::loader::{Block, Transaction};
use crate::word::Word;
use crate::world::Account;

/// Externally owned account paying for every test transaction.
pub const SENDER: Address = Address::repeat_byte(0x10);
/// Contract receiving the test transactions.
pub const CONTRACT: Address = Address::repeat_byte(0xaa);
/// Contract called by [`CONTRACT`] in [`contract_call_block`].
pub const CALLEE: Address = Address::repeat_byte(0xcc);

pub const TEST_GAS: u64 = 1_000_000;

pub fn init_logger() {
    let _ = try_init_from_env(Env::default().filter_or(DEFAULT_FILTER_ENV, "info"));
}

pub fn funded_sender() -> Account {
    Account {
        balance: Word::from(1_000_000_000_000_000_000u64),
        ..Default::default()
    }
}

pub fn contract(code: Vec<u8>) -> Account {
    Account {
        code,
        ..Default::default()
    }
}

/// A block with one transaction from [`SENDER`] calling [`CONTRACT`], which
/// holds `code`.
pub fn block_with_code(code: Vec<u8>) -> Block {
    let mut block = Block {
        initial_accounts: BTreeMap::from([(SENDER, funded_sender()), (CONTRACT, contract(code))]),
        ..Default::default()
    };
    block.transactions.push(Transaction {
        from: SENDER,
        to: Some(CONTRACT),
        gas: TEST_GAS,
        gas_price: Word::ONE,
        ..Default::default()
    });
    block
}

/// Stores 42 at slot 1 and returns it as a word.
pub fn callee_code() -> Vec<u8> {
    vec![
        0x60, 0x2a, 0x60, 0x01, 0x55, // SSTORE(1, 42)
        0x60, 0x2a, 0x60, 0x00, 0x52, // MSTORE(0, 42)
        0x60, 0x20, 0x60, 0x00, 0xf3, // RETURN(0, 32)
    ]
}

/// Stores 7 at slot 0, calls `callee` with a 32-byte return region at
/// offset 0, then logs that region.
pub fn caller_code(callee: Address) -> Vec<u8> {
    let mut code = vec![
        0x60, 0x07, 0x60, 0x00, 0x55, // SSTORE(0, 7)
        0x60, 0x20, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, // CALL arguments
        0x73,
    ];
    code.extend_from_slice(callee.as_bytes());
    code.extend_from_slice(&[
        0x5a, 0xf1, 0x50, // GAS CALL POP
        0x60, 0x20, 0x60, 0x00, 0xa0, // LOG0(0, 32)
        0x00,
    ]);
    code
}

/// [`CONTRACT`] running [`caller_code`] against [`CALLEE`] running
/// [`callee_code`].
pub fn contract_call_block() -> Block {
    let mut block = block_with_code(caller_code(CALLEE));
    block
        .initial_accounts
        .insert(CALLEE, contract(callee_code()));
    block
}
