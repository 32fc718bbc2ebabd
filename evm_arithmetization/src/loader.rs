//! JSON block/transaction input.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use ethereum_types::{Address, H256};
use serde::{Deserialize, Serialize};

use crate::error::{ProgramError, Result};
use crate::word::Word;
use crate::world::Account;

fn default_one() -> Word {
    Word::ONE
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    #[serde(default)]
    pub hash: H256,
    #[serde(default)]
    pub parent_hash: H256,
    #[serde(default)]
    pub coinbase: Address,
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub difficulty: Word,
    #[serde(default)]
    pub basefee: Word,
    #[serde(default)]
    pub gas_limit: u64,
    #[serde(default = "default_one")]
    pub blob_base_fee: Word,
    /// Hashes of recent ancestors, keyed by block number, for `BLOCKHASH`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub old_block_hashes: BTreeMap<u64, H256>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageAccess {
    pub address: Address,
    pub key: Word,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub hash: H256,
    pub from: Address,
    /// `None` deploys the calldata as init code.
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub value: Word,
    pub gas: u64,
    #[serde(default = "default_one")]
    pub gas_price: Word,
    #[serde(default, with = "zk_evm_common::hex_bytes")]
    pub calldata: Vec<u8>,
    #[serde(default)]
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blob_versioned_hashes: Vec<H256>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub account_access_list: Vec<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage_access_list: Vec<StorageAccess>,
}

impl Transaction {
    pub fn is_deployment(&self) -> bool {
        self.to.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Accounts as of the start of the block.
    #[serde(default)]
    pub initial_accounts: BTreeMap<Address, Account>,
    /// Accounts that exist on chain but are otherwise untouched.
    #[serde(default)]
    pub existing_accounts: Vec<Address>,
}

/// One transaction together with the accounts it adds to the world state.
#[derive(Clone, Copy, Debug)]
pub struct LoadedTransaction<'a> {
    pub transaction: &'a Transaction,
    /// Non-empty only for the first transaction of a block.
    pub initial_accounts: &'a BTreeMap<Address, Account>,
    pub existing_accounts: &'a [Address],
}

static NO_ACCOUNTS: BTreeMap<Address, Account> = BTreeMap::new();

impl Block {
    pub fn loaded_transactions(&self) -> impl Iterator<Item = LoadedTransaction<'_>> {
        self.transactions
            .iter()
            .enumerate()
            .map(|(i, transaction)| LoadedTransaction {
                transaction,
                initial_accounts: if i == 0 {
                    &self.initial_accounts
                } else {
                    &NO_ACCOUNTS
                },
                existing_accounts: if i == 0 {
                    &self.existing_accounts
                } else {
                    &[]
                },
            })
    }
}

/// Reads a JSON list of blocks, reporting the path of the offending field on
/// failure.
pub fn read_blocks<R: Read>(reader: R) -> Result<Vec<Block>> {
    let des = &mut serde_json::Deserializer::from_reader(reader);
    Ok(serde_path_to_error::deserialize(des)?)
}

pub fn load_blocks(path: impl AsRef<Path>) -> Result<Vec<Block>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ProgramError::MalformedInput(format!("{}: {e}", path.display())))?;
    read_blocks(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = r#"[{
        "header": { "number": 7, "coinbase": "0x00000000000000000000000000000000000000cc" },
        "transactions": [
            { "from": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
              "to": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
              "gas": 100000, "calldata": "0x0102" },
            { "from": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "gas": 60000 }
        ],
        "initial_accounts": {
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa": { "balance": "0x3b9aca00" },
            "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb": {
                "code": "0x6002600301", "storage": { "0x1": "0x2a" } }
        }
    }]"#;

    #[test]
    fn test_read_blocks() -> anyhow::Result<()> {
        let blocks = read_blocks(BLOCK.as_bytes())?;
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.header.number, 7);
        assert_eq!(block.header.blob_base_fee, Word::ONE);

        let txs: Vec<_> = block.loaded_transactions().collect();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].initial_accounts.len(), 2);
        assert!(txs[1].initial_accounts.is_empty());
        assert_eq!(txs[0].transaction.calldata, vec![1, 2]);
        assert_eq!(txs[0].transaction.gas_price, Word::ONE);
        assert!(txs[1].transaction.is_deployment());

        let contract = &block.initial_accounts[&Address::repeat_byte(0xbb)];
        assert_eq!(contract.code, vec![0x60, 0x02, 0x60, 0x03, 0x01]);
        assert_eq!(contract.storage[&Word::ONE], Word::from(42u64));
        Ok(())
    }

    #[test]
    fn test_error_path() {
        let err = read_blocks(r#"[{ "header": { "number": "x" } }]"#.as_bytes())
            .expect_err("number must be an integer");
        assert!(err.to_string().contains("header.number"), "{err}");
    }
}
