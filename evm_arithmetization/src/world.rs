use std::collections::{BTreeMap, BTreeSet};

use ethereum_types::{Address, H256};
use serde::{Deserialize, Serialize};
use zk_evm_common::{keccak256, EMPTY_CODE_HASH};

use crate::word::Word;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub balance: Word,
    #[serde(default)]
    pub nonce: u64,
    #[serde(default, with = "zk_evm_common::hex_bytes")]
    pub code: Vec<u8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub storage: BTreeMap<Word, Word>,
}

impl Account {
    pub fn code_hash(&self) -> H256 {
        if self.code.is_empty() {
            EMPTY_CODE_HASH
        } else {
            H256(keccak256(&self.code))
        }
    }
}

/// Entry of the EIP-2929 warm set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessKey {
    Account(Address),
    Storage(Address, Word),
}

/// Accounts touched by a block, plus the set of accounts that exist on chain,
/// which prices account creation.
///
/// Snapshots for reverts are plain clones.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldState {
    accounts: BTreeMap<Address, Account>,
    existing: BTreeSet<Address>,
}

impl WorldState {
    pub fn new(
        accounts: BTreeMap<Address, Account>,
        existing: impl IntoIterator<Item = Address>,
    ) -> Self {
        let mut existing: BTreeSet<Address> = existing.into_iter().collect();
        existing.extend(accounts.keys().copied());
        Self { accounts, existing }
    }

    /// Adds accounts loaded for a later transaction without overwriting state
    /// produced by earlier ones.
    pub fn merge(
        &mut self,
        accounts: &BTreeMap<Address, Account>,
        existing: impl IntoIterator<Item = Address>,
    ) {
        for (address, account) in accounts {
            if !self.accounts.contains_key(address) {
                self.accounts.insert(*address, account.clone());
                self.existing.insert(*address);
            }
        }
        self.existing.extend(existing);
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn account_mut(&mut self, address: &Address) -> &mut Account {
        self.accounts.entry(*address).or_default()
    }

    pub fn accounts(&self) -> &BTreeMap<Address, Account> {
        &self.accounts
    }

    pub fn balance(&self, address: &Address) -> Word {
        self.account(address).map(|a| a.balance).unwrap_or_default()
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        self.account(address).map(|a| a.nonce).unwrap_or_default()
    }

    pub fn code(&self, address: &Address) -> &[u8] {
        self.account(address).map(|a| a.code.as_slice()).unwrap_or(&[])
    }

    /// `EXTCODEHASH` semantics: zero for accounts that do not exist.
    pub fn code_hash(&self, address: &Address) -> H256 {
        if !self.exists(address) {
            return H256::zero();
        }
        self.account(address)
            .map(Account::code_hash)
            .unwrap_or(EMPTY_CODE_HASH)
    }

    pub fn storage(&self, address: &Address, key: &Word) -> Word {
        self.account(address)
            .and_then(|a| a.storage.get(key).copied())
            .unwrap_or_default()
    }

    pub fn set_storage(&mut self, address: &Address, key: Word, value: Word) {
        let storage = &mut self.account_mut(address).storage;
        if value.is_zero() {
            storage.remove(&key);
        } else {
            storage.insert(key, value);
        }
    }

    pub fn exists(&self, address: &Address) -> bool {
        self.existing.contains(address)
    }

    pub fn mark_existing(&mut self, address: Address) {
        self.existing.insert(address);
    }

    pub fn remove_existing(&mut self, address: &Address) {
        self.existing.remove(address);
    }

    /// Moves `value` from `from` to `to`. Returns `false` and changes nothing
    /// if `from` cannot afford it.
    pub fn transfer(&mut self, from: &Address, to: &Address, value: &Word) -> bool {
        if value.is_zero() {
            return true;
        }
        let balance = self.balance(from);
        if balance < *value {
            return false;
        }
        self.account_mut(from).balance = balance - *value;
        let to = self.account_mut(to);
        to.balance = to.balance.wrapping_add(value);
        true
    }
}
