use ethereum_types::H256;
use zk_evm_common::keccak256;

use super::{Evm, LogEntry, Outcome, Step};
use crate::error::ExecutionError;
use crate::memory::padded_slice;
use crate::opcodes::Opcode;
use crate::word::{self, address_to_word, h256_to_word, word_to_address, Word};
use crate::world::AccessKey;

/// Offset and length of a memory range whose expansion has been paid for.
/// Empty ranges map to `(0, 0)` whatever their offset.
pub(crate) fn memory_range(offset: &Word, len: &Word) -> (usize, usize) {
    if len.is_zero() {
        (0, 0)
    } else {
        (
            word::word_to_usize_saturating(offset),
            word::word_to_usize_saturating(len),
        )
    }
}

fn binary_op(op: Opcode, a: &Word, b: &Word) -> Word {
    match op {
        Opcode::Add => a.wrapping_add(b),
        Opcode::Mul => a.wrapping_mul(b),
        Opcode::Sub => a.wrapping_sub(b),
        Opcode::Div => word::div(a, b),
        Opcode::Sdiv => word::sdiv(a, b),
        Opcode::Mod => word::rem(a, b),
        Opcode::Smod => word::smod(a, b),
        Opcode::Exp => word::exp(a, b),
        Opcode::Signextend => word::signextend(a, b),
        Opcode::Lt => Word::from(a < b),
        Opcode::Gt => Word::from(a > b),
        Opcode::Slt => Word::from(word::slt(a, b)),
        Opcode::Sgt => Word::from(word::sgt(a, b)),
        Opcode::Eq => Word::from(a == b),
        Opcode::And => *a & *b,
        Opcode::Or => *a | *b,
        Opcode::Xor => *a ^ *b,
        Opcode::Byte => word::byte(a, b),
        Opcode::Shl => word::shl(a, b),
        Opcode::Shr => word::shr(a, b),
        Opcode::Sar => word::sar(a, b),
        _ => unreachable!("{op} is not a binary operation"),
    }
}

impl Evm {
    fn push(&mut self, value: Word) -> Result<(), ExecutionError> {
        self.frame.stack.push(value)
    }

    fn warm_account(&mut self, address: &Word) -> ethereum_types::Address {
        let address = word_to_address(address);
        self.frame.warm.insert(AccessKey::Account(address));
        address
    }

    pub(crate) fn execute(&mut self, op: Opcode) -> Result<Step, ExecutionError> {
        match op {
            Opcode::Stop => {
                self.frame.output.clear();
                return Ok(Step::Halt(Outcome::Success));
            }
            Opcode::Add
            | Opcode::Mul
            | Opcode::Sub
            | Opcode::Div
            | Opcode::Sdiv
            | Opcode::Mod
            | Opcode::Smod
            | Opcode::Exp
            | Opcode::Signextend
            | Opcode::Lt
            | Opcode::Gt
            | Opcode::Slt
            | Opcode::Sgt
            | Opcode::Eq
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Byte
            | Opcode::Shl
            | Opcode::Shr
            | Opcode::Sar => {
                let [a, b] = self.frame.stack.pop_n()?;
                self.push(binary_op(op, &a, &b))?;
            }
            Opcode::Addmod | Opcode::Mulmod => {
                let [a, b, n] = self.frame.stack.pop_n()?;
                let result = if op == Opcode::Addmod {
                    word::addmod(&a, &b, &n)
                } else {
                    word::mulmod(&a, &b, &n)
                };
                self.push(result)?;
            }
            Opcode::Iszero => {
                let a = self.frame.stack.pop()?;
                self.push(Word::from(a.is_zero()))?;
            }
            Opcode::Not => {
                let a = self.frame.stack.pop()?;
                self.push(!a)?;
            }
            Opcode::Keccak256 => {
                let [offset, len] = self.frame.stack.pop_n()?;
                let (offset, len) = memory_range(&offset, &len);
                let data = self.frame.memory.read(offset, len);
                self.push(Word::from_be_slice_truncated(&keccak256(data)))?;
            }
            Opcode::Address => self.push(address_to_word(&self.frame.address))?,
            Opcode::Balance => {
                let address = self.frame.stack.pop()?;
                let address = self.warm_account(&address);
                self.push(self.world.balance(&address))?;
            }
            Opcode::Origin => self.push(address_to_word(&self.tx.from))?,
            Opcode::Caller => self.push(address_to_word(&self.frame.caller))?,
            Opcode::Callvalue => self.push(self.frame.value)?,
            Opcode::Calldataload => {
                let offset = self.frame.stack.pop()?;
                let value = match usize::try_from(&offset) {
                    Ok(offset) => {
                        Word::from_be_slice_truncated(&padded_slice(&self.frame.calldata, offset, 32))
                    }
                    Err(_) => Word::ZERO,
                };
                self.push(value)?;
            }
            Opcode::Calldatasize => self.push(Word::from(self.frame.calldata.len()))?,
            Opcode::Calldatacopy | Opcode::Codecopy | Opcode::Returndatacopy => {
                let [dst, src, len] = self.frame.stack.pop_n()?;
                let (dst, len) = memory_range(&dst, &len);
                let src = word::word_to_usize_saturating(&src);
                let frame = &mut self.frame;
                let source = match op {
                    Opcode::Calldatacopy => &frame.calldata,
                    Opcode::Codecopy => &frame.code,
                    _ => &frame.returndata,
                };
                let data = padded_slice(source, src, len);
                frame.memory.store(dst, &data);
            }
            Opcode::Codesize => self.push(Word::from(self.frame.code.len()))?,
            Opcode::Gasprice => self.push(self.tx.gas_price)?,
            Opcode::Extcodesize => {
                let address = self.frame.stack.pop()?;
                let address = self.warm_account(&address);
                self.push(Word::from(self.world.code(&address).len()))?;
            }
            Opcode::Extcodecopy => {
                let [address, dst, src, len] = self.frame.stack.pop_n()?;
                let address = self.warm_account(&address);
                let (dst, len) = memory_range(&dst, &len);
                let src = word::word_to_usize_saturating(&src);
                let data = padded_slice(self.world.code(&address), src, len);
                self.frame.memory.store(dst, &data);
            }
            Opcode::Returndatasize => self.push(Word::from(self.frame.returndata.len()))?,
            Opcode::Extcodehash => {
                let address = self.frame.stack.pop()?;
                let address = self.warm_account(&address);
                self.push(h256_to_word(&self.world.code_hash(&address)))?;
            }
            Opcode::Blockhash => {
                let number = self.frame.stack.pop()?;
                let hash = self.block_hash(&number);
                self.push(h256_to_word(&hash))?;
            }
            Opcode::Coinbase => {
                let coinbase = self.header.coinbase;
                self.frame.warm.insert(AccessKey::Account(coinbase));
                self.push(address_to_word(&coinbase))?;
            }
            Opcode::Timestamp => self.push(Word::from(self.header.timestamp))?,
            Opcode::Number => self.push(Word::from(self.header.number))?,
            Opcode::Difficulty => self.push(self.header.difficulty)?,
            Opcode::Gaslimit => self.push(Word::from(self.header.gas_limit))?,
            Opcode::Chainid => self.push(Word::from(self.tx.chain_id))?,
            Opcode::Selfbalance => self.push(self.world.balance(&self.frame.address))?,
            Opcode::Basefee => self.push(self.header.basefee)?,
            Opcode::Blobhash => {
                let index = self.frame.stack.pop()?;
                let hash = usize::try_from(&index)
                    .ok()
                    .and_then(|i| self.tx.blob_versioned_hashes.get(i).copied())
                    .unwrap_or_default();
                self.push(h256_to_word(&hash))?;
            }
            Opcode::Blobbasefee => self.push(self.header.blob_base_fee)?,
            Opcode::Pop => {
                self.frame.stack.pop()?;
            }
            Opcode::Mload => {
                let offset = self.frame.stack.pop()?;
                let value = self
                    .frame
                    .memory
                    .load_word(word::word_to_usize_saturating(&offset));
                self.push(value)?;
            }
            Opcode::Mstore => {
                let [offset, value] = self.frame.stack.pop_n()?;
                self.frame
                    .memory
                    .store_word(word::word_to_usize_saturating(&offset), &value);
            }
            Opcode::Mstore8 => {
                let [offset, value] = self.frame.stack.pop_n()?;
                self.frame.memory.store_byte(
                    word::word_to_usize_saturating(&offset),
                    value.low_u64() as u8,
                );
            }
            Opcode::Sload => {
                let key = self.frame.stack.pop()?;
                let address = self.frame.address;
                self.frame.warm.insert(AccessKey::Storage(address, key));
                self.push(self.world.storage(&address, &key))?;
            }
            Opcode::Sstore => {
                let [key, value] = self.frame.stack.pop_n()?;
                let address = self.frame.address;
                self.frame.warm.insert(AccessKey::Storage(address, key));
                self.world.set_storage(&address, key, value);
            }
            Opcode::Jump => {
                let dest = self.frame.stack.pop()?;
                return self.jump(&dest);
            }
            Opcode::Jumpi => {
                let [dest, condition] = self.frame.stack.pop_n()?;
                if !condition.is_zero() {
                    return self.jump(&dest);
                }
            }
            Opcode::Pc => self.push(Word::from(self.frame.pc))?,
            Opcode::Msize => self.push(Word::from(self.frame.memory.len()))?,
            Opcode::Gas => self.push(Word::from(self.frame.gas))?,
            Opcode::Jumpdest => {}
            Opcode::Tload => {
                let key = self.frame.stack.pop()?;
                let value = self
                    .frame
                    .transient
                    .get(&(self.frame.address, key))
                    .copied()
                    .unwrap_or_default();
                self.push(value)?;
            }
            Opcode::Tstore => {
                let [key, value] = self.frame.stack.pop_n()?;
                let slot = (self.frame.address, key);
                if value.is_zero() {
                    self.frame.transient.remove(&slot);
                } else {
                    self.frame.transient.insert(slot, value);
                }
            }
            Opcode::Mcopy => {
                let [dst, src, len] = self.frame.stack.pop_n()?;
                let (dst, len) = memory_range(&dst, &len);
                let (src, _) = memory_range(&src, &Word::from(len));
                let data = self.frame.memory.read(src, len);
                self.frame.memory.store(dst, &data);
            }
            Opcode::Push(n) => {
                let value = self.frame.push_immediate(n as usize);
                self.push(value)?;
                self.frame.pc += n as usize;
            }
            Opcode::Dup(n) => self.frame.stack.dup(n as usize)?,
            Opcode::Swap(n) => self.frame.stack.swap(n as usize)?,
            Opcode::Log(n) => {
                let [offset, len] = self.frame.stack.pop_n()?;
                let topics = (0..n)
                    .map(|_| self.frame.stack.pop().map(|t| word::word_to_h256(&t)))
                    .collect::<Result<Vec<H256>, _>>()?;
                let (offset, len) = memory_range(&offset, &len);
                let data = self.frame.memory.read(offset, len);
                self.logs.push(LogEntry {
                    address: self.frame.address,
                    topics,
                    data,
                });
            }
            Opcode::Create | Opcode::Create2 => return self.create(op),
            Opcode::Call | Opcode::Delegatecall | Opcode::Staticcall => return self.call(op),
            Opcode::Return | Opcode::Revert => {
                let [offset, len] = self.frame.stack.pop_n()?;
                let (offset, len) = memory_range(&offset, &len);
                self.frame.output = self.frame.memory.read(offset, len);
                if op == Opcode::Revert {
                    return Ok(Step::Halt(Outcome::Revert));
                }
                if self.frame.kind.is_create() {
                    let address = self.frame.address;
                    self.world.account_mut(&address).code = self.frame.output.clone();
                    self.world.mark_existing(address);
                    self.frame.warm.insert(AccessKey::Account(address));
                }
                return Ok(Step::Halt(Outcome::Success));
            }
            Opcode::Invalid => return Err(ExecutionError::InvalidOpcode(op.byte())),
            Opcode::Selfdestruct => {
                let target = self.frame.stack.pop()?;
                let target = self.warm_account(&target);
                let address = self.frame.address;
                let balance = self.world.balance(&address);
                if target != address && !balance.is_zero() {
                    self.world.transfer(&address, &target, &balance);
                    self.world.mark_existing(target);
                }
                self.world.remove_existing(&address);
                self.frame.output.clear();
                return Ok(Step::Halt(Outcome::Success));
            }
        }
        self.frame.pc += 1;
        Ok(Step::Continue)
    }

    fn jump(&mut self, dest: &Word) -> Result<Step, ExecutionError> {
        if !self.frame.is_valid_jump(dest) {
            return Err(ExecutionError::InvalidJumpDestination);
        }
        self.frame.pc = word::word_to_usize_saturating(dest);
        Ok(Step::Continue)
    }

    /// Parent hash for the previous block, a loaded ancestor hash otherwise,
    /// and zero for unknown or future blocks.
    fn block_hash(&self, number: &Word) -> H256 {
        let Ok(number) = u64::try_from(number) else {
            return H256::zero();
        };
        if number >= self.header.number {
            return H256::zero();
        }
        if number + 1 == self.header.number {
            return self.header.parent_hash;
        }
        self.header
            .old_block_hashes
            .get(&number)
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    fn run(code: &[u8]) -> Vec<Word> {
        Evm::execute_code(code, 1_000_000).stack
    }

    #[test]
    fn test_shr_shifts_right() {
        // PUSH1 0xff PUSH1 4 SHR
        assert_eq!(run(&hex!("60ff60041c")), vec![Word::from(0xfu64)]);
    }

    #[test]
    fn test_jumpi_loop() {
        // Counts down from 3 in a JUMPI loop and leaves 0.
        // 0: PUSH1 3, 2: JUMPDEST, 3: PUSH1 1, 5: SWAP1, 6: SUB, 7: DUP1,
        // 8: PUSH1 2, 10: JUMPI, 11: STOP
        assert_eq!(run(&hex!("60035b600190038060025700")), vec![Word::ZERO]);
    }

    #[test]
    fn test_memory_and_keccak() {
        // MSTORE 0x2a at 0, MLOAD 0, MSIZE
        let stack = run(&hex!("602a60005260005159"));
        assert_eq!(stack, vec![Word::from(0x2au64), Word::from(32u64)]);

        // KECCAK256 of empty memory range
        let stack = run(&hex!("6000600020"));
        assert_eq!(
            stack,
            vec![Word::from_be_slice_truncated(&zk_evm_common::EMPTY_CODE_HASH.0)]
        );
    }

    #[test]
    fn test_transient_storage() {
        // TSTORE(1, 5) TLOAD(1)
        assert_eq!(run(&hex!("600560015d60015c")), vec![Word::from(5u64)]);
    }

    #[test]
    fn test_mcopy() {
        // MSTORE8(0, 0xab) MCOPY(dst 32, src 0, len 1) MLOAD(1) (reads bytes 1..33)
        let stack = run(&hex!("60ab6000536001600060205e60015100"));
        assert_eq!(stack, vec![Word::from(0xabu64)]);
    }

    #[test]
    fn test_return_data() {
        let result = Evm::execute_code(&hex!("602a60005260206000f3"), 1000);
        assert!(result.success);
        assert_eq!(Word::from_be_slice_truncated(&result.output), Word::from(42u64));

        let result = Evm::execute_code(&hex!("602a60005260206000fd"), 1000);
        assert!(!result.success);
        assert_eq!(result.output.len(), 32);
        assert_eq!(result.error, None);
    }
}
