use ethereum_types::Address;
use rlp::RlpStream;
use zk_evm_common::{is_precompile, keccak256};

use super::ops::memory_range;
use super::{Evm, Frame, FrameKind, Outcome, Step, CALL_STIPEND, MAX_CALL_DEPTH};
use crate::error::ExecutionError;
use crate::opcodes::Opcode;
use crate::precompiles::evaluate_precompile;
use crate::word::{word_to_address, word_to_u64_saturating, Word};
use crate::world::AccessKey;

/// RLP encoding of `[sender, nonce]`, hashed into a `CREATE` address.
pub fn create_address_preimage(sender: &Address, nonce: u64) -> Vec<u8> {
    let mut stream = RlpStream::new_list(2);
    stream.append(&sender.as_bytes());
    stream.append(&nonce);
    stream.out().to_vec()
}

/// `CREATE` address: the last 20 bytes of `keccak256(rlp([sender, nonce]))`.
pub fn create_address(sender: &Address, nonce: u64) -> Address {
    Address::from_slice(&keccak256(create_address_preimage(sender, nonce))[12..])
}

/// `0xff ++ sender ++ salt ++ keccak256(init_code)`, hashed into a `CREATE2`
/// address.
pub fn create2_address_preimage(sender: &Address, salt: &Word, init_code: &[u8]) -> Vec<u8> {
    let mut preimage = Vec::with_capacity(85);
    preimage.push(0xff);
    preimage.extend_from_slice(sender.as_bytes());
    preimage.extend_from_slice(&salt.to_be_bytes());
    preimage.extend_from_slice(&keccak256(init_code));
    preimage
}

pub fn create2_address(sender: &Address, salt: &Word, init_code: &[u8]) -> Address {
    Address::from_slice(&keccak256(create2_address_preimage(sender, salt, init_code))[12..])
}

/// All but one 64th of the available gas.
fn max_forwarded_gas(gas: u64) -> u64 {
    gas - gas / 64
}

impl Evm {
    /// Pushes the failure status of a call or create that never started a
    /// frame.
    fn abort_call(&mut self) -> Result<Step, ExecutionError> {
        self.frame.returndata.clear();
        self.frame.stack.push(Word::ZERO)?;
        self.frame.pc += 1;
        Ok(Step::Continue)
    }

    pub(crate) fn call(&mut self, op: Opcode) -> Result<Step, ExecutionError> {
        let (requested, target, value, args_offset, args_len, ret_offset, ret_len) = match op {
            Opcode::Call => {
                let [gas, to, value, ao, al, ro, rl] = self.frame.stack.pop_n()?;
                (gas, to, value, ao, al, ro, rl)
            }
            _ => {
                let [gas, to, ao, al, ro, rl] = self.frame.stack.pop_n()?;
                (gas, to, Word::ZERO, ao, al, ro, rl)
            }
        };
        let target = word_to_address(&target);
        self.frame.warm.insert(AccessKey::Account(target));
        let address = self.frame.address;

        if self.is_plain_transfer(op, &target) {
            self.frame.returndata.clear();
            let success = self.world.transfer(&address, &target, &value);
            if success && !value.is_zero() {
                self.world.mark_existing(target);
            }
            self.frame.stack.push(Word::from(success))?;
            self.frame.pc += 1;
            return Ok(Step::Continue);
        }

        let (args_offset, args_len) = memory_range(&args_offset, &args_len);
        let (ret_offset, ret_len) = memory_range(&ret_offset, &ret_len);
        self.frame.memory.expand(args_offset, args_len);
        self.frame.memory.expand(ret_offset, ret_len);

        if self.callers.len() + 1 > MAX_CALL_DEPTH || self.world.balance(&address) < value {
            log::debug!("{op} to {target:?} aborted at depth {}", self.depth());
            return self.abort_call();
        }

        let gas = word_to_u64_saturating(&requested).min(max_forwarded_gas(self.frame.gas));
        self.frame.gas -= gas;
        let stipend = if value.is_zero() { 0 } else { CALL_STIPEND };

        let snapshot = self.world.clone();
        if !value.is_zero() {
            self.world.transfer(&address, &target, &value);
            self.world.mark_existing(target);
        }

        let kind = if is_precompile(&target) {
            FrameKind::Precompile
        } else {
            match op {
                Opcode::Call => FrameKind::Call,
                Opcode::Delegatecall => FrameKind::DelegateCall,
                _ => FrameKind::StaticCall,
            }
        };
        let mut child = Frame::new(kind, self.world.code(&target).to_vec(), gas + stipend);
        child.code_address = target;
        (child.address, child.caller, child.value) = match op {
            Opcode::Delegatecall => (address, self.frame.caller, self.frame.value),
            _ => (target, address, value),
        };
        child.calldata = self.frame.memory.read(args_offset, args_len);
        child.snapshot = snapshot;
        child.warm = self.frame.warm.clone();
        child.transient = self.frame.transient.clone();
        child.return_offset = ret_offset;
        child.return_length = ret_len;
        child.log_checkpoint = self.logs.len();
        Ok(Step::Enter(Box::new(child)))
    }

    pub(crate) fn create(&mut self, op: Opcode) -> Result<Step, ExecutionError> {
        let [value, offset, len] = self.frame.stack.pop_n()?;
        let salt = match op {
            Opcode::Create2 => Some(self.frame.stack.pop()?),
            _ => None,
        };
        let (offset, len) = memory_range(&offset, &len);
        let init_code = self.frame.memory.read(offset, len);
        let sender = self.frame.address;

        if self.callers.len() + 1 > MAX_CALL_DEPTH || self.world.balance(&sender) < value {
            return self.abort_call();
        }
        let nonce = self.world.nonce(&sender);
        let Some(next_nonce) = nonce.checked_add(1) else {
            return self.abort_call();
        };
        self.world.account_mut(&sender).nonce = next_nonce;

        let address = match &salt {
            Some(salt) => create2_address(&sender, salt, &init_code),
            None => create_address(&sender, nonce),
        };
        self.frame.warm.insert(AccessKey::Account(address));
        let collision = self
            .world
            .account(&address)
            .is_some_and(|a| a.nonce != 0 || !a.code.is_empty());
        if collision {
            log::debug!("{op} collides with existing contract {address:?}");
            return self.abort_call();
        }

        let gas = max_forwarded_gas(self.frame.gas);
        self.frame.gas -= gas;

        let snapshot = self.world.clone();
        self.world.mark_existing(address);
        self.world.account_mut(&address).nonce = 1;
        self.world.transfer(&sender, &address, &value);

        let kind = if salt.is_some() {
            FrameKind::Create2
        } else {
            FrameKind::Create
        };
        let mut child = Frame::new(kind, init_code, gas);
        child.address = address;
        child.code_address = address;
        child.caller = sender;
        child.value = value;
        child.snapshot = snapshot;
        child.warm = self.frame.warm.clone();
        child.transient = self.frame.transient.clone();
        child.log_checkpoint = self.logs.len();
        Ok(Step::Enter(Box::new(child)))
    }

    /// Runs the current precompile frame to completion.
    pub(crate) fn run_precompile(&mut self) -> Outcome {
        let frame = &mut self.frame;
        let result = evaluate_precompile(&frame.code_address, frame.gas, &frame.calldata);
        frame.gas -= result.gas_used;
        frame.output = result.data;
        if result.success {
            Outcome::Success
        } else {
            Outcome::Error(ExecutionError::OutOfGas)
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_create_address() {
        let sender = Address::repeat_byte(0xaa);
        let mut preimage = vec![0xd6, 0x94];
        preimage.extend_from_slice(sender.as_bytes());
        preimage.push(0x80);
        let expected = Address::from_slice(&keccak256(&preimage)[12..]);
        assert_eq!(create_address(&sender, 0), expected);
        assert_ne!(create_address(&sender, 1), expected);
    }

    #[test]
    fn test_create_address_known_vector() {
        let sender = Address::from(hex!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0"));
        assert_eq!(
            create_address(&sender, 0),
            Address::from(hex!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"))
        );
        assert_eq!(
            create_address(&sender, 1),
            Address::from(hex!("343c43a37d37dff08ae8c4a11544c718abb4fcf8"))
        );
    }

    #[test]
    fn test_create2_address_known_vector() {
        // EIP-1014 example 1.
        assert_eq!(
            create2_address(&Address::zero(), &Word::ZERO, &[0x00]),
            Address::from(hex!("4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38"))
        );
    }
}
