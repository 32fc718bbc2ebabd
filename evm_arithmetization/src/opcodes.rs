//! The enumerated opcode set, with the static properties the interpreter
//! and the fixed opcode table need.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opcode {
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    Sdiv,
    Mod,
    Smod,
    Addmod,
    Mulmod,
    Exp,
    Signextend,
    Lt,
    Gt,
    Slt,
    Sgt,
    Eq,
    Iszero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
    Keccak256,
    Address,
    Balance,
    Origin,
    Caller,
    Callvalue,
    Calldataload,
    Calldatasize,
    Calldatacopy,
    Codesize,
    Codecopy,
    Gasprice,
    Extcodesize,
    Extcodecopy,
    Returndatasize,
    Returndatacopy,
    Extcodehash,
    Blockhash,
    Coinbase,
    Timestamp,
    Number,
    Difficulty,
    Gaslimit,
    Chainid,
    Selfbalance,
    Basefee,
    Blobhash,
    Blobbasefee,
    Pop,
    Mload,
    Mstore,
    Mstore8,
    Sload,
    Sstore,
    Jump,
    Jumpi,
    Pc,
    Msize,
    Gas,
    Jumpdest,
    Tload,
    Tstore,
    Mcopy,
    /// `PUSH0..=PUSH32`, holding the immediate length.
    Push(u8),
    /// `DUP1..=DUP16`.
    Dup(u8),
    /// `SWAP1..=SWAP16`.
    Swap(u8),
    /// `LOG0..=LOG4`, holding the topic count.
    Log(u8),
    Create,
    Call,
    Return,
    Delegatecall,
    Create2,
    Staticcall,
    Revert,
    Invalid,
    Selfdestruct,
}

impl Opcode {
    /// Decodes a bytecode byte. Unassigned bytes (including `CALLCODE`,
    /// which is not supported) yield `None` and execute as `INVALID`.
    pub fn from_byte(byte: u8) -> Option<Self> {
        use Opcode::*;
        Some(match byte {
            0x00 => Stop,
            0x01 => Add,
            0x02 => Mul,
            0x03 => Sub,
            0x04 => Div,
            0x05 => Sdiv,
            0x06 => Mod,
            0x07 => Smod,
            0x08 => Addmod,
            0x09 => Mulmod,
            0x0a => Exp,
            0x0b => Signextend,
            0x10 => Lt,
            0x11 => Gt,
            0x12 => Slt,
            0x13 => Sgt,
            0x14 => Eq,
            0x15 => Iszero,
            0x16 => And,
            0x17 => Or,
            0x18 => Xor,
            0x19 => Not,
            0x1a => Byte,
            0x1b => Shl,
            0x1c => Shr,
            0x1d => Sar,
            0x20 => Keccak256,
            0x30 => Address,
            0x31 => Balance,
            0x32 => Origin,
            0x33 => Caller,
            0x34 => Callvalue,
            0x35 => Calldataload,
            0x36 => Calldatasize,
            0x37 => Calldatacopy,
            0x38 => Codesize,
            0x39 => Codecopy,
            0x3a => Gasprice,
            0x3b => Extcodesize,
            0x3c => Extcodecopy,
            0x3d => Returndatasize,
            0x3e => Returndatacopy,
            0x3f => Extcodehash,
            0x40 => Blockhash,
            0x41 => Coinbase,
            0x42 => Timestamp,
            0x43 => Number,
            0x44 => Difficulty,
            0x45 => Gaslimit,
            0x46 => Chainid,
            0x47 => Selfbalance,
            0x48 => Basefee,
            0x49 => Blobhash,
            0x4a => Blobbasefee,
            0x50 => Pop,
            0x51 => Mload,
            0x52 => Mstore,
            0x53 => Mstore8,
            0x54 => Sload,
            0x55 => Sstore,
            0x56 => Jump,
            0x57 => Jumpi,
            0x58 => Pc,
            0x59 => Msize,
            0x5a => Gas,
            0x5b => Jumpdest,
            0x5c => Tload,
            0x5d => Tstore,
            0x5e => Mcopy,
            0x5f..=0x7f => Push(byte - 0x5f),
            0x80..=0x8f => Dup(byte - 0x7f),
            0x90..=0x9f => Swap(byte - 0x8f),
            0xa0..=0xa4 => Log(byte - 0xa0),
            0xf0 => Create,
            0xf1 => Call,
            0xf3 => Return,
            0xf4 => Delegatecall,
            0xf5 => Create2,
            0xfa => Staticcall,
            0xfd => Revert,
            0xfe => Invalid,
            0xff => Selfdestruct,
            _ => return None,
        })
    }

    pub fn byte(&self) -> u8 {
        use Opcode::*;
        match *self {
            Stop => 0x00,
            Add => 0x01,
            Mul => 0x02,
            Sub => 0x03,
            Div => 0x04,
            Sdiv => 0x05,
            Mod => 0x06,
            Smod => 0x07,
            Addmod => 0x08,
            Mulmod => 0x09,
            Exp => 0x0a,
            Signextend => 0x0b,
            Lt => 0x10,
            Gt => 0x11,
            Slt => 0x12,
            Sgt => 0x13,
            Eq => 0x14,
            Iszero => 0x15,
            And => 0x16,
            Or => 0x17,
            Xor => 0x18,
            Not => 0x19,
            Byte => 0x1a,
            Shl => 0x1b,
            Shr => 0x1c,
            Sar => 0x1d,
            Keccak256 => 0x20,
            Address => 0x30,
            Balance => 0x31,
            Origin => 0x32,
            Caller => 0x33,
            Callvalue => 0x34,
            Calldataload => 0x35,
            Calldatasize => 0x36,
            Calldatacopy => 0x37,
            Codesize => 0x38,
            Codecopy => 0x39,
            Gasprice => 0x3a,
            Extcodesize => 0x3b,
            Extcodecopy => 0x3c,
            Returndatasize => 0x3d,
            Returndatacopy => 0x3e,
            Extcodehash => 0x3f,
            Blockhash => 0x40,
            Coinbase => 0x41,
            Timestamp => 0x42,
            Number => 0x43,
            Difficulty => 0x44,
            Gaslimit => 0x45,
            Chainid => 0x46,
            Selfbalance => 0x47,
            Basefee => 0x48,
            Blobhash => 0x49,
            Blobbasefee => 0x4a,
            Pop => 0x50,
            Mload => 0x51,
            Mstore => 0x52,
            Mstore8 => 0x53,
            Sload => 0x54,
            Sstore => 0x55,
            Jump => 0x56,
            Jumpi => 0x57,
            Pc => 0x58,
            Msize => 0x59,
            Gas => 0x5a,
            Jumpdest => 0x5b,
            Tload => 0x5c,
            Tstore => 0x5d,
            Mcopy => 0x5e,
            Push(n) => 0x5f + n,
            Dup(n) => 0x7f + n,
            Swap(n) => 0x8f + n,
            Log(n) => 0xa0 + n,
            Create => 0xf0,
            Call => 0xf1,
            Return => 0xf3,
            Delegatecall => 0xf4,
            Create2 => 0xf5,
            Staticcall => 0xfa,
            Revert => 0xfd,
            Invalid => 0xfe,
            Selfdestruct => 0xff,
        }
    }

    /// Number of words the opcode pops.
    pub fn stack_inputs(&self) -> usize {
        use Opcode::*;
        match *self {
            Stop | Jumpdest | Invalid | Push(_) => 0,
            Address | Origin | Caller | Callvalue | Calldatasize | Codesize | Gasprice
            | Returndatasize | Coinbase | Timestamp | Number | Difficulty | Gaslimit | Chainid
            | Selfbalance | Basefee | Blobbasefee | Pc | Msize | Gas => 0,
            Iszero | Not | Balance | Calldataload | Extcodesize | Extcodehash | Blockhash
            | Blobhash | Pop | Mload | Sload | Jump | Tload | Selfdestruct => 1,
            Add | Mul | Sub | Div | Sdiv | Mod | Smod | Exp | Signextend | Lt | Gt | Slt | Sgt
            | Eq | And | Or | Xor | Byte | Shl | Shr | Sar | Keccak256 | Mstore | Mstore8
            | Sstore | Jumpi | Tstore | Return | Revert => 2,
            Addmod | Mulmod | Calldatacopy | Codecopy | Returndatacopy | Mcopy | Create => 3,
            Extcodecopy | Create2 => 4,
            Delegatecall | Staticcall => 6,
            Call => 7,
            Dup(n) => n as usize,
            Swap(n) => n as usize + 1,
            Log(n) => n as usize + 2,
        }
    }

    /// Number of words the opcode leaves on the stack in place of its inputs.
    pub fn stack_outputs(&self) -> usize {
        use Opcode::*;
        match *self {
            Stop | Jumpdest | Invalid | Calldatacopy | Codecopy | Extcodecopy | Returndatacopy
            | Pop | Mstore | Mstore8 | Sstore | Jump | Jumpi | Tstore | Mcopy | Log(_) | Return
            | Revert | Selfdestruct => 0,
            Dup(n) => n as usize + 1,
            Swap(n) => n as usize + 1,
            _ => 1,
        }
    }

    /// Gas charged before any dynamic component.
    pub fn static_gas(&self) -> u64 {
        use Opcode::*;
        match *self {
            Stop | Return | Revert | Invalid | Call | Delegatecall | Staticcall | Sstore => 0,
            Jumpdest => 1,
            Address | Origin | Caller | Callvalue | Calldatasize | Codesize | Gasprice
            | Returndatasize | Coinbase | Timestamp | Number | Difficulty | Gaslimit | Chainid
            | Basefee | Blobbasefee | Pop | Pc | Msize | Gas | Push(0) => 2,
            Add | Sub | Lt | Gt | Slt | Sgt | Eq | Iszero | And | Or | Xor | Not | Byte | Shl
            | Shr | Sar | Calldataload | Calldatacopy | Codecopy | Returndatacopy | Blobhash
            | Mload | Mstore | Mstore8 | Mcopy | Push(_) | Dup(_) | Swap(_) => 3,
            Mul | Div | Sdiv | Mod | Smod | Signextend | Selfbalance => 5,
            Addmod | Mulmod | Jump => 8,
            Exp | Jumpi => 10,
            Blockhash => 20,
            Keccak256 => 30,
            Balance | Extcodesize | Extcodecopy | Extcodehash | Sload | Tload | Tstore => 100,
            Log(n) => 375 + 375 * n as u64,
            Selfdestruct => 5000,
            Create | Create2 => 32000,
        }
    }

    /// Length of the immediate following the opcode byte.
    pub fn immediate_len(&self) -> usize {
        match *self {
            Opcode::Push(n) => n as usize,
            _ => 0,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Opcode::Call | Opcode::Delegatecall | Opcode::Staticcall)
    }

    pub fn is_create(&self) -> bool {
        matches!(self, Opcode::Create | Opcode::Create2)
    }

    /// Number in the zkEVM opcode space, shared with [`VirtualOpcode`].
    pub fn number(&self) -> u16 {
        self.byte() as u16
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Push(n) => write!(f, "PUSH{n}"),
            Opcode::Dup(n) => write!(f, "DUP{n}"),
            Opcode::Swap(n) => write!(f, "SWAP{n}"),
            Opcode::Log(n) => write!(f, "LOG{n}"),
            other => f.write_str(&format!("{other:?}").to_uppercase()),
        }
    }
}

/// Pseudo-opcodes that only exist in the zkEVM trace: fault rows, padding and
/// the block/transaction/call boundary markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum VirtualOpcode {
    Err0 = 0x100,
    Err1,
    Padding,
    StartBlock,
    StartTransaction,
    StartCall,
    EndCall,
    EndTransaction,
    EndBlock,
}

impl VirtualOpcode {
    pub const ALL: [VirtualOpcode; 9] = [
        VirtualOpcode::Err0,
        VirtualOpcode::Err1,
        VirtualOpcode::Padding,
        VirtualOpcode::StartBlock,
        VirtualOpcode::StartTransaction,
        VirtualOpcode::StartCall,
        VirtualOpcode::EndCall,
        VirtualOpcode::EndTransaction,
        VirtualOpcode::EndBlock,
    ];

    pub fn number(&self) -> u16 {
        *self as u16
    }
}

/// Names of the fixed opcode table columns, in the order of
/// [`opcode_table`].
pub const OPCODE_TABLE_COLUMNS: [&str; 5] = [
    "opcode",
    "is_defined",
    "stack_inputs",
    "stack_outputs",
    "static_gas",
];

/// Fixed table describing every byte and virtual opcode, one column per
/// entry of [`OPCODE_TABLE_COLUMNS`].
pub fn opcode_table() -> Vec<Vec<u64>> {
    let mut columns = vec![vec![]; OPCODE_TABLE_COLUMNS.len()];
    let mut push_row = |row: [u64; 5]| {
        for (column, value) in columns.iter_mut().zip(row) {
            column.push(value);
        }
    };
    for byte in 0..=u8::MAX {
        match Opcode::from_byte(byte) {
            Some(op) => push_row([
                op.number() as u64,
                1,
                op.stack_inputs() as u64,
                op.stack_outputs() as u64,
                op.static_gas(),
            ]),
            None => push_row([byte as u64, 0, 0, 0, 0]),
        }
    }
    for op in VirtualOpcode::ALL {
        push_row([op.number() as u64, 1, 0, 0, 0]);
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_round_trip() {
        for byte in 0..=u8::MAX {
            if let Some(op) = Opcode::from_byte(byte) {
                assert_eq!(op.byte(), byte, "{op}");
            }
        }
        assert_eq!(Opcode::from_byte(0xf2), None);
        assert_eq!(Opcode::from_byte(0x0c), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(Opcode::Push(32).to_string(), "PUSH32");
        assert_eq!(Opcode::Returndatacopy.to_string(), "RETURNDATACOPY");
        assert_eq!(Opcode::Keccak256.to_string(), "KECCAK256");
        assert_eq!(Opcode::Dup(16).to_string(), "DUP16");
    }

    #[test]
    fn test_stack_shapes() {
        assert_eq!(Opcode::Dup(3).stack_inputs(), 3);
        assert_eq!(Opcode::Dup(3).stack_outputs(), 4);
        assert_eq!(Opcode::Swap(1).stack_inputs(), 2);
        assert_eq!(Opcode::Log(4).stack_inputs(), 6);
        assert_eq!(Opcode::Call.stack_inputs(), 7);
        assert_eq!(Opcode::Push(0).static_gas(), 2);
        assert_eq!(Opcode::Push(1).static_gas(), 3);
    }

    #[test]
    fn test_opcode_table_shape() {
        let table = opcode_table();
        assert_eq!(table.len(), OPCODE_TABLE_COLUMNS.len());
        assert!(table.iter().all(|c| c.len() == 256 + VirtualOpcode::ALL.len()));
        assert_eq!(table[0][0x100], VirtualOpcode::Err0.number() as u64);
        assert_eq!(table[4][0x01], 3);
    }
}
