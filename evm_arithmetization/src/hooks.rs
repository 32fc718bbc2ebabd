use crate::error::ExecutionError;
use crate::interpreter::Evm;
use crate::opcodes::Opcode;

/// Observer of the interpreter's lifecycle. Every method receives the
/// interpreter in the state described on it; all default to doing nothing.
pub trait ExecutionHooks {
    /// The block header is loaded, no transaction has started.
    fn start_block(&mut self, _evm: &Evm) {}

    /// The transaction's top frame is current and the sender has been
    /// charged.
    fn start_transaction(&mut self, _evm: &Evm) {}

    /// A sub call or create frame has just become current.
    fn start_call(&mut self, _evm: &Evm) {}

    /// Gas has been checked but not yet deducted; stack and memory are
    /// untouched.
    fn before_opcode(&mut self, _evm: &Evm, _op: Opcode) {}

    /// The opcode has taken effect in the same frame.
    fn after_opcode(&mut self, _evm: &Evm, _op: Opcode) {}

    /// The opcode cannot be paid for. Nothing has been executed.
    fn gas_error(&mut self, _evm: &Evm, _op: Opcode) {}

    /// Any fault other than running out of gas.
    fn execution_error(&mut self, _evm: &Evm, _op: Opcode, _error: ExecutionError) {}

    /// The current frame has halted and its status is set, but it is still
    /// current.
    fn leave_call(&mut self, _evm: &Evm) {}

    /// The caller is current again with the call's status pushed.
    fn end_call(&mut self, _evm: &Evm) {}

    fn end_transaction(&mut self, _evm: &Evm) {}

    fn end_block(&mut self, _evm: &Evm) {}
}

impl ExecutionHooks for () {}
