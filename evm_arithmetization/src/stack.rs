use crate::error::ExecutionError;
use crate::word::Word;

/// Maximum number of words an EVM stack may hold.
pub const MAX_STACK_SIZE: usize = 1024;

/// The LIFO operand stack of a call frame. The top of the stack is the last
/// element of the backing vector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stack {
    items: Vec<Word>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Checks that an opcode popping `inputs` words and pushing `outputs`
    /// words fits on the stack.
    pub fn check(&self, inputs: usize, outputs: usize) -> Result<(), ExecutionError> {
        if self.items.len() < inputs {
            return Err(ExecutionError::StackUnderflow);
        }
        if self.items.len() - inputs + outputs > MAX_STACK_SIZE {
            return Err(ExecutionError::StackOverflow);
        }
        Ok(())
    }

    pub fn push(&mut self, value: Word) -> Result<(), ExecutionError> {
        if self.items.len() == MAX_STACK_SIZE {
            return Err(ExecutionError::StackOverflow);
        }
        self.items.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Word, ExecutionError> {
        self.items.pop().ok_or(ExecutionError::StackUnderflow)
    }

    /// Pops `N` words, the former top of the stack first.
    pub fn pop_n<const N: usize>(&mut self) -> Result<[Word; N], ExecutionError> {
        if self.items.len() < N {
            return Err(ExecutionError::StackUnderflow);
        }
        let mut out = [Word::ZERO; N];
        for slot in out.iter_mut() {
            *slot = self.pop()?;
        }
        Ok(out)
    }

    /// Word at `depth` below the top; `peek(0)` is the top.
    pub fn peek(&self, depth: usize) -> Result<Word, ExecutionError> {
        self.items
            .len()
            .checked_sub(depth + 1)
            .map(|i| self.items[i])
            .ok_or(ExecutionError::StackUnderflow)
    }

    /// `DUPn` with `n` in `1..=16`.
    pub fn dup(&mut self, n: usize) -> Result<(), ExecutionError> {
        let value = self.peek(n - 1)?;
        self.push(value)
    }

    /// `SWAPn` with `n` in `1..=16`.
    pub fn swap(&mut self, n: usize) -> Result<(), ExecutionError> {
        let len = self.items.len();
        if len <= n {
            return Err(ExecutionError::StackUnderflow);
        }
        self.items.swap(len - 1, len - 1 - n);
        Ok(())
    }

    /// Bottom-to-top view of the stack.
    pub fn as_slice(&self) -> &[Word] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_order() -> anyhow::Result<()> {
        let mut stack = Stack::new();
        stack.push(Word::from(1u64))?;
        stack.push(Word::from(2u64))?;
        stack.push(Word::from(3u64))?;
        assert_eq!(stack.peek(0)?, Word::from(3u64));
        let [a, b] = stack.pop_n::<2>()?;
        assert_eq!((a, b), (Word::from(3u64), Word::from(2u64)));
        assert_eq!(stack.len(), 1);
        Ok(())
    }

    #[test]
    fn test_dup_swap() -> anyhow::Result<()> {
        let mut stack = Stack::new();
        for i in 1..=3u64 {
            stack.push(Word::from(i))?;
        }
        stack.dup(3)?;
        assert_eq!(stack.peek(0)?, Word::from(1u64));
        stack.swap(3)?;
        assert_eq!(stack.peek(0)?, Word::from(1u64));
        assert_eq!(stack.peek(3)?, Word::from(1u64));
        assert_eq!(stack.swap(4), Err(ExecutionError::StackUnderflow));
        Ok(())
    }

    #[test]
    fn test_overflow_and_underflow() -> anyhow::Result<()> {
        let mut stack = Stack::new();
        assert_eq!(stack.pop(), Err(ExecutionError::StackUnderflow));
        assert_eq!(stack.check(1, 1), Err(ExecutionError::StackUnderflow));
        for _ in 0..MAX_STACK_SIZE {
            stack.push(Word::ZERO)?;
        }
        assert_eq!(stack.push(Word::ZERO), Err(ExecutionError::StackOverflow));
        assert_eq!(stack.check(0, 1), Err(ExecutionError::StackOverflow));
        assert!(stack.check(2, 1).is_ok());
        Ok(())
    }
}
