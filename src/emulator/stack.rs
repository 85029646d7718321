/// Maximum number of nested subroutine calls.
pub const STACK_SIZE: usize = 16;

/// Return addresses for `CALL`/`RET`, bounded at 16 entries.
#[derive(Debug, Default)]
pub struct Stack {
    addresses: Vec<u16>,
}

impl Stack {
    pub fn new() -> Stack {
        Stack {
            addresses: Vec::with_capacity(STACK_SIZE),
        }
    }

    /// Push a return address. Returns `false`, leaving the stack alone, when full.
    pub fn push(&mut self, addr: u16) -> bool {
        if self.addresses.len() == STACK_SIZE {
            return false;
        }
        self.addresses.push(addr);
        true
    }

    pub fn pop(&mut self) -> Option<u16> {
        self.addresses.pop()
    }

    pub fn depth(&self) -> usize {
        self.addresses.len()
    }
}
