//! Everything that can go wrong while loading or running a program.

use thiserror::Error;

/// Failure to place a program into memory.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("program is {size} bytes, but at most {max} bytes fit in memory")]
    CapacityExceeded { size: usize, max: usize },

    #[error("could not read program: {0}")]
    Io(#[from] std::io::Error),
}

/// A fault raised by a single instruction.
/// The step that raised it has not touched any other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("stack overflow: call at {address:#05x} exceeds 16 nested subroutines")]
    StackOverflow { address: u16 },

    #[error("stack underflow: return at {address:#05x} with an empty stack")]
    StackUnderflow { address: u16 },
}

/// An opcode that does not correspond to any instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unimplemented opcode {0:#06x}")]
    UnimplementedOpcode(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("key {0:#x} is not on the keypad (0x0..=0xF)")]
    InvalidKey(u8),
}
