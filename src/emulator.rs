//! The virtual machine and its parts.

pub mod display;
pub mod emulator;
pub mod error;
pub mod instruction;
pub mod keypad;
pub mod memory;
pub mod stack;
pub mod timers;

pub use self::emulator::{Emulator, StepStatus};
pub use self::error::{DecodeError, ExecutionError, KeyError, LoadError};
