//! Small helpers that are not specific to any one part of the machine.

pub mod bit_splitter;
