//! The 4 KiB address space shared by the font and the loaded program.

use crate::emulator::error::LoadError;

pub const MEM_SIZE: usize = 4096;
pub const PROGRAM_START: u16 = 0x200;
pub const MAX_PROGRAM_SIZE: usize = MEM_SIZE - PROGRAM_START as usize;
pub const FONT_START: u16 = 0x000;

/// Bytes per font glyph.
pub const FONT_GLYPH_SIZE: u16 = 5;

pub const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Flat memory. Addresses wrap at 4096, so every access is in bounds.
pub struct Memory {
    bytes: [u8; MEM_SIZE],
}

impl Memory {
    /// Zeroed memory with the font at 0x000.
    pub fn new() -> Memory {
        let mut bytes = [0; MEM_SIZE];
        let font_start = FONT_START as usize;
        bytes[font_start..font_start + FONT.len()].copy_from_slice(&FONT);
        Memory { bytes }
    }

    /// Copy a program into memory at 0x200.
    /// Nothing is written if it does not fit.
    pub fn load(&mut self, program: &[u8]) -> Result<(), LoadError> {
        if program.len() > MAX_PROGRAM_SIZE {
            return Err(LoadError::CapacityExceeded {
                size: program.len(),
                max: MAX_PROGRAM_SIZE,
            });
        }
        let start = PROGRAM_START as usize;
        self.bytes[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.bytes[addr as usize % MEM_SIZE]
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.bytes[addr as usize % MEM_SIZE] = value;
    }

    /// Read a big-endian opcode. The second byte of an opcode at 0xFFF is 0x000.
    pub fn read_opcode(&self, addr: u16) -> (u8, u8) {
        (self.read(addr), self.read(addr.wrapping_add(1)))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

/// Address of the glyph for `digit`. Values above 0xF point past the font.
pub fn font_address(digit: u8) -> u16 {
    FONT_START + FONT_GLYPH_SIZE * digit as u16
}
