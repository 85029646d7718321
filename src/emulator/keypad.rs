use crate::emulator::error::KeyError;

pub const NUM_KEYS: usize = 16;

/// The hexadecimal keypad. Written by the host, read by the program.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; NUM_KEYS],
}

impl Keypad {
    pub fn set(&mut self, key: u8, pressed: bool) -> Result<(), KeyError> {
        let slot = self
            .keys
            .get_mut(key as usize)
            .ok_or(KeyError::InvalidKey(key))?;
        *slot = pressed;
        Ok(())
    }

    /// Whether `key` is down. Only the low nibble is used, as with `EX9E`/`EXA1`.
    pub fn is_down(&self, key: u8) -> bool {
        self.keys[(key & 0xF) as usize]
    }

    /// The lowest key currently held, if any.
    pub fn first_down(&self) -> Option<u8> {
        self.keys.iter().position(|down| *down).map(|key| key as u8)
    }
}
