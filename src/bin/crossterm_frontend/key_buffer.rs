use std::time::{Duration, Instant};

use chip_8_vm::emulator::keypad::NUM_KEYS;

/// Terminals report key presses (and repeats) but never releases.
/// This keeps a keypad key held until `timeout` has passed since its last press.
pub struct KeyBuffer {
    timeout: Duration,
    pressed: [Option<Instant>; NUM_KEYS],
}

impl KeyBuffer {
    /// Create a new `KeyBuffer` that releases keys `timeout` after their last press.
    pub fn new(timeout: Duration) -> KeyBuffer {
        KeyBuffer {
            timeout,
            pressed: [None; NUM_KEYS],
        }
    }

    /// Record a press. Returns true if the key was not already held.
    pub fn press(&mut self, key: u8, now: Instant) -> bool {
        let slot = &mut self.pressed[(key & 0xF) as usize];
        let newly_pressed = slot.is_none();
        *slot = Some(now);
        newly_pressed
    }

    /// Forget every key whose last press is older than the timeout and return them.
    pub fn release_expired(&mut self, now: Instant) -> Vec<u8> {
        let timeout = self.timeout;
        let mut released = Vec::new();
        for (key, slot) in self.pressed.iter_mut().enumerate() {
            if let Some(at) = *slot {
                if now.duration_since(at) >= timeout {
                    *slot = None;
                    released.push(key as u8);
                }
            }
        }
        released
    }
}
