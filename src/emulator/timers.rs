/// Rate at which the host is expected to call `tick`.
pub const TIMER_HZ: u32 = 60;

/// The delay and sound countdowns. Both stop at zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    pub delay: u8,
    pub sound: u8,
}

impl Timers {
    pub fn tick(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
    }
}
