//! The 64x32 monochrome frame buffer and its dirty flag.

use std::fmt;

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

/// One byte per pixel, each either 0 or 1, indexed `[y][x]`.
pub type Screen = [[u8; SCREEN_WIDTH]; SCREEN_HEIGHT];
pub const EMPTY_SCREEN: Screen = [[0; SCREEN_WIDTH]; SCREEN_HEIGHT];

pub struct Display {
    screen: Screen,
    dirty: bool,
}

impl Display {
    /// A blank display, marked dirty so the first frame gets drawn.
    pub fn new() -> Display {
        Display {
            screen: EMPTY_SCREEN,
            dirty: true,
        }
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.screen[y % SCREEN_HEIGHT][x % SCREEN_WIDTH]
    }

    pub fn clear(&mut self) {
        self.screen = EMPTY_SCREEN;
        self.dirty = true;
    }

    /// XOR a sprite onto the screen with its top-left corner at (`x`, `y`),
    /// one byte per row, most significant bit leftmost.
    /// Pixels past the right or bottom edge wrap around.
    /// Returns whether any lit pixel was turned off.
    pub fn draw_sprite(&mut self, x: usize, y: usize, rows: &[u8]) -> bool {
        let mut any_collisions = false;
        for (dy, &row) in rows.iter().enumerate() {
            let py = (y + dy) % SCREEN_HEIGHT;
            for dx in 0..8 {
                if row >> (7 - dx) & 1 == 0 {
                    continue;
                }
                let pixel = &mut self.screen[py][(x + dx) % SCREEN_WIDTH];
                if *pixel == 1 {
                    any_collisions = true;
                }
                *pixel ^= 1;
            }
        }
        self.dirty = true;
        any_collisions
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Take a copy of the screen and clear the dirty flag.
    pub fn consume(&mut self) -> Screen {
        self.dirty = false;
        self.screen
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.screen {
            for c in row.iter() {
                write!(f, "{}", if *c == 1 { "#" } else { " " })?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
