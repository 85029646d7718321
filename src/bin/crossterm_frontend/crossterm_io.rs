use chip_8_vm::emulator::display::{Screen, EMPTY_SCREEN, SCREEN_HEIGHT, SCREEN_WIDTH};

use crossterm::event::KeyCode;
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue};
use std::io::{stdout, Stdout, Write};

/// Draws the CHIP-8 screen in the terminal, two columns per pixel.
/// Puts the terminal in raw mode on the alternate screen until dropped.
pub struct CrosstermOutput {
    stdout: Stdout,
    cells: Screen,
}

impl CrosstermOutput {
    pub fn new() -> crossterm::Result<CrosstermOutput> {
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide, Clear(ClearType::All))?;
        terminal::enable_raw_mode()?;

        let bottom = SCREEN_HEIGHT as u16 + 1;
        let right = 2 * SCREEN_WIDTH as u16 + 1;
        for y in 0..=bottom {
            for x in 0..=right {
                let c = match (x, y) {
                    (0, 0) => '┏',
                    (x, 0) if x == right => '┓',
                    (0, y) if y == bottom => '┗',
                    (x, y) if x == right && y == bottom => '┛',
                    (_, y) if y == 0 || y == bottom => '━',
                    (x, _) if x == 0 || x == right => '┃',
                    _ => continue,
                };
                queue!(stdout, cursor::MoveTo(x, y), Print(c))?;
            }
        }
        stdout.flush()?;

        Ok(CrosstermOutput {
            stdout,
            cells: EMPTY_SCREEN,
        })
    }

    /// Redraw the pixels that differ from what is on the terminal.
    pub fn refresh(&mut self, screen: &Screen) -> crossterm::Result<()> {
        for (y, row) in screen.iter().enumerate() {
            for (x, &state) in row.iter().enumerate() {
                if self.cells[y][x] == state {
                    continue;
                }
                self.cells[y][x] = state;
                queue!(
                    self.stdout,
                    cursor::MoveTo(2 * x as u16 + 1, y as u16 + 1),
                    Print(if state == 1 { "██" } else { "  " })
                )?;
            }
        }
        self.stdout.flush()?;
        Ok(())
    }
}

impl Drop for CrosstermOutput {
    fn drop(&mut self) {
        if let Err(err) = terminal::disable_raw_mode() {
            log::error!("Could not leave raw mode: {}", err);
        }
        if let Err(err) = execute!(self.stdout, LeaveAlternateScreen, cursor::Show) {
            log::error!("Could not restore the terminal: {}", err);
        }
    }
}

/// Map the left-hand block of a QWERTY keyboard onto the hex keypad:
///
/// ```text
/// 1 2 3 4        1 2 3 C
/// q w e r   ->   4 5 6 D
/// a s d f        7 8 9 E
/// z x c v        A 0 B F
/// ```
pub fn key_to_u8(key: KeyCode) -> Option<u8> {
    let c = match key {
        KeyCode::Char(c) => c.to_ascii_lowercase(),
        _ => return None,
    };
    let index = match c {
        '1' => 0x1,
        '2' => 0x2,
        '3' => 0x3,
        '4' => 0xC,
        'q' => 0x4,
        'w' => 0x5,
        'e' => 0x6,
        'r' => 0xD,
        'a' => 0x7,
        's' => 0x8,
        'd' => 0x9,
        'f' => 0xE,
        'z' => 0xA,
        'x' => 0x0,
        'c' => 0xB,
        'v' => 0xF,
        _ => return None,
    };
    Some(index)
}
