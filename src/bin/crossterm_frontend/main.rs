use std::error::Error;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use structopt::StructOpt;

use chip_8_vm::emulator::timers::TIMER_HZ;
use chip_8_vm::emulator::{Emulator, StepStatus};

mod crossterm_io;
mod key_buffer;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm_io::{key_to_u8, CrosstermOutput};
use key_buffer::KeyBuffer;

/// How long a key stays down after the terminal last reported it.
const KEY_HOLD: Duration = Duration::from_millis(250);

/// The program options.
#[derive(StructOpt)]
struct Opt {
    /// The program to execute
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    /// Instructions executed per second
    #[structopt(long, default_value = "600")]
    clock: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // Get configuration and load the program before touching the terminal
    let opt = Opt::from_args();
    log::info!("Executing {:?} at {} Hz", &opt.input, opt.clock);
    let mut emulator = Emulator::new();
    emulator.load_file(&opt.input)?;

    let mut output = CrosstermOutput::new()?;
    let mut keys = KeyBuffer::new(KEY_HOLD);
    let frame = Duration::from_secs(1) / TIMER_HZ;
    let steps_per_frame = (opt.clock / TIMER_HZ).max(1);

    loop {
        let frame_start = Instant::now();

        // Input
        while event::poll(Duration::from_secs(0))? {
            match event::read()? {
                Event::Key(KeyEvent { code: KeyCode::Esc, .. }) => return Ok(()),
                Event::Key(KeyEvent {
                    code: KeyCode::Char('c'),
                    modifiers,
                }) if modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                Event::Key(key_event) => {
                    if let Some(key) = key_to_u8(key_event.code) {
                        if keys.press(key, frame_start) {
                            emulator.set_key(key, true)?;
                        }
                    }
                }
                _ => {}
            }
        }
        for key in keys.release_expired(frame_start) {
            emulator.set_key(key, false)?;
        }

        // CPU, then timers, at their own rates
        for _ in 0..steps_per_frame {
            match emulator.step() {
                Ok(StepStatus::Continue) => {}
                Ok(StepStatus::WaitingForKey) => break,
                Err(err) => {
                    log::error!("Halting: {}", err);
                    drop(output);
                    return Err(err.into());
                }
            }
        }
        emulator.tick();

        // Output
        if emulator.is_dirty() {
            output.refresh(&emulator.consume_dirty())?;
        }

        if let Some(rest) = frame.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }
}
