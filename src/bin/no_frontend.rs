use std::error::Error;
use std::path::PathBuf;

use structopt::StructOpt;

use chip_8_vm::emulator::timers::TIMER_HZ;
use chip_8_vm::emulator::{Emulator, StepStatus};

/// Runs a program without any input and prints the final screen.
#[derive(StructOpt)]
struct Opt {
    /// The program to execute
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    /// Number of instructions to execute
    #[structopt(long, default_value = "1000")]
    cycles: u64,

    /// Instructions per second, used to pace the 60 Hz timers
    #[structopt(long, default_value = "600")]
    clock: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    // Get configuration and read input file
    let opt = Opt::from_args();
    log::info!("Executing {:?}", &opt.input);
    let mut emulator = Emulator::new();
    emulator.load_file(&opt.input)?;

    let steps_per_tick = u64::from((opt.clock / TIMER_HZ).max(1));
    for cycle in 1..=opt.cycles {
        match emulator.step() {
            Ok(StepStatus::Continue) => {}
            Ok(StepStatus::WaitingForKey) => {
                log::info!("Waiting for a key after {} cycles, stopping", cycle);
                break;
            }
            Err(err) => {
                log::error!("Halting after {} cycles: {}", cycle, err);
                print!("{}", emulator.display());
                return Err(err.into());
            }
        }
        if cycle % steps_per_tick == 0 {
            emulator.tick();
        }
    }

    if emulator.unknown_opcodes() > 0 {
        log::warn!("Skipped {} unknown opcodes", emulator.unknown_opcodes());
    }
    print!("{}", emulator.display());

    Ok(())
}
