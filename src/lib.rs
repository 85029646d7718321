/*!

A CHIP-8 virtual machine as specified at https://en.wikipedia.org/wiki/CHIP-8.

# Crossterm Frontend

If you want to try the emulator on some programs, there is a ready-to-use implementation
you can run by using `cargo run --release --bin crossterm_frontend -- <program>`.
The keypad is mapped onto the left-hand block of the keyboard:

```text
1 2 3 4        1 2 3 C
q w e r   ->   4 5 6 D
a s d f        7 8 9 E
z x c v        A 0 B F
```

Press `Esc` to quit.

# Library

The machine owns its memory, registers, stack, timers, keypad and screen.
The host drives it: `step()` at the CPU rate, `tick()` at 60 Hz,
`set_key()` when input arrives and `consume_dirty()` when it wants to redraw.

```rust
use chip_8_vm::emulator::{Emulator, StepStatus};

let mut emulator = Emulator::new();

// Load a program at address 0x200.
let clear_display = [0x00, 0xE0];
emulator.load(&clear_display)?;
assert_eq!(emulator.step()?, StepStatus::Continue); // Will now clear the display

if emulator.is_dirty() {
    let screen = emulator.consume_dirty();
    assert!(screen.iter().flatten().all(|pixel| *pixel == 0));
}
emulator.tick();
# Ok::<(), Box<dyn std::error::Error>>(())
```

Alternatively, you can experiment by executing instructions manually.

```rust
use chip_8_vm::emulator::Emulator;
use chip_8_vm::emulator::instruction::{Instruction, Reg, Const, Addr};

let mut emulator = Emulator::new();

// Execute instructions manually
emulator.execute(Instruction::ClearScreen)?;

// Or many sequentially
emulator.execute_many(&[
    Instruction::Goto(Addr(0x250)),
    Instruction::SetRegToConst(Reg(0xA), Const(35)),
    Instruction::SetRegToReg(Reg(0xB), Reg(0xA))
])?;
assert_eq!(emulator.register(0xB), 35);
# Ok::<(), chip_8_vm::emulator::ExecutionError>(())
```

## Waiting for keys

`FX0A` never blocks. The step returns `StepStatus::WaitingForKey` and leaves the
program counter on the instruction, so the host can keep rendering and polling
input and simply step again.

```rust
use chip_8_vm::emulator::{Emulator, StepStatus};

let mut emulator = Emulator::new();
emulator.load(&[0xF3, 0x0A])?; // V3 = next key

assert_eq!(emulator.step()?, StepStatus::WaitingForKey);
emulator.set_key(0xE, true)?;
assert_eq!(emulator.step()?, StepStatus::Continue);
assert_eq!(emulator.register(3), 0xE);
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

pub mod emulator;
pub mod util;
