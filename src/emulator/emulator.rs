//! The CHIP-8 emulator as described at https://en.wikipedia.org/wiki/CHIP-8#Virtual_machine_description.

use std::path::Path;

use crate::emulator::display::{Display, Screen};
use crate::emulator::error::{ExecutionError, KeyError, LoadError};
use crate::emulator::instruction::*;
use crate::emulator::keypad::Keypad;
use crate::emulator::memory::{font_address, Memory, MEM_SIZE, PROGRAM_START};
use crate::emulator::stack::Stack;
use crate::emulator::timers::Timers;

pub const NUM_REGISTERS: usize = 16;
const FLAG: usize = 0xF;

/// What the machine is doing after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Continue,
    /// Parked on `FX0A` until a key is down. Step again once one is.
    WaitingForKey,
}

pub struct Emulator {
    memory: Memory,
    registers: [u8; NUM_REGISTERS],
    timers: Timers,
    i: u16,
    program_counter: u16,
    stack: Stack,
    keypad: Keypad,
    display: Display,

    unknown_opcodes: u64,
    waiting_for_key: bool,
}

impl Emulator {
    /// Create a new emulator with the font loaded and the program counter at 0x200.
    pub fn new() -> Emulator {
        Emulator {
            memory: Memory::new(),
            registers: [0; NUM_REGISTERS],
            timers: Timers::default(),
            i: 0,
            program_counter: PROGRAM_START,
            stack: Stack::new(),
            keypad: Keypad::default(),
            display: Display::new(),

            unknown_opcodes: 0,
            waiting_for_key: false,
        }
    }

    /// Copy a program into memory at 0x200.
    /// On failure the emulator is left exactly as it was.
    pub fn load(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.memory.load(program)?;
        log::debug!("Loaded {} bytes at {:#05x}", program.len(), PROGRAM_START);
        Ok(())
    }

    /// Read a program file and load it.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LoadError> {
        let program = std::fs::read(path)?;
        self.load(&program)
    }

    /// Fetch the instruction at the program counter, advance past it and execute it.
    ///
    /// Unknown opcodes are skipped with a warning and counted in `unknown_opcodes`.
    /// Timers are not touched; see `tick`.
    pub fn step(&mut self) -> Result<StepStatus, ExecutionError> {
        let address = self.program_counter;
        self.waiting_for_key = false;
        let (left, right) = self.memory.read_opcode(address);
        self.program_counter = next(address);

        let instruction = match Instruction::from_two_u8(left, right) {
            Ok(instruction) => instruction,
            Err(err) => {
                self.unknown_opcodes += 1;
                log::warn!("{} at {:#05x}, skipping", err, address);
                return Ok(StepStatus::Continue);
            }
        };
        log::trace!("{:#05x}: {}", address, instruction);

        let status = self.execute_at(address, instruction)?;
        if status == StepStatus::WaitingForKey {
            // Fetch the same instruction again next step.
            self.program_counter = address;
        }
        Ok(status)
    }

    /// Count both timers down by one. Call this at 60 Hz.
    pub fn tick(&mut self) {
        self.timers.tick();
    }

    /// Execute a single instruction as if it sat at the program counter,
    /// without fetching or advancing past it.
    pub fn execute(&mut self, instruction: Instruction) -> Result<StepStatus, ExecutionError> {
        self.execute_at(self.program_counter, instruction)
    }

    /// Execute instructions in order, stopping at the first fault.
    pub fn execute_many(&mut self, instructions: &[Instruction]) -> Result<(), ExecutionError> {
        for instruction in instructions {
            self.execute(*instruction)?;
        }
        Ok(())
    }

    fn execute_at(
        &mut self,
        address: u16,
        instruction: Instruction,
    ) -> Result<StepStatus, ExecutionError> {
        match instruction {
            // Clear the screen
            Instruction::ClearScreen => self.display.clear(),

            // Return to the previous call site via the stack.
            Instruction::Return => {
                self.program_counter = self
                    .stack
                    .pop()
                    .ok_or(ExecutionError::StackUnderflow { address })?;
            }

            // Go to a specific memory address
            Instruction::Goto(Addr(addr)) => {
                self.program_counter = addr;
            }

            // Store the current address on the stack, then jump to the specified address
            Instruction::Call(Addr(addr)) => {
                if !self.stack.push(self.program_counter) {
                    return Err(ExecutionError::StackOverflow { address });
                }
                self.program_counter = addr;
            }

            // If the register equals the constant, skip the next instruction
            Instruction::IfRegEqConst(Reg(x), Const(n)) => {
                self.skip_if(self.reg(x) == n);
            }

            Instruction::IfRegNeqConst(Reg(x), Const(n)) => {
                self.skip_if(self.reg(x) != n);
            }

            Instruction::IfRegEqReg(Reg(x), Reg(y)) => {
                self.skip_if(self.reg(x) == self.reg(y));
            }

            Instruction::SetRegToConst(Reg(x), Const(n)) => {
                self.set_reg(x, n);
            }

            // Wraps around, VF is left alone
            Instruction::IncRegByConst(Reg(x), Const(n)) => {
                self.set_reg(x, self.reg(x).wrapping_add(n));
            }

            Instruction::SetRegToReg(Reg(x), Reg(y)) => {
                self.set_reg(x, self.reg(y));
            }

            Instruction::BitwiseOr(Reg(x), Reg(y)) => {
                self.set_reg(x, self.reg(x) | self.reg(y));
            }

            Instruction::BitwiseAnd(Reg(x), Reg(y)) => {
                self.set_reg(x, self.reg(x) & self.reg(y));
            }

            Instruction::BitwiseXor(Reg(x), Reg(y)) => {
                self.set_reg(x, self.reg(x) ^ self.reg(y));
            }

            // The flag is written last, so it wins when x is VF.
            Instruction::IncRegByReg(Reg(x), Reg(y)) => {
                let (sum, carry) = self.reg(x).overflowing_add(self.reg(y));
                self.set_reg(x, sum);
                self.set_flag(carry);
            }

            // VF is 1 when there is no borrow
            Instruction::DecRegByReg(Reg(x), Reg(y)) => {
                let (vx, vy) = (self.reg(x), self.reg(y));
                self.set_reg(x, vx.wrapping_sub(vy));
                self.set_flag(vx >= vy);
            }

            Instruction::BitshiftRight(Reg(x)) => {
                let vx = self.reg(x);
                self.set_reg(x, vx >> 1);
                self.set_flag(vx & 1 == 1);
            }

            Instruction::SetVxVyMinusVx(Reg(x), Reg(y)) => {
                let (vx, vy) = (self.reg(x), self.reg(y));
                self.set_reg(x, vy.wrapping_sub(vx));
                self.set_flag(vy >= vx);
            }

            Instruction::BitshiftLeft(Reg(x)) => {
                let vx = self.reg(x);
                self.set_reg(x, vx << 1);
                self.set_flag(vx >> 7 == 1);
            }

            Instruction::IfRegNeqReg(Reg(x), Reg(y)) => {
                self.skip_if(self.reg(x) != self.reg(y));
            }

            Instruction::SetI(Addr(addr)) => {
                self.i = addr;
            }

            Instruction::SetPcToV0PlusAddr(Addr(addr)) => {
                self.program_counter = addr.wrapping_add(self.reg(0) as u16) % MEM_SIZE as u16;
            }

            Instruction::SetVxRand(Reg(x), Const(n)) => {
                self.set_reg(x, rand::random::<u8>() & n);
            }

            Instruction::Draw(Reg(x), Reg(y), Const(sprite_height)) => {
                // Get coordinates
                let x_coord = self.reg(x) as usize;
                let y_coord = self.reg(y) as usize;

                // Get sprite, each row is 8 bits
                let sprite: Vec<u8> = (0..sprite_height as u16)
                    .map(|row| self.memory.read(self.i.wrapping_add(row)))
                    .collect();

                let any_collisions = self.display.draw_sprite(x_coord, y_coord, &sprite);
                self.set_flag(any_collisions);
            }

            Instruction::IfKeyEqVx(Reg(x)) => {
                self.skip_if(self.keypad.is_down(self.reg(x)));
            }

            Instruction::IfKeyNeqVx(Reg(x)) => {
                self.skip_if(!self.keypad.is_down(self.reg(x)));
            }

            Instruction::SetRegToDelayTimer(Reg(x)) => {
                self.set_reg(x, self.timers.delay);
            }

            // Get a key press without blocking the host
            Instruction::SetRegToGetKey(Reg(x)) => {
                self.waiting_for_key = false;
                match self.keypad.first_down() {
                    Some(key) => self.set_reg(x, key),
                    None => {
                        self.waiting_for_key = true;
                        return Ok(StepStatus::WaitingForKey);
                    }
                }
            }

            Instruction::SetDelayTimerToReg(Reg(x)) => {
                self.timers.delay = self.reg(x);
            }

            Instruction::SetSoundTimerToReg(Reg(x)) => {
                self.timers.sound = self.reg(x);
            }

            Instruction::AddRegToI(Reg(x)) => {
                let sum = self.i as usize + self.reg(x) as usize;
                self.i = (sum % MEM_SIZE) as u16;
                self.set_flag(sum >= MEM_SIZE);
            }

            // Each font element is 5 bytes wide.
            Instruction::SetIToSpriteAddrVx(Reg(x)) => {
                self.i = font_address(self.reg(x));
            }

            Instruction::SetIToBcdOfReg(Reg(x)) => {
                let value = self.reg(x);
                self.memory.write(self.i, value / 100);
                self.memory.write(self.i.wrapping_add(1), value / 10 % 10);
                self.memory.write(self.i.wrapping_add(2), value % 10);
            }

            // Dump register values up to Vx
            Instruction::RegDump(Reg(x)) => {
                for reg_no in 0..=x {
                    let value = self.reg(reg_no);
                    self.memory.write(self.i.wrapping_add(reg_no as u16), value);
                }
            }

            // Load register values up to Vx
            Instruction::RegLoad(Reg(x)) => {
                for reg_no in 0..=x {
                    let value = self.memory.read(self.i.wrapping_add(reg_no as u16));
                    self.set_reg(reg_no, value);
                }
            }
        };

        Ok(StepStatus::Continue)
    }

    fn reg(&self, x: u8) -> u8 {
        self.registers[(x & 0xF) as usize]
    }

    fn set_reg(&mut self, x: u8, value: u8) {
        self.registers[(x & 0xF) as usize] = value;
    }

    fn set_flag(&mut self, flag: bool) {
        self.registers[FLAG] = flag as u8;
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.program_counter = next(self.program_counter);
        }
    }

    /// Press or release a key on the hexadecimal keypad.
    pub fn set_key(&mut self, key: u8, pressed: bool) -> Result<(), KeyError> {
        self.keypad.set(key, pressed)?;
        log::debug!("Key {:X} {}", key, if pressed { "down" } else { "up" });
        Ok(())
    }

    pub fn is_key_down(&self, key: u8) -> bool {
        self.keypad.is_down(key)
    }

    /// Whether the screen has changed since it was last consumed.
    pub fn is_dirty(&self) -> bool {
        self.display.is_dirty()
    }

    /// Take a copy of the screen for rendering and clear the dirty flag.
    pub fn consume_dirty(&mut self) -> Screen {
        self.display.consume()
    }

    pub fn screen(&self) -> &Screen {
        self.display.screen()
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.display.get(x, y)
    }

    /// The display, which renders itself as text through `Display`.
    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn delay_timer(&self) -> u8 {
        self.timers.delay
    }

    pub fn sound_timer(&self) -> u8 {
        self.timers.sound
    }

    /// Whether a host should be beeping right now.
    pub fn sound_active(&self) -> bool {
        self.timers.sound > 0
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn register(&self, x: u8) -> u8 {
        self.reg(x)
    }

    pub fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    /// How many unknown opcodes have been skipped so far.
    pub fn unknown_opcodes(&self) -> u64 {
        self.unknown_opcodes
    }

    /// Whether the last step or executed instruction parked on `FX0A`.
    pub fn is_waiting_for_key(&self) -> bool {
        self.waiting_for_key
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

/// The address of the following instruction.
fn next(addr: u16) -> u16 {
    addr.wrapping_add(2) % MEM_SIZE as u16
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::emulator::memory::{FONT, MAX_PROGRAM_SIZE};
    use crate::emulator::stack::STACK_SIZE;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    /// An emulator with `program` loaded.
    fn with_program(program: &[u8]) -> Emulator {
        let mut emulator = Emulator::new();
        emulator.load(program).unwrap();
        emulator
    }

    fn run(emulator: &mut Emulator, steps: usize) {
        for _ in 0..steps {
            emulator.step().unwrap();
        }
    }

    #[test]
    fn initial_state() {
        let emulator = Emulator::new();
        assert_eq!(emulator.program_counter(), 0x200);
        assert_eq!(emulator.index(), 0);
        assert!((0..16).all(|x| emulator.register(x) == 0));
        assert_eq!(emulator.stack_depth(), 0);
        assert_eq!((emulator.delay_timer(), emulator.sound_timer()), (0, 0));
        assert!(emulator.is_dirty());
        assert_eq!(&emulator.memory()[..80], &FONT[..]);
    }

    #[test]
    fn goto_goes_to() {
        let mut emulator = Emulator::new();
        emulator.execute(Instruction::Goto(Addr(0x250))).unwrap();
        assert_eq!(emulator.program_counter, 0x250);
    }

    #[test]
    fn return_after_call_is_neutral() {
        // Create emulator
        let mut emulator = Emulator::new();
        assert_eq!(emulator.program_counter, 0x200);

        // Write program with call and return
        let program = [
            0x22, 0x06, // 0x00, call 0x206
            0x00, 0x00, // 0x02
            0x00, 0x00, // 0x04
            0x00, 0xEE, // 0x06, return
        ];
        emulator.load(&program).unwrap();

        // Run the program
        emulator.step().unwrap(); // Call 0x206
        assert_eq!(emulator.program_counter, 0x206);
        assert_eq!(emulator.stack_depth(), 1);
        emulator.step().unwrap(); // Return to 202
        assert_eq!(emulator.program_counter, 0x202);
        assert_eq!(emulator.stack_depth(), 0);
    }

    #[test]
    fn seventeenth_call_overflows_then_empty_return_underflows() {
        // A subroutine at 0x200 that calls itself.
        let mut emulator = with_program(&[0x22, 0x00]);
        run(&mut emulator, STACK_SIZE);
        assert_eq!(emulator.stack_depth(), STACK_SIZE);

        assert_eq!(
            emulator.step(),
            Err(ExecutionError::StackOverflow { address: 0x200 })
        );
        assert_eq!(emulator.stack_depth(), STACK_SIZE);
        assert_eq!(emulator.program_counter(), 0x202);

        let mut emulator = with_program(&[0x00, 0xEE]);
        assert_eq!(
            emulator.step(),
            Err(ExecutionError::StackUnderflow { address: 0x200 })
        );
    }

    #[test]
    fn overflow_leaves_memory_alone() {
        let mut emulator = with_program(&[0x22, 0x00]);
        let before = emulator.memory().to_vec();
        run(&mut emulator, STACK_SIZE);
        assert!(emulator.step().is_err());
        assert_eq!(emulator.memory(), &before[..]);
    }

    #[test_case(0x30, 0x2A, 0x204 ; "3xnn taken")]
    #[test_case(0x30, 0x2B, 0x202 ; "3xnn not taken")]
    #[test_case(0x40, 0x2B, 0x204 ; "4xnn taken")]
    #[test_case(0x40, 0x2A, 0x202 ; "4xnn not taken")]
    #[test_case(0x50, 0x10, 0x202 ; "5xy0 not taken")]
    #[test_case(0x50, 0x00, 0x204 ; "5xy0 same register")]
    #[test_case(0x90, 0x10, 0x204 ; "9xy0 taken")]
    #[test_case(0x90, 0x00, 0x202 ; "9xy0 same register")]
    fn conditional_skips(high: u8, low: u8, expected_pc: u16) {
        // V0 = 0x2A, V1 = 0
        let mut emulator = Emulator::new();
        emulator
            .execute(Instruction::SetRegToConst(Reg(0), Const(0x2A)))
            .unwrap();
        emulator.load(&[high, low]).unwrap();
        emulator.step().unwrap();
        assert_eq!(emulator.program_counter(), expected_pc);
    }

    #[test]
    fn set_then_add_wraps_without_flag() {
        let mut emulator = with_program(&[0x63, 0xF0, 0x73, 0x20]);
        run(&mut emulator, 2);
        assert_eq!(emulator.register(3), 0x10);
        assert_eq!(emulator.register(0xF), 0);
    }

    #[test_case(0x8AB0, 0x0C, 0x0C ; "assign")]
    #[test_case(0x8AB1, 0x3C, 0x3C | 0x0C ; "or")]
    #[test_case(0x8AB2, 0x3C, 0x3C & 0x0C ; "and")]
    #[test_case(0x8AB3, 0x3C, 0x3C ^ 0x0C ; "xor")]
    fn bitwise(opcode: u16, va: u8, expected: u8) {
        let mut emulator = Emulator::new();
        emulator
            .execute_many(&[
                Instruction::SetRegToConst(Reg(0xA), Const(va)),
                Instruction::SetRegToConst(Reg(0xB), Const(0x0C)),
                Instruction::decode(opcode).unwrap(),
            ])
            .unwrap();
        assert_eq!(emulator.register(0xA), expected);
    }

    // (opcode, vx, vy, expected vx, expected vf)
    #[test_case(0x8014, 0xFF, 0x01, 0x00, 1 ; "add with carry")]
    #[test_case(0x8014, 0x10, 0x20, 0x30, 0 ; "add without carry")]
    #[test_case(0x8015, 0x01, 0x02, 0xFF, 0 ; "sub with borrow")]
    #[test_case(0x8015, 0x05, 0x05, 0x00, 1 ; "sub equal")]
    #[test_case(0x8015, 0x09, 0x02, 0x07, 1 ; "sub without borrow")]
    #[test_case(0x8017, 0x02, 0x01, 0xFF, 0 ; "subn with borrow")]
    #[test_case(0x8017, 0x02, 0x09, 0x07, 1 ; "subn without borrow")]
    #[test_case(0x8016, 0x05, 0x00, 0x02, 1 ; "shr odd")]
    #[test_case(0x8016, 0x04, 0x00, 0x02, 0 ; "shr even")]
    #[test_case(0x801E, 0x81, 0x00, 0x02, 1 ; "shl high bit")]
    #[test_case(0x801E, 0x41, 0x00, 0x82, 0 ; "shl no high bit")]
    fn arithmetic_sets_flag(opcode: u16, vx: u8, vy: u8, expected: u8, flag: u8) {
        let mut emulator = Emulator::new();
        emulator
            .execute_many(&[
                Instruction::SetRegToConst(Reg(0), Const(vx)),
                Instruction::SetRegToConst(Reg(1), Const(vy)),
                Instruction::SetRegToConst(Reg(0xF), Const(0xAA)),
                Instruction::decode(opcode).unwrap(),
            ])
            .unwrap();
        assert_eq!(emulator.register(0), expected);
        assert_eq!(emulator.register(0xF), flag);
    }

    #[test]
    fn flag_wins_when_vf_is_the_target() {
        let mut emulator = Emulator::new();
        emulator
            .execute_many(&[
                Instruction::SetRegToConst(Reg(0xF), Const(0xFF)),
                Instruction::SetRegToConst(Reg(1), Const(0x01)),
                Instruction::IncRegByReg(Reg(0xF), Reg(1)),
            ])
            .unwrap();
        assert_eq!(emulator.register(0xF), 1);
    }

    #[test]
    fn jump_with_offset() {
        let mut emulator = Emulator::new();
        emulator
            .execute_many(&[
                Instruction::SetRegToConst(Reg(0), Const(0x10)),
                Instruction::SetPcToV0PlusAddr(Addr(0x300)),
            ])
            .unwrap();
        assert_eq!(emulator.program_counter(), 0x310);
    }

    #[test]
    fn jump_with_offset_wraps_large_addresses() {
        let mut emulator = Emulator::new();
        emulator
            .execute_many(&[
                Instruction::SetRegToConst(Reg(0), Const(0x10)),
                Instruction::SetPcToV0PlusAddr(Addr(0xFFFF)),
            ])
            .unwrap();
        assert_eq!(emulator.program_counter(), 0x00F);

        emulator
            .execute(Instruction::SetPcToV0PlusAddr(Addr(0xFF8)))
            .unwrap();
        assert_eq!(emulator.program_counter(), 0x008);
    }

    #[test]
    fn random_is_masked() {
        let mut emulator = Emulator::new();
        emulator
            .execute_many(&[
                Instruction::SetRegToConst(Reg(2), Const(0xFF)),
                Instruction::SetVxRand(Reg(2), Const(0x00)),
                Instruction::SetVxRand(Reg(3), Const(0x0F)),
            ])
            .unwrap();
        assert_eq!(emulator.register(2), 0);
        assert!(emulator.register(3) <= 0x0F);
    }

    #[test]
    fn draw_wraps_horizontally() {
        // An 8x5 box at (60, 0), sprite data at 0x300.
        let mut program = vec![0u8; 0x105];
        program[..8].copy_from_slice(&[
            0xA3, 0x00, // I = 0x300
            0x60, 0x3C, // V0 = 60
            0x61, 0x00, // V1 = 0
            0xD0, 0x15, // draw 5 rows
        ]);
        program[0x100..0x105].copy_from_slice(&[0xFF, 0x81, 0xFF, 0x81, 0xFF]);
        let mut emulator = with_program(&program);
        run(&mut emulator, 4);

        for x in 60..64 {
            assert_eq!(emulator.pixel(x, 0), 1, "column {}", x);
        }
        for x in 0..4 {
            assert_eq!(emulator.pixel(x, 0), 1, "column {}", x);
        }
        assert_eq!(emulator.pixel(4, 0), 0);
        assert_eq!(emulator.pixel(59, 0), 0);
        assert_eq!((emulator.pixel(60, 1), emulator.pixel(3, 1)), (1, 1));
        assert_eq!((emulator.pixel(61, 1), emulator.pixel(0, 1)), (0, 0));
        assert_eq!(emulator.register(0xF), 0);
    }

    #[test]
    fn drawing_twice_restores_screen_and_reports_collision() {
        let mut emulator = with_program(&[
            0x60, 0x05, // V0 = 5
            0xF0, 0x29, // I = glyph 5
            0xD0, 0x05, // draw at (5, 5)
            0xD0, 0x05, // draw again
        ]);
        run(&mut emulator, 3);
        assert_eq!(emulator.register(0xF), 0);
        let drawn = *emulator.screen();
        assert_ne!(drawn, crate::emulator::display::EMPTY_SCREEN);

        emulator.consume_dirty();
        run(&mut emulator, 1);
        assert!(emulator.is_dirty());
        assert_eq!(emulator.register(0xF), 1);
        assert_eq!(
            emulator.consume_dirty(),
            crate::emulator::display::EMPTY_SCREEN
        );
        assert!(!emulator.is_dirty());
    }

    #[test]
    fn draw_coordinates_wrap_before_drawing() {
        let mut emulator = Emulator::new();
        emulator
            .execute_many(&[
                Instruction::SetRegToConst(Reg(0), Const(64 + 2)),
                Instruction::SetRegToConst(Reg(1), Const(32 + 1)),
                Instruction::SetI(Addr(0x000)), // glyph 0 starts with 0xF0
                Instruction::Draw(Reg(0), Reg(1), Const(1)),
            ])
            .unwrap();
        assert_eq!(emulator.pixel(2, 1), 1);
        assert_eq!(emulator.pixel(5, 1), 1);
        assert_eq!(emulator.pixel(6, 1), 0);
    }

    #[test]
    fn clear_screen() {
        let mut emulator = Emulator::new();
        emulator
            .execute(Instruction::Draw(Reg(0), Reg(0), Const(5)))
            .unwrap();
        emulator.consume_dirty();
        emulator.execute(Instruction::ClearScreen).unwrap();
        assert!(emulator.is_dirty());
        assert_eq!(
            emulator.screen(),
            &crate::emulator::display::EMPTY_SCREEN
        );
    }

    #[test]
    fn key_skips() {
        let mut emulator = with_program(&[
            0x60, 0x07, // V0 = 7
            0xE0, 0x9E, // skip if key 7 down
            0x00, 0x00,
            0xE0, 0xA1, // skip if key 7 up
        ]);
        emulator.set_key(7, true).unwrap();
        run(&mut emulator, 2);
        assert_eq!(emulator.program_counter(), 0x206);
        run(&mut emulator, 1);
        assert_eq!(emulator.program_counter(), 0x208);
    }

    #[test]
    fn set_key_rejects_out_of_range() {
        let mut emulator = Emulator::new();
        assert_eq!(emulator.set_key(16, true), Err(KeyError::InvalidKey(16)));
        assert!((0..16).all(|k| !emulator.is_key_down(k)));
    }

    #[test]
    fn wait_for_key_suspends_then_resumes() {
        let mut emulator = with_program(&[0xF5, 0x0A, 0x00, 0xE0]);

        assert_eq!(emulator.step(), Ok(StepStatus::WaitingForKey));
        assert_eq!(emulator.program_counter(), 0x200);
        assert!(emulator.is_waiting_for_key());
        assert_eq!(emulator.step(), Ok(StepStatus::WaitingForKey));
        assert_eq!(emulator.program_counter(), 0x200);

        emulator.set_key(0xB, true).unwrap();
        assert_eq!(emulator.step(), Ok(StepStatus::Continue));
        assert_eq!(emulator.register(5), 0xB);
        assert_eq!(emulator.program_counter(), 0x202);
        assert!(!emulator.is_waiting_for_key());
    }

    #[test]
    fn waiting_flag_follows_manual_execution() {
        let mut emulator = Emulator::new();
        assert_eq!(
            emulator.execute(Instruction::SetRegToGetKey(Reg(1))),
            Ok(StepStatus::WaitingForKey)
        );
        assert!(emulator.is_waiting_for_key());

        emulator.set_key(4, true).unwrap();
        assert_eq!(
            emulator.execute(Instruction::SetRegToGetKey(Reg(1))),
            Ok(StepStatus::Continue)
        );
        assert!(!emulator.is_waiting_for_key());
        assert_eq!(emulator.register(1), 4);
    }

    #[test]
    fn waiting_flag_clears_when_a_step_faults() {
        // Park on a key wait, then step into a return with an empty stack.
        let mut emulator = with_program(&[0x00, 0xEE]);
        assert_eq!(
            emulator.execute(Instruction::SetRegToGetKey(Reg(0))),
            Ok(StepStatus::WaitingForKey)
        );
        assert!(emulator.is_waiting_for_key());

        assert!(emulator.step().is_err());
        assert!(!emulator.is_waiting_for_key());
    }

    #[test]
    fn timers_are_only_touched_by_tick_and_their_opcodes() {
        let mut emulator = with_program(&[
            0x60, 0xFF, // V0 = 255
            0xF0, 0x15, // delay = V0
            0xF0, 0x18, // sound = V0
            0xF1, 0x07, // V1 = delay
        ]);
        run(&mut emulator, 4);
        assert_eq!(emulator.register(1), 0xFF);
        assert_eq!(emulator.delay_timer(), 0xFF);
        assert!(emulator.sound_active());

        for n in 1..=255 {
            emulator.tick();
            assert_eq!(emulator.delay_timer(), 255 - n as u8);
            assert_eq!(emulator.sound_timer(), 255 - n as u8);
        }
        emulator.tick();
        assert_eq!((emulator.delay_timer(), emulator.sound_timer()), (0, 0));
        assert!(!emulator.sound_active());
    }

    #[test_case(0x100, 0x10, 0x110, 0 ; "no overflow")]
    #[test_case(0xFFF, 0x01, 0x000, 1 ; "past the end")]
    #[test_case(0xFF0, 0x20, 0x010, 1 ; "wraps")]
    fn add_to_index(i: u16, vx: u8, expected: u16, flag: u8) {
        let mut emulator = Emulator::new();
        emulator
            .execute_many(&[
                Instruction::SetI(Addr(i)),
                Instruction::SetRegToConst(Reg(4), Const(vx)),
                Instruction::AddRegToI(Reg(4)),
            ])
            .unwrap();
        assert_eq!(emulator.index(), expected);
        assert_eq!(emulator.register(0xF), flag);
    }

    #[test_case(0x00, 0x00 ; "glyph 0")]
    #[test_case(0x0A, 0x32 ; "glyph a")]
    #[test_case(0x0F, 0x4B ; "glyph f")]
    #[test_case(0x10, 0x50 ; "past the font")]
    #[test_case(0xFF, 0x4FB ; "largest value")]
    fn font_character_address(vx: u8, expected: u16) {
        let mut emulator = with_program(&[0x62, vx, 0xF2, 0x29]);
        run(&mut emulator, 2);
        assert_eq!(emulator.index(), expected);
    }

    #[test]
    fn font_character_points_at_glyph() {
        let mut emulator = Emulator::new();
        emulator
            .execute_many(&[
                Instruction::SetRegToConst(Reg(2), Const(0xA)),
                Instruction::SetIToSpriteAddrVx(Reg(2)),
            ])
            .unwrap();
        assert_eq!(&emulator.memory()[50..55], &[0xF0, 0x90, 0xF0, 0x90, 0x90]);
    }

    #[test_case(254, [2, 5, 4] ; "three digits")]
    #[test_case(100, [1, 0, 0] ; "round hundred")]
    #[test_case(42, [0, 4, 2] ; "two digits")]
    #[test_case(7, [0, 0, 7] ; "one digit")]
    fn binary_coded_decimal(value: u8, digits: [u8; 3]) {
        let mut emulator = Emulator::new();
        emulator
            .execute_many(&[
                Instruction::SetI(Addr(0x300)),
                Instruction::SetRegToConst(Reg(6), Const(value)),
                Instruction::SetIToBcdOfReg(Reg(6)),
            ])
            .unwrap();
        assert_eq!(&emulator.memory()[0x300..0x303], &digits[..]);
        assert_eq!(emulator.index(), 0x300);
    }

    #[test]
    fn register_dump_and_load_up_to_x() {
        let mut emulator = Emulator::new();
        for x in 0..16 {
            emulator
                .execute(Instruction::SetRegToConst(Reg(x), Const(x * 3 + 1)))
                .unwrap();
        }
        emulator
            .execute_many(&[Instruction::SetI(Addr(0x400)), Instruction::RegDump(Reg(4))])
            .unwrap();
        assert_eq!(&emulator.memory()[0x400..0x406], &[1, 4, 7, 10, 13, 0]);
        assert_eq!(emulator.index(), 0x400);

        let mut fresh = Emulator::new();
        let mut program = vec![0; 0x206];
        program[0x200..0x205].copy_from_slice(&[1, 4, 7, 10, 13]);
        fresh.load(&program).unwrap();
        fresh
            .execute_many(&[Instruction::SetI(Addr(0x400)), Instruction::RegLoad(Reg(3))])
            .unwrap();
        assert_eq!(
            (0..5).map(|x| fresh.register(x)).collect::<Vec<_>>(),
            vec![1, 4, 7, 10, 0]
        );
    }

    #[test]
    fn unknown_opcode_is_skipped_and_counted() {
        let mut emulator = with_program(&[0xFF, 0xFF, 0x61, 0x01]);
        assert_eq!(emulator.step(), Ok(StepStatus::Continue));
        assert_eq!(emulator.program_counter(), 0x202);
        assert_eq!(emulator.unknown_opcodes(), 1);
        run(&mut emulator, 1);
        assert_eq!(emulator.register(1), 1);
    }

    #[test]
    fn oversized_load_leaves_state_alone() {
        let mut emulator = Emulator::new();
        let before = emulator.memory().to_vec();
        let result = emulator.load(&vec![0x12; MAX_PROGRAM_SIZE + 1]);
        assert!(matches!(
            result,
            Err(LoadError::CapacityExceeded { size: 3585, max: 3584 })
        ));
        assert_eq!(emulator.memory(), &before[..]);
        assert_eq!(emulator.program_counter(), 0x200);
    }

    #[test]
    fn largest_program_fills_memory_to_the_end() {
        let program = vec![0x5A; MAX_PROGRAM_SIZE];
        let emulator = with_program(&program);
        let memory = emulator.memory();
        assert_eq!(&memory[0x200..0x1000], &program[..]);
        assert_eq!(&memory[..FONT.len()], &FONT[..]);
        assert!(memory[FONT.len()..0x200].iter().all(|b| *b == 0));
    }

    #[test]
    fn load_file_reports_missing_files() {
        let mut emulator = Emulator::new();
        let result = emulator.load_file("/this/file/does/not/exist.ch8");
        assert!(matches!(result, Err(LoadError::Io(_))));
    }

    #[test]
    fn load_file_reads_program() {
        let path = std::env::temp_dir()
            .join(format!("chip-8-vm-load-file-test-{}.ch8", std::process::id()));
        std::fs::write(&path, b"\x00\xE0\x12\x00").unwrap();
        let mut emulator = Emulator::new();
        emulator.load_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(&emulator.memory()[0x200..0x204], &[0x00, 0xE0, 0x12, 0x00]);
    }

    proptest! {
        #[test]
        fn load_copies_program_and_nothing_else(
            program in proptest::collection::vec(any::<u8>(), 0..=MAX_PROGRAM_SIZE)
        ) {
            let emulator = with_program(&program);
            let memory = emulator.memory();
            let end = 0x200 + program.len();
            prop_assert_eq!(&memory[..FONT.len()], &FONT[..]);
            prop_assert!(memory[FONT.len()..0x200].iter().all(|b| *b == 0));
            prop_assert_eq!(&memory[0x200..end], &program[..]);
            prop_assert!(memory[end..].iter().all(|b| *b == 0));
        }

        #[test]
        fn set_then_add_is_modular(x in 0u8..15, nn: u8, mm: u8) {
            let program = [0x60 | x, nn, 0x70 | x, mm];
            let mut emulator = with_program(&program);
            run(&mut emulator, 2);
            prop_assert_eq!(emulator.register(x), nn.wrapping_add(mm));
        }

        #[test]
        fn sub_flag_is_not_borrow(vx: u8, vy: u8) {
            let mut emulator = Emulator::new();
            emulator.execute_many(&[
                Instruction::SetRegToConst(Reg(0), Const(vx)),
                Instruction::SetRegToConst(Reg(1), Const(vy)),
                Instruction::DecRegByReg(Reg(0), Reg(1)),
            ]).unwrap();
            prop_assert_eq!(emulator.register(0), vx.wrapping_sub(vy));
            prop_assert_eq!(emulator.register(0xF), (vx >= vy) as u8);
        }
    }
}
