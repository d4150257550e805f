use bytec_asm::{ExecuteState, Fault, InstructionSet, Word};
use tracing::{debug, trace};

use crate::consts::{DEFAULT_CYCLE_LIMIT, MEMORY_SIZE};
use crate::error::EmulatorError;

/// The bytec machine.
///
/// All state is owned by the instance: memory, registers, zero flag,
/// output sink and the instruction table. An emulator can be reused
/// across runs with [`reset`](Self::reset) and
/// [`set_all_memory`](Self::set_all_memory).
pub struct Emulator {
    memory: Vec<u8>,
    a: Word,
    pc: usize,
    fp: usize,
    sp: usize,
    zero: bool,
    output: Vec<u8>,
    instruction_set: InstructionSet<Emulator>,
}

impl Emulator {
    /// A machine with the standard [`MEMORY_SIZE`] bytes of memory.
    pub fn new(instruction_set: InstructionSet<Emulator>) -> Self {
        Self::with_memory_size(instruction_set, MEMORY_SIZE)
    }

    /// A machine with a custom memory size.
    ///
    /// Boundary tests shrink the memory to a handful of bytes.
    pub fn with_memory_size(instruction_set: InstructionSet<Emulator>, memory_size: usize) -> Self {
        Self {
            memory: vec![0; memory_size],
            a: 0,
            pc: 0,
            fp: 0,
            sp: 0,
            zero: false,
            output: Vec::new(),
            instruction_set,
        }
    }

    /// Clear the registers and the zero flag. Memory and any pending
    /// output are left alone.
    pub fn reset(&mut self) {
        self.a = 0;
        self.pc = 0;
        self.fp = 0;
        self.sp = 0;
        self.zero = false;
    }

    /// Zero the whole memory.
    pub fn clear_memory(&mut self) {
        self.memory.fill(0);
    }

    /// Zero the memory, then load `image` at address zero.
    pub fn set_all_memory(&mut self, image: &[u8]) -> Result<(), EmulatorError> {
        if image.len() > self.memory.len() {
            return Err(EmulatorError::ProgramTooLarge {
                len: image.len(),
                capacity: self.memory.len(),
            });
        }

        self.clear_memory();
        self.memory[..image.len()].copy_from_slice(image);
        debug!(bytes = image.len(), "loaded memory image");

        Ok(())
    }

    /* register and flag access */

    /// The accumulator.
    pub const fn a(&self) -> Word {
        self.a
    }

    /// High byte of the accumulator.
    pub const fn a_upper(&self) -> u8 {
        (self.a >> 8) as u8
    }

    /// Low byte of the accumulator; the part stored and printed.
    pub const fn a_lower(&self) -> u8 {
        (self.a & 0x00ff) as u8
    }

    /// The program counter.
    pub const fn pc(&self) -> usize {
        self.pc
    }

    /// The frame pointer.
    pub const fn fp(&self) -> usize {
        self.fp
    }

    /// The stack pointer.
    pub const fn sp(&self) -> usize {
        self.sp
    }

    /// The zero flag, as last latched by a test instruction.
    pub const fn zero_flag(&self) -> bool {
        self.zero
    }

    /// Set the accumulator.
    pub fn set_a(&mut self, value: Word) {
        self.a = value;
    }

    /// Set the program counter.
    pub fn set_pc(&mut self, address: usize) {
        self.pc = address;
    }

    /// Set the frame pointer.
    pub fn set_fp(&mut self, address: usize) {
        self.fp = address;
    }

    /// Set the stack pointer.
    pub fn set_sp(&mut self, address: usize) {
        self.sp = address;
    }

    /// Latch the zero flag.
    pub fn set_zero_flag(&mut self, zero: bool) {
        self.zero = zero;
    }

    /* memory access */

    /// The whole memory.
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Read one byte, bounds-checked.
    pub fn read_byte(&self, address: usize) -> Result<u8, Fault> {
        self.memory
            .get(address)
            .copied()
            .ok_or(Fault::MemoryOverflow { address })
    }

    /// Write one byte, bounds-checked.
    pub fn write_byte(&mut self, address: usize, value: u8) -> Result<(), Fault> {
        match self.memory.get_mut(address) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Fault::MemoryOverflow { address }),
        }
    }

    /// Read the byte at `PC` and post-increment `PC`.
    pub fn fetch(&mut self) -> Result<u8, Fault> {
        let value = self.read_byte(self.pc)?;
        self.pc += 1;
        Ok(value)
    }

    /// Push one byte: decrement `SP`, then write.
    pub fn push(&mut self, value: u8) -> Result<(), Fault> {
        self.sp = self.sp.checked_sub(1).ok_or(Fault::AddressUnderflow)?;
        self.write_byte(self.sp, value)
    }

    /// Pop one byte: read at `SP`, then increment.
    pub fn pop(&mut self) -> Result<u8, Fault> {
        let value = self.read_byte(self.sp)?;
        self.sp += 1;
        Ok(value)
    }

    /// Address `offset` bytes above `FP`.
    pub fn frame_address(&self, offset: u8) -> usize {
        self.fp + usize::from(offset)
    }

    /// Address `offset` bytes below `FP`.
    pub fn frame_address_back(&self, offset: u8) -> Result<usize, Fault> {
        self.fp
            .checked_sub(usize::from(offset))
            .ok_or(Fault::AddressUnderflow)
    }

    /* output */

    /// Append one byte to the output sink.
    pub fn write_output(&mut self, value: u8) {
        self.output.push(value);
    }

    /// The accumulated output.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Drain the accumulated output.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /* execution */

    /// Fetch, decode and execute a single instruction.
    pub fn step(&mut self) -> Result<ExecuteState, Fault> {
        let at = self.pc;
        let opcode = self.fetch()?;
        let execute = self
            .instruction_set
            .get(opcode)
            .ok_or(Fault::InvalidOpcode { opcode })?
            .execute();

        trace!(pc = at, opcode, "execute");
        execute(self)
    }

    /// Run with the default cycle budget.
    pub fn run(&mut self) -> Result<(), EmulatorError> {
        self.run_for(DEFAULT_CYCLE_LIMIT)
    }

    /// Run until a halt, at most `max_clock_cycles` instructions.
    pub fn run_for(&mut self, max_clock_cycles: usize) -> Result<(), EmulatorError> {
        for _ in 0..max_clock_cycles {
            if !self.step()?.should_continue() {
                return Ok(());
            }
        }

        Err(EmulatorError::CyclesExceeded(max_clock_cycles))
    }
}
