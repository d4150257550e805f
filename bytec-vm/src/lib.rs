//! The bytec virtual machine.
//!
//! A single-threaded, byte-wide stack machine: registers `A`, `PC`,
//! `FP` and `SP`, a zero flag, a fixed memory loaded at address zero,
//! and an output sink. Instructions come from an
//! [`InstructionSet`](bytec_asm::InstructionSet) owned by the
//! [`Emulator`]; the [`Isa`] in this crate is the default table the
//! compiler targets.

#![warn(missing_docs)]

pub mod consts;
mod emulator;
mod error;
mod isa;

pub use emulator::Emulator;
pub use error::EmulatorError;
pub use isa::{Isa, Op};

use consts::DEFAULT_CYCLE_LIMIT;

/// Load `code` into a fresh default-ISA emulator, run it, and return
/// the output bytes.
///
/// `max_clock_cycles` defaults to [`DEFAULT_CYCLE_LIMIT`].
pub fn run_program(code: &[u8], max_clock_cycles: Option<usize>) -> Result<Vec<u8>, EmulatorError> {
    let isa = Isa::default();
    let mut vm = Emulator::new(isa.set);

    vm.set_all_memory(code)?;
    vm.run_for(max_clock_cycles.unwrap_or(DEFAULT_CYCLE_LIMIT))?;

    Ok(vm.take_output())
}

/// Commonly used types for driving the machine.
pub mod prelude {
    pub use bytec_asm::{
        assemble, assemble_mnemonic, disassemble, Execute, ExecuteState, Fault, Instruction,
        InstructionSet, Word,
    };

    pub use crate::consts::{DEFAULT_CYCLE_LIMIT, MEMORY_SIZE, STACK_START};
    pub use crate::emulator::Emulator;
    pub use crate::error::EmulatorError;
    pub use crate::isa::{Isa, Op};
    pub use crate::run_program;
}
