//! Instruction modeling for the bytec machine.
//!
//! An [`Instruction`] is described by a *mnemonic template* such as
//! `STA FP, -#offset`: words containing `#` declare named one-byte
//! operands, everything else is literal text. Instructions are
//! collected in an [`InstructionSet`] keyed by an 8-bit opcode, and
//! the [`assemble`]/[`disassemble`] pair round-trips byte sequences
//! through the textual form.
//!
//! The crate is independent of any concrete machine: an instruction
//! carries its behavior as a plain function pointer over a generic
//! machine type `M`, so the emulator crate can instantiate
//! `Instruction<Emulator>` without a dependency cycle.

#![warn(missing_docs)]

mod assembler;
mod error;
mod fault;
mod instruction;
mod registry;
mod utils;

pub use assembler::{assemble, assemble_mnemonic, disassemble};
pub use error::{BuildError, RegistryError};
pub use fault::Fault;
pub use instruction::{Execute, ExecuteState, Instruction, MNEMONIC_DELIMITERS};
pub use registry::{InstructionSet, MAX_INSTRUCTIONS};
pub use utils::split_many;

/// Width of the accumulator. Memory cells and instruction operands
/// are single bytes; only the low byte of a `Word` is ever stored.
pub type Word = u16;
