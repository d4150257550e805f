//! VM parameters.

/// Size of the machine memory, in bytes.
///
/// Programs are loaded at address zero and the stack grows downward
/// from the top of this same memory.
pub const MEMORY_SIZE: usize = 256;

/// Initial value of `SP` and `FP`.
///
/// A push decrements `SP` before writing, so the stack base itself is
/// never written; the first pushed byte lands at `STACK_START - 1`.
pub const STACK_START: u8 = 0xff;

/// Clock-cycle budget of [`Emulator::run`](crate::Emulator::run).
pub const DEFAULT_CYCLE_LIMIT: usize = 1_000;
