use bytec_asm::Fault;
use thiserror::Error;

/// Emulator runtime error variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EmulatorError {
    /// An instruction faulted: out-of-bounds access, address
    /// underflow, or an unregistered opcode.
    #[error(transparent)]
    Fault(#[from] Fault),
    /// A memory image larger than the machine memory was loaded.
    #[error("image of {len} bytes does not fit in {capacity} bytes of memory")]
    ProgramTooLarge {
        /// Length of the rejected image.
        len: usize,
        /// Size of the machine memory.
        capacity: usize,
    },
    /// The run loop exhausted its cycle budget without reaching a
    /// halt.
    #[error("no halt within {0} clock cycles")]
    CyclesExceeded(usize),
}
