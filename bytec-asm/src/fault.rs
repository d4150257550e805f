use thiserror::Error;

/// Faults a machine can raise while executing a single instruction.
///
/// This lives in the instruction crate rather than the emulator crate
/// so that instruction behaviors can return it without the crates
/// depending on each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[non_exhaustive]
pub enum Fault {
    /// A read or write touched an address at or beyond the end of the
    /// machine memory.
    #[error("memory access at {address:#04x} is outside the addressable range")]
    MemoryOverflow {
        /// The offending address.
        address: usize,
    },
    /// Address arithmetic went below zero, e.g. a push with the stack
    /// pointer already at the bottom of memory.
    #[error("address arithmetic underflowed below zero")]
    AddressUnderflow,
    /// A byte was fetched as an opcode but maps to no registered
    /// instruction, or the reserved `invalid` instruction ran.
    #[error("byte {opcode:#04x} is not a registered instruction")]
    InvalidOpcode {
        /// The fetched byte.
        opcode: u8,
    },
}
