use thiserror::Error;

/// Errors raised while registering instructions in an
/// [`InstructionSet`](crate::InstructionSet).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The explicit id is already taken by another instruction.
    #[error("an instruction with id {0} is already registered")]
    IdTaken(u8),
    /// The explicit id does not fit the table capacity.
    #[error("id {id} is outside the table capacity of {capacity}")]
    CapacityExceeded {
        /// The rejected id.
        id: u8,
        /// The table capacity.
        capacity: usize,
    },
    /// No vacant id is left for auto-assignment.
    #[error("the instruction table is full")]
    TableFull,
    /// An explicit operand order does not name exactly the operands
    /// declared by the mnemonic template.
    #[error("operand order {provided:?} does not cover the operands {declared:?} of `{mnemonic}`")]
    OperandOrderMismatch {
        /// The instruction's mnemonic template.
        mnemonic: String,
        /// Operand names declared by the template.
        declared: Vec<String>,
        /// Operand names the caller provided.
        provided: Vec<String>,
    },
}

/// Errors raised while encoding an instruction to bytes or mapping
/// text and bytes onto the instruction table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// `build` was called without a value for a declared operand.
    #[error("`{mnemonic}` requires an operand named `{operand}`")]
    MissingOperand {
        /// The instruction's mnemonic template.
        mnemonic: String,
        /// The operand that was not supplied.
        operand: String,
    },
    /// `build` was handed an operand the template does not declare.
    #[error("`{mnemonic}` takes no operand named `{operand}`")]
    UnknownOperand {
        /// The instruction's mnemonic template.
        mnemonic: String,
        /// The unexpected operand.
        operand: String,
    },
    /// The instruction has no opcode yet; register it first or give
    /// it an explicit id.
    #[error("`{mnemonic}` has no assigned opcode")]
    Unregistered {
        /// The instruction's mnemonic template.
        mnemonic: String,
    },
    /// A byte was looked up that maps to no registered instruction.
    #[error("no opcode {0:#04x} in the instruction set")]
    UnknownOpcode(u8),
    /// An operand in assembly text is not a decimal byte value.
    #[error("operand value `{0}` is not a byte")]
    BadOperandValue(String),
    /// No registered mnemonic template matches the assembly line.
    #[error("no instruction matches `{0}`")]
    NoMatch(String),
    /// A byte sequence ends in the middle of an instruction's
    /// operands.
    #[error("byte sequence is truncated inside `{0}`")]
    Truncated(String),
}
