use bytec_asm::BuildError;
use thiserror::Error;

use crate::token::Token;

/// Errors raised by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// The file uses both tabs and two-space steps for indentation.
    #[error("cannot mix spaces and tabs")]
    MixedIndentation,
    /// A line starts with a single space; indentation steps are two
    /// spaces or one tab.
    #[error("mismatched spaces")]
    MismatchedSpaces,
    /// A line is indented more than one step past the previous one.
    #[error("indentation increased by more than one step")]
    TooDeepIndentation,
    /// A line is indented less than the first line of the file.
    #[error("line is indented less than the first line of the file")]
    DedentBelowBase,
    /// An all-digit word does not fit in one byte.
    #[error("numeric constant `{0}` does not fit in a byte")]
    ConstantOutOfRange(String),
    /// A word is neither a symbol, a keyword, a number nor an
    /// identifier.
    #[error("unrecognized word `{0}`")]
    UnrecognizedWord(String),
}

/// Errors raised by the parser.
///
/// Speculative rules catch these, restore the token cursor and try
/// the next alternative; only when every alternative fails does one
/// surface to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParserError {
    /// The token stream ended where a rule needed more input.
    #[error("unexpected end of input")]
    NoMoreTokens,
    /// A rule met a token it cannot consume.
    #[error("expected {expected}, found {found:?}")]
    UnexpectedToken {
        /// What the active rule wanted.
        expected: String,
        /// The token actually present.
        found: Token,
    },
    /// The right side of `+`/`-` is itself a compound value.
    #[error("operation too complex: the right side of `+`/`-` must be a constant or identifier")]
    OperationTooComplex,
    /// No statement rule matches at the current position.
    #[error("no rule matches {0:?}")]
    NoMatch(Token),
}

/// Errors raised by the frame planner and the code generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// An identifier is used that the frame layout does not know.
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),
    /// A call names a function that has not been compiled.
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    /// A type annotation names no registered type.
    #[error("unknown type `{0}`")]
    UnknownType(String),
    /// A struct re-uses the name of a registered type.
    #[error("type `{0}` is already defined")]
    DuplicateType(String),
    /// A member access names no field of the value's type.
    #[error("`{base}` has no member `{member}`")]
    UnknownMember {
        /// The type being accessed.
        base: String,
        /// The missing field.
        member: String,
    },
    /// Two functions share a name.
    #[error("function `{0}` is already defined")]
    DuplicateFunction(String),
    /// The program defines no `main`.
    #[error("no `main` function")]
    MissingMain,
    /// `main` exists but takes parameters or returns a value.
    #[error("`main` must take no parameters and return nothing")]
    InvalidMainSignature,
    /// An identifier is re-declared with a different type.
    #[error("`{identifier}` is `{expected}` but is re-declared as `{found}`")]
    TypeMismatch {
        /// The offending identifier.
        identifier: String,
        /// The type of the first declaration.
        expected: String,
        /// The conflicting annotation.
        found: String,
    },
    /// A call supplies the wrong number of arguments.
    #[error("`{function}` takes {expected} argument bytes, {found} were supplied")]
    WrongArgumentCount {
        /// The callee.
        function: String,
        /// Parameter bytes in the callee's frame.
        expected: usize,
        /// Arguments at the call site.
        found: usize,
    },
    /// A call to a function returning nothing is used as a value.
    #[error("call to `{0}` produces no value")]
    VoidValue(String),
    /// A value wider than one byte where a byte is needed.
    #[error("`{0}` is not a byte-sized value")]
    NotByteSized(String),
    /// `return expr` inside a function returning nothing.
    #[error("`return` carries a value but the function returns nothing")]
    ReturnValueFromVoid,
    /// A binary operation has a compound right operand. The parser
    /// rejects these; this guards AST built by hand.
    #[error("the right side of a binary operation must be a constant or identifier")]
    UnsupportedOperand,
    /// An address or size no longer fits in a one-byte operand.
    #[error("program exceeds the addressable range at {0} bytes")]
    ProgramTooLarge(usize),
    /// A frame larger than one-byte offsets can span.
    #[error("frame of `{function}` needs {size} bytes, more than a call frame can address")]
    FrameTooLarge {
        /// The function being laid out.
        function: String,
        /// Its computed frame size.
        size: usize,
    },
    /// Instruction encoding failed; indicates a corrupt ISA handle.
    #[error(transparent)]
    Encoding(#[from] BuildError),
}

/// Umbrella error for the one-call pipeline entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LangError {
    /// Tokenizing failed.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// Parsing failed.
    #[error(transparent)]
    Parse(#[from] ParserError),
    /// Compilation failed.
    #[error(transparent)]
    Compile(#[from] CompileError),
}
