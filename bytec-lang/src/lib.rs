//! Front end and code generator for the bytec language.
//!
//! The language is a tiny indentation-based imperative notation:
//! functions with byte-typed parameters and locals, `if`/`else`,
//! `while`, `print`, single `+`/`-` operations, calls with optional
//! return values, and user-defined record types. Compilation is a
//! straight pipeline:
//!
//! ```text
//! source text -> tokens -> AST -> frame layouts -> program bytes
//! ```
//!
//! and the produced bytes run on the machine in `bytec-vm`.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod frame;
pub mod token;
pub mod types;

pub use codegen::{CompiledFunction, Compiler};
pub use error::{CompileError, LangError, ParserError, SyntaxError};

/// Compile a program text: tokenize, parse the definitions, generate
/// code.
pub fn compile_source(source: &str) -> Result<Vec<u8>, LangError> {
    let tokens = token::tokenize(source)?;
    let definitions = ast::parse(tokens)?;
    Ok(Compiler::new().build_program(&definitions)?)
}

/// Compile a script text: a flat statement list that becomes the body
/// of `main`.
pub fn compile_body(source: &str) -> Result<Vec<u8>, LangError> {
    let tokens = token::tokenize(source)?;
    let statements = ast::parse_statements(tokens)?;
    Ok(Compiler::new().build_single_main_function(statements)?)
}

/// Commonly used types for compiling and running programs.
pub mod prelude {
    pub use crate::ast::{
        parse, parse_statements, AssignTarget, Definition, FunctionNode, MemberAccess, Parser,
        Statement, StructNode, Value,
    };
    pub use crate::codegen::{CompiledFunction, Compiler};
    pub use crate::error::{CompileError, LangError, ParserError, SyntaxError};
    pub use crate::frame::{plan_frame, FrameLayout};
    pub use crate::token::{parse_line, to_token, tokenize, Token};
    pub use crate::types::{DataType, Field, TypeRegistry};
    pub use crate::{compile_body, compile_source};
}
