//! Single-pass code generation.
//!
//! Bytes are appended to a growable buffer; forward jumps reserve
//! zeroed space with [`CodeBuffer::make_space_for`] and are patched
//! with [`CodeBuffer::put_code_at`] once their target address is
//! known, so no second pass over the program is needed.

use std::collections::HashMap;

use tracing::debug;

use bytec_vm::consts::STACK_START;
use bytec_vm::{Isa, Op};

use crate::ast::{Definition, FunctionNode, MemberAccess, Statement, StructNode, Value};
use crate::error::CompileError;
use crate::frame::{plan_frame, FrameLayout, RESULT};
use crate::types::{DataType, TypeRegistry};

/// A function that has been given an entry address.
///
/// Entries are recorded before the body is emitted, so a function can
/// call itself.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    /// Function name.
    pub name: String,
    /// Resolved return type.
    pub return_type: DataType,
    /// The function's frame plan.
    pub layout: FrameLayout,
    /// Byte offset of the prologue within the program.
    pub entry: usize,
}

/// The growable program image and its emit cursor.
struct CodeBuffer {
    bytes: Vec<u8>,
}

impl CodeBuffer {
    fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// The emit cursor: where the next byte will land.
    fn cursor(&self) -> usize {
        self.bytes.len()
    }

    fn put_code(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Overwrite previously emitted bytes, for backpatching.
    fn put_code_at(&mut self, bytes: &[u8], position: usize) {
        self.bytes[position..position + bytes.len()].copy_from_slice(bytes);
    }

    /// Reserve zeroed space for `instruction` and return its position.
    fn make_space_for(&mut self, instruction: &Op) -> usize {
        let position = self.cursor();
        self.bytes.resize(position + instruction.size(), 0);
        position
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Compiles definitions against the default instruction set.
pub struct Compiler {
    isa: Isa,
    types: TypeRegistry,
    buffer: CodeBuffer,
    functions: HashMap<String, CompiledFunction>,
}

impl Compiler {
    /// A compiler with the built-in types and a fresh buffer.
    pub fn new() -> Self {
        Self {
            isa: Isa::default(),
            types: TypeRegistry::new(),
            buffer: CodeBuffer::new(),
            functions: HashMap::new(),
        }
    }

    /// The types currently in scope.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Register the type a `struct` definition describes.
    pub fn build_struct(&mut self, node: &StructNode) -> Result<(), CompileError> {
        let mut members = Vec::new();
        for member in &node.members {
            let data_type = match &member.type_name {
                Some(name) => self.types.resolve(name)?.clone(),
                None => self.types.byte().clone(),
            };
            members.push((member.name.clone(), data_type));
        }

        self.types
            .register(DataType::structure(node.name.clone(), members))
    }

    /// Compile a whole program.
    ///
    /// Emits the fixed entry sequence, compiles every function in
    /// declaration order, then backpatches the reserved call to
    /// `main` (which must exist, take no parameters and return
    /// nothing) and the final halt.
    pub fn build_program(mut self, definitions: &[Definition]) -> Result<Vec<u8>, CompileError> {
        self.buffer
            .put_code(&self.isa.ldfp.build(&[("val", STACK_START)])?);
        self.buffer
            .put_code(&self.isa.ldsp.build(&[("val", STACK_START)])?);
        let call_main = self.buffer.make_space_for(&self.isa.call);
        let exit_slot = self.buffer.make_space_for(&self.isa.exit);

        for definition in definitions {
            match definition {
                Definition::Struct(node) => self.build_struct(node)?,
                Definition::Function(node) => self.compile_function(node)?,
            }
        }

        let main = self.functions.get("main").ok_or(CompileError::MissingMain)?;
        if main.layout.size_of_parameters != 0 || !main.return_type.is_void() {
            return Err(CompileError::InvalidMainSignature);
        }
        let entry = operand(main.entry)?;

        let call = self.isa.call.build(&[("addr", entry)])?;
        self.buffer.put_code_at(&call, call_main);
        let exit = self.isa.exit.build(&[])?;
        self.buffer.put_code_at(&exit, exit_slot);

        Ok(self.buffer.into_bytes())
    }

    /// Compile a statement list as the body of a zero-argument
    /// `main`, for script-style input.
    pub fn build_single_main_function(
        self,
        statements: Vec<Statement>,
    ) -> Result<Vec<u8>, CompileError> {
        let main = FunctionNode {
            name: "main".to_string(),
            parameters: Vec::new(),
            body: statements,
            return_type: None,
        };
        self.build_program(&[Definition::Function(main)])
    }

    fn compile_function(&mut self, node: &FunctionNode) -> Result<(), CompileError> {
        if self.functions.contains_key(&node.name) {
            return Err(CompileError::DuplicateFunction(node.name.clone()));
        }

        let layout = plan_frame(&self.types, node)?;
        if layout.total_size > usize::from(u8::MAX) {
            return Err(CompileError::FrameTooLarge {
                function: node.name.clone(),
                size: layout.total_size,
            });
        }

        let return_type = match &node.return_type {
            Some(name) => self.types.resolve(name)?.clone(),
            None => self.types.void().clone(),
        };

        let entry = self.buffer.cursor();
        debug!(
            function = %node.name,
            entry,
            frame = layout.total_size,
            "compiling function"
        );

        // Recorded up front so the body can call the function itself.
        self.functions.insert(
            node.name.clone(),
            CompiledFunction {
                name: node.name.clone(),
                return_type,
                layout: layout.clone(),
                entry,
            },
        );

        if layout.size_of_vars > 0 {
            let size = operand(layout.size_of_vars)?;
            self.buffer.put_code(&self.isa.subsp.build(&[("val", size)])?);
        }
        self.buffer.put_code(&self.isa.ldfp_sp.build(&[])?);

        self.compile_statements(&node.body, &layout)?;
        self.emit_epilogue(&layout)?;

        Ok(())
    }

    /// The frame-unwinding return; locals are popped by size.
    fn emit_epilogue(&mut self, layout: &FrameLayout) -> Result<(), CompileError> {
        if layout.size_of_vars > 0 {
            let size = operand(layout.size_of_vars)?;
            self.buffer.put_code(&self.isa.retfs.build(&[("size", size)])?);
        } else {
            self.buffer.put_code(&self.isa.ret.build(&[])?);
        }
        Ok(())
    }

    fn compile_statements(
        &mut self,
        statements: &[Statement],
        layout: &FrameLayout,
    ) -> Result<(), CompileError> {
        for statement in statements {
            self.compile_statement(statement, layout)?;
        }
        Ok(())
    }

    fn compile_statement(
        &mut self,
        statement: &Statement,
        layout: &FrameLayout,
    ) -> Result<(), CompileError> {
        match statement {
            Statement::Print(value) => {
                self.load_value(value, layout)?;
                self.buffer.put_code(&self.isa.out.build(&[])?);
            }

            Statement::Assign { target, value } => {
                // A bare typed declaration only reserves its slot.
                let Some(value) = value else {
                    return Ok(());
                };

                let (offset, data_type) = resolve_slot(layout, &target.name, &target.members)?;
                if data_type.size() != 1 {
                    return Err(CompileError::NotByteSized(target.name.clone()));
                }

                self.load_value(value, layout)?;
                self.buffer
                    .put_code(&self.isa.sta_fp.build(&[("offset", offset)])?);
            }

            Statement::Call { name, args } => {
                let return_size = self.emit_call(name, args, layout)?;
                if return_size > 0 {
                    // Discard the unused return slot.
                    let size = operand(return_size)?;
                    self.buffer.put_code(&self.isa.addsp.build(&[("val", size)])?);
                }
            }

            Statement::While { condition, body } => {
                let start = self.buffer.cursor();
                self.load_value(condition, layout)?;
                self.buffer.put_code(&self.isa.tsta.build(&[])?);
                let exit_jump = self.buffer.make_space_for(&self.isa.jmpz);

                self.compile_statements(body, layout)?;
                self.buffer
                    .put_code(&self.isa.jmp.build(&[("addr", operand(start)?)])?);

                let after = operand(self.buffer.cursor())?;
                let patched = self.isa.jmpz.build(&[("addr", after)])?;
                self.buffer.put_code_at(&patched, exit_jump);
            }

            Statement::If {
                condition,
                body,
                else_body,
            } => {
                self.load_value(condition, layout)?;
                self.buffer.put_code(&self.isa.tsta.build(&[])?);
                let false_jump = self.buffer.make_space_for(&self.isa.jmpz);

                self.compile_statements(body, layout)?;

                if else_body.is_empty() {
                    let after = operand(self.buffer.cursor())?;
                    let patched = self.isa.jmpz.build(&[("addr", after)])?;
                    self.buffer.put_code_at(&patched, false_jump);
                } else {
                    let end_jump = self.buffer.make_space_for(&self.isa.jmp);

                    let else_start = operand(self.buffer.cursor())?;
                    let patched = self.isa.jmpz.build(&[("addr", else_start)])?;
                    self.buffer.put_code_at(&patched, false_jump);

                    self.compile_statements(else_body, layout)?;

                    let after = operand(self.buffer.cursor())?;
                    let patched = self.isa.jmp.build(&[("addr", after)])?;
                    self.buffer.put_code_at(&patched, end_jump);
                }
            }

            Statement::Return(value) => {
                if let Some(value) = value {
                    let slot = layout
                        .identifier(RESULT)
                        .ok_or(CompileError::ReturnValueFromVoid)?;
                    if slot.data_type.size() != 1 {
                        return Err(CompileError::NotByteSized(RESULT.to_string()));
                    }
                    let offset = operand(slot.offset)?;

                    self.load_value(value, layout)?;
                    self.buffer
                        .put_code(&self.isa.sta_fp.build(&[("offset", offset)])?);
                }
                self.emit_epilogue(layout)?;
            }
        }

        Ok(())
    }

    /// The call sequence shared by call statements and call values:
    /// reserve the return slot, push the arguments left to right,
    /// call, release the arguments. Returns the callee's return size;
    /// its slot, if any, is left on top of the stack.
    fn emit_call(
        &mut self,
        name: &str,
        args: &[Value],
        layout: &FrameLayout,
    ) -> Result<usize, CompileError> {
        let (entry, return_size, parameter_size) = {
            let callee = self
                .functions
                .get(name)
                .ok_or_else(|| CompileError::UnknownFunction(name.to_string()))?;
            (
                callee.entry,
                callee.return_type.size(),
                callee.layout.size_of_parameters,
            )
        };

        // Arguments are byte-wide, so the count must equal the
        // callee's parameter bytes.
        if args.len() != parameter_size {
            return Err(CompileError::WrongArgumentCount {
                function: name.to_string(),
                expected: parameter_size,
                found: args.len(),
            });
        }

        if return_size > 0 {
            let size = operand(return_size)?;
            self.buffer.put_code(&self.isa.subsp.build(&[("val", size)])?);
        }

        for arg in args {
            self.load_value(arg, layout)?;
            self.buffer.put_code(&self.isa.pusha.build(&[])?);
        }

        self.buffer
            .put_code(&self.isa.call.build(&[("addr", operand(entry)?)])?);

        if parameter_size > 0 {
            let size = operand(parameter_size)?;
            self.buffer.put_code(&self.isa.addsp.build(&[("val", size)])?);
        }

        Ok(return_size)
    }

    /// Lower a value into `A`.
    fn load_value(&mut self, value: &Value, layout: &FrameLayout) -> Result<(), CompileError> {
        match value {
            Value::Constant(value) => {
                self.buffer.put_code(&self.isa.lda.build(&[("val", *value)])?);
            }

            Value::Identifier { name, members } => {
                let (offset, data_type) = resolve_slot(layout, name, members)?;
                if data_type.size() != 1 {
                    return Err(CompileError::NotByteSized(name.clone()));
                }
                self.buffer
                    .put_code(&self.isa.lda_fp.build(&[("offset", offset)])?);
            }

            Value::Addition(left, right) => self.binary_operation(left, right, true, layout)?,
            Value::Subtraction(left, right) => self.binary_operation(left, right, false, layout)?,

            Value::Call { name, args } => {
                let return_size = {
                    let callee = self
                        .functions
                        .get(name)
                        .ok_or_else(|| CompileError::UnknownFunction(name.to_string()))?;
                    callee.return_type.size()
                };
                if return_size == 0 {
                    return Err(CompileError::VoidValue(name.clone()));
                }
                if return_size != 1 {
                    return Err(CompileError::NotByteSized(name.clone()));
                }

                self.emit_call(name, args, layout)?;
                self.buffer.put_code(&self.isa.popa.build(&[])?);
            }
        }

        Ok(())
    }

    /// `left` goes through `A`; `right` must collapse to an immediate
    /// or a frame offset.
    fn binary_operation(
        &mut self,
        left: &Value,
        right: &Value,
        addition: bool,
        layout: &FrameLayout,
    ) -> Result<(), CompileError> {
        self.load_value(left, layout)?;

        match right {
            Value::Constant(value) => {
                let op = if addition { &self.isa.adda } else { &self.isa.suba };
                let bytes = op.build(&[("val", *value)])?;
                self.buffer.put_code(&bytes);
            }
            Value::Identifier { name, members } => {
                let (offset, data_type) = resolve_slot(layout, name, members)?;
                if data_type.size() != 1 {
                    return Err(CompileError::NotByteSized(name.clone()));
                }
                let op = if addition {
                    &self.isa.adda_fp
                } else {
                    &self.isa.suba_fp
                };
                let bytes = op.build(&[("offset", offset)])?;
                self.buffer.put_code(&bytes);
            }
            _ => return Err(CompileError::UnsupportedOperand),
        }

        Ok(())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve an identifier plus member chain to a frame offset and the
/// type of the addressed slot.
fn resolve_slot<'a>(
    layout: &'a FrameLayout,
    name: &str,
    members: &[MemberAccess],
) -> Result<(u8, &'a DataType), CompileError> {
    let slot = layout
        .identifier(name)
        .ok_or_else(|| CompileError::UnknownVariable(name.to_string()))?;

    let mut offset = slot.offset;
    let mut data_type = &slot.data_type;
    for member in members {
        let field = data_type
            .field(&member.0)
            .ok_or_else(|| CompileError::UnknownMember {
                base: data_type.name().to_string(),
                member: member.0.clone(),
            })?;
        offset += field.offset;
        data_type = &field.data_type;
    }

    Ok((operand(offset)?, data_type))
}

/// Narrow an address or size to a one-byte instruction operand.
fn operand(value: usize) -> Result<u8, CompileError> {
    u8::try_from(value).map_err(|_| CompileError::ProgramTooLarge(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{parse, parse_statements, AssignTarget};
    use crate::token::tokenize;

    fn compile(source: &str) -> Result<Vec<u8>, CompileError> {
        let definitions = parse(tokenize(source).unwrap()).unwrap();
        Compiler::new().build_program(&definitions)
    }

    #[test]
    fn a_program_needs_a_main() {
        assert_eq!(
            compile("def helper():\n  print(1)\n").unwrap_err(),
            CompileError::MissingMain
        );
    }

    #[test]
    fn main_must_be_plain() {
        assert_eq!(
            compile("def main(a):\n  print(a)\n").unwrap_err(),
            CompileError::InvalidMainSignature
        );
        assert_eq!(
            compile("def main(): byte\n  result=1\n").unwrap_err(),
            CompileError::InvalidMainSignature
        );
    }

    #[test]
    fn duplicate_functions_are_rejected() {
        let source = "def main():\n  print(1)\n\ndef main():\n  print(2)\n";
        assert_eq!(
            compile(source).unwrap_err(),
            CompileError::DuplicateFunction("main".to_string())
        );
    }

    #[test]
    fn unknown_variables_are_rejected() {
        let statements = parse_statements(tokenize("print(missing)\n").unwrap()).unwrap();
        assert_eq!(
            Compiler::new()
                .build_single_main_function(statements)
                .unwrap_err(),
            CompileError::UnknownVariable("missing".to_string())
        );
    }

    #[test]
    fn unknown_functions_are_rejected() {
        let statements = parse_statements(tokenize("missing(1)\n").unwrap()).unwrap();
        assert_eq!(
            Compiler::new()
                .build_single_main_function(statements)
                .unwrap_err(),
            CompileError::UnknownFunction("missing".to_string())
        );
    }

    #[test]
    fn call_sites_check_their_argument_count() {
        let source = "def test(a, b):\n  print(a)\n\ndef main():\n  test(1)\n";
        assert_eq!(
            compile(source).unwrap_err(),
            CompileError::WrongArgumentCount {
                function: "test".to_string(),
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn functions_must_be_declared_before_use() {
        let source = "def main():\n  late()\n\ndef late():\n  print(1)\n";
        assert_eq!(
            compile(source).unwrap_err(),
            CompileError::UnknownFunction("late".to_string())
        );
    }

    #[test]
    fn void_calls_cannot_be_values() {
        let source = "def test():\n  print(1)\n\ndef main():\n  a = test()\n";
        assert_eq!(
            compile(source).unwrap_err(),
            CompileError::VoidValue("test".to_string())
        );
    }

    #[test]
    fn return_with_a_value_needs_a_return_type() {
        let source = "def main():\n  return 5\n";
        assert_eq!(compile(source).unwrap_err(), CompileError::ReturnValueFromVoid);
    }

    #[test]
    fn struct_values_do_not_fit_in_a_byte() {
        let source = "struct wide:\n  a\n  b\n\ndef main():\n  w:wide\n  print(w)\n";
        assert_eq!(
            compile(source).unwrap_err(),
            CompileError::NotByteSized("w".to_string())
        );
    }

    #[test]
    fn member_chains_must_exist() {
        let source = "struct pair:\n  a\n  b\n\ndef main():\n  p:pair\n  p.c=1\n";
        assert_eq!(
            compile(source).unwrap_err(),
            CompileError::UnknownMember {
                base: "pair".to_string(),
                member: "c".to_string(),
            }
        );
    }

    #[test]
    fn hand_built_compound_right_operands_are_rejected() {
        let statements = vec![Statement::Assign {
            target: AssignTarget::named("a"),
            value: Some(Value::Addition(
                Box::new(Value::Constant(1)),
                Box::new(Value::Addition(
                    Box::new(Value::Constant(2)),
                    Box::new(Value::Constant(3)),
                )),
            )),
        }];
        assert_eq!(
            Compiler::new()
                .build_single_main_function(statements)
                .unwrap_err(),
            CompileError::UnsupportedOperand
        );
    }
}
