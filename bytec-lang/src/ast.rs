//! Abstract tree and recursive-descent parser.
//!
//! Speculative alternatives follow a checkpoint discipline: a
//! `try`-style rule records the token cursor, attempts to consume,
//! and restores the cursor on failure so the next alternative starts
//! from the same position.

use crate::error::ParserError;
use crate::token::Token;

/// One `.field` step of a member-access chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAccess(pub String);

/// The left side of an assignment; also used for parameters and
/// struct members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignTarget {
    /// Base identifier.
    pub name: String,
    /// Optional `:type` annotation.
    pub type_name: Option<String>,
    /// Whether the annotation was written `:new type`.
    pub explicit_new: bool,
    /// `.member` chain, outermost first.
    pub members: Vec<MemberAccess>,
}

impl AssignTarget {
    /// A bare, unannotated target.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            explicit_new: false,
            members: Vec::new(),
        }
    }

    /// A target with a `:type` annotation.
    pub fn typed(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::named(name)
        }
    }
}

/// A node that evaluates to a byte value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A literal byte.
    Constant(u8),
    /// A variable read, possibly through a member chain.
    Identifier {
        /// Base identifier.
        name: String,
        /// `.member` chain, outermost first; empty for plain reads.
        members: Vec<MemberAccess>,
    },
    /// `left + right`.
    Addition(Box<Value>, Box<Value>),
    /// `left - right`.
    Subtraction(Box<Value>, Box<Value>),
    /// A call used for its return value.
    Call {
        /// Callee name.
        name: String,
        /// Actual arguments, left to right.
        args: Vec<Value>,
    },
}

impl Value {
    /// A plain identifier read.
    pub fn identifier(name: impl Into<String>) -> Self {
        Value::Identifier {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Whether this value may stand on the right side of `+`/`-`.
    fn is_plain(&self) -> bool {
        matches!(self, Value::Constant(_) | Value::Identifier { .. })
    }
}

/// One statement of a function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `target = value`, or a bare typed declaration when `value` is
    /// absent.
    Assign {
        /// Where the value goes.
        target: AssignTarget,
        /// The value; `None` declares the slot without storing.
        value: Option<Value>,
    },
    /// `print(value)`.
    Print(Value),
    /// A call used for its effect; any return value is discarded.
    Call {
        /// Callee name.
        name: String,
        /// Actual arguments, left to right.
        args: Vec<Value>,
    },
    /// `while cond:` with its block.
    While {
        /// Loop condition, tested before every iteration.
        condition: Value,
        /// Loop body.
        body: Vec<Statement>,
    },
    /// `if cond:` with its block and optional `else:` block.
    If {
        /// Branch condition.
        condition: Value,
        /// Statements when the condition is non-zero.
        body: Vec<Statement>,
        /// Statements when it is zero; empty without `else`.
        else_body: Vec<Statement>,
    },
    /// `return` with an optional value.
    Return(Option<Value>),
}

/// A `def` with its signature and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionNode {
    /// Function name.
    pub name: String,
    /// Parameters in declaration order.
    pub parameters: Vec<AssignTarget>,
    /// Body statements.
    pub body: Vec<Statement>,
    /// Return type name; `None` means no return value.
    pub return_type: Option<String>,
}

/// A `struct` with its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructNode {
    /// Type name being defined.
    pub name: String,
    /// Members in declaration order.
    pub members: Vec<AssignTarget>,
}

/// A top-level definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    /// A function definition.
    Function(FunctionNode),
    /// A struct definition.
    Struct(StructNode),
}

/// Parse a token stream into top-level definitions.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Definition>, ParserError> {
    Parser::new(tokens).parse_program()
}

/// Parse a token stream as a flat statement list.
///
/// Used for script-style input: a synthetic [`Token::EndBlock`]
/// sentinel terminates the list so the block rule can be reused
/// unchanged.
pub fn parse_statements(mut tokens: Vec<Token>) -> Result<Vec<Statement>, ParserError> {
    tokens.push(Token::EndBlock);
    Parser::new(tokens).parse_statements_until_end_block()
}

/// Recursive-descent parser over a token vector.
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    /// A parser positioned at the first token.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    /// Current cursor position, for checkpointing.
    pub fn savepoint(&self) -> usize {
        self.index
    }

    /// Rewind to a previously recorded checkpoint.
    pub fn restore(&mut self, checkpoint: usize) {
        self.index = checkpoint;
    }

    /// Whether any tokens remain.
    pub fn has_more(&self) -> bool {
        self.index < self.tokens.len()
    }

    fn peek(&self) -> Result<&Token, ParserError> {
        self.tokens.get(self.index).ok_or(ParserError::NoMoreTokens)
    }

    fn consume(&mut self) -> Result<Token, ParserError> {
        let token = self.peek()?.clone();
        self.index += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParserError> {
        let found = self.consume()?;
        if &found == expected {
            Ok(())
        } else {
            Err(ParserError::UnexpectedToken {
                expected: format!("{expected:?}"),
                found,
            })
        }
    }

    fn consume_identifier(&mut self) -> Result<String, ParserError> {
        match self.consume()? {
            Token::Identifier(name) => Ok(name),
            found => Err(ParserError::UnexpectedToken {
                expected: "an identifier".to_string(),
                found,
            }),
        }
    }

    /// Run `rule` speculatively: on failure the cursor is restored
    /// and `None` is returned.
    fn attempt<T>(&mut self, rule: fn(&mut Self) -> Result<T, ParserError>) -> Option<T> {
        let checkpoint = self.savepoint();
        match rule(self) {
            Ok(node) => Some(node),
            Err(_) => {
                self.restore(checkpoint);
                None
            }
        }
    }

    /// `program := (EOL | function_def | struct_def)*`
    pub fn parse_program(&mut self) -> Result<Vec<Definition>, ParserError> {
        let mut definitions = Vec::new();

        while self.has_more() {
            match self.peek()? {
                Token::EndOfLine => {
                    self.index += 1;
                }
                Token::Def => {
                    definitions.push(Definition::Function(self.parse_function_definition()?));
                }
                Token::Struct => {
                    definitions.push(Definition::Struct(self.parse_struct_definition()?));
                }
                found => return Err(ParserError::NoMatch(found.clone())),
            }
        }

        Ok(definitions)
    }

    /// `'def' ident '(' param_list ')' ':' [ident] EOL BEGIN stmt* END`
    pub fn parse_function_definition(&mut self) -> Result<FunctionNode, ParserError> {
        self.expect(&Token::Def)?;
        let name = self.consume_identifier()?;

        self.expect(&Token::LeftParen)?;
        let mut parameters = Vec::new();
        loop {
            if self.peek()? == &Token::RightParen {
                self.index += 1;
                break;
            }
            parameters.push(self.parse_assign_target()?);
            match self.peek()? {
                Token::Comma => self.index += 1,
                Token::RightParen => {}
                found => {
                    return Err(ParserError::UnexpectedToken {
                        expected: "`,` or `)`".to_string(),
                        found: found.clone(),
                    })
                }
            }
        }

        self.expect(&Token::Colon)?;
        let return_type = match self.peek()? {
            Token::Identifier(_) => Some(self.consume_identifier()?),
            _ => None,
        };
        self.expect(&Token::EndOfLine)?;
        self.expect(&Token::BeginBlock)?;
        let body = self.parse_statements_until_end_block()?;

        Ok(FunctionNode {
            name,
            parameters,
            body,
            return_type,
        })
    }

    /// `'struct' ident ':' EOL BEGIN (assign_target EOL)+ END`
    pub fn parse_struct_definition(&mut self) -> Result<StructNode, ParserError> {
        self.expect(&Token::Struct)?;
        let name = self.consume_identifier()?;
        self.expect(&Token::Colon)?;
        self.expect(&Token::EndOfLine)?;
        self.expect(&Token::BeginBlock)?;

        let mut members = Vec::new();
        loop {
            match self.peek()? {
                Token::EndBlock => {
                    self.index += 1;
                    break;
                }
                Token::EndOfLine => self.index += 1,
                _ => {
                    members.push(self.parse_assign_target()?);
                    self.expect(&Token::EndOfLine)?;
                }
            }
        }

        Ok(StructNode { name, members })
    }

    /// Statements until the matching `EndBlock`, which is consumed.
    pub fn parse_statements_until_end_block(&mut self) -> Result<Vec<Statement>, ParserError> {
        let mut statements = Vec::new();

        loop {
            match self.peek()? {
                Token::EndBlock => {
                    self.index += 1;
                    return Ok(statements);
                }
                Token::EndOfLine => self.index += 1,
                _ => statements.push(self.parse_statement()?),
            }
        }
    }

    /// Try each statement rule in a fixed order; first success wins.
    pub fn parse_statement(&mut self) -> Result<Statement, ParserError> {
        if let Some(statement) = self.attempt(Self::parse_assignment) {
            return Ok(statement);
        }
        if let Some(statement) = self.attempt(Self::parse_print) {
            return Ok(statement);
        }
        if let Some(statement) = self.attempt(Self::parse_call_statement) {
            return Ok(statement);
        }
        if let Some(statement) = self.attempt(Self::parse_while) {
            return Ok(statement);
        }
        if let Some(statement) = self.attempt(Self::parse_if) {
            return Ok(statement);
        }
        if let Some(statement) = self.attempt(Self::parse_return) {
            return Ok(statement);
        }

        Err(ParserError::NoMatch(self.peek()?.clone()))
    }

    /// `ident ('.' ident)* [':' ['new'] ident]`
    pub fn parse_assign_target(&mut self) -> Result<AssignTarget, ParserError> {
        let name = self.consume_identifier()?;

        let mut members = Vec::new();
        while self.peek()? == &Token::Dot {
            self.index += 1;
            members.push(MemberAccess(self.consume_identifier()?));
        }

        let mut type_name = None;
        let mut explicit_new = false;
        if self.peek()? == &Token::Colon {
            self.index += 1;
            if self.peek()? == &Token::New {
                self.index += 1;
                explicit_new = true;
            }
            type_name = Some(self.consume_identifier()?);
        }

        Ok(AssignTarget {
            name,
            type_name,
            explicit_new,
            members,
        })
    }

    /// `assign_target '=' value EOL`, or a bare typed declaration.
    pub fn parse_assignment(&mut self) -> Result<Statement, ParserError> {
        let target = self.parse_assign_target()?;

        match self.peek()? {
            Token::Equals => {
                self.index += 1;
                let value = self.parse_value_provider()?;
                self.expect(&Token::EndOfLine)?;
                Ok(Statement::Assign {
                    target,
                    value: Some(value),
                })
            }
            Token::EndOfLine if target.type_name.is_some() && target.members.is_empty() => {
                self.index += 1;
                Ok(Statement::Assign {
                    target,
                    value: None,
                })
            }
            found => Err(ParserError::UnexpectedToken {
                expected: "`=`".to_string(),
                found: found.clone(),
            }),
        }
    }

    /// `'print' '(' value ')' EOL`
    pub fn parse_print(&mut self) -> Result<Statement, ParserError> {
        self.expect(&Token::Print)?;
        self.expect(&Token::LeftParen)?;
        let value = self.parse_value_provider()?;
        self.expect(&Token::RightParen)?;
        self.expect(&Token::EndOfLine)?;
        Ok(Statement::Print(value))
    }

    /// `ident '(' arg_list ')' EOL`
    pub fn parse_call_statement(&mut self) -> Result<Statement, ParserError> {
        let name = self.consume_identifier()?;
        let args = self.parse_call_arguments()?;
        self.expect(&Token::EndOfLine)?;
        Ok(Statement::Call { name, args })
    }

    fn parse_call_arguments(&mut self) -> Result<Vec<Value>, ParserError> {
        self.expect(&Token::LeftParen)?;
        let mut args = Vec::new();

        loop {
            if self.peek()? == &Token::RightParen {
                self.index += 1;
                break;
            }
            args.push(self.parse_value_provider()?);
            match self.peek()? {
                Token::Comma => self.index += 1,
                Token::RightParen => {}
                found => {
                    return Err(ParserError::UnexpectedToken {
                        expected: "`,` or `)`".to_string(),
                        found: found.clone(),
                    })
                }
            }
        }

        Ok(args)
    }

    /// `'while' value ':' EOL BEGIN stmt* END`
    pub fn parse_while(&mut self) -> Result<Statement, ParserError> {
        self.expect(&Token::While)?;
        let condition = self.parse_value_provider()?;
        self.expect(&Token::Colon)?;
        self.expect(&Token::EndOfLine)?;
        self.expect(&Token::BeginBlock)?;
        let body = self.parse_statements_until_end_block()?;
        Ok(Statement::While { condition, body })
    }

    /// `'if' value ':' EOL BEGIN stmt* END ['else' ':' EOL BEGIN stmt* END]`
    pub fn parse_if(&mut self) -> Result<Statement, ParserError> {
        self.expect(&Token::If)?;
        let condition = self.parse_value_provider()?;
        self.expect(&Token::Colon)?;
        self.expect(&Token::EndOfLine)?;
        self.expect(&Token::BeginBlock)?;
        let body = self.parse_statements_until_end_block()?;

        let mut else_body = Vec::new();
        if self.has_more() && self.peek()? == &Token::Else {
            self.index += 1;
            self.expect(&Token::Colon)?;
            self.expect(&Token::EndOfLine)?;
            self.expect(&Token::BeginBlock)?;
            else_body = self.parse_statements_until_end_block()?;
        }

        Ok(Statement::If {
            condition,
            body,
            else_body,
        })
    }

    /// `'return' [value] EOL`
    pub fn parse_return(&mut self) -> Result<Statement, ParserError> {
        self.expect(&Token::Return)?;

        if self.peek()? == &Token::EndOfLine {
            self.index += 1;
            return Ok(Statement::Return(None));
        }

        let value = self.parse_value_provider()?;
        self.expect(&Token::EndOfLine)?;
        Ok(Statement::Return(Some(value)))
    }

    /// One value: a primary, optionally joined to a second primary by
    /// a single `+`/`-`.
    ///
    /// The right operand must itself be a constant or identifier;
    /// anything deeper is rejected as too complex.
    pub fn parse_value_provider(&mut self) -> Result<Value, ParserError> {
        let first = self.parse_primary()?;

        let next = self.peek()?;
        if next.is_expression_separator() {
            return Ok(first);
        }
        if !next.is_single_operation() {
            return Err(ParserError::UnexpectedToken {
                expected: "an operator or the end of the expression".to_string(),
                found: next.clone(),
            });
        }

        let operation = self.consume()?;
        let second = self.parse_value_provider()?;
        if !second.is_plain() {
            return Err(ParserError::OperationTooComplex);
        }

        let node = if operation == Token::Plus {
            Value::Addition(Box::new(first), Box::new(second))
        } else {
            Value::Subtraction(Box::new(first), Box::new(second))
        };
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<Value, ParserError> {
        match self.peek()? {
            Token::NumericConstant(value) => {
                let value = *value;
                self.index += 1;
                Ok(Value::Constant(value))
            }
            Token::Identifier(_) => {
                let name = self.consume_identifier()?;

                if self.has_more() && self.peek()? == &Token::LeftParen {
                    let args = self.parse_call_arguments()?;
                    return Ok(Value::Call { name, args });
                }

                let mut members = Vec::new();
                while self.has_more() && self.peek()? == &Token::Dot {
                    self.index += 1;
                    members.push(MemberAccess(self.consume_identifier()?));
                }
                Ok(Value::Identifier { name, members })
            }
            found => Err(ParserError::UnexpectedToken {
                expected: "a constant, identifier or call".to_string(),
                found: found.clone(),
            }),
        }
    }
}
