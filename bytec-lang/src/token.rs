//! Indentation-aware tokenizer.
//!
//! Lines are processed one at a time. Leading indentation is counted
//! in *steps* (one tab or two spaces, never mixed within a file) and
//! turned into synthetic [`Token::BeginBlock`]/[`Token::EndBlock`]
//! tokens, so the parser never sees whitespace.

use std::cmp::Ordering;

use crate::error::SyntaxError;

/// Characters that end the word currently being scanned.
pub const DELIMITERS: [char; 12] = [
    ' ', '#', '(', ')', ',', ':', '+', '-', '=', '<', '>', '.',
];

/// One lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `=`
    Equals,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `.`
    Dot,
    /// End of a non-empty source line.
    EndOfLine,
    /// Indentation went one step deeper.
    BeginBlock,
    /// Indentation came one step back.
    EndBlock,
    /// `def`
    Def,
    /// `print`
    Print,
    /// `while`
    While,
    /// `if`
    If,
    /// `else`
    Else,
    /// `return`
    Return,
    /// `new`
    New,
    /// `struct`
    Struct,
    /// Any other alphanumeric word.
    Identifier(String),
    /// An all-digit word; byte-sized.
    NumericConstant(u8),
}

impl Token {
    /// Tokens that end a value expression.
    pub const fn is_expression_separator(&self) -> bool {
        matches!(
            self,
            Token::EndOfLine | Token::Comma | Token::RightParen | Token::Colon
        )
    }

    /// Tokens that join exactly two operands.
    pub const fn is_single_operation(&self) -> bool {
        matches!(self, Token::Plus | Token::Minus)
    }
}

/// Classify one word or symbol.
pub fn to_token(word: &str) -> Result<Token, SyntaxError> {
    let token = match word {
        "(" => Token::LeftParen,
        ")" => Token::RightParen,
        "," => Token::Comma,
        ":" => Token::Colon,
        "=" => Token::Equals,
        "+" => Token::Plus,
        "-" => Token::Minus,
        "<" => Token::Less,
        ">" => Token::Greater,
        "." => Token::Dot,
        "def" => Token::Def,
        "print" => Token::Print,
        "while" => Token::While,
        "if" => Token::If,
        "else" => Token::Else,
        "return" => Token::Return,
        "new" => Token::New,
        "struct" => Token::Struct,
        _ if !word.is_empty() && word.chars().all(|c| c.is_ascii_digit()) => {
            let value = word
                .parse::<u8>()
                .map_err(|_| SyntaxError::ConstantOutOfRange(word.to_string()))?;
            Token::NumericConstant(value)
        }
        _ if !word.is_empty()
            && word
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_') =>
        {
            Token::Identifier(word.to_string())
        }
        _ => return Err(SyntaxError::UnrecognizedWord(word.to_string())),
    };

    Ok(token)
}

/// Tokenize one line of source with its indentation already stripped.
///
/// A trailing [`Token::EndOfLine`] is appended unless the line
/// produced no tokens at all (blank or comment-only lines).
pub fn parse_line(line: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut word = String::new();

    for symbol in line.chars() {
        if DELIMITERS.contains(&symbol) {
            if !word.is_empty() {
                tokens.push(to_token(&word)?);
                word.clear();
            }
            if symbol == ' ' {
                continue;
            }
            if symbol == '#' {
                // Comment, ignore the rest of the line.
                break;
            }
            tokens.push(to_token(symbol.encode_utf8(&mut [0; 4]))?);
        } else {
            word.push(symbol);
        }
    }

    if !word.is_empty() {
        tokens.push(to_token(&word)?);
    }
    if !tokens.is_empty() {
        tokens.push(Token::EndOfLine);
    }

    Ok(tokens)
}

/// Per-file tokenizer state: the base indentation and the tab/space
/// discipline span lines, so they live here rather than in the
/// per-line helpers.
#[derive(Debug, Default)]
pub struct Tokenizer {
    base: Option<usize>,
    level: usize,
    has_tabs: bool,
    has_spaces: bool,
}

impl Tokenizer {
    /// A fresh tokenizer with no indentation history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the leading indentation steps of `line` and return the
    /// remainder.
    pub fn indentation<'a>(&mut self, line: &'a str) -> Result<(usize, &'a str), SyntaxError> {
        let mut rest = line;
        let mut steps = 0;

        loop {
            let bytes = rest.as_bytes();
            let consumed = if bytes.first() == Some(&b'\t') {
                if self.has_spaces {
                    return Err(SyntaxError::MixedIndentation);
                }
                self.has_tabs = true;
                1
            } else if bytes.len() >= 2 && bytes[0] == b' ' && bytes[1] == b' ' {
                if self.has_tabs {
                    return Err(SyntaxError::MixedIndentation);
                }
                self.has_spaces = true;
                2
            } else if bytes.first() == Some(&b' ') {
                return Err(SyntaxError::MismatchedSpaces);
            } else {
                return Ok((steps, rest));
            };

            steps += 1;
            rest = &rest[consumed..];
        }
    }

    fn block_tokens(&mut self, steps: usize, tokens: &mut Vec<Token>) -> Result<(), SyntaxError> {
        let base = *self.base.get_or_insert(steps);
        if steps < base {
            return Err(SyntaxError::DedentBelowBase);
        }
        let level = steps - base;

        match level.cmp(&self.level) {
            Ordering::Greater => {
                if level - self.level > 1 {
                    return Err(SyntaxError::TooDeepIndentation);
                }
                tokens.push(Token::BeginBlock);
            }
            Ordering::Less => {
                for _ in level..self.level {
                    tokens.push(Token::EndBlock);
                }
            }
            Ordering::Equal => {}
        }

        self.level = level;
        Ok(())
    }
}

/// Tokenize a whole source text.
///
/// Blank and comment-only lines are skipped without touching the
/// indentation state; every block still open at the end of the input
/// is closed with an [`Token::EndBlock`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokenizer = Tokenizer::new();
    let mut tokens = Vec::new();

    for line in source.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let (steps, rest) = tokenizer.indentation(line)?;
        let line_tokens = parse_line(rest)?;
        if line_tokens.is_empty() {
            continue;
        }

        tokenizer.block_tokens(steps, &mut tokens)?;
        tokens.extend(line_tokens);
    }

    for _ in 0..tokenizer.level {
        tokens.push(Token::EndBlock);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ident(name: &str) -> Token {
        Token::Identifier(name.to_string())
    }

    #[test]
    fn indentation_counts_steps() {
        let mut t = Tokenizer::new();
        assert_eq!(t.indentation("test").unwrap(), (0, "test"));
        assert_eq!(t.indentation("\ttemp").unwrap(), (1, "temp"));
        // A tab that is not leading is plain content.
        assert_eq!(t.indentation("rest\t").unwrap(), (0, "rest\t"));

        for i in 0..10 {
            let mut tabs = Tokenizer::new();
            let line = format!("{}test", "\t".repeat(i));
            assert_eq!(tabs.indentation(&line).unwrap().0, i);

            let mut spaces = Tokenizer::new();
            let line = format!("{}test", "  ".repeat(i));
            assert_eq!(spaces.indentation(&line).unwrap().0, i);
        }
    }

    #[test]
    fn indentation_rejects_a_lone_space() {
        let mut t = Tokenizer::new();
        assert_eq!(
            t.indentation(" test").unwrap_err(),
            SyntaxError::MismatchedSpaces
        );
    }

    #[test]
    fn indentation_rejects_mixing_within_a_line() {
        let mut t = Tokenizer::new();
        assert_eq!(
            t.indentation("  \ttemp").unwrap_err(),
            SyntaxError::MixedIndentation
        );
    }

    #[test]
    fn indentation_rejects_mixing_across_lines() {
        let mut t = Tokenizer::new();
        t.indentation("\tone").unwrap();
        assert_eq!(
            t.indentation("  two").unwrap_err(),
            SyntaxError::MixedIndentation
        );
    }

    #[rstest]
    #[case("(", Token::LeftParen)]
    #[case(")", Token::RightParen)]
    #[case(",", Token::Comma)]
    #[case(":", Token::Colon)]
    #[case("=", Token::Equals)]
    #[case("+", Token::Plus)]
    #[case("-", Token::Minus)]
    #[case("<", Token::Less)]
    #[case(">", Token::Greater)]
    #[case(".", Token::Dot)]
    #[case("def", Token::Def)]
    #[case("print", Token::Print)]
    #[case("while", Token::While)]
    #[case("if", Token::If)]
    #[case("else", Token::Else)]
    #[case("return", Token::Return)]
    #[case("new", Token::New)]
    #[case("struct", Token::Struct)]
    #[case("test", Token::Identifier("test".to_string()))]
    #[case("var1", Token::Identifier("var1".to_string()))]
    #[case("0", Token::NumericConstant(0))]
    #[case("255", Token::NumericConstant(255))]
    fn classifies_words(#[case] word: &str, #[case] expected: Token) {
        assert_eq!(to_token(word).unwrap(), expected);
    }

    #[test]
    fn oversized_constants_are_rejected() {
        assert_eq!(
            to_token("256").unwrap_err(),
            SyntaxError::ConstantOutOfRange("256".to_string())
        );
        assert_eq!(
            to_token("456").unwrap_err(),
            SyntaxError::ConstantOutOfRange("456".to_string())
        );
    }

    #[test]
    fn parses_single_lines() {
        assert_eq!(parse_line("#").unwrap(), vec![]);
        assert_eq!(
            parse_line("test#").unwrap(),
            vec![ident("test"), Token::EndOfLine]
        );
        assert_eq!(
            parse_line("test hest").unwrap(),
            vec![ident("test"), ident("hest"), Token::EndOfLine]
        );
        assert_eq!(
            parse_line("a = 5+10").unwrap(),
            vec![
                ident("a"),
                Token::Equals,
                Token::NumericConstant(5),
                Token::Plus,
                Token::NumericConstant(10),
                Token::EndOfLine,
            ]
        );
        assert_eq!(
            parse_line("if a+b>10:").unwrap(),
            vec![
                Token::If,
                ident("a"),
                Token::Plus,
                ident("b"),
                Token::Greater,
                Token::NumericConstant(10),
                Token::Colon,
                Token::EndOfLine,
            ]
        );
        assert_eq!(
            parse_line("print(test)").unwrap(),
            vec![
                Token::Print,
                Token::LeftParen,
                ident("test"),
                Token::RightParen,
                Token::EndOfLine,
            ]
        );
        assert_eq!(
            parse_line("member.i=1").unwrap(),
            vec![
                ident("member"),
                Token::Dot,
                ident("i"),
                Token::Equals,
                Token::NumericConstant(1),
                Token::EndOfLine,
            ]
        );
    }

    #[test]
    fn parses_a_function_header_line() {
        assert_eq!(
            parse_line("def main(test:int, test2:bool):").unwrap(),
            vec![
                Token::Def,
                ident("main"),
                Token::LeftParen,
                ident("test"),
                Token::Colon,
                ident("int"),
                Token::Comma,
                ident("test2"),
                Token::Colon,
                ident("bool"),
                Token::RightParen,
                Token::Colon,
                Token::EndOfLine,
            ]
        );
    }

    #[test]
    fn blocks_follow_indentation() {
        let eol = Token::EndOfLine;

        assert_eq!(
            tokenize("    var\n    print\n    \n    ").unwrap(),
            vec![ident("var"), eol.clone(), Token::Print, eol.clone()]
        );

        assert_eq!(
            tokenize("    var\n      print\n").unwrap(),
            vec![
                ident("var"),
                eol.clone(),
                Token::BeginBlock,
                Token::Print,
                eol.clone(),
                Token::EndBlock,
            ]
        );

        assert_eq!(
            tokenize("        var\n          print\n        5\n").unwrap(),
            vec![
                ident("var"),
                eol.clone(),
                Token::BeginBlock,
                Token::Print,
                eol.clone(),
                Token::EndBlock,
                Token::NumericConstant(5),
                eol.clone(),
            ]
        );

        assert_eq!(
            tokenize("    print\n      print\n        print\n\n    var\n").unwrap(),
            vec![
                Token::Print,
                eol.clone(),
                Token::BeginBlock,
                Token::Print,
                eol.clone(),
                Token::BeginBlock,
                Token::Print,
                eol.clone(),
                Token::EndBlock,
                Token::EndBlock,
                ident("var"),
                eol,
            ]
        );
    }

    #[test]
    fn two_step_jumps_are_rejected() {
        assert_eq!(
            tokenize("    var\n        print\n").unwrap_err(),
            SyntaxError::TooDeepIndentation
        );
    }

    #[test]
    fn dedent_below_the_first_line_is_rejected() {
        assert_eq!(
            tokenize("    var\n  print\n").unwrap_err(),
            SyntaxError::DedentBelowBase
        );
    }

    #[test]
    fn open_blocks_close_at_end_of_input() {
        assert_eq!(
            tokenize("    test\n      print\n   \n   ").unwrap(),
            vec![
                ident("test"),
                Token::EndOfLine,
                Token::BeginBlock,
                Token::Print,
                Token::EndOfLine,
                Token::EndBlock,
            ]
        );
    }

    #[test]
    fn comment_only_lines_leave_indentation_alone() {
        assert_eq!(
            tokenize("    a\n        # far indented comment\n    b\n").unwrap(),
            vec![
                ident("a"),
                Token::EndOfLine,
                ident("b"),
                Token::EndOfLine,
            ]
        );
    }

    #[rstest]
    #[case("    var = 5\n    print(5)\n")]
    #[case("def main():\n  while 1:\n    if 0:\n      print(1)\n")]
    #[case("a\n  b\n    c\n  d\na\n")]
    fn begin_and_end_blocks_balance(#[case] source: &str) {
        let tokens = tokenize(source).unwrap();
        let begins = tokens.iter().filter(|t| **t == Token::BeginBlock).count();
        let ends = tokens.iter().filter(|t| **t == Token::EndBlock).count();
        assert_eq!(begins, ends);
    }
}
