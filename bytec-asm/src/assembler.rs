//! Textual round-trip for instruction sequences.
//!
//! One logical line assembles to one instruction. Matching against
//! the registered mnemonic templates is case-insensitive on literal
//! words; a template word containing `#` matches an input word whose
//! text before the `#` is the same literal (this is what lets
//! `STA FP, -#offset` and `STA FP, #offset` coexist) and captures the
//! decimal byte after it.

use crate::error::BuildError;
use crate::instruction::MNEMONIC_DELIMITERS;
use crate::registry::InstructionSet;
use crate::utils::split_many;

/// Assemble one line to its encoded bytes.
///
/// Blank lines and `#` comment lines produce no bytes.
pub fn assemble_mnemonic<M>(set: &InstructionSet<M>, line: &str) -> Result<Vec<u8>, BuildError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(Vec::new());
    }

    let words: Vec<&str> = split_many(line, &MNEMONIC_DELIMITERS)
        .into_iter()
        .filter(|w| !w.is_empty())
        .collect();

    'candidates: for instruction in set.instructions() {
        let template: Vec<&str> = split_many(instruction.mnemonic(), &MNEMONIC_DELIMITERS)
            .into_iter()
            .filter(|w| !w.is_empty())
            .collect();

        if template.len() != words.len() {
            continue;
        }

        let mut operands: Vec<(&str, u8)> = Vec::new();

        for (template_word, word) in template.iter().zip(&words) {
            match (template_word.find('#'), word.find('#')) {
                (Some(ti), Some(wi)) => {
                    if ti != wi || !template_word[..ti].eq_ignore_ascii_case(&word[..wi]) {
                        continue 'candidates;
                    }
                    let text = &word[wi + 1..];
                    let value = text
                        .parse::<u8>()
                        .map_err(|_| BuildError::BadOperandValue(text.to_string()))?;
                    operands.push((&template_word[ti + 1..], value));
                }
                (None, None) => {
                    if !template_word.eq_ignore_ascii_case(word) {
                        continue 'candidates;
                    }
                }
                _ => continue 'candidates,
            }
        }

        return instruction.build(&operands);
    }

    Err(BuildError::NoMatch(line.to_string()))
}

/// Assemble a whole listing, line by line.
pub fn assemble<M>(set: &InstructionSet<M>, source: &str) -> Result<Vec<u8>, BuildError> {
    let mut image = Vec::new();
    for line in source.lines() {
        image.extend(assemble_mnemonic(set, line)?);
    }
    Ok(image)
}

/// Decode a byte sequence back to one mnemonic line per instruction.
pub fn disassemble<M>(set: &InstructionSet<M>, code: &[u8]) -> Result<Vec<String>, BuildError> {
    let mut lines = Vec::new();
    let mut index = 0;

    while index < code.len() {
        let opcode = code[index];
        let instruction = set.get(opcode).ok_or(BuildError::UnknownOpcode(opcode))?;

        if index + instruction.size() > code.len() {
            return Err(BuildError::Truncated(instruction.mnemonic().to_string()));
        }

        let mut text = instruction.mnemonic().to_string();
        for operand in instruction.operands() {
            let value = code[index + 1 + instruction.operand_position(operand)?];
            text = text.replace(&format!("#{operand}"), &format!("#{value}"));
        }

        lines.push(text);
        index += instruction.size();
    }

    Ok(lines)
}
