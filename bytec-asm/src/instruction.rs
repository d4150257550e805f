use std::fmt;

use crate::error::{BuildError, RegistryError};
use crate::fault::Fault;
use crate::utils::split_many;

/// Delimiters separating the words of a mnemonic template.
pub const MNEMONIC_DELIMITERS: [char; 2] = [' ', ','];

/// Outcome of executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteState {
    /// Fetch and execute the next instruction.
    Proceed,
    /// Stop the run loop normally.
    Halt,
}

impl ExecuteState {
    /// Whether the run loop should keep going.
    pub const fn should_continue(&self) -> bool {
        matches!(self, Self::Proceed)
    }
}

/// Behavior of an instruction on a machine of type `M`.
///
/// A plain function pointer keeps the registry `Clone` and the
/// dispatch a single indirect call.
pub type Execute<M> = fn(&mut M) -> Result<ExecuteState, Fault>;

/// One instruction of an open instruction set.
///
/// The mnemonic template is the single source of truth for the
/// operand names: splitting it on spaces and commas yields words, and
/// every word containing `#` declares a one-byte operand named by the
/// text after the `#`. A leading `-` (as in `-#offset`) is part of
/// the literal mnemonic, not of the operand name, and does not affect
/// the encoded value.
pub struct Instruction<M> {
    id: Option<u8>,
    mnemonic: String,
    group: String,
    operand_order: Vec<String>,
    execute: Execute<M>,
}

impl<M> Instruction<M> {
    /// Describe an instruction by its mnemonic template and behavior.
    ///
    /// The opcode id is unassigned until the instruction is
    /// registered or pinned with [`with_id`](Self::with_id).
    pub fn new(mnemonic: impl Into<String>, execute: Execute<M>) -> Self {
        let mnemonic = mnemonic.into();
        let operand_order = declared_operands(&mnemonic);

        Self {
            id: None,
            mnemonic,
            group: String::new(),
            operand_order,
            execute,
        }
    }

    /// Pin the instruction to an explicit opcode id.
    pub fn with_id(mut self, id: u8) -> Self {
        self.id = Some(id);
        self
    }

    /// Tag the instruction with a listing group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Override the encoding order of the operands.
    ///
    /// The provided names must be exactly the operands declared by
    /// the mnemonic template.
    pub fn with_operand_order(mut self, order: &[&str]) -> Result<Self, RegistryError> {
        let provided: Vec<String> = order.iter().map(|s| s.to_string()).collect();

        let mut declared_sorted = self.operand_order.clone();
        declared_sorted.sort_unstable();
        let mut provided_sorted = provided.clone();
        provided_sorted.sort_unstable();

        if declared_sorted != provided_sorted {
            return Err(RegistryError::OperandOrderMismatch {
                mnemonic: self.mnemonic,
                declared: self.operand_order,
                provided,
            });
        }

        self.operand_order = provided;
        Ok(self)
    }

    /// The opcode id, if one has been assigned.
    pub const fn id(&self) -> Option<u8> {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: u8) {
        self.id = Some(id);
    }

    /// The mnemonic template.
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// The first word of the mnemonic template.
    pub fn name(&self) -> &str {
        split_many(&self.mnemonic, &MNEMONIC_DELIMITERS)
            .into_iter()
            .find(|w| !w.is_empty())
            .unwrap_or_default()
    }

    /// The listing group, empty if untagged.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Operand names in encoding order.
    pub fn operands(&self) -> impl Iterator<Item = &str> {
        self.operand_order.iter().map(String::as_str)
    }

    /// Encoded size in bytes: one for the id plus one per operand.
    pub fn size(&self) -> usize {
        1 + self.operand_order.len()
    }

    /// The behavior function.
    pub fn execute(&self) -> Execute<M> {
        self.execute
    }

    /// Position of `operand` within the encoded operand bytes.
    pub fn operand_position(&self, operand: &str) -> Result<usize, BuildError> {
        self.operand_order
            .iter()
            .position(|name| name == operand)
            .ok_or_else(|| BuildError::UnknownOperand {
                mnemonic: self.mnemonic.clone(),
                operand: operand.to_string(),
            })
    }

    /// Encode the instruction with the given operand values.
    ///
    /// Every declared operand must be supplied exactly once; spare
    /// names are rejected.
    pub fn build(&self, operands: &[(&str, u8)]) -> Result<Vec<u8>, BuildError> {
        let id = self.id.ok_or_else(|| BuildError::Unregistered {
            mnemonic: self.mnemonic.clone(),
        })?;

        for (name, _) in operands {
            if !self.operand_order.iter().any(|o| o == name) {
                return Err(BuildError::UnknownOperand {
                    mnemonic: self.mnemonic.clone(),
                    operand: name.to_string(),
                });
            }
        }

        let mut encoded = Vec::with_capacity(self.size());
        encoded.push(id);
        for name in &self.operand_order {
            let (_, value) = operands
                .iter()
                .find(|(n, _)| n == name)
                .ok_or_else(|| BuildError::MissingOperand {
                    mnemonic: self.mnemonic.clone(),
                    operand: name.clone(),
                })?;
            encoded.push(*value);
        }

        Ok(encoded)
    }
}

/// Operand names declared by a mnemonic template, in template order.
fn declared_operands(mnemonic: &str) -> Vec<String> {
    split_many(mnemonic, &MNEMONIC_DELIMITERS)
        .into_iter()
        .filter_map(|word| {
            let hash = word.find('#')?;
            Some(word[hash + 1..].to_string())
        })
        .collect()
}

// Manual impls: a derive would put unnecessary bounds on `M`.
impl<M> Clone for Instruction<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            mnemonic: self.mnemonic.clone(),
            group: self.group.clone(),
            operand_order: self.operand_order.clone(),
            execute: self.execute,
        }
    }
}

impl<M> fmt::Debug for Instruction<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("id", &self.id)
            .field("mnemonic", &self.mnemonic)
            .field("group", &self.group)
            .field("operand_order", &self.operand_order)
            .finish()
    }
}
