use std::collections::BTreeMap;
use std::fmt::Write;

use itertools::Itertools;

use crate::error::RegistryError;
use crate::instruction::Instruction;

/// Highest number of opcodes a one-byte id can address.
pub const MAX_INSTRUCTIONS: usize = 256;

/// An open registry of instructions keyed by their 8-bit opcode.
///
/// Registration either honors an instruction's explicit id or assigns
/// the lowest vacant one. Iteration is in id order, which for a table
/// built purely with auto-assignment equals registration order.
pub struct InstructionSet<M> {
    capacity: usize,
    table: BTreeMap<u8, Instruction<M>>,
}

impl<M> InstructionSet<M> {
    /// An empty table with the full 256-opcode capacity.
    pub fn new() -> Self {
        Self::with_capacity(MAX_INSTRUCTIONS)
    }

    /// An empty table that only admits ids below `capacity`.
    ///
    /// Mostly useful to exercise exhaustion in tests; `capacity` is
    /// clamped to [`MAX_INSTRUCTIONS`].
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.min(MAX_INSTRUCTIONS),
            table: BTreeMap::new(),
        }
    }

    /// Insert an instruction, assigning an id if it has none.
    ///
    /// Returns the registered instruction (id filled in) for callers
    /// that want to keep a handle for symbolic encoding.
    pub fn register(&mut self, mut instruction: Instruction<M>) -> Result<Instruction<M>, RegistryError> {
        let id = match instruction.id() {
            Some(id) => {
                if usize::from(id) >= self.capacity {
                    return Err(RegistryError::CapacityExceeded {
                        id,
                        capacity: self.capacity,
                    });
                }
                if self.table.contains_key(&id) {
                    return Err(RegistryError::IdTaken(id));
                }
                id
            }
            None => self.next_vacant_id()?,
        };

        instruction.assign_id(id);
        self.table.insert(id, instruction.clone());
        Ok(instruction)
    }

    fn next_vacant_id(&self) -> Result<u8, RegistryError> {
        (0..self.capacity)
            .map(|id| id as u8)
            .find(|id| !self.table.contains_key(id))
            .ok_or(RegistryError::TableFull)
    }

    /// Look up an instruction by opcode.
    pub fn get(&self, id: u8) -> Option<&Instruction<M>> {
        self.table.get(&id)
    }

    /// All registered instructions, in id order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction<M>> {
        self.table.values()
    }

    /// Number of registered instructions.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Render the table grouped by instruction group.
    ///
    /// Groups are listed in lexicographic order with untagged
    /// instructions under `not set`; within a group instructions are
    /// ordered by id.
    pub fn listing(&self) -> String {
        let mut out = String::new();

        let by_group = self
            .table
            .values()
            .sorted_by(|a, b| a.group().cmp(b.group()).then(a.id().cmp(&b.id())))
            .group_by(|i| i.group().to_string());

        for (group, instructions) in &by_group {
            let label = if group.is_empty() { "not set" } else { group.as_str() };
            let _ = writeln!(out, "Group: {label}");
            for instruction in instructions {
                let _ = writeln!(
                    out,
                    "{:3}: {}",
                    instruction.id().unwrap_or_default(),
                    instruction.mnemonic()
                );
            }
        }

        out
    }
}

impl<M> Default for InstructionSet<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Clone for InstructionSet<M> {
    fn clone(&self) -> Self {
        Self {
            capacity: self.capacity,
            table: self.table.clone(),
        }
    }
}
