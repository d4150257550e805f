//! Stack-frame layout planning.
//!
//! A frame is laid out top-down: the return slot first, then the
//! parameters in source order, then the two bytes of saved frame
//! metadata the call instruction pushes, then the locals discovered
//! in the body. `FP` ends up addressing the lowest byte of the
//! frame, so every identifier is reachable at a non-negative offset
//! above it.

use std::collections::HashMap;

use crate::ast::{FunctionNode, Statement};
use crate::error::CompileError;
use crate::types::{DataType, Field, TypeRegistry};

/// Bytes pushed by a call: saved `FP` plus saved `PC`.
pub const SAVED_FRAME_SIZE: usize = 2;

/// Identifier reserved for the return slot of a value-returning
/// function.
pub const RESULT: &str = "result";

/// The complete plan of one function's stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    /// Bytes the frame spans in total.
    pub total_size: usize,
    /// Bytes of the return slot; zero for `void`.
    pub size_of_ret: usize,
    /// Bytes of all parameters.
    pub size_of_parameters: usize,
    /// Bytes of saved frame metadata, always [`SAVED_FRAME_SIZE`].
    pub size_of_meta: usize,
    /// Bytes of locals the prologue must allocate.
    pub size_of_vars: usize,
    identifiers: HashMap<String, Field>,
}

impl FrameLayout {
    /// Look up an identifier's slot.
    pub fn identifier(&self, name: &str) -> Option<&Field> {
        self.identifiers.get(name)
    }

    /// Number of identifiers in the frame.
    pub fn identifier_count(&self) -> usize {
        self.identifiers.len()
    }

    /// One line per identifier, lowest offset first.
    pub fn describe(&self) -> Vec<String> {
        let mut slots: Vec<&Field> = self.identifiers.values().collect();
        slots.sort_by_key(|field| field.offset);
        slots
            .iter()
            .map(|field| format!("{}: {}: {}", field.offset, field.name, field.data_type.name()))
            .collect()
    }
}

/// Plan the frame of one function.
pub fn plan_frame(types: &TypeRegistry, function: &FunctionNode) -> Result<FrameLayout, CompileError> {
    // (name, type, distance from the top of the frame)
    let mut placed: Vec<(String, DataType, usize)> = Vec::new();
    let mut distance = 0;

    let return_type = match &function.return_type {
        Some(name) => types.resolve(name)?.clone(),
        None => types.void().clone(),
    };
    let size_of_ret = return_type.size();
    if size_of_ret > 0 {
        placed.push((RESULT.to_string(), return_type, distance));
        distance += size_of_ret;
    }

    let mut size_of_parameters = 0;
    for parameter in &function.parameters {
        let data_type = match &parameter.type_name {
            Some(name) => types.resolve(name)?.clone(),
            None => types.byte().clone(),
        };
        size_of_parameters += data_type.size();
        placed.push((parameter.name.clone(), data_type.clone(), distance));
        distance += data_type.size();
    }

    distance += SAVED_FRAME_SIZE;

    let mut size_of_vars = 0;
    discover_locals(
        types,
        &function.body,
        &mut placed,
        &mut distance,
        &mut size_of_vars,
    )?;

    let total_size = size_of_ret + size_of_parameters + SAVED_FRAME_SIZE + size_of_vars;
    let identifiers = placed
        .into_iter()
        .map(|(name, data_type, distance)| {
            let offset = total_size - distance - data_type.size();
            (
                name.clone(),
                Field {
                    name,
                    offset,
                    data_type,
                },
            )
        })
        .collect();

    Ok(FrameLayout {
        total_size,
        size_of_ret,
        size_of_parameters,
        size_of_meta: SAVED_FRAME_SIZE,
        size_of_vars,
        identifiers,
    })
}

/// Walk a statement list and place every newly assigned name.
///
/// Recurses into `if`/`else` and `while` bodies but not into nested
/// definitions; the first occurrence of a name fixes its slot, and a
/// later annotation naming a different type is an error.
fn discover_locals(
    types: &TypeRegistry,
    statements: &[Statement],
    placed: &mut Vec<(String, DataType, usize)>,
    distance: &mut usize,
    size_of_vars: &mut usize,
) -> Result<(), CompileError> {
    for statement in statements {
        match statement {
            Statement::Assign { target, .. } => {
                if !target.members.is_empty() {
                    // Member stores write into an existing slot.
                    continue;
                }

                if let Some((_, existing, _)) = placed.iter().find(|(name, _, _)| name == &target.name) {
                    if let Some(annotation) = &target.type_name {
                        if annotation != existing.name() {
                            return Err(CompileError::TypeMismatch {
                                identifier: target.name.clone(),
                                expected: existing.name().to_string(),
                                found: annotation.clone(),
                            });
                        }
                    }
                    continue;
                }

                let data_type = match &target.type_name {
                    Some(name) => types.resolve(name)?.clone(),
                    None => types.byte().clone(),
                };
                *size_of_vars += data_type.size();
                placed.push((target.name.clone(), data_type.clone(), *distance));
                *distance += data_type.size();
            }
            Statement::If {
                body, else_body, ..
            } => {
                discover_locals(types, body, placed, distance, size_of_vars)?;
                discover_locals(types, else_body, placed, distance, size_of_vars)?;
            }
            Statement::While { body, .. } => {
                discover_locals(types, body, placed, distance, size_of_vars)?;
            }
            _ => {}
        }
    }

    Ok(())
}
