//! Function types and their argument slots.

use std::collections::HashMap;

use cshape_core::{FunctionNode, NodeId, PrimitiveKind, TypeNode};
use cshape_table::{TypeIndex, TypeOp};

use super::compiler::Compiler;
use super::key::ShapeKey;
use crate::{CompileError, Result};

/// What one argument slot holds before the function is emitted.
#[derive(Clone, Copy, Debug)]
enum Slot {
    Primitive(PrimitiveKind),
    /// Pointer to an already compiled target.
    Pointer(TypeIndex),
    /// Record, enum or other type already present in the table.
    Existing(TypeIndex),
}

impl Slot {
    fn key(self) -> Option<ShapeKey> {
        match self {
            Slot::Primitive(kind) => Some(ShapeKey::Primitive(kind)),
            Slot::Pointer(target) => Some(ShapeKey::Pointer(target)),
            Slot::Existing(_) => None,
        }
    }
}

impl Compiler<'_> {
    /// Emit `FUNCTION(result)`, one slot per parameter, then
    /// `FUNCTION_END(variadic)`.
    ///
    /// A parameter type not yet in the table is placed in its slot. A type
    /// already present is referenced with `NOOP`, except primitives, which are
    /// repeated.
    pub(super) fn compile_function(&mut self, function: &FunctionNode) -> Result<TypeIndex> {
        self.check_result(function.result)?;
        let result = self.compile_node(function.result)?;

        let mut slots = Vec::with_capacity(function.params.len());
        for (i, &param) in function.params.iter().enumerate() {
            slots.push(self.param_slot(param, i)?);
        }

        // Canonical index each slot will have once emitted.
        let base = self.ops.len();
        let mut local: HashMap<ShapeKey, TypeIndex> = HashMap::new();
        let mut params = Vec::with_capacity(slots.len());
        for (i, slot) in slots.iter().enumerate() {
            let canonical = match (slot, slot.key()) {
                (Slot::Existing(ty), _) => *ty,
                (_, Some(key)) => match self.dedup.get(&key) {
                    Some(&ty) => ty,
                    None => *local
                        .entry(key)
                        .or_insert(TypeIndex((base + 1 + i) as u32)),
                },
                (_, None) => TypeIndex((base + 1 + i) as u32),
            };
            params.push(canonical);
        }

        let key = ShapeKey::Function {
            result,
            params: params.clone(),
            variadic: function.variadic,
        };
        if let Some(&ty) = self.dedup.get(&key) {
            tracing::trace!(%ty, "function dedup hit");
            return Ok(ty);
        }

        let ty = self.push(TypeOp::Function(result))?;
        for (slot, canonical) in slots.into_iter().zip(params) {
            let at = TypeIndex(self.ops.len() as u32);
            let op = match slot {
                Slot::Primitive(kind) => TypeOp::Primitive(kind),
                Slot::Pointer(target) if canonical == at => TypeOp::Pointer(target),
                _ => {
                    tracing::trace!(%at, target = %canonical, "argument repeats an earlier type");
                    TypeOp::Noop(canonical)
                }
            };
            self.push(op)?;
            if let Some(key) = slot.key() {
                self.dedup.entry(key).or_insert(canonical);
            }
        }
        self.push(TypeOp::FunctionEnd {
            variadic: function.variadic,
        })?;
        self.dedup.insert(key, ty);
        Ok(ty)
    }

    fn check_result(&self, result: NodeId) -> Result<()> {
        match self.graph.node(result) {
            TypeNode::Function(_) => Err(CompileError::NotAPointer("function result".to_owned())),
            TypeNode::Array { .. } => Err(CompileError::ParseStructure(
                "function returns an array".to_owned(),
            )),
            _ => Ok(()),
        }
    }

    /// Parameters are adjusted: arrays decay to element pointers and
    /// functions to function pointers.
    fn param_slot(&mut self, param: NodeId, position: usize) -> Result<Slot> {
        let graph = self.graph;
        let slot = match graph.node(param) {
            TypeNode::Primitive(kind) if kind.is_void() => {
                return Err(CompileError::ParseStructure(format!(
                    "parameter {} has type void",
                    position + 1
                )));
            }
            TypeNode::Primitive(kind) => Slot::Primitive(*kind),
            TypeNode::Pointer(target) => Slot::Pointer(self.compile_node(*target)?),
            TypeNode::Array { element, .. } => {
                self.check_element(*element)?;
                Slot::Pointer(self.compile_node(*element)?)
            }
            TypeNode::Function(_) => Slot::Pointer(self.compile_node(param)?),
            TypeNode::Record(_) | TypeNode::Enum(_) => Slot::Existing(self.compile_node(param)?),
        };
        Ok(slot)
    }
}
