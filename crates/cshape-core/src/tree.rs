//! Serialized declaration trees.
//!
//! A front-end hands the compiler a parsed declaration tree. This is its JSON
//! shape, a 1:1 mapping that is lowered into a [`TypeGraph`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::graph::{GraphError, NodeId, RecordId, RecordKind, TypeGraph};
use crate::PrimitiveKind;

/// Root of a declaration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclTree {
    pub declarations: Vec<DeclExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclExpr {
    Function {
        name: String,
        #[serde(rename = "type")]
        ty: TypeExpr,
    },
    Variable {
        name: String,
        #[serde(rename = "type")]
        ty: TypeExpr,
    },
    Typedef {
        name: String,
        #[serde(rename = "type")]
        ty: TypeExpr,
    },
    Constant {
        name: String,
        #[serde(rename = "type")]
        ty: TypeExpr,
        #[serde(default)]
        value: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeExpr {
    Primitive(PrimitiveKind),
    Pointer(Box<TypeExpr>),
    Array {
        element: Box<TypeExpr>,
        #[serde(default)]
        length: Option<u64>,
    },
    Struct(RecordExpr),
    Union(RecordExpr),
    Enum(EnumExpr),
    Function {
        result: Box<TypeExpr>,
        #[serde(default)]
        params: Vec<TypeExpr>,
        #[serde(default)]
        variadic: bool,
    },
    /// Reference to an earlier typedef.
    Typedef(String),
}

/// Without `fields`, a named record is a reference or forward declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordExpr {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<FieldExpr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldExpr {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default)]
    pub bits: Option<u8>,
}

/// Without `members`, a named enum is a reference to an earlier definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumExpr {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub members: Option<Vec<EnumMemberExpr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMemberExpr {
    pub name: String,
    #[serde(default)]
    pub value: Option<i64>,
}

/// Parse a declaration file.
pub fn parse_declarations(json: &str) -> Result<DeclTree, serde_json::Error> {
    serde_json::from_str(json)
}

impl TypeGraph {
    /// Lower a declaration tree, in declaration order.
    pub fn from_tree(tree: &DeclTree) -> Result<Self, GraphError> {
        let mut graph = TypeGraph::new();
        let mut lowering = Lowering {
            graph: &mut graph,
            records: HashMap::new(),
            enums: HashMap::new(),
        };
        for decl in &tree.declarations {
            lowering.declaration(decl)?;
        }
        Ok(graph)
    }
}

struct Lowering<'g> {
    graph: &'g mut TypeGraph,
    /// First record declared under each tag name.
    records: HashMap<(RecordKind, String), RecordId>,
    enums: HashMap<String, NodeId>,
}

impl Lowering<'_> {
    fn declaration(&mut self, decl: &DeclExpr) -> Result<(), GraphError> {
        match decl {
            DeclExpr::Function { name, ty } => {
                let node = self.lower(ty)?;
                self.graph.declare_function(name, node);
            }
            DeclExpr::Variable { name, ty } => {
                let node = self.lower(ty)?;
                self.graph.declare_variable(name, node);
            }
            DeclExpr::Typedef { name, ty } => {
                let node = self.lower(ty)?;
                self.graph.typedef(name, node);
            }
            DeclExpr::Constant { name, ty, value } => {
                let node = self.lower(ty)?;
                self.graph.declare_constant(name, node, *value);
            }
        }
        Ok(())
    }

    fn lower(&mut self, expr: &TypeExpr) -> Result<NodeId, GraphError> {
        match expr {
            TypeExpr::Primitive(kind) => Ok(self.graph.primitive(*kind)),
            TypeExpr::Pointer(pointee) => {
                let pointee = self.lower(pointee)?;
                Ok(self.graph.pointer(pointee))
            }
            TypeExpr::Array { element, length } => {
                let element = self.lower(element)?;
                Ok(self.graph.array(element, *length))
            }
            TypeExpr::Struct(record) => self.record(RecordKind::Struct, record),
            TypeExpr::Union(record) => self.record(RecordKind::Union, record),
            TypeExpr::Enum(e) => self.enumeration(e),
            TypeExpr::Function {
                result,
                params,
                variadic,
            } => {
                let result = self.lower(result)?;
                let params = params
                    .iter()
                    .map(|p| self.lower(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.graph.function(result, params, *variadic))
            }
            TypeExpr::Typedef(name) => self
                .graph
                .lookup_typedef(name)
                .ok_or_else(|| GraphError::UnknownTypedef(name.clone())),
        }
    }

    fn record(&mut self, kind: RecordKind, expr: &RecordExpr) -> Result<NodeId, GraphError> {
        let id = match &expr.name {
            None => self.graph.declare_record(kind, None),
            Some(name) => match self.records.get(&(kind, name.clone())).copied() {
                // A second definition of a complete tag becomes its own
                // record; the compiler decides whether the two agree.
                Some(id) if expr.fields.is_some() && !self.graph.record(id).is_opaque() => {
                    self.graph.declare_record(kind, Some(name))
                }
                Some(id) => id,
                None => {
                    let id = self.graph.declare_record(kind, Some(name));
                    self.records.insert((kind, name.clone()), id);
                    id
                }
            },
        };

        if let Some(fields) = &expr.fields {
            let mut lowered = Vec::with_capacity(fields.len());
            for field in fields {
                let ty = self.lower(&field.ty)?;
                let name = self.graph.intern(&field.name);
                lowered.push(crate::Field {
                    name,
                    ty,
                    bit_width: field.bits,
                });
            }
            self.graph.complete_record(id, lowered)?;
        }
        Ok(self.graph.record_type(id))
    }

    fn enumeration(&mut self, expr: &EnumExpr) -> Result<NodeId, GraphError> {
        let Some(members) = &expr.members else {
            let name = expr.name.clone().unwrap_or_default();
            return self
                .enums
                .get(&name)
                .copied()
                .ok_or(GraphError::UnknownEnum(name));
        };
        let members: Vec<(&str, Option<i64>)> = members
            .iter()
            .map(|m| (m.name.as_str(), m.value))
            .collect();
        let node = self.graph.enumeration(expr.name.as_deref(), &members)?;
        if let Some(name) = &expr.name {
            self.enums.entry(name.clone()).or_insert(node);
        }
        Ok(node)
    }
}
