//! Compiler state and entry points.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use cshape_core::{
    DeclKind, Declaration, Interner, NodeId, RecordId, RecordKind, Symbol, TypeGraph, TypeNode,
};
use cshape_table::{
    EnumDef, EnumMemberDef, FieldDef, MAX_OPERAND, RootDef, RootKind, StringId, StructDef,
    TableParts, TypeIndex, TypeOp, TypeTable,
};

use super::key::ShapeKey;
use crate::{CompileError, Result};

/// Compile every root declaration of `graph` into a validated table.
pub fn compile(graph: &TypeGraph) -> Result<TypeTable> {
    let mut compiler = Compiler::new(graph);
    compiler.compile_declarations()?;
    compiler.finish()
}

/// A struct or union tag. Every graph record with the tag shares one entry.
#[derive(Clone, Copy, Debug)]
pub(super) struct NamedRecord {
    pub(super) kind: RecordKind,
    pub(super) struct_index: u32,
    pub(super) ty: TypeIndex,
    pub(super) complete: bool,
    /// Some opaque declaration of the tag was used by value.
    pub(super) used_opaque: bool,
}

/// Compiler state for one unit.
pub struct Compiler<'g> {
    pub(super) graph: &'g TypeGraph,
    max_records: usize,
    pub(super) ops: Vec<TypeOp>,
    pub(super) dedup: HashMap<ShapeKey, TypeIndex>,
    nodes: HashMap<NodeId, TypeIndex>,
    strings: Interner,
    pub(super) structs: Vec<StructDef>,
    pub(super) fields: Vec<FieldDef>,
    pub(super) enums: Vec<EnumDef>,
    pub(super) members: Vec<EnumMemberDef>,
    roots: Vec<RootDef>,
    root_names: IndexMap<Symbol, (DeclKind, TypeIndex, Option<i64>)>,
    pub(super) records: HashMap<RecordId, TypeIndex>,
    pub(super) named_records: HashMap<Symbol, NamedRecord>,
    pub(super) named_enums: HashMap<Symbol, (TypeIndex, ShapeKey)>,
    /// Struct entries whose fields are being compiled.
    pub(super) filling: HashSet<u32>,
    /// Anonymous records whose fields are being compiled.
    pub(super) anon_in_progress: HashSet<RecordId>,
}

impl<'g> Compiler<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        let mut strings = Interner::new();
        strings.intern("");
        Self {
            graph,
            max_records: u32::MAX as usize,
            ops: Vec::new(),
            dedup: HashMap::new(),
            nodes: HashMap::new(),
            strings,
            structs: Vec::new(),
            fields: Vec::new(),
            enums: Vec::new(),
            members: Vec::new(),
            roots: Vec::new(),
            root_names: IndexMap::new(),
            records: HashMap::new(),
            named_records: HashMap::new(),
            named_enums: HashMap::new(),
            filling: HashSet::new(),
            anon_in_progress: HashSet::new(),
        }
    }

    /// Cap the number of main-table records.
    pub fn max_records(mut self, limit: usize) -> Self {
        self.max_records = limit.min(u32::MAX as usize);
        self
    }

    /// Compile all root declarations, in order.
    #[tracing::instrument(level = "debug", skip_all, fields(declarations = self.graph.declarations().len()))]
    pub fn compile_declarations(&mut self) -> Result<()> {
        let graph = self.graph;
        for decl in graph.declarations() {
            self.compile_declaration(decl)?;
        }
        tracing::debug!(
            records = self.ops.len(),
            structs = self.structs.len(),
            enums = self.enums.len(),
            "declarations compiled"
        );
        Ok(())
    }

    fn compile_declaration(&mut self, decl: &Declaration) -> Result<()> {
        let graph = self.graph;
        let label = graph.name(decl.name);
        match decl.kind {
            DeclKind::Function => {
                if !matches!(graph.node(decl.ty), TypeNode::Function(_)) {
                    return Err(CompileError::ParseStructure(format!(
                        "'{label}' is declared as a function but does not have function type"
                    )));
                }
            }
            DeclKind::Variable | DeclKind::Constant => {
                self.check_object(decl.ty, &format!("'{label}'"))?;
            }
            DeclKind::Typedef => {}
        }

        let ty = self.compile_node(decl.ty)?;
        let entry = (decl.kind, ty, decl.value);
        match self.root_names.get(&decl.name) {
            Some(prev) if *prev == entry => return Ok(()),
            Some(_) => return Err(CompileError::ConflictingRedefinition(label.to_owned())),
            None => {}
        }
        self.root_names.insert(decl.name, entry);

        let name = self.string(decl.name);
        self.roots.push(RootDef {
            name,
            kind: root_kind(decl.kind),
            ty,
            value: decl.value,
        });
        Ok(())
    }

    /// Objects need a size: no void, no bare functions.
    pub(super) fn check_object(&self, node: NodeId, what: &str) -> Result<()> {
        match self.graph.node(node) {
            TypeNode::Function(_) => Err(CompileError::NotAPointer(what.to_owned())),
            TypeNode::Primitive(kind) if kind.is_void() => Err(CompileError::ParseStructure(
                format!("{what} has type void"),
            )),
            _ => Ok(()),
        }
    }

    /// Compile one node, returning its canonical index.
    pub fn compile_node(&mut self, id: NodeId) -> Result<TypeIndex> {
        if let Some(&ty) = self.nodes.get(&id) {
            return Ok(ty);
        }
        let graph = self.graph;
        let ty = match graph.node(id) {
            TypeNode::Primitive(kind) => {
                self.intern_ops(ShapeKey::Primitive(*kind), &[TypeOp::Primitive(*kind)])?
            }
            TypeNode::Pointer(target) => {
                let target = self.compile_node(*target)?;
                self.intern_ops(ShapeKey::Pointer(target), &[TypeOp::Pointer(target)])?
            }
            TypeNode::Array { element, length } => self.compile_array(*element, *length)?,
            TypeNode::Record(rid) => self.compile_record(*rid)?,
            TypeNode::Enum(eid) => self.compile_enum(*eid)?,
            TypeNode::Function(function) => self.compile_function(function)?,
        };
        self.nodes.insert(id, ty);
        Ok(ty)
    }

    /// Index already assigned to `id`, if it was compiled.
    pub fn type_of(&self, id: NodeId) -> Option<TypeIndex> {
        self.nodes.get(&id).copied()
    }

    /// Array elements are objects, and only the outermost dimension may be
    /// unknown.
    pub(super) fn check_element(&self, element: NodeId) -> Result<()> {
        self.check_object(element, "array element")?;
        if let TypeNode::Array { length: None, .. } = self.graph.node(element) {
            return Err(CompileError::ParseStructure(
                "array of unknown-length arrays".to_owned(),
            ));
        }
        Ok(())
    }

    fn compile_array(&mut self, element: NodeId, length: Option<u64>) -> Result<TypeIndex> {
        self.check_element(element)?;
        if let Some(n) = length.filter(|&n| n > MAX_OPERAND) {
            return Err(CompileError::ParseStructure(format!(
                "array length {n} does not fit in a table record"
            )));
        }
        let element = self.compile_node(element)?;
        match length {
            Some(n) => self.intern_ops(
                ShapeKey::Array(element, Some(n)),
                &[TypeOp::Array(element), TypeOp::Length(n)],
            ),
            None => self.intern_ops(ShapeKey::Array(element, None), &[TypeOp::OpenArray(element)]),
        }
    }

    /// Emit `ops` for `key` unless an equal type was already emitted.
    pub(super) fn intern_ops(&mut self, key: ShapeKey, ops: &[TypeOp]) -> Result<TypeIndex> {
        if let Some(&ty) = self.dedup.get(&key) {
            tracing::trace!(?key, %ty, "dedup hit");
            return Ok(ty);
        }
        let mut first = None;
        for &op in ops {
            let at = self.push(op)?;
            first.get_or_insert(at);
        }
        let ty = first.ok_or_else(|| CompileError::ParseStructure("empty record group".to_owned()))?;
        self.dedup.insert(key, ty);
        Ok(ty)
    }

    pub(super) fn push(&mut self, op: TypeOp) -> Result<TypeIndex> {
        if self.ops.len() >= self.max_records {
            return Err(CompileError::ParseStructure(format!(
                "type table capacity exceeded ({} records)",
                self.max_records
            )));
        }
        let at = TypeIndex(self.ops.len() as u32);
        self.ops.push(op);
        Ok(at)
    }

    pub(super) fn string(&mut self, sym: Symbol) -> StringId {
        let graph = self.graph;
        StringId(self.strings.intern(graph.name(sym)).as_u32())
    }

    /// Validate and publish the table.
    pub fn finish(self) -> Result<TypeTable> {
        let parts = TableParts {
            strings: self.strings.iter().map(|(_, s)| s.to_owned()).collect(),
            ops: self.ops,
            structs: self.structs,
            fields: self.fields,
            enums: self.enums,
            members: self.members,
            roots: self.roots,
        };
        Ok(TypeTable::from_parts(parts)?)
    }
}

/// Next index of a side table, as stored in records.
pub(super) fn side_index(len: usize, section: &'static str) -> Result<u32> {
    u32::try_from(len).map_err(|_| CompileError::ParseStructure(format!("too many {section}")))
}

fn root_kind(kind: DeclKind) -> RootKind {
    match kind {
        DeclKind::Function => RootKind::Function,
        DeclKind::Variable => RootKind::Variable,
        DeclKind::Typedef => RootKind::Typedef,
        DeclKind::Constant => RootKind::Constant,
    }
}
