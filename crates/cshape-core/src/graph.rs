//! Type graph: the in-memory model of declared C types.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Structs and
//! unions are indirected through a record arena ([`RecordId`]) so that a record
//! can point at itself and can be declared before its fields are known.
//!
//! The graph carries no layout. The only state it tracks is the opaque →
//! complete transition of records, and whether an opaque record has already
//! been used in a position that needs its size.

use indexmap::IndexMap;

use crate::{Interner, PrimitiveKind, Symbol};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct RecordId(u32);

impl RecordId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct EnumId(u32);

impl EnumId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One declared type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeNode {
    Primitive(PrimitiveKind),
    Pointer(NodeId),
    /// `length: None` is `T[]`.
    Array {
        element: NodeId,
        length: Option<u64>,
    },
    /// Struct or union, see [`RecordDecl::kind`].
    Record(RecordId),
    Enum(EnumId),
    Function(FunctionNode),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionNode {
    pub result: NodeId,
    pub params: Vec<NodeId>,
    pub variadic: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Struct,
    Union,
}

impl RecordKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Union => "union",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: Symbol,
    pub ty: NodeId,
    pub bit_width: Option<u8>,
}

impl Field {
    pub fn new(name: Symbol, ty: NodeId) -> Self {
        Self {
            name,
            ty,
            bit_width: None,
        }
    }

    pub fn bits(name: Symbol, ty: NodeId, width: u8) -> Self {
        Self {
            name,
            ty,
            bit_width: Some(width),
        }
    }
}

/// A struct or union declaration.
#[derive(Clone, Debug)]
pub struct RecordDecl {
    pub kind: RecordKind,
    pub name: Option<Symbol>,
    fields: Option<Vec<Field>>,
    used_by_value: bool,
}

impl RecordDecl {
    /// `None` while the record is opaque.
    pub fn fields(&self) -> Option<&[Field]> {
        self.fields.as_deref()
    }

    pub fn is_opaque(&self) -> bool {
        self.fields.is_none()
    }

    /// Whether the record was used by value while still opaque.
    pub fn was_used_by_value(&self) -> bool {
        self.used_by_value
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumMember {
    pub name: Symbol,
    pub value: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumDecl {
    pub name: Option<Symbol>,
    pub underlying: PrimitiveKind,
    pub members: Vec<EnumMember>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Function,
    Variable,
    Typedef,
    Constant,
}

/// A root declaration of the unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: Symbol,
    pub ty: NodeId,
    /// Only for constants with a known value.
    pub value: Option<i64>,
}

/// Errors raised while building a graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("'{0}' has incomplete type and was used by value before being completed")]
    IncompleteTypeUsed(String),
    #[error("'{0}' is already complete")]
    AlreadyComplete(String),
    #[error("unknown typedef '{0}'")]
    UnknownTypedef(String),
    #[error("unknown enum '{0}'")]
    UnknownEnum(String),
    #[error("enum '{name}': value of '{member}' does not fit in 64 bits")]
    EnumOverflow { name: String, member: String },
}

/// Arena of type nodes, records, enums and root declarations.
#[derive(Clone, Debug, Default)]
pub struct TypeGraph {
    interner: Interner,
    nodes: Vec<TypeNode>,
    records: Vec<RecordDecl>,
    enums: Vec<EnumDecl>,
    declarations: Vec<Declaration>,
    typedefs: IndexMap<Symbol, NodeId>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        self.interner.intern(name)
    }

    pub fn name(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    fn push(&mut self, node: TypeNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn primitive(&mut self, kind: PrimitiveKind) -> NodeId {
        self.push(TypeNode::Primitive(kind))
    }

    pub fn pointer(&mut self, pointee: NodeId) -> NodeId {
        self.push(TypeNode::Pointer(pointee))
    }

    /// Array elements are stored by value, which counts as a layout use of an
    /// opaque element record.
    pub fn array(&mut self, element: NodeId, length: Option<u64>) -> NodeId {
        self.note_by_value(element);
        self.push(TypeNode::Array { element, length })
    }

    pub fn function(&mut self, result: NodeId, params: Vec<NodeId>, variadic: bool) -> NodeId {
        self.push(TypeNode::Function(FunctionNode {
            result,
            params,
            variadic,
        }))
    }

    /// Declare an opaque struct or union.
    pub fn declare_record(&mut self, kind: RecordKind, name: Option<&str>) -> RecordId {
        let name = name.map(|n| self.interner.intern(n));
        let id = RecordId(self.records.len() as u32);
        self.records.push(RecordDecl {
            kind,
            name,
            fields: None,
            used_by_value: false,
        });
        id
    }

    /// Supply the fields of an opaque record. This happens at most once.
    pub fn complete_record(&mut self, id: RecordId, fields: Vec<Field>) -> Result<(), GraphError> {
        let record = &self.records[id.index()];
        if record.fields.is_some() {
            return Err(GraphError::AlreadyComplete(self.record_label(id)));
        }
        if record.used_by_value {
            return Err(GraphError::IncompleteTypeUsed(self.record_label(id)));
        }
        for field in &fields {
            self.note_by_value(field.ty);
        }
        tracing::trace!(record = %self.record_label(id), fields = fields.len(), "record completed");
        self.records[id.index()].fields = Some(fields);
        Ok(())
    }

    /// Declare and complete a record in one step, returning its type node.
    pub fn define_record(
        &mut self,
        kind: RecordKind,
        name: Option<&str>,
        fields: Vec<Field>,
    ) -> Result<NodeId, GraphError> {
        let id = self.declare_record(kind, name);
        self.complete_record(id, fields)?;
        Ok(self.record_type(id))
    }

    /// A type node referring to a record.
    pub fn record_type(&mut self, id: RecordId) -> NodeId {
        self.push(TypeNode::Record(id))
    }

    pub fn field(&mut self, name: &str, ty: NodeId) -> Field {
        Field::new(self.interner.intern(name), ty)
    }

    pub fn bitfield(&mut self, name: &str, ty: NodeId, width: u8) -> Field {
        Field::bits(self.interner.intern(name), ty, width)
    }

    /// Define an enum. Members without a value continue from the previous one
    /// plus one, starting at zero. The underlying type is the narrowest of
    /// `int`, `unsigned int`, `long long` that holds every value.
    pub fn enumeration(
        &mut self,
        name: Option<&str>,
        members: &[(&str, Option<i64>)],
    ) -> Result<NodeId, GraphError> {
        let mut folded = Vec::with_capacity(members.len());
        let mut next = Some(0i64);
        for &(member, explicit) in members {
            let value = match explicit.or(next) {
                Some(v) => v,
                None => {
                    return Err(GraphError::EnumOverflow {
                        name: name.unwrap_or("<anonymous>").to_owned(),
                        member: member.to_owned(),
                    });
                }
            };
            next = value.checked_add(1);
            folded.push(EnumMember {
                name: self.interner.intern(member),
                value,
            });
        }
        let underlying = underlying_for(folded.iter().map(|m| m.value));
        Ok(self.enumeration_with(name, underlying, folded))
    }

    /// Define an enum with explicit values and storage type.
    pub fn enumeration_with(
        &mut self,
        name: Option<&str>,
        underlying: PrimitiveKind,
        members: Vec<EnumMember>,
    ) -> NodeId {
        let name = name.map(|n| self.interner.intern(n));
        let id = EnumId(self.enums.len() as u32);
        self.enums.push(EnumDecl {
            name,
            underlying,
            members,
        });
        self.push(TypeNode::Enum(id))
    }

    pub fn declare_function(&mut self, name: &str, ty: NodeId) {
        self.declare(DeclKind::Function, name, ty, None);
    }

    /// Variables own storage, so an opaque record here is a layout use.
    pub fn declare_variable(&mut self, name: &str, ty: NodeId) {
        self.note_by_value(ty);
        self.declare(DeclKind::Variable, name, ty, None);
    }

    pub fn declare_constant(&mut self, name: &str, ty: NodeId, value: Option<i64>) {
        self.declare(DeclKind::Constant, name, ty, value);
    }

    /// Bind a typedef name. Lookups keep the first binding; a rebinding is
    /// still recorded as a declaration so the compiler can reject it if the
    /// targets differ.
    pub fn typedef(&mut self, name: &str, target: NodeId) {
        let sym = self.interner.intern(name);
        self.typedefs.entry(sym).or_insert(target);
        self.declare(DeclKind::Typedef, name, target, None);
    }

    pub fn lookup_typedef(&self, name: &str) -> Option<NodeId> {
        let sym = self.interner.get(name)?;
        self.typedefs.get(&sym).copied()
    }

    fn declare(&mut self, kind: DeclKind, name: &str, ty: NodeId, value: Option<i64>) {
        let name = self.interner.intern(name);
        self.declarations.push(Declaration {
            kind,
            name,
            ty,
            value,
        });
    }

    fn note_by_value(&mut self, node: NodeId) {
        let mut current = node;
        loop {
            match &self.nodes[current.index()] {
                TypeNode::Array { element, .. } => current = *element,
                TypeNode::Record(id) => {
                    let record = &mut self.records[id.index()];
                    if record.fields.is_none() {
                        record.used_by_value = true;
                    }
                    return;
                }
                _ => return,
            }
        }
    }

    /// # Panics
    /// Panics if `id` does not belong to this graph.
    pub fn node(&self, id: NodeId) -> &TypeNode {
        &self.nodes[id.index()]
    }

    pub fn record(&self, id: RecordId) -> &RecordDecl {
        &self.records[id.index()]
    }

    pub fn enum_decl(&self, id: EnumId) -> &EnumDecl {
        &self.enums[id.index()]
    }

    pub fn records(&self) -> impl Iterator<Item = (RecordId, &RecordDecl)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (RecordId(i as u32), r))
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// `struct foo`, or `struct <anonymous>`.
    pub fn record_label(&self, id: RecordId) -> String {
        let record = &self.records[id.index()];
        match record.name {
            Some(sym) => format!("{} {}", record.kind.keyword(), self.name(sym)),
            None => format!("{} <anonymous>", record.kind.keyword()),
        }
    }

    pub fn enum_label(&self, id: EnumId) -> String {
        match self.enums[id.index()].name {
            Some(sym) => format!("enum {}", self.name(sym)),
            None => "enum <anonymous>".to_owned(),
        }
    }
}

fn underlying_for(values: impl Iterator<Item = i64>) -> PrimitiveKind {
    let (mut min, mut max) = (0i64, 0i64);
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min >= i64::from(i32::MIN) && max <= i64::from(i32::MAX) {
        PrimitiveKind::Int
    } else if min >= 0 && max <= i64::from(u32::MAX) {
        PrimitiveKind::UInt
    } else {
        PrimitiveKind::LongLong
    }
}
