//! Validated in-memory type table.
//!
//! A [`TypeTable`] is immutable once built. Building one validates every
//! reference and computes a canonical index for each type record: two records
//! denote the same type iff their canonical indices are equal. Function
//! argument slots and `NOOP` records repeat types positionally, so identity is
//! never the raw record index.

use std::collections::HashMap;

use cshape_core::PrimitiveKind;

use crate::error::TableError;
use crate::record::{TypeIndex, TypeOp};
use crate::sections::{EnumDef, EnumMemberDef, FieldDef, RootDef, StringId, StructDef};

/// Unvalidated table contents, as produced by the compiler or the loader.
#[derive(Clone, Debug, Default)]
pub struct TableParts {
    /// String 0 must be the empty string.
    pub strings: Vec<String>,
    pub ops: Vec<TypeOp>,
    pub structs: Vec<StructDef>,
    pub fields: Vec<FieldDef>,
    pub enums: Vec<EnumDef>,
    pub members: Vec<EnumMemberDef>,
    pub roots: Vec<RootDef>,
}

/// The shape of a type, with every reference canonicalized.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeShape {
    Primitive(PrimitiveKind),
    Pointer(TypeIndex),
    /// `length: None` is `T[]`.
    Array {
        element: TypeIndex,
        length: Option<u64>,
    },
    /// Index into the struct side table.
    Record { index: u32, union: bool },
    /// Index into the enum side table.
    Enum(u32),
    Function(FunctionSig),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionSig {
    pub result: TypeIndex,
    pub params: Vec<TypeIndex>,
    pub variadic: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Identity {
    Primitive(PrimitiveKind),
    Pointer(TypeIndex),
    Array(TypeIndex, Option<u64>),
    Record(u32),
    Enum(u32),
    Function(FunctionSig),
}

struct OpenFunction {
    at: usize,
    result: TypeIndex,
    params: Vec<TypeIndex>,
}

#[derive(Debug)]
pub struct TypeTable {
    strings: Vec<String>,
    ops: Vec<TypeOp>,
    structs: Vec<StructDef>,
    fields: Vec<FieldDef>,
    enums: Vec<EnumDef>,
    members: Vec<EnumMemberDef>,
    roots: Vec<RootDef>,
    /// `None` for length pseudo-records and `FUNCTION_END`.
    canonical: Vec<Option<TypeIndex>>,
    pointers: HashMap<TypeIndex, TypeIndex>,
}

impl TypeTable {
    /// Validate `parts` and build a table.
    pub fn from_parts(parts: TableParts) -> Result<Self, TableError> {
        let TableParts {
            strings,
            ops,
            structs,
            fields,
            enums,
            members,
            roots,
        } = parts;

        if strings.first().map(String::as_str) != Some("") {
            return Err(TableError::BadString(0));
        }
        if u32::try_from(ops.len()).is_err() {
            return Err(TableError::BadSideTable {
                section: "records",
                index: ops.len(),
                reason: "too many records".to_owned(),
            });
        }

        let canonical = canonicalize(&ops, structs.len(), enums.len())?;
        let pointers = ops
            .iter()
            .zip(&canonical)
            .filter_map(|(op, canon)| match (op, canon) {
                (TypeOp::Pointer(target), Some(own)) => {
                    canonical[target.index()].map(|target| (target, *own))
                }
                _ => None,
            })
            .collect();

        let table = Self {
            strings,
            ops,
            structs,
            fields,
            enums,
            members,
            roots,
            canonical,
            pointers,
        };
        table.check_side_tables()?;

        tracing::debug!(
            records = table.ops.len(),
            structs = table.structs.len(),
            enums = table.enums.len(),
            roots = table.roots.len(),
            "type table validated"
        );
        Ok(table)
    }

    /// Number of main-table records.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[TypeOp] {
        &self.ops
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn structs(&self) -> &[StructDef] {
        &self.structs
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn enums(&self) -> &[EnumDef] {
        &self.enums
    }

    pub fn members(&self) -> &[EnumMemberDef] {
        &self.members
    }

    pub fn roots(&self) -> &[RootDef] {
        &self.roots
    }

    /// The canonical index of the type at `ty`.
    pub fn canonical(&self, ty: TypeIndex) -> Result<TypeIndex, TableError> {
        self.canonical
            .get(ty.index())
            .copied()
            .flatten()
            .ok_or(TableError::UnknownType(ty.0))
    }

    /// Whether two indices denote the same type.
    pub fn same_type(&self, a: TypeIndex, b: TypeIndex) -> bool {
        matches!((self.canonical(a), self.canonical(b)), (Ok(x), Ok(y)) if x == y)
    }

    pub fn shape(&self, ty: TypeIndex) -> Result<TypeShape, TableError> {
        let at = self.canonical(ty)?;
        let canon = |t: TypeIndex| self.canonical(t);
        let shape = match self.ops[at.index()] {
            TypeOp::Primitive(kind) => TypeShape::Primitive(kind),
            TypeOp::Pointer(t) => TypeShape::Pointer(canon(t)?),
            TypeOp::Array(t) => {
                let length = match self.ops.get(at.index() + 1) {
                    Some(TypeOp::Length(n)) => *n,
                    _ => return Err(TableError::MissingLength { at: at.index() }),
                };
                TypeShape::Array {
                    element: canon(t)?,
                    length: Some(length),
                }
            }
            TypeOp::OpenArray(t) => TypeShape::Array {
                element: canon(t)?,
                length: None,
            },
            TypeOp::StructUnion(index) => TypeShape::Record {
                index,
                union: self.structs[index as usize].is_union(),
            },
            TypeOp::Enum(index) => TypeShape::Enum(index),
            TypeOp::Function(result) => {
                let mut params = Vec::new();
                let mut slot = at.index() + 1;
                let variadic = loop {
                    match self.ops[slot] {
                        TypeOp::FunctionEnd { variadic } => break variadic,
                        _ => params.push(canon(TypeIndex(slot as u32))?),
                    }
                    slot += 1;
                };
                TypeShape::Function(FunctionSig {
                    result: canon(result)?,
                    params,
                    variadic,
                })
            }
            TypeOp::Length(_) | TypeOp::FunctionEnd { .. } | TypeOp::Noop(_) => {
                return Err(TableError::UnknownType(ty.0));
            }
        };
        Ok(shape)
    }

    /// A record in this table whose type is `T *`, if the unit declared one.
    pub fn find_pointer_to(&self, target: TypeIndex) -> Option<TypeIndex> {
        let target = self.canonical(target).ok()?;
        self.pointers.get(&target).copied()
    }

    /// First root declaration named `name`.
    pub fn root(&self, name: &str) -> Option<&RootDef> {
        self.roots.iter().find(|r| self.string(r.name) == name)
    }

    /// The struct or union named `name`.
    pub fn find_record(&self, name: &str, union: bool) -> Option<TypeIndex> {
        self.structs
            .iter()
            .find(|s| s.is_union() == union && !s.name.is_empty() && self.string(s.name) == name)
            .map(|s| s.record)
    }

    pub fn find_enum(&self, name: &str) -> Option<TypeIndex> {
        self.enums
            .iter()
            .find(|e| !e.name.is_empty() && self.string(e.name) == name)
            .map(|e| e.record)
    }

    /// # Panics
    /// Panics if `index` is out of range of the struct side table.
    pub fn struct_def(&self, index: u32) -> &StructDef {
        &self.structs[index as usize]
    }

    pub fn fields_of(&self, def: &StructDef) -> &[FieldDef] {
        let start = def.first_field as usize;
        &self.fields[start..start + def.field_count as usize]
    }

    /// # Panics
    /// Panics if `index` is out of range of the enum side table.
    pub fn enum_def(&self, index: u32) -> &EnumDef {
        &self.enums[index as usize]
    }

    pub fn members_of(&self, def: &EnumDef) -> &[EnumMemberDef] {
        let start = def.first_member as usize;
        &self.members[start..start + def.member_count as usize]
    }

    /// Strings are validated when the table is built, so every id stored in
    /// the table resolves.
    pub fn string(&self, id: StringId) -> &str {
        self.strings.get(id.0 as usize).map_or("", String::as_str)
    }

    /// Records rendered as `(OPCODE operand)` pairs, concatenated.
    pub fn render_ops(&self) -> String {
        self.ops.iter().map(ToString::to_string).collect()
    }

    fn check_string(&self, id: StringId) -> Result<(), TableError> {
        if (id.0 as usize) < self.strings.len() {
            Ok(())
        } else {
            Err(TableError::BadString(id.0))
        }
    }

    fn is_type(&self, ty: TypeIndex) -> bool {
        self.canonical.get(ty.index()).is_some_and(Option::is_some)
    }

    fn check_side_tables(&self) -> Result<(), TableError> {
        for (index, def) in self.structs.iter().enumerate() {
            let bad = |reason: &str| TableError::BadSideTable {
                section: "structs",
                index,
                reason: reason.to_owned(),
            };
            self.check_string(def.name)?;
            if self.ops.get(def.record.index()) != Some(&TypeOp::StructUnion(index as u32)) {
                return Err(bad("record does not refer back to this entry"));
            }
            if def.flags & !(StructDef::UNION | StructDef::OPAQUE) != 0 {
                return Err(bad("unknown flags"));
            }
            if def.is_opaque() && def.field_count != 0 {
                return Err(bad("opaque record with fields"));
            }
            if !in_bounds(def.first_field, def.field_count, self.fields.len()) {
                return Err(bad("field range out of bounds"));
            }
        }

        for (index, field) in self.fields.iter().enumerate() {
            self.check_string(field.name)?;
            if !self.is_type(field.ty) {
                return Err(TableError::BadSideTable {
                    section: "fields",
                    index,
                    reason: format!("{} is not a type record", field.ty),
                });
            }
            if field.bit_width.is_some_and(|w| w > 64) {
                return Err(TableError::BadSideTable {
                    section: "fields",
                    index,
                    reason: "bit width wider than 64".to_owned(),
                });
            }
        }

        for (index, def) in self.enums.iter().enumerate() {
            let bad = |reason: &str| TableError::BadSideTable {
                section: "enums",
                index,
                reason: reason.to_owned(),
            };
            self.check_string(def.name)?;
            if self.ops.get(def.record.index()) != Some(&TypeOp::Enum(index as u32)) {
                return Err(bad("record does not refer back to this entry"));
            }
            if !def.underlying.is_integral() {
                return Err(bad("underlying type is not integral"));
            }
            if !in_bounds(def.first_member, def.member_count, self.members.len()) {
                return Err(bad("member range out of bounds"));
            }
        }

        for member in &self.members {
            self.check_string(member.name)?;
        }

        for (index, root) in self.roots.iter().enumerate() {
            self.check_string(root.name)?;
            if !self.is_type(root.ty) {
                return Err(TableError::BadSideTable {
                    section: "roots",
                    index,
                    reason: format!("{} is not a type record", root.ty),
                });
            }
        }
        Ok(())
    }
}

fn in_bounds(first: u32, count: u32, len: usize) -> bool {
    (first as usize)
        .checked_add(count as usize)
        .is_some_and(|end| end <= len)
}

/// Canonical target of a reference from record `at`. References only point
/// backwards, at records that denote a type.
fn resolve(
    canonical: &[Option<TypeIndex>],
    at: usize,
    target: TypeIndex,
) -> Result<TypeIndex, TableError> {
    if target.index() >= at {
        return Err(TableError::ForwardReference {
            at,
            target: target.0,
        });
    }
    canonical[target.index()].ok_or(TableError::NotAType {
        at,
        target: target.0,
    })
}

fn is_argument(op: TypeOp) -> bool {
    matches!(
        op,
        TypeOp::Primitive(_)
            | TypeOp::Pointer(_)
            | TypeOp::StructUnion(_)
            | TypeOp::Enum(_)
            | TypeOp::Noop(_)
            | TypeOp::FunctionEnd { .. }
    )
}

/// Single forward pass: validates record structure and assigns each type
/// record the index of the first record with the same identity.
fn canonicalize(
    ops: &[TypeOp],
    struct_count: usize,
    enum_count: usize,
) -> Result<Vec<Option<TypeIndex>>, TableError> {
    let mut canonical: Vec<Option<TypeIndex>> = Vec::with_capacity(ops.len());
    let mut seen: HashMap<Identity, TypeIndex> = HashMap::new();
    let mut open: Option<OpenFunction> = None;

    let mut at = 0;
    while at < ops.len() {
        let op = ops[at];
        if open.is_some() && !is_argument(op) {
            return Err(TableError::MalformedFunction {
                at,
                reason: "invalid argument record",
            });
        }

        let identity = match op {
            TypeOp::Primitive(kind) => Identity::Primitive(kind),
            TypeOp::Pointer(t) => Identity::Pointer(resolve(&canonical, at, t)?),
            TypeOp::Array(t) => {
                let element = resolve(&canonical, at, t)?;
                let Some(TypeOp::Length(length)) = ops.get(at + 1).copied() else {
                    return Err(TableError::MissingLength { at });
                };
                Identity::Array(element, Some(length))
            }
            TypeOp::Length(_) => return Err(TableError::MisplacedLength { at }),
            TypeOp::OpenArray(t) => Identity::Array(resolve(&canonical, at, t)?, None),
            TypeOp::StructUnion(index) => {
                if index as usize >= struct_count {
                    return Err(TableError::IndexOutOfRange {
                        at,
                        target: u64::from(index),
                    });
                }
                Identity::Record(index)
            }
            TypeOp::Enum(index) => {
                if index as usize >= enum_count {
                    return Err(TableError::IndexOutOfRange {
                        at,
                        target: u64::from(index),
                    });
                }
                Identity::Enum(index)
            }
            TypeOp::Function(result) => {
                let result = resolve(&canonical, at, result)?;
                open = Some(OpenFunction {
                    at,
                    result,
                    params: Vec::new(),
                });
                // Assigned once the argument list is closed.
                canonical.push(None);
                at += 1;
                continue;
            }
            TypeOp::FunctionEnd { variadic } => {
                let Some(function) = open.take() else {
                    return Err(TableError::MalformedFunction {
                        at,
                        reason: "FUNCTION_END without FUNCTION",
                    });
                };
                let sig = FunctionSig {
                    result: function.result,
                    params: function.params,
                    variadic,
                };
                let id = *seen
                    .entry(Identity::Function(sig))
                    .or_insert(TypeIndex(function.at as u32));
                canonical[function.at] = Some(id);
                canonical.push(None);
                at += 1;
                continue;
            }
            TypeOp::Noop(t) => {
                let Some(function) = open.as_mut() else {
                    return Err(TableError::MalformedFunction {
                        at,
                        reason: "NOOP outside an argument list",
                    });
                };
                let id = resolve(&canonical, at, t)?;
                function.params.push(id);
                canonical.push(Some(id));
                at += 1;
                continue;
            }
        };

        let id = *seen.entry(identity).or_insert(TypeIndex(at as u32));
        canonical.push(Some(id));
        if let Some(function) = open.as_mut() {
            function.params.push(id);
        }
        if matches!(op, TypeOp::Array(_)) {
            canonical.push(None);
            at += 1;
        }
        at += 1;
    }

    if let Some(function) = open {
        return Err(TableError::MalformedFunction {
            at: function.at,
            reason: "unterminated function",
        });
    }
    Ok(canonical)
}
