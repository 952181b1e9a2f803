//! Structs, unions and enums.

use cshape_core::{EnumId, Field, GraphError, NodeId, PrimitiveKind, RecordId, RecordKind, Symbol, TypeNode};
use cshape_table::{EnumDef, EnumMemberDef, FieldDef, StringId, StructDef, TypeIndex, TypeOp};

use super::compiler::{Compiler, NamedRecord, side_index};
use super::key::ShapeKey;
use crate::{CompileError, Result};

impl Compiler<'_> {
    pub(super) fn compile_record(&mut self, rid: RecordId) -> Result<TypeIndex> {
        if let Some(&ty) = self.records.get(&rid) {
            return Ok(ty);
        }
        match self.graph.record(rid).name {
            Some(name) => self.compile_named_record(rid, name),
            None => self.compile_anon_record(rid),
        }
    }

    /// All declarations of one tag share a record. An opaque declaration and
    /// a definition unify; two definitions must agree field by field.
    fn compile_named_record(&mut self, rid: RecordId, name: Symbol) -> Result<TypeIndex> {
        let graph = self.graph;
        let decl = graph.record(rid);
        let label = graph.record_label(rid);
        let used_opaque = decl.is_opaque() && decl.was_used_by_value();

        if let Some(group) = self.named_records.get_mut(&name) {
            if group.kind != decl.kind {
                return Err(CompileError::ConflictingRedefinition(label));
            }
            group.used_opaque |= used_opaque;
            let group = *group;
            self.records.insert(rid, group.ty);

            // Mid-definition references only need the index.
            if self.filling.contains(&group.struct_index) {
                return Ok(group.ty);
            }
            let Some(fields) = decl.fields() else {
                return Ok(group.ty);
            };
            if group.complete {
                let compiled =
                    self.compile_fields(Some(group.struct_index), &label, decl.kind, fields)?;
                let def = self.structs[group.struct_index as usize];
                let start = def.first_field as usize;
                let existing = &self.fields[start..start + def.field_count as usize];
                if existing != compiled.as_slice() {
                    return Err(CompileError::ConflictingRedefinition(label));
                }
                tracing::trace!(record = %label, "identical redefinition");
                return Ok(group.ty);
            }
            if group.used_opaque {
                return Err(GraphError::IncompleteTypeUsed(label).into());
            }
            self.fill_record(group.struct_index, &label, decl.kind, fields)?;
            if let Some(group) = self.named_records.get_mut(&name) {
                group.complete = true;
            }
            return Ok(group.ty);
        }

        let struct_index = side_index(self.structs.len(), "structs")?;
        let ty = self.push(TypeOp::StructUnion(struct_index))?;
        let name_id = self.string(name);
        self.structs.push(StructDef {
            name: name_id,
            record: ty,
            first_field: 0,
            field_count: 0,
            flags: union_flag(decl.kind) | StructDef::OPAQUE,
        });
        self.records.insert(rid, ty);
        self.named_records.insert(
            name,
            NamedRecord {
                kind: decl.kind,
                struct_index,
                ty,
                complete: false,
                used_opaque,
            },
        );

        if let Some(fields) = decl.fields() {
            self.fill_record(struct_index, &label, decl.kind, fields)?;
            if let Some(group) = self.named_records.get_mut(&name) {
                group.complete = true;
            }
        }
        Ok(ty)
    }

    /// Anonymous records are identified by shape.
    fn compile_anon_record(&mut self, rid: RecordId) -> Result<TypeIndex> {
        let graph = self.graph;
        let decl = graph.record(rid);
        let label = graph.record_label(rid);
        if self.anon_in_progress.contains(&rid) {
            return Err(CompileError::ParseStructure(format!("{label} refers to itself")));
        }

        let Some(fields) = decl.fields() else {
            let struct_index = side_index(self.structs.len(), "structs")?;
            let ty = self.push(TypeOp::StructUnion(struct_index))?;
            self.structs.push(StructDef {
                name: StringId::EMPTY,
                record: ty,
                first_field: 0,
                field_count: 0,
                flags: union_flag(decl.kind) | StructDef::OPAQUE,
            });
            self.records.insert(rid, ty);
            return Ok(ty);
        };

        self.anon_in_progress.insert(rid);
        let compiled = self.compile_fields(None, &label, decl.kind, fields);
        self.anon_in_progress.remove(&rid);
        let compiled = compiled?;

        let key = ShapeKey::AnonRecord {
            kind: decl.kind,
            fields: fields
                .iter()
                .zip(&compiled)
                .map(|(f, def)| (f.name, def.ty, def.bit_width))
                .collect(),
        };
        if let Some(&ty) = self.dedup.get(&key) {
            tracing::trace!(record = %label, %ty, "dedup hit");
            self.records.insert(rid, ty);
            return Ok(ty);
        }

        let struct_index = side_index(self.structs.len(), "structs")?;
        let first_field = side_index(self.fields.len(), "fields")?;
        let ty = self.push(TypeOp::StructUnion(struct_index))?;
        self.structs.push(StructDef {
            name: StringId::EMPTY,
            record: ty,
            first_field,
            field_count: compiled.len() as u32,
            flags: union_flag(decl.kind),
        });
        self.fields.extend(compiled);
        self.dedup.insert(key, ty);
        self.records.insert(rid, ty);
        Ok(ty)
    }

    fn fill_record(
        &mut self,
        struct_index: u32,
        label: &str,
        kind: RecordKind,
        fields: &[Field],
    ) -> Result<()> {
        let compiled = self.compile_fields(Some(struct_index), label, kind, fields)?;
        let first_field = side_index(self.fields.len(), "fields")?;
        let def = &mut self.structs[struct_index as usize];
        def.first_field = first_field;
        def.field_count = compiled.len() as u32;
        def.flags &= !StructDef::OPAQUE;
        self.fields.extend(compiled);
        Ok(())
    }

    fn compile_fields(
        &mut self,
        struct_index: Option<u32>,
        label: &str,
        kind: RecordKind,
        fields: &[Field],
    ) -> Result<Vec<FieldDef>> {
        if let Some(index) = struct_index {
            self.filling.insert(index);
        }
        let compiled = self.compile_field_list(label, kind, fields);
        if let Some(index) = struct_index {
            self.filling.remove(&index);
        }
        compiled
    }

    fn compile_field_list(
        &mut self,
        label: &str,
        kind: RecordKind,
        fields: &[Field],
    ) -> Result<Vec<FieldDef>> {
        let graph = self.graph;
        let mut compiled = Vec::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            let name = graph.name(field.name);
            let what = if name.is_empty() {
                format!("unnamed field of {label}")
            } else {
                format!("field '{name}' of {label}")
            };
            self.check_field(field, &what, kind, i + 1 == fields.len())?;
            let ty = self.compile_node(field.ty)?;
            compiled.push(FieldDef {
                name: self.string(field.name),
                ty,
                bit_width: field.bit_width,
            });
        }
        Ok(compiled)
    }

    fn check_field(&self, field: &Field, what: &str, kind: RecordKind, is_last: bool) -> Result<()> {
        let graph = self.graph;
        self.check_object(field.ty, what)?;

        let node = graph.node(field.ty);
        if let TypeNode::Array { length: None, .. } = node
            && (kind == RecordKind::Union || !is_last)
        {
            return Err(CompileError::ParseStructure(format!(
                "{what} has unknown length but is not the last member of a struct"
            )));
        }

        if let Some(rid) = by_value_record(self, field.ty)
            && self.is_being_compiled(rid)
        {
            return Err(CompileError::ParseStructure(format!(
                "{} contains itself by value",
                graph.record_label(rid)
            )));
        }

        let Some(width) = field.bit_width else {
            return Ok(());
        };
        let storage = match node {
            TypeNode::Primitive(kind) => Some(*kind),
            TypeNode::Enum(eid) => Some(graph.enum_decl(*eid).underlying),
            _ => None,
        };
        let Some(storage) = storage.filter(|k| k.is_integral()) else {
            return Err(CompileError::ParseStructure(format!(
                "{what} is a bitfield of non-integer type"
            )));
        };
        if u32::from(width) > bit_capacity(storage) {
            return Err(CompileError::ParseStructure(format!(
                "{what} is {width} bits wide, wider than {storage}"
            )));
        }
        if width == 0 && !graph.name(field.name).is_empty() {
            return Err(CompileError::ParseStructure(format!(
                "{what} is a named zero-width bitfield"
            )));
        }
        Ok(())
    }

    fn is_being_compiled(&self, rid: RecordId) -> bool {
        let record = self.graph.record(rid);
        match record.name {
            Some(name) => self
                .named_records
                .get(&name)
                .is_some_and(|group| self.filling.contains(&group.struct_index)),
            None => self.anon_in_progress.contains(&rid),
        }
    }

    /// Named enums are identified by name, anonymous ones by shape.
    pub(super) fn compile_enum(&mut self, eid: EnumId) -> Result<TypeIndex> {
        let graph = self.graph;
        let decl = graph.enum_decl(eid);
        let label = graph.enum_label(eid);
        if !decl.underlying.is_integral() {
            return Err(CompileError::ParseStructure(format!(
                "{label} has non-integer storage type {}",
                decl.underlying
            )));
        }

        let key = ShapeKey::Enum {
            name: decl.name,
            underlying: decl.underlying,
            members: decl.members.iter().map(|m| (m.name, m.value)).collect(),
        };
        match decl.name {
            Some(name) => {
                if let Some((ty, existing)) = self.named_enums.get(&name) {
                    if *existing == key {
                        return Ok(*ty);
                    }
                    return Err(CompileError::ConflictingRedefinition(label));
                }
            }
            None => {
                if let Some(&ty) = self.dedup.get(&key) {
                    return Ok(ty);
                }
            }
        }

        let enum_index = side_index(self.enums.len(), "enums")?;
        let first_member = side_index(self.members.len(), "enum members")?;
        let ty = self.push(TypeOp::Enum(enum_index))?;
        for member in &decl.members {
            let name = self.string(member.name);
            self.members.push(EnumMemberDef {
                name,
                value: member.value,
            });
        }
        let name = match decl.name {
            Some(name) => self.string(name),
            None => StringId::EMPTY,
        };
        self.enums.push(EnumDef {
            name,
            record: ty,
            underlying: decl.underlying,
            first_member,
            member_count: decl.members.len() as u32,
        });

        match decl.name {
            Some(name) => {
                self.named_enums.insert(name, (ty, key));
            }
            None => {
                self.dedup.insert(key, ty);
            }
        }
        Ok(ty)
    }
}

fn union_flag(kind: RecordKind) -> u32 {
    match kind {
        RecordKind::Struct => 0,
        RecordKind::Union => StructDef::UNION,
    }
}

/// The record stored by value at `node`, looking through arrays.
fn by_value_record(compiler: &Compiler<'_>, node: NodeId) -> Option<RecordId> {
    let mut current = node;
    loop {
        match compiler.graph.node(current) {
            TypeNode::Array { element, .. } => current = *element,
            TypeNode::Record(rid) => return Some(*rid),
            _ => return None,
        }
    }
}

/// Widest bitfield a storage type admits on any supported platform.
fn bit_capacity(kind: PrimitiveKind) -> u32 {
    use PrimitiveKind as P;
    match kind {
        P::Bool => 1,
        P::Char | P::SChar | P::UChar | P::Int8 | P::UInt8 => 8,
        P::Short | P::UShort | P::Int16 | P::UInt16 => 16,
        P::Int | P::UInt | P::Int32 | P::UInt32 => 32,
        _ => 64,
    }
}
