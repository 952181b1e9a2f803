//! Sizes, alignments and field offsets of table types on one platform.
//!
//! Layout is computed lazily and cached per canonical index. Records follow
//! the usual C rules: every member is placed at the next offset aligned to
//! its own alignment, the record is aligned to its strictest member, and its
//! size is rounded up to that alignment. Union members all sit at offset 0.
//!
//! Consecutive bitfields share a storage unit of their declared type while
//! their bits fit. A bitfield that would overflow the current unit starts a
//! new one, aligned to the declared type. A zero-width bitfield closes the
//! current unit. Within a unit, bits are allocated from the least or most
//! significant end depending on [`BitOrder`].

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use cshape_core::{BitOrder, Platform, PrimitiveKind, SizeAlign};
use cshape_table::{FieldDef, TableError, TypeIndex, TypeShape, TypeTable};

/// Errors from layout queries.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// `void`, an opaque record or an open array.
    #[error("'{0}' has incomplete type")]
    IncompleteType(String),

    /// Function types have no size.
    #[error("'{0}' is a function type and has no size")]
    Unsized(String),

    #[error("bitfield '{field}' {reason}")]
    InvalidBitfield { field: String, reason: String },

    #[error("'{record}' has no field '{field}'")]
    NoField { record: String, field: String },

    #[error("'{0}' is not a struct or union")]
    NotARecord(String),

    #[error("'{0}' is too large")]
    TooLarge(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Size and alignment in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub size: u64,
    pub align: u64,
}

impl From<SizeAlign> for Layout {
    fn from(sa: SizeAlign) -> Self {
        Self {
            size: u64::from(sa.size),
            align: u64::from(sa.align),
        }
    }
}

/// Placement of a bitfield inside its storage unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bitfield {
    pub width: u8,
    /// Position of the field's lowest bit in the unit, read as an integer.
    pub shift: u8,
    /// Size of the storage unit in bytes.
    pub unit: u32,
    pub signed: bool,
}

impl Bitfield {
    pub fn mask(self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1 << self.width) - 1
        }
    }

    /// Smallest and largest value the field holds.
    pub fn range(self) -> (i128, i128) {
        if self.signed {
            let half = 1i128 << (self.width - 1);
            (-half, half - 1)
        } else {
            (0, (1i128 << self.width) - 1)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    /// Empty for unnamed bitfields.
    pub name: String,
    pub ty: TypeIndex,
    /// Byte offset of the field, or of its storage unit for bitfields.
    pub offset: u64,
    pub bitfield: Option<Bitfield>,
}

impl FieldLayout {
    pub fn bit_offset(&self) -> u8 {
        self.bitfield.map_or(0, |b| b.shift)
    }

    pub fn bit_width(&self) -> Option<u8> {
        self.bitfield.map(|b| b.width)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordLayout {
    /// C spelling of the record type.
    pub name: String,
    pub layout: Layout,
    /// Members in declaration order. Zero-width bitfields only affect
    /// placement and are not listed.
    pub fields: Vec<FieldLayout>,
}

impl RecordLayout {
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        if name.is_empty() {
            return None;
        }
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Computes and caches layouts for one table on one platform.
pub struct LayoutEngine {
    table: Arc<TypeTable>,
    platform: Platform,
    sizes: RefCell<HashMap<TypeIndex, Layout>>,
    records: RefCell<HashMap<TypeIndex, Rc<RecordLayout>>>,
    /// Records whose layout is being computed.
    active: RefCell<HashSet<TypeIndex>>,
}

impl LayoutEngine {
    pub fn new(table: Arc<TypeTable>, platform: Platform) -> Self {
        Self {
            table,
            platform,
            sizes: RefCell::new(HashMap::new()),
            records: RefCell::new(HashMap::new()),
            active: RefCell::new(HashSet::new()),
        }
    }

    pub fn table(&self) -> &TypeTable {
        &self.table
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn layout(&self, ty: TypeIndex) -> Result<Layout, LayoutError> {
        let ty = self.table.canonical(ty)?;
        if let Some(layout) = self.sizes.borrow().get(&ty) {
            return Ok(*layout);
        }
        let layout = self.compute(ty)?;
        self.sizes.borrow_mut().insert(ty, layout);
        Ok(layout)
    }

    pub fn size_of(&self, ty: TypeIndex) -> Result<u64, LayoutError> {
        Ok(self.layout(ty)?.size)
    }

    pub fn align_of(&self, ty: TypeIndex) -> Result<u64, LayoutError> {
        Ok(self.layout(ty)?.align)
    }

    /// Byte offset of a named member. Bitfields have none.
    pub fn offset_of(&self, ty: TypeIndex, field: &str) -> Result<u64, LayoutError> {
        let record = self.record(ty)?;
        let found = self.field_of(&record, field)?;
        if found.bitfield.is_some() {
            return Err(LayoutError::InvalidBitfield {
                field: field.to_owned(),
                reason: "has no byte offset".to_owned(),
            });
        }
        Ok(found.offset)
    }

    /// A named member of `record`.
    pub fn field_of<'r>(
        &self,
        record: &'r RecordLayout,
        field: &str,
    ) -> Result<&'r FieldLayout, LayoutError> {
        record.field(field).ok_or_else(|| LayoutError::NoField {
            record: record.name.clone(),
            field: field.to_owned(),
        })
    }

    /// Layout of the primitive, `None` for `void`.
    pub fn primitive(&self, kind: PrimitiveKind) -> Option<Layout> {
        self.platform.primitive(kind).map(Layout::from)
    }

    /// Member placement of a struct or union.
    pub fn record(&self, ty: TypeIndex) -> Result<Rc<RecordLayout>, LayoutError> {
        let ty = self.table.canonical(ty)?;
        if let Some(record) = self.records.borrow().get(&ty) {
            return Ok(Rc::clone(record));
        }

        let TypeShape::Record { index, union } = self.table.shape(ty)? else {
            return Err(LayoutError::NotARecord(self.name(ty)));
        };
        if self.table.struct_def(index).is_opaque() {
            return Err(LayoutError::IncompleteType(self.name(ty)));
        }
        // A record reached again while placing its own members contains
        // itself by value.
        if !self.active.borrow_mut().insert(ty) {
            return Err(LayoutError::IncompleteType(self.name(ty)));
        }
        let result = self.compute_record(ty, index, union);
        self.active.borrow_mut().remove(&ty);

        let record = Rc::new(result?);
        tracing::trace!(record = %record.name, size = record.layout.size, "record laid out");
        self.records.borrow_mut().insert(ty, Rc::clone(&record));
        Ok(record)
    }

    /// C spelling used in error messages.
    pub fn name(&self, ty: TypeIndex) -> String {
        self.table
            .type_name(ty)
            .unwrap_or_else(|_| format!("type {ty}"))
    }

    fn compute(&self, ty: TypeIndex) -> Result<Layout, LayoutError> {
        let layout = match self.table.shape(ty)? {
            TypeShape::Primitive(kind) => self
                .primitive(kind)
                .ok_or_else(|| LayoutError::IncompleteType(kind.c_name().to_owned()))?,
            TypeShape::Pointer(_) => Layout::from(self.platform.pointer),
            TypeShape::Array {
                element,
                length: Some(length),
            } => {
                let element = self.layout(element)?;
                let size = element
                    .size
                    .checked_mul(length)
                    .ok_or_else(|| LayoutError::TooLarge(self.name(ty)))?;
                Layout {
                    size,
                    align: element.align,
                }
            }
            TypeShape::Array { length: None, .. } => {
                return Err(LayoutError::IncompleteType(self.name(ty)));
            }
            TypeShape::Record { .. } => self.record(ty)?.layout,
            TypeShape::Enum(index) => {
                let underlying = self.table.enum_def(index).underlying;
                self.primitive(underlying)
                    .ok_or_else(|| LayoutError::IncompleteType(self.name(ty)))?
            }
            TypeShape::Function(_) => return Err(LayoutError::Unsized(self.name(ty))),
        };
        Ok(layout)
    }

    fn compute_record(
        &self,
        ty: TypeIndex,
        index: u32,
        union: bool,
    ) -> Result<RecordLayout, LayoutError> {
        let table = &*self.table;
        let defs = table.fields_of(table.struct_def(index));
        let mut placer = Placer::new(union, self.platform.bit_order);
        let too_large = || LayoutError::TooLarge(self.name(ty));
        let mut fields = Vec::with_capacity(defs.len());

        for (i, def) in defs.iter().enumerate() {
            let name = table.string(def.name).to_owned();
            let field_ty = table.canonical(def.ty)?;
            let Some(width) = def.bit_width else {
                let layout = match table.shape(field_ty)? {
                    // Trailing flexible array member.
                    TypeShape::Array {
                        element,
                        length: None,
                    } if i + 1 == defs.len() && !union => Layout {
                        size: 0,
                        align: self.layout(element)?.align,
                    },
                    _ => self.layout(field_ty)?,
                };
                let offset = placer.place(layout).ok_or_else(too_large)?;
                fields.push(FieldLayout {
                    name,
                    ty: field_ty,
                    offset,
                    bitfield: None,
                });
                continue;
            };

            let (kind, unit) = self.bit_unit(def, &name)?;
            let bits = unit.size * 8;
            if u64::from(width) > bits {
                return Err(LayoutError::InvalidBitfield {
                    field: name,
                    reason: format!("is {width} bits wide, wider than '{}'", self.name(field_ty)),
                });
            }
            if let Some((offset, shift)) = placer.place_bits(width, unit).ok_or_else(too_large)? {
                fields.push(FieldLayout {
                    name,
                    ty: field_ty,
                    offset,
                    bitfield: Some(Bitfield {
                        width,
                        shift,
                        unit: unit.size as u32,
                        signed: self.platform.is_signed(kind),
                    }),
                });
            }
        }

        Ok(RecordLayout {
            name: self.name(ty),
            layout: placer.finish().ok_or_else(too_large)?,
            fields,
        })
    }

    /// Storage kind and unit layout of a bitfield.
    fn bit_unit(&self, def: &FieldDef, name: &str) -> Result<(PrimitiveKind, Layout), LayoutError> {
        let kind = match self.table.shape(def.ty)? {
            TypeShape::Primitive(kind) if kind.is_integral() => kind,
            TypeShape::Enum(index) => self.table.enum_def(index).underlying,
            _ => {
                return Err(LayoutError::InvalidBitfield {
                    field: name.to_owned(),
                    reason: format!("has non-integer type '{}'", self.name(def.ty)),
                });
            }
        };
        let unit = self
            .primitive(kind)
            .ok_or_else(|| LayoutError::IncompleteType(kind.c_name().to_owned()))?;
        Ok((kind, unit))
    }
}

/// `value` rounded up to a multiple of `align`, `None` on overflow.
fn align_to(value: u64, align: u64) -> Option<u64> {
    if align <= 1 {
        Some(value)
    } else {
        value.div_ceil(align).checked_mul(align)
    }
}

/// Running state while members of one record are placed.
struct Placer {
    union: bool,
    order: BitOrder,
    /// Next free bit.
    cursor: u64,
    /// Furthest byte covered by a member or storage unit.
    end: u64,
    align: u64,
}

impl Placer {
    fn new(union: bool, order: BitOrder) -> Self {
        Self {
            union,
            order,
            cursor: 0,
            end: 0,
            align: 1,
        }
    }

    /// Byte offset of the member, `None` when the record outgrows `u64` bits.
    fn place(&mut self, layout: Layout) -> Option<u64> {
        self.align = self.align.max(layout.align);
        if self.union {
            self.end = self.end.max(layout.size);
            return Some(0);
        }
        let offset = align_to(self.cursor.div_ceil(8), layout.align)?;
        let end = offset.checked_add(layout.size)?;
        self.cursor = end.checked_mul(8)?;
        self.end = self.end.max(end);
        Some(offset)
    }

    /// Unit offset and shift of a bitfield, `None` for a zero-width field.
    fn place_bits(&mut self, width: u8, unit: Layout) -> Option<Option<(u64, u8)>> {
        let unit_bits = unit.size.checked_mul(8)?;
        let align_bits = unit.align.checked_mul(8)?;
        let width = u64::from(width);

        if width == 0 {
            if !self.union {
                self.cursor = align_to(self.cursor, align_bits)?;
            }
            return Some(None);
        }

        self.align = self.align.max(unit.align);
        let (start, position) = if self.union {
            (0, 0)
        } else {
            let mut start = self.cursor - self.cursor % align_bits;
            if self.cursor.checked_add(width)? > start.checked_add(unit_bits)? {
                start = align_to(self.cursor, align_bits)?;
            }
            let position = self.cursor.max(start) - start;
            self.cursor = start.checked_add(position + width)?;
            (start, position)
        };
        self.end = self.end.max((start / 8).checked_add(unit.size)?);

        let shift = match self.order {
            BitOrder::LsbFirst => position,
            BitOrder::MsbFirst => unit_bits - position - width,
        };
        Some(Some((start / 8, shift as u8)))
    }

    fn finish(self) -> Option<Layout> {
        let used = self.end.max(self.cursor.div_ceil(8));
        Some(Layout {
            size: align_to(used, self.align)?,
            align: self.align,
        })
    }
}
