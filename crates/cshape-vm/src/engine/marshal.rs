//! Conversion between host values and the bytes of typed values.
//!
//! Two conversion regimes exist. Assignment (allocation initializers, stores,
//! call arguments) is strict: integers are range-checked and pointers must be
//! compatible. Casts are lenient: integers wrap to the target width and any
//! pointer-like value reinterprets as any pointer.

use std::rc::Rc;

use smallvec::smallvec;

use cshape_core::{Endian, PrimitiveClass, PrimitiveKind};
use cshape_table::{TypeIndex, TypeShape};

use super::error::RuntimeError;
use super::memory::{Address, Resource};
use super::runtime::Runtime;
use super::value::{CData, HostValue, NativeArg, Repr};
use crate::layout::{Bitfield, FieldLayout};

/// How a sized, non-aggregate type is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scalar {
    Bool,
    Char,
    Int { size: u32, signed: bool },
    Float { size: u32 },
    Enum { index: u32, size: u32, signed: bool },
    /// Data pointers and function designators.
    Address { size: u32 },
}

impl Scalar {
    pub(crate) fn size(self) -> u64 {
        match self {
            Scalar::Bool | Scalar::Char => 1,
            Scalar::Int { size, .. }
            | Scalar::Float { size }
            | Scalar::Enum { size, .. }
            | Scalar::Address { size } => u64::from(size),
        }
    }
}

/// A number read out of a typed value.
#[derive(Clone, Copy, Debug)]
enum Number {
    Int(i128),
    Float(f64),
    Address(Address),
}

/// Two's complement encoding of `value`, truncated to `size` bytes.
pub(crate) fn encode_int(value: i128, size: usize, endian: Endian) -> NativeArg {
    let le = value.to_le_bytes();
    let fill = if value < 0 { 0xFF } else { 0 };
    let mut out: NativeArg = (0..size).map(|i| le.get(i).copied().unwrap_or(fill)).collect();
    if endian == Endian::Big {
        out.reverse();
    }
    out
}

pub(crate) fn decode_int(bytes: &[u8], signed: bool, endian: Endian) -> i128 {
    let n = bytes.len().min(16);
    let mut le = [0u8; 16];
    match endian {
        Endian::Little => le[..n].copy_from_slice(&bytes[..n]),
        Endian::Big => {
            for (slot, byte) in le.iter_mut().zip(bytes.iter().rev()) {
                *slot = *byte;
            }
        }
    }
    let raw = u128::from_le_bytes(le);
    let bits = n * 8;
    if signed && bits > 0 && bits < 128 && (raw >> (bits - 1)) & 1 == 1 {
        (raw | (u128::MAX << bits)) as i128
    } else {
        raw as i128
    }
}

/// `float` is stored as binary32. Anything wider holds a binary64 in its
/// first eight bytes.
pub(crate) fn encode_float(value: f64, size: usize, endian: Endian) -> NativeArg {
    let mut out = if size == 4 {
        encode_int(i128::from((value as f32).to_bits()), 4, endian)
    } else {
        encode_int(i128::from(value.to_bits()), 8, endian)
    };
    out.resize(size, 0);
    out
}

pub(crate) fn decode_float(bytes: &[u8], endian: Endian) -> f64 {
    if bytes.len() == 4 {
        f64::from(f32::from_bits(decode_int(bytes, false, endian) as u32))
    } else {
        let head = &bytes[..bytes.len().min(8)];
        f64::from_bits(decode_int(head, false, endian) as u64)
    }
}

/// Smallest and largest value of an integer of `size` bytes.
pub(crate) fn int_range(size: u32, signed: bool) -> (i128, i128) {
    let bits = size * 8;
    if signed {
        let half = 1i128 << (bits - 1);
        (-half, half - 1)
    } else {
        (0, (1i128 << bits) - 1)
    }
}

fn is_char(kind: PrimitiveKind) -> bool {
    matches!(
        kind,
        PrimitiveKind::Char | PrimitiveKind::SChar | PrimitiveKind::UChar
    )
}

impl Runtime {
    pub(crate) fn endian(&self) -> Endian {
        self.platform().endian
    }

    /// Storage class of `ty`, `None` for arrays, records and `void`.
    pub(crate) fn scalar(&self, ty: TypeIndex) -> Result<Option<Scalar>, RuntimeError> {
        let platform = self.platform();
        let scalar = match self.table.shape(ty)? {
            TypeShape::Primitive(kind) => {
                let Some(sa) = platform.primitive(kind) else {
                    return Ok(None);
                };
                match kind.class() {
                    PrimitiveClass::Void => return Ok(None),
                    PrimitiveClass::Bool => Scalar::Bool,
                    PrimitiveClass::Char => Scalar::Char,
                    PrimitiveClass::Integer => Scalar::Int {
                        size: sa.size,
                        signed: platform.is_signed(kind),
                    },
                    PrimitiveClass::Float => Scalar::Float { size: sa.size },
                }
            }
            TypeShape::Enum(index) => {
                let underlying = self.table.enum_def(index).underlying;
                let size = platform.primitive(underlying).map_or(4, |sa| sa.size);
                Scalar::Enum {
                    index,
                    size,
                    signed: platform.is_signed(underlying),
                }
            }
            TypeShape::Pointer(_) | TypeShape::Function(_) => Scalar::Address {
                size: platform.pointer.size,
            },
            TypeShape::Array { .. } | TypeShape::Record { .. } => return Ok(None),
        };
        Ok(Some(scalar))
    }

    /// Whether `ty` is one of the `char` kinds.
    pub(crate) fn is_char_type(&self, ty: TypeIndex) -> Result<bool, RuntimeError> {
        Ok(matches!(self.table.shape(ty)?, TypeShape::Primitive(kind) if is_char(kind)))
    }

    pub(crate) fn is_void(&self, ty: TypeIndex) -> Result<bool, RuntimeError> {
        Ok(matches!(
            self.table.shape(ty)?,
            TypeShape::Primitive(PrimitiveKind::Void)
        ))
    }

    pub(crate) fn read_bytes(&self, address: Address, len: u64) -> Result<NativeArg, RuntimeError> {
        let size = usize::try_from(len).map_err(|_| RuntimeError::InvalidAddress { address, len })?;
        let mut out: NativeArg = smallvec![0; size];
        self.memory.borrow().read(address, &mut out)?;
        Ok(out)
    }

    pub(crate) fn write_bytes(&self, address: Address, data: &[u8]) -> Result<(), RuntimeError> {
        self.memory.borrow_mut().write(address, data)
    }

    fn zero(&self, address: Address, len: u64) -> Result<(), RuntimeError> {
        let zeros = vec![0u8; usize::try_from(len).unwrap_or(0)];
        self.write_bytes(address, &zeros)
    }

    /// Run a multi-part write over `len` bytes at `address`. If any part
    /// fails, the bytes are put back as they were.
    fn all_or_nothing(
        &self,
        address: Address,
        len: u64,
        write: impl FnOnce() -> Result<(), RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let saved = self.read_bytes(address, len)?;
        let result = write();
        if result.is_err() {
            self.write_bytes(address, &saved)?;
        }
        result
    }

    /// The first `len` bytes of a value, wherever they live.
    pub(crate) fn bytes_of(&self, value: &CData, len: u64) -> Result<NativeArg, RuntimeError> {
        match &value.repr {
            Repr::Inline(bytes) => Ok(bytes.clone()),
            Repr::Place(address) => self.read_bytes(*address, len),
        }
    }

    /// The address a pointer or function value holds.
    pub(crate) fn address_value(&self, value: &CData) -> Result<Address, RuntimeError> {
        let size = u64::from(self.platform().pointer.size);
        let bytes = self.bytes_of(value, size)?;
        Ok(decode_int(&bytes, false, self.endian()) as u64)
    }

    pub(crate) fn encode_address(&self, address: Address) -> NativeArg {
        let size = self.platform().pointer.size as usize;
        encode_int(i128::from(address), size, self.endian())
    }

    pub(crate) fn convert_error(&self, value: &HostValue, ty: TypeIndex) -> RuntimeError {
        let from = match value {
            HostValue::Data(d) => self.name(d.ty),
            other => other.kind().to_owned(),
        };
        RuntimeError::convert(&from, &self.name(ty))
    }

    fn overflow(&self, value: i128, ty: TypeIndex) -> RuntimeError {
        RuntimeError::Overflow {
            value,
            ty: self.name(ty),
        }
    }

    pub(crate) fn member_value(&self, index: u32, name: &str) -> Result<i128, RuntimeError> {
        let def = self.table.enum_def(index);
        self.table
            .members_of(def)
            .iter()
            .find(|m| self.table.string(m.name) == name)
            .map(|m| i128::from(m.value))
            .ok_or_else(|| {
                RuntimeError::Value(format!(
                    "'{}' has no member '{name}'",
                    self.name(def.record)
                ))
            })
    }

    fn checked_int(
        &self,
        value: i128,
        size: u32,
        signed: bool,
        ty: TypeIndex,
    ) -> Result<NativeArg, RuntimeError> {
        let (lo, hi) = int_range(size, signed);
        if value < lo || value > hi {
            return Err(self.overflow(value, ty));
        }
        Ok(encode_int(value, size as usize, self.endian()))
    }

    /// The number a scalar or array value stands for. Arrays stand for the
    /// address of their first element. `None` for records.
    fn number_of(&self, value: &CData) -> Result<Option<Number>, RuntimeError> {
        if let TypeShape::Array { .. } = self.table.shape(value.ty)? {
            return Ok(value.address().map(Number::Address));
        }
        let Some(scalar) = self.scalar(value.ty)? else {
            return Ok(None);
        };
        let bytes = self.bytes_of(value, scalar.size())?;
        let endian = self.endian();
        let number = match scalar {
            Scalar::Bool => Number::Int(i128::from(bytes.first().is_some_and(|b| *b != 0))),
            Scalar::Char => Number::Int(i128::from(bytes.first().copied().unwrap_or(0))),
            Scalar::Int { signed, .. } | Scalar::Enum { signed, .. } => {
                Number::Int(decode_int(&bytes, signed, endian))
            }
            Scalar::Float { .. } => Number::Float(decode_float(&bytes, endian)),
            Scalar::Address { .. } => Number::Address(decode_int(&bytes, false, endian) as u64),
        };
        Ok(Some(number))
    }

    /// Encode `value` for a slot of scalar type `ty` under assignment rules.
    /// Also returns the allocation a stored pointer points into.
    pub(crate) fn encode_assign(
        &self,
        ty: TypeIndex,
        value: &HostValue,
    ) -> Result<(NativeArg, Option<Rc<Resource>>), RuntimeError> {
        let Some(scalar) = self.scalar(ty)? else {
            return Err(self.convert_error(value, ty));
        };
        let endian = self.endian();
        let bytes = match (scalar, value) {
            (Scalar::Address { .. }, _) => return self.encode_pointer(ty, value),
            (_, HostValue::Data(data)) => self.encode_assign_data(ty, scalar, data)?,
            (Scalar::Bool, HostValue::Bool(b)) => encode_int(i128::from(*b), 1, endian),
            (Scalar::Bool, HostValue::Int(n)) => self.checked_int(*n, 1, false, ty).and_then(|b| {
                if *n > 1 {
                    Err(self.overflow(*n, ty))
                } else {
                    Ok(b)
                }
            })?,
            (Scalar::Char, HostValue::Char(c)) => smallvec![*c],
            (Scalar::Char, HostValue::Bytes(b)) if b.len() == 1 => smallvec![b[0]],
            (Scalar::Int { size, signed }, HostValue::Int(n))
            | (Scalar::Enum { size, signed, .. }, HostValue::Int(n)) => {
                self.checked_int(*n, size, signed, ty)?
            }
            (Scalar::Int { size, .. }, HostValue::Bool(b)) => {
                encode_int(i128::from(*b), size as usize, endian)
            }
            (Scalar::Enum { index, size, signed }, HostValue::Name(name)) => {
                let n = self.member_value(index, name)?;
                self.checked_int(n, size, signed, ty)?
            }
            (Scalar::Float { size }, HostValue::Float(f)) => encode_float(*f, size as usize, endian),
            (Scalar::Float { size }, HostValue::Int(n)) => {
                encode_float(*n as f64, size as usize, endian)
            }
            _ => return Err(self.convert_error(value, ty)),
        };
        Ok((bytes, None))
    }

    fn encode_assign_data(
        &self,
        ty: TypeIndex,
        scalar: Scalar,
        data: &CData,
    ) -> Result<NativeArg, RuntimeError> {
        if data.ty == ty {
            return self.bytes_of(data, scalar.size());
        }
        let source = self.scalar(data.ty)?;
        let error = || RuntimeError::convert(&self.name(data.ty), &self.name(ty));
        let number = match source {
            Some(Scalar::Address { .. }) | None => return Err(error()),
            Some(_) => self.number_of(data)?.ok_or_else(error)?,
        };
        match (scalar, number) {
            (Scalar::Char, _) if source == Some(Scalar::Char) => {
                self.bytes_of(data, 1)
            }
            (Scalar::Bool, Number::Int(n)) => self.checked_int(n, 1, false, ty).and_then(|b| {
                if n > 1 {
                    Err(self.overflow(n, ty))
                } else {
                    Ok(b)
                }
            }),
            (Scalar::Int { size, signed }, Number::Int(n))
            | (Scalar::Enum { size, signed, .. }, Number::Int(n)) => {
                self.checked_int(n, size, signed, ty)
            }
            (Scalar::Float { size }, Number::Int(n)) => {
                Ok(encode_float(n as f64, size as usize, self.endian()))
            }
            (Scalar::Float { size }, Number::Float(f)) => {
                Ok(encode_float(f, size as usize, self.endian()))
            }
            _ => Err(error()),
        }
    }

    /// Pointer assignment: the source must point to the same type, or one
    /// side must be `void *`. Arrays decay to their first element and
    /// records stored by value supply their own address.
    fn encode_pointer(
        &self,
        ty: TypeIndex,
        value: &HostValue,
    ) -> Result<(NativeArg, Option<Rc<Resource>>), RuntimeError> {
        let data = match value {
            HostValue::Null => return Ok((self.encode_address(0), None)),
            HostValue::Data(data) => data,
            _ => return Err(self.convert_error(value, ty)),
        };
        let pointee = match self.table.shape(ty)? {
            TypeShape::Pointer(target) => target,
            // A function designator slot accepts pointers to the function.
            _ => ty,
        };
        let to_void = self.is_void(pointee)?;

        let address = match self.table.shape(data.ty)? {
            TypeShape::Pointer(source)
                if source == pointee || to_void || self.is_void(source)? || data.ty == ty =>
            {
                self.address_value(data)?
            }
            TypeShape::Function(_) if data.ty == pointee || data.ty == ty || to_void => {
                self.address_value(data)?
            }
            TypeShape::Array { element, .. } if element == pointee || to_void => data
                .address()
                .ok_or_else(|| self.convert_error(value, ty))?,
            _ if data.ty == pointee => data
                .address()
                .ok_or_else(|| self.convert_error(value, ty))?,
            _ => return Err(self.convert_error(value, ty)),
        };
        Ok((self.encode_address(address), data.keep()))
    }

    /// Encode `value` for scalar type `ty` under cast rules.
    pub(crate) fn encode_cast(
        &self,
        ty: TypeIndex,
        value: &HostValue,
    ) -> Result<(NativeArg, Option<Rc<Resource>>), RuntimeError> {
        let Some(scalar) = self.scalar(ty)? else {
            return Err(self.convert_error(value, ty));
        };
        let mut keep = None;
        let number = match (scalar, value) {
            (_, HostValue::Int(n)) => Number::Int(*n),
            (_, HostValue::Bool(b)) => Number::Int(i128::from(*b)),
            (_, HostValue::Char(c)) => Number::Int(i128::from(*c)),
            (_, HostValue::Bytes(b)) if b.len() == 1 => Number::Int(i128::from(b[0])),
            (_, HostValue::Float(f)) => Number::Float(*f),
            (Scalar::Enum { index, .. }, HostValue::Name(name)) => {
                Number::Int(self.member_value(index, name)?)
            }
            (Scalar::Address { .. }, HostValue::Null) => Number::Address(0),
            (_, HostValue::Data(data)) => {
                keep = data.keep();
                self.number_of(data)?
                    .ok_or_else(|| self.convert_error(value, ty))?
            }
            _ => return Err(self.convert_error(value, ty)),
        };

        let endian = self.endian();
        let bytes = match (scalar, number) {
            (Scalar::Address { .. }, Number::Float(_)) => {
                return Err(self.convert_error(value, ty));
            }
            (Scalar::Address { size }, Number::Int(n)) => encode_int(n, size as usize, endian),
            (Scalar::Address { size }, Number::Address(a)) => {
                encode_int(i128::from(a), size as usize, endian)
            }
            (Scalar::Bool, number) => {
                let set = match number {
                    Number::Int(n) => n != 0,
                    Number::Float(f) => f != 0.0,
                    Number::Address(a) => a != 0,
                };
                smallvec![u8::from(set)]
            }
            (Scalar::Char, Number::Int(n)) => smallvec![n as u8],
            (Scalar::Char, Number::Address(a)) => smallvec![a as u8],
            (Scalar::Char, Number::Float(f)) => smallvec![(f as i128) as u8],
            (Scalar::Int { size, .. } | Scalar::Enum { size, .. }, Number::Int(n)) => {
                encode_int(n, size as usize, endian)
            }
            (Scalar::Int { size, .. } | Scalar::Enum { size, .. }, Number::Address(a)) => {
                encode_int(i128::from(a), size as usize, endian)
            }
            (Scalar::Int { size, .. } | Scalar::Enum { size, .. }, Number::Float(f)) => {
                encode_int(f as i128, size as usize, endian)
            }
            (Scalar::Float { size }, Number::Int(n)) => encode_float(n as f64, size as usize, endian),
            (Scalar::Float { size }, Number::Float(f)) => encode_float(f, size as usize, endian),
            (Scalar::Float { .. }, Number::Address(_)) => {
                return Err(self.convert_error(value, ty));
            }
        };
        let keep = if matches!(scalar, Scalar::Address { .. }) {
            keep
        } else {
            None
        };
        Ok((bytes, keep))
    }

    /// Host value of scalar bytes. Null pointers read as [`HostValue::Null`].
    pub(crate) fn decode_scalar(
        &self,
        ty: TypeIndex,
        scalar: Scalar,
        bytes: &[u8],
        keep: Option<Rc<Resource>>,
    ) -> HostValue {
        let endian = self.endian();
        match scalar {
            Scalar::Bool => HostValue::Bool(bytes.first().is_some_and(|b| *b != 0)),
            Scalar::Char => HostValue::Char(bytes.first().copied().unwrap_or(0)),
            Scalar::Int { signed, .. } | Scalar::Enum { signed, .. } => {
                HostValue::Int(decode_int(bytes, signed, endian))
            }
            Scalar::Float { .. } => HostValue::Float(decode_float(bytes, endian)),
            Scalar::Address { .. } => {
                if decode_int(bytes, false, endian) == 0 {
                    HostValue::Null
                } else {
                    HostValue::Data(CData::inline(ty, NativeArg::from_slice(bytes), keep))
                }
            }
        }
    }

    /// Read a value of type `ty` at `address`. Scalars are decoded;
    /// aggregates come back as views.
    pub(crate) fn load(
        &self,
        ty: TypeIndex,
        address: Address,
        keep: Option<Rc<Resource>>,
    ) -> Result<HostValue, RuntimeError> {
        if let Some(scalar) = self.scalar(ty)? {
            let bytes = self.read_bytes(address, scalar.size())?;
            return Ok(self.decode_scalar(ty, scalar, &bytes, keep));
        }
        match self.table.shape(ty)? {
            TypeShape::Array { .. } | TypeShape::Record { .. } => {
                Ok(HostValue::Data(CData::place(ty, address, keep)))
            }
            _ => Err(RuntimeError::Type(format!(
                "cannot read a value of type '{}'",
                self.name(ty)
            ))),
        }
    }

    /// Write `value` as type `ty` at `address`. `owner` is the allocation
    /// being written to; it keeps alive whatever a stored pointer points
    /// into.
    pub(crate) fn store(
        &self,
        ty: TypeIndex,
        address: Address,
        value: &HostValue,
        owner: Option<&Rc<Resource>>,
    ) -> Result<(), RuntimeError> {
        if self.scalar(ty)?.is_some() {
            let (bytes, keep) = self.encode_assign(ty, value)?;
            self.write_bytes(address, &bytes)?;
            if let (Some(owner), Some(keep)) = (owner, keep) {
                owner.keep_alive(&keep);
            }
            return Ok(());
        }
        match self.table.shape(ty)? {
            TypeShape::Array {
                element,
                length: Some(length),
            } => self.store_array(ty, element, length, address, value, owner),
            TypeShape::Record { union, .. } => self.store_record(ty, union, address, value, owner),
            _ => Err(self.convert_error(value, ty)),
        }
    }

    pub(crate) fn store_array(
        &self,
        ty: TypeIndex,
        element: TypeIndex,
        length: u64,
        address: Address,
        value: &HostValue,
        owner: Option<&Rc<Resource>>,
    ) -> Result<(), RuntimeError> {
        let stride = self.layout.size_of(element)?;
        match value {
            HostValue::List(items) => {
                if items.len() as u64 > length {
                    return Err(RuntimeError::Value(format!(
                        "too many initializers for '{}' ({} > {length})",
                        self.name(ty),
                        items.len()
                    )));
                }
                let size = self.layout.size_of(ty)?;
                self.all_or_nothing(address, size, || {
                    self.zero(address, size)?;
                    for (i, item) in items.iter().enumerate() {
                        self.store(element, address + i as u64 * stride, item, owner)?;
                    }
                    Ok(())
                })
            }
            HostValue::Bytes(bytes) if self.is_char_type(element)? => {
                if bytes.len() as u64 > length {
                    return Err(RuntimeError::Value(format!(
                        "initializer string is too long for '{}' ({} > {length})",
                        self.name(ty),
                        bytes.len()
                    )));
                }
                self.zero(address, length)?;
                self.write_bytes(address, bytes)
            }
            HostValue::Data(data) => {
                let same_element = matches!(
                    self.table.shape(data.ty)?,
                    TypeShape::Array { element: e, .. } if e == element
                );
                let Some(source) = data.address().filter(|_| same_element) else {
                    return Err(self.convert_error(value, ty));
                };
                let count = self.len(data)?.min(length);
                let bytes = self.read_bytes(source, count * stride)?;
                self.write_bytes(address, &bytes)
            }
            _ => Err(self.convert_error(value, ty)),
        }
    }

    fn store_record(
        &self,
        ty: TypeIndex,
        union: bool,
        address: Address,
        value: &HostValue,
        owner: Option<&Rc<Resource>>,
    ) -> Result<(), RuntimeError> {
        let record = self.layout.record(ty)?;
        let size = record.layout.size;
        let named: Vec<&FieldLayout> = record.fields.iter().filter(|f| !f.name.is_empty()).collect();

        match value {
            HostValue::Data(data) if data.ty == ty => {
                let source = data
                    .address()
                    .ok_or_else(|| self.convert_error(value, ty))?;
                let bytes = self.read_bytes(source, size)?;
                self.write_bytes(address, &bytes)
            }
            HostValue::List(items) => {
                let limit = if union { 1 } else { named.len() };
                if items.len() > limit {
                    return Err(RuntimeError::Value(format!(
                        "too many initializers for '{}' ({} > {limit})",
                        record.name,
                        items.len()
                    )));
                }
                self.all_or_nothing(address, size, || {
                    self.zero(address, size)?;
                    for (field, item) in named.iter().zip(items) {
                        self.store_field(address, field, item, owner)?;
                    }
                    Ok(())
                })
            }
            _ if union && !named.is_empty() => self.all_or_nothing(address, size, || {
                self.zero(address, size)?;
                self.store_field(address, named[0], value, owner)
            }),
            _ => Err(self.convert_error(value, ty)),
        }
    }

    pub(crate) fn store_field(
        &self,
        base: Address,
        field: &FieldLayout,
        value: &HostValue,
        owner: Option<&Rc<Resource>>,
    ) -> Result<(), RuntimeError> {
        let address = base + field.offset;
        match field.bitfield {
            Some(bits) => self.store_bits(address, field.ty, bits, value),
            None => self.store(field.ty, address, value, owner),
        }
    }

    pub(crate) fn load_field(
        &self,
        base: Address,
        field: &FieldLayout,
        keep: Option<Rc<Resource>>,
    ) -> Result<HostValue, RuntimeError> {
        let address = base + field.offset;
        match field.bitfield {
            Some(bits) => self.load_bits(address, field.ty, bits),
            None => self.load(field.ty, address, keep),
        }
    }

    fn store_bits(
        &self,
        address: Address,
        ty: TypeIndex,
        bits: Bitfield,
        value: &HostValue,
    ) -> Result<(), RuntimeError> {
        let n = match (self.table.shape(ty)?, value) {
            (_, HostValue::Int(n)) => *n,
            (_, HostValue::Bool(b)) => i128::from(*b),
            (TypeShape::Enum(index), HostValue::Name(name)) => self.member_value(index, name)?,
            (_, HostValue::Data(data)) => match self.scalar(data.ty)? {
                Some(Scalar::Address { .. }) | None => return Err(self.convert_error(value, ty)),
                Some(_) => match self.number_of(data)? {
                    Some(Number::Int(n)) => n,
                    _ => return Err(self.convert_error(value, ty)),
                },
            },
            _ => return Err(self.convert_error(value, ty)),
        };
        let (lo, hi) = bits.range();
        if n < lo || n > hi {
            return Err(RuntimeError::Overflow {
                value: n,
                ty: format!("{}:{}", self.name(ty), bits.width),
            });
        }

        let endian = self.endian();
        let unit = self.read_bytes(address, u64::from(bits.unit))?;
        let raw = decode_int(&unit, false, endian) as u64;
        let mask = bits.mask() << bits.shift;
        let raw = (raw & !mask) | (((n as u64) & bits.mask()) << bits.shift);
        self.write_bytes(address, &encode_int(i128::from(raw), bits.unit as usize, endian))
    }

    fn load_bits(
        &self,
        address: Address,
        ty: TypeIndex,
        bits: Bitfield,
    ) -> Result<HostValue, RuntimeError> {
        let unit = self.read_bytes(address, u64::from(bits.unit))?;
        let raw = decode_int(&unit, false, self.endian()) as u64;
        let v = (raw >> bits.shift) & bits.mask();
        if matches!(self.table.shape(ty)?, TypeShape::Primitive(PrimitiveKind::Bool)) {
            return Ok(HostValue::Bool(v != 0));
        }
        let negative = bits.signed && (v >> (bits.width - 1)) & 1 == 1;
        let n = if negative {
            i128::from(v) - (1i128 << bits.width)
        } else {
            i128::from(v)
        };
        Ok(HostValue::Int(n))
    }
}
