//! The runtime: typed operations over values in memory.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;

use cshape_core::Platform;
use cshape_table::{FunctionSig, RootKind, TypeIndex, TypeShape, TypeTable};

use super::callback::{CallbackRegistry, NativeCaller};
use super::error::RuntimeError;
use super::marshal::{Scalar, decode_int, encode_float, encode_int, int_range};
use super::memory::{Address, Heap, MemoryProvider, Resource, SharedMemory};
use super::value::{CData, HostValue, NativeArg, Repr};
use crate::layout::{Layout, LayoutEngine, LayoutError};

/// A type by typedef name or C spelling (`int *`, `struct point`).
pub(crate) fn find_type(table: &TypeTable, name: &str) -> Option<TypeIndex> {
    let typedef = table
        .roots()
        .iter()
        .find(|r| r.kind == RootKind::Typedef && table.string(r.name) == name);
    if let Some(root) = typedef {
        return table.canonical(root.ty).ok();
    }
    (0..table.len() as u32).map(TypeIndex).find(|&ty| {
        table.canonical(ty).ok() == Some(ty) && table.type_name(ty).is_ok_and(|n| n == name)
    })
}

/// Identity of a value for equality and hashing.
///
/// Scalars are identified by type and value, aggregates by type and
/// address. All null pointers share one key regardless of type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ValueKey {
    ty: Option<TypeIndex>,
    bits: NativeArg,
}

pub struct RuntimeBuilder {
    table: Arc<TypeTable>,
    platform: Platform,
    memory: Option<Box<dyn MemoryProvider>>,
    native: Option<Box<dyn NativeCaller>>,
    heap_limit: Option<u64>,
}

impl RuntimeBuilder {
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Memory values live in. Defaults to a fresh [`Heap`].
    pub fn memory(mut self, memory: impl MemoryProvider + 'static) -> Self {
        self.memory = Some(Box::new(memory));
        self
    }

    /// Target for calls to addresses that are not registered callbacks.
    pub fn native_caller(mut self, caller: impl NativeCaller + 'static) -> Self {
        self.native = Some(Box::new(caller));
        self
    }

    /// Cap the default heap. Ignored when a memory provider is set.
    pub fn heap_limit(mut self, bytes: u64) -> Self {
        self.heap_limit = Some(bytes);
        self
    }

    pub fn build(self) -> Runtime {
        let memory: Box<dyn MemoryProvider> = match (self.memory, self.heap_limit) {
            (Some(memory), _) => memory,
            (None, Some(limit)) => Box::new(Heap::with_limit(limit)),
            (None, None) => Box::new(Heap::new()),
        };
        let callbacks = CallbackRegistry::new(self.platform.pointer_bits());
        tracing::debug!(
            platform = %self.platform.name,
            types = self.table.len(),
            "runtime ready"
        );
        Runtime {
            layout: LayoutEngine::new(Arc::clone(&self.table), self.platform),
            table: self.table,
            memory: Rc::new(RefCell::new(memory)),
            callbacks: RefCell::new(callbacks),
            native: self.native,
        }
    }
}

/// Allocates, reads, writes and calls typed values.
///
/// A runtime is single-threaded: values hold reference-counted handles to
/// their allocations and to the runtime's memory.
pub struct Runtime {
    pub(crate) table: Arc<TypeTable>,
    pub(crate) layout: LayoutEngine,
    pub(crate) memory: SharedMemory,
    callbacks: RefCell<CallbackRegistry>,
    native: Option<Box<dyn NativeCaller>>,
}

impl Runtime {
    /// A runtime on [`Platform::lp64`] over a fresh heap.
    pub fn new(table: Arc<TypeTable>) -> Self {
        Self::builder(table).build()
    }

    pub fn builder(table: Arc<TypeTable>) -> RuntimeBuilder {
        RuntimeBuilder {
            table,
            platform: Platform::default(),
            memory: None,
            native: None,
            heap_limit: None,
        }
    }

    pub fn table(&self) -> &TypeTable {
        &self.table
    }

    pub fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    pub fn platform(&self) -> &Platform {
        self.layout.platform()
    }

    pub(crate) fn name(&self, ty: TypeIndex) -> String {
        self.layout.name(ty)
    }

    /// Layout of a type that has a size. Function types are a type error
    /// here rather than a layout error.
    fn sized(&self, ty: TypeIndex) -> Result<Layout, RuntimeError> {
        self.layout.layout(ty).map_err(|e| match e {
            LayoutError::Unsized(name) => {
                RuntimeError::Type(format!("'{name}' is a function type and has no size"))
            }
            e => e.into(),
        })
    }

    pub fn type_named(&self, name: &str) -> Result<TypeIndex, RuntimeError> {
        find_type(&self.table, name)
            .ok_or_else(|| RuntimeError::Type(format!("no type '{name}' in this table")))
    }

    pub fn type_name(&self, ty: TypeIndex) -> Result<String, RuntimeError> {
        Ok(self.table.type_name(ty)?)
    }

    pub fn type_of(&self, value: &CData) -> TypeIndex {
        value.ty
    }

    pub fn sizeof(&self, ty: TypeIndex) -> Result<u64, RuntimeError> {
        Ok(self.sized(ty)?.size)
    }

    pub fn alignof(&self, ty: TypeIndex) -> Result<u64, RuntimeError> {
        Ok(self.sized(ty)?.align)
    }

    pub fn offsetof(&self, ty: TypeIndex, field: &str) -> Result<u64, RuntimeError> {
        Ok(self.layout.offset_of(ty, field)?)
    }

    /// Size of a value. Open arrays count their allocated length.
    pub fn sizeof_value(&self, value: &CData) -> Result<u64, RuntimeError> {
        match self.table.shape(value.ty)? {
            TypeShape::Array {
                element,
                length: None,
            } => {
                let length = value
                    .length
                    .ok_or_else(|| LayoutError::IncompleteType(self.name(value.ty)))?;
                Ok(self.sizeof(element)? * length)
            }
            _ => self.sizeof(value.ty),
        }
    }

    /// Element count of an array value.
    pub fn len(&self, value: &CData) -> Result<u64, RuntimeError> {
        match self.table.shape(value.ty)? {
            TypeShape::Array { length, .. } => length.or(value.length).ok_or_else(|| {
                RuntimeError::Type(format!("'{}' has unknown length", self.name(value.ty)))
            }),
            _ => Err(RuntimeError::Type(format!(
                "'{}' has no length",
                self.name(value.ty)
            ))),
        }
    }

    /// Allocate a zeroed value of type `ty` and initialize it from `init`.
    ///
    /// Open arrays take their length from `init`: an integer count, the
    /// length of a list, or the length of a byte string plus its NUL.
    pub fn alloc(&self, ty: TypeIndex, init: Option<HostValue>) -> Result<CData, RuntimeError> {
        let ty = self.table.canonical(ty)?;
        let (layout, length) = match self.table.shape(ty)? {
            TypeShape::Array {
                element,
                length: None,
            } => {
                let count = self.open_length(ty, element, init.as_ref())?;
                let cell = self.sized(element)?;
                let size = cell
                    .size
                    .checked_mul(count)
                    .ok_or_else(|| LayoutError::TooLarge(self.name(ty)))?;
                (
                    Layout {
                        size,
                        align: cell.align,
                    },
                    Some((count, element)),
                )
            }
            _ => (self.sized(ty)?, None),
        };

        let address = self.memory.borrow_mut().allocate(layout.size, layout.align)?;
        let resource = Rc::new(Resource::new(
            Rc::clone(&self.memory),
            address,
            layout.size,
        ));
        let data = CData {
            ty,
            repr: Repr::Place(address),
            length: length.map(|(count, _)| count),
            owner: Some(Rc::clone(&resource)),
            owning: true,
        };

        match (&init, length) {
            (None, _) | (Some(HostValue::Int(_)), Some(_)) => {}
            (Some(init), Some((count, element))) => {
                self.store_array(ty, element, count, address, init, Some(&resource))?;
            }
            (Some(init), None) => self.store(ty, address, init, Some(&resource))?,
        }
        tracing::trace!(ty = %self.name(ty), address, size = layout.size, "value allocated");
        Ok(data)
    }

    fn open_length(
        &self,
        ty: TypeIndex,
        element: TypeIndex,
        init: Option<&HostValue>,
    ) -> Result<u64, RuntimeError> {
        match init {
            Some(HostValue::Int(n)) => u64::try_from(*n).map_err(|_| {
                RuntimeError::Value(format!("negative length {n} for '{}'", self.name(ty)))
            }),
            Some(HostValue::List(items)) => Ok(items.len() as u64),
            Some(HostValue::Bytes(bytes)) if self.is_char_type(element)? => {
                Ok(bytes.len() as u64 + 1)
            }
            Some(HostValue::Data(data))
                if matches!(
                    self.table.shape(data.ty)?,
                    TypeShape::Array { element: e, .. } if e == element
                ) =>
            {
                self.len(data)
            }
            Some(other) => Err(self.convert_error(other, ty)),
            None => Err(RuntimeError::Type(format!(
                "'{}' needs an explicit length or initializer",
                self.name(ty)
            ))),
        }
    }

    /// Reinterpret `value` as type `ty`.
    ///
    /// Scalar targets convert leniently: integers wrap, pointers and
    /// integers convert both ways. Array and record targets view the memory
    /// of an existing value, which must be large enough.
    pub fn cast(&self, ty: TypeIndex, value: HostValue) -> Result<CData, RuntimeError> {
        let ty = self.table.canonical(ty)?;
        if self.scalar(ty)?.is_some() {
            let (bytes, keep) = self.encode_cast(ty, &value)?;
            return Ok(CData::inline(ty, bytes, keep));
        }
        match self.table.shape(ty)? {
            TypeShape::Array {
                length: Some(_), ..
            }
            | TypeShape::Record { .. } => {
                let Some((data, address)) = value
                    .as_data()
                    .and_then(|d| d.address().map(|a| (d, a)))
                else {
                    return Err(self.convert_error(&value, ty));
                };
                let needed = self.sizeof(ty)?;
                let available = self.sizeof_value(data)?;
                if available < needed {
                    return Err(RuntimeError::IncompatibleSize {
                        ty: self.name(ty),
                        needed,
                        available,
                    });
                }
                Ok(CData::place(ty, address, data.keep()))
            }
            _ => Err(RuntimeError::Type(format!(
                "cannot cast to '{}'",
                self.name(ty)
            ))),
        }
    }

    /// Host value of `value`. Scalars are decoded; aggregates read as
    /// themselves.
    pub fn read(&self, value: &CData) -> Result<HostValue, RuntimeError> {
        let Some(scalar) = self.scalar(value.ty)? else {
            return Ok(HostValue::Data(value.clone()));
        };
        match &value.repr {
            Repr::Inline(bytes) => Ok(self.decode_scalar(value.ty, scalar, bytes, value.keep())),
            Repr::Place(address) => self.load(value.ty, *address, value.keep()),
        }
    }

    /// Assign to the memory `value` occupies.
    pub fn write(&self, value: &CData, new: HostValue) -> Result<(), RuntimeError> {
        let address = self.place_of(value)?;
        self.store(value.ty, address, &new, value.owner.as_ref())
    }

    fn place_of(&self, value: &CData) -> Result<Address, RuntimeError> {
        value.address().ok_or_else(|| {
            RuntimeError::Type(format!(
                "'{}' value is not stored in memory",
                self.name(value.ty)
            ))
        })
    }

    /// Element `index` of an array or pointer.
    pub fn get(&self, value: &CData, index: i64) -> Result<HostValue, RuntimeError> {
        let (element, address) = self.element(value, index)?;
        self.load(element, address, value.keep())
    }

    pub fn set(&self, value: &CData, index: i64, new: HostValue) -> Result<(), RuntimeError> {
        let (element, address) = self.element(value, index)?;
        self.store(element, address, &new, value.owner.as_ref())
    }

    /// Type and address of an element. Arrays are bounds-checked; pointers
    /// are not.
    fn element(&self, value: &CData, index: i64) -> Result<(TypeIndex, Address), RuntimeError> {
        let (element, base) = match self.table.shape(value.ty)? {
            TypeShape::Array { element, .. } => {
                let length = self.len(value)?;
                if index < 0 || index as u64 >= length {
                    return Err(RuntimeError::Index {
                        index,
                        length,
                        ty: self.name(value.ty),
                    });
                }
                (element, self.place_of(value)?)
            }
            TypeShape::Pointer(target) => {
                if matches!(self.table.shape(target)?, TypeShape::Function(_))
                    || self.is_void(target)?
                {
                    return Err(RuntimeError::Type(format!(
                        "cannot index '{}'",
                        self.name(value.ty)
                    )));
                }
                (target, self.address_value(value)?)
            }
            _ => {
                return Err(RuntimeError::Type(format!(
                    "cannot index '{}'",
                    self.name(value.ty)
                )));
            }
        };
        let stride = self.sizeof(element)? as i128;
        let address = (i128::from(base) + i128::from(index) * stride) as Address;
        Ok((element, address))
    }

    /// Member `name` of a record or of the record a pointer points to.
    pub fn field(&self, value: &CData, name: &str) -> Result<HostValue, RuntimeError> {
        let (record, base) = self.record_place(value)?;
        let layout = self.layout.record(record)?;
        let field = self.layout.field_of(&layout, name)?;
        self.load_field(base, field, value.keep())
    }

    pub fn set_field(&self, value: &CData, name: &str, new: HostValue) -> Result<(), RuntimeError> {
        let (record, base) = self.record_place(value)?;
        let layout = self.layout.record(record)?;
        let field = self.layout.field_of(&layout, name)?;
        self.store_field(base, field, &new, value.owner.as_ref())
    }

    fn record_place(&self, value: &CData) -> Result<(TypeIndex, Address), RuntimeError> {
        match self.table.shape(value.ty)? {
            TypeShape::Record { .. } => Ok((value.ty, self.place_of(value)?)),
            TypeShape::Pointer(target)
                if matches!(self.table.shape(target)?, TypeShape::Record { .. }) =>
            {
                Ok((target, self.address_value(value)?))
            }
            _ => Err(RuntimeError::Type(format!(
                "'{}' has no fields",
                self.name(value.ty)
            ))),
        }
    }

    /// Pointer type, pointee and address of a pointer or decaying array.
    fn pointer_parts(&self, value: &CData) -> Result<(TypeIndex, TypeIndex, Address), RuntimeError> {
        match self.table.shape(value.ty)? {
            TypeShape::Pointer(target) => Ok((value.ty, target, self.address_value(value)?)),
            TypeShape::Array { element, .. } => {
                let pointer = self.table.find_pointer_to(element).ok_or_else(|| {
                    RuntimeError::Type(format!(
                        "'{}' cannot decay: no pointer to '{}' in this table",
                        self.name(value.ty),
                        self.name(element)
                    ))
                })?;
                Ok((pointer, element, self.place_of(value)?))
            }
            _ => Err(RuntimeError::NotAPointer(self.name(value.ty))),
        }
    }

    fn stride(&self, pointer: TypeIndex, pointee: TypeIndex) -> Result<u64, RuntimeError> {
        if self.is_void(pointee)? || matches!(self.table.shape(pointee)?, TypeShape::Function(_)) {
            return Err(RuntimeError::Type(format!(
                "arithmetic on '{}' needs a sized pointee",
                self.name(pointer)
            )));
        }
        Ok(self.layout.size_of(pointee)?)
    }

    /// `value + n`, scaled by the pointee size.
    pub fn add(&self, value: &CData, n: i64) -> Result<CData, RuntimeError> {
        let (pointer, pointee, address) = self.pointer_parts(value)?;
        let stride = self.stride(pointer, pointee)?;
        let moved = i128::from(address) + i128::from(n) * i128::from(stride);
        let bits = self.platform().pointer_bits();
        let moved = (moved as u64) & (u64::MAX >> (64 - bits.min(64)));
        Ok(CData::inline(pointer, self.encode_address(moved), value.keep()))
    }

    pub fn sub(&self, value: &CData, n: i64) -> Result<CData, RuntimeError> {
        self.add(value, n.wrapping_neg())
    }

    /// `a - b` in elements.
    pub fn difference(&self, a: &CData, b: &CData) -> Result<i64, RuntimeError> {
        let (pointer, pointee, x) = self.pointer_parts(a)?;
        let (_, other, y) = self.pointer_parts(b)?;
        if pointee != other {
            return Err(RuntimeError::Type(format!(
                "cannot subtract '{}' from '{}'",
                self.name(b.ty),
                self.name(a.ty)
            )));
        }
        let stride = self.stride(pointer, pointee)?;
        if stride == 0 {
            return Err(RuntimeError::Type(format!(
                "cannot subtract '{}' values: pointee has size 0",
                self.name(pointer)
            )));
        }
        Ok(((i128::from(x) - i128::from(y)) / i128::from(stride)) as i64)
    }

    /// Order of two pointers to the same type by address.
    pub fn compare(&self, a: &CData, b: &CData) -> Result<Ordering, RuntimeError> {
        let (_, pointee, x) = self.pointer_parts(a)?;
        let (_, other, y) = self.pointer_parts(b)?;
        if pointee != other && !self.is_void(pointee)? && !self.is_void(other)? {
            return Err(RuntimeError::Type(format!(
                "cannot compare '{}' with '{}'",
                self.name(a.ty),
                self.name(b.ty)
            )));
        }
        Ok(x.cmp(&y))
    }

    pub fn value_key(&self, value: &CData) -> Result<ValueKey, RuntimeError> {
        match self.scalar(value.ty)? {
            Some(scalar @ Scalar::Address { .. }) => {
                let bits = self.bytes_of(value, scalar.size())?;
                if decode_int(&bits, false, self.endian()) == 0 {
                    return Ok(ValueKey {
                        ty: None,
                        bits: NativeArg::new(),
                    });
                }
                Ok(ValueKey {
                    ty: Some(value.ty),
                    bits,
                })
            }
            Some(scalar) => Ok(ValueKey {
                ty: Some(value.ty),
                bits: self.bytes_of(value, scalar.size())?,
            }),
            None => {
                let address = self.place_of(value)?;
                Ok(ValueKey {
                    ty: Some(value.ty),
                    bits: NativeArg::from_slice(&address.to_le_bytes()),
                })
            }
        }
    }

    /// Value equality: same type and same value, or same address for
    /// aggregates. Null pointers of any type are equal.
    pub fn equals(&self, a: &CData, b: &CData) -> Result<bool, RuntimeError> {
        Ok(self.value_key(a)? == self.value_key(b)?)
    }

    /// Hash consistent with [`Runtime::equals`].
    pub fn hash_value(&self, value: &CData) -> Result<u64, RuntimeError> {
        let mut hasher = DefaultHasher::new();
        self.value_key(value)?.hash(&mut hasher);
        Ok(hasher.finish())
    }

    /// Text of a `char`, a `char` array up to its first NUL, a NUL-terminated
    /// string behind a `char *`, or the member name of an enum value.
    pub fn string(&self, value: &CData) -> Result<Vec<u8>, RuntimeError> {
        match self.table.shape(value.ty)? {
            TypeShape::Enum(_) => {
                if let Some(name) = self.enum_name(value)? {
                    return Ok(name.into_bytes());
                }
                let n = self.read(value)?.as_int().unwrap_or_default();
                Ok(n.to_string().into_bytes())
            }
            TypeShape::Array { element, .. } if self.is_char_type(element)? => {
                let len = self.sizeof_value(value)?;
                let mut bytes = self.read_bytes(self.place_of(value)?, len)?.into_vec();
                if let Some(nul) = bytes.iter().position(|b| *b == 0) {
                    bytes.truncate(nul);
                }
                Ok(bytes)
            }
            TypeShape::Pointer(target) if self.is_char_type(target)? => {
                let address = self.address_value(value)?;
                if address == 0 {
                    return Err(RuntimeError::Value(
                        "cannot read a string through a null pointer".to_owned(),
                    ));
                }
                self.memory.borrow().read_c_string(address)
            }
            TypeShape::Primitive(_) if self.is_char_type(value.ty)? => {
                Ok(self.bytes_of(value, 1)?.into_vec())
            }
            _ => Err(RuntimeError::Type(format!(
                "string() needs char data, not '{}'",
                self.name(value.ty)
            ))),
        }
    }

    /// `len` raw bytes starting where `value` is or points.
    pub fn buffer(&self, value: &CData, len: u64) -> Result<Vec<u8>, RuntimeError> {
        let address = match self.table.shape(value.ty)? {
            TypeShape::Pointer(_) => self.address_value(value)?,
            _ => self.place_of(value)?,
        };
        Ok(self.read_bytes(address, len)?.into_vec())
    }

    /// Name of the first member of an enum value's type with its value.
    pub fn enum_name(&self, value: &CData) -> Result<Option<String>, RuntimeError> {
        let TypeShape::Enum(index) = self.table.shape(value.ty)? else {
            return Err(RuntimeError::Type(format!(
                "'{}' is not an enum",
                self.name(value.ty)
            )));
        };
        let Some(n) = self.read(value)?.as_int() else {
            return Ok(None);
        };
        let def = self.table.enum_def(index);
        Ok(self
            .table
            .members_of(def)
            .iter()
            .find(|m| i128::from(m.value) == n)
            .map(|m| self.table.string(m.name).to_owned()))
    }

    /// `<cdata 'int *'>`, or `<cdata 'int[4]' owning 16 bytes>` for values
    /// that own their allocation.
    pub fn repr(&self, value: &CData) -> String {
        let name = self.name(value.ty);
        if value.owning {
            let size = self.sizeof_value(value).unwrap_or(0);
            format!("<cdata '{name}' owning {size} bytes>")
        } else {
            format!("<cdata '{name}'>")
        }
    }

    /// Wrap a host closure as a function value of type `ty`, a function
    /// type or a pointer to one.
    pub fn callback<F>(&self, ty: TypeIndex, f: F) -> Result<CData, RuntimeError>
    where
        F: Fn(&[HostValue]) -> Result<HostValue, RuntimeError> + 'static,
    {
        let ty = self.table.canonical(ty)?;
        let (function, value_ty) = match self.table.shape(ty)? {
            TypeShape::Function(_) => (ty, self.table.find_pointer_to(ty).unwrap_or(ty)),
            TypeShape::Pointer(target)
                if matches!(self.table.shape(target)?, TypeShape::Function(_)) =>
            {
                (target, ty)
            }
            _ => {
                return Err(RuntimeError::Type(format!(
                    "'{}' is not a function type",
                    self.name(ty)
                )));
            }
        };
        let address = self.callbacks.borrow_mut().register(function, Rc::new(f));
        Ok(CData::inline(value_ty, self.encode_address(address), None))
    }

    /// Unregister the callback behind `function`. Its address no longer
    /// reaches the closure afterwards.
    pub fn release_callback(&self, function: &CData) -> Result<(), RuntimeError> {
        let (address, _) = self.call_target(function)?;
        if self.callbacks.borrow_mut().unregister(address) {
            Ok(())
        } else {
            Err(RuntimeError::Value(format!("no callback at {address:#x}")))
        }
    }

    /// Number of callbacks currently registered.
    pub fn callback_count(&self) -> usize {
        self.callbacks.borrow().live()
    }

    /// Call a function value. Arguments are converted to the parameter
    /// types under assignment rules; variadic extras pass as they are.
    #[tracing::instrument(level = "debug", skip_all, fields(args = args.len()))]
    pub fn call(&self, function: &CData, args: &[HostValue]) -> Result<HostValue, RuntimeError> {
        let (address, sig) = self.call_target(function)?;
        let arity = sig.params.len();
        if args.len() < arity || (!sig.variadic && args.len() > arity) {
            return Err(RuntimeError::Type(format!(
                "'{}' takes {arity} arguments, {} given",
                self.name(function.ty),
                args.len()
            )));
        }

        let registered = self.callbacks.borrow().lookup(address);
        if let Some((_, callback)) = registered {
            let host = args
                .iter()
                .enumerate()
                .map(|(i, arg)| match sig.params.get(i) {
                    Some(&param) => self.normalize(param, arg),
                    None => Ok(arg.clone()),
                })
                .collect::<Result<Vec<_>, _>>()?;
            tracing::trace!(address, args = host.len(), "calling callback");
            let result = callback(&host)?;
            if self.is_void(sig.result)? {
                return Ok(HostValue::Null);
            }
            return self.normalize(sig.result, &result);
        }

        let Some(native) = &self.native else {
            return Err(RuntimeError::NoNativeTarget(address));
        };
        let raw = args
            .iter()
            .enumerate()
            .map(|(i, arg)| match sig.params.get(i) {
                Some(&param) => self.encode_argument(param, arg),
                None => self.encode_vararg(arg),
            })
            .collect::<Result<Vec<_>, _>>()?;
        tracing::trace!(address, args = raw.len(), "calling native function");
        let result = native.call(address, &sig, &raw)?;
        self.decode_result(sig.result, &result)
    }

    fn call_target(&self, function: &CData) -> Result<(Address, FunctionSig), RuntimeError> {
        let sig = match self.table.shape(function.ty)? {
            TypeShape::Function(sig) => sig,
            TypeShape::Pointer(target) => match self.table.shape(target)? {
                TypeShape::Function(sig) => sig,
                _ => return Err(self.not_callable(function)),
            },
            _ => return Err(self.not_callable(function)),
        };
        let address = self.address_value(function)?;
        if address == 0 {
            return Err(RuntimeError::Value(
                "call through a null function pointer".to_owned(),
            ));
        }
        Ok((address, sig))
    }

    fn not_callable(&self, function: &CData) -> RuntimeError {
        RuntimeError::Type(format!("'{}' is not callable", self.name(function.ty)))
    }

    /// `value` as it reads back after being stored as `ty`.
    fn normalize(&self, ty: TypeIndex, value: &HostValue) -> Result<HostValue, RuntimeError> {
        match self.scalar(ty)? {
            Some(scalar) => {
                let (bytes, keep) = self.encode_assign(ty, value)?;
                Ok(self.decode_scalar(ty, scalar, &bytes, keep))
            }
            None => match value {
                HostValue::Data(data) if data.ty == ty => Ok(value.clone()),
                _ => Err(self.convert_error(value, ty)),
            },
        }
    }

    fn encode_argument(&self, ty: TypeIndex, value: &HostValue) -> Result<NativeArg, RuntimeError> {
        if self.scalar(ty)?.is_some() {
            return Ok(self.encode_assign(ty, value)?.0);
        }
        match value {
            HostValue::Data(data) if data.ty == ty => {
                let size = self.sizeof(ty)?;
                self.bytes_of(data, size)
            }
            _ => Err(self.convert_error(value, ty)),
        }
    }

    /// Default argument promotions: integers pass as `int` when they fit and
    /// as `long long` otherwise, floats as `double`.
    fn encode_vararg(&self, value: &HostValue) -> Result<NativeArg, RuntimeError> {
        let platform = self.platform();
        let endian = self.endian();
        let int = |n: i128| {
            let (lo, hi) = int_range(platform.int.size, true);
            let size = if (lo..=hi).contains(&n) {
                platform.int.size
            } else {
                platform.long_long.size
            };
            encode_int(n, size as usize, endian)
        };
        match value {
            HostValue::Null => Ok(self.encode_address(0)),
            HostValue::Bool(b) => Ok(int(i128::from(*b))),
            HostValue::Char(c) => Ok(int(i128::from(*c))),
            HostValue::Int(n) => Ok(int(*n)),
            HostValue::Float(f) => Ok(encode_float(*f, platform.double.size as usize, endian)),
            HostValue::Data(data) => match self.scalar(data.ty)? {
                Some(scalar) => self.bytes_of(data, scalar.size()),
                None => Ok(self.encode_address(self.place_of(data)?)),
            },
            other => Err(RuntimeError::Type(format!(
                "cannot pass '{}' as a variadic argument",
                other.kind()
            ))),
        }
    }

    fn decode_result(&self, ty: TypeIndex, bytes: &[u8]) -> Result<HostValue, RuntimeError> {
        if self.is_void(ty)? {
            return Ok(HostValue::Null);
        }
        if let Some(scalar) = self.scalar(ty)? {
            return Ok(self.decode_scalar(ty, scalar, bytes, None));
        }
        let data = self.alloc(ty, None)?;
        self.write_bytes(self.place_of(&data)?, bytes)?;
        Ok(HostValue::Data(data))
    }
}
