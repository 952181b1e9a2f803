//! Typed values and the host values they convert to and from.

use std::rc::Rc;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use smallvec::SmallVec;

use cshape_table::TypeIndex;

use super::memory::{Address, Resource};

/// Raw bytes of a scalar, pointer or call argument.
pub type NativeArg = SmallVec<[u8; 16]>;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Repr {
    /// Bytes carried by the value: results of casts and pointer arithmetic.
    Inline(NativeArg),
    /// Bytes at an address in the runtime's memory.
    Place(Address),
}

/// A region of memory tagged with a type.
///
/// Owning values come from [`Runtime::alloc`](super::Runtime::alloc); their
/// allocation is released when the last clone drops. Views returned by
/// indexing, field access and casts hold a keep-alive reference to whatever
/// allocation they point into.
#[derive(Clone, Debug)]
pub struct CData {
    pub(crate) ty: TypeIndex,
    pub(crate) repr: Repr,
    /// Element count of an open array.
    pub(crate) length: Option<u64>,
    pub(crate) owner: Option<Rc<Resource>>,
    pub(crate) owning: bool,
}

impl CData {
    pub(crate) fn inline(ty: TypeIndex, bytes: NativeArg, owner: Option<Rc<Resource>>) -> Self {
        Self {
            ty,
            repr: Repr::Inline(bytes),
            length: None,
            owner,
            owning: false,
        }
    }

    pub(crate) fn place(ty: TypeIndex, address: Address, owner: Option<Rc<Resource>>) -> Self {
        Self {
            ty,
            repr: Repr::Place(address),
            length: None,
            owner,
            owning: false,
        }
    }

    /// Canonical type of the value.
    pub fn ty(&self) -> TypeIndex {
        self.ty
    }

    /// Whether this value owns its allocation.
    pub fn is_owner(&self) -> bool {
        self.owning
    }

    /// Address of the value's bytes, `None` for values carried inline.
    pub fn address(&self) -> Option<Address> {
        match self.repr {
            Repr::Place(address) => Some(address),
            Repr::Inline(_) => None,
        }
    }

    pub(crate) fn keep(&self) -> Option<Rc<Resource>> {
        self.owner.clone()
    }
}

/// Structural equality: same type and same bytes or address. Value
/// semantics (null pointers, enum identity) live in
/// [`Runtime::equals`](super::Runtime::equals).
impl PartialEq for CData {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.repr == other.repr && self.length == other.length
    }
}

/// A value on the host side of the runtime.
#[derive(Clone, Debug, PartialEq)]
pub enum HostValue {
    /// A null pointer.
    Null,
    Bool(bool),
    Int(i128),
    Float(f64),
    /// A single `char`.
    Char(u8),
    /// Initializer for `char` arrays.
    Bytes(Vec<u8>),
    /// Initializer for arrays and records.
    List(Vec<HostValue>),
    /// An enum member.
    Name(String),
    Data(CData),
}

impl HostValue {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&CData> {
        match self {
            Self::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<CData> {
        match self {
            Self::Data(d) => Some(d),
            _ => None,
        }
    }

    /// Kind name used in conversion errors for everything but typed values.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Char(_) => "char",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Name(_) => "str",
            Self::Data(_) => "cdata",
        }
    }
}

macro_rules! host_int {
    ($($t:ty),*) => {
        $(impl From<$t> for HostValue {
            fn from(n: $t) -> Self {
                Self::Int(i128::from(n))
            }
        })*
    };
}

host_int!(i8, i16, i32, i64, u8, u16, u32, u64, i128);

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for HostValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&[u8]> for HostValue {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<CData> for HostValue {
    fn from(data: CData) -> Self {
        Self::Data(data)
    }
}

impl From<Vec<HostValue>> for HostValue {
    fn from(items: Vec<HostValue>) -> Self {
        Self::List(items)
    }
}

impl Serialize for CData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("CData", 2)?;
        s.serialize_field("type", &self.ty.0)?;
        s.serialize_field("address", &self.address())?;
        s.end()
    }
}

impl Serialize for HostValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            HostValue::Null => serializer.serialize_none(),
            HostValue::Bool(b) => serializer.serialize_bool(*b),
            HostValue::Int(n) => serializer.serialize_i128(*n),
            HostValue::Float(f) => serializer.serialize_f64(*f),
            HostValue::Char(c) => serializer.serialize_str(&char::from(*c).to_string()),
            HostValue::Bytes(bytes) => serializer.serialize_str(&String::from_utf8_lossy(bytes)),
            HostValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            HostValue::Name(name) => serializer.serialize_str(name),
            HostValue::Data(data) => data.serialize(serializer),
        }
    }
}
