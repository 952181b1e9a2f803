//! The closed set of C primitive kinds.
//!
//! Discriminants are persisted in type tables, so they never change.

use serde::{Deserialize, Serialize};

/// A C primitive type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum PrimitiveKind {
    #[serde(rename = "void")]
    Void = 0,
    #[serde(rename = "_Bool")]
    Bool = 1,
    #[serde(rename = "char")]
    Char = 2,
    #[serde(rename = "signed char")]
    SChar = 3,
    #[serde(rename = "unsigned char")]
    UChar = 4,
    #[serde(rename = "short")]
    Short = 5,
    #[serde(rename = "unsigned short")]
    UShort = 6,
    #[serde(rename = "int")]
    Int = 7,
    #[serde(rename = "unsigned int")]
    UInt = 8,
    #[serde(rename = "long")]
    Long = 9,
    #[serde(rename = "unsigned long")]
    ULong = 10,
    #[serde(rename = "long long")]
    LongLong = 11,
    #[serde(rename = "unsigned long long")]
    ULongLong = 12,
    #[serde(rename = "float")]
    Float = 13,
    #[serde(rename = "double")]
    Double = 14,
    #[serde(rename = "long double")]
    LongDouble = 15,
    #[serde(rename = "wchar_t")]
    WChar = 16,
    #[serde(rename = "int8_t")]
    Int8 = 17,
    #[serde(rename = "uint8_t")]
    UInt8 = 18,
    #[serde(rename = "int16_t")]
    Int16 = 19,
    #[serde(rename = "uint16_t")]
    UInt16 = 20,
    #[serde(rename = "int32_t")]
    Int32 = 21,
    #[serde(rename = "uint32_t")]
    UInt32 = 22,
    #[serde(rename = "int64_t")]
    Int64 = 23,
    #[serde(rename = "uint64_t")]
    UInt64 = 24,
    #[serde(rename = "intptr_t")]
    IntPtr = 25,
    #[serde(rename = "uintptr_t")]
    UIntPtr = 26,
    #[serde(rename = "ptrdiff_t")]
    PtrDiff = 27,
    #[serde(rename = "size_t")]
    Size = 28,
    #[serde(rename = "ssize_t")]
    SSize = 29,
}

/// How values of a primitive kind are represented on the host side.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PrimitiveClass {
    Void,
    Bool,
    /// `char`: a single byte, not a number.
    Char,
    Integer,
    Float,
}

impl PrimitiveKind {
    /// Every kind, indexed by discriminant.
    pub const ALL: [Self; 30] = [
        Self::Void,
        Self::Bool,
        Self::Char,
        Self::SChar,
        Self::UChar,
        Self::Short,
        Self::UShort,
        Self::Int,
        Self::UInt,
        Self::Long,
        Self::ULong,
        Self::LongLong,
        Self::ULongLong,
        Self::Float,
        Self::Double,
        Self::LongDouble,
        Self::WChar,
        Self::Int8,
        Self::UInt8,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::IntPtr,
        Self::UIntPtr,
        Self::PtrDiff,
        Self::Size,
        Self::SSize,
    ];

    /// Convert from raw discriminant.
    pub fn from_u8(v: u8) -> Option<Self> {
        Self::ALL.get(v as usize).copied()
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Canonical C spelling.
    pub fn c_name(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "_Bool",
            Self::Char => "char",
            Self::SChar => "signed char",
            Self::UChar => "unsigned char",
            Self::Short => "short",
            Self::UShort => "unsigned short",
            Self::Int => "int",
            Self::UInt => "unsigned int",
            Self::Long => "long",
            Self::ULong => "unsigned long",
            Self::LongLong => "long long",
            Self::ULongLong => "unsigned long long",
            Self::Float => "float",
            Self::Double => "double",
            Self::LongDouble => "long double",
            Self::WChar => "wchar_t",
            Self::Int8 => "int8_t",
            Self::UInt8 => "uint8_t",
            Self::Int16 => "int16_t",
            Self::UInt16 => "uint16_t",
            Self::Int32 => "int32_t",
            Self::UInt32 => "uint32_t",
            Self::Int64 => "int64_t",
            Self::UInt64 => "uint64_t",
            Self::IntPtr => "intptr_t",
            Self::UIntPtr => "uintptr_t",
            Self::PtrDiff => "ptrdiff_t",
            Self::Size => "size_t",
            Self::SSize => "ssize_t",
        }
    }

    /// Parse a C spelling, accepting the usual long-hand aliases
    /// (`unsigned`, `short int`, `long long int`, `bool`, ...).
    pub fn from_c_name(name: &str) -> Option<Self> {
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if let Some(kind) = Self::ALL.iter().find(|k| k.c_name() == normalized) {
            return Some(*kind);
        }
        let kind = match normalized.as_str() {
            "bool" => Self::Bool,
            "signed" | "signed int" => Self::Int,
            "unsigned" => Self::UInt,
            "short int" | "signed short" | "signed short int" => Self::Short,
            "unsigned short int" => Self::UShort,
            "long int" | "signed long" | "signed long int" => Self::Long,
            "unsigned long int" => Self::ULong,
            "long long int" | "signed long long" | "signed long long int" => Self::LongLong,
            "unsigned long long int" => Self::ULongLong,
            _ => return None,
        };
        Some(kind)
    }

    pub fn class(self) -> PrimitiveClass {
        match self {
            Self::Void => PrimitiveClass::Void,
            Self::Bool => PrimitiveClass::Bool,
            Self::Char => PrimitiveClass::Char,
            Self::Float | Self::Double | Self::LongDouble => PrimitiveClass::Float,
            _ => PrimitiveClass::Integer,
        }
    }

    pub fn is_void(self) -> bool {
        self == Self::Void
    }

    pub fn is_float(self) -> bool {
        self.class() == PrimitiveClass::Float
    }

    /// Integer-like kinds usable as bitfields and enum storage.
    pub fn is_integral(self) -> bool {
        matches!(
            self.class(),
            PrimitiveClass::Integer | PrimitiveClass::Bool | PrimitiveClass::Char
        )
    }

    /// Signedness of an integer kind.
    ///
    /// `char` and `wchar_t` depend on the platform, so the caller supplies
    /// their signedness.
    pub fn is_signed(self, char_signed: bool, wchar_signed: bool) -> bool {
        match self {
            Self::Char => char_signed,
            Self::WChar => wchar_signed,
            Self::SChar
            | Self::Short
            | Self::Int
            | Self::Long
            | Self::LongLong
            | Self::Int8
            | Self::Int16
            | Self::Int32
            | Self::Int64
            | Self::IntPtr
            | Self::PtrDiff
            | Self::SSize => true,
            Self::Float | Self::Double | Self::LongDouble => true,
            Self::Void
            | Self::Bool
            | Self::UChar
            | Self::UShort
            | Self::UInt
            | Self::ULong
            | Self::ULongLong
            | Self::UInt8
            | Self::UInt16
            | Self::UInt32
            | Self::UInt64
            | Self::UIntPtr
            | Self::Size => false,
        }
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.c_name())
    }
}
