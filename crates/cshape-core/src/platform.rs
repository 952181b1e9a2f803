//! Target platform description.
//!
//! Every size, alignment and convention the layout engine needs is an explicit
//! field here; nothing is read from the host.

use serde::{Deserialize, Serialize};

use crate::PrimitiveKind;

/// Size and alignment in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizeAlign {
    pub size: u32,
    pub align: u32,
}

impl SizeAlign {
    pub const fn new(size: u32, align: u32) -> Self {
        Self { size, align }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endian {
    Little,
    Big,
}

/// Order in which bitfields are allocated inside their storage unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitOrder {
    /// First declared bitfield occupies the least significant bits.
    LsbFirst,
    /// First declared bitfield occupies the most significant bits.
    MsbFirst,
}

/// Platform configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("invalid platform '{name}': {reason}")]
    Invalid { name: String, reason: String },
    #[error("malformed platform description: {0}")]
    Json(#[from] serde_json::Error),
}

/// Primitive sizes, alignments and conventions of one target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub name: String,
    pub endian: Endian,
    pub bit_order: BitOrder,
    pub char_signed: bool,
    pub wchar_signed: bool,
    pub pointer: SizeAlign,
    pub short: SizeAlign,
    pub int: SizeAlign,
    pub long: SizeAlign,
    pub long_long: SizeAlign,
    pub float: SizeAlign,
    pub double: SizeAlign,
    pub long_double: SizeAlign,
    pub wchar: SizeAlign,
}

impl Platform {
    /// x86-64 System V.
    pub fn lp64() -> Self {
        Self {
            name: "lp64".to_owned(),
            endian: Endian::Little,
            bit_order: BitOrder::LsbFirst,
            char_signed: true,
            wchar_signed: true,
            pointer: SizeAlign::new(8, 8),
            short: SizeAlign::new(2, 2),
            int: SizeAlign::new(4, 4),
            long: SizeAlign::new(8, 8),
            long_long: SizeAlign::new(8, 8),
            float: SizeAlign::new(4, 4),
            double: SizeAlign::new(8, 8),
            long_double: SizeAlign::new(16, 16),
            wchar: SizeAlign::new(4, 4),
        }
    }

    /// i386 System V: 64-bit scalars are only 4-byte aligned.
    pub fn ilp32() -> Self {
        Self {
            name: "ilp32".to_owned(),
            endian: Endian::Little,
            bit_order: BitOrder::LsbFirst,
            char_signed: true,
            wchar_signed: true,
            pointer: SizeAlign::new(4, 4),
            short: SizeAlign::new(2, 2),
            int: SizeAlign::new(4, 4),
            long: SizeAlign::new(4, 4),
            long_long: SizeAlign::new(8, 4),
            float: SizeAlign::new(4, 4),
            double: SizeAlign::new(8, 4),
            long_double: SizeAlign::new(12, 4),
            wchar: SizeAlign::new(4, 4),
        }
    }

    /// 64-bit Windows.
    pub fn llp64() -> Self {
        Self {
            name: "llp64".to_owned(),
            endian: Endian::Little,
            bit_order: BitOrder::LsbFirst,
            char_signed: true,
            wchar_signed: false,
            pointer: SizeAlign::new(8, 8),
            short: SizeAlign::new(2, 2),
            int: SizeAlign::new(4, 4),
            long: SizeAlign::new(4, 4),
            long_long: SizeAlign::new(8, 8),
            float: SizeAlign::new(4, 4),
            double: SizeAlign::new(8, 8),
            long_double: SizeAlign::new(8, 8),
            wchar: SizeAlign::new(2, 2),
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "lp64" => Some(Self::lp64()),
            "ilp32" => Some(Self::ilp32()),
            "llp64" => Some(Self::llp64()),
            _ => None,
        }
    }

    /// Parse and validate a JSON platform description.
    pub fn from_json(json: &str) -> Result<Self, PlatformError> {
        let platform: Self = serde_json::from_str(json)?;
        platform.validate()?;
        Ok(platform)
    }

    /// Check that every size is positive, every alignment is a power of two
    /// no larger than its size, and the pointer fits in 64 bits.
    pub fn validate(&self) -> Result<(), PlatformError> {
        let entries = [
            ("pointer", self.pointer),
            ("short", self.short),
            ("int", self.int),
            ("long", self.long),
            ("long_long", self.long_long),
            ("float", self.float),
            ("double", self.double),
            ("long_double", self.long_double),
            ("wchar", self.wchar),
        ];
        for (field, sa) in entries {
            if sa.size == 0 || !sa.align.is_power_of_two() || sa.align > sa.size {
                return Err(self.invalid(format!(
                    "{field}: size {} / align {} is not a valid layout",
                    sa.size, sa.align
                )));
            }
        }
        if !matches!(self.pointer.size, 2 | 4 | 8) {
            return Err(self.invalid(format!(
                "pointer size {} is not 2, 4 or 8",
                self.pointer.size
            )));
        }
        for (field, sa) in [("short", self.short), ("int", self.int)] {
            if sa.size > 8 {
                return Err(self.invalid(format!("{field} wider than 64 bits")));
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> PlatformError {
        PlatformError::Invalid {
            name: self.name.clone(),
            reason,
        }
    }

    /// Size and alignment of a primitive; `None` for `void`.
    pub fn primitive(&self, kind: PrimitiveKind) -> Option<SizeAlign> {
        use PrimitiveKind as P;

        let one = SizeAlign::new(1, 1);
        let sa = match kind {
            P::Void => return None,
            P::Bool | P::Char | P::SChar | P::UChar | P::Int8 | P::UInt8 => one,
            P::Short | P::UShort => self.short,
            P::Int | P::UInt => self.int,
            P::Long | P::ULong => self.long,
            P::LongLong | P::ULongLong => self.long_long,
            P::Float => self.float,
            P::Double => self.double,
            P::LongDouble => self.long_double,
            P::WChar => self.wchar,
            P::Int16 | P::UInt16 => SizeAlign::new(2, 2.min(self.short.align)),
            P::Int32 | P::UInt32 => SizeAlign::new(4, 4.min(self.int.align)),
            P::Int64 | P::UInt64 => SizeAlign::new(8, self.long_long.align),
            P::IntPtr | P::UIntPtr | P::PtrDiff | P::Size | P::SSize => self.pointer,
        };
        Some(sa)
    }

    /// Signedness of an integral kind under this platform's conventions.
    pub fn is_signed(&self, kind: PrimitiveKind) -> bool {
        kind.is_signed(self.char_signed, self.wchar_signed)
    }

    pub fn pointer_bits(&self) -> u32 {
        self.pointer.size * 8
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::lp64()
    }
}
