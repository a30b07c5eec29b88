use serde::{Deserialize, Serialize};

/// MySQL column type codes, as carried in the wire protocol and in opaque JSON values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeCode {
    Tiny = 0x01,
    Short = 0x02,
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    LongLong = 0x08,
    Int24 = 0x09,
    Date = 0x0a,
    Duration = 0x0b,
    Datetime = 0x0c,
    Year = 0x0d,
    VarChar = 0x0f,
    Json = 0xf5,
    NewDecimal = 0xf6,
    Blob = 0xfc,
    VarString = 0xfd,
    String = 0xfe,
}

impl TypeCode {
    /// Raw byte value of the type code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Reverse lookup of [`TypeCode::code`].
    pub fn from_code(code: u8) -> Option<TypeCode> {
        use TypeCode::*;
        let tc = match code {
            0x01 => Tiny,
            0x02 => Short,
            0x03 => Long,
            0x04 => Float,
            0x05 => Double,
            0x06 => Null,
            0x07 => Timestamp,
            0x08 => LongLong,
            0x09 => Int24,
            0x0a => Date,
            0x0b => Duration,
            0x0c => Datetime,
            0x0d => Year,
            0x0f => VarChar,
            0xf5 => Json,
            0xf6 => NewDecimal,
            0xfc => Blob,
            0xfd => VarString,
            0xfe => String,
            _ => return None,
        };
        Some(tc)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, TypeCode::Tiny | TypeCode::Short | TypeCode::Long | TypeCode::LongLong | TypeCode::Int24 | TypeCode::Year)
    }

    pub fn is_float(self) -> bool {
        matches!(self, TypeCode::Float | TypeCode::Double)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, TypeCode::Date | TypeCode::Datetime | TypeCode::Timestamp | TypeCode::Duration)
    }

    pub fn is_string_kind(self) -> bool {
        matches!(self, TypeCode::VarChar | TypeCode::VarString | TypeCode::String | TypeCode::Blob)
    }
}
