use serde::{Deserialize, Serialize};

use crate::types::TypeCode;

pub const CHARSET_BIN: &str = "binary";
pub const CHARSET_UTF8MB4: &str = "utf8mb4";

/// Declared type of one aggregate argument, fixed at plan-build time.
///
/// - `tp` is the MySQL type code.
/// - `flen` is the declared display/storage length (`CHAR(10)` -> 10), `None` when unspecified.
/// - `decimal` is the scale for decimals and the fractional seconds precision for temporals.
/// - `charset` distinguishes binary strings from textual ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldType {
    pub tp: TypeCode,
    pub flen: Option<usize>,
    pub decimal: u8,
    pub charset: String,
}

impl FieldType {
    /// Create a field type with default length and the textual charset.
    pub fn new(tp: TypeCode) -> Self {
        Self { tp, flen: None, decimal: 0, charset: CHARSET_UTF8MB4.to_string() }
    }

    /// Convenience: a fixed-length `BINARY(flen)` column.
    pub fn binary(flen: usize) -> Self {
        Self::new(TypeCode::String).with_flen(flen).with_charset(CHARSET_BIN)
    }

    pub fn with_flen(mut self, flen: usize) -> Self {
        self.flen = Some(flen);
        self
    }

    pub fn with_decimal(mut self, decimal: u8) -> Self {
        self.decimal = decimal;
        self
    }

    pub fn with_charset(mut self, charset: &str) -> Self {
        self.charset = charset.to_string();
        self
    }

    pub fn is_binary_charset(&self) -> bool {
        self.charset == CHARSET_BIN
    }

    /// `CHAR`/`BINARY` with the binary charset: the only type projected as an opaque JSON value.
    pub fn is_fixed_binary(&self) -> bool {
        self.tp == TypeCode::String && self.is_binary_charset()
    }
}
