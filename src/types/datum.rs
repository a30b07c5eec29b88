use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use ordered_float::OrderedFloat;
use rust_decimal::Decimal;

use crate::types::JsonValue;

/// A typed SQL scalar, as evaluated from one row of the input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Datum {
    #[default]
    Null,
    Int64(i64),
    Uint64(u64),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    /// Datetime with its fractional seconds precision (0..=6).
    Datetime(NaiveDateTime, u8),
    /// Signed time-of-day duration with its fractional seconds precision (0..=6).
    Duration(TimeDelta, u8),
    Json(JsonValue),
}

impl Datum {
    pub fn float64(f: f64) -> Self { Datum::Float64(OrderedFloat(f)) }
    pub fn float32(f: f32) -> Self { Datum::Float32(OrderedFloat(f)) }
    pub fn string(s: impl Into<String>) -> Self { Datum::String(s.into()) }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Short name of the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Int64(_) => "int64",
            Datum::Uint64(_) => "uint64",
            Datum::Float32(_) => "float32",
            Datum::Float64(_) => "float64",
            Datum::Decimal(_) => "decimal",
            Datum::String(_) => "string",
            Datum::Bytes(_) => "bytes",
            Datum::Date(_) => "date",
            Datum::Datetime(..) => "datetime",
            Datum::Duration(..) => "duration",
            Datum::Json(_) => "json",
        }
    }

    /// Canonical text form, the same text `CAST(x AS CHAR)` produces. `None` for SQL NULL.
    pub fn to_sql_string(&self) -> Option<String> {
        let s = match self {
            Datum::Null => return None,
            Datum::Int64(i) => i.to_string(),
            Datum::Uint64(u) => u.to_string(),
            Datum::Float32(f) => f.0.to_string(),
            Datum::Float64(f) => f.0.to_string(),
            Datum::Decimal(d) => d.to_string(),
            Datum::String(s) => s.clone(),
            Datum::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Datum::Date(d) => d.format("%Y-%m-%d").to_string(),
            Datum::Datetime(dt, fsp) => {
                let mut out = dt.format("%Y-%m-%d %H:%M:%S").to_string();
                push_fraction(&mut out, dt.nanosecond(), *fsp);
                out
            }
            Datum::Duration(d, fsp) => format_duration(*d, *fsp),
            Datum::Json(j) => j.to_string(),
        };
        Some(s)
    }
}

fn push_fraction(out: &mut String, nanos: u32, fsp: u8) {
    let fsp = fsp.min(6);
    if fsp == 0 {
        return;
    }
    // leap-second nanos go past 1e9
    let nanos = nanos % 1_000_000_000;
    let scaled = nanos / 10u32.pow(9 - u32::from(fsp));
    out.push_str(&format!(".{:0width$}", scaled, width = usize::from(fsp)));
}

fn format_duration(d: TimeDelta, fsp: u8) -> String {
    let sign = if d < TimeDelta::zero() { "-" } else { "" };
    let abs = d.abs();
    let secs = abs.num_seconds();
    let mut out = format!("{sign}{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60);
    push_fraction(&mut out, abs.subsec_nanos().unsigned_abs(), fsp);
    out
}
