use crate::{aggfuncs::{AggError, AggResult}, types::{Datum, FieldType, JsonValue, Opaque}};

/// Project an evaluated argument into the value space a JSON document can hold.
///
/// - fixed-length binary strings become opaque values padded to the declared length
/// - JSON passes through unchanged
/// - decimals become the nearest double (lossy)
/// - temporal values and raw bytes become their canonical text
/// - everything else keeps its natural value
pub fn project_value(datum: &Datum, ft: &FieldType) -> AggResult<JsonValue> {
    if ft.is_fixed_binary() {
        return project_fixed_binary(datum, ft);
    }
    let projected = match datum {
        Datum::Null => JsonValue::Null,
        Datum::Int64(i) => JsonValue::Int64(*i),
        Datum::Uint64(u) => JsonValue::Uint64(*u),
        Datum::Float32(f) => JsonValue::float(f64::from(f.0)),
        Datum::Float64(f) => JsonValue::Float64(*f),
        Datum::String(s) => JsonValue::String(s.clone()),
        Datum::Json(j) => j.clone(),
        Datum::Decimal(d) => {
            // shortest decimal text parses to the correctly rounded double
            let f = d.to_string().parse::<f64>().map_err(|_| unsupported(datum, ft))?;
            JsonValue::float(f)
        }
        Datum::Bytes(_) | Datum::Date(_) | Datum::Datetime(..) | Datum::Duration(..) => {
            JsonValue::String(datum.to_sql_string().unwrap_or_default())
        }
    };
    Ok(projected)
}

fn project_fixed_binary(datum: &Datum, ft: &FieldType) -> AggResult<JsonValue> {
    let src: &[u8] = match datum {
        Datum::Null => return Ok(JsonValue::Null),
        Datum::Bytes(b) => b,
        Datum::String(s) => s.as_bytes(),
        _ => return Err(unsupported(datum, ft)),
    };
    let flen = ft.flen.unwrap_or(src.len());
    let mut buf = vec![0u8; flen];
    let n = src.len().min(flen);
    buf[..n].copy_from_slice(&src[..n]);
    Ok(JsonValue::Opaque(Opaque::new(ft.tp, buf)))
}

fn unsupported(datum: &Datum, ft: &FieldType) -> AggError {
    tracing::error!(declared = ?ft.tp, datum = datum.kind_name(), "unsupported JSON projection");
    AggError::UnsupportedProjection { declared: ft.tp, datum: datum.kind_name() }
}

/// Render an object key. NULL keys are rejected.
pub fn format_key(datum: &Datum) -> AggResult<String> {
    datum.to_sql_string().ok_or(AggError::InvalidKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeCode;
    use chrono::{NaiveDate, TimeDelta};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn fixed_binary_is_zero_padded_and_tagged() {
        let ft = FieldType::binary(10);
        let v = project_value(&Datum::string("abc"), &ft).unwrap();
        let o = v.as_opaque().unwrap();
        assert_eq!(o.type_code, TypeCode::String);
        assert_eq!(o.buf, b"abc\0\0\0\0\0\0\0".to_vec());

        // longer input is cut at the declared length
        let v = project_value(&Datum::Bytes(b"0123456789AB".to_vec()), &ft).unwrap();
        assert_eq!(v.as_opaque().unwrap().buf, b"0123456789".to_vec());

        assert_eq!(project_value(&Datum::Null, &ft).unwrap(), JsonValue::Null);
    }

    #[test]
    fn fixed_binary_rejects_non_string_datums() {
        let err = project_value(&Datum::Int64(1), &FieldType::binary(4)).unwrap_err();
        assert_eq!(err, AggError::UnsupportedProjection { declared: TypeCode::String, datum: "int64" });
    }

    #[test]
    #[allow(clippy::excessive_precision)]
    fn decimal_projects_to_nearest_double() {
        let text = "0.1234567890123456789012";
        let d = Decimal::from_str(text).unwrap();
        let v = project_value(&Datum::Decimal(d), &FieldType::new(TypeCode::NewDecimal)).unwrap();
        assert_eq!(v, JsonValue::float(0.123_456_789_012_345_678_901_2));
        assert_eq!(v.to_string(), "0.12345678901234568");
        assert_ne!(v.to_string(), text);
    }

    #[test]
    fn temporal_and_bytes_project_to_text() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        assert_eq!(project_value(&Datum::Date(date), &FieldType::new(TypeCode::Date)).unwrap(), JsonValue::string("2020-01-02"));
        let dur = Datum::Duration(TimeDelta::seconds(3661), 0);
        assert_eq!(project_value(&dur, &FieldType::new(TypeCode::Duration)).unwrap(), JsonValue::string("01:01:01"));
        let bytes = Datum::Bytes(b"raw".to_vec());
        assert_eq!(project_value(&bytes, &FieldType::new(TypeCode::Blob)).unwrap(), JsonValue::string("raw"));
    }

    #[test]
    fn natural_values_pass_through() {
        let json = JsonValue::object([("a", JsonValue::Int64(1))]);
        assert_eq!(project_value(&Datum::Json(json.clone()), &FieldType::new(TypeCode::Json)).unwrap(), json);
        assert_eq!(project_value(&Datum::Int64(7), &FieldType::new(TypeCode::LongLong)).unwrap(), JsonValue::Int64(7));
        assert_eq!(project_value(&Datum::float32(0.5), &FieldType::new(TypeCode::Float)).unwrap(), JsonValue::float(0.5));
        assert_eq!(project_value(&Datum::string("x"), &FieldType::new(TypeCode::VarString)).unwrap(), JsonValue::string("x"));
    }

    #[test]
    fn key_format_is_deterministic_and_rejects_null() {
        for d in [Datum::float64(0.1), Datum::Int64(1), Datum::Date(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap())] {
            assert_eq!(format_key(&d).unwrap(), format_key(&d).unwrap());
        }
        assert_eq!(format_key(&Datum::float64(0.1)).unwrap(), "0.1");
        assert_eq!(format_key(&Datum::Null), Err(AggError::InvalidKey));
    }
}
