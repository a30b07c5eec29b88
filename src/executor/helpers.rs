use serde_json::Value;

use crate::types::Datum;

pub struct Helpers;

impl Helpers {
    /// Stable string identity of a group key tuple. Values of different kinds never collide
    /// because each element carries its kind next to its text.
    pub fn canonical_tuple(vals: &[Datum]) -> String {
        let parts = vals
            .iter()
            .map(|d| {
                let text = d.to_sql_string().map(Value::String).unwrap_or(Value::Null);
                Value::Array(vec![Value::String(d.kind_name().to_string()), text])
            })
            .collect();
        Value::Array(parts).to_string()
    }
}
