use crate::aggfuncs::{
    AggError, AggResult, PartialResult4Avg, PartialResult4Count, PartialResult4JsonArrayAgg,
    PartialResult4JsonObjectAgg, PartialResult4Sum,
};

/// Per-group state of one aggregate call. The set of kinds is closed.
#[derive(Debug, Clone, PartialEq)]
pub enum PartialResult {
    Count(PartialResult4Count),
    Sum(PartialResult4Sum),
    Avg(PartialResult4Avg),
    JsonArrayAgg(PartialResult4JsonArrayAgg),
    JsonObjectAgg(PartialResult4JsonObjectAgg),
}

macro_rules! accessors {
    ($variant:ident, $ty:ty, $as_ref:ident, $as_mut:ident, $label:literal) => {
        pub fn $as_ref(&self, name: &'static str) -> AggResult<&$ty> {
            match self {
                PartialResult::$variant(p) => Ok(p),
                _ => Err(AggError::PartialResultMismatch { name, expected: $label }),
            }
        }

        pub fn $as_mut(&mut self, name: &'static str) -> AggResult<&mut $ty> {
            match self {
                PartialResult::$variant(p) => Ok(p),
                _ => Err(AggError::PartialResultMismatch { name, expected: $label }),
            }
        }
    };
}

impl PartialResult {
    accessors!(Count, PartialResult4Count, as_count, as_count_mut, "count");
    accessors!(Sum, PartialResult4Sum, as_sum, as_sum_mut, "sum");
    accessors!(Avg, PartialResult4Avg, as_avg, as_avg_mut, "avg");
    accessors!(JsonArrayAgg, PartialResult4JsonArrayAgg, as_json_array_agg, as_json_array_agg_mut, "json_arrayagg");
    accessors!(JsonObjectAgg, PartialResult4JsonObjectAgg, as_json_object_agg, as_json_object_agg_mut, "json_objectagg");
}
