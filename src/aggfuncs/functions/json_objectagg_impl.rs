use std::mem::size_of;

use indexmap::IndexMap;

use crate::{
    aggfuncs::{
        check_args, entry_mem_usage, format_key, project_value, value_mem_usage, AggFunc, AggFuncDesc, AggResult,
        AggregateImpl, BucketGrowth, MemDelta, PartialResult, DEF_BUCKET_MEMORY_USAGE_FOR_MAP_STRING_TO_ANY,
    },
    types::{Datum, FieldType, JsonValue, TypeCode},
};

pub const DEF_PARTIAL_RESULT4_JSON_OBJECT_AGG: i64 = size_of::<PartialResult4JsonObjectAgg>() as i64;

/// Memory usage of a fresh JSON_OBJECTAGG state: the struct plus the map's first bucket.
pub const JSON_OBJECT_AGG_BASE_MEM: i64 = DEF_PARTIAL_RESULT4_JSON_OBJECT_AGG + DEF_BUCKET_MEMORY_USAGE_FOR_MAP_STRING_TO_ANY;

/// Per-group state of JSON_OBJECTAGG(key, value).
///
/// `entries` keeps first-insertion order so results are repeatable; overwriting a key keeps
/// its position. `mem_usage` only ever moves by the deltas returned from [`put`](Self::put),
/// [`merge_from`](Self::merge_from) and [`reset`](Self::reset), and always equals
/// [`recompute_mem_usage`](Self::recompute_mem_usage).
#[derive(Debug, Clone, PartialEq)]
pub struct PartialResult4JsonObjectAgg {
    pub entries: IndexMap<String, JsonValue>,
    buckets: BucketGrowth,
    mem_usage: i64,
}

impl Default for PartialResult4JsonObjectAgg {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialResult4JsonObjectAgg {
    pub fn new() -> Self {
        Self { entries: IndexMap::new(), buckets: BucketGrowth::default(), mem_usage: JSON_OBJECT_AGG_BASE_MEM }
    }

    pub fn mem_usage(&self) -> i64 {
        self.mem_usage
    }

    /// Insert or overwrite one entry; the last value written for a key wins.
    ///
    /// A new key costs its full entry cost plus any bucket doubling it triggers. An
    /// overwrite costs the difference between the new and old value, which may be negative.
    pub fn put(&mut self, key: &str, value: JsonValue) -> MemDelta {
        let delta = match self.entries.get_mut(key) {
            Some(old) => {
                let delta = value_mem_usage(&value) - value_mem_usage(old);
                *old = value;
                delta
            }
            None => {
                let mut delta = entry_mem_usage(key, &value);
                self.entries.insert(key.to_string(), value);
                delta += self.buckets.on_insert(self.entries.len(), DEF_BUCKET_MEMORY_USAGE_FOR_MAP_STRING_TO_ANY);
                delta
            }
        };
        self.mem_usage += delta;
        delta
    }

    /// Copy every entry of `src` into `self` with the same overwrite rule as [`put`](Self::put),
    /// in `src`'s order. On key conflict the value from `src` wins.
    pub fn merge_from(&mut self, src: &PartialResult4JsonObjectAgg) -> MemDelta {
        src.entries.iter().map(|(k, v)| self.put(k, v.clone())).sum()
    }

    /// Drop all entries and return to the fresh baseline. Returns the (non-positive) delta.
    pub fn reset(&mut self) -> MemDelta {
        self.entries.clear();
        self.buckets.reset();
        let delta = JSON_OBJECT_AGG_BASE_MEM - self.mem_usage;
        self.mem_usage = JSON_OBJECT_AGG_BASE_MEM;
        delta
    }

    /// Full recount of the estimated footprint. Not used on the update path.
    pub fn recompute_mem_usage(&self) -> i64 {
        JSON_OBJECT_AGG_BASE_MEM
            + BucketGrowth::cost_for_len(self.entries.len(), DEF_BUCKET_MEMORY_USAGE_FOR_MAP_STRING_TO_ANY)
            + self.entries.iter().map(|(k, v)| entry_mem_usage(k, v)).sum::<i64>()
    }

    /// The accumulated object, or `None` when nothing was aggregated.
    pub fn to_json(&self) -> Option<JsonValue> {
        if self.entries.is_empty() {
            return None;
        }
        Some(JsonValue::Object(self.entries.clone()))
    }
}

pub struct JsonObjectAggImpl;

impl AggregateImpl for JsonObjectAggImpl {
    fn name(&self) -> &'static str { "json_objectagg" }

    fn arity(&self) -> (usize, usize) { (2, 2) }

    fn return_type(&self, _arg_types: &[FieldType]) -> FieldType {
        FieldType::new(TypeCode::Json)
    }

    fn build(&self, desc: &AggFuncDesc) -> AggResult<Box<dyn AggFunc>> {
        self.check_arity(desc)?;
        tracing::debug!(key = ?desc.arg_types[0].tp, value = ?desc.arg_types[1].tp, "build json_objectagg");
        Ok(Box::new(JsonObjectAggFunc { arg_types: desc.arg_types.clone() }))
    }
}

/// JSON_OBJECTAGG(key, value): builds one JSON object per group.
///
/// Keys are rendered as text and may not be NULL. Values go through [`project_value`],
/// so NULL values are kept as JSON null. A group that saw no rows finalizes to SQL NULL.
#[derive(Debug)]
pub struct JsonObjectAggFunc {
    arg_types: Vec<FieldType>,
}

impl AggFunc for JsonObjectAggFunc {
    fn name(&self) -> &'static str { "json_objectagg" }

    fn arg_types(&self) -> &[FieldType] { &self.arg_types }

    fn create_partial_result(&self) -> (PartialResult, MemDelta) {
        let p = PartialResult4JsonObjectAgg::new();
        let mem = p.mem_usage();
        (PartialResult::JsonObjectAgg(p), mem)
    }

    fn reset_partial_result(&self, pr: &mut PartialResult) {
        match pr {
            PartialResult::JsonObjectAgg(p) => {
                p.reset();
            }
            _ => *pr = PartialResult::JsonObjectAgg(PartialResult4JsonObjectAgg::new()),
        }
    }

    fn update_partial_result(&self, pr: &mut PartialResult, args: &[Datum]) -> AggResult<MemDelta> {
        check_args("JSON_OBJECTAGG", 2, args)?;
        let key = format_key(&args[0])?;
        let value = project_value(&args[1], &self.arg_types[1])?;
        Ok(pr.as_json_object_agg_mut(self.name())?.put(&key, value))
    }

    fn merge_partial_result(&self, src: &PartialResult, dst: &mut PartialResult) -> AggResult<MemDelta> {
        let src = src.as_json_object_agg(self.name())?;
        let dst = dst.as_json_object_agg_mut(self.name())?;
        let delta = dst.merge_from(src);
        tracing::trace!(src_entries = src.entries.len(), dst_entries = dst.entries.len(), delta, "merge json_objectagg");
        Ok(delta)
    }

    fn append_final_result(&self, pr: &PartialResult) -> AggResult<Datum> {
        let p = pr.as_json_object_agg(self.name())?;
        Ok(p.to_json().map(Datum::Json).unwrap_or(Datum::Null))
    }
}
