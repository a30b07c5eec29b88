use std::mem::size_of;

use crate::types::JsonValue;

/// Signed change in the estimated byte footprint of a partial result.
pub type MemDelta = i64;

/// Slots per hash bucket.
pub const BUCKET_SLOTS: usize = 8;
/// A map doubles its bucket table once `len > buckets * 13 / 2`.
pub const LOAD_FACTOR_NUM: usize = 13;
pub const LOAD_FACTOR_DEN: usize = 2;

/// One bucket of a `String -> JsonValue` map: key and value slots, control bytes, overflow pointer.
pub const DEF_BUCKET_MEMORY_USAGE_FOR_MAP_STRING_TO_ANY: i64 =
    (BUCKET_SLOTS * (size_of::<String>() + size_of::<JsonValue>()) + BUCKET_SLOTS + size_of::<usize>()) as i64;

/// Heap bytes owned by a JSON value beyond its inline slot.
pub fn value_mem_usage(v: &JsonValue) -> i64 {
    match v {
        JsonValue::Null | JsonValue::Bool(_) | JsonValue::Int64(_) | JsonValue::Uint64(_) | JsonValue::Float64(_) => 0,
        JsonValue::String(s) => s.len() as i64,
        JsonValue::Opaque(o) => o.buf.len() as i64,
        JsonValue::Array(items) => items
            .iter()
            .map(|item| size_of::<JsonValue>() as i64 + value_mem_usage(item))
            .sum(),
        JsonValue::Object(m) => m
            .iter()
            .map(|(k, item)| (size_of::<String>() + size_of::<JsonValue>()) as i64 + entry_mem_usage(k, item))
            .sum(),
    }
}

/// Marginal cost of one map entry: key bytes plus value heap bytes.
pub fn entry_mem_usage(key: &str, v: &JsonValue) -> i64 {
    key.len() as i64 + value_mem_usage(v)
}

/// Tracks the bucket table size of a growing map so growth is charged once, on the
/// insert that crosses the load factor, instead of rescanning the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketGrowth {
    /// log2 of the bucket count.
    b: u8,
}

impl BucketGrowth {
    fn capacity(b: u8) -> usize {
        (1usize << b) * LOAD_FACTOR_NUM / LOAD_FACTOR_DEN
    }

    /// Charge for an insert that brought the map to `len` entries.
    pub fn on_insert(&mut self, len: usize, bucket_cost: i64) -> MemDelta {
        if len > Self::capacity(self.b) {
            let delta = (1i64 << self.b) * bucket_cost;
            self.b += 1;
            delta
        } else {
            0
        }
    }

    pub fn reset(&mut self) {
        self.b = 0;
    }

    /// Total growth cost of a map that reached `len` entries, computed from scratch.
    pub fn cost_for_len(len: usize, bucket_cost: i64) -> i64 {
        let mut b = 0u8;
        let mut total = 0;
        while len > Self::capacity(b) {
            total += (1i64 << b) * bucket_cost;
            b += 1;
        }
        total
    }
}
