pub mod types;
pub use types::{Datum, FieldType, JsonValue, Opaque, TypeCode};

pub mod aggfuncs;
pub use aggfuncs::{build_agg_func, AggError, AggFunc, AggFuncDesc, AggResult, AggregateRegistry, MemDelta, PartialResult};

pub mod executor;
pub use executor::{ExecutorConfig, HashAggExecutor, MemQuota, OnExceed};
