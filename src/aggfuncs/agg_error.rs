use thiserror::Error;

use crate::types::TypeCode;

pub type AggResult<T> = Result<T, AggError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggError {
    /// The key argument of JSON_OBJECTAGG evaluated to SQL NULL.
    #[error("JSON documents may not contain NULL member names")]
    InvalidKey,

    /// Declared argument type and evaluated datum do not line up; a planner bug.
    #[error("cannot project {datum} value declared as {declared:?} into JSON")]
    UnsupportedProjection { declared: TypeCode, datum: &'static str },

    #[error("out of memory quota: consumed {consumed} bytes, quota {quota} bytes")]
    ResourceExhausted { consumed: i64, quota: i64 },

    #[error("aggregate function {0} not found")]
    FunctionNotFound(String),

    #[error("incorrect arguments to {name}: expected {expected}, got {got}")]
    ArgumentCount { name: String, expected: usize, got: usize },

    /// A partial result built by another kind of aggregate was handed in.
    #[error("partial result mismatch: {name} expects a {expected} state")]
    PartialResultMismatch { name: &'static str, expected: &'static str },

    #[error("{0}")]
    Other(String),
}
