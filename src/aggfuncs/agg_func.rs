use std::fmt;

use crate::{aggfuncs::{AggError, AggResult, MemDelta, PartialResult}, types::{Datum, FieldType}};

/// Plan-time description of one aggregate call: function name plus declared argument types.
#[derive(Debug, Clone, PartialEq)]
pub struct AggFuncDesc {
    pub name: String,
    pub arg_types: Vec<FieldType>,
}

impl AggFuncDesc {
    pub fn new(name: &str, arg_types: Vec<FieldType>) -> Self {
        Self { name: name.to_string(), arg_types }
    }
}

/// An aggregate bound to its declared argument types.
///
/// The executor owns one [`PartialResult`] per group and drives it through
/// create -> update/merge -> finalize -> reset. Every mutating call returns the
/// memory delta it caused so the caller can keep a quota without rescanning state.
pub trait AggFunc: Send + Sync + fmt::Debug {
    /// Canonical lowercase name ("count", "json_objectagg", ...).
    fn name(&self) -> &'static str;

    fn arg_types(&self) -> &[FieldType];

    /// A fresh state and its initial memory usage.
    fn create_partial_result(&self) -> (PartialResult, MemDelta);

    /// Bring a state back to its freshly created shape and memory baseline.
    fn reset_partial_result(&self, pr: &mut PartialResult);

    /// Feed one row of evaluated arguments.
    fn update_partial_result(&self, pr: &mut PartialResult, args: &[Datum]) -> AggResult<MemDelta>;

    /// Feed a batch of rows, returning the summed delta.
    fn update_rows(&self, pr: &mut PartialResult, rows: &[Vec<Datum>]) -> AggResult<MemDelta> {
        let mut delta = 0;
        for row in rows {
            delta += self.update_partial_result(pr, row)?;
        }
        Ok(delta)
    }

    /// Fold `src` into `dst`. `src` is left untouched.
    fn merge_partial_result(&self, src: &PartialResult, dst: &mut PartialResult) -> AggResult<MemDelta>;

    /// Materialize the result of a state.
    fn append_final_result(&self, pr: &PartialResult) -> AggResult<Datum>;
}

/// Per-aggregate metadata + factory.
/// One instance is registered globally per function name.
/// It is stateless and thread-safe to share.
pub trait AggregateImpl: Send + Sync {
    /// Canonical lowercase function name.
    fn name(&self) -> &'static str;

    /// Accepted argument count range (inclusive).
    fn arity(&self) -> (usize, usize);

    /// Declared result type for the given argument types.
    fn return_type(&self, arg_types: &[FieldType]) -> FieldType;

    /// Bind the function to its declared argument types.
    fn build(&self, desc: &AggFuncDesc) -> AggResult<Box<dyn AggFunc>>;

    /// Arity check shared by all builders.
    fn check_arity(&self, desc: &AggFuncDesc) -> AggResult<()> {
        let (min, max) = self.arity();
        let got = desc.arg_types.len();
        if got < min || got > max {
            let expected = if got < min { min } else { max };
            return Err(AggError::ArgumentCount { name: self.name().to_string(), expected, got });
        }
        Ok(())
    }
}

/// Per-row arity check.
pub fn check_args(name: &str, expected: usize, args: &[Datum]) -> AggResult<()> {
    if args.len() != expected {
        return Err(AggError::ArgumentCount { name: name.to_string(), expected, got: args.len() });
    }
    Ok(())
}
