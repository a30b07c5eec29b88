use std::mem::size_of;

use crate::{
    aggfuncs::{check_args, AggFunc, AggFuncDesc, AggResult, AggregateImpl, MemDelta, PartialResult},
    types::{Datum, FieldType, TypeCode},
};

pub const DEF_PARTIAL_RESULT4_COUNT: i64 = size_of::<PartialResult4Count>() as i64;

pub struct CountImpl;

impl AggregateImpl for CountImpl {
    fn name(&self) -> &'static str { "count" }

    // COUNT(expr) | COUNT(DISTINCT a, b, ...); COUNT(*) is planned as COUNT(1)
    fn arity(&self) -> (usize, usize) { (1, usize::MAX) }

    fn return_type(&self, _arg_types: &[FieldType]) -> FieldType {
        FieldType::new(TypeCode::LongLong)
    }

    fn build(&self, desc: &AggFuncDesc) -> AggResult<Box<dyn AggFunc>> {
        self.check_arity(desc)?;
        Ok(Box::new(CountFunc { arg_types: desc.arg_types.clone() }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialResult4Count {
    pub count: i64,
}

#[derive(Debug)]
pub struct CountFunc {
    arg_types: Vec<FieldType>,
}

impl AggFunc for CountFunc {
    fn name(&self) -> &'static str { "count" }

    fn arg_types(&self) -> &[FieldType] { &self.arg_types }

    fn create_partial_result(&self) -> (PartialResult, MemDelta) {
        (PartialResult::Count(PartialResult4Count::default()), DEF_PARTIAL_RESULT4_COUNT)
    }

    fn reset_partial_result(&self, pr: &mut PartialResult) {
        *pr = PartialResult::Count(PartialResult4Count::default());
    }

    fn update_partial_result(&self, pr: &mut PartialResult, args: &[Datum]) -> AggResult<MemDelta> {
        check_args("COUNT", self.arg_types.len(), args)?;
        let p = pr.as_count_mut(self.name())?;
        // a row counts only when none of its arguments is NULL
        if args.iter().all(|d| !d.is_null()) {
            p.count += 1;
        }
        Ok(0)
    }

    fn merge_partial_result(&self, src: &PartialResult, dst: &mut PartialResult) -> AggResult<MemDelta> {
        let src = src.as_count(self.name())?;
        dst.as_count_mut(self.name())?.count += src.count;
        Ok(0)
    }

    fn append_final_result(&self, pr: &PartialResult) -> AggResult<Datum> {
        Ok(Datum::Int64(pr.as_count(self.name())?.count))
    }
}
