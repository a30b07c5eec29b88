use std::mem::size_of;

use crate::{
    aggfuncs::{check_args, project_value, value_mem_usage, AggFunc, AggFuncDesc, AggResult, AggregateImpl, MemDelta, PartialResult},
    types::{Datum, FieldType, JsonValue, TypeCode},
};

pub const DEF_PARTIAL_RESULT4_JSON_ARRAY_AGG: i64 = size_of::<PartialResult4JsonArrayAgg>() as i64;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialResult4JsonArrayAgg {
    pub entries: Vec<JsonValue>,
}

fn element_mem_usage(v: &JsonValue) -> i64 {
    size_of::<JsonValue>() as i64 + value_mem_usage(v)
}

pub struct JsonArrayAggImpl;

impl AggregateImpl for JsonArrayAggImpl {
    fn name(&self) -> &'static str { "json_arrayagg" }

    fn arity(&self) -> (usize, usize) { (1, 1) }

    fn return_type(&self, _arg_types: &[FieldType]) -> FieldType {
        FieldType::new(TypeCode::Json)
    }

    fn build(&self, desc: &AggFuncDesc) -> AggResult<Box<dyn AggFunc>> {
        self.check_arity(desc)?;
        Ok(Box::new(JsonArrayAggFunc { arg_types: desc.arg_types.clone() }))
    }
}

#[derive(Debug)]
pub struct JsonArrayAggFunc {
    arg_types: Vec<FieldType>,
}

impl AggFunc for JsonArrayAggFunc {
    fn name(&self) -> &'static str { "json_arrayagg" }

    fn arg_types(&self) -> &[FieldType] { &self.arg_types }

    fn create_partial_result(&self) -> (PartialResult, MemDelta) {
        (PartialResult::JsonArrayAgg(PartialResult4JsonArrayAgg::default()), DEF_PARTIAL_RESULT4_JSON_ARRAY_AGG)
    }

    fn reset_partial_result(&self, pr: &mut PartialResult) {
        if let PartialResult::JsonArrayAgg(p) = pr {
            p.entries.clear();
        } else {
            *pr = PartialResult::JsonArrayAgg(PartialResult4JsonArrayAgg::default());
        }
    }

    fn update_partial_result(&self, pr: &mut PartialResult, args: &[Datum]) -> AggResult<MemDelta> {
        check_args("JSON_ARRAYAGG", 1, args)?;
        let v = project_value(&args[0], &self.arg_types[0])?;
        let delta = element_mem_usage(&v);
        pr.as_json_array_agg_mut(self.name())?.entries.push(v);
        Ok(delta)
    }

    fn merge_partial_result(&self, src: &PartialResult, dst: &mut PartialResult) -> AggResult<MemDelta> {
        let src = src.as_json_array_agg(self.name())?;
        let dst = dst.as_json_array_agg_mut(self.name())?;
        let mut delta = 0;
        for v in &src.entries {
            delta += element_mem_usage(v);
            dst.entries.push(v.clone());
        }
        Ok(delta)
    }

    fn append_final_result(&self, pr: &PartialResult) -> AggResult<Datum> {
        let p = pr.as_json_array_agg(self.name())?;
        if p.entries.is_empty() {
            return Ok(Datum::Null);
        }
        Ok(Datum::Json(JsonValue::Array(p.entries.clone())))
    }
}
