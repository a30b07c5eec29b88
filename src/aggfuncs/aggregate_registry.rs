use std::{collections::HashMap, sync::Arc};

use once_cell::sync::Lazy;

use crate::{aggfuncs::{AggError, AggFunc, AggFuncDesc, AggResult, AggregateImpl, AvgImpl, CountImpl, JsonArrayAggImpl, JsonObjectAggImpl, SumImpl}, types::FieldType};

static DEFAULT_REGISTRY: Lazy<AggregateRegistry> = Lazy::new(AggregateRegistry::default_aggregate_registry);

/// Case-insensitive registry of aggregates.
#[derive(Default)]
pub struct AggregateRegistry {
    by_name: HashMap<String, Arc<dyn AggregateImpl>>,
}

impl AggregateRegistry {
    pub fn new() -> Self { Self { by_name: HashMap::new() } }

    pub fn register<I: AggregateImpl + 'static>(&mut self, impl_: I) {
        self.by_name.insert(impl_.name().to_string(), Arc::new(impl_));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AggregateImpl>> {
        self.by_name.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn list(&self) -> Vec<String> {
        let mut v: Vec<_> = self.by_name.keys().cloned().collect();
        v.sort();
        v
    }

    /// Result type of an aggregate call, for the planner.
    pub fn return_type(&self, desc: &AggFuncDesc) -> AggResult<FieldType> {
        let imp = self.get(&desc.name).ok_or_else(|| AggError::FunctionNotFound(desc.name.clone()))?;
        imp.check_arity(desc)?;
        Ok(imp.return_type(&desc.arg_types))
    }

    /// Bind an aggregate call to its declared argument types.
    pub fn build(&self, desc: &AggFuncDesc) -> AggResult<Arc<dyn AggFunc>> {
        let imp = self.get(&desc.name).ok_or_else(|| AggError::FunctionNotFound(desc.name.clone()))?;
        Ok(Arc::from(imp.build(desc)?))
    }

    pub fn default_aggregate_registry() -> Self {
        let mut registry = Self::new();
        registry.register(CountImpl);
        registry.register(SumImpl);
        registry.register(AvgImpl);
        registry.register(JsonArrayAggImpl);
        registry.register(JsonObjectAggImpl);
        registry
    }

    /// Process-wide registry holding every built-in aggregate.
    pub fn global() -> &'static AggregateRegistry {
        &DEFAULT_REGISTRY
    }
}

/// Build an aggregate from the built-in registry.
pub fn build_agg_func(desc: &AggFuncDesc) -> AggResult<Arc<dyn AggFunc>> {
    AggregateRegistry::global().build(desc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Datum, JsonValue, TypeCode};

    fn desc(name: &str, tps: &[TypeCode]) -> AggFuncDesc {
        AggFuncDesc::new(name, tps.iter().map(|t| FieldType::new(*t)).collect())
    }

    #[test]
    fn registry_contains_all_and_lookup_is_case_insensitive() {
        let r = AggregateRegistry::default_aggregate_registry();
        assert_eq!(r.list(), vec!["avg", "count", "json_arrayagg", "json_objectagg", "sum"]);

        assert!(r.get("COUNT").is_some());
        assert!(r.get("Json_ObjectAgg").is_some());
        assert!(r.get("median").is_none());
    }

    #[test]
    fn registry_return_types() {
        let r = AggregateRegistry::global();
        assert_eq!(r.return_type(&desc("count", &[TypeCode::VarString])).unwrap().tp, TypeCode::LongLong);
        assert_eq!(r.return_type(&desc("sum", &[TypeCode::LongLong])).unwrap().tp, TypeCode::NewDecimal);
        assert_eq!(r.return_type(&desc("sum", &[TypeCode::Double])).unwrap().tp, TypeCode::Double);
        assert_eq!(r.return_type(&desc("json_objectagg", &[TypeCode::LongLong, TypeCode::Json])).unwrap().tp, TypeCode::Json);
    }

    #[test]
    fn build_checks_name_and_arity() {
        let err = build_agg_func(&desc("median", &[TypeCode::Double])).unwrap_err();
        assert_eq!(err, AggError::FunctionNotFound("median".into()));

        let err = build_agg_func(&desc("json_objectagg", &[TypeCode::LongLong])).unwrap_err();
        assert_eq!(err, AggError::ArgumentCount { name: "json_objectagg".into(), expected: 2, got: 1 });
    }

    #[test]
    fn built_functions_run_through_the_contract() {
        let f = build_agg_func(&desc("JSON_OBJECTAGG", &[TypeCode::VarString, TypeCode::LongLong])).unwrap();
        assert_eq!(f.name(), "json_objectagg");
        let (mut pr, _) = f.create_partial_result();
        f.update_partial_result(&mut pr, &[Datum::string("a"), Datum::Int64(1)]).unwrap();
        assert_eq!(f.append_final_result(&pr).unwrap(), Datum::Json(JsonValue::object([("a", JsonValue::Int64(1))])));
    }

    #[test]
    fn mismatched_partial_result_is_reported() {
        let count = build_agg_func(&desc("count", &[TypeCode::LongLong])).unwrap();
        let objectagg = build_agg_func(&desc("json_objectagg", &[TypeCode::LongLong, TypeCode::LongLong])).unwrap();
        let (mut pr, _) = count.create_partial_result();
        let err = objectagg.update_partial_result(&mut pr, &[Datum::Int64(1), Datum::Int64(1)]).unwrap_err();
        assert_eq!(err, AggError::PartialResultMismatch { name: "json_objectagg", expected: "json_objectagg" });
    }
}
