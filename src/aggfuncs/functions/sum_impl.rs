use std::mem::size_of;

use rust_decimal::Decimal;

use crate::{
    aggfuncs::{check_args, AggError, AggFunc, AggFuncDesc, AggResult, AggregateImpl, MemDelta, PartialResult},
    types::{Datum, FieldType, TypeCode},
};

pub const DEF_PARTIAL_RESULT4_SUM: i64 = size_of::<PartialResult4Sum>() as i64;

/// Running sum. Exact inputs sum as decimals, approximate ones as doubles.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PartialResult4Sum {
    #[default]
    Empty,
    Decimal(Decimal),
    Float(f64),
}

/// Which arithmetic a SUM/AVG instance runs, fixed by its declared argument type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SumKind {
    Decimal,
    Float,
}

impl SumKind {
    pub fn of(ft: &FieldType) -> SumKind {
        if ft.tp.is_float() || ft.tp.is_string_kind() || ft.tp == TypeCode::Json {
            SumKind::Float
        } else {
            SumKind::Decimal
        }
    }
}

impl PartialResult4Sum {
    /// Add one non-NULL input.
    pub fn add_datum(&mut self, kind: SumKind, name: &str, v: &Datum) -> AggResult<()> {
        match kind {
            SumKind::Decimal => {
                let d = match v {
                    Datum::Int64(i) => Decimal::from(*i),
                    Datum::Uint64(u) => Decimal::from(*u),
                    Datum::Decimal(d) => *d,
                    other => return Err(AggError::Other(format!("{name} got non numeric arg: {}", other.kind_name()))),
                };
                self.add_decimal(name, d)
            }
            SumKind::Float => {
                let f = match v {
                    Datum::Int64(i) => *i as f64,
                    Datum::Uint64(u) => *u as f64,
                    Datum::Float32(f) => f64::from(f.0),
                    Datum::Float64(f) => f.0,
                    Datum::Decimal(d) => d.to_string().parse::<f64>().unwrap_or(f64::NAN),
                    // strings are summed as doubles; non numeric text counts as 0
                    Datum::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
                    other => return Err(AggError::Other(format!("{name} got non numeric arg: {}", other.kind_name()))),
                };
                self.add_float(name, f)
            }
        }
    }

    fn add_decimal(&mut self, name: &str, d: Decimal) -> AggResult<()> {
        match self {
            PartialResult4Sum::Empty => *self = PartialResult4Sum::Decimal(d),
            PartialResult4Sum::Decimal(acc) => {
                *acc = acc.checked_add(d).ok_or_else(|| AggError::Other(format!("{name} decimal overflow")))?;
            }
            PartialResult4Sum::Float(_) => return Err(AggError::Other(format!("{name} received decimal for float aggregation"))),
        }
        Ok(())
    }

    fn add_float(&mut self, name: &str, f: f64) -> AggResult<()> {
        match self {
            PartialResult4Sum::Empty => *self = PartialResult4Sum::Float(f),
            PartialResult4Sum::Float(acc) => *acc += f,
            PartialResult4Sum::Decimal(_) => return Err(AggError::Other(format!("{name} received float for decimal aggregation"))),
        }
        Ok(())
    }

    /// Fold another running sum into this one.
    pub fn merge_from(&mut self, name: &str, src: &PartialResult4Sum) -> AggResult<()> {
        match src {
            PartialResult4Sum::Empty => Ok(()),
            PartialResult4Sum::Decimal(d) => self.add_decimal(name, *d),
            PartialResult4Sum::Float(f) => self.add_float(name, *f),
        }
    }

    pub fn to_datum(&self) -> Datum {
        match self {
            PartialResult4Sum::Empty => Datum::Null,
            PartialResult4Sum::Decimal(d) => Datum::Decimal(*d),
            PartialResult4Sum::Float(f) => Datum::float64(*f),
        }
    }
}

pub struct SumImpl;

impl AggregateImpl for SumImpl {
    fn name(&self) -> &'static str { "sum" }

    fn arity(&self) -> (usize, usize) { (1, 1) }

    fn return_type(&self, arg_types: &[FieldType]) -> FieldType {
        match arg_types.first().map(SumKind::of) {
            Some(SumKind::Float) => FieldType::new(TypeCode::Double),
            _ => FieldType::new(TypeCode::NewDecimal),
        }
    }

    fn build(&self, desc: &AggFuncDesc) -> AggResult<Box<dyn AggFunc>> {
        self.check_arity(desc)?;
        let kind = SumKind::of(&desc.arg_types[0]);
        Ok(Box::new(SumFunc { arg_types: desc.arg_types.clone(), kind }))
    }
}

#[derive(Debug)]
pub struct SumFunc {
    arg_types: Vec<FieldType>,
    kind: SumKind,
}

impl AggFunc for SumFunc {
    fn name(&self) -> &'static str { "sum" }

    fn arg_types(&self) -> &[FieldType] { &self.arg_types }

    fn create_partial_result(&self) -> (PartialResult, MemDelta) {
        (PartialResult::Sum(PartialResult4Sum::Empty), DEF_PARTIAL_RESULT4_SUM)
    }

    fn reset_partial_result(&self, pr: &mut PartialResult) {
        *pr = PartialResult::Sum(PartialResult4Sum::Empty);
    }

    fn update_partial_result(&self, pr: &mut PartialResult, args: &[Datum]) -> AggResult<MemDelta> {
        check_args("SUM", 1, args)?;
        if args[0].is_null() {
            return Ok(0);
        }
        pr.as_sum_mut(self.name())?.add_datum(self.kind, "SUM", &args[0])?;
        Ok(0)
    }

    fn merge_partial_result(&self, src: &PartialResult, dst: &mut PartialResult) -> AggResult<MemDelta> {
        let src = src.as_sum(self.name())?;
        dst.as_sum_mut(self.name())?.merge_from("SUM", src)?;
        Ok(0)
    }

    fn append_final_result(&self, pr: &PartialResult) -> AggResult<Datum> {
        // SQL SUM over no non-NULL input -> NULL
        Ok(pr.as_sum(self.name())?.to_datum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sum_of(tp: TypeCode) -> Box<dyn AggFunc> {
        SumImpl.build(&AggFuncDesc::new("sum", vec![FieldType::new(tp)])).unwrap()
    }

    #[test]
    fn sum_int_is_exact_decimal_and_nulls_ignored() {
        let f = sum_of(TypeCode::LongLong);
        let (mut pr, _) = f.create_partial_result();
        assert_eq!(f.append_final_result(&pr).unwrap(), Datum::Null);
        f.update_partial_result(&mut pr, &[Datum::Null]).unwrap();
        f.update_partial_result(&mut pr, &[Datum::Int64(2)]).unwrap();
        f.update_partial_result(&mut pr, &[Datum::Int64(3)]).unwrap();
        assert_eq!(f.append_final_result(&pr).unwrap(), Datum::Decimal(Decimal::from(5)));
    }

    #[test]
    fn sum_float_and_merge() {
        let f = sum_of(TypeCode::Double);
        let (mut a, _) = f.create_partial_result();
        let (mut b, _) = f.create_partial_result();
        let (empty, _) = f.create_partial_result();
        f.update_partial_result(&mut a, &[Datum::float64(1.5)]).unwrap();
        f.update_partial_result(&mut b, &[Datum::float64(2.25)]).unwrap();
        f.merge_partial_result(&b, &mut a).unwrap();
        f.merge_partial_result(&empty, &mut a).unwrap();
        assert_eq!(f.append_final_result(&a).unwrap(), Datum::float64(3.75));
    }

    #[test]
    fn sum_decimal_keeps_scale() {
        let f = sum_of(TypeCode::NewDecimal);
        let (mut pr, _) = f.create_partial_result();
        f.update_partial_result(&mut pr, &[Datum::Decimal(Decimal::from_str("1.10").unwrap())]).unwrap();
        f.update_partial_result(&mut pr, &[Datum::Decimal(Decimal::from_str("2.205").unwrap())]).unwrap();
        assert_eq!(f.append_final_result(&pr).unwrap().to_sql_string().unwrap(), "3.305");
    }

    #[test]
    fn sum_rejects_non_numeric_for_exact_kind() {
        let f = sum_of(TypeCode::LongLong);
        let (mut pr, _) = f.create_partial_result();
        let err = f.update_partial_result(&mut pr, &[Datum::string("x")]).unwrap_err();
        assert!(err.to_string().contains("non numeric"));
    }
}
