use std::mem::size_of;

use rust_decimal::Decimal;

use crate::{
    aggfuncs::{check_args, AggError, AggFunc, AggFuncDesc, AggResult, AggregateImpl, MemDelta, PartialResult, PartialResult4Sum, SumKind},
    types::{Datum, FieldType, TypeCode},
};

pub const DEF_PARTIAL_RESULT4_AVG: i64 = size_of::<PartialResult4Avg>() as i64;

/// Extra fractional digits AVG adds to a decimal argument's scale.
const DIV_PRECISION_INCREMENT: u32 = 4;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialResult4Avg {
    pub sum: PartialResult4Sum,
    pub count: i64,
}

pub struct AvgImpl;

impl AggregateImpl for AvgImpl {
    fn name(&self) -> &'static str { "avg" }

    fn arity(&self) -> (usize, usize) { (1, 1) }

    fn return_type(&self, arg_types: &[FieldType]) -> FieldType {
        match arg_types.first() {
            Some(ft) if SumKind::of(ft) == SumKind::Decimal => {
                FieldType::new(TypeCode::NewDecimal).with_decimal(ft.decimal + DIV_PRECISION_INCREMENT as u8)
            }
            _ => FieldType::new(TypeCode::Double),
        }
    }

    fn build(&self, desc: &AggFuncDesc) -> AggResult<Box<dyn AggFunc>> {
        self.check_arity(desc)?;
        let ft = &desc.arg_types[0];
        Ok(Box::new(AvgFunc { arg_types: desc.arg_types.clone(), kind: SumKind::of(ft), scale: u32::from(ft.decimal) + DIV_PRECISION_INCREMENT }))
    }
}

#[derive(Debug)]
pub struct AvgFunc {
    arg_types: Vec<FieldType>,
    kind: SumKind,
    scale: u32,
}

impl AggFunc for AvgFunc {
    fn name(&self) -> &'static str { "avg" }

    fn arg_types(&self) -> &[FieldType] { &self.arg_types }

    fn create_partial_result(&self) -> (PartialResult, MemDelta) {
        (PartialResult::Avg(PartialResult4Avg::default()), DEF_PARTIAL_RESULT4_AVG)
    }

    fn reset_partial_result(&self, pr: &mut PartialResult) {
        *pr = PartialResult::Avg(PartialResult4Avg::default());
    }

    fn update_partial_result(&self, pr: &mut PartialResult, args: &[Datum]) -> AggResult<MemDelta> {
        check_args("AVG", 1, args)?;
        if args[0].is_null() {
            return Ok(0);
        }
        let p = pr.as_avg_mut(self.name())?;
        p.sum.add_datum(self.kind, "AVG", &args[0])?;
        p.count += 1;
        Ok(0)
    }

    fn merge_partial_result(&self, src: &PartialResult, dst: &mut PartialResult) -> AggResult<MemDelta> {
        let src = src.as_avg(self.name())?;
        let dst = dst.as_avg_mut(self.name())?;
        dst.sum.merge_from("AVG", &src.sum)?;
        dst.count += src.count;
        Ok(0)
    }

    fn append_final_result(&self, pr: &PartialResult) -> AggResult<Datum> {
        let p = pr.as_avg(self.name())?;
        if p.count == 0 {
            return Ok(Datum::Null);
        }
        let out = match &p.sum {
            PartialResult4Sum::Empty => Datum::Null,
            PartialResult4Sum::Decimal(d) => {
                let avg = d.checked_div(Decimal::from(p.count))
                    .ok_or_else(|| AggError::Other("AVG decimal overflow".into()))?;
                Datum::Decimal(avg.round_dp(self.scale))
            }
            PartialResult4Sum::Float(f) => Datum::float64(f / p.count as f64),
        };
        Ok(out)
    }
}
