use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    aggfuncs::{AggError, AggFunc, AggResult, MemDelta, PartialResult},
    executor::{ExecutorConfig, Helpers, MemQuota},
    types::Datum,
};

/// One finalized output row: the group key and one result per aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: Vec<Datum>,
    pub values: Vec<Datum>,
}

/// Hash grouping over a fixed list of aggregate calls.
///
/// Partial results live in one arena: group `g`'s state for aggregate `i` sits at
/// `g * funcs.len() + i`. Group ids are dense and assigned in first-seen order.
/// Every delta reported by the aggregates is charged to the shared [`MemQuota`].
///
/// One executor is driven by one worker; combine workers with [`merge`](Self::merge).
/// A failed update or merge leaves some states half-applied, so the executor refuses
/// further work after one. Dropping it returns whatever it still holds to the quota.
pub struct HashAggExecutor {
    funcs: Vec<Arc<dyn AggFunc>>,
    baselines: Vec<i64>,
    quota: Arc<MemQuota>,
    group_ids: IndexMap<String, usize>,
    group_keys: Vec<Vec<Datum>>,
    states: Vec<PartialResult>,
    mem_usage: i64,
    poisoned: bool,
}

impl HashAggExecutor {
    pub fn new(funcs: Vec<Arc<dyn AggFunc>>, config: &ExecutorConfig, quota: Arc<MemQuota>) -> Self {
        let baselines = funcs.iter().map(|f| f.create_partial_result().1).collect();
        let states = Vec::with_capacity(config.initial_groups * funcs.len());
        Self {
            funcs,
            baselines,
            quota,
            group_ids: IndexMap::with_capacity(config.initial_groups),
            group_keys: Vec::with_capacity(config.initial_groups),
            states,
            mem_usage: 0,
            poisoned: false,
        }
    }

    pub fn funcs(&self) -> &[Arc<dyn AggFunc>] {
        &self.funcs
    }

    pub fn group_count(&self) -> usize {
        self.group_ids.len()
    }

    /// Bytes currently charged by this executor's states.
    pub fn mem_usage(&self) -> i64 {
        self.mem_usage
    }

    /// The state of aggregate `func` for the group keyed by `key`, if that group exists.
    pub fn partial_result(&self, key: &[Datum], func: usize) -> Option<&PartialResult> {
        if func >= self.funcs.len() {
            return None;
        }
        let gid = *self.group_ids.get(&Helpers::canonical_tuple(key))?;
        self.states.get(gid * self.funcs.len() + func)
    }

    fn charge(&mut self, delta: MemDelta) -> AggResult<()> {
        self.mem_usage += delta;
        self.quota.consume(delta)
    }

    fn ensure_usable(&self) -> AggResult<()> {
        if self.poisoned {
            return Err(AggError::Other("aggregation state was invalidated by an earlier error".into()));
        }
        Ok(())
    }

    /// Charge what `step` applied whether or not it finished. The first error wins.
    fn settle(&mut self, delta: MemDelta, step: AggResult<()>) -> AggResult<()> {
        let charged = self.charge(delta);
        let result = step.and(charged);
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    /// Dense id of the group, creating its states on first sight. Arena slots left over
    /// from a previous [`finalize`](Self::finalize) are reused; they were reset then.
    fn group_slot(&mut self, key: &[Datum]) -> AggResult<usize> {
        let canon = Helpers::canonical_tuple(key);
        if let Some(&gid) = self.group_ids.get(&canon) {
            return Ok(gid);
        }
        let gid = self.group_ids.len();
        let n = self.funcs.len();
        let delta = if self.states.len() >= (gid + 1) * n {
            self.baselines.iter().sum()
        } else {
            let mut delta = 0;
            for f in &self.funcs {
                let (pr, mem) = f.create_partial_result();
                self.states.push(pr);
                delta += mem;
            }
            delta
        };
        self.group_ids.insert(canon, gid);
        self.group_keys.push(key.to_vec());
        tracing::debug!(gid, "new aggregation group");
        self.settle(delta, Ok(()))?;
        Ok(gid)
    }

    /// Route one row to its group. `args[i]` holds the evaluated arguments of aggregate `i`.
    pub fn update(&mut self, key: &[Datum], args: &[Vec<Datum>]) -> AggResult<()> {
        self.ensure_usable()?;
        if args.len() != self.funcs.len() {
            return Err(AggError::Other(format!("expected arguments for {} aggregates, got {}", self.funcs.len(), args.len())));
        }
        let base = self.group_slot(key)? * self.funcs.len();
        let mut delta = 0;
        let mut step = Ok(());
        for (i, row) in args.iter().enumerate() {
            match self.funcs[i].update_partial_result(&mut self.states[base + i], row) {
                Ok(d) => delta += d,
                Err(e) => {
                    step = Err(e);
                    break;
                }
            }
        }
        self.settle(delta, step)
    }

    /// Fold the partial results of another worker into this one, group by group.
    pub fn merge(&mut self, other: &HashAggExecutor) -> AggResult<()> {
        self.ensure_usable()?;
        other.ensure_usable()?;
        let same_funcs = self.funcs.len() == other.funcs.len()
            && self.funcs.iter().zip(&other.funcs).all(|(a, b)| a.name() == b.name());
        if !same_funcs {
            return Err(AggError::Other("cannot merge executors over different aggregates".into()));
        }
        let n = self.funcs.len();
        let mut delta = 0;
        let mut step = Ok(());
        'groups: for (ogid, key) in other.group_keys.iter().enumerate() {
            let base = match self.group_slot(key) {
                Ok(gid) => gid * n,
                Err(e) => {
                    step = Err(e);
                    break;
                }
            };
            for i in 0..n {
                match self.funcs[i].merge_partial_result(&other.states[ogid * n + i], &mut self.states[base + i]) {
                    Ok(d) => delta += d,
                    Err(e) => {
                        step = Err(e);
                        break 'groups;
                    }
                }
            }
        }
        tracing::trace!(groups = other.group_count(), delta, "merged partial aggregation");
        self.settle(delta, step)
    }

    /// Produce one row per group in first-seen order, then reset every state for reuse
    /// and give the memory back to the quota.
    pub fn finalize(&mut self) -> AggResult<Vec<GroupRow>> {
        self.ensure_usable()?;
        let n = self.funcs.len();
        let mut out = Vec::with_capacity(self.group_keys.len());
        for (gid, key) in self.group_keys.iter().enumerate() {
            let values = self.funcs
                .iter()
                .enumerate()
                .map(|(i, f)| f.append_final_result(&self.states[gid * n + i]))
                .collect::<AggResult<Vec<_>>>()?;
            out.push(GroupRow { key: key.clone(), values });
        }

        for gid in 0..self.group_keys.len() {
            for (i, f) in self.funcs.iter().enumerate() {
                f.reset_partial_result(&mut self.states[gid * n + i]);
            }
        }
        self.quota.release(self.mem_usage);
        self.mem_usage = 0;
        self.group_ids.clear();
        self.group_keys.clear();
        Ok(out)
    }
}

impl Drop for HashAggExecutor {
    fn drop(&mut self) {
        self.quota.release(self.mem_usage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggfuncs::{build_agg_func, AggFuncDesc, JSON_OBJECT_AGG_BASE_MEM},
        executor::OnExceed,
        types::{FieldType, JsonValue, TypeCode},
    };
    use std::thread;

    fn funcs() -> Vec<Arc<dyn AggFunc>> {
        vec![
            build_agg_func(&AggFuncDesc::new("json_objectagg", vec![FieldType::new(TypeCode::LongLong), FieldType::new(TypeCode::Double)])).unwrap(),
            build_agg_func(&AggFuncDesc::new("count", vec![FieldType::new(TypeCode::LongLong)])).unwrap(),
        ]
    }

    fn row(group: &str, k: i64, v: f64) -> (Vec<Datum>, Vec<Vec<Datum>>) {
        (vec![Datum::string(group)], vec![vec![Datum::Int64(k), Datum::float64(v)], vec![Datum::Int64(k)]])
    }

    fn rows() -> Vec<(Vec<Datum>, Vec<Vec<Datum>>)> {
        vec![row("a", 1, 10.0), row("b", 7, 1.5), row("a", 2, 20.5), row("a", 1, 30.0), row("b", 8, 2.5)]
    }

    fn objectagg_state_mem(exec: &HashAggExecutor, group: &str) -> i64 {
        exec.partial_result(&[Datum::string(group)], 0)
            .and_then(|pr| pr.as_json_object_agg("test").ok())
            .map(|p| p.recompute_mem_usage())
            .unwrap_or_default()
    }

    #[test]
    fn groups_rows_and_finalizes_in_first_seen_order() {
        let quota = Arc::new(MemQuota::unlimited());
        let mut exec = HashAggExecutor::new(funcs(), &ExecutorConfig::default(), Arc::clone(&quota));
        for (key, args) in rows() {
            exec.update(&key, &args).unwrap();
        }
        assert_eq!(exec.group_count(), 2);
        assert_eq!(quota.consumed(), exec.mem_usage());
        let count_mem = exec.baselines[1];
        assert_eq!(exec.mem_usage(), objectagg_state_mem(&exec, "a") + objectagg_state_mem(&exec, "b") + 2 * count_mem);

        let out = exec.finalize().unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].key, vec![Datum::string("a")]);
        assert_eq!(out[0].values[0], Datum::Json(JsonValue::object([("1", JsonValue::float(30.0)), ("2", JsonValue::float(20.5))])));
        assert_eq!(out[0].values[1], Datum::Int64(3));
        assert_eq!(out[1].values[1], Datum::Int64(2));
        assert_eq!(quota.consumed(), 0);
    }

    #[test]
    fn parallel_workers_merge_to_the_serial_result() {
        let quota = Arc::new(MemQuota::unlimited());
        let cfg = ExecutorConfig::default();
        let all = rows();
        let (left, right) = all.split_at(2);

        let run = |part: &[(Vec<Datum>, Vec<Vec<Datum>>)]| {
            let mut exec = HashAggExecutor::new(funcs(), &cfg, Arc::clone(&quota));
            for (key, args) in part {
                exec.update(key, args).unwrap();
            }
            exec
        };
        let (mut w1, w2) = thread::scope(|s| {
            let h1 = s.spawn(|| run(left));
            let h2 = s.spawn(|| run(right));
            (h1.join().unwrap(), h2.join().unwrap())
        });
        w1.merge(&w2).unwrap();

        let mut serial = HashAggExecutor::new(funcs(), &cfg, Arc::new(MemQuota::unlimited()));
        for (key, args) in &all {
            serial.update(key, args).unwrap();
        }
        assert_eq!(w1.finalize().unwrap(), serial.finalize().unwrap());

        // w2's groups were folded into w1 but its own states are still charged
        assert!(quota.consumed() > 0);
        assert_eq!(quota.consumed(), w2.mem_usage());
        drop(w2);
        drop(w1);
        assert_eq!(quota.consumed(), 0);
    }

    #[test]
    fn dropping_an_unfinalized_executor_releases_its_quota() {
        let quota = Arc::new(MemQuota::unlimited());
        let mut exec = HashAggExecutor::new(funcs(), &ExecutorConfig::default(), Arc::clone(&quota));
        for (key, args) in rows() {
            exec.update(&key, &args).unwrap();
        }
        assert!(quota.consumed() > 0);
        drop(exec);
        assert_eq!(quota.consumed(), 0);
    }

    #[test]
    fn failed_row_charges_applied_deltas_and_invalidates_the_executor() {
        let text = || FieldType::new(TypeCode::VarString);
        let desc = AggFuncDesc::new("json_objectagg", vec![text(), text()]);
        let funcs = vec![build_agg_func(&desc).unwrap(), build_agg_func(&desc).unwrap()];
        let quota = Arc::new(MemQuota::unlimited());
        let mut exec = HashAggExecutor::new(funcs, &ExecutorConfig::default(), Arc::clone(&quota));

        let key = [Datum::string("g")];
        let args = vec![
            vec![Datum::string("k"), Datum::string("0123456789")],
            vec![Datum::Null, Datum::string("v")],
        ];
        assert_eq!(exec.update(&key, &args).unwrap_err(), AggError::InvalidKey);

        // the first aggregate kept its entry and the charge includes it
        let held: i64 = (0..2)
            .map(|i| exec.partial_result(&key, i).and_then(|pr| pr.as_json_object_agg("test").ok()).map(|p| p.recompute_mem_usage()).unwrap())
            .sum();
        assert!(held > 2 * JSON_OBJECT_AGG_BASE_MEM);
        assert_eq!(exec.mem_usage(), held);
        assert_eq!(quota.consumed(), held);

        let clean = vec![vec![Datum::string("a"), Datum::string("b")], vec![Datum::string("c"), Datum::string("d")]];
        assert!(matches!(exec.update(&key, &clean), Err(AggError::Other(_))));
        assert!(matches!(exec.finalize(), Err(AggError::Other(_))));
        drop(exec);
        assert_eq!(quota.consumed(), 0);
    }

    #[test]
    fn partial_result_rejects_an_out_of_range_aggregate() {
        let mut exec = HashAggExecutor::new(funcs(), &ExecutorConfig::default(), Arc::new(MemQuota::unlimited()));
        for (key, args) in rows() {
            exec.update(&key, &args).unwrap();
        }
        let a = [Datum::string("a")];
        assert!(exec.partial_result(&a, 1).is_some());
        assert!(exec.partial_result(&a, 2).is_none());
        assert!(exec.partial_result(&a, 3).is_none());
    }

    #[test]
    fn quota_cancel_aborts_the_update() {
        let cfg = ExecutorConfig::with_quota(JSON_OBJECT_AGG_BASE_MEM + 64);
        let quota = Arc::new(MemQuota::from_config(&cfg));
        let mut exec = HashAggExecutor::new(funcs(), &cfg, Arc::clone(&quota));
        let mut result = Ok(());
        for i in 0..100 {
            let (key, args) = row("g", i, i as f64);
            result = exec.update(&key, &args);
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(AggError::ResourceExhausted { .. })));
    }

    #[test]
    fn quota_log_only_keeps_aggregating() {
        let cfg = ExecutorConfig::log_only(1);
        let quota = Arc::new(MemQuota::new(cfg.mem_quota, OnExceed::LogOnly));
        let mut exec = HashAggExecutor::new(funcs(), &cfg, quota);
        for (key, args) in rows() {
            exec.update(&key, &args).unwrap();
        }
        assert_eq!(exec.finalize().unwrap().len(), 2);
    }

    #[test]
    fn finalize_resets_states_for_reuse() {
        let quota = Arc::new(MemQuota::unlimited());
        let mut exec = HashAggExecutor::new(funcs(), &ExecutorConfig::default(), Arc::clone(&quota));
        for (key, args) in rows() {
            exec.update(&key, &args).unwrap();
        }
        exec.finalize().unwrap();
        assert_eq!(exec.group_count(), 0);

        let (key, args) = row("c", 5, 0.5);
        exec.update(&key, &args).unwrap();
        let out = exec.finalize().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].values[0], Datum::Json(JsonValue::object([("5", JsonValue::float(0.5))])));
        assert_eq!(out[0].values[1], Datum::Int64(1));
        assert_eq!(quota.consumed(), 0);
    }

    #[test]
    fn null_key_fails_the_row() {
        let mut exec = HashAggExecutor::new(funcs(), &ExecutorConfig::default(), Arc::new(MemQuota::unlimited()));
        let err = exec.update(&[Datum::string("a")], &[vec![Datum::Null, Datum::float64(1.0)], vec![Datum::Null]]).unwrap_err();
        assert_eq!(err, AggError::InvalidKey);
    }
}
