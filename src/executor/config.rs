use serde::{Deserialize, Serialize};

/// What to do when a query's memory quota is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnExceed {
    /// Abort the query with `ResourceExhausted`.
    #[default]
    Cancel,
    /// Log a warning and keep going.
    LogOnly,
}

/// Grouping executor configuration.
///
/// - `mem_quota` caps the bytes all aggregate states of one query may use; `None` means unlimited.
/// - `on_exceed` is the policy applied when the cap is crossed.
/// - `initial_groups` pre-sizes the group arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub mem_quota: Option<i64>,
    pub on_exceed: OnExceed,
    pub initial_groups: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self { mem_quota: None, on_exceed: OnExceed::Cancel, initial_groups: 16 }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: cancel the query past `bytes`.
    pub fn with_quota(bytes: i64) -> Self {
        Self { mem_quota: Some(bytes), ..Self::default() }
    }

    /// Convenience: only warn past `bytes`.
    pub fn log_only(bytes: i64) -> Self {
        Self { mem_quota: Some(bytes), on_exceed: OnExceed::LogOnly, ..Self::default() }
    }
}
