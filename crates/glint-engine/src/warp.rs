//! Numeric warping of configuration tables.

use glint_types::{ConfigTable, ParamTransform, TaskContext};

/// Forward/inverse scaling applied to whole configuration tables before
/// prompting and after validation. `unwarp` must invert `warp` for every
/// value inside the declared constraint ranges.
pub trait WarpingTransformer: Send + Sync {
    fn warp(&self, table: &ConfigTable) -> ConfigTable;
    fn unwarp(&self, table: &ConfigTable) -> ConfigTable;
}

/// Base-10 log warping for every column whose constraint declares
/// [`ParamTransform::Log`]; other columns pass through untouched.
#[derive(Debug, Clone)]
pub struct LogWarper {
    log_columns: Vec<String>,
}

impl LogWarper {
    pub fn from_context(ctx: &TaskContext) -> Self {
        Self {
            log_columns: ctx
                .iter()
                .filter(|(_, c)| c.transform == ParamTransform::Log)
                .map(|(name, _)| name.to_string())
                .collect(),
        }
    }

    fn is_log(&self, column: &str) -> bool {
        self.log_columns.iter().any(|c| c == column)
    }
}

impl WarpingTransformer for LogWarper {
    fn warp(&self, table: &ConfigTable) -> ConfigTable {
        table.map_columns(|name, value| {
            if self.is_log(name) {
                value.log10()
            } else {
                value
            }
        })
    }

    fn unwarp(&self, table: &ConfigTable) -> ConfigTable {
        table.map_columns(|name, value| {
            if self.is_log(name) {
                10f64.powf(value)
            } else {
                value
            }
        })
    }
}
