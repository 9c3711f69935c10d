use crate::config::EvalConfig;
use crate::inverted_index::InvertedIndexCache;
use crate::value::{ArrayError, ArrayOrigin, ArrayValue, ScalarValue, transform_to_value_object};
use cellarray_common::{CellContext, RawValue};
use std::rc::Rc;

/// Settings and index shared by every array a session hands out.
#[derive(Debug, Default)]
pub struct EvalEnv {
    pub config: EvalConfig,
    pub index: InvertedIndexCache,
}

impl EvalEnv {
    pub fn new(config: EvalConfig) -> Self {
        let index = InvertedIndexCache::with_max_columns(config.max_indexed_columns);
        Self { config, index }
    }

    pub(crate) fn index_enabled(&self) -> bool {
        self.config.enable_inverted_index
    }
}

/// Owns one inverted index for one evaluation thread.
///
/// Arrays built through [`EvalSession::array_at`] carry the cell they were
/// read from, so comparisons against them can be answered from the index on
/// later evaluations.
#[derive(Debug, Clone, Default)]
pub struct EvalSession {
    env: Rc<EvalEnv>,
}

impl EvalSession {
    pub fn new(config: EvalConfig) -> Self {
        Self {
            env: Rc::new(EvalEnv::new(config)),
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.env.config
    }

    pub fn index(&self) -> &InvertedIndexCache {
        &self.env.index
    }

    pub fn env(&self) -> &Rc<EvalEnv> {
        &self.env
    }

    /// Build an array whose top-left cell sits at `context`.
    pub fn array_at(&self, context: &CellContext, values: Vec<Vec<ScalarValue>>) -> Result<ArrayValue, ArrayError> {
        Ok(ArrayValue::new(values)?
            .with_origin(ArrayOrigin::at(context))
            .with_env(Rc::clone(&self.env)))
    }

    /// [`array_at`](Self::array_at) for raw literals read from a cell store.
    pub fn array_from_raw(&self, context: &CellContext, values: &[Vec<RawValue>]) -> Result<ArrayValue, ArrayError> {
        self.array_at(context, transform_to_value_object(values))
    }

    /// An array with no origin: comparisons on it never touch the index.
    pub fn detached_array(&self, values: Vec<Vec<ScalarValue>>) -> Result<ArrayValue, ArrayError> {
        Ok(ArrayValue::new(values)?.with_env(Rc::clone(&self.env)))
    }

    /// Forget everything indexed for one sheet, after its cells changed.
    pub fn invalidate_sheet(&self, unit_id: &str, sheet_id: &str) {
        #[cfg(feature = "tracing")]
        tracing::debug!(unit_id, sheet_id, "inverted index invalidate sheet");
        self.env.index.clear_sheet(unit_id, sheet_id);
    }

    pub fn invalidate_unit(&self, unit_id: &str) {
        self.env.index.clear_unit(unit_id);
    }

    pub fn clear_index(&self) {
        self.env.index.clear();
    }
}
