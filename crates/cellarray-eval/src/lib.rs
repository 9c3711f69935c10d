pub mod broadcast;
pub mod coercion;
pub mod config;
pub mod criteria;
pub mod function;
pub mod function_registry;
pub mod inverted_index;
pub mod session;
pub mod value;

pub mod builtins;

pub use broadcast::{ArrayCalculateType, BatchOperator};
pub use config::EvalConfig;
pub use inverted_index::{ColumnKey, IndexKey, InvertedIndexCache};
pub use session::{EvalEnv, EvalSession};
pub use value::{
    ArrayError, ArrayOrigin, ArrayValue, CalcValue, CompareToken, ScalarValue, SearchType, SliceSpec,
    ValueObjectFactory,
};

mod macros;

pub mod telemetry;

#[cfg(test)]
mod tests;
