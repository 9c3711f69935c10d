//! Helpers that keep documentation examples short.

use crate::{CalcValue, ValueObjectFactory};
use cellarray_eval::builtins::load_builtins;
use cellarray_eval::function_registry;

/// Call a registered builtin with arguments written as cell literals
/// (`"{1;2;3}"`, `">2"`, `"TRUE"`). Unknown names give `None`.
///
/// # Example
///
/// ```rust
/// # use cellarray::doc_examples::call_builtin;
/// # use cellarray::ScalarValue;
/// let out = call_builtin("SUMIFS", &["{1;1;1}", "{2;3;4}", ">2"]).unwrap();
/// assert_eq!(out.first_cell(), ScalarValue::Number(2.0));
/// ```
pub fn call_builtin(name: &str, literals: &[&str]) -> Option<CalcValue> {
    load_builtins();
    let function = function_registry::get("", name)?;
    let args: Vec<CalcValue> = literals.iter().map(|s| ValueObjectFactory::create(*s)).collect();
    Some(function.dispatch(&args))
}
