pub mod math;
pub mod stats;
mod utils;

/// Register every builtin with the global function registry. Safe to call
/// more than once; later registrations replace earlier ones.
pub fn load_builtins() {
    math::register_builtins();
    stats::register_builtins();
}
