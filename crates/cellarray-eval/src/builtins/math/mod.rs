pub mod aggregate;
pub mod criteria_aggregates;

pub fn register_builtins() {
    aggregate::register_builtins();
    criteria_aggregates::register_builtins();
}
