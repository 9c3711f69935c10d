//! Global name → function table.

use crate::function::Function;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Keys are `NAMESPACE::NAME`, upper-cased; the empty namespace leaves just
/// `NAME`.
static REG: Lazy<DashMap<String, Arc<dyn Function>>> = Lazy::new(DashMap::new);

fn key(ns: &str, name: &str) -> String {
    if ns.is_empty() {
        name.to_ascii_uppercase()
    } else {
        format!("{}::{}", ns.to_ascii_uppercase(), name.to_ascii_uppercase())
    }
}

/// Register `f` under its name and every alias.
pub fn register(f: Arc<dyn Function>) {
    let ns = f.namespace();
    for alias in f.aliases() {
        REG.insert(key(ns, alias), Arc::clone(&f));
    }
    REG.insert(key(ns, f.name()), f);
}

/// Case-insensitive lookup.
pub fn get(ns: &str, name: &str) -> Option<Arc<dyn Function>> {
    REG.get(&key(ns, name)).map(|v| Arc::clone(v.value()))
}

pub fn is_registered(ns: &str, name: &str) -> bool {
    REG.contains_key(&key(ns, name))
}

/// Registered names, aliases included, sorted.
pub fn names() -> Vec<String> {
    let mut out: Vec<String> = REG.iter().map(|e| e.key().clone()).collect();
    out.sort();
    out
}
