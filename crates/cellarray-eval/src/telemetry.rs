//! Optional subscriber setup for the `tracing` spans emitted by array
//! operations, the inverted index and function dispatch.

/// Install an env-filtered fmt subscriber. `RUST_LOG` wins; otherwise
/// `cellarray_eval=info`. Returns `false` if a global subscriber was
/// already set.
#[cfg(feature = "tracing_fmt")]
pub fn init_tracing() -> bool {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_target(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cellarray_eval=info,warn")),
        )
        .try_init()
        .is_ok()
}

/// No-op without the `tracing_fmt` feature.
#[cfg(not(feature = "tracing_fmt"))]
pub fn init_tracing() -> bool {
    false
}
