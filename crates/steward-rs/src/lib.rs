//! Public surface for Steward.
//!
//! Re-exports the workspace crates and the wiring used by the `steward`
//! console so embedders can assemble the same assistant.

pub mod console;
pub mod setup;

/// Re-export for convenience.
pub use steward_rs_config as config;
pub use steward_rs_core as core;
/// Re-export for convenience.
pub use steward_rs_memory as memory;
/// Re-export for convenience.
pub use steward_rs_protocol as protocol;
pub use steward_rs_tools as tools;

/// Initialize `env_logger` with millisecond timestamps; `RUST_LOG` controls
/// verbosity. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();
}
