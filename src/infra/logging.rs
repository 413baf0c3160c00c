// ============================================================
// Layer 6 - Logging
// ============================================================
// One tracing subscriber for the whole process, installed in
// main before anything logs. `verbosity` from the config picks
// this crate's level:
//
//   0 → warn    1 → info    2 → debug
//
// RUST_LOG, when set, takes precedence.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

pub fn init_tracing(verbosity: u8) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(spec) if !spec.trim().is_empty() => EnvFilter::try_new(spec)?,
        _ => EnvFilter::default()
            .add_directive("warn".parse()?)
            .add_directive(format!("calo_eval={}", level_for(verbosity)).parse()?),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Cannot install tracing subscriber: {e}"))
}
