//! Tracing setup for the import binaries.
//!
//! Logs go to stderr so an export can write its record to stdout. The
//! SurrealDB client crates are capped at `warn` unless `RUST_LOG` says
//! otherwise, since at `debug` they log every statement of an import.

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const QUIET_TARGETS: [&str; 2] = ["surrealdb", "surrealdb_core"];

/// Filter for `directives` (the value of `RUST_LOG`), or for `level` with
/// the store client quieted when no usable directives are given.
pub fn import_filter(directives: Option<&str>, level: Level) -> EnvFilter {
    if let Some(filter) = directives.and_then(|d| EnvFilter::try_new(d).ok()) {
        return filter;
    }
    QUIET_TARGETS.iter().fold(EnvFilter::new(level.as_str()), |filter, target| {
        match format!("{target}=warn").parse::<Directive>() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        }
    })
}

/// Install the global subscriber. Only the first call in a process takes
/// effect.
pub fn init_tracing(json: bool, level: Level) {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let registry =
        tracing_subscriber::registry().with(import_filter(directives.as_deref(), level));

    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    if json {
        registry.with(layer.json()).try_init().ok();
    } else {
        registry.with(layer).try_init().ok();
    }
}
