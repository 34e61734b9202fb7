//! Shared logging utilities for consistent tracing across all fixtures
//!
//! Diagnostics go to stderr. Stdout is reserved for the evidence lines the
//! external harness scrapes (greetings, fault descriptions, farewells).

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::types::Rank;

/// Build the filter directive used by a fixture binary: its own target plus
/// every workspace library it links
pub fn filter_directive(binary: &str, log_level: Option<&str>) -> String {
    let base_level = log_level.unwrap_or("info");
    format!("{binary}={base_level},injector={base_level},coordinator={base_level},shared={base_level}")
}

/// Initialize the stderr tracing subscriber for a fixture binary
pub fn init_tracing(binary: &str, log_level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let directive = filter_directive(binary, log_level);

    // try_init: integration tests may initialise more than once per process
    let _ = fmt()
        .with_env_filter(EnvFilter::new(&directive))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for rank-aware info logging
#[macro_export]
macro_rules! rank_info {
    ($rank:expr, $($arg:tt)*) => {
        tracing::info!(
            rank = %$rank,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for rank-aware warning logging
#[macro_export]
macro_rules! rank_warn {
    ($rank:expr, $($arg:tt)*) => {
        tracing::warn!(
            rank = %$rank,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for rank-aware debug logging
#[macro_export]
macro_rules! rank_debug {
    ($rank:expr, $($arg:tt)*) => {
        tracing::debug!(
            rank = %$rank,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(rank: Rank, details: &str) {
    info!(
        rank = %rank,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(rank: Rank, reason: &str) {
    info!(
        rank = %rank,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(rank: Rank, context: &str, error: &dyn std::fmt::Display) {
    error!(
        rank = %rank,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}
