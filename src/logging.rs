// ==========================================
// Logging setup
// ==========================================
// tracing + tracing-subscriber
// Level from RUST_LOG, format from DTP_LOG_FORMAT
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable selecting the output format ("json" or text)
pub const LOG_FORMAT_ENV: &str = "DTP_LOG_FORMAT";

/// Initialize logging for the binary.
///
/// # Environment
/// - RUST_LOG: filter (default: info),
///   e.g. RUST_LOG=debug or RUST_LOG=day_treatment_planner=trace
/// - DTP_LOG_FORMAT=json: one JSON object per line
///
/// Logs go to stderr so stdout stays free for the plan document.
///
/// # Example
/// ```no_run
/// use day_treatment_planner::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true);

    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Logging for tests: debug level, captured by the test harness
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
