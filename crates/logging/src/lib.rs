//! helpers for logging.
//!
//! Everything else in the workspace logs through the `log` facade; this crate is the one place which decides where
//! those records go.

/// Default filter when `RUST_LOG` isn't set.
const DEFAULT_FILTER: &str = "info";

fn format_record(
    buf: &mut env_logger::fmt::Formatter,
    record: &log::Record,
) -> std::io::Result<()> {
    use std::io::Write;

    let now = time::OffsetDateTime::now_utc();

    writeln!(
        buf,
        "{} {} time={} target={}",
        record.level(),
        record.args(),
        now,
        record.target()
    )
}

/// Log to stderr, filtered by `RUST_LOG`.
///
/// If called multiple times in the same process, only applies once.
pub fn log_to_stderr() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_FILTER))
            .format(format_record)
            .init();
    });
}

/// Log through the test harness's captured output.
///
/// Safe to call from every test; only the first call in a process installs the logger.
pub fn log_for_tests() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .format(format_record)
        .is_test(true)
        .try_init();
}
