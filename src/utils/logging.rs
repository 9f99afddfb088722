// src/utils/logging.rs
//! Logging configuration
//!
//! Uses `env_logger` with a compact single-line format. `RUST_LOG` always
//! wins over the default level passed in by the caller.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;

/// Initializes logging at Info level unless `RUST_LOG` says otherwise
pub fn init_logging() {
    init_with_default(LevelFilter::Info);
}

/// Initializes logging with the given default level
///
/// Used by `--verbose` and by the benchmark command, which default to Debug.
pub fn init_with_default(level: LevelFilter) {
    let mut builder = common_log_config();

    if env::var("RUST_LOG").is_err() {
        builder.filter_level(level);
    } else {
        builder.parse_env("RUST_LOG");
    }

    // A second init (e.g. from tests) is harmless
    let _ = builder.try_init();
}

/// Base builder: `[ts LEVEL module:line] message` on stdout
fn common_log_config() -> Builder {
    let mut builder = Builder::new();

    builder
        .format(|buf, record| {
            use std::io::Write;
            let ts = buf.timestamp_seconds();
            let level = record.level();
            let module = record.module_path().unwrap_or_default();
            let line = record.line().unwrap_or(0);

            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                ts,
                level,
                module,
                line,
                record.args()
            )
        })
        .target(Target::Stdout);

    builder
}
