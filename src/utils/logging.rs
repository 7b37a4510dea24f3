//! Logging configuration for the runner.

use chrono::Local;
use colored::Colorize;
use env_logger::{Builder, Env, Target};
use log::{debug, LevelFilter};
use std::io::Write;

/// Environment variable that overrides the configured log filter.
pub const LOG_ENV: &str = "ODYSSEY_LOG";

/// Initialize the logging system
pub fn init_logging(level: &str) {
    let env = Env::default()
        .filter_or(LOG_ENV, level)
        .write_style_or("ODYSSEY_LOG_STYLE", "auto");

    Builder::from_env(env)
        .format(|buf, record| {
            let level = match record.level() {
                | log::Level::Error => "ERROR".red(),
                | log::Level::Warn => "WARN ".yellow(),
                | log::Level::Info => "INFO ".green(),
                | log::Level::Debug => "DEBUG".cyan(),
                | log::Level::Trace => "TRACE".magenta(),
            };

            writeln!(
                buf,
                "{} {} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                level,
                record.target(),
                record.args()
            )
        })
        .target(Target::Stdout)
        .try_init()
        .ok();

    debug!("Logging initialized at level: {}", level);
}

/// Initialize test logging (for use in tests)
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).filter_level(LevelFilter::Debug).try_init();
}
