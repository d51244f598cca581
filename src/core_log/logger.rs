use colored::*;
use env_logger::{Builder, Env};
use log::Level;
use std::io::Write;

fn colored_level(level: Level) -> ColoredString {
    match level {
        Level::Error => level.to_string().red(),
        Level::Warn => level.to_string().yellow(),
        Level::Info => level.to_string().green(),
        Level::Debug => level.to_string().blue(),
        Level::Trace => level.to_string().white(),
    }
}

/// Initializes the global logger.
///
/// The default filter is `info` (`debug` in verbose mode) and `RUST_LOG`
/// overrides it. Lines are formatted as `[timestamp] [LEVEL] message`.
pub fn init_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };

    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            let timestamp = buf.timestamp().to_string();
            writeln!(
                buf,
                "[{}] [{}] {}",
                timestamp,
                colored_level(record.level()),
                record.args()
            )
        })
        .init();
}
