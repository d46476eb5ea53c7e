//! Ambient logging bootstrap shared by the RPC server and client.
//!
//! Builds a `slog::Logger` from a small TOML fragment via `sloggers`, the
//! same construction sequence the rest of the toolkit uses for its other
//! long-running processes.

use serdeconv;
use slog::Logger;
use sloggers::Config;

/// Logging destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Stderr,
    Stdout,
}

impl Destination {
    fn as_str(self) -> &'static str {
        match self {
            Destination::Stderr => "stderr",
            Destination::Stdout => "stdout",
        }
    }
}

/// Log level, mirrored from `sloggers::types::Severity` so callers don't
/// need that crate in scope just to pick a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
        }
    }
}

/// Builds the terminal logger used by `RpcServer`/`RpcClient`.
///
/// Panics if the TOML fragment fails to parse or the logger fails to
/// build; both are programmer errors (the fragment is built in-process),
/// not something a caller can recover from.
pub fn init(level: Level, destination: Destination) -> Logger {
    use sloggers::LoggerConfig;

    let toml = format!(
        "type = \"terminal\"\nlevel = \"{}\"\ndestination = \"{}\"\n",
        level.as_str(),
        destination.as_str()
    );

    let config: LoggerConfig =
        serdeconv::from_toml_str(&toml).expect("invalid logging config fragment");
    config.build_logger().expect("failed to build logger")
}

/// Convenience constructor for the common debug-level, stderr-destination
/// case.
pub fn init_default() -> Logger {
    init(Level::Debug, Destination::Stderr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::info;

    #[test]
    fn builds_default_logger() {
        let logger = init_default();
        info!(logger, "crpc-log smoke test");
    }

    #[test]
    fn builds_with_explicit_level() {
        let logger = init(Level::Warning, Destination::Stdout);
        info!(logger, "this is below the configured level and is dropped");
    }
}
