//! Structured logging setup, mirroring `flux::logging`: a `sloggers`-driven
//! drain configured from TOML, falling back to a sane terminal default when
//! no config file is supplied (the teacher's stub always used the literal
//! default; we make that path an explicit, reusable function instead).

use slog::Logger;
use sloggers::{Config, LoggerConfig};

const DEFAULT_CONFIG: &str = r#"
type = "terminal"
level = "debug"
destination = "stderr"
"#;

/// Builds a root logger from a `sloggers` TOML config file. Used by the
/// `--log-config` CLI flag on the game/lobby server binaries.
pub fn from_config_file(path: &str) -> Result<Logger, String> {
    let config: LoggerConfig =
        serdeconv::from_toml_file(path).map_err(|e| format!("failed to read logging config {}: {}", path, e))?;
    config.build_logger().map_err(|e| format!("failed to build logger: {}", e))
}

/// Builds the default root logger (terminal drain, debug level, stderr) used
/// when no logging config file is given.
pub fn default_logger() -> Logger {
    let config: LoggerConfig =
        serdeconv::from_toml_str(DEFAULT_CONFIG).expect("default logging config is well-formed");
    config.build_logger().expect("default logging config builds a logger")
}

/// Convenience entry point: try the config file if one was given, else fall
/// back to the default terminal logger.
pub fn init(config_path: Option<&str>) -> Logger {
    match config_path {
        Some(path) => from_config_file(path).unwrap_or_else(|err| {
            let fallback = default_logger();
            slog::warn!(fallback, "falling back to default logger"; "reason" => err);
            fallback
        }),
        None => default_logger(),
    }
}
