//! CLI argument definitions for hostwatch-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Hostwatch host-based detection daemon.
///
/// Supervises the detection modules (network monitor, static analysis,
/// file monitor), the alert-processing loop, and the alert forwarder.
#[derive(Parser, Debug)]
#[command(name = "hostwatch-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to hostwatch.toml configuration file.
    #[arg(short, long, default_value = "/etc/hostwatch/hostwatch.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let cli = DaemonCli::parse_from(["hostwatch-daemon"]);
        assert_eq!(cli.config, PathBuf::from("/etc/hostwatch/hostwatch.toml"));
        assert!(!cli.validate);
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn parses_overrides() {
        let cli = DaemonCli::parse_from([
            "hostwatch-daemon",
            "--config",
            "/tmp/hw.toml",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--validate",
        ]);
        assert_eq!(cli.config, PathBuf::from("/tmp/hw.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_format.as_deref(), Some("pretty"));
        assert!(cli.validate);
    }
}
