//! Startup configuration.
//!
//! Every option is a command-line flag with an environment variable fallback.
//! The parsed [`ServerConfig`] is immutable for the life of the process.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::probe::Thresholds;

pub const DEFAULT_LISTEN_ADDRESS: &str = ":8888";
pub const DEFAULT_APP_TTL_SECS: u64 = 120;
pub const DEFAULT_READINESS_DELAY_SECS: u64 = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Log output format.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Parser)]
#[command(name = "echoprobe", version)]
#[command(about = "Diagnostic HTTP echo server with uptime-gated probes", long_about = None)]
pub struct ServerConfig {
    /// The address to listen on for HTTP requests.
    #[arg(long = "listen-address", env = "LISTEN_ADDRESS", default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen_address: String,

    /// How long the app stays alive, in seconds.
    #[arg(long = "appTtl", visible_alias = "app-ttl", env = "APP_TTL", default_value_t = DEFAULT_APP_TTL_SECS)]
    pub liveness_window_secs: u64,

    /// Warm-up before the readiness probe passes, in seconds.
    #[arg(long = "readiness-delay", env = "READINESS_DELAY", default_value_t = DEFAULT_READINESS_DELAY_SECS)]
    pub readiness_delay_secs: u64,

    /// Bound on reading a request (headers and body) and on idle
    /// keep-alive time, in seconds.
    #[arg(long = "read-timeout", env = "READ_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub read_timeout_secs: u64,

    /// Bound on producing and writing a response, in seconds.
    #[arg(long = "write-timeout", env = "WRITE_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub write_timeout_secs: u64,

    /// Graceful shutdown deadline, in seconds.
    #[arg(long = "shutdown-timeout", env = "SHUTDOWN_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub shutdown_timeout_secs: u64,

    #[arg(long = "log-format", env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// The listen address in a form the socket layer accepts.
    ///
    /// A bare `:port` means every interface, so it becomes `0.0.0.0:port`.
    pub fn bind_address(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(
            Duration::from_secs(self.liveness_window_secs),
            Duration::from_secs(self.readiness_delay_secs),
        )
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_owned(),
            liveness_window_secs: DEFAULT_APP_TTL_SECS,
            readiness_delay_secs: DEFAULT_READINESS_DELAY_SECS,
            read_timeout_secs: DEFAULT_TIMEOUT_SECS,
            write_timeout_secs: DEFAULT_TIMEOUT_SECS,
            shutdown_timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_format: LogFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8888");
        assert_eq!(config.thresholds(), Thresholds::default());
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(10));
        assert_eq!(config.read_timeout(), Duration::from_secs(10));
        assert_eq!(config.write_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn parses_flags() {
        let config = ServerConfig::try_parse_from([
            "echoprobe",
            "--listen-address", "127.0.0.1:9000",
            "--appTtl", "30",
            "--readiness-delay", "2",
            "--log-format", "json",
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.liveness_window_secs, 30);
        assert_eq!(config.readiness_delay_secs, 2);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn app_ttl_has_a_kebab_case_alias() {
        let config = ServerConfig::try_parse_from(["echoprobe", "--app-ttl", "7"]).unwrap();
        assert_eq!(config.liveness_window_secs, 7);
    }

    #[test]
    fn negative_durations_are_rejected() {
        assert!(ServerConfig::try_parse_from(["echoprobe", "--appTtl", "-1"]).is_err());
    }

    #[test]
    fn bare_port_binds_every_interface() {
        let config = ServerConfig { listen_address: ":18888".into(), ..Default::default() };
        assert_eq!(config.bind_address(), "0.0.0.0:18888");
    }
}
