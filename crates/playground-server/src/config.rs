//! Process configuration from flags and environment

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use playground_core::logging_facility::Profile;
use playground_core::Sensitive;

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    pub fn profile(self) -> Profile {
        match self {
            LogFormat::Json => Profile::Production,
            LogFormat::Text => Profile::Development,
        }
    }
}

/// Jsonnet playground server
#[derive(Debug, Clone, Parser)]
#[command(name = "jsonnet-playground")]
#[command(about = "Save, share and evaluate Jsonnet snippets over HTTP", long_about = None)]
pub struct Config {
    /// Address to listen on, without the port
    #[arg(long, env = "HTTP_ADDRESS", default_value = "0.0.0.0")]
    pub http_address: IpAddr,

    #[arg(long, env = "HTTP_PORT", default_value_t = 8000)]
    pub http_port: u16,

    /// SQLite location, e.g. `sqlite://jsonnet-playground.db` or `sqlite::memory:`
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite://jsonnet-playground.db",
        value_parser = parse_sensitive,
        hide_env_values = true
    )]
    pub database_url: Sensitive<String>,

    /// Directory holding the built web app
    #[arg(long, env = "STATIC_DIR", default_value = "web/out")]
    pub static_dir: PathBuf,

    #[arg(long, env = "LOG_FORMAT", value_enum, ignore_case = true, default_value = "json")]
    pub log_format: LogFormat,

    /// Wall-clock budget for a single evaluation
    #[arg(
        long,
        env = "EVAL_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub eval_timeout_ms: u64,

    /// How long in-flight requests may run after a shutdown signal
    #[arg(long, env = "SHUTDOWN_GRACE_SECS", default_value_t = 20)]
    pub shutdown_grace_secs: u64,
}

fn parse_sensitive(raw: &str) -> Result<Sensitive<String>, String> {
    Ok(Sensitive::new(raw.to_string()))
}

impl Config {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http_address, self.http_port)
    }

    pub fn eval_timeout(&self) -> Duration {
        Duration::from_millis(self.eval_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, clap::Error> {
        Config::try_parse_from(std::iter::once("jsonnet-playground").chain(args.iter().copied()))
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--http-address",
            "127.0.0.1",
            "--http-port",
            "9000",
            "--database-url",
            "sqlite::memory:",
            "--log-format",
            "TEXT",
            "--eval-timeout-ms",
            "250",
        ])
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(config.database_url.expose(), "sqlite::memory:");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.eval_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(parse(&["--eval-timeout-ms", "0"]).is_err());
    }

    #[test]
    fn test_database_url_is_redacted_in_debug() {
        let config = parse(&["--database-url", "sqlite:///srv/secret.db"]).unwrap();
        assert!(!format!("{:?}", config).contains("secret.db"));
    }

    #[test]
    fn test_log_format_profiles() {
        assert_eq!(LogFormat::Json.profile(), Profile::Production);
        assert_eq!(LogFormat::Text.profile(), Profile::Development);
    }
}
