//! Command line flags for the `webd` binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::server::{Credentials, LogSinks, ServerConfig};

/// Product name printed by `--version`.
pub const NAME: &str = "WebD";

/// Serve a directory over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "webd", about, long_about = None, disable_version_flag = true)]
pub struct Args {
    /// host to listen on
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// port to listen on
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// root directory to serve
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// username for basic auth, empty disables it
    #[arg(long, default_value_t)]
    pub user: String,

    /// password for basic auth
    #[arg(long, default_value_t)]
    pub password: String,

    /// timeout for reading requests and for the graceful shutdown (e.g. "5s", "1m30s")
    #[arg(long, value_parser = humantime::parse_duration, default_value = "5s")]
    pub timeout: Duration,

    /// show version
    #[arg(long)]
    pub version: bool,
}

impl Args {
    /// Build the server configuration, writing logs to `logs`.
    pub fn into_config(self, logs: LogSinks) -> ServerConfig {
        ServerConfig {
            root: self.root,
            host: self.host,
            port: self.port,
            credentials: Credentials::new(self.user, self.password),
            read_timeout: self.timeout,
            logs,
            ..ServerConfig::default()
        }
    }
}

/// Build tag, VCS revision and build time, one per line.
///
/// The values come from `WEBD_TAG`, `WEBD_VCS`, `WEBD_REVISION` and
/// `WEBD_BUILD_TIME` at compile time.
pub fn version_text() -> String {
    let tag = option_env!("WEBD_TAG").unwrap_or(env!("CARGO_PKG_VERSION"));
    let vcs = option_env!("WEBD_VCS").unwrap_or_default();
    let revision = option_env!("WEBD_REVISION").unwrap_or_default();
    let build_time = option_env!("WEBD_BUILD_TIME").unwrap_or_default();
    format!("{NAME} {tag}\n{vcs}:{revision}\n{build_time}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let args = Args::try_parse_from(["webd"]).unwrap();
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 8080);
        assert_eq!(args.root, PathBuf::from("."));
        assert_eq!(args.user, "");
        assert_eq!(args.password, "");
        assert_eq!(args.timeout, Duration::from_secs(5));
        assert!(!args.version);
    }

    #[test]
    fn parses_all_flags() {
        let args = Args::try_parse_from([
            "webd", "--host", "0.0.0.0", "--port", "9000", "--root", "/srv/www", "--user", "admin",
            "--password", "pw", "--timeout", "1m30s", "--version",
        ])
        .unwrap();
        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(args.port, 9000);
        assert_eq!(args.root, PathBuf::from("/srv/www"));
        assert_eq!(args.timeout, Duration::from_secs(90));
        assert!(args.version);

        let config = args.into_config(LogSinks::stdio());
        assert_eq!(config.credentials, Credentials::new("admin", "pw"));
        assert!(config.credentials.is_enabled());
        assert_eq!(config.read_timeout, Duration::from_secs(90));
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn rejects_out_of_range_port_and_bad_timeout() {
        assert!(Args::try_parse_from(["webd", "--port", "70000"]).is_err());
        assert!(Args::try_parse_from(["webd", "--timeout", "soon"]).is_err());
    }

    #[test]
    fn version_text_has_three_lines() {
        let text = version_text();
        assert!(text.starts_with("WebD "));
        assert_eq!(text.lines().count(), 3);
    }
}
