use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use lib_dashboard::{DashboardOptions, RetryPolicy};

pub const DEFAULT_CONFIG_FILE: &str = "server_dashboard.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Sales/users/business dashboard refresher", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "DASHBOARD_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "DASHBOARD_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "DASHBOARD_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error, off).")]
    pub log_level: Option<String>,

    #[clap(long, env = "DASHBOARD_SOURCE", help = "Data source: 'mock' or 'http'.")]
    pub source: Option<String>,

    #[clap(long, env = "DASHBOARD_BASE_URL", help = "Base URL of the data API (http source only).")]
    pub base_url: Option<String>,

    #[clap(long, env = "DASHBOARD_AUTH_TOKEN", help = "Bearer token sent to the data API.")]
    pub auth_token: Option<String>,

    #[clap(long, env = "DASHBOARD_REFRESH_INTERVAL_SECONDS", help = "Seconds between two refresh cycles.")]
    pub refresh_interval_seconds: Option<u64>,

    #[clap(long, env = "DASHBOARD_CACHE_TTL_MS", help = "Lifetime of a cached domain record in milliseconds.")]
    pub cache_ttl_ms: Option<u64>,

    #[clap(long, env = "DASHBOARD_MAX_RETRIES", help = "Attempts per source fetch before giving up.")]
    pub max_retries: Option<u32>,

    #[clap(long, env = "DASHBOARD_TIMEOUT_MS", help = "Per-attempt timeout in milliseconds.")]
    pub timeout_ms: Option<u64>,

    #[clap(long, env = "DASHBOARD_BACKOFF_STEP_MS", help = "Backoff step in milliseconds; attempt n waits n steps.")]
    pub backoff_step_ms: Option<u64>,
}

/// Where the dashboard gets its payloads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Mock,
    Http { base_url: String, auth_token: Option<String> },
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            source: other.source.or(self.source),
            base_url: other.base_url.or(self.base_url),
            auth_token: other.auth_token.or(self.auth_token),
            refresh_interval_seconds: other.refresh_interval_seconds.or(self.refresh_interval_seconds),
            cache_ttl_ms: other.cache_ttl_ms.or(self.cache_ttl_ms),
            max_retries: other.max_retries.or(self.max_retries),
            timeout_ms: other.timeout_ms.or(self.timeout_ms),
            backoff_step_ms: other.backoff_step_ms.or(self.backoff_step_ms),
        }
    }

    pub fn defaults() -> Config {
        let options = DashboardOptions::default();
        Config {
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            source: Some("mock".to_string()),
            refresh_interval_seconds: Some(options.refresh_interval.as_secs()),
            cache_ttl_ms: Some(options.cache_ttl.as_millis() as u64),
            max_retries: Some(options.retry.max_retries),
            timeout_ms: Some(options.retry.timeout_ms()),
            backoff_step_ms: Some(options.retry.backoff_step.as_millis() as u64),
            ..Default::default()
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// Orchestrator settings; anything unset falls back to the library defaults.
    ///
    /// # Errors
    /// Fails if the refresh interval is zero.
    pub fn dashboard_options(&self) -> anyhow::Result<DashboardOptions> {
        if self.refresh_interval_seconds == Some(0) {
            anyhow::bail!("refresh interval must be at least one second");
        }

        let defaults = DashboardOptions::default();
        let retry = RetryPolicy::new(
            self.max_retries.unwrap_or(defaults.retry.max_retries),
            self.timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.timeout),
        )
        .with_backoff_step(
            self.backoff_step_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.backoff_step),
        );

        Ok(DashboardOptions {
            refresh_interval: self
                .refresh_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_interval),
            cache_ttl: self
                .cache_ttl_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.cache_ttl),
            retry,
        })
    }

    pub fn source_kind(&self) -> anyhow::Result<SourceKind> {
        match self.source.as_deref().unwrap_or("mock") {
            "mock" => Ok(SourceKind::Mock),
            "http" => {
                let base_url = self
                    .base_url
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("the http source needs --base-url"))?;
                Ok(SourceKind::Http {
                    base_url,
                    auth_token: self.auth_token.clone(),
                })
            }
            other => anyhow::bail!("unknown data source '{}', expected 'mock' or 'http'", other),
        }
    }
}

pub fn load_config() -> Config {
    load_config_from(Config::parse())
}

/// Defaults, then the JSON config file, then environment variables and CLI
/// arguments (already folded into `cli` by clap).
///
/// Runs before logging is set up, so problems with the file go to stderr.
/// A missing file is not a problem.
pub fn load_config_from(cli: Config) -> Config {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();

    if config_file_path.exists() {
        match fs::read_to_string(&config_file_path) {
            Ok(config_str) => match serde_json::from_str::<Config>(&config_str) {
                Ok(file_config) => current_config = current_config.merge(file_config),
                Err(e) => eprintln!(
                    "Failed to parse config file {}: {}. Falling back to other sources.",
                    config_file_path.display(),
                    e
                ),
            },
            Err(e) => eprintln!(
                "Failed to read config file {}: {}. Falling back to other sources.",
                config_file_path.display(),
                e
            ),
        }
    }

    current_config.merge(cli)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(args: &[&str]) -> Config {
        let mut argv = vec!["server_dashboard"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_library_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.conf");
        let config = load_config_from(cli(&["--config-path", missing.to_str().unwrap()]));

        let options = config.dashboard_options().unwrap();
        assert_eq!(options.refresh_interval, Duration::from_secs(60));
        assert_eq!(options.cache_ttl, Duration::from_millis(300_000));
        assert_eq!(options.retry, RetryPolicy::default());
        assert_eq!(config.source_kind().unwrap(), SourceKind::Mock);
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn file_overrides_defaults_and_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"maxRetries": 5, "timeoutMs": 2000, "source": "http", "baseUrl": "http://file.example"}}"#
        )
        .unwrap();

        let config = load_config_from(cli(&[
            "--config-path",
            file.path().to_str().unwrap(),
            "--timeout-ms",
            "750",
        ]));

        let options = config.dashboard_options().unwrap();
        assert_eq!(options.retry.max_retries, 5);
        assert_eq!(options.retry.timeout, Duration::from_millis(750));
        assert_eq!(options.retry.backoff_step, Duration::from_millis(500));
        assert_eq!(
            config.source_kind().unwrap(),
            SourceKind::Http {
                base_url: "http://file.example".to_string(),
                auth_token: None
            }
        );
    }

    #[test]
    fn malformed_file_is_ignored() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let config = load_config_from(cli(&["--config-path", file.path().to_str().unwrap()]));

        assert_eq!(config.max_retries, Some(3));
    }

    #[test]
    fn zero_refresh_interval_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"refreshIntervalSeconds": 0}}"#).unwrap();

        let from_file = load_config_from(cli(&["--config-path", file.path().to_str().unwrap()]));
        assert!(from_file.dashboard_options().is_err());

        let from_cli = load_config_from(cli(&[
            "--config-path",
            file.path().to_str().unwrap(),
            "--refresh-interval-seconds",
            "0",
        ]));
        let err = from_cli.dashboard_options().unwrap_err();
        assert!(err.to_string().contains("refresh interval"), "{err}");

        let overridden = load_config_from(cli(&[
            "--config-path",
            file.path().to_str().unwrap(),
            "--refresh-interval-seconds",
            "5",
        ]));
        assert_eq!(
            overridden.dashboard_options().unwrap().refresh_interval,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn http_source_requires_base_url() {
        let config = Config {
            source: Some("http".to_string()),
            ..Config::defaults()
        };
        assert!(config.source_kind().is_err());

        let config = Config {
            source: Some("ftp".to_string()),
            ..Config::defaults()
        };
        assert!(config.source_kind().is_err());
    }
}
