//! Crawl settings.
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! command-line flags. The merged [`Settings`] are validated once into an
//! immutable [`CrawlConfig`] that the rest of the crawler borrows.
//!
//! ```yaml
//! base_url: https://news.example.com/category/local/
//! start_date: 2024-01-01
//! max_pages: 20
//! page_delay: { min_secs: 3.0, max_secs: 7.0 }
//! output:
//!   csv_path: out/local.csv
//!   json_path: out/local.json
//! ```

use crate::cli::Cli;
use crate::dates::DateWindow;
use crate::error::ConfigError;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Browser identities rotated across requests.
pub const DEFAULT_USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.110 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:96.0) Gecko/20100101 Firefox/96.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.45 Safari/537.36",
];

/// Uniform range of seconds to wait.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DelayRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl DelayRange {
    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        let ok = self.min_secs.is_finite()
            && self.max_secs.is_finite()
            && self.min_secs >= 0.0
            && self.min_secs <= self.max_secs;
        if ok {
            Ok(())
        } else {
            Err(ConfigError::Invalid {
                field,
                reason: format!("need 0 <= min_secs <= max_secs, got {:?}", self),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv_path: String,
    pub json_path: String,
    pub debug_html_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: "articles.csv".to_string(),
            json_path: "articles.json".to_string(),
            debug_html_path: Some("debug_html.html".to_string()),
        }
    }
}

/// Raw, possibly incomplete settings as read from file and flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_pages: u32,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    pub backoff_step_secs: u64,
    pub attempt_delay: DelayRange,
    pub page_delay: DelayRange,
    pub user_agents: Vec<String>,
    pub excerpt_max_chars: usize,
    pub min_title_chars: usize,
    pub min_generic_text_chars: usize,
    pub output: OutputConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: None,
            start_date: None,
            end_date: None,
            max_pages: 50,
            max_retries: 3,
            request_timeout_secs: 30,
            backoff_step_secs: 5,
            attempt_delay: DelayRange::new(1.0, 3.0),
            page_delay: DelayRange::new(3.0, 7.0),
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            excerpt_max_chars: 200,
            min_title_chars: 5,
            min_generic_text_chars: 100,
            output: OutputConfig::default(),
        }
    }
}

impl Settings {
    /// Read settings from a YAML file; keys left out keep their defaults.
    #[instrument(level = "info", skip_all, fields(%path))]
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(Path::new(path)).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Overlay any flags given on the command line.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.base_url {
            self.base_url = Some(url.clone());
        }
        if cli.start_date.is_some() {
            self.start_date = cli.start_date;
        }
        if cli.end_date.is_some() {
            self.end_date = cli.end_date;
        }
        if let Some(n) = cli.max_pages {
            self.max_pages = n;
        }
        if let Some(n) = cli.max_retries {
            self.max_retries = n;
        }
        if let Some(p) = &cli.csv_output {
            self.output.csv_path = p.clone();
        }
        if let Some(p) = &cli.json_output {
            self.output.json_path = p.clone();
        }
        if let Some(p) = &cli.debug_html {
            self.output.debug_html_path = Some(p.clone());
        }
    }

    /// Validate into a [`CrawlConfig`]. `today` fills a missing end date.
    pub fn resolve(self, today: NaiveDate) -> Result<CrawlConfig, ConfigError> {
        let raw_url = self.base_url.ok_or(ConfigError::MissingBaseUrl)?;
        let base_url = Url::parse(raw_url.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
            url: raw_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.host_str().is_none() {
            return Err(ConfigError::InvalidBaseUrl {
                url: raw_url,
                reason: "expected an http(s) URL with a host".to_string(),
            });
        }

        let start = self.start_date.ok_or(ConfigError::MissingStartDate)?;
        let end = self.end_date.unwrap_or(today);
        if start > end {
            return Err(ConfigError::Invalid {
                field: "start_date",
                reason: format!("{start} is after end date {end}"),
            });
        }
        if self.max_pages == 0 {
            return Err(invalid("max_pages", "must be at least 1"));
        }
        if self.max_retries == 0 {
            return Err(invalid("max_retries", "must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be at least 1"));
        }
        let user_agents: Vec<String> = self
            .user_agents
            .into_iter()
            .map(|ua| ua.trim().to_string())
            .filter(|ua| !ua.is_empty())
            .collect();
        if user_agents.is_empty() {
            return Err(invalid("user_agents", "pool must not be empty"));
        }
        if self.excerpt_max_chars < 4 {
            return Err(invalid("excerpt_max_chars", "must leave room for the truncation marker"));
        }
        self.attempt_delay.validate("attempt_delay")?;
        self.page_delay.validate("page_delay")?;

        let config = CrawlConfig {
            base_url,
            window: DateWindow::new(start, end),
            max_pages: self.max_pages,
            max_retries: self.max_retries,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            backoff_step: Duration::from_secs(self.backoff_step_secs),
            attempt_delay: self.attempt_delay,
            page_delay: self.page_delay,
            user_agents,
            excerpt_max_chars: self.excerpt_max_chars,
            min_title_chars: self.min_title_chars,
            min_generic_text_chars: self.min_generic_text_chars,
            output: self.output,
        };
        debug!(?config, "Resolved crawl configuration");
        Ok(config)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

/// Validated, immutable crawl configuration.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: Url,
    pub window: DateWindow,
    pub max_pages: u32,
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub backoff_step: Duration,
    pub attempt_delay: DelayRange,
    pub page_delay: DelayRange,
    pub user_agents: Vec<String>,
    pub excerpt_max_chars: usize,
    pub min_title_chars: usize,
    pub min_generic_text_chars: usize,
    pub output: OutputConfig,
}

impl CrawlConfig {
    /// Build the configuration for a run from the parsed command line.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut settings = match &cli.config {
            Some(path) => Settings::from_yaml_file(path)?,
            None => Settings::default(),
        };
        settings.apply_cli(cli);
        settings.resolve(Local::now().date_naive())
    }

    /// Configuration for `base_url` with every other setting at its default.
    #[cfg(test)]
    pub fn for_url(base_url: &str, window: DateWindow) -> Result<Self, ConfigError> {
        Settings {
            base_url: Some(base_url.to_string()),
            start_date: Some(window.start),
            end_date: Some(window.end),
            ..Settings::default()
        }
        .resolve(window.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn base_settings() -> Settings {
        Settings {
            base_url: Some("https://news.example.com/category/local/".to_string()),
            start_date: Some(ymd(2024, 1, 1)),
            ..Settings::default()
        }
    }

    #[test]
    fn test_defaults_resolve() {
        let config = base_settings().resolve(ymd(2024, 10, 1)).unwrap();
        assert_eq!(config.window, DateWindow::new(ymd(2024, 1, 1), ymd(2024, 10, 1)));
        assert_eq!(config.max_pages, 50);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.backoff_step, Duration::from_secs(5));
        assert_eq!(config.user_agents.len(), 4);
        assert_eq!(config.excerpt_max_chars, 200);
        assert_eq!(config.output.csv_path, "articles.csv");
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let yaml = r#"
base_url: https://news.example.com/archive/
start_date: 2024-03-01
end_date: 2024-03-31
max_pages: 7
page_delay:
  min_secs: 0.5
  max_secs: 1.5
output:
  csv_path: out/march.csv
"#;
        let settings = Settings::from_yaml_str(yaml).unwrap();
        let config = settings.resolve(ymd(2030, 1, 1)).unwrap();
        assert_eq!(config.base_url.as_str(), "https://news.example.com/archive/");
        assert_eq!(config.window.end, ymd(2024, 3, 31));
        assert_eq!(config.max_pages, 7);
        assert_eq!(config.page_delay, DelayRange::new(0.5, 1.5));
        assert_eq!(config.attempt_delay, DelayRange::new(1.0, 3.0));
        assert_eq!(config.output.csv_path, "out/march.csv");
        assert_eq!(config.output.json_path, "articles.json");
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut settings = Settings::from_yaml_str("max_pages: 7\nstart_date: 2024-03-01\n").unwrap();
        let cli = Cli {
            base_url: Some("https://other.example.com/".to_string()),
            max_pages: Some(2),
            ..Cli::default()
        };
        settings.apply_cli(&cli);
        let config = settings.resolve(ymd(2024, 4, 1)).unwrap();
        assert_eq!(config.max_pages, 2);
        assert_eq!(config.base_url.host_str(), Some("other.example.com"));
    }

    #[test]
    fn test_missing_required_settings() {
        let err = Settings::default().resolve(ymd(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingBaseUrl));

        let settings = Settings {
            base_url: Some("https://x.example.com/".into()),
            ..Settings::default()
        };
        let err = settings.resolve(ymd(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingStartDate));
    }

    #[test]
    fn test_rejects_bad_values() {
        let cases: Vec<(Settings, &str)> = vec![
            (
                Settings {
                    base_url: Some("ftp://files.example.com/".into()),
                    ..base_settings()
                },
                "base_url",
            ),
            (
                Settings {
                    end_date: Some(ymd(2023, 1, 1)),
                    ..base_settings()
                },
                "start_date",
            ),
            (Settings { max_pages: 0, ..base_settings() }, "max_pages"),
            (Settings { max_retries: 0, ..base_settings() }, "max_retries"),
            (
                Settings {
                    user_agents: vec!["  ".into()],
                    ..base_settings()
                },
                "user_agents",
            ),
            (
                Settings {
                    page_delay: DelayRange::new(5.0, 1.0),
                    ..base_settings()
                },
                "page_delay",
            ),
        ];
        for (settings, label) in cases {
            let res = settings.resolve(ymd(2024, 6, 1));
            assert!(res.is_err(), "expected {label} to be rejected");
        }
    }

    #[test]
    fn test_load_reads_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("crawl.yaml");
        std::fs::write(
            &path,
            "base_url: https://news.example.com/\nstart_date: 2024-01-01\nend_date: 2024-02-01\n",
        )
        .unwrap();
        let cli = Cli {
            config: Some(path.to_string_lossy().into_owned()),
            ..Cli::default()
        };
        let config = CrawlConfig::load(&cli).unwrap();
        assert_eq!(config.window.end, ymd(2024, 2, 1));
    }

    #[test]
    fn test_load_reports_unreadable_file() {
        let cli = Cli {
            config: Some("/definitely/not/here.yaml".to_string()),
            ..Cli::default()
        };
        assert!(matches!(CrawlConfig::load(&cli), Err(ConfigError::Read { .. })));
    }
}
