use crate::matcher::MatchMode;
use crate::model::OutputFormat;
use crate::{Error, Result};
use clap::ArgMatches;
use std::path::PathBuf;
use std::time::Duration;

// region:        --- Constants

pub const DEFAULT_FINGERPRINTS_PATH: &str = "fingerprints.json";
pub const DEFAULT_CONCURRENCY: i64 = 20;
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 10;

// endregion:     --- Constants

#[derive(Debug, Clone)]
pub struct Config {
    pub targets: PathBuf,
    pub fingerprints: PathBuf,
    /// Signed on purpose, see `Config::concurrency`.
    pub concurrency: i64,
    /// `None` writes to stdout.
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub timeout: Duration,
    pub https: bool,
    /// Skips TLS certificate checks, off by default.
    pub accept_invalid_certs: bool,
    pub match_mode: MatchMode,
    pub accept_any_status: bool,
    pub vulnerable_only: bool,
    pub save_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets: PathBuf::new(),
            fingerprints: PathBuf::from(DEFAULT_FINGERPRINTS_PATH),
            concurrency: DEFAULT_CONCURRENCY,
            output: None,
            format: OutputFormat::Txt,
            timeout: Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
            https: false,
            accept_invalid_certs: false,
            match_mode: MatchMode::Any,
            accept_any_status: false,
            vulnerable_only: false,
            save_logs: false,
        }
    }
}

impl Config {
    /// Number of workers, never below 1.
    pub fn concurrency(&self) -> usize {
        worker_count(self.concurrency)
    }

    pub fn scheme(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }

    /// Builds the config of the `scan` subcommand.
    pub fn from_scan_args(args: &ArgMatches) -> Result<Self> {
        let targets = args
            .get_one::<String>("targets")
            .map(PathBuf::from)
            .ok_or_else(|| Error::CliUsage("missing targets file".into()))?;

        let format = args
            .get_one::<String>("format")
            .map(|name| {
                OutputFormat::from_name(name)
                    .ok_or_else(|| Error::CliUsage(format!("unknown format {:?}", name)))
            })
            .transpose()?
            .unwrap_or_default();

        let match_mode = args
            .get_one::<String>("match-mode")
            .map(|name| {
                MatchMode::from_name(name)
                    .ok_or_else(|| Error::CliUsage(format!("unknown match mode {:?}", name)))
            })
            .transpose()?
            .unwrap_or_default();

        let defaults = Config::default();
        Ok(Self {
            targets,
            fingerprints: fingerprints_path(args),
            concurrency: args
                .get_one::<i64>("concurrency")
                .copied()
                .unwrap_or(defaults.concurrency),
            output: args
                .get_one::<String>("output")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            format,
            timeout: args
                .get_one::<u64>("timeout")
                .map(|secs| Duration::from_secs(*secs))
                .unwrap_or(defaults.timeout),
            https: args.get_flag("https"),
            accept_invalid_certs: args.get_flag("insecure"),
            match_mode,
            accept_any_status: args.get_flag("all-status"),
            vulnerable_only: args.get_flag("vulnerable-only"),
            save_logs: args.get_flag("logs"),
        })
    }
}

pub fn fingerprints_path(args: &ArgMatches) -> PathBuf {
    args.get_one::<String>("fingerprints")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FINGERPRINTS_PATH))
}

pub fn worker_count(concurrency: i64) -> usize {
    usize::try_from(concurrency).unwrap_or(0).max(1)
}
