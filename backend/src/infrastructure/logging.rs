//! Process-wide tracing setup.
//!
//! Operators read compact lines on stderr. The daily file under `log_dir`
//! (`YYYY-MM-DD.log`, rotated at UTC midnight) holds one JSON object per
//! event so it can be shipped and queried without a parser.

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::AppConfig;

/// Full `EnvFilter` directives; replaces the configured level when set.
pub const LOG_FILTER_ENV: &str = "SMART_TASK_LOG";

const LOG_FILE_SUFFIX: &str = "log";

/// HTTP internals that flood debug output with connection chatter.
const NOISY_TARGETS: [&str; 4] = ["hyper", "h2", "reqwest", "rustls"];

/// Keeps the file writer alive; logs stop flushing once this is dropped.
pub struct LoggingRuntime {
    _guard: WorkerGuard,
    pub log_file: PathBuf,
    pub filter: String,
}

pub fn init_logging(config: &AppConfig) -> Result<LoggingRuntime> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("failed to create log dir: {}", config.log_dir.display()))?;
    let today = Utc::now().date_naive();
    let expired = LogRetention::new(config.log_retention_days).sweep(&config.log_dir, today)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(&config.log_dir)
        .with_context(|| format!("failed to open log file in {}", config.log_dir.display()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let env_override = std::env::var(LOG_FILTER_ENV).ok();
    let directives = filter_directives(env_override.as_deref(), &config.log_level);
    let filter = EnvFilter::try_new(&directives)
        .with_context(|| format!("invalid log filter {directives:?}"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    if !expired.is_empty() {
        tracing::info!(
            removed = expired.len(),
            log_dir = %config.log_dir.display(),
            "expired log files removed"
        );
    }

    Ok(LoggingRuntime {
        _guard: guard,
        log_file: config.log_dir.join(log_file_name(today)),
        filter: directives,
    })
}

/// An explicit override is used verbatim. At debug or trace the HTTP stack
/// is held at `warn` so request flow stays readable.
pub fn filter_directives(env_override: Option<&str>, level: &str) -> String {
    if let Some(raw) = env_override.map(str::trim).filter(|raw| !raw.is_empty()) {
        return raw.to_string();
    }
    let mut directives = vec![level.to_string()];
    if matches!(level, "debug" | "trace") {
        directives.extend(NOISY_TARGETS.iter().map(|target| format!("{target}=warn")));
    }
    directives.join(",")
}

/// Name the daily appender gives the file for `date`.
pub fn log_file_name(date: NaiveDate) -> String {
    format!("{}.{LOG_FILE_SUFFIX}", date.format("%Y-%m-%d"))
}

/// How many calendar days of log files survive a restart, today included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogRetention {
    keep_days: u16,
}

impl LogRetention {
    pub fn new(keep_days: u16) -> Self {
        Self {
            keep_days: keep_days.max(1),
        }
    }

    pub fn oldest_kept(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(u64::from(self.keep_days) - 1))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Only files named like our daily logs can expire.
    pub fn is_expired(&self, file_name: &str, today: NaiveDate) -> bool {
        dated_log(file_name).is_some_and(|date| date < self.oldest_kept(today))
    }

    /// Deletes expired files directly under `log_dir` and returns their paths.
    pub fn sweep(&self, log_dir: &Path, today: NaiveDate) -> Result<Vec<PathBuf>> {
        if !log_dir.exists() {
            return Ok(Vec::new());
        }

        let mut removed = Vec::new();
        for entry in std::fs::read_dir(log_dir)
            .with_context(|| format!("failed to read log dir: {}", log_dir.display()))?
        {
            let path = entry?.path();
            let expired = path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| self.is_expired(name, today));
            if expired {
                std::fs::remove_file(&path)
                    .with_context(|| format!("failed to remove expired log: {}", path.display()))?;
                removed.push(path);
            }
        }
        removed.sort();
        Ok(removed)
    }
}

fn dated_log(file_name: &str) -> Option<NaiveDate> {
    let stem = file_name.strip_suffix(LOG_FILE_SUFFIX)?.strip_suffix('.')?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}
