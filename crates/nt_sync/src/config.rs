use nt_core::{Error, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(45);
pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const DEFAULT_PLACEHOLDER: &str = "/placeholder.svg";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Static sync settings. Nothing here is negotiated with the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub backend_url: String,
    pub poll_interval: Duration,
    pub batch_size: usize,
    pub page_size: usize,
    pub placeholder: String,
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: nt_storage::view::DEFAULT_PAGE_SIZE,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl SyncConfig {
    /// Defaults overridden by `NT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup("NT_BACKEND_URL") {
            config.backend_url = url;
        }
        if let Some(interval) = lookup("NT_POLL_INTERVAL") {
            config.poll_interval = parse_duration(&interval)?;
        }
        if let Some(size) = lookup("NT_BATCH_SIZE") {
            config.batch_size = parse_count("NT_BATCH_SIZE", &size)?;
        }
        if let Some(size) = lookup("NT_PAGE_SIZE") {
            config.page_size = parse_count("NT_PAGE_SIZE", &size)?;
        }
        if let Some(placeholder) = lookup("NT_PLACEHOLDER") {
            config.placeholder = placeholder;
        }
        if let Some(timeout) = lookup("NT_REQUEST_TIMEOUT") {
            config.request_timeout = parse_duration(&timeout)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.backend_url)
            .map_err(|e| Error::Config(format!("backend url {:?}: {}", self.backend_url, e)))?;
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be greater than zero".to_string()));
        }
        if self.batch_size == 0 || self.page_size == 0 {
            return Err(Error::Config("batch and page sizes must be greater than zero".to_string()));
        }
        Ok(())
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a positive number, got {:?}", key, value)))
}

/// Parses human durations such as `45s`, `1m30s` or `2h`. A bare number is seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let mut total_seconds = 0u64;
    let mut current_number = String::new();
    let mut has_value = false;

    for c in s.chars() {
        if c.is_ascii_digit() {
            current_number.push(c);
        } else if let Ok(num) = current_number.parse::<u64>() {
            let unit = match c {
                's' => 1,
                'm' => 60,
                'h' => 3600,
                'd' => 86400,
                _ => return Err(Error::Config(format!("Invalid duration unit: {}", c))),
            };
            total_seconds = add_seconds(total_seconds, num, unit)?;
            current_number.clear();
            has_value = true;
        } else if !c.is_whitespace() {
            return Err(Error::Config(format!("Invalid character in duration: {}", c)));
        }
    }

    if !current_number.is_empty() {
        let num = current_number
            .parse::<u64>()
            .map_err(|_| Error::Config("Invalid number in duration".to_string()))?;
        total_seconds = add_seconds(total_seconds, num, 1)?;
        has_value = true;
    }

    if !has_value {
        return Err(Error::Config("Duration must include a number".to_string()));
    }

    Ok(Duration::from_secs(total_seconds))
}

fn add_seconds(total: u64, num: u64, unit: u64) -> Result<u64> {
    num.checked_mul(unit)
        .and_then(|seconds| total.checked_add(seconds))
        .ok_or_else(|| Error::Config("duration out of range".to_string()))
}
