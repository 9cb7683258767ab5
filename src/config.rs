use crate::error::{Result, ReviewError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// HTTP statuses the transport layer treats as transient.
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Transport-level retry behaviour, applied to every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// How many times a request is re-sent after the first attempt.
    pub max_retries: u32,
    /// Base of the exponential backoff. The first retry is immediate.
    pub backoff_factor: Duration,
    /// Upper bound for a single computed backoff.
    pub backoff_max: Duration,
    /// Random extra delay added on top of each backoff, `0` disables it.
    pub jitter: Duration,
    /// Statuses that trigger a retry.
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    /// Five retries, 1.5s factor, capped at two minutes, no jitter.
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_factor: Duration::from_millis(1500),
            backoff_max: Duration::from_secs(120),
            jitter: Duration::ZERO,
            retry_statuses: RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// Backoff to wait before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry - 1);
        self.backoff_factor
            .checked_mul(factor)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }
}

/// Everything the review tool needs to know about where and how to talk to KoG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Root of the portal, without a trailing slash.
    pub base_url: String,
    /// JSON file holding the authentication cookies between runs.
    pub cookies_file: PathBuf,
    /// Minimum gap between the end of one request and the start of the next.
    pub min_request_interval: Duration,
    /// Timeout applied to each individual HTTP request.
    pub request_timeout: Duration,
    /// Wait used when a 429 carries no usable `Retry-After`.
    pub rate_limit_fallback: Duration,
    pub user_agent: String,
    /// ChromeDriver endpoint used for the interactive login.
    pub webdriver_url: String,
    pub login_poll_interval: Duration,
    pub login_max_polls: u32,
    /// How long the clipboard contents are held open before the process exits.
    pub clipboard_hold: Duration,
    pub retry: RetryPolicy,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            base_url: "https://kog.tw".to_string(),
            cookies_file: PathBuf::from("cookies.json"),
            min_request_interval: Duration::from_millis(1200),
            request_timeout: Duration::from_secs(20),
            rate_limit_fallback: Duration::from_secs(5),
            user_agent: "KoGTool/1.0".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            login_poll_interval: Duration::from_secs(3),
            login_max_polls: 200,
            clipboard_hold: Duration::from_secs(15),
            retry: RetryPolicy::default(),
        }
    }
}

impl ReviewConfig {
    /// Defaults overridden by `KOG_*` environment variables, with `.env` loaded first.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        if let Ok(url) = env::var("KOG_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(path) = env::var("KOG_COOKIES_FILE") {
            config.cookies_file = PathBuf::from(path);
        }
        if let Ok(url) = env::var("KOG_WEBDRIVER_URL") {
            config.webdriver_url = url;
        }
        if let Some(ms) = parse_var::<u64>("KOG_MIN_REQUEST_INTERVAL_MS")? {
            config.min_request_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>("KOG_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("KOG_LOGIN_POLL_SECS")? {
            config.login_poll_interval = Duration::from_secs(secs);
        }
        if let Some(polls) = parse_var::<u32>("KOG_LOGIN_MAX_POLLS")? {
            config.login_max_polls = polls;
        }
        if let Some(ms) = parse_var::<u64>("KOG_RETRY_JITTER_MS")? {
            config.retry.jitter = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>("KOG_CLIPBOARD_HOLD_SECS")? {
            config.clipboard_hold = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ReviewError::Config(format!("{} is not a valid number: {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}
