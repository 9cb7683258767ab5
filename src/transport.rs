use crate::config::{RetryPolicy, ReviewConfig};
use crate::cookies::CookieSet;
use crate::error::{Result, ReviewError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request as the session issues it. Retries re-send the exact same value.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub json: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            json: None,
            headers: Vec::new(),
        }
    }

    pub fn post_json(url: impl Into<String>, json: Value, headers: Vec<(String, String)>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            json: Some(json),
            headers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Retry-After` header, if the server sent one.
    pub retry_after: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Sends requests and owns the cookie jar they carry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;

    /// Makes `cookies` part of every following request.
    fn adopt_cookies(&self, cookies: &CookieSet);
}

/// [`Transport`] backed by a cookie-keeping `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    jar: Arc<Jar>,
    cookie_url: Url,
}

impl ReqwestTransport {
    pub fn new(config: &ReviewConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| ReviewError::Config(format!("user agent: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        let cookie_url = Url::parse(&config.base_url)
            .map_err(|e| ReviewError::Config(format!("base url {:?}: {}", config.base_url, e)))?;

        Ok(Self {
            client,
            jar,
            cookie_url,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(json) = &request.json {
            builder = builder.json(json);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }

    fn adopt_cookies(&self, cookies: &CookieSet) {
        for (name, value) in cookies.iter() {
            self.jar
                .add_cookie_str(&format!("{}={}; Path=/", name, value), &self.cookie_url);
        }
    }
}

/// Wraps a transport with exponential-backoff retries on transient failures.
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn jitter(&self) -> Duration {
        let max = self.policy.jitter.as_millis() as u64;
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max))
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryingTransport<T> {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut retry = 0;
        loop {
            let outcome = self.inner.execute(request).await;

            // Some(server-requested wait) when the attempt should be repeated
            let retry_wait = match &outcome {
                Ok(response) if self.policy.should_retry_status(response.status) => Some(
                    response
                        .retry_after
                        .as_deref()
                        .and_then(parse_retry_after),
                ),
                Err(e) if e.is_transient() => Some(None),
                _ => None,
            };
            let Some(server_wait) = retry_wait else {
                return outcome;
            };

            if retry >= self.policy.max_retries {
                warn!(
                    "Giving up on {} after {} retries",
                    request.url, self.policy.max_retries
                );
                return outcome;
            }
            retry += 1;

            let wait = server_wait.unwrap_or_else(|| self.policy.backoff(retry)) + self.jitter();
            match &outcome {
                Ok(response) => warn!(
                    "{} returned {}, retry {}/{} in {}ms",
                    request.url,
                    response.status,
                    retry,
                    self.policy.max_retries,
                    wait.as_millis()
                ),
                Err(e) => warn!(
                    "Request to {} failed ({}), retry {}/{} in {}ms",
                    request.url,
                    e,
                    retry,
                    self.policy.max_retries,
                    wait.as_millis()
                ),
            }
            sleep(wait).await;
            debug!("Retrying {}", request.url);
        }
    }

    fn adopt_cookies(&self, cookies: &CookieSet) {
        self.inner.adopt_cookies(cookies);
    }
}

/// Parses a `Retry-After` value given as delta-seconds or as an HTTP-date.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = at.with_timezone(&Utc) - Utc::now();
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}
