use crate::config::ReviewConfig;
use crate::cookies::{CookieFile, CookieSet};
use crate::error::{Result, ReviewError};
use crate::login::{CookieProbe, CredentialProvider};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

/// Only present on the player edit page when the session is logged in.
pub const SESSION_MARKER: &str = "inputEmail";

/// Keeps a minimum gap between the end of one request and the start of the next.
struct RequestPacer {
    min_interval: Duration,
    last_request_end: Option<Instant>,
}

impl RequestPacer {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request_end: None,
        }
    }

    async fn acquire(&self) {
        let Some(last) = self.last_request_end else {
            return;
        };
        let ready_at = last + self.min_interval;
        if ready_at > Instant::now() {
            debug!(
                "Rate limiting: waiting {}ms",
                (ready_at - Instant::now()).as_millis()
            );
            sleep_until(ready_at).await;
        }
    }

    fn mark(&mut self) {
        self.last_request_end = Some(Instant::now());
    }
}

/// Authenticated, rate-limited access to the portal.
pub struct Session<T: Transport> {
    transport: T,
    pacer: RequestPacer,
    base_url: String,
    rate_limit_fallback: Duration,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, config: &ReviewConfig) -> Self {
        Self {
            transport,
            pacer: RequestPacer::new(config.min_request_interval),
            base_url: config.base_url.clone(),
            rate_limit_fallback: config.rate_limit_fallback,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&mut self, url: &str) -> Result<HttpResponse> {
        self.send(HttpRequest::get(url)).await
    }

    pub async fn post(
        &mut self,
        url: &str,
        json: Value,
        headers: Vec<(String, String)>,
    ) -> Result<HttpResponse> {
        self.send(HttpRequest::post_json(url, json, headers)).await
    }

    async fn send(&mut self, request: HttpRequest) -> Result<HttpResponse> {
        let mut response = self.dispatch(&request).await?;

        // The transport already retried; the portal still answers 429 in bursts.
        if response.status == 429 {
            let delay = response
                .retry_after
                .as_deref()
                .and_then(delta_seconds)
                .unwrap_or(self.rate_limit_fallback);
            warn!(
                "Rate limited on {}, retrying once in {}s",
                request.url,
                delay.as_secs_f32()
            );
            sleep(delay).await;
            response = self.dispatch(&request).await?;
        }

        if !response.is_success() {
            return Err(ReviewError::Status {
                status: response.status,
                url: request.url,
            });
        }
        Ok(response)
    }

    async fn dispatch(&mut self, request: &HttpRequest) -> Result<HttpResponse> {
        self.pacer.acquire().await;
        let outcome = self.transport.execute(request).await;
        self.pacer.mark();
        outcome
    }

    /// Adopts the cookies stored in `file`. Returns whether any were loaded.
    pub async fn load_cookies(&self, file: &CookieFile) -> Result<bool> {
        match file.load().await? {
            Some(cookies) if !cookies.is_empty() => {
                debug!("Loaded {} cookies from {}", cookies.len(), file.path().display());
                self.transport.adopt_cookies(&cookies);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn save_cookies(&self, file: &CookieFile, cookies: &CookieSet) -> Result<()> {
        file.save(cookies).await?;
        debug!("Saved {} cookies to {}", cookies.len(), file.path().display());
        Ok(())
    }

    /// Probes the player edit page, which only logged-in sessions can see.
    pub async fn is_session_valid(&mut self) -> bool {
        let url = format!("{}/player_edit.php?player=", self.base_url);
        match self.get(&url).await {
            Ok(response) => response.status == 200 && response.body.contains(SESSION_MARKER),
            Err(e) => {
                debug!("Session probe failed: {}", e);
                false
            }
        }
    }

    /// Reuses the cached cookies when they still work, otherwise asks `provider`
    /// for a fresh login and caches the result.
    pub async fn authenticate(
        &mut self,
        file: &CookieFile,
        provider: &mut dyn CredentialProvider,
    ) -> Result<()> {
        match self.load_cookies(file).await {
            Ok(true) => {
                if self.is_session_valid().await {
                    info!("Session valid from saved cookies");
                    return Ok(());
                }
            }
            Ok(false) => {}
            Err(e) => warn!("Ignoring unreadable {}: {}", file.path().display(), e),
        }

        info!("Saved cookies invalid or missing, starting interactive login");
        let Some(cookies) = provider.obtain_fresh_credential(self).await? else {
            return Err(ReviewError::AuthenticationFailed);
        };

        self.transport.adopt_cookies(&cookies);
        self.save_cookies(file, &cookies).await?;
        info!("Login successful, cookies saved");
        Ok(())
    }
}

#[async_trait]
impl<T: Transport> CookieProbe for Session<T> {
    /// Candidates go straight into the live jar. A rejected set is harmless
    /// because every candidate carries the same session cookie names, so the
    /// next adoption overwrites it; only the accepted set is ever saved.
    async fn probe_cookies(&mut self, cookies: &CookieSet) -> bool {
        self.transport.adopt_cookies(cookies);
        self.is_session_valid().await
    }
}

/// `Retry-After` in whole seconds; HTTP-dates are not honoured at this level.
fn delta_seconds(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok().map(Duration::from_secs)
}
