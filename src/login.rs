use crate::config::ReviewConfig;
use crate::cookies::CookieSet;
use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thirtyfour::prelude::*;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Checks whether a cookie set grants a logged-in session.
#[async_trait]
pub trait CookieProbe: Send {
    async fn probe_cookies(&mut self, cookies: &CookieSet) -> bool;
}

/// Source of a fresh, already validated set of session cookies.
#[async_trait]
pub trait CredentialProvider: Send {
    /// `Ok(None)` when the user never completed a login.
    async fn obtain_fresh_credential(
        &mut self,
        probe: &mut dyn CookieProbe,
    ) -> Result<Option<CookieSet>>;
}

/// Reads cookies every `interval`, at most `max_polls` times, and returns the
/// first non-empty set that `probe` accepts.
pub async fn poll_for_credential<F, Fut>(
    mut read_cookies: F,
    probe: &mut dyn CookieProbe,
    interval: Duration,
    max_polls: u32,
) -> Result<Option<CookieSet>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<CookieSet>>,
{
    for poll in 1..=max_polls {
        sleep(interval).await;

        let cookies = read_cookies().await?;
        if cookies.is_empty() {
            debug!("Poll {}/{}: no session cookies yet", poll, max_polls);
            continue;
        }
        if probe.probe_cookies(&cookies).await {
            info!("Login detected after {} polls", poll);
            return Ok(Some(cookies));
        }
        debug!("Poll {}/{}: cookies not accepted yet", poll, max_polls);
    }

    warn!("Timeout waiting for login after {} polls", max_polls);
    Ok(None)
}

/// Opens Chrome through a local ChromeDriver and waits for the user to log in.
pub struct BrowserLogin {
    webdriver_url: String,
    start_url: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl BrowserLogin {
    pub fn new(config: &ReviewConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            start_url: config.base_url.clone(),
            poll_interval: config.login_poll_interval,
            max_polls: config.login_max_polls,
        }
    }
}

#[async_trait]
impl CredentialProvider for BrowserLogin {
    async fn obtain_fresh_credential(
        &mut self,
        probe: &mut dyn CookieProbe,
    ) -> Result<Option<CookieSet>> {
        let mut caps = DesiredCapabilities::chrome();
        caps.add_chrome_option(
            "args",
            vec![
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--disable-gpu",
                "--window-size=1920,1080",
            ],
        )?;

        let driver = WebDriver::new(self.webdriver_url.as_str(), caps).await?;

        // The browser is closed whatever happens below
        let result: Result<Option<CookieSet>> = async {
            driver.goto(self.start_url.as_str()).await?;
            println!("Browser opened. Please log in...");

            let driver_ref = &driver;
            poll_for_credential(
                move || async move {
                    let cookies = driver_ref.get_all_cookies().await?;
                    Ok(CookieSet::session_only(
                        cookies
                            .iter()
                            .map(|c| (c.name().to_string(), c.value().to_string())),
                    ))
                },
                probe,
                self.poll_interval,
                self.max_polls,
            )
            .await
        }
        .await;

        if let Err(e) = driver.quit().await {
            warn!("Failed to quit browser: {}", e);
        }

        result
    }
}
