use crate::error::{Result, ReviewError};
use crate::models::{CaseRow, CaseSummary, CheckFailure, CheckResult, Migration, PlayerRecord, Registration};
use crate::parsers;
use crate::session::Session;
use crate::transport::Transport;
use reqwest::Url;
use serde_json::{json, Value};
use std::net::IpAddr;
use tracing::{debug, warn};

/// Operation tag of the API call that compares an IP with a player's history.
pub const CHECK_PLAYER_OPERATION: &str = "user/admin/check_player";

pub struct KogClient<T: Transport> {
    session: Session<T>,
}

impl<T: Transport> KogClient<T> {
    pub fn new(session: Session<T>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    fn url_with_query(&self, path: &str, key: &str, value: &str) -> Result<String> {
        let base = format!("{}{}", self.session.base_url(), path);
        let url = Url::parse_with_params(&base, &[(key, value)])
            .map_err(|e| ReviewError::Config(format!("bad url {}: {}", base, e)))?;
        Ok(url.to_string())
    }

    /// Fetches a migration case and parses its summary and name rows.
    pub async fn fetch_case(&mut self, reference: &str) -> Result<(CaseSummary, Vec<CaseRow>)> {
        let url = self.url_with_query("/player_migration.php", "ref", reference)?;
        let response = self.session.get(&url).await?;
        parsers::case::parse_case_page(&response.body)
    }

    async fn player_page(&mut self, name: &str) -> CheckResult<String> {
        let url = self
            .url_with_query("/player_edit.php", "player", name)
            .map_err(|e| CheckFailure::transport(e.to_string()))?;
        self.session
            .get(&url)
            .await
            .map(|response| response.body)
            .map_err(|e| CheckFailure::transport(e.to_string()))
    }

    pub async fn check_registration(&mut self, name: &str) -> CheckResult<Registration> {
        let html = self.player_page(name).await?;
        Ok(parsers::player::parse_registration(&html))
    }

    pub async fn check_migration_status(&mut self, name: &str) -> CheckResult<Migration> {
        let html = self.player_page(name).await?;
        parsers::player::parse_migration(&html)
    }

    /// Percentage of similarity between `ip` and the IPs `name` has played
    /// from. Failures are logged and reported as `None`.
    pub async fn check_ip_match(&mut self, name: &str, ip: IpAddr) -> Option<u8> {
        match self.request_ip_match(name, ip).await {
            Ok(body) => {
                let percentage = parsers::api::extract_percentage(&body);
                if percentage.is_none() {
                    debug!("No usable match percentage for {} in {}", name, body);
                }
                percentage
            }
            Err(e) => {
                warn!("ERROR checking IP for {}: {}", name, e);
                None
            }
        }
    }

    async fn request_ip_match(&mut self, name: &str, ip: IpAddr) -> Result<Value> {
        let url = format!("{}/api.php?automated=1", self.session.base_url());
        let payload = json!({
            "type": CHECK_PLAYER_OPERATION,
            "data": { "playername": name, "playerip": ip.to_string() }
        });
        let headers = vec![("Content-Type".to_string(), "application/json".to_string())];

        let response = self.session.post(&url, payload, headers).await?;
        response.json()
    }

    /// Runs every check on one case row. The IP is only compared for
    /// registered names.
    pub async fn review_player(&mut self, row: &CaseRow, ip: Option<IpAddr>) -> PlayerRecord {
        let status = self.check_registration(&row.name).await;
        let migration = self.check_migration_status(&row.name).await;

        let match_percentage = match ip {
            Some(ip) if status == Ok(Registration::Registered) => {
                self.check_ip_match(&row.name, ip).await
            }
            _ => None,
        };

        PlayerRecord {
            name: row.name.clone(),
            finishes: row.finishes.clone(),
            status,
            migration,
            match_percentage,
        }
    }
}
