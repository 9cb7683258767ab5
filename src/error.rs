use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Request to KoG failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Connection-level failure reported by a non-reqwest transport.
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("{status} returned for {url}")]
    Status { status: u16, url: String },

    #[error("Invalid page structure - {0}")]
    PageStructure(String),

    #[error("Failed to parse HTML: {0}")]
    ParsingError(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser automation failed: {0}")]
    WebDriver(String),

    #[error("no validated login was obtained")]
    AuthenticationFailed,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ReviewError {
    /// Whether a request that failed with this error may be sent again as-is.
    pub fn is_transient(&self) -> bool {
        match self {
            ReviewError::RequestError(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ReviewError::Transport(_) => true,
            _ => false,
        }
    }
}

impl From<thirtyfour::error::WebDriverError> for ReviewError {
    fn from(e: thirtyfour::error::WebDriverError) -> Self {
        ReviewError::WebDriver(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
