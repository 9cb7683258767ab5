// Declare all our modules
mod client;
mod config;
mod cookies;
mod error;
mod login;
mod models;
pub mod parsers;
mod review;
mod session;
mod transport;

// Publicly export the parts of our library that users will need
pub use client::{KogClient, CHECK_PLAYER_OPERATION};
pub use config::{RetryPolicy, ReviewConfig, RETRY_STATUSES};
pub use cookies::{CookieFile, CookieSet, SESSION_COOKIE_NAMES};
pub use error::{Result, ReviewError};
pub use login::{poll_for_credential, BrowserLogin, CookieProbe, CredentialProvider};
pub use models::*;
pub use review::{build_message, listed_names, registered_only, render_table, TableLayout};
pub use session::{Session, SESSION_MARKER};
pub use transport::{
    parse_retry_after, HttpRequest, HttpResponse, Method, ReqwestTransport, RetryingTransport,
    Transport,
};
