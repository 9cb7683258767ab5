// tests/common/mod.rs
//
// In-memory stand-in for the network, shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use kog_review::{
    CookieSet, HttpRequest, HttpResponse, KogClient, Result, ReviewConfig, ReviewError, Session,
    Transport,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

pub const BASE_URL: &str = "https://kog.test";

/// A request as the fake received it, with the (tokio) time it arrived.
#[derive(Debug, Clone)]
pub struct Sent {
    pub request: HttpRequest,
    pub at: Instant,
}

type Handler = Box<dyn Fn(&HttpRequest, &CookieSet) -> Result<HttpResponse> + Send + Sync>;

pub struct FakeTransport {
    handler: Handler,
    sent: Mutex<Vec<Sent>>,
    cookies: Mutex<CookieSet>,
}

impl FakeTransport {
    /// Answers every request with `handler(request, adopted cookies)`.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest, &CookieSet) -> Result<HttpResponse> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            sent: Mutex::new(Vec::new()),
            cookies: Mutex::new(CookieSet::new()),
        }
    }

    /// Answers requests with `responses`, in order.
    pub fn scripted(responses: Vec<Result<HttpResponse>>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::new(move |request, _| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected request to {}", request.url))
        })
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn cookies(&self) -> CookieSet {
        self.cookies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.sent.lock().unwrap().push(Sent {
            request: request.clone(),
            at: Instant::now(),
        });
        let cookies = self.cookies();
        (self.handler)(request, &cookies)
    }

    fn adopt_cookies(&self, cookies: &CookieSet) {
        let mut jar = self.cookies.lock().unwrap();
        for (name, value) in cookies.iter() {
            jar.insert(name, value);
        }
    }
}

pub fn ok(body: &str) -> HttpResponse {
    HttpResponse {
        status: 200,
        retry_after: None,
        body: body.to_string(),
    }
}

pub fn status(code: u16, retry_after: Option<&str>) -> HttpResponse {
    HttpResponse {
        status: code,
        retry_after: retry_after.map(str::to_string),
        body: String::new(),
    }
}

pub fn connection_reset() -> ReviewError {
    ReviewError::Transport("connection reset by peer".to_string())
}

pub fn test_config() -> ReviewConfig {
    ReviewConfig {
        base_url: BASE_URL.to_string(),
        ..Default::default()
    }
}

pub fn session(transport: FakeTransport) -> Session<FakeTransport> {
    Session::new(transport, &test_config())
}

pub fn client(transport: FakeTransport) -> KogClient<FakeTransport> {
    KogClient::new(session(transport))
}

pub const LOGGED_IN_PAGE: &str = r#"<html><body><form>
<input type="email" name="inputEmail" value="">
</form></body></html>"#;

pub const LOGIN_PAGE: &str = r#"<html><body><a href="/login">Log in</a></body></html>"#;
