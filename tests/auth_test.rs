// tests/auth_test.rs

mod common;

use async_trait::async_trait;
use common::{ok, session, status, FakeTransport, LOGGED_IN_PAGE, LOGIN_PAGE};
use kog_review::{
    poll_for_credential, CookieFile, CookieProbe, CookieSet, CredentialProvider, HttpRequest,
    HttpResponse, Result, ReviewError, Transport,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// The portal as seen by the session: logged in iff PHPSESSID is "good".
fn portal(_: &HttpRequest, cookies: &CookieSet) -> Result<HttpResponse> {
    if cookies.get("PHPSESSID") == Some("good") {
        Ok(ok(LOGGED_IN_PAGE))
    } else {
        Ok(ok(LOGIN_PAGE))
    }
}

fn cookies(sessid: &str) -> CookieSet {
    [("PHPSESSID", sessid), ("cf_clearance", "cf")].into_iter().collect()
}

/// Hands out one fixed cookie set, if the probe accepts it.
struct FixedProvider {
    offered: Option<CookieSet>,
    calls: u32,
}

#[async_trait]
impl CredentialProvider for FixedProvider {
    async fn obtain_fresh_credential(
        &mut self,
        probe: &mut dyn CookieProbe,
    ) -> Result<Option<CookieSet>> {
        self.calls += 1;
        let Some(set) = self.offered.clone() else {
            return Ok(None);
        };
        if probe.probe_cookies(&set).await {
            Ok(Some(set))
        } else {
            Ok(None)
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_session_validity_probe() -> Result<()> {
    let mut logged_out = session(FakeTransport::new(portal));
    assert!(!logged_out.is_session_valid().await);

    logged_out.transport().adopt_cookies(&cookies("good"));
    assert!(logged_out.is_session_valid().await);

    let sent = logged_out.transport().sent();
    assert!(sent[0].request.url.ends_with("/player_edit.php?player="));

    let mut failing = session(FakeTransport::scripted(vec![Ok(status(403, None))]));
    assert!(!failing.is_session_valid().await);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_saved_cookies_are_loaded_into_session() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = CookieFile::new(dir.path().join("cookies.json"));
    let session = session(FakeTransport::new(portal));

    assert!(!session.load_cookies(&file).await?, "missing file loads nothing");

    session.save_cookies(&file, &cookies("good")).await?;
    let on_disk: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(file.path())?)?;
    assert_eq!(on_disk["PHPSESSID"], "good");

    assert!(session.load_cookies(&file).await?);
    assert_eq!(session.transport().cookies(), cookies("good"));

    std::fs::write(file.path(), "{}")?;
    assert!(!session.load_cookies(&file).await?, "empty map loads nothing");

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_valid_cached_cookies_skip_interactive_login() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = CookieFile::new(dir.path().join("cookies.json"));
    file.save(&cookies("good")).await?;

    let mut session = session(FakeTransport::new(portal));
    let mut provider = FixedProvider {
        offered: None,
        calls: 0,
    };

    session.authenticate(&file, &mut provider).await?;
    assert_eq!(provider.calls, 0);

    println!("✅ Cached cookies reused");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_invalid_cached_cookies_fall_back_to_provider() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = CookieFile::new(dir.path().join("cookies.json"));
    file.save(&cookies("stale")).await?;

    let mut session = session(FakeTransport::new(portal));
    let mut provider = FixedProvider {
        offered: Some(cookies("good")),
        calls: 0,
    };

    session.authenticate(&file, &mut provider).await?;
    assert_eq!(provider.calls, 1);
    assert!(session.is_session_valid().await);
    assert_eq!(file.load().await?, Some(cookies("good")));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_cookie_file_falls_back_to_provider() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = CookieFile::new(dir.path().join("cookies.json"));
    std::fs::write(file.path(), "not json")?;

    let mut session = session(FakeTransport::new(portal));
    let mut provider = FixedProvider {
        offered: Some(cookies("good")),
        calls: 0,
    };

    session.authenticate(&file, &mut provider).await?;
    assert_eq!(provider.calls, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_authentication_fails_without_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let file = CookieFile::new(dir.path().join("cookies.json"));

    let mut session = session(FakeTransport::new(portal));
    let mut provider = FixedProvider {
        offered: Some(cookies("wrong")),
        calls: 0,
    };

    let result = session.authenticate(&file, &mut provider).await;
    assert!(matches!(result, Err(ReviewError::AuthenticationFailed)));
    assert!(!file.path().exists(), "rejected cookies must not be cached");
}

/// Accepts any set whose PHPSESSID is "good".
struct AcceptGood;

#[async_trait]
impl CookieProbe for AcceptGood {
    async fn probe_cookies(&mut self, cookies: &CookieSet) -> bool {
        cookies.get("PHPSESSID") == Some("good")
    }
}

#[tokio::test(start_paused = true)]
async fn test_polling_adopts_first_validated_cookies() -> Result<()> {
    let reads = AtomicU32::new(0);
    let start = Instant::now();

    let found = poll_for_credential(
        || {
            let n = reads.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok(match n {
                    0 => CookieSet::new(),
                    1 => cookies("not-yet"),
                    _ => cookies("good"),
                })
            }
        },
        &mut AcceptGood,
        Duration::from_secs(3),
        200,
    )
    .await?;

    assert_eq!(found, Some(cookies("good")));
    assert_eq!(reads.load(Ordering::SeqCst), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(9));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_polling_gives_up_after_budget() -> Result<()> {
    let reads = AtomicU32::new(0);
    let start = Instant::now();

    let found = poll_for_credential(
        || {
            reads.fetch_add(1, Ordering::SeqCst);
            async { Ok(CookieSet::new()) }
        },
        &mut AcceptGood,
        Duration::from_secs(3),
        5,
    )
    .await?;

    assert_eq!(found, None);
    assert_eq!(reads.load(Ordering::SeqCst), 5);
    assert_eq!(start.elapsed(), Duration::from_secs(15));
    Ok(())
}

#[test]
fn test_only_session_cookies_are_kept() {
    let browser = vec![
        ("PHPSESSID", "abc"),
        ("_ga", "tracking"),
        ("cf_clearance", "xyz"),
    ];
    let set = CookieSet::session_only(browser);
    assert_eq!(set.len(), 2);
    assert_eq!(set.get("PHPSESSID"), Some("abc"));
    assert_eq!(set.get("cf_clearance"), Some("xyz"));
    assert_eq!(set.get("_ga"), None);
}

/// Offers each candidate in turn and keeps the first one the probe accepts.
struct SequenceProvider {
    candidates: Vec<CookieSet>,
}

#[async_trait]
impl CredentialProvider for SequenceProvider {
    async fn obtain_fresh_credential(
        &mut self,
        probe: &mut dyn CookieProbe,
    ) -> Result<Option<CookieSet>> {
        for candidate in self.candidates.drain(..) {
            if probe.probe_cookies(&candidate).await {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

#[tokio::test(start_paused = true)]
async fn test_rejected_candidates_are_replaced_by_accepted_login() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = CookieFile::new(dir.path().join("cookies.json"));
    let mut stale = cookies("stale");
    stale.insert("remember_me", "old");
    file.save(&stale).await?;

    let mut session = session(FakeTransport::new(portal));
    let mut provider = SequenceProvider {
        candidates: vec![cookies("wrong"), cookies("good")],
    };

    session.authenticate(&file, &mut provider).await?;

    assert_eq!(session.transport().cookies().get("PHPSESSID"), Some("good"));
    assert!(session.is_session_valid().await);
    // Only the accepted set is written back
    assert_eq!(file.load().await?, Some(cookies("good")));
    Ok(())
}
