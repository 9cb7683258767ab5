//! Interactive manual-review helper for KoG migration cases.
//!
//! Usage:
//!   kog-review                                  # prompts for everything
//!   kog-review --reference ref284118 --ip 1.2.3.4 --registered-only
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use kog_review::{
    build_message, registered_only, render_table, BrowserLogin, CookieFile, KogClient,
    ReqwestTransport, RetryingTransport, ReviewConfig, ReviewError, Session,
};
use std::io::{self, BufRead, Write};
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kog-review")]
#[command(about = "Check the names behind a KoG migration case and draft the review message")]
struct Args {
    /// Case reference number (e.g. ref284118). Prompts for all inputs when omitted
    #[arg(long)]
    reference: Option<String>,

    /// IP address to compare with every registered name
    #[arg(long)]
    ip: Option<String>,

    /// Only list registered names in the message
    #[arg(long)]
    registered_only: bool,

    /// Cookie cache file
    #[arg(long, env = "KOG_COOKIES_FILE")]
    cookies: Option<PathBuf>,

    /// Do not copy the message to the clipboard
    #[arg(long)]
    no_clipboard: bool,
}

struct ReviewInput {
    reference: String,
    ip: Option<IpAddr>,
    registered_only: bool,
}

impl ReviewInput {
    fn gather(args: &Args) -> Result<Self> {
        let (reference, ip, registered_only) = match &args.reference {
            Some(reference) => (
                reference.trim().to_string(),
                args.ip.clone().unwrap_or_default(),
                args.registered_only,
            ),
            None => {
                let reference = prompt("Enter reference number (e.g., ref284118): ")?;
                let ip = prompt("Enter IP address to check (or press Enter to skip): ")?;
                let filter = prompt("Show only registered players in message? (y/n): ")?;
                (
                    reference,
                    ip,
                    matches!(filter.to_lowercase().as_str(), "y" | "yes"),
                )
            }
        };

        if reference.is_empty() {
            bail!("Reference number is required");
        }

        let ip = ip.trim();
        let ip = if ip.is_empty() {
            None
        } else {
            Some(
                ip.parse::<IpAddr>()
                    .map_err(|_| anyhow!("Invalid IP address: {}", ip))?,
            )
        };

        Ok(Self {
            reference,
            ip,
            registered_only,
        })
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn banner(title: &str) {
    println!("{}", "=".repeat(80));
    println!("{}", title);
    println!("{}", "=".repeat(80));
}

/// X11 and Wayland drop the selection with its owner, so on Linux the
/// contents are served until a clipboard manager takes them or `hold` passes.
fn copy_to_clipboard(text: String, hold: Duration) -> std::result::Result<(), arboard::Error> {
    let mut clipboard = arboard::Clipboard::new()?;
    #[cfg(target_os = "linux")]
    {
        use arboard::SetExtLinux;
        clipboard
            .set()
            .wait_until(std::time::Instant::now() + hold)
            .text(text)
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = hold;
        clipboard.set_text(text)
    }
}

async fn run(args: Args) -> Result<()> {
    banner("KoG Auto Manual Review Tool");
    println!();

    let input = ReviewInput::gather(&args)?;
    println!();

    let mut config = ReviewConfig::from_env()?;
    if let Some(path) = args.cookies {
        config.cookies_file = path;
    }

    println!("Initializing session...");
    let transport = RetryingTransport::new(ReqwestTransport::new(&config)?, config.retry.clone());
    let mut session = Session::new(transport, &config);
    let cookie_file = CookieFile::new(&config.cookies_file);
    let mut login = BrowserLogin::new(&config);

    session
        .authenticate(&cookie_file, &mut login)
        .await
        .map_err(|e| match e {
            ReviewError::AuthenticationFailed => anyhow!("Failed to authenticate"),
            other => anyhow!(other).context("Failed to authenticate"),
        })?;
    println!("Authenticated");

    let mut client = KogClient::new(session);

    println!("\nFetching data for {}...", input.reference);
    let (summary, rows) = client
        .fetch_case(&input.reference)
        .await
        .context("Failed to scrape data")?;

    if rows.is_empty() {
        bail!("No player data found");
    }

    println!("Found {} player(s)", rows.len());
    match summary.total_finishes {
        Some(total) => println!("Total finishes: {}", total),
        None => println!("Total finishes: unknown"),
    }
    if !summary.same_user_with.is_empty() {
        println!("Shared with: {}", summary.same_user_with.join(", "));
    }

    println!("\nChecking players...");
    let mut players = Vec::with_capacity(rows.len());
    for row in &rows {
        print!("  Checking {}... ", row.name);
        io::stdout().flush()?;

        let record = client.review_player(row, input.ip).await;
        match record.match_percentage {
            Some(pct) => println!("{} (IP: {}%)", record.status_label(), pct),
            None => println!("{}", record.status_label()),
        }
        players.push(record);
    }

    render_table(&players, &mut io::stdout().lock())?;

    let review_name = players
        .first()
        .map(|p| p.name.as_str())
        .unwrap_or("Unknown");
    let message = if input.registered_only {
        build_message(review_name, registered_only(&players), true)
    } else {
        build_message(review_name, &players, true)
    };

    println!();
    banner("REVIEW MESSAGE:");
    println!("{}", message);
    println!("{}\n", "=".repeat(80));

    if !args.no_clipboard {
        println!(
            "Copying message to clipboard (available for up to {}s)...",
            config.clipboard_hold.as_secs()
        );
        let hold = config.clipboard_hold;
        if let Err(e) = tokio::task::spawn_blocking(move || copy_to_clipboard(message, hold)).await? {
            tracing::debug!("Clipboard unavailable: {}", e);
            println!("(Could not copy to clipboard)\n");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kog_review=info")),
        )
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("ERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
