use aisis_core::runner::{self, ScrapeOptions};
use aisis_core::{AisisClient, FileCookieStore, Period, Result, ScraperError};
use std::env;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const COOKIES_FILE: &str = "cookies.json";
const DEFAULT_PERIOD: &str = "2024-2";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Err(e) = run().await {
        error!(error = %e, "course update failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let username = env::var("AISIS_USERNAME")
        .map_err(|_| ScraperError::MissingCredentials("AISIS_USERNAME"))?;
    let password = env::var("AISIS_PASSWORD")
        .map_err(|_| ScraperError::MissingCredentials("AISIS_PASSWORD"))?;

    // First CLI argument wins, then the environment, then the default.
    let period_raw = env::args()
        .nth(1)
        .or_else(|| env::var("APPLICABLE_PERIOD").ok())
        .unwrap_or_else(|| DEFAULT_PERIOD.to_string());
    let period = Period::parse(&period_raw)?;

    info!(period = %period, semester = %period.semester_string(), "starting course update");

    let mut client = AisisClient::new();
    client.set_cookie_store(Arc::new(FileCookieStore::new(COOKIES_FILE)));

    if client.restore().await && client.validate().await {
        info!("resumed session from saved cookies");
    } else if !client.login(&username, &password).await {
        return Err(ScraperError::AuthenticationFailed);
    }

    let opts = ScrapeOptions::new(period);
    let summary = runner::run(&client, &opts).await?;

    info!(courses = summary.courses, "course update complete");
    for path in &summary.files_written {
        info!(path = %path.display(), "wrote artifact");
    }

    Ok(())
}
