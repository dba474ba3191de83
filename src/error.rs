use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Request to AISIS failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("The AISIS session appears to have expired")]
    SessionExpired,

    #[error("Authentication failed. Please check your credentials.")]
    AuthenticationFailed,

    #[error("The session warmup request did not succeed")]
    WarmupFailed,

    #[error("Exhausted retries fetching department {dept_code}")]
    RetriesExhausted {
        dept_code: String,
        #[source]
        source: Box<ScraperError>,
    },

    #[error("The scrape produced no courses for period {0}")]
    EmptyResult(String),

    #[error("Missing credentials: {0} is not set")]
    MissingCredentials(&'static str),

    #[error("Invalid applicable period: {0}")]
    InvalidPeriod(String),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
