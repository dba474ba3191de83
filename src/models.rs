use serde::{Deserialize, Serialize};

/// A single course offering extracted from one listing page.
///
/// Field names serialize exactly as the downstream schedule frontend expects
/// them (`deptCode`, `catNo`, `courseTitle`, ...).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Generated unique identifier for this record (UUID v4, not from AISIS).
    pub id: String,
    /// The department code the record was fetched under (e.g. "DISCS").
    pub dept_code: String,
    /// The catalog number (e.g. "CSCI 30"). Never blank; rows with a blank
    /// catalog number are placeholder rows and are discarded during parsing.
    pub cat_no: String,
    /// The section identifier (e.g. "A").
    pub section: String,
    /// The full course title.
    pub course_title: String,
    /// Number of units, kept as the raw string the portal prints.
    pub units: String,
    /// The meeting schedule with modality annotations stripped.
    pub time: String,
    /// The room, or the literal sentinel "TBA".
    pub room: String,
    /// The assigned instructor.
    pub instructor: String,
    /// Free-form remarks column.
    pub remarks: String,
}

/// The academic term half of an applicable period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Term {
    /// Intersession - the short mid-year term.
    Intersession = 0,
    /// First Semester.
    First = 1,
    /// Second Semester.
    Second = 2,
}

impl Term {
    /// The numeric suffix used in the AISIS period format.
    pub fn as_num(&self) -> u8 {
        *self as u8
    }

    /// The human-readable term name used in semester labels.
    pub fn label(&self) -> &'static str {
        match self {
            Term::Intersession => "Intersession",
            Term::First => "First Semester",
            Term::Second => "Second Semester",
        }
    }
}

/// An applicable period (Year + Term) as AISIS understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    /// The starting year of the school year (e.g. 2024).
    pub year: u16,
    /// The specific term within that school year.
    pub term: Term,
}

impl Period {
    /// Creates a new `Period` instance.
    pub fn new(year: u16, term: Term) -> Self {
        Self { year, term }
    }

    /// Parses the `"YYYY-N"` form used throughout AISIS, where N is
    /// 0 (Intersession), 1 (First Semester) or 2 (Second Semester).
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        use crate::error::ScraperError;

        let (year_part, suffix) = s
            .split_once('-')
            .ok_or_else(|| ScraperError::InvalidPeriod(s.to_string()))?;

        let year = year_part
            .trim()
            .parse::<u16>()
            .map_err(|_| ScraperError::InvalidPeriod(s.to_string()))?;

        let term = match suffix.trim() {
            "0" => Term::Intersession,
            "1" => Term::First,
            "2" => Term::Second,
            _ => return Err(ScraperError::InvalidPeriod(s.to_string())),
        };

        Ok(Period::new(year, term))
    }

    /// Formats the period into the `"YYYY-N"` form expected by the listing
    /// form (e.g. `"2024-2"`).
    pub fn format(&self) -> String {
        format!("{}-{}", self.year, self.term.as_num())
    }

    /// Derives the human-readable semester label, e.g.
    /// `"Second Semester 2024-2025"`.
    pub fn semester_string(&self) -> String {
        format!("{} {}-{}", self.term.label(), self.year, self.year + 1)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Run metadata written next to the course list after a successful scrape.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SemesterInfo {
    /// The applicable period in `"YYYY-N"` form.
    pub period: String,
    /// Human-readable label, e.g. "First Semester 2024-2025".
    pub semester_string: String,
    /// Millisecond timestamp of when the scrape completed.
    pub last_updated: i64,
}

impl SemesterInfo {
    pub fn for_period(period: &Period) -> Self {
        Self {
            period: period.format(),
            semester_string: period.semester_string(),
            last_updated: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Configuration for pacing requests against the portal via randomized delays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayConfig {
    /// Minimum sleep duration in milliseconds before a listing request.
    pub min_delay_ms: u64,
    /// Maximum sleep duration in milliseconds before a listing request.
    pub max_delay_ms: u64,
    /// Whether the randomized delay logic is active.
    pub enabled: bool,
}

impl Default for DelayConfig {
    /// Default configuration: 1000ms - 2000ms, enabled.
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_delay_ms: 2000,
            enabled: true,
        }
    }
}

/// A bounded retry policy shared by the operations that talk to the portal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts before giving up (minimum 1).
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    /// Default policy: 2 attempts, 2 seconds apart.
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff_ms: 2000,
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds or the attempt budget is spent, sleeping
    /// `backoff_ms` between attempts. Returns the last error on exhaustion.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> crate::error::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = crate::error::Result<T>>,
    {
        let mut attempt = 1u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "attempt failed, retrying");
                    tokio::time::sleep(std::time::Duration::from_millis(self.backoff_ms)).await;
                    attempt += 1;
                }
            }
        }
    }
}
