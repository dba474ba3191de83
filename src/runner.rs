use crate::client::AisisClient;
use crate::error::{Result, ScraperError};
use crate::models::{Course, Period, RetryPolicy, SemesterInfo};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// The fixed roster of department codes iterated per run.
pub const DEPT_CODES: &[&str] = &[
    "IE", "BIO", "CH", "CHN", "COM", "CEPP", "CPA", "ELM", "DS", "EC", "ECE", "EN", "ES", "EU",
    "FIL", "FAA", "FA", "HSP", "HI", "SOHUM", "DISCS", "SALT", "INTAC", "IS", "JSP", "KSP", "LAS",
    "MAL", "MA", "ML", "NSTP (ADAST)", "NSTP (OSCI)", "PH", "PE", "PS", "POS", "PSY", "QMIT", "SB",
    "SOCSCI", "SA", "TH", "TMP",
];

pub const COURSES_FILE: &str = "courses.json";
pub const SEMESTER_INFO_FILE: &str = "semester-info.json";

/// Parameters of one scrape run.
pub struct ScrapeOptions {
    pub period: Period,
    pub dept_codes: Vec<String>,
    pub retry: RetryPolicy,
    pub output_dir: PathBuf,
}

impl ScrapeOptions {
    /// Options for a full run over every known department, writing under
    /// `data/`.
    pub fn new(period: Period) -> Self {
        Self {
            period,
            dept_codes: DEPT_CODES.iter().map(|d| d.to_string()).collect(),
            retry: RetryPolicy::default(),
            output_dir: PathBuf::from("data"),
        }
    }
}

/// Summary of what a successful run produced.
pub struct RunSummary {
    pub courses: usize,
    pub files_written: Vec<PathBuf>,
}

/// Executes one scrape run against an authenticated client: warmup, then
/// every department in order with bounded retries, then the artifact writes.
///
/// The run is all-or-nothing. A failed warmup, any department that exhausts
/// its retries, or an empty aggregate result aborts the run before anything
/// is written, so a partial artifact can never replace a good one.
pub async fn run(client: &AisisClient, opts: &ScrapeOptions) -> Result<RunSummary> {
    if !client.warmup(&opts.period).await {
        return Err(ScraperError::WarmupFailed);
    }

    let mut all_courses: Vec<Course> = Vec::new();

    for dept_code in &opts.dept_codes {
        let courses = opts
            .retry
            .run(|| client.fetch_department(&opts.period, dept_code))
            .await
            .map_err(|e| ScraperError::RetriesExhausted {
                dept_code: dept_code.clone(),
                source: Box::new(e),
            })?;

        info!(dept = %dept_code, count = courses.len(), "fetched department");
        all_courses.extend(courses);
    }

    if all_courses.is_empty() {
        return Err(ScraperError::EmptyResult(opts.period.format()));
    }

    let files_written = write_artifacts(&all_courses, &opts.period, &opts.output_dir).await?;

    Ok(RunSummary {
        courses: all_courses.len(),
        files_written,
    })
}

/// Serializes the aggregated course list plus the run metadata document.
pub async fn write_artifacts(
    courses: &[Course],
    period: &Period,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir).await?;

    let courses_path = output_dir.join(COURSES_FILE);
    write_atomic(&courses_path, &serde_json::to_string_pretty(courses)?).await?;

    let info = SemesterInfo::for_period(period);
    let info_path = output_dir.join(SEMESTER_INFO_FILE);
    write_atomic(&info_path, &serde_json::to_string_pretty(&info)?).await?;

    info!(courses = courses.len(), path = %courses_path.display(), "artifacts written");
    Ok(vec![courses_path, info_path])
}

// Atomic write: write to tmp then rename
async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents).await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}
