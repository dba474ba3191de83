use crate::cookies::CookieBackend;
use crate::error::{Result, ScraperError};
use crate::models::{Course, DelayConfig, Period};
use crate::parsers;
use rand::Rng;
use reqwest::Url;
use reqwest::cookie::{CookieStore as _, Jar};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, ORIGIN, REFERER, USER_AGENT};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const AISIS_BASE_URL: &str = "https://aisis.ateneo.edu";

const LOGIN_PATH: &str = "/j_aisis/login.do";
const PROGRAM_OF_STUDY_PATH: &str = "/j_aisis/J_VMCS.do";
const COURSE_LISTING_PATH: &str = "/j_aisis/J_VCSC.do";

/// Appears only on the member-only program-of-study page; its presence is
/// the oracle for a live session.
const SESSION_MARKER: &str = "MY INDIVIDUAL PROGRAM OF STUDY";

/// Appears in the post-login page body on success. The portal answers a
/// rejected login with HTTP 200, so the status alone proves nothing.
const LOGIN_MARKER: &str = "User Identified As";

/// Any department works for the warmup request; this one always exists.
const WARMUP_DEPT: &str = "IE";

// The portal serves non-browser-looking clients a different (broken) view,
// so every request carries these.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Authenticated AISIS client: owns the cookie jar, the session lifecycle
/// and the per-department course listing requests.
pub struct AisisClient {
    client: reqwest::Client,
    cookie_jar: Arc<Jar>,
    base_url: String,
    authenticated: AtomicBool,
    delay: DelayConfig,
    cookie_store: Option<Arc<dyn CookieBackend>>,
}

impl AisisClient {
    pub fn new() -> Self {
        Self::with_config(DelayConfig::default())
    }

    pub fn with_config(config: DelayConfig) -> Self {
        Self::with_base_url(AISIS_BASE_URL, config)
    }

    /// Builds a client against a different portal origin. Used by the tests
    /// to point the client at a local stand-in server.
    pub fn with_base_url(base_url: impl Into<String>, config: DelayConfig) -> Self {
        let cookie_jar = Arc::new(Jar::default());

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, BROWSER_USER_AGENT.parse().unwrap());
        headers.insert(ACCEPT, BROWSER_ACCEPT.parse().unwrap());
        headers.insert(ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE.parse().unwrap());

        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookie_jar))
            .default_headers(headers)
            .build()
            .unwrap();

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            client,
            cookie_jar,
            base_url,
            authenticated: AtomicBool::new(false),
            delay: config,
            cookie_store: None,
        }
    }

    /// Attaches a persistence backend for the session cookies. Cookies are
    /// written through it after every successful login.
    pub fn set_cookie_store(&mut self, store: Arc<dyn CookieBackend>) {
        self.cookie_store = Some(store);
    }

    /// Whether the last validation or login probe succeeded. Never assumed
    /// optimistically; only `validate` and `login` flip this on.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    /// Loads previously persisted cookies into the jar, if a backend is
    /// attached and has any. Returns whether anything was restored; the
    /// session still has to be validated afterwards.
    pub async fn restore(&self) -> bool {
        let Some(store) = &self.cookie_store else {
            return false;
        };
        let Some(cookies) = store.load().await else {
            debug!("no persisted session cookies found");
            return false;
        };
        let Ok(url) = self.base_url.parse::<Url>() else {
            return false;
        };

        for cookie in &cookies {
            self.cookie_jar.add_cookie_str(cookie, &url);
        }
        info!(count = cookies.len(), "restored session cookies");
        true
    }

    /// Probes the member-only program-of-study page to check whether the
    /// current cookies still carry a live session. Transport failures are
    /// logged and reported as an invalid session, never as an error.
    pub async fn validate(&self) -> bool {
        let url = format!("{}{}", self.base_url, PROGRAM_OF_STUDY_PATH);

        let valid = match self.client.get(&url).send().await {
            Ok(response) => {
                let status = response.status();
                match response.text().await {
                    Ok(body) => {
                        let valid = status.is_success() && body.contains(SESSION_MARKER);
                        if !valid {
                            debug!(%status, %url, "session probe did not show the member-only marker");
                        }
                        valid
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to read session probe response");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "session validation request failed");
                false
            }
        };

        self.authenticated.store(valid, Ordering::SeqCst);
        valid
    }

    /// Logs into AISIS with the given credentials. A no-op when the session
    /// is already authenticated. On success the cookie jar is persisted
    /// through the attached backend; on failure nothing is written.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        if self.is_authenticated() {
            debug!("already logged in");
            return true;
        }

        let rnd = login_nonce();
        let mut params = HashMap::new();
        params.insert("userName", username);
        params.insert("password", password);
        params.insert("submit", "Sign in");
        params.insert("command", "login");
        params.insert("rnd", rnd.as_str());

        let url = format!("{}{}", self.base_url, LOGIN_PATH);

        let response = match self.client.post(&url).form(&params).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "login request failed");
                return false;
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to read login response");
                return false;
            }
        };

        if status.is_success() && body.contains(LOGIN_MARKER) {
            self.authenticated.store(true, Ordering::SeqCst);
            self.persist_cookies().await;
            info!("login successful");
            true
        } else {
            self.authenticated.store(false, Ordering::SeqCst);
            warn!(%status, "login response did not contain the success marker");
            false
        }
    }

    /// Issues one throwaway listing request before the real extraction loop.
    ///
    /// The portal's server-side state is not fully primed until one listing
    /// request completes after login; without this the first department
    /// fetch fails or returns malformed rows. The primer variant of the form
    /// wraps every value in single quotes.
    pub async fn warmup(&self, period: &Period) -> bool {
        let quoted_period = format!("'{}'", period);
        let quoted_dept = format!("'{}'", WARMUP_DEPT);

        let mut params = HashMap::new();
        params.insert("command", "displayResults");
        params.insert("applicablePeriod", quoted_period.as_str());
        params.insert("deptCode", quoted_dept.as_str());
        params.insert("subjCode", "'ALL'");

        match self.post_listing(&params).await {
            Ok(response) => {
                if response.url().path() != COURSE_LISTING_PATH {
                    warn!(url = %response.url(), "warmup was redirected to the login page");
                    return false;
                }
                let status = response.status();
                if !status.is_success() {
                    warn!(%status, "warmup request failed");
                    return false;
                }
                debug!("warmup complete, session is request-ready");
                true
            }
            Err(e) => {
                warn!(error = %e, "warmup request failed");
                false
            }
        }
    }

    /// Fetches and parses the course listing for one department.
    ///
    /// Fails with [`ScraperError::SessionExpired`] when the portal bounces
    /// the request to the login page, which is a different outcome from a
    /// department with no offerings (an empty, successful list). Retrying is
    /// the caller's business.
    pub async fn fetch_department(&self, period: &Period, dept_code: &str) -> Result<Vec<Course>> {
        self.pause().await;

        let period_str = period.format();
        let mut params = HashMap::new();
        params.insert("command", "displayResults");
        params.insert("applicablePeriod", period_str.as_str());
        params.insert("deptCode", dept_code);
        params.insert("subjCode", "ALL");

        let response = self.post_listing(&params).await?;

        if response.url().path() != COURSE_LISTING_PATH {
            self.authenticated.store(false, Ordering::SeqCst);
            return Err(ScraperError::SessionExpired);
        }

        let body = response.error_for_status()?.text().await?;
        Ok(parsers::courses::parse_courses_from_html(&body, dept_code))
    }

    async fn post_listing(&self, params: &HashMap<&str, &str>) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, COURSE_LISTING_PATH);
        let response = self
            .client
            .post(&url)
            .header(ORIGIN, self.base_url.as_str())
            .header(REFERER, url.as_str())
            .form(params)
            .send()
            .await?;
        Ok(response)
    }

    /// Writes the current jar contents through the attached backend.
    async fn persist_cookies(&self) {
        let Some(store) = &self.cookie_store else {
            return;
        };
        let Ok(url) = self.base_url.parse::<Url>() else {
            return;
        };
        let Some(header) = self.cookie_jar.cookies(&url) else {
            debug!("no cookies to persist");
            return;
        };
        let Ok(joined) = header.to_str() else {
            return;
        };

        let cookies: Vec<String> = joined.split("; ").map(str::to_string).collect();
        match store.save(&cookies).await {
            Ok(()) => info!(count = cookies.len(), "session cookies saved"),
            Err(e) => warn!(error = %e, "failed to persist session cookies"),
        }
    }

    async fn pause(&self) {
        if !self.delay.enabled {
            return;
        }
        let ms = {
            let mut rng = rand::rng();
            rng.random_range(self.delay.min_delay_ms..=self.delay.max_delay_ms)
        };
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Per-request login nonce: "r" followed by 10 random bytes as hex, to keep
/// the portal from treating repeated logins as replays.
fn login_nonce() -> String {
    let bytes: [u8; 10] = rand::rng().random();
    let mut nonce = String::with_capacity(1 + bytes.len() * 2);
    nonce.push('r');
    for byte in bytes {
        nonce.push_str(&format!("{:02x}", byte));
    }
    nonce
}
