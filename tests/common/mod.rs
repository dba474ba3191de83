//! Minimal HTTP/1.1 server that plays the AISIS portal for integration
//! tests.
//!
//! Serves canned responses for the login form, the member-only
//! program-of-study probe and the course listing form, with switches for the
//! failure modes the client has to handle (rejected credentials, expired
//! session, redirect to login, listing outages).

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

pub const SESSION_MARKER: &str = "MY INDIVIDUAL PROGRAM OF STUDY";
pub const LOGIN_MARKER: &str = "User Identified As";

const LOGIN_PATH: &str = "/j_aisis/login.do";
const PROGRAM_OF_STUDY_PATH: &str = "/j_aisis/J_VMCS.do";
const COURSE_LISTING_PATH: &str = "/j_aisis/J_VCSC.do";

#[derive(Clone)]
pub struct PortalOptions {
    /// Whether POSTed credentials are accepted.
    pub accept_login: bool,
    /// Whether the program-of-study probe shows the member-only view.
    pub session_valid: bool,
    /// If true, member-only pages answer 302 to the login page instead.
    pub redirect_to_login: bool,
    /// Body served for successful listing requests.
    pub listing_body: String,
    /// Number of listing requests served before the endpoint starts
    /// answering 500. `None` means it never fails.
    pub listing_ok_count: Option<usize>,
}

impl Default for PortalOptions {
    fn default() -> Self {
        Self {
            accept_login: true,
            session_valid: true,
            redirect_to_login: false,
            listing_body: String::new(),
            listing_ok_count: None,
        }
    }
}

/// Starts the portal stand-in on an ephemeral port and returns its base URL
/// (e.g. "http://127.0.0.1:12345"). The server runs until the process exits.
pub fn start(opts: PortalOptions) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let opts = Arc::new(opts);
    let listings_served = Arc::new(AtomicUsize::new(0));

    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let opts = Arc::clone(&opts);
            let listings_served = Arc::clone(&listings_served);
            thread::spawn(move || handle(stream, &opts, &listings_served));
        }
    });

    format!("http://127.0.0.1:{}", port)
}

/// Renders a listing page: one `text02` cell per entry, the shape the real
/// results table has after the portal flattens each course across 14 cells.
pub fn listing_page(cells: &[&str]) -> String {
    let mut page = String::from("<html><body><table>");
    for cell in cells {
        page.push_str(&format!("<td class=\"text02\">{}</td>", cell));
    }
    page.push_str("</table></body></html>");
    page
}

/// A complete 14-cell course row with the usual unused tail cells.
pub fn course_row<'a>(
    cat_no: &'a str,
    section: &'a str,
    title: &'a str,
    units: &'a str,
    time: &'a str,
    room: &'a str,
    instructor: &'a str,
    remarks: &'a str,
) -> Vec<&'a str> {
    vec![
        cat_no, section, title, units, time, room, instructor, "", "", "", "", remarks, "", "",
    ]
}

fn handle(mut stream: TcpStream, opts: &PortalOptions, listings_served: &AtomicUsize) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));

    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let (method, path) = request_line(&request);

    match (method, path) {
        ("GET", PROGRAM_OF_STUDY_PATH) => {
            if opts.redirect_to_login {
                redirect(&mut stream, LOGIN_PATH);
            } else if opts.session_valid {
                respond(
                    &mut stream,
                    "200 OK",
                    &format!("<html><body><h1>{}</h1></body></html>", SESSION_MARKER),
                    None,
                );
            } else {
                respond(&mut stream, "200 OK", LOGIN_PAGE, None);
            }
        }
        ("GET", LOGIN_PATH) => respond(&mut stream, "200 OK", LOGIN_PAGE, None),
        ("POST", LOGIN_PATH) => {
            if opts.accept_login {
                respond(
                    &mut stream,
                    "200 OK",
                    &format!("<html><body>{} JUAN DELA CRUZ</body></html>", LOGIN_MARKER),
                    Some("Set-Cookie: JSESSIONID=deadbeefcafe; Path=/\r\n"),
                );
            } else {
                respond(&mut stream, "200 OK", LOGIN_PAGE, None);
            }
        }
        ("POST", COURSE_LISTING_PATH) => {
            if opts.redirect_to_login {
                redirect(&mut stream, LOGIN_PATH);
                return;
            }
            let served = listings_served.fetch_add(1, Ordering::SeqCst);
            let exhausted = opts.listing_ok_count.is_some_and(|limit| served >= limit);
            if exhausted {
                respond(&mut stream, "500 Internal Server Error", "", None);
            } else {
                respond(&mut stream, "200 OK", &opts.listing_body, None);
            }
        }
        _ => respond(&mut stream, "404 Not Found", "", None),
    }
}

const LOGIN_PAGE: &str = "<html><body><form>Please sign in to AISIS</form></body></html>";

/// Reads one full request (headers plus any Content-Length body).
fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];

    let headers_end = loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => return None,
            Ok(n) => n,
            Err(_) => return None,
        };
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = find_headers_end(&data) {
            break pos;
        }
        if data.len() > 64 * 1024 {
            return None;
        }
    };

    let head = std::str::from_utf8(&data[..headers_end]).ok()?;
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);

    while data.len() < headers_end + content_length {
        let n = match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        data.extend_from_slice(&buf[..n]);
    }

    String::from_utf8(data).ok()
}

fn find_headers_end(data: &[u8]) -> Option<usize> {
    data.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Returns (method, path) from the request line.
fn request_line(request: &str) -> (&str, &str) {
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");
    (method, path)
}

fn respond(stream: &mut TcpStream, status: &str, body: &str, extra_headers: Option<&str>) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
        status,
        body.len(),
        extra_headers.unwrap_or(""),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

fn redirect(stream: &mut TcpStream, location: &str) {
    let response = format!(
        "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        location
    );
    let _ = stream.write_all(response.as_bytes());
}
