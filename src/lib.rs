// Declare all our modules
mod client;
mod cookies;
mod error;
mod models;
pub mod parsers;
pub mod runner;

// Publicly export the parts of our library that users will need
pub use client::AisisClient;
pub use cookies::{CookieBackend, FileCookieStore};
pub use error::{Result, ScraperError};
pub use models::*; // Exposes Course, Period, DelayConfig, etc.
