use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

/// Trait for persisted cookie storage backends.
///
/// The client treats the stored cookies as an opaque list of `name=value`
/// strings scoped to the portal host.
#[async_trait]
pub trait CookieBackend: Send + Sync {
    /// Retrieve the persisted cookies, if any.
    async fn load(&self) -> Option<Vec<String>>;
    /// Persist the given cookies, replacing whatever was stored before.
    async fn save(&self, cookies: &[String]) -> Result<(), String>;
    /// Remove any persisted cookies.
    async fn clear(&self) -> Result<(), String>;
}

#[derive(Serialize, Deserialize)]
struct CookieEntry {
    saved_at: u64,
    cookies: Vec<String>,
}

/// Simple file-based cookie store.
pub struct FileCookieStore {
    path: PathBuf,
}

impl FileCookieStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

#[async_trait]
impl CookieBackend for FileCookieStore {
    async fn load(&self) -> Option<Vec<String>> {
        if !self.path.exists() {
            return None;
        }

        let content = fs::read_to_string(&self.path).await.ok()?;
        let entry: CookieEntry = serde_json::from_str(&content).ok()?;

        if entry.cookies.is_empty() {
            return None;
        }

        Some(entry.cookies)
    }

    async fn save(&self, cookies: &[String]) -> Result<(), String> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| e.to_string())?;
        }

        let tmp_path = self.path.with_extension("tmp");

        let entry = CookieEntry {
            saved_at: Self::now_secs(),
            cookies: cookies.to_vec(),
        };

        let json = serde_json::to_string(&entry).map_err(|e| e.to_string())?;

        // Atomic write: write to tmp then rename
        fs::write(&tmp_path, json)
            .await
            .map_err(|e| e.to_string())?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| e.to_string())?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), String> {
        if self.path.exists() {
            fs::remove_file(&self.path).await.map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}
