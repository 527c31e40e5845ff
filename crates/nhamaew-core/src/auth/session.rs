use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// LINE access tokens are valid for 30 days.
const SESSION_EXPIRY_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub line_user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    /// Whether the backend accepted the profile registration at sign-in.
    #[serde(default)]
    pub profile_updated: bool,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(line_user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            line_user_id: line_user_id.into(),
            display_name: display_name.into(),
            picture_url: None,
            access_token: None,
            profile_updated: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::days(SESSION_EXPIRY_DAYS)
    }

    /// Days remaining until expiry (for display)
    pub fn days_until_expiry(&self) -> i64 {
        (self.expires_at() - Utc::now()).num_days().max(0)
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk. Returns `false` when there is no session
    /// file or the stored session has expired.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read session file")?;
            let data: SessionData = serde_json::from_str(&contents)
                .context("Failed to parse session file")?;

            if !data.is_expired() {
                debug!(user = %data.line_user_id, "Loaded session");
                self.data = Some(data);
                return Ok(true);
            }
            debug!("Stored session has expired");
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create cache directory")?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents).context("Failed to write session file")?;
        }
        Ok(())
    }

    /// Clear session data
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    /// LINE user id of a valid session. Empty ids count as no session.
    pub fn line_user_id(&self) -> Option<&str> {
        self.data
            .as_ref()
            .filter(|d| !d.is_expired())
            .map(|d| d.line_user_id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn display_name(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.display_name.as_str())
    }

    /// Check if session is valid (exists and not expired)
    pub fn is_valid(&self) -> bool {
        self.line_user_id().is_some()
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().expect("temp dir");
        let mut session = Session::new(dir.path().to_path_buf());
        session.update(SessionData::new("U123", "Somchai"));
        session.save().expect("save");

        let mut loaded = Session::new(dir.path().to_path_buf());
        assert!(loaded.load().expect("load"));
        assert_eq!(loaded.line_user_id(), Some("U123"));
        assert_eq!(loaded.display_name(), Some("Somchai"));

        loaded.clear().expect("clear");
        assert!(!loaded.is_valid());
        assert!(!Session::new(dir.path().to_path_buf()).load().expect("load after clear"));
    }

    #[test]
    fn test_expired_session_not_loaded() {
        let dir = tempdir().expect("temp dir");
        let mut data = SessionData::new("U123", "Somchai");
        data.created_at = Utc::now() - Duration::days(SESSION_EXPIRY_DAYS + 1);
        assert!(data.is_expired());
        assert_eq!(data.days_until_expiry(), 0);

        let mut session = Session::new(dir.path().to_path_buf());
        session.update(data);
        assert_eq!(session.line_user_id(), None);
        session.save().expect("save");

        let mut loaded = Session::new(dir.path().to_path_buf());
        assert!(!loaded.load().expect("load"));
        assert!(loaded.data.is_none());
    }

    #[test]
    fn test_empty_user_id_is_no_session() {
        let dir = tempdir().expect("temp dir");
        let mut session = Session::new(dir.path().to_path_buf());
        session.update(SessionData::new("", "Guest"));
        assert_eq!(session.line_user_id(), None);
        assert!(!session.is_valid());
    }

    #[test]
    fn test_missing_optional_fields() {
        let json = r#"{"line_user_id":"U1","display_name":"A","created_at":"2026-01-01T00:00:00Z"}"#;
        let data: SessionData = serde_json::from_str(json).expect("parse");
        assert!(data.picture_url.is_none());
        assert!(!data.profile_updated);
    }
}
