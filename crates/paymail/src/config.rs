//! Configuration for the sync daemon
//!
//! Two files live in the Remit config directory: the Google OAuth client
//! credentials (Cloud Console format) and the sync settings. Credentials
//! can also come from environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::source::Selection;

/// Credentials filename in the Remit config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Settings filename in the Remit config directory
const SETTINGS_FILE: &str = "sync.json";

/// OAuth credentials for Gmail API access
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials from the config file, falling back to the
    /// GMAIL_CLIENT_ID / GMAIL_CLIENT_SECRET environment variables
    pub fn load() -> Result<Self> {
        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }
        Self::from_env()
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    /// Parse credentials from a JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Support both "installed" (desktop) and "web" credential types
        let installed = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Get the default credentials file path
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}

/// Settings for the polling daemon, loaded from sync.json.
///
/// Only the sink URL is required; everything else has a default matching
/// the production deployment. Remote checkpointing is enabled by supplying
/// both checkpoint URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// The single trusted sender whose mail is processed
    #[serde(default = "default_sender")]
    pub sender: String,
    /// Name of the processed-marker label
    #[serde(default = "default_marker_label")]
    pub marker_label: String,
    /// Candidate selection mode
    #[serde(default = "default_selection")]
    pub selection: Selection,
    /// Downstream endpoint records are POSTed to
    pub sink_url: String,
    /// Endpoint the persisted watermark is read from
    #[serde(default)]
    pub checkpoint_read_url: Option<String>,
    /// Endpoint the watermark is written to
    #[serde(default)]
    pub checkpoint_write_url: Option<String>,
    /// Delay between polling cycles
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Pause between successive deliveries within a batch
    #[serde(default = "default_throttle_secs")]
    pub throttle_secs: u64,
    /// Offset (minutes east of UTC) applied to embedded date-times that
    /// carry no zone
    #[serde(default = "default_payload_tz_offset_minutes")]
    pub payload_tz_offset_minutes: i32,
    /// Run a single cycle and exit instead of polling forever
    #[serde(default)]
    pub run_once: bool,
}

fn default_sender() -> String {
    "no-reply@paytm.com".to_string()
}

fn default_marker_label() -> String {
    "PROCESSED".to_string()
}

fn default_selection() -> Selection {
    Selection::Label
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_throttle_secs() -> u64 {
    4
}

fn default_payload_tz_offset_minutes() -> i32 {
    330
}

impl SyncSettings {
    /// Load settings from the Remit config directory
    pub fn load() -> Result<Self> {
        config::load_json(SETTINGS_FILE).context("Failed to load sync settings")
    }

    /// The checkpoint endpoints, when remote checkpointing is configured
    pub fn checkpoint_urls(&self) -> Option<(&str, &str)> {
        match (&self.checkpoint_read_url, &self.checkpoint_write_url) {
            (Some(read), Some(write)) => Some((read, write)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installed_credentials() {
        let json = r#"{
            "installed": {
                "client_id": "test-client-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        }"#;

        let creds = GmailCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-client-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn test_parse_web_credentials() {
        let json = r#"{
            "web": {
                "client_id": "web-client-id.apps.googleusercontent.com",
                "client_secret": "web-secret"
            }
        }"#;

        let creds = GmailCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-client-id.apps.googleusercontent.com");
    }

    #[test]
    fn test_invalid_credentials_json() {
        let json = r#"{ "other": {} }"#;
        assert!(GmailCredentials::from_json(json).is_err());
    }

    #[test]
    fn test_settings_defaults() {
        let settings: SyncSettings =
            serde_json::from_str(r#"{ "sink_url": "https://sink.example/payment-sync" }"#).unwrap();

        assert_eq!(settings.sender, "no-reply@paytm.com");
        assert_eq!(settings.marker_label, "PROCESSED");
        assert_eq!(settings.selection, Selection::Label);
        assert_eq!(settings.poll_interval_secs, 30);
        assert_eq!(settings.throttle_secs, 4);
        assert_eq!(settings.payload_tz_offset_minutes, 330);
        assert!(!settings.run_once);
        assert!(settings.checkpoint_urls().is_none());
    }

    #[test]
    fn test_settings_require_sink_url() {
        let result: std::result::Result<SyncSettings, _> = serde_json::from_str(r#"{}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_checkpoint_urls_require_both_endpoints() {
        let settings: SyncSettings = serde_json::from_str(
            r#"{
                "sink_url": "https://sink.example/payment-sync",
                "checkpoint_read_url": "https://sink.example/last-timestamp"
            }"#,
        )
        .unwrap();
        assert!(settings.checkpoint_urls().is_none());

        let settings: SyncSettings = serde_json::from_str(
            r#"{
                "sink_url": "https://sink.example/payment-sync",
                "checkpoint_read_url": "https://sink.example/last-timestamp",
                "checkpoint_write_url": "https://sink.example/update-last-timestamp",
                "selection": "unread"
            }"#,
        )
        .unwrap();
        assert!(settings.checkpoint_urls().is_some());
        assert_eq!(settings.selection, Selection::Unread);
    }
}
