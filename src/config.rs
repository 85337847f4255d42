use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::services::gemini_service::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Environment override for the API key, so the credential can stay out of
/// the settings file.
pub const API_KEY_ENV: &str = "NOTEFILER_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Maximum note-body characters sent with a single-note request. Batch
    /// requests apply their own smaller per-item cap.
    pub max_content_length: usize,
    pub request_timeout_ms: u64,
    /// Forces one request per note even when a batch would be cheaper.
    pub high_accuracy: bool,
    /// When true, unclassified notes are folded into the skipped counter
    /// without a per-note log line.
    pub skip_unclassified: bool,
    pub log_results: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_content_length: 1000,
            request_timeout_ms: 20_000,
            high_accuracy: false,
            skip_unclassified: false,
            log_results: true,
        }
    }
}

impl RunOptions {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Filesystem root of the note vault.
    pub vault_dir: PathBuf,
    /// Vault-relative inbox folder whose direct children are candidates.
    pub watch_folder: String,
    /// Ordered folder vocabulary; declaration order breaks parse ties.
    pub folders: Vec<String>,
    pub auto_run_enabled: bool,
    /// Minutes between automatic runs; 0 means manual only.
    pub auto_run_interval_minutes: u64,
    pub run: RunOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            vault_dir: PathBuf::new(),
            watch_folder: "Inbox".to_string(),
            folders: Vec::new(),
            auto_run_enabled: false,
            auto_run_interval_minutes: 0,
            run: RunOptions::default(),
        }
    }
}

impl Settings {
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "notefiler").ok_or_else(|| {
            AppError::Config("could not resolve a configuration directory".to_string())
        })?;
        Ok(dirs.config_dir().join("settings.json"))
    }

    /// A missing settings file is not an error; it loads as defaults so the
    /// first `save` can create it.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The credential used for model calls, with the environment taking
    /// precedence over the settings file.
    pub fn resolved_api_key(&self) -> String {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| self.api_key.clone())
    }

    pub fn validate(&self) -> Result<()> {
        if self.folders.is_empty() {
            return Err(AppError::Config(
                "no destination folders configured".to_string(),
            ));
        }
        if self.vault_dir.as_os_str().is_empty() {
            return Err(AppError::Config("no vault directory configured".to_string()));
        }
        Ok(())
    }
}
