// Configuration Storage Service
// Handles config file read/write, version backup and environment overrides

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

pub const DETECTOR_URL_ENV: &str = "DRAFTCHECK_DETECTOR_URL";
pub const SENTENCE_DETECTOR_URL_ENV: &str = "DRAFTCHECK_SENTENCE_DETECTOR_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorConfig {
    /// Host of the document endpoint (`POST {baseUrl}/api/detect`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Host of the sentence endpoint (`POST {sentenceBaseUrl}/detect`).
    #[serde(default = "default_base_url")]
    pub sentence_base_url: String,
    #[serde(default = "default_document_timeout")]
    pub document_timeout_secs: u64,
    #[serde(default = "default_sentence_timeout")]
    pub sentence_timeout_secs: u64,
    /// Sentences longer than this skip the remote detector.
    #[serde(default = "default_sentence_remote_max_words")]
    pub sentence_remote_max_words: usize,
    #[serde(default = "default_sentence_concurrency")]
    pub sentence_concurrency: usize,
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            sentence_base_url: default_base_url(),
            document_timeout_secs: default_document_timeout(),
            sentence_timeout_secs: default_sentence_timeout(),
            sentence_remote_max_words: default_sentence_remote_max_words(),
            sentence_concurrency: default_sentence_concurrency(),
            proxy: None,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFallback {
    /// Surface remote failures to the caller.
    #[default]
    Fail,
    /// Return a low-confidence local estimate tagged as degraded.
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    #[serde(default = "default_min_sentence_words")]
    pub min_sentence_words: usize,
    #[serde(default = "default_unknown_midpoint")]
    pub unknown_midpoint: f64,
    /// aiLikelihood at or above which a submission is marked as using AI.
    #[serde(default = "default_ai_usage_threshold")]
    pub ai_usage_threshold: f64,
    /// percentageChange at or above which a revision counts as significantly modified.
    #[serde(default = "default_significant_change")]
    pub significant_change_threshold: f64,
    #[serde(default)]
    pub document_fallback: DocumentFallback,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_sentence_words: default_min_sentence_words(),
            unknown_midpoint: default_unknown_midpoint(),
            ai_usage_threshold: default_ai_usage_threshold(),
            significant_change_threshold: default_significant_change(),
            document_fallback: DocumentFallback::Fail,
        }
    }
}

fn default_base_url() -> String { "http://localhost:8000".to_string() }
fn default_document_timeout() -> u64 { 30 }
fn default_sentence_timeout() -> u64 { 5 }
fn default_sentence_remote_max_words() -> usize { 150 }
fn default_sentence_concurrency() -> usize { 4 }
fn default_min_sentence_words() -> usize { 5 }
fn default_unknown_midpoint() -> f64 { 50.0 }
fn default_ai_usage_threshold() -> f64 { 40.0 }
fn default_significant_change() -> f64 { 30.0 }

impl AppConfig {
    /// Apply environment overrides for the detector hosts.
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env(DETECTOR_URL_ENV) {
            self.detector.base_url = url;
        }
        if let Some(url) = non_empty_env(SENTENCE_DETECTOR_URL_ENV) {
            self.detector.sentence_base_url = url;
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("draftcheck"))
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Load configuration and apply environment overrides
    pub fn load_effective(&self) -> Result<AppConfig, String> {
        let mut config = self.load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    /// Create a backup of current config
    fn create_backup(&self) -> Result<(), String> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)
            .map_err(|e| format!("Failed to create backup dir: {}", e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%.3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| format!("Failed to create backup: {}", e))?;

        self.cleanup_old_backups(&backup_dir, 10)?;

        Ok(())
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &PathBuf, keep: usize) -> Result<(), String> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| format!("Failed to read backup dir: {}", e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Oldest first
        entries.sort_by_key(|e| {
            e.metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        });

        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    /// Persist a new detector host
    pub fn set_detector_url(&self, url: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.detector.base_url = url.to_string();
        self.save(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.detector.document_timeout_secs, 30);
        assert_eq!(config.detector.sentence_timeout_secs, 5);
        assert_eq!(config.detector.sentence_remote_max_words, 150);
        assert_eq!(config.detection.min_sentence_words, 5);
        assert_eq!(config.detection.ai_usage_threshold, 40.0);
        assert_eq!(config.detection.document_fallback, DocumentFallback::Fail);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{"version": "1.0.0", "detector": {"baseUrl": "http://detector:9000"}}"#;
        let parsed: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.detector.base_url, "http://detector:9000");
        assert_eq!(parsed.detector.sentence_base_url, "http://localhost:8000");
        assert_eq!(parsed.detection.unknown_midpoint, 50.0);
    }

    #[test]
    fn test_save_and_load_roundtrip_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        assert_eq!(store.load().unwrap().detector.base_url, "http://localhost:8000");

        store.set_detector_url("http://one:1").unwrap();
        store.set_detector_url("http://two:2").unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.detector.base_url, "http://two:2");
        let backups = fs::read_dir(dir.path().join("backups")).unwrap().count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_document_fallback_parses_lowercase() {
        let json = r#"{"detection": {"documentFallback": "degraded"}}"#;
        let parsed: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.detection.document_fallback, DocumentFallback::Degraded);
    }
}
