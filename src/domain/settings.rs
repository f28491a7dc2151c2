use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "bt_mrvl".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorSettings {
    // Transport
    #[serde(default = "default_device_path")]
    pub device_path: String,
    #[serde(default = "default_open_max_attempts")]
    pub open_max_attempts: u32,
    #[serde(default = "default_open_retry_delay_ms")]
    pub open_retry_delay_ms: u64,
    #[serde(default = "default_release_grace_ms")]
    pub release_grace_ms: u64,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for VendorSettings {
    fn default() -> Self {
        Self {
            device_path: default_device_path(),
            open_max_attempts: default_open_max_attempts(),
            open_retry_delay_ms: default_open_retry_delay_ms(),
            release_grace_ms: default_release_grace_ms(),
            log_settings: LogSettings::default(),
        }
    }
}

fn default_device_path() -> String {
    "/dev/mbtchar0".to_string()
}
fn default_open_max_attempts() -> u32 {
    20
}
fn default_open_retry_delay_ms() -> u64 {
    200
}
fn default_release_grace_ms() -> u64 {
    1
}

impl VendorSettings {
    /// `<config_dir>/bt_vendor_mrvl/settings.json`
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("bt_vendor_mrvl");
        path.push("settings.json");
        Ok(path)
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    /// Load `path` (or the default location), falling back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Ok(p) => p,
                Err(_) => return Self::default(),
            },
        };

        match Self::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                if path.exists() {
                    warn!("Ignoring settings file {}: {}", path.display(), e);
                }
                Self::default()
            }
        }
    }
}
