use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::PathBuf;

use crate::query::MIN_SELECTION_LEN;
use crate::store::DEFAULT_STORAGE_KEY;

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "QUICKCOPY_CONFIG_DIR";

/// Get the config directory using platform-appropriate location.
///
/// - `$QUICKCOPY_CONFIG_DIR` when set
/// - macOS: `~/Library/Application Support/quickcopy/`
/// - Linux: `~/.config/quickcopy/` (or `$XDG_CONFIG_HOME`)
/// - Windows: `%APPDATA%/quickcopy/`
///
/// Falls back to `~/.quickcopy/` if the platform dir is unavailable.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .map(|d| d.join("quickcopy"))
        .unwrap_or_else(legacy_dotdir)
}

/// Fallback config directory: ~/.quickcopy/
fn legacy_dotdir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".quickcopy")
}

/// Load a JSON config file, returning Default if missing or corrupt.
/// Logs when the file exists but cannot be read or parsed, so corrupt files
/// are visible instead of silently resetting state.
pub fn load_json_config<T: DeserializeOwned + Default>(filename: &str) -> T {
    let path = config_dir().join(filename);
    if !path.exists() {
        return T::default();
    }
    let content = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Could not read config {}: {e}", path.display());
            return T::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Corrupt config {}: {e}. Using defaults.", path.display());
            T::default()
        }
    }
}

/// Save a JSON config file atomically (temp file + rename).
pub fn save_json_config<T: Serialize>(filename: &str, config: &T) -> Result<(), String> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("Failed to create config directory: {e}"))?;

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {e}"))?;

    let target = dir.join(filename);
    let temp = dir.join(format!("{}.tmp.{}", filename, std::process::id()));

    std::fs::write(&temp, &json).map_err(|e| format!("Failed to write temp config: {e}"))?;

    std::fs::rename(&temp, &target).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        format!("Failed to commit config: {e}")
    })?;

    Ok(())
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the local HTTP API. 0 lets the OS pick one; the bound port
    /// is written to `<config_dir>/port` either way.
    #[serde(default)]
    pub port: u16,
    /// Key the template set is stored under.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Directory for template data. Defaults to the config directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Minimum selection length (characters) that opens the popup.
    #[serde(default = "default_min_selection_len")]
    pub min_selection_len: usize,
    /// Fall back to OSC 52 when the platform clipboard fails.
    #[serde(default = "default_true")]
    pub fallback_clipboard: bool,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_min_selection_len() -> usize {
    MIN_SELECTION_LEN
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 0,
            storage_key: default_storage_key(),
            data_dir: None,
            min_selection_len: default_min_selection_len(),
            fallback_clipboard: true,
        }
    }
}

impl AppConfig {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(config_dir)
    }
}

pub const APP_CONFIG_FILE: &str = "config.json";
pub const PORT_FILE: &str = "port";

pub fn load_app_config() -> AppConfig {
    load_json_config(APP_CONFIG_FILE)
}

pub fn save_app_config(config: &AppConfig) -> Result<(), String> {
    save_json_config(APP_CONFIG_FILE, config)
}

/// Port file path: <config_dir>/port
pub fn port_file_path() -> PathBuf {
    config_dir().join(PORT_FILE)
}

/// Read the port the running service wrote on startup.
pub fn read_port() -> Result<u16, String> {
    let port_file = port_file_path();
    let contents = std::fs::read_to_string(&port_file).map_err(|e| {
        format!(
            "Cannot read port file at {}: {e}. Is `quickcopy serve` running?",
            port_file.display()
        )
    })?;
    contents
        .trim()
        .parse::<u16>()
        .map_err(|e| format!("Invalid port in {}: {e}", port_file.display()))
}
