//! Path helpers for tinyllamax
//!
//! Per-user locations only; nothing here needs root.
//! Data: $XDG_DATA_HOME/tinyllamax or ~/.local/share/tinyllamax
//! Config: $XDG_CONFIG_HOME/tinyllamax or ~/.config/tinyllamax

use std::path::PathBuf;

pub const APP_DIR: &str = "tinyllamax";

const HISTORY_FILE: &str = "history.sqlite";
const CONFIG_FILE: &str = "config.toml";

fn home_fallback(rel: &str) -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(rel)
}

/// Per-user data directory
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| home_fallback(".local/share"))
        .join(APP_DIR)
}

/// Per-user config directory
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| home_fallback(".config"))
        .join(APP_DIR)
}

pub fn default_history_path() -> PathBuf {
    data_dir().join(HISTORY_FILE)
}

pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}
