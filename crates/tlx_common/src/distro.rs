//! Distribution detection
//!
//! Reads the freedesktop os-release file and maps a distro id to its
//! preferred package manager. Detection never fails: anything unreadable
//! comes back as `"unknown"`.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const OS_RELEASE_PATH: &str = "/etc/os-release";

pub const UNKNOWN: &str = "unknown";

/// Distro id and version as reported by os-release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroInfo {
    pub id: String,
    pub version_id: String,
}

impl Default for DistroInfo {
    fn default() -> Self {
        Self {
            id: UNKNOWN.to_string(),
            version_id: UNKNOWN.to_string(),
        }
    }
}

impl DistroInfo {
    pub fn is_known(&self) -> bool {
        self.id != UNKNOWN
    }

    pub fn package_manager(&self) -> Option<&'static str> {
        preferred_pkg_manager(&self.id)
    }
}

/// Detect the running distribution from `/etc/os-release`
pub fn detect() -> DistroInfo {
    parse_os_release(Path::new(OS_RELEASE_PATH))
}

/// Parse an os-release file. I/O failures yield `("unknown", "unknown")`.
pub fn parse_os_release(path: &Path) -> DistroInfo {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_os_release_content(&content),
        Err(e) => {
            tracing::debug!("Could not read {}: {}", path.display(), e);
            DistroInfo::default()
        }
    }
}

/// Parse os-release content. Missing keys yield `"unknown"`.
pub fn parse_os_release_content(content: &str) -> DistroInfo {
    let mut info = DistroInfo::default();

    for line in content.lines() {
        let Some((key, value)) = parse_kv_line(line) else {
            continue;
        };
        match key {
            "ID" => info.id = value.to_lowercase(),
            "VERSION_ID" => info.version_id = value.to_string(),
            _ => {}
        }
    }

    info
}

fn parse_kv_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let value = value.trim().trim_matches('"').trim_matches('\'');
    Some((key.trim(), value))
}

/// Preferred package manager for a distro id, `None` when unrecognized
pub fn preferred_pkg_manager(distro_id: &str) -> Option<&'static str> {
    let d = distro_id.to_lowercase();
    match d.as_str() {
        "ubuntu" | "debian" | "pop" | "linuxmint" | "mint" => Some("apt"),
        "fedora" | "rhel" | "centos" | "alma" | "rocky" => Some("dnf"),
        "arch" | "manjaro" | "endeavouros" => Some("pacman"),
        "suse" | "sles" => Some("zypper"),
        _ if d.starts_with("opensuse") => Some("zypper"),
        "alpine" => Some("apk"),
        _ => None,
    }
}
