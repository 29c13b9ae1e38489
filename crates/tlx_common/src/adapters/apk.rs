//! apk (Alpine Linux)
//!
//! apk installs without prompting, so the real commands carry no confirm flag.

use super::{argv, PackageManagerAdapter};

#[derive(Debug, Clone, Copy, Default)]
pub struct ApkAdapter {
    dry_run: bool,
}

impl ApkAdapter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl PackageManagerAdapter for ApkAdapter {
    fn name(&self) -> &'static str {
        "apk"
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }

    fn install(&self, packages: &[String]) -> Vec<String> {
        if self.dry_run {
            argv(&["apk", "add", "--simulate"], packages)
        } else {
            argv(&["sudo", "apk", "add"], packages)
        }
    }

    fn remove(&self, packages: &[String]) -> Vec<String> {
        if self.dry_run {
            argv(&["apk", "del", "--simulate"], packages)
        } else {
            argv(&["sudo", "apk", "del"], packages)
        }
    }

    fn update(&self) -> Vec<String> {
        if self.dry_run {
            argv(&["apk", "update", "--simulate"], &[])
        } else {
            argv(&["sudo", "apk", "update"], &[])
        }
    }

    fn upgrade(&self) -> Vec<String> {
        if self.dry_run {
            argv(&["apk", "upgrade", "--simulate"], &[])
        } else {
            argv(&["sudo", "apk", "upgrade"], &[])
        }
    }

    fn search(&self, query: &str) -> Vec<String> {
        argv(&["apk", "search", query], &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        let pkgs = vec!["htop".to_string()];
        assert_eq!(ApkAdapter::new(false).install(&pkgs), ["sudo", "apk", "add", "htop"]);
        assert_eq!(ApkAdapter::new(true).install(&pkgs), ["apk", "add", "--simulate", "htop"]);
        assert_eq!(ApkAdapter::new(false).remove(&pkgs), ["sudo", "apk", "del", "htop"]);
        assert_eq!(ApkAdapter::new(true).remove(&pkgs), ["apk", "del", "--simulate", "htop"]);
        assert_eq!(ApkAdapter::new(true).update(), ["apk", "update", "--simulate"]);
        assert_eq!(ApkAdapter::new(false).upgrade(), ["sudo", "apk", "upgrade"]);
        assert_eq!(ApkAdapter::new(true).upgrade(), ["apk", "upgrade", "--simulate"]);
        assert_eq!(ApkAdapter::new(true).search("git"), ["apk", "search", "git"]);
    }
}
