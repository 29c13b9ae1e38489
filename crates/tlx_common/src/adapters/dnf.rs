//! dnf (Fedora, RHEL and rebuilds)
//!
//! dnf has no separate metadata refresh step here: `update` and `upgrade`
//! both map to `dnf upgrade`.

use super::{argv, PackageManagerAdapter};

#[derive(Debug, Clone, Copy, Default)]
pub struct DnfAdapter {
    dry_run: bool,
}

impl DnfAdapter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl PackageManagerAdapter for DnfAdapter {
    fn name(&self) -> &'static str {
        "dnf"
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }

    fn install(&self, packages: &[String]) -> Vec<String> {
        if self.dry_run {
            argv(&["dnf", "install", "--assumeno"], packages)
        } else {
            argv(&["sudo", "dnf", "install", "-y"], packages)
        }
    }

    fn remove(&self, packages: &[String]) -> Vec<String> {
        if self.dry_run {
            argv(&["dnf", "remove", "--assumeno"], packages)
        } else {
            argv(&["sudo", "dnf", "remove", "-y"], packages)
        }
    }

    fn update(&self) -> Vec<String> {
        self.upgrade()
    }

    fn upgrade(&self) -> Vec<String> {
        if self.dry_run {
            argv(&["dnf", "upgrade", "--assumeno"], &[])
        } else {
            argv(&["sudo", "dnf", "upgrade", "-y"], &[])
        }
    }

    fn search(&self, query: &str) -> Vec<String> {
        argv(&["dnf", "search", query], &[])
    }
}
