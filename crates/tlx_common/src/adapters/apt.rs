//! apt (Debian, Ubuntu and derivatives)

use super::{argv, PackageManagerAdapter};

#[derive(Debug, Clone, Copy, Default)]
pub struct AptAdapter {
    dry_run: bool,
}

impl AptAdapter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl PackageManagerAdapter for AptAdapter {
    fn name(&self) -> &'static str {
        "apt"
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }

    fn install(&self, packages: &[String]) -> Vec<String> {
        if self.dry_run {
            argv(&["apt", "install", "-s"], packages)
        } else {
            argv(&["sudo", "apt", "install", "-y"], packages)
        }
    }

    fn remove(&self, packages: &[String]) -> Vec<String> {
        if self.dry_run {
            argv(&["apt", "remove", "-s"], packages)
        } else {
            argv(&["sudo", "apt", "remove", "-y"], packages)
        }
    }

    fn update(&self) -> Vec<String> {
        if self.dry_run {
            argv(&["apt", "update", "-s"], &[])
        } else {
            argv(&["sudo", "apt", "update"], &[])
        }
    }

    fn upgrade(&self) -> Vec<String> {
        if self.dry_run {
            argv(&["apt", "upgrade", "-s"], &[])
        } else {
            argv(&["sudo", "apt", "upgrade", "-y"], &[])
        }
    }

    fn search(&self, query: &str) -> Vec<String> {
        argv(&["apt", "search", query], &[])
    }
}
