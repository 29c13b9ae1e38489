//! zypper (openSUSE, SLES)

use super::{argv, PackageManagerAdapter};

#[derive(Debug, Clone, Copy, Default)]
pub struct ZypperAdapter {
    dry_run: bool,
}

impl ZypperAdapter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl PackageManagerAdapter for ZypperAdapter {
    fn name(&self) -> &'static str {
        "zypper"
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }

    fn install(&self, packages: &[String]) -> Vec<String> {
        if self.dry_run {
            argv(&["zypper", "--dry-run", "install"], packages)
        } else {
            argv(&["sudo", "zypper", "install", "-y"], packages)
        }
    }

    fn remove(&self, packages: &[String]) -> Vec<String> {
        if self.dry_run {
            argv(&["zypper", "--dry-run", "remove"], packages)
        } else {
            argv(&["sudo", "zypper", "remove", "-y"], packages)
        }
    }

    fn update(&self) -> Vec<String> {
        if self.dry_run {
            argv(&["zypper", "--dry-run", "update"], &[])
        } else {
            argv(&["sudo", "zypper", "update", "-y"], &[])
        }
    }

    fn upgrade(&self) -> Vec<String> {
        self.update()
    }

    fn search(&self, query: &str) -> Vec<String> {
        argv(&["zypper", "search", query], &[])
    }
}
