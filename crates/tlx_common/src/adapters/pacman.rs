//! pacman (Arch Linux and derivatives)
//!
//! pacman has no preview mode for a full upgrade, so the dry-run `upgrade`
//! lists upgradeable packages instead (`pacman -Qu`).

use super::{argv, PackageManagerAdapter};

#[derive(Debug, Clone, Copy, Default)]
pub struct PacmanAdapter {
    dry_run: bool,
}

impl PacmanAdapter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

impl PackageManagerAdapter for PacmanAdapter {
    fn name(&self) -> &'static str {
        "pacman"
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }

    fn install(&self, packages: &[String]) -> Vec<String> {
        if self.dry_run {
            argv(&["pacman", "-Sp"], packages)
        } else {
            argv(&["sudo", "pacman", "-S", "--noconfirm"], packages)
        }
    }

    fn remove(&self, packages: &[String]) -> Vec<String> {
        if self.dry_run {
            argv(&["pacman", "-R", "--print"], packages)
        } else {
            argv(&["sudo", "pacman", "-R", "--noconfirm"], packages)
        }
    }

    fn update(&self) -> Vec<String> {
        if self.dry_run {
            argv(&["pacman", "-Syu", "--print"], &[])
        } else {
            argv(&["sudo", "pacman", "-Syu", "--noconfirm"], &[])
        }
    }

    fn upgrade(&self) -> Vec<String> {
        if self.dry_run {
            argv(&["pacman", "-Qu"], &[])
        } else {
            argv(&["sudo", "pacman", "-Syu", "--noconfirm"], &[])
        }
    }

    fn search(&self, query: &str) -> Vec<String> {
        argv(&["pacman", "-Ss", query], &[])
    }
}
