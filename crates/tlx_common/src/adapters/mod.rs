//! Package manager adapters
//!
//! Each adapter maps an abstract package operation to a ready-to-execute
//! argument vector. Adapters are pure string builders: no process spawning,
//! no filesystem access.
//!
//! With `dry_run` set, an adapter uses the manager's native preview flag and
//! never emits an auto-confirm flag (`-y`, `--noconfirm`). Where a manager has
//! no preview mode for an operation, a read-only query stands in for it.

mod apk;
mod apt;
mod dnf;
mod pacman;
mod zypper;

pub use apk::ApkAdapter;
pub use apt::AptAdapter;
pub use dnf::DnfAdapter;
pub use pacman::PacmanAdapter;
pub use zypper::ZypperAdapter;

use crate::error::PlanError;

/// Package managers with an adapter
pub const SUPPORTED_MANAGERS: [&str; 5] = ["apt", "dnf", "pacman", "zypper", "apk"];

/// Operation set shared by every package manager
pub trait PackageManagerAdapter: Send + Sync {
    /// Manager identifier ("apt", "pacman", ...)
    fn name(&self) -> &'static str;

    fn dry_run(&self) -> bool;

    fn install(&self, packages: &[String]) -> Vec<String>;

    fn remove(&self, packages: &[String]) -> Vec<String>;

    /// Refresh package metadata
    fn update(&self) -> Vec<String>;

    /// Upgrade installed packages
    fn upgrade(&self) -> Vec<String>;

    /// Search is read-only, so `dry_run` does not change it
    fn search(&self, query: &str) -> Vec<String>;
}

/// Resolve a package manager identifier to its adapter
pub fn adapter_for(pm: &str, dry_run: bool) -> Result<Box<dyn PackageManagerAdapter>, PlanError> {
    let adapter: Box<dyn PackageManagerAdapter> = match pm {
        "apt" => Box::new(AptAdapter::new(dry_run)),
        "dnf" => Box::new(DnfAdapter::new(dry_run)),
        "pacman" => Box::new(PacmanAdapter::new(dry_run)),
        "zypper" => Box::new(ZypperAdapter::new(dry_run)),
        "apk" => Box::new(ApkAdapter::new(dry_run)),
        other => return Err(PlanError::UnsupportedPackageManager(other.to_string())),
    };
    Ok(adapter)
}

/// Build an argv from fixed leading words plus positional packages
pub(crate) fn argv(head: &[&str], packages: &[String]) -> Vec<String> {
    head.iter()
        .map(|s| s.to_string())
        .chain(packages.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIRM_FLAGS: [&str; 3] = ["-y", "--noconfirm", "--yes"];

    fn pkgs() -> Vec<String> {
        vec!["htop".to_string(), "curl".to_string()]
    }

    fn all_dry_commands(adapter: &dyn PackageManagerAdapter) -> Vec<Vec<String>> {
        vec![
            adapter.install(&pkgs()),
            adapter.remove(&pkgs()),
            adapter.update(),
            adapter.upgrade(),
            adapter.search("htop"),
        ]
    }

    #[test]
    fn test_factory_resolves_all_supported() {
        for pm in SUPPORTED_MANAGERS {
            let adapter = adapter_for(pm, true).unwrap();
            assert_eq!(adapter.name(), pm);
            assert!(adapter.dry_run());
        }
    }

    #[test]
    fn test_factory_rejects_unknown() {
        let err = adapter_for("emerge", false).err().unwrap();
        assert_eq!(err, PlanError::UnsupportedPackageManager("emerge".to_string()));
        assert!(adapter_for("unknown", true).is_err());
    }

    #[test]
    fn test_dry_run_never_auto_confirms() {
        for pm in SUPPORTED_MANAGERS {
            let adapter = adapter_for(pm, true).unwrap();
            for cmd in all_dry_commands(adapter.as_ref()) {
                for flag in CONFIRM_FLAGS {
                    assert!(
                        !cmd.iter().any(|a| a == flag),
                        "{pm} dry-run command {cmd:?} contains {flag}"
                    );
                }
                assert_ne!(cmd[0], "sudo", "{pm} dry-run must not elevate: {cmd:?}");
            }
        }
    }

    #[test]
    fn test_dry_run_uses_preview_flag() {
        let preview: [(&str, &[&str]); 5] = [
            ("apt", &["-s"]),
            ("dnf", &["--assumeno"]),
            ("pacman", &["-Sp", "--print", "-Qu"]),
            ("zypper", &["--dry-run"]),
            ("apk", &["--simulate"]),
        ];
        for (pm, flags) in preview {
            let adapter = adapter_for(pm, true).unwrap();
            let mutating = [
                adapter.install(&pkgs()),
                adapter.remove(&pkgs()),
                adapter.update(),
                adapter.upgrade(),
            ];
            for cmd in mutating {
                assert!(
                    cmd.iter().any(|a| flags.contains(&a.as_str())),
                    "{pm} dry-run command {cmd:?} has no preview flag"
                );
            }
        }
    }

    #[test]
    fn test_packages_are_positional_and_ordered() {
        let adapter = adapter_for("apt", false).unwrap();
        let cmd = adapter.install(&pkgs());
        assert_eq!(&cmd[cmd.len() - 2..], &["htop".to_string(), "curl".to_string()]);
    }

    #[test]
    fn test_search_ignores_dry_run() {
        for pm in SUPPORTED_MANAGERS {
            let real = adapter_for(pm, false).unwrap().search("vim");
            let dry = adapter_for(pm, true).unwrap().search("vim");
            assert_eq!(real, dry);
        }
    }
}
