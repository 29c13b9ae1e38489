//! Planner - turns a typed intent into a concrete plan
//!
//! A plan pairs a human description with two argument vectors: a simulate
//! command built by the dry-run adapter, and the real command built by the
//! normal adapter. Intents that never mutate the system get no real command.
//!
//! Planning is pure: the same intent and distro id always yield the same plan.

use crate::adapters::{adapter_for, PackageManagerAdapter};
use crate::distro::{preferred_pkg_manager, UNKNOWN};
use crate::error::PlanError;
use crate::intent::{Intent, IntentKind};
use serde::{Deserialize, Serialize};

/// Distro assumed when the caller supplies none
pub const DEFAULT_DISTRO: &str = "ubuntu";

/// Script run by the explain simulation; `$1` is the program name
pub const EXPLAIN_SCRIPT: &str = "type -- \"$1\" || true";

/// Description plus simulate/real command pair for one intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub intent: IntentKind,
    pub description: String,
    pub simulate_cmd: Option<Vec<String>>,
    pub real_cmd: Option<Vec<String>>,
}

impl Plan {
    /// True when there is a real command to run after confirmation
    pub fn has_real_cmd(&self) -> bool {
        self.real_cmd.is_some()
    }

    pub fn display_simulate(&self) -> Option<String> {
        self.simulate_cmd.as_ref().map(|c| c.join(" "))
    }

    pub fn display_real(&self) -> Option<String> {
        self.real_cmd.as_ref().map(|c| c.join(" "))
    }
}

/// Real and dry-run adapters for one package manager
struct AdapterPair {
    pm: &'static str,
    real: Box<dyn PackageManagerAdapter>,
    dry: Box<dyn PackageManagerAdapter>,
}

impl AdapterPair {
    fn resolve(distro_id: Option<&str>) -> Result<Self, PlanError> {
        let distro = match distro_id {
            Some(id) if !id.trim().is_empty() => id.trim(),
            _ => DEFAULT_DISTRO,
        };
        let pm = preferred_pkg_manager(distro)
            .ok_or_else(|| PlanError::UnsupportedPackageManager(UNKNOWN.to_string()))?;
        Ok(Self {
            pm,
            real: adapter_for(pm, false)?,
            dry: adapter_for(pm, true)?,
        })
    }
}

/// Build the plan for an intent on the given distro (`"ubuntu"` when absent)
pub fn build_plan(intent: &Intent, distro_id: Option<&str>) -> Result<Plan, PlanError> {
    intent.validate()?;
    let kind = intent.kind();

    let plan = match intent {
        Intent::DetectDistro => Plan {
            intent: kind,
            description: "Detect Linux distribution and version".to_string(),
            simulate_cmd: Some(vec!["cat".to_string(), "/etc/os-release".to_string()]),
            real_cmd: None,
        },
        Intent::SearchPackage { query } => {
            let a = AdapterPair::resolve(distro_id)?;
            Plan {
                intent: kind,
                description: format!("Search for package '{}' using {}", query, a.pm),
                simulate_cmd: Some(a.dry.search(query)),
                real_cmd: Some(a.real.search(query)),
            }
        }
        // assume_yes does not change the generated command; it only feeds
        // the front-end confirmation policy
        Intent::InstallPackage { package, .. } => {
            let a = AdapterPair::resolve(distro_id)?;
            let packages = [package.clone()];
            Plan {
                intent: kind,
                description: format!("Install package '{}' using {}", package, a.pm),
                simulate_cmd: Some(a.dry.install(&packages)),
                real_cmd: Some(a.real.install(&packages)),
            }
        }
        Intent::RemovePackage { package, .. } => {
            let a = AdapterPair::resolve(distro_id)?;
            let packages = [package.clone()];
            Plan {
                intent: kind,
                description: format!("Remove package '{}' using {}", package, a.pm),
                simulate_cmd: Some(a.dry.remove(&packages)),
                real_cmd: Some(a.real.remove(&packages)),
            }
        }
        Intent::UpdateSystem => {
            let a = AdapterPair::resolve(distro_id)?;
            Plan {
                intent: kind,
                description: format!("Update system package lists ({})", a.pm),
                simulate_cmd: Some(a.dry.update()),
                real_cmd: Some(a.real.update()),
            }
        }
        Intent::UpgradeSystem => {
            let a = AdapterPair::resolve(distro_id)?;
            Plan {
                intent: kind,
                description: format!("Upgrade installed packages ({})", a.pm),
                simulate_cmd: Some(a.dry.upgrade()),
                real_cmd: Some(a.real.upgrade()),
            }
        }
        // The program name is passed as a positional argument, never
        // spliced into the script text
        Intent::ExplainCommand { command } => {
            let program = command.split_whitespace().next().unwrap_or(command.as_str());
            Plan {
                intent: kind,
                description: format!("Explain command: {}", command),
                simulate_cmd: Some(vec![
                    "bash".to_string(),
                    "-c".to_string(),
                    EXPLAIN_SCRIPT.to_string(),
                    "bash".to_string(),
                    program.to_string(),
                ]),
                real_cmd: None,
            }
        }
        Intent::TroubleshootError { .. } => return Err(PlanError::UnsupportedIntent(kind)),
    };

    Ok(plan)
}

/// One-line risk note shown before simulation
pub fn risk_hint(kind: IntentKind) -> &'static str {
    match kind {
        IntentKind::InstallPackage => "Risk: package install may modify system state.",
        IntentKind::RemovePackage => "Risk: removing packages can break dependencies.",
        IntentKind::UpdateSystem => "Risk: updates could introduce new versions; review changes.",
        IntentKind::UpgradeSystem => "Risk: upgrades can be disruptive; ensure backups.",
        IntentKind::SearchPackage => "Low risk: read-only package metadata query.",
        IntentKind::ExplainCommand => "Low risk: explanation only, no execution.",
        IntentKind::DetectDistro => "Low risk: reads system metadata.",
        IntentKind::TroubleshootError => "Low risk: reads operation history only.",
    }
}

/// How to back out of a mutating intent, if there is a known way
pub fn undo_hint(kind: IntentKind) -> Option<&'static str> {
    match kind {
        IntentKind::InstallPackage => {
            Some("Undo: remove with your package manager (e.g. apt remove <pkg>).")
        }
        IntentKind::RemovePackage => {
            Some("Undo: reinstall the package if available (e.g. apt install <pkg>).")
        }
        IntentKind::UpdateSystem => {
            Some("Undo: limited; check your package manager log for changed packages.")
        }
        IntentKind::UpgradeSystem => Some("Undo: use snapshots/backups or downgrade manually."),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_install_on_ubuntu() {
        let plan = build_plan(&Intent::install("htop"), Some("ubuntu")).unwrap();
        assert_eq!(plan.intent, IntentKind::InstallPackage);
        assert_eq!(plan.description, "Install package 'htop' using apt");
        assert_eq!(plan.simulate_cmd, Some(strs(&["apt", "install", "-s", "htop"])));
        assert_eq!(plan.real_cmd, Some(strs(&["sudo", "apt", "install", "-y", "htop"])));
    }

    #[test]
    fn test_upgrade_on_arch_lists_upgradeable() {
        let plan = build_plan(&Intent::UpgradeSystem, Some("arch")).unwrap();
        assert_eq!(plan.simulate_cmd, Some(strs(&["pacman", "-Qu"])));
        assert_eq!(plan.real_cmd, Some(strs(&["sudo", "pacman", "-Syu", "--noconfirm"])));
    }

    #[test]
    fn test_missing_distro_defaults_to_ubuntu() {
        let plan = build_plan(&Intent::UpdateSystem, None).unwrap();
        assert_eq!(plan.description, "Update system package lists (apt)");
        let blank = build_plan(&Intent::UpdateSystem, Some("  ")).unwrap();
        assert_eq!(plan, blank);
    }

    #[test]
    fn test_unknown_distro_is_config_error() {
        let err = build_plan(&Intent::install("htop"), Some("gentoo")).unwrap_err();
        assert!(matches!(err, PlanError::UnsupportedPackageManager(_)));
    }

    #[test]
    fn test_search_simulate_equals_real() {
        let plan = build_plan(&Intent::search("curl"), Some("fedora")).unwrap();
        assert_eq!(plan.simulate_cmd, plan.real_cmd);
        assert_eq!(plan.real_cmd, Some(strs(&["dnf", "search", "curl"])));
    }

    #[test]
    fn test_remove_on_opensuse() {
        let plan = build_plan(&Intent::remove("vim"), Some("opensuse-leap")).unwrap();
        assert_eq!(plan.simulate_cmd, Some(strs(&["zypper", "--dry-run", "remove", "vim"])));
        assert_eq!(plan.real_cmd, Some(strs(&["sudo", "zypper", "remove", "-y", "vim"])));
    }

    #[test]
    fn test_detect_distro_is_simulate_only() {
        let plan = build_plan(&Intent::DetectDistro, Some("gentoo")).unwrap();
        assert_eq!(plan.simulate_cmd, Some(strs(&["cat", "/etc/os-release"])));
        assert!(plan.real_cmd.is_none());
        assert!(!plan.has_real_cmd());
    }

    #[test]
    fn test_explain_uses_first_token() {
        let plan = build_plan(&Intent::explain("rsync -avz src/ dst/"), None).unwrap();
        assert_eq!(plan.description, "Explain command: rsync -avz src/ dst/");
        assert_eq!(
            plan.simulate_cmd,
            Some(strs(&["bash", "-c", EXPLAIN_SCRIPT, "bash", "rsync"]))
        );
        assert!(plan.real_cmd.is_none());
    }

    #[test]
    fn test_explain_keeps_program_out_of_script() {
        for hostile in ["$(touch${IFS}/tmp/tlx_marker)", "`id`", "ls;reboot", "a|b"] {
            let plan = build_plan(&Intent::explain(hostile), None).unwrap();
            let argv = plan.simulate_cmd.unwrap();
            assert_eq!(argv[2], EXPLAIN_SCRIPT);
            assert_eq!(argv.last().map(String::as_str), Some(hostile));
            assert!(!argv[2].contains(hostile));
        }
    }

    #[test]
    fn test_assume_yes_is_inert() {
        let with = Intent::InstallPackage {
            package: "htop".to_string(),
            assume_yes: true,
        };
        let without = Intent::install("htop");
        assert_eq!(
            build_plan(&with, Some("debian")).unwrap(),
            build_plan(&without, Some("debian")).unwrap()
        );
    }

    #[test]
    fn test_troubleshoot_is_unsupported() {
        let intent = Intent::TroubleshootError {
            error_text: "E: Unable to locate package".to_string(),
        };
        let err = build_plan(&intent, None).unwrap_err();
        assert_eq!(err, PlanError::UnsupportedIntent(IntentKind::TroubleshootError));
    }

    #[test]
    fn test_invalid_intent_never_planned() {
        let err = build_plan(&Intent::install(""), None).unwrap_err();
        assert!(matches!(err, PlanError::Intent(_)));
    }

    #[test]
    fn test_build_plan_is_deterministic() {
        let intent = Intent::remove("nano");
        let a = build_plan(&intent, Some("alpine")).unwrap();
        let b = build_plan(&intent, Some("alpine")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hints() {
        assert!(risk_hint(IntentKind::RemovePackage).starts_with("Risk"));
        assert!(undo_hint(IntentKind::InstallPackage).is_some());
        assert!(undo_hint(IntentKind::SearchPackage).is_none());
    }
}
