//! tlx_common - intent planning and safety-gated execution for tinyllamax
//!
//! Typed intents become package-manager command plans. Every plan is
//! simulated first; the real command only runs after the caller confirms.
//! All runs land in an append-only SQLite history.

pub mod adapters;
pub mod background;
pub mod backend;
pub mod config;
pub mod decider;
pub mod distro;
pub mod error;
pub mod history;
pub mod intent;
pub mod paths;
pub mod planner;
pub mod shell;
pub mod workflow;

pub use adapters::{adapter_for, PackageManagerAdapter};
pub use background::{run_background, BackgroundTask, CancellationToken, TaskHandle};
pub use backend::{FakeBackend, ModelBackend, OllamaBackend};
pub use config::{AppConfig, BackendKind};
pub use decider::IntentDecider;
pub use distro::DistroInfo;
pub use error::{BackendError, Cancelled, IntentError, PlanError};
pub use history::{HistoryStats, OperationHistory, OperationRecord, OperationStatus};
pub use intent::{parse_intent, Intent, IntentKind};
pub use planner::{build_plan, Plan};
pub use shell::{ShellResult, ShellRunner, SystemShell};
pub use workflow::{ExecutionResult, SimulationResult, Workflow};
