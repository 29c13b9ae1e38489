//! Command handlers for tlxctl.

use crate::output;
use crate::{ActionArgs, Cli, Commands, HistoryCommand, RunArgs};
use anyhow::{anyhow, bail, Context as _, Result};
use std::io::{self, BufRead, Write};
use std::sync::{mpsc, Arc};
use tlx_common::backend::DEFAULT_TIMEOUT_SECS as MODEL_TIMEOUT_SECS;
use tlx_common::planner::{risk_hint, undo_hint, DEFAULT_DISTRO};
use tlx_common::{
    build_plan, distro, run_background, AppConfig, BackendKind, Cancelled, CancellationToken,
    FakeBackend, Intent, IntentDecider, ModelBackend, OllamaBackend, OperationHistory,
    ShellRunner, SystemShell, Workflow,
};
use tracing::{debug, warn};

/// Loaded once per invocation
struct Context {
    config: AppConfig,
    history: Option<Arc<OperationHistory>>,
}

impl Context {
    fn load(no_history: bool) -> Result<Self> {
        let mut config = AppConfig::load()?;
        if no_history {
            config.history_enabled = false;
        }

        // A broken history store must not block planning
        let history = if config.history_enabled {
            match OperationHistory::open(&config.history_path) {
                Ok(h) => Some(Arc::new(h)),
                Err(e) => {
                    warn!("Operation history unavailable: {:#}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self { config, history })
    }

    fn require_history(&self) -> Result<&OperationHistory> {
        self.history
            .as_deref()
            .ok_or_else(|| anyhow!("Operation history is disabled or unavailable"))
    }

    fn workflow(&self) -> Workflow {
        let runner: Arc<dyn ShellRunner> =
            Arc::new(SystemShell::new(self.config.effective_shell_timeout()));
        Workflow::new(runner, self.history.clone())
            .with_summary_lines(self.config.effective_summary_lines())
    }

    /// --distro, then config, then /etc/os-release. None lets the planner
    /// fall back to its default.
    fn distro(&self, requested: Option<&str>) -> Option<String> {
        if let Some(id) = requested.or(self.config.default_distro.as_deref()) {
            return Some(id.trim().to_lowercase());
        }
        let detected = distro::detect();
        if detected.is_known() {
            Some(detected.id)
        } else {
            warn!("Could not detect distro; planning for {}", DEFAULT_DISTRO);
            None
        }
    }
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let ctx = Context::load(cli.no_history)?;

    match cli.command {
        Commands::Plan { action, run } => {
            let intent = intent_from_action(action)?;
            run_intent(&ctx, intent, IntentSource::User, &run)
        }
        Commands::Intent { json, run } => {
            let intent = Intent::from_json_str(&json)?;
            run_intent(&ctx, intent, IntentSource::User, &run)
        }
        Commands::Chat {
            text,
            backend,
            model,
            fake_json,
            run,
        } => chat(&ctx, &text, backend, model, fake_json, &run),
        Commands::History { action } => history(&ctx, action),
        Commands::Distro => show_distro(),
        Commands::Config => {
            print!("{}", ctx.config.to_toml()?);
            Ok(())
        }
    }
}

fn intent_from_action(action: ActionArgs) -> Result<Intent> {
    let intent = if let Some(pkg) = action.install {
        Intent::install(pkg)
    } else if let Some(pkg) = action.remove {
        Intent::remove(pkg)
    } else if let Some(query) = action.search {
        Intent::search(query)
    } else if let Some(cmd) = action.explain {
        Intent::explain(cmd)
    } else if action.update {
        Intent::UpdateSystem
    } else if action.upgrade {
        Intent::UpgradeSystem
    } else if action.detect {
        Intent::DetectDistro
    } else {
        bail!("No action given (use --install, --remove, --search, --update, --upgrade, --explain or --detect)");
    };
    Ok(intent)
}

/// Who produced the intent being run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntentSource {
    /// Typed on the command line (`plan`, `intent --json`)
    User,
    /// Decided by a model backend (`chat`)
    Model,
}

/// Plan, simulate, confirm, execute
fn run_intent(ctx: &Context, intent: Intent, source: IntentSource, run: &RunArgs) -> Result<()> {
    if let Intent::TroubleshootError { error_text } = &intent {
        return troubleshoot(ctx, error_text);
    }

    let distro = ctx.distro(run.distro.as_deref());
    let plan = Arc::new(build_plan(&intent, distro.as_deref())?);
    output::plan(
        &plan,
        distro.as_deref().unwrap_or(DEFAULT_DISTRO),
        risk_hint(plan.intent),
        undo_hint(plan.intent),
    );

    let workflow = Arc::new(ctx.workflow());

    let sim = {
        let workflow = Arc::clone(&workflow);
        let plan = Arc::clone(&plan);
        in_background(move |token| {
            token.check_cancelled()?;
            Ok(workflow.simulate(plan))
        })?
    };
    output::block("Simulation", &sim.summary);

    if !plan.has_real_cmd() {
        if run.real {
            output::info("Nothing to execute for this intent.");
        }
        return Ok(());
    }
    if !run.real {
        output::info("Simulation only. Re-run with --real to execute.");
        return Ok(());
    }

    if !skips_confirmation(&intent, source, run) && !confirm("Execute real command? [Y/n]: ")? {
        workflow.record_cancelled(&plan);
        output::warn("Cancelled. Nothing was executed.");
        return Ok(());
    }

    let exe = {
        let workflow = Arc::clone(&workflow);
        let plan = Arc::clone(&plan);
        in_background(move |token| {
            token.check_cancelled()?;
            Ok(workflow.execute(plan))
        })?
    };
    output::block("Execution", &exe.summary);

    match exe.result.as_ref() {
        Some(result) if !result.success() => {
            bail!("Command failed with exit code {}", result.returncode)
        }
        _ => {
            output::success("Done.");
            Ok(())
        }
    }
}

/// Only --yes or a user-typed `assume_yes` skips the prompt. A model's
/// `assume_yes` is ignored.
fn skips_confirmation(intent: &Intent, source: IntentSource, run: &RunArgs) -> bool {
    run.yes || (source == IntentSource::User && intent_assumes_yes(intent))
}

// assume_yes never changes the plan; it only skips the prompt here
fn intent_assumes_yes(intent: &Intent) -> bool {
    match intent {
        Intent::InstallPackage { assume_yes, .. } | Intent::RemovePackage { assume_yes, .. } => {
            *assume_yes
        }
        _ => false,
    }
}

/// Run one workflow phase on a background task and wait for it
fn in_background<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&CancellationToken) -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Result<T>>();
    let err_tx = tx.clone();

    let handle = run_background(
        work,
        Some(Box::new(move |value| {
            let _ = tx.send(Ok(value));
        })),
        Some(Box::new(move |e| {
            let _ = err_tx.send(Err(e));
        })),
    );
    handle.join()?;

    // No message means the task was cancelled before a callback fired
    rx.try_recv().unwrap_or_else(|_| Err(Cancelled.into()))
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input)? == 0 {
        // EOF counts as no
        println!();
        return Ok(false);
    }
    let answer = input.trim().to_lowercase();
    Ok(matches!(answer.as_str(), "" | "y" | "yes"))
}

fn chat(
    ctx: &Context,
    text: &str,
    backend: Option<String>,
    model: Option<String>,
    fake_json: Option<String>,
    run: &RunArgs,
) -> Result<()> {
    let kind: BackendKind = match backend {
        Some(name) => name.parse()?,
        None => ctx.config.backend,
    };

    let backend: Box<dyn ModelBackend> = match (kind, fake_json) {
        (_, Some(forced)) => Box::new(FakeBackend::forced(forced)),
        (BackendKind::Fake, None) => Box::new(FakeBackend::new()),
        (BackendKind::Ollama, None) => Box::new(OllamaBackend::new(
            ctx.config.ollama_endpoint.clone(),
            model.unwrap_or_else(|| ctx.config.model.clone()),
            MODEL_TIMEOUT_SECS,
        )?),
    };
    debug!("Deciding intent with {} backend", kind.as_str());

    let decider = IntentDecider::new(backend)?;
    let intent = decider
        .decide(text)
        .context("Could not turn that request into an intent")?;
    output::kv("decided", &serde_json::to_string(&intent)?);

    run_intent(ctx, intent, IntentSource::Model, run)
}

/// Show earlier failures that resemble the given error text
fn troubleshoot(ctx: &Context, error_text: &str) -> Result<()> {
    let history = ctx.require_history()?;
    output::header("Troubleshoot");
    output::kv("error", error_text);
    println!();

    let pattern = troubleshoot_pattern(error_text);
    let mut matches = history.get_similar_failures(&pattern, 5)?;
    if matches.is_empty() {
        matches = history
            .get_by_status(tlx_common::OperationStatus::Failed, 50)?
            .into_iter()
            .filter(|r| {
                r.error_message
                    .as_deref()
                    .map(|e| e.contains(error_text.trim()))
                    .unwrap_or(false)
            })
            .take(5)
            .collect();
    }
    output::records(&matches);
    Ok(())
}

// Longest word of the error text is the most specific command fragment
fn troubleshoot_pattern(error_text: &str) -> String {
    error_text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '-' && c != '.'))
        .max_by_key(|w| w.len())
        .unwrap_or("")
        .to_string()
}

fn history(ctx: &Context, action: HistoryCommand) -> Result<()> {
    let history = ctx.require_history()?;

    match action {
        HistoryCommand::Recent { limit } => {
            output::header("Recent operations");
            output::records(&history.get_recent(limit)?);
        }
        HistoryCommand::Failures { pattern, limit } => {
            output::header(&format!("Failures matching '{}'", pattern));
            output::records(&history.get_similar_failures(&pattern, limit)?);
        }
        HistoryCommand::Stats { intent } => {
            let title = match intent.as_deref() {
                Some(i) => format!("Stats for {}", i),
                None => "Stats".to_string(),
            };
            output::header(&title);
            output::stats(&history.get_stats(intent.as_deref())?);
        }
        HistoryCommand::Cleanup { keep } => {
            let keep = keep.unwrap_or(ctx.config.history_keep);
            let deleted = history.cleanup_old(keep)?;
            output::success(&format!("Deleted {} record(s), kept at most {}", deleted, keep));
        }
    }
    Ok(())
}

fn show_distro() -> Result<()> {
    let info = distro::detect();
    output::header("Distribution");
    output::kv("id", &info.id);
    output::kv("version", &info.version_id);
    output::kv(
        "pkg manager",
        info.package_manager().unwrap_or("unsupported"),
    );
    Ok(())
}
