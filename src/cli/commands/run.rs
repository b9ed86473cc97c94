//! `run` command.
//!
//! Executes each planned command inside a phase scope and writes the
//! resulting registry as JSON. Child process output goes to stderr so that
//! stdout carries only the registry (when no output file is set) or events
//! (with `--events-file -`).

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::args::RunArgs;
use crate::config::{PlanLoader, PlannedPhase, RunPlan};
use crate::error::PhaselogError;
use crate::observability::{
    Event, EventEmitter, EventObserver, MetricsObserver, ObserverSet, PhaseObserver,
    TracingObserver, init_metrics,
};
use crate::phase::PhaseId;
use crate::registry::PhaseRegistry;

/// Executes a run plan.
///
/// # Errors
///
/// Returns an error if the plan fails to load, a phase cannot be recorded,
/// an output file cannot be written, or a planned command failed.
pub fn run(args: &RunArgs) -> Result<(), PhaselogError> {
    let plan = PlanLoader::with_defaults().load(&args.plan)?.plan;

    let emitter = Arc::new(open_emitter(args.events_file.as_deref())?);
    let metrics = args.metrics_file.as_ref().map(|_| init_metrics()).transpose()?;

    let mut observers = ObserverSet::new()
        .with(Arc::new(TracingObserver))
        .with(Arc::new(EventObserver::new(Arc::clone(&emitter))));
    if metrics.is_some() {
        observers.push(Arc::new(MetricsObserver));
    }
    let observer: Arc<dyn PhaseObserver> = Arc::new(observers);

    let plan_name = plan
        .name
        .clone()
        .unwrap_or_else(|| args.plan.display().to_string());
    info!(plan = %plan_name, phases = plan.phases.len(), "run started");
    emitter.emit(Event::RunStarted {
        timestamp: Utc::now(),
        plan: plan_name,
        phases: plan.phases.len(),
    });

    let keep_going = args.keep_going || !plan.stop_on_failure;
    let mut registry = PhaseRegistry::new();
    let mut failure: Option<(PhaseId, String)> = None;

    for planned in &plan.phases {
        if let Err(reason) = run_phase(&mut registry, planned, &plan, &observer)? {
            warn!(phase = %planned.id, %reason, "phase command failed");
            failure.get_or_insert_with(|| (PhaseId::from(&planned.id), reason));
            if !keep_going {
                break;
            }
        }
    }

    let success = failure.is_none();
    emitter.emit(Event::RunFinished {
        timestamp: Utc::now(),
        phases: registry.len(),
        success,
    });
    info!(
        phases = registry.len(),
        total = %humantime::format_duration(registry.total_elapsed()),
        success,
        "run finished"
    );

    let output: Option<PathBuf> = args.output.clone().or_else(|| plan.output.clone());
    write_registry(&registry, output.as_deref())?;

    if let (Some(path), Some(handle)) = (&args.metrics_file, &metrics) {
        std::fs::write(path, handle.render())?;
    }

    match failure {
        Some((phase_id, reason)) => Err(PhaselogError::CommandFailed { phase_id, reason }),
        None => Ok(()),
    }
}

fn open_emitter(path: Option<&Path>) -> io::Result<EventEmitter> {
    match path {
        None => Ok(EventEmitter::noop()),
        Some(p) if p.as_os_str() == "-" => Ok(EventEmitter::stdout()),
        Some(p) => EventEmitter::from_file(p),
    }
}

/// Runs one planned phase. The outer error is a recording failure, the
/// inner one describes a failed command.
fn run_phase(
    registry: &mut PhaseRegistry,
    planned: &PlannedPhase,
    plan: &RunPlan,
    observer: &Arc<dyn PhaseObserver>,
) -> Result<Result<(), String>, PhaselogError> {
    let phase = registry.add_new(planned.id.as_str(), false, Some(Arc::clone(observer)));
    for (key, value) in &planned.fields {
        phase.set(key.clone(), value.clone())?;
    }
    phase.set("command", planned.command.to_string())?;

    let status = phase.scoped(|_| execute(planned, &plan.env))?;

    match status {
        Ok(status) => {
            phase.set("exit_code", status.code().map_or(Value::Null, Value::from))?;
            phase.set("success", status.success())?;
            if status.success() {
                Ok(Ok(()))
            } else {
                Ok(Err(format!("command exited with {status}")))
            }
        }
        Err(e) => {
            phase.set("exit_code", Value::Null)?;
            phase.set("success", false)?;
            phase.set("error", e.to_string())?;
            Ok(Err(format!("command could not be started: {e}")))
        }
    }
}

fn execute(planned: &PlannedPhase, plan_env: &IndexMap<String, String>) -> io::Result<ExitStatus> {
    let argv = planned
        .command
        .argv()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
    let Some((program, rest)) = argv.split_first() else {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty command"));
    };

    let mut command = Command::new(program);
    command
        .args(rest)
        .envs(plan_env)
        .envs(&planned.env)
        .stdin(Stdio::null())
        .stdout(io::stderr());
    if let Some(cwd) = &planned.cwd {
        command.current_dir(cwd);
    }
    command.status()
}

fn write_registry(registry: &PhaseRegistry, path: Option<&Path>) -> Result<(), PhaselogError> {
    let mut json = serde_json::to_string_pretty(registry)?;
    json.push('\n');
    match path {
        Some(path) => {
            std::fs::write(path, json)?;
            info!(path = %path.display(), "registry written");
        }
        None => print!("{json}"),
    }
    Ok(())
}
