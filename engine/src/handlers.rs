//! Command handlers for CLI operations
//!
//! - capabilities: List enabled capabilities
//! - validate: Check a plan document without running it
//! - run: Validate and execute a plan document

use anyhow::{Context, Result};
use serde_json::json;
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::conductor::Conductor;
use crate::config::Config;
use crate::modules::InMemoryPreferences;
use crate::plan::PlanError;
use crate::registry::ModuleRegistry;
use crate::scheduler::{ExecutionResult, StepStatus};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// How long shutdown waits for blocking tasks still running
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Run a command future on a fresh multi-threaded runtime.
///
/// A confirmation prompt abandoned by a cancelled step keeps its blocking
/// thread parked on stdin. Shutdown waits at most `SHUTDOWN_GRACE` for such
/// threads and then exits without them.
pub fn run_command<F: Future>(command: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let output = runtime.block_on(command);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    Ok(output)
}

/// Build a conductor from configuration
pub fn build_conductor(config: &Config) -> Result<Conductor> {
    let registry = ModuleRegistry::from_config(config, Arc::new(InMemoryPreferences::new()))
        .context("Failed to build module registry")?;
    Ok(Conductor::from_config(config, Arc::new(registry)))
}

/// List every enabled capability
pub fn handle_capabilities(conductor: &Conductor, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            print!("{}", conductor.registry().catalog());
        }
        OutputFormat::Json => {
            let output = json!({ "capabilities": conductor.capabilities() });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Validate a plan document
pub fn handle_validate(path: &Path, conductor: &Conductor, format: OutputFormat) -> Result<()> {
    let document = read_plan(path)?;

    match conductor.validate_document(&document) {
        Ok(plan) => {
            match format {
                OutputFormat::Text => {
                    println!("✓ Plan '{}' is valid", plan.goal());
                    println!("  Steps: {}", plan.len());
                    println!("  Groups: {}", plan.groups().len());
                }
                OutputFormat::Json => {
                    let output = json!({
                        "valid": true,
                        "goal": plan.goal(),
                        "steps": plan.len(),
                        "groups": plan.groups().len(),
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
            Ok(())
        }
        Err(e) => {
            report_plan_error(&e, format)?;
            Err(e.into())
        }
    }
}

/// Validate and execute a plan document
///
/// Without `yes`, steps that need confirmation are confirmed interactively
/// on stdin.
pub async fn handle_run(
    path: &Path,
    yes: bool,
    timeout: Option<u64>,
    conductor: Conductor,
    format: OutputFormat,
) -> Result<()> {
    let document = read_plan(path)?;

    let mut conductor = if yes {
        conductor.with_confirmation(|_| true)
    } else {
        conductor.with_confirmation(prompt_confirmation)
    };
    if let Some(secs) = timeout {
        conductor = conductor.with_timeout((secs > 0).then(|| Duration::from_secs(secs)));
    }

    let result = match conductor.run_document(&document).await {
        Ok(result) => result,
        Err(e) => {
            report_plan_error(&e, format)?;
            return Err(e.into());
        }
    };

    match format {
        OutputFormat::Text => print_result(&result),
        OutputFormat::Json => println!("{}", result.to_json_pretty()),
    }

    if !result.success {
        anyhow::bail!(
            "{} step(s) failed, {} not run",
            result.steps_failed,
            result.steps_not_run
        );
    }
    Ok(())
}

fn read_plan(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan document {}", path.display()))
}

/// Held for a whole question and answer, since steps of a group ask concurrently
static PROMPT_LOCK: Mutex<()> = Mutex::new(());

/// Ask on the terminal. Anything but y/yes declines.
fn prompt_confirmation(prompt: &str) -> bool {
    let _turn = PROMPT_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut stderr = io::stderr();
    if write!(stderr, "Allow: {}? [y/N]: ", prompt).is_err() || stderr.flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn report_plan_error(error: &PlanError, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => match error {
            PlanError::Invalid(invalid) => {
                println!("✗ Plan rejected ({} violation(s)):", invalid.violations.len());
                for violation in &invalid.violations {
                    println!("  - {}", violation);
                }
            }
            other => println!("✗ {}", other),
        },
        OutputFormat::Json => {
            let output = match error {
                PlanError::Invalid(invalid) => json!({
                    "valid": false,
                    "violations": invalid.violations,
                }),
                other => json!({
                    "valid": false,
                    "error": other.to_string(),
                }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn print_result(result: &ExecutionResult) {
    for step in &result.results {
        let mark = match step.status {
            StepStatus::Succeeded => "✓",
            StepStatus::NotRun => "-",
            _ => "✗",
        };
        match &step.error {
            Some(error) => println!("{} Step {} ({}): {}", mark, step.step_id, step.module, error),
            None => println!("{} Step {} ({}) in {}ms", mark, step.step_id, step.module, step.duration_ms),
        }
    }
    println!();
    println!("Run: {}", result.run_id);
    println!("  Completed: {}", result.steps_completed);
    println!("  Failed: {}", result.steps_failed);
    if result.steps_not_run > 0 || result.timed_out {
        println!("  Not run: {} (timed out)", result.steps_not_run);
    }
    println!("  Duration: {:.2}s", result.duration_seconds);
}
