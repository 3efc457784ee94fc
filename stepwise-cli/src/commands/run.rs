//! `stepwise run` command handler

use std::io::Write;

use serde::Serialize;
use stepwise_core::config::StepwiseConfig;
use stepwise_core::types::format_sim_time;
use stepwise_scenario::{ScenarioOutcome, ScenarioReport};
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};
use crate::scenarios::{self, BUILTIN_SCENARIOS};

/// Execute the `run` command.
///
/// The report is always rendered; a scenario that does not pass is
/// returned as [`CliError::ScenarioFailed`] afterwards.
pub fn execute(
    args: RunArgs,
    config: &StepwiseConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = run_scenario(&args.scenario, config)?;
    writer.render(&report)?;
    ensure_passed(&report.0)
}

/// Run a built-in scenario by name.
pub fn run_scenario(name: &str, config: &StepwiseConfig) -> Result<RunReport, CliError> {
    let scenario = scenarios::find(name).ok_or_else(|| {
        let known: Vec<&str> = BUILTIN_SCENARIOS.iter().map(|s| s.name).collect();
        CliError::Command(format!(
            "unknown scenario: {} (expected: {})",
            name,
            known.join(", ")
        ))
    })?;

    info!(scenario = name, "running built-in scenario");
    let mut story = scenario.build(config)?;
    Ok(RunReport(story.run()?))
}

fn ensure_passed(report: &ScenarioReport) -> Result<(), CliError> {
    if report.is_passed() {
        return Ok(());
    }
    Err(CliError::ScenarioFailed {
        name: report.name.clone(),
        result: report.outcome.label().to_owned(),
    })
}

/// Scenario report as printed by the CLI.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct RunReport(pub ScenarioReport);

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let report = &self.0;
        writeln!(w, "Scenario {} (run {})", report.name.bold(), report.run_id)?;

        let result = match &report.outcome {
            ScenarioOutcome::Passed => "PASSED".green().bold(),
            ScenarioOutcome::Failed { .. } => "FAILED".red().bold(),
            ScenarioOutcome::Aborted { .. } => "ABORTED".yellow().bold(),
        };
        writeln!(w, "  Result: {}", result)?;
        match &report.outcome {
            ScenarioOutcome::Passed => {}
            ScenarioOutcome::Failed { failure } => {
                writeln!(w, "  Failure: {}", failure.to_string().red())?;
            }
            ScenarioOutcome::Aborted {
                reason,
                pending_step,
            } => {
                writeln!(w, "  Reason: {}", reason)?;
                if let Some(step) = pending_step {
                    writeln!(w, "  Pending step: {}", step)?;
                }
            }
        }

        writeln!(w, "  Steps:")?;
        for step in &report.steps {
            let optional = if step.required { "" } else { " (optional)" };
            writeln!(
                w,
                "    {:>2}. [{:<8}] {} <{}>{}",
                step.position + 1,
                step.state.to_string(),
                step.name,
                step.kind,
                optional
            )?;
        }
        writeln!(w, "  Notifications observed: {}", report.notifications_observed)?;
        writeln!(w, "  Events processed: {}", report.events_processed)?;
        writeln!(
            w,
            "  Simulated time: {}",
            format_sim_time(report.simulated_time)
        )?;
        Ok(())
    }
}
