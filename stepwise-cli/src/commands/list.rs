//! `stepwise list` command handler

use std::io::Write;

use serde::Serialize;

use crate::error::CliError;
use crate::output::{OutputWriter, Render};
use crate::scenarios::BUILTIN_SCENARIOS;

/// Execute the `list` command.
pub fn execute(writer: &OutputWriter) -> Result<(), CliError> {
    writer.render(&build_scenario_list())
}

pub fn build_scenario_list() -> ScenarioList {
    ScenarioList {
        scenarios: BUILTIN_SCENARIOS
            .iter()
            .map(|s| ScenarioEntry {
                name: s.name.to_owned(),
                description: s.description.to_owned(),
            })
            .collect(),
    }
}

#[derive(Debug, Serialize)]
pub struct ScenarioList {
    pub scenarios: Vec<ScenarioEntry>,
}

#[derive(Debug, Serialize)]
pub struct ScenarioEntry {
    pub name: String,
    pub description: String,
}

impl Render for ScenarioList {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Built-in scenarios:")?;
        let width = self
            .scenarios
            .iter()
            .map(|s| s.name.len())
            .max()
            .unwrap_or(0);
        for entry in &self.scenarios {
            writeln!(
                w,
                "  {:<width$}  {}",
                entry.name.bold(),
                entry.description,
                width = width
            )?;
        }
        Ok(())
    }
}
