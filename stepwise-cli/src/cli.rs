//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Stepwise -- given/when/then scenario runner for discrete-event simulations.
///
/// Use `stepwise <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "stepwise", version, about, long_about = None)]
pub struct Cli {
    /// Path to the stepwise.toml configuration file.
    ///
    /// When omitted, `./stepwise.toml` is used if it exists, otherwise built-in defaults.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a built-in scenario against the traffic-light simulation.
    Run(RunArgs),

    /// List built-in scenarios.
    List,

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario name (see `stepwise list`).
    pub scenario: String,
}

// ---- config ----

/// Manage stepwise configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only one section (general, scenario, traffic).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_with_global_flags() {
        let cli = Cli::try_parse_from([
            "stepwise",
            "run",
            "red-then-green",
            "--output",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("run should parse");

        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Run(args) => assert_eq!(args.scenario, "red-then-green"),
            other => panic!("expected run command, got {other:?}"),
        }
    }

    #[test]
    fn parse_config_show_section() {
        let cli = Cli::try_parse_from([
            "stepwise",
            "--config",
            "/tmp/stepwise.toml",
            "config",
            "show",
            "--section",
            "traffic",
        ])
        .expect("config show should parse");

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/stepwise.toml")));
        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Show { section },
            }) => assert_eq!(section.as_deref(), Some("traffic")),
            other => panic!("expected config show, got {other:?}"),
        }
    }

    #[test]
    fn run_requires_scenario_name() {
        assert!(Cli::try_parse_from(["stepwise", "run"]).is_err());
    }

    #[test]
    fn unknown_output_format_is_rejected() {
        assert!(Cli::try_parse_from(["stepwise", "--output", "yaml", "list"]).is_err());
    }
}
