//! Stepwise CLI library
//!
//! The `stepwise` binary is a thin wrapper around [`dispatch`]; the modules are
//! exposed so command handlers can be exercised from integration tests.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod scenarios;

use cli::{Cli, Commands};
use commands::config::LoadedConfig;
use error::CliError;
use output::OutputWriter;

/// Load configuration, initialise logging and run the selected command.
pub async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config.as_deref();
    let log_level = cli.log_level;

    match cli.command {
        // `config` reports load errors itself
        Commands::Config(args) => {
            init_logging_with_defaults(log_level.as_deref());
            commands::config::execute(args, config_path, &writer).await
        }
        Commands::Run(args) => {
            let loaded = prepare(config_path, log_level).await?;
            commands::run::execute(args, &loaded.config, &writer)
        }
        Commands::List => {
            prepare(config_path, log_level).await?;
            commands::list::execute(&writer)
        }
    }
}

async fn prepare(
    config_path: Option<&std::path::Path>,
    log_level: Option<String>,
) -> Result<LoadedConfig, CliError> {
    let mut loaded = commands::config::load_effective(config_path).await?;
    if let Some(level) = log_level {
        loaded.config.general.log_level = level;
        loaded.config.validate()?;
    }
    logging::init_tracing(&loaded.config.general)
        .map_err(|e| CliError::Config(e.to_string()))?;
    tracing::debug!(source = %loaded.source, "configuration loaded");
    Ok(loaded)
}

fn init_logging_with_defaults(level: Option<&str>) {
    let mut general = stepwise_core::config::GeneralConfig::default();
    if let Some(level) = level {
        general.log_level = level.to_owned();
    }
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("warning: {e}");
    }
}
