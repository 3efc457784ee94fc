use clap::Parser;
use colored::Colorize;

use stepwise_cli::cli::Cli;
use stepwise_cli::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match stepwise_cli::dispatch(cli).await {
        Ok(()) => 0,
        Err(e) => {
            report_error(&e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn report_error(e: &CliError) {
    match e {
        // the rendered report already explains the failure
        CliError::ScenarioFailed { .. } => eprintln!("{} {}", "stepwise:".bold(), e),
        _ => eprintln!("{} {}", "error:".red().bold(), e),
    }
}
