//! `stepwise config` command handler and effective configuration loading

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use stepwise_core::config::StepwiseConfig;
use tracing::{debug, info};

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Configuration file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "stepwise.toml";

const DEFAULTS_SOURCE: &str = "(built-in defaults)";

/// Effective configuration together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: StepwiseConfig,
    pub source: String,
}

/// Load the effective configuration.
///
/// An explicit path must exist. Without one, `./stepwise.toml` is used when
/// present; otherwise defaults with environment overrides apply.
pub async fn load_effective(path: Option<&Path>) -> Result<LoadedConfig, CliError> {
    let path: PathBuf = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !tokio::fs::try_exists(&default_path).await.unwrap_or(false) {
                debug!("no configuration file found, using defaults");
                let mut config = StepwiseConfig::default();
                config.apply_env_overrides();
                config.validate()?;
                return Ok(LoadedConfig {
                    config,
                    source: DEFAULTS_SOURCE.to_owned(),
                });
            }
            default_path
        }
    };

    let config = StepwiseConfig::load(&path).await?;
    Ok(LoadedConfig {
        config,
        source: path.display().to_string(),
    })
}

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load and validate the configuration, reporting any errors.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails.
async fn execute_validate(config_path: Option<&Path>, writer: &OutputWriter) -> Result<(), CliError> {
    let source = describe_source(config_path);
    info!(source = %source, "validating configuration");

    let report = match load_effective(config_path).await {
        Ok(loaded) => ConfigValidationReport {
            source: loaded.source,
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source,
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Display the effective configuration (file + env overrides + defaults).
///
/// # Errors
///
/// Returns `CliError::Config` if loading fails or `CliError::Command` if section name is invalid.
async fn execute_show(
    config_path: Option<&Path>,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let loaded = load_effective(config_path).await?;
    let report = build_config_report(&loaded, section.as_deref())?;
    writer.render(&report)?;
    Ok(())
}

/// Serialize the whole configuration or one section of it.
pub fn build_config_report(
    loaded: &LoadedConfig,
    section: Option<&str>,
) -> Result<ConfigReport, CliError> {
    let config = &loaded.config;
    let config_toml = match section {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("scenario") => toml::to_string_pretty(&config.scenario),
        Some("traffic") => toml::to_string_pretty(&config.traffic),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: general, scenario, traffic)",
                other
            )));
        }
    }
    .unwrap_or_else(|e| format!("(serialization error: {})", e));

    Ok(ConfigReport {
        source: loaded.source.clone(),
        section: section.map(str::to_owned),
        config: serde_json::to_value(section_value(config, section))?,
        config_toml,
    })
}

fn section_value<'a>(config: &'a StepwiseConfig, section: Option<&str>) -> SectionRef<'a> {
    match section {
        Some("general") => SectionRef::General(&config.general),
        Some("scenario") => SectionRef::Scenario(&config.scenario),
        Some("traffic") => SectionRef::Traffic(&config.traffic),
        _ => SectionRef::All(config),
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum SectionRef<'a> {
    All(&'a StepwiseConfig),
    General(&'a stepwise_core::config::GeneralConfig),
    Scenario(&'a stepwise_core::config::ScenarioConfig),
    Traffic(&'a stepwise_core::config::TrafficConfig),
}

fn describe_source(config_path: Option<&Path>) -> String {
    config_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_owned())
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering; JSON output carries `config`.
#[derive(Debug, Serialize)]
pub struct ConfigReport {
    /// Configuration source (file path or defaults)
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Configuration as structured JSON
    pub config: serde_json::Value,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Debug, Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
