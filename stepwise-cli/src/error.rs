//! CLI-specific error types and exit code mapping

use stepwise_core::error::StepwiseError;
use stepwise_scenario::ScenarioError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The scenario ran to completion but did not pass.
    #[error("scenario '{name}' {result}")]
    ScenarioFailed { name: String, result: String },

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from the library crates.
    #[error("{0}")]
    Core(StepwiseError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                 |
    /// |------|-------------------------|
    /// | 0    | Success                 |
    /// | 1    | General / command error |
    /// | 2    | Configuration error     |
    /// | 3    | Scenario did not pass   |
    /// | 10   | IO error                |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::ScenarioFailed { .. } => 3,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<StepwiseError> for CliError {
    fn from(e: StepwiseError) -> Self {
        match e {
            StepwiseError::Config(inner) => Self::Config(inner.to_string()),
            StepwiseError::Io(inner) => Self::Io(inner),
            other => Self::Core(other),
        }
    }
}

impl From<ScenarioError> for CliError {
    fn from(e: ScenarioError) -> Self {
        StepwiseError::from(e).into()
    }
}
