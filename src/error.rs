//! Error taxonomy for a single deployment run.
//!
//! Every variant of [`DeployError`] is terminal for the run that raised it.
//! [`DeployError::exit_code`] maps it to the process exit status.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of the local build step.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("build command is empty")]
    EmptyCommand,

    #[error("working directory {} does not exist or is not a directory", .0.display())]
    MissingDirectory(PathBuf),

    #[error("failed to spawn {shell}: {source}")]
    SpawnFailed {
        shell: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for build process: {0}")]
    WaitFailed(#[source] std::io::Error),

    #[error("build command exited with status {0}")]
    NonZeroExit(i32),

    #[error("build command was terminated by a signal")]
    Terminated,

    #[error("build command was cancelled")]
    Cancelled,
}

/// Rejected deployment parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid port number '{0}': expected an integer between 1 and 65535")]
    InvalidPort(String),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

/// Failure talking to the application platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("platform responded with {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response from platform: {0}")]
    Decode(String),
}

impl PlatformError {
    /// Transport failures, rate limiting and server-side errors may clear up
    /// on their own. Authentication, not-found and malformed responses won't.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlatformError::Transport(_) => true,
            PlatformError::Api { status, .. } => *status == 429 || *status >= 500,
            PlatformError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        PlatformError::Transport(message)
    }
}

/// Missing or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} not provided. Use {flag} or set {key} in the .env file")]
    Missing {
        key: &'static str,
        flag: &'static str,
    },

    #[error("failed to read answer from terminal: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("failed to read env file {}: {source}", .path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal outcome of a failed deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("ACCESS_TOKEN is missing")]
    MissingCredential,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("build failed: {0}")]
    Build(#[source] ExecutionError),

    #[error("error deploying app: {0}")]
    Submission(#[source] PlatformError),

    #[error("error fetching app status on poll {attempt}: {source}")]
    Poll {
        attempt: u32,
        #[source]
        source: PlatformError,
    },

    #[error("app did not become live after {attempts} polls ({}s)", .elapsed.as_secs())]
    PollTimeout { attempts: u32, elapsed: Duration },

    #[error("deployment cancelled")]
    Cancelled,
}

impl DeployError {
    pub fn exit_code(&self) -> u8 {
        match self {
            DeployError::Config(_) => 2,
            DeployError::MissingCredential => 3,
            DeployError::Validation(_) => 4,
            DeployError::Build(_) => 5,
            DeployError::Submission(_) => 6,
            DeployError::Poll { .. } => 7,
            DeployError::PollTimeout { .. } => 8,
            DeployError::Cancelled => 130,
        }
    }
}
