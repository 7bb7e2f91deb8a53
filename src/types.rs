use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A shell command to run in a directory, consumed once by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTask {
    pub command: String,
    pub working_directory: PathBuf,
}

/// What gets submitted to the platform. Only produced by
/// [`crate::spec_builder::build`], so the port is always in range and the
/// name and source directory are never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSpec {
    pub app_name: String,
    pub source_directory: PathBuf,
    pub build_command: String,
    pub run_command: String,
    pub port: u16,
}

/// Identifier of an application created on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppHandle(pub String);

impl AppHandle {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of an application's state, fetched fresh on every poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppStatus {
    /// Empty until the platform has assigned a public endpoint.
    pub live_url: String,
}

impl AppStatus {
    pub fn is_live(&self) -> bool {
        !self.live_url.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentPhase {
    Building,
    Submitting,
    Polling,
    Succeeded,
    Failed,
}

impl fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentPhase::Building => "building",
            DeploymentPhase::Submitting => "submitting",
            DeploymentPhase::Polling => "polling",
            DeploymentPhase::Succeeded => "succeeded",
            DeploymentPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

// App Platform wire types

#[derive(Debug, Serialize, Deserialize)]
pub struct AppCreateRequest {
    pub spec: AppSpec,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppSpec {
    pub name: String,
    pub services: Vec<AppServiceSpec>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppServiceSpec {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub run_command: String,
    pub source_dir: String,
    pub build_command: String,
    pub http_port: i64,
}

impl From<&DeploymentSpec> for AppCreateRequest {
    fn from(spec: &DeploymentSpec) -> Self {
        AppCreateRequest {
            spec: AppSpec {
                name: spec.app_name.clone(),
                services: vec![AppServiceSpec {
                    name: spec.app_name.clone(),
                    run_command: spec.run_command.clone(),
                    source_dir: spec.source_directory.display().to_string(),
                    build_command: spec.build_command.clone(),
                    http_port: i64::from(spec.port),
                }],
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppResponse {
    pub app: App,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    /// Absent or `null` until the app is serving.
    #[serde(default)]
    pub live_url: Option<String>,
}

/// Body of a non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub message: String,
}
