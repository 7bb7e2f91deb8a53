use std::path::Path;

use crate::error::ValidationError;
use crate::types::DeploymentSpec;

/// Assemble a [`DeploymentSpec`] from raw user answers.
///
/// Strings are passed through verbatim; only emptiness is checked. The run
/// command may be empty, in which case the platform picks its default.
pub fn build(
    name: &str,
    build_command: &str,
    run_command: &str,
    source_dir: &Path,
    port: &str,
) -> Result<DeploymentSpec, ValidationError> {
    let port = parse_port(port)?;

    if name.trim().is_empty() {
        return Err(ValidationError::EmptyField("app name"));
    }
    if source_dir.as_os_str().is_empty() {
        return Err(ValidationError::EmptyField("source directory"));
    }
    if build_command.trim().is_empty() {
        return Err(ValidationError::EmptyField("build command"));
    }

    Ok(DeploymentSpec {
        app_name: name.to_string(),
        source_directory: source_dir.to_path_buf(),
        build_command: build_command.to_string(),
        run_command: run_command.to_string(),
        port,
    })
}

pub fn parse_port(raw: &str) -> Result<u16, ValidationError> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ValidationError::InvalidPort(raw.to_string())),
    }
}
