use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use dialoguer::Input;

use crate::cli::DeployArgs;
use crate::deployment_manager::{DeploymentRequest, PollPolicy};
use crate::error::{ConfigError, DeployError};

pub const TOKEN_VAR: &str = "ACCESS_TOKEN";

/// Everything one deployment needs, resolved up front and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub request: DeploymentRequest,
    pub poll: PollPolicy,
    pub shell: String,
    pub api_url: String,
}

/// Asks the user for a value that was not supplied any other way.
pub trait Prompter {
    /// `Ok(None)` when there is nobody to ask.
    fn ask(&self, question: &str) -> Result<Option<String>, ConfigError>;
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&self, question: &str) -> Result<Option<String>, ConfigError> {
        let answer: String = Input::new().with_prompt(question).interact_text()?;
        Ok(Some(answer.trim().to_string()))
    }
}

pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn ask(&self, _: &str) -> Result<Option<String>, ConfigError> {
        Ok(None)
    }
}

impl Config {
    /// Resolve configuration from the real process environment, prompting on
    /// the terminal when allowed.
    pub fn from_env_and_cli(args: &DeployArgs) -> Result<Self, DeployError> {
        let process_env: HashMap<String, String> = std::env::vars().collect();
        if args.no_input || !std::io::stdin().is_terminal() {
            Self::resolve(args, &process_env, &NoPrompt)
        } else {
            Self::resolve(args, &process_env, &TerminalPrompter)
        }
    }

    /// Priority: CLI args > process environment > .env file > prompt.
    ///
    /// The credential is checked before anything else so a missing token
    /// never costs the user a round of questions.
    pub fn resolve(
        args: &DeployArgs,
        process_env: &HashMap<String, String>,
        prompter: &impl Prompter,
    ) -> Result<Self, DeployError> {
        let file_vars = read_env_file(Path::new(&args.env_file));
        let token = [
            process_env.get(TOKEN_VAR),
            file_vars.as_ref().ok().and_then(|vars| vars.get(TOKEN_VAR)),
        ]
        .into_iter()
        .flatten()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .ok_or(DeployError::MissingCredential)?
        .to_string();

        let file_vars = file_vars?;
        let lookup = |key: &str| {
            process_env
                .get(key)
                .or_else(|| file_vars.get(key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let app_name = resolve_value(
            args.name.clone(),
            lookup("APP_NAME"),
            prompter,
            "What do you want to call this app?",
            ConfigError::Missing {
                key: "APP_NAME",
                flag: "--name",
            },
        )?;
        let build_command = resolve_value(
            args.build_command.clone(),
            lookup("BUILD_COMMAND"),
            prompter,
            "Enter the build command",
            ConfigError::Missing {
                key: "BUILD_COMMAND",
                flag: "--build-command",
            },
        )?;
        let port = resolve_value(
            args.port.clone(),
            lookup("PORT"),
            prompter,
            "What port number will it run on?",
            ConfigError::Missing {
                key: "PORT",
                flag: "--port",
            },
        )?;
        let run_command = args
            .run_command
            .clone()
            .or_else(|| lookup("RUN_COMMAND"))
            .unwrap_or_default();

        Ok(Config {
            token,
            request: DeploymentRequest {
                app_name,
                build_command,
                run_command,
                source_dir: args.path.clone(),
                port,
            },
            poll: PollPolicy {
                interval: Duration::from_secs(args.poll_interval),
                max_polls: args.max_polls,
                deadline: args.timeout.map(Duration::from_secs),
                retries: args.poll_retries,
                retry_backoff: Duration::from_millis(args.retry_backoff),
            },
            shell: args.shell.clone(),
            api_url: args.api_url.clone(),
        })
    }

    pub fn show_configuration_help() {
        println!("Configuration options:");
        println!("  1. Command line flags:");
        println!(
            "     do-deployer deploy ./my-site --name my-site --build-command 'npm run build' --run-command 'npm start' --port 8080"
        );
        println!();
        println!("  2. Environment variables or a .env file (use --env-file to pick another file):");
        println!("     ACCESS_TOKEN=dop_v1_...");
        println!("     APP_NAME=my-site");
        println!("     BUILD_COMMAND=npm run build");
        println!("     RUN_COMMAND=npm start");
        println!("     PORT=8080");
        println!();
        println!("  3. Interactive prompts for anything still missing (disable with --no-input).");
        println!();
        println!("Command line flags take precedence over the environment, which takes precedence over the .env file.");
    }
}

fn resolve_value(
    flag: Option<String>,
    env: Option<String>,
    prompter: &impl Prompter,
    question: &str,
    missing: ConfigError,
) -> Result<String, ConfigError> {
    if let Some(value) = flag.or(env) {
        return Ok(value);
    }
    match prompter.ask(question)? {
        Some(answer) if !answer.is_empty() => Ok(answer),
        _ => Err(missing),
    }
}

/// Parse a dotenv-style file. A missing file yields no variables.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    })?;

    for line in content.lines() {
        let line = line.trim();
        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            vars.insert(key.trim().to_string(), unquote(value.trim()).to_string());
        }
    }
    Ok(vars)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
