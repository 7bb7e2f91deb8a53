use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use do_deployer::cli::DeployArgs;
use do_deployer::config::{Config, NoPrompt, Prompter};
use do_deployer::error::{ConfigError, DeployError};
use tempfile::tempdir;

struct ScriptedPrompter {
    answers: RefCell<VecDeque<String>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    fn new(answers: &[&str]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().map(|a| a.to_string()).collect()),
            asked: RefCell::new(Vec::new()),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&self, question: &str) -> Result<Option<String>, ConfigError> {
        self.asked.borrow_mut().push(question.to_string());
        Ok(self.answers.borrow_mut().pop_front())
    }
}

fn args(path: &Path, env_file: &Path) -> DeployArgs {
    DeployArgs {
        path: path.to_path_buf(),
        name: None,
        build_command: None,
        run_command: None,
        port: None,
        poll_interval: 10,
        max_polls: None,
        timeout: None,
        poll_retries: 0,
        retry_backoff: 1000,
        shell: "bash".to_string(),
        api_url: "https://api.digitalocean.com".to_string(),
        env_file: env_file.display().to_string(),
        no_input: true,
        quiet: false,
    }
}

fn token_env() -> HashMap<String, String> {
    HashMap::from([("ACCESS_TOKEN".to_string(), "dop_v1_env".to_string())])
}

#[test]
fn test_cli_precedence_over_env() {
    let temp_dir = tempdir().unwrap();
    let env_path = temp_dir.path().join("test_cli_precedence.env");
    let mut file = File::create(&env_path).unwrap();
    writeln!(file, "APP_NAME=env_name").unwrap();
    writeln!(file, "BUILD_COMMAND=make env").unwrap();
    writeln!(file, "RUN_COMMAND=make serve-env").unwrap();
    writeln!(file, "PORT=9000").unwrap();

    let mut cli = args(temp_dir.path(), &env_path);
    cli.name = Some("cli_name".to_string());
    cli.build_command = Some("npm run build".to_string());
    cli.run_command = Some("npm start".to_string());
    cli.port = Some("8080".to_string());

    let config = Config::resolve(&cli, &token_env(), &NoPrompt).unwrap();

    assert_eq!(config.token, "dop_v1_env");
    assert_eq!(config.request.app_name, "cli_name");
    assert_eq!(config.request.build_command, "npm run build");
    assert_eq!(config.request.run_command, "npm start");
    assert_eq!(config.request.port, "8080");
    assert_eq!(config.request.source_dir, temp_dir.path());
}

#[test]
fn test_env_file_used_when_cli_missing() {
    let temp_dir = tempdir().unwrap();
    let env_path = temp_dir.path().join("test_env_used.env");
    let mut file = File::create(&env_path).unwrap();
    writeln!(file, "ACCESS_TOKEN=dop_v1_file").unwrap();
    writeln!(file, "APP_NAME=env_name").unwrap();
    writeln!(file, "BUILD_COMMAND=make env").unwrap();
    writeln!(file, "PORT=9000").unwrap();

    let config =
        Config::resolve(&args(temp_dir.path(), &env_path), &HashMap::new(), &NoPrompt).unwrap();

    assert_eq!(config.token, "dop_v1_file");
    assert_eq!(config.request.app_name, "env_name");
    assert_eq!(config.request.build_command, "make env");
    assert_eq!(config.request.port, "9000");
    assert!(config.request.run_command.is_empty());
}

#[test]
fn test_process_env_beats_env_file() {
    let temp_dir = tempdir().unwrap();
    let env_path = temp_dir.path().join("test_process_env.env");
    let mut file = File::create(&env_path).unwrap();
    writeln!(file, "ACCESS_TOKEN=dop_v1_file").unwrap();
    writeln!(file, "APP_NAME=file_name").unwrap();
    writeln!(file, "BUILD_COMMAND=make").unwrap();
    writeln!(file, "PORT=9000").unwrap();

    let mut env = token_env();
    env.insert("APP_NAME".to_string(), "process_name".to_string());

    let config = Config::resolve(&args(temp_dir.path(), &env_path), &env, &NoPrompt).unwrap();

    assert_eq!(config.token, "dop_v1_env");
    assert_eq!(config.request.app_name, "process_name");
}

#[test]
fn test_missing_token_stops_before_prompting() {
    let temp_dir = tempdir().unwrap();
    let env_path = temp_dir.path().join("absent.env");
    let prompter = ScriptedPrompter::new(&["site", "make", "8080"]);
    let mut env = HashMap::new();
    env.insert("ACCESS_TOKEN".to_string(), "   ".to_string());

    let err = Config::resolve(&args(temp_dir.path(), &env_path), &env, &prompter).unwrap_err();

    assert!(matches!(err, DeployError::MissingCredential));
    assert_eq!(err.exit_code(), 3);
    assert!(prompter.asked.borrow().is_empty());
}

#[test]
fn test_missing_token_reported_before_unreadable_env_file() {
    let temp_dir = tempdir().unwrap();
    let unreadable = temp_dir.path().join("settings.env");
    std::fs::create_dir(&unreadable).unwrap();

    let cli = args(temp_dir.path(), &unreadable);
    let err = Config::resolve(&cli, &HashMap::new(), &NoPrompt).unwrap_err();
    assert!(matches!(err, DeployError::MissingCredential));
    assert_eq!(err.exit_code(), 3);

    let err = Config::resolve(&cli, &token_env(), &NoPrompt).unwrap_err();
    assert!(matches!(
        err,
        DeployError::Config(ConfigError::EnvFile { .. })
    ));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_prompts_for_missing_values_in_order() {
    let temp_dir = tempdir().unwrap();
    let env_path = temp_dir.path().join("absent.env");
    let prompter = ScriptedPrompter::new(&["site", "npm run build", "3000"]);

    let config =
        Config::resolve(&args(temp_dir.path(), &env_path), &token_env(), &prompter).unwrap();

    assert_eq!(config.request.app_name, "site");
    assert_eq!(config.request.build_command, "npm run build");
    assert_eq!(config.request.port, "3000");
    assert_eq!(
        *prompter.asked.borrow(),
        vec![
            "What do you want to call this app?".to_string(),
            "Enter the build command".to_string(),
            "What port number will it run on?".to_string(),
        ]
    );
}

#[test]
fn test_only_missing_values_are_prompted() {
    let temp_dir = tempdir().unwrap();
    let env_path = temp_dir.path().join("absent.env");
    let prompter = ScriptedPrompter::new(&["8080"]);
    let mut cli = args(temp_dir.path(), &env_path);
    cli.name = Some("site".to_string());
    cli.build_command = Some("make".to_string());

    let config = Config::resolve(&cli, &token_env(), &prompter).unwrap();

    assert_eq!(config.request.port, "8080");
    assert_eq!(prompter.asked.borrow().len(), 1);
}

#[test]
fn test_missing_value_without_prompt_is_config_error() {
    let temp_dir = tempdir().unwrap();
    let env_path = temp_dir.path().join("absent.env");
    let mut cli = args(temp_dir.path(), &env_path);
    cli.name = Some("site".to_string());

    let err = Config::resolve(&cli, &token_env(), &NoPrompt).unwrap_err();

    assert!(matches!(
        err,
        DeployError::Config(ConfigError::Missing {
            key: "BUILD_COMMAND",
            ..
        })
    ));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_poll_flags_become_policy() {
    let temp_dir = tempdir().unwrap();
    let env_path = temp_dir.path().join("absent.env");
    let mut cli = args(&PathBuf::from("/srv/site"), &env_path);
    cli.name = Some("site".to_string());
    cli.build_command = Some("make".to_string());
    cli.port = Some("80".to_string());
    cli.poll_interval = 5;
    cli.max_polls = Some(40);
    cli.timeout = Some(900);
    cli.poll_retries = 3;
    cli.retry_backoff = 250;

    let config = Config::resolve(&cli, &token_env(), &NoPrompt).unwrap();

    assert_eq!(config.poll.interval, Duration::from_secs(5));
    assert_eq!(config.poll.max_polls, Some(40));
    assert_eq!(config.poll.deadline, Some(Duration::from_secs(900)));
    assert_eq!(config.poll.retries, 3);
    assert_eq!(config.poll.retry_backoff, Duration::from_millis(250));
    assert_eq!(config.shell, "bash");
    assert_eq!(config.api_url, "https://api.digitalocean.com");
}
