use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command_executor::CommandExecutor;
use crate::error::{DeployError, ExecutionError};
use crate::output::ProgressReporter;
use crate::platform_client::PlatformClient;
use crate::spec_builder;
use crate::types::{AppHandle, BuildTask, DeploymentPhase, DeploymentSpec};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(30);

/// Raw answers describing what to deploy. Validated when the deployment starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub app_name: String,
    pub build_command: String,
    pub run_command: String,
    pub source_dir: PathBuf,
    pub port: String,
}

/// How long and how hard to wait for the app to go live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Upper bound on status requests, retries included.
    pub max_polls: Option<u32>,
    /// Wall-clock limit for the polling phase.
    pub deadline: Option<Duration>,
    /// Consecutive retryable errors tolerated before giving up. Zero makes
    /// every poll error fatal.
    pub retries: u32,
    pub retry_backoff: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_polls: None,
            deadline: None,
            retries: 0,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl PollPolicy {
    fn backoff(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(16);
        self.retry_backoff
            .saturating_mul(1u32 << exp)
            .min(MAX_RETRY_BACKOFF)
    }
}

/// A deployment that reached a live endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub app: AppHandle,
    pub live_url: String,
    pub polls: u32,
}

/// Sequences build, submit and poll for one deployment.
pub struct DeploymentManager<E, P, R> {
    executor: E,
    platform: P,
    reporter: R,
    request: DeploymentRequest,
    policy: PollPolicy,
    phases: Mutex<Vec<DeploymentPhase>>,
}

impl<E, P, R> DeploymentManager<E, P, R>
where
    E: CommandExecutor,
    P: PlatformClient,
    R: ProgressReporter,
{
    pub fn new(
        executor: E,
        platform: P,
        reporter: R,
        request: DeploymentRequest,
        policy: PollPolicy,
    ) -> Self {
        Self {
            executor,
            platform,
            reporter,
            request,
            policy,
            phases: Mutex::new(Vec::new()),
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Current phase, `None` before [`deploy`](Self::deploy) is called.
    pub fn phase(&self) -> Option<DeploymentPhase> {
        self.phases.lock().ok().and_then(|p| p.last().copied())
    }

    /// Every phase entered so far, in order.
    pub fn history(&self) -> Vec<DeploymentPhase> {
        self.phases.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn enter(&self, phase: DeploymentPhase) {
        info!("Deployment phase: {}", phase);
        if let Ok(mut phases) = self.phases.lock() {
            phases.push(phase);
        }
    }

    fn fail(&self, err: DeployError) -> DeployError {
        warn!("Deployment failed: {}", err);
        self.enter(DeploymentPhase::Failed);
        self.reporter.failure(&err.to_string());
        err
    }

    /// Run the deployment to a terminal phase.
    ///
    /// Inputs are validated before anything runs, so a bad port never
    /// costs a build.
    pub async fn deploy(&self, cancel: &CancellationToken) -> Result<Deployment, DeployError> {
        let spec = spec_builder::build(
            &self.request.app_name,
            &self.request.build_command,
            &self.request.run_command,
            &self.request.source_dir,
            &self.request.port,
        )
        .map_err(|e| self.fail(e.into()))?;

        self.build(&spec, cancel).await.map_err(|e| self.fail(e))?;
        let app = self.submit(&spec, cancel).await.map_err(|e| self.fail(e))?;
        let (live_url, polls) = self.poll(&app, cancel).await.map_err(|e| self.fail(e))?;

        self.enter(DeploymentPhase::Succeeded);
        self.reporter.success(&format!(
            "Deployment successful! Your app is live here at {live_url}"
        ));
        Ok(Deployment {
            app,
            live_url,
            polls,
        })
    }

    async fn build(
        &self,
        spec: &DeploymentSpec,
        cancel: &CancellationToken,
    ) -> Result<(), DeployError> {
        self.enter(DeploymentPhase::Building);
        self.reporter.step("Building the project...");

        let task = BuildTask {
            command: spec.build_command.clone(),
            working_directory: spec.source_directory.clone(),
        };
        self.executor
            .execute(&task, cancel)
            .await
            .map_err(|e| match e {
                ExecutionError::Cancelled => DeployError::Cancelled,
                e => DeployError::Build(e),
            })
    }

    async fn submit(
        &self,
        spec: &DeploymentSpec,
        cancel: &CancellationToken,
    ) -> Result<AppHandle, DeployError> {
        self.enter(DeploymentPhase::Submitting);
        self.reporter.start_wait("Deploying to DigitalOcean...");

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(DeployError::Cancelled),
            created = self.platform.create(spec) => created.map_err(DeployError::Submission),
        };
        self.reporter.finish_wait();

        let app = result?;
        info!("Submitted app '{}' as {}", spec.app_name, app);
        Ok(app)
    }

    /// Wait, then ask for status, until the app has a live URL.
    async fn poll(
        &self,
        app: &AppHandle,
        cancel: &CancellationToken,
    ) -> Result<(String, u32), DeployError> {
        self.enter(DeploymentPhase::Polling);
        self.reporter.step("App is being deployed. Please hold on...");

        let started = Instant::now();
        let mut polls = 0u32;
        let mut failures = 0u32;
        let mut delay = self.policy.interval;

        loop {
            if let Some(max) = self.policy.max_polls {
                if polls >= max {
                    return Err(DeployError::PollTimeout {
                        attempts: polls,
                        elapsed: started.elapsed(),
                    });
                }
            }

            self.pause(delay, started, polls, cancel).await?;
            polls += 1;

            let fetched = tokio::select! {
                _ = cancel.cancelled() => return Err(DeployError::Cancelled),
                fetched = self.platform.get(app) => fetched,
            };

            match fetched {
                Ok(status) if status.is_live() => {
                    info!("App {} live at {} after {} polls", app, status.live_url, polls);
                    return Ok((status.live_url, polls));
                }
                Ok(_) => {
                    debug!("Poll {}: app {} not live yet", polls, app);
                    failures = 0;
                    delay = self.policy.interval;
                    self.reporter.step("Deployment in progress...");
                }
                Err(err) if err.is_retryable() && failures < self.policy.retries => {
                    failures += 1;
                    delay = self.policy.backoff(failures);
                    warn!(
                        "Poll {} failed ({}), retry {}/{} in {:?}",
                        polls, err, failures, self.policy.retries, delay
                    );
                }
                Err(source) => {
                    return Err(DeployError::Poll {
                        attempt: polls,
                        source,
                    });
                }
            }
        }
    }

    async fn pause(
        &self,
        delay: Duration,
        started: Instant,
        polls: u32,
        cancel: &CancellationToken,
    ) -> Result<(), DeployError> {
        // `None` means beyond what the clock can represent: never wake.
        let mut wake = Instant::now().checked_add(delay);
        let mut expires = false;
        if let Some(cutoff) = self.policy.deadline.and_then(|d| started.checked_add(d)) {
            if wake.is_none_or(|w| cutoff < w) {
                wake = Some(cutoff);
                expires = true;
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(DeployError::Cancelled),
            _ = async {
                match wake {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            } => {}
        }

        if expires {
            return Err(DeployError::PollTimeout {
                attempts: polls,
                elapsed: started.elapsed(),
            });
        }
        Ok(())
    }
}
