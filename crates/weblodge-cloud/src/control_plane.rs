//! Control-plane client
//!
//! [`Transport`] executes one command against the remote API and classifies
//! its failure. [`ControlPlaneClient`] adds the policy on top: bounded retry
//! with backoff, a one-time login when the first call of the process is
//! rejected as unauthenticated, and JSON decoding.

use crate::command::CommandLine;
use crate::error::{CloudError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Failure of a single command execution
#[derive(Error, Debug)]
pub enum TransportError {
    /// The remote API reported that the addressed resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller is not logged in
    #[error("authentication required: {0}")]
    Unauthenticated(String),

    #[error("exit status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },

    #[error("{0} is not installed")]
    NotInstalled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw command execution against the remote API
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run the command to completion and return its standard output.
    /// `structured` asks the transport for machine-readable (JSON) output.
    async fn execute(
        &self,
        command: &CommandLine,
        structured: bool,
    ) -> std::result::Result<String, TransportError>;

    /// Run the command with its output forwarded to the terminal until it
    /// exits or the caller is interrupted.
    async fn stream(&self, command: &CommandLine) -> std::result::Result<(), TransportError>;
}

/// Retry configuration for control-plane commands
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, first one included
    pub max_attempts: u32,

    /// Delay after the first failed attempt
    pub initial_delay: Duration,

    /// Upper bound of a single delay
    pub max_delay: Duration,

    /// Growth factor applied per attempt
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 1.5,
        }
    }
}

impl RetryConfig {
    /// Same attempt budget with no waiting, for tests
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    /// Every delay the policy may wait, in order
    pub fn backoff_table(&self) -> Vec<Duration> {
        (1..self.max_attempts).map(|a| self.delay_for(a)).collect()
    }
}

/// Requested shape of a command result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Structured,
    Raw,
}

/// Result of an invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Structured(serde_json::Value),
    Raw(String),
}

impl Output {
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Output::Structured(value) => value,
            Output::Raw(text) => serde_json::Value::String(text),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Output::Structured(value) => value.to_string(),
            Output::Raw(text) => text,
        }
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    retry: RetryConfig,
    login: CommandLine,
    first_invoke: AtomicBool,
}

/// Shared handle to the remote control plane
///
/// Cloning is cheap; every resource holds a clone of the same client so the
/// one-time login probe is shared across the process.
#[derive(Clone)]
pub struct ControlPlaneClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ControlPlaneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPlaneClient")
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}

impl ControlPlaneClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_retry(transport, RetryConfig::default())
    }

    pub fn with_retry(transport: Arc<dyn Transport>, retry: RetryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                retry,
                login: CommandLine::new("login"),
                first_invoke: AtomicBool::new(true),
            }),
        }
    }

    /// Execute a command under the retry policy
    pub async fn invoke(&self, command: &CommandLine, format: OutputFormat) -> Result<Output> {
        let structured = format == OutputFormat::Structured;
        let stdout = self.execute_with_retry(command, structured).await?;

        if !structured {
            return Ok(Output::Raw(stdout));
        }

        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(Output::Structured(serde_json::Value::Null));
        }
        let value = serde_json::from_str(trimmed).map_err(|e| {
            CloudError::UnexpectedOutput(format!("`{}` returned invalid JSON: {}", command, e))
        })?;
        Ok(Output::Structured(value))
    }

    pub async fn invoke_json(&self, command: &CommandLine) -> Result<serde_json::Value> {
        Ok(self
            .invoke(command, OutputFormat::Structured)
            .await?
            .into_json())
    }

    pub async fn invoke_raw(&self, command: &CommandLine) -> Result<String> {
        Ok(self.invoke(command, OutputFormat::Raw).await?.into_text())
    }

    /// Decode a structured result into `T`
    pub async fn invoke_as<T: serde::de::DeserializeOwned>(&self, command: &CommandLine) -> Result<T> {
        let value = self.invoke_json(command).await?;
        serde_json::from_value(value).map_err(|e| {
            CloudError::UnexpectedOutput(format!("`{}` returned an unexpected shape: {}", command, e))
        })
    }

    /// Forward a long-running command's output; never retried
    pub async fn stream(&self, command: &CommandLine) -> Result<()> {
        tracing::debug!("Streaming: {}", command);
        self.inner
            .transport
            .stream(command)
            .await
            .map_err(|e| self.surface(command, 1, e))
    }

    async fn execute_with_retry(&self, command: &CommandLine, structured: bool) -> Result<String> {
        let retry = &self.inner.retry;
        let mut may_login = self.inner.first_invoke.swap(false, Ordering::SeqCst);
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!("Running (attempt {}): {}", attempt, command);

            let error = match self.inner.transport.execute(command, structured).await {
                Ok(stdout) => return Ok(stdout),
                Err(error) => error,
            };

            match error {
                TransportError::NotFound(message) => {
                    return Err(CloudError::ResourceNotFound(message));
                }
                TransportError::NotInstalled(program) => {
                    return Err(CloudError::NotInstalled(program));
                }
                TransportError::Unauthenticated(_) if may_login => {
                    may_login = false;
                    attempt -= 1;
                    self.login().await?;
                }
                error if attempt < retry.max_attempts => {
                    let delay = retry.delay_for(attempt);
                    tracing::warn!(
                        "`{}` failed (attempt {}/{}), retrying in {:?}: {}",
                        command,
                        attempt,
                        retry.max_attempts,
                        delay,
                        error
                    );
                    tokio::time::sleep(delay).await;
                }
                error => {
                    tracing::error!("`{}` failed after {} attempt(s)", command, attempt);
                    return Err(self.surface(command, attempt, error));
                }
            }
        }
    }

    async fn login(&self) -> Result<()> {
        tracing::info!("Previous command failed, trying to log in to the control plane...");
        self.inner
            .transport
            .execute(&self.inner.login, false)
            .await
            .map_err(|e| self.surface(&self.inner.login, 1, e))?;
        tracing::info!("Login successful, retrying previous command...");
        Ok(())
    }

    fn surface(&self, command: &CommandLine, attempts: u32, error: TransportError) -> CloudError {
        match error {
            TransportError::NotFound(message) => CloudError::ResourceNotFound(message),
            TransportError::NotInstalled(program) => CloudError::NotInstalled(program),
            other => CloudError::ControlPlane {
                command: command.to_string(),
                attempts,
                message: other.to_string(),
            },
        }
    }
}
