//! Azure CLI wrapper
//!
//! Runs `az` commands as child processes and classifies their failures.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use weblodge_cloud::{CommandLine, Transport, TransportError};

const NOT_FOUND_MARKERS: &[&str] = &[
    "ResourceNotFound",
    "ResourceGroupNotFound",
    "could not be found",
    "was not found",
];

const LOGIN_MARKERS: &[&str] = &["az login", "AADSTS", "Please run 'az account"];

/// `az` CLI transport
#[derive(Debug, Clone)]
pub struct AzCli {
    program: String,
}

impl Default for AzCli {
    fn default() -> Self {
        Self::new()
    }
}

impl AzCli {
    pub fn new() -> Self {
        Self {
            program: "az".to_string(),
        }
    }

    /// Use another executable, e.g. a wrapper script
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Check that the CLI is on the PATH
    pub async fn check_installed(&self) -> std::result::Result<(), TransportError> {
        let which = Command::new("which").arg(&self.program).output().await?;

        if !which.status.success() {
            return Err(TransportError::NotInstalled(self.program.clone()));
        }
        Ok(())
    }

    fn command(&self, command: &CommandLine) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(command.args());
        cmd.stdin(Stdio::null());
        cmd
    }

    fn spawn_error(&self, error: std::io::Error) -> TransportError {
        if error.kind() == std::io::ErrorKind::NotFound {
            TransportError::NotInstalled(self.program.clone())
        } else {
            TransportError::Io(error)
        }
    }
}

/// Map a failed invocation onto a transport error
pub fn classify_failure(status: Option<i32>, stderr: &str) -> TransportError {
    let message = stderr.trim().to_string();

    if NOT_FOUND_MARKERS.iter().any(|m| stderr.contains(m)) {
        TransportError::NotFound(message)
    } else if LOGIN_MARKERS.iter().any(|m| stderr.contains(m)) {
        TransportError::Unauthenticated(message)
    } else {
        TransportError::Failed {
            status,
            stderr: message,
        }
    }
}

#[async_trait]
impl Transport for AzCli {
    async fn execute(
        &self,
        command: &CommandLine,
        structured: bool,
    ) -> std::result::Result<String, TransportError> {
        let mut cmd = self.command(command);
        if structured {
            cmd.arg("--output").arg("json");
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: {} {}", self.program, command);

        let output = cmd.output().await.map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(output.status.code(), &stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn stream(&self, command: &CommandLine) -> std::result::Result<(), TransportError> {
        let mut cmd = self.command(command);
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        cmd.kill_on_drop(true);

        tracing::debug!("Streaming: {} {}", self.program, command);

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(TransportError::Failed {
                        status: status.code(),
                        stderr: format!("`{}` exited with {}", command, status),
                    })
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping `{}`", command);
                child.kill().await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_diagnostics() {
        for stderr in [
            "ERROR: (ResourceGroupNotFound) Resource group 'demo' could not be found.",
            "ERROR: (ResourceNotFound) The Resource 'Microsoft.Web/sites/demo' under resource group 'demo' was not found.",
        ] {
            assert!(matches!(
                classify_failure(Some(3), stderr),
                TransportError::NotFound(_)
            ));
        }
    }

    #[test]
    fn test_login_diagnostic() {
        let err = classify_failure(Some(1), "ERROR: Please run 'az login' to setup account.");
        assert!(matches!(err, TransportError::Unauthenticated(_)));
    }

    #[test]
    fn test_other_failures_keep_status() {
        let err = classify_failure(Some(1), "ERROR: (Conflict) Operation in progress\n");
        match err {
            TransportError::Failed { status, stderr } => {
                assert_eq!(status, Some(1));
                assert_eq!(stderr, "ERROR: (Conflict) Operation in progress");
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_check_installed_missing_program() {
        let az = AzCli::with_program("weblodge-test-no-such-az");
        tokio_test::assert_err!(tokio_test::block_on(az.check_installed()));
    }

    #[tokio::test]
    async fn test_missing_program_is_not_installed() {
        let az = AzCli::with_program("weblodge-test-no-such-az");
        let err = az
            .execute(&CommandLine::new("group").action("list"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotInstalled(_)));
    }
}
