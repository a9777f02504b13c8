//! Command execution
//!
//! Runs arbitrary commands and systemd service-lifecycle actions on one host
//! via [`SshSession`]. This is the catch-all boundary: every connection and
//! execution error is converted into a terminal result record, so callers
//! always receive an outcome and never a crash. Each invocation opens its
//! own session and releases it on every exit path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::notifications::{NotificationMessage, NotificationSink};
use crate::session::{ExecOutput, SshSession};
use crate::types::{CommandStatus, HostSpec, ServiceAction, ServiceState};
use crate::{Error, Result};

/// Captured result text is truncated to this many bytes; a marker line is
/// appended when truncation happened.
pub const MAX_RESULT_BYTES: usize = 64 * 1024;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default command timeout in seconds
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;

/// Terminal result of a raw command execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Always `Completed` or `Failed`
    pub status: CommandStatus,
    /// `None` when the command never ran (connection-level failure)
    pub exit_code: Option<i32>,
    /// Combined stdout+stderr, or the error detail on failure
    pub output: String,
}

/// Terminal result of a service-lifecycle action
///
/// `exit_code` distinguishes the two failure classes: `Some(code)` means
/// the command ran and the unit reported `code`; `None` means a
/// transport-level failure before any exit status existed.
#[derive(Debug, Clone)]
pub struct ServiceOutcome {
    pub state: ServiceState,
    pub exit_code: Option<i32>,
    pub detail: String,
}

/// Seam the reconciler and orchestration glue dispatch through; lets tests
/// substitute the transport.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Propagating variant: the caller classifies errors.
    async fn probe(&self, host: &HostSpec, command: &str) -> Result<ExecOutput>;

    /// Catch-all variant for arbitrary commands.
    async fn run_raw(&self, host: &HostSpec, command: &str) -> ExecutionResult;

    /// Catch-all variant for service lifecycle actions.
    async fn run_service_action(
        &self,
        host: &HostSpec,
        unit: &str,
        action: ServiceAction,
    ) -> ServiceOutcome;
}

/// Transport boundary underneath the executor; tests substitute it to
/// exercise the executor's classification and notification behavior
/// without a network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exec(
        &self,
        host: &HostSpec,
        command: &str,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<ExecOutput>;
}

/// SSH-backed transport: open, run, close. The session is released on
/// every path, including mid-command faults.
pub struct SshTransport;

#[async_trait]
impl Transport for SshTransport {
    async fn exec(
        &self,
        host: &HostSpec,
        command: &str,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<ExecOutput> {
        let session = SshSession::open(
            &host.address,
            host.port,
            &host.username,
            &host.auth,
            connect_timeout,
        )
        .await?;

        let result = session.run(command, command_timeout).await;
        session.close().await;

        debug!(host = %host.name, ok = result.is_ok(), "Session released");
        result
    }
}

/// Executes commands and service actions over a [`Transport`]
pub struct CommandExecutor {
    connect_timeout: Duration,
    command_timeout: Duration,
    sink: Arc<dyn NotificationSink>,
    transport: Arc<dyn Transport>,
}

impl CommandExecutor {
    pub fn new(
        connect_timeout: Duration,
        command_timeout: Duration,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_transport(connect_timeout, command_timeout, sink, Arc::new(SshTransport))
    }

    pub fn with_transport(
        connect_timeout: Duration,
        command_timeout: Duration,
        sink: Arc<dyn NotificationSink>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            connect_timeout,
            command_timeout,
            sink,
            transport,
        }
    }

    /// Run an arbitrary command. Exit 0 maps to `Completed`, anything else
    /// to `Failed`; errors become a `Failed` result carrying the detail.
    /// This entry point never returns an error.
    #[instrument(skip(self, command), fields(host = %host.name))]
    pub async fn run_raw(&self, host: &HostSpec, command: &str) -> ExecutionResult {
        let result = match self.exec(host, command).await {
            Ok(output) => {
                let status = if output.success() {
                    CommandStatus::Completed
                } else {
                    CommandStatus::Failed
                };
                ExecutionResult {
                    status,
                    exit_code: Some(output.exit_code),
                    output: truncate_output(output.combined()),
                }
            }
            Err(e) => {
                warn!(host = %host.name, error = %e, "Command execution failed");
                ExecutionResult {
                    status: CommandStatus::Failed,
                    exit_code: None,
                    output: e.to_string(),
                }
            }
        };

        let body = match result.status {
            CommandStatus::Completed => format!("Command completed on {}", host.name),
            _ => format!("Command failed on {}: {}", host.name, result.output),
        };
        self.sink
            .notify(NotificationMessage::new(
                &host.name,
                result.status == CommandStatus::Completed,
                body,
            ))
            .await;

        result
    }

    /// Run `systemctl <verb> <unit>` and interpret the outcome.
    ///
    /// For `Status` the systemd `is-active` convention applies: exit 0 is
    /// active, exit 3 is inactive, any other code is a failed unit. For the
    /// mutating actions, exit 0 alone is success, and the observed state is
    /// then re-probed rather than assumed.
    #[instrument(skip(self), fields(host = %host.name, unit = %unit))]
    pub async fn run_service_action(
        &self,
        host: &HostSpec,
        unit: &str,
        action: ServiceAction,
    ) -> ServiceOutcome {
        let outcome = match action {
            ServiceAction::Status => self.status_probe(host, unit).await,
            _ => self.mutate_service(host, unit, action).await,
        };

        let body = format!(
            "systemctl {} {} on {}: {} ({})",
            action.as_str(),
            unit,
            host.name,
            outcome.state.as_str(),
            summarize(&outcome.detail),
        );
        self.sink
            .notify(NotificationMessage::new(
                unit,
                outcome.state != ServiceState::Failed,
                body,
            ))
            .await;

        outcome
    }

    /// Propagating single-command execution, used by the reconciler to
    /// classify liveness-probe failures itself.
    pub async fn exec_probe(&self, host: &HostSpec, command: &str) -> Result<ExecOutput> {
        self.exec(host, command).await
    }

    async fn status_probe(&self, host: &HostSpec, unit: &str) -> ServiceOutcome {
        let command = format!("systemctl is-active {}", shell_escape(unit));
        match self.exec(host, &command).await {
            Ok(output) => classify_status_exit(&output),
            Err(e) => ServiceOutcome {
                state: ServiceState::Failed,
                exit_code: None,
                detail: e.to_string(),
            },
        }
    }

    async fn mutate_service(
        &self,
        host: &HostSpec,
        unit: &str,
        action: ServiceAction,
    ) -> ServiceOutcome {
        let command = format!("systemctl {} {}", action.systemctl_verb(), shell_escape(unit));
        match self.exec(host, &command).await {
            Ok(output) if output.success() => {
                // The requested state is not assumed; probe for the state
                // the unit actually reached.
                self.status_probe(host, unit).await
            }
            Ok(output) => ServiceOutcome {
                state: ServiceState::Failed,
                exit_code: Some(output.exit_code),
                detail: truncate_output(output.combined()),
            },
            Err(e) => ServiceOutcome {
                state: ServiceState::Failed,
                exit_code: None,
                detail: e.to_string(),
            },
        }
    }

    async fn exec(&self, host: &HostSpec, command: &str) -> Result<ExecOutput> {
        self.transport
            .exec(host, command, self.connect_timeout, self.command_timeout)
            .await
    }
}

#[async_trait]
impl CommandRunner for CommandExecutor {
    async fn probe(&self, host: &HostSpec, command: &str) -> Result<ExecOutput> {
        self.exec_probe(host, command).await
    }

    async fn run_raw(&self, host: &HostSpec, command: &str) -> ExecutionResult {
        CommandExecutor::run_raw(self, host, command).await
    }

    async fn run_service_action(
        &self,
        host: &HostSpec,
        unit: &str,
        action: ServiceAction,
    ) -> ServiceOutcome {
        CommandExecutor::run_service_action(self, host, unit, action).await
    }
}

/// Map a `systemctl is-active` exit code onto the observed service state.
pub(crate) fn classify_status_exit(output: &ExecOutput) -> ServiceOutcome {
    let state = match output.exit_code {
        0 => ServiceState::Active,
        3 => ServiceState::Inactive,
        _ => ServiceState::Failed,
    };
    ServiceOutcome {
        state,
        exit_code: Some(output.exit_code),
        detail: truncate_output(output.combined()),
    }
}

/// Cap captured output at [`MAX_RESULT_BYTES`], cutting on a char boundary.
pub(crate) fn truncate_output(mut output: String) -> String {
    if output.len() <= MAX_RESULT_BYTES {
        return output;
    }
    let mut cut = MAX_RESULT_BYTES;
    while !output.is_char_boundary(cut) {
        cut -= 1;
    }
    output.truncate(cut);
    output.push_str("\n... [output truncated]");
    output
}

fn summarize(detail: &str) -> &str {
    detail.lines().next().unwrap_or("")
}

/// Escape a string for safe use in shell commands
pub(crate) fn shell_escape(s: &str) -> String {
    if s.chars().any(|c| {
        matches!(
            c,
            ' ' | '"'
                | '\''
                | '\\'
                | '$'
                | '`'
                | '!'
                | '*'
                | '?'
                | '['
                | ']'
                | '('
                | ')'
                | '{'
                | '}'
                | '<'
                | '>'
                | '|'
                | '&'
                | ';'
                | '\n'
                | '\t'
        )
    }) {
        format!("'{}'", s.replace('\'', "'\\''"))
    } else {
        s.to_string()
    }
}
