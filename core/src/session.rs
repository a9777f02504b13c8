//! SSH session management
//!
//! One session per target, exclusively owned by the task that opened it.
//! Connect and command timeouts are distinct and independently configurable.
//! Host keys are accepted on first contact (trust-on-first-use style); a
//! pinned-key policy would slot in at [`SshSession::open`].

use std::time::Duration;

use async_ssh2_tokio::client::{Client, ServerCheckMethod};
use tracing::{debug, warn};

use crate::credentials::AuthConfig;
use crate::{Error, Result};

/// Output of one remote command
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr, as captured for result fields
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// An open SSH session to one host
pub struct SshSession {
    client: Client,
    target: String,
}

impl SshSession {
    /// Open a connection, bounded by `connect_timeout`.
    ///
    /// Fails with [`Error::AuthenticationFailed`] on rejected credentials,
    /// [`Error::Timeout`] when the deadline passes, and
    /// [`Error::Transport`] for everything else at the network layer.
    pub async fn open(
        address: &str,
        port: u16,
        username: &str,
        auth: &AuthConfig,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let target = format!("{}@{}:{}", username, address, port);
        debug!(target = %target, auth = auth.kind(), "Opening SSH session");

        let connect = Client::connect(
            (address.to_string(), port),
            username,
            auth.resolve(),
            ServerCheckMethod::NoCheck,
        );

        let client = match tokio::time::timeout(connect_timeout, connect).await {
            Err(_) => return Err(Error::Timeout(connect_timeout.as_secs())),
            Ok(Err(e)) => return Err(map_ssh_error(e)),
            Ok(Ok(client)) => client,
        };

        Ok(Self { client, target })
    }

    /// Run one command over the exec channel, bounded by `timeout`.
    ///
    /// A nonzero exit code is data, not an error; callers interpret it.
    pub async fn run(&self, command: &str, timeout: Duration) -> Result<ExecOutput> {
        debug!(target = %self.target, command = %command, "Executing command");

        let result = match tokio::time::timeout(timeout, self.client.execute(command)).await {
            Err(_) => return Err(Error::Timeout(timeout.as_secs())),
            Ok(Err(e)) => return Err(map_ssh_error(e)),
            Ok(Ok(result)) => result,
        };

        let output = ExecOutput {
            exit_code: result.exit_status as i32,
            stdout: result.stdout,
            stderr: result.stderr,
        };

        debug!(
            target = %self.target,
            exit_code = output.exit_code,
            "Command finished"
        );

        Ok(output)
    }

    /// Release the connection. Disconnect failures are logged and swallowed
    /// so release can never mask an error already in flight.
    pub async fn close(self) {
        if let Err(e) = self.client.disconnect().await {
            warn!(target = %self.target, error = %e, "Error while closing SSH session");
        }
    }
}

/// Map transport-layer errors onto the core taxonomy.
fn map_ssh_error(err: async_ssh2_tokio::Error) -> Error {
    use async_ssh2_tokio::Error as SshError;

    match err {
        SshError::PasswordWrong | SshError::KeyAuthFailed => Error::AuthenticationFailed,
        other => Error::Transport(other.to_string()),
    }
}
