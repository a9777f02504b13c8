//! Shared fixtures for this crate's tests

use async_trait::async_trait;

use fleetops_core::{
    CommandRunner, CommandStatus, ExecOutput, ExecutionResult, HostSpec, Result, ServiceAction,
    ServiceOutcome, ServiceState,
};
use fleetops_database::{create_server, CreateServer, Database};

pub async fn seed_server(db: &Database, name: &str) -> i64 {
    create_server(
        db.pool(),
        &CreateServer {
            name: name.to_string(),
            ip_address: "10.0.0.5".to_string(),
            ssh_port: 22,
            username: "ops".to_string(),
            operating_system: None,
            auth_type: "password".to_string(),
            password: Some("secret".to_string()),
            private_key: None,
            key_passphrase: None,
            is_active: true,
            note: None,
        },
    )
    .await
    .unwrap()
}

/// Runner that answers every call with a fixed exit code
pub struct StaticRunner {
    exit_code: i32,
}

impl StaticRunner {
    pub fn running() -> Self {
        Self::exit_code(0)
    }

    pub fn exit_code(exit_code: i32) -> Self {
        Self { exit_code }
    }

    fn output(&self) -> ExecOutput {
        ExecOutput {
            exit_code: self.exit_code,
            stdout: "output".to_string(),
            stderr: String::new(),
        }
    }
}

#[async_trait]
impl CommandRunner for StaticRunner {
    async fn probe(&self, _host: &HostSpec, _command: &str) -> Result<ExecOutput> {
        Ok(self.output())
    }

    async fn run_raw(&self, _host: &HostSpec, _command: &str) -> ExecutionResult {
        let out = self.output();
        ExecutionResult {
            status: if out.success() {
                CommandStatus::Completed
            } else {
                CommandStatus::Failed
            },
            exit_code: Some(out.exit_code),
            output: out.combined(),
        }
    }

    async fn run_service_action(
        &self,
        _host: &HostSpec,
        _unit: &str,
        _action: ServiceAction,
    ) -> ServiceOutcome {
        let state = match self.exit_code {
            0 => ServiceState::Active,
            3 => ServiceState::Inactive,
            _ => ServiceState::Failed,
        };
        ServiceOutcome {
            state,
            exit_code: Some(self.exit_code),
            detail: "output".to_string(),
        }
    }
}
