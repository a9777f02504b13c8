//! Status reconciliation
//!
//! Polls a batch of servers or services, dispatches executor calls under a
//! bounded worker pool, and produces one report per target. Targets are
//! isolated from each other: a timeout, transport failure, or panicked task
//! affects only its own report, and every report carries a fresh
//! `last_checked` timestamp regardless of outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::executor::CommandRunner;
use crate::types::{HostSpec, ServerStatus, ServiceAction, ServiceState};
use crate::Error;

/// Default bounded worker pool size
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default liveness probe; a server is running only when this executes
/// with exit 0, not merely when the connection succeeds.
pub const DEFAULT_LIVENESS_COMMAND: &str = "uptime";

/// One server to reconcile
#[derive(Debug, Clone)]
pub struct ServerTarget {
    pub id: i64,
    pub host: HostSpec,
}

/// One service to reconcile
#[derive(Debug, Clone)]
pub struct ServiceTarget {
    pub id: i64,
    /// systemd unit name
    pub unit: String,
    pub host: HostSpec,
}

/// Definitive outcome for one server
#[derive(Debug, Clone)]
pub struct ServerReport {
    pub id: i64,
    pub name: String,
    pub status: ServerStatus,
    pub detail: Option<String>,
    pub last_checked: DateTime<Utc>,
}

/// Definitive outcome for one service
#[derive(Debug, Clone)]
pub struct ServiceReport {
    pub id: i64,
    pub unit: String,
    pub state: ServiceState,
    pub exit_code: Option<i32>,
    pub detail: Option<String>,
    pub last_checked: DateTime<Utc>,
}

/// Bounded-concurrency status reconciler
pub struct Reconciler {
    runner: Arc<dyn CommandRunner>,
    concurrency_limit: usize,
    liveness_command: String,
}

impl Reconciler {
    pub fn new(runner: Arc<dyn CommandRunner>, concurrency_limit: usize) -> Self {
        Self {
            runner,
            // limit 1 degenerates to sequential with identical outcomes
            concurrency_limit: concurrency_limit.max(1),
            liveness_command: DEFAULT_LIVENESS_COMMAND.to_string(),
        }
    }

    pub fn with_liveness_command(mut self, command: impl Into<String>) -> Self {
        self.liveness_command = command.into();
        self
    }

    /// Reconcile a batch of servers. Reports preserve input order and every
    /// target receives exactly one.
    #[instrument(skip_all, fields(targets = targets.len()))]
    pub async fn reconcile_servers(&self, targets: Vec<ServerTarget>) -> Vec<ServerReport> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut handles = Vec::with_capacity(targets.len());

        for target in targets {
            let semaphore = semaphore.clone();
            let runner = self.runner.clone();
            let liveness = self.liveness_command.clone();
            let (id, name) = (target.id, target.host.name.clone());

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                check_server(runner.as_ref(), &target, &liveness).await
            });
            handles.push((id, name, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (id, name, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                // A panicked probe task still yields a definitive report.
                Err(e) => {
                    warn!(server = %name, error = %e, "Reconcile task aborted");
                    ServerReport {
                        id,
                        name,
                        status: ServerStatus::Error,
                        detail: Some(format!("reconcile task aborted: {}", e)),
                        last_checked: Utc::now(),
                    }
                }
            };
            reports.push(report);
        }
        reports
    }

    /// Reconcile a batch of services via the `status` action.
    #[instrument(skip_all, fields(targets = targets.len()))]
    pub async fn reconcile_services(&self, targets: Vec<ServiceTarget>) -> Vec<ServiceReport> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut handles = Vec::with_capacity(targets.len());

        for target in targets {
            let semaphore = semaphore.clone();
            let runner = self.runner.clone();
            let (id, unit) = (target.id, target.unit.clone());

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let outcome = runner
                    .run_service_action(&target.host, &target.unit, ServiceAction::Status)
                    .await;
                ServiceReport {
                    id: target.id,
                    unit: target.unit,
                    state: outcome.state,
                    exit_code: outcome.exit_code,
                    detail: if outcome.detail.is_empty() {
                        None
                    } else {
                        Some(outcome.detail)
                    },
                    last_checked: Utc::now(),
                }
            });
            handles.push((id, unit, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (id, unit, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    warn!(unit = %unit, error = %e, "Reconcile task aborted");
                    ServiceReport {
                        id,
                        unit,
                        state: ServiceState::Failed,
                        exit_code: None,
                        detail: Some(format!("reconcile task aborted: {}", e)),
                        last_checked: Utc::now(),
                    }
                }
            };
            reports.push(report);
        }
        reports
    }
}

/// Probe one server and classify the outcome.
///
/// Running requires the liveness command to execute with exit 0. Rejected
/// credentials map to stopped; timeouts, transport faults, and nonzero
/// probe exits map to error.
async fn check_server(
    runner: &dyn CommandRunner,
    target: &ServerTarget,
    liveness_command: &str,
) -> ServerReport {
    let (status, detail) = match runner.probe(&target.host, liveness_command).await {
        Ok(output) if output.success() => {
            debug!(server = %target.host.name, "Liveness probe succeeded");
            (ServerStatus::Running, None)
        }
        Ok(output) => (
            ServerStatus::Error,
            Some(format!(
                "liveness probe exited with {}: {}",
                output.exit_code,
                output.combined()
            )),
        ),
        Err(Error::AuthenticationFailed) => (
            ServerStatus::Stopped,
            Some("authentication failed".to_string()),
        ),
        Err(e) => {
            warn!(server = %target.host.name, error = %e, "Liveness probe failed");
            (ServerStatus::Error, Some(e.to_string()))
        }
    };

    ServerReport {
        id: target.id,
        name: target.host.name.clone(),
        status,
        detail,
        last_checked: Utc::now(),
    }
}
