//! One-record operations
//!
//! Entry points invoked by external callers (API/UI layers) against a single
//! record: check a server's status, execute a stored command, or drive a
//! service lifecycle action. All remote failures terminate in the record's
//! status and result fields; none of these return transport errors.

use chrono::Utc;
use tracing::instrument;

use fleetops_core::{
    CommandRunner, CommandStatus, Reconciler, Result, ServerReport, ServerStatus, ServerTarget,
    ServiceAction, ServiceReport, ServiceState, ServiceTarget,
};
use fleetops_database::{
    apply_server_report, apply_service_report, finish_command, get_command, get_server,
    get_service, mark_command_running, CommandRecord, Database, Server, Service,
};

/// Probe one server now and persist the observed status.
#[instrument(skip(db, reconciler))]
pub async fn check_server_status(
    db: &Database,
    reconciler: &Reconciler,
    server_id: i64,
) -> Result<Server> {
    let server = get_server(db.pool(), server_id).await?;

    let report = match server.host_spec() {
        Ok(host) => {
            let mut reports = reconciler
                .reconcile_servers(vec![ServerTarget {
                    id: server.id,
                    host,
                }])
                .await;
            reports.remove(0)
        }
        Err(e) => ServerReport {
            id: server.id,
            name: server.name.clone(),
            status: ServerStatus::Error,
            detail: Some(e.to_string()),
            last_checked: Utc::now(),
        },
    };

    apply_server_report(db.pool(), &report).await?;
    get_server(db.pool(), server_id).await
}

/// Execute a stored command record on its server.
///
/// The record moves pending -> running -> completed/failed; a terminal
/// record is refused and must be re-submitted as a new one.
#[instrument(skip(db, runner))]
pub async fn run_command_record(
    db: &Database,
    runner: &dyn CommandRunner,
    command_id: i64,
) -> Result<CommandRecord> {
    let record = get_command(db.pool(), command_id).await?;
    let server = get_server(db.pool(), record.server_id).await?;

    mark_command_running(db.pool(), command_id).await?;

    let (status, output) = match server.host_spec() {
        Ok(host) => {
            let result = runner.run_raw(&host, &record.command).await;
            (result.status, result.output)
        }
        Err(e) => (CommandStatus::Failed, e.to_string()),
    };

    finish_command(db.pool(), command_id, status, &output).await?;
    get_command(db.pool(), command_id).await
}

/// Drive a service lifecycle action and persist the observed state.
#[instrument(skip(db, runner))]
pub async fn run_service_action_record(
    db: &Database,
    runner: &dyn CommandRunner,
    service_id: i64,
    action: ServiceAction,
) -> Result<Service> {
    let service = get_service(db.pool(), service_id).await?;
    let server = get_server(db.pool(), service.server_id).await?;

    let report = match server.host_spec() {
        Ok(host) => {
            let outcome = runner.run_service_action(&host, &service.name, action).await;
            ServiceReport {
                id: service.id,
                unit: service.name.clone(),
                state: outcome.state,
                exit_code: outcome.exit_code,
                detail: if outcome.detail.is_empty() {
                    None
                } else {
                    Some(outcome.detail)
                },
                last_checked: Utc::now(),
            }
        }
        Err(e) => ServiceReport {
            id: service.id,
            unit: service.name.clone(),
            state: ServiceState::Failed,
            exit_code: None,
            detail: Some(e.to_string()),
            last_checked: Utc::now(),
        },
    };

    apply_service_report(db.pool(), &report).await?;
    get_service(db.pool(), service_id).await
}

/// Reconcile an explicit set of servers (callers pass the collection by
/// value; nothing iterates global record sets).
pub async fn check_servers(
    db: &Database,
    reconciler: &Reconciler,
    server_ids: &[i64],
) -> Result<Vec<Server>> {
    let mut targets = Vec::new();
    let mut direct_reports = Vec::new();

    for &id in server_ids {
        let server = get_server(db.pool(), id).await?;
        match server.host_spec() {
            Ok(host) => targets.push(ServerTarget { id, host }),
            Err(e) => direct_reports.push(ServerReport {
                id,
                name: server.name,
                status: ServerStatus::Error,
                detail: Some(e.to_string()),
                last_checked: Utc::now(),
            }),
        }
    }

    let mut reports = reconciler.reconcile_servers(targets).await;
    reports.extend(direct_reports);
    for report in &reports {
        apply_server_report(db.pool(), report).await?;
    }

    let mut servers = Vec::with_capacity(server_ids.len());
    for &id in server_ids {
        servers.push(get_server(db.pool(), id).await?);
    }
    Ok(servers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::{seed_server, StaticRunner};
    use fleetops_database::{create_command, create_service, CreateCommand, CreateService};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_check_server_status_persists_running() {
        let db = Database::in_memory().await.unwrap();
        let id = seed_server(&db, "web-01").await;

        let reconciler = Reconciler::new(Arc::new(StaticRunner::running()), 1);
        let server = check_server_status(&db, &reconciler, id).await.unwrap();

        assert_eq!(server.status(), Some(ServerStatus::Running));
        assert!(server.last_checked.is_some());
    }

    #[tokio::test]
    async fn test_check_server_status_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let id = seed_server(&db, "web-01").await;
        let reconciler = Reconciler::new(Arc::new(StaticRunner::running()), 1);

        let first = check_server_status(&db, &reconciler, id).await.unwrap();
        let second = check_server_status(&db, &reconciler, id).await.unwrap();

        assert_eq!(first.status(), second.status());
        assert!(second.last_checked.unwrap() >= first.last_checked.unwrap());
    }

    #[tokio::test]
    async fn test_run_command_record_success() {
        let db = Database::in_memory().await.unwrap();
        let server_id = seed_server(&db, "web-01").await;
        let command_id = create_command(
            db.pool(),
            &CreateCommand {
                name: "uptime".to_string(),
                command: "uptime".to_string(),
                server_id,
            },
        )
        .await
        .unwrap();

        let runner = StaticRunner::running();
        let record = run_command_record(&db, &runner, command_id).await.unwrap();

        assert_eq!(record.status(), Some(CommandStatus::Completed));
        assert!(record.result.is_some());
    }

    #[tokio::test]
    async fn test_run_command_record_nonzero_exit_fails() {
        let db = Database::in_memory().await.unwrap();
        let server_id = seed_server(&db, "web-01").await;
        let command_id = create_command(
            db.pool(),
            &CreateCommand {
                name: "broken".to_string(),
                command: "exit 2".to_string(),
                server_id,
            },
        )
        .await
        .unwrap();

        let runner = StaticRunner::exit_code(2);
        let record = run_command_record(&db, &runner, command_id).await.unwrap();
        assert_eq!(record.status(), Some(CommandStatus::Failed));

        // Terminal: running it again is refused
        assert!(run_command_record(&db, &runner, command_id).await.is_err());
    }

    #[tokio::test]
    async fn test_service_action_persists_observed_state() {
        let db = Database::in_memory().await.unwrap();
        let server_id = seed_server(&db, "web-01").await;
        let service_id = create_service(
            db.pool(),
            &CreateService {
                name: "nginx".to_string(),
                server_id,
            },
        )
        .await
        .unwrap();

        // is-active exits 3: unit is inactive, not failed
        let runner = StaticRunner::exit_code(3);
        let service = run_service_action_record(&db, &runner, service_id, ServiceAction::Status)
            .await
            .unwrap();

        assert_eq!(service.state(), Some(ServiceState::Inactive));
        assert!(service.last_checked.is_some());
    }
}
