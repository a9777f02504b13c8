//! Paged batch sweeps
//!
//! Selects up to one page of eligible records, reconciles them, and writes
//! status + last-checked back. `more_work` is true exactly when a full page
//! was returned, so the caller can re-arm immediately instead of waiting
//! for the next interval. Reconciling does not change which rows are
//! eligible, so the caller must advance `offset` by `processed` between
//! re-arms; re-running at the same offset would select the same page again.

use chrono::Utc;
use tracing::{instrument, warn};

use fleetops_core::{
    Reconciler, Result, ServerReport, ServerStatus, ServerTarget, ServiceReport, ServiceState,
    ServiceTarget,
};
use fleetops_database::{
    apply_server_report, apply_service_report, get_server, list_active_servers_paged,
    list_active_services_paged, Database,
};

/// Result of one sweep pass
#[derive(Debug, Clone, Copy)]
pub struct SweepOutcome {
    pub processed: usize,
    /// A full page came back, so more eligible records may exist
    pub more_work: bool,
}

/// Reconcile one page of active servers, starting at `offset`.
#[instrument(skip(db, reconciler))]
pub async fn sweep_servers(
    db: &Database,
    reconciler: &Reconciler,
    page_size: i64,
    offset: i64,
) -> Result<SweepOutcome> {
    let rows = list_active_servers_paged(db.pool(), page_size, offset).await?;
    let processed = rows.len();

    let mut targets = Vec::new();
    let mut reports = Vec::new();

    for server in rows {
        match server.host_spec() {
            Ok(host) => targets.push(ServerTarget {
                id: server.id,
                host,
            }),
            // A record whose auth config went bad still gets a definitive
            // outcome and a timestamp bump.
            Err(e) => {
                warn!(server = %server.name, error = %e, "Unusable auth configuration");
                reports.push(ServerReport {
                    id: server.id,
                    name: server.name,
                    status: ServerStatus::Error,
                    detail: Some(e.to_string()),
                    last_checked: Utc::now(),
                });
            }
        }
    }

    reports.extend(reconciler.reconcile_servers(targets).await);
    for report in &reports {
        apply_server_report(db.pool(), report).await?;
    }

    Ok(SweepOutcome {
        processed,
        more_work: processed as i64 == page_size,
    })
}

/// Reconcile one page of active services, starting at `offset`.
#[instrument(skip(db, reconciler))]
pub async fn sweep_services(
    db: &Database,
    reconciler: &Reconciler,
    page_size: i64,
    offset: i64,
) -> Result<SweepOutcome> {
    let rows = list_active_services_paged(db.pool(), page_size, offset).await?;
    let processed = rows.len();

    let mut targets = Vec::new();
    let mut reports = Vec::new();

    for service in rows {
        let host = match get_server(db.pool(), service.server_id).await {
            Ok(server) => server.host_spec(),
            Err(e) => Err(e),
        };
        match host {
            Ok(host) => targets.push(ServiceTarget {
                id: service.id,
                unit: service.name,
                host,
            }),
            Err(e) => {
                warn!(service = %service.name, error = %e, "Unusable server for service");
                reports.push(ServiceReport {
                    id: service.id,
                    unit: service.name,
                    state: ServiceState::Failed,
                    exit_code: None,
                    detail: Some(e.to_string()),
                    last_checked: Utc::now(),
                });
            }
        }
    }

    reports.extend(reconciler.reconcile_services(targets).await);
    for report in &reports {
        apply_service_report(db.pool(), report).await?;
    }

    Ok(SweepOutcome {
        processed,
        more_work: processed as i64 == page_size,
    })
}
