//! Periodic sweeps and operator-invoked actions
//!
//! Glue between persistence and the reconciliation core: paged batch sweeps
//! driven by a cron loop, plus the one-record operations external callers
//! invoke (check status, run a command record, service lifecycle actions).

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use cron::Schedule;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use fleetops_core::{Error, Result};

pub mod ops;
pub mod sweep;

#[cfg(test)]
pub(crate) mod tests_support;

pub use ops::{check_server_status, run_command_record, run_service_action_record};
pub use sweep::{sweep_servers, sweep_services, SweepOutcome};

/// Future returned by a sweep handler
pub type SweepFuture = Pin<Box<dyn Future<Output = Result<SweepOutcome>> + Send>>;

/// Scheduled sweep; the handler receives the page offset to select at
pub struct Task {
    pub id: String,
    pub schedule: Schedule,
    pub handler: Arc<dyn Fn(i64) -> SweepFuture + Send + Sync>,
}

/// Cron-driven task scheduler
///
/// The fixed interval is only the outer trigger: when a sweep reports that
/// more work may remain (a full page was processed), it is re-run
/// immediately at the advanced offset instead of waiting for the next tick.
pub struct Scheduler {
    tasks: Arc<RwLock<Vec<Task>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register a sweep under a cron expression
    pub async fn add_task<F>(&self, id: impl Into<String>, cron_expr: &str, handler: F) -> Result<()>
    where
        F: Fn(i64) -> SweepFuture + Send + Sync + 'static,
    {
        let id = id.into();
        let schedule = Schedule::from_str(cron_expr)
            .map_err(|e| Error::Scheduler(format!("Invalid cron expression: {}", e)))?;

        info!(id = %id, schedule = %cron_expr, "Scheduled task added");

        let mut tasks = self.tasks.write().await;
        tasks.push(Task {
            id,
            schedule,
            handler: Arc::new(handler),
        });

        Ok(())
    }

    /// Start the scheduler loop
    pub async fn start(&self) -> Result<()> {
        info!("Starting scheduler");

        let tasks = self.tasks.clone();

        tokio::spawn(async move {
            loop {
                let now = Utc::now();

                let tasks_read = tasks.read().await;
                for task in tasks_read.iter() {
                    let due = task
                        .schedule
                        .upcoming(Utc)
                        .next()
                        .map(|next| (next - now).num_seconds())
                        .map(|secs| (0..=60).contains(&secs))
                        .unwrap_or(false);
                    if !due {
                        continue;
                    }

                    debug!(task_id = %task.id, "Executing scheduled task");
                    Self::run_to_completion(task).await;
                }
                drop(tasks_read);

                // Check every minute
                tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;
            }
        });

        Ok(())
    }

    /// Drain one task: re-arm immediately while full pages come back,
    /// advancing the offset by `processed` each time. Re-running at a fixed
    /// offset would select the same page forever on a fleet larger than one
    /// page; advancing guarantees the pass reaches the short final page and
    /// terminates.
    async fn run_to_completion(task: &Task) {
        let mut offset: i64 = 0;
        loop {
            match (task.handler)(offset).await {
                Ok(outcome) => {
                    info!(
                        task_id = %task.id,
                        offset,
                        processed = outcome.processed,
                        more_work = outcome.more_work,
                        "Sweep finished"
                    );
                    if !outcome.more_work {
                        break;
                    }
                    offset += outcome.processed as i64;
                }
                Err(e) => {
                    error!(task_id = %task.id, error = %e, "Sweep failed");
                    break;
                }
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
