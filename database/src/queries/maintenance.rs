use sqlx::{Pool, Sqlite};
use tracing::info;

use fleetops_core::{Error, MaintenanceStatus, Result, ServerStatus};

use crate::models::{CreateMaintenance, Maintenance};

const MAINTENANCE_COLUMNS: &str = "id, name, server_id, maintenance_type, start_date, end_date, \
     description, status, responsible, created_at, updated_at";

/// Create a new maintenance window in `scheduled` state
pub async fn create_maintenance(pool: &Pool<Sqlite>, input: &CreateMaintenance) -> Result<i64> {
    input.validate()?;

    crate::queries::servers::get_server(pool, input.server_id)
        .await
        .map_err(|_| {
            Error::Validation(format!(
                "maintenance references unknown server {}",
                input.server_id
            ))
        })?;

    let result = sqlx::query(
        r#"
        INSERT INTO maintenance (name, server_id, maintenance_type, start_date, description, responsible)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(input.server_id)
    .bind(&input.maintenance_type)
    .bind(input.start_date)
    .bind(&input.description)
    .bind(&input.responsible)
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to create maintenance: {}", e)))?;

    Ok(result.last_insert_rowid())
}

/// Get maintenance window by ID
pub async fn get_maintenance(pool: &Pool<Sqlite>, id: i64) -> Result<Maintenance> {
    sqlx::query_as::<_, Maintenance>(&format!(
        "SELECT {} FROM maintenance WHERE id = ?",
        MAINTENANCE_COLUMNS
    ))
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to get maintenance: {}", e)))
}

/// List maintenance windows for one server
pub async fn list_maintenance_for_server(
    pool: &Pool<Sqlite>,
    server_id: i64,
) -> Result<Vec<Maintenance>> {
    sqlx::query_as::<_, Maintenance>(&format!(
        "SELECT {} FROM maintenance WHERE server_id = ? ORDER BY start_date DESC",
        MAINTENANCE_COLUMNS
    ))
    .bind(server_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to list maintenance: {}", e)))
}

/// Enter the window: maintenance goes `in_progress` and the server is
/// forced to `stopped`, in one transaction.
pub async fn start_maintenance(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
    let record = get_maintenance(pool, id).await?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

    sqlx::query("UPDATE maintenance SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(MaintenanceStatus::InProgress.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("Failed to start maintenance: {}", e)))?;

    sqlx::query("UPDATE servers SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(ServerStatus::Stopped.as_str())
        .bind(record.server_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("Failed to stop server: {}", e)))?;

    tx.commit()
        .await
        .map_err(|e| Error::Database(format!("Failed to commit: {}", e)))?;

    info!(maintenance = %record.name, server_id = record.server_id, "Maintenance started");
    Ok(())
}

/// Leave the window: maintenance goes `completed` with the end timestamp
/// stamped, and the server is forced back to `running`.
pub async fn complete_maintenance(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
    let record = get_maintenance(pool, id).await?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| Error::Database(format!("Failed to begin transaction: {}", e)))?;

    sqlx::query(
        r#"
        UPDATE maintenance
        SET status = ?, end_date = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(MaintenanceStatus::Completed.as_str())
    .bind(chrono::Utc::now())
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(|e| Error::Database(format!("Failed to complete maintenance: {}", e)))?;

    sqlx::query("UPDATE servers SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(ServerStatus::Running.as_str())
        .bind(record.server_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("Failed to restore server status: {}", e)))?;

    tx.commit()
        .await
        .map_err(|e| Error::Database(format!("Failed to commit: {}", e)))?;

    info!(maintenance = %record.name, server_id = record.server_id, "Maintenance completed");
    Ok(())
}

/// Cancel the window; the server's status is left untouched.
pub async fn cancel_maintenance(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
    sqlx::query("UPDATE maintenance SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(MaintenanceStatus::Cancelled.as_str())
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to cancel maintenance: {}", e)))?;
    Ok(())
}
