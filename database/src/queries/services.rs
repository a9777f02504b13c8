use sqlx::{Pool, Sqlite};

use fleetops_core::{Error, Result, ServiceReport};

use crate::models::{CreateService, Service};

const SERVICE_COLUMNS: &str =
    "id, name, server_id, status, is_active, last_checked, created_at, updated_at";

/// Create a new service on a server
pub async fn create_service(pool: &Pool<Sqlite>, service: &CreateService) -> Result<i64> {
    service.validate()?;

    // Must reference exactly one existing server
    crate::queries::servers::get_server(pool, service.server_id)
        .await
        .map_err(|_| {
            Error::Validation(format!(
                "service references unknown server {}",
                service.server_id
            ))
        })?;

    let result = sqlx::query("INSERT INTO services (name, server_id) VALUES (?, ?)")
        .bind(&service.name)
        .bind(service.server_id)
        .execute(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create service: {}", e)))?;

    Ok(result.last_insert_rowid())
}

/// Get service by ID
pub async fn get_service(pool: &Pool<Sqlite>, id: i64) -> Result<Service> {
    sqlx::query_as::<_, Service>(&format!(
        "SELECT {} FROM services WHERE id = ?",
        SERVICE_COLUMNS
    ))
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to get service: {}", e)))
}

/// List services on one server
pub async fn list_services_for_server(pool: &Pool<Sqlite>, server_id: i64) -> Result<Vec<Service>> {
    sqlx::query_as::<_, Service>(&format!(
        "SELECT {} FROM services WHERE server_id = ? ORDER BY name",
        SERVICE_COLUMNS
    ))
    .bind(server_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to list services: {}", e)))
}

/// One page of active services, ordered by the stable key (id)
pub async fn list_active_services_paged(
    pool: &Pool<Sqlite>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Service>> {
    sqlx::query_as::<_, Service>(&format!(
        "SELECT {} FROM services WHERE is_active = 1 ORDER BY id LIMIT ? OFFSET ?",
        SERVICE_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to list active services: {}", e)))
}

/// Write back a reconcile outcome: state and last-checked timestamp
pub async fn apply_service_report(pool: &Pool<Sqlite>, report: &ServiceReport) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE services
        SET status = ?, last_checked = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(report.state.as_str())
    .bind(report.last_checked)
    .bind(report.id)
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to apply service report: {}", e)))?;

    Ok(())
}

/// Delete a service
pub async fn delete_service(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM services WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to delete service: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::servers::{create_server, server_input};
    use crate::Database;
    use chrono::Utc;
    use fleetops_core::ServiceState;

    #[tokio::test]
    async fn test_service_requires_existing_server() {
        let db = Database::in_memory().await.unwrap();

        let err = create_service(
            db.pool(),
            &CreateService {
                name: "nginx".to_string(),
                server_id: 42,
            },
        )
        .await
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_create_and_apply_report() {
        let db = Database::in_memory().await.unwrap();
        let server_id = create_server(db.pool(), &server_input("web-01", "10.0.0.5"))
            .await
            .unwrap();
        let id = create_service(
            db.pool(),
            &CreateService {
                name: "nginx".to_string(),
                server_id,
            },
        )
        .await
        .unwrap();

        let service = get_service(db.pool(), id).await.unwrap();
        assert_eq!(service.state(), Some(ServiceState::Inactive));
        assert!(service.last_checked.is_none());

        apply_service_report(
            db.pool(),
            &ServiceReport {
                id,
                unit: "nginx".to_string(),
                state: ServiceState::Active,
                exit_code: Some(0),
                detail: None,
                last_checked: Utc::now(),
            },
        )
        .await
        .unwrap();

        let service = get_service(db.pool(), id).await.unwrap();
        assert_eq!(service.state(), Some(ServiceState::Active));
        assert!(service.last_checked.is_some());
    }
}
