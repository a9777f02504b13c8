use sqlx::{Pool, Sqlite};

use fleetops_core::{Error, Result, ServerReport};

use crate::models::{CreateServer, Server, UpdateServer};

const SERVER_COLUMNS: &str = "id, name, ip_address, ssh_port, username, operating_system, \
     auth_type, password, private_key, key_passphrase, status, is_active, last_checked, note, \
     created_at, updated_at";

/// Create a new server. Validation runs first; rejected input blocks the
/// mutation before any row is written.
pub async fn create_server(pool: &Pool<Sqlite>, server: &CreateServer) -> Result<i64> {
    server.validate()?;

    let result = sqlx::query(
        r#"
        INSERT INTO servers (name, ip_address, ssh_port, username, operating_system,
                             auth_type, password, private_key, key_passphrase, is_active, note)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&server.name)
    .bind(&server.ip_address)
    .bind(server.ssh_port)
    .bind(&server.username)
    .bind(&server.operating_system)
    .bind(&server.auth_type)
    .bind(&server.password)
    .bind(&server.private_key)
    .bind(&server.key_passphrase)
    .bind(server.is_active)
    .bind(&server.note)
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to create server: {}", e)))?;

    Ok(result.last_insert_rowid())
}

/// Get server by ID
pub async fn get_server(pool: &Pool<Sqlite>, id: i64) -> Result<Server> {
    sqlx::query_as::<_, Server>(&format!(
        "SELECT {} FROM servers WHERE id = ?",
        SERVER_COLUMNS
    ))
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to get server: {}", e)))
}

/// List all servers
pub async fn list_servers(pool: &Pool<Sqlite>) -> Result<Vec<Server>> {
    sqlx::query_as::<_, Server>(&format!(
        "SELECT {} FROM servers ORDER BY name",
        SERVER_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to list servers: {}", e)))
}

/// One page of active servers, ordered by the stable key (id)
pub async fn list_active_servers_paged(
    pool: &Pool<Sqlite>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Server>> {
    sqlx::query_as::<_, Server>(&format!(
        "SELECT {} FROM servers WHERE is_active = 1 ORDER BY id LIMIT ? OFFSET ?",
        SERVER_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to list active servers: {}", e)))
}

/// Update a server. The update is merged onto the current row and the merged
/// state re-validated, so a partial update cannot leave an invalid record.
pub async fn update_server(pool: &Pool<Sqlite>, id: i64, update: &UpdateServer) -> Result<()> {
    if !update.has_changes() {
        return Ok(());
    }

    let existing = get_server(pool, id).await?;
    let merged = update.apply_to(&existing);
    merged.validate()?;

    sqlx::query(
        r#"
        UPDATE servers
        SET name = ?, ip_address = ?, ssh_port = ?, username = ?, operating_system = ?,
            auth_type = ?, password = ?, private_key = ?, key_passphrase = ?, is_active = ?,
            note = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&merged.name)
    .bind(&merged.ip_address)
    .bind(merged.ssh_port)
    .bind(&merged.username)
    .bind(&merged.operating_system)
    .bind(&merged.auth_type)
    .bind(&merged.password)
    .bind(&merged.private_key)
    .bind(&merged.key_passphrase)
    .bind(merged.is_active)
    .bind(&merged.note)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to update server: {}", e)))?;

    Ok(())
}

/// Write back a reconcile outcome: status and last-checked timestamp
pub async fn apply_server_report(pool: &Pool<Sqlite>, report: &ServerReport) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE servers
        SET status = ?, last_checked = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(report.status.as_str())
    .bind(report.last_checked)
    .bind(report.id)
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to apply server report: {}", e)))?;

    Ok(())
}

/// Delete a server (services, commands, and maintenance cascade)
pub async fn delete_server(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM servers WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to delete server: {}", e)))?;
    Ok(())
}

/// Test fixture shared across this crate's query tests
#[cfg(test)]
pub(crate) fn server_input(name: &str, ip: &str) -> CreateServer {
    CreateServer {
        name: name.to_string(),
        ip_address: ip.to_string(),
        ssh_port: 22,
        username: "ops".to_string(),
        operating_system: None,
        auth_type: "password".to_string(),
        password: Some("secret".to_string()),
        private_key: None,
        key_passphrase: None,
        is_active: true,
        note: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::Utc;
    use fleetops_core::ServerStatus;

    #[tokio::test]
    async fn test_create_rejects_invalid_ip() {
        let db = Database::in_memory().await.unwrap();

        let err = create_server(db.pool(), &server_input("bad", "192.168.1.256"))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        // Nothing was persisted
        assert!(list_servers(db.pool()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = Database::in_memory().await.unwrap();

        let id = create_server(db.pool(), &server_input("web-01", "10.0.0.5"))
            .await
            .unwrap();
        let server = get_server(db.pool(), id).await.unwrap();

        assert_eq!(server.name, "web-01");
        assert_eq!(server.ip_address, "10.0.0.5");
        assert_eq!(server.status(), Some(ServerStatus::Running));
        assert!(server.last_checked.is_none());
        assert!(server.host_spec().is_ok());
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_merged_state() {
        let db = Database::in_memory().await.unwrap();
        let id = create_server(db.pool(), &server_input("web-01", "10.0.0.5"))
            .await
            .unwrap();

        let update = UpdateServer {
            ip_address: Some("300.0.0.1".to_string()),
            ..Default::default()
        };
        assert!(update_server(db.pool(), id, &update).await.is_err());

        // Row unchanged
        let server = get_server(db.pool(), id).await.unwrap();
        assert_eq!(server.ip_address, "10.0.0.5");

        let update = UpdateServer {
            ip_address: Some("10.0.0.6".to_string()),
            ..Default::default()
        };
        update_server(db.pool(), id, &update).await.unwrap();
        let server = get_server(db.pool(), id).await.unwrap();
        assert_eq!(server.ip_address, "10.0.0.6");
    }

    #[tokio::test]
    async fn test_paged_selection_orders_by_id() {
        let db = Database::in_memory().await.unwrap();
        for i in 0..5 {
            let mut input = server_input(&format!("node-{}", i), "10.0.0.5");
            input.is_active = i != 3; // node-3 is inactive
            create_server(db.pool(), &input).await.unwrap();
        }

        let page = list_active_servers_paged(db.pool(), 10, 0).await.unwrap();
        assert_eq!(page.len(), 4);
        let names: Vec<_> = page.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["node-0", "node-1", "node-2", "node-4"]);

        let page = list_active_servers_paged(db.pool(), 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_apply_report_stamps_status_and_timestamp() {
        let db = Database::in_memory().await.unwrap();
        let id = create_server(db.pool(), &server_input("web-01", "10.0.0.5"))
            .await
            .unwrap();

        let first = ServerReport {
            id,
            name: "web-01".to_string(),
            status: ServerStatus::Error,
            detail: Some("timed out".to_string()),
            last_checked: Utc::now(),
        };
        apply_server_report(db.pool(), &first).await.unwrap();

        let server = get_server(db.pool(), id).await.unwrap();
        assert_eq!(server.status(), Some(ServerStatus::Error));
        let t1 = server.last_checked.unwrap();

        // Second identical check: same status, non-decreasing timestamp
        let second = ServerReport {
            last_checked: Utc::now(),
            ..first
        };
        apply_server_report(db.pool(), &second).await.unwrap();
        let server = get_server(db.pool(), id).await.unwrap();
        assert_eq!(server.status(), Some(ServerStatus::Error));
        assert!(server.last_checked.unwrap() >= t1);
    }
}
