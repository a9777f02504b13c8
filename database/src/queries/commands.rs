use sqlx::{Pool, Sqlite};

use fleetops_core::{CommandStatus, Error, Result};

use crate::models::{CommandRecord, CreateCommand};

const COMMAND_COLUMNS: &str =
    "id, name, command, server_id, status, result, created_at, updated_at";

/// Create a new command record in `pending` state
pub async fn create_command(pool: &Pool<Sqlite>, command: &CreateCommand) -> Result<i64> {
    command.validate()?;

    crate::queries::servers::get_server(pool, command.server_id)
        .await
        .map_err(|_| {
            Error::Validation(format!(
                "command references unknown server {}",
                command.server_id
            ))
        })?;

    let result = sqlx::query("INSERT INTO commands (name, command, server_id) VALUES (?, ?, ?)")
        .bind(&command.name)
        .bind(&command.command)
        .bind(command.server_id)
        .execute(pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create command: {}", e)))?;

    Ok(result.last_insert_rowid())
}

/// Get command by ID
pub async fn get_command(pool: &Pool<Sqlite>, id: i64) -> Result<CommandRecord> {
    sqlx::query_as::<_, CommandRecord>(&format!(
        "SELECT {} FROM commands WHERE id = ?",
        COMMAND_COLUMNS
    ))
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to get command: {}", e)))
}

/// List commands submitted against one server
pub async fn list_commands_for_server(
    pool: &Pool<Sqlite>,
    server_id: i64,
) -> Result<Vec<CommandRecord>> {
    sqlx::query_as::<_, CommandRecord>(&format!(
        "SELECT {} FROM commands WHERE server_id = ? ORDER BY id DESC",
        COMMAND_COLUMNS
    ))
    .bind(server_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to list commands: {}", e)))
}

/// Move a pending command to `running` before dispatching it
pub async fn mark_command_running(pool: &Pool<Sqlite>, id: i64) -> Result<()> {
    set_command_status(pool, id, CommandStatus::Running, None).await
}

/// Record the terminal outcome of a command execution
pub async fn finish_command(
    pool: &Pool<Sqlite>,
    id: i64,
    status: CommandStatus,
    result: &str,
) -> Result<()> {
    if !status.is_terminal() {
        return Err(Error::Validation(format!(
            "{} is not a terminal command status",
            status.as_str()
        )));
    }
    set_command_status(pool, id, status, Some(result)).await
}

/// Shared status writer. Terminal records are immutable: once completed or
/// failed, further writes are refused and the caller must create a new
/// record instead.
async fn set_command_status(
    pool: &Pool<Sqlite>,
    id: i64,
    status: CommandStatus,
    result: Option<&str>,
) -> Result<()> {
    let current = get_command(pool, id).await?;
    if current.is_terminal() {
        return Err(Error::Validation(format!(
            "command {} is already {}; re-submit as a new record",
            id, current.status_str
        )));
    }

    sqlx::query(
        r#"
        UPDATE commands
        SET status = ?, result = COALESCE(?, result), updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(result)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to update command: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::servers::{create_server, server_input};
    use crate::Database;

    async fn setup() -> (Database, i64) {
        let db = Database::in_memory().await.unwrap();
        let server_id = create_server(db.pool(), &server_input("web-01", "10.0.0.5"))
            .await
            .unwrap();
        (db, server_id)
    }

    #[tokio::test]
    async fn test_command_lifecycle() {
        let (db, server_id) = setup().await;

        let id = create_command(
            db.pool(),
            &CreateCommand {
                name: "disk usage".to_string(),
                command: "df -h".to_string(),
                server_id,
            },
        )
        .await
        .unwrap();

        let record = get_command(db.pool(), id).await.unwrap();
        assert_eq!(record.status(), Some(CommandStatus::Pending));

        mark_command_running(db.pool(), id).await.unwrap();
        finish_command(db.pool(), id, CommandStatus::Completed, "Filesystem ...")
            .await
            .unwrap();

        let record = get_command(db.pool(), id).await.unwrap();
        assert_eq!(record.status(), Some(CommandStatus::Completed));
        assert_eq!(record.result.as_deref(), Some("Filesystem ..."));
    }

    #[tokio::test]
    async fn test_terminal_command_is_immutable() {
        let (db, server_id) = setup().await;
        let id = create_command(
            db.pool(),
            &CreateCommand {
                name: "noop".to_string(),
                command: "true".to_string(),
                server_id,
            },
        )
        .await
        .unwrap();

        finish_command(db.pool(), id, CommandStatus::Failed, "boom")
            .await
            .unwrap();

        // Any further status write is refused
        assert!(mark_command_running(db.pool(), id).await.is_err());
        assert!(
            finish_command(db.pool(), id, CommandStatus::Completed, "late")
                .await
                .is_err()
        );

        let record = get_command(db.pool(), id).await.unwrap();
        assert_eq!(record.status(), Some(CommandStatus::Failed));
        assert_eq!(record.result.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_finish_requires_terminal_status() {
        let (db, server_id) = setup().await;
        let id = create_command(
            db.pool(),
            &CreateCommand {
                name: "noop".to_string(),
                command: "true".to_string(),
                server_id,
            },
        )
        .await
        .unwrap();

        assert!(
            finish_command(db.pool(), id, CommandStatus::Running, "")
                .await
                .is_err()
        );
    }
}
