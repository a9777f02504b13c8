use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use fleetops_core::{CommandStatus, Error, Result};

/// Command model - one operator-submitted shell command against one server
///
/// Lifecycle: pending -> running -> completed | failed. Terminal records are
/// immutable; running the same text again means creating a new record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommandRecord {
    pub id: i64,
    pub name: String,
    pub command: String,
    pub server_id: i64,
    #[sqlx(rename = "status")]
    pub status_str: String,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommandRecord {
    pub fn status(&self) -> Option<CommandStatus> {
        CommandStatus::from_str(&self.status_str)
    }

    pub fn is_terminal(&self) -> bool {
        self.status().map(|s| s.is_terminal()).unwrap_or(false)
    }
}

/// Input for creating a new command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommand {
    pub name: String,
    pub command: String,
    pub server_id: i64,
}

impl CreateCommand {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("command name cannot be empty".into()));
        }
        if self.command.trim().is_empty() {
            return Err(Error::Validation("command text cannot be empty".into()));
        }
        Ok(())
    }
}
