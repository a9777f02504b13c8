use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use fleetops_core::{Error, Result, ServiceState};

/// Service model - a systemd unit running on one server
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Service {
    pub id: i64,
    /// Also the systemd unit name used in `systemctl` commands
    pub name: String,
    pub server_id: i64,
    #[sqlx(rename = "status")]
    pub status_str: String,
    pub is_active: bool,
    pub last_checked: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Service {
    pub fn state(&self) -> Option<ServiceState> {
        ServiceState::from_str(&self.status_str)
    }
}

/// Input for creating a new service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateService {
    pub name: String,
    pub server_id: i64,
}

impl CreateService {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("service name cannot be empty".into()));
        }
        Ok(())
    }
}
