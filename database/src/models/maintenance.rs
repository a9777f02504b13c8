use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use fleetops_core::{Error, MaintenanceStatus, MaintenanceType, Result};

/// Maintenance model - a planned or unplanned window on one server
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Maintenance {
    pub id: i64,
    pub name: String,
    pub server_id: i64,
    #[sqlx(rename = "maintenance_type")]
    pub maintenance_type_str: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    #[sqlx(rename = "status")]
    pub status_str: String,
    /// Responsible party
    pub responsible: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Maintenance {
    pub fn status(&self) -> Option<MaintenanceStatus> {
        MaintenanceStatus::from_str(&self.status_str)
    }

    pub fn maintenance_type(&self) -> Option<MaintenanceType> {
        MaintenanceType::from_str(&self.maintenance_type_str)
    }
}

/// Input for creating a new maintenance window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMaintenance {
    pub name: String,
    pub server_id: i64,
    #[serde(default = "default_type")]
    pub maintenance_type: String,
    pub start_date: DateTime<Utc>,
    pub description: Option<String>,
    pub responsible: Option<String>,
}

impl CreateMaintenance {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("maintenance name cannot be empty".into()));
        }
        if MaintenanceType::from_str(&self.maintenance_type).is_none() {
            return Err(Error::Validation(format!(
                "unknown maintenance type: {}",
                self.maintenance_type
            )));
        }
        Ok(())
    }
}

fn default_type() -> String {
    "unplanned".to_string()
}
