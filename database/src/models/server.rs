use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use fleetops_core::{validate_ipv4, AuthConfig, Error, HostSpec, Result, ServerStatus};

/// Server model - one SSH-reachable host in the fleet
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Server {
    pub id: i64,
    pub name: String,
    /// IPv4 dotted-quad, validated at create/update time
    pub ip_address: String,
    pub ssh_port: i32,
    pub username: String,
    pub operating_system: Option<String>,
    /// 'password' or 'key'
    pub auth_type: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(skip_serializing)]
    pub private_key: Option<String>,
    #[serde(skip_serializing)]
    pub key_passphrase: Option<String>,
    #[sqlx(rename = "status")]
    pub status_str: String,
    pub is_active: bool,
    pub last_checked: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Server {
    pub fn status(&self) -> Option<ServerStatus> {
        ServerStatus::from_str(&self.status_str)
    }

    /// Build the connection coordinates the core executes against.
    ///
    /// Re-validates the stored auth configuration, so a record whose secret
    /// material went bad fails here instead of as a connection error.
    pub fn host_spec(&self) -> Result<HostSpec> {
        let auth = AuthConfig::from_stored(
            &self.auth_type,
            self.password.as_deref(),
            self.private_key.as_deref(),
            self.key_passphrase.as_deref(),
        )?;

        // A row written outside the validated create/update path can carry
        // an out-of-range port; refuse it rather than truncating.
        let port = u16::try_from(self.ssh_port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| Error::Validation(format!("invalid SSH port: {}", self.ssh_port)))?;

        Ok(HostSpec {
            name: self.name.clone(),
            address: self.ip_address.clone(),
            port,
            username: self.username.clone(),
            auth,
        })
    }
}

/// Input for creating a new server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServer {
    pub name: String,
    pub ip_address: String,
    #[serde(default = "default_port")]
    pub ssh_port: i32,
    pub username: String,
    pub operating_system: Option<String>,
    #[serde(default = "default_auth_type")]
    pub auth_type: String,
    pub password: Option<String>,
    pub private_key: Option<String>,
    pub key_passphrase: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub note: Option<String>,
}

impl CreateServer {
    /// Validate before persistence; rejected input never reaches the table.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("server name cannot be empty".into()));
        }
        if self.username.trim().is_empty() {
            return Err(Error::Validation("server username cannot be empty".into()));
        }
        validate_ipv4(&self.ip_address)?;
        if self.ssh_port < 1 || self.ssh_port > 65535 {
            return Err(Error::Validation(format!(
                "invalid SSH port: {}",
                self.ssh_port
            )));
        }
        // Must resolve to exactly one supported auth type
        AuthConfig::from_stored(
            &self.auth_type,
            self.password.as_deref(),
            self.private_key.as_deref(),
            self.key_passphrase.as_deref(),
        )?;
        Ok(())
    }
}

/// Input for updating an existing server; `None` leaves the field alone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateServer {
    pub name: Option<String>,
    pub ip_address: Option<String>,
    pub ssh_port: Option<i32>,
    pub username: Option<String>,
    pub operating_system: Option<String>,
    pub auth_type: Option<String>,
    pub password: Option<String>,
    pub private_key: Option<String>,
    pub key_passphrase: Option<String>,
    pub is_active: Option<bool>,
    pub note: Option<String>,
}

impl UpdateServer {
    pub fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.ip_address.is_some()
            || self.ssh_port.is_some()
            || self.username.is_some()
            || self.operating_system.is_some()
            || self.auth_type.is_some()
            || self.password.is_some()
            || self.private_key.is_some()
            || self.key_passphrase.is_some()
            || self.is_active.is_some()
            || self.note.is_some()
    }

    /// Merge onto an existing record, producing the full post-update state
    /// so validation always sees a complete server.
    pub fn apply_to(&self, existing: &Server) -> CreateServer {
        CreateServer {
            name: self.name.clone().unwrap_or_else(|| existing.name.clone()),
            ip_address: self
                .ip_address
                .clone()
                .unwrap_or_else(|| existing.ip_address.clone()),
            ssh_port: self.ssh_port.unwrap_or(existing.ssh_port),
            username: self
                .username
                .clone()
                .unwrap_or_else(|| existing.username.clone()),
            operating_system: self
                .operating_system
                .clone()
                .or_else(|| existing.operating_system.clone()),
            auth_type: self
                .auth_type
                .clone()
                .unwrap_or_else(|| existing.auth_type.clone()),
            password: self.password.clone().or_else(|| existing.password.clone()),
            private_key: self
                .private_key
                .clone()
                .or_else(|| existing.private_key.clone()),
            key_passphrase: self
                .key_passphrase
                .clone()
                .or_else(|| existing.key_passphrase.clone()),
            is_active: self.is_active.unwrap_or(existing.is_active),
            note: self.note.clone().or_else(|| existing.note.clone()),
        }
    }
}

fn default_port() -> i32 {
    22
}

fn default_auth_type() -> String {
    "password".to_string()
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> CreateServer {
        CreateServer {
            name: "web-01".to_string(),
            ip_address: "10.0.0.5".to_string(),
            ssh_port: 22,
            username: "ops".to_string(),
            operating_system: Some("debian".to_string()),
            auth_type: "password".to_string(),
            password: Some("secret".to_string()),
            private_key: None,
            key_passphrase: None,
            is_active: true,
            note: None,
        }
    }

    #[test]
    fn test_valid_server_accepted() {
        assert!(valid_input().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_octet_rejected() {
        let mut input = valid_input();
        input.ip_address = "192.168.1.256".to_string();
        assert!(matches!(
            input.validate().unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[test]
    fn test_hostname_rejected() {
        let mut input = valid_input();
        input.ip_address = "web-01.internal".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_bad_port_rejected() {
        let mut input = valid_input();
        input.ssh_port = 0;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_auth_config_must_be_consistent() {
        let mut input = valid_input();
        input.password = None;
        assert!(input.validate().is_err());

        let mut input = valid_input();
        input.auth_type = "token".to_string();
        assert!(matches!(
            input.validate().unwrap_err(),
            Error::UnsupportedAuthType(_)
        ));
    }

    fn stored_server() -> Server {
        Server {
            id: 1,
            name: "web-01".to_string(),
            ip_address: "10.0.0.5".to_string(),
            ssh_port: 22,
            username: "ops".to_string(),
            operating_system: None,
            auth_type: "password".to_string(),
            password: Some("secret".to_string()),
            private_key: None,
            key_passphrase: None,
            status_str: "running".to_string(),
            is_active: true,
            last_checked: None,
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_host_spec_rejects_out_of_range_stored_port() {
        // Bypasses create/update validation, as a hand-written row would
        let mut server = stored_server();
        server.ssh_port = 70000;
        assert!(matches!(
            server.host_spec().unwrap_err(),
            Error::Validation(_)
        ));

        server.ssh_port = 0;
        assert!(server.host_spec().is_err());

        server.ssh_port = 2222;
        assert_eq!(server.host_spec().unwrap().port, 2222);
    }

    #[test]
    fn test_update_merge() {
        let existing = stored_server();

        let update = UpdateServer {
            ip_address: Some("10.0.0.6".to_string()),
            ..Default::default()
        };
        assert!(update.has_changes());

        let merged = update.apply_to(&existing);
        assert_eq!(merged.ip_address, "10.0.0.6");
        assert_eq!(merged.name, "web-01");
        assert!(merged.validate().is_ok());

        assert!(!UpdateServer::default().has_changes());
    }
}
