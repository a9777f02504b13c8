//! Credential resolution
//!
//! Turns a server's stored auth configuration into a usable SSH credential.
//! All validation happens here, before any network I/O: an empty password,
//! undecodable key material, or an unknown auth type each fail with their
//! own error instead of surfacing later as a generic connection failure.

use async_ssh2_tokio::client::AuthMethod;

use crate::{Error, Result};

/// Supported auth type strings as stored on a server record
pub const AUTH_TYPE_PASSWORD: &str = "password";
pub const AUTH_TYPE_KEY: &str = "key";

/// A server's validated auth configuration
///
/// Construction via [`AuthConfig::from_stored`] guarantees the material is
/// usable: passwords are non-empty and key material decodes as an SSH
/// private key. Immutable once built and cheap to clone across tasks.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthConfig {
    Password(String),
    PrivateKey {
        key: String,
        passphrase: Option<String>,
    },
}

impl AuthConfig {
    /// Build an auth configuration from stored record fields.
    pub fn from_stored(
        auth_type: &str,
        password: Option<&str>,
        private_key: Option<&str>,
        passphrase: Option<&str>,
    ) -> Result<Self> {
        match auth_type {
            AUTH_TYPE_PASSWORD => {
                let password = password.unwrap_or_default();
                if password.is_empty() {
                    return Err(Error::Validation(
                        "password auth requires a non-empty password".into(),
                    ));
                }
                Ok(Self::Password(password.to_string()))
            }
            AUTH_TYPE_KEY => {
                let key = private_key.unwrap_or_default();
                if key.trim().is_empty() {
                    return Err(Error::InvalidPrivateKey("no key material provided".into()));
                }
                let passphrase = passphrase.filter(|p| !p.is_empty());
                // Decode up front so a malformed key is reported as a key
                // problem, not a connection failure.
                russh::keys::decode_secret_key(key, passphrase)
                    .map_err(|e| Error::InvalidPrivateKey(e.to_string()))?;
                Ok(Self::PrivateKey {
                    key: key.to_string(),
                    passphrase: passphrase.map(|p| p.to_string()),
                })
            }
            other => Err(Error::UnsupportedAuthType(other.to_string())),
        }
    }

    /// Resolve into the SSH auth method used by the session layer.
    pub fn resolve(&self) -> AuthMethod {
        match self {
            Self::Password(password) => AuthMethod::with_password(password),
            Self::PrivateKey { key, passphrase } => {
                AuthMethod::with_key(key, passphrase.as_deref())
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Password(_) => AUTH_TYPE_PASSWORD,
            Self::PrivateKey { .. } => AUTH_TYPE_KEY,
        }
    }
}

// Secret material stays out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password(_) => f.write_str("AuthConfig::Password(***)"),
            Self::PrivateKey { passphrase, .. } => f
                .debug_struct("AuthConfig::PrivateKey")
                .field("key", &"***")
                .field("passphrase", &passphrase.as_ref().map(|_| "***"))
                .finish(),
        }
    }
}
