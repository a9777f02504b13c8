//! Core library for FleetOps
//!
//! This crate holds the remote-execution and status-reconciliation core:
//! credential resolution, SSH session management, command execution, and
//! bounded-concurrency status reconciliation. Persistence and scheduling
//! live in sibling crates and call into this one.

pub mod credentials;
pub mod error;
pub mod executor;
pub mod notifications;
pub mod reconcile;
pub mod session;
pub mod types;

// Re-exports
pub use credentials::AuthConfig;
pub use error::{Error, Result};
pub use executor::{
    CommandExecutor, CommandRunner, ExecutionResult, ServiceOutcome, SshTransport, Transport,
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS, MAX_RESULT_BYTES,
};
pub use notifications::{LogSink, MemorySink, NotificationMessage, NotificationSink, NullSink};
pub use reconcile::{
    Reconciler, ServerReport, ServerTarget, ServiceReport, ServiceTarget, DEFAULT_CONCURRENCY,
    DEFAULT_LIVENESS_COMMAND,
};
pub use session::{ExecOutput, SshSession};
pub use types::{
    validate_ipv4, CommandStatus, HostSpec, MaintenanceStatus, MaintenanceType, ServerStatus,
    ServiceAction, ServiceState,
};
