//! Entity models

mod command;
mod maintenance;
mod server;
mod service;

pub use command::{CommandRecord, CreateCommand};
pub use maintenance::{CreateMaintenance, Maintenance};
pub use server::{CreateServer, Server, UpdateServer};
pub use service::{CreateService, Service};
