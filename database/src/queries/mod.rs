//! Query functions

pub mod commands;
pub mod maintenance;
pub mod servers;
pub mod services;

pub use commands::*;
pub use maintenance::*;
pub use servers::*;
pub use services::*;
