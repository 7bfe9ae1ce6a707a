pub mod connections;
pub mod core;
pub mod ui;
pub mod utils;

// re-export ergonomic entry points
pub use crate::connections::{Connection, ConnectionError};
pub use crate::core::connection_manager::ConnectionManager;
