pub mod connection_manager;

// Re-export the modules here for easy import elsewhere.
pub use connection_manager::*;
