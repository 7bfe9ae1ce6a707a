#[allow(clippy::module_inception)]
pub mod cli;
pub mod report;

pub use cli::*;
pub use report::ExecReport;
