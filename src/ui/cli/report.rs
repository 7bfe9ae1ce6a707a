use serde::Serialize;

use crate::connections::errors::ConnectionError;

/// Machine-readable outcome printed by `--json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecReport {
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl ExecReport {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
        }
    }

    /// A failure with nothing captured, e.g. bad arguments.
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(message),
        }
    }

    /// A failed run. Output captured before a command failure is kept.
    pub fn failure(message: String, cause: &ConnectionError) -> Self {
        Self {
            output: cause.output().map(str::to_owned),
            ..Self::error(message)
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
