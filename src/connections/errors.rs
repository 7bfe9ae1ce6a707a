use thiserror::Error;

/// A central error enum for connection-related errors.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("not connected")]
    NotConnected,

    /// Address resolution, TCP dial, handshake, authentication and dial timeout
    /// all end up here.
    #[error("failed to connect: {0}")]
    ConnectFailed(String),

    #[error("failed to create session: {0}")]
    SessionFailed(String),

    /// The remote command exited non-zero. `output` holds whatever it printed.
    #[error("command failed: exit status {status}")]
    CommandFailed { status: i32, output: String },

    /// The remote command was terminated by a signal (e.g. `KILL`).
    #[error("command failed: killed by signal {signal}")]
    CommandKilled { signal: String, output: String },
}

impl ConnectionError {
    /// Output captured before the failure, if there was any.
    pub fn output(&self) -> Option<&str> {
        match self {
            ConnectionError::CommandFailed { output, .. }
            | ConnectionError::CommandKilled { output, .. } => Some(output),
            _ => None,
        }
    }
}
