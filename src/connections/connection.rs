use super::errors::ConnectionError;

/// A connection to a remote host that can run one command at a time.
pub trait Connection {
    fn connect(&mut self) -> Result<(), ConnectionError>;

    /// Runs `command` and returns its combined stdout/stderr output.
    fn execute(&mut self, command: &str) -> Result<String, ConnectionError>;

    /// Releases the connection. Never fails; a no-op when not connected.
    fn close(&mut self);

    fn is_connected(&self) -> bool;
}
