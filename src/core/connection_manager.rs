use log::{debug, info};

use crate::connections::connection::Connection;
use crate::connections::errors::ConnectionError;

/// Owns exactly one connection for the lifetime of a run.
///
/// The connection is closed when the manager is dropped, so every exit path
/// (including early returns through `?`) releases it.
pub struct ConnectionManager<C: Connection> {
    conn: C,
}

impl<C: Connection> ConnectionManager<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    pub fn connect(&mut self) -> Result<(), ConnectionError> {
        self.conn.connect()?;
        debug!("Connection ready.");
        Ok(())
    }

    /// Runs a single command on the already established connection.
    pub fn execute(&mut self, command: &str) -> Result<String, ConnectionError> {
        info!("Executing remote command");
        let output = self.conn.execute(command)?;
        debug!("Command produced {} bytes", output.len());
        Ok(output)
    }

    /// Connect, then execute `command`. The first error wins.
    pub fn run(&mut self, command: &str) -> Result<String, ConnectionError> {
        self.connect()?;
        self.execute(command)
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn close(&mut self) {
        self.conn.close();
    }
}

impl<C: Connection> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        self.conn.close();
    }
}
