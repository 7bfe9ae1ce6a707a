//! A deterministic **in-process stand-in** for any type that implements
//! `ssh_exec::connections::connection::Connection`.
//!
//! * Script what `connect` and `execute` should return with the builder methods.
//! * Every call is recorded in a shared [`CallLog`] that the test keeps a handle
//!   to, so it can still be inspected after the fake has been moved into a
//!   `ConnectionManager`.

use std::cell::RefCell;
use std::rc::Rc;

use ssh_exec::connections::{connection::Connection, errors::ConnectionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Execute(String),
    Close,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

type Scripted<T> = Box<dyn FnMut() -> Result<T, ConnectionError>>;

pub struct FakeConnection {
    on_connect: Scripted<()>,
    on_execute: Scripted<String>,
    connected: bool,
    calls: CallLog,
}

impl FakeConnection {
    /// A fake that connects fine and answers every command with `output`.
    pub fn answering(output: &str) -> (Self, CallLog) {
        let output = output.to_owned();
        let calls = CallLog::default();
        (
            Self {
                on_connect: Box::new(|| Ok(())),
                on_execute: Box::new(move || Ok(output.clone())),
                connected: false,
                calls: Rc::clone(&calls),
            },
            calls,
        )
    }

    /// Make `connect` fail with whatever `make_error` returns.
    pub fn refusing(
        mut self,
        mut make_error: impl FnMut() -> ConnectionError + 'static,
    ) -> Self {
        self.on_connect = Box::new(move || Err(make_error()));
        self
    }

    /// Make `execute` fail with whatever `make_error` returns.
    pub fn failing(
        mut self,
        mut make_error: impl FnMut() -> ConnectionError + 'static,
    ) -> Self {
        self.on_execute = Box::new(move || Err(make_error()));
        self
    }
}

impl Connection for FakeConnection {
    fn connect(&mut self) -> Result<(), ConnectionError> {
        self.calls.borrow_mut().push(Call::Connect);
        (self.on_connect)()?;
        self.connected = true;
        Ok(())
    }

    fn execute(&mut self, command: &str) -> Result<String, ConnectionError> {
        self.calls
            .borrow_mut()
            .push(Call::Execute(command.to_owned()));
        if !self.connected {
            return Err(ConnectionError::NotConnected);
        }
        (self.on_execute)()
    }

    fn close(&mut self) {
        self.calls.borrow_mut().push(Call::Close);
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
