use base64::prelude::*;
use log::{debug, info};
use ssh2::{Channel, ExtendedData, HashType, Session};
use std::io::{self, ErrorKind, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::connections::connection::Connection;
use crate::connections::errors::ConnectionError;

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where to connect and how to authenticate.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Total budget for name resolution, dial, handshake and authentication.
    pub timeout: Duration,
}

impl ConnectOptions {
    pub fn new(host: String, username: String, password: String) -> Self {
        Self {
            host,
            port: DEFAULT_PORT,
            username,
            password,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// How the remote command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RemoteExit {
    status: i32,
    signal: Option<String>,
}

/// A blocking SSH connection using the ssh2 library.
///
/// Only password authentication is attempted. The server's host key is
/// accepted without verification; its fingerprint is logged at `info`.
pub struct SshConnection {
    options: ConnectOptions,
    session: Option<Session>,
}

impl SshConnection {
    pub fn new(options: ConnectOptions) -> Self {
        SshConnection {
            options,
            session: None,
        }
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    fn dial(&self, deadline: Instant) -> Result<TcpStream, ConnectionError> {
        let addrs = resolve(&self.options.host, self.options.port, deadline)?;
        dial_within(&addrs, deadline, |addr, budget| {
            debug!("Dialing {} (budget {:?})", addr, budget);
            TcpStream::connect_timeout(addr, budget)
        })
        .map_err(|e| {
            ConnectionError::ConnectFailed(format!(
                "dial {}:{}: {}",
                self.options.host, self.options.port, e
            ))
        })
    }

    fn open_session(
        &self,
        tcp: TcpStream,
        deadline: Instant,
    ) -> Result<Session, ConnectionError> {
        let mut session = Session::new()
            .map_err(|e| ConnectionError::ConnectFailed(format!("SSH session: {}", e)))?;
        session.set_tcp_stream(tcp);

        session.set_timeout(session_timeout(deadline, "handshake")?);
        session
            .handshake()
            .map_err(|e| ConnectionError::ConnectFailed(format!("handshake: {}", e)))?;

        log_host_key(&session, &self.options.host);

        session.set_timeout(session_timeout(deadline, "authentication")?);
        session
            .userauth_password(&self.options.username, &self.options.password)
            .map_err(|e| ConnectionError::ConnectFailed(format!("authentication: {}", e)))?;
        if !session.authenticated() {
            return Err(ConnectionError::ConnectFailed(
                "SSH authentication failed".into(),
            ));
        }

        // The dial timeout must not cut a long-running command short.
        session.set_timeout(0);
        Ok(session)
    }
}

impl Connection for SshConnection {
    fn connect(&mut self) -> Result<(), ConnectionError> {
        self.close();

        let deadline = Instant::now() + self.options.timeout;
        let address = format!("{}:{}", self.options.host, self.options.port);
        info!(
            "Connecting to SSH server at {} as {}",
            address, self.options.username
        );

        let tcp = self.dial(deadline)?;
        let session = self.open_session(tcp, deadline)?;

        self.session = Some(session);
        info!("SSH connection to {} established.", address);
        Ok(())
    }

    fn execute(&mut self, command: &str) -> Result<String, ConnectionError> {
        let session = self.session.as_ref().ok_or(ConnectionError::NotConnected)?;

        let mut channel = session
            .channel_session()
            .map_err(|e| ConnectionError::SessionFailed(e.to_string()))?;
        debug!("Channel opened, executing {:?}", command);

        let result = run_on_channel(&mut channel, command);
        if let Err(e) = channel.close() {
            debug!("Close channel error (ignored): {}", e);
        }
        let (bytes, exit) = result?;

        debug!("Command ended with {:?} ({} bytes)", exit, bytes.len());
        check_exit(exit, String::from_utf8_lossy(&bytes).into_owned())
    }

    fn close(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.disconnect(None, "closing", None) {
                debug!("SSH disconnect error (ignored): {}", e);
            }
            info!("SSH connection to {} closed.", self.options.host);
        }
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

impl Drop for SshConnection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Resolve `host` on a helper thread so a hanging resolver cannot outlive `deadline`.
fn resolve(
    host: &str,
    port: u16,
    deadline: Instant,
) -> Result<Vec<SocketAddr>, ConnectionError> {
    let budget = remaining(deadline, Instant::now()).ok_or_else(|| {
        ConnectionError::ConnectFailed(format!("resolving {}: timed out", host))
    })?;

    let (tx, rx) = mpsc::channel();
    let target = host.to_owned();
    thread::spawn(move || {
        let resolved = (target.as_str(), port)
            .to_socket_addrs()
            .map(|addrs| addrs.collect::<Vec<_>>());
        let _ = tx.send(resolved);
    });

    match rx.recv_timeout(budget) {
        Ok(Ok(addrs)) => Ok(addrs),
        Ok(Err(e)) => Err(ConnectionError::ConnectFailed(format!(
            "cannot resolve {}: {}",
            host, e
        ))),
        Err(_) => Err(ConnectionError::ConnectFailed(format!(
            "resolving {}: timed out",
            host
        ))),
    }
}

/// Try each address in turn with whatever is left of `deadline`.
///
/// All attempts share one budget; once it is spent the remaining addresses
/// are skipped and the last error is returned.
fn dial_within<T>(
    addrs: &[SocketAddr],
    deadline: Instant,
    mut connect: impl FnMut(&SocketAddr, Duration) -> io::Result<T>,
) -> io::Result<T> {
    let mut last_err = None;
    for addr in addrs {
        let Some(budget) = remaining(deadline, Instant::now()) else {
            break;
        };
        match connect(addr, budget) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("Dial {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(match last_err {
        Some(e) => e,
        None if addrs.is_empty() => io::Error::new(ErrorKind::NotFound, "no addresses found"),
        None => io::Error::new(ErrorKind::TimedOut, "i/o timeout"),
    })
}

/// Time left until `deadline`, or `None` once it has passed.
fn remaining(deadline: Instant, now: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(now);
    (!left.is_zero()).then_some(left)
}

fn session_timeout(deadline: Instant, stage: &str) -> Result<u32, ConnectionError> {
    remaining(deadline, Instant::now())
        .map(timeout_millis)
        .ok_or_else(|| ConnectionError::ConnectFailed(format!("{}: timed out", stage)))
}

/// Execute `command` on `channel`, returning the combined output and how it exited.
fn run_on_channel(
    channel: &mut Channel,
    command: &str,
) -> Result<(Vec<u8>, RemoteExit), ConnectionError> {
    // stderr is folded into the stdout stream so both arrive interleaved.
    channel
        .handle_extended_data(ExtendedData::Merge)
        .map_err(|e| ConnectionError::SessionFailed(format!("merge stderr: {}", e)))?;
    channel
        .exec(command)
        .map_err(|e| ConnectionError::SessionFailed(format!("exec: {}", e)))?;

    let mut output = Vec::new();
    channel
        .read_to_end(&mut output)
        .map_err(|e| ConnectionError::SessionFailed(format!("read: {}", e)))?;
    channel
        .wait_close()
        .map_err(|e| ConnectionError::SessionFailed(format!("wait close: {}", e)))?;

    // libssh2 reports status 0 when only an exit-signal arrived.
    let status = channel
        .exit_status()
        .map_err(|e| ConnectionError::SessionFailed(format!("exit status: {}", e)))?;
    let signal = channel
        .exit_signal()
        .map_err(|e| ConnectionError::SessionFailed(format!("exit signal: {}", e)))?
        .exit_signal;

    Ok((output, RemoteExit { status, signal }))
}

fn check_exit(exit: RemoteExit, output: String) -> Result<String, ConnectionError> {
    if let Some(signal) = exit.signal {
        return Err(ConnectionError::CommandKilled { signal, output });
    }
    if exit.status != 0 {
        return Err(ConnectionError::CommandFailed {
            status: exit.status,
            output,
        });
    }
    Ok(output)
}

fn log_host_key(session: &Session, host: &str) {
    let kind = session
        .host_key()
        .map(|(_, kind)| format!("{:?} ", kind))
        .unwrap_or_default();
    match session.host_key_hash(HashType::Sha256) {
        Some(hash) => info!(
            "Accepting {}host key of {} without verification ({})",
            kind,
            host,
            fingerprint(hash)
        ),
        None => info!("Accepting host key of {} without verification", host),
    }
}

/// OpenSSH style fingerprint, as printed by `ssh-keygen -lf`.
fn fingerprint(sha256: &[u8]) -> String {
    format!("SHA256:{}", BASE64_STANDARD_NO_PAD.encode(sha256))
}

/// libssh2 takes milliseconds as `u32`, where 0 means "no timeout".
fn timeout_millis(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX).max(1)
}
