// tests/hw_ssh.rs
//! Talks to a real sshd. Enable with `--features hw-tests` and point it at a
//! host through SSH_EXEC_TEST_HOST, SSH_EXEC_TEST_USER and SSH_EXEC_TEST_PASSWORD.
#![cfg(feature = "hw-tests")]

use log::LevelFilter;
use ssh_exec::connections::ssh::{ConnectOptions, SshConnection};
use ssh_exec::{Connection, ConnectionError};

fn options() -> ConnectOptions {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Debug)
        .is_test(true)
        .try_init();

    let var = |name: &str| std::env::var(name).unwrap_or_else(|_| panic!("{name} is not set"));
    ConnectOptions::new(
        var("SSH_EXEC_TEST_HOST"),
        var("SSH_EXEC_TEST_USER"),
        var("SSH_EXEC_TEST_PASSWORD"),
    )
}

#[test]
fn echo_returns_its_argument() -> anyhow::Result<()> {
    let mut conn = SshConnection::new(options());
    conn.connect()?;
    assert_eq!(conn.execute("echo hi")?, "hi\n");
    conn.close();
    assert!(!conn.is_connected());
    Ok(())
}

#[test]
fn stderr_is_combined_with_stdout() -> anyhow::Result<()> {
    let mut conn = SshConnection::new(options());
    conn.connect()?;
    let output = conn.execute("echo out; echo err 1>&2")?;
    assert!(output.contains("out\n"));
    assert!(output.contains("err\n"));
    Ok(())
}

#[test]
fn non_zero_exit_is_a_command_failure() -> anyhow::Result<()> {
    let mut conn = SshConnection::new(options());
    conn.connect()?;
    match conn.execute("echo before; exit 3") {
        Err(ConnectionError::CommandFailed { status, output }) => {
            assert_eq!(status, 3);
            assert_eq!(output, "before\n");
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
    Ok(())
}

#[test]
fn command_killed_by_a_signal_is_a_failure() -> anyhow::Result<()> {
    let mut conn = SshConnection::new(options());
    conn.connect()?;
    match conn.execute("echo before; kill -9 $$") {
        Err(ConnectionError::CommandKilled { signal, output }) => {
            assert_eq!(signal, "KILL");
            assert_eq!(output, "before\n");
        }
        other => panic!("expected CommandKilled, got {other:?}"),
    }
    Ok(())
}

#[test]
fn wrong_password_is_a_connect_failure() {
    let mut options = options();
    options.password.push_str("-wrong");
    let mut conn = SshConnection::new(options);
    assert!(matches!(
        conn.connect(),
        Err(ConnectionError::ConnectFailed(_))
    ));
}
