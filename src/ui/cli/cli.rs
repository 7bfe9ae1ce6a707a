use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use log::{debug, error};
use std::ffi::OsString;
use std::io::{self, Write};
use std::time::Duration;
use thiserror::Error;

use crate::connections::connection::Connection;
use crate::connections::errors::ConnectionError;
use crate::connections::ssh::{ConnectOptions, SshConnection};
use crate::core::connection_manager::ConnectionManager;
use crate::ui::cli::report::ExecReport;
use crate::utils::logging::FATAL_TARGET;

/// Exit code for bad arguments and for any failed run.
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_SUCCESS: i32 = 0;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "ssh-exec",
    version,
    about = "Run one command on a remote host over SSH (password auth, host key not verified)",
    after_help = "Options go before HOST. HOST, USERNAME, PASSWORD and COMMAND are taken verbatim, \
                  even when they start with '-'."
)]
pub struct Args {
    /// Remote host name or IP address
    pub host: String,
    /// Username for SSH authentication
    pub username: String,
    /// Password for SSH authentication
    pub password: String,
    /// Command passed verbatim to the remote shell
    pub command: String,

    /// SSH server port
    #[arg(long, default_value_t = 22)]
    pub port: u16,
    /// Dial timeout in seconds (covers TCP connect, handshake and authentication)
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,
    /// Print a JSON report {success, output, error} instead of the raw output
    #[arg(long)]
    pub json: bool,
}

impl Args {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions::new(
            self.host.clone(),
            self.username.clone(),
            self.password.clone(),
        )
        .port(self.port)
        .timeout(Duration::from_secs(self.timeout))
    }
}

/// The two ways a run can fail once the arguments are valid.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Connection failed: {0}")]
    Connect(#[source] ConnectionError),
    #[error("Command execution failed: {0}")]
    Command(#[source] ConnectionError),
}

impl RunError {
    fn cause(&self) -> &ConnectionError {
        match self {
            RunError::Connect(e) | RunError::Command(e) => e,
        }
    }
}

/// The one-line usage message, e.g. `Usage: ssh-exec [OPTIONS] <HOST> ...`.
pub fn usage() -> String {
    Args::command().render_usage().to_string()
}

/// `argv` with option parsing cut off at the first positional.
#[derive(Debug, PartialEq, Eq)]
struct PreparedArgv {
    argv: Vec<OsString>,
    json: bool,
}

/// Scan the leading options and insert `--` before the host, so a password
/// like `-s3cret` or a command like `--json` reaches the positionals as is.
fn prepare_argv<I, T>(argv: I) -> PreparedArgv
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
    let mut json = false;
    let mut i = 1;
    while i < argv.len() {
        let arg = argv[i].to_str().map(str::to_owned);
        match arg.as_deref() {
            Some("--") => break,
            Some("--json") => json = true,
            Some("-h" | "--help" | "-V" | "--version") => {}
            // the option's value
            Some("--port" | "--timeout") => i += 1,
            Some(opt) if opt.starts_with("--port=") || opt.starts_with("--timeout=") => {}
            _ => {
                argv.insert(i, OsString::from("--"));
                break;
            }
        }
        i += 1;
    }
    PreparedArgv { argv, json }
}

/// What to print on stdout for bad arguments.
fn argument_error(json: bool) -> String {
    let usage = usage();
    if !json {
        return usage;
    }
    ExecReport::error(usage.clone())
        .to_json()
        .unwrap_or(usage)
}

/// Parse `argv`. `Err` carries the exit code once the usage (or help/version)
/// has been printed.
pub fn parse_args<I, T>(argv: I) -> Result<Args, i32>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let prepared = prepare_argv(argv);
    match Args::try_parse_from(prepared.argv) {
        Ok(args) => Ok(args),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            Err(EXIT_SUCCESS)
        }
        Err(e) => {
            debug!("Argument error: {}", e);
            println!("{}", argument_error(prepared.json));
            Err(EXIT_FAILURE)
        }
    }
}

/// Run the command described by `args` against a real SSH server.
pub fn run_cli(args: Args) -> i32 {
    let conn = SshConnection::new(args.connect_options());
    let stdout = io::stdout();
    let stderr = io::stderr();
    run_with(
        conn,
        &args.command,
        args.json,
        &mut stdout.lock(),
        &mut stderr.lock(),
    )
}

/// Connect, execute `command` once, emit the result and return the exit code.
///
/// The connection is released before this returns, whatever the outcome.
pub fn run_with<C: Connection>(
    conn: C,
    command: &str,
    json: bool,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> i32 {
    let mut manager = ConnectionManager::new(conn);
    let result = match manager.connect() {
        Err(e) => Err(RunError::Connect(e)),
        Ok(()) => manager.execute(command).map_err(RunError::Command),
    };
    drop(manager);

    let emitted = if json {
        emit_json(&result, out)
    } else {
        emit_text(&result, out, err)
    };
    if let Err(e) = emitted {
        error!("Failed to write result: {}", e);
        return EXIT_FAILURE;
    }

    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            debug!("Run failed: {:?}", e);
            EXIT_FAILURE
        }
    }
}

fn emit_text(
    result: &Result<String, RunError>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> io::Result<()> {
    match result {
        Ok(output) => {
            out.write_all(output.as_bytes())?;
            out.flush()
        }
        // Text mode prints only the error; captured output is dropped.
        Err(e) => {
            error!(target: FATAL_TARGET, "{}", e);
            writeln!(err, "{}", e)?;
            err.flush()
        }
    }
}

fn emit_json(result: &Result<String, RunError>, out: &mut dyn Write) -> io::Result<()> {
    let report = match result {
        Ok(output) => ExecReport::success(output.clone()),
        Err(e) => ExecReport::failure(e.to_string(), e.cause()),
    };
    let line = report.to_json().map_err(io::Error::other)?;
    writeln!(out, "{}", line)?;
    out.flush()
}
