use env_logger::Env;

/// Target for the one-line fatal message the CLI also writes to stderr.
pub const FATAL_TARGET: &str = "ssh_exec::fatal";

/// Used when RUST_LOG is unset. The fatal target is off so the message is not
/// printed twice; any explicit RUST_LOG brings it back into the log stream.
pub const DEFAULT_FILTER: &str = "warn,ssh_exec::fatal=off";

/// Initialize logging using env_logger.
/// Reads the RUST_LOG environment variable for filtering and falls back to
/// [`DEFAULT_FILTER`], e.g. `RUST_LOG=ssh_exec=debug ssh-exec host user pass 'uname -a'`.
/// Log lines go to stderr so they never mix with the command output.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER))
        .try_init();
}
