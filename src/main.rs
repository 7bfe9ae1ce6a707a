use ssh_exec::ui::cli;
use ssh_exec::utils::logging::init_logging;

fn main() {
    init_logging();
    let code = match cli::parse_args(std::env::args_os()) {
        Ok(args) => cli::run_cli(args),
        Err(code) => code,
    };
    std::process::exit(code);
}
