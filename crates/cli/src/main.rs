use std::process::ExitCode;

fn main() -> ExitCode {
    ringside_cli::run()
}
