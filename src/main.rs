use std::process::ExitCode;

fn main() -> ExitCode {
    govpub::cli::run()
}
