use std::process::ExitCode;

fn main() -> ExitCode {
    casenote_cli::run()
}
