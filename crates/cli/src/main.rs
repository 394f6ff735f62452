use std::process::ExitCode;

fn main() -> ExitCode {
    monthbook_cli::run()
}
