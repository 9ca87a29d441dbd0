//! nova-qalc: evaluate expressions with the launcher's calculator.

use std::process::ExitCode;

fn main() -> ExitCode {
    match nova_qalculate::cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
