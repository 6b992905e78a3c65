//! Studbook - Breeding registry with pedigree analysis

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = studbook::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
