mod cli;
mod fs;
mod process;

use std::process::ExitCode;

use clap::Parser;
use ifprune_core::logging::set_up_logging;
use ifprune_core::StatusFlags;

use crate::cli::Cli;

fn main() -> ExitCode {
    let args = Cli::parse();
    if set_up_logging(args.log_level()).is_err() {
        eprintln!("Failed to set up logging");
    }
    match process::process(args) {
        Ok(code) => code,
        Err(err) => {
            use std::fmt::Write;
            let mut message = err.to_string();
            for cause in err.chain().skip(1) {
                let _ = write!(&mut message, "\n  Cause: {cause}");
            }
            log::error!("{message}");
            ExitCode::from(StatusFlags::ABEND.exit_code())
        }
    }
}
