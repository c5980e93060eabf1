use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use echomirror::config::Flags;
use echomirror::lifecycle::startup;

#[tokio::main]
async fn main() -> ExitCode {
    let flags = Flags::parse();

    match startup::run(flags).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            ExitCode::FAILURE
        }
    }
}
