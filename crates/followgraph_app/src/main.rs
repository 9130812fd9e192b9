mod app;
mod args;
mod config;
mod effects;
mod render;

use std::process::ExitCode;

use clap::Parser;
use engine_logging::LogDestination;

use crate::args::Args;

fn main() -> ExitCode {
    let args = Args::parse();
    let destination = match args.log_file.as_deref() {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    engine_logging::initialize(destination, args.log_level);

    match app::run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}
