#![forbid(unsafe_code)]

//! blh: Backup Lifecycle Helper CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("blh: {e}");
        std::process::exit(e.exit_code());
    }
}
