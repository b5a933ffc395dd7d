#![deny(unsafe_code)]

//! snprune — snapshot-prune CLI entry point.

use clap::Parser;
use snapshot_prune::cli::{self, Cli};

fn main() {
    let args = Cli::parse();
    if let Err(error) = cli::run(&args) {
        eprintln!("snprune: {error}");
        std::process::exit(1);
    }
}
