//! Doxograph CLI — cross-referenced entity graphs from extractor XML.
//!
//! Loads a directory of Doxygen-style XML compound files and either dumps
//! the categorized entity trees or renders one entity's documentation.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
