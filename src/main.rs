//! Rails Map - command-line tool for documenting a Rails application.
//!
//! Reads a snapshot of the application's routing table and ORM registry,
//! checks ownership against the application's source tree, and renders a
//! static HTML site.
//!
//! # Usage
//!
//! ```bash
//! rails-map [OPTIONS] <COMMAND> [APP_ROOT]
//! ```
//!
//! # Examples
//!
//! Generate the site into `./doc/api`:
//! ```bash
//! rails-map generate . --snapshot tmp/rails_map.json
//! ```
//!
//! Export the extracted data as JSON:
//! ```bash
//! rails-map export . -f json -o tmp/rails_map_tree.json
//! ```
//!
//! Remove the generated site:
//! ```bash
//! rails-map clean .
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use rails_map::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Rails Map starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    Ok(())
}
