#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use sprig_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sprig")]
#[command(author, version, about = "Materialise node_modules without npm", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the install root (defaults to the working directory)
    #[arg(long, global = true, value_name = "PATH")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Install packages into node_modules
    Install {
        /// Package specifiers (e.g. "preact@10.19.4", "@scope/pkg@^1.0.0",
        /// "./local-pkg"). With no specifiers, dependencies are read from
        /// package.json in the install root.
        specifiers: Vec<String>,
    },

    /// Resolve the highest version of a package satisfying a range
    Resolve {
        /// Full package name (e.g. "preact", "@stripe/stripe-js")
        name: String,

        /// Semver range (e.g. "*", "^10.0.0", "<1")
        range: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let root = cli
        .root
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(root)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Install { specifiers }) => {
            commands::install::run(&config, &specifiers, cli.json)
        }
        Some(Commands::Resolve { name, range }) => {
            commands::resolve::run(&name, &range, cli.json)
        }
    }
}
