use clap::{ArgAction, Parser, Subcommand};

use crate::cli::extract::ExtractArg;

#[derive(Clone, Debug, Parser)]
#[command(name = "strata", version, about, long_about = None, propagate_version = true)]
pub struct App {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Commands,
}

impl App {
    /// Default filter when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "x", name = "extract", about = "Extract an archive into a target directory")]
    Extract(ExtractArg),
}
