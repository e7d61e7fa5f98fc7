use clap::Parser;

use crate::cli::app::{App, Commands};

mod cli;

fn main() -> anyhow::Result<()> {
    let app = App::parse();

    let env = env_logger::Env::default().default_filter_or(app.log_level());
    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .init();

    match app.cmd {
        Commands::Extract(arg) => cli::extract::run(arg),
    }
}
