//! `kiosk` binary

use anyhow::Result;
use clap::Parser;
use kiosk_cli::{commands, logging, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_json);

    match &cli.command {
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(commands::run::execute(args))
        }
    }
}
