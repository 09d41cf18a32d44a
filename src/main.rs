mod cds;
mod cli;
mod config;
mod download;
mod driver;
mod job;
mod ledger;
mod logging;
mod request;
mod retrieve;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Batch {
            job_file,
            dry,
            pause,
        } => match command::batch(job_file, *dry, *pause).await {
            Ok(summary) => println!("{}", summary),
            Err(e) => eprintln!("Error: {:#}", e),
        },
        Commands::Split {
            request_file,
            output_dir,
            split,
            dry,
            pause,
            file_name,
            ledger,
        } => {
            let options = command::split::SplitOptions {
                output_dir,
                fields: split,
                dry_run: *dry,
                pause: *pause,
                file_name: file_name.as_deref(),
                ledger: ledger.as_deref(),
            };
            match command::split(request_file, options).await {
                Ok(summary) => println!("{}", summary),
                Err(e) => eprintln!("Error: {:#}", e),
            }
        }
        Commands::Parse { request_file } => match command::parse(request_file) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: {:#}", e),
        },
    }

    Ok(())
}
