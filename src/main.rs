//! awsips - Look up AWS IP prefixes
//!
//! Prints the IP prefixes AWS publishes for a service (or any field match),
//! serving them from a local cache that is re-downloaded only when AWS has
//! published a newer version.

use std::process::ExitCode;

use clap::Parser;

use awsips::cli::{Cli, Command};
use awsips::{logging, Config, Resolver};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::from_cli(&cli);
    logging::init(config.debug);

    match run(cli.command, Resolver::new(&config)).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

/// Executes one subcommand against the resolver
async fn run(
    command: Command,
    resolver: Resolver,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match command {
        Command::Query(args) => {
            let prefixes = resolver.query(&args.to_filter()?).await?;
            print_prefixes(&prefixes);
        }
        Command::Cached(args) => {
            let prefixes = resolver.get_from_cache(&args.to_filter()?).await?;
            print_prefixes(&prefixes);
        }
        Command::Check => {
            if resolver.is_up_to_date().await {
                println!("up to date");
            } else {
                println!("stale");
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Purge => resolver.delete_cache().await,
    }

    Ok(ExitCode::SUCCESS)
}

/// Prints one prefix per line
fn print_prefixes(prefixes: &[String]) {
    for prefix in prefixes {
        println!("{}", prefix);
    }
}
