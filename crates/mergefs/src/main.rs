use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use mergefs_lib::cli::commands::{Cli, Commands};
use mergefs_lib::ops::{self, PlacementReport};
use mergefs_lib::{DatastoreManager, MergeConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::init_from_env(Env::default().filter_or("RUST_LOG", cli.log_filter()));

    let mut config = MergeConfig::load_or_default(cli.config.as_deref())
        .with_context(|| "Failed to load configuration")?;
    config.apply_cli(&cli);

    if config.simulate {
        info!("Simulation mode: no files will be changed");
    }

    let mut manager =
        DatastoreManager::from_config(&config).with_context(|| "Failed to open datastores")?;
    let stores = manager.store_ids().to_vec();

    match cli.command {
        Commands::Distribute => {
            let report = ops::distribute(&mut manager, &stores)
                .with_context(|| "Distribute aborted")?;
            log_summary("distribute", &report);
        }
        Commands::Fixup => {
            let report = ops::fixup(&mut manager, &stores).with_context(|| "Fixup aborted")?;
            info!(
                "fixup: {} symlinks created, {} blocked by staged files",
                report.linked.len(),
                report.blocked.len()
            );
        }
        Commands::Unused => {
            for path in ops::unused(&manager, &stores)? {
                println!("{}", path.display());
            }
        }
        Commands::Balance { copies } => {
            let min_copies = copies.unwrap_or_else(|| config.min_copies());
            let report = ops::balance(&mut manager, &stores, min_copies)
                .with_context(|| "Balance aborted")?;
            log_summary("balance", &report);
        }
        Commands::ReportCopies { below } => {
            for line in ops::report_copies(&manager, &stores, below) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

fn log_summary(op: &str, report: &PlacementReport) {
    info!(
        "{}: {} placed, {} without a suitable store",
        op,
        report.placed.len(),
        report.skipped.len()
    );
}
