pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use mizu_core::config::MizuConfig;
use mizu_core::error::Result;
use mizu_core::library::Library;

fn load_config(cli: &Cli) -> Result<MizuConfig> {
    let mut cfg = match &cli.config {
        Some(p) => MizuConfig::load(p)?,
        None => MizuConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        cfg.data_dir = dir.clone();
    }
    Ok(cfg)
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    // Index/Extract work on bare files and never create a data dir
    let library = || Library::open(cfg.clone());

    match cli.command {
        Commands::Index { archive } => handlers::handle_index(&archive),
        Commands::Extract { archive, dest } => handlers::handle_extract(&archive, &dest),
        Commands::Scan { dir } => handlers::handle_scan(&library()?, &dir),
        Commands::List => handlers::handle_list(&library()?),
        Commands::Pages { archive } => handlers::handle_pages(&library()?, &archive),
        Commands::Get {
            archive,
            index,
            out,
        } => handlers::handle_get(&library()?, &archive, index, out),
        Commands::Progress { archive, page } => {
            handlers::handle_progress(&library()?, &archive, page)
        }
        Commands::Evict { archive } => handlers::handle_evict(&library()?, &archive),
        Commands::Sweep => handlers::handle_sweep(&library()?),
        Commands::Compact => handlers::handle_compact(&library()?),
        Commands::Stats => handlers::handle_stats(&library()?),
    }
}
