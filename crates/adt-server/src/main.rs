//! Ad delivery targeting server
//!
//! Usage:
//!   adt-server serve --config adt.json
//!   adt-server match --catalog catalog.json --app com.any --os android --country US
//!   adt-server info --catalog catalog.json

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use adt_compiler::compile_index;
use adt_core::{Dimension, MatchRequest, Matcher};
use adt_server::{serve, CatalogSource, Config, FileCatalog};

#[derive(Parser, Debug)]
#[command(name = "adt-server")]
#[command(about = "Ad delivery targeting server and catalog tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the delivery API
    Serve {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listen address, overrides the configuration
        #[arg(long)]
        addr: Option<String>,

        /// Catalog file, overrides the configuration
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Log level or filter directive, overrides the configuration
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Build an index from a catalog and match one request
    Match {
        /// Catalog file
        #[arg(short, long)]
        catalog: PathBuf,

        #[arg(long)]
        app: String,

        #[arg(long)]
        os: String,

        #[arg(long)]
        country: String,
    },

    /// Print catalog and index statistics
    Info {
        /// Catalog file
        #[arg(short, long)]
        catalog: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            addr,
            catalog,
            log_level,
        } => {
            let mut config = Config::load(config.as_deref())?;
            if let Some(addr) = addr {
                config.server.addr = addr;
            }
            if let Some(catalog) = catalog {
                config.catalog.path = catalog;
            }
            if let Some(level) = log_level {
                config.server.log_level = level;
            }
            config.validate();

            init_logging(&config.server.log_level);
            serve(config).await
        }
        Commands::Match {
            catalog,
            app,
            os,
            country,
        } => {
            init_logging("warn");
            cmd_match(&catalog, MatchRequest::new(app, os, country)).await
        }
        Commands::Info { catalog } => {
            init_logging("warn");
            cmd_info(&catalog).await
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

async fn cmd_match(catalog: &Path, request: MatchRequest) -> Result<()> {
    let entries = FileCatalog::new(catalog).load_catalog().await?;
    let compiled = compile_index(&entries, 1);

    let start = Instant::now();
    let ads = Matcher::new(&compiled.index).match_request(&request);
    let elapsed = start.elapsed();

    if ads.is_empty() {
        println!("no matches");
    } else {
        let json = serde_json::to_string_pretty(&ads).context("Failed to encode result")?;
        println!("{}", json);
    }
    eprintln!("Matched in {:.3}ms", elapsed.as_secs_f64() * 1000.0);
    Ok(())
}

async fn cmd_info(catalog: &Path) -> Result<()> {
    let entries = FileCatalog::new(catalog).load_catalog().await?;

    let start = Instant::now();
    let compiled = compile_index(&entries, 1);
    let build_time = start.elapsed();
    let stats = compiled.index.stats();

    println!("Catalog: {}", catalog.display());
    println!("  Entries:     {}", compiled.stats.entries);
    println!("  Skipped:     {} rules", compiled.stats.skipped_rules);
    println!(
        "  Duplicates:  {} campaigns, {} rules",
        compiled.stats.duplicate_campaigns, compiled.stats.duplicate_rules
    );
    println!();

    println!("Index:");
    println!("  Campaigns:   {} ({} active)", stats.campaigns, stats.active);
    println!("  Rules:       {}", stats.rules);
    println!("  Build time:  {:.2}ms", build_time.as_secs_f64() * 1000.0);
    println!();

    println!("Dimensions:");
    for dim in Dimension::ALL {
        let i = dim.index();
        println!(
            "  {:<8} {} include keys, {} exclude keys, {} agnostic",
            dim.as_str(),
            stats.include_keys[i],
            stats.exclude_keys[i],
            stats.agnostic[i]
        );
    }

    Ok(())
}
