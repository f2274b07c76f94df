//! crate-indexer CLI
//!
//! Batch entry point: crawl the repository into the search index.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crate_indexer::{
    error::Result,
    graph::Vocabulary,
    models::Config,
    pipeline,
    services::{OpenSearchIndex, SearchIndex},
    utils::{http, load_skip_list},
};

/// crate-indexer - Research Data Crate Indexer
#[derive(Parser, Debug)]
#[command(
    name = "crate-indexer",
    version,
    about = "Crawls a research-data repository into a search index"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the repository and index every licensed item
    Index {
        /// Stop after this many top-level collections
        #[arg(long)]
        stop: Option<usize>,
    },

    /// Delete the search index
    DeleteIndex,

    /// Validate configuration, skip list and vocabulary
    Validate,

    /// Show configuration and index status
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    log::info!("crate-indexer starting...");

    let config = Config::load_or_default(&cli.config);

    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Index { stop } => {
            config.validate()?;
            let stats = pipeline::run_indexer(&config, stop).await?;
            log::info!("Index complete! {} document(s) written", stats.written());
        }

        Command::DeleteIndex => {
            let client = http::create_client(&config.api)?;
            let index = OpenSearchIndex::new(client, &config.search);
            pipeline::delete_index(&index).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            if let Some(path) = &config.crawl.skip_file {
                if path.exists() {
                    let patterns = load_skip_list(path)?;
                    log::info!("✓ Skip list OK ({} pattern(s))", patterns.len());
                } else {
                    log::warn!("Skip list {} not found", path.display());
                }
            }

            Vocabulary::load(&config.vocabulary)?;
            log::info!("✓ Vocabulary OK");

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Repository API: {}", config.api.base_url);
            log::info!("Collection profile: {}", config.conforms_to.collection);
            log::info!("Object profile: {}", config.conforms_to.object);
            log::info!(
                "Default license: {}",
                config
                    .license
                    .default
                    .as_ref()
                    .map(|l| l.id.as_str())
                    .unwrap_or("none")
            );
            log::info!(
                "Default metadata license: {}",
                config
                    .license
                    .default_metadata
                    .as_ref()
                    .and_then(|l| l.id.as_deref())
                    .unwrap_or("none")
            );
            log::info!("Diagnostics folder: {}", config.logging.log_folder.display());

            let client = http::create_client(&config.api)?;
            let index = OpenSearchIndex::new(client, &config.search);
            match index.exists().await {
                Ok(true) => log::info!("Index {} at {}: exists", index.name(), config.search.url),
                Ok(false) => log::info!("Index {} at {}: not found", index.name(), config.search.url),
                Err(e) => log::warn!("Index {} at {}: {}", index.name(), config.search.url, e),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
