//! # Glean Connector CLI (`glean-connector`)
//!
//! ## Usage
//!
//! ```bash
//! glean-connector --config ./config/glean.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `glean-connector index` | Run one full indexing pass and exit |
//! | `glean-connector serve` | Start the scheduler and the HTTP trigger endpoint |
//! | `glean-connector completions <shell>` | Generate shell completions |
//!
//! ## Examples
//!
//! ```bash
//! # One-shot re-index (e.g. from CI or cron)
//! GLEAN_API_TOKEN=... glean-connector index --config ./config/glean.toml
//!
//! # Long-running service: every 10 minutes plus POST /bulk-index
//! glean-connector serve --config ./config/glean.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::info;
use tracing_subscriber::EnvFilter;

use glean_connector::config::{self, Config};
use glean_connector::indexer::{
    CatalogEntityProvider, EntityProvider, FixedEntityProvider, GleanIndexer,
};
use glean_connector::scheduler::run_scheduler;
use glean_connector::server::run_server;
use glean_connector::techdocs::{StaticTokenProvider, TechDocsClient, TokenProvider};

/// Glean connector: indexes TechDocs sites into a Glean search datasource.
#[derive(Parser)]
#[command(
    name = "glean-connector",
    about = "Indexes TechDocs documentation into a Glean search datasource",
    version,
    long_about = "A connector that harvests generated TechDocs pages from the documentation \
    backend, builds search documents out of them, and bulk-uploads the documents to the Glean \
    indexing API in paginated batches. Runs on a schedule or on demand via POST /bulk-index."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/glean.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full indexing pass and exit.
    ///
    /// Fetches the collection metadata for each selected entity, builds
    /// search documents, and uploads them in batches. Exits non-zero if
    /// any batch fails.
    Index,

    /// Start the scheduler and the HTTP trigger endpoint.
    ///
    /// Runs a full indexing pass on the configured schedule (default:
    /// every 10 minutes) and serves `POST /bulk-index` for manual runs.
    Serve,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn build_indexer(config: &Config) -> Result<Arc<GleanIndexer>> {
    let tokens: Arc<dyn TokenProvider> = Arc::new(StaticTokenProvider::from_config(config));
    let techdocs = Arc::new(TechDocsClient::new(config, tokens)?);

    let entities: Box<dyn EntityProvider> = if config.catalog.discover {
        Box::new(CatalogEntityProvider::new(techdocs.clone()))
    } else {
        Box::new(FixedEntityProvider::new(config.entity.entity_ref()))
    };

    Ok(Arc::new(GleanIndexer::new(config, techdocs, entities)?))
}

fn load(config_path: &Path) -> Result<(Config, Arc<GleanIndexer>)> {
    let config = config::load_config(config_path)?;
    let indexer = build_indexer(&config)?;
    Ok((config, indexer))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "glean-connector",
                &mut std::io::stdout(),
            );
        }
        Commands::Index => {
            let (_config, indexer) = load(&cli.config)?;
            indexer.bulk_index().await?;
        }
        Commands::Serve => {
            let (config, indexer) = load(&cli.config)?;
            info!("glean connector starting up");

            let scheduler = tokio::spawn(run_scheduler(config.schedule.clone(), indexer.clone()));
            let result = run_server(&config.server.bind, indexer).await;
            scheduler.abort();
            result?;
        }
    }

    Ok(())
}
