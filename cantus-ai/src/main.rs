//! cantus-ai - AI enrichment and search indexing for musical works
//!
//! Subcommands:
//! - `fetch`: look up a composer's works on MusicBrainz and save them as a batch file
//! - `index`: enrich a batch file with Gemini and publish it to Algolia

use anyhow::{Context, Result};
use cantus_ai::config::{
    resolve_algolia_settings, resolve_enrichment_delay, resolve_gemini_settings,
    resolve_musicbrainz_user_agent,
};
use cantus_ai::pacing::{FixedDelay, NoPacing, Pacer, QuotaPacer};
use cantus_ai::services::{AlgoliaClient, EnrichmentClient, GeminiClient, MusicBrainzClient};
use cantus_ai::workflow::{
    default_index_settings, run_pipeline, save_batch, BatchOrchestrator, IndexPublisher,
    PipelineOutcome,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_BATCH_PATH: &str = "data/music_metadata.json";

#[derive(Parser, Debug)]
#[command(name = "cantus-ai")]
#[command(about = "AI enrichment and search indexing for musical works")]
#[command(version)]
struct Args {
    /// TOML config file (default: ~/.config/cantus/cantus-ai.toml)
    #[arg(short, long, global = true, env = "CANTUS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a composer's works from MusicBrainz into a batch file
    Fetch {
        /// Composer name, matched exactly
        #[arg(long, default_value = "Johann Sebastian Bach")]
        composer: String,

        /// Maximum number of works (0 = all)
        #[arg(long, default_value = "5")]
        limit: usize,

        /// Output batch file
        #[arg(short, long, default_value = DEFAULT_BATCH_PATH)]
        output: PathBuf,
    },

    /// Enrich a batch file and publish it to the search index
    Index {
        /// Input batch file
        #[arg(short, long, default_value = DEFAULT_BATCH_PATH)]
        input: PathBuf,

        /// Destination index (overrides CANTUS_INDEX_NAME / TOML)
        #[arg(long)]
        index_name: Option<String>,

        /// Pace requests with a token bucket instead of a fixed sleep
        #[arg(long)]
        adaptive_pacing: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Loaded before tracing init: the TOML file supplies the default log level
    let config_path = cantus_common::config::config_path(args.config.as_deref(), "cantus-ai");
    let toml_config = cantus_common::config::load_module_config(args.config.as_deref(), "cantus-ai")
        .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml_config.logging.level)),
        )
        .init();

    info!(
        "Starting cantus-ai v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    match args.command {
        Command::Fetch {
            composer,
            limit,
            output,
        } => {
            let user_agent = resolve_musicbrainz_user_agent(&toml_config)?;
            let client = MusicBrainzClient::new(&user_agent)?;

            let records = client.fetch_composer_works(&composer, limit).await;
            if records.is_empty() {
                warn!("No data fetched to save");
                return Ok(());
            }

            save_batch(&output, &records)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(count = records.len(), output = %output.display(), "Saved works");
        }

        Command::Index {
            input,
            index_name,
            adaptive_pacing,
        } => {
            // Pre-flight: both backends must be configured before any record is read
            let gemini = resolve_gemini_settings(&toml_config)?;
            let algolia = resolve_algolia_settings(&toml_config)?;
            let delay = resolve_enrichment_delay(&toml_config)?;
            let index_name = index_name.unwrap_or(algolia.index_name);

            let model = GeminiClient::new(gemini.api_key, gemini.model)?;
            info!(model = %model.model(), "Gemini client ready");

            let pacer: Arc<dyn Pacer> = if adaptive_pacing {
                match QuotaPacer::with_period(delay) {
                    Some(pacer) => Arc::new(pacer),
                    None => Arc::new(NoPacing),
                }
            } else {
                Arc::new(FixedDelay::new(delay))
            };

            let orchestrator =
                BatchOrchestrator::new(EnrichmentClient::new(Arc::new(model)), pacer);
            let backend = AlgoliaClient::new(&algolia.app_id, &algolia.admin_api_key)?;
            let publisher = IndexPublisher::new(Arc::new(backend));

            let outcome = run_pipeline(
                &orchestrator,
                &publisher,
                &input,
                &index_name,
                &default_index_settings(),
            )
            .await;

            match outcome {
                Ok(PipelineOutcome::NothingToIndex) => {
                    info!("Nothing to index");
                }
                Ok(PipelineOutcome::Published {
                    confirmation,
                    degraded,
                }) => {
                    info!(
                        index = %confirmation.index_name,
                        task_id = confirmation.task_id,
                        records = confirmation.record_count,
                        degraded,
                        "Indexing confirmed"
                    );
                }
                Err(e) => {
                    error!(index = %e.index(), error = %e, "Indexing failed");
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
