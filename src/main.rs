//! Goodreads proxy CLI.
//!
//! Diagnostic front door for the pipeline: fetch a shelf or a batch of
//! book details and print the normalized JSON to stdout.

use anyhow::{bail, Context, Result};
use clap::Parser;
use goodreads_proxy::{
    BookDetailsPipeline, BookNormalizer, CacheBackend, CacheStore, CatalogClient, Config,
    MemoryBackend, RateLimiter, RedisBackend, ShelfPaginator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// User id whose shelf to fetch
    #[arg(short, long)]
    user_id: Option<String>,

    /// Shelf name to fetch
    #[arg(short, long, default_value = "to-read")]
    shelf: String,

    /// Comma-delimited book ids for a batch details fetch
    #[arg(short, long)]
    books: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        config
            .logging
            .default_level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    };

    goodreads_proxy::logging::init(goodreads_proxy::logging::LogConfig {
        log_dir: config.logging.log_dir.clone(),
        component: "goodreads-proxy".to_string(),
        default_level: log_level,
        console: config.logging.console,
        file: config.logging.file,
        json_format: config.logging.json_format,
    })?;

    info!(config_file = %args.config.display(), "Goodreads proxy starting");

    if config.api.key.is_empty() {
        warn!("No API key configured; the catalog API will reject requests");
    }

    // Cache backend: Redis when reachable, in-process otherwise
    let backend: Arc<dyn CacheBackend> = match RedisBackend::connect(&config.cache.redis_url).await
    {
        Ok(redis) => {
            info!(url = %config.cache.redis_url, "Connected to Redis cache");
            Arc::new(redis)
        }
        Err(e) => {
            warn!(error = %e, "Redis unavailable, using in-process cache");
            Arc::new(MemoryBackend::new())
        }
    };
    let cache = CacheStore::new(backend, config.cache.namespace.clone(), config.cache.enabled);

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit.requests_per_window,
        config.rate_limit_window(),
    ));

    let client = CatalogClient::new(
        config.api.base_url.clone(),
        config.api.key.clone(),
        limiter,
        cache,
    )
    .context("Failed to create catalog client")?;

    let normalizer = BookNormalizer::new(config.api.base_url.clone(), config.curation.clone());

    if let Some(books) = args.books {
        let ids: Vec<String> = books
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let pipeline = BookDetailsPipeline::new(client, normalizer, config.details_ttl());
        let result = pipeline.fetch_many(&ids).await;

        info!(requested = ids.len(), resolved = result.len(), "Batch fetch complete");
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if let Some(user_id) = args.user_id {
        let paginator = ShelfPaginator::new(client, normalizer, config.shelf_ttl());
        let result = paginator.fetch_shelf(&user_id, &args.shelf).await?;

        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        bail!("Nothing to do: pass --user-id for a shelf fetch or --books for a details batch");
    }

    Ok(())
}
