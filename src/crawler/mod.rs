//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with a fixed per-request timeout
//! - HTML extraction and tokenization
//! - The frontier (seen-set and FIFO queue)
//! - The worker pool and local/remote link dispatch
//! - Session coordination

mod coordinator;
mod dispatch;
mod fetcher;
mod frontier;
mod parser;
mod tokenizer;
mod worker;

pub use coordinator::{Coordinator, HealthReport, SessionMode, SessionReport};
pub use dispatch::{LinkDispatch, RemotePeer, FORWARD_TIMEOUT};
pub use fetcher::{build_http_client, fetch_page, FetchResult};
pub use frontier::{Admission, DrainPolicy, Frontier, FrontierEntry, FrontierStats, Origin};
pub use parser::{extract_text, parse_html, ParsedPage};
pub use tokenizer::{count_tokens, tokenize};
pub use worker::{process_entry, run_worker, spawn_pool, CrawlContext, WorkerStats};

use crate::config::Config;
use crate::server;
use crate::storage::{open_storage, Storage};
use crate::RippleError;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

/// Runs one batch crawl session
///
/// Seeds come from the configuration plus `extra_seeds`. The session ends
/// when the frontier has nothing pending or in flight, or when the session
/// timeout elapses.
///
/// # Example
///
/// ```no_run
/// use ripple_index::config::load_config_with_hash;
/// use ripple_index::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let report = run_crawl(&config, &hash, &[]).await?;
/// println!("{}", report);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    config_hash: &str,
    extra_seeds: &[String],
) -> Result<SessionReport, RippleError> {
    let storage: Arc<dyn Storage> = Arc::new(open_storage(Path::new(
        &config.output.database_path,
    ))?);
    let coordinator = Coordinator::new(config, storage, config_hash, SessionMode::Batch)?;

    let seeds: Vec<&str> = config
        .seeds
        .iter()
        .chain(extra_seeds)
        .map(String::as_str)
        .collect();

    coordinator.run(&seeds).await
}

/// Runs a service session behind the HTTP listener until Ctrl-C
///
/// Seeds, if any, are admitted first; further work arrives through `/crawl`
/// and `/enqueue`.
pub async fn run_service(
    config: &Config,
    config_hash: &str,
    extra_seeds: &[String],
) -> Result<SessionReport, RippleError> {
    let storage: Arc<dyn Storage> = Arc::new(open_storage(Path::new(
        &config.output.database_path,
    ))?);
    let coordinator = Arc::new(Coordinator::new(
        config,
        storage,
        config_hash,
        SessionMode::Service,
    )?);

    let seeds: Vec<&str> = config
        .seeds
        .iter()
        .chain(extra_seeds)
        .map(String::as_str)
        .collect();
    coordinator.enqueue_seeds(&seeds);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = tokio::spawn(server::serve(listener, Arc::clone(&coordinator), async move {
        let _ = stop_rx.changed().await;
    }));

    let report = coordinator
        .run_until(shutdown_signal(tokio::signal::ctrl_c()))
        .await;

    let _ = stop_tx.send(true);
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("HTTP listener failed: {}", e),
        Err(e) => tracing::error!("HTTP listener task failed: {}", e),
    }

    report
}

/// Resolves when `signal` fires; a signal that cannot be installed never resolves
async fn shutdown_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!("Failed to listen for Ctrl-C, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
}
