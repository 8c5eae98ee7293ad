//! CLI command implementations

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use canopy_ai::HttpLlmProvider;
use canopy_core::InMemoryGraphStore;
use canopy_indexer::{Orchestrator, OrchestratorConfig, OrchestratorError};
use canopy_watcher::Dispatcher;

use crate::config;

/// Runs a full ingestion pass over `target` and prints one `Yielded` line
/// per node written to the graph.
///
/// Exit codes: `0` completed (per-file failures are logged and non-fatal),
/// `1` invalid input (the target path doesn't exist or isn't readable),
/// `2` an unrecoverable internal error (the graph store rejected a write).
pub async fn run_ingestion(
    target: PathBuf,
    repo_id_override: Option<String>,
    concurrency: Option<usize>,
    keep_temp: bool,
) -> ExitCode {
    if !target.is_dir() {
        tracing::error!(target = %target.display(), "ingestion target is not a directory");
        return ExitCode::from(1);
    }

    let app_config = match config::load(&target) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load canopy.toml");
            return ExitCode::from(1);
        }
    };

    let repo_slug = repo_id_override.unwrap_or_else(|| {
        target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "repo".to_string())
    });

    if !keep_temp {
        tracing::debug!(data_dir = %config::app_data_dir().display(), "temp-clone cleanup convention active");
    }

    let store = Arc::new(InMemoryGraphStore::new());
    let store_port: Arc<dyn canopy_core::GraphStorePort> = store.clone();
    let llm = Arc::new(HttpLlmProvider::new(
        app_config.llm_base_url.clone(),
        app_config.llm_api_key.clone().unwrap_or_default(),
        app_config.llm_model.clone(),
        std::time::Duration::from_secs(app_config.llm_timeout_seconds),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        store_port.clone(),
        llm,
        std::time::Duration::from_secs(app_config.quiescence_period_seconds),
    ));
    let orchestrator = Orchestrator::new(store_port, dispatcher);

    let mut run_config = OrchestratorConfig::new(repo_slug, target);
    run_config.concurrency = concurrency.unwrap_or(app_config.concurrency);

    match orchestrator.run_full_index(&run_config).await {
        Ok(()) => {
            let graph = store.graph_handle();
            let graph = graph.read().await;
            let mut count = 0u64;
            for node in graph.all_nodes() {
                count += 1;
                println!("Yielded {count}: Type={:?}, ID={}", node.kind(), node.slug_id);
            }
            tracing::info!(nodes = count, "ingestion completed");
            ExitCode::SUCCESS
        }
        Err(OrchestratorError::Discovery(e)) => {
            tracing::error!(error = %e, "repository discovery failed");
            ExitCode::from(1)
        }
        Err(OrchestratorError::Store(e)) => {
            tracing::error!(error = %e, "graph store rejected a write");
            ExitCode::from(2)
        }
    }
}
