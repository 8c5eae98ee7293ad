//! Orchestrates a full-repository ingestion run: emits the `Repository` and
//! `SourceFile` nodes up front, then drives parser tasks in bounded batches,
//! chunking and adapting each file's output into graph writes as it lands.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use canopy_core::{
    GraphEdge, GraphNode, GraphStorePort, IngestionActivityNotifier, NodeData, RelationshipType,
    RepositoryData, SourceFileData,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::adapter::adapt_file_output;
use crate::discovery::{discover_files, DiscoveredFile, DiscoveryConfig, DiscoveryError};
use crate::languages::build_registry;
use crate::parser_pool::{create_parser_pool, ParserPool};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("graph store error: {0}")]
    Store(#[from] canopy_core::GraphStoreError),
}

/// Per-run parameters. `concurrency` bounds how many files are parsed at
/// once; the default mirrors the original implementation's batch size.
pub struct OrchestratorConfig {
    pub repo_slug: String,
    pub root: PathBuf,
    pub concurrency: usize,
    pub discovery: DiscoveryConfig,
}

impl OrchestratorConfig {
    pub fn new(repo_slug: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        OrchestratorConfig {
            repo_slug: repo_slug.into(),
            root: root.into(),
            concurrency: 25,
            discovery: DiscoveryConfig::default(),
        }
    }
}

pub struct Orchestrator {
    store: Arc<dyn GraphStorePort>,
    notifier: Arc<dyn IngestionActivityNotifier>,
    pool: ParserPool,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn GraphStorePort>, notifier: Arc<dyn IngestionActivityNotifier>) -> Self {
        Orchestrator { store, notifier, pool: create_parser_pool() }
    }

    pub async fn run_full_index(&self, config: &OrchestratorConfig) -> Result<(), OrchestratorError> {
        let repo_node = GraphNode::new(
            config.repo_slug.clone(),
            NodeData::Repository(RepositoryData {
                path: config.root.display().to_string(),
                discovered_at: chrono::Utc::now(),
            }),
        );
        let repo_id = repo_node.id;
        self.store.upsert_nodes(vec![repo_node]).await?;

        let files = discover_files(&config.root, &config.discovery).await?;

        // All SourceFile nodes (and their CONTAINS_FILE edges) are emitted
        // before any parsing begins, so file identity is established up
        // front regardless of how parsing is scheduled.
        let mut file_slugs: HashMap<PathBuf, String> = HashMap::new();
        let mut source_nodes = Vec::with_capacity(files.len());
        let mut containment_edges = Vec::with_capacity(files.len());
        for file in &files {
            let slug = source_file_slug(&config.repo_slug, &file.relative_path);
            let node = source_file_node(&slug, file);
            containment_edges.push(GraphEdge::new(repo_id, node.id, RelationshipType::ContainsFile, Default::default()));
            file_slugs.insert(file.absolute_path.clone(), slug);
            source_nodes.push(node);
        }
        self.store.upsert_nodes(source_nodes).await?;
        self.store.upsert_edges(containment_edges).await?;

        let registry = build_registry(self.pool.clone());
        let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for file in files {
            let Some(parser) = registry.get(file.language_key.as_str()).cloned() else {
                tracing::warn!(
                    file = %file.relative_path.display(),
                    language_key = %file.language_key,
                    "no parser registered for language key, skipping parse (SourceFile node already created)"
                );
                continue;
            };
            let file_slug = file_slugs
                .get(&file.absolute_path)
                .cloned()
                .expect("every discovered file has a slug assigned above");

            let semaphore = semaphore.clone();
            let store = self.store.clone();
            let notifier = self.notifier.clone();
            let repo_slug = config.repo_slug.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closes");
                process_file(parser.as_ref(), &repo_slug, &file_slug, &file.absolute_path, store.as_ref(), notifier.as_ref())
                    .await
                    .map_err(|e| (file.relative_path.clone(), e))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err((path, error))) => {
                    tracing::warn!(file = %path.display(), error = %error, "file processing failed, its results were dropped");
                }
                Err(join_error) => {
                    tracing::warn!(error = %join_error, "file processing task panicked");
                }
            }
        }

        Ok(())
    }
}

fn source_file_slug(repo_slug: &str, relative_path: &Path) -> String {
    format!("{repo_slug}:{}", relative_path.to_string_lossy().replace('\\', "/"))
}

fn source_file_node(slug: &str, file: &DiscoveredFile) -> GraphNode {
    let size_bytes = std::fs::metadata(&file.absolute_path).map(|m| m.len()).unwrap_or(0);
    GraphNode::new(
        slug,
        NodeData::SourceFile(SourceFileData {
            name: file
                .relative_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            file_path: file.absolute_path.display().to_string(),
            relative_path: file.relative_path.to_string_lossy().replace('\\', "/"),
            language_key: file.language_key.clone(),
            size_bytes,
            discovered_at: chrono::Utc::now(),
        }),
    )
}

async fn process_file(
    parser: &dyn crate::parser::LanguageParser,
    repo_slug: &str,
    file_slug: &str,
    absolute_path: &Path,
    store: &dyn GraphStorePort,
    notifier: &dyn IngestionActivityNotifier,
) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(absolute_path).await?;
    let events = parser.parse(&content).await?;
    let adapted = adapt_file_output(repo_slug, file_slug, &content, events);

    store.upsert_nodes(adapted.nodes).await?;
    store.upsert_edges(adapted.edges).await?;

    notifier.notify_ingestion_activity(repo_slug, adapted.entity_slugs).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::{InMemoryGraphStore, NoopActivityNotifier, NodeKind};
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn runs_full_index_over_a_small_repo() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("src/main.rs"),
            "fn helper() {}\n\nfn main() {\n    helper();\n}\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/ignored.js"), "skip me").unwrap();

        let store = Arc::new(InMemoryGraphStore::new());
        let orchestrator = Orchestrator::new(store.clone(), Arc::new(NoopActivityNotifier));
        let config = OrchestratorConfig::new("test-repo", dir.path());

        orchestrator.run_full_index(&config).await.unwrap();

        let graph = store.graph_handle();
        let graph = graph.read().await;
        assert_eq!(graph.nodes_of_kind(NodeKind::Repository).count(), 1);
        assert_eq!(graph.nodes_of_kind(NodeKind::SourceFile).count(), 1);
        assert!(graph.nodes_of_kind(NodeKind::CodeEntity).count() >= 2);
        assert!(graph.nodes_of_kind(NodeKind::TextChunk).count() >= 1);
        assert!(graph.nodes_of_kind(NodeKind::PendingLink).count() >= 1);
    }

    #[tokio::test]
    async fn errors_on_missing_root() {
        let store = Arc::new(InMemoryGraphStore::new());
        let orchestrator = Orchestrator::new(store, Arc::new(NoopActivityNotifier));
        let config = OrchestratorConfig::new("test-repo", "/no/such/path");

        let result = orchestrator.run_full_index(&config).await;
        assert!(matches!(result, Err(OrchestratorError::Discovery(_))));
    }
}
