//! The Dispatcher: the `IngestionActivityNotifier` that turns per-file
//! ingestion activity into the quiescence-triggered enhancement cycle.
//! Grounded on `original_source/.roo/cognee/src/parser/dispatcher.py`'s
//! per-repo debounce-then-enhance loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use canopy_core::{GraphStorePort, HeartbeatStatus, IngestionActivityNotifier};
use canopy_ai::LlmPort;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::enrichment::{tier1, tier2, tier3};

/// Watches per-repo ingestion activity and, after a period of quiescence,
/// runs the full Tier 1/2/3 enhancement cycle. One cancellable watch task
/// lives per repo at a time; any new activity cancels and restarts it.
pub struct Dispatcher {
    store: Arc<dyn GraphStorePort>,
    llm: Arc<dyn LlmPort>,
    quiescence_period: Duration,
    watched: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn GraphStorePort>, llm: Arc<dyn LlmPort>, quiescence_period: Duration) -> Self {
        Dispatcher {
            store,
            llm,
            quiescence_period,
            watched: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl IngestionActivityNotifier for Dispatcher {
    async fn notify_ingestion_activity(&self, repo_key: &str, new_entity_slugs: Vec<String>) {
        if let Err(e) = tier1::run_repair_worker(self.store.as_ref(), repo_key, &new_entity_slugs).await {
            tracing::error!(repo = %repo_key, error = %e, "tier 1 repair worker failed");
        }

        let mut watched = self.watched.lock().await;
        if let Some(handle) = watched.remove(repo_key) {
            handle.abort();
        }

        let handle = spawn_quiescence_watch(
            self.store.clone(),
            self.llm.clone(),
            self.watched.clone(),
            repo_key.to_string(),
            self.quiescence_period,
        );
        watched.insert(repo_key.to_string(), handle);
    }
}

fn spawn_quiescence_watch(
    store: Arc<dyn GraphStorePort>,
    llm: Arc<dyn LlmPort>,
    watched: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
    repo_key: String,
    quiescence_period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(quiescence_period).await;
        run_enhancement_cycle(store.as_ref(), llm.as_ref(), &repo_key).await;
        watched.lock().await.remove(&repo_key);
    })
}

/// Promotes every still-`PENDING_RESOLUTION` link to `READY_FOR_HEURISTICS`
/// (Tier 1 has already had its synchronous shot at each one), then runs
/// Tier 2 and Tier 3 concurrently — each tier's own errors are contained so
/// one failing doesn't stop the other.
async fn run_enhancement_cycle(store: &dyn GraphStorePort, llm: &dyn LlmPort, repo_key: &str) {
    if let Err(e) = promote_pending_to_heuristics(store, repo_key).await {
        tracing::error!(repo = %repo_key, error = %e, "failed to promote pending links to heuristics");
        let _ = store.update_heartbeat(repo_key, HeartbeatStatus::Failed { error: e.to_string() }).await;
        return;
    }

    let (tier2_result, tier3_result) = tokio::join!(tier2::run(store, repo_key), tier3::run(store, llm, repo_key));

    let mut failed = None;
    if let Err(e) = tier2_result {
        tracing::error!(repo = %repo_key, error = %e, "tier 2 heuristics failed");
        failed = Some(e.to_string());
    }
    if let Err(e) = tier3_result {
        tracing::error!(repo = %repo_key, error = %e, "tier 3 LLM resolution failed");
        failed = Some(e.to_string());
    }

    let status = match failed {
        Some(error) => HeartbeatStatus::Failed { error },
        None => HeartbeatStatus::Active,
    };
    if let Err(e) = store.update_heartbeat(repo_key, status).await {
        tracing::error!(repo = %repo_key, error = %e, "failed to record heartbeat");
    }
}

async fn promote_pending_to_heuristics(store: &dyn GraphStorePort, repo_key: &str) -> Result<(), canopy_core::GraphStoreError> {
    use canopy_core::{LinkStatus, NodeData, NodeFilter, NodeKind};
    use serde_json::Value;

    let links = store
        .find_nodes_with_filter(NodeFilter {
            kind: Some(NodeKind::PendingLink),
            repo_key: Some(repo_key.to_string()),
            status: Some(LinkStatus::PendingResolution),
            slug_id: None,
        })
        .await?;

    for link in links {
        let NodeData::PendingLink(_) = &link.data else { continue };
        let mut patch = HashMap::new();
        patch.insert("status".to_string(), Value::String("READY_FOR_HEURISTICS".to_string()));
        store.update_node_attributes(link.id, patch).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::{CodeEntityData, EntityType, GraphNode, InMemoryGraphStore, LinkStatus, NodeData, NodeFilter, NodeKind, PendingLinkData};
    use serde_json::Value;

    struct NullLlm;
    #[async_trait]
    impl LlmPort for NullLlm {
        async fn structured_complete(&self, _prompt: &str) -> anyhow::Result<Value> {
            Ok(serde_json::json!({"resolutions": []}))
        }
    }

    fn pending(target: &str) -> GraphNode {
        GraphNode::new(
            format!("pending:{target}"),
            NodeData::PendingLink(PendingLinkData {
                status: LinkStatus::PendingResolution,
                repo_key: "repo".to_string(),
                calling_entity_slug: "caller()@0".to_string(),
                target_expression: target.to_string(),
                source_file_slug: "repo:a.rs".into(),
                line: 0,
                candidates: vec![],
                awaited_fqn: None,
                reason: None,
            }),
        )
    }

    #[tokio::test]
    async fn notify_runs_tier1_synchronously_before_returning() {
        let store: Arc<dyn GraphStorePort> = Arc::new(InMemoryGraphStore::new());
        let entity = GraphNode::new(
            "helper()@0",
            NodeData::CodeEntity(CodeEntityData {
                entity_type: EntityType::FunctionDefinition,
                name: "helper".into(),
                fqn: "helper()".into(),
                defined_in_file: "repo:a.rs".into(),
                source_snippet: String::new(),
                start_line: 1,
                end_line: 1,
            }),
        );
        store.upsert_nodes(vec![entity, pending("helper")]).await.unwrap();

        let dispatcher = Dispatcher::new(store.clone(), Arc::new(NullLlm), Duration::from_secs(3600));
        dispatcher.notify_ingestion_activity("repo", vec!["helper()@0".to_string()]).await;

        let found = store
            .find_nodes_with_filter(NodeFilter { kind: Some(NodeKind::PendingLink), slug_id: Some("pending:helper".into()), ..Default::default() })
            .await
            .unwrap();
        match &found[0].data {
            NodeData::PendingLink(link) => assert_eq!(link.status, LinkStatus::AwaitingTarget),
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn repeated_activity_replaces_the_watch_task_without_panicking() {
        let store: Arc<dyn GraphStorePort> = Arc::new(InMemoryGraphStore::new());
        let dispatcher = Dispatcher::new(store, Arc::new(NullLlm), Duration::from_secs(3600));
        dispatcher.notify_ingestion_activity("repo", vec![]).await;
        dispatcher.notify_ingestion_activity("repo", vec![]).await;
        assert_eq!(dispatcher.watched.lock().await.len(), 1);
    }
}
