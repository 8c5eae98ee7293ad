//! The Graph Store Port: an abstract persistence boundary for the ingested
//! graph, plus a default in-memory implementation backed by [`Graph`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::graph::Graph;
use crate::model::{
    GraphEdge, GraphNode, HeartbeatData, HeartbeatStatus, NodeData, NodeKind,
};

#[derive(Debug, thiserror::Error)]
pub enum GraphStoreError {
    #[error("node not found: {0}")]
    NodeNotFound(Uuid),
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, GraphStoreError>;

/// A filter over node attributes, matched structurally against a node's
/// kind and (for `PendingLink` and similar) its scoping fields. Kept as a
/// small closed set rather than an arbitrary query DSL — every caller in
/// this codebase needs one of these three shapes.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub kind: Option<NodeKind>,
    pub repo_key: Option<String>,
    pub status: Option<crate::model::LinkStatus>,
    pub slug_id: Option<String>,
}

impl NodeFilter {
    pub fn matches(&self, node: &GraphNode) -> bool {
        if let Some(kind) = self.kind {
            if node.kind() != kind {
                return false;
            }
        }
        if let Some(slug) = &self.slug_id {
            if &node.slug_id != slug {
                return false;
            }
        }
        if let NodeData::PendingLink(link) = &node.data {
            if let Some(repo_key) = &self.repo_key {
                if &link.repo_key != repo_key {
                    return false;
                }
            }
            if let Some(status) = self.status {
                if link.status != status {
                    return false;
                }
            }
        } else if self.repo_key.is_some() || self.status.is_some() {
            return false;
        }
        true
    }
}

/// The abstract persistence boundary the rest of the pipeline is written
/// against. Calls are concurrency-safe and may complete in any order;
/// callers needing ordering (e.g. a `SourceFile` before its chunks) must
/// co-batch rather than rely on call sequencing.
#[async_trait]
pub trait GraphStorePort: Send + Sync {
    async fn upsert_nodes(&self, nodes: Vec<GraphNode>) -> StoreResult<()>;
    async fn upsert_edges(&self, edges: Vec<GraphEdge>) -> StoreResult<()>;
    async fn find_nodes_with_filter(&self, filter: NodeFilter) -> StoreResult<Vec<GraphNode>>;
    async fn update_node_attributes(&self, id: Uuid, patch: HashMap<String, Value>) -> StoreResult<()>;
    async fn delete_nodes_with_filter(&self, filter: NodeFilter) -> StoreResult<usize>;
    async fn update_heartbeat(&self, repo_key: &str, status: HeartbeatStatus) -> StoreResult<()>;
}

/// Default, single-process implementation of [`GraphStorePort`], backed by
/// the same in-memory [`Graph`] the pipeline otherwise manipulates directly.
pub struct InMemoryGraphStore {
    graph: Arc<RwLock<Graph>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        InMemoryGraphStore {
            graph: Arc::new(RwLock::new(Graph::new())),
        }
    }

    pub fn from_graph(graph: Arc<RwLock<Graph>>) -> Self {
        InMemoryGraphStore { graph }
    }

    pub fn graph_handle(&self) -> Arc<RwLock<Graph>> {
        self.graph.clone()
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStorePort for InMemoryGraphStore {
    async fn upsert_nodes(&self, nodes: Vec<GraphNode>) -> StoreResult<()> {
        let mut g = self.graph.write().await;
        for node in nodes {
            g.upsert_node(node);
        }
        Ok(())
    }

    async fn upsert_edges(&self, edges: Vec<GraphEdge>) -> StoreResult<()> {
        let mut g = self.graph.write().await;
        for edge in edges {
            if g.upsert_edge(edge.clone()).is_none() {
                tracing::warn!(
                    source = %edge.source,
                    target = %edge.target,
                    rel_type = edge.rel_type.as_upper_str(),
                    "dropping edge: endpoint not present in store"
                );
            }
        }
        Ok(())
    }

    async fn find_nodes_with_filter(&self, filter: NodeFilter) -> StoreResult<Vec<GraphNode>> {
        let g = self.graph.read().await;
        Ok(g.all_nodes().filter(|n| filter.matches(n)).cloned().collect())
    }

    async fn update_node_attributes(&self, id: Uuid, patch: HashMap<String, Value>) -> StoreResult<()> {
        let mut g = self.graph.write().await;
        let node = g.node_mut(id).ok_or(GraphStoreError::NodeNotFound(id))?;
        apply_patch(&mut node.data, &patch);
        Ok(())
    }

    async fn delete_nodes_with_filter(&self, filter: NodeFilter) -> StoreResult<usize> {
        let mut g = self.graph.write().await;
        let ids: Vec<Uuid> = g
            .all_nodes()
            .filter(|n| filter.matches(n))
            .map(|n| n.id)
            .collect();
        let count = ids.len();
        for id in ids {
            g.remove_node(id);
        }
        Ok(count)
    }

    async fn update_heartbeat(&self, repo_key: &str, status: HeartbeatStatus) -> StoreResult<()> {
        let mut g = self.graph.write().await;
        let slug = format!("heartbeat://{repo_key}");
        let node = GraphNode::new(
            slug,
            NodeData::IngestionHeartbeat(HeartbeatData {
                repo_key: repo_key.to_string(),
                last_activity_timestamp: chrono::Utc::now(),
                status,
            }),
        );
        g.upsert_node(node);
        Ok(())
    }
}

/// Applies a small JSON patch onto a [`PendingLink`]'s mutable fields
/// (`status`, `awaited_fqn`, `reason`, `candidates`) — the only node type
/// this codebase ever patches in place rather than re-upserting wholesale.
fn apply_patch(data: &mut NodeData, patch: &HashMap<String, Value>) {
    if let NodeData::PendingLink(link) = data {
        if let Some(Value::String(s)) = patch.get("status") {
            if let Some(status) = parse_link_status(s) {
                link.status = status;
            }
        }
        if let Some(v) = patch.get("awaited_fqn") {
            link.awaited_fqn = v.as_str().map(|s| s.to_string());
        }
        if let Some(v) = patch.get("reason") {
            link.reason = v.as_str().map(|s| s.to_string());
        }
        if let Some(Value::Array(items)) = patch.get("candidates") {
            link.candidates = items.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect();
        }
    }
}

fn parse_link_status(s: &str) -> Option<crate::model::LinkStatus> {
    use crate::model::LinkStatus::*;
    match s {
        "PENDING_RESOLUTION" => Some(PendingResolution),
        "READY_FOR_HEURISTICS" => Some(ReadyForHeuristics),
        "READY_FOR_LLM" => Some(ReadyForLlm),
        "AWAITING_TARGET" => Some(AwaitingTarget),
        "UNRESOLVABLE" => Some(Unresolvable),
        _ => None,
    }
}
