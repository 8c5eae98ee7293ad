//! In-process graph wrapping `petgraph::StableDiGraph`, indexed by the
//! deterministic `Uuid`s carried on [`GraphNode`]/[`GraphEdge`] rather than
//! by raw petgraph indices.

use std::collections::HashMap;

use dashmap::DashMap;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use uuid::Uuid;

use crate::model::{GraphEdge, GraphNode, NodeKind, RelationshipType};

/// The code graph. Node/edge identity is the content-addressed `Uuid`, not
/// the petgraph index — the index map lets us still use petgraph's
/// traversal machinery underneath.
pub struct Graph {
    inner: StableDiGraph<GraphNode, GraphEdge>,
    node_index: DashMap<Uuid, NodeIndex>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            inner: StableDiGraph::new(),
            node_index: DashMap::new(),
        }
    }

    /// Insert or replace a node, keyed by its `id`. Idempotent: upserting
    /// the same id again overwrites the stored payload in place.
    pub fn upsert_node(&mut self, node: GraphNode) -> Uuid {
        let id = node.id;
        if let Some(idx) = self.node_index.get(&id).map(|r| *r) {
            if let Some(slot) = self.inner.node_weight_mut(idx) {
                *slot = node;
            }
        } else {
            let idx = self.inner.add_node(node);
            self.node_index.insert(id, idx);
        }
        id
    }

    /// Insert or replace an edge, keyed by `(source, target, type)` via its
    /// precomputed `id`. Returns `None` if either endpoint is absent.
    pub fn upsert_edge(&mut self, edge: GraphEdge) -> Option<Uuid> {
        let source_idx = *self.node_index.get(&edge.source)?;
        let target_idx = *self.node_index.get(&edge.target)?;

        // Idempotency: remove a prior edge with the same id before re-adding.
        if let Some(existing) = self
            .inner
            .edges_connecting(source_idx, target_idx)
            .find(|e| e.weight().id == edge.id)
            .map(|e| e.id())
        {
            self.inner.remove_edge(existing);
        }

        let id = edge.id;
        self.inner.add_edge(source_idx, target_idx, edge);
        Some(id)
    }

    pub fn node(&self, id: Uuid) -> Option<&GraphNode> {
        let idx = *self.node_index.get(&id)?;
        self.inner.node_weight(idx)
    }

    pub fn node_mut(&mut self, id: Uuid) -> Option<&mut GraphNode> {
        let idx = *self.node_index.get(&id)?;
        self.inner.node_weight_mut(idx)
    }

    pub fn remove_node(&mut self, id: Uuid) -> Option<GraphNode> {
        let idx = self.node_index.remove(&id)?.1;
        self.inner.remove_node(idx)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.inner.node_weights()
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.inner.edge_weights()
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &GraphNode> {
        self.inner.node_weights().filter(move |n| n.kind() == kind)
    }

    pub fn find_by_slug(&self, slug_id: &str) -> Option<&GraphNode> {
        self.inner.node_weights().find(|n| n.slug_id == slug_id)
    }

    pub fn edges_from(&self, source: Uuid) -> impl Iterator<Item = &GraphEdge> {
        let idx = self.node_index.get(&source).map(|r| *r);
        idx.into_iter().flat_map(move |idx| {
            self.inner
                .edges_directed(idx, Direction::Outgoing)
                .map(|e| e.weight())
        })
    }

    pub fn edges_to(&self, target: Uuid) -> impl Iterator<Item = &GraphEdge> {
        let idx = self.node_index.get(&target).map(|r| *r);
        idx.into_iter().flat_map(move |idx| {
            self.inner
                .edges_directed(idx, Direction::Incoming)
                .map(|e| e.weight())
        })
    }

    pub fn has_edge_between(&self, source: Uuid, target: Uuid, rel_type: RelationshipType) -> bool {
        self.edges_from(source)
            .any(|e| e.target == target && e.rel_type == rel_type)
    }

    /// Count nodes by kind. Useful for log lines and tests.
    pub fn kind_counts(&self) -> HashMap<NodeKind, usize> {
        let mut counts = HashMap::new();
        for node in self.all_nodes() {
            *counts.entry(node.kind()).or_insert(0) += 1;
        }
        counts
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeData, RepositoryData, SourceFileData};

    fn repo_node(slug: &str) -> GraphNode {
        GraphNode::new(
            slug,
            NodeData::Repository(RepositoryData {
                path: "/tmp/repo".into(),
                discovered_at: chrono::Utc::now(),
            }),
        )
    }

    fn file_node(slug: &str) -> GraphNode {
        GraphNode::new(
            slug,
            NodeData::SourceFile(SourceFileData {
                name: "main.rs".into(),
                file_path: "/tmp/repo/main.rs".into(),
                relative_path: "main.rs".into(),
                language_key: "rust".into(),
                size_bytes: 10,
                discovered_at: chrono::Utc::now(),
            }),
        )
    }

    #[test]
    fn upsert_node_is_idempotent() {
        let mut g = Graph::new();
        let id1 = g.upsert_node(repo_node("repo"));
        let id2 = g.upsert_node(repo_node("repo"));
        assert_eq!(id1, id2);
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn upsert_edge_requires_both_endpoints() {
        let mut g = Graph::new();
        let repo_id = g.upsert_node(repo_node("repo"));
        let file_id = slug_to_uuid_for_test("repo:main.rs");
        let edge = GraphEdge::new(repo_id, file_id, RelationshipType::ContainsFile, Default::default());
        assert!(g.upsert_edge(edge).is_none());

        let actual_file_id = g.upsert_node(file_node("repo:main.rs"));
        let edge = GraphEdge::new(repo_id, actual_file_id, RelationshipType::ContainsFile, Default::default());
        assert!(g.upsert_edge(edge).is_some());
        assert_eq!(g.edge_count(), 1);
    }

    fn slug_to_uuid_for_test(slug: &str) -> Uuid {
        crate::model::slug_to_uuid(slug)
    }
}
