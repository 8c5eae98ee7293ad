//! The three-tier Enrichment Engine: resolves `PendingLink` target
//! expressions into `CALLS` edges, escalating from a synchronous exact-match
//! fast path (Tier 1) through repo-local heuristic scoring (Tier 2) to a
//! batched LLM call (Tier 3).

pub mod tier1;
pub mod tier2;
pub mod tier3;

use std::collections::HashMap;

use canopy_core::{
    slug_to_uuid, GraphEdge, GraphNode, GraphStorePort, LinkStatus, NodeData, NodeFilter,
    NodeKind, RelationshipType,
};
use serde_json::Value;
use uuid::Uuid;

/// Every `CodeEntity` node defined under `repo_key`. `NodeFilter` doesn't
/// scope `CodeEntity` by repo (only `PendingLink` carries a `repo_key`
/// field), so this filters by the `SourceFile` slug prefix every
/// `CodeEntity.defined_in_file` inherits from `"<repo_slug>:<path>"`.
pub async fn repo_code_entities(
    store: &dyn GraphStorePort,
    repo_key: &str,
) -> Result<Vec<GraphNode>, canopy_core::GraphStoreError> {
    let prefix = format!("{repo_key}:");
    let entities = store
        .find_nodes_with_filter(NodeFilter { kind: Some(NodeKind::CodeEntity), ..Default::default() })
        .await?;
    Ok(entities
        .into_iter()
        .filter(|n| matches!(&n.data, NodeData::CodeEntity(e) if e.defined_in_file.starts_with(&prefix)))
        .collect())
}

/// Strips a `CodeEntity` slug's `@<line>` suffix, recovering its FQN.
pub fn fqn_from_entity_slug(slug: &str) -> &str {
    slug.rfind('@').map(|i| &slug[..i]).unwrap_or(slug)
}

/// The final, unqualified segment of an FQN, ignoring any trailing
/// parameter list.
pub fn simple_name(fqn: &str) -> &str {
    let without_params = fqn.split('(').next().unwrap_or(fqn);
    without_params.rsplit("::").next().unwrap_or(without_params)
}

/// The enclosing-scope path of an FQN: every `::`-joined segment except
/// the leaf itself.
pub fn scope_path(fqn: &str) -> Vec<&str> {
    let without_params = fqn.split('(').next().unwrap_or(fqn);
    let mut segments: Vec<&str> = without_params.split("::").collect();
    segments.pop();
    segments
}

/// Length of the shared scope-path prefix between two FQNs — the
/// scope-proximity tie-breaker Tier 2 uses.
pub fn shared_scope_depth(a: &str, b: &str) -> usize {
    scope_path(a).iter().zip(scope_path(b).iter()).take_while(|(x, y)| x == y).count()
}

/// Transitions a `PendingLink` to `AWAITING_TARGET` with the given
/// resolved FQN, then attempts to immediately materialize the `CALLS`
/// edge if a `CodeEntity` with that FQN already exists in the store. If it
/// doesn't (yet), the link is left in `AWAITING_TARGET` to be retried on a
/// later cycle — this is not an error.
pub async fn resolve_and_materialize(
    store: &dyn GraphStorePort,
    link_id: Uuid,
    calling_entity_slug: &str,
    repo_key: &str,
    target_fqn: &str,
) -> Result<(), canopy_core::GraphStoreError> {
    let mut patch = HashMap::new();
    patch.insert("status".to_string(), Value::String("AWAITING_TARGET".to_string()));
    patch.insert("awaited_fqn".to_string(), Value::String(target_fqn.to_string()));
    store.update_node_attributes(link_id, patch).await?;

    let entities = repo_code_entities(store, repo_key).await?;
    if let Some(target) = entities.iter().find(|n| matches!(&n.data, NodeData::CodeEntity(e) if e.fqn == target_fqn)) {
        let edge = GraphEdge::new(slug_to_uuid(calling_entity_slug), target.id, RelationshipType::Calls, Default::default());
        store.upsert_edges(vec![edge]).await?;
    }
    Ok(())
}

/// Sets a `PendingLink`'s status (and, for terminal failure states, a
/// human-readable reason) without attempting resolution.
pub async fn set_status(
    store: &dyn GraphStorePort,
    link_id: Uuid,
    status: LinkStatus,
    reason: Option<&str>,
) -> Result<(), canopy_core::GraphStoreError> {
    let mut patch = HashMap::new();
    patch.insert("status".to_string(), Value::String(link_status_str(status).to_string()));
    if let Some(reason) = reason {
        patch.insert("reason".to_string(), Value::String(reason.to_string()));
    }
    store.update_node_attributes(link_id, patch).await
}

fn link_status_str(status: LinkStatus) -> &'static str {
    match status {
        LinkStatus::PendingResolution => "PENDING_RESOLUTION",
        LinkStatus::ReadyForHeuristics => "READY_FOR_HEURISTICS",
        LinkStatus::ReadyForLlm => "READY_FOR_LLM",
        LinkStatus::AwaitingTarget => "AWAITING_TARGET",
        LinkStatus::Unresolvable => "UNRESOLVABLE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fqn_from_entity_slug_strips_line_suffix() {
        assert_eq!(fqn_from_entity_slug("a::b::foo()@12"), "a::b::foo()");
    }

    #[test]
    fn simple_name_strips_scope_and_params() {
        assert_eq!(simple_name("a::b::foo(int)"), "foo");
        assert_eq!(simple_name("Widget"), "Widget");
    }

    #[test]
    fn scope_path_drops_the_leaf_segment() {
        assert_eq!(scope_path("a::b::foo()"), vec!["a", "b"]);
        assert_eq!(scope_path("foo()"), Vec::<&str>::new());
    }

    #[test]
    fn shared_scope_depth_counts_common_prefix() {
        assert_eq!(shared_scope_depth("a::b::foo()", "a::b::c::bar()"), 2);
        assert_eq!(shared_scope_depth("a::foo()", "b::bar()"), 0);
    }
}
