//! Tier 1: the synchronous repair worker. Called directly from
//! `notify_ingestion_activity` for the file that was just ingested —
//! matches each still-`PENDING_RESOLUTION` link against the handful of
//! entities that file just produced, with no repo-wide scan.

use canopy_core::{GraphStoreError, GraphStorePort, LinkStatus, NodeData, NodeFilter, NodeKind};

use super::{fqn_from_entity_slug, resolve_and_materialize, simple_name};

struct NewEntity {
    slug: String,
    fqn: String,
    simple_name: String,
}

/// For every `PendingLink` in `repo_key` still `PENDING_RESOLUTION`, checks
/// whether its target expression exactly matches one of `new_entity_slugs`'
/// FQN or simple name, and if so promotes it straight to `AWAITING_TARGET`.
/// Everything else is left untouched for Tier 2/3.
pub async fn run_repair_worker(
    store: &dyn GraphStorePort,
    repo_key: &str,
    new_entity_slugs: &[String],
) -> Result<(), GraphStoreError> {
    if new_entity_slugs.is_empty() {
        return Ok(());
    }

    let new_entities: Vec<NewEntity> = new_entity_slugs
        .iter()
        .map(|slug| {
            let fqn = fqn_from_entity_slug(slug).to_string();
            let simple_name = simple_name(&fqn).to_string();
            NewEntity { slug: slug.clone(), fqn, simple_name }
        })
        .collect();

    let links = store
        .find_nodes_with_filter(NodeFilter {
            kind: Some(NodeKind::PendingLink),
            repo_key: Some(repo_key.to_string()),
            status: Some(LinkStatus::PendingResolution),
            slug_id: None,
        })
        .await?;

    for link in links {
        let NodeData::PendingLink(data) = &link.data else { continue };
        let target = &data.target_expression;

        let matched = new_entities
            .iter()
            .find(|e| &e.fqn == target)
            .or_else(|| new_entities.iter().find(|e| &e.simple_name == target));

        if let Some(entity) = matched {
            resolve_and_materialize(store, link.id, &data.calling_entity_slug, repo_key, &entity.fqn).await?;
            tracing::debug!(link = %link.slug_id, target = %entity.slug, "tier 1 resolved pending link");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::{
        CodeEntityData, EntityType, GraphNode, InMemoryGraphStore, NodeData, PendingLinkData,
    };

    fn entity(fqn: &str, file: &str) -> GraphNode {
        GraphNode::new(
            format!("{fqn}@0"),
            NodeData::CodeEntity(CodeEntityData {
                entity_type: EntityType::FunctionDefinition,
                name: fqn.to_string(),
                fqn: fqn.to_string(),
                defined_in_file: file.to_string(),
                source_snippet: String::new(),
                start_line: 1,
                end_line: 1,
            }),
        )
    }

    fn pending(repo: &str, target: &str, calling: &str) -> GraphNode {
        GraphNode::new(
            format!("pending:{target}"),
            NodeData::PendingLink(PendingLinkData {
                status: canopy_core::LinkStatus::PendingResolution,
                repo_key: repo.to_string(),
                calling_entity_slug: calling.to_string(),
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
    async fn resolves_exact_simple_name_match() {
        let store = InMemoryGraphStore::new();
        let caller = entity("caller()", "repo:a.rs");
        let callee = entity("helper()", "repo:a.rs");
        let link = pending("repo", "helper", &format!("{}@0", "caller()"));
        let link_id = link.id;
        store.upsert_nodes(vec![caller, callee, link]).await.unwrap();

        run_repair_worker(&store, "repo", &["helper()@0".to_string()]).await.unwrap();

        let graph = store.graph_handle();
        let graph = graph.read().await;
        let node = graph.node(link_id).unwrap();
        match &node.data {
            NodeData::PendingLink(link) => {
                assert_eq!(link.status, canopy_core::LinkStatus::AwaitingTarget);
                assert_eq!(link.awaited_fqn.as_deref(), Some("helper()"));
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn leaves_unmatched_links_untouched() {
        let store = InMemoryGraphStore::new();
        let link = pending("repo", "unrelated_call", "caller()@0");
        let link_id = link.id;
        store.upsert_nodes(vec![link]).await.unwrap();

        run_repair_worker(&store, "repo", &["helper()@0".to_string()]).await.unwrap();

        let graph = store.graph_handle();
        let graph = graph.read().await;
        let node = graph.node(link_id).unwrap();
        match &node.data {
            NodeData::PendingLink(link) => assert_eq!(link.status, canopy_core::LinkStatus::PendingResolution),
            _ => unreachable!(),
        }
    }
}
