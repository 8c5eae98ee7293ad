//! Tier 2: repo-wide heuristic scoring over every `READY_FOR_HEURISTICS`
//! link. No corpus source shows this tier's body directly (the original's
//! visible `graph_enhancement_engine.py` only implements Tier 3); this
//! module is built directly from the specification's scoring-tier
//! description. See DESIGN.md for the Open Question decisions this makes.

use canopy_core::{GraphStoreError, GraphStorePort, LinkStatus, NodeData, NodeFilter, NodeKind};
use serde_json::Value;
use std::collections::HashMap;

use super::{fqn_from_entity_slug, repo_code_entities, resolve_and_materialize, set_status, shared_scope_depth, simple_name};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchTier {
    Prefix = 1,
    Exact = 2,
}

struct Candidate {
    fqn: String,
    tier: MatchTier,
    scope_depth: usize,
}

/// Runs over every `READY_FOR_HEURISTICS` link for `repo_key`, scoring
/// repo-local entities as candidates and resolving, deferring to Tier 3, or
/// giving up outright per link.
pub async fn run(store: &dyn GraphStorePort, repo_key: &str) -> Result<(), GraphStoreError> {
    let links = store
        .find_nodes_with_filter(NodeFilter {
            kind: Some(NodeKind::PendingLink),
            repo_key: Some(repo_key.to_string()),
            status: Some(LinkStatus::ReadyForHeuristics),
            slug_id: None,
        })
        .await?;

    if links.is_empty() {
        return Ok(());
    }

    let entities = repo_code_entities(store, repo_key).await?;

    for link in links {
        let NodeData::PendingLink(data) = &link.data else { continue };
        let target = &data.target_expression;
        let caller_fqn = fqn_from_entity_slug(&data.calling_entity_slug);

        let mut candidates: Vec<Candidate> = Vec::new();
        for entity in &entities {
            let NodeData::CodeEntity(e) = &entity.data else { continue };
            let tier = if &e.fqn == target || simple_name(&e.fqn) == target {
                Some(MatchTier::Exact)
            } else if e.fqn.ends_with(&format!("::{target}")) {
                Some(MatchTier::Prefix)
            } else {
                None
            };
            if let Some(tier) = tier {
                candidates.push(Candidate {
                    fqn: e.fqn.clone(),
                    tier,
                    scope_depth: shared_scope_depth(&e.fqn, caller_fqn),
                });
            }
        }

        if candidates.is_empty() {
            // No entity in the repository resembles this expression at
            // all — no amount of LLM context would help.
            set_status(store, link.id, LinkStatus::Unresolvable, Some("no plausible candidate found in repository")).await?;
            continue;
        }

        candidates.sort_by(|a, b| {
            b.tier.cmp(&a.tier).then(b.scope_depth.cmp(&a.scope_depth)).then(a.fqn.cmp(&b.fqn))
        });

        let winner = &candidates[0];
        let dominant = candidates.get(1).is_none_or(|runner_up| winner.tier > runner_up.tier);

        if dominant {
            resolve_and_materialize(store, link.id, &data.calling_entity_slug, repo_key, &winner.fqn).await?;
        } else {
            let names: Vec<String> = candidates.iter().map(|c| c.fqn.clone()).collect();
            let mut patch = HashMap::new();
            patch.insert("status".to_string(), Value::String("READY_FOR_LLM".to_string()));
            patch.insert("candidates".to_string(), Value::Array(names.into_iter().map(Value::String).collect()));
            store.update_node_attributes(link.id, patch).await?;
        }
    }

    Ok(())
}
