//! Tier 3: LLM-assisted resolution over every `READY_FOR_LLM` link,
//! batched by source file. Grounded on
//! `original_source/.../graph_enhancement_engine.py`'s `run_tier3_enhancement`:
//! cache-check before the LLM call, one call per file, batch-wide failure
//! handling.

use std::collections::{hash_map::Entry, HashMap};

use canopy_ai::{llm::build_resolution_prompt, llm::parse_resolution_response, LlmPort, LlmResolutionRequest};
use canopy_ai::resolution_cache::fingerprint;
use canopy_core::{
    GraphNode, GraphStoreError, GraphStorePort, LinkStatus, NodeData, NodeFilter, NodeKind,
    ResolutionCacheData,
};

use super::{resolve_and_materialize, set_status};

pub async fn run(store: &dyn GraphStorePort, llm: &dyn LlmPort, repo_key: &str) -> Result<(), GraphStoreError> {
    let links = store
        .find_nodes_with_filter(NodeFilter {
            kind: Some(NodeKind::PendingLink),
            repo_key: Some(repo_key.to_string()),
            status: Some(LinkStatus::ReadyForLlm),
            slug_id: None,
        })
        .await?;

    if links.is_empty() {
        return Ok(());
    }

    let mut by_file: HashMap<String, Vec<GraphNode>> = HashMap::new();
    for link in links {
        let NodeData::PendingLink(data) = &link.data else { continue };
        by_file.entry(data.source_file_slug.clone()).or_default().push(link);
    }

    for (file_slug, mut file_links) in by_file {
        // 1. Resolve anything already cached, removing it from the batch.
        let mut remaining = Vec::new();
        for link in file_links.drain(..) {
            let NodeData::PendingLink(data) = &link.data else { continue };
            let key = fingerprint(&data.target_expression, &data.candidates, &file_language_key(&data.source_file_slug));
            let cache_hit = store
                .find_nodes_with_filter(NodeFilter { kind: Some(NodeKind::ResolutionCache), slug_id: Some(format!("cache:{key}")), ..Default::default() })
                .await?;

            if let Some(hit) = cache_hit.into_iter().next() {
                if let NodeData::ResolutionCache(cache) = hit.data {
                    resolve_and_materialize(store, link.id, &data.calling_entity_slug, repo_key, &cache.resolved_fqn).await?;
                    continue;
                }
            }
            remaining.push(link);
        }

        if remaining.is_empty() {
            continue;
        }

        let source_file = store
            .find_nodes_with_filter(NodeFilter { kind: Some(NodeKind::SourceFile), slug_id: Some(file_slug.clone()), ..Default::default() })
            .await?
            .into_iter()
            .next();

        let Some(source_file) = source_file else {
            tracing::warn!(file = %file_slug, "SourceFile node missing, marking its batch unresolvable");
            for link in &remaining {
                set_status(store, link.id, LinkStatus::Unresolvable, Some("source file node not found")).await?;
            }
            continue;
        };
        let NodeData::SourceFile(file_data) = &source_file.data else { continue };

        let source_code = match tokio::fs::read_to_string(&file_data.file_path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(file = %file_slug, error = %e, "could not read source file for tier 3, marking batch unresolvable");
                for link in &remaining {
                    set_status(store, link.id, LinkStatus::Unresolvable, Some(&format!("source unreadable: {e}"))).await?;
                }
                continue;
            }
        };

        let requests: Vec<LlmResolutionRequest> = remaining
            .iter()
            .filter_map(|link| match &link.data {
                NodeData::PendingLink(data) => Some(LlmResolutionRequest {
                    pending_link_id: link.slug_id.clone(),
                    target_expression: data.target_expression.clone(),
                    line_of_code: String::new(),
                    candidates: data.candidates.clone(),
                }),
                _ => None,
            })
            .collect();

        let outcome = async {
            let prompt = build_resolution_prompt(&source_code, &requests)?;
            let raw = llm.structured_complete(&prompt).await?;
            parse_resolution_response(&raw)
        }
        .await;

        match outcome {
            Ok(batch_response) => {
                let mut by_id: HashMap<String, Option<String>> = batch_response
                    .resolutions
                    .into_iter()
                    .map(|r| (r.pending_link_id, r.resolved_canonical_fqn))
                    .collect();

                for link in &remaining {
                    let NodeData::PendingLink(data) = &link.data else { continue };
                    match by_id.entry(link.slug_id.clone()) {
                        Entry::Occupied(entry) => match entry.remove() {
                            Some(fqn) => {
                                resolve_and_materialize(store, link.id, &data.calling_entity_slug, repo_key, &fqn).await?;
                                let key = fingerprint(&data.target_expression, &data.candidates, &file_language_key(&data.source_file_slug));
                                let cache_node = GraphNode::new(
                                    format!("cache:{key}"),
                                    NodeData::ResolutionCache(ResolutionCacheData { fingerprint: key, resolved_fqn: fqn }),
                                );
                                store.upsert_nodes(vec![cache_node]).await?;
                            }
                            None => {
                                set_status(store, link.id, LinkStatus::Unresolvable, Some("LLM determined it was unresolvable")).await?;
                            }
                        },
                        Entry::Vacant(_) => {
                            set_status(store, link.id, LinkStatus::Unresolvable, Some("LLM response omitted this link")).await?;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(file = %file_slug, error = %e, "tier 3 LLM batch failed, marking batch unresolvable");
                for link in &remaining {
                    set_status(store, link.id, LinkStatus::Unresolvable, Some(&format!("batch processing failed: {e}"))).await?;
                }
            }
        }
    }

    Ok(())
}

/// Best-effort language-key recovery from a `SourceFile` slug for the
/// cache fingerprint; the slug itself doesn't carry it, so this falls back
/// to the file extension.
fn file_language_key(source_file_slug: &str) -> String {
    source_file_slug.rsplit('.').next().unwrap_or("unknown").to_string()
}
