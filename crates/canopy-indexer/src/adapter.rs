//! Pure translation from one file's parser output into Graph Store writes.
//!
//! Takes the `ParseEvent` stream a [`crate::parser::LanguageParser`]
//! produces for a single file, plus that file's already-known slug, and
//! turns it into node upserts, edge tuples, and `PendingLink` nodes —
//! without touching the store itself. The Orchestrator calls this once per
//! file and batches the result together with that file's containment edges.

use std::collections::{HashMap, HashSet};

use canopy_core::{
    slug_to_uuid, CodeEntityData, EntityType, GraphEdge, GraphNode, LinkStatus, NodeData,
    PendingLinkData, RelationshipType, TextChunkData,
};
use uuid::Uuid;

use crate::chunker::{chunk, chunk_slug_suffix};
use crate::parser::ParseEvent;

/// Everything [`adapt_file_output`] produced for one file, ready to hand to
/// [`canopy_core::GraphStorePort::upsert_nodes`] /
/// [`canopy_core::GraphStorePort::upsert_edges`] as a single batch.
#[derive(Debug, Default)]
pub struct AdaptedFile {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Slug ids of every `CodeEntity` node just created, in emission order —
    /// exactly what the Orchestrator forwards to `notify_ingestion_activity`.
    pub entity_slugs: Vec<String>,
}

/// Adapts one file's parse events into a write batch. `file_slug` and
/// `repo_slug` are already known to the Orchestrator before parsing starts
/// (Discovery establishes file identity up front); this function only
/// resolves references *within* this file's own output.
pub fn adapt_file_output(repo_slug: &str, file_slug: &str, content: &str, events: Vec<ParseEvent>) -> AdaptedFile {
    let file_id = slug_to_uuid(file_slug);

    let mut slice_lines: Vec<usize> = Vec::new();
    let mut parsed_entities = Vec::new();
    let mut parsed_relationships = Vec::new();
    let mut parsed_calls = Vec::new();
    let mut saw_slice_lines = false;

    for event in events {
        match event {
            ParseEvent::SliceLines(lines) if !saw_slice_lines => {
                slice_lines = lines;
                saw_slice_lines = true;
            }
            ParseEvent::SliceLines(_) => {
                // A parser contract violation (more than one SliceLines
                // event); ignore anything after the first.
            }
            ParseEvent::Entity(entity) => parsed_entities.push(entity),
            ParseEvent::Relationship(rel) => parsed_relationships.push(rel),
            ParseEvent::CallSite(cs) => parsed_calls.push(cs),
        }
    }

    let mut out = AdaptedFile::default();
    let mut seen_slugs: HashSet<String> = HashSet::new();
    let mut seen_edges: HashSet<Uuid> = HashSet::new();

    // TextChunks, each CONTAINS_CHUNK from the file. Ranges are kept around
    // so CodeEntities below can be attributed to their owning chunk.
    let mut chunk_ranges: Vec<(u32, u32, Uuid)> = Vec::new();
    for text_chunk in chunk(content, &slice_lines) {
        let start_line = text_chunk.start_line;
        let end_line = text_chunk.end_line;
        let slug = format!("{file_slug}|{}", chunk_slug_suffix(&text_chunk));
        let node = GraphNode::new(slug, NodeData::TextChunk(text_chunk));
        push_edge(&mut out, &mut seen_edges, GraphEdge::new(file_id, node.id, RelationshipType::ContainsChunk, Default::default()));
        chunk_ranges.push((start_line, end_line, node.id));
        out.nodes.push(node);
    }

    // CodeEntities, each CONTAINS_ENTITY from its owning TextChunk (falling
    // back to the file if no chunk's range contains it — §3), plus an fqn ->
    // slug index other events in this same file can resolve against.
    // ExternalReference entities (one per include/import target) are
    // deduplicated within the file by giving them a slug independent of
    // their occurrence's line number.
    let mut fqn_to_slug: HashMap<String, String> = HashMap::new();
    let mut name_to_slug: HashMap<String, String> = HashMap::new();
    for entity in &parsed_entities {
        let slug = entity_slug(entity.entity_type, &entity.fqn, entity.start_line);
        fqn_to_slug.entry(entity.fqn.clone()).or_insert_with(|| slug.clone());
        name_to_slug.entry(entity.name.clone()).or_insert_with(|| slug.clone());

        if !seen_slugs.insert(slug.clone()) {
            continue;
        }

        let node = GraphNode::new(
            slug.clone(),
            NodeData::CodeEntity(CodeEntityData {
                entity_type: entity.entity_type,
                name: entity.name.clone(),
                fqn: entity.fqn.clone(),
                defined_in_file: file_slug.to_string(),
                source_snippet: entity.source_snippet.clone(),
                start_line: entity.start_line,
                end_line: entity.end_line,
            }),
        );
        out.entity_slugs.push(slug.clone());
        let owner = owning_chunk_id(&chunk_ranges, entity.start_line).unwrap_or(file_id);
        push_edge(&mut out, &mut seen_edges, GraphEdge::new(owner, node.id, RelationshipType::ContainsEntity, Default::default()));
        out.nodes.push(node);
    }

    // Syntax-declared relationships: only materialized if both endpoints
    // resolve within this same file's batch (§3.3 invariant 5); everything
    // else is an external reference and is dropped with a warning — except
    // IMPORTS targets, whose ExternalReference node is minted here if the
    // responsible parser didn't already emit one.
    for rel in parsed_relationships {
        let source_id = if rel.source_fqn.is_empty() {
            Some(file_id)
        } else {
            fqn_to_slug.get(&rel.source_fqn).map(|s| slug_to_uuid(s))
        };
        let Some(source_id) = source_id else {
            tracing::warn!(file = file_slug, source_fqn = %rel.source_fqn, "dropping relationship: source entity not in this file's batch");
            continue;
        };

        let target_slug = fqn_to_slug
            .get(&rel.target_text)
            .or_else(|| name_to_slug.get(&rel.target_text))
            .cloned();
        let target_id = if let Some(slug) = target_slug {
            slug_to_uuid(&slug)
        } else if rel.rel_type == RelationshipType::Imports {
            let slug = entity_slug(EntityType::ExternalReference, &rel.target_text, 0);
            let node_id = slug_to_uuid(&slug);
            if seen_slugs.insert(slug.clone()) {
                let node = GraphNode::new(
                    slug.clone(),
                    NodeData::CodeEntity(CodeEntityData {
                        entity_type: EntityType::ExternalReference,
                        name: rel.target_text.clone(),
                        fqn: rel.target_text.clone(),
                        defined_in_file: file_slug.to_string(),
                        source_snippet: rel.target_text.clone(),
                        start_line: 0,
                        end_line: 0,
                    }),
                );
                out.entity_slugs.push(slug.clone());
                push_edge(&mut out, &mut seen_edges, GraphEdge::new(file_id, node.id, RelationshipType::ContainsEntity, Default::default()));
                out.nodes.push(node);
            }
            fqn_to_slug.entry(rel.target_text.clone()).or_insert(slug);
            node_id
        } else {
            tracing::debug!(file = file_slug, target = %rel.target_text, rel_type = rel.rel_type.as_upper_str(), "dropping relationship: target not resolvable within this batch");
            continue;
        };
        push_edge(&mut out, &mut seen_edges, GraphEdge::new(source_id, target_id, rel.rel_type, Default::default()));
    }

    // CallSiteReferences become PendingLink nodes, one per CSR, status
    // PENDING_RESOLUTION — never materialized as edges directly.
    for (ordinal, cs) in parsed_calls.into_iter().enumerate() {
        let calling_entity_slug = if cs.calling_entity_fqn.is_empty() {
            file_slug.to_string()
        } else {
            fqn_to_slug.get(&cs.calling_entity_fqn).cloned().unwrap_or(cs.calling_entity_fqn.clone())
        };
        let slug = format!("pending:{file_slug}@{}:{}#{ordinal}", cs.line, cs.callee_expression);
        let node = GraphNode::new(
            slug,
            NodeData::PendingLink(PendingLinkData {
                status: LinkStatus::PendingResolution,
                repo_key: repo_slug.to_string(),
                calling_entity_slug,
                target_expression: cs.callee_expression,
                source_file_slug: file_slug.to_string(),
                line: cs.line,
                candidates: Vec::new(),
                awaited_fqn: None,
                reason: None,
            }),
        );
        out.nodes.push(node);
    }

    out
}

/// `ExternalReference` entities are deduplicated within a file by target
/// text alone — the same `#include`/import appearing on multiple lines must
/// still collapse to one node — so their slug ignores the occurrence's start
/// line. Every other entity keeps the standard `FQN@start_line` slug.
fn entity_slug(entity_type: EntityType, fqn: &str, start_line: u32) -> String {
    if entity_type == EntityType::ExternalReference {
        format!("external:{fqn}")
    } else {
        format!("{fqn}@{}", start_line.saturating_sub(1))
    }
}

/// Finds the TextChunk whose 1-based inclusive `[start_line, end_line]`
/// range contains `entity_start_line`, returning its node id. `None` if no
/// chunk contains it, so the caller can fall back to the file.
fn owning_chunk_id(chunk_ranges: &[(u32, u32, Uuid)], entity_start_line: u32) -> Option<Uuid> {
    chunk_ranges
        .iter()
        .find(|(start, end, _)| entity_start_line >= *start && entity_start_line <= *end)
        .map(|(_, _, id)| *id)
}

/// Pushes `edge` only if its (source, target, type)-derived id hasn't
/// already been added to this batch, so e.g. two `#include`s of the same
/// header collapse to one `IMPORTS` edge rather than two identical ones.
fn push_edge(out: &mut AdaptedFile, seen: &mut HashSet<Uuid>, edge: GraphEdge) {
    if seen.insert(edge.id) {
        out.edges.push(edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_core::{EntityType, NodeKind};
    use crate::parser::{CallSiteReference, ParsedEntity, ParsedRelationship};

    #[test]
    fn builds_chunks_entities_and_pending_links() {
        let events = vec![
            ParseEvent::SliceLines(vec![0]),
            ParseEvent::Entity(ParsedEntity {
                entity_type: EntityType::FunctionDefinition,
                name: "main".into(),
                fqn: "main()".into(),
                source_snippet: "fn main() {}".into(),
                start_line: 1,
                end_line: 1,
            }),
            ParseEvent::CallSite(CallSiteReference {
                calling_entity_fqn: "main()".into(),
                callee_expression: "helper".into(),
                line: 0,
                argument_text: "()".into(),
                argument_count: 0,
            }),
        ];

        let adapted = adapt_file_output("repo", "repo:src/main.rs", "fn main() {}", events);

        assert_eq!(adapted.entity_slugs, vec!["main()@0".to_string()]);
        assert!(adapted.nodes.iter().any(|n| matches!(n.data, NodeData::TextChunk(_))));
        assert!(adapted.nodes.iter().any(|n| n.kind() == NodeKind::CodeEntity));
        let pending = adapted
            .nodes
            .iter()
            .find(|n| n.kind() == NodeKind::PendingLink)
            .expect("pending link created");
        match &pending.data {
            NodeData::PendingLink(link) => {
                assert_eq!(link.calling_entity_slug, "main()@0");
                assert_eq!(link.target_expression, "helper");
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn mints_external_reference_for_unresolvable_import_target() {
        let events = vec![
            ParseEvent::SliceLines(vec![]),
            ParseEvent::Relationship(ParsedRelationship {
                rel_type: RelationshipType::Imports,
                source_fqn: String::new(),
                target_text: "some_external_module".into(),
            }),
        ];
        let adapted = adapt_file_output("repo", "repo:src/lib.rs", "x", events);

        let external_ref = adapted
            .nodes
            .iter()
            .find(|n| matches!(&n.data, NodeData::CodeEntity(e) if e.entity_type == EntityType::ExternalReference))
            .expect("an ExternalReference node was minted");
        match &external_ref.data {
            NodeData::CodeEntity(e) => assert_eq!(e.fqn, "some_external_module"),
            _ => unreachable!(),
        }

        assert!(adapted.edges.iter().any(|e| e.rel_type == RelationshipType::Imports && e.target == external_ref.id));
    }

    #[test]
    fn duplicate_import_of_the_same_target_collapses_to_one_node_and_edge() {
        let events = vec![
            ParseEvent::SliceLines(vec![]),
            ParseEvent::Relationship(ParsedRelationship {
                rel_type: RelationshipType::Imports,
                source_fqn: String::new(),
                target_text: "stdio.h".into(),
            }),
            ParseEvent::Relationship(ParsedRelationship {
                rel_type: RelationshipType::Imports,
                source_fqn: String::new(),
                target_text: "stdio.h".into(),
            }),
        ];
        let adapted = adapt_file_output("repo", "repo:src/main.c", "x", events);

        let external_refs: Vec<_> = adapted
            .nodes
            .iter()
            .filter(|n| matches!(&n.data, NodeData::CodeEntity(e) if e.entity_type == EntityType::ExternalReference))
            .collect();
        assert_eq!(external_refs.len(), 1);

        let import_edges: Vec<_> = adapted.edges.iter().filter(|e| e.rel_type == RelationshipType::Imports).collect();
        assert_eq!(import_edges.len(), 1);
    }

    #[test]
    fn nested_entity_still_gets_exactly_one_contains_entity_edge() {
        let events = vec![
            ParseEvent::SliceLines(vec![0]),
            ParseEvent::Entity(ParsedEntity {
                entity_type: EntityType::FunctionDefinition,
                name: "hello".into(),
                fqn: "Greeter::hello()".into(),
                source_snippet: "def hello(self): pass".into(),
                start_line: 1,
                end_line: 1,
            }),
        ];
        let adapted = adapt_file_output("repo", "repo:src/greeter.py", "def hello(self): pass", events);

        let contains_entity_edges: Vec<_> =
            adapted.edges.iter().filter(|e| e.rel_type == RelationshipType::ContainsEntity).collect();
        assert_eq!(contains_entity_edges.len(), 1);
    }
}
