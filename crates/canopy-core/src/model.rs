//! Core data structures for the ingested code graph.
//!
//! Every node carries a human-readable `slug_id` alongside its persisted
//! [`Uuid`]; the two always agree, since the id is derived from the slug
//! via [`slug_to_uuid`]. Re-deriving a slug for the same logical entity on a
//! later run reproduces the same id, which is what makes re-ingestion
//! idempotent.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed namespace all slug ids are hashed under. Any stable UUID works;
/// this one is itself derived from a constant string so the namespace is
/// reproducible without hand-transcribing a UUID literal.
static ID_NAMESPACE: LazyLock<Uuid> =
    LazyLock::new(|| Uuid::new_v5(&Uuid::NAMESPACE_URL, b"canopy-ingestion-namespace"));

/// Deterministically map a slug string onto a persisted node identifier.
pub fn slug_to_uuid(slug: &str) -> Uuid {
    Uuid::new_v5(&ID_NAMESPACE, slug.as_bytes())
}

/// Deterministically map a `(source, target, type)` edge key onto an edge id.
pub fn edge_key_to_uuid(source: Uuid, target: Uuid, rel_type: RelationshipType) -> Uuid {
    let key = format!("{source}|{target}|{}", rel_type.as_upper_str());
    slug_to_uuid(&key)
}

/// Discriminates which kind of node a [`GraphNode`] is, independent of the
/// payload carried in [`NodeData`]. Kept as its own field (rather than only
/// matching on `data`) so store filters can select by kind cheaply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Repository,
    SourceFile,
    TextChunk,
    CodeEntity,
    PendingLink,
    IngestionHeartbeat,
    ResolutionCache,
}

/// Closed set of `CodeEntity.type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    FunctionDefinition,
    FunctionDeclaration,
    ClassDefinition,
    StructDefinition,
    NamespaceDefinition,
    EnumDefinition,
    TraitDefinition,
    Implementation,
    ModuleDefinition,
    MacroDefinition,
    TypeAlias,
    NamespaceAliasDefinition,
    ExternalReference,
    UsingDirective,
}

/// Closed set of `Relationship.type` values. Always rendered upper-case on
/// the edge tuple, matching the original adapter's `p_rel.type.upper()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::enum_variant_names)]
pub enum RelationshipType {
    ContainsFile,
    ContainsChunk,
    ContainsEntity,
    Extends,
    Implements,
    Imports,
    HasDirective,
    ReferencesNamespace,
    Calls,
}

impl RelationshipType {
    pub fn as_upper_str(&self) -> &'static str {
        match self {
            RelationshipType::ContainsFile => "CONTAINS_FILE",
            RelationshipType::ContainsChunk => "CONTAINS_CHUNK",
            RelationshipType::ContainsEntity => "CONTAINS_ENTITY",
            RelationshipType::Extends => "EXTENDS",
            RelationshipType::Implements => "IMPLEMENTS",
            RelationshipType::Imports => "IMPORTS",
            RelationshipType::HasDirective => "HAS_DIRECTIVE",
            RelationshipType::ReferencesNamespace => "REFERENCES_NAMESPACE",
            RelationshipType::Calls => "CALLS",
        }
    }
}

/// Monotone lifecycle of a [`PendingLinkData`]. See SPEC_FULL.md §3.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkStatus {
    PendingResolution,
    ReadyForHeuristics,
    ReadyForLlm,
    AwaitingTarget,
    Unresolvable,
}

/// Status carried by an [`IngestionHeartbeat`] node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeartbeatStatus {
    Active,
    Enhancing,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryData {
    pub path: String,
    pub discovered_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFileData {
    pub name: String,
    pub file_path: String,
    pub relative_path: String,
    pub language_key: String,
    pub size_bytes: u64,
    pub discovered_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunkData {
    pub text: String,
    pub chunk_index: u32,
    /// 1-based, inclusive.
    pub start_line: u32,
    /// 1-based, inclusive.
    pub end_line: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEntityData {
    pub entity_type: EntityType,
    pub name: String,
    pub fqn: String,
    pub defined_in_file: String,
    pub source_snippet: String,
    /// 1-based, inclusive.
    pub start_line: u32,
    /// 1-based, inclusive.
    pub end_line: u32,
}

/// An in-flight record of a single unresolved call-site reference (CSR)
/// awaiting Tier 1/2/3 resolution. Not a CSR itself — the CSR is consumed
/// when the link is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingLinkData {
    pub status: LinkStatus,
    pub repo_key: String,
    pub calling_entity_slug: String,
    pub target_expression: String,
    pub source_file_slug: String,
    /// 0-indexed, as produced by the parser.
    pub line: u32,
    pub candidates: Vec<String>,
    /// Set once a Tier 2/3 decision names a target FQN, before that FQN is
    /// resolved to a concrete node.
    pub awaited_fqn: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatData {
    pub repo_key: String,
    pub last_activity_timestamp: chrono::DateTime<chrono::Utc>,
    pub status: HeartbeatStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionCacheData {
    pub fingerprint: String,
    pub resolved_fqn: String,
}

/// Typed payload of a [`GraphNode`], tagged by [`NodeKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeData {
    Repository(RepositoryData),
    SourceFile(SourceFileData),
    TextChunk(TextChunkData),
    CodeEntity(CodeEntityData),
    PendingLink(PendingLinkData),
    IngestionHeartbeat(HeartbeatData),
    ResolutionCache(ResolutionCacheData),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Repository(_) => NodeKind::Repository,
            NodeData::SourceFile(_) => NodeKind::SourceFile,
            NodeData::TextChunk(_) => NodeKind::TextChunk,
            NodeData::CodeEntity(_) => NodeKind::CodeEntity,
            NodeData::PendingLink(_) => NodeKind::PendingLink,
            NodeData::IngestionHeartbeat(_) => NodeKind::IngestionHeartbeat,
            NodeData::ResolutionCache(_) => NodeKind::ResolutionCache,
        }
    }
}

/// A single node in the code graph, keyed by a deterministic [`Uuid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: Uuid,
    pub slug_id: String,
    pub data: NodeData,
}

impl GraphNode {
    pub fn new(slug_id: impl Into<String>, data: NodeData) -> Self {
        let slug_id = slug_id.into();
        GraphNode {
            id: slug_to_uuid(&slug_id),
            slug_id,
            data,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }
}

/// A directed, typed edge between two nodes, keyed by `(source, target, type)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: Uuid,
    pub source: Uuid,
    pub target: Uuid,
    pub rel_type: RelationshipType,
    pub properties: HashMap<String, serde_json::Value>,
}

impl GraphEdge {
    pub fn new(
        source: Uuid,
        target: Uuid,
        rel_type: RelationshipType,
        properties: HashMap<String, serde_json::Value>,
    ) -> Self {
        GraphEdge {
            id: edge_key_to_uuid(source, target, rel_type),
            source,
            target,
            rel_type,
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_to_uuid_is_deterministic() {
        let a = slug_to_uuid("repo:src/main.rs");
        let b = slug_to_uuid("repo:src/main.rs");
        assert_eq!(a, b);
    }

    #[test]
    fn different_slugs_produce_different_ids() {
        let a = slug_to_uuid("repo:src/main.rs");
        let b = slug_to_uuid("repo:src/lib.rs");
        assert_ne!(a, b);
    }

    #[test]
    fn relationship_type_renders_upper_case() {
        assert_eq!(RelationshipType::ContainsFile.as_upper_str(), "CONTAINS_FILE");
        assert_eq!(RelationshipType::Calls.as_upper_str(), "CALLS");
    }

    #[test]
    fn graph_node_id_matches_slug() {
        let node = GraphNode::new(
            "repo:src/main.rs",
            NodeData::SourceFile(SourceFileData {
                name: "main.rs".into(),
                file_path: "/abs/src/main.rs".into(),
                relative_path: "src/main.rs".into(),
                language_key: "rust".into(),
                size_bytes: 42,
                discovered_at: chrono::Utc::now(),
            }),
        );
        assert_eq!(node.id, slug_to_uuid("repo:src/main.rs"));
        assert_eq!(node.kind(), NodeKind::SourceFile);
    }
}
