//! Canopy Core — the typed graph data model, the in-memory graph, the
//! symbol table used for call-site resolution, and the Graph Store Port.

pub mod activity;
pub mod graph;
pub mod model;
pub mod store;
pub mod symbols;

#[cfg(test)]
pub mod test_utils;

pub use activity::{IngestionActivityNotifier, NoopActivityNotifier};
pub use graph::Graph;
pub use model::{
    edge_key_to_uuid, slug_to_uuid, CodeEntityData, EntityType, GraphEdge, GraphNode,
    HeartbeatData, HeartbeatStatus, LinkStatus, NodeData, NodeKind, PendingLinkData,
    RelationshipType, RepositoryData, ResolutionCacheData, SourceFileData, TextChunkData,
};
pub use store::{GraphStoreError, GraphStorePort, InMemoryGraphStore, NodeFilter, StoreResult};
pub use symbols::SymbolTable;
