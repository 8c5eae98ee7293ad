//! Discovery, chunking, language parsing, and the Orchestrator that ties
//! them together into a full-repository ingestion run.

pub mod adapter;
pub mod chunker;
pub mod coordinator;
pub mod discovery;
pub mod languages;
pub mod parser;
pub mod parser_pool;

pub use coordinator::{Orchestrator, OrchestratorConfig, OrchestratorError};
pub use discovery::{DiscoveredFile, DiscoveryConfig, DiscoveryError};
