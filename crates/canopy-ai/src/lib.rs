//! The LLM Port used by Tier 3 of the Enrichment Engine, and the
//! fingerprinting helper for its resolution cache.

pub mod llm;
pub mod resolution_cache;

pub use llm::{HttpLlmProvider, LlmBatchResponse, LlmPort, LlmResolution, LlmResolutionRequest};
