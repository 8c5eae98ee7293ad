//! The Language Parser contract: every supported language implements this
//! trait, emitting slice lines first, then entities/relationships/call-site
//! references in any interleaved order.

use async_trait::async_trait;
use canopy_core::{EntityType, RelationshipType};

/// A single defined code element found in a file. Carries a fully computed
/// FQN (see module docs in `languages::fqn`) rather than a bare name, since
/// FQN computation depends on the language's scope-nesting rules and must
/// happen inside the parser that understands them.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntity {
    pub entity_type: EntityType,
    pub name: String,
    pub fqn: String,
    pub source_snippet: String,
    /// 1-based, inclusive.
    pub start_line: u32,
    /// 1-based, inclusive.
    pub end_line: u32,
}

/// A directed relationship between two entities (or an entity and an
/// external reference) discovered directly from syntax: an `impl`, a
/// `use`/`import`, an `extends`/`implements` clause. Calls are modeled
/// separately as [`CallSiteReference`] because they need cross-file
/// resolution; these do not.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRelationship {
    pub rel_type: RelationshipType,
    /// FQN of the entity this relationship originates from.
    pub source_fqn: String,
    /// Raw target text (a module path, a base type name) — not yet resolved
    /// to a slug; the Orchestrator/Adapter resolve same-file targets and
    /// leave the rest as external references.
    pub target_text: String,
}

/// An unresolved call expression, consumed by the Orchestrator to create a
/// `PendingLink`. Not a graph node itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSiteReference {
    pub calling_entity_fqn: String,
    pub callee_expression: String,
    /// 0-indexed, as produced by the parser.
    pub line: u32,
    pub argument_text: String,
    pub argument_count: usize,
}

/// One piece of a parser's output stream. A parser always emits exactly one
/// `SliceLines` first; everything after may come in any order.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseEvent {
    SliceLines(Vec<usize>),
    Entity(ParsedEntity),
    Relationship(ParsedRelationship),
    CallSite(CallSiteReference),
}

/// Implemented once per supported language (plus the generic fallback).
/// `parse` bridges into the parser-pool's worker threads internally so
/// callers never have to think about tree-sitter's non-`Send` parser state.
#[async_trait]
pub trait LanguageParser: Send + Sync {
    fn language_key(&self) -> &'static str;
    async fn parse(&self, content: &str) -> anyhow::Result<Vec<ParseEvent>>;
}
