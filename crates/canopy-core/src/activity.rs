//! The seam between the Orchestrator and the Dispatcher. Kept in this crate
//! (rather than having `canopy-indexer` depend on `canopy-watcher` directly)
//! so the ingestion pipeline and the enrichment pipeline can be wired
//! together by the binary without a circular crate dependency.

use async_trait::async_trait;

/// Called once per file, after all of that file's `CodeEntity` nodes have
/// been written to the store. `new_entity_slugs` are the slug ids of the
/// entities just created, scoped to `repo_key`.
#[async_trait]
pub trait IngestionActivityNotifier: Send + Sync {
    async fn notify_ingestion_activity(&self, repo_key: &str, new_entity_slugs: Vec<String>);
}

/// A notifier that does nothing. Useful for orchestrator runs that don't
/// wire up a dispatcher (one-shot indexing without enrichment, tests).
pub struct NoopActivityNotifier;

#[async_trait]
impl IngestionActivityNotifier for NoopActivityNotifier {
    async fn notify_ingestion_activity(&self, _repo_key: &str, _new_entity_slugs: Vec<String>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_notifier_accepts_any_input() {
        let notifier = NoopActivityNotifier;
        notifier.notify_ingestion_activity("repo", vec!["a".into(), "b".into()]).await;
    }
}
