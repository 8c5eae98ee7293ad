//! Thread-safe parser pool for tree-sitter parsers.
//!
//! Tree-sitter's `Parser` is not `Send`, so language parsers can't hold one
//! across an `.await`. This module runs a small pool of dedicated OS
//! threads, each owning its own `Parser`, and bridges requests from async
//! code via a channel plus `spawn_blocking`.

use anyhow::Result;
use tree_sitter::{Language, Parser};

/// The set of languages this crate parses with tree-sitter. The generic
/// fallback (`languages::generic`) never reaches this pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    C,
    Cpp,
}

impl FileKind {
    pub fn from_language_key(key: &str) -> Option<Self> {
        match key {
            "rust" => Some(FileKind::Rust),
            "python" => Some(FileKind::Python),
            "javascript" => Some(FileKind::JavaScript),
            "typescript" => Some(FileKind::TypeScript),
            "c" => Some(FileKind::C),
            "cpp" => Some(FileKind::Cpp),
            _ => None,
        }
    }

    fn grammar(self) -> Language {
        match self {
            FileKind::Rust => tree_sitter_rust::LANGUAGE.into(),
            FileKind::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            FileKind::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            FileKind::Python => tree_sitter_python::LANGUAGE.into(),
            FileKind::C => tree_sitter_c::LANGUAGE.into(),
            FileKind::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        }
    }
}

struct WorkerRequest {
    kind: FileKind,
    content: String,
    response: std::sync::mpsc::Sender<Result<tree_sitter::Tree>>,
}

/// A cheaply clonable handle to a pool of parser worker threads.
#[derive(Clone)]
pub struct ParserPool {
    sender: std::sync::mpsc::Sender<WorkerRequest>,
}

impl ParserPool {
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = std::sync::mpsc::channel::<WorkerRequest>();
        let receiver = std::sync::Arc::new(std::sync::Mutex::new(receiver));

        for worker_id in 0..num_workers.max(1) {
            let receiver = receiver.clone();
            std::thread::spawn(move || Self::worker_thread(worker_id, receiver));
        }

        ParserPool { sender }
    }

    fn worker_thread(
        worker_id: usize,
        receiver: std::sync::Arc<std::sync::Mutex<std::sync::mpsc::Receiver<WorkerRequest>>>,
    ) {
        tracing::debug!(worker_id, "parser worker started");
        let mut parser = Parser::new();

        loop {
            let request = match receiver.lock().unwrap().recv() {
                Ok(req) => req,
                Err(_) => break,
            };

            let result = (|| {
                parser
                    .set_language(&request.kind.grammar())
                    .map_err(|e| anyhow::anyhow!("failed to set tree-sitter language: {e}"))?;
                parser
                    .parse(&request.content, None)
                    .ok_or_else(|| anyhow::anyhow!("tree-sitter failed to produce a parse tree"))
            })();

            let _ = request.response.send(result);
        }
        tracing::debug!(worker_id, "parser worker shutting down");
    }

    /// Parses synchronously on the calling thread. Intended for non-async
    /// callers (tests, CLI one-shots); async code should use [`Self::parse`].
    pub fn parse_blocking(&self, kind: FileKind, content: String) -> Result<tree_sitter::Tree> {
        let (response, receiver) = std::sync::mpsc::channel();
        self.sender
            .send(WorkerRequest { kind, content, response })
            .map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;
        receiver.recv().map_err(|_| anyhow::anyhow!("parser worker died"))?
    }

    /// Parses `content` as `kind` on a pool worker thread, suspending the
    /// calling task without blocking the async runtime.
    pub async fn parse(&self, kind: FileKind, content: String) -> Result<tree_sitter::Tree> {
        let sender = self.sender.clone();
        tokio::task::spawn_blocking(move || {
            let (response, receiver) = std::sync::mpsc::channel();
            sender
                .send(WorkerRequest { kind, content, response })
                .map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;
            receiver.recv().map_err(|_| anyhow::anyhow!("parser worker died"))?
        })
        .await
        .map_err(|e| anyhow::anyhow!("parser worker task join error: {e}"))?
    }
}

/// Creates a pool sized to the available parallelism (minimum 2 workers).
pub fn create_parser_pool() -> ParserPool {
    let num_workers = std::thread::available_parallelism().map(|n| n.get().max(2)).unwrap_or(2);
    ParserPool::new(num_workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_rust_source() {
        let pool = create_parser_pool();
        let tree = pool.parse(FileKind::Rust, "fn main() {}".to_string()).await.unwrap();
        assert_eq!(tree.root_node().kind(), "source_file");
    }

    #[tokio::test]
    async fn parses_typescript_source() {
        let pool = create_parser_pool();
        let tree = pool
            .parse(FileKind::TypeScript, "class A { m() {} }".to_string())
            .await
            .unwrap();
        assert_eq!(tree.root_node().kind(), "program");
    }
}
