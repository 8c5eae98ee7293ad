//! Repository directory walk and source-language classification.
//!
//! Shaped after the ignore-then-classify pass of the original discovery
//! script, but fails fast: an invalid root is a hard error here, not a
//! logged empty result.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("repository root does not exist: {0}")]
    RootNotFound(PathBuf),
    #[error("repository root is not a directory: {0}")]
    RootNotADirectory(PathBuf),
    #[error("failed to read directory {0}: {1}")]
    ReadDir(PathBuf, #[source] std::io::Error),
    #[error("could not compute a relative path for {0}")]
    NotRelative(PathBuf),
}

/// One discovered source file, ready for the Orchestrator to turn into a
/// `SourceFile` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub absolute_path: PathBuf,
    pub relative_path: PathBuf,
    pub language_key: String,
}

/// Ignore rules and language classification table. `Default` reproduces
/// this project's baseline set; callers may extend it with their own
/// ignored directories, files, or supported extensions.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    ignored_dir_names: GlobSet,
    ignored_dir_path_prefixes: Vec<String>,
    exact_ignored_files: HashSet<String>,
    ignored_file_globs: GlobSet,
    /// Bare file names with no dot, e.g. `"dockerfile" -> "dockerfile"`.
    supported_bare_names: HashMap<String, String>,
    /// Dotted extensions, e.g. `".rs" -> "rust"`.
    supported_extensions: HashMap<String, String>,
}

impl DiscoveryConfig {
    pub fn builder() -> DiscoveryConfigBuilder {
        DiscoveryConfigBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct DiscoveryConfigBuilder {
    ignored_dirs: Vec<String>,
    ignored_files: Vec<String>,
    extensions: Vec<(String, String)>,
}

impl DiscoveryConfigBuilder {
    pub fn ignore_dir(mut self, pattern: impl Into<String>) -> Self {
        self.ignored_dirs.push(pattern.into());
        self
    }

    pub fn ignore_file(mut self, pattern: impl Into<String>) -> Self {
        self.ignored_files.push(pattern.into());
        self
    }

    pub fn language(mut self, key: impl Into<String>, language: impl Into<String>) -> Self {
        self.extensions.push((key.into(), language.into()));
        self
    }

    pub fn build(self) -> DiscoveryConfig {
        let mut dir_name_builder = GlobSetBuilder::new();
        let mut ignored_dir_path_prefixes = Vec::new();
        for pattern in &self.ignored_dirs {
            if let Ok(glob) = Glob::new(pattern) {
                dir_name_builder.add(glob);
            }
            if pattern.contains('/') {
                ignored_dir_path_prefixes.push(pattern.replace('\\', "/"));
            }
        }

        let mut exact_ignored_files = HashSet::new();
        let mut file_glob_builder = GlobSetBuilder::new();
        for pattern in &self.ignored_files {
            if pattern.contains(['*', '?', '[']) {
                if let Ok(glob) = Glob::new(pattern) {
                    file_glob_builder.add(glob);
                }
            } else {
                exact_ignored_files.insert(pattern.clone());
            }
        }

        let mut supported_bare_names = HashMap::new();
        let mut supported_extensions = HashMap::new();
        for (key, language) in &self.extensions {
            if key.starts_with('.') {
                supported_extensions.insert(key.to_ascii_lowercase(), language.clone());
            } else {
                supported_bare_names.insert(key.to_ascii_lowercase(), language.clone());
            }
        }

        DiscoveryConfig {
            ignored_dir_names: dir_name_builder.build().expect("ignore-dir globs compile"),
            ignored_dir_path_prefixes,
            exact_ignored_files,
            ignored_file_globs: file_glob_builder.build().expect("ignore-file globs compile"),
            supported_bare_names,
            supported_extensions,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let mut builder = DiscoveryConfig::builder();
        for dir in [
            ".git",
            "__pycache__",
            "node_modules",
            "dist",
            "build",
            "venv",
            ".venv",
            "target",
            ".next",
            ".vscode",
            ".idea",
            "coverage",
            "logs",
            "tmp",
            "temp",
            ".ruff_cache",
            ".mypy_cache",
        ] {
            builder = builder.ignore_dir(dir);
        }
        for file in [
            ".DS_Store",
            "*.pyc",
            "*.pyo",
            "*.pyd",
            "*.so",
            "*.dll",
            "*.o",
            "*.a",
            "*.swp",
            "*.swo",
            "*.log",
            "package-lock.json",
            "yarn.lock",
            "pnpm-lock.yaml",
            "poetry.lock",
            "uv.lock",
            "Cargo.lock",
        ] {
            builder = builder.ignore_file(file);
        }
        for (ext, lang) in [
            (".rs", "rust"),
            (".py", "python"),
            (".js", "javascript"),
            (".jsx", "javascript"),
            (".ts", "typescript"),
            (".tsx", "typescript"),
            (".c", "c"),
            (".h", "c"),
            (".cpp", "cpp"),
            (".cc", "cpp"),
            (".hpp", "cpp"),
            (".css", "css"),
            (".md", "markdown"),
            (".mdx", "markdown"),
            (".yaml", "yaml"),
            (".yml", "yaml"),
            (".toml", "toml"),
        ] {
            builder = builder.language(ext, lang);
        }
        builder = builder.language("Dockerfile", "dockerfile");
        builder.build()
    }
}

impl DiscoveryConfig {
    fn is_dir_ignored(&self, dir_name: &str, relative_path: &str) -> bool {
        if self.ignored_dir_names.is_match(dir_name) {
            return true;
        }
        self.ignored_dir_path_prefixes.iter().any(|prefix| {
            relative_path == prefix || relative_path.starts_with(&format!("{prefix}/"))
        })
    }

    fn is_file_ignored(&self, file_name: &str) -> bool {
        self.exact_ignored_files.contains(file_name) || self.ignored_file_globs.is_match(file_name)
    }

    /// Bare-name match first, then dotted-extension match — a file matching
    /// neither is not a source file at all.
    fn classify(&self, file_name: &str) -> Option<String> {
        let lower = file_name.to_ascii_lowercase();
        if !lower.contains('.') && !lower.starts_with('.') {
            if let Some(lang) = self.supported_bare_names.get(&lower) {
                return Some(lang.clone());
            }
        }
        let ext = Path::new(&lower).extension().and_then(|e| e.to_str())?;
        self.supported_extensions.get(&format!(".{ext}")).cloned()
    }
}

/// Walks `root`, applying `config`'s ignore rules, and returns every
/// recognized source file found. Yields control between files so a
/// bounded-concurrency caller can interleave other I/O on the same task.
pub async fn discover_files(
    root: &Path,
    config: &DiscoveryConfig,
) -> Result<Vec<DiscoveredFile>, DiscoveryError> {
    let root = root
        .canonicalize()
        .map_err(|_| DiscoveryError::RootNotFound(root.to_path_buf()))?;
    if !root.is_dir() {
        return Err(DiscoveryError::RootNotADirectory(root));
    }

    let mut found = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(dir) = stack.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| DiscoveryError::ReadDir(dir.clone(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| DiscoveryError::ReadDir(dir.clone(), e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| DiscoveryError::ReadDir(dir.clone(), e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();

            if file_type.is_dir() {
                let relative = path
                    .strip_prefix(&root)
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                if config.is_dir_ignored(&name, &relative) {
                    continue;
                }
                stack.push(path);
                continue;
            }

            if !file_type.is_file() || config.is_file_ignored(&name) {
                continue;
            }

            let Some(language_key) = config.classify(&name) else {
                continue;
            };

            let relative_path = path
                .strip_prefix(&root)
                .map(|p| p.to_path_buf())
                .map_err(|_| DiscoveryError::NotRelative(path.clone()))?;

            found.push(DiscoveredFile {
                absolute_path: path,
                relative_path,
                language_key,
            });
            tokio::task::yield_now().await;
        }
    }

    found.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn discovers_recognized_files_and_skips_ignored_dirs() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "x").unwrap();
        fs::write(dir.path().join("README.md"), "# hi").unwrap();
        fs::write(dir.path().join("Cargo.lock"), "").unwrap();

        let config = DiscoveryConfig::default();
        let found = discover_files(dir.path(), &config).await.unwrap();

        let relatives: Vec<_> = found
            .iter()
            .map(|f| f.relative_path.to_string_lossy().replace('\\', "/"))
            .collect();
        assert!(relatives.contains(&"src/main.rs".to_string()));
        assert!(relatives.contains(&"README.md".to_string()));
        assert!(!relatives.iter().any(|p| p.contains("node_modules")));
        assert!(!relatives.contains(&"Cargo.lock".to_string()));
    }

    #[tokio::test]
    async fn errors_on_missing_root() {
        let result = discover_files(Path::new("/no/such/path/exists"), &DiscoveryConfig::default()).await;
        assert!(matches!(result, Err(DiscoveryError::RootNotFound(_))));
    }

    #[tokio::test]
    async fn errors_when_root_is_a_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("just_a_file");
        fs::write(&file_path, "x").unwrap();

        let result = discover_files(&file_path, &DiscoveryConfig::default()).await;
        assert!(matches!(result, Err(DiscoveryError::RootNotADirectory(_))));
    }

    #[test]
    fn classifies_bare_names_before_extensions() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.classify("Dockerfile"), Some("dockerfile".to_string()));
        assert_eq!(config.classify("main.rs"), Some("rust".to_string()));
        assert_eq!(config.classify("README"), None);
    }
}
