use std::path::Path;

use anyhow::Result;

use crate::types::MethodRecord;

/// Trait implemented by each language's test-file analyzer.
///
/// An `Err` from [`extract_methods`](Self::extract_methods) means the file
/// could not be parsed; callers log it and skip the file without failing the
/// build's extraction.
pub trait TestFileAnalyzer: Send + Sync {
    /// Language name (e.g., "java")
    fn language(&self) -> &'static str;

    /// File extensions this analyzer handles (e.g., &["java"])
    fn file_extensions(&self) -> &[&str];

    /// Parse one source file and return every method declaration found in it.
    fn extract_methods(&self, path: &Path, content: &str) -> Result<Vec<MethodRecord>>;
}
