use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::analyzer::TestFileAnalyzer;
use crate::config::ExtractConfig;
use crate::provider::SnapshotProvider;
use crate::resolver::resolve_inherited_tests;
use crate::snapshot::{BuildSnapshot, SharedMethodIndex};
use crate::types::{BuildRecord, ClassRecord, MethodRecord};

/// Extracts one build's method facts from a checked-out working tree.
///
/// Candidate files are those whose path (relative to the tree root) contains
/// "test" in any casing and whose name carries one of the analyzer's
/// extensions. Files are parsed concurrently; the caller gets the snapshot
/// back only after every worker has finished.
pub struct ExtractionEngine {
    analyzer: Box<dyn TestFileAnalyzer>,
    provider: Box<dyn SnapshotProvider>,
    excludes: GlobSet,
    pool: Option<rayon::ThreadPool>,
}

impl ExtractionEngine {
    pub fn new(
        analyzer: Box<dyn TestFileAnalyzer>,
        provider: Box<dyn SnapshotProvider>,
        config: &ExtractConfig,
    ) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclude_patterns {
            let glob = Glob::new(pattern)
                .with_context(|| format!("invalid exclude pattern '{pattern}'"))?;
            builder.add(glob);
        }
        let excludes = builder.build().context("failed to build exclude set")?;

        let pool = if config.threads > 0 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.threads)
                    .build()
                    .context("failed to build extraction thread pool")?,
            )
        } else {
            None
        };

        Ok(Self {
            analyzer,
            provider,
            excludes,
            pool,
        })
    }

    /// Check out the build's trigger revision and extract its method facts.
    ///
    /// Never fails the run: provider and I/O errors are logged and produce a
    /// snapshot whose extraction outcome is failed.
    pub fn snapshot_build(&self, build: &BuildRecord) -> BuildSnapshot {
        info!(build = %build, "extracting methods");

        let tree = match self.provider.acquire(&build.key.project) {
            Ok(tree) => tree,
            Err(e) => {
                error!(build = %build, error = %e, "failed to acquire source snapshot");
                return BuildSnapshot::failed();
            }
        };

        if let Err(e) = self.provider.checkout(&tree, &build.trigger_commit) {
            error!(
                build = %build,
                revision = %build.trigger_commit,
                error = %e,
                "failed to check out trigger revision"
            );
            return BuildSnapshot::failed();
        }

        match self.extract_tree(tree.root()) {
            Ok(methods_by_class) => BuildSnapshot::completed(methods_by_class),
            Err(e) => {
                error!(build = %build, error = %e, "method extraction failed");
                BuildSnapshot::failed()
            }
        }
    }

    fn extract_tree(&self, root: &Path) -> io::Result<HashMap<ClassRecord, Vec<MethodRecord>>> {
        let files = self.candidate_files(root)?;
        let index = SharedMethodIndex::default();

        let analyzer = self.analyzer.as_ref();
        let index_ref = &index;
        let run = || {
            use rayon::prelude::*;
            files.par_iter().try_for_each(|path| -> io::Result<()> {
                let bytes = std::fs::read(path)?;
                let content = String::from_utf8_lossy(&bytes);
                match analyzer.extract_methods(path, &content) {
                    Ok(methods) => {
                        for method in methods {
                            index_ref.record(method);
                        }
                    }
                    Err(e) => {
                        // Some projects keep intentionally invalid source
                        // files as parser test fixtures; those must not fail
                        // the build's extraction.
                        warn!(file = %path.display(), error = %e, "could not parse file");
                    }
                }
                Ok(())
            })
        };

        match &self.pool {
            Some(pool) => pool.install(run)?,
            None => run()?,
        }

        let mut methods_by_class = index.into_map();
        resolve_inherited_tests(&mut methods_by_class);
        Ok(methods_by_class)
    }

    fn candidate_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if self.excludes.is_match(rel) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_lowercase();
            let matches_extension = self
                .analyzer
                .file_extensions()
                .iter()
                .any(|ext| name.ends_with(&format!(".{ext}")));
            if !matches_extension {
                continue;
            }
            if rel.to_string_lossy().to_lowercase().contains("test") {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}
