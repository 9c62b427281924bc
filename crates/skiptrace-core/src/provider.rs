use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::error::ProviderError;

/// Handle to a checked-out working tree.
#[derive(Debug, Clone)]
pub struct WorkingTree {
    root: PathBuf,
}

impl WorkingTree {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Supplies a clean working tree for a project at a given revision.
pub trait SnapshotProvider: Send + Sync {
    /// Clone the project if it is not present locally, else open the
    /// existing checkout.
    fn acquire(&self, project: &str) -> Result<WorkingTree, ProviderError>;

    /// Force the tree into a clean state, then switch it to `revision`.
    ///
    /// A prior checkout may have left build artifacts behind; those are
    /// discarded before switching.
    fn checkout(&self, tree: &WorkingTree, revision: &str) -> Result<(), ProviderError>;
}

/// [`SnapshotProvider`] backed by the `git` binary.
pub struct GitSnapshotProvider {
    repos_dir: PathBuf,
    remote_base: String,
}

impl GitSnapshotProvider {
    pub fn new(repos_dir: PathBuf, remote_base: String) -> Self {
        Self {
            repos_dir,
            remote_base,
        }
    }

    fn repo_url(&self, project: &str) -> String {
        format!("{}{project}.git", self.remote_base)
    }

    fn repo_path(&self, project: &str) -> PathBuf {
        self.repos_dir.join(project.replace('/', "#"))
    }
}

impl SnapshotProvider for GitSnapshotProvider {
    fn acquire(&self, project: &str) -> Result<WorkingTree, ProviderError> {
        let path = self.repo_path(project);
        if path.join(".git").exists() {
            return Ok(WorkingTree::new(path));
        }

        std::fs::create_dir_all(&self.repos_dir)?;
        info!(project, "cloning repository");
        let url = self.repo_url(project);
        run_git(&self.repos_dir, &["clone", &url, &path.to_string_lossy()]).map_err(|detail| {
            ProviderError::Clone {
                project: project.to_string(),
                detail,
            }
        })?;
        Ok(WorkingTree::new(path))
    }

    fn checkout(&self, tree: &WorkingTree, revision: &str) -> Result<(), ProviderError> {
        run_git(tree.root(), &["clean", "-fd"])
            .map_err(|detail| ProviderError::Clean { detail })?;
        run_git(tree.root(), &["reset", "--hard"])
            .map_err(|detail| ProviderError::Clean { detail })?;
        run_git(tree.root(), &["checkout", revision]).map_err(|detail| {
            ProviderError::Checkout {
                revision: revision.to_string(),
                detail,
            }
        })
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<(), String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| format!("failed to run git: {e}"))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}
