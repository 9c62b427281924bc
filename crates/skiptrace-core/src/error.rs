use thiserror::Error;

/// Validation failures when constructing entity records.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("project name and branch must not be empty")]
    EmptyProjectBranch,
    #[error("trigger commit must not be empty")]
    EmptyTriggerCommit,
}

/// Failures of the source snapshot provider. Fatal to a single build's
/// extraction, never to the whole run.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to clone repository for {project}: {detail}")]
    Clone { project: String, detail: String },
    #[error("failed to clean working tree: {detail}")]
    Clean { detail: String },
    #[error("failed to check out revision {revision}: {detail}")]
    Checkout { revision: String, detail: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fatal conditions that abort a comparison run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("build id {0} appears more than once in the input")]
    DuplicateBuildId(i64),
    #[error(transparent)]
    Sink(#[from] anyhow::Error),
}
