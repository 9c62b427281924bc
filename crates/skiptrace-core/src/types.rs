use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::ModelError;

/// Explicit unknown/true/false flag carried through every extraction stage.
///
/// Flags start out `Unknown` and are only promoted to `True`/`False` once the
/// corresponding fact has actually been observed in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriState {
    #[default]
    Unknown,
    True,
    False,
}

impl TriState {
    /// `true` only for `True`; `Unknown` counts as not established.
    pub fn is_true(self) -> bool {
        matches!(self, TriState::True)
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value {
            TriState::True
        } else {
            TriState::False
        }
    }
}

/// Identity of a project/branch combination. Displays as `project#branch`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectBranch {
    pub project: String,
    pub branch: String,
}

impl ProjectBranch {
    pub fn new(project: &str, branch: &str) -> Result<Self, ModelError> {
        if project.is_empty() || branch.is_empty() {
            return Err(ModelError::EmptyProjectBranch);
        }
        Ok(Self {
            project: project.to_string(),
            branch: branch.to_string(),
        })
    }
}

impl fmt::Display for ProjectBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.project, self.branch)
    }
}

/// A class as recorded during extraction.
///
/// The parent class name is the superclass identifier exactly as written in
/// source, unqualified and unresolved. Equality and hashing consider the
/// qualified name only.
#[derive(Debug, Clone)]
pub struct ClassRecord {
    pub qualified_name: String,
    pub simple_name: Option<String>,
    pub parent_class: Option<String>,
}

impl ClassRecord {
    pub fn new(qualified_name: String, simple_name: Option<String>) -> Self {
        Self {
            qualified_name,
            simple_name,
            parent_class: None,
        }
    }
}

impl PartialEq for ClassRecord {
    fn eq(&self, other: &Self) -> bool {
        self.qualified_name == other.qualified_name
    }
}

impl Eq for ClassRecord {}

impl Hash for ClassRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.qualified_name.hash(state);
    }
}

impl fmt::Display for ClassRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name)
    }
}

/// A method fact extracted from one source file.
///
/// The qualified name is the owning class's qualified name joined with the
/// signature text. Two records with equal qualified names are the same entity
/// regardless of their flags.
#[derive(Debug, Clone)]
pub struct MethodRecord {
    pub qualified_name: String,
    pub signature: String,
    pub class: ClassRecord,
    pub is_test: TriState,
    pub is_override: TriState,
    pub is_abstract: TriState,
}

impl MethodRecord {
    pub fn new(class: ClassRecord, signature: String) -> Self {
        let qualified_name = format!("{}.{}", class.qualified_name, signature);
        Self {
            qualified_name,
            signature,
            class,
            is_test: TriState::Unknown,
            is_override: TriState::Unknown,
            is_abstract: TriState::Unknown,
        }
    }
}

impl PartialEq for MethodRecord {
    fn eq(&self, other: &Self) -> bool {
        self.qualified_name == other.qualified_name
    }
}

impl Eq for MethodRecord {}

impl Hash for MethodRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.qualified_name.hash(state);
    }
}

impl fmt::Display for MethodRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name)
    }
}

/// One build/job row from the input data.
///
/// Required fields are taken by [`BuildRecord::new`] and validated there;
/// everything else defaults to absent and is filled in afterwards.
#[derive(Debug, Clone)]
pub struct BuildRecord {
    pub key: ProjectBranch,
    pub build_id: i64,
    pub job_id: i64,
    pub trigger_commit: String,
    pub prev_build_id: Option<i64>,
    pub status: Option<String>,
    pub tests_run: Option<i64>,
    pub tests_ok: Option<i64>,
    pub tests_failed: Option<i64>,
    pub tests_skipped: Option<i64>,
    pub failed_tests: Vec<String>,
}

impl BuildRecord {
    pub fn new(
        project: &str,
        branch: &str,
        build_id: i64,
        job_id: i64,
        trigger_commit: &str,
    ) -> Result<Self, ModelError> {
        if trigger_commit.is_empty() {
            return Err(ModelError::EmptyTriggerCommit);
        }
        Ok(Self {
            key: ProjectBranch::new(project, branch)?,
            build_id,
            job_id,
            trigger_commit: trigger_commit.to_string(),
            prev_build_id: None,
            status: None,
            tests_run: None,
            tests_ok: None,
            tests_failed: None,
            tests_skipped: None,
            failed_tests: Vec::new(),
        })
    }
}

impl fmt::Display for BuildRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.key, self.build_id)
    }
}
