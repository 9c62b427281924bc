use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use crate::types::{ClassRecord, MethodRecord};

/// Whether a build's method extraction has run, and how it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionOutcome {
    #[default]
    NotAttempted,
    Succeeded,
    Failed,
}

/// The extracted class/method fact set for one build at its trigger revision.
///
/// Populated exclusively during extraction and read-only afterwards. `Clone`
/// produces a full value copy of the entity graph (all data is owned), which
/// is what the cross-iteration snapshot cache relies on.
#[derive(Debug, Clone, Default)]
pub struct BuildSnapshot {
    methods_by_class: HashMap<ClassRecord, Vec<MethodRecord>>,
    outcome: ExtractionOutcome,
}

impl BuildSnapshot {
    pub fn completed(methods_by_class: HashMap<ClassRecord, Vec<MethodRecord>>) -> Self {
        Self {
            methods_by_class,
            outcome: ExtractionOutcome::Succeeded,
        }
    }

    pub fn failed() -> Self {
        Self {
            methods_by_class: HashMap::new(),
            outcome: ExtractionOutcome::Failed,
        }
    }

    pub fn outcome(&self) -> ExtractionOutcome {
        self.outcome
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == ExtractionOutcome::Succeeded
    }

    pub fn methods_by_class(&self) -> &HashMap<ClassRecord, Vec<MethodRecord>> {
        &self.methods_by_class
    }

    /// Union of all method lists.
    pub fn all_methods(&self) -> HashSet<&MethodRecord> {
        self.methods_by_class.values().flatten().collect()
    }

    /// Subset of [`all_methods`](Self::all_methods) classified as tests.
    pub fn test_methods(&self) -> HashSet<&MethodRecord> {
        self.methods_by_class
            .values()
            .flatten()
            .filter(|m| m.is_test.is_true())
            .collect()
    }
}

/// Class→methods index shared between extraction workers.
///
/// The lookup-create-or-append sequence is a single critical section; a
/// concurrent map alone would not make that compound operation atomic.
#[derive(Debug, Default)]
pub struct SharedMethodIndex {
    inner: Mutex<HashMap<ClassRecord, Vec<MethodRecord>>>,
}

impl SharedMethodIndex {
    pub fn record(&self, method: MethodRecord) {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(method.class.clone()).or_default().push(method);
    }

    pub fn into_map(self) -> HashMap<ClassRecord, Vec<MethodRecord>> {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
