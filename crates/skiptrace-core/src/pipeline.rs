use std::collections::HashMap;

use tracing::warn;

use crate::compare::{compare_pair, AnalysisRow};
use crate::error::RunError;
use crate::extract::ExtractionEngine;
use crate::sink::ResultSink;
use crate::snapshot::BuildSnapshot;
use crate::types::BuildRecord;

/// Counters for the run summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunTotals {
    pub pairs_compared: usize,
    pub unpaired_builds: usize,
    pub smell_rows: usize,
}

/// Walks a time-ordered build sequence pairwise and writes one analysis row
/// per build to the sinks.
///
/// Comparisons are strictly sequential; one pair is fully extracted, resolved
/// and compared before the next begins. Only the most recently extracted T2
/// snapshot is retained, and it is reused as the next pair's T1 only when its
/// build id matches the recorded predecessor id.
pub struct ComparisonPipeline {
    engine: ExtractionEngine,
}

impl ComparisonPipeline {
    pub fn new(engine: ExtractionEngine) -> Self {
        Self { engine }
    }

    pub fn compare_builds(
        &self,
        mut builds: Vec<BuildRecord>,
        all_results: &mut dyn ResultSink,
        smell_results: &mut dyn ResultSink,
    ) -> Result<RunTotals, RunError> {
        builds.sort_by(|a, b| a.key.cmp(&b.key).then(a.build_id.cmp(&b.build_id)));
        let by_id = index_by_build_id(&builds)?;

        let mut totals = RunTotals::default();
        let mut cached: Option<(i64, BuildSnapshot)> = None;

        for t2 in &builds {
            let t1 = t2
                .prev_build_id
                .and_then(|id| by_id.get(&id).copied())
                .filter(|t1| t1.key == t2.key);

            let Some(t1) = t1 else {
                warn!(build = %t2, "build does not have a previous build");
                let row = AnalysisRow::unpaired(t2);
                all_results.write(&row)?;
                all_results.flush()?;
                totals.unpaired_builds += 1;
                continue;
            };

            let snapshot_t1 = match cached.take() {
                Some((build_id, snapshot)) if build_id == t1.build_id => snapshot,
                _ => self.engine.snapshot_build(t1),
            };
            let snapshot_t2 = self.engine.snapshot_build(t2);

            let row = compare_pair(t1, &snapshot_t1, t2, &snapshot_t2);
            all_results.write(&row)?;
            all_results.flush()?;
            if row.is_smell() {
                smell_results.write(&row)?;
                smell_results.flush()?;
                totals.smell_rows += 1;
            }
            totals.pairs_compared += 1;

            cached = Some((t2.build_id, snapshot_t2));
        }

        Ok(totals)
    }
}

/// Build ids must be globally unique across the whole input.
fn index_by_build_id(builds: &[BuildRecord]) -> Result<HashMap<i64, &BuildRecord>, RunError> {
    let mut by_id = HashMap::with_capacity(builds.len());
    for build in builds {
        if by_id.insert(build.build_id, build).is_some() {
            return Err(RunError::DuplicateBuildId(build.build_id));
        }
    }
    Ok(by_id)
}
