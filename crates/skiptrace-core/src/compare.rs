use std::collections::HashSet;

use crate::snapshot::BuildSnapshot;
use crate::types::{BuildRecord, MethodRecord};

/// `y - x`, absent if either operand is absent. No partial arithmetic.
pub fn delta(x: Option<i64>, y: Option<i64>) -> Option<i64> {
    Some(y? - x?)
}

/// A test method present in one build but missing from the other's test set,
/// with whether it is still declared there at all (demoted vs fully removed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTest {
    pub qualified_name: String,
    pub still_declared: bool,
}

/// The comparison output for one (T1, T2) pair, in output column order.
///
/// T2-side identity fields are always present; everything derived is absent
/// when it could not be computed. Method-name lists are `#`-joined and empty
/// (not absent) when nothing is missing.
#[derive(Debug, Clone)]
pub struct AnalysisRow {
    pub project: String,
    pub branch_t1: Option<String>,
    pub branch_t2: String,
    pub build_id_t1: Option<i64>,
    pub build_id_t2: i64,
    pub trigger_commit_t1: Option<String>,
    pub trigger_commit_t2: String,
    pub tests_extracted_t1: Option<i64>,
    pub tests_extracted_t2: Option<i64>,
    pub delta_run_vs_extracted_t1: Option<i64>,
    pub delta_run_vs_extracted_t2: Option<i64>,
    pub tests_missing_from_t1: Option<i64>,
    pub tests_missing_from_t2: Option<i64>,
    pub missing_test_names_t2: Option<String>,
    pub delta_tests_run: Option<i64>,
    pub delta_tests_ok: Option<i64>,
    pub delta_tests_failed: Option<i64>,
    pub delta_tests_skipped: Option<i64>,
    pub legacy_smell_warning: Option<bool>,
    pub failed_tests_not_extracted: Option<i64>,
    pub removed_failed_test_count: Option<i64>,
    pub removed_failed_tests: Option<String>,
    pub analysis_ok: bool,
}

impl AnalysisRow {
    /// Minimal record for a build whose predecessor could not be located.
    pub fn unpaired(t2: &BuildRecord) -> Self {
        Self {
            project: t2.key.project.clone(),
            branch_t1: None,
            branch_t2: t2.key.branch.clone(),
            build_id_t1: None,
            build_id_t2: t2.build_id,
            trigger_commit_t1: None,
            trigger_commit_t2: t2.trigger_commit.clone(),
            tests_extracted_t1: None,
            tests_extracted_t2: None,
            delta_run_vs_extracted_t1: None,
            delta_run_vs_extracted_t2: None,
            tests_missing_from_t1: None,
            tests_missing_from_t2: None,
            missing_test_names_t2: None,
            delta_tests_run: None,
            delta_tests_ok: None,
            delta_tests_failed: None,
            delta_tests_skipped: None,
            legacy_smell_warning: None,
            failed_tests_not_extracted: None,
            removed_failed_test_count: None,
            removed_failed_tests: None,
            analysis_ok: false,
        }
    }

    /// Whether this row belongs in the smell results as well.
    pub fn is_smell(&self) -> bool {
        self.analysis_ok
            && (self.legacy_smell_warning == Some(true)
                || self.removed_failed_test_count.is_some_and(|n| n >= 1))
    }
}

/// Diff two extracted builds plus their externally reported counters into one
/// analysis record.
pub fn compare_pair(
    t1: &BuildRecord,
    snapshot_t1: &BuildSnapshot,
    t2: &BuildRecord,
    snapshot_t2: &BuildSnapshot,
) -> AnalysisRow {
    let all_t1 = snapshot_t1.all_methods();
    let all_t2 = snapshot_t2.all_methods();
    let tests_t1 = snapshot_t1.test_methods();
    let tests_t2 = snapshot_t2.test_methods();

    let missing_from_t1 = missing_tests(&tests_t2, &tests_t1, &all_t1);
    let missing_from_t2 = missing_tests(&tests_t1, &tests_t2, &all_t2);

    let delta_tests_run = delta(t1.tests_run, t2.tests_run);
    let delta_tests_failed = delta(t1.tests_failed, t2.tests_failed);
    let delta_tests_skipped = delta(t1.tests_skipped, t2.tests_skipped);

    let removed_failed = removed_failed_tests(&t1.failed_tests, &missing_from_t2);

    AnalysisRow {
        project: t2.key.project.clone(),
        branch_t1: Some(t1.key.branch.clone()),
        branch_t2: t2.key.branch.clone(),
        build_id_t1: Some(t1.build_id),
        build_id_t2: t2.build_id,
        trigger_commit_t1: Some(t1.trigger_commit.clone()),
        trigger_commit_t2: t2.trigger_commit.clone(),
        tests_extracted_t1: Some(tests_t1.len() as i64),
        tests_extracted_t2: Some(tests_t2.len() as i64),
        delta_run_vs_extracted_t1: delta(t1.tests_run, Some(tests_t1.len() as i64)),
        delta_run_vs_extracted_t2: delta(t2.tests_run, Some(tests_t2.len() as i64)),
        tests_missing_from_t1: Some(missing_from_t1.len() as i64),
        tests_missing_from_t2: Some(missing_from_t2.len() as i64),
        missing_test_names_t2: Some(join_names(
            missing_from_t2.iter().map(|m| m.qualified_name.as_str()),
        )),
        delta_tests_run,
        delta_tests_ok: delta(t1.tests_ok, t2.tests_ok),
        delta_tests_failed,
        delta_tests_skipped,
        legacy_smell_warning: legacy_smell_warning(
            t1.status.as_deref(),
            delta_tests_run,
            delta_tests_failed,
            delta_tests_skipped,
        ),
        failed_tests_not_extracted: Some(failed_tests_not_extracted(&t1.failed_tests, &tests_t1)),
        removed_failed_test_count: Some(removed_failed.len() as i64),
        removed_failed_tests: Some(join_names(removed_failed.iter().map(String::as_str))),
        analysis_ok: snapshot_t1.succeeded() && snapshot_t2.succeeded(),
    }
}

/// Test methods in A missing from B's test set, each flagged with whether it
/// is still declared among B's methods at all. Sorted for stable output.
fn missing_tests(
    tests_a: &HashSet<&MethodRecord>,
    tests_b: &HashSet<&MethodRecord>,
    all_b: &HashSet<&MethodRecord>,
) -> Vec<MissingTest> {
    let mut missing: Vec<MissingTest> = tests_a
        .iter()
        .filter(|m| !tests_b.contains(*m))
        .map(|m| MissingTest {
            qualified_name: m.qualified_name.clone(),
            still_declared: all_b.contains(*m),
        })
        .collect();
    missing.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
    missing
}

/// The coarse counter-based heuristic retained for comparability with older
/// tooling. Absent when any required input is absent.
fn legacy_smell_warning(
    status_t1: Option<&str>,
    delta_tests_run: Option<i64>,
    delta_tests_failed: Option<i64>,
    delta_tests_skipped: Option<i64>,
) -> Option<bool> {
    let status = status_t1?;
    let run = delta_tests_run?;
    let failed = delta_tests_failed?;
    let skipped = delta_tests_skipped?;

    let t1_passed = status.eq_ignore_ascii_case("passed");
    let skipped_test_methods = failed < 0 && (run < 0 || skipped > 0);
    Some(!t1_passed && skipped_test_methods)
}

/// Externally reported failure fragments that match no extracted test method.
fn failed_tests_not_extracted(fragments: &[String], tests: &HashSet<&MethodRecord>) -> i64 {
    fragments
        .iter()
        .filter(|fragment| !tests.iter().any(|m| m.qualified_name.contains(*fragment)))
        .count() as i64
}

/// Qualified names of vanished test methods matching a failure fragment.
fn removed_failed_tests(fragments: &[String], missing_from_t2: &[MissingTest]) -> Vec<String> {
    if fragments.is_empty() {
        return Vec::new();
    }
    missing_from_t2
        .iter()
        .filter(|m| fragments.iter().any(|f| m.qualified_name.contains(f)))
        .map(|m| m.qualified_name.clone())
        .collect()
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join("#")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassRecord, TriState};
    use std::collections::HashMap;

    fn method(class: &str, signature: &str, is_test: bool) -> MethodRecord {
        let class = ClassRecord::new(class.to_string(), None);
        let mut m = MethodRecord::new(class, signature.to_string());
        m.is_test = TriState::from(is_test);
        m
    }

    fn snapshot(methods: Vec<MethodRecord>) -> BuildSnapshot {
        let mut map: HashMap<ClassRecord, Vec<MethodRecord>> = HashMap::new();
        for m in methods {
            map.entry(m.class.clone()).or_default().push(m);
        }
        BuildSnapshot::completed(map)
    }

    fn build(id: i64, prev: Option<i64>) -> BuildRecord {
        let mut b = BuildRecord::new("acme/widget", "master", id, id * 10, "abc").unwrap();
        b.prev_build_id = prev;
        b
    }

    #[test]
    fn test_delta_requires_both_operands() {
        assert_eq!(delta(Some(2), Some(5)), Some(3));
        assert_eq!(delta(Some(5), Some(2)), Some(-3));
        assert_eq!(delta(None, Some(5)), None);
        assert_eq!(delta(Some(5), None), None);
        assert_eq!(delta(None, None), None);
    }

    #[test]
    fn test_identical_builds_yield_zero_deltas_and_empty_lists() {
        let methods = vec![
            method("com.acme.FooTest", "testAlpha()", true),
            method("com.acme.FooTest", "helper()", false),
        ];
        let mut t1 = build(1, None);
        t1.tests_run = Some(1);
        t1.tests_ok = Some(1);
        t1.tests_failed = Some(0);
        t1.tests_skipped = Some(0);
        let mut t2 = build(2, Some(1));
        t2.tests_run = Some(1);
        t2.tests_ok = Some(1);
        t2.tests_failed = Some(0);
        t2.tests_skipped = Some(0);

        let row = compare_pair(&t1, &snapshot(methods.clone()), &t2, &snapshot(methods));

        assert!(row.analysis_ok);
        assert_eq!(row.delta_tests_run, Some(0));
        assert_eq!(row.delta_tests_ok, Some(0));
        assert_eq!(row.delta_tests_failed, Some(0));
        assert_eq!(row.delta_tests_skipped, Some(0));
        assert_eq!(row.tests_missing_from_t1, Some(0));
        assert_eq!(row.tests_missing_from_t2, Some(0));
        assert_eq!(row.missing_test_names_t2.as_deref(), Some(""));
        assert_eq!(row.removed_failed_test_count, Some(0));
        assert_eq!(row.removed_failed_tests.as_deref(), Some(""));
        assert_eq!(row.tests_extracted_t1, Some(1));
        assert_eq!(row.delta_run_vs_extracted_t1, Some(0));
    }

    #[test]
    fn test_removed_failed_test_matches_fragment() {
        let mut t1 = build(1, None);
        t1.failed_tests = vec!["testBaz".to_string()];
        let t2 = build(2, Some(1));

        let s1 = snapshot(vec![method("com.foo.BarTest", "testBaz()", true)]);
        let s2 = snapshot(vec![]);

        let row = compare_pair(&t1, &s1, &t2, &s2);

        assert_eq!(row.tests_missing_from_t2, Some(1));
        assert_eq!(row.removed_failed_test_count, Some(1));
        assert_eq!(
            row.removed_failed_tests.as_deref(),
            Some("com.foo.BarTest.testBaz()")
        );
        assert!(row.is_smell());
    }

    #[test]
    fn test_demoted_test_still_counts_as_missing() {
        let t1 = build(1, None);
        let t2 = build(2, Some(1));

        let s1 = snapshot(vec![method("com.foo.BarTest", "testBaz()", true)]);
        // Method still declared in T2, but no longer a test.
        let s2 = snapshot(vec![method("com.foo.BarTest", "testBaz()", false)]);

        let row = compare_pair(&t1, &s1, &t2, &s2);
        assert_eq!(row.tests_missing_from_t2, Some(1));
        assert_eq!(
            row.missing_test_names_t2.as_deref(),
            Some("com.foo.BarTest.testBaz()")
        );
    }

    #[test]
    fn test_missing_tests_tracks_still_declared() {
        let gone = method("a.T", "gone()", true);
        let demoted = method("a.T", "demoted()", true);
        let tests_a: HashSet<&MethodRecord> = [&gone, &demoted].into_iter().collect();

        let demoted_plain = method("a.T", "demoted()", false);
        let tests_b: HashSet<&MethodRecord> = HashSet::new();
        let all_b: HashSet<&MethodRecord> = [&demoted_plain].into_iter().collect();

        let missing = missing_tests(&tests_a, &tests_b, &all_b);
        assert_eq!(missing.len(), 2);
        let demoted_entry = missing
            .iter()
            .find(|m| m.qualified_name == "a.T.demoted()")
            .unwrap();
        assert!(demoted_entry.still_declared);
        let gone_entry = missing
            .iter()
            .find(|m| m.qualified_name == "a.T.gone()")
            .unwrap();
        assert!(!gone_entry.still_declared);
    }

    #[test]
    fn test_legacy_smell_warning_truth_table() {
        assert_eq!(
            legacy_smell_warning(Some("failed"), Some(-1), Some(-1), Some(0)),
            Some(true)
        );
        assert_eq!(
            legacy_smell_warning(Some("passed"), Some(-1), Some(-1), Some(0)),
            Some(false)
        );
        assert_eq!(
            legacy_smell_warning(Some("PASSED"), Some(-1), Some(-1), Some(0)),
            Some(false)
        );
        // Fewer failures with more skips also triggers it.
        assert_eq!(
            legacy_smell_warning(Some("errored"), Some(0), Some(-2), Some(1)),
            Some(true)
        );
        // Fewer failures explained by neither fewer runs nor more skips.
        assert_eq!(
            legacy_smell_warning(Some("failed"), Some(0), Some(-1), Some(0)),
            Some(false)
        );
        assert_eq!(legacy_smell_warning(None, Some(-1), Some(-1), Some(0)), None);
        assert_eq!(legacy_smell_warning(Some("failed"), Some(-1), None, Some(0)), None);
    }

    #[test]
    fn test_failed_tests_not_extracted_counts_unmatched_fragments() {
        let m = method("com.foo.BarTest", "testBaz()", true);
        let tests: HashSet<&MethodRecord> = [&m].into_iter().collect();

        let fragments = vec!["testBaz".to_string(), "testGhost".to_string()];
        assert_eq!(failed_tests_not_extracted(&fragments, &tests), 1);
        assert_eq!(failed_tests_not_extracted(&[], &tests), 0);
    }

    #[test]
    fn test_failed_extraction_degrades_analysis_ok() {
        let t1 = build(1, None);
        let t2 = build(2, Some(1));
        let row = compare_pair(&t1, &BuildSnapshot::failed(), &t2, &snapshot(vec![]));
        assert!(!row.analysis_ok);
        assert_eq!(row.tests_extracted_t1, Some(0));
        assert!(!row.is_smell());
    }

    #[test]
    fn test_unpaired_row_is_minimal() {
        let t2 = build(7, Some(6));
        let row = AnalysisRow::unpaired(&t2);
        assert_eq!(row.project, "acme/widget");
        assert_eq!(row.branch_t2, "master");
        assert_eq!(row.build_id_t2, 7);
        assert_eq!(row.trigger_commit_t2, "abc");
        assert!(!row.analysis_ok);
        assert!(row.branch_t1.is_none());
        assert!(row.tests_extracted_t2.is_none());
        assert!(row.delta_tests_run.is_none());
        assert!(row.legacy_smell_warning.is_none());
        assert!(row.removed_failed_tests.is_none());
        assert!(!row.is_smell());
    }

    #[test]
    fn test_smell_requires_analysis_ok() {
        let mut t1 = build(1, None);
        t1.failed_tests = vec!["testBaz".to_string()];
        let t2 = build(2, Some(1));

        let s1 = snapshot(vec![method("com.foo.BarTest", "testBaz()", true)]);
        let row = compare_pair(&t1, &s1, &t2, &BuildSnapshot::failed());
        assert_eq!(row.removed_failed_test_count, Some(1));
        assert!(!row.is_smell());
    }

    #[test]
    fn test_legacy_warning_alone_marks_smell() {
        let mut t1 = build(1, None);
        t1.status = Some("failed".to_string());
        t1.tests_run = Some(3);
        t1.tests_ok = Some(2);
        t1.tests_failed = Some(1);
        t1.tests_skipped = Some(0);
        let mut t2 = build(2, Some(1));
        t2.tests_run = Some(2);
        t2.tests_ok = Some(2);
        t2.tests_failed = Some(0);
        t2.tests_skipped = Some(0);

        let row = compare_pair(&t1, &snapshot(vec![]), &t2, &snapshot(vec![]));
        assert_eq!(row.legacy_smell_warning, Some(true));
        assert!(row.is_smell());
    }
}
