use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::types::BuildRecord;

/// One row of the TravisTorrent-style input file, before validation.
#[derive(Debug, Deserialize)]
struct RawBuildRow {
    gh_project_name: String,
    git_branch: String,
    tr_build_id: String,
    tr_prev_build: String,
    tr_job_id: String,
    git_trigger_commit: String,
    tr_status: String,
    tr_log_num_tests_run: String,
    tr_log_num_tests_ok: String,
    tr_log_num_tests_skipped: String,
    tr_log_num_tests_failed: String,
    tr_log_tests_failed: String,
}

/// Parse the build input file into comparison-eligible records.
///
/// Rows with malformed required fields are skipped with a warning. A project
/// with an invalid failed-test name anywhere in its builds is excluded
/// entirely; the reported names for such rows come from log scraping and an
/// invalid one means the scrape went wrong for that project.
pub fn parse_builds_file(path: &Path) -> Result<Vec<BuildRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open input file '{}'", path.display()))?;

    let mut builds: Vec<BuildRecord> = Vec::new();
    let mut involved_projects: HashSet<String> = HashSet::new();
    let mut invalid_projects: HashSet<String> = HashSet::new();
    let mut skipped_rows = 0usize;

    for (index, row) in reader.deserialize::<RawBuildRow>().enumerate() {
        let line = index + 2; // header is line 1
        let raw = match row {
            Ok(raw) => raw,
            Err(e) => {
                warn!(line, error = %e, "skipping unreadable input row");
                skipped_rows += 1;
                continue;
            }
        };

        let project = raw.gh_project_name.clone();
        let Some(build) = row_to_build(raw, line) else {
            skipped_rows += 1;
            continue;
        };

        involved_projects.insert(project.clone());
        if build.failed_tests.iter().any(|f| is_invalid_fragment(f)) {
            invalid_projects.insert(project);
        } else {
            builds.push(build);
        }
    }

    let before = builds.len();
    builds.retain(|b| !invalid_projects.contains(&b.key.project));
    if !invalid_projects.is_empty() {
        warn!(
            projects = invalid_projects.len(),
            excluded_builds = before - builds.len(),
            "projects contain invalid failed-test names; all their builds are excluded"
        );
    }
    if skipped_rows > 0 {
        warn!(rows = skipped_rows, "skipped input rows with invalid required fields");
    }

    let with_failures = builds
        .iter()
        .filter(|b| b.tests_failed.is_some_and(|n| n > 0))
        .count();
    info!(
        builds = builds.len(),
        projects = involved_projects.len() - invalid_projects.len(),
        with_failed_tests = with_failures,
        "parsed build records"
    );

    Ok(builds)
}

fn row_to_build(raw: RawBuildRow, line: usize) -> Option<BuildRecord> {
    let Ok(build_id) = raw.tr_build_id.parse::<i64>() else {
        warn!(line, value = %raw.tr_build_id, "build id is not a valid number");
        return None;
    };
    let Ok(job_id) = raw.tr_job_id.parse::<i64>() else {
        warn!(line, build_id, value = %raw.tr_job_id, "job id is not a valid number");
        return None;
    };

    let mut build = match BuildRecord::new(
        &raw.gh_project_name,
        &raw.git_branch,
        build_id,
        job_id,
        &raw.git_trigger_commit,
    ) {
        Ok(build) => build,
        Err(e) => {
            warn!(line, build_id, error = %e, "skipping input row");
            return None;
        }
    };

    build.prev_build_id = parse_count(&raw.tr_prev_build);
    build.status = non_empty(raw.tr_status);
    build.tests_run = parse_count(&raw.tr_log_num_tests_run);
    build.tests_ok = parse_count(&raw.tr_log_num_tests_ok);
    build.tests_failed = parse_count(&raw.tr_log_num_tests_failed);
    build.tests_skipped = parse_count(&raw.tr_log_num_tests_skipped);
    build.failed_tests = split_fragments(&raw.tr_log_tests_failed);
    Some(build)
}

/// Lenient numeric parse: empty or malformed becomes absent.
fn parse_count(value: &str) -> Option<i64> {
    if value.is_empty() {
        return None;
    }
    value.parse().ok()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn split_fragments(value: &str) -> Vec<String> {
    value
        .split('#')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A failed-test name is invalid if it is empty, does not start with a
/// lowercase character, or contains whitespace.
fn is_invalid_fragment(fragment: &str) -> bool {
    let Some(first) = fragment.chars().next() else {
        return true;
    };
    !first.is_lowercase() || fragment.chars().any(char::is_whitespace)
}
