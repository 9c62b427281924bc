use std::path::{Path, PathBuf};
use std::process::Command;

const HEADER: &str = "gh_project_name,git_branch,tr_build_id,tr_prev_build,tr_job_id,\
git_trigger_commit,tr_status,tr_log_num_tests_run,tr_log_num_tests_ok,\
tr_log_num_tests_skipped,tr_log_num_tests_failed,tr_log_tests_failed";

const SUITE_WITH_BETA: &str = r#"package com.acme;

import org.junit.Test;

public class FooTest {
    @Test
    public void testAlpha() {
    }

    public void testBeta() {
    }
}
"#;

const SUITE_WITHOUT_BETA: &str = r#"package com.acme;

import org.junit.Test;

public class FooTest {
    @Test
    public void testAlpha() {
    }
}
"#;

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn commit_all(dir: &Path, message: &str) -> String {
    git(dir, &["add", "."]);
    git(dir, &["commit", "-q", "-m", message]);
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(dir)
        .output()
        .expect("failed to run git rev-parse");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Creates a two-commit repository where the failing test present at the
/// first commit disappears at the second.
fn prepare_origin(base: &Path) -> (String, String) {
    let origin = base.join("acme/widget.git");
    let suite_dir = origin.join("src/test/java/com/acme");
    std::fs::create_dir_all(&suite_dir).unwrap();

    git(&origin, &["init", "-q"]);
    git(&origin, &["config", "user.email", "dev@example.com"]);
    git(&origin, &["config", "user.name", "dev"]);

    std::fs::write(suite_dir.join("FooTest.java"), SUITE_WITH_BETA).unwrap();
    let first = commit_all(&origin, "add suite");

    std::fs::write(suite_dir.join("FooTest.java"), SUITE_WITHOUT_BETA).unwrap();
    let second = commit_all(&origin, "drop failing test");

    (first, second)
}

fn write_input(base: &Path, first: &str, second: &str) -> PathBuf {
    let input = base.join("builds.csv");
    let rows = [
        HEADER.to_string(),
        format!("acme/widget,master,1,,11,{first},errored,2,1,0,1,testBeta"),
        format!("acme/widget,master,2,1,22,{second},passed,1,1,0,0,"),
    ];
    std::fs::write(&input, rows.join("\n")).unwrap();
    input
}

fn write_config(base: &Path) -> PathBuf {
    let config = base.join("skiptrace.toml");
    std::fs::write(
        &config,
        format!(
            "[provider]\nremote_base = \"file://{}/\"\n",
            base.display()
        ),
    )
    .unwrap();
    config
}

fn run_skiptrace(base: &Path, input: &Path, output: &Path, config: &Path) {
    let result = Command::new(env!("CARGO_BIN_EXE_skiptrace"))
        .args([
            "run",
            &input.to_string_lossy(),
            &output.to_string_lossy(),
            "--config",
            &config.to_string_lossy(),
        ])
        .current_dir(base)
        .output()
        .expect("failed to run skiptrace");
    assert!(
        result.status.success(),
        "skiptrace run failed: stdout={}, stderr={}",
        String::from_utf8_lossy(&result.stdout),
        String::from_utf8_lossy(&result.stderr)
    );
}

#[test]
fn test_vanished_failing_test_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path();
    let (first, second) = prepare_origin(base);
    let input = write_input(base, &first, &second);
    let config = write_config(base);
    let output = base.join("out");

    run_skiptrace(base, &input, &output, &config);

    let all = std::fs::read_to_string(output.join("Results/all_results.csv")).unwrap();
    let all_lines: Vec<&str> = all.lines().collect();
    assert_eq!(all_lines.len(), 3, "header plus one row per build: {all}");
    assert!(all_lines[0].starts_with("project,branch_t1,branch_t2"));

    // Build 1 has no predecessor: minimal row with null markers.
    let unpaired = all_lines
        .iter()
        .map(|l| l.split(',').collect::<Vec<_>>())
        .find(|fields| fields[4] == "1")
        .expect("no minimal row for build 1");
    assert_eq!(unpaired[0], "acme/widget");
    assert_eq!(unpaired[1], "null");
    assert_eq!(unpaired[3], "null");
    assert_eq!(unpaired[6], first);
    assert_eq!(unpaired[22], "false");

    // Pair (1,2): the failing test vanished.
    let smell = std::fs::read_to_string(output.join("Results/smell_results.csv")).unwrap();
    let smell_lines: Vec<&str> = smell.lines().collect();
    assert_eq!(smell_lines.len(), 2, "expected one smell row: {smell}");
    let row = smell_lines[1];
    assert!(row.contains("com.acme.FooTest.testBeta()"), "row: {row}");
    assert!(row.contains("acme/widget"));
    assert!(row.ends_with("true"), "analysis should be ok: {row}");
    // Counter deltas support the legacy formula as well.
    assert!(row.contains(",-1,"), "expected negative delta: {row}");
}

#[test]
fn test_second_run_appends_without_second_header() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path();
    let (first, second) = prepare_origin(base);
    let input = write_input(base, &first, &second);
    let config = write_config(base);
    let output = base.join("out");

    run_skiptrace(base, &input, &output, &config);
    run_skiptrace(base, &input, &output, &config);

    let all = std::fs::read_to_string(output.join("Results/all_results.csv")).unwrap();
    assert_eq!(all.lines().count(), 5, "header plus two rows per run: {all}");
    assert_eq!(all.matches("project,branch_t1").count(), 1);
}
