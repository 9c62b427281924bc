use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};

use skiptrace_core::compare::AnalysisRow;
use skiptrace_core::sink::ResultSink;

/// Written for absent values; distinct from the empty string.
pub const NULL_MARKER: &str = "null";

pub const RESULT_HEADERS: [&str; 23] = [
    "project",
    "branch_t1",
    "branch_t2",
    "build_id_t1",
    "build_id_t2",
    "trigger_commit_t1",
    "trigger_commit_t2",
    "num_test_methods_extracted_t1",
    "num_test_methods_extracted_t2",
    "delta_run_vs_extracted_t1",
    "delta_run_vs_extracted_t2",
    "num_test_methods_not_in_t1",
    "num_test_methods_not_in_t2",
    "test_methods_not_in_t2",
    "delta_tests_run",
    "delta_tests_ok",
    "delta_tests_failed",
    "delta_tests_skipped",
    "legacy_smell_warning",
    "num_failed_tests_not_extracted",
    "num_removed_failed_tests",
    "removed_failed_tests",
    "analysis_ok",
];

/// Appends analysis rows to a CSV file, writing the header only when the
/// file does not exist yet.
pub struct CsvResultSink {
    writer: csv::Writer<File>,
}

impl CsvResultSink {
    pub fn open(path: &Path) -> Result<Self> {
        let exists = path.exists();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create '{}'", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open result file '{}'", path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if !exists {
            writer
                .write_record(RESULT_HEADERS)
                .context("failed to write result header")?;
            writer.flush().context("failed to flush result header")?;
        }
        Ok(Self { writer })
    }
}

impl ResultSink for CsvResultSink {
    fn write(&mut self, row: &AnalysisRow) -> Result<()> {
        self.writer
            .write_record(render(row))
            .context("failed to write analysis row")
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("failed to flush result file")
    }
}

fn render(row: &AnalysisRow) -> Vec<String> {
    vec![
        row.project.clone(),
        opt_text(&row.branch_t1),
        row.branch_t2.clone(),
        opt_int(row.build_id_t1),
        row.build_id_t2.to_string(),
        opt_text(&row.trigger_commit_t1),
        row.trigger_commit_t2.clone(),
        opt_int(row.tests_extracted_t1),
        opt_int(row.tests_extracted_t2),
        opt_int(row.delta_run_vs_extracted_t1),
        opt_int(row.delta_run_vs_extracted_t2),
        opt_int(row.tests_missing_from_t1),
        opt_int(row.tests_missing_from_t2),
        opt_text(&row.missing_test_names_t2),
        opt_int(row.delta_tests_run),
        opt_int(row.delta_tests_ok),
        opt_int(row.delta_tests_failed),
        opt_int(row.delta_tests_skipped),
        opt_flag(row.legacy_smell_warning),
        opt_int(row.failed_tests_not_extracted),
        opt_int(row.removed_failed_test_count),
        opt_text(&row.removed_failed_tests),
        row.analysis_ok.to_string(),
    ]
}

fn opt_int(value: Option<i64>) -> String {
    value.map_or_else(|| NULL_MARKER.to_string(), |v| v.to_string())
}

fn opt_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| NULL_MARKER.to_string())
}

fn opt_flag(value: Option<bool>) -> String {
    value.map_or_else(|| NULL_MARKER.to_string(), |v| v.to_string())
}
