use std::path::Path;

use colored::Colorize;

use skiptrace_core::pipeline::RunTotals;

/// Format the end-of-run summary for terminal output.
pub fn format_summary(totals: &RunTotals, builds_parsed: usize, results_dir: &Path) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{}\n{}\n",
        "Skiptrace - Skipped Failing Test Detection".bold(),
        "=".repeat(42)
    ));

    out.push_str(&format!(
        "\n{}: {} builds, {} pairs compared, {} without a previous build\n",
        "Summary".bold(),
        builds_parsed,
        totals.pairs_compared,
        totals.unpaired_builds,
    ));

    if totals.smell_rows == 0 {
        out.push_str(&format!("\n{}\n", "No smells detected!".green().bold()));
    } else {
        out.push_str(&format!(
            "\n{} ({} found)\n",
            "Smells".red().bold(),
            totals.smell_rows,
        ));
    }

    out.push_str(&format!(
        "\nResults written to {}\n",
        results_dir.display()
    ));

    out
}
