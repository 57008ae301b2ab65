//! Markdown migration report.
//!
//! The output is a pure function of the records and options, except for the
//! single `**Generated**` line. Records appear in the order supplied.

use chrono::{DateTime, Utc};

use crate::PairRecord;

/// Prefix of the one line that depends on wall-clock time.
pub const GENERATED_LINE_PREFIX: &str = "**Generated**: ";

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub title: String,
    /// Human label for where the records came from (e.g. the pairings path).
    pub source: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: "Pairings Migration Report".to_string(),
            source: "pairings".to_string(),
        }
    }
}

/// Keep table rows intact when a cell contains a pipe or a line break.
fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

fn bullet_lines(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        return format!("- {empty}\n");
    }
    items.iter().map(|item| format!("- {item}\n")).collect()
}

/// Render the summary table followed by one detail section per record.
pub fn generate_report(
    records: &[PairRecord],
    options: &ReportOptions,
    generated_at: DateTime<Utc>,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", options.title));
    out.push_str(&format!(
        "{GENERATED_LINE_PREFIX}{}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("**Source**: {}\n", options.source));
    out.push_str(&format!("**Pairs Found**: {}\n\n", records.len()));

    out.push_str("## Migration Summary\n\n");
    out.push_str("| Mentor | Mentee | Goals | Meetings | Status |\n");
    out.push_str("|--------|--------|-------|----------|--------|\n");
    for record in records {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            cell(record.mentor()),
            cell(record.mentee()),
            record.goals().len(),
            record.meetings().len(),
            cell(record.progress()),
        ));
    }

    out.push_str("\n## Detailed Information\n\n");
    for (i, record) in records.iter().enumerate() {
        out.push_str(&format!(
            "### Pair {}: {} ↔ {}\n\n",
            i + 1,
            record.mentor(),
            record.mentee()
        ));
        out.push_str(&format!("**Source**: `{}`\n", record.provenance()));
        out.push_str(&format!("**Goals**: {} found\n", record.goals().len()));
        out.push_str(&format!("**Meetings**: {} found\n", record.meetings().len()));
        out.push_str(&format!("**Progress**: {}\n\n", record.progress()));
        out.push_str("#### Goals\n");
        out.push_str(&bullet_lines(record.goals(), "No goals found"));
        out.push('\n');
        out.push_str("#### Meetings\n");
        out.push_str(&bullet_lines(record.meetings(), "No meetings found"));
        out.push_str("\n---\n\n");
    }

    out
}

/// Report text with the timestamp line removed, for comparing two renders.
pub fn without_generated_line(report: &str) -> String {
    report
        .lines()
        .filter(|line| !line.starts_with(GENERATED_LINE_PREFIX))
        .collect::<Vec<_>>()
        .join("\n")
}
