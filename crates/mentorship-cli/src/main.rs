//! Mentorship CLI
//!
//! Offline commands:
//! - `scan`: legacy `pairings/` folder → records, Markdown report, JSON pair list
//! - `report`: JSON pair list → Markdown report
//! - `roster`: `mentor_email,mentee_email` CSV → project-card CSV
//! - `parse-issue`: issue body → normalized record (JSON)
//!
//! GitHub commands (need `--token` or `GITHUB_TOKEN`):
//! - `resolve-owner`, `provision`, `update-item`, `process-issue`, `whoami`

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use mentorship_ingest::{
    generate_report, ingest, read_pair_list, read_roster, scan_pairings, write_pair_list,
    write_pairs_csv, ExtractionSchema, NormalizeContext, NormalizedRecord, Origin, PairRecord,
    ReportOptions, RowFailure, ScanOptions,
};

mod github;

#[derive(Parser)]
#[command(name = "mentorship")]
#[command(author, version, about = "Mentorship pair tracking: ingest, report, provision")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a legacy pairings folder and extract one pair per entry.
    Scan {
        /// Folder whose direct children are pair files or pair directories
        #[arg(long, default_value = "pairings")]
        pairings_path: PathBuf,

        /// Write a Markdown migration report here
        #[arg(long)]
        report: Option<PathBuf>,

        /// Write the valid pairs as a JSON pair list here
        #[arg(long)]
        json: Option<PathBuf>,

        /// Treat the `Unknown` placeholder as a missing identity
        #[arg(long)]
        strict: bool,
    },

    /// Render a Markdown report from a JSON pair list.
    Report {
        #[arg(long)]
        pair_data: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Source label shown in the report header
        #[arg(long)]
        source: Option<String>,
    },

    /// Convert a roster CSV (`mentor_email,mentee_email`) into project-card rows.
    Roster {
        #[arg(long)]
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract a pair from an issue body without touching GitHub.
    ParseIssue {
        /// File holding the issue body, or `-` for stdin
        #[arg(long)]
        body_file: PathBuf,

        #[arg(long)]
        issue_number: Option<u64>,
    },

    #[command(flatten)]
    Github(github::GithubCommands),
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            pairings_path,
            report,
            json,
            strict,
        } => cmd_scan(&pairings_path, report.as_deref(), json.as_deref(), strict),
        Commands::Report {
            pair_data,
            output,
            source,
        } => cmd_report(&pair_data, output.as_deref(), source),
        Commands::Roster { input, output } => cmd_roster(&input, output.as_deref()),
        Commands::ParseIssue {
            body_file,
            issue_number,
        } => cmd_parse_issue(&body_file, issue_number),
        Commands::Github(command) => github::cmd_github(command),
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

pub(crate) fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Write to `output`, or print to stdout when no path is given.
pub(crate) fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("  {} wrote {}", "→".cyan(), path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

/// Status lines go to stderr when stdout carries data.
pub(crate) fn status(stdout_free: bool, line: String) {
    if stdout_free {
        println!("{line}");
    } else {
        eprintln!("{line}");
    }
}

pub(crate) fn report_row_failures(stdout_free: bool, unit: &str, failures: &[RowFailure]) {
    for failure in failures {
        status(
            stdout_free,
            format!("  {} {unit} {}: {}", "✗".red().bold(), failure.row, failure.error),
        );
    }
}

pub(crate) fn describe_invalid(record: &NormalizedRecord) -> String {
    format!(
        "  {} {}: {}",
        "!".yellow().bold(),
        record.record.provenance(),
        record.warnings.join(", ")
    )
}

// ============================================================================
// Offline commands
// ============================================================================

fn cmd_scan(root: &Path, report: Option<&Path>, json: Option<&Path>, strict: bool) -> Result<()> {
    println!("{} {}", "Scanning".green().bold(), root.display());

    let context = NormalizeContext::migration().with_strict(strict);
    let result = scan_pairings(
        root,
        &ScanOptions::default(),
        &ExtractionSchema::default(),
        &context,
    )?;

    for normalized in &result.records {
        if normalized.valid {
            let r = &normalized.record;
            println!(
                "  {} {} ↔ {} ({} goals, {} meetings)",
                "→".cyan(),
                r.mentor(),
                r.mentee(),
                r.goals().len(),
                r.meetings().len()
            );
        } else {
            println!("{}", describe_invalid(normalized));
        }
    }
    for failure in &result.failures {
        println!(
            "  {} {}: {}",
            "✗".red().bold(),
            failure.path.display(),
            failure.error
        );
    }

    let valid: Vec<PairRecord> = result.valid_records().map(|r| r.record.clone()).collect();
    println!(
        "{} {} pairs ({} invalid, {} unreadable)",
        "Found".green().bold(),
        valid.len(),
        result.records.len() - valid.len(),
        result.failures.len()
    );

    if let Some(path) = report {
        let options = ReportOptions {
            source: root.display().to_string(),
            ..Default::default()
        };
        let text = generate_report(&valid, &options, context.now());
        emit(Some(path), &text)?;
    }
    if let Some(path) = json {
        emit(Some(path), &write_pair_list(&valid)?)?;
    }
    Ok(())
}

fn cmd_report(pair_data: &Path, output: Option<&Path>, source: Option<String>) -> Result<()> {
    let text = read_input(pair_data)?;
    let context = NormalizeContext::migration();
    let pairs = read_pair_list(&text, &context)
        .with_context(|| format!("failed to parse {}", pair_data.display()))?;
    let stdout_free = output.is_some();
    report_row_failures(stdout_free, "entry", &pairs.failures);
    let records: Vec<PairRecord> = pairs.records.into_iter().map(|r| r.record).collect();

    let options = ReportOptions {
        source: source.unwrap_or_else(|| pair_data.display().to_string()),
        ..Default::default()
    };
    emit(output, &generate_report(&records, &options, context.now()))
}

fn cmd_roster(input: &Path, output: Option<&Path>) -> Result<()> {
    let text = read_input(input)?;
    let roster = read_roster(&text, &NormalizeContext::roster())
        .with_context(|| format!("failed to parse roster {}", input.display()))?;

    let stdout_free = output.is_some();
    for normalized in roster.records.iter().filter(|r| !r.valid) {
        status(stdout_free, describe_invalid(normalized));
    }
    report_row_failures(stdout_free, "row", &roster.failures);

    let valid: Vec<PairRecord> = roster
        .records
        .into_iter()
        .filter(|r| r.valid)
        .map(|r| r.record)
        .collect();
    status(
        stdout_free,
        format!("{} {} pairs", "Roster".green().bold(), valid.len()),
    );
    emit(output, &write_pairs_csv(&valid)?)
}

fn cmd_parse_issue(body_file: &Path, issue_number: Option<u64>) -> Result<()> {
    let text = read_input(body_file)?;
    let origin = match issue_number {
        Some(number) => Origin::Issue { number, text },
        None => Origin::Blob {
            id: body_file.display().to_string(),
            text,
        },
    };
    let normalized = ingest(
        origin,
        &ExtractionSchema::default(),
        &ScanOptions::default(),
        &NormalizeContext::issue(),
    )?;

    let pair_list = write_pair_list(std::slice::from_ref(&normalized.record))?;
    let pairs: serde_json::Value = serde_json::from_str(&pair_list)?;
    let pair = pairs
        .get(0)
        .cloned()
        .ok_or_else(|| anyhow!("pair list serialization produced no entry"))?;
    let out = serde_json::json!({
        "valid": normalized.valid,
        "warnings": normalized.warnings,
        "pair": pair,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
