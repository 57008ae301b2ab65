//! Commands that talk to the GitHub GraphQL API.

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use mentorship_github::{
    GithubConfig, HttpTransport, IdentityResolver, IssueProcessor, ProvisionError, ProvisionMode,
    Provisioner, DEFAULT_PROJECT_TITLE,
};
use mentorship_ingest::{read_pair_list, write_pair_list, NormalizeContext, PairRecord, PairUpdate};

use crate::{emit, read_input, report_row_failures};

#[derive(Args, Clone)]
pub struct AuthArgs {
    /// GitHub token (falls back to GITHUB_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Per-request timeout
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

impl AuthArgs {
    fn transport(&self) -> Result<HttpTransport> {
        let config =
            GithubConfig::resolve(self.token.clone())?.with_timeout_secs(self.timeout_secs);
        Ok(HttpTransport::new(&config)?)
    }
}

#[derive(Subcommand)]
pub enum GithubCommands {
    /// Resolve a user or organization login to its node id.
    ResolveOwner {
        #[arg(long)]
        login: String,

        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Create (or reuse) a project and add one draft item per pair.
    Provision {
        /// Owner login (user or organization)
        #[arg(long)]
        owner: String,

        /// JSON pair list, e.g. the output of `scan --json`
        #[arg(long)]
        pair_data: PathBuf,

        #[arg(long)]
        project_title: String,

        /// Add to an existing project whose title contains `--project-title`
        #[arg(long)]
        reuse_existing: bool,

        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Apply changes to one pair and re-render its draft item card.
    UpdateItem {
        /// Draft issue id printed by `provision`
        #[arg(long)]
        draft_issue_id: String,

        /// JSON pair list holding the pair
        #[arg(long)]
        pair_data: PathBuf,

        /// 1-based position of the pair in the list
        #[arg(long, default_value_t = 1)]
        pair: usize,

        #[arg(long)]
        progress: Option<String>,

        #[arg(long = "add-goal")]
        add_goals: Vec<String>,

        #[arg(long = "add-meeting")]
        add_meetings: Vec<String>,

        #[arg(long = "add-deliverable")]
        add_deliverables: Vec<String>,

        /// Save the updated pair back into `--pair-data`
        #[arg(long)]
        write_back: bool,

        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Turn a mentorship issue into a project item, then comment and close it.
    ProcessIssue {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        repo: String,

        #[arg(long)]
        issue_number: u64,

        #[arg(long, default_value = DEFAULT_PROJECT_TITLE)]
        project_title: String,

        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Show which account the token authenticates as.
    Whoami {
        #[command(flatten)]
        auth: AuthArgs,
    },
}

pub fn cmd_github(command: GithubCommands) -> Result<()> {
    match command {
        GithubCommands::ResolveOwner { login, auth } => cmd_resolve_owner(&login, &auth),
        GithubCommands::Provision {
            owner,
            pair_data,
            project_title,
            reuse_existing,
            auth,
        } => cmd_provision(&owner, &pair_data, &project_title, reuse_existing, &auth),
        GithubCommands::UpdateItem {
            draft_issue_id,
            pair_data,
            pair,
            progress,
            add_goals,
            add_meetings,
            add_deliverables,
            write_back,
            auth,
        } => {
            let changes = PairChanges {
                progress,
                add_goals,
                add_meetings,
                add_deliverables,
            };
            cmd_update_item(&draft_issue_id, &pair_data, pair, changes, write_back, &auth)
        }
        GithubCommands::ProcessIssue {
            owner,
            repo,
            issue_number,
            project_title,
            auth,
        } => cmd_process_issue(&owner, &repo, issue_number, &project_title, &auth),
        GithubCommands::Whoami { auth } => cmd_whoami(&auth),
    }
}

fn cmd_resolve_owner(login: &str, auth: &AuthArgs) -> Result<()> {
    let resolution = IdentityResolver::new(auth.transport()?).resolve(login)?;
    println!(
        "{} {} {} {} ({})",
        "Resolved".green().bold(),
        resolution.requested,
        "→".cyan(),
        resolution.id,
        resolution.via
    );
    if resolution.login != resolution.requested {
        println!("  {} using account {}", "!".yellow(), resolution.login);
    }
    Ok(())
}

fn cmd_whoami(auth: &AuthArgs) -> Result<()> {
    let viewer = IdentityResolver::new(auth.transport()?).viewer()?;
    println!("{} {} ({})", "Authenticated as".green().bold(), viewer.login, viewer.id);
    Ok(())
}

fn cmd_provision(
    owner: &str,
    pair_data: &Path,
    title: &str,
    reuse_existing: bool,
    auth: &AuthArgs,
) -> Result<()> {
    let text = read_input(pair_data)?;
    let pairs = read_pair_list(&text, &NormalizeContext::migration().with_strict(true))
        .with_context(|| format!("failed to parse {}", pair_data.display()))?;
    report_row_failures(true, "entry", &pairs.failures);
    let records = pairs.records;
    let mode = if reuse_existing {
        ProvisionMode::ReuseExisting
    } else {
        ProvisionMode::CreateNew
    };

    println!(
        "{} {} pairs for {}",
        "Provisioning".green().bold(),
        records.len(),
        owner
    );
    let provisioner = Provisioner::new(auth.transport()?);
    let report = match provisioner.provision(owner, title, &records, mode) {
        Ok(report) => report,
        Err(ProvisionError::Aborted {
            project,
            completed,
            source,
        }) => {
            if let Some(project) = project {
                println!("  {} project {} (#{})", "→".cyan(), project.title, project.number);
            }
            for item in &completed {
                println!("  {} {}", "✓".green(), item.title);
            }
            return Err(anyhow!(
                "provisioning stopped after {} item(s): {source}",
                completed.len()
            ));
        }
        Err(err) => return Err(err.into()),
    };

    let verb = if report.created_project {
        "created"
    } else {
        "reusing"
    };
    println!(
        "  {} {verb} project {} (#{})",
        "→".cyan(),
        report.project.title,
        report.project.number
    );
    if let Some(url) = &report.project.url {
        println!("  {} {url}", "→".cyan());
    }
    for item in &report.items {
        match &item.draft_issue_id {
            Some(draft) => println!("  {} {} [{draft}]", "✓".green(), item.title),
            None => println!("  {} {}", "✓".green(), item.title),
        }
    }
    for skipped in &report.skipped {
        println!(
            "  {} {}: {}",
            "!".yellow().bold(),
            skipped.provenance,
            skipped.warnings.join(", ")
        );
    }
    println!(
        "{} {} items added, {} skipped",
        "Done".green().bold(),
        report.items.len(),
        report.skipped.len()
    );
    Ok(())
}

/// Edits requested on the command line for one pair.
#[derive(Debug, Default)]
struct PairChanges {
    progress: Option<String>,
    add_goals: Vec<String>,
    add_meetings: Vec<String>,
    add_deliverables: Vec<String>,
}

/// Appended items extend the current lists; unset options leave fields alone.
fn appended(current: &[String], extra: Vec<String>) -> Option<Vec<String>> {
    if extra.is_empty() {
        return None;
    }
    Some(current.iter().cloned().chain(extra).collect())
}

impl PairChanges {
    fn into_update(self, record: &PairRecord) -> PairUpdate {
        PairUpdate {
            progress: self.progress,
            goals: appended(record.goals(), self.add_goals),
            meetings: appended(record.meetings(), self.add_meetings),
            deliverables: appended(record.deliverables(), self.add_deliverables),
            ..Default::default()
        }
    }
}

fn cmd_update_item(
    draft_issue_id: &str,
    pair_data: &Path,
    pair: usize,
    changes: PairChanges,
    write_back: bool,
    auth: &AuthArgs,
) -> Result<()> {
    if write_back && pair_data == Path::new("-") {
        bail!("--write-back needs a file for --pair-data, not stdin");
    }
    let text = read_input(pair_data)?;
    let pairs = read_pair_list(&text, &NormalizeContext::migration())
        .with_context(|| format!("failed to parse {}", pair_data.display()))?;
    if !pairs.failures.is_empty() {
        report_row_failures(true, "entry", &pairs.failures);
        bail!(
            "{} has {} malformed entries; fix them before updating",
            pair_data.display(),
            pairs.failures.len()
        );
    }

    let mut records: Vec<PairRecord> = pairs.records.into_iter().map(|r| r.record).collect();
    let index = pair
        .checked_sub(1)
        .filter(|i| *i < records.len())
        .ok_or_else(|| anyhow!("--pair {pair} is out of range (1..={})", records.len()))?;

    let update = changes.into_update(&records[index]);
    let updated = records[index].apply_update(update, Utc::now());

    let provisioner = Provisioner::new(auth.transport()?);
    let draft = provisioner.update_item(draft_issue_id, &updated)?;
    println!(
        "{} {} ↔ {} [{draft}]",
        "Updated".green().bold(),
        updated.mentor(),
        updated.mentee()
    );

    if write_back {
        records[index] = updated;
        emit(Some(pair_data), &write_pair_list(&records)?)?;
    }
    Ok(())
}

fn cmd_process_issue(
    owner: &str,
    repo: &str,
    number: u64,
    project_title: &str,
    auth: &AuthArgs,
) -> Result<()> {
    let processor = IssueProcessor::new(auth.transport()?).with_project_title(project_title);
    let outcome = processor.process(owner, repo, number)?;

    println!(
        "{} #{}: {} ↔ {}",
        "Processed".green().bold(),
        outcome.issue.number,
        outcome.record.mentor(),
        outcome.record.mentee()
    );
    println!(
        "  {} item {} in {} (#{})",
        "→".cyan(),
        outcome.item.item_id,
        outcome.project.title,
        outcome.project.number
    );

    let mut follow_up_failures = Vec::new();
    for (step, result) in [("comment", &outcome.comment), ("close", &outcome.close)] {
        match result {
            Ok(()) => println!("  {} {step}", "✓".green()),
            Err(err) => {
                println!("  {} {step}: {err}", "✗".red().bold());
                follow_up_failures.push(step);
            }
        }
    }
    if !follow_up_failures.is_empty() {
        return Err(anyhow!(
            "issue #{number} was added to the project but {} failed",
            follow_up_failures.join(" and ")
        ));
    }
    Ok(())
}
