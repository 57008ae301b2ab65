use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn mentorship_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mentorship"))
}

fn run(args: &[&str], cwd: &Path) -> Output {
    Command::new(mentorship_bin())
        .args(args)
        .current_dir(cwd)
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "warn")
        .env_remove("GITHUB_TOKEN")
        .output()
        .expect("run mentorship")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "command failed\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn write_pairings(root: &Path) {
    let pair_dir = root.join("pairings/alice-lee_bob-kim");
    fs::create_dir_all(&pair_dir).expect("create pair dir");
    fs::write(
        pair_dir.join("README.md"),
        "# Pair notes\n\n**Goals**:\n- Ship a demo\n- Read two papers\n\n**Progress**: Week 4\n",
    )
    .expect("write README");
    fs::write(
        root.join("pairings/carol_dan.md"),
        "**Mentor**: carol@example.org\n\n## Meetings\n- 2024-02-01 kickoff\n",
    )
    .expect("write carol_dan.md");
}

#[test]
fn scan_writes_report_and_pair_list() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write_pairings(tmp.path());

    let output = run(
        &[
            "scan",
            "--pairings-path",
            "pairings",
            "--report",
            "report.md",
            "--json",
            "pairs.json",
        ],
        tmp.path(),
    );
    assert_success(&output);

    let report = fs::read_to_string(tmp.path().join("report.md")).expect("read report");
    assert!(report.contains("**Pairs Found**: 2"));
    assert!(report.contains("### Pair 1: Alice Lee ↔ Bob Kim"));
    assert!(report.contains("| carol@example.org | Dan | 0 | 1 |"));

    let pairs: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("pairs.json")).expect("read json"))
            .expect("parse json");
    let pairs = pairs.as_array().expect("array");
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0]["mentor_email"], "Alice Lee");
    assert_eq!(pairs[0]["progress"], "Week 4");
    assert_eq!(pairs[0]["goals"].as_array().map(Vec::len), Some(2));
    assert_eq!(pairs[1]["progress"], "Migrated from pairings folder");
}

#[test]
fn report_renders_from_pair_list() {
    let tmp = tempfile::tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("pairs.json"),
        r#"[{"mentor": "Ana", "mentee": "Ben", "goals": ["g1"], "progress": "Active"}]"#,
    )
    .expect("write pairs");

    let output = run(
        &[
            "report",
            "--pair-data",
            "pairs.json",
            "--output",
            "out.md",
            "--source",
            "legacy sheet",
        ],
        tmp.path(),
    );
    assert_success(&output);

    let report = fs::read_to_string(tmp.path().join("out.md")).expect("read report");
    assert!(report.starts_with("# Pairings Migration Report\n"));
    assert!(report.contains("**Source**: legacy sheet"));
    assert!(report.contains("| Ana | Ben | 1 | 0 | Active |"));
}

#[test]
fn report_skips_malformed_pair_list_entries() {
    let tmp = tempfile::tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("pairs.json"),
        r#"[{"mentor": "Ana", "mentee": "Ben"}, {"mentor": "Cy", "mentee": "Dee", "goals": "one goal"}]"#,
    )
    .expect("write pairs");

    let output = run(&["report", "--pair-data", "pairs.json"], tmp.path());
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("**Pairs Found**: 1"));
    assert!(stdout.contains("| Ana | Ben |"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("entry 2"));
}

#[test]
fn update_item_refuses_a_pair_list_with_malformed_entries() {
    let tmp = tempfile::tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("pairs.json"),
        r#"[{"mentor": "Ana", "mentee": "Ben", "meetings": 3}]"#,
    )
    .expect("write pairs");

    let output = run(
        &[
            "update-item",
            "--draft-issue-id",
            "DI_1",
            "--pair-data",
            "pairs.json",
            "--progress",
            "Week 2",
        ],
        tmp.path(),
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("malformed entries"));
    assert_eq!(
        fs::read_to_string(tmp.path().join("pairs.json")).expect("read pairs"),
        r#"[{"mentor": "Ana", "mentee": "Ben", "meetings": 3}]"#
    );
}

#[test]
fn roster_prints_project_card_csv() {
    let tmp = tempfile::tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("roster.csv"),
        "\u{feff}mentor_email,mentee_email\nana@x.org,ben@x.org\n,cy@x.org\n",
    )
    .expect("write roster");

    let output = run(&["roster", "--input", "roster.csv"], tmp.path());
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Pair,Mentor,Mentee,Goals,Progress,Meetings,Deliverables",
            "Pair 1,ana@x.org,ben@x.org,,Not Started,,",
        ]
    );
    assert!(String::from_utf8_lossy(&output.stderr).contains("mentor is missing"));
}

#[test]
fn parse_issue_prints_normalized_json() {
    let tmp = tempfile::tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("body.md"),
        "**Mentor**: Alice\r\n**Mentee**: Bob\r\n**Goals**:\r\n- Learn X\r\n- Learn Y\r\n",
    )
    .expect("write body");

    let output = run(
        &["parse-issue", "--body-file", "body.md", "--issue-number", "42"],
        tmp.path(),
    );
    assert_success(&output);

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(parsed["valid"], true);
    assert_eq!(parsed["pair"]["mentor_email"], "Alice");
    assert_eq!(parsed["pair"]["mentee_email"], "Bob");
    assert_eq!(parsed["pair"]["goals"], serde_json::json!(["Learn X", "Learn Y"]));
    assert_eq!(parsed["pair"]["migration_source"], "issue#42");
}

#[test]
fn remote_commands_require_a_token() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let output = run(&["whoami"], tmp.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("GITHUB_TOKEN"));
}

#[test]
fn scan_of_missing_folder_fails() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let output = run(&["scan", "--pairings-path", "nope"], tmp.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("pairings folder not found"));
}
