//! Integration tests for the complete mentorship pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - Legacy folder → records → CSV / JSON / Markdown
//! - JSON pair list → provisioning through a scripted GraphQL transport
//!
//! Run with: cargo test --test integration_tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use chrono::{TimeZone, Utc};
use mentorship_github::{
    Envelope, GraphqlRequest, GraphqlTransport, ProvisionMode, Provisioner, RemoteError,
};
use mentorship_ingest::{
    generate_report, read_pair_list, read_pairs_csv, scan_pairings, without_generated_line,
    write_pair_list, write_pairs_csv, ExtractionSchema, IngestError, NormalizeContext,
    PairRecord, ReportOptions, ScanOptions,
};
use serde_json::json;
use tempfile::tempdir;

fn context() -> NormalizeContext {
    NormalizeContext::migration()
        .with_timestamp(Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap())
}

/// Five entries, one of which is not valid UTF-8.
fn legacy_folder(root: &Path) {
    let pairings = root.join("pairings");
    fs::create_dir_all(pairings.join("alice-lee_bob-kim")).unwrap();
    fs::write(
        pairings.join("alice-lee_bob-kim/README.md"),
        "**Goals**:\n- Learn X\n- Learn Y\n\n**Status**: Paused, resuming in May\n",
    )
    .unwrap();

    fs::create_dir_all(pairings.join("carol_dan")).unwrap();
    fs::write(pairings.join("carol_dan/meeting-2024-01-10.md"), "notes").unwrap();
    fs::write(pairings.join("carol_dan/session-2.md"), "notes").unwrap();
    fs::write(pairings.join("carol_dan/photo.png"), [0u8, 1, 2]).unwrap();

    fs::write(
        pairings.join("erin_frank.md"),
        "**Mentor**: erin@example.org\n**Mentee**: frank@example.org\n**Slack**: #erin-frank\n",
    )
    .unwrap();
    fs::write(pairings.join("notes.txt"), "Random notes, no pair here.\n").unwrap();
    fs::write(pairings.join("gina_hal.md"), [0x66, 0x6f, 0xff, 0xfe, 0x6f]).unwrap();
}

fn scan(root: &Path) -> Vec<PairRecord> {
    let result = scan_pairings(
        &root.join("pairings"),
        &ScanOptions::default(),
        &ExtractionSchema::default(),
        &context(),
    )
    .unwrap();
    result.records.into_iter().map(|r| r.record).collect()
}

// ============================================================================
// Legacy folder scanning
// ============================================================================

#[test]
fn test_scan_isolates_the_unreadable_entry() {
    let tmp = tempdir().unwrap();
    legacy_folder(tmp.path());

    let result = scan_pairings(
        &tmp.path().join("pairings"),
        &ScanOptions::default(),
        &ExtractionSchema::default(),
        &context(),
    )
    .unwrap();

    assert_eq!(result.records.len(), 4);
    assert_eq!(result.failures.len(), 1);
    assert!(result.failures[0].path.ends_with("gina_hal.md"));
    assert!(matches!(result.failures[0].error, IngestError::Decode { .. }));

    let names: Vec<(&str, &str)> = result
        .records
        .iter()
        .map(|r| (r.record.mentor(), r.record.mentee()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("Alice Lee", "Bob Kim"),
            ("Carol", "Dan"),
            ("erin@example.org", "frank@example.org"),
            ("Unknown", "Unknown"),
        ]
    );

    let carol = &result.records[1].record;
    assert_eq!(
        carol.meetings(),
        [
            "Meeting file: meeting-2024-01-10.md".to_string(),
            "Meeting file: session-2.md".to_string()
        ]
    );
    assert_eq!(result.records[0].record.progress(), "Paused, resuming in May");
    assert_eq!(result.records[3].record.progress(), "Migrated from pairings folder");
}

#[test]
fn test_strict_scan_marks_placeholder_pairs_invalid() {
    let tmp = tempdir().unwrap();
    legacy_folder(tmp.path());

    let result = scan_pairings(
        &tmp.path().join("pairings"),
        &ScanOptions::default(),
        &ExtractionSchema::default(),
        &context().with_strict(true),
    )
    .unwrap();

    assert_eq!(result.records.len(), 4);
    assert_eq!(result.valid_records().count(), 3);
}

// ============================================================================
// Formats
// ============================================================================

#[test]
fn test_csv_round_trip_preserves_identities_and_progress() {
    let tmp = tempdir().unwrap();
    legacy_folder(tmp.path());
    let records = scan(tmp.path());

    let csv_text = write_pairs_csv(&records).unwrap();
    let reread = read_pairs_csv(&csv_text, &context()).unwrap();

    assert_eq!(reread.len(), records.len());
    for (before, after) in records.iter().zip(&reread) {
        assert_eq!(before.mentor(), after.mentor());
        assert_eq!(before.mentee(), after.mentee());
        assert_eq!(before.progress(), after.progress());
        assert_eq!(before.goals(), after.goals());
    }
}

#[test]
fn test_pair_list_round_trip_keeps_extensions_and_provenance() {
    let tmp = tempdir().unwrap();
    legacy_folder(tmp.path());
    let records = scan(tmp.path());

    let json_text = write_pair_list(&records).unwrap();
    let reread: Vec<PairRecord> = read_pair_list(&json_text, &NormalizeContext::migration())
        .unwrap()
        .records
        .into_iter()
        .map(|r| r.record)
        .collect();

    assert_eq!(reread, records);
    assert_eq!(
        reread[2].extensions().get("slack"),
        Some(&json!("#erin-frank"))
    );
}

#[test]
fn test_report_is_stable_apart_from_timestamp() {
    let tmp = tempdir().unwrap();
    legacy_folder(tmp.path());
    let records = scan(tmp.path());
    let options = ReportOptions::default();

    let first = generate_report(
        &records,
        &options,
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    );
    let second = generate_report(
        &records,
        &options,
        Utc.with_ymd_and_hms(2025, 9, 9, 9, 9, 9).unwrap(),
    );

    assert_eq!(without_generated_line(&first), without_generated_line(&second));
    assert!(first.contains("**Pairs Found**: 4"));
    assert!(first.contains("| Alice Lee | Bob Kim | 2 | 0 |"));
}

// ============================================================================
// Provisioning
// ============================================================================

#[derive(Default)]
struct Replay {
    responses: RefCell<VecDeque<serde_json::Value>>,
    seen: RefCell<Vec<GraphqlRequest>>,
}

impl Replay {
    fn then(self, body: serde_json::Value) -> Self {
        self.responses.borrow_mut().push_back(body);
        self
    }
}

impl GraphqlTransport for Replay {
    fn execute(&self, request: &GraphqlRequest) -> Result<Envelope, RemoteError> {
        self.seen.borrow_mut().push(request.clone());
        let body = self
            .responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| RemoteError::Transport {
                message: "script exhausted".into(),
            })?;
        serde_json::from_value(body).map_err(|e| RemoteError::Malformed(e.to_string()))
    }
}

#[test]
fn test_scanned_pairs_provision_into_one_project() {
    let tmp = tempdir().unwrap();
    legacy_folder(tmp.path());
    let pair_list = write_pair_list(&scan(tmp.path())).unwrap();
    let strict = NormalizeContext::migration().with_strict(true);
    let records = read_pair_list(&pair_list, &strict).unwrap().records;

    let transport = Replay::default()
        .then(json!({ "data": { "user": { "id": "U_1", "login": "latinx" } } }))
        .then(json!({ "data": { "createProjectV2": { "projectV2": {
            "id": "P_1", "number": 4, "title": "Mentorship Migration", "url": null
        } } } }))
        .then(json!({ "data": { "addProjectV2DraftIssue": { "projectItem": { "id": "I_1" } } } }))
        .then(json!({ "data": { "addProjectV2DraftIssue": { "projectItem": { "id": "I_2" } } } }))
        .then(json!({ "data": { "addProjectV2DraftIssue": { "projectItem": { "id": "I_3" } } } }));

    let report = Provisioner::new(&transport)
        .provision(
            "latinx",
            "Mentorship Migration",
            &records,
            ProvisionMode::CreateNew,
        )
        .unwrap();

    assert_eq!(report.items.len(), 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.items[1].title, "Carol → Dan");
    assert!(transport.responses.borrow().is_empty());

    let seen = transport.seen.borrow();
    let card = seen[2].variables["body"].as_str().unwrap();
    assert!(card.contains("## Goals\n- Learn X\n- Learn Y"));
    assert!(card.contains("## Progress\nPaused, resuming in May"));
}
