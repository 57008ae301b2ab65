//! Tabular and JSON interchange formats.
//!
//! - Project-card CSV: `Pair, Mentor, Mentee, Goals, Progress, Meetings, Deliverables`
//! - Roster CSV: `mentor_email, mentee_email` (+ any extra columns, kept as extensions)
//! - JSON pair list: array of objects keyed `mentor_email`, `mentee_email`, ...

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    validate, IngestError, NormalizeContext, NormalizedRecord, PairFields, PairRecord, Provenance,
};

pub const PAIR_CSV_HEADER: [&str; 7] = [
    "Pair",
    "Mentor",
    "Mentee",
    "Goals",
    "Progress",
    "Meetings",
    "Deliverables",
];

/// Joins list items inside a single CSV cell. A literal `;` or `\` in an item is escaped with `\`.
pub const LIST_SEPARATOR: &str = "; ";

fn join_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| item.replace('\\', "\\\\").replace(';', "\\;"))
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

fn split_list(cell: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = cell.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => current.extend(chars.next()),
            ';' => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);

    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<String, IngestError> {
    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ============================================================================
// Project-card CSV
// ============================================================================

/// Write records as project-card rows, `Pair {i}` numbered from 1 in input order.
pub fn write_pairs_csv(records: &[PairRecord]) -> Result<String, IngestError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(PAIR_CSV_HEADER)?;
    for (i, record) in records.iter().enumerate() {
        writer.write_record([
            format!("Pair {}", i + 1),
            record.mentor().to_string(),
            record.mentee().to_string(),
            join_list(record.goals()),
            record.progress().to_string(),
            join_list(record.meetings()),
            join_list(record.deliverables()),
        ])?;
    }
    finish_csv(writer)
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, IngestError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| IngestError::MissingColumn {
            column: name.to_string(),
        })
}

/// Parse project-card rows back into records (provenance `row:{i}`).
pub fn read_pairs_csv(
    text: &str,
    context: &NormalizeContext,
) -> Result<Vec<PairRecord>, IngestError> {
    let mut reader = csv::Reader::from_reader(strip_bom(text).as_bytes());
    let headers = reader.headers()?.clone();
    let idx: Vec<usize> = PAIR_CSV_HEADER[1..]
        .iter()
        .map(|name| column(&headers, name))
        .collect::<Result<_, _>>()?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        let get = |n: usize| row.get(idx[n]).unwrap_or_default();
        let fields = PairFields {
            mentor: get(0).to_string(),
            mentee: get(1).to_string(),
            goals: split_list(get(2)),
            progress: get(3).to_string(),
            meetings: split_list(get(4)),
            deliverables: split_list(get(5)),
            ..Default::default()
        };
        records.push(PairRecord::new(fields, Provenance::Row(i + 1), context.now()));
    }
    Ok(records)
}

// ============================================================================
// Roster CSV
// ============================================================================

/// A roster row or pair-list entry that could not be read.
#[derive(Debug)]
pub struct RowFailure {
    /// 1-based data row or array position.
    pub row: usize,
    pub error: IngestError,
}

/// Records read from a roster or pair list, plus the rows that failed.
#[derive(Debug, Default)]
pub struct ReadResult {
    pub records: Vec<NormalizedRecord>,
    pub failures: Vec<RowFailure>,
}

/// Read a `mentor_email,mentee_email` roster. A leading byte-order mark is ignored.
///
/// Unreadable rows are collected as failures, and the remaining rows still produce records.
pub fn read_roster(text: &str, context: &NormalizeContext) -> Result<ReadResult, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(strip_bom(text).as_bytes());
    let headers = reader.headers()?.clone();
    let mentor_idx = column(&headers, "mentor_email")?;
    let mentee_idx = column(&headers, "mentee_email")?;

    let mut result = ReadResult::default();
    for (i, row) in reader.records().enumerate() {
        let row_number = i + 1;
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!(row = row_number, error = %err, "skipping unreadable roster row");
                result.failures.push(RowFailure {
                    row: row_number,
                    error: err.into(),
                });
                continue;
            }
        };

        let mentor = row.get(mentor_idx).unwrap_or_default().trim().to_string();
        let mentee = row.get(mentee_idx).unwrap_or_default().trim().to_string();
        let extensions = headers
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != mentor_idx && *j != mentee_idx)
            .filter_map(|(j, name)| {
                let value = row.get(j)?.trim();
                (!value.is_empty() && !name.trim().is_empty()).then(|| {
                    (
                        name.trim().to_string(),
                        serde_json::Value::String(value.to_string()),
                    )
                })
            })
            .collect();

        let warnings = validate(&mentor, &mentee, context);
        let fields = PairFields {
            mentor,
            mentee,
            progress: context.default_progress.clone(),
            extensions,
            ..Default::default()
        };
        result.records.push(NormalizedRecord {
            record: PairRecord::new(fields, Provenance::Row(row_number), context.now()),
            valid: warnings.is_empty(),
            warnings,
        });
    }
    Ok(result)
}

// ============================================================================
// JSON pair list
// ============================================================================

/// Keys owned by the canonical schema; colliding extensions are written under an `extension_` prefix.
const RESERVED_KEYS: [&str; 13] = [
    "mentor_email",
    "mentee_email",
    "mentor",
    "mentee",
    "goals",
    "meetings",
    "deliverables",
    "progress",
    "program_track",
    "start_date",
    "end_date",
    "last_updated",
    "migration_source",
];

const EXTENSION_PREFIX: &str = "extension_";

mod lenient_timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse_timestamp(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// RFC 3339, or a naive ISO-8601 timestamp taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, IngestError> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| IngestError::Timestamp {
            value: value.to_string(),
        })
}

#[derive(Debug, Serialize, Deserialize)]
struct PairListEntry {
    #[serde(rename = "mentor_email", alias = "mentor", default)]
    mentor: String,
    #[serde(rename = "mentee_email", alias = "mentee", default)]
    mentee: String,
    #[serde(default)]
    goals: Vec<String>,
    #[serde(default)]
    meetings: Vec<String>,
    #[serde(default)]
    deliverables: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    progress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    program_track: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "lenient_timestamp"
    )]
    last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    migration_source: Option<Provenance>,
    #[serde(flatten)]
    extensions: BTreeMap<String, serde_json::Value>,
}

impl From<&PairRecord> for PairListEntry {
    fn from(record: &PairRecord) -> Self {
        let extensions = record
            .extensions()
            .iter()
            .map(|(key, value)| {
                let key = if RESERVED_KEYS.contains(&key.as_str()) {
                    format!("{EXTENSION_PREFIX}{key}")
                } else {
                    key.clone()
                };
                (key, value.clone())
            })
            .collect();

        Self {
            mentor: record.mentor().to_string(),
            mentee: record.mentee().to_string(),
            goals: record.goals().to_vec(),
            meetings: record.meetings().to_vec(),
            deliverables: record.deliverables().to_vec(),
            progress: Some(record.progress().to_string()),
            program_track: record.program_track().map(str::to_string),
            start_date: record.start_date().map(str::to_string),
            end_date: record.end_date().map(str::to_string),
            last_updated: Some(record.last_updated()),
            migration_source: Some(record.provenance().clone()),
            extensions,
        }
    }
}

/// Serialize records as a pretty-printed JSON pair list.
pub fn write_pair_list(records: &[PairRecord]) -> Result<String, IngestError> {
    let entries: Vec<PairListEntry> = records.iter().map(PairListEntry::from).collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

/// Undo the `extension_` prefix given to extension keys that collide with canonical keys.
fn restore_extension_key(key: String) -> String {
    if let Some(rest) = key.strip_prefix(EXTENSION_PREFIX) {
        if RESERVED_KEYS.contains(&rest) {
            return rest.to_string();
        }
    }
    key
}

fn entry_record(entry: PairListEntry, index: usize, context: &NormalizeContext) -> NormalizedRecord {
    let warnings = validate(&entry.mentor, &entry.mentee, context);
    let provenance = entry.migration_source.unwrap_or(Provenance::Row(index));
    let last_updated = entry.last_updated.unwrap_or_else(|| context.now());
    let fields = PairFields {
        mentor: entry.mentor,
        mentee: entry.mentee,
        goals: entry.goals,
        meetings: entry.meetings,
        deliverables: entry.deliverables,
        progress: entry
            .progress
            .unwrap_or_else(|| context.default_progress.clone()),
        program_track: entry.program_track,
        start_date: entry.start_date,
        end_date: entry.end_date,
        extensions: entry
            .extensions
            .into_iter()
            .map(|(key, value)| (restore_extension_key(key), value))
            .collect(),
    };
    NormalizedRecord {
        record: PairRecord::new(fields, provenance, last_updated),
        valid: warnings.is_empty(),
        warnings,
    }
}

/// Parse a JSON pair list, filling absent fields from `context`.
///
/// Entries without `migration_source` get `row:{i}`; unknown keys land in
/// extensions. An entry of the wrong shape is recorded as a failure and the
/// rest of the list is still read; only a document that is not a JSON array
/// fails as a whole.
pub fn read_pair_list(text: &str, context: &NormalizeContext) -> Result<ReadResult, IngestError> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(strip_bom(text))?;

    let mut result = ReadResult::default();
    for (i, entry) in entries.into_iter().enumerate() {
        let index = i + 1;
        match serde_json::from_value::<PairListEntry>(entry) {
            Ok(entry) => result.records.push(entry_record(entry, index, context)),
            Err(err) => {
                tracing::warn!(entry = index, error = %err, "skipping malformed pair list entry");
                result.failures.push(RowFailure {
                    row: index,
                    error: err.into(),
                });
            }
        }
    }
    Ok(result)
}
