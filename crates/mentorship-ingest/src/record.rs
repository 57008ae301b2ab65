//! The canonical mentor–mentee pairing record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Placeholder used when an identity cannot be determined.
pub const UNKNOWN_PLACEHOLDER: &str = "Unknown";

// ============================================================================
// Provenance
// ============================================================================

/// Where a record's data came from. Set once at creation.
///
/// The string form (`issue#12`, `blob:<id>`, `row:3`, or a bare path) is what
/// the JSON pair list stores under `migration_source`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Provenance {
    Issue(u64),
    Path(PathBuf),
    Blob(String),
    /// 1-based row of a tabular import.
    Row(usize),
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Issue(number) => write!(f, "issue#{number}"),
            Provenance::Path(path) => write!(f, "{}", path.display()),
            Provenance::Blob(id) => write!(f, "blob:{id}"),
            Provenance::Row(index) => write!(f, "row:{index}"),
        }
    }
}

impl FromStr for Provenance {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(number) = s.strip_prefix("issue#").and_then(|n| n.parse().ok()) {
            return Ok(Provenance::Issue(number));
        }
        if let Some(index) = s.strip_prefix("row:").and_then(|n| n.parse().ok()) {
            return Ok(Provenance::Row(index));
        }
        if let Some(id) = s.strip_prefix("blob:") {
            return Ok(Provenance::Blob(id.to_string()));
        }
        Ok(Provenance::Path(PathBuf::from(s)))
    }
}

impl From<Provenance> for String {
    fn from(value: Provenance) -> Self {
        value.to_string()
    }
}

impl From<String> for Provenance {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(provenance) => provenance,
            Err(never) => match never {},
        }
    }
}

// ============================================================================
// PairRecord
// ============================================================================

/// Field values for building or replacing a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairFields {
    pub mentor: String,
    pub mentee: String,
    pub goals: Vec<String>,
    pub meetings: Vec<String>,
    pub deliverables: Vec<String>,
    pub progress: String,
    pub program_track: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub extensions: BTreeMap<String, serde_json::Value>,
}

/// One mentor–mentee relationship.
///
/// Fields are read-only; [`PairRecord::apply_update`] produces a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRecord {
    fields: PairFields,
    last_updated: DateTime<Utc>,
    provenance: Provenance,
}

impl PairRecord {
    pub fn new(fields: PairFields, provenance: Provenance, created_at: DateTime<Utc>) -> Self {
        Self {
            fields,
            last_updated: created_at,
            provenance,
        }
    }

    pub fn mentor(&self) -> &str {
        &self.fields.mentor
    }

    pub fn mentee(&self) -> &str {
        &self.fields.mentee
    }

    pub fn goals(&self) -> &[String] {
        &self.fields.goals
    }

    pub fn meetings(&self) -> &[String] {
        &self.fields.meetings
    }

    pub fn deliverables(&self) -> &[String] {
        &self.fields.deliverables
    }

    pub fn progress(&self) -> &str {
        &self.fields.progress
    }

    pub fn program_track(&self) -> Option<&str> {
        self.fields.program_track.as_deref()
    }

    pub fn start_date(&self) -> Option<&str> {
        self.fields.start_date.as_deref()
    }

    pub fn end_date(&self) -> Option<&str> {
        self.fields.end_date.as_deref()
    }

    pub fn extensions(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.fields.extensions
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Replace every field present in `update`, stamping `now` as the update time.
    ///
    /// The receiver is left untouched and provenance carries over unchanged.
    pub fn apply_update(&self, update: PairUpdate, now: DateTime<Utc>) -> PairRecord {
        let mut fields = self.fields.clone();
        let PairUpdate {
            mentor,
            mentee,
            goals,
            meetings,
            deliverables,
            progress,
            program_track,
            start_date,
            end_date,
            extensions,
        } = update;

        if let Some(v) = mentor {
            fields.mentor = v;
        }
        if let Some(v) = mentee {
            fields.mentee = v;
        }
        if let Some(v) = goals {
            fields.goals = v;
        }
        if let Some(v) = meetings {
            fields.meetings = v;
        }
        if let Some(v) = deliverables {
            fields.deliverables = v;
        }
        if let Some(v) = progress {
            fields.progress = v;
        }
        if let Some(v) = program_track {
            fields.program_track = v;
        }
        if let Some(v) = start_date {
            fields.start_date = v;
        }
        if let Some(v) = end_date {
            fields.end_date = v;
        }
        fields.extensions.extend(extensions);

        PairRecord {
            fields,
            last_updated: now,
            provenance: self.provenance.clone(),
        }
    }
}

/// A set of replacements for [`PairRecord::apply_update`]; `None` keeps the current value.
///
/// Optional fields use a nested `Option` so an update can clear them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairUpdate {
    pub mentor: Option<String>,
    pub mentee: Option<String>,
    pub goals: Option<Vec<String>>,
    pub meetings: Option<Vec<String>>,
    pub deliverables: Option<Vec<String>>,
    pub progress: Option<String>,
    pub program_track: Option<Option<String>>,
    pub start_date: Option<Option<String>>,
    pub end_date: Option<Option<String>>,
    pub extensions: BTreeMap<String, serde_json::Value>,
}
