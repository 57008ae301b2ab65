//! Turning extraction output plus identity hints into a validated [`PairRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ExtractedFields, PairFields, PairRecord, Provenance, UNKNOWN_PLACEHOLDER};

/// Caller-supplied defaults and validation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeContext {
    /// Progress used when the text carries no progress/status field.
    pub default_progress: String,
    /// Reject the placeholder sentinel as an identity.
    pub strict: bool,
    pub placeholder: String,
    /// Creation time for new records; `None` means "now".
    pub timestamp: Option<DateTime<Utc>>,
}

impl NormalizeContext {
    pub fn new(default_progress: impl Into<String>, strict: bool) -> Self {
        Self {
            default_progress: default_progress.into(),
            strict,
            placeholder: UNKNOWN_PLACEHOLDER.to_string(),
            timestamp: None,
        }
    }

    /// Pairs submitted through an issue form.
    pub fn issue() -> Self {
        Self::new("New pair from issue", true)
    }

    /// Pairs recovered from a legacy pairings folder.
    pub fn migration() -> Self {
        Self::new("Migrated from pairings folder", false)
    }

    /// Pairs created from a mentor/mentee roster sheet.
    pub fn roster() -> Self {
        Self::new("Not Started", true)
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.timestamp.unwrap_or_else(Utc::now)
    }
}

/// Provisional identities derived from a filesystem name, before title-casing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityHints {
    pub mentor: Option<String>,
    pub mentee: Option<String>,
}

/// A record together with its validity verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub record: PairRecord,
    pub valid: bool,
    pub warnings: Vec<String>,
}

/// `alice-lee` → `Alice Lee`. Separators become spaces; each word gets one leading capital.
pub fn title_case(raw: &str) -> String {
    raw.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn looks_like_email(value: &str) -> bool {
    value.contains('@')
}

/// Explicit labels are used verbatim; filesystem hints are title-cased unless they are addresses.
fn resolve_identity(explicit: Option<&str>, hint: Option<&str>) -> String {
    if let Some(value) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
        return value.to_string();
    }
    match hint.map(str::trim) {
        Some(hint) if looks_like_email(hint) => hint.to_string(),
        Some(hint) => title_case(hint),
        None => String::new(),
    }
}

/// Validity rule shared by every construction path.
pub fn validate(mentor: &str, mentee: &str, context: &NormalizeContext) -> Vec<String> {
    let mut warnings = Vec::new();
    for (role, value) in [("mentor", mentor), ("mentee", mentee)] {
        let value = value.trim();
        if value.is_empty() {
            warnings.push(format!("{role} is missing"));
        } else if context.strict && value.eq_ignore_ascii_case(&context.placeholder) {
            warnings.push(format!("{role} is the placeholder '{value}'"));
        }
    }
    warnings
}

/// Build the canonical record for one origin item.
pub fn normalize(
    extracted: &ExtractedFields,
    hints: &IdentityHints,
    provenance: Provenance,
    context: &NormalizeContext,
) -> NormalizedRecord {
    let mentor = resolve_identity(extracted.mentor.as_deref(), hints.mentor.as_deref());
    let mentee = resolve_identity(extracted.mentee.as_deref(), hints.mentee.as_deref());
    let warnings = validate(&mentor, &mentee, context);

    let progress = extracted
        .progress
        .clone()
        .unwrap_or_else(|| context.default_progress.clone());

    let fields = PairFields {
        mentor,
        mentee,
        goals: extracted.goals.clone().unwrap_or_default(),
        meetings: extracted.meetings.clone().unwrap_or_default(),
        deliverables: extracted.deliverables.clone().unwrap_or_default(),
        progress,
        program_track: extracted.program_track.clone(),
        start_date: extracted.start_date.clone(),
        end_date: extracted.end_date.clone(),
        extensions: extracted
            .extensions
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect(),
    };

    if !warnings.is_empty() {
        tracing::warn!(
            provenance = %provenance,
            warnings = ?warnings,
            "pair record failed validation"
        );
    }

    NormalizedRecord {
        record: PairRecord::new(fields, provenance, context.now()),
        valid: warnings.is_empty(),
        warnings,
    }
}
