//! Labelled field and bullet-list extraction from free text.
//!
//! Issue bodies and legacy notes are loosely structured markdown. A field is
//! located by one of several label synonyms:
//!
//! ```text
//! **Mentor**: Alice            single value, bold label
//! Mentee: bob@example.org      single value, plain label
//! ## Goals                     list header (markdown heading)
//! - Learn Rust                 list items, one per bullet line
//! - Ship a crate
//! ```
//!
//! Absence is never an error: lookups return `None` and callers pick defaults.
//! Label matching is anchored at the start of a line and case-insensitive.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::SpecError;

// ============================================================================
// Field specifications
// ============================================================================

/// Whether a field holds one same-line value or a bullet list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Single,
    List,
}

/// An ordered set of label synonyms for one field, with its compiled matchers.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    labels: Vec<String>,
    kind: FieldKind,
    /// `Label: value` on one line. For lists the value is the first item.
    inline: Regex,
    /// A line carrying nothing but the label; lists only.
    header: Option<Regex>,
}

impl FieldSpec {
    pub fn new<I, S>(labels: I, kind: FieldKind) -> Result<Self, SpecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(SpecError::NoSynonyms);
        }
        if let Some(index) = labels.iter().position(|l| l.trim().is_empty()) {
            return Err(SpecError::BlankSynonym { index });
        }

        let alternation = labels
            .iter()
            .map(|l| label_pattern(l))
            .collect::<Vec<_>>()
            .join("|");

        // `**Label**: v`, `**Label:** v`, `Label: v`, optionally behind a bullet or heading.
        let inline = compile(&format!(
            r"(?im)^[ \t]*(?:[-*+][ \t]+|#{{1,6}}[ \t]+)?(?:\*\*(?:{alternation})[ \t]*:?[ \t]*\*\*[ \t]*:?|(?:\*\*)?(?:{alternation})[ \t]*:)[ \t]*(?P<value>[^\n]*)$"
        ))?;
        let header = match kind {
            FieldKind::Single => None,
            FieldKind::List => Some(compile(&format!(
                r"(?im)^[ \t]*(?:#{{1,6}}[ \t]*)?(?:\*\*)?(?:{alternation})[ \t]*:?[ \t]*(?:\*\*)?[ \t]*:?[ \t]*$"
            ))?),
        };

        Ok(Self {
            labels,
            kind,
            inline,
            header,
        })
    }

    pub fn single<I, S>(labels: I) -> Result<Self, SpecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(labels, FieldKind::Single)
    }

    pub fn list<I, S>(labels: I) -> Result<Self, SpecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(labels, FieldKind::List)
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// True if `key` names this field under any synonym (case and spacing insensitive).
    pub fn recognizes(&self, key: &str) -> bool {
        let key = normalize_key(key);
        self.labels.iter().any(|l| normalize_key(l) == key)
    }
}

fn compile(pattern: &str) -> Result<Regex, SpecError> {
    Regex::new(pattern).map_err(|err| SpecError::Pattern(err.to_string()))
}

/// Spaces inside a label match any run of spaces/tabs, including none (`start date`, `startdate`).
fn label_pattern(label: &str) -> String {
    label
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"[ \t]*")
}

/// Lower-case, underscore-joined form used for extension keys.
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

// ============================================================================
// Extraction primitives
// ============================================================================

/// Fold `\r\n` and lone `\r` into `\n`.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Non-empty same-line values labelled by any synonym of `spec`, with their match spans.
fn inline_values<'t>(
    text: &'t str,
    spec: &'t FieldSpec,
) -> impl Iterator<Item = (usize, usize, &'t str)> + 't {
    spec.inline.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let value = clean_value(caps.name("value")?.as_str());
        (!value.is_empty()).then_some((whole.start(), whole.end(), value))
    })
}

/// First same-line value labelled by any synonym of `spec`, in document order.
///
/// An occurrence with nothing after the label is skipped. Panics if `spec`
/// describes a list.
pub fn extract_single(text: &str, spec: &FieldSpec) -> Option<String> {
    assert_eq!(
        spec.kind(),
        FieldKind::Single,
        "extract_single called with a list field spec"
    );
    let text = normalize_line_endings(text);
    let first = inline_values(&text, spec).next();
    first.map(|(_, _, value)| value.to_string())
}

/// Items of the first bullet block labelled by any synonym of `spec`.
///
/// The label is either a header line of its own or `Label: first item`.
/// Blank lines inside the block are tolerated; the block ends at the first
/// non-blank line that is not a bullet. `Some(vec![])` means the header was
/// present with no usable items. Panics if `spec` describes a single value.
pub fn extract_list(text: &str, spec: &FieldSpec) -> Option<Vec<String>> {
    assert_eq!(
        spec.kind(),
        FieldKind::List,
        "extract_list called with a single-value field spec"
    );
    let text = normalize_line_endings(text);

    let header = spec
        .header
        .as_ref()
        .and_then(|header| header.find(&text))
        .map(|m| (m.start(), m.end(), None));
    let inline = inline_values(&text, spec)
        .next()
        .map(|(start, end, value)| (start, end, Some(value.to_string())));
    let (_, end, first) = [header, inline]
        .into_iter()
        .flatten()
        .min_by_key(|(start, _, _)| *start)?;

    let mut items: Vec<String> = first.into_iter().collect();
    for line in text[end..].lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match strip_bullet(line) {
            Some(item) if !item.is_empty() => items.push(item.to_string()),
            Some(_) => {}
            None => break,
        }
    }
    Some(items)
}

fn bullet_regex() -> &'static Regex {
    static BULLET: OnceLock<Regex> = OnceLock::new();
    BULLET.get_or_init(|| {
        Regex::new(r"^(?:[-*+]|\d{1,3}[.)])(?:[ \t]+|$)(?:\[[ xX]\](?:[ \t]+|$))?")
            .expect("bullet pattern is a valid regex")
    })
}

/// Strip the bullet marker (and a task box) from a trimmed line; `None` if it is not a bullet.
fn strip_bullet(line: &str) -> Option<&str> {
    let marker = bullet_regex().find(line)?;
    Some(line[marker.end()..].trim())
}

fn clean_value(raw: &str) -> &str {
    raw.trim().trim_end_matches("**").trim_end()
}

fn extension_regex() -> &'static Regex {
    static EXTENSION: OnceLock<Regex> = OnceLock::new();
    EXTENSION.get_or_init(|| {
        Regex::new(
            r"(?m)^[ \t]*(?:[-*+][ \t]+)?\*\*(?P<key>[^*:\n]+?)(?::\*\*|\*\*[ \t]*:)[ \t]*(?P<value>[^\n]*)$",
        )
        .expect("extension pattern is a valid regex")
    })
}

// ============================================================================
// Schema: all fields of a pairing at once
// ============================================================================

/// Everything pulled out of one text blob. Lists stay `None` when their header is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub mentor: Option<String>,
    pub mentee: Option<String>,
    pub goals: Option<Vec<String>>,
    pub meetings: Option<Vec<String>>,
    pub deliverables: Option<Vec<String>>,
    pub progress: Option<String>,
    pub program_track: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Bold-labelled values whose label matches no known field.
    pub extensions: BTreeMap<String, String>,
}

/// The label synonyms for every pairing field.
#[derive(Debug, Clone)]
pub struct ExtractionSchema {
    pub mentor: FieldSpec,
    pub mentee: FieldSpec,
    pub goals: FieldSpec,
    pub meetings: FieldSpec,
    pub deliverables: FieldSpec,
    pub progress: FieldSpec,
    pub program_track: FieldSpec,
    pub start_date: FieldSpec,
    pub end_date: FieldSpec,
}

fn builtin(labels: &[&str], kind: FieldKind) -> FieldSpec {
    FieldSpec::new(labels.iter().copied(), kind)
        .unwrap_or_else(|err| panic!("built-in field spec {labels:?} is malformed: {err}"))
}

impl Default for ExtractionSchema {
    fn default() -> Self {
        Self {
            mentor: builtin(&["mentor"], FieldKind::Single),
            mentee: builtin(&["mentee"], FieldKind::Single),
            goals: builtin(&["goals", "goal", "objectives", "objective"], FieldKind::List),
            meetings: builtin(
                &["meetings", "meeting", "sessions", "session"],
                FieldKind::List,
            ),
            deliverables: builtin(&["deliverables", "deliverable"], FieldKind::List),
            progress: builtin(&["progress", "status"], FieldKind::Single),
            program_track: builtin(
                &["program track", "track", "focus area", "focus", "area"],
                FieldKind::Single,
            ),
            start_date: builtin(&["start date"], FieldKind::Single),
            end_date: builtin(&["end date"], FieldKind::Single),
        }
    }
}

impl ExtractionSchema {
    fn specs(&self) -> [&FieldSpec; 9] {
        [
            &self.mentor,
            &self.mentee,
            &self.goals,
            &self.meetings,
            &self.deliverables,
            &self.progress,
            &self.program_track,
            &self.start_date,
            &self.end_date,
        ]
    }

    /// True if some field of this schema claims `key`.
    pub fn recognizes(&self, key: &str) -> bool {
        self.specs().iter().any(|spec| spec.recognizes(key))
    }

    pub fn extract(&self, text: &str) -> ExtractedFields {
        let normalized = normalize_line_endings(text);
        let text: &str = &normalized;

        let mut extensions = BTreeMap::new();
        for caps in extension_regex().captures_iter(text) {
            let key = caps["key"].trim();
            let value = clean_value(&caps["value"]);
            if value.is_empty() || self.recognizes(key) {
                continue;
            }
            extensions
                .entry(normalize_key(key))
                .or_insert_with(|| value.to_string());
        }

        ExtractedFields {
            mentor: extract_single(text, &self.mentor),
            mentee: extract_single(text, &self.mentee),
            goals: extract_list(text, &self.goals),
            meetings: extract_list(text, &self.meetings),
            deliverables: extract_list(text, &self.deliverables),
            progress: extract_single(text, &self.progress),
            program_track: extract_single(text, &self.program_track),
            start_date: extract_single(text, &self.start_date),
            end_date: extract_single(text, &self.end_date),
            extensions,
        }
    }
}
