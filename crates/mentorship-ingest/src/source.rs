//! Source adapters: issue bodies, legacy pairing files, and legacy pairing folders.
//!
//! A legacy pairings folder looks like:
//!
//! ```text
//! pairings/
//!   alice-lee_bob-kim/          directory entry, names from the folder
//!     README.md                 notes file, parsed when present
//!     meeting-2024-01-10.md     listed as a meeting placeholder otherwise
//!   carol_dan.md                file entry, names from the stem
//!   notes.txt                   no separator: names fall back to the placeholder
//! ```
//!
//! Scanning never aborts because one entry is unreadable; every entry yields
//! either a record or an [`ItemFailure`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{
    normalize, ExtractionSchema, IdentityHints, IngestError, NormalizeContext, NormalizedRecord,
    Provenance, UNKNOWN_PLACEHOLDER,
};

/// Options controlling legacy folder scanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOptions {
    /// File names read as the text of a directory entry, first match wins.
    pub notes_files: Vec<String>,
    /// Lower-case substrings marking meeting notes inside a directory entry.
    pub meeting_keywords: Vec<String>,
    /// How deep to look for meeting files below a directory entry.
    pub listing_depth: usize,
    /// Extensions (lowercase, without dot) of top-level legacy files.
    pub legacy_extensions: Vec<String>,
    /// Separates mentor and mentee in an entry name.
    pub separator: char,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            notes_files: vec!["README.md".to_string(), "notes.md".to_string()],
            meeting_keywords: vec!["meeting".to_string(), "session".to_string()],
            listing_depth: 2,
            legacy_extensions: vec!["md".to_string(), "txt".to_string()],
            separator: '_',
        }
    }
}

/// One thing to turn into a pair record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Blob { id: String, text: String },
    Issue { number: u64, text: String },
    /// A file or directory inside a legacy pairings folder.
    LegacyEntry(PathBuf),
}

/// Text ready for extraction, plus what the origin itself says about identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub text: String,
    pub hints: IdentityHints,
    pub provenance: Provenance,
    /// `Meeting file: <name>` lines for directory entries without a notes file.
    pub meeting_placeholders: Vec<String>,
}

/// Split `alice-lee_bob-kim` into raw mentor/mentee hints.
///
/// Anything other than exactly two non-empty segments gives the placeholder for both.
pub fn identity_hints_from_name(name: &str, separator: char) -> IdentityHints {
    let segments: Vec<&str> = name.split(separator).collect();
    match segments.as_slice() {
        [mentor, mentee] if !mentor.trim().is_empty() && !mentee.trim().is_empty() => {
            IdentityHints {
                mentor: Some(mentor.trim().to_string()),
                mentee: Some(mentee.trim().to_string()),
            }
        }
        _ => IdentityHints {
            mentor: Some(UNKNOWN_PLACEHOLDER.to_string()),
            mentee: Some(UNKNOWN_PLACEHOLDER.to_string()),
        },
    }
}

/// Entry name with a recognised legacy extension removed.
fn entry_name(path: &Path, options: &ScanOptions) -> String {
    let has_legacy_ext = path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| options.legacy_extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false);

    let name = if has_legacy_ext {
        path.file_stem()
    } else {
        path.file_name()
    };
    name.map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn read_text(path: &Path) -> Result<String, IngestError> {
    fs::read_to_string(path).map_err(|err| IngestError::from_read(path, err))
}

fn meeting_files(dir: &Path, options: &ScanOptions) -> Result<Vec<String>, IngestError> {
    let mut names = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(options.listing_depth.max(1))
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(dir).to_path_buf();
            IngestError::Io {
                path,
                source: err.into(),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let lower = name.to_lowercase();
        if options.meeting_keywords.iter().any(|k| lower.contains(k.as_str())) {
            names.push(name);
        }
    }
    Ok(names)
}

fn adapt_legacy(path: PathBuf, options: &ScanOptions) -> Result<SourceText, IngestError> {
    let hints = identity_hints_from_name(&entry_name(&path, options), options.separator);

    let (text, meeting_placeholders) = if path.is_file() {
        (read_text(&path)?, Vec::new())
    } else if path.is_dir() {
        let notes = options
            .notes_files
            .iter()
            .map(|name| path.join(name))
            .find(|candidate| candidate.is_file());
        match notes {
            Some(notes) => (read_text(&notes)?, Vec::new()),
            None => {
                let placeholders = meeting_files(&path, options)?
                    .into_iter()
                    .map(|name| format!("Meeting file: {name}"))
                    .collect();
                (String::new(), placeholders)
            }
        }
    } else {
        return Err(IngestError::Io {
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "entry vanished"),
            path,
        });
    };

    Ok(SourceText {
        text,
        hints,
        provenance: Provenance::Path(path),
        meeting_placeholders,
    })
}

/// Convert one origin into extraction input.
pub fn adapt(origin: Origin, options: &ScanOptions) -> Result<SourceText, IngestError> {
    match origin {
        Origin::Blob { id, text } => Ok(SourceText {
            text,
            hints: IdentityHints::default(),
            provenance: Provenance::Blob(id),
            meeting_placeholders: Vec::new(),
        }),
        Origin::Issue { number, text } => Ok(SourceText {
            text,
            hints: IdentityHints::default(),
            provenance: Provenance::Issue(number),
            meeting_placeholders: Vec::new(),
        }),
        Origin::LegacyEntry(path) => adapt_legacy(path, options),
    }
}

/// Adapt, extract, and normalize a single origin.
pub fn ingest(
    origin: Origin,
    schema: &ExtractionSchema,
    options: &ScanOptions,
    context: &NormalizeContext,
) -> Result<NormalizedRecord, IngestError> {
    let source = adapt(origin, options)?;
    let mut extracted = schema.extract(&source.text);
    if extracted.meetings.is_none() && !source.meeting_placeholders.is_empty() {
        extracted.meetings = Some(source.meeting_placeholders);
    }
    Ok(normalize(&extracted, &source.hints, source.provenance, context))
}

/// Issue titles that name the mentorship program.
pub fn is_mentorship_issue(title: &str) -> bool {
    title.to_lowercase().contains("mentor")
}

// ============================================================================
// Batch scanning
// ============================================================================

/// An entry that could not be turned into a record.
#[derive(Debug)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub error: IngestError,
}

/// Outcome of scanning a pairings folder. Order follows discovery order.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub records: Vec<NormalizedRecord>,
    pub failures: Vec<ItemFailure>,
}

impl ScanResult {
    pub fn valid_records(&self) -> impl Iterator<Item = &NormalizedRecord> {
        self.records.iter().filter(|r| r.valid)
    }
}

fn is_candidate(path: &Path, is_dir: bool, options: &ScanOptions) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    if name.starts_with('.') {
        return false;
    }
    if is_dir || name.contains(options.separator) {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| options.legacy_extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Scan the entries directly below `root`, one record (or failure) per entry.
pub fn scan_pairings(
    root: &Path,
    options: &ScanOptions,
    schema: &ExtractionSchema,
    context: &NormalizeContext,
) -> Result<ScanResult, IngestError> {
    if !root.is_dir() {
        return Err(IngestError::RootNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut result = ScanResult::default();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                tracing::warn!(path = %path.display(), error = %err, "could not list entry");
                result.failures.push(ItemFailure {
                    path: path.clone(),
                    error: IngestError::Io {
                        path,
                        source: err.into(),
                    },
                });
                continue;
            }
        };

        let path = entry.path();
        if !is_candidate(path, entry.file_type().is_dir(), options) {
            continue;
        }

        match ingest(
            Origin::LegacyEntry(path.to_path_buf()),
            schema,
            options,
            context,
        ) {
            Ok(record) => result.records.push(record),
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "skipping unreadable entry");
                result.failures.push(ItemFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        root = %root.display(),
        records = result.records.len(),
        failures = result.failures.len(),
        "scanned pairings folder"
    );
    Ok(result)
}
