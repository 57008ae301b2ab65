//! Mentorship pair ingestion
//!
//! Turns loosely formatted pair descriptions into canonical pair records:
//! - Issue bodies submitted through the mentorship issue form
//! - Legacy `pairings/` folders (one file or directory per pair)
//! - Roster CSVs (`mentor_email,mentee_email`)
//! - JSON pair lists and project-card CSVs
//!
//! Output:
//! - [`PairRecord`]s with validity verdicts ([`NormalizedRecord`])
//! - A Markdown migration report
//! - Project-card bodies for the remote tracker
//!
//! Nothing here talks to the network; see `mentorship-github` for that.

pub mod card;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod normalize;
pub mod record;
pub mod report;
pub mod source;

pub use card::*;
pub use error::{IngestError, SpecError};
pub use extraction::*;
pub use formats::*;
pub use normalize::*;
pub use record::*;
pub use report::*;
pub use source::*;
