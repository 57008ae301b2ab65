//! GitHub collaborator for mentorship tracking
//!
//! - [`IdentityResolver`]: owner name → node id (user, organization, then the
//!   authenticated caller, once)
//! - [`Provisioner`]: one project plus a draft item per valid pair
//! - [`IssueProcessor`]: a submitted issue → project item, comment, close
//!
//! All network access goes through [`GraphqlTransport`]; [`HttpTransport`] is
//! the production implementation.

pub mod config;
pub mod envelope;
pub mod identity;
pub mod issue;
pub mod provision;
pub mod transport;

pub use config::{ConfigError, Credential, GithubConfig};
pub use envelope::{Envelope, GraphqlError, Lookup, RemoteError, NOT_FOUND};
pub use identity::{
    Account, IdentityResolution, IdentityResolver, OwnerKind, ResolveError, ResolvedVia,
    MAX_FALLBACK_DEPTH,
};
pub use issue::{Issue, IssueError, IssueOutcome, IssueProcessor, DEFAULT_PROJECT_TITLE};
pub use provision::{
    Project, ProvisionError, ProvisionMode, ProvisionReport, ProvisionedItem, Provisioner,
    SkippedRecord,
};
pub use transport::{GraphqlRequest, GraphqlTransport, HttpTransport};
