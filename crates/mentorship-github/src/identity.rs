//! Owner resolution: human login → opaque node id.
//!
//! Strategy chain, first success wins:
//!
//! 1. `user(login:)`
//! 2. `organization(login:)`
//! 3. if both were `NOT_FOUND`, take the authenticated `viewer` login and run
//!    steps 1-2 once more against it
//!
//! The third step runs at most once. Anything other than `NOT_FOUND` aborts
//! the whole resolution.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

use crate::envelope::decode;
use crate::{GraphqlError, GraphqlRequest, GraphqlTransport, Lookup, RemoteError};

const USER_QUERY: &str = "query ResolveUser($login: String!) { user(login: $login) { id login } }";
const ORGANIZATION_QUERY: &str =
    "query ResolveOrganization($login: String!) { organization(login: $login) { id login } }";
const VIEWER_QUERY: &str = "query Viewer { viewer { id login } }";

/// How many times the chain may restart against the authenticated caller.
pub const MAX_FALLBACK_DEPTH: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub login: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    User,
    Organization,
}

impl OwnerKind {
    fn query(self) -> &'static str {
        match self {
            OwnerKind::User => USER_QUERY,
            OwnerKind::Organization => ORGANIZATION_QUERY,
        }
    }

    fn field(self) -> &'static str {
        match self {
            OwnerKind::User => "user",
            OwnerKind::Organization => "organization",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolvedVia {
    User,
    Organization,
    FallbackUser,
    FallbackOrganization,
}

impl ResolvedVia {
    fn from_step(kind: OwnerKind, fallback: bool) -> Self {
        match (kind, fallback) {
            (OwnerKind::User, false) => ResolvedVia::User,
            (OwnerKind::Organization, false) => ResolvedVia::Organization,
            (OwnerKind::User, true) => ResolvedVia::FallbackUser,
            (OwnerKind::Organization, true) => ResolvedVia::FallbackOrganization,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResolvedVia::User => "user",
            ResolvedVia::Organization => "organization",
            ResolvedVia::FallbackUser => "fallback-user",
            ResolvedVia::FallbackOrganization => "fallback-organization",
        }
    }
}

impl fmt::Display for ResolvedVia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityResolution {
    /// The name the caller asked for.
    pub requested: String,
    /// The login that actually resolved (differs from `requested` after a fallback).
    pub login: String,
    pub id: String,
    pub kind: OwnerKind,
    pub via: ResolvedVia,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(
        "could not resolve owner `{requested}` as a user or organization{}",
        .fallback.as_ref().map(|f| format!(" (fallback `{f}` not found either)")).unwrap_or_default()
    )]
    UnresolvableOwner {
        requested: String,
        /// The authenticated login tried as a fallback, if the fallback ran.
        fallback: Option<String>,
        /// Every `NOT_FOUND` error seen along the way.
        errors: Vec<GraphqlError>,
    },
}

pub struct IdentityResolver<T> {
    transport: T,
}

impl<T: GraphqlTransport> IdentityResolver<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The authenticated caller.
    pub fn viewer(&self) -> Result<Account, RemoteError> {
        let envelope = self
            .transport
            .execute(&GraphqlRequest::new(VIEWER_QUERY, json!({})))?;
        decode(envelope.require("viewer")?, "viewer")
    }

    fn lookup(&self, kind: OwnerKind, login: &str) -> Result<Lookup, RemoteError> {
        let request = GraphqlRequest::new(kind.query(), json!({ "login": login }));
        self.transport.execute(&request)?.lookup(kind.field())
    }

    /// Steps 1-2 against one login.
    fn try_login(
        &self,
        login: &str,
        not_found: &mut Vec<GraphqlError>,
    ) -> Result<Option<(Account, OwnerKind)>, RemoteError> {
        for kind in [OwnerKind::User, OwnerKind::Organization] {
            match self.lookup(kind, login)? {
                Lookup::Found(value) => {
                    let account: Account = decode(value, kind.field())?;
                    return Ok(Some((account, kind)));
                }
                Lookup::Absent(errors) => {
                    tracing::debug!(login, kind = kind.field(), "owner lookup not found");
                    not_found.extend(errors);
                }
            }
        }
        Ok(None)
    }

    pub fn resolve(&self, name: &str) -> Result<IdentityResolution, ResolveError> {
        let mut not_found = Vec::new();
        let mut candidate = name.to_string();
        let mut fallback = None;

        for depth in 0..=MAX_FALLBACK_DEPTH {
            if let Some((account, kind)) = self.try_login(&candidate, &mut not_found)? {
                let via = ResolvedVia::from_step(kind, depth > 0);
                tracing::info!(requested = name, login = %account.login, via = %via, "resolved owner");
                return Ok(IdentityResolution {
                    requested: name.to_string(),
                    login: account.login,
                    id: account.id,
                    kind,
                    via,
                });
            }
            if depth == MAX_FALLBACK_DEPTH {
                break;
            }

            let viewer = self.viewer()?;
            if viewer.login.eq_ignore_ascii_case(name) {
                // Same login again could only repeat the two answers above.
                break;
            }
            tracing::warn!(
                requested = name,
                fallback = %viewer.login,
                "owner not found, retrying as the authenticated user"
            );
            candidate = viewer.login.clone();
            fallback = Some(viewer.login);
        }

        Err(ResolveError::UnresolvableOwner {
            requested: name.to_string(),
            fallback,
            errors: not_found,
        })
    }
}
