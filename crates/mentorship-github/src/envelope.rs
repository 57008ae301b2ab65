//! GraphQL response envelopes and remote error classification.
//!
//! Every response is `{ data?, errors? }`. An error whose `type` is
//! `NOT_FOUND` means "the thing asked for does not exist"; any other error
//! is fatal for the operation and is surfaced with its original payload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const NOT_FOUND: &str = "NOT_FOUND";

/// One entry of a GraphQL `errors` array, kept as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl GraphqlError {
    pub fn is_not_found(&self) -> bool {
        self.kind.as_deref() == Some(NOT_FOUND)
    }
}

fn summarize(errors: &[GraphqlError]) -> String {
    errors
        .iter()
        .map(|e| match &e.kind {
            Some(kind) => format!("[{kind}] {}", e.message),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Any failure talking to the remote service other than a plain "not found".
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("transport failure: {message}")]
    Transport { message: String },
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("GraphQL error: {}", summarize(.errors))]
    Graphql { errors: Vec<GraphqlError> },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Result of asking for a single top-level field.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Value),
    /// The field was null and every error was `NOT_FOUND`.
    Absent(Vec<GraphqlError>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

impl Envelope {
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    fn field(&self, name: &str) -> Option<&Value> {
        self.data
            .as_ref()
            .and_then(|d| d.get(name))
            .filter(|v| !v.is_null())
    }

    /// Classify a query result: present data, resolvable absence, or fatal error.
    pub fn lookup(self, name: &str) -> Result<Lookup, RemoteError> {
        if self.errors.iter().any(|e| !e.is_not_found()) {
            return Err(RemoteError::Graphql {
                errors: self.errors,
            });
        }
        if let Some(value) = self.field(name) {
            return Ok(Lookup::Found(value.clone()));
        }
        if self.errors.is_empty() {
            return Err(RemoteError::Malformed(format!(
                "`{name}` is missing and no error explains why"
            )));
        }
        Ok(Lookup::Absent(self.errors))
    }

    /// A field that must be present; any error at all is fatal (mutations).
    pub fn require(self, name: &str) -> Result<Value, RemoteError> {
        if !self.errors.is_empty() {
            return Err(RemoteError::Graphql {
                errors: self.errors,
            });
        }
        self.field(name)
            .cloned()
            .ok_or_else(|| RemoteError::Malformed(format!("response has no `{name}`")))
    }
}

/// Decode part of a response into a typed shape.
pub(crate) fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, RemoteError> {
    serde_json::from_value(value)
        .map_err(|err| RemoteError::Malformed(format!("unexpected {what} shape: {err}")))
}
